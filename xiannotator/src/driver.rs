use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::header::InvalidHeaderName;
use axum::http::HeaderName;
use axum::Router;
use clap::Parser;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use xiannotate::{Annotator, ReferenceEngine};

use crate::server::{router, ServiceState};
use crate::types::{
    lenient_flag, CONFIG_FILE_NAME, DEFAULT_CORS_HEADERS, DEFAULT_HOST, DEFAULT_PORT, ENV_PREFIX,
    VERSION,
};

#[derive(Debug, Error)]
pub enum XiAnnotatorError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to read the configuration: {0}")]
    ConfigError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("{0:?} is not a valid CORS header name: {1}")]
    InvalidHeaderName(String, #[source] InvalidHeaderName),
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cors_headers() -> String {
    DEFAULT_CORS_HEADERS.to_string()
}

/// Annotation of peptide and crosslinked peptide fragment spectra over HTTP.
///
/// Serves `POST /xiAnnotator/annotate/FULL`, taking an annotation request in
/// either the legacy or the structured dialect and answering with the request
/// echoed back with its peak, cluster, fragment and annotation blocks filled in.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
pub struct XiAnnotator {
    /// The address to bind to
    #[arg(long = "host", default_value = DEFAULT_HOST)]
    #[serde(default = "default_host")]
    pub host: String,

    /// The port to listen on
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    #[serde(default = "default_port")]
    pub port: u16,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `xiannotator.toml` in the working directory.
    /// Environment variables prefixed with `XI2ANNOTATOR_` will be read too.
    #[arg(long = "config-file")]
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Report annotation failures to the client as a 400 response carrying the
    /// error message and its trace, instead of a bare 500.
    ///
    /// `XI2ANNOTATOR_DEBUG` set to anything other than `false` or `0` enables this too.
    #[arg(short = 'd', long = "debug")]
    #[serde(default, deserialize_with = "lenient_flag")]
    pub debug: bool,

    /// A comma separated list of request headers clients may send cross-origin
    #[arg(long = "cors-headers", default_value = DEFAULT_CORS_HEADERS)]
    #[serde(default = "default_cors_headers")]
    pub cors_headers: String,
}

impl Default for XiAnnotator {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_file: None,
            config_file: None,
            debug: false,
            cors_headers: default_cors_headers(),
        }
    }
}

impl XiAnnotator {
    /// Layer the settings in `xiannotator.toml`, the `--config-file` if one was
    /// given and `XI2ANNOTATOR_` environment variables over these arguments, each
    /// overriding the one before.
    pub fn configure(&self) -> Result<Self, XiAnnotatorError> {
        let mut config =
            Figment::from(Serialized::defaults(self)).merge(Toml::file(CONFIG_FILE_NAME));
        if let Some(path) = self.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        config = config.merge(Env::prefixed(ENV_PREFIX));
        Ok(config.extract()?)
    }

    pub fn allowed_headers(&self) -> Result<Vec<HeaderName>, XiAnnotatorError> {
        self.cors_headers
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                HeaderName::from_str(s)
                    .map_err(|e| XiAnnotatorError::InvalidHeaderName(s.to_string(), e))
            })
            .collect()
    }

    /// Build the HTTP application around the reference engine
    pub fn app(&self) -> Result<Router, XiAnnotatorError> {
        let annotator = Annotator::with_version(ReferenceEngine::new(), VERSION);
        let state = ServiceState::new(annotator, self.debug);
        Ok(router(state, &self.allowed_headers()?))
    }

    pub async fn serve(&self) -> Result<(), XiAnnotatorError> {
        let app = self.app()?;
        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;
        Ok(())
    }

    pub fn main(&self) -> Result<(), XiAnnotatorError> {
        info!("xiannotator v{VERSION}");
        if self.debug {
            info!("Annotation errors will be reported to clients");
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.serve())
    }
}
