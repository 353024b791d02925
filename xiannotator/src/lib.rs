//! The HTTP front end of `xiannotate`.
mod driver;
mod server;
mod types;

pub use driver::{XiAnnotator, XiAnnotatorError};
pub use server::{cors_layer, router, ServiceState};
pub use types::{ANNOTATE_ROUTE, CONFIG_FILE_NAME, ENV_PREFIX, VERSION};
