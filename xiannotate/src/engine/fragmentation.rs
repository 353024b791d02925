use tracing::trace;

use crate::codec::ModSyntax;
use crate::config::{CanonicalConfig, Crosslinker, Loss};
use crate::error::AnnotationError;

use super::database::DatabasePeptide;
use super::residues::WATER_MASS;
use super::{FragmentKey, ResidueSpan, TheoreticalFragment};

const CO_MASS: f64 = 27.99491462;
const NH3_MASS: f64 = 17.02654910;
const NH2_MASS: f64 = 16.01872407;
const CO_MINUS_H2: f64 = 25.97926456;

pub const PRECURSOR_ION: &str = "P";

/// Which end of the peptide an ion series grows from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminus {
    N,
    C,
}

fn ion_series(ion_type: &str) -> Result<(Terminus, f64), AnnotationError> {
    let series = match ion_type {
        "a" => (Terminus::N, -CO_MASS),
        "b" => (Terminus::N, 0.0),
        "c" => (Terminus::N, NH3_MASS),
        "x" => (Terminus::C, WATER_MASS + CO_MINUS_H2),
        "y" => (Terminus::C, WATER_MASS),
        "z" => (Terminus::C, WATER_MASS - NH2_MASS),
        _ => return Err(AnnotationError::UnknownIonType(ion_type.to_string())),
    };
    Ok(series)
}

fn place(span: ResidueSpan, position: usize) -> [ResidueSpan; 2] {
    if position == 0 {
        [span, ResidueSpan::EMPTY]
    } else {
        [ResidueSpan::EMPTY, span]
    }
}

/// The backbone fragments and optionally the precursor of one peptide, with
/// `peptide_id` the 1-based position of the peptide in the request.
pub fn backbone_fragments(
    peptide: &DatabasePeptide,
    peptide_id: usize,
    config: &CanonicalConfig,
) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
    let n = peptide.len();
    let position = peptide_id - 1;
    let fragmentation = &config.fragmentation;
    let mut fragments = Vec::new();

    for ion_type in fragmentation
        .nterm_ions
        .iter()
        .chain(fragmentation.cterm_ions.iter())
    {
        let (terminus, offset) = ion_series(ion_type)?;
        for k in 1..n {
            let span = match terminus {
                Terminus::N => ResidueSpan::new(0, k),
                Terminus::C => ResidueSpan::new(n - k, n),
            };
            let mass: f64 = peptide.residues[span.start..span.end]
                .iter()
                .map(|r| r.mass)
                .sum::<f64>()
                + offset;
            let key = FragmentKey::new(ion_type, k, peptide_id, true, place(span, position));
            fragments.push(TheoreticalFragment::new(key, mass));
        }
    }

    if fragmentation.add_precursor {
        let key = FragmentKey::new(
            PRECURSOR_ION,
            n,
            peptide_id,
            true,
            place(ResidueSpan::new(0, n), position),
        );
        fragments.push(TheoreticalFragment::new(key, peptide.mass));
    }
    Ok(fragments)
}

/// Fragments of two crosslinked peptides. Fragments containing the link site
/// carry the partner peptide and the crosslinker, and, for cleavable
/// crosslinkers, a stub in place of the partner.
pub fn crosslinked_fragments(
    peptides: [&DatabasePeptide; 2],
    link_sites: [usize; 2],
    crosslinker: &Crosslinker,
    config: &CanonicalConfig,
) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
    let mut fragments = Vec::new();
    for position in 0..2 {
        let partner = 1 - position;
        let partner_span = ResidueSpan::new(0, peptides[partner].len());
        let link_site = link_sites[position];

        let mut config_without_precursor = config.clone();
        config_without_precursor.fragmentation.add_precursor = false;
        for fragment in backbone_fragments(peptides[position], position + 1, &config_without_precursor)? {
            let own_span = fragment.key.ranges[position];
            if !own_span.contains(link_site) {
                fragments.push(fragment);
                continue;
            }

            for stub in crosslinker.cleavage_stubs.iter() {
                let mut key = fragment.key.clone();
                key.stub = stub.name.clone();
                fragments.push(TheoreticalFragment::new(key, fragment.mass + stub.mass));
            }

            let mut key = fragment.key;
            key.is_linear = false;
            key.ranges[partner] = partner_span;
            let mass = fragment.mass + peptides[partner].mass + crosslinker.mass;
            fragments.push(TheoreticalFragment::new(key, mass));
        }
    }

    if config.fragmentation.add_precursor {
        let spans = [
            ResidueSpan::new(0, peptides[0].len()),
            ResidueSpan::new(0, peptides[1].len()),
        ];
        let key = FragmentKey::new(PRECURSOR_ION, peptides[0].len(), 1, false, spans);
        let mass = peptides[0].mass + peptides[1].mass + crosslinker.mass;
        fragments.push(TheoreticalFragment::new(key, mass));

        for stub in crosslinker.cleavage_stubs.iter() {
            for position in 0..2 {
                let mut key = FragmentKey::new(
                    PRECURSOR_ION,
                    peptides[position].len(),
                    position + 1,
                    true,
                    place(spans[position], position),
                );
                key.stub = stub.name.clone();
                fragments.push(TheoreticalFragment::new(key, peptides[position].mass + stub.mass));
            }
        }
    }
    Ok(fragments)
}

/// Fragments of two peptides sharing a spectrum without a covalent link
pub fn noncovalent_fragments(
    peptides: [&DatabasePeptide; 2],
    config: &CanonicalConfig,
) -> Result<Vec<TheoreticalFragment>, AnnotationError> {
    let mut fragments = backbone_fragments(peptides[0], 1, config)?;
    fragments.extend(backbone_fragments(peptides[1], 2, config)?);
    Ok(fragments)
}

fn loss_sites(
    loss: &Loss,
    fragment: &TheoreticalFragment,
    peptides: &[&DatabasePeptide],
    syntax: ModSyntax,
) -> usize {
    let mut sites = 0;
    for (span, peptide) in fragment.key.ranges.iter().zip(peptides.iter()) {
        if span.is_empty() {
            continue;
        }
        let Some(residues) = peptide.residues.get(span.start..span.end) else {
            continue;
        };
        sites += residues
            .iter()
            .filter(|r| loss.applies_to(&r.token(syntax)))
            .count();
        if loss.nterm && span.start == 0 {
            sites += 1;
        }
        if loss.cterm && span.end == peptide.len() {
            sites += 1;
        }
    }
    sites
}

/// Add one variant per loss and loss count, up to the number of sites the
/// loss can occur on and the configured maximum.
pub fn with_losses(
    fragments: Vec<TheoreticalFragment>,
    peptides: &[&DatabasePeptide],
    config: &CanonicalConfig,
) -> Vec<TheoreticalFragment> {
    let max_losses = config.fragmentation.max_losses;
    let mut result = Vec::with_capacity(fragments.len() * 2);
    for fragment in fragments {
        for loss in config.fragmentation.losses.iter() {
            let sites = loss_sites(loss, &fragment, peptides, config.mod_syntax).min(max_losses);
            for count in 1..=sites {
                let mut key = fragment.key.clone();
                key.loss = format!("{}x{}", loss.name, count);
                key.loss_count = count;
                let mass = fragment.mass - loss.mass * count as f64;
                result.push(TheoreticalFragment::new(key, mass));
            }
        }
        result.push(fragment);
    }
    trace!("{} fragments after adding losses", result.len());
    result
}

pub fn with_charges(fragments: Vec<TheoreticalFragment>, precursor_charge: i32) -> Vec<TheoreticalFragment> {
    let max_charge = precursor_charge.max(1);
    let mut result = Vec::with_capacity(fragments.len() * max_charge as usize);
    for fragment in fragments {
        for charge in 1..=max_charge {
            let mut charged = fragment.clone();
            charged.charge = charge;
            result.push(charged);
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::residues::parse_modx;

    fn peptide(sequence: &str) -> DatabasePeptide {
        DatabasePeptide::new(parse_modx(sequence, &CanonicalConfig::default()).unwrap())
    }

    fn find<'a>(
        fragments: &'a [TheoreticalFragment],
        name: (&str, usize, usize, bool),
    ) -> Option<&'a TheoreticalFragment> {
        fragments.iter().find(|f| {
            f.key.ion_type == name.0
                && f.key.index == name.1
                && f.key.peptide_id == name.2
                && f.key.is_linear == name.3
                && f.key.loss_count == 0
                && f.key.stub.is_empty()
        })
    }

    #[test]
    fn test_linear() {
        let config = CanonicalConfig::default();
        let fragments = backbone_fragments(&peptide("AKT"), 1, &config).unwrap();
        // b1, b2, y1, y2, P
        assert_eq!(fragments.len(), 5);
        let b1 = find(&fragments, ("b", 1, 1, true)).unwrap();
        assert!((b1.mass - 71.03711381).abs() < 1e-9);
        let y2 = find(&fragments, ("y", 2, 1, true)).unwrap();
        assert_eq!(y2.key.ranges[0], ResidueSpan::new(1, 3));
        let precursor = find(&fragments, ("P", 3, 1, true)).unwrap();
        assert_eq!(precursor.key.ranges, [ResidueSpan::new(0, 3), ResidueSpan::EMPTY]);
    }

    #[test]
    fn test_crosslinked() {
        let config = CanonicalConfig::default();
        let bs3 = Crosslinker::named("BS3").unwrap();
        let (a, b) = (peptide("AKT"), peptide("KMR"));
        let fragments = crosslinked_fragments([&a, &b], [1, 0], &bs3, &config).unwrap();

        let b1 = find(&fragments, ("b", 1, 1, true)).unwrap();
        assert_eq!(b1.key.ranges, [ResidueSpan::new(0, 1), ResidueSpan::EMPTY]);

        let b1_p = find(&fragments, ("b", 1, 2, false)).unwrap();
        assert_eq!(b1_p.key.ranges, [ResidueSpan::new(0, 3), ResidueSpan::new(0, 1)]);
        assert!((b1_p.mass + chemical_elements::PROTON - 585.3606394316989).abs() < 1e-5);

        let b2_p = find(&fragments, ("b", 2, 1, false)).unwrap();
        assert_eq!(b2_p.key.ranges, [ResidueSpan::new(0, 2), ResidueSpan::new(0, 3)]);

        let precursor = find(&fragments, ("P", 3, 1, false)).unwrap();
        assert!((precursor.mass - (a.mass + b.mass + bs3.mass)).abs() < 1e-9);
        assert!(find(&fragments, ("P", 3, 1, true)).is_none());
    }

    #[test]
    fn test_cleavable_stubs() {
        let config = CanonicalConfig::default();
        let dsso = Crosslinker::named("DSSO").unwrap();
        let (a, b) = (peptide("AKT"), peptide("KMR"));
        let fragments = crosslinked_fragments([&a, &b], [1, 0], &dsso, &config).unwrap();
        let stubbed: Vec<_> = fragments
            .iter()
            .filter(|f| f.key.ion_type == "b" && f.key.index == 2 && f.key.peptide_id == 1 && !f.key.stub.is_empty())
            .collect();
        assert_eq!(stubbed.len(), 3);
        assert!(stubbed.iter().all(|f| f.key.is_linear && f.key.ranges[1].is_empty()));
    }

    #[test]
    fn test_losses_and_charges() {
        let config = CanonicalConfig::default();
        let peptide = peptide("STK");
        let fragments = backbone_fragments(&peptide, 1, &config).unwrap();
        let y2 = find(&fragments, ("y", 2, 1, true)).unwrap().clone();
        let expanded = with_losses(vec![y2], &[&peptide], &config);
        // TK: water on T and the C-terminus, ammonia on K
        let losses: Vec<&str> = expanded.iter().map(|f| f.key.loss.as_str()).collect();
        assert_eq!(losses, vec!["H2Ox1", "H2Ox2", "NH3x1", ""]);
        assert_eq!(expanded[1].key.loss_count, 2);

        let charged = with_charges(expanded, 3);
        assert_eq!(charged.len(), 12);
        assert_eq!(charged[2].charge, 3);
    }

    #[test]
    fn test_unknown_ion() {
        let mut config = CanonicalConfig::default();
        config.fragmentation.nterm_ions.push("q".into());
        assert!(matches!(
            backbone_fragments(&peptide("AKT"), 1, &config),
            Err(AnnotationError::UnknownIonType(_))
        ));
    }
}
