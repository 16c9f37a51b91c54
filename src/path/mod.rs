//! Certification paths: the ordered trust-anchor-to-target certificate
//! sequence, a builder that discovers the sequence from an unordered
//! pool, and the RFC 5280 Section 6.1 validation engine.

pub mod policy;
pub mod validate;

use log::debug;

use crate::cert::Certificate;

pub use policy::{PolicyNode, PolicyTree};
pub use validate::{validate_path, PathError, PathValidationConfig, PathValidationResult};

/// Backstop against pathological pools with issuer/subject cycles.
const MAX_PATH_DEPTH: usize = 32;

/// Reasons a certification path cannot be assembled.
#[derive(Debug, thiserror::Error)]
pub enum PathBuildError {
    #[error("no certification path from the trust anchor to the target")]
    NoPath,

    #[error("multiple certification paths from the trust anchor to the target")]
    Ambiguous,

    #[error("a certification path requires at least a trust anchor and a target")]
    TooShort,

    #[error("issuer of certificate {0} does not match the subject of its predecessor")]
    BrokenChain(usize),
}

/// An ordered certificate sequence from a trust anchor to a target.
///
/// Index 0 is the trust anchor, the last index the target. Adjacent
/// certificates chain by name: each issuer matches the predecessor's
/// subject. The order is a structural invariant; whether the path is
/// trustworthy is decided by [`validate_path`].
#[derive(Clone, Debug)]
pub struct CertificationPath {
    certificates: Vec<Certificate>,
}

impl CertificationPath {
    /// Wraps an already ordered sequence, checking length and chaining.
    pub fn new(certificates: Vec<Certificate>) -> Result<Self, PathBuildError> {
        if certificates.len() < 2 {
            return Err(PathBuildError::TooShort);
        }
        for (i, pair) in certificates.windows(2).enumerate() {
            if !pair[1].issuer().matches(pair[0].subject()) {
                return Err(PathBuildError::BrokenChain(i + 1));
            }
        }
        Ok(Self { certificates })
    }

    /// Assembles a path from `anchor` to `target` using intermediates
    /// from `pool`, by depth-first search from the target towards the
    /// anchor. The first path found wins.
    pub fn from_trust_anchor_to_target(
        anchor: &Certificate,
        target: &Certificate,
        pool: &[Certificate],
    ) -> Result<Self, PathBuildError> {
        let chains = search(anchor, target, pool, 1);
        match chains.into_iter().next() {
            Some(intermediates) => Ok(assemble(anchor, target, pool, &intermediates)),
            None => Err(PathBuildError::NoPath),
        }
    }

    /// Like [`Self::from_trust_anchor_to_target`], but fails with
    /// [`PathBuildError::Ambiguous`] when more than one path exists.
    pub fn from_trust_anchor_to_target_unique(
        anchor: &Certificate,
        target: &Certificate,
        pool: &[Certificate],
    ) -> Result<Self, PathBuildError> {
        let chains = search(anchor, target, pool, 2);
        match chains.len() {
            0 => Err(PathBuildError::NoPath),
            1 => Ok(assemble(anchor, target, pool, &chains[0])),
            _ => Err(PathBuildError::Ambiguous),
        }
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn trust_anchor(&self) -> &Certificate {
        &self.certificates[0]
    }

    pub fn target(&self) -> &Certificate {
        self.certificates
            .last()
            .expect("paths hold at least two certificates")
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Validates this path under `config`.
    pub fn validate(
        &self,
        config: &PathValidationConfig,
    ) -> Result<PathValidationResult, PathError> {
        validate_path(self, config)
    }
}

/// Builds the final certificate vector from pool indices ordered
/// target-side first.
fn assemble(
    anchor: &Certificate,
    target: &Certificate,
    pool: &[Certificate],
    intermediates: &[usize],
) -> CertificationPath {
    let mut certificates = Vec::with_capacity(intermediates.len() + 2);
    certificates.push(anchor.clone());
    for &idx in intermediates.iter().rev() {
        certificates.push(pool[idx].clone());
    }
    certificates.push(target.clone());
    CertificationPath { certificates }
}

/// Collects up to `limit` distinct intermediate chains (as pool indices,
/// target side first) linking `target` up to `anchor`.
fn search(
    anchor: &Certificate,
    target: &Certificate,
    pool: &[Certificate],
    limit: usize,
) -> Vec<Vec<usize>> {
    let mut used = vec![false; pool.len()];
    let mut chain = Vec::new();
    let mut found = Vec::new();
    extend(anchor, target, pool, &mut used, &mut chain, &mut found, limit);
    found
}

fn extend(
    anchor: &Certificate,
    current: &Certificate,
    pool: &[Certificate],
    used: &mut [bool],
    chain: &mut Vec<usize>,
    found: &mut Vec<Vec<usize>>,
    limit: usize,
) {
    if found.len() >= limit || chain.len() > MAX_PATH_DEPTH {
        return;
    }
    if current.issuer().matches(anchor.subject()) {
        debug!("path found with {} intermediates", chain.len());
        found.push(chain.clone());
        if found.len() >= limit {
            return;
        }
    }
    for idx in 0..pool.len() {
        if used[idx] || !pool[idx].subject().matches(current.issuer()) {
            continue;
        }
        used[idx] = true;
        chain.push(idx);
        extend(anchor, &pool[idx], pool, used, chain, found, limit);
        chain.pop();
        used[idx] = false;
    }
}
