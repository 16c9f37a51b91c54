//! The RFC 5280 Section 6.1 certification path validation algorithm.
//!
//! State is threaded through one pass over the path: the working public
//! key and issuer name, the policy tree, the three policy counters, the
//! accumulated name constraints and the remaining path length. Every
//! failure names the rule that tripped and the depth it tripped at.

use der::{asn1::ObjectIdentifier, Encode};
use log::{debug, info};
use spki::SubjectPublicKeyInfoOwned;

use super::policy::PolicyTree;
use super::CertificationPath;
use crate::cert::Certificate;
use crate::ext::constraints::{self, GeneralSubtree, NameConstraints};
use crate::ext::{is_known_extension, ExtensionError};
use crate::name::GeneralName;
use crate::oid;
use crate::sign::{self, SignatureError};

/// Reasons a certification path is rejected.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("signature of certificate {depth} does not verify: {source}")]
    SignatureInvalid {
        depth: usize,
        #[source]
        source: SignatureError,
    },

    #[error("certificate {depth} is not yet valid at the reference time")]
    NotYetValid { depth: usize },

    #[error("certificate {depth} is expired at the reference time")]
    Expired { depth: usize },

    #[error("issuer of certificate {depth} does not match the working issuer name")]
    NameChainingViolation { depth: usize },

    #[error("certificate {depth} carries name {name}, excluded by name constraints")]
    NameConstraintViolation { depth: usize, name: String },

    #[error("no valid certificate policy remains at certificate {depth}")]
    NoValidPolicy { depth: usize },

    #[error("certificate {depth} maps anyPolicy in its policy mappings")]
    InvalidPolicyMapping { depth: usize },

    #[error("certificate {depth} is not a CA certificate")]
    BasicConstraintsViolation { depth: usize },

    #[error("maximum path length exceeded at certificate {depth}")]
    PathLengthExceeded { depth: usize },

    #[error("certificate {depth} does not permit certificate signing")]
    KeyUsageViolation { depth: usize },

    #[error("certificate {depth} carries unsupported critical extension {extn_id}")]
    UnsupportedCriticalExtension {
        depth: usize,
        extn_id: ObjectIdentifier,
    },

    #[error("extension of certificate {depth} failed to decode: {source}")]
    Extension {
        depth: usize,
        #[source]
        source: ExtensionError,
    },

    #[error("DER processing failed: {0}")]
    Encoding(#[from] der::Error),
}

/// Caller-supplied validation parameters.
///
/// The reference time is mandatory; the crate never consults a clock.
#[derive(Clone, Debug)]
pub struct PathValidationConfig {
    /// Evaluation time in seconds since the Unix epoch.
    pub reference_time: u64,

    /// Policies acceptable to the caller; empty means any policy.
    pub acceptable_policy_set: Vec<ObjectIdentifier>,

    /// Require the path to be valid under at least one policy.
    pub require_explicit_policy: bool,

    /// Disallow policy mapping across the whole path.
    pub inhibit_policy_mapping: bool,

    /// Disallow `anyPolicy` across the whole path.
    pub inhibit_any_policy: bool,

    /// Cap on the number of non-self-issued intermediate certificates.
    pub max_length: Option<usize>,
}

impl PathValidationConfig {
    pub fn new(reference_time: u64) -> Self {
        Self {
            reference_time,
            acceptable_policy_set: Vec::new(),
            require_explicit_policy: false,
            inhibit_policy_mapping: false,
            inhibit_any_policy: false,
            max_length: None,
        }
    }

    pub fn with_acceptable_policies(mut self, policies: Vec<ObjectIdentifier>) -> Self {
        self.acceptable_policy_set = policies;
        self
    }

    pub fn with_explicit_policy(mut self, require: bool) -> Self {
        self.require_explicit_policy = require;
        self
    }

    pub fn with_policy_mapping_inhibit(mut self, inhibit: bool) -> Self {
        self.inhibit_policy_mapping = inhibit;
        self
    }

    pub fn with_any_policy_inhibit(mut self, inhibit: bool) -> Self {
        self.inhibit_any_policy = inhibit;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// The outputs of a successful validation (RFC 5280 Section 6.1.6).
#[derive(Clone, Debug)]
pub struct PathValidationResult {
    /// The validated public key of the target certificate.
    pub public_key: SubjectPublicKeyInfoOwned,

    /// The surviving policy tree; `None` when the path is valid without
    /// any policy.
    pub policy_tree: Option<PolicyTree>,

    /// Policies of the final tree depth after intersecting with the
    /// caller's acceptable set.
    pub user_constrained_policies: Vec<ObjectIdentifier>,
}

/// Name constraints accumulated while walking the path.
///
/// Each CA's permitted subtrees are kept as a separate set that every
/// subsequent name must independently satisfy; this realizes the RFC's
/// intersection without computing subtree intersections. Excluded
/// subtrees accumulate as a union.
#[derive(Default)]
struct NameConstraintState {
    permitted: Vec<Vec<GeneralSubtree>>,
    excluded: Vec<GeneralSubtree>,
}

impl NameConstraintState {
    fn absorb(&mut self, nc: &NameConstraints) {
        if let Some(permitted) = &nc.permitted_subtrees {
            self.permitted.push(permitted.clone());
        }
        if let Some(excluded) = &nc.excluded_subtrees {
            self.excluded.extend(excluded.iter().cloned());
        }
    }

    /// Checks the subject DN, subject emailAddress attributes and the
    /// subject alternative names of `cert` against the current state.
    fn check(&self, cert: &Certificate, depth: usize) -> Result<(), PathError> {
        if self.permitted.is_empty() && self.excluded.is_empty() {
            return Ok(());
        }

        let mut names: Vec<GeneralName> = Vec::new();
        if !cert.subject().is_empty() {
            names.push(GeneralName::DirectoryName(cert.subject().clone()));
        }
        for atv in cert.subject().attr_values(&oid::EMAIL_ADDRESS) {
            if let Some(addr) = atv.value_str() {
                if let Ok(gn) = GeneralName::rfc822(addr) {
                    names.push(gn);
                }
            }
        }
        if let Some(san) = cert
            .subject_alt_name()
            .map_err(|source| PathError::Extension { depth, source })?
        {
            names.extend(san.0.iter().cloned());
        }

        for name in &names {
            for subtree in &self.excluded {
                if constraints::name_within(name, &subtree.base) {
                    return Err(PathError::NameConstraintViolation {
                        depth,
                        name: name.to_string(),
                    });
                }
            }
            for permitted_set in &self.permitted {
                let applicable = permitted_set
                    .iter()
                    .any(|subtree| constraints::same_form(&subtree.base, name));
                if applicable
                    && !permitted_set
                        .iter()
                        .any(|subtree| constraints::name_within(name, &subtree.base))
                {
                    return Err(PathError::NameConstraintViolation {
                        depth,
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn ext_err(depth: usize) -> impl Fn(ExtensionError) -> PathError {
    move |source| PathError::Extension { depth, source }
}

/// Validates `path` under `config`, returning the RFC 5280 Section 6.1.6
/// outputs on success.
pub fn validate_path(
    path: &CertificationPath,
    config: &PathValidationConfig,
) -> Result<PathValidationResult, PathError> {
    let certs = path.certificates();
    let anchor = &certs[0];
    // number of certificates to process after the trust anchor
    let n = certs.len() - 1;

    let mut tree: Option<PolicyTree> = Some(PolicyTree::new());
    let mut explicit_policy = if config.require_explicit_policy { 0 } else { n + 1 };
    let mut policy_mapping = if config.inhibit_policy_mapping { 0 } else { n + 1 };
    let mut any_policy = if config.inhibit_any_policy { 0 } else { n + 1 };

    let mut working_public_key = anchor.public_key().clone();
    let mut working_issuer_name = anchor.subject().clone();
    let mut names = NameConstraintState::default();
    // constraints carried by the anchor bind everything it issues
    if let Some(nc) = anchor.name_constraints().map_err(ext_err(0))? {
        names.absorb(&nc);
    }

    let mut max_path_length = config.max_length.unwrap_or(n);
    // a path length constraint on the anchor binds the rest of the path
    if let Some(bc) = anchor.basic_constraints().map_err(ext_err(0))? {
        if let Some(limit) = bc.path_len_constraint {
            max_path_length = max_path_length.min(limit as usize);
        }
    }

    for (depth, cert) in certs.iter().enumerate().skip(1) {
        let is_final = depth == n;
        let self_issued = cert.is_self_issued();
        debug!(
            "processing certificate {depth}/{n}: subject={}",
            cert.subject()
        );

        // signature: the inner and outer algorithm must agree, and the
        // signature must verify under the working public key
        if cert.tbs_certificate.signature != cert.signature_algorithm {
            return Err(PathError::SignatureInvalid {
                depth,
                source: SignatureError::AlgorithmMismatch,
            });
        }
        let message = cert.tbs_certificate.to_der()?;
        let signature = cert
            .signature
            .as_bytes()
            .ok_or(PathError::SignatureInvalid {
                depth,
                source: SignatureError::VerificationFailed,
            })?;
        sign::verify_signature(
            &working_public_key,
            &cert.signature_algorithm,
            &message,
            signature,
        )
        .map_err(|source| PathError::SignatureInvalid { depth, source })?;

        // validity window, inclusive on both ends
        let validity = cert.validity();
        if config.reference_time < validity.not_before.to_unix_secs() {
            return Err(PathError::NotYetValid { depth });
        }
        if config.reference_time > validity.not_after.to_unix_secs() {
            return Err(PathError::Expired { depth });
        }

        // issuer chaining
        if !cert.issuer().matches(&working_issuer_name) {
            return Err(PathError::NameChainingViolation { depth });
        }

        // name constraints; self-issued certificates are exempt unless
        // they are the target
        if is_final || !self_issued {
            names.check(cert, depth)?;
        }

        // certificate policies
        if let Some(current_tree) = tree.as_mut() {
            match cert.certificate_policies().map_err(ext_err(depth))? {
                Some(policies) => {
                    let any_policy_allowed = any_policy > 0 || (!is_final && self_issued);
                    current_tree.process_policies(&policies, depth, any_policy_allowed);
                    current_tree.prune(depth);
                    if current_tree.is_empty() {
                        tree = None;
                    }
                }
                None => tree = None,
            }
        }
        if explicit_policy == 0 && tree.is_none() {
            return Err(PathError::NoValidPolicy { depth });
        }

        if !is_final {
            // policy mappings
            if let Some(mappings) = cert.policy_mappings().map_err(ext_err(depth))? {
                for mapping in mappings.iter() {
                    if mapping.issuer_domain_policy == oid::ANY_POLICY
                        || mapping.subject_domain_policy == oid::ANY_POLICY
                    {
                        return Err(PathError::InvalidPolicyMapping { depth });
                    }
                }
                if let Some(current_tree) = tree.as_mut() {
                    current_tree.map_policies(&mappings, depth, policy_mapping > 0);
                    current_tree.prune(depth);
                    if current_tree.is_empty() {
                        tree = None;
                    }
                }
            }

            // accumulate name constraints for the rest of the path
            if let Some(nc) = cert.name_constraints().map_err(ext_err(depth))? {
                names.absorb(&nc);
            }

            // counters tick down on non-self-issued certificates
            if !self_issued {
                explicit_policy = explicit_policy.saturating_sub(1);
                policy_mapping = policy_mapping.saturating_sub(1);
                any_policy = any_policy.saturating_sub(1);
            }
            if let Some(pc) = cert.policy_constraints().map_err(ext_err(depth))? {
                if let Some(require) = pc.require_explicit_policy {
                    explicit_policy = explicit_policy.min(require as usize);
                }
                if let Some(inhibit) = pc.inhibit_policy_mapping {
                    policy_mapping = policy_mapping.min(inhibit as usize);
                }
            }
            if let Some(inhibit) = cert.inhibit_any_policy().map_err(ext_err(depth))? {
                any_policy = any_policy.min(inhibit.0 as usize);
            }

            // an intermediate must be a CA allowed to sign certificates
            let bc = cert
                .basic_constraints()
                .map_err(ext_err(depth))?
                .filter(|bc| bc.ca)
                .ok_or(PathError::BasicConstraintsViolation { depth })?;
            if !self_issued {
                if max_path_length == 0 {
                    return Err(PathError::PathLengthExceeded { depth });
                }
                max_path_length -= 1;
            }
            if let Some(limit) = bc.path_len_constraint {
                max_path_length = max_path_length.min(limit as usize);
            }
            if let Some(ku) = cert.key_usage().map_err(ext_err(depth))? {
                if !ku.key_cert_sign() {
                    return Err(PathError::KeyUsageViolation { depth });
                }
            }
        }

        // every critical extension must be one the engine processes
        if let Some(extensions) = cert.extensions() {
            for ext in extensions.iter() {
                if ext.critical && !is_known_extension(&ext.extn_id) {
                    return Err(PathError::UnsupportedCriticalExtension {
                        depth,
                        extn_id: ext.extn_id,
                    });
                }
            }
        }

        working_issuer_name = cert.subject().clone();
        working_public_key = cert.public_key().clone();
    }

    // wrap-up (RFC 5280 Section 6.1.5)
    let target = &certs[n];
    explicit_policy = explicit_policy.saturating_sub(1);
    if let Some(pc) = target.policy_constraints().map_err(ext_err(n))? {
        if pc.require_explicit_policy == Some(0) {
            explicit_policy = 0;
        }
    }

    if let Some(current_tree) = tree.as_mut() {
        if !config.acceptable_policy_set.is_empty()
            && !config.acceptable_policy_set.contains(&oid::ANY_POLICY)
        {
            current_tree.intersect_with_user_set(n, &config.acceptable_policy_set);
            if current_tree.is_empty() {
                tree = None;
            }
        }
    }

    if explicit_policy == 0 && tree.is_none() {
        return Err(PathError::NoValidPolicy { depth: n });
    }

    let user_constrained_policies = tree
        .as_ref()
        .map(|t| t.policies_at_depth(n))
        .unwrap_or_default();

    info!(
        "path validated: target={}, policies={:?}",
        target.subject(),
        user_constrained_policies
    );

    Ok(PathValidationResult {
        public_key: working_public_key,
        policy_tree: tree,
        user_constrained_policies,
    })
}
