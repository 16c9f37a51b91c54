//! Attribute certificate validation (RFC 5755 Section 5).
//!
//! An AC is evaluated against two certification paths: the AC issuer's
//! path, whose target key verifies the AC signature, and the holder's
//! path, whose target certificate the holder binding must identify.
//! Checks run in a fixed order so the reported error names the first
//! rule that failed.

use der::Encode;
use log::{debug, info};

use crate::ac::{AttCertIssuer, AttributeCertificate, DigestedObjectType, Holder};
use crate::cert::Certificate;
use crate::ext::{is_known_ac_extension, target::Target, ExtensionError};
use crate::name::GeneralName;
use crate::path::{CertificationPath, PathError, PathValidationConfig};
use crate::sign::{self, SignatureError};

/// Reasons an attribute certificate is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ACError {
    #[error("AC issuer certification path rejected: {0}")]
    IssuerPathInvalid(#[source] PathError),

    #[error("holder certification path rejected: {0}")]
    HolderPathInvalid(#[source] PathError),

    #[error("attribute certificate signature does not verify")]
    SignatureInvalid,

    #[error("signature provider failure: {0}")]
    Provider(#[source] SignatureError),

    #[error("attribute certificate is not yet valid at the reference time")]
    NotYetValid,

    #[error("attribute certificate is expired at the reference time")]
    Expired,

    #[error("holder does not identify the holder path's target certificate")]
    HolderMismatch,

    #[error("issuer does not identify the issuer path's target certificate")]
    IssuerMismatch,

    #[error("attribute certificate is not targeted at any required target")]
    TargetMismatch,

    #[error("unsupported critical attribute certificate extension {extn_id}")]
    UnsupportedCriticalExtension {
        extn_id: der::asn1::ObjectIdentifier,
    },

    #[error("malformed extension: {0}")]
    Extension(#[from] ExtensionError),

    #[error("DER processing failed: {0}")]
    Encoding(#[from] der::Error),
}

/// Parameters for attribute certificate validation.
#[derive(Clone, Debug)]
pub struct ACValidationConfig {
    /// Path from a trust anchor to the holder's certificate.
    pub holder_path: CertificationPath,

    /// Path from a trust anchor to the AC issuer's certificate.
    pub issuer_path: CertificationPath,

    /// Parameters both paths are validated under; its reference time is
    /// also the AC evaluation time.
    pub path_config: PathValidationConfig,

    /// Targets the caller is acting as; empty disables target checking.
    pub required_targets: Vec<Target>,
}

impl ACValidationConfig {
    pub fn new(
        holder_path: CertificationPath,
        issuer_path: CertificationPath,
        path_config: PathValidationConfig,
    ) -> Self {
        Self {
            holder_path,
            issuer_path,
            path_config,
            required_targets: Vec::new(),
        }
    }

    pub fn with_required_targets(mut self, targets: Vec<Target>) -> Self {
        self.required_targets = targets;
        self
    }
}

/// Validates `ac` under `config`, returning the certificate back on
/// success so calls chain naturally.
pub fn validate_attribute_certificate<'a>(
    ac: &'a AttributeCertificate,
    config: &ACValidationConfig,
) -> Result<&'a AttributeCertificate, ACError> {
    // the AC issuer's key must itself be trustworthy before it can vouch
    // for anything
    let issuer_result = config
        .issuer_path
        .validate(&config.path_config)
        .map_err(ACError::IssuerPathInvalid)?;
    let issuer_cert = config.issuer_path.target();
    debug!("AC issuer path validated: {}", issuer_cert.subject());

    if ac.acinfo.signature != ac.signature_algorithm {
        return Err(ACError::SignatureInvalid);
    }
    let message = ac.acinfo.to_der()?;
    let signature = ac.signature.as_bytes().ok_or(ACError::SignatureInvalid)?;
    match sign::verify_signature(
        &issuer_result.public_key,
        &ac.signature_algorithm,
        &message,
        signature,
    ) {
        Ok(()) => {}
        Err(SignatureError::VerificationFailed) => return Err(ACError::SignatureInvalid),
        Err(other) => return Err(ACError::Provider(other)),
    }

    let at = config.path_config.reference_time;
    let period = ac.validity_period();
    if at < period.not_before_time.to_unix_duration().as_secs() {
        return Err(ACError::NotYetValid);
    }
    if at > period.not_after_time.to_unix_duration().as_secs() {
        return Err(ACError::Expired);
    }

    config
        .holder_path
        .validate(&config.path_config)
        .map_err(ACError::HolderPathInvalid)?;
    let holder_cert = config.holder_path.target();
    debug!("holder path validated: {}", holder_cert.subject());

    check_holder(ac.holder(), holder_cert)?;
    check_issuer(ac.issuer(), issuer_cert)?;

    if let Some(extensions) = ac.extensions() {
        for ext in extensions.iter() {
            if ext.critical && !is_known_ac_extension(&ext.extn_id) {
                return Err(ACError::UnsupportedCriticalExtension {
                    extn_id: ext.extn_id,
                });
            }
        }
    }

    if !config.required_targets.is_empty() {
        let info = ac.target_information()?.ok_or(ACError::TargetMismatch)?;
        let targeted = info
            .iter()
            .any(|t| config.required_targets.iter().any(|r| t.matches(r)));
        if !targeted {
            return Err(ACError::TargetMismatch);
        }
    }

    info!("attribute certificate validated: serial={:?}", ac.acinfo.serial_number);
    Ok(ac)
}

/// Every holder form the AC carries must identify `holder_cert`.
fn check_holder(holder: &Holder, holder_cert: &Certificate) -> Result<(), ACError> {
    let mut any_form = false;

    if let Some(base_certificate_id) = &holder.base_certificate_id {
        any_form = true;
        if !base_certificate_id.identifies(holder_cert) {
            return Err(ACError::HolderMismatch);
        }
    }

    if let Some(entity_name) = &holder.entity_name {
        any_form = true;
        let san = holder_cert.subject_alt_name()?;
        let identified = entity_name.iter().any(|name| match name {
            GeneralName::DirectoryName(dn) => dn.matches(holder_cert.subject()),
            other => san
                .as_ref()
                .is_some_and(|san| san.0.iter().any(|alt| alt.matches(other))),
        });
        if !identified {
            return Err(ACError::HolderMismatch);
        }
    }

    if let Some(object_digest_info) = &holder.object_digest_info {
        any_form = true;
        let data = match object_digest_info.digested_object_type {
            DigestedObjectType::PublicKey => holder_cert.public_key().to_der()?,
            DigestedObjectType::PublicKeyCert => holder_cert.to_der()?,
            DigestedObjectType::OtherObjectTypes => return Err(ACError::HolderMismatch),
        };
        let expected = object_digest_info.object_digest.raw_bytes();
        let matched =
            sign::digest_matches(&object_digest_info.digest_algorithm, &data, expected)
                .map_err(ACError::Provider)?;
        if !matched {
            return Err(ACError::HolderMismatch);
        }
    }

    if !any_form {
        return Err(ACError::HolderMismatch);
    }
    Ok(())
}

/// The AC issuer must identify `issuer_cert`, the certificate whose key
/// verified the AC signature.
fn check_issuer(issuer: &AttCertIssuer, issuer_cert: &Certificate) -> Result<(), ACError> {
    match issuer {
        AttCertIssuer::V1Form(names) => check_issuer_name(names, issuer_cert),
        AttCertIssuer::V2Form(form) => {
            if form.issuer_name.is_none() && form.base_certificate_id.is_none() {
                return Err(ACError::IssuerMismatch);
            }
            if let Some(names) = &form.issuer_name {
                check_issuer_name(names, issuer_cert)?;
            }
            if let Some(base_certificate_id) = &form.base_certificate_id {
                if !base_certificate_id.identifies(issuer_cert) {
                    return Err(ACError::IssuerMismatch);
                }
            }
            Ok(())
        }
    }
}

/// RFC 5755 Section 4.2.3: the issuer names must hold exactly one
/// directoryName, matching the issuer certificate's subject.
fn check_issuer_name(
    names: &crate::name::GeneralNames,
    issuer_cert: &Certificate,
) -> Result<(), ACError> {
    match names.0.as_slice() {
        [GeneralName::DirectoryName(dn)] if dn.matches(issuer_cert.subject()) => Ok(()),
        _ => Err(ACError::IssuerMismatch),
    }
}
