//! xpki-lib: X.509 certification path and attribute certificate
//! validation.
//!
//! Provides an owned data model for X.509 public-key certificates
//! (RFC 5280) and attribute certificates (RFC 5755), a certification
//! path builder, the RFC 5280 Section 6.1 path validation algorithm
//! with full policy processing, and an RFC 5755 attribute certificate
//! validator.
//!
//! Validation is deterministic: the caller supplies the reference time
//! and trust anchors, and no clock, network or system trust store is
//! ever consulted.

#[macro_use]
mod macros;

pub mod ac;
pub mod ac_validation;
pub mod cert;
pub mod ext;
pub mod name;
pub mod oid;
pub mod path;
pub mod sign;

pub use ac::{
    AttCertIssuer, AttCertValidityPeriod, Attribute, AttributeCertificate,
    AttributeCertificateInfo, Attributes, DigestedObjectType, Holder, IssuerSerial,
    ObjectDigestInfo, SvceAuthInfo, V2Form,
};
pub use ac_validation::{validate_attribute_certificate, ACError, ACValidationConfig};
pub use cert::{serial_number, Certificate, TbsCertificate, Time, Validity, Version};
pub use ext::{
    constraints::{BasicConstraints, GeneralSubtree, NameConstraints},
    key_usage::{KeyUsage, KeyUsages},
    policy::{
        CertificatePolicies, InhibitAnyPolicy, PolicyConstraints, PolicyInformation,
        PolicyMappings, PolicyQualifierInfo,
    },
    target::{Target, TargetInformation, Targets},
    Extension, ExtensionError, ExtensionValue, Extensions, SubjectAltName,
};
pub use name::{GeneralName, GeneralNames, Name, RelativeDistinguishedName};
pub use path::{
    CertificationPath, PathBuildError, PathError, PathValidationConfig, PathValidationResult,
    PolicyTree,
};
pub use sign::{
    ecdsa_with_sha256, ecdsa_with_sha384, p256_subject_public_key_info, sign_attribute_certificate,
    sign_certificate, sign_ecdsa_p256, verify_signature, SignatureError,
};
