//! The X.509 public-key certificate model (RFC 5280 Section 4.1).
//!
//! `TbsCertificate` doubles as the certificate builder: it is constructed
//! with the mandatory fields, refined through consuming `with_*` methods,
//! and turned into a [`Certificate`] by the signing helpers in
//! [`crate::sign`].

use core::time::Duration;

use der::{
    asn1::{BitString, GeneralizedTime, Int, UtcTime},
    pem::PemLabel,
    Choice, Enumerated, Sequence,
};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::ext::{Extension, ExtensionError, ExtensionValue, Extensions};
use crate::ext::{
    constraints::{BasicConstraints, NameConstraints},
    dp::CrlDistributionPoints,
    key_usage::KeyUsage,
    policy::{CertificatePolicies, InhibitAnyPolicy, PolicyConstraints, PolicyMappings},
    SubjectAltName,
};
use crate::name::Name;
use crate::sign;

/// Certificate version (RFC 5280 Section 4.1.2.1).
#[derive(Clone, Copy, Debug, Default, Enumerated, Eq, Ord, PartialEq, PartialOrd)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
pub enum Version {
    V1 = 0,
    V2 = 1,
    #[default]
    V3 = 2,
}

/// `Time` (RFC 5280 Section 4.1.2.5).
#[derive(Choice, Clone, Copy, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum Time {
    #[asn1(type = "UTCTime")]
    UtcTime(UtcTime),

    #[asn1(type = "GeneralizedTime")]
    GeneralTime(GeneralizedTime),
}

impl Time {
    pub fn to_unix_secs(&self) -> u64 {
        match self {
            Time::UtcTime(t) => t.to_unix_duration().as_secs(),
            Time::GeneralTime(t) => t.to_unix_duration().as_secs(),
        }
    }

    pub fn from_unix_secs(secs: u64) -> der::Result<Self> {
        Ok(Time::GeneralTime(GeneralizedTime::from_unix_duration(
            Duration::from_secs(secs),
        )?))
    }
}

/// `Validity` (RFC 5280 Section 4.1.2.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub struct Validity {
    pub not_before: Time,
    pub not_after: Time,
}

impl Validity {
    pub fn from_unix(not_before: u64, not_after: u64) -> der::Result<Self> {
        Ok(Self {
            not_before: Time::from_unix_secs(not_before)?,
            not_after: Time::from_unix_secs(not_after)?,
        })
    }

    /// Whether `at` falls within the period. Both bounds are inclusive.
    pub fn contains(&self, at: u64) -> bool {
        self.not_before.to_unix_secs() <= at && at <= self.not_after.to_unix_secs()
    }
}

/// Encodes a serial number as a minimal positive INTEGER.
pub fn serial_number(value: u64) -> der::Result<Int> {
    let be = value.to_be_bytes();
    let start = be.iter().position(|&b| b != 0).unwrap_or(be.len() - 1);
    let mut bytes = Vec::with_capacity(be.len() - start + 1);
    if be[start] & 0x80 != 0 {
        bytes.push(0);
    }
    bytes.extend_from_slice(&be[start..]);
    Int::new(&bytes)
}

/// `TBSCertificate` (RFC 5280 Section 4.1.2).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TbsCertificate {
    #[asn1(context_specific = "0", default = "Default::default")]
    pub version: Version,

    pub serial_number: Int,

    pub signature: AlgorithmIdentifierOwned,

    pub issuer: Name,

    pub validity: Validity,

    pub subject: Name,

    pub subject_public_key_info: SubjectPublicKeyInfoOwned,

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub issuer_unique_id: Option<BitString>,

    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", optional = "true")]
    pub subject_unique_id: Option<BitString>,

    #[asn1(context_specific = "3", tag_mode = "EXPLICIT", optional = "true")]
    pub extensions: Option<Extensions>,
}

impl TbsCertificate {
    /// Starts a to-be-signed certificate with serial number 1 and no
    /// extensions. The signature algorithm is set when the certificate
    /// is signed.
    pub fn new(
        subject: Name,
        subject_public_key_info: SubjectPublicKeyInfoOwned,
        issuer: Name,
        validity: Validity,
    ) -> der::Result<Self> {
        Ok(Self {
            version: Version::V3,
            serial_number: serial_number(1)?,
            signature: sign::ecdsa_with_sha256(),
            issuer,
            validity,
            subject,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: None,
        })
    }

    pub fn with_serial_number(mut self, serial: Int) -> Self {
        self.serial_number = serial;
        self
    }

    /// Takes the issuer name from an existing certificate.
    pub fn with_issuer_certificate(mut self, issuer: &Certificate) -> Self {
        self.issuer = issuer.subject().clone();
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Adds typed extension values, replacing earlier ones with the same
    /// OID.
    pub fn with_additional_extensions(
        mut self,
        extensions: impl IntoIterator<Item = Extension>,
    ) -> Self {
        let exts = self.extensions.get_or_insert_with(Extensions::default);
        for ext in extensions {
            exts.upsert(ext);
        }
        self
    }
}

/// A signed X.509 certificate.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Certificate {
    pub tbs_certificate: TbsCertificate,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: BitString,
}

impl PemLabel for Certificate {
    const PEM_LABEL: &'static str = "CERTIFICATE";
}

impl Certificate {
    pub fn subject(&self) -> &Name {
        &self.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.tbs_certificate.issuer
    }

    pub fn validity(&self) -> &Validity {
        &self.tbs_certificate.validity
    }

    pub fn serial_number(&self) -> &Int {
        &self.tbs_certificate.serial_number
    }

    pub fn public_key(&self) -> &SubjectPublicKeyInfoOwned {
        &self.tbs_certificate.subject_public_key_info
    }

    pub fn extensions(&self) -> Option<&Extensions> {
        self.tbs_certificate.extensions.as_ref()
    }

    /// A certificate is self-issued when subject and issuer name match
    /// (RFC 5280 Section 6.1); such certificates are exempt from several
    /// path-processing rules.
    pub fn is_self_issued(&self) -> bool {
        self.subject().matches(self.issuer())
    }

    fn extension<T: ExtensionValue>(&self) -> Result<Option<T>, ExtensionError> {
        match self.extensions() {
            Some(exts) => exts.get_as::<T>(),
            None => Ok(None),
        }
    }

    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>, ExtensionError> {
        self.extension()
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>, ExtensionError> {
        self.extension()
    }

    pub fn name_constraints(&self) -> Result<Option<NameConstraints>, ExtensionError> {
        self.extension()
    }

    pub fn certificate_policies(&self) -> Result<Option<CertificatePolicies>, ExtensionError> {
        self.extension()
    }

    pub fn policy_mappings(&self) -> Result<Option<PolicyMappings>, ExtensionError> {
        self.extension()
    }

    pub fn policy_constraints(&self) -> Result<Option<PolicyConstraints>, ExtensionError> {
        self.extension()
    }

    pub fn inhibit_any_policy(&self) -> Result<Option<InhibitAnyPolicy>, ExtensionError> {
        self.extension()
    }

    pub fn subject_alt_name(&self) -> Result<Option<SubjectAltName>, ExtensionError> {
        self.extension()
    }

    pub fn crl_distribution_points(&self) -> Result<Option<CrlDistributionPoints>, ExtensionError> {
        self.extension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Encode;

    #[test]
    fn validity_bounds_are_inclusive() {
        let validity = Validity::from_unix(1_000, 2_000).unwrap();
        assert!(validity.contains(1_000));
        assert!(validity.contains(1_500));
        assert!(validity.contains(2_000));
        assert!(!validity.contains(999));
        assert!(!validity.contains(2_001));
    }

    #[test]
    fn serial_numbers_encode_minimally() {
        // 1 -> 02 01 01
        assert_eq!(serial_number(1).unwrap().to_der().unwrap(), [2, 1, 1]);
        // 128 needs a leading zero octet to stay positive
        assert_eq!(
            serial_number(128).unwrap().to_der().unwrap(),
            [2, 2, 0, 128]
        );
        assert_eq!(serial_number(0).unwrap().to_der().unwrap(), [2, 1, 0]);
    }

    #[test]
    fn time_survives_unix_round_trip() {
        let t = Time::from_unix_secs(1_700_000_000).unwrap();
        assert_eq!(t.to_unix_secs(), 1_700_000_000);
    }
}
