//! CRL distribution point references (RFC 5280 Section 4.2.1.13).
//!
//! The crate never fetches revocation data; these types only carry the
//! references so callers can act on them.

use const_oid::AssociatedOid;
use der::{
    asn1::{BitString, ObjectIdentifier},
    Choice, Sequence,
};

use super::ExtensionValue;
use crate::name::{GeneralName, GeneralNames, RelativeDistinguishedName};
use crate::oid;

/// `CRLDistributionPoints` (RFC 5280 Section 4.2.1.13).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CrlDistributionPoints(pub Vec<DistributionPoint>);

impl_newtype!(CrlDistributionPoints, Vec<DistributionPoint>);

impl AssociatedOid for CrlDistributionPoints {
    const OID: ObjectIdentifier = oid::EXT_CRL_DISTRIBUTION_POINTS;
}

impl ExtensionValue for CrlDistributionPoints {
    const CRITICAL: bool = false;
}

/// One distribution point entry.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct DistributionPoint {
    #[asn1(
        context_specific = "0",
        tag_mode = "EXPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub distribution_point: Option<DistributionPointName>,

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub reasons: Option<BitString>,

    #[asn1(
        context_specific = "2",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub crl_issuer: Option<GeneralNames>,
}

impl DistributionPoint {
    /// A full-name distribution point holding a single URI.
    pub fn from_uri(uri: &str) -> der::Result<Self> {
        Ok(Self {
            distribution_point: Some(DistributionPointName::FullName(GeneralNames::single(
                GeneralName::uri(uri)?,
            ))),
            reasons: None,
            crl_issuer: None,
        })
    }
}

/// `DistributionPointName` (RFC 5280 Section 4.2.1.13).
#[derive(Choice, Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum DistributionPointName {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true")]
    FullName(GeneralNames),

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    NameRelativeToCrlIssuer(RelativeDistinguishedName),
}
