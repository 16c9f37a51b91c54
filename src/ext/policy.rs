//! Certificate policies, policy mappings and policy inhibition extensions
//! (RFC 5280 Sections 4.2.1.4, 4.2.1.5, 4.2.1.11, 4.2.1.14).

use const_oid::AssociatedOid;
use der::{
    asn1::{Ia5String, ObjectIdentifier},
    Choice, Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Sequence,
    Tag, Writer,
};

use super::ExtensionValue;
use crate::oid;

/// `CertificatePolicies` (RFC 5280 Section 4.2.1.4).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificatePolicies(pub Vec<PolicyInformation>);

impl_newtype!(CertificatePolicies, Vec<PolicyInformation>);

impl AssociatedOid for CertificatePolicies {
    const OID: ObjectIdentifier = oid::EXT_CERTIFICATE_POLICIES;
}

impl ExtensionValue for CertificatePolicies {
    const CRITICAL: bool = false;
}

impl CertificatePolicies {
    /// A policy list holding just `anyPolicy`.
    pub fn any_policy() -> Self {
        Self(vec![PolicyInformation::new(oid::ANY_POLICY)])
    }

    pub fn iter(&self) -> core::slice::Iter<'_, PolicyInformation> {
        self.0.iter()
    }
}

/// One entry of the certificate policies extension.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct PolicyInformation {
    pub policy_identifier: ObjectIdentifier,

    #[asn1(optional = "true")]
    pub policy_qualifiers: Option<Vec<PolicyQualifierInfo>>,
}

impl PolicyInformation {
    pub fn new(policy_identifier: ObjectIdentifier) -> Self {
        Self {
            policy_identifier,
            policy_qualifiers: None,
        }
    }
}

/// `PolicyQualifierInfo` (RFC 5280 Section 4.2.1.4).
///
/// The qualifier set is closed: only the CPS URI and user notice
/// qualifiers are admitted, and an unknown qualifier OID is a decode
/// error rather than an opaque passthrough.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PolicyQualifierInfo {
    /// `id-qt-cps`: a pointer to a certification practice statement.
    CpsUri(Ia5String),

    /// `id-qt-unotice`: a notice for display to relying parties.
    UserNotice(UserNotice),
}

impl PolicyQualifierInfo {
    pub fn qualifier_id(&self) -> ObjectIdentifier {
        match self {
            Self::CpsUri(_) => oid::QUALIFIER_CPS,
            Self::UserNotice(_) => oid::QUALIFIER_UNOTICE,
        }
    }

    pub fn cps_uri(uri: &str) -> der::Result<Self> {
        Ok(Self::CpsUri(Ia5String::new(uri)?))
    }
}

impl FixedTag for PolicyQualifierInfo {
    const TAG: Tag = Tag::Sequence;
}

impl<'a> DecodeValue<'a> for PolicyQualifierInfo {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let qualifier_id = ObjectIdentifier::decode(reader)?;
            if qualifier_id == oid::QUALIFIER_CPS {
                Ok(Self::CpsUri(Ia5String::decode(reader)?))
            } else if qualifier_id == oid::QUALIFIER_UNOTICE {
                Ok(Self::UserNotice(UserNotice::decode(reader)?))
            } else {
                Err(der::ErrorKind::OidUnknown { oid: qualifier_id }.into())
            }
        })
    }
}

impl EncodeValue for PolicyQualifierInfo {
    fn value_len(&self) -> der::Result<Length> {
        match self {
            Self::CpsUri(uri) => oid::QUALIFIER_CPS.encoded_len()? + uri.encoded_len()?,
            Self::UserNotice(notice) => {
                oid::QUALIFIER_UNOTICE.encoded_len()? + notice.encoded_len()?
            }
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        match self {
            Self::CpsUri(uri) => {
                oid::QUALIFIER_CPS.encode(writer)?;
                uri.encode(writer)
            }
            Self::UserNotice(notice) => {
                oid::QUALIFIER_UNOTICE.encode(writer)?;
                notice.encode(writer)
            }
        }
    }
}

/// `UserNotice` (RFC 5280 Section 4.2.1.4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct UserNotice {
    #[asn1(optional = "true")]
    pub notice_ref: Option<NoticeReference>,

    #[asn1(optional = "true")]
    pub explicit_text: Option<DisplayText>,
}

/// `NoticeReference` (RFC 5280 Section 4.2.1.4).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct NoticeReference {
    pub organization: DisplayText,
    pub notice_numbers: Vec<u32>,
}

/// `DisplayText`, restricted to the string types in common use.
#[derive(Choice, Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum DisplayText {
    #[asn1(type = "IA5String")]
    Ia5String(Ia5String),

    #[asn1(type = "UTF8String")]
    Utf8String(String),
}

/// `PolicyMappings` (RFC 5280 Section 4.2.1.5).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PolicyMappings(pub Vec<PolicyMapping>);

impl_newtype!(PolicyMappings, Vec<PolicyMapping>);

impl AssociatedOid for PolicyMappings {
    const OID: ObjectIdentifier = oid::EXT_POLICY_MAPPINGS;
}

impl ExtensionValue for PolicyMappings {
    const CRITICAL: bool = true;
}

impl PolicyMappings {
    pub fn iter(&self) -> core::slice::Iter<'_, PolicyMapping> {
        self.0.iter()
    }
}

/// One issuer-domain to subject-domain policy mapping.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub struct PolicyMapping {
    pub issuer_domain_policy: ObjectIdentifier,
    pub subject_domain_policy: ObjectIdentifier,
}

/// `PolicyConstraints` (RFC 5280 Section 4.2.1.11).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Sequence)]
pub struct PolicyConstraints {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub require_explicit_policy: Option<u32>,

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub inhibit_policy_mapping: Option<u32>,
}

impl AssociatedOid for PolicyConstraints {
    const OID: ObjectIdentifier = oid::EXT_POLICY_CONSTRAINTS;
}

impl ExtensionValue for PolicyConstraints {
    const CRITICAL: bool = true;
}

/// `InhibitAnyPolicy` (RFC 5280 Section 4.2.1.14).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InhibitAnyPolicy(pub u32);

impl_newtype!(InhibitAnyPolicy, u32);

impl AssociatedOid for InhibitAnyPolicy {
    const OID: ObjectIdentifier = oid::EXT_INHIBIT_ANY_POLICY;
}

impl ExtensionValue for InhibitAnyPolicy {
    const CRITICAL: bool = true;
}
