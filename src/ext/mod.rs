//! X.509 extension plumbing and the typed extension models.
//!
//! [`Extensions`] enforces the RFC 5280 Section 4.2 rule that a certificate
//! must not carry two extensions with the same OID; duplicate OIDs are
//! rejected when the sequence is decoded. Typed access goes through the
//! [`ExtensionValue`] trait, which ties a value type to its OID and default
//! criticality.

pub mod constraints;
pub mod dp;
pub mod key_usage;
pub mod policy;
pub mod target;

use const_oid::AssociatedOid;
use der::{
    asn1::{ObjectIdentifier, OctetString},
    Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Sequence, Tag,
    Writer,
};

use crate::name::GeneralNames;
use crate::oid;

/// Errors raised by typed extension access.
#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("duplicate extension: {0}")]
    Duplicate(ObjectIdentifier),

    #[error("extension OID mismatch: expected {expected}, found {found}")]
    OidMismatch {
        expected: ObjectIdentifier,
        found: ObjectIdentifier,
    },

    #[error("malformed extension value: {0}")]
    Der(#[from] der::Error),
}

/// A raw `Extension` as defined in RFC 5280 Section 4.1.2.9.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Extension {
    pub extn_id: ObjectIdentifier,

    #[asn1(default = "Default::default")]
    pub critical: bool,

    pub extn_value: OctetString,
}

/// An extension value type with a fixed OID and default criticality.
pub trait ExtensionValue: AssociatedOid + Encode + for<'a> Decode<'a> {
    /// Criticality the extension is given when built through
    /// [`ExtensionValue::to_extension`].
    const CRITICAL: bool;

    /// Wraps the value into a raw [`Extension`].
    fn to_extension(&self) -> Result<Extension, ExtensionError> {
        Ok(Extension {
            extn_id: Self::OID,
            critical: Self::CRITICAL,
            extn_value: OctetString::new(self.to_der()?)?,
        })
    }

    /// Decodes the value out of a raw [`Extension`].
    fn from_extension(ext: &Extension) -> Result<Self, ExtensionError> {
        if ext.extn_id != Self::OID {
            return Err(ExtensionError::OidMismatch {
                expected: Self::OID,
                found: ext.extn_id,
            });
        }
        Ok(Self::from_der(ext.extn_value.as_bytes())?)
    }
}

/// The extension list of a certificate or attribute certificate.
///
/// Extension OIDs are unique; the invariant holds for decoded and
/// programmatically built lists alike.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Extensions(Vec<Extension>);

impl Extensions {
    pub fn new(extensions: Vec<Extension>) -> Result<Self, ExtensionError> {
        for (i, ext) in extensions.iter().enumerate() {
            if extensions[..i].iter().any(|e| e.extn_id == ext.extn_id) {
                return Err(ExtensionError::Duplicate(ext.extn_id));
            }
        }
        Ok(Self(extensions))
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Extension> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, extn_id: &ObjectIdentifier) -> Option<&Extension> {
        self.0.iter().find(|ext| ext.extn_id == *extn_id)
    }

    /// Adds an extension, replacing any existing one with the same OID.
    pub fn upsert(&mut self, ext: Extension) {
        match self.0.iter_mut().find(|e| e.extn_id == ext.extn_id) {
            Some(slot) => *slot = ext,
            None => self.0.push(ext),
        }
    }

    /// Decodes the extension of type `T`, if present.
    pub fn get_as<T: ExtensionValue>(&self) -> Result<Option<T>, ExtensionError> {
        match self.get(&T::OID) {
            Some(ext) => Ok(Some(T::from_extension(ext)?)),
            None => Ok(None),
        }
    }
}

impl FixedTag for Extensions {
    const TAG: Tag = Tag::Sequence;
}

impl<'a> DecodeValue<'a> for Extensions {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        let extensions = Vec::<Extension>::decode_value(reader, header)?;
        for (i, ext) in extensions.iter().enumerate() {
            if extensions[..i].iter().any(|e| e.extn_id == ext.extn_id) {
                return Err(reader.error(der::ErrorKind::Failed));
            }
        }
        Ok(Self(extensions))
    }
}

impl EncodeValue for Extensions {
    fn value_len(&self) -> der::Result<Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.encode_value(writer)
    }
}

/// `SubjectAltName` (RFC 5280 Section 4.2.1.6).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubjectAltName(pub GeneralNames);

impl_newtype!(SubjectAltName, GeneralNames);

impl AssociatedOid for SubjectAltName {
    const OID: ObjectIdentifier = oid::EXT_SUBJECT_ALT_NAME;
}

impl ExtensionValue for SubjectAltName {
    const CRITICAL: bool = false;
}

/// Public-key certificate extensions the validator understands; a critical
/// extension outside this set fails validation.
pub(crate) fn is_known_extension(extn_id: &ObjectIdentifier) -> bool {
    const KNOWN: &[ObjectIdentifier] = &[
        oid::EXT_SUBJECT_KEY_ID,
        oid::EXT_KEY_USAGE,
        oid::EXT_SUBJECT_ALT_NAME,
        oid::EXT_ISSUER_ALT_NAME,
        oid::EXT_BASIC_CONSTRAINTS,
        oid::EXT_NAME_CONSTRAINTS,
        oid::EXT_CRL_DISTRIBUTION_POINTS,
        oid::EXT_CERTIFICATE_POLICIES,
        oid::EXT_POLICY_MAPPINGS,
        oid::EXT_AUTHORITY_KEY_ID,
        oid::EXT_POLICY_CONSTRAINTS,
        oid::EXT_EXTENDED_KEY_USAGE,
        oid::EXT_FRESHEST_CRL,
        oid::EXT_INHIBIT_ANY_POLICY,
    ];
    KNOWN.contains(extn_id)
}

/// Attribute certificate extensions the AC validator understands
/// (RFC 5755 Section 4.3).
pub(crate) fn is_known_ac_extension(extn_id: &ObjectIdentifier) -> bool {
    const KNOWN: &[ObjectIdentifier] = &[
        oid::EXT_TARGET_INFORMATION,
        oid::EXT_NO_REV_AVAIL,
        oid::EXT_AUDIT_IDENTITY,
        oid::EXT_AUTHORITY_KEY_ID,
        oid::EXT_CRL_DISTRIBUTION_POINTS,
    ];
    KNOWN.contains(extn_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::constraints::BasicConstraints;
    use der::{Decode, Encode};

    #[test]
    fn duplicate_extension_oids_rejected() {
        let bc = BasicConstraints {
            ca: true,
            path_len_constraint: None,
        };
        let ext = bc.to_extension().unwrap();
        let err = Extensions::new(vec![ext.clone(), ext.clone()]).unwrap_err();
        assert!(matches!(err, ExtensionError::Duplicate(id) if id == oid::EXT_BASIC_CONSTRAINTS));

        let encoded = Extensions(vec![ext.clone(), ext]).to_der().unwrap();
        assert!(Extensions::from_der(&encoded).is_err());
    }

    #[test]
    fn typed_round_trip_through_raw_extension() {
        let bc = BasicConstraints {
            ca: true,
            path_len_constraint: Some(3),
        };
        let ext = bc.to_extension().unwrap();
        assert!(ext.critical);
        assert_eq!(BasicConstraints::from_extension(&ext).unwrap(), bc);
    }

    #[test]
    fn oid_mismatch_is_an_error() {
        let san = SubjectAltName(GeneralNames::single(
            crate::name::GeneralName::dns("example.com").unwrap(),
        ));
        let ext = san.to_extension().unwrap();
        assert!(matches!(
            BasicConstraints::from_extension(&ext),
            Err(ExtensionError::OidMismatch { .. })
        ));
    }

    #[test]
    fn upsert_replaces_same_oid() {
        let mut exts = Extensions::default();
        exts.upsert(
            BasicConstraints {
                ca: false,
                path_len_constraint: None,
            }
            .to_extension()
            .unwrap(),
        );
        exts.upsert(
            BasicConstraints {
                ca: true,
                path_len_constraint: None,
            }
            .to_extension()
            .unwrap(),
        );
        assert_eq!(exts.iter().count(), 1);
        let bc: BasicConstraints = exts.get_as().unwrap().unwrap();
        assert!(bc.ca);
    }
}
