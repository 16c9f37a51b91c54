//! The RFC 5755 attribute certificate model.
//!
//! Mirrors the certificate module: `AttributeCertificateInfo` is both the
//! decoded TBS structure and the builder, and the signing helpers in
//! [`crate::sign`] produce the outer [`AttributeCertificate`].

use der::{
    asn1::{Any, BitString, ContextSpecific, GeneralizedTime, Int, ObjectIdentifier, OctetString,
           SetOfVec},
    pem::PemLabel,
    Decode, Encode, EncodeValue, Enumerated, Length, Reader, Sequence, Tag, TagNumber, Tagged,
    Writer,
};
use spki::AlgorithmIdentifierOwned;

use crate::cert::{serial_number, Certificate};
use crate::ext::{target::TargetInformation, Extension, ExtensionError, Extensions};
use crate::name::{GeneralName, GeneralNames};
use crate::oid;
use crate::sign;

/// Attribute certificate version; RFC 5755 only defines v2.
#[derive(Clone, Copy, Debug, Default, Enumerated, Eq, PartialEq)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
pub enum AttCertVersion {
    #[default]
    V2 = 1,
}

/// `IssuerSerial` (RFC 5755 Section 4.1): a certificate reference by
/// issuer name and serial number.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IssuerSerial {
    pub issuer: GeneralNames,
    pub serial: Int,

    #[asn1(optional = "true")]
    pub issuer_uid: Option<BitString>,
}

impl IssuerSerial {
    /// References `cert` by its issuer and serial.
    pub fn from_certificate(cert: &Certificate) -> Self {
        Self {
            issuer: GeneralNames::single(GeneralName::DirectoryName(cert.issuer().clone())),
            serial: cert.serial_number().clone(),
            issuer_uid: None,
        }
    }

    /// Whether this reference identifies `cert`.
    pub fn identifies(&self, cert: &Certificate) -> bool {
        self.issuer.contains_directory_name(cert.issuer()) && self.serial == *cert.serial_number()
    }
}

/// What an `ObjectDigestInfo` digest was computed over.
#[derive(Clone, Copy, Debug, Enumerated, Eq, PartialEq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum DigestedObjectType {
    PublicKey = 0,
    PublicKeyCert = 1,
    OtherObjectTypes = 2,
}

/// `ObjectDigestInfo` (RFC 5755 Section 4.1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ObjectDigestInfo {
    pub digested_object_type: DigestedObjectType,

    #[asn1(optional = "true")]
    pub other_object_type_id: Option<ObjectIdentifier>,

    pub digest_algorithm: AlgorithmIdentifierOwned,

    pub object_digest: BitString,
}

/// `Holder` (RFC 5755 Section 4.1). At least one of the three forms
/// should be present; RFC 5755 recommends `baseCertificateID` alone.
#[derive(Clone, Debug, Default, Eq, PartialEq, Sequence)]
pub struct Holder {
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub base_certificate_id: Option<IssuerSerial>,

    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub entity_name: Option<GeneralNames>,

    #[asn1(
        context_specific = "2",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub object_digest_info: Option<ObjectDigestInfo>,
}

impl Holder {
    /// Binds the holder to a public-key certificate by issuer and serial.
    pub fn from_certificate(cert: &Certificate) -> Self {
        Self {
            base_certificate_id: Some(IssuerSerial::from_certificate(cert)),
            ..Default::default()
        }
    }
}

/// `V2Form` (RFC 5755 Section 4.2.3).
#[derive(Clone, Debug, Default, Eq, PartialEq, Sequence)]
pub struct V2Form {
    #[asn1(optional = "true")]
    pub issuer_name: Option<GeneralNames>,

    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub base_certificate_id: Option<IssuerSerial>,

    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub object_digest_info: Option<ObjectDigestInfo>,
}

/// `AttCertIssuer` (RFC 5755 Section 4.2.3).
///
/// The v1 form is an untagged `GeneralNames`, the v2 form is tagged
/// `[0] IMPLICIT`; the derive machinery cannot express an untagged
/// variant, so the CHOICE plumbing is written out.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttCertIssuer {
    /// Obsolete v1 form, accepted for interoperability.
    V1Form(GeneralNames),

    /// The v2 form every conforming issuer uses.
    V2Form(V2Form),
}

impl AttCertIssuer {
    /// Names `cert`'s subject as the AC issuer, in v2 form.
    pub fn from_certificate(cert: &Certificate) -> Self {
        Self::V2Form(V2Form {
            issuer_name: Some(GeneralNames::single(GeneralName::DirectoryName(
                cert.subject().clone(),
            ))),
            ..Default::default()
        })
    }
}

impl<'a> Decode<'a> for AttCertIssuer {
    fn decode<R: Reader<'a>>(reader: &mut R) -> der::Result<Self> {
        let tag = reader.peek_tag()?;
        match tag {
            Tag::Sequence => Ok(Self::V1Form(GeneralNames::decode(reader)?)),
            Tag::ContextSpecific { number, .. } if number == TagNumber::N0 => {
                let form = ContextSpecific::<V2Form>::decode_implicit(reader, TagNumber::N0)?
                    .ok_or_else(|| {
                        der::Error::from(der::ErrorKind::TagUnexpected {
                            expected: None,
                            actual: tag,
                        })
                    })?;
                Ok(Self::V2Form(form.value))
            }
            actual => Err(der::ErrorKind::TagUnexpected {
                expected: Some(Tag::Sequence),
                actual,
            }
            .into()),
        }
    }
}

impl Tagged for AttCertIssuer {
    fn tag(&self) -> Tag {
        match self {
            Self::V1Form(_) => Tag::Sequence,
            Self::V2Form(_) => Tag::ContextSpecific {
                constructed: true,
                number: TagNumber::N0,
            },
        }
    }
}

impl EncodeValue for AttCertIssuer {
    fn value_len(&self) -> der::Result<Length> {
        match self {
            Self::V1Form(names) => names.value_len(),
            Self::V2Form(form) => form.value_len(),
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        match self {
            Self::V1Form(names) => names.encode_value(writer),
            Self::V2Form(form) => form.encode_value(writer),
        }
    }
}

/// `AttCertValidityPeriod` (RFC 5755 Section 4.1); always GeneralizedTime.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
pub struct AttCertValidityPeriod {
    pub not_before_time: GeneralizedTime,
    pub not_after_time: GeneralizedTime,
}

impl AttCertValidityPeriod {
    pub fn from_unix(not_before: u64, not_after: u64) -> der::Result<Self> {
        Ok(Self {
            not_before_time: GeneralizedTime::from_unix_duration(
                core::time::Duration::from_secs(not_before),
            )?,
            not_after_time: GeneralizedTime::from_unix_duration(core::time::Duration::from_secs(
                not_after,
            ))?,
        })
    }

    /// Whether `at` falls within the period. Both bounds are inclusive.
    pub fn contains(&self, at: u64) -> bool {
        self.not_before_time.to_unix_duration().as_secs() <= at
            && at <= self.not_after_time.to_unix_duration().as_secs()
    }
}

/// One attribute of an attribute certificate (X.501 `Attribute`).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Attribute {
    pub oid: ObjectIdentifier,
    pub values: SetOfVec<Any>,
}

impl Attribute {
    /// A single-valued attribute.
    pub fn new(attr_oid: ObjectIdentifier, value: &(impl EncodeValue + Tagged)) -> der::Result<Self> {
        Ok(Self {
            oid: attr_oid,
            values: SetOfVec::try_from(vec![Any::encode_from(value)?])?,
        })
    }
}

/// The attribute list of an attribute certificate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attributes(pub Vec<Attribute>);

impl_newtype!(Attributes, Vec<Attribute>);

impl Attributes {
    pub fn get(&self, attr_oid: &ObjectIdentifier) -> Option<&Attribute> {
        self.0.iter().find(|attr| attr.oid == *attr_oid)
    }

    fn first_value_as<T: for<'a> Decode<'a>>(
        &self,
        attr_oid: &ObjectIdentifier,
    ) -> der::Result<Option<T>> {
        match self.get(attr_oid).and_then(|attr| attr.values.iter().next()) {
            Some(value) => Ok(Some(T::from_der(&value.to_der()?)?)),
            None => Ok(None),
        }
    }

    /// The `id-aca-authenticationInfo` attribute, if present.
    pub fn authentication_info(&self) -> der::Result<Option<SvceAuthInfo>> {
        self.first_value_as(&oid::ATTR_AUTHENTICATION_INFO)
    }

    /// The `id-aca-accessIdentity` attribute, if present.
    pub fn access_identity(&self) -> der::Result<Option<SvceAuthInfo>> {
        self.first_value_as(&oid::ATTR_ACCESS_IDENTITY)
    }
}

/// `SvceAuthInfo` (RFC 5755 Section 4.4.1), the value type of the
/// authentication-info and access-identity attributes.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SvceAuthInfo {
    pub service: GeneralName,
    pub ident: GeneralName,

    #[asn1(optional = "true")]
    pub auth_info: Option<OctetString>,
}

/// `AttributeCertificateInfo` (RFC 5755 Section 4.1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AttributeCertificateInfo {
    pub version: AttCertVersion,
    pub holder: Holder,
    pub issuer: AttCertIssuer,
    pub signature: AlgorithmIdentifierOwned,
    pub serial_number: Int,
    pub attr_cert_validity_period: AttCertValidityPeriod,
    pub attributes: Attributes,

    #[asn1(optional = "true")]
    pub issuer_unique_id: Option<BitString>,

    #[asn1(optional = "true")]
    pub extensions: Option<Extensions>,
}

impl AttributeCertificateInfo {
    /// Starts a to-be-signed attribute certificate with serial number 1
    /// and no extensions.
    pub fn new(
        holder: Holder,
        issuer: AttCertIssuer,
        attr_cert_validity_period: AttCertValidityPeriod,
        attributes: Attributes,
    ) -> der::Result<Self> {
        Ok(Self {
            version: AttCertVersion::V2,
            holder,
            issuer,
            signature: sign::ecdsa_with_sha256(),
            serial_number: serial_number(1)?,
            attr_cert_validity_period,
            attributes,
            issuer_unique_id: None,
            extensions: None,
        })
    }

    pub fn with_serial_number(mut self, serial: Int) -> Self {
        self.serial_number = serial;
        self
    }

    /// Adds extensions, replacing earlier ones with the same OID.
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

/// A signed attribute certificate.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AttributeCertificate {
    pub acinfo: AttributeCertificateInfo,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: BitString,
}

impl PemLabel for AttributeCertificate {
    const PEM_LABEL: &'static str = "ATTRIBUTE CERTIFICATE";
}

impl AttributeCertificate {
    pub fn holder(&self) -> &Holder {
        &self.acinfo.holder
    }

    pub fn issuer(&self) -> &AttCertIssuer {
        &self.acinfo.issuer
    }

    pub fn validity_period(&self) -> &AttCertValidityPeriod {
        &self.acinfo.attr_cert_validity_period
    }

    pub fn attributes(&self) -> &Attributes {
        &self.acinfo.attributes
    }

    pub fn extensions(&self) -> Option<&Extensions> {
        self.acinfo.extensions.as_ref()
    }

    /// The targeting extension, if present.
    pub fn target_information(&self) -> Result<Option<TargetInformation>, ExtensionError> {
        match self.extensions() {
            Some(exts) => exts.get_as(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Name;

    fn general_names(cn: &str) -> GeneralNames {
        GeneralNames::single(GeneralName::DirectoryName(Name::common_name(cn).unwrap()))
    }

    #[test]
    fn att_cert_issuer_v2_round_trip() {
        let issuer = AttCertIssuer::V2Form(V2Form {
            issuer_name: Some(general_names("AA")),
            ..Default::default()
        });
        let der = issuer.to_der().unwrap();
        // [0] IMPLICIT, constructed
        assert_eq!(der[0], 0xa0);
        assert_eq!(AttCertIssuer::from_der(&der).unwrap(), issuer);
    }

    #[test]
    fn att_cert_issuer_v1_round_trip() {
        let issuer = AttCertIssuer::V1Form(general_names("AA"));
        let der = issuer.to_der().unwrap();
        assert_eq!(der[0], 0x30);
        assert_eq!(AttCertIssuer::from_der(&der).unwrap(), issuer);
    }

    #[test]
    fn holder_round_trip() {
        let holder = Holder {
            base_certificate_id: Some(IssuerSerial {
                issuer: general_names("CA"),
                serial: serial_number(7).unwrap(),
                issuer_uid: None,
            }),
            ..Default::default()
        };
        let der = holder.to_der().unwrap();
        assert_eq!(Holder::from_der(&der).unwrap(), holder);
    }

    #[test]
    fn attribute_access_helpers() {
        let svce = SvceAuthInfo {
            service: GeneralName::uri("urn:service").unwrap(),
            ident: GeneralName::rfc822("user@example.com").unwrap(),
            auth_info: None,
        };
        let attrs = Attributes(vec![
            Attribute::new(oid::ATTR_ACCESS_IDENTITY, &svce).unwrap()
        ]);
        assert_eq!(attrs.access_identity().unwrap().unwrap(), svce);
        assert!(attrs.authentication_info().unwrap().is_none());
    }
}
