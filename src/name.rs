//! X.501 distinguished names and the `GeneralName` forms that reference them.
//!
//! Name comparison follows RFC 5280 Section 7.1: string-valued attributes
//! are matched case-insensitively with internal whitespace collapsed, any
//! other attribute value is matched on its encoding.

use core::fmt;

use der::{
    asn1::{Any, Ia5String, ObjectIdentifier, OctetString, SetOfVec, Utf8StringRef},
    Choice, Sequence, Tag, Tagged, ValueOrd,
};

use crate::oid;

/// A single attribute of a relative distinguished name, e.g. `CN=CA`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct AttributeTypeAndValue {
    pub oid: ObjectIdentifier,
    pub value: Any,
}

impl AttributeTypeAndValue {
    /// Builds an attribute with a UTF8String value.
    pub fn utf8(oid: ObjectIdentifier, value: &str) -> der::Result<Self> {
        let value = Any::encode_from(&Utf8StringRef::new(value)?)?;
        Ok(Self { oid, value })
    }

    /// The attribute value as a string, when it carries one of the
    /// directory string types.
    pub fn value_str(&self) -> Option<&str> {
        match self.value.tag() {
            Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
                core::str::from_utf8(self.value.value()).ok()
            }
            _ => None,
        }
    }
}

/// `RelativeDistinguishedName` as defined in RFC 5280 Section 4.1.2.4.
pub type RelativeDistinguishedName = SetOfVec<AttributeTypeAndValue>;

/// An X.501 `Name`: a sequence of relative distinguished names.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Name(pub Vec<RelativeDistinguishedName>);

impl_newtype!(Name, Vec<RelativeDistinguishedName>);

impl Name {
    /// Builds a name from `(attribute, value)` pairs, one RDN per pair.
    pub fn from_attrs<'a>(
        attrs: impl IntoIterator<Item = (ObjectIdentifier, &'a str)>,
    ) -> der::Result<Self> {
        let mut rdns = Vec::new();
        for (attr_oid, value) in attrs {
            let atv = AttributeTypeAndValue::utf8(attr_oid, value)?;
            rdns.push(RelativeDistinguishedName::try_from(vec![atv])?);
        }
        Ok(Self(rdns))
    }

    /// Builds a single-RDN name `CN=<common_name>`.
    pub fn common_name(common_name: &str) -> der::Result<Self> {
        Self::from_attrs([(oid::COMMON_NAME, common_name)])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All values of the given attribute type across every RDN.
    pub fn attr_values(&self, attr_oid: &ObjectIdentifier) -> Vec<&AttributeTypeAndValue> {
        self.0
            .iter()
            .flat_map(|rdn| rdn.iter())
            .filter(|atv| atv.oid == *attr_oid)
            .collect()
    }

    /// Directory name matching per RFC 5280 Section 7.1.
    pub fn matches(&self, other: &Name) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| rdn_matches(a, b))
    }

    /// Whether `self` is an initial sequence of RDNs of `other`, used for
    /// directoryName constraint subtrees.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| rdn_matches(a, b))
    }
}

fn rdn_matches(a: &RelativeDistinguishedName, b: &RelativeDistinguishedName) -> bool {
    a.len() == b.len()
        && a.iter().all(|atv_a| {
            b.iter()
                .any(|atv_b| atv_a.oid == atv_b.oid && value_matches(&atv_a.value, &atv_b.value))
        })
}

fn value_matches(a: &Any, b: &Any) -> bool {
    match (string_value(a), string_value(b)) {
        (Some(a), Some(b)) => normalize(a) == normalize(b),
        _ => a == b,
    }
}

fn string_value(value: &Any) -> Option<&str> {
    match value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
            core::str::from_utf8(value.value()).ok()
        }
        _ => None,
    }
}

// caseIgnoreMatch: fold case, trim, collapse internal whitespace.
fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl fmt::Display for Name {
    /// One-line rendering in the `CN=EE, O=Acme` style.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            for (j, atv) in rdn.iter().enumerate() {
                if j > 0 {
                    write!(f, "+")?;
                }
                write!(f, "{}=", attr_short_name(&atv.oid))?;
                match atv.value_str() {
                    Some(s) => write!(f, "{s}")?,
                    None => {
                        write!(f, "#")?;
                        for byte in atv.value.value() {
                            write!(f, "{byte:02x}")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn attr_short_name(attr_oid: &ObjectIdentifier) -> String {
    if *attr_oid == oid::COMMON_NAME {
        "CN".into()
    } else if *attr_oid == oid::COUNTRY {
        "C".into()
    } else if *attr_oid == oid::LOCALITY {
        "L".into()
    } else if *attr_oid == oid::STATE_OR_PROVINCE {
        "ST".into()
    } else if *attr_oid == oid::ORGANIZATION {
        "O".into()
    } else if *attr_oid == oid::ORGANIZATIONAL_UNIT {
        "OU".into()
    } else if *attr_oid == oid::SURNAME {
        "SN".into()
    } else if *attr_oid == oid::SERIAL_NUMBER {
        "serialNumber".into()
    } else if *attr_oid == oid::EMAIL_ADDRESS {
        "emailAddress".into()
    } else if *attr_oid == oid::DOMAIN_COMPONENT {
        "DC".into()
    } else {
        attr_oid.to_string()
    }
}

/// `OtherName` as defined in RFC 5280 Section 4.2.1.6.
#[derive(Clone, Debug, Eq, PartialEq, Sequence, ValueOrd)]
pub struct OtherName {
    pub type_id: ObjectIdentifier,

    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    pub value: Any,
}

/// `GeneralName` as defined in RFC 5280 Section 4.2.1.6.
///
/// The `x400Address` and `ediPartyName` forms are not modeled; encountering
/// one is a decode error.
#[derive(Choice, Clone, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum GeneralName {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true")]
    OtherName(OtherName),

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT")]
    Rfc822Name(Ia5String),

    #[asn1(context_specific = "2", tag_mode = "IMPLICIT")]
    DnsName(Ia5String),

    #[asn1(context_specific = "4", tag_mode = "EXPLICIT", constructed = "true")]
    DirectoryName(Name),

    #[asn1(context_specific = "6", tag_mode = "IMPLICIT")]
    UniformResourceIdentifier(Ia5String),

    #[asn1(context_specific = "7", tag_mode = "IMPLICIT")]
    IpAddress(OctetString),

    #[asn1(context_specific = "8", tag_mode = "IMPLICIT")]
    RegisteredId(ObjectIdentifier),
}

impl GeneralName {
    pub fn dns(name: &str) -> der::Result<Self> {
        Ok(Self::DnsName(Ia5String::new(name)?))
    }

    pub fn rfc822(addr: &str) -> der::Result<Self> {
        Ok(Self::Rfc822Name(Ia5String::new(addr)?))
    }

    pub fn uri(uri: &str) -> der::Result<Self> {
        Ok(Self::UniformResourceIdentifier(Ia5String::new(uri)?))
    }

    pub fn ip(addr: &[u8]) -> der::Result<Self> {
        Ok(Self::IpAddress(OctetString::new(addr)?))
    }

    pub fn directory_name(name: Name) -> Self {
        Self::DirectoryName(name)
    }

    /// Semantic equality: host-style forms compare case-insensitively,
    /// directory names per X.501 matching, the rest on their encoding.
    pub fn matches(&self, other: &GeneralName) -> bool {
        match (self, other) {
            (Self::Rfc822Name(a), Self::Rfc822Name(b))
            | (Self::DnsName(a), Self::DnsName(b))
            | (Self::UniformResourceIdentifier(a), Self::UniformResourceIdentifier(b)) => {
                a.as_str().eq_ignore_ascii_case(b.as_str())
            }
            (Self::DirectoryName(a), Self::DirectoryName(b)) => a.matches(b),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for GeneralName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OtherName(other) => write!(f, "otherName:{}", other.type_id),
            Self::Rfc822Name(addr) => write!(f, "email:{}", addr.as_str()),
            Self::DnsName(name) => write!(f, "dns:{}", name.as_str()),
            Self::DirectoryName(name) => write!(f, "dirName:{name}"),
            Self::UniformResourceIdentifier(uri) => write!(f, "uri:{}", uri.as_str()),
            Self::IpAddress(addr) => {
                write!(f, "ip:")?;
                for (i, byte) in addr.as_bytes().iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{byte}")?;
                }
                Ok(())
            }
            Self::RegisteredId(rid) => write!(f, "rid:{rid}"),
        }
    }
}

/// `GeneralNames`: a non-empty sequence of [`GeneralName`] values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralNames(pub Vec<GeneralName>);

impl der::FixedTag for GeneralNames {
    const TAG: Tag = <Vec<GeneralName> as der::FixedTag>::TAG;
}

impl<'a> der::DecodeValue<'a> for GeneralNames {
    fn decode_value<R: der::Reader<'a>>(
        reader: &mut R,
        header: der::Header,
    ) -> der::Result<Self> {
        let names = Vec::<GeneralName>::decode_value(reader, header)?;
        // SEQUENCE SIZE (1..MAX) OF GeneralName
        if names.is_empty() {
            return Err(reader.error(der::ErrorKind::Length {
                tag: <Self as der::FixedTag>::TAG,
            }));
        }
        Ok(Self(names))
    }
}

impl der::EncodeValue for GeneralNames {
    fn value_len(&self) -> der::Result<der::Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl der::Writer) -> der::Result<()> {
        self.0.encode_value(writer)
    }
}

impl From<Vec<GeneralName>> for GeneralNames {
    fn from(names: Vec<GeneralName>) -> Self {
        Self(names)
    }
}

impl AsRef<Vec<GeneralName>> for GeneralNames {
    fn as_ref(&self) -> &Vec<GeneralName> {
        &self.0
    }
}

impl GeneralNames {
    pub fn single(name: GeneralName) -> Self {
        Self(vec![name])
    }

    pub fn iter(&self) -> core::slice::Iter<'_, GeneralName> {
        self.0.iter()
    }

    /// Whether any entry is a `directoryName` matching `name`.
    pub fn contains_directory_name(&self, name: &Name) -> bool {
        self.iter()
            .any(|gn| matches!(gn, GeneralName::DirectoryName(dn) if dn.matches(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};

    fn name(s: &str) -> Name {
        Name::common_name(s).unwrap()
    }

    #[test]
    fn directory_names_match_case_insensitively() {
        assert!(name("Acme CA").matches(&name("ACME  ca")));
        assert!(!name("Acme CA").matches(&name("Acme CA 2")));
    }

    #[test]
    fn name_prefix_matching() {
        let base = Name::from_attrs([(oid::ORGANIZATION, "Acme")]).unwrap();
        let full =
            Name::from_attrs([(oid::ORGANIZATION, "acme"), (oid::COMMON_NAME, "EE")]).unwrap();
        assert!(base.is_prefix_of(&full));
        assert!(!full.is_prefix_of(&base));
    }

    #[test]
    fn name_round_trip() {
        let original = Name::from_attrs([
            (oid::ORGANIZATION, "Acme"),
            (oid::COMMON_NAME, "Intermediate CA"),
        ])
        .unwrap();
        let der = original.to_der().unwrap();
        let decoded = Name::from_der(&der).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(decoded.to_string(), "O=Acme, CN=Intermediate CA");
    }

    #[test]
    fn general_name_round_trip() {
        let names = GeneralNames(vec![
            GeneralName::dns("example.com").unwrap(),
            GeneralName::rfc822("user@example.com").unwrap(),
            GeneralName::uri("https://example.com/ca").unwrap(),
            GeneralName::ip(&[192, 0, 2, 1]).unwrap(),
            GeneralName::directory_name(name("CA")),
        ]);
        let der = names.to_der().unwrap();
        assert_eq!(GeneralNames::from_der(&der).unwrap(), names);
    }

    #[test]
    fn empty_general_names_rejected_at_decode() {
        // SEQUENCE SIZE (1..MAX): an empty sequence is malformed
        assert!(GeneralNames::from_der(&[0x30, 0x00]).is_err());
        assert!(GeneralNames::from_der(
            &GeneralNames::single(GeneralName::dns("example.com").unwrap())
                .to_der()
                .unwrap()
        )
        .is_ok());
    }

    #[test]
    fn general_name_semantic_matching() {
        let a = GeneralName::dns("Example.COM").unwrap();
        let b = GeneralName::dns("example.com").unwrap();
        assert!(a.matches(&b));
        assert!(!a.matches(&GeneralName::dns("example.org").unwrap()));
        // different forms never match
        assert!(!a.matches(&GeneralName::uri("example.com").unwrap()));
    }
}
