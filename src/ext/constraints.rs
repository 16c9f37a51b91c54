//! Basic constraints, name constraints and the per-form constraint
//! matchers (RFC 5280 Sections 4.2.1.9 and 4.2.1.10).

use const_oid::AssociatedOid;
use der::{asn1::ObjectIdentifier, Sequence};

use super::ExtensionValue;
use crate::name::{GeneralName, Name};
use crate::oid;

/// `BasicConstraints` (RFC 5280 Section 4.2.1.9).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Sequence)]
pub struct BasicConstraints {
    #[asn1(default = "Default::default")]
    pub ca: bool,

    #[asn1(optional = "true")]
    pub path_len_constraint: Option<u32>,
}

impl AssociatedOid for BasicConstraints {
    const OID: ObjectIdentifier = oid::EXT_BASIC_CONSTRAINTS;
}

impl ExtensionValue for BasicConstraints {
    const CRITICAL: bool = true;
}

impl BasicConstraints {
    pub fn ca(path_len_constraint: Option<u32>) -> Self {
        Self {
            ca: true,
            path_len_constraint,
        }
    }
}

/// One subtree of a name constraint.
///
/// `minimum` and `maximum` are carried for round-tripping but ignored by
/// matching; RFC 5280 requires minimum=0 and absent maximum.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct GeneralSubtree {
    pub base: GeneralName,

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", default = "Default::default")]
    pub minimum: u32,

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub maximum: Option<u32>,
}

impl GeneralSubtree {
    pub fn new(base: GeneralName) -> Self {
        Self {
            base,
            minimum: 0,
            maximum: None,
        }
    }
}

/// `NameConstraints` (RFC 5280 Section 4.2.1.10).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct NameConstraints {
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub permitted_subtrees: Option<Vec<GeneralSubtree>>,

    #[asn1(
        context_specific = "1",
        tag_mode = "IMPLICIT",
        optional = "true",
        constructed = "true"
    )]
    pub excluded_subtrees: Option<Vec<GeneralSubtree>>,
}

impl AssociatedOid for NameConstraints {
    const OID: ObjectIdentifier = oid::EXT_NAME_CONSTRAINTS;
}

impl ExtensionValue for NameConstraints {
    const CRITICAL: bool = true;
}

/// Whether a constraint of `base`'s form applies to `name` at all
/// (constraints only restrict names of the same form).
pub(crate) fn same_form(base: &GeneralName, name: &GeneralName) -> bool {
    core::mem::discriminant(base) == core::mem::discriminant(name)
}

/// Whether `name` falls within the subtree rooted at `base`.
///
/// Forms without defined subtree semantics never match.
pub(crate) fn name_within(name: &GeneralName, base: &GeneralName) -> bool {
    match (name, base) {
        (GeneralName::DnsName(name), GeneralName::DnsName(base)) => {
            dns_name_matches(name.as_str(), base.as_str())
        }
        (GeneralName::Rfc822Name(name), GeneralName::Rfc822Name(base)) => {
            email_matches(name.as_str(), base.as_str())
        }
        (
            GeneralName::UniformResourceIdentifier(name),
            GeneralName::UniformResourceIdentifier(base),
        ) => dns_name_matches(uri_host(name.as_str()), base.as_str()),
        (GeneralName::IpAddress(name), GeneralName::IpAddress(base)) => {
            ip_matches(name.as_bytes(), base.as_bytes())
        }
        (GeneralName::DirectoryName(name), GeneralName::DirectoryName(base)) => {
            directory_name_within(name, base)
        }
        _ => false,
    }
}

/// A directoryName is within a subtree when the base is an initial
/// RDN sequence of it.
pub(crate) fn directory_name_within(name: &Name, base: &Name) -> bool {
    base.is_prefix_of(name)
}

/// dNSName constraint: a constraint matches the host itself and any
/// subdomain; a leading dot restricts to strict subdomains.
pub(crate) fn dns_name_matches(name: &str, constraint: &str) -> bool {
    if constraint.is_empty() {
        // empty constraint matches every dNSName
        return true;
    }
    let name = name.to_ascii_lowercase();
    let constraint = constraint.to_ascii_lowercase();
    if let Some(suffix) = constraint.strip_prefix('.') {
        return name.ends_with(&constraint) && name.len() > constraint.len() && !suffix.is_empty();
    }
    name == constraint || name.ends_with(&format!(".{constraint}"))
}

/// rfc822Name constraint: a full address constrains one mailbox, a host
/// constrains all mailboxes on it, a leading dot constrains a domain.
pub(crate) fn email_matches(email: &str, constraint: &str) -> bool {
    let email = email.to_ascii_lowercase();
    let constraint = constraint.to_ascii_lowercase();
    if constraint.contains('@') {
        return email == constraint;
    }
    let Some((_, host)) = email.rsplit_once('@') else {
        return false;
    };
    if constraint.starts_with('.') {
        return host.ends_with(&constraint);
    }
    host == constraint
}

/// iPAddress constraint: the constraint octets hold an address followed by
/// a mask of the same length.
pub(crate) fn ip_matches(addr: &[u8], constraint: &[u8]) -> bool {
    if constraint.len() != addr.len() * 2 || !matches!(addr.len(), 4 | 16) {
        return false;
    }
    let (base, mask) = constraint.split_at(addr.len());
    addr.iter()
        .zip(base)
        .zip(mask)
        .all(|((a, b), m)| a & m == b & m)
}

/// The host part of a URI reference, for uniformResourceIdentifier
/// constraints.
pub(crate) fn uri_host(uri: &str) -> &str {
    let rest = match uri.find("://") {
        Some(idx) => &uri[idx + 3..],
        None => uri,
    };
    let rest = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
    let end = rest
        .find(|c| matches!(c, ':' | '/' | '?' | '#'))
        .unwrap_or(rest.len());
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};

    #[test]
    fn dns_constraint_matching() {
        assert!(dns_name_matches("example.com", "example.com"));
        assert!(dns_name_matches("api.example.com", "example.com"));
        assert!(dns_name_matches("API.Example.COM", "example.com"));
        assert!(!dns_name_matches("badexample.com", "example.com"));
        assert!(!dns_name_matches("example.org", "example.com"));
        // leading dot excludes the bare host
        assert!(dns_name_matches("api.example.com", ".example.com"));
        assert!(!dns_name_matches("example.com", ".example.com"));
    }

    #[test]
    fn email_constraint_matching() {
        assert!(email_matches("user@example.com", "user@example.com"));
        assert!(!email_matches("other@example.com", "user@example.com"));
        assert!(email_matches("user@example.com", "example.com"));
        assert!(!email_matches("user@mail.example.com", "example.com"));
        assert!(email_matches("user@mail.example.com", ".example.com"));
    }

    #[test]
    fn ip_constraint_matching() {
        // 192.0.2.0/24
        let constraint = [192, 0, 2, 0, 255, 255, 255, 0];
        assert!(ip_matches(&[192, 0, 2, 77], &constraint));
        assert!(!ip_matches(&[192, 0, 3, 77], &constraint));
        // length mismatch never matches
        assert!(!ip_matches(&[192, 0, 2, 77, 0, 0], &constraint));
    }

    #[test]
    fn uri_host_extraction() {
        assert_eq!(uri_host("https://example.com/path"), "example.com");
        assert_eq!(uri_host("https://user@example.com:8443/x"), "example.com");
        assert_eq!(uri_host("ldap://example.com"), "example.com");
        assert_eq!(uri_host("example.com/x"), "example.com");
    }

    #[test]
    fn name_constraints_round_trip() {
        let nc = NameConstraints {
            permitted_subtrees: Some(vec![GeneralSubtree::new(
                GeneralName::dns("example.com").unwrap(),
            )]),
            excluded_subtrees: Some(vec![GeneralSubtree::new(
                GeneralName::dns("internal.example.com").unwrap(),
            )]),
        };
        let der = nc.to_der().unwrap();
        assert_eq!(NameConstraints::from_der(&der).unwrap(), nc);
    }
}
