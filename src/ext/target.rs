//! Attribute certificate targeting (RFC 5755 Section 4.3.2).

use const_oid::AssociatedOid;
use der::{asn1::ObjectIdentifier, Choice};

use super::ExtensionValue;
use crate::name::GeneralName;
use crate::oid;

/// One target of an attribute certificate.
///
/// The tags are explicit because `GeneralName` is itself a CHOICE. The
/// `targetCert` form is obsolete per RFC 5755 and not modeled.
#[derive(Choice, Clone, Debug, Eq, PartialEq)]
pub enum Target {
    /// A single server or service the AC may be presented to.
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", constructed = "true")]
    TargetName(GeneralName),

    /// A group of targets, named collectively.
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", constructed = "true")]
    TargetGroup(GeneralName),
}

impl Target {
    /// Whether two targets identify the same name or the same group.
    ///
    /// A name never matches a group; evaluating group membership would
    /// require data the certificate does not carry.
    pub fn matches(&self, other: &Target) -> bool {
        match (self, other) {
            (Self::TargetName(a), Self::TargetName(b))
            | (Self::TargetGroup(a), Self::TargetGroup(b)) => a.matches(b),
            _ => false,
        }
    }
}

/// `Targets`: one SEQUENCE OF Target.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Targets(pub Vec<Target>);

impl_newtype!(Targets, Vec<Target>);

/// `TargetInformation` — the AC targeting extension, a sequence of
/// [`Targets`] batches. RFC 5755 requires it to be critical.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetInformation(pub Vec<Targets>);

impl_newtype!(TargetInformation, Vec<Targets>);

impl AssociatedOid for TargetInformation {
    const OID: ObjectIdentifier = oid::EXT_TARGET_INFORMATION;
}

impl ExtensionValue for TargetInformation {
    const CRITICAL: bool = true;
}

impl TargetInformation {
    /// Wraps a flat target list into a single batch.
    pub fn from_targets(targets: Vec<Target>) -> Self {
        Self(vec![Targets(targets)])
    }

    /// Iterates every target across all batches.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.0.iter().flat_map(|batch| batch.0.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};

    #[test]
    fn target_information_round_trip() {
        let info = TargetInformation::from_targets(vec![
            Target::TargetName(GeneralName::dns("test").unwrap()),
            Target::TargetGroup(GeneralName::dns("printers.example.com").unwrap()),
        ]);
        let der = info.to_der().unwrap();
        assert_eq!(TargetInformation::from_der(&der).unwrap(), info);
        assert_eq!(info.iter().count(), 2);
    }

    #[test]
    fn target_matching_is_form_sensitive() {
        let name = Target::TargetName(GeneralName::dns("test").unwrap());
        let name_upper = Target::TargetName(GeneralName::dns("TEST").unwrap());
        let group = Target::TargetGroup(GeneralName::dns("test").unwrap());
        assert!(name.matches(&name_upper));
        assert!(!name.matches(&group));
    }
}
