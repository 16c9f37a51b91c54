//! Key usage extension (RFC 5280 Section 4.2.1.3).

use const_oid::AssociatedOid;
use der::asn1::ObjectIdentifier;
use flagset::{flags, FlagSet};

use super::ExtensionValue;
use crate::oid;

flags! {
    /// The individual bits of the `KeyUsage` BIT STRING.
    #[allow(missing_docs)]
    pub enum KeyUsages: u16 {
        DigitalSignature = 1 << 0,
        NonRepudiation = 1 << 1,
        KeyEncipherment = 1 << 2,
        DataEncipherment = 1 << 3,
        KeyAgreement = 1 << 4,
        KeyCertSign = 1 << 5,
        CrlSign = 1 << 6,
        EncipherOnly = 1 << 7,
        DecipherOnly = 1 << 8,
    }
}

/// `KeyUsage` (RFC 5280 Section 4.2.1.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl_newtype!(KeyUsage, FlagSet<KeyUsages>);

impl AssociatedOid for KeyUsage {
    const OID: ObjectIdentifier = oid::EXT_KEY_USAGE;
}

impl ExtensionValue for KeyUsage {
    const CRITICAL: bool = true;
}

impl From<KeyUsages> for KeyUsage {
    fn from(usage: KeyUsages) -> Self {
        Self(usage.into())
    }
}

impl KeyUsage {
    pub fn key_cert_sign(&self) -> bool {
        self.0.contains(KeyUsages::KeyCertSign)
    }

    pub fn digital_signature(&self) -> bool {
        self.0.contains(KeyUsages::DigitalSignature)
    }

    pub fn crl_sign(&self) -> bool {
        self.0.contains(KeyUsages::CrlSign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};

    #[test]
    fn key_usage_round_trip() {
        let ku = KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CrlSign);
        let der = ku.to_der().unwrap();
        let decoded = KeyUsage::from_der(&der).unwrap();
        assert_eq!(decoded, ku);
        assert!(decoded.key_cert_sign());
        assert!(decoded.crl_sign());
        assert!(!decoded.digital_signature());
    }
}
