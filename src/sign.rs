//! ECDSA signing and verification over the NIST P-256 and P-384 curves.
//!
//! Signature algorithms are matched on the `AlgorithmIdentifier` OID of
//! the signed structure; anything outside the supported set is reported
//! as [`SignatureError::UnsupportedAlgorithm`], never silently accepted.

use der::{asn1::BitString, Decode, Encode};
use sha2::{Digest, Sha256, Sha384};
use signature::{Signer, Verifier};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::ac::{AttributeCertificate, AttributeCertificateInfo};
use crate::cert::{Certificate, TbsCertificate};
use crate::oid;

/// Errors from the signature provider.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("unsupported signature or digest algorithm: {0}")]
    UnsupportedAlgorithm(der::asn1::ObjectIdentifier),

    #[error("signature algorithm of the TBS structure does not match the outer algorithm")]
    AlgorithmMismatch,

    #[error("subject public key is not usable with the signature algorithm")]
    InvalidKey,

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("DER processing failed: {0}")]
    Encoding(#[from] der::Error),
}

/// The `ecdsa-with-SHA256` algorithm identifier; parameters are absent
/// per RFC 5758.
pub fn ecdsa_with_sha256() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid::ECDSA_WITH_SHA256,
        parameters: None,
    }
}

/// The `ecdsa-with-SHA384` algorithm identifier.
pub fn ecdsa_with_sha384() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: oid::ECDSA_WITH_SHA384,
        parameters: None,
    }
}

/// Verifies `signature` over `message` with the key in `spki`, using the
/// algorithm named by `algorithm`.
pub fn verify_signature(
    spki: &SubjectPublicKeyInfoOwned,
    algorithm: &AlgorithmIdentifierOwned,
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    if spki.algorithm.oid != oid::EC_PUBLIC_KEY {
        return Err(SignatureError::InvalidKey);
    }
    let curve = match &spki.algorithm.parameters {
        Some(params) => der::asn1::ObjectIdentifier::from_der(&params.to_der()?)
            .map_err(|_| SignatureError::InvalidKey)?,
        None => return Err(SignatureError::InvalidKey),
    };
    let key_bytes = spki
        .subject_public_key
        .as_bytes()
        .ok_or(SignatureError::InvalidKey)?;

    if algorithm.oid == oid::ECDSA_WITH_SHA256 {
        if curve != oid::CURVE_P256 {
            return Err(SignatureError::InvalidKey);
        }
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        let sig = p256::ecdsa::Signature::from_der(signature)
            .map_err(|_| SignatureError::VerificationFailed)?;
        key.verify(message, &sig)
            .map_err(|_| SignatureError::VerificationFailed)
    } else if algorithm.oid == oid::ECDSA_WITH_SHA384 {
        if curve != oid::CURVE_P384 {
            return Err(SignatureError::InvalidKey);
        }
        let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        let sig = p384::ecdsa::Signature::from_der(signature)
            .map_err(|_| SignatureError::VerificationFailed)?;
        key.verify(message, &sig)
            .map_err(|_| SignatureError::VerificationFailed)
    } else {
        Err(SignatureError::UnsupportedAlgorithm(algorithm.oid))
    }
}

/// Signs `message` with a P-256 key, returning the DER signature as a
/// BIT STRING.
pub fn sign_ecdsa_p256(
    key: &p256::ecdsa::SigningKey,
    message: &[u8],
) -> Result<BitString, SignatureError> {
    let signature: p256::ecdsa::Signature = key.sign(message);
    Ok(BitString::from_bytes(signature.to_der().as_bytes())?)
}

/// The `SubjectPublicKeyInfo` for a P-256 verifying key.
pub fn p256_subject_public_key_info(
    key: &p256::ecdsa::VerifyingKey,
) -> Result<SubjectPublicKeyInfoOwned, SignatureError> {
    use spki::EncodePublicKey;
    let doc = key
        .to_public_key_der()
        .map_err(|_| SignatureError::InvalidKey)?;
    Ok(SubjectPublicKeyInfoOwned::from_der(doc.as_bytes())?)
}

/// Signs a to-be-signed certificate with `ecdsa-with-SHA256`.
///
/// The signature algorithm is written into both the TBS structure and
/// the outer certificate, as RFC 5280 requires them to agree.
pub fn sign_certificate(
    mut tbs: TbsCertificate,
    key: &p256::ecdsa::SigningKey,
) -> Result<Certificate, SignatureError> {
    let algorithm = ecdsa_with_sha256();
    tbs.signature = algorithm.clone();
    let message = tbs.to_der()?;
    let signature = sign_ecdsa_p256(key, &message)?;
    Ok(Certificate {
        tbs_certificate: tbs,
        signature_algorithm: algorithm,
        signature,
    })
}

/// Signs a to-be-signed attribute certificate with `ecdsa-with-SHA256`.
pub fn sign_attribute_certificate(
    mut acinfo: AttributeCertificateInfo,
    key: &p256::ecdsa::SigningKey,
) -> Result<AttributeCertificate, SignatureError> {
    let algorithm = ecdsa_with_sha256();
    acinfo.signature = algorithm.clone();
    let message = acinfo.to_der()?;
    let signature = sign_ecdsa_p256(key, &message)?;
    Ok(AttributeCertificate {
        acinfo,
        signature_algorithm: algorithm,
        signature,
    })
}

/// Whether `expected` is the digest of `data` under `algorithm`, for
/// object-digest holder binding.
pub(crate) fn digest_matches(
    algorithm: &AlgorithmIdentifierOwned,
    data: &[u8],
    expected: &[u8],
) -> Result<bool, SignatureError> {
    if algorithm.oid == oid::SHA_256 {
        Ok(Sha256::digest(data).as_slice() == expected)
    } else if algorithm.oid == oid::SHA_384 {
        Ok(Sha384::digest(data).as_slice() == expected)
    } else {
        Err(SignatureError::UnsupportedAlgorithm(algorithm.oid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_key() -> p256::ecdsa::SigningKey {
        p256::ecdsa::SigningKey::from_slice(&[0x42; 32]).unwrap()
    }

    #[test]
    fn signs_and_verifies_p256() {
        let key = signing_key();
        let spki = p256_subject_public_key_info(key.verifying_key()).unwrap();
        let message = b"to be signed";
        let signature = sign_ecdsa_p256(&key, message).unwrap();
        verify_signature(
            &spki,
            &ecdsa_with_sha256(),
            message,
            signature.raw_bytes(),
        )
        .unwrap();

        let err = verify_signature(
            &spki,
            &ecdsa_with_sha256(),
            b"different message",
            signature.raw_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, SignatureError::VerificationFailed));
    }

    #[test]
    fn unsupported_algorithm_is_rejected() {
        let key = signing_key();
        let spki = p256_subject_public_key_info(key.verifying_key()).unwrap();
        let rsa = AlgorithmIdentifierOwned {
            oid: der::asn1::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11"),
            parameters: None,
        };
        assert!(matches!(
            verify_signature(&spki, &rsa, b"m", &[]),
            Err(SignatureError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn curve_mismatch_is_an_invalid_key() {
        let key = signing_key();
        let spki = p256_subject_public_key_info(key.verifying_key()).unwrap();
        // P-256 key cannot verify an ecdsa-with-SHA384 (P-384) signature
        assert!(matches!(
            verify_signature(&spki, &ecdsa_with_sha384(), b"m", &[]),
            Err(SignatureError::InvalidKey)
        ));
    }
}
