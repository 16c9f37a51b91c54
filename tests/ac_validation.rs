//! End-to-end attribute certificate validation against freshly signed
//! holder and issuer paths.

use der::asn1::BitString;
use der::Encode;
use p256::ecdsa::SigningKey;
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use xpki_lib::*;

const T0: u64 = 1_700_000_000;
const HOUR: u64 = 3_600;

fn key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32]).unwrap()
}

fn make_cert(
    subject: &str,
    subject_key: &SigningKey,
    issuer: &str,
    issuer_key: &SigningKey,
    extensions: Vec<Extension>,
    serial: u64,
) -> Certificate {
    let tbs = TbsCertificate::new(
        Name::common_name(subject).unwrap(),
        p256_subject_public_key_info(subject_key.verifying_key()).unwrap(),
        Name::common_name(issuer).unwrap(),
        Validity::from_unix(T0 - HOUR, T0 + 4 * HOUR).unwrap(),
    )
    .unwrap()
    .with_serial_number(serial_number(serial).unwrap())
    .with_additional_extensions(extensions);
    sign_certificate(tbs, issuer_key).unwrap()
}

struct Fixture {
    root: Certificate,
    holder_cert: Certificate,
    issuer_cert: Certificate,
    issuer_key: SigningKey,
    holder_key: SigningKey,
}

fn fixture() -> Fixture {
    let root_key = key(0x11);
    let holder_key = key(0x22);
    let issuer_key = key(0x33);
    let ca_exts = vec![
        BasicConstraints::ca(None).to_extension().unwrap(),
        KeyUsage::from(KeyUsages::KeyCertSign).to_extension().unwrap(),
    ];
    let root = make_cert("Root", &root_key, "Root", &root_key, ca_exts, 1);
    let holder_cert = make_cert("Holder", &holder_key, "Root", &root_key, vec![], 2);
    let issuer_cert = make_cert("AA", &issuer_key, "Root", &root_key, vec![], 3);
    Fixture {
        root,
        holder_cert,
        issuer_cert,
        issuer_key,
        holder_key,
    }
}

fn paths(fx: &Fixture) -> (CertificationPath, CertificationPath) {
    let holder_path =
        CertificationPath::new(vec![fx.root.clone(), fx.holder_cert.clone()]).unwrap();
    let issuer_path =
        CertificationPath::new(vec![fx.root.clone(), fx.issuer_cert.clone()]).unwrap();
    (holder_path, issuer_path)
}

fn targeted_ac(fx: &Fixture, holder: Holder, not_before: u64, not_after: u64) -> AttributeCertificate {
    let aci = AttributeCertificateInfo::new(
        holder,
        AttCertIssuer::from_certificate(&fx.issuer_cert),
        AttCertValidityPeriod::from_unix(not_before, not_after).unwrap(),
        Attributes::default(),
    )
    .unwrap()
    .with_additional_extensions([TargetInformation::from_targets(vec![Target::TargetName(
        GeneralName::dns("test").unwrap(),
    )])
    .to_extension()
    .unwrap()]);
    sign_attribute_certificate(aci, &fx.issuer_key).unwrap()
}

fn config(fx: &Fixture) -> ACValidationConfig {
    let (holder_path, issuer_path) = paths(fx);
    ACValidationConfig::new(holder_path, issuer_path, PathValidationConfig::new(T0))
        .with_required_targets(vec![Target::TargetName(GeneralName::dns("test").unwrap())])
}

#[test]
fn validates_a_targeted_attribute_certificate() {
    let fx = fixture();
    let ac = targeted_ac(
        &fx,
        Holder::from_certificate(&fx.holder_cert),
        T0 - 10,
        T0 + HOUR,
    );
    let validated = validate_attribute_certificate(&ac, &config(&fx)).unwrap();
    assert_eq!(validated, &ac);
}

#[test]
fn rejects_a_target_the_ac_is_not_meant_for() {
    let fx = fixture();
    let ac = targeted_ac(
        &fx,
        Holder::from_certificate(&fx.holder_cert),
        T0 - 10,
        T0 + HOUR,
    );
    let config = config(&fx).with_required_targets(vec![Target::TargetName(
        GeneralName::dns("other").unwrap(),
    )]);
    assert!(matches!(
        validate_attribute_certificate(&ac, &config),
        Err(ACError::TargetMismatch)
    ));
}

#[test]
fn rejects_a_signature_by_the_wrong_key() {
    let fx = fixture();
    let aci = AttributeCertificateInfo::new(
        Holder::from_certificate(&fx.holder_cert),
        AttCertIssuer::from_certificate(&fx.issuer_cert),
        AttCertValidityPeriod::from_unix(T0 - 10, T0 + HOUR).unwrap(),
        Attributes::default(),
    )
    .unwrap();
    let ac = sign_attribute_certificate(aci, &fx.holder_key).unwrap();
    assert!(matches!(
        validate_attribute_certificate(&ac, &config(&fx)),
        Err(ACError::SignatureInvalid)
    ));
}

#[test]
fn rejects_an_ac_outside_its_validity_period() {
    let fx = fixture();
    let expired = targeted_ac(
        &fx,
        Holder::from_certificate(&fx.holder_cert),
        T0 - HOUR,
        T0 - 10,
    );
    assert!(matches!(
        validate_attribute_certificate(&expired, &config(&fx)),
        Err(ACError::Expired)
    ));

    let premature = targeted_ac(
        &fx,
        Holder::from_certificate(&fx.holder_cert),
        T0 + 10,
        T0 + HOUR,
    );
    assert!(matches!(
        validate_attribute_certificate(&premature, &config(&fx)),
        Err(ACError::NotYetValid)
    ));
}

#[test]
fn rejects_a_holder_binding_for_another_certificate() {
    let fx = fixture();
    // bound to the AA certificate instead of the holder's
    let ac = targeted_ac(
        &fx,
        Holder::from_certificate(&fx.issuer_cert),
        T0 - 10,
        T0 + HOUR,
    );
    assert!(matches!(
        validate_attribute_certificate(&ac, &config(&fx)),
        Err(ACError::HolderMismatch)
    ));
}

#[test]
fn accepts_an_entity_name_holder_binding() {
    let fx = fixture();
    let holder = Holder {
        entity_name: Some(GeneralNames::single(GeneralName::DirectoryName(
            fx.holder_cert.subject().clone(),
        ))),
        ..Default::default()
    };
    let ac = targeted_ac(&fx, holder, T0 - 10, T0 + HOUR);
    validate_attribute_certificate(&ac, &config(&fx)).unwrap();
}

#[test]
fn accepts_an_object_digest_holder_binding() {
    let fx = fixture();
    let spki_der = fx.holder_cert.public_key().to_der().unwrap();
    let digest = Sha256::digest(&spki_der);
    let holder = Holder {
        object_digest_info: Some(ObjectDigestInfo {
            digested_object_type: DigestedObjectType::PublicKey,
            other_object_type_id: None,
            digest_algorithm: AlgorithmIdentifierOwned {
                oid: oid::SHA_256,
                parameters: None,
            },
            object_digest: BitString::from_bytes(&digest).unwrap(),
        }),
        ..Default::default()
    };
    let ac = targeted_ac(&fx, holder, T0 - 10, T0 + HOUR);
    validate_attribute_certificate(&ac, &config(&fx)).unwrap();
}

#[test]
fn rejects_an_issuer_naming_someone_else() {
    let fx = fixture();
    let aci = AttributeCertificateInfo::new(
        Holder::from_certificate(&fx.holder_cert),
        AttCertIssuer::from_certificate(&fx.holder_cert),
        AttCertValidityPeriod::from_unix(T0 - 10, T0 + HOUR).unwrap(),
        Attributes::default(),
    )
    .unwrap();
    let ac = sign_attribute_certificate(aci, &fx.issuer_key).unwrap();
    assert!(matches!(
        validate_attribute_certificate(&ac, &config(&fx)),
        Err(ACError::IssuerMismatch)
    ));
}

#[test]
fn rejects_when_the_issuer_path_does_not_validate() {
    let fx = fixture();
    let ac = targeted_ac(
        &fx,
        Holder::from_certificate(&fx.holder_cert),
        T0 - 10,
        T0 + HOUR,
    );
    // reference time before every certificate's validity window
    let (holder_path, issuer_path) = paths(&fx);
    let config = ACValidationConfig::new(
        holder_path,
        issuer_path,
        PathValidationConfig::new(T0 - 2 * HOUR),
    );
    assert!(matches!(
        validate_attribute_certificate(&ac, &config),
        Err(ACError::IssuerPathInvalid(_))
    ));
}
