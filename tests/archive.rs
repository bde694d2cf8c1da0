use sereto_crypt::credential::{ACCOUNT, MemoryStore, SERVICE};
use sereto_crypt::crypto::{Header, derive_key};
use sereto_crypt::format::{decode, encode};
use sereto_crypt::retrieval::{ENCRYPTED_ARCHIVE_NAME, PLAIN_ARCHIVE_NAME};
use sereto_crypt::{
    AlwaysConfirm, ArchiveCipher, ArchiveSource, Attachments, CredentialSource, Error, ErrorKind,
    KdfParams, NeverConfirm, resolve_archive,
};

fn cheap_kdf() -> KdfParams {
    KdfParams::new(256, 1, 1).unwrap()
}

fn cipher() -> ArchiveCipher {
    ArchiveCipher::new(Box::new(MemoryStore::with_password("correct horse battery")))
        .with_kdf(cheap_kdf())
        .with_confirm(Box::new(NeverConfirm))
}

#[test]
fn roundtrip_for_various_payloads() {
    let cipher = cipher();
    let payloads: Vec<Vec<u8>> = vec![
        vec![0],
        b"\x1f\x8b\x08\x00 gzip-ish".to_vec(),
        (0..=255).collect(),
        vec![0xAA; 100_000],
    ];

    for payload in payloads {
        let container = cipher.encrypt_bytes(&payload).unwrap();
        assert_eq!(*cipher.decrypt_bytes(&container).unwrap(), payload);
    }
}

#[test]
fn encrypting_twice_gives_different_containers() {
    let cipher = cipher();
    let a = cipher.encrypt_bytes(b"same input").unwrap();
    let b = cipher.encrypt_bytes(b"same input").unwrap();

    let (ha, hb) = (decode(&a).unwrap(), decode(&b).unwrap());
    assert_ne!(ha.header().nonce(), hb.header().nonce());
    assert_ne!(ha.header().salt(), hb.header().salt());
    assert_ne!(ha.ciphertext(), hb.ciphertext());
}

#[test]
fn derivation_is_deterministic_per_salt() {
    let salt = [9u8; 16];
    let k1 = derive_key("correct horse battery", Some(salt), cheap_kdf()).unwrap();
    let k2 = derive_key("correct horse battery", Some(salt), cheap_kdf()).unwrap();
    let k3 = derive_key("correct horse battery", Some([8u8; 16]), cheap_kdf()).unwrap();

    assert_eq!(*k1.key, *k2.key);
    assert_ne!(*k1.key, *k3.key);
}

#[test]
fn header_is_always_64_bytes() {
    let header = Header::new(KdfParams::default(), [5u8; 16], [6u8; 12]);
    let bytes = encode(&header, &[1u8, 2, 3]);

    assert_eq!(bytes.len(), 64 + 3);
    let parsed = decode(&bytes).unwrap();
    assert_eq!(parsed.header(), &header);
    assert_eq!(parsed.ciphertext(), &[1u8, 2, 3]);
}

#[test]
fn any_flipped_ciphertext_bit_is_detected() {
    let cipher = cipher();
    let container = cipher.encrypt_bytes(b"tar").unwrap();

    for byte in Header::LEN..container.len() {
        for bit in 0..8 {
            let mut tampered = container.clone();
            tampered[byte] ^= 1 << bit;

            assert!(
                matches!(
                    cipher.decrypt_bytes(&tampered),
                    Err(Error::AuthenticationFailure)
                ),
                "bit {bit} of byte {byte} was not detected"
            );
        }
    }
}

#[test]
fn tampered_nonce_or_salt_is_detected() {
    let cipher = cipher();
    let container = cipher.encrypt_bytes(b"tar").unwrap();

    for byte in [6, 17, 18, 33] {
        let mut tampered = container.clone();
        tampered[byte] ^= 0x01;
        assert!(cipher.decrypt_bytes(&tampered).is_err());
    }
}

#[test]
fn foreign_magic_is_corruption() {
    let cipher = cipher();
    let mut container = cipher.encrypt_bytes(b"tar").unwrap();
    container[..6].copy_from_slice(b"sErEtO");

    let err = cipher.decrypt_bytes(&container).unwrap_err();
    assert!(matches!(err, Error::CorruptedContainer(_)));
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn zeroed_nonce_is_rejected() {
    let cipher = cipher();
    let mut container = cipher.encrypt_bytes(b"tar").unwrap();
    container[6..18].fill(0);

    assert!(matches!(
        cipher.decrypt_bytes(&container),
        Err(Error::ZeroBytes { field: "nonce" })
    ));
}

#[test]
fn expensive_kdf_block_is_refused() {
    let cipher = cipher();
    let mut container = cipher.encrypt_bytes(b"tar").unwrap();
    container[34..38].copy_from_slice(b"KDFP");
    container[38..42].copy_from_slice(&4_194_304u32.to_le_bytes());
    container[42..46].copy_from_slice(&64u32.to_le_bytes());
    container[46..50].copy_from_slice(&64u32.to_le_bytes());

    // parses, but exceeds what this cipher is willing to derive
    assert_eq!(decode(&container).unwrap().header().kdf().time_cost(), 64);
    assert!(matches!(
        cipher.decrypt_bytes(&container),
        Err(Error::CorruptedContainer(_))
    ));
}

#[test]
fn undersized_container_is_rejected_before_crypto() {
    let mut data = vec![0u8; 64];
    data[..6].copy_from_slice(b"SeReTo");

    assert!(matches!(
        cipher().decrypt_bytes(&data),
        Err(Error::SizeOutOfRange { size: 64, min: 65, .. })
    ));

    let lenient = cipher().with_confirm(Box::new(AlwaysConfirm));
    assert!(matches!(
        lenient.decrypt_bytes(&data),
        Err(Error::CorruptedContainer(_))
    ));
}

#[test]
fn size_limit_is_configurable() {
    let cipher = cipher().with_max_bytes(16);

    assert!(cipher.encrypt_bytes(&[1u8; 16]).is_ok());
    assert!(matches!(
        cipher.encrypt_bytes(&[1u8; 17]),
        Err(Error::SizeOutOfRange { size: 17, max: 16, .. })
    ));
}

#[test]
fn attachment_resolution_scenarios() {
    let cipher = cipher();
    let container = cipher.encrypt_bytes(b"encrypted sources").unwrap();

    // only source.sereto
    let doc = Attachments::new().with(ENCRYPTED_ARCHIVE_NAME, container.clone());
    let resolved = resolve_archive(&doc, &cipher).unwrap();
    assert_eq!(resolved.source, ArchiveSource::Encrypted);
    assert_eq!(*resolved.bytes, b"encrypted sources");

    // only source.tgz
    let doc = Attachments::new().with(PLAIN_ARCHIVE_NAME, b"plain sources".to_vec());
    let resolved = resolve_archive(&doc, &cipher).unwrap();
    assert_eq!(resolved.source, ArchiveSource::Plain);
    assert_eq!(*resolved.bytes, b"plain sources");

    // both
    let doc = Attachments::new()
        .with(PLAIN_ARCHIVE_NAME, b"plain sources".to_vec())
        .with(ENCRYPTED_ARCHIVE_NAME, container.clone());
    assert_eq!(
        resolve_archive(&doc, &cipher).unwrap().source,
        ArchiveSource::Encrypted
    );

    // duplicated source.sereto
    let doc = Attachments::new()
        .with(ENCRYPTED_ARCHIVE_NAME, container.clone())
        .with(ENCRYPTED_ARCHIVE_NAME, container);
    assert!(matches!(
        resolve_archive(&doc, &cipher),
        Err(Error::AmbiguousAttachment { count: 2, .. })
    ));

    // neither
    assert!(matches!(
        resolve_archive(&Attachments::new(), &cipher),
        Err(Error::MissingAttachment { .. })
    ));
}

#[test]
fn password_change_locks_out_old_containers() {
    let store = MemoryStore::with_password("correct horse battery");
    store.set_secret(SERVICE, ACCOUNT, "correct horse battery").unwrap();
    let cipher = ArchiveCipher::new(Box::new(store))
        .with_kdf(cheap_kdf())
        .with_confirm(Box::new(NeverConfirm));
    let container = cipher.encrypt_bytes(b"sources").unwrap();

    cipher
        .credentials()
        .set_secret(SERVICE, ACCOUNT, "a different password")
        .unwrap();

    assert!(matches!(
        cipher.decrypt_bytes(&container),
        Err(Error::AuthenticationFailure)
    ));
}
