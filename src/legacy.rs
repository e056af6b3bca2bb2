//! Old export checksum schemes kept around for backwards compatibility
//! reasons. Don't use anything in here for new blobs!
//!
//! Both historical versions share one layout after the two header octets:
//! `ciphertext(32) || salt(16) || checksum(4)`, with the checksum sitting
//! outside the masked region. Version 1 verified the decryption by hashing
//! the hash of the derived public key; version 2 hashed the decrypted
//! plaintext directly, which fails early without a curve operation. The
//! current format moved the (shortened) checksum inside the masked region,
//! see `export`.

use crate::{
    error::KeyError,
    export::EXPORT_SALT_LENGTH,
    kdf::{blake2b256, OtpKdf},
    private::PrivateKey,
    public::PublicKey,
    secret::SecretBytes,
};
use std::io::{Cursor, Read};

const LEGACY_CHECKSUM_LENGTH: usize = 4;

pub(crate) fn decrypt_v1(
    kdf: &impl OtpKdf,
    cursor: &mut Cursor<&[u8]>,
    password: &[u8],
    rounds: u32,
) -> Result<PrivateKey, KeyError> {
    let (ciphertext, salt, checksum) = read_parts(cursor)?;
    let plaintext = kdf.otp(&ciphertext, password, &salt, rounds)?;
    let private = PrivateKey::from_bytes(&plaintext).map_err(|_| KeyError::InvalidKey)?;
    let public: PublicKey = private.into();
    if blake2b256(&blake2b256(&public.to_bytes()))[..LEGACY_CHECKSUM_LENGTH] != checksum {
        return Err(KeyError::InvalidKey);
    }
    Ok(private)
}

pub(crate) fn decrypt_v2(
    kdf: &impl OtpKdf,
    cursor: &mut Cursor<&[u8]>,
    password: &[u8],
    rounds: u32,
) -> Result<PrivateKey, KeyError> {
    let (ciphertext, salt, checksum) = read_parts(cursor)?;
    let plaintext = kdf.otp(&ciphertext, password, &salt, rounds)?;
    if blake2b256(&plaintext)[..LEGACY_CHECKSUM_LENGTH] != checksum {
        return Err(KeyError::InvalidKey);
    }
    PrivateKey::from_bytes(&plaintext).map_err(|_| KeyError::InvalidKey)
}

type LegacyParts = (
    [u8; SecretBytes::LENGTH],
    [u8; EXPORT_SALT_LENGTH],
    [u8; LEGACY_CHECKSUM_LENGTH],
);

fn read_parts(cursor: &mut Cursor<&[u8]>) -> Result<LegacyParts, KeyError> {
    let mut ciphertext = [0u8; SecretBytes::LENGTH];
    cursor.read_exact(&mut ciphertext).map_err(|_| KeyError::MalformedInput)?;
    let mut salt = [0u8; EXPORT_SALT_LENGTH];
    cursor.read_exact(&mut salt).map_err(|_| KeyError::MalformedInput)?;
    let mut checksum = [0u8; LEGACY_CHECKSUM_LENGTH];
    cursor.read_exact(&mut checksum).map_err(|_| KeyError::MalformedInput)?;
    Ok((ciphertext, salt, checksum))
}
