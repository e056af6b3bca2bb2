//! Password-encrypted export of a key pair
//!
//! The portable at-rest form of a key pair is a small versioned container:
//!
//!  - version (1 octet), currently 3
//!  - log2 of the keystream rounds (1 octet)
//!  - 16 octets of salt
//!  - the keystream-masked plaintext
//!
//! In the current version the plaintext is `checksum(2) || purpose(4) ||
//! private key(32)`, with the checksum computed over everything after it.
//! Keeping the checksum inside the masked region binds it to the password,
//! so a wrong password and a tampered blob are indistinguishable to the
//! caller (both report [`KeyError::InvalidKey`]). The purpose tag is written
//! as the constant 242 and read back without being validated; it is reserved
//! for telling future payload types apart. Versions 1 and 2 used other
//! checksum schemes and remain decodable, see `legacy`.

use crate::{
    error::KeyError,
    kdf::{blake2b256, OtpKdf},
    legacy,
    pair::KeyPair,
    private::PrivateKey,
    secret::SecretBytes,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use rand::{rngs::OsRng, RngCore};
use std::io::{Cursor, Read};
use zeroize::Zeroizing;

pub(crate) const EXPORT_SALT_LENGTH: usize = 16;
pub(crate) const PURPOSE_LENGTH: usize = 4;

const EXPORT_VERSION: u8 = 3;
/// Keystream rounds used for the export, stored as log2.
const EXPORT_ROUNDS_LOG: u8 = 8;
const MAX_ROUNDS_LOG: u8 = 32;
/// Purpose tag written into every version-3 payload.
const PURPOSE_ID: u32 = 242;
const CHECKSUM_LENGTH: usize = 2;

const CIPHERTEXT_LENGTH: usize = CHECKSUM_LENGTH + PURPOSE_LENGTH + SecretBytes::LENGTH;

impl KeyPair {
    /// Encrypt this key pair under `password` into the portable container
    /// format (always the current version).
    ///
    /// The salt is drawn from OS entropy unless one is supplied. Requires
    /// the plaintext private key and therefore fails with
    /// [`KeyError::Locked`] on a locked pair.
    pub fn export_encrypted(
        &self,
        kdf: &impl OtpKdf,
        password: &[u8],
        salt: Option<[u8; EXPORT_SALT_LENGTH]>,
    ) -> Result<Vec<u8>, KeyError> {
        let private = self.private_key()?;
        let salt = salt.unwrap_or_else(|| {
            let mut salt = [0u8; EXPORT_SALT_LENGTH];
            OsRng.fill_bytes(&mut salt);
            salt
        });

        let mut payload = Zeroizing::new(Vec::with_capacity(PURPOSE_LENGTH + SecretBytes::LENGTH));
        payload
            .write_u32::<BigEndian>(PURPOSE_ID)
            .expect("writing to export buffer");
        payload.extend_from_slice(&private.to_bytes());
        let checksum = blake2b256(&payload);

        let mut plaintext = Zeroizing::new(Vec::with_capacity(CIPHERTEXT_LENGTH));
        plaintext.extend_from_slice(&checksum[..CHECKSUM_LENGTH]);
        plaintext.extend_from_slice(&payload);
        let ciphertext = kdf.otp(&plaintext, password, &salt, 1 << EXPORT_ROUNDS_LOG)?;

        let mut out = Vec::with_capacity(2 + EXPORT_SALT_LENGTH + CIPHERTEXT_LENGTH);
        out.write_u8(EXPORT_VERSION).expect("writing to export buffer");
        out.write_u8(EXPORT_ROUNDS_LOG).expect("writing to export buffer");
        out.extend_from_slice(&salt);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a container produced by [`KeyPair::export_encrypted`] or by
    /// one of the two historical encoders.
    ///
    /// Dispatches on the version octet; unknown versions fail with
    /// [`KeyError::UnsupportedVersion`]. The rounds bound is checked before
    /// any keystream work. The result is a never-locked pair derived from
    /// the recovered private key.
    pub fn from_encrypted(kdf: &impl OtpKdf, bytes: &[u8], password: &[u8]) -> Result<KeyPair, KeyError> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.read_u8().map_err(|_| KeyError::MalformedInput)?;
        let rounds_log = cursor.read_u8().map_err(|_| KeyError::MalformedInput)?;
        if rounds_log > MAX_ROUNDS_LOG {
            return Err(KeyError::RoundsOutOfBounds);
        }
        // 2^32 does not fit the keystream backend's u32 cost domain
        let rounds = u32::try_from(1u64 << rounds_log).map_err(|_| KeyError::RoundsOutOfBounds)?;
        let private = match version {
            1 => legacy::decrypt_v1(kdf, &mut cursor, password, rounds)?,
            2 => legacy::decrypt_v2(kdf, &mut cursor, password, rounds)?,
            EXPORT_VERSION => decrypt_v3(kdf, &mut cursor, password, rounds)?,
            other => return Err(KeyError::UnsupportedVersion(other)),
        };
        Ok(private.into())
    }
}

fn decrypt_v3(
    kdf: &impl OtpKdf,
    cursor: &mut Cursor<&[u8]>,
    password: &[u8],
    rounds: u32,
) -> Result<PrivateKey, KeyError> {
    let mut salt = [0u8; EXPORT_SALT_LENGTH];
    cursor.read_exact(&mut salt).map_err(|_| KeyError::MalformedInput)?;
    let mut ciphertext = [0u8; CIPHERTEXT_LENGTH];
    cursor.read_exact(&mut ciphertext).map_err(|_| KeyError::MalformedInput)?;

    let plaintext = kdf.otp(&ciphertext, password, &salt, rounds)?;
    let (check, payload) = plaintext.split_at(CHECKSUM_LENGTH);
    if blake2b256(payload)[..CHECKSUM_LENGTH] != *check {
        return Err(KeyError::InvalidKey);
    }
    // parsed for forward compatibility, value not validated
    let _purpose = Cursor::new(payload)
        .read_u32::<BigEndian>()
        .expect("payload length checked above");
    PrivateKey::from_bytes(&payload[PURPOSE_LENGTH..]).map_err(|_| KeyError::InvalidKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::testing::{FailOtp, MockOtp};
    use crate::kdf::Argon2Otp;

    const PASSWORD: &[u8] = b"test";
    const SALT: [u8; 16] = [0x42; 16];

    #[test]
    fn roundtrip() {
        let kp = KeyPair::generate();
        let blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        assert_eq!(blob.len(), 2 + 16 + 38);
        assert_eq!(&blob[..2], &[3, 8]);

        let decoded = KeyPair::from_encrypted(&MockOtp, &blob, PASSWORD).unwrap();
        assert_eq!(decoded.private_key().unwrap(), kp.private_key().unwrap());
        assert_eq!(decoded.pub_key(), kp.pub_key());
        assert!(!decoded.is_locked_internally());
    }

    #[test]
    fn roundtrip_from_temporarily_unlocked_pair() {
        let mut kp = KeyPair::generate();
        let original = kp.private_key().unwrap();
        kp.lock(&MockOtp, PASSWORD, None).unwrap();
        kp.unlock(&MockOtp, PASSWORD).unwrap();

        let blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        let decoded = KeyPair::from_encrypted(&MockOtp, &blob, PASSWORD).unwrap();
        assert_eq!(decoded.private_key().unwrap(), original);
    }

    #[test]
    fn roundtrip_with_argon2() {
        let kp = KeyPair::generate();
        let blob = kp.export_encrypted(&Argon2Otp, PASSWORD, None).unwrap();
        let decoded = KeyPair::from_encrypted(&Argon2Otp, &blob, PASSWORD).unwrap();
        assert_eq!(decoded.private_key().unwrap(), kp.private_key().unwrap());
    }

    #[test]
    fn wrong_password_is_invalid_key() {
        let kp = KeyPair::generate();
        let blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        assert_eq!(
            KeyPair::from_encrypted(&MockOtp, &blob, b"wrong").unwrap_err(),
            KeyError::InvalidKey
        );
    }

    #[test]
    fn locked_pair_cannot_be_exported() {
        let mut kp = KeyPair::generate();
        kp.lock(&MockOtp, PASSWORD, None).unwrap();
        assert_eq!(
            kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap_err(),
            KeyError::Locked
        );
    }

    #[test]
    fn unknown_version_is_rejected() {
        let kp = KeyPair::generate();
        let mut blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        blob[0] = 7;
        assert_eq!(
            KeyPair::from_encrypted(&MockOtp, &blob, PASSWORD).unwrap_err(),
            KeyError::UnsupportedVersion(7)
        );
    }

    #[test]
    fn rounds_bound_is_checked_before_any_keystream_work() {
        let kp = KeyPair::generate();
        let mut blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        blob[1] = 33;
        // FailOtp panics when invoked, so the error must come from the header check
        assert_eq!(
            KeyPair::from_encrypted(&FailOtp, &blob, PASSWORD).unwrap_err(),
            KeyError::RoundsOutOfBounds
        );
    }

    #[test]
    fn truncated_input_is_malformed() {
        let kp = KeyPair::generate();
        let blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        assert_eq!(
            KeyPair::from_encrypted(&MockOtp, &[], PASSWORD).unwrap_err(),
            KeyError::MalformedInput
        );
        assert_eq!(
            KeyPair::from_encrypted(&MockOtp, &blob[..1], PASSWORD).unwrap_err(),
            KeyError::MalformedInput
        );
        assert_eq!(
            KeyPair::from_encrypted(&MockOtp, &blob[..10], PASSWORD).unwrap_err(),
            KeyError::MalformedInput
        );
        assert_eq!(
            KeyPair::from_encrypted(&MockOtp, &blob[..blob.len() - 1], PASSWORD).unwrap_err(),
            KeyError::MalformedInput
        );
    }

    #[test]
    fn corruption_is_detected_in_every_region() {
        let kp = KeyPair::generate();
        let blob = kp.export_encrypted(&MockOtp, PASSWORD, Some(SALT)).unwrap();
        // one byte each from the salt, the masked checksum, the purpose tag
        // and the masked key material
        for index in [2, 17, 18, 19, 22, 30, 55] {
            let mut corrupted = blob.clone();
            corrupted[index] ^= 0x01;
            assert_eq!(
                KeyPair::from_encrypted(&MockOtp, &corrupted, PASSWORD).unwrap_err(),
                KeyError::InvalidKey,
                "corruption at byte {} went undetected",
                index
            );
        }
    }
}
