use crate::error::KeyError;
use argon2::{Algorithm, Argon2, Params, Version};
use blake2::{digest::consts::U32, Blake2b, Digest};
use zeroize::Zeroizing;

type Blake2b256 = Blake2b<U32>;

/// Compute the 32-byte blake2b digest of `data`.
///
/// Integrity checksums in the export format use truncated prefixes of this.
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

/// A one-time-pad style keystream function.
///
/// `otp` derives a pseudorandom byte sequence from (password, salt, rounds)
/// and combines it byte-wise (XOR) with `data`. The result has the same
/// length as `data`, the derivation is deterministic, and applying the same
/// call to its own output restores the input. Deriving the keystream is
/// deliberately expensive, proportional to `rounds`.
///
/// This is a trait so that tests can substitute a cheap deterministic
/// stand-in for the real derivation.
pub trait OtpKdf {
    fn otp(&self, data: &[u8], password: &[u8], salt: &[u8], rounds: u32) -> Result<Zeroizing<Vec<u8>>, KeyError>;
}

/// The production keystream derivation: Argon2d with 512 KiB of memory,
/// one lane, and `rounds` as the time cost, expanded directly to the
/// length of `data`.
pub struct Argon2Otp;

impl Argon2Otp {
    const MEMORY_KIB: u32 = 512;
}

impl OtpKdf for Argon2Otp {
    fn otp(&self, data: &[u8], password: &[u8], salt: &[u8], rounds: u32) -> Result<Zeroizing<Vec<u8>>, KeyError> {
        let params = Params::new(Self::MEMORY_KIB, rounds, 1, Some(data.len())).map_err(|_| KeyError::Kdf)?;
        let argon2 = Argon2::new(Algorithm::Argon2d, Version::V0x13, params);
        let mut keystream = Zeroizing::new(vec![0u8; data.len()]);
        argon2
            .hash_password_into(password, salt, keystream.as_mut_slice())
            .map_err(|_| KeyError::Kdf)?;
        Ok(xor(data, &keystream))
    }
}

fn xor(data: &[u8], keystream: &[u8]) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(data.iter().zip(keystream.iter()).map(|(d, k)| d ^ k).collect())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic stand-in for [`Argon2Otp`]: a counter-mode blake2b
    /// keystream. Same contract (length-preserving, self-inverse, all
    /// inputs mixed in), none of the cost.
    pub struct MockOtp;

    impl OtpKdf for MockOtp {
        fn otp(
            &self,
            data: &[u8],
            password: &[u8],
            salt: &[u8],
            rounds: u32,
        ) -> Result<Zeroizing<Vec<u8>>, KeyError> {
            let mut out = Zeroizing::new(Vec::with_capacity(data.len()));
            for (i, chunk) in data.chunks(32).enumerate() {
                let mut input = Vec::with_capacity(password.len() + salt.len() + 8);
                input.extend_from_slice(password);
                input.extend_from_slice(salt);
                input.extend_from_slice(&rounds.to_be_bytes());
                input.extend_from_slice(&(i as u32).to_be_bytes());
                let block = blake2b256(&input);
                out.extend(chunk.iter().zip(block.iter()).map(|(d, k)| d ^ k));
            }
            Ok(out)
        }
    }

    /// Stand-in for paths that must fail before any keystream work happens.
    pub struct FailOtp;

    impl OtpKdf for FailOtp {
        fn otp(&self, _: &[u8], _: &[u8], _: &[u8], _: u32) -> Result<Zeroizing<Vec<u8>>, KeyError> {
            panic!("keystream must not be derived on this path");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockOtp;
    use super::*;

    #[test]
    fn argon2_otp_is_self_inverse() {
        let data = [0x5au8; 38];
        let masked = Argon2Otp.otp(&data, b"password", &[7u8; 16], 1).unwrap();
        assert_eq!(masked.len(), data.len());
        assert_ne!(&masked[..], &data[..]);
        let unmasked = Argon2Otp.otp(&masked, b"password", &[7u8; 16], 1).unwrap();
        assert_eq!(&unmasked[..], &data[..]);
    }

    #[test]
    fn argon2_otp_depends_on_salt() {
        let data = [0u8; 32];
        let a = Argon2Otp.otp(&data, b"password", &[1u8; 16], 1).unwrap();
        let b = Argon2Otp.otp(&data, b"password", &[2u8; 16], 1).unwrap();
        assert_ne!(&a[..], &b[..]);
    }

    #[test]
    fn mock_otp_is_self_inverse() {
        let data: Vec<u8> = (0..38).collect();
        let masked = MockOtp.otp(&data, b"pw", &[3u8; 32], 256).unwrap();
        assert_eq!(masked.len(), data.len());
        let unmasked = MockOtp.otp(&masked, b"pw", &[3u8; 32], 256).unwrap();
        assert_eq!(&unmasked[..], &data[..]);
    }

    #[test]
    fn blake2b256_digest_width() {
        assert_eq!(blake2b256(b"").len(), 32);
        assert_ne!(blake2b256(b"a"), blake2b256(b"b"));
    }
}
