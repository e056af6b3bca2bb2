//! Key-pair management for the wallet
//!
//! A [`KeyPair`] owns one ed25519 private key together with its derived
//! public key. The pair can be held in plaintext, masked in memory under a
//! password (locked), and exported to a password-encrypted portable blob.
//!
//! # Assumptions
//!
//! ## Handling of key material
//!
//! The private key lives in an exclusively-owned buffer ([`SecretBytes`])
//! that is overwritten with zeros before its memory is released. Plaintext
//! caches created by a temporary unlock are wiped on every transition back
//! into the locked state. Note that this cannot extend to copies the
//! allocator or the OS may have made (swap, core dumps); processes holding
//! unlocked keys should take their own precautions.
//!
//! ## Keystream derivation
//!
//! Locking and the encrypted export both mask bytes with a keystream
//! derived from (password, salt, rounds). The derivation is behind the
//! [`OtpKdf`] trait so that tests can substitute a cheap deterministic
//! stand-in; production code uses [`Argon2Otp`]. The keystream combination
//! is an XOR, so applying the same call twice restores the input.
//!
//! # Versioning
//!
//! The encrypted export carries a version byte. Three versions exist in the
//! wild; all of them decode, only the current one (3) is ever produced. The
//! old checksum schemes live in `legacy` and should not be used for
//! anything new.

mod error;
mod export;
mod kdf;
mod legacy;
mod pair;
mod private;
mod public;
mod secret;

pub use error::KeyError;
pub use kdf::{blake2b256, Argon2Otp, OtpKdf};
pub use pair::KeyPair;
pub use private::PrivateKey;
pub use public::PublicKey;
pub use secret::SecretBytes;
