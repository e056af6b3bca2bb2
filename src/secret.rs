use std::fmt::{self, Debug};
use zeroize::Zeroize;

/// An exclusively-owned buffer for 32 bytes of secret material.
///
/// The content is overwritten with zeros when the buffer is dropped, and
/// can be wiped explicitly earlier via [`SecretBytes::wipe`]. Unlike
/// [`crate::PrivateKey`] this type is not `Copy`, so the wipe covers every
/// copy there is.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes([u8; 32]);

impl SecretBytes {
    pub const LENGTH: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Replace the content in place, without reallocating.
    pub fn overwrite(&mut self, bytes: &[u8; 32]) {
        self.0.copy_from_slice(bytes);
    }

    /// Overwrite the content with zeros.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl AsRef<[u8]> for SecretBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for SecretBytes {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "secret")
    }
}
