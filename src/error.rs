use derive_more::{Display, Error};

/// Failures of the lock state machine and of both codecs.
///
/// None of these are retried internally; a wrong password or an unknown
/// version is permanent for the given input. Operations that return an
/// error leave the key pair exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum KeyError {
    #[display(fmt = "key pair is locked")]
    Locked,
    #[display(fmt = "key pair is already locked")]
    AlreadyLocked,
    #[display(fmt = "key pair is not locked")]
    NotLocked,
    #[display(fmt = "key pair has never been locked")]
    NeverLocked,
    #[display(fmt = "invalid key or password")]
    InvalidKey,
    #[display(fmt = "unsupported export version {}", _0)]
    UnsupportedVersion(#[error(ignore)] u8),
    #[display(fmt = "keystream rounds out of bounds")]
    RoundsOutOfBounds,
    #[display(fmt = "truncated or malformed input")]
    MalformedInput,
    #[display(fmt = "keystream derivation failed")]
    Kdf,
}
