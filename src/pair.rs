use crate::{error::KeyError, kdf::OtpKdf, private::PrivateKey, public::PublicKey, secret::SecretBytes};
use byteorder::{ReadBytesExt, WriteBytesExt};
use rand::{rngs::OsRng, RngCore};
use std::{
    fmt::{self, Debug},
    io::{Cursor, Read},
};
use zeroize::Zeroize;

pub(crate) const LOCK_SALT_LENGTH: usize = 32;

/// Keystream rounds used for in-memory locking.
const LOCK_ROUNDS: u32 = 256;

/// Lock state of a [`KeyPair`].
///
/// In `Locked` and `Unlocked` the pair's internal buffer holds the
/// keystream-masked key; `Unlocked` additionally carries a transient
/// plaintext cache that is wiped on every transition out of that state.
#[derive(Clone)]
enum LockState {
    NeverLocked,
    Locked { salt: [u8; LOCK_SALT_LENGTH] },
    Unlocked {
        salt: [u8; LOCK_SALT_LENGTH],
        plaintext: SecretBytes,
    },
}

/// A keypair.
///
/// Conceptually, this is a generic keypair. But currently we only support ed25519
/// encryption.
///
/// The private key is held in an exclusively-owned buffer whose content is either
/// plaintext or masked under a password-derived keystream. Locking masks the buffer in
/// place; unlocking does not unmask it but caches a verified plaintext copy next to it,
/// so that a later [`KeyPair::relock`] only has to wipe the cache. All methods take the
/// pair by plain (mutable) reference and provide no internal synchronization; callers
/// sharing a pair across threads must bring their own.
#[derive(Clone)]
pub struct KeyPair {
    pub(crate) public: PublicKey,
    private: SecretBytes,
    state: LockState,
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}
impl Eq for KeyPair {}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl From<PrivateKey> for KeyPair {
    fn from(private: PrivateKey) -> KeyPair {
        let public: PublicKey = private.into();
        KeyPair {
            public,
            private: SecretBytes::new(private.to_bytes()),
            state: LockState::NeverLocked,
        }
    }
}

impl KeyPair {
    pub fn generate() -> Self {
        PrivateKey::generate().into()
    }

    pub fn pub_key(&self) -> PublicKey {
        self.public
    }

    /// True iff the private key is currently masked and not accessible.
    pub fn is_locked(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    /// True iff the pair has ever been locked. Sticky: a temporary unlock
    /// does not reset this.
    pub fn is_locked_internally(&self) -> bool {
        !matches!(self.state, LockState::NeverLocked)
    }

    /// The salt bound to the current masking, if the pair has ever been locked.
    pub fn lock_salt(&self) -> Option<&[u8; LOCK_SALT_LENGTH]> {
        match &self.state {
            LockState::NeverLocked => None,
            LockState::Locked { salt } | LockState::Unlocked { salt, .. } => Some(salt),
        }
    }

    /// The currently usable plaintext private key.
    ///
    /// Fails with [`KeyError::Locked`] while the pair is locked.
    pub fn private_key(&self) -> Result<PrivateKey, KeyError> {
        match &self.state {
            LockState::Locked { .. } => Err(KeyError::Locked),
            LockState::Unlocked { plaintext, .. } => Ok(PrivateKey(*plaintext.as_bytes())),
            LockState::NeverLocked => Ok(PrivateKey(*self.private.as_bytes())),
        }
    }

    /// Mask the private key in memory under `password`.
    ///
    /// Salt precedence: `salt` if supplied, else the salt of a previous lock,
    /// else 32 fresh random bytes. Any plaintext cache from a temporary
    /// unlock is wiped. Fails with [`KeyError::AlreadyLocked`] if the pair is
    /// locked; in that case (and on keystream failure) nothing is changed.
    pub fn lock(
        &mut self,
        kdf: &impl OtpKdf,
        password: &[u8],
        salt: Option<[u8; LOCK_SALT_LENGTH]>,
    ) -> Result<(), KeyError> {
        let salt = match (salt, &self.state) {
            (_, LockState::Locked { .. }) => return Err(KeyError::AlreadyLocked),
            (Some(salt), _) => salt,
            (None, LockState::Unlocked { salt, .. }) => *salt,
            (None, LockState::NeverLocked) => {
                let mut salt = [0u8; LOCK_SALT_LENGTH];
                OsRng.fill_bytes(&mut salt);
                salt
            }
        };
        let plaintext = match &self.state {
            LockState::NeverLocked => &self.private,
            LockState::Unlocked { plaintext, .. } => plaintext,
            LockState::Locked { .. } => unreachable!("checked above"),
        };
        let masked = kdf.otp(plaintext.as_bytes(), password, &salt, LOCK_ROUNDS)?;
        let masked: [u8; SecretBytes::LENGTH] = masked.as_slice().try_into().map_err(|_| KeyError::Kdf)?;
        self.private.overwrite(&masked);
        if let LockState::Unlocked { plaintext, .. } = &mut self.state {
            plaintext.wipe();
        }
        self.state = LockState::Locked { salt };
        Ok(())
    }

    /// Recover the plaintext private key from the masked buffer.
    ///
    /// The candidate plaintext is accepted only if its derived public key
    /// matches the stored one; otherwise the candidate is wiped and
    /// [`KeyError::InvalidKey`] is returned with the pair unchanged. On
    /// success the masked buffer stays as it is and the plaintext is cached
    /// until [`KeyPair::relock`] or the next [`KeyPair::lock`].
    pub fn unlock(&mut self, kdf: &impl OtpKdf, password: &[u8]) -> Result<(), KeyError> {
        let salt = match &self.state {
            LockState::Locked { salt } => *salt,
            _ => return Err(KeyError::NotLocked),
        };
        let candidate = kdf.otp(self.private.as_bytes(), password, &salt, LOCK_ROUNDS)?;
        let mut bytes: [u8; SecretBytes::LENGTH] =
            candidate.as_slice().try_into().map_err(|_| KeyError::Kdf)?;
        let mut plaintext = SecretBytes::new(bytes);
        bytes.zeroize();
        let derived: PublicKey = PrivateKey(*plaintext.as_bytes()).into();
        if derived != self.public {
            plaintext.wipe();
            return Err(KeyError::InvalidKey);
        }
        self.state = LockState::Unlocked { salt, plaintext };
        Ok(())
    }

    /// Drop the plaintext cache created by [`KeyPair::unlock`].
    ///
    /// The cache is wiped before release; the masked buffer needs no further
    /// change. Fails with [`KeyError::AlreadyLocked`] on a locked pair and
    /// with [`KeyError::NeverLocked`] on a pair that was never locked.
    pub fn relock(&mut self) -> Result<(), KeyError> {
        let salt = match &mut self.state {
            LockState::Locked { .. } => return Err(KeyError::AlreadyLocked),
            LockState::NeverLocked => return Err(KeyError::NeverLocked),
            LockState::Unlocked { salt, plaintext } => {
                plaintext.wipe();
                *salt
            }
        };
        self.state = LockState::Locked { salt };
        Ok(())
    }

    /// Sign `message` with the currently usable private key.
    ///
    /// Fails with [`KeyError::Locked`] while the pair is locked.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64], KeyError> {
        let secret_key = self.private_key()?.to_ed25519();
        Ok(ed25519_dalek::ExpandedSecretKey::from(&secret_key)
            .sign(message, &self.public.to_ed25519())
            .to_bytes())
    }

    /// Number of bytes [`KeyPair::to_bytes`] will emit for the current state.
    pub fn serialized_size(&self) -> usize {
        let base = SecretBytes::LENGTH + ed25519_dalek::PUBLIC_KEY_LENGTH + 1;
        if self.is_locked() {
            base + LOCK_SALT_LENGTH
        } else {
            base
        }
    }

    /// Convert this keypair to bytes.
    ///
    /// Layout: `private(32) || public(32) || flag(1)`, followed by the 32
    /// byte lock salt iff `flag == 1`. A locked pair writes its masked
    /// buffer; an unlocked pair writes the plaintext key, so the emitted
    /// bytes always round-trip through [`KeyPair::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.serialized_size());
        match &self.state {
            LockState::NeverLocked => {
                out.extend_from_slice(self.private.as_bytes());
                out.extend_from_slice(&self.public.to_bytes());
                out.write_u8(0).expect("writing to key pair buffer");
            }
            LockState::Unlocked { plaintext, .. } => {
                out.extend_from_slice(plaintext.as_bytes());
                out.extend_from_slice(&self.public.to_bytes());
                out.write_u8(0).expect("writing to key pair buffer");
            }
            LockState::Locked { salt } => {
                out.extend_from_slice(self.private.as_bytes());
                out.extend_from_slice(&self.public.to_bytes());
                out.write_u8(1).expect("writing to key pair buffer");
                out.extend_from_slice(salt);
            }
        }
        out
    }

    /// Recreate a keypair from the bytes emitted by [`KeyPair::to_bytes`].
    ///
    /// A missing flag byte, or any flag other than 1, means unlocked with no
    /// salt following.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let mut cursor = Cursor::new(bytes);
        let mut private = [0u8; SecretBytes::LENGTH];
        cursor.read_exact(&mut private).map_err(|_| KeyError::MalformedInput)?;
        let mut public = [0u8; ed25519_dalek::PUBLIC_KEY_LENGTH];
        cursor.read_exact(&mut public).map_err(|_| KeyError::MalformedInput)?;
        let public = PublicKey::from_bytes(&public).map_err(|_| KeyError::InvalidKey)?;
        let state = match cursor.read_u8() {
            Ok(1) => {
                let mut salt = [0u8; LOCK_SALT_LENGTH];
                cursor.read_exact(&mut salt).map_err(|_| KeyError::MalformedInput)?;
                LockState::Locked { salt }
            }
            _ => LockState::NeverLocked,
        };
        Ok(Self {
            public,
            private: SecretBytes::new(private),
            state,
        })
    }
}
