//! Zero-on-drop key wrappers
//!
//! Key material lives only inside these wrappers: wiped when released,
//! redacted from `Debug`, never serializable, compared in constant time.

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Length of every derived key in bytes
pub const KEY_BYTES: usize = 32;

/// A per-finger key produced by enrollment or reproduction
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct FingerKey([u8; KEY_BYTES]);

impl FingerKey {
    pub fn from_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        FingerKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }
}

impl PartialEq for FingerKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for FingerKey {}

impl fmt::Debug for FingerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FingerKey(<redacted>)")
    }
}

/// The 32-byte aggregate of per-finger keys
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct MasterKey([u8; KEY_BYTES]);

impl MasterKey {
    /// The XOR identity; folding contributions into it yields the aggregate
    pub fn zero() -> Self {
        MasterKey([0u8; KEY_BYTES])
    }

    pub fn from_bytes(bytes: [u8; KEY_BYTES]) -> Self {
        MasterKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }

    /// Fold one finger key into the aggregate
    pub fn xor_in(&mut self, key: &FingerKey) {
        for (m, k) in self.0.iter_mut().zip(key.as_bytes()) {
            *m ^= k;
        }
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for MasterKey {}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}
