//! Optional parity recovery records
//!
//! A recovery record stores one parity bit per template-segment block,
//! letting reproduction retry decodes that fail by a single flip beyond
//! the correction radius. Like the helper itself it is public material,
//! derived from the enrolled template only through block parities, and it
//! is authenticated under the same MAC key with a separate domain label.

use blake2::{Blake2b512, Digest};
use zeroize::Zeroizing;

use lib_biometric::FingerTemplate;

use crate::bch::recovery::block_parities;
use crate::error::ExtractError;

use super::helper_data::HelperData;
use super::{segment_word, SEGMENT_BITS};

/// Newest recovery record layout
pub const RECOVERY_VERSION_V1: u8 = 1;

const MAC_BYTES: usize = 32;

/// Per-block parity of the enrolled template segment, authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRecord {
    /// Record layout revision
    pub version: u8,
    /// One parity bit per 16-bit segment block
    pub block_parity: u8,
    /// HMAC-SHA256 over the preceding fields under a parity-scoped label
    pub mac: [u8; MAC_BYTES],
}

impl RecoveryRecord {
    /// Issue the record for a freshly enrolled template
    pub fn issue(template: &FingerTemplate, helper: &HelperData) -> Self {
        debug_assert_eq!(SEGMENT_BITS, 127);
        let word = segment_word(template);
        let block_parity = block_parities(*word);
        let key = parity_mac_key(&helper.salt, &helper.personalization);
        let mac = parity_mac(&key, RECOVERY_VERSION_V1, block_parity);
        RecoveryRecord {
            version: RECOVERY_VERSION_V1,
            block_parity,
            mac,
        }
    }

    /// Serialize: `version(1) block_parity(1) mac(32)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + MAC_BYTES);
        out.push(self.version);
        out.push(self.block_parity);
        out.extend_from_slice(&self.mac);
        out
    }

    /// Parse, dispatching on the version byte
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        let version = *bytes.first().ok_or(ExtractError::MalformedHelper)?;
        if version != RECOVERY_VERSION_V1 {
            return Err(ExtractError::VersionUnsupported { got: version });
        }
        if bytes.len() != 2 + MAC_BYTES {
            return Err(ExtractError::MalformedHelper);
        }
        let mut mac = [0u8; MAC_BYTES];
        mac.copy_from_slice(&bytes[2..]);
        Ok(RecoveryRecord {
            version,
            block_parity: bytes[1],
            mac,
        })
    }

    /// Verify this record against a helper record's key material
    pub fn verify(&self, helper: &HelperData) -> Result<(), ExtractError> {
        if self.version != RECOVERY_VERSION_V1 {
            return Err(ExtractError::VersionUnsupported { got: self.version });
        }
        let key = parity_mac_key(&helper.salt, &helper.personalization);
        let expected = parity_mac(&key, self.version, self.block_parity);
        use subtle::ConstantTimeEq;
        if !bool::from(expected.ct_eq(&self.mac)) {
            return Err(ExtractError::MacMismatch);
        }
        Ok(())
    }
}

fn parity_mac_key(salt: &[u8; 32], personalization: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Blake2b512::new();
    hasher.update(b"parity-mac");
    hasher.update(salt);
    hasher.update(personalization);
    let digest = hasher.finalize();
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&digest[..32]);
    out
}

fn parity_mac(key: &Zeroizing<[u8; 32]>, version: u8, block_parity: u8) -> [u8; MAC_BYTES] {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key.as_ref()).expect("HMAC accepts any key length");
    mac.update(&[version, block_parity]);
    mac.finalize().into_bytes().into()
}
