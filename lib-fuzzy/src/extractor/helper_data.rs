//! Persistent helper-data records and their wire codec
//!
//! A helper record is the only durable artifact of enrollment. It carries
//! no direct biometric features: the sketch is the template segment masked
//! by a fresh random codeword, and everything else is salt, domain tags
//! and the authentication tag. The layout is versioned; readers keep
//! accepting every version ever written, writers emit only the newest.

use crate::error::ExtractError;

/// Newest helper record layout
pub const HELPER_VERSION_V1: u8 = 1;
/// BCH(127,64,t=10) sketch, BLAKE2b derivation, HMAC-SHA256 authentication
pub const ALGO_BCH127_BLAKE2B_HMACSHA256: u8 = 1;
/// Sketch length at the fixed code parameters
pub const SKETCH_BYTES: usize = 16;

const SALT_BYTES: usize = 32;
const PERS_BYTES: usize = 32;
const MAC_BYTES: usize = 32;

/// Public helper record emitted by enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperData {
    /// Record layout revision
    pub version: u8,
    /// Cipher-suite identifier
    pub algorithm_id: u8,
    /// Per-enrollment CSPRNG salt
    pub salt: [u8; SALT_BYTES],
    /// Domain tag bound to the finger the record was enrolled from
    pub personalization: [u8; PERS_BYTES],
    /// Template segment masked by a fresh codeword
    pub sketch: Vec<u8>,
    /// HMAC-SHA256 over all preceding fields
    pub mac: [u8; MAC_BYTES],
}

impl HelperData {
    /// Serialize to the on-wire layout
    ///
    /// `version(1) algo(1) salt(32) personalization(32) sketch_len(1)
    /// sketch(n) mac(32)`, integers big-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + SALT_BYTES + PERS_BYTES + self.sketch.len() + MAC_BYTES);
        out.push(self.version);
        out.push(self.algorithm_id);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.personalization);
        out.push(self.sketch.len() as u8);
        out.extend_from_slice(&self.sketch);
        out.extend_from_slice(&self.mac);
        out
    }

    /// Parse a record, dispatching on its version byte
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        let version = *bytes.first().ok_or(ExtractError::MalformedHelper)?;
        match version {
            HELPER_VERSION_V1 => Self::parse_v1(bytes),
            got => Err(ExtractError::VersionUnsupported { got }),
        }
    }

    fn parse_v1(bytes: &[u8]) -> Result<Self, ExtractError> {
        // fixed prefix up to the sketch length byte
        let fixed = 2 + SALT_BYTES + PERS_BYTES + 1;
        if bytes.len() < fixed {
            return Err(ExtractError::MalformedHelper);
        }
        let version = bytes[0];
        let algorithm_id = bytes[1];
        let mut salt = [0u8; SALT_BYTES];
        salt.copy_from_slice(&bytes[2..2 + SALT_BYTES]);
        let mut personalization = [0u8; PERS_BYTES];
        personalization.copy_from_slice(&bytes[2 + SALT_BYTES..2 + SALT_BYTES + PERS_BYTES]);
        let sketch_len = bytes[fixed - 1] as usize;
        if sketch_len > SKETCH_BYTES || bytes.len() != fixed + sketch_len + MAC_BYTES {
            return Err(ExtractError::MalformedHelper);
        }
        let sketch = bytes[fixed..fixed + sketch_len].to_vec();
        let mut mac = [0u8; MAC_BYTES];
        mac.copy_from_slice(&bytes[fixed + sketch_len..]);
        Ok(HelperData {
            version,
            algorithm_id,
            salt,
            personalization,
            sketch,
            mac,
        })
    }
}
