//! CSPRNG draws for enrollment
//!
//! All randomness comes from the operating system generator. Seeds are
//! wrapped so they wipe on drop wherever the caller lets go of them.

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Fresh 32-byte per-enrollment salt
pub fn salt() -> [u8; 32] {
    let mut out = [0u8; 32];
    OsRng.fill_bytes(&mut out);
    out
}

/// Fresh 64-bit extractor seed, wiped on drop
pub fn seed() -> Zeroizing<[u8; 8]> {
    let mut out = Zeroizing::new([0u8; 8]);
    OsRng.fill_bytes(out.as_mut());
    out
}
