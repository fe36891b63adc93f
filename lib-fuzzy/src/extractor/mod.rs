//! Fuzzy extractor - `gen` at enrollment, `rep` at verification
//!
//! Secure sketch plus strong extractor. `gen` masks the template's leading
//! segment with a fresh random codeword; the mask (sketch), salt,
//! personalization and an HMAC form the public helper record. `rep`
//! authenticates the helper, unmasks with a noisy re-capture, decodes away
//! the noise and recovers the exact enrolled segment, from which the
//! 32-byte key is extracted. The key is therefore a deterministic function
//! of the biometric and the finger tag alone - the same finger always
//! yields the same key, which is what makes one biometric map to one
//! identifier - while the helper records themselves stay unlinkable
//! because each enrollment draws an independent masking seed and salt.
//! Wrong-finger presentations fail authentication because the
//! personalization tag is recomputed from the capture at hand.

pub mod helper_data;
pub mod recovery;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512, Digest};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use lib_biometric::{FingerId, FingerTemplate};

use crate::bch;
use crate::error::{BchError, ExtractError};
use crate::random;
use crate::secret::FingerKey;

use helper_data::{HelperData, ALGO_BCH127_BLAKE2B_HMACSHA256, HELPER_VERSION_V1, SKETCH_BYTES};
use recovery::RecoveryRecord;

type Blake2b256 = Blake2b<U32>;
type HmacSha256 = Hmac<Sha256>;

/// Domain tag separating this extractor from every other BLAKE2b caller
pub const DOMAIN_TAG: &[u8] = b"biodid.extract.v1";

/// Bits of the template covered by the secure sketch
pub const SEGMENT_BITS: usize = bch::BCH_N;

/// Finger-scoped personalization tag
pub fn personalization_for(finger: FingerId) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(DOMAIN_TAG);
    hasher.update(b".");
    hasher.update(finger.tag().as_bytes());
    hasher.finalize().into()
}

fn mac_key(salt: &[u8; 32], personalization: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    let mut hasher = Blake2b512::new();
    hasher.update(b"mac");
    hasher.update(salt);
    hasher.update(personalization);
    let digest = hasher.finalize();
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&digest[..32]);
    out
}

/// Strong extractor over the recovered template segment
///
/// Deliberately free of per-enrollment randomness: duplicate detection
/// relies on the same finger always extracting to the same key.
fn derive_key(personalization: &[u8; 32], segment: &[u8; SKETCH_BYTES]) -> FingerKey {
    let mut hasher = Blake2b512::new();
    hasher.update(b"key");
    hasher.update(personalization);
    hasher.update(segment);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    FingerKey::from_bytes(out)
}

fn compute_mac(
    key: &[u8; 32],
    version: u8,
    algorithm_id: u8,
    salt: &[u8; 32],
    personalization: &[u8; 32],
    sketch: &[u8],
) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(&[version, algorithm_id]);
    mac.update(salt);
    mac.update(personalization);
    mac.update(sketch);
    mac.finalize().into_bytes().into()
}

pub(crate) fn segment_word(template: &FingerTemplate) -> Zeroizing<u128> {
    let segment = Zeroizing::new(template.segment(SEGMENT_BITS));
    let mut bytes = Zeroizing::new([0u8; SKETCH_BYTES]);
    bytes.copy_from_slice(&segment);
    Zeroizing::new(u128::from_le_bytes(*bytes))
}

/// Enroll a template: derive a fresh key and its public helper record
pub fn gen(template: &FingerTemplate) -> (FingerKey, HelperData) {
    let salt = random::salt();
    let personalization = personalization_for(template.finger());
    let seed = random::seed();

    let codeword = Zeroizing::new(bch::encode(u64::from_le_bytes(*seed)));
    let word = segment_word(template);
    let masked = Zeroizing::new((*word ^ *codeword).to_le_bytes());
    let sketch = masked[..SKETCH_BYTES].to_vec();

    let key_for_mac = mac_key(&salt, &personalization);
    let mac = compute_mac(
        &key_for_mac,
        HELPER_VERSION_V1,
        ALGO_BCH127_BLAKE2B_HMACSHA256,
        &salt,
        &personalization,
        &sketch,
    );
    let segment_bytes = Zeroizing::new(word.to_le_bytes());
    let key = derive_key(&personalization, &segment_bytes);

    debug!(finger = %template.finger(), "enrolled helper record");
    (
        key,
        HelperData {
            version: HELPER_VERSION_V1,
            algorithm_id: ALGO_BCH127_BLAKE2B_HMACSHA256,
            salt,
            personalization,
            sketch,
            mac,
        },
    )
}

/// Enroll a template and additionally issue the parity recovery record
pub fn gen_with_recovery(template: &FingerTemplate) -> (FingerKey, HelperData, RecoveryRecord) {
    let (key, helper) = gen(template);
    let record = RecoveryRecord::issue(template, &helper);
    (key, helper, record)
}

/// Authenticate a helper record against a presented capture
///
/// Returns the personalization recomputed from the capture, which the key
/// derivation reuses.
fn authenticate(
    noisy: &FingerTemplate,
    helper: &HelperData,
) -> Result<[u8; 32], ExtractError> {
    if helper.version != HELPER_VERSION_V1 {
        return Err(ExtractError::VersionUnsupported {
            got: helper.version,
        });
    }
    if helper.algorithm_id != ALGO_BCH127_BLAKE2B_HMACSHA256 {
        return Err(ExtractError::VersionUnsupported {
            got: helper.algorithm_id,
        });
    }
    if helper.sketch.len() != SKETCH_BYTES {
        return Err(ExtractError::MalformedHelper);
    }

    // The MAC key comes from the personalization recomputed off the
    // presented capture; the MAC input covers the stored copy. A record
    // from a different finger fails on the key, a tampered record fails
    // on the input.
    let personalization = personalization_for(noisy.finger());
    let key_for_mac = mac_key(&helper.salt, &personalization);
    let expected = compute_mac(
        &key_for_mac,
        helper.version,
        helper.algorithm_id,
        &helper.salt,
        &helper.personalization,
        &helper.sketch,
    );
    if !constant_time_eq(&expected, &helper.mac) {
        return Err(ExtractError::MacMismatch);
    }
    Ok(personalization)
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// Re-encode the decoded seed, strip the mask, extract from the exact
/// enrolled segment
fn finish_rep(helper: &HelperData, personalization: &[u8; 32], msg: u64) -> FingerKey {
    let mut sketch_bytes = [0u8; SKETCH_BYTES];
    sketch_bytes.copy_from_slice(&helper.sketch);
    let codeword = Zeroizing::new(bch::encode(msg));
    let recovered = Zeroizing::new((*codeword ^ u128::from_le_bytes(sketch_bytes)).to_le_bytes());
    derive_key(personalization, &recovered)
}

/// Reproduce the enrolled key from a noisy re-capture and its helper
pub fn rep(noisy: &FingerTemplate, helper: &HelperData) -> Result<FingerKey, ExtractError> {
    let personalization = authenticate(noisy, helper)?;

    let word = segment_word(noisy);
    let mut sketch_bytes = [0u8; SKETCH_BYTES];
    sketch_bytes.copy_from_slice(&helper.sketch);
    let noisy_codeword = Zeroizing::new(*word ^ u128::from_le_bytes(sketch_bytes));

    match bch::decode(*noisy_codeword) {
        Ok((msg, _corrected)) => {
            debug!(finger = %noisy.finger(), "finger key reproduced");
            Ok(finish_rep(helper, &personalization, msg))
        }
        Err(BchError::UncorrectableErrors) => Err(ExtractError::UncorrectableErrors),
    }
}

/// Reproduce with the parity-guided retry engaged on decode failure
pub fn rep_with_recovery(
    noisy: &FingerTemplate,
    helper: &HelperData,
    record: &RecoveryRecord,
) -> Result<FingerKey, ExtractError> {
    let personalization = authenticate(noisy, helper)?;
    record.verify(helper)?;

    let word = segment_word(noisy);
    let mut sketch_bytes = [0u8; SKETCH_BYTES];
    sketch_bytes.copy_from_slice(&helper.sketch);
    let noisy_codeword = Zeroizing::new(*word ^ u128::from_le_bytes(sketch_bytes));

    let mismatch = bch::recovery::block_parities(*word) ^ record.block_parity;
    match bch::recovery::decode_with_parity(*noisy_codeword, mismatch) {
        Ok((msg, _corrected)) => {
            debug!(finger = %noisy.finger(), "finger key reproduced via parity retry");
            Ok(finish_rep(helper, &personalization, msg))
        }
        Err(BchError::UncorrectableErrors) => Err(ExtractError::UncorrectableErrors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_biometric::synthetic::{flip_template_bits, sample_minutiae};
    use lib_biometric::{quantize, QuantizationParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn template(seed: u64, finger: FingerId) -> FingerTemplate {
        let minutiae = sample_minutiae(&mut StdRng::seed_from_u64(seed), 30);
        quantize(&minutiae, finger, &QuantizationParams::default()).expect("quantize")
    }

    #[test]
    fn rep_reproduces_the_generated_key_exactly() {
        let t = template(1, FingerId::LeftIndex);
        let (key, helper) = gen(&t);
        let reproduced = rep(&t, &helper).expect("clean rep");
        assert_eq!(key, reproduced);
    }

    #[test]
    fn rep_survives_noise_up_to_correction_capacity() {
        let t = template(2, FingerId::LeftIndex);
        let (key, helper) = gen(&t);
        for flips in [1usize, 5, 10] {
            let mut noisy = t.clone();
            flip_template_bits(&mut noisy, &mut StdRng::seed_from_u64(flips as u64), flips, SEGMENT_BITS);
            let reproduced = rep(&noisy, &helper)
                .unwrap_or_else(|e| panic!("{flips} flips: {e}"));
            assert_eq!(key, reproduced, "{flips} flips");
        }
    }

    #[test]
    fn noise_past_capacity_is_uncorrectable() {
        let t = template(3, FingerId::LeftIndex);
        let (_key, helper) = gen(&t);
        let mut noisy = t.clone();
        flip_template_bits(&mut noisy, &mut StdRng::seed_from_u64(9), 11, SEGMENT_BITS);
        assert_eq!(rep(&noisy, &helper), Err(ExtractError::UncorrectableErrors));
    }

    #[test]
    fn parity_retry_recovers_one_extra_flip() {
        let t = template(4, FingerId::RightThumb);
        let (key, helper, record) = gen_with_recovery(&t);
        let mut noisy = t.clone();
        flip_template_bits(&mut noisy, &mut StdRng::seed_from_u64(21), 11, SEGMENT_BITS);
        assert!(rep(&noisy, &helper).is_err());
        let reproduced = rep_with_recovery(&noisy, &helper, &record).expect("parity retry");
        assert_eq!(key, reproduced);
    }

    #[test]
    fn tampering_any_helper_field_fails_authentication() {
        let t = template(5, FingerId::LeftThumb);
        let (_key, helper) = gen(&t);

        let mut sketch_tampered = helper.clone();
        sketch_tampered.sketch[4] ^= 0x01;
        assert_eq!(rep(&t, &sketch_tampered), Err(ExtractError::MacMismatch));

        let mut salt_tampered = helper.clone();
        salt_tampered.salt[0] ^= 0x80;
        assert_eq!(rep(&t, &salt_tampered), Err(ExtractError::MacMismatch));

        let mut pers_tampered = helper.clone();
        pers_tampered.personalization[7] ^= 0x10;
        assert_eq!(rep(&t, &pers_tampered), Err(ExtractError::MacMismatch));

        let mut mac_tampered = helper;
        mac_tampered.mac[31] ^= 0x01;
        assert_eq!(rep(&t, &mac_tampered), Err(ExtractError::MacMismatch));
    }

    #[test]
    fn wrong_finger_capture_fails_authentication() {
        let t = template(6, FingerId::LeftIndex);
        let (_key, helper) = gen(&t);
        let other = template(6, FingerId::RightIndex);
        assert_eq!(rep(&other, &helper), Err(ExtractError::MacMismatch));
    }

    #[test]
    fn future_versions_are_refused() {
        let t = template(7, FingerId::LeftIndex);
        let (_key, mut helper) = gen(&t);
        helper.version = 2;
        assert_eq!(
            rep(&t, &helper),
            Err(ExtractError::VersionUnsupported { got: 2 })
        );
    }

    #[test]
    fn distinct_enrollments_are_unlinkable_but_extract_the_same_key() {
        // same biometric, independent salts: helpers look unrelated while
        // the extracted key is identical, which duplicate detection
        // depends on
        let t = template(8, FingerId::RightRing);
        let (k1, h1) = gen(&t);
        let (k2, h2) = gen(&t);
        assert_eq!(k1, k2);
        assert_ne!(h1.salt, h2.salt);
        assert_ne!(h1.mac, h2.mac);
        let differing: u32 = h1
            .sketch
            .iter()
            .zip(h2.sketch.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert!(differing >= 21, "sketch pair distance {differing}");
    }

    #[test]
    fn key_depends_on_finger_and_template_only() {
        let left = template(8, FingerId::LeftIndex);
        let right = template(8, FingerId::RightIndex);
        let (k_left, _) = gen(&left);
        let (k_right, _) = gen(&right);
        // same synthetic minutiae, different finger tag: projection and
        // personalization both separate the keys
        assert_ne!(k_left, k_right);
    }

    #[test]
    fn sketch_pairs_look_independent_across_many_enrollments() {
        // two enrollments of one template differ by a random nonzero
        // codeword; across many pairs the mean distance must sit near
        // half the segment length
        let t = template(9, FingerId::LeftMiddle);
        let mut total: u64 = 0;
        let pairs = 400;
        for _ in 0..pairs {
            let (_ka, ha) = gen(&t);
            let (_kb, hb) = gen(&t);
            let d: u32 = ha
                .sketch
                .iter()
                .zip(hb.sketch.iter())
                .map(|(a, b)| (a ^ b).count_ones())
                .sum();
            assert!(d >= 21, "pair distance {d} below code distance");
            total += d as u64;
        }
        let mean = total as f64 / pairs as f64;
        assert!(
            (52.0..=76.0).contains(&mean),
            "mean sketch distance {mean} outside the independence band"
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]
            #[test]
            fn rep_round_trips_under_any_bounded_noise(
                flips in proptest::collection::btree_set(0usize..SEGMENT_BITS, 0..=10),
            ) {
                let t = template(99, FingerId::LeftLittle);
                let (key, helper) = gen(&t);
                let mut noisy = t.clone();
                for &bit in &flips {
                    noisy.flip_bit(bit);
                }
                let reproduced = rep(&noisy, &helper).expect("within capacity");
                prop_assert_eq!(key, reproduced);
            }
        }
    }

    #[test]
    fn helper_bytes_have_full_entropy() {
        // pooled per-position byte histogram over a corpus of enrollments
        fn shannon_bits(histogram: &[u32; 256], samples: f64) -> f64 {
            histogram
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / samples;
                    -p * p.log2()
                })
                .sum()
        }

        let t = template(10, FingerId::RightLittle);
        let mut salt_hist = [0u32; 256];
        let mut mac_hist = [0u32; 256];
        let enrollments = 1000;
        for _ in 0..enrollments {
            let (_k, h) = gen(&t);
            for &b in &h.salt {
                salt_hist[b as usize] += 1;
            }
            for &b in &h.mac {
                mac_hist[b as usize] += 1;
            }
        }
        let samples = (enrollments * 32) as f64;
        assert!(shannon_bits(&salt_hist, samples) >= 7.9);
        assert!(shannon_bits(&mac_hist, samples) >= 7.9);
    }
}
