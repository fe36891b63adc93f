//! Verification: fresh captures against an anchored bundle
//!
//! Helpers come back through the storage boundary, each finger reproduces
//! independently on scoped threads, and surviving keys aggregate under
//! the policy the bundle was enrolled with. The derived identifier is
//! compared in constant time against the anchored one. Individual finger
//! failures are tolerated as long as the fallback policy holds; the
//! identifier comparison is what finally decides. The index is never
//! consulted here.

use tracing::{debug, info};

use lib_biometric::{quantize, FingerTemplate, QuantizationParams};
use lib_fuzzy::{aggregate, extractor, Contribution};
use lib_storage::{BackendKind, HelperStore, StorageRef};

use crate::did::Did;
use crate::error::{CoreError, ErrorMode};
use crate::flows::FingerCapture;
use crate::metadata::bundle::{HelperEntry, MetadataBundle};

/// A successful verification outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The identifier the captures reproduced
    pub did: Did,
    /// How many fingers contributed to the reproduced master
    pub fingers_used: usize,
}

/// Verify fresh captures against an anchored bundle
pub fn verify(
    captures: &[FingerCapture],
    bundle: &MetadataBundle,
    params: &QuantizationParams,
    store: &(dyn HelperStore + Sync),
    mode: ErrorMode,
) -> Result<VerifiedIdentity, CoreError> {
    verify_inner(captures, bundle, params, store).map_err(|e| e.sanitized(mode))
}

fn verify_inner(
    captures: &[FingerCapture],
    bundle: &MetadataBundle,
    params: &QuantizationParams,
    store: &(dyn HelperStore + Sync),
) -> Result<VerifiedIdentity, CoreError> {
    if bundle.revoked {
        return Err(CoreError::RevokedBundle);
    }
    bundle.validate().map_err(CoreError::from)?;

    // Resolve helper bytes for every capture the bundle knows about. A
    // failed fetch costs that finger, not the attempt; the fallback
    // policy decides below whether enough fingers remain.
    let mut last_failure: Option<CoreError> = None;
    let mut work: Vec<(FingerCapture, Vec<u8>)> = Vec::new();
    for capture in captures {
        let Some(entry) = bundle.helpers.get(&capture.finger) else {
            debug!(finger = %capture.finger, "capture has no helper entry; skipped");
            continue;
        };
        let bytes = match entry {
            HelperEntry::Inline { bytes } => bytes.clone(),
            HelperEntry::External {
                uri,
                integrity_hash,
            } => {
                match store.fetch(&StorageRef {
                    backend: backend_for_uri(uri),
                    uri: uri.clone(),
                    integrity_hash: *integrity_hash,
                }) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        let err = CoreError::from(err);
                        debug!(finger = %capture.finger, code = err.code(), "helper fetch dropped");
                        last_failure = Some(err);
                        continue;
                    }
                }
            }
        };
        work.push((capture.clone(), bytes));
    }

    // Per-finger reproduction fans out; a failed finger is dropped and
    // the fallback policy decides whether the remainder is enough
    let results: Vec<Result<Contribution, CoreError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = work
            .iter()
            .map(|(capture, helper_bytes)| {
                scope.spawn(move || -> Result<Contribution, CoreError> {
                    let helper = extractor::helper_data::HelperData::from_bytes(helper_bytes)?;
                    let template: FingerTemplate =
                        quantize(&capture.minutiae, capture.finger, params)?;
                    let key = extractor::rep(&template, &helper)?;
                    Ok(Contribution {
                        finger: capture.finger,
                        key,
                        quality: template.quality(),
                    })
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(CoreError::ReproduceFailed))
            })
            .collect()
    });

    let mut contributions = Vec::new();
    for result in results {
        match result {
            Ok(contribution) => contributions.push(contribution),
            Err(err) => {
                debug!(code = err.code(), "finger reproduction dropped");
                last_failure = Some(err);
            }
        }
    }

    let master = match aggregate(&contributions, &bundle.aggregation_policy) {
        Ok(master) => master,
        Err(policy_err) => {
            // prefer the underlying failure when every finger died on the
            // same cryptographic cause
            return Err(match last_failure {
                Some(err) if contributions.is_empty() => err,
                _ => policy_err.into(),
            });
        }
    };

    let derived = Did::derive(&master, bundle.did.network());
    if !derived.matches_ct(&bundle.did) {
        return Err(CoreError::ReproduceFailed);
    }

    info!(did = %derived, fingers = contributions.len(), "verification succeeded");
    Ok(VerifiedIdentity {
        did: derived,
        fingers_used: contributions.len(),
    })
}

fn backend_for_uri(uri: &str) -> BackendKind {
    if uri.starts_with("file://") {
        BackendKind::Filesystem
    } else if uri.starts_with("mem://") {
        BackendKind::Inline
    } else {
        BackendKind::Network
    }
}
