//! Enrollment: captures in, anchored identity out
//!
//! Per-finger work (quantize + extract) fans out onto scoped threads and
//! joins before aggregation - the per-finger computations are independent
//! and CPU-bound. After the master key and identifier are derived, the
//! duplicate-detection index is consulted: an existing non-revoked bundle
//! under the candidate identifier aborts the enrollment before anything
//! is emitted. An unreachable index also aborts; enrollment never
//! finalizes blind.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, info};

use lib_biometric::{quantize, FingerId, QuantizationParams};
use lib_fuzzy::{
    aggregate, extractor, AggregationPolicy, Contribution, FingerKey, HelperData, MasterKey,
};
use lib_storage::HelperStore;

use crate::did::{Did, Network};
use crate::error::{CoreError, ErrorMode};
use crate::flows::FingerCapture;
use crate::indexer::DidIndex;
use crate::metadata::bundle::{build_bundle, HelperEntry, HelperStorage, MetadataBundle};

/// Everything an enrollment is parameterized by
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub params: QuantizationParams,
    pub policy: AggregationPolicy,
    pub network: Network,
    pub controllers: BTreeSet<String>,
    pub storage: HelperStorage,
    pub mode: ErrorMode,
}

/// The outcome of a successful enrollment
///
/// `finger_keys` are handed back so the caller can drive rotation and
/// revocation within the session; they wipe themselves on drop.
#[derive(Debug)]
pub struct Enrollment {
    pub did: Did,
    pub master: MasterKey,
    pub bundle: MetadataBundle,
    pub finger_keys: BTreeMap<FingerId, FingerKey>,
}

/// Enroll a set of finger captures into a new anchored identity
pub fn enroll(
    captures: &[FingerCapture],
    request: &EnrollmentRequest,
    store: &(dyn HelperStore + Sync),
    index: &dyn DidIndex,
) -> Result<Enrollment, CoreError> {
    enroll_inner(captures, request, store, index).map_err(|e| e.sanitized(request.mode))
}

fn enroll_inner(
    captures: &[FingerCapture],
    request: &EnrollmentRequest,
    store: &(dyn HelperStore + Sync),
    index: &dyn DidIndex,
) -> Result<Enrollment, CoreError> {
    debug!(fingers = captures.len(), network = %request.network, "enrollment started");

    // Fan out per-finger quantization and extraction; join before
    // aggregation. Template buffers die inside the worker scope.
    type PerFinger = (FingerId, FingerKey, HelperData, u8);
    let mut per_finger: Vec<PerFinger> = Vec::with_capacity(captures.len());
    let results: Vec<Result<PerFinger, CoreError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = captures
            .iter()
            .map(|capture| {
                scope.spawn(move || -> Result<PerFinger, CoreError> {
                    let template = quantize(&capture.minutiae, capture.finger, &request.params)?;
                    let (key, helper) = extractor::gen(&template);
                    Ok((capture.finger, key, helper, template.quality()))
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
    for result in results {
        per_finger.push(result?);
    }

    // Persist helpers per the requested mode
    let mut helpers: BTreeMap<FingerId, HelperEntry> = BTreeMap::new();
    for (finger, _key, helper, _quality) in &per_finger {
        let bytes = helper.to_bytes();
        let entry = match request.storage {
            HelperStorage::Inline => HelperEntry::Inline { bytes },
            HelperStorage::External => {
                let reference = store.store(&bytes)?;
                HelperEntry::External {
                    uri: reference.uri,
                    integrity_hash: reference.integrity_hash,
                }
            }
        };
        helpers.insert(*finger, entry);
    }

    // Aggregate into the master and derive the candidate identifier
    let contributions: Vec<Contribution> = per_finger
        .iter()
        .map(|(finger, key, _helper, quality)| Contribution {
            finger: *finger,
            key: key.clone(),
            quality: *quality,
        })
        .collect();
    let master = aggregate(&contributions, &request.policy)?;
    let did = Did::derive(&master, request.network);

    // Sybil check: one biometric, one identifier
    if let Some(existing) = index.find_did(&did)? {
        if !existing.revoked {
            return Err(CoreError::DuplicateIdentity(did.to_string()));
        }
        debug!(did = %did, "prior enrollment found but revoked; proceeding");
    }

    let contributing: Vec<FingerId> = per_finger.iter().map(|(f, ..)| *f).collect();
    let bundle = build_bundle(
        did.clone(),
        helpers,
        &contributing,
        request.controllers.clone(),
        Utc::now(),
        request.policy.clone(),
        request.storage,
    )?;

    info!(did = %did, fingers = contributing.len(), "enrollment complete");
    Ok(Enrollment {
        did,
        master,
        bundle,
        finger_keys: per_finger
            .into_iter()
            .map(|(finger, key, _helper, _quality)| (finger, key))
            .collect(),
    })
}
