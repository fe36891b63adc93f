//! The v1.1 metadata bundle and its validation rules
//!
//! The bundle is what anchors an enrollment on chain: identifier,
//! controller set, helper references, fallback policy, timestamps and
//! revocation state. Immutable once built except for the controller-gated
//! one-way transition to `revoked`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use lib_biometric::FingerId;
use lib_fuzzy::AggregationPolicy;

use crate::did::{Did, Network};
use crate::metadata::{codec, MetadataError};

/// Schema revision this build writes
pub const BUNDLE_VERSION: &str = "1.1";
/// Transaction-metadata label the bundle is filed under
pub const METADATA_LABEL: u64 = 674;
/// Ceiling for the labeled inline encoding
pub const MAX_INLINE_BYTES: usize = 16 * 1024;

/// Where helper records live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperStorage {
    /// Helper bytes travel inside the bundle
    Inline,
    /// Helper bytes live in a backend; the bundle carries locator + hash
    External,
}

/// One finger's helper reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HelperEntry {
    Inline {
        #[serde(with = "hex_vec")]
        bytes: Vec<u8>,
    },
    External {
        uri: String,
        #[serde(with = "hex32")]
        integrity_hash: [u8; 32],
    },
}

/// Versioned enrollment record, serialized as canonical JSON and
/// deterministic CBOR under label 674
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataBundle {
    /// Schema revision
    pub version: String,
    /// The anchored identifier
    pub did: Did,
    /// Addresses authorized to update or revoke, non-empty
    pub controllers: BTreeSet<String>,
    /// Declared storage mode for every helper entry
    pub helper_storage: HelperStorage,
    /// Helper reference per contributing finger
    pub helpers: BTreeMap<FingerId, HelperEntry>,
    /// When the enrollment was performed
    pub enrollment_timestamp: DateTime<Utc>,
    /// One-way revocation flag
    pub revoked: bool,
    /// Set when `revoked` flips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_timestamp: Option<DateTime<Utc>>,
    /// Fallback policy the enrollment was performed under
    pub aggregation_policy: AggregationPolicy,
}

impl MetadataBundle {
    /// Run every schema check; valid bundles pass unchanged forever
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.version != BUNDLE_VERSION {
            return Err(MetadataError::UnsupportedVersion(self.version.clone()));
        }
        if self.controllers.is_empty() {
            return Err(MetadataError::NoControllers);
        }
        let network = self.did.network();
        for address in &self.controllers {
            if !controller_well_formed(address, network) {
                return Err(MetadataError::MalformedController {
                    network: network.tag().to_string(),
                    address: address.clone(),
                });
            }
        }
        for (finger, entry) in &self.helpers {
            match (self.helper_storage, entry) {
                (HelperStorage::Inline, HelperEntry::Inline { .. }) => {}
                (HelperStorage::External, HelperEntry::External { uri, .. }) => {
                    if uri.is_empty() {
                        return Err(MetadataError::EmptyHelperUri(finger.tag().to_string()));
                    }
                }
                _ => return Err(MetadataError::MixedStorageMode),
            }
        }
        if self.helper_storage == HelperStorage::Inline {
            let size = codec::labeled_cbor_size(self)?;
            if size > MAX_INLINE_BYTES {
                return Err(MetadataError::BundleTooLarge {
                    size,
                    limit: MAX_INLINE_BYTES,
                });
            }
        }
        if self.revoked {
            match self.revocation_timestamp {
                Some(ts) if ts >= self.enrollment_timestamp => {}
                _ => return Err(MetadataError::InvalidRevocationTimestamp),
            }
        }
        Ok(())
    }

    /// Controller-gated one-way transition to revoked
    pub fn revoke(&mut self, signer: &str) -> Result<(), MetadataError> {
        if !self.controllers.contains(signer) {
            return Err(MetadataError::UnauthorizedController(signer.to_string()));
        }
        if self.revoked {
            return Err(MetadataError::AlreadyRevoked);
        }
        self.revoked = true;
        self.revocation_timestamp = Some(Utc::now());
        info!(did = %self.did, "bundle revoked");
        Ok(())
    }
}

/// Assemble and validate a bundle for a fresh enrollment
///
/// `contributing` names the fingers whose keys went into the master; each
/// must have a helper entry.
#[allow(clippy::too_many_arguments)]
pub fn build_bundle(
    did: Did,
    helpers: BTreeMap<FingerId, HelperEntry>,
    contributing: &[FingerId],
    controllers: BTreeSet<String>,
    enrollment_timestamp: DateTime<Utc>,
    policy: AggregationPolicy,
    storage: HelperStorage,
) -> Result<MetadataBundle, MetadataError> {
    for finger in contributing {
        if !helpers.contains_key(finger) {
            return Err(MetadataError::MissingHelper(finger.tag().to_string()));
        }
    }
    let bundle = MetadataBundle {
        version: BUNDLE_VERSION.to_string(),
        did,
        controllers,
        helper_storage: storage,
        helpers,
        enrollment_timestamp,
        revoked: false,
        revocation_timestamp: None,
        aggregation_policy: policy,
    };
    bundle.validate()?;
    Ok(bundle)
}

/// Shallow shape check for a controller address on a network
///
/// Payment and stake addresses in bech32 form; full parsing belongs to
/// the transaction layer.
fn controller_well_formed(address: &str, network: Network) -> bool {
    let prefix_ok = match network {
        Network::Mainnet => address.starts_with("addr1") || address.starts_with("stake1"),
        _ => address.starts_with("addr_test1") || address.starts_with("stake_test1"),
    };
    prefix_ok
        && address.len() >= 20
        && address
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(de)?;
        let raw = hex::decode(&s).map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|_| serde::de::Error::custom("integrity hash must be 32 bytes"))
    }
}
