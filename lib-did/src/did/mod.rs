//! Deterministic network-scoped identifier derivation
//!
//! `did:cardano:<network>:z<base58btc(digest)>` where the digest is a
//! domain-tagged BLAKE2b-256 of the master key. Pure: the same master and
//! network always render the same identifier, which is the hook duplicate
//! detection hangs off.

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use lib_fuzzy::MasterKey;

use crate::error::CoreError;

type Blake2b256 = Blake2b<U32>;

/// Fixed DID method tag
pub const DID_METHOD: &str = "cardano";

/// Domain tag versioning the derivation itself
const DERIVATION_TAG: &[u8] = b"did-cardano-v1";

/// Deployment network the identifier is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Testnet,
    Preview,
    Preprod,
}

impl Network {
    pub fn tag(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Preview => "preview",
            Network::Preprod => "preprod",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "preview" => Ok(Network::Preview),
            "preprod" => Ok(Network::Preprod),
            other => Err(CoreError::MalformedRecord(format!(
                "unknown network tag: {other:?}"
            ))),
        }
    }
}

/// A derived decentralized identifier
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Did {
    network: Network,
    digest: [u8; 32],
}

impl Did {
    /// Derive the identifier for a master key on a network
    pub fn derive(master: &MasterKey, network: Network) -> Did {
        let mut hasher = Blake2b256::new();
        hasher.update(DERIVATION_TAG);
        hasher.update(network.tag().as_bytes());
        hasher.update(master.as_bytes());
        Did {
            network,
            digest: hasher.finalize().into(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Constant-time identifier comparison for verification outcomes
    pub fn matches_ct(&self, other: &Did) -> bool {
        let digests_equal: bool = self.digest.ct_eq(&other.digest).into();
        digests_equal & (self.network == other.network)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did:{}:{}:z{}",
            DID_METHOD,
            self.network,
            bs58::encode(&self.digest).into_string()
        )
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({self})")
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |why: &str| CoreError::MalformedRecord(format!("{why}: {s:?}"));

        let mut parts = s.splitn(4, ':');
        let (scheme, method, network, multibase) = (
            parts.next().ok_or_else(|| malformed("missing scheme"))?,
            parts.next().ok_or_else(|| malformed("missing method"))?,
            parts.next().ok_or_else(|| malformed("missing network"))?,
            parts.next().ok_or_else(|| malformed("missing identifier"))?,
        );
        if scheme != "did" || method != DID_METHOD {
            return Err(malformed("not a did:cardano identifier"));
        }
        let network = network.parse::<Network>()?;
        let encoded = multibase
            .strip_prefix('z')
            .ok_or_else(|| malformed("identifier must be base58btc multibase"))?;
        let raw = bs58::decode(encoded)
            .into_vec()
            .map_err(|_| malformed("invalid base58"))?;
        let digest: [u8; 32] = raw
            .try_into()
            .map_err(|_| malformed("identifier digest must be 32 bytes"))?;
        Ok(Did { network, digest })
    }
}

impl Serialize for Did {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
