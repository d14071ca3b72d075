//! Run fingerprinting: deterministic identification of runs.
//!
//! - `ConfigHash`: identity of a serialized configuration value.
//! - `DatasetHash`: content hash of the input bars.
//! - `RunFingerprint`: both hashes plus the run id derived from them.
//!
//! All hashes are BLAKE3 over canonical bytes, stable across builds and
//! platforms.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::domain::Bar;

/// Hash of a configuration value's canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash any serializable configuration.
    ///
    /// Struct fields serialize in declaration order, so the JSON is canonical
    /// for a given type.
    pub fn of<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(value)?;
        Ok(Self::from_bytes(json.as_bytes()))
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a set of bar series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetHash(pub String);

impl DatasetHash {
    /// Hash every bar of every instrument, instruments visited in name order.
    pub fn of_universe(universe: &HashMap<String, Vec<Bar>>) -> Self {
        let mut names: Vec<&String> = universe.keys().collect();
        names.sort();

        let mut hasher = blake3::Hasher::new();
        for name in names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
            for bar in &universe[name] {
                hasher.update(bar.date.to_string().as_bytes());
                for v in [bar.open, bar.high, bar.low, bar.close] {
                    hasher.update(&v.to_le_bytes());
                }
                hasher.update(&bar.volume.to_le_bytes());
            }
        }
        Self(hasher.finalize().to_hex().to_string())
    }
}

impl fmt::Display for DatasetHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one run: configuration plus data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub run_id: String,
}

impl RunFingerprint {
    pub fn new(config_hash: ConfigHash, dataset_hash: DatasetHash) -> Self {
        let canonical = serde_json::json!({
            "config_hash": &config_hash.0,
            "dataset_hash": &dataset_hash.0,
        });
        let run_id = blake3::hash(canonical.to_string().as_bytes())
            .to_hex()
            .to_string();
        Self {
            config_hash,
            dataset_hash,
            run_id,
        }
    }

    /// First 12 hex characters of the run id, for display.
    pub fn short_id(&self) -> &str {
        &self.run_id[..12.min(self.run_id.len())]
    }
}
