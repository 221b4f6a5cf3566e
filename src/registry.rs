//! Builds the organization registry: one classification per creator uid,
//! folded from auxiliary CSV records with a precedence rule.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

/// Classification substring marking the low-precedence fallback category.
pub const FALLBACK_MARKER: &str = "其他";

/// One row of an auxiliary registry file.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgRecord {
    #[serde(rename = "kol_type")]
    pub classification: String,
    pub uid: String,
    #[serde(rename = "add_date")]
    pub registered: String,
}

#[derive(Debug, Clone)]
struct Winner {
    classification: String,
    registered: Option<i64>,
}

/// Mapping uid → classification, built once per run and read-only afterward.
#[derive(Debug, Default)]
pub struct OrgRegistry {
    entries: HashMap<String, Winner>,
}

impl OrgRegistry {
    /// Reads and folds every registry file in order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> Result<OrgRegistry> {
        let mut registry = OrgRegistry::default();
        for path in paths {
            let bytes = fs::read(path)?;
            registry.fold_csv(&bytes)?;
            debug!(path = %path.as_ref().display(), "registry file folded");
        }
        Ok(registry)
    }

    /// Folds the records of one CSV document into the registry.
    pub fn fold_csv(&mut self, bytes: &[u8]) -> Result<()> {
        let body = strip_bom(bytes);
        let mut reader = csv::Reader::from_reader(body);
        for record in reader.deserialize::<OrgRecord>() {
            self.fold(record?);
        }
        Ok(())
    }

    /// Applies the precedence rule for a single record:
    /// take when unseen; replace a fallback-category winner with a
    /// non-fallback record; otherwise replace only on a strictly greater
    /// numeric registration date. Non-numeric dates never compare.
    pub fn fold(&mut self, record: OrgRecord) {
        let incoming = Winner {
            registered: record.registered.trim().parse::<i64>().ok(),
            classification: record.classification,
        };

        match self.entries.entry(record.uid) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                let current_is_fallback = current.classification.contains(FALLBACK_MARKER);
                let incoming_is_fallback = incoming.classification.contains(FALLBACK_MARKER);
                if current_is_fallback && !incoming_is_fallback {
                    *current = incoming;
                } else if let (Some(new_date), Some(old_date)) =
                    (incoming.registered, current.registered)
                {
                    if new_date > old_date {
                        *current = incoming;
                    }
                }
            }
        }
    }

    /// Looks up the classification for a uid.
    pub fn classification(&self, uid: &str) -> Option<&str> {
        self.entries
            .get(uid)
            .map(|winner| winner.classification.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes)
}
