use super::{WatermarkEntry, WatermarkError, WatermarkStore};
use num_bigint::BigUint;
use std::sync::Mutex;

/// In-memory watermark list guarded by a single mutex. Lookup is linear —
/// the roster of distinct triples in a real deployment is tiny.
#[derive(Debug, Default)]
pub struct SessionWatermark {
    entries: Mutex<Vec<WatermarkEntry>>,
}

impl SessionWatermark {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: Vec<WatermarkEntry>) -> Self {
        SessionWatermark {
            entries: Mutex::new(entries),
        }
    }

    pub(super) fn check_and_update_locked(
        entries: &mut Vec<WatermarkEntry>,
        key_hash: &str,
        chain_id: &str,
        op_type: u8,
        level: &BigUint,
    ) -> bool {
        let op_type_str = op_type.to_string();
        let level_str = level.to_string();

        if let Some(entry) = entries.iter_mut().find(|e| {
            e.key_hash == key_hash && e.chain_id == chain_id && e.op_type == op_type_str
        }) {
            let current: BigUint = entry.level.parse().unwrap_or_default();
            if *level > current {
                entry.level = level_str;
                true
            } else {
                false
            }
        } else {
            entries.push(WatermarkEntry {
                key_hash: key_hash.to_string(),
                chain_id: chain_id.to_string(),
                op_type: op_type_str,
                level: level_str,
            });
            true
        }
    }
}

impl WatermarkStore for SessionWatermark {
    fn is_safe_to_sign(
        &self,
        key_hash: &str,
        chain_id: &str,
        op_type: u8,
        level: &BigUint,
    ) -> Result<bool, WatermarkError> {
        let mut entries = self.entries.lock()?;
        Ok(Self::check_and_update_locked(
            &mut entries,
            key_hash,
            chain_id,
            op_type,
            level,
        ))
    }
}
