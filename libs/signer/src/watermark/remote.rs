use super::{WatermarkError, WatermarkStore};
use num_bigint::BigUint;

/// The wide-column / key-value table a `RemoteWatermark` writes through.
/// A thin adapter boundary: the concrete cloud SDK wiring is out of scope
/// for this crate (vendor RPC details are an external collaborator), but
/// the CAS contract it must honor is pinned down here.
pub trait RemoteTable: Send + Sync {
    /// Strongly-consistent read of the current level for `row_key`, if any.
    fn get_current_level(&self, row_key: &str) -> Result<Option<BigUint>, WatermarkError>;

    /// `put_if_absent(Level=level)`. Returns `false` if the row already
    /// existed (a racing writer won).
    fn put_if_absent(&self, row_key: &str, level: &BigUint) -> Result<bool, WatermarkError>;

    /// `update_if(currentLevel=expected, Level=new)`, a compare-and-set.
    /// Returns `false` on any conditional-write failure.
    fn update_if(
        &self,
        row_key: &str,
        expected: &BigUint,
        new: &BigUint,
    ) -> Result<bool, WatermarkError>;
}

/// Watermark store backed by a remote wide-column table. The row key is
/// `"<key_hash>-<chain_id>-<op_type>"`. No in-process locking: correctness
/// is enforced entirely by the table's conditional writes.
pub struct RemoteWatermark<T: RemoteTable> {
    table: T,
}

impl<T: RemoteTable> RemoteWatermark<T> {
    pub fn new(table: T) -> Self {
        RemoteWatermark { table }
    }
}

fn row_key(key_hash: &str, chain_id: &str, op_type: u8) -> String {
    format!("{key_hash}-{chain_id}-{op_type}")
}

impl<T: RemoteTable> WatermarkStore for RemoteWatermark<T> {
    fn is_safe_to_sign(
        &self,
        key_hash: &str,
        chain_id: &str,
        op_type: u8,
        level: &BigUint,
    ) -> Result<bool, WatermarkError> {
        let row = row_key(key_hash, chain_id, op_type);
        match self.table.get_current_level(&row)? {
            None => self.table.put_if_absent(&row, level),
            Some(current) => {
                if *level <= current {
                    log::warn!("remote watermark denial: {row} at {level}, current {current}");
                    Ok(false)
                } else {
                    self.table.update_if(&row, &current, level)
                }
            }
        }
    }
}
