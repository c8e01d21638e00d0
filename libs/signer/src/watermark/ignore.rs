use super::{WatermarkError, WatermarkStore};
use num_bigint::BigUint;

/// Always safe, never records. Use with extreme care — this disables
/// anti-replay protection entirely.
#[derive(Debug, Default)]
pub struct IgnoreWatermark;

impl WatermarkStore for IgnoreWatermark {
    fn is_safe_to_sign(
        &self,
        _key_hash: &str,
        _chain_id: &str,
        _op_type: u8,
        _level: &BigUint,
    ) -> Result<bool, WatermarkError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_allows_even_decreasing_levels() {
        let w = IgnoreWatermark;
        assert!(w.is_safe_to_sign("tz1a", "chain", 1, &BigUint::from(10u32)).unwrap());
        assert!(w.is_safe_to_sign("tz1a", "chain", 1, &BigUint::from(1u32)).unwrap());
    }
}
