use ahash::RandomState;

use crate::scalar::ScalarValue;

/// State used for all hashing operations during matching.
pub const HASH_RANDOM_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);

/// Hash a single value.
///
/// Values that compare equal hash to the same value. Notably an integral float
/// hashes the same as the equivalent integer so that mixed numeric keys land in
/// the same bucket.
pub fn hash_value(value: &ScalarValue) -> u64 {
    match value {
        ScalarValue::Null => null_hash_value(),
        ScalarValue::Boolean(v) => HASH_RANDOM_STATE.hash_one(v),
        ScalarValue::Int64(v) => HASH_RANDOM_STATE.hash_one(v),
        ScalarValue::Float64(v) => hash_f64(*v),
        ScalarValue::Utf8(v) => HASH_RANDOM_STATE.hash_one(v.as_str()),
        ScalarValue::Date(v) => HASH_RANDOM_STATE.hash_one(v),
    }
}

/// Hash a tuple of values.
pub fn hash_values<'a>(values: impl IntoIterator<Item = &'a ScalarValue>) -> u64 {
    let mut result = 0;
    for (idx, value) in values.into_iter().enumerate() {
        let value_hash = hash_value(value);
        if idx > 0 {
            result = combine_hashes(value_hash, result);
        } else {
            result = value_hash;
        }
    }
    result
}

fn hash_f64(v: f64) -> u64 {
    // Integral floats within i64 range hash as the integer.
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        return HASH_RANDOM_STATE.hash_one(v as i64);
    }
    HASH_RANDOM_STATE.hash_one(v.to_bits())
}

/// Combines two hashes into one hash
///
/// This implementation came from datafusion.
const fn combine_hashes(l: u64, r: u64) -> u64 {
    let hash = (17 * 37u64).wrapping_add(l);
    hash.wrapping_mul(37).wrapping_add(r)
}

/// All nulls should hash to the same value.
///
/// _What_ that value is is arbitrary, but it needs to be consistent.
fn null_hash_value() -> u64 {
    HASH_RANDOM_STATE.hash_one(1)
}
