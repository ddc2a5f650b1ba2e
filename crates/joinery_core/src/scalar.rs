use std::cmp::Ordering;
use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Logical types for values in a row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Boolean,
    Int64,
    Float64,
    Utf8,
    Date,
}

impl DataType {
    pub const fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// If values of the two types can be compared with each other.
    ///
    /// Only the numeric types are comparable across types. Everything else
    /// requires an exact match.
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }

    /// If a distance (for closest matching) can be computed between values of
    /// this type.
    pub const fn supports_distance(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64 | DataType::Date)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "Boolean"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Date => write!(f, "Date"),
        }
    }
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScalarValue {
    /// Missing value.
    #[default]
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Date(NaiveDate),
}

impl ScalarValue {
    /// Returns the data type for this value, or None if the value is missing.
    pub fn datatype(&self) -> Option<DataType> {
        Some(match self {
            Self::Null => return None,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Date(_) => DataType::Date,
        })
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Compare two values.
    ///
    /// Returns None if either value is missing, if either value is NaN, or if
    /// the values are of incompatible types. A missing value never compares
    /// equal to anything, including another missing value.
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (Self::Float64(a), Self::Float64(b)) => a.partial_cmp(b),
            (Self::Int64(a), Self::Float64(b)) => cmp_i64_f64(*a, *b),
            (Self::Float64(a), Self::Int64(b)) => cmp_i64_f64(*b, *a).map(Ordering::reverse),
            (Self::Utf8(a), Self::Utf8(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Add a constant to this value.
    ///
    /// Dates are shifted by a number of days. Returns None if the addition
    /// isn't defined for the value types or would overflow. Missing values
    /// stay missing.
    pub fn checked_add(&self, by: &ScalarValue) -> Option<ScalarValue> {
        match (self, by) {
            (Self::Null, _) => Some(Self::Null),
            (Self::Int64(a), Self::Int64(b)) => a.checked_add(*b).map(Self::Int64),
            (Self::Float64(a), Self::Float64(b)) => Some(Self::Float64(a + b)),
            (Self::Float64(a), Self::Int64(b)) => Some(Self::Float64(a + *b as f64)),
            (Self::Date(d), Self::Int64(days)) => {
                if *days >= 0 {
                    d.checked_add_days(Days::new(*days as u64)).map(Self::Date)
                } else {
                    d.checked_sub_days(Days::new(days.unsigned_abs()))
                        .map(Self::Date)
                }
            }
            _ => None,
        }
    }

    /// Compute `self - other` as a distance.
    ///
    /// Dates produce a distance in days.
    pub fn distance_from(&self, other: &ScalarValue) -> Option<Distance> {
        match (self, other) {
            (Self::Int64(a), Self::Int64(b)) => {
                Some(match a.checked_sub(*b) {
                    Some(v) => Distance::Integer(v),
                    None => Distance::Float(*a as f64 - *b as f64),
                })
            }
            (Self::Float64(a), Self::Float64(b)) => Some(Distance::Float(a - b)),
            (Self::Int64(a), Self::Float64(b)) => Some(Distance::Float(*a as f64 - b)),
            (Self::Float64(a), Self::Int64(b)) => Some(Distance::Float(a - *b as f64)),
            (Self::Date(a), Self::Date(b)) => {
                Some(Distance::Integer(a.signed_duration_since(*b).num_days()))
            }
            _ => None,
        }
    }
}

/// Exact comparison of an integer with a float.
///
/// Casting the integer to f64 loses precision above 2^53, which would make
/// equality disagree with hashing (see `hash::hash_value`).
fn cmp_i64_f64(a: i64, b: f64) -> Option<Ordering> {
    // 2^63, exactly representable. i64::MIN is -2^63.
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

    if b.is_nan() {
        return None;
    }
    if b >= TWO_POW_63 {
        return Some(Ordering::Less);
    }
    if b < -TWO_POW_63 {
        return Some(Ordering::Greater);
    }

    // Truncated value is integral and within range, so the cast is exact.
    let whole = b.trunc() as i64;
    match a.cmp(&whole) {
        Ordering::Equal => 0.0.partial_cmp(&b.fract()),
        ord => Some(ord),
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NA"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl From<NaiveDate> for ScalarValue {
    fn from(value: NaiveDate) -> Self {
        ScalarValue::Date(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

/// Signed distance between two values, used to rank closest matches.
#[derive(Debug, Clone, Copy)]
pub enum Distance {
    Integer(i64),
    Float(f64),
}

impl Distance {
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Integer(v) => *v < 0,
            Self::Float(v) => *v < 0.0,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(v) => *v as f64,
            Self::Float(v) => *v,
        }
    }
}

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Distance {}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (a, b) => a.as_f64().total_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}
