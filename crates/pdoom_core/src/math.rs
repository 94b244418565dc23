//! Fixed-point math utilities for deterministic simulation.
//!
//! Every scalar in the simulation (money, doom, skill, probabilities)
//! is a fixed-point number so that a session replayed on another CPU
//! produces bit-identical state and therefore an identical
//! verification hash. Floats only appear at the content boundary,
//! where human-authored decimals are converted once with a checked
//! conversion.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Upper bound of the doom scale.
pub const DOOM_MAX: Fixed = Fixed::from_bits(100_i64 << 32);

/// Convert a content-supplied decimal into [`Fixed`].
///
/// Returns `None` for NaN, infinities and values outside the
/// fixed-point range.
#[must_use]
pub fn fixed_from_decimal(value: f64) -> Option<Fixed> {
    if value.is_finite() {
        Fixed::checked_from_num(value)
    } else {
        None
    }
}

/// Clamp a value into `[min, max]`, reporting whether clamping occurred.
#[must_use]
pub fn clamp_reporting(value: Fixed, min: Fixed, max: Fixed) -> (Fixed, bool) {
    if value < min {
        (min, true)
    } else if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

/// Clamp a value to be non-negative, reporting whether clamping occurred.
#[must_use]
pub fn floor_zero_reporting(value: Fixed) -> (Fixed, bool) {
    if value < Fixed::ZERO {
        (Fixed::ZERO, true)
    } else {
        (value, false)
    }
}

/// Map a raw 64-bit draw onto `[0, 1)` using its upper 32 bits.
///
/// The result is exact: the upper half of the draw becomes the
/// fractional bits of the fixed-point value.
#[must_use]
pub fn unit_interval(draw: u64) -> Fixed {
    Fixed::from_bits((draw >> 32) as i64)
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries. Used by
/// every structure that feeds a verification digest.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-authored decimals.
///
/// Content and scenario files write `25000.0`, not raw bits. Values are
/// converted with [`fixed_from_decimal`] and rejected when out of range.
pub mod decimal_serde {
    use super::{fixed_from_decimal, Fixed};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a decimal into a fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        fixed_from_decimal(raw)
            .ok_or_else(|| D::Error::custom(format!("value {raw} is out of fixed-point range")))
    }
}

/// Serde support for optional human-authored decimals.
pub mod option_decimal_serde {
    use super::{fixed_from_decimal, Fixed};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional fixed-point number as a decimal.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_some(&v.to_num::<f64>()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<f64>::deserialize(deserializer)?;
        opt.map(|raw| {
            fixed_from_decimal(raw)
                .ok_or_else(|| D::Error::custom(format!("value {raw} is out of fixed-point range")))
        })
        .transpose()
    }
}

/// A fixed-point value carried by content as a decimal.
///
/// Convenience wrapper for places (enum payloads, map values) where a
/// `#[serde(with)]` attribute cannot be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decimal(#[serde(with = "decimal_serde")] pub Fixed);

impl From<Fixed> for Decimal {
    fn from(value: Fixed) -> Self {
        Self(value)
    }
}

impl From<Decimal> for Fixed {
    fn from(value: Decimal) -> Self {
        value.0
    }
}
