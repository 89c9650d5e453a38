//! Coercion of provider fields that may arrive as JSON numbers or numeric strings.

use std::fmt;

use serde::Deserialize;
use serde_json::Number;

use crate::ports::UpstreamError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
/// A numeric field as sent by a provider: either a JSON number or a string.
pub enum LooseNumber {
    /// Plain JSON number.
    Number(Number),
    /// Number encoded as text, e.g. `"25.03"`.
    Text(String),
}

impl fmt::Display for LooseNumber {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LooseNumber::Number(number) => write!(formatter, "{number}"),
            LooseNumber::Text(text) => formatter.write_str(text),
        }
    }
}

impl LooseNumber {
    /// Interpret the value as a finite coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidField`] when the value is not a finite number.
    pub fn to_f64(&self, field: &'static str) -> Result<f64, UpstreamError> {
        let parsed = match self {
            LooseNumber::Number(number) => number.as_f64(),
            LooseNumber::Text(text) => text.trim().parse::<f64>().ok(),
        };
        parsed
            .filter(|value| value.is_finite())
            .ok_or_else(|| self.invalid(field))
    }

    /// Interpret the value as a space count.
    ///
    /// Negative values are provider sentinels for "no data" and map to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidField`] when the value is not an integer or does not
    /// fit a `u32`.
    pub fn to_count(&self, field: &'static str) -> Result<Option<u32>, UpstreamError> {
        let parsed = match self {
            LooseNumber::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(integral)),
            LooseNumber::Text(text) => {
                let trimmed = text.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().and_then(integral))
            }
        };
        let value = parsed.ok_or_else(|| self.invalid(field))?;
        if value < 0 {
            return Ok(None);
        }
        u32::try_from(value)
            .map(Some)
            .map_err(|_err| self.invalid(field))
    }

    fn invalid(&self, field: &'static str) -> UpstreamError {
        UpstreamError::InvalidField {
            field,
            value: self.to_string(),
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "value is integral and inside the i64 range"
)]
fn integral(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value <= i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then_some(value as i64)
}
