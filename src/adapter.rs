// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine - Decimal Adapter

//! Adapter layer: converts the configuration's `Decimal` policy values into
//! the `f64` world the scorer computes in.
//!
//! Weights are validated in `Decimal` so that "sums to exactly 1" is an exact
//! check; the conversion happens once, at scorer construction.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::{ConfigError, SeverityBand, SeverityWeights};

/// Convert a Decimal policy value to f64, failing loudly instead of
/// substituting zero.
pub fn to_f64(name: &str, d: Decimal) -> Result<f64, ConfigError> {
    d.to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::Unrepresentable { name: name.to_string(), value: d })
}

/// Weights in canonical term order: CH, C-S-H, pH, porosity.
pub fn weights_to_f64(weights: &SeverityWeights) -> Result<[f64; 4], ConfigError> {
    let terms = weights.terms();
    Ok([
        to_f64(terms[0].0, terms[0].1)?,
        to_f64(terms[1].0, terms[1].1)?,
        to_f64(terms[2].0, terms[2].1)?,
        to_f64(terms[3].0, terms[3].1)?,
    ])
}

/// Band thresholds as `(label, min_score)`, order preserved.
pub fn bands_to_f64(bands: &[SeverityBand]) -> Result<Vec<(String, f64)>, ConfigError> {
    bands
        .iter()
        .map(|b| Ok((b.label.clone(), to_f64(&b.label, b.min_score)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_weights_convert_in_term_order() {
        let w = weights_to_f64(&SeverityWeights::default()).unwrap();
        assert_eq!(w, [0.40, 0.30, 0.20, 0.10]);
    }

    #[test]
    fn bands_keep_order() {
        let bands = bands_to_f64(&crate::config::default_bands()).unwrap();
        assert_eq!(bands[0], ("Very Severe".to_string(), 0.8));
        assert_eq!(bands.last().unwrap().1, 0.0);
    }

    #[test]
    fn decimal_policy_values_convert_exactly_enough() {
        assert_eq!(to_f64("w", dec!(0.25)).unwrap(), 0.25);
        assert_eq!(to_f64("w", dec!(1)).unwrap(), 1.0);
    }
}
