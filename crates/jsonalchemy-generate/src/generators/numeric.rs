use rand::{Rng, RngCore};
use serde_json::{Number, Value};

use jsonalchemy_core::SchemaError;

use crate::constraints::ConstraintSet;
use crate::model::{FloatRange, IntRange};

/// Scan limit when searching integer multiples of a fractional step.
const MULTIPLE_SCAN: i128 = 10_000;

/// Integer within the set's bounds, honouring `multipleOf`.
pub(super) fn integer(
    set: &ConstraintSet,
    fallback: IntRange,
    attempts: u32,
    rng: &mut dyn RngCore,
) -> Result<Value, SchemaError> {
    let (lo, hi) = integer_span(set, fallback)?;
    let value = match set.multiple_of {
        None => rng.random_range(lo..=hi),
        Some(step) if step.fract() == 0.0 && step <= i64::MAX as f64 => {
            integral_multiple(set, lo, hi, step as i128, rng)?
        }
        Some(step) => fractional_multiple(set, lo, hi, step, attempts, rng)?,
    };
    Ok(Value::from(value))
}

/// Float within the set's bounds, honouring `multipleOf`.
pub(super) fn number(
    set: &ConstraintSet,
    fallback: FloatRange,
    rng: &mut dyn RngCore,
) -> Result<Value, SchemaError> {
    let (lower, upper) = set.number_bounds();
    let span = fallback.max - fallback.min;
    let (lo, hi) = match (lower, upper) {
        (Some(lo), Some(hi)) => (lo, hi),
        (Some(lo), None) if lo <= fallback.max => (lo, fallback.max),
        (Some(lo), None) => (lo, lo + span),
        (None, Some(hi)) if hi >= fallback.min => (fallback.min, hi),
        (None, Some(hi)) => (hi - span, hi),
        (None, None) => (fallback.min, fallback.max),
    };
    if lo > hi {
        return Err(SchemaError::unsatisfiable(
            &set.pointer,
            format!("no number between {lo} and {hi}"),
        ));
    }

    let value = match set.multiple_of {
        None => between(lo, hi, rng),
        Some(step) => {
            let k_lo = (lo / step).ceil();
            let k_hi = (hi / step).floor();
            if k_lo > k_hi {
                return Err(SchemaError::unsatisfiable(
                    &set.pointer,
                    format!("no multiple of {step} between {lo} and {hi}"),
                ));
            }
            let k_lo = k_lo.max(i64::MIN as f64) as i64;
            let k_hi = k_hi.min(i64::MAX as f64) as i64;
            let k = rng.random_range(k_lo..=k_hi);
            round_to_step(k as f64 * step, step)
        }
    };

    Number::from_f64(value).map(Value::Number).ok_or_else(|| {
        SchemaError::invalid(&set.pointer, format!("bounds produce a non-finite number {value}"))
    })
}

fn integer_span(set: &ConstraintSet, fallback: IntRange) -> Result<(i64, i64), SchemaError> {
    let span = fallback.max.saturating_sub(fallback.min);
    let (lo, hi) = match set.integer_bounds() {
        (Some(lo), Some(hi)) => (lo, hi),
        (Some(lo), None) if lo <= fallback.max => (lo, fallback.max),
        (Some(lo), None) => (lo, lo.saturating_add(span)),
        (None, Some(hi)) if hi >= fallback.min => (fallback.min, hi),
        (None, Some(hi)) => (hi.saturating_sub(span), hi),
        (None, None) => (fallback.min, fallback.max),
    };
    if lo > hi {
        return Err(SchemaError::unsatisfiable(
            &set.pointer,
            format!("no integer between {lo} and {hi}"),
        ));
    }
    Ok((lo, hi))
}

fn integral_multiple(
    set: &ConstraintSet,
    lo: i64,
    hi: i64,
    step: i128,
    rng: &mut dyn RngCore,
) -> Result<i64, SchemaError> {
    let k_lo = ceil_div(lo as i128, step);
    let k_hi = (hi as i128).div_euclid(step);
    if k_lo > k_hi {
        return Err(SchemaError::unsatisfiable(
            &set.pointer,
            format!("no multiple of {step} between {lo} and {hi}"),
        ));
    }
    let k = rng.random_range(k_lo..=k_hi);
    // k * step lies within [lo, hi], so it fits.
    Ok((k * step) as i64)
}

/// Integers that are multiples of a fractional step (for example `2.5`):
/// random draws first, then a bounded scan from the low end.
fn fractional_multiple(
    set: &ConstraintSet,
    lo: i64,
    hi: i64,
    step: f64,
    attempts: u32,
    rng: &mut dyn RngCore,
) -> Result<i64, SchemaError> {
    let k_lo = (lo as f64 / step).ceil() as i128;
    let k_hi = (hi as f64 / step).floor() as i128;
    let integral = |k: i128| {
        let value = k as f64 * step;
        let rounded = value.round();
        ((value - rounded).abs() < 1e-9 && rounded >= lo as f64 && rounded <= hi as f64)
            .then_some(rounded as i64)
    };
    if k_lo <= k_hi {
        for _ in 0..attempts {
            if let Some(value) = integral(rng.random_range(k_lo..=k_hi)) {
                return Ok(value);
            }
        }
        let end = k_hi.min(k_lo + MULTIPLE_SCAN);
        if let Some(value) = (k_lo..=end).find_map(integral) {
            return Ok(value);
        }
    }
    Err(SchemaError::unsatisfiable(
        &set.pointer,
        format!("no integer multiple of {step} between {lo} and {hi}"),
    ))
}

fn ceil_div(value: i128, step: i128) -> i128 {
    -(-value).div_euclid(step)
}

fn between(lo: f64, hi: f64, rng: &mut dyn RngCore) -> f64 {
    if lo == hi {
        return lo;
    }
    let t: f64 = rng.random();
    (lo * (1.0 - t) + hi * t).clamp(lo, hi)
}

/// Round `value` to the decimal places of `step` to drop float noise
/// (`3 * 0.1` becomes `0.3`).
fn round_to_step(value: f64, step: f64) -> f64 {
    let text = step.to_string();
    if text.contains(['e', 'E']) {
        return value;
    }
    let decimals = text.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    let scale = 10_f64.powi(decimals.min(15) as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() { rounded } else { value }
}
