use crate::constants::{EPSILON, MAX_THRESHOLD_DIGITS};
use crate::errors::TreeError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

pub fn fmt_vec_output(v: &[f64]) -> String {
    let mut res = String::new();
    if let Some(last) = v.len().checked_sub(1) {
        if last == 0 {
            return format!("{:.4}", v[0]);
        }
        for n in &v[..last] {
            res.push_str(format!("{:.4}", n).as_str());
            res.push_str(", ");
        }
        res.push_str(format!("{:.4}", &v[last]).as_str());
    }
    res
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), TreeError> {
    validate_float_parameter(value, 0.0, f64::INFINITY, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), TreeError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(TreeError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Calculate if a value is missing, missing values are stored as NaN.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Tolerance based equality, the tolerance grows with the magnitude of the values.
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

#[inline]
pub fn approx_zero(v: f64) -> bool {
    approx_eq(v, 0.0)
}

/// `a` is larger than `b` by more than the tolerance.
#[inline]
pub fn definitely_greater(a: f64, b: f64) -> bool {
    a > b && !approx_eq(a, b)
}

/// Entropy in bits of a vector of non negative weights.
pub fn entropy(weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if approx_zero(total) {
        return 0.0;
    }
    let h: f64 = weights
        .iter()
        .filter(|w| **w > 0.0)
        .map(|w| {
            let p = w / total;
            -p * p.log2()
        })
        .sum();
    h.max(0.0)
}

/// Upper bound of the Wilson score interval of the error rate, returned as a
/// number of errors. With `z == 0` no correction is applied.
pub fn pessimistic_errors(errors: f64, total: f64, z: f64) -> f64 {
    if approx_zero(total) {
        return 0.0;
    }
    if z <= 0.0 {
        return errors;
    }
    let f = (errors / total).clamp(0.0, 1.0);
    let z2 = z * z;
    let centre = f + z2 / (2.0 * total);
    let spread = z * (f * (1.0 - f) / total + z2 / (4.0 * total * total)).sqrt();
    let upper = (centre + spread) / (1.0 + z2 / total);
    (upper.min(1.0) * total).max(errors)
}

/// Round `v` to `digits` significant digits.
pub fn round_significant(v: f64, digits: usize) -> f64 {
    if v == 0.0 || !v.is_finite() {
        return v;
    }
    let magnitude = v.abs().log10().floor() as i32;
    let p = (digits as i32) - 1 - magnitude;
    precision_round(v, p)
}

/// Pick a threshold `t` with `low <= t < high`, using the fewest significant
/// digits of the midpoint that still separate the two values.
pub fn shorten_threshold(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    for digits in 1..=MAX_THRESHOLD_DIGITS {
        let t = round_significant(mid, digits);
        if low <= t && t < high {
            return t;
        }
    }
    if mid < high {
        mid
    } else {
        low
    }
}

#[inline]
pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}
