/// Tolerance used for every floating point comparison on weights and scores.
pub const EPSILON: f64 = 1e-9;
/// Nominal attributes with at least this many values per unit of node weight
/// are considered many-valued when averaging mutual information.
pub const MANY_VALUED_RATIO: f64 = 0.3;
/// Largest number of significant digits tried when shortening a threshold.
pub const MAX_THRESHOLD_DIGITS: usize = 15;
/// Significant digits at which label weights are compared for tie breaking.
pub const TIE_BREAK_DIGITS: usize = 9;

pub const DEFAULT_LOWER_BOUND_MIN_SPLIT_WEIGHT: f64 = 1.0;
pub const DEFAULT_UPPER_BOUND_MIN_SPLIT_WEIGHT: f64 = 25.0;
pub const DEFAULT_MIN_SPLIT_WEIGHT_PERCENT: f64 = 0.1;
/// Normal deviate roughly equivalent to a 25% confidence factor.
pub const DEFAULT_CONFIDENCE_Z: f64 = 0.6925;
pub const DEFAULT_LEAF_DIST_FACTOR: f64 = 1.0;
