//! Approximate COUNT(expr) over sampled input.
//!
//! Each input row may carry a sample weight (the number of rows it stands
//! for). The result is reported as `"<estimate> +/- <bound>"` where the bound
//! is the two-sided confidence interval half-width at the configured
//! confidence. The confidence travels with the partial state so partial
//! results computed on different nodes merge correctly.

use crate::aggregation::{AggregationKind, AggregationParameters, AggregationTemplate, NativeType};
use crate::error::{EvalResult, EvaluationError};
use crate::types::{Type, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApproximateCountState {
    /// Sum of sample weights
    pub count: u64,
    /// Number of sampled rows
    pub samples: u64,
    pub confidence: f64,
}

pub struct ApproximateCountAggregation;

impl<T: NativeType> AggregationTemplate<T> for ApproximateCountAggregation {
    type State = ApproximateCountState;

    const KIND: AggregationKind = AggregationKind::ApproximateCount;

    fn output_type() -> Type {
        Type::Varchar
    }

    fn init(parameters: &AggregationParameters) -> Self::State {
        ApproximateCountState {
            count: 0,
            samples: 0,
            confidence: parameters.confidence,
        }
    }

    fn input(state: &mut Self::State, _value: T::Native<'_>, weight: u64) -> EvalResult<()> {
        state.count = state.count.checked_add(weight).ok_or_else(overflow)?;
        state.samples = state.samples.checked_add(1).ok_or_else(overflow)?;
        Ok(())
    }

    fn combine(state: &mut Self::State, other: &Self::State) -> EvalResult<()> {
        if state.confidence != other.confidence {
            return Err(EvaluationError::IncompatibleState {
                reason: format!(
                    "confidence {} cannot merge with confidence {}",
                    state.confidence, other.confidence
                ),
            });
        }
        state.count = state.count.checked_add(other.count).ok_or_else(overflow)?;
        state.samples = state
            .samples
            .checked_add(other.samples)
            .ok_or_else(overflow)?;
        Ok(())
    }

    fn output(state: &Self::State) -> Value {
        let error = count_error(state.samples, state.count);
        Value::Varchar(format_approximate_result(
            state.count,
            error,
            state.confidence,
        ))
    }
}

fn overflow() -> EvaluationError {
    EvaluationError::Overflow {
        operation: "approx_count".to_string(),
    }
}

/// Standard error of a count estimated from `samples` rows standing for
/// `count` rows; infinite when the sample is too small to say anything.
pub fn count_error(samples: u64, count: u64) -> f64 {
    if count == 0 {
        return f64::INFINITY;
    }
    let samples = samples as f64;
    let p = samples / count as f64;
    let error = (1.0 / p) * (samples * (1.0 - p)).max(0.0).sqrt();
    if p < 0.01 && samples < 100.0 {
        return f64::INFINITY;
    }
    error
}

pub fn format_approximate_result(estimate: u64, error: f64, confidence: f64) -> String {
    let bound = z_score(confidence) * error;
    if bound.is_finite() {
        format!("{} +/- {}", estimate, bound.ceil() as u64)
    } else {
        format!("{} +/- Infinity", estimate)
    }
}

/// Two-sided standard normal quantile for a confidence level
pub fn z_score(confidence: f64) -> f64 {
    normal_quantile((1.0 + confidence) / 2.0)
}

// Acklam's rational approximation, relative error below 1.2e-9.
fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996,
        3.754408661907416,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p <= 0.0 {
        f64::NEG_INFINITY
    } else if p >= 1.0 {
        f64::INFINITY
    } else if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
