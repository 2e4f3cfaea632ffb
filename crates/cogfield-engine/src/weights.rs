//! Adaptive weight smoothing.
//!
//! Advisor proposals are blended into the current vector with an exponential
//! moving average, renormalized, and rounded to 4 decimals:
//!
//! ```text
//!   w_new = α · w_candidate + (1 − α) · w_current      α = 0.3
//! ```
//!
//! Invalid proposals are rejected whole; the optimizer never stores a vector
//! that fails to sum to one.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span};

use cogfield_core::tracing_config::span_names;
use cogfield_core::{CandidateWeights, Channel, WeightVector, round_to};

/// Blend factor applied to the candidate vector.
pub const SMOOTHING_ALPHA: f64 = 0.3;

/// Default number of past vectors retained.
pub const DEFAULT_WEIGHT_HISTORY: usize = 20;

const WEIGHT_DECIMALS: i32 = 4;

/// Why a candidate vector was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    MissingKey(Channel),
    NotFinite(Channel),
    Negative(Channel),
    ZeroTotal,
}

/// Check a candidate for completeness and sanity.
///
/// # Errors
///
/// Returns the first [`Rejection`] found, checking channels in canonical order.
pub fn validate(candidate: &CandidateWeights) -> Result<WeightVector, Rejection> {
    let mut weights = WeightVector::DEFAULT;
    for channel in Channel::ALL {
        let value = candidate
            .get(channel)
            .ok_or(Rejection::MissingKey(channel))?;
        if !value.is_finite() {
            return Err(Rejection::NotFinite(channel));
        }
        if value < 0.0 {
            return Err(Rejection::Negative(channel));
        }
        weights.set(channel, value);
    }
    if weights.sum() <= 0.0 {
        return Err(Rejection::ZeroTotal);
    }
    Ok(weights)
}

/// Current weight vector plus a bounded history of accepted updates.
#[derive(Debug, Clone)]
pub struct WeightOptimizer {
    current: WeightVector,
    history: VecDeque<WeightVector>,
    capacity: usize,
}

impl Default for WeightOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_WEIGHT_HISTORY)
    }
}

impl WeightOptimizer {
    /// Create an optimizer at the default vector. A zero capacity is promoted
    /// to one.
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        let capacity = history_capacity.max(1);
        Self {
            current: WeightVector::DEFAULT,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Blend `candidate` into the current vector and return the result.
    ///
    /// An invalid candidate leaves the optimizer untouched and returns the
    /// current vector.
    pub fn update(&mut self, candidate: &CandidateWeights) -> WeightVector {
        let proposed = match validate(candidate) {
            Ok(weights) => weights,
            Err(rejection) => {
                debug!(?rejection, "candidate weights rejected");
                return self.current;
            }
        };
        let _span = debug_span!(span_names::WEIGHT_UPDATE).entered();

        let current = self.current;
        let mut smoothed = WeightVector::from_fn(|channel| {
            SMOOTHING_ALPHA.mul_add(
                proposed.get(channel),
                (1.0 - SMOOTHING_ALPHA) * current.get(channel),
            )
        });

        let total = smoothed.sum();
        if total > 0.0 {
            smoothed = WeightVector::from_fn(|channel| {
                round_to(smoothed.get(channel) / total, WEIGHT_DECIMALS)
            });
            absorb_rounding_residual(&mut smoothed);
        }

        self.current = smoothed;
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(smoothed);
        debug!(
            wifi = smoothed.wifi,
            bt = smoothed.bt,
            net = smoothed.net,
            sys = smoothed.sys,
            "weights updated"
        );
        smoothed
    }

    #[must_use]
    pub const fn current(&self) -> WeightVector {
        self.current
    }

    /// All retained vectors, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<WeightVector> {
        self.history.iter().copied().collect()
    }

    /// The `n` most recent vectors, oldest first.
    #[must_use]
    pub fn recent_history(&self, n: usize) -> Vec<WeightVector> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).copied().collect()
    }

    #[must_use]
    pub const fn history_capacity(&self) -> usize {
        self.capacity
    }

    /// Back to the default vector with an empty history.
    pub fn reset(&mut self) {
        self.current = WeightVector::DEFAULT;
        self.history.clear();
    }
}

/// Fold the 4-decimal rounding residual into the largest weight.
fn absorb_rounding_residual(weights: &mut WeightVector) {
    let residual = 1.0 - weights.sum();
    if residual.abs() < f64::EPSILON {
        return;
    }
    let largest = Channel::ALL
        .into_iter()
        .max_by(|a, b| weights.get(*a).total_cmp(&weights.get(*b)))
        .unwrap_or(Channel::Net);
    let adjusted = round_to(weights.get(largest) + residual, WEIGHT_DECIMALS);
    weights.set(largest, adjusted);
}
