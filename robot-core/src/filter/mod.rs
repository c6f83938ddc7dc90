//! Direct-form-I IIR filter backed by [`RingBuffer`] histories.
//!
//! Coefficients and both sample histories live in fixed ring buffers of `N`
//! slots, so a filter of order `k` needs `k + 1 <= N - 1`. Each call to
//! [`IirFilter::value`] shifts the histories by exactly one sample, most recent
//! first.

use core::fmt;

use crate::ring_buffer::RingBuffer;

/// Default ring size; supports filters up to order 6.
pub const DEFAULT_HISTORY: usize = 8;

/// Reasons a coefficient set is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterError {
    /// No coefficients were supplied.
    Empty,
    /// Numerator and denominator lengths differ.
    CoefficientMismatch { numerator: usize, denominator: usize },
    /// The requested order does not fit the history buffers.
    OrderTooLarge { order: usize, max: usize },
    /// `a0` is zero or not finite.
    InvalidLeadingCoefficient,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Empty => f.write_str("filter needs at least one coefficient"),
            FilterError::CoefficientMismatch {
                numerator,
                denominator,
            } => write!(
                f,
                "numerator has {numerator} coefficients but denominator has {denominator}"
            ),
            FilterError::OrderTooLarge { order, max } => {
                write!(f, "filter order {order} exceeds maximum {max}")
            }
            FilterError::InvalidLeadingCoefficient => {
                f.write_str("leading denominator coefficient must be finite and non-zero")
            }
        }
    }
}

/// Linear recursive filter `y = (Σ b_i·x[n-i] - Σ_{i≥1} a_i·y[n-i]) / a_0`.
#[derive(Clone, Debug)]
pub struct IirFilter<const N: usize = DEFAULT_HISTORY> {
    order: usize,
    numerator: RingBuffer<f32, N>,
    denominator: RingBuffer<f32, N>,
    inputs: RingBuffer<f32, N>,
    outputs: RingBuffer<f32, N>,
}

impl<const N: usize> IirFilter<N> {
    /// Builds a filter from matching coefficient slices with zeroed histories.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] when the slices are empty, differ in length,
    /// exceed the history capacity, or when `a0` cannot be divided by.
    pub fn new(numerator: &[f32], denominator: &[f32]) -> Result<Self, FilterError> {
        if numerator.is_empty() || denominator.is_empty() {
            return Err(FilterError::Empty);
        }
        if numerator.len() != denominator.len() {
            return Err(FilterError::CoefficientMismatch {
                numerator: numerator.len(),
                denominator: denominator.len(),
            });
        }

        let mut filter = Self {
            order: numerator.len() - 1,
            numerator: RingBuffer::new(),
            denominator: RingBuffer::new(),
            inputs: RingBuffer::new(),
            outputs: RingBuffer::new(),
        };
        if numerator.len() > filter.inputs.capacity() {
            return Err(FilterError::OrderTooLarge {
                order: filter.order,
                max: filter.inputs.capacity() - 1,
            });
        }

        let leading = denominator[0];
        if leading == 0.0 || !leading.is_finite() {
            return Err(FilterError::InvalidLeadingCoefficient);
        }

        for (&b, &a) in numerator.iter().zip(denominator) {
            filter.numerator.push_back(b);
            filter.denominator.push_back(a);
            filter.inputs.push_back(0.0);
            filter.outputs.push_back(0.0);
        }

        Ok(filter)
    }

    /// Pure gain filter (`y = x`).
    #[must_use]
    pub fn passthrough() -> Self {
        let mut filter = Self {
            order: 0,
            numerator: RingBuffer::new(),
            denominator: RingBuffer::new(),
            inputs: RingBuffer::new(),
            outputs: RingBuffer::new(),
        };
        filter.numerator.push_back(1.0);
        filter.denominator.push_back(1.0);
        filter.inputs.push_back(0.0);
        filter.outputs.push_back(0.0);
        filter
    }

    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Feeds one sample and returns the new output.
    pub fn value(&mut self, input: f32) -> f32 {
        self.inputs.push_front(input);
        self.inputs.pop_back();

        let mut acc = 0.0;
        for index in 0..=self.order {
            acc += self.numerator.get(index) * self.inputs.get(index);
        }
        for index in 1..=self.order {
            acc -= self.denominator.get(index) * self.outputs.get(index - 1);
        }
        let output = acc / self.denominator.get(0);

        self.outputs.push_front(output);
        self.outputs.pop_back();
        output
    }

    /// Most recent output without advancing the filter.
    #[must_use]
    pub fn last_output(&self) -> f32 {
        self.outputs.get(0)
    }

    /// Presets both histories to `value` so a steady input starts with no transient.
    pub fn set_to(&mut self, value: f32) {
        self.inputs.fill(value);
        self.outputs.fill(value);
    }

    /// Offsets both histories by `delta`, e.g. after re-zeroing a wrapped measurement.
    pub fn shift_by(&mut self, delta: f32) {
        self.inputs.update_each(|sample| sample + delta);
        self.outputs.update_each(|sample| sample + delta);
    }

    /// Returns the histories to zero, keeping the coefficients.
    pub fn reset(&mut self) {
        self.set_to(0.0);
    }
}
