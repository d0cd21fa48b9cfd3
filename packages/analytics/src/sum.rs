//! Compensated floating-point summation.
//!
//! A ward can collect thousands of clipped pieces of very different sizes.
//! Naive left-to-right summation drifts and, worse, depends on the order in
//! which parallel workers happened to deliver them.

/// Running Neumaier sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sum: 0.0,
            compensation: 0.0,
        }
    }

    pub fn add(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        for value in iter {
            acc.add(value);
        }
        acc
    }
}

/// Order-independent sum of `values`.
///
/// Values are sorted by magnitude (ties broken by value) and then summed
/// with compensation, so any permutation of the same inputs produces the
/// bit-identical result.
#[must_use]
pub fn stable_sum(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.abs().total_cmp(&b.abs()).then(a.total_cmp(b)));
    values.iter().copied().collect::<CompensatedSum>().value()
}
