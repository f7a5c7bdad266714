//! Incremental running statistics.
//!
//! [`RunningAverage`] maintains a mean over a stream of data without storing
//! the data; [`RunningAverageAndStdDev`] additionally tracks spread with
//! Welford's online algorithm. Both support removing a previously added datum
//! and taking a sign-inverted snapshot, which is how item-item preference
//! diffs are read in the opposite direction.
//!
//! # Examples
//!
//! ```
//! use sugerir::stats::RunningAverage;
//!
//! let mut avg = RunningAverage::new();
//! avg.add(2.0);
//! avg.add(4.0);
//! assert_eq!(avg.mean(), 3.0);
//! assert_eq!(avg.count(), 2);
//!
//! avg.remove(4.0).unwrap();
//! assert_eq!(avg.mean(), 2.0);
//! ```

use crate::error::{Result, SugerirError};
use serde::{Deserialize, Serialize};

/// Incremental mean over a stream of data.
///
/// An empty average has count 0 and a NaN mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningAverage {
    count: u64,
    mean: f64,
}

impl Default for RunningAverage {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningAverage {
    /// Create an empty average.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
        }
    }

    /// Add a datum.
    pub fn add(&mut self, datum: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = datum;
        } else {
            let n = self.count as f64;
            self.mean = self.mean * (n - 1.0) / n + datum / n;
        }
    }

    /// Remove a previously added datum. Removing the last datum leaves the
    /// average empty again.
    pub fn remove(&mut self, datum: f64) -> Result<()> {
        if self.count == 0 {
            return Err(SugerirError::empty_input("running average"));
        }
        self.count -= 1;
        if self.count == 0 {
            self.mean = f64::NAN;
        } else {
            let n = self.count as f64;
            self.mean = (self.mean * (n + 1.0) - datum) / n;
        }
        Ok(())
    }

    /// Shift every retained datum by `delta`, as when all underlying values
    /// move by a constant amount: the mean moves by `delta`, the count is
    /// unchanged.
    pub fn change(&mut self, delta: f64) -> Result<()> {
        if self.count == 0 {
            return Err(SugerirError::empty_input("running average"));
        }
        self.mean += delta;
        Ok(())
    }

    /// Number of data points.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Current mean; NaN when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Whether no data has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sign-inverted snapshot: same count, negated mean.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            count: self.count,
            mean: -self.mean,
        }
    }
}

/// Incremental mean and spread, via Welford's online algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunningAverageAndStdDev {
    count: u64,
    mean: f64,
    // Sum of squared deviations from the mean.
    m2: f64,
}

impl Default for RunningAverageAndStdDev {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningAverageAndStdDev {
    /// Create an empty statistic.
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: f64::NAN,
            m2: 0.0,
        }
    }

    /// Add a datum.
    pub fn add(&mut self, datum: f64) {
        self.count += 1;
        if self.count == 1 {
            self.mean = datum;
            self.m2 = 0.0;
        } else {
            let delta = datum - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (datum - self.mean);
        }
    }

    /// Remove a previously added datum by reversing the Welford update.
    pub fn remove(&mut self, datum: f64) -> Result<()> {
        if self.count == 0 {
            return Err(SugerirError::empty_input("running average"));
        }
        if self.count == 1 {
            *self = Self::new();
            return Ok(());
        }
        let old_mean = self.mean;
        let n = (self.count - 1) as f64;
        self.mean = (old_mean * self.count as f64 - datum) / n;
        self.m2 -= (datum - self.mean) * (datum - old_mean);
        // Guard against tiny negative drift from float cancellation.
        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
        self.count -= 1;
        Ok(())
    }

    /// Shifting the data would invalidate the tracked spread, because the
    /// original datum is unknown; this always fails.
    pub fn change(&mut self, _delta: f64) -> Result<()> {
        Err(SugerirError::unsupported(
            "change",
            "cannot shift a spread-tracking statistic without the original datum",
        ))
    }

    /// Number of data points.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Current mean; NaN when empty.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation; NaN when fewer than two data points.
    #[must_use]
    pub fn standard_deviation(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    /// Whether no data has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sign-inverted snapshot: negated mean, identical count and spread.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            count: self.count,
            mean: -self.mean,
            m2: self.m2,
        }
    }
}
