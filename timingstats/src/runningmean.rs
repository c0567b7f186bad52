// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Cumulative running mean of bucket processing times
//!
//! The mean is updated incrementally from the previous mean and the number
//! of samples behind it, so no history of durations is ever stored.

use crate::error::Error;

/// Running mean (plus extremes) of every bucket duration applied so far
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMeanTracker {
    sample_count: u64,
    mean_ms: f64,
    minimum_ms: Option<f64>,
    maximum_ms: Option<f64>,
}

///
/// Check that a duration is something we can average - rejects
/// negative, NaN and infinite values
///
pub(crate) fn validate_duration(duration_ms: f64) -> Result<(), Error> {
    if !duration_ms.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "Duration must be finite, got {}",
            duration_ms
        )));
    }

    if duration_ms < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "Duration cannot be negative, got {}",
            duration_ms
        )));
    }

    Ok(())
}

impl RunningMeanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Rebuild a tracker from a stored mean and the number of samples
    /// that produced it. The extremes are unknown, so are left unset.
    ///
    pub fn from_parts(sample_count: u64, mean_ms: f64) -> Result<Self, Error> {
        validate_duration(mean_ms)?;

        Ok(Self {
            sample_count,
            mean_ms,
            minimum_ms: None,
            maximum_ms: None,
        })
    }

    pub(crate) fn with_extremes(
        mut self,
        minimum_ms: Option<f64>,
        maximum_ms: Option<f64>,
    ) -> Result<Self, Error> {
        if let Some(minimum_ms) = minimum_ms {
            validate_duration(minimum_ms)?;
        }

        if let Some(maximum_ms) = maximum_ms {
            validate_duration(maximum_ms)?;
        }

        self.minimum_ms = minimum_ms;
        self.maximum_ms = maximum_ms;
        Ok(self)
    }

    ///
    /// Incorporate one more bucket duration. Invalid durations are
    /// rejected without touching the tracker.
    ///
    pub fn update(&mut self, duration_ms: f64) -> Result<(), Error> {
        validate_duration(duration_ms)?;

        let count = self.sample_count as f64;
        let mean_ms = (self.mean_ms * count + duration_ms) / (count + 1.0);

        // a mean that no longer fits in an f64 could never be stored
        if !mean_ms.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "Duration {} overflows the running mean of {} buckets",
                duration_ms, self.sample_count
            )));
        }

        self.mean_ms = mean_ms;
        self.sample_count += 1;

        self.minimum_ms = Some(match self.minimum_ms {
            Some(minimum_ms) => minimum_ms.min(duration_ms),
            None => duration_ms,
        });

        self.maximum_ms = Some(match self.maximum_ms {
            Some(maximum_ms) => maximum_ms.max(duration_ms),
            None => duration_ms,
        });

        Ok(())
    }

    /// The running mean (0 for a fresh tracker)
    pub fn current_mean(&self) -> f64 {
        self.mean_ms
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum_ms
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum_ms
    }
}
