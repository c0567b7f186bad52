// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Job timing statistics
//!
//! This module ties together the running mean and the windowed exponential
//! average of bucket processing times for a single job. Both trackers are
//! always updated together through [`JobTimingStats::record_bucket`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ewma::{validate_timestamp, WindowedEwmaTracker};
use crate::runningmean::{validate_duration, RunningMeanTracker};

/// Suffix appended to the job id to form the storage key
const STORAGE_KEY_SUFFIX: &str = "_timing_stats";

///
/// Return the key under which the timing stats for `job_id`
/// should be stored
///
pub fn storage_key(job_id: &str) -> String {
    format!("{}{}", job_id, STORAGE_KEY_SUFFIX)
}

/// Snapshot of the timing statistics of a job, for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Job identifier
    pub job_id: String,
    /// Number of buckets processed
    pub bucket_count: u64,
    /// Mean bucket processing time in milliseconds
    pub average_ms: f64,
    /// Fastest bucket in milliseconds
    pub minimum_ms: Option<f64>,
    /// Slowest bucket in milliseconds
    pub maximum_ms: Option<f64>,
    /// Recent (exponentially weighted) bucket processing time in milliseconds
    pub exponential_average_ms: f64,
    /// When the most recent bucket completed
    pub latest_timestamp: Option<DateTime<Utc>>,
}

impl std::fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} buckets, mean {:.3} ms, recent {:.3} ms",
            self.job_id, self.bucket_count, self.average_ms, self.exponential_average_ms
        )?;

        if let (Some(minimum), Some(maximum)) = (self.minimum_ms, self.maximum_ms) {
            write!(f, ", range {:.3}-{:.3} ms", minimum, maximum)?;
        }

        if let Some(latest) = self.latest_timestamp {
            write!(f, ", latest {}", latest.to_rfc3339())?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobTimingStats {
    job_id: String,
    running_mean: RunningMeanTracker,
    ewma: WindowedEwmaTracker,
}

impl JobTimingStats {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_owned(),
            running_mean: RunningMeanTracker::new(),
            ewma: WindowedEwmaTracker::new(),
        }
    }

    ///
    /// Rebuild timing stats for a job from its two (previously saved)
    /// trackers
    ///
    pub fn from_parts(
        job_id: &str,
        running_mean: RunningMeanTracker,
        ewma: WindowedEwmaTracker,
    ) -> Self {
        Self {
            job_id: job_id.to_owned(),
            running_mean,
            ewma,
        }
    }

    ///
    /// Record that a bucket for `job_id` finished at `timestamp` after
    /// `duration_ms` milliseconds of processing.
    ///
    /// Either both trackers take the sample or, on error, neither does.
    ///
    pub fn record_bucket(
        &mut self,
        job_id: &str,
        timestamp: DateTime<Utc>,
        duration_ms: f64,
    ) -> Result<(), Error> {
        if job_id != self.job_id {
            return Err(Error::InvalidArgument(format!(
                "Bucket for job '{}' cannot be recorded against job '{}'",
                job_id, self.job_id
            )));
        }

        validate_duration(duration_ms)?;
        validate_timestamp(timestamp)?;

        let mut running_mean = self.running_mean;
        let mut ewma = self.ewma;

        running_mean.update(duration_ms)?;
        ewma.observe(timestamp, duration_ms)?;

        self.running_mean = running_mean;
        self.ewma = ewma;

        Ok(())
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn document_id(&self) -> String {
        storage_key(&self.job_id)
    }

    pub fn average_bucket_processing_time_ms(&self) -> f64 {
        self.running_mean.current_mean()
    }

    pub fn exponential_average_bucket_processing_time_ms(&self) -> f64 {
        self.ewma.current_smoothed_value()
    }

    pub fn bucket_count(&self) -> u64 {
        self.running_mean.sample_count()
    }

    pub fn running_mean(&self) -> &RunningMeanTracker {
        &self.running_mean
    }

    pub fn ewma(&self) -> &WindowedEwmaTracker {
        &self.ewma
    }

    pub fn summary(&self) -> TimingSummary {
        TimingSummary {
            job_id: self.job_id.clone(),
            bucket_count: self.bucket_count(),
            average_ms: self.average_bucket_processing_time_ms(),
            minimum_ms: self.running_mean.minimum(),
            maximum_ms: self.running_mean.maximum(),
            exponential_average_ms: self.exponential_average_bucket_processing_time_ms(),
            latest_timestamp: self.ewma.latest_timestamp(),
        }
    }
}
