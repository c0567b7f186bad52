// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Time-windowed exponentially weighted moving average
//!
//! Samples are accumulated into fixed one hour windows that are aligned to
//! absolute (epoch) hour boundaries. Within a window the reported value is a
//! continuous blend of the average carried over from earlier windows and the
//! value accumulated so far in this window, with the weight of the carried
//! over average decaying as the window progresses. Crossing into a later
//! window folds the current blend into the carried over average.
//!
//! A gap spanning several windows is folded once only, so skipped windows
//! contribute no extra decay.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

use crate::error::Error;
use crate::runningmean::validate_duration;

/// Size of each averaging window in milliseconds (one hour)
pub const WINDOW_SIZE_MS: i64 = 60 * 60 * 1000;

pub fn window_size() -> TimeDelta {
    TimeDelta::milliseconds(WINDOW_SIZE_MS)
}

///
/// Return the start of the window containing `timestamp`, i.e. the
/// timestamp truncated to the top of its hour
///
pub fn window_start(timestamp: &DateTime<Utc>) -> DateTime<Utc> {
    let offset = timestamp.timestamp_millis().rem_euclid(WINDOW_SIZE_MS);
    timestamp.trunc_subsecs(3) - TimeDelta::milliseconds(offset)
}

///
/// Return the start of the window after the one containing `timestamp`,
/// or an error if that lies beyond the representable range of times
///
pub fn next_window_start(timestamp: &DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    window_start(timestamp)
        .checked_add_signed(window_size())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "Timestamp {} is too late to start a further window",
                timestamp
            ))
        })
}

///
/// Timestamps are held to millisecond precision, must not be before the
/// unix epoch, and must leave room for the end of their window
///
pub(crate) fn validate_timestamp(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    if timestamp.timestamp_millis() < 0 {
        return Err(Error::InvalidArgument(format!(
            "Timestamp cannot be before the unix epoch, got {}",
            timestamp
        )));
    }

    let timestamp = timestamp.trunc_subsecs(3);
    next_window_start(&timestamp)?;

    Ok(timestamp)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowedEwmaTracker {
    incremental_ms: f64,
    latest_timestamp: Option<DateTime<Utc>>,
    previous_smoothed_ms: Option<f64>,
}

impl WindowedEwmaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Rebuild a tracker from previously saved state
    ///
    pub fn from_parts(
        incremental_ms: f64,
        latest_timestamp: Option<DateTime<Utc>>,
        previous_smoothed_ms: Option<f64>,
    ) -> Result<Self, Error> {
        validate_duration(incremental_ms)?;

        let latest_timestamp = match latest_timestamp {
            Some(timestamp) => Some(validate_timestamp(timestamp)?),
            None => None,
        };

        if let Some(previous) = previous_smoothed_ms {
            validate_duration(previous)?;
        }

        Ok(Self {
            incremental_ms,
            latest_timestamp,
            previous_smoothed_ms,
        })
    }

    ///
    /// Observe `delta_ms` at `timestamp`.
    ///
    /// If `timestamp` is at or past the start of the window after the one
    /// holding the latest timestamp, the current value is folded into the
    /// carried over average and the window accumulator restarts from zero.
    /// The delta is then accumulated. The latest timestamp only ever moves
    /// forwards; out of order samples are still accumulated.
    ///
    pub fn observe(&mut self, timestamp: DateTime<Utc>, delta_ms: f64) -> Result<(), Error> {
        validate_duration(delta_ms)?;
        let timestamp = validate_timestamp(timestamp)?;

        let (previous_smoothed_ms, incremental_ms) = match self.latest_timestamp {
            Some(latest) if timestamp >= next_window_start(&latest)? => {
                let folded = self.current_smoothed_value();

                tracing::debug!(
                    "Crossed window boundary at {} (previous sample {}) - folding {} ms into the average",
                    timestamp,
                    latest,
                    folded
                );

                (Some(folded), delta_ms)
            }
            _ => (self.previous_smoothed_ms, self.incremental_ms + delta_ms),
        };

        if !incremental_ms.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "Duration {} overflows the accumulated window value of {} ms",
                delta_ms, self.incremental_ms
            )));
        }

        self.previous_smoothed_ms = previous_smoothed_ms;
        self.incremental_ms = incremental_ms;

        match self.latest_timestamp {
            Some(latest) if timestamp <= latest => {}
            _ => self.latest_timestamp = Some(timestamp),
        }

        Ok(())
    }

    ///
    /// The current smoothed value. Before any window has been folded this
    /// is just the accumulated value.
    ///
    pub fn current_smoothed_value(&self) -> f64 {
        match (self.previous_smoothed_ms, self.latest_timestamp) {
            (Some(previous), Some(latest)) => {
                let elapsed = (latest - window_start(&latest)).num_milliseconds() as f64;
                let alpha = (-elapsed / WINDOW_SIZE_MS as f64).exp();
                alpha * previous + (1.0 - alpha) * self.incremental_ms
            }
            _ => self.incremental_ms,
        }
    }

    pub fn incremental_ms(&self) -> f64 {
        self.incremental_ms
    }

    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest_timestamp
    }

    pub fn previous_smoothed_ms(&self) -> Option<f64> {
        self.previous_smoothed_ms
    }
}
