// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! JSON encoding of job timing statistics
//!
//! Optional fields are omitted when unset. Older records that lack the
//! incremental window value (or the whole exponential average context)
//! decode with zero / empty defaults. Unknown fields are ignored.
//! Timestamps are written as epoch milliseconds, but are also read from
//! numeric strings or RFC 3339 text.

use chrono::serde::ts_milliseconds_option;
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::Error;
use crate::ewma::WindowedEwmaTracker;
use crate::jobtiming::JobTimingStats;
use crate::runningmean::RunningMeanTracker;

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTimestamp {
    Millis(i64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = match Option::<StoredTimestamp>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(StoredTimestamp::Millis(millis)) => millis,
        Some(StoredTimestamp::Text(text)) => match text.trim().parse::<i64>() {
            Ok(millis) => millis,
            Err(_) => {
                return DateTime::parse_from_rfc3339(text.trim())
                    .map(|timestamp| Some(timestamp.with_timezone(&Utc)))
                    .map_err(|e| {
                        de::Error::custom(format!("Invalid timestamp '{}': {}", text, e))
                    });
            }
        },
    };

    DateTime::from_timestamp_millis(millis)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("Timestamp {} ms is out of range", millis)))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ExponentialAverageContext {
    #[serde(default)]
    incremental_time_metric_ms: f64,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "ts_milliseconds_option::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    latest_timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_exponential_average_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TimingStatsDocument {
    job_id: String,

    average_bucket_processing_time_ms: f64,

    #[serde(default)]
    bucket_count: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    minimum_bucket_processing_time_ms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    maximum_bucket_processing_time_ms: Option<f64>,

    #[serde(default)]
    exponential_average_calculation_context: ExponentialAverageContext,
}

impl From<&JobTimingStats> for TimingStatsDocument {
    fn from(stats: &JobTimingStats) -> Self {
        let running_mean = stats.running_mean();
        let ewma = stats.ewma();

        Self {
            job_id: stats.job_id().to_owned(),
            average_bucket_processing_time_ms: running_mean.current_mean(),
            bucket_count: running_mean.sample_count(),
            minimum_bucket_processing_time_ms: running_mean.minimum(),
            maximum_bucket_processing_time_ms: running_mean.maximum(),
            exponential_average_calculation_context: ExponentialAverageContext {
                incremental_time_metric_ms: ewma.incremental_ms(),
                latest_timestamp: ewma.latest_timestamp(),
                previous_exponential_average_ms: ewma.previous_smoothed_ms(),
            },
        }
    }
}

impl TimingStatsDocument {
    fn into_stats(self) -> Result<JobTimingStats, Error> {
        let context = self.exponential_average_calculation_context;

        let running_mean = RunningMeanTracker::from_parts(
            self.bucket_count,
            self.average_bucket_processing_time_ms,
        )
        .and_then(|tracker| {
            tracker.with_extremes(
                self.minimum_bucket_processing_time_ms,
                self.maximum_bucket_processing_time_ms,
            )
        })
        .map_err(|e| {
            Error::Decode(format!(
                "Invalid running mean in timing stats for job '{}': {}",
                self.job_id, e
            ))
        })?;

        let ewma = WindowedEwmaTracker::from_parts(
            context.incremental_time_metric_ms,
            context.latest_timestamp,
            context.previous_exponential_average_ms,
        )
        .map_err(|e| {
            Error::Decode(format!(
                "Invalid exponential average context in timing stats for job '{}': {}",
                self.job_id, e
            ))
        })?;

        Ok(JobTimingStats::from_parts(
            &self.job_id,
            running_mean,
            ewma,
        ))
    }
}

pub fn encode(stats: &JobTimingStats) -> Result<String, Error> {
    Ok(serde_json::to_string(&TimingStatsDocument::from(stats))?)
}

pub fn encode_pretty(stats: &JobTimingStats) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&TimingStatsDocument::from(
        stats,
    ))?)
}

///
/// Decode timing stats from their JSON document. Malformed documents
/// are reported as Error::Decode
///
pub fn decode(document: &str) -> Result<JobTimingStats, Error> {
    let document: TimingStatsDocument = serde_json::from_str(document)
        .map_err(|e| Error::Decode(format!("Could not decode timing stats: {}", e)))?;

    document.into_stats()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    fn at(timestamp: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_round_trip() -> Result<(), Error> {
        let mut stats = JobTimingStats::new("farequote");
        stats.record_bucket("farequote", at("2024-03-05T10:15:00.250Z"), 12.0)?;
        stats.record_bucket("farequote", at("2024-03-05T11:05:00Z"), 4.5)?;
        stats.record_bucket("farequote", at("2024-03-05T11:25:00Z"), 7.25)?;

        assert!(stats.ewma().previous_smoothed_ms().is_some());

        let decoded = decode(&encode(&stats)?)?;
        assert_eq!(decoded, stats);

        let decoded = decode(&encode_pretty(&stats)?)?;
        assert_eq!(decoded, stats);

        Ok(())
    }

    #[test]
    fn test_round_trip_empty() -> Result<(), Error> {
        let stats = JobTimingStats::new("empty");
        let encoded = encode(&stats)?;

        assert!(!encoded.contains("latest_timestamp"));
        assert!(!encoded.contains("previous_exponential_average_ms"));
        assert!(!encoded.contains("minimum_bucket_processing_time_ms"));

        let decoded = decode(&encoded)?;
        assert_eq!(decoded, stats);
        assert_eq!(decoded.ewma().latest_timestamp(), None);
        assert_eq!(decoded.ewma().previous_smoothed_ms(), None);

        Ok(())
    }

    #[test]
    fn test_wire_fields() -> Result<(), Error> {
        let mut stats = JobTimingStats::new("job");
        stats.record_bucket("job", at("2024-03-05T10:15:00Z"), 3.0)?;

        let value: serde_json::Value = serde_json::from_str(&encode(&stats)?)?;

        assert_eq!(value["job_id"], "job");
        assert_eq!(value["average_bucket_processing_time_ms"], 3.0);
        assert_eq!(value["bucket_count"], 1);
        assert_eq!(
            value["exponential_average_calculation_context"]["incremental_time_metric_ms"],
            3.0
        );
        assert_eq!(
            value["exponential_average_calculation_context"]["latest_timestamp"],
            at("2024-03-05T10:15:00Z").timestamp_millis()
        );

        Ok(())
    }

    #[test]
    fn test_missing_incremental_defaults_to_zero() -> Result<(), Error> {
        let decoded = decode(
            r#"{
                "job_id": "old",
                "average_bucket_processing_time_ms": 1.23,
                "exponential_average_calculation_context": {
                    "latest_timestamp": 1709633700000,
                    "previous_exponential_average_ms": 2.5
                }
            }"#,
        )?;

        assert_eq!(decoded.job_id(), "old");
        assert_eq!(decoded.average_bucket_processing_time_ms(), 1.23);
        assert_eq!(decoded.bucket_count(), 0);
        assert_eq!(decoded.ewma().incremental_ms(), 0.0);
        assert_eq!(
            decoded.ewma().latest_timestamp(),
            Some(at("2024-03-05T10:15:00Z"))
        );
        assert_eq!(decoded.ewma().previous_smoothed_ms(), Some(2.5));

        Ok(())
    }

    #[test]
    fn test_timestamp_written_as_text() -> Result<(), Error> {
        for latest in [
            r#""2024-03-05T10:15:00Z""#,
            r#""2024-03-05T11:15:00+01:00""#,
            r#""1709633700000""#,
            "1709633700000",
        ] {
            let decoded = decode(&format!(
                r#"{{"job_id": "job", "average_bucket_processing_time_ms": 1.0,
                    "exponential_average_calculation_context": {{"latest_timestamp": {}}}}}"#,
                latest
            ))?;

            assert_eq!(
                decoded.ewma().latest_timestamp(),
                Some(at("2024-03-05T10:15:00Z")),
                "decoding {}",
                latest
            );
        }

        let decoded = decode(
            r#"{"job_id": "job", "average_bucket_processing_time_ms": 1.0,
                "exponential_average_calculation_context": {"latest_timestamp": null}}"#,
        )?;
        assert_eq!(decoded.ewma().latest_timestamp(), None);

        Ok(())
    }

    #[test]
    fn test_missing_context_and_unknown_fields() -> Result<(), Error> {
        let decoded = decode(
            r#"{"job_id": "old", "average_bucket_processing_time_ms": 4.0, "result_type": "timing_stats"}"#,
        )?;

        assert_eq!(decoded.average_bucket_processing_time_ms(), 4.0);
        assert_eq!(decoded.ewma(), &WindowedEwmaTracker::new());

        Ok(())
    }

    #[test]
    fn test_malformed_documents() {
        for document in [
            r#"{"job_id": "job", "average_bucket_processing_time_ms": "slow"}"#,
            r#"{"job_id": "job"}"#,
            r#"{"job_id": "job", "average_bucket_processing_time_ms": -1.0}"#,
            r#"{"job_id": "job", "average_bucket_processing_time_ms": 1.0,
                "exponential_average_calculation_context": {"incremental_time_metric_ms": -3.0}}"#,
            r#"{"job_id": "job", "average_bucket_processing_time_ms": 1.0,
                "exponential_average_calculation_context": {"latest_timestamp": "yesterday"}}"#,
            r#"{"job_id": "job", "average_bucket_processing_time_ms": 1.0,
                "exponential_average_calculation_context": {"latest_timestamp": true}}"#,
            "not json",
        ] {
            assert!(
                matches!(decode(document), Err(Error::Decode(_))),
                "expected decode error for {}",
                document
            );
        }
    }
}
