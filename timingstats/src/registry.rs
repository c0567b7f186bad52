// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Process-wide registry of job timing statistics
//!
//! Timing stats themselves have no internal locking. This registry holds
//! them behind a single async lock so that concurrent tasks recording
//! buckets for the same job are serialized.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Error;
use crate::jobtiming::{JobTimingStats, TimingSummary};

struct Registry {
    jobs: HashMap<String, JobTimingStats>,
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::new()));

impl Registry {
    fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }
}

///
/// Record a completed bucket for `job_id`, creating empty stats for the
/// job if this is its first bucket. Returns the updated summary.
///
pub async fn record_bucket(
    job_id: &str,
    timestamp: DateTime<Utc>,
    duration_ms: f64,
) -> Result<TimingSummary, Error> {
    let mut registry = REGISTRY.write().await;

    match registry.jobs.get_mut(job_id) {
        Some(stats) => {
            stats.record_bucket(job_id, timestamp, duration_ms)?;
            Ok(stats.summary())
        }
        None => {
            // only register the job once its first bucket is accepted
            let mut stats = JobTimingStats::new(job_id);
            stats.record_bucket(job_id, timestamp, duration_ms)?;

            tracing::debug!("Created timing stats for job {}", job_id);

            let summary = stats.summary();
            registry.jobs.insert(job_id.to_owned(), stats);
            Ok(summary)
        }
    }
}

///
/// Add (or replace) the stats for a job, e.g. after loading them
/// from storage
///
pub async fn insert(stats: JobTimingStats) {
    tracing::debug!("Registering timing stats for job {}", stats.job_id());

    REGISTRY
        .write()
        .await
        .jobs
        .insert(stats.job_id().to_owned(), stats);
}

pub async fn get(job_id: &str) -> Option<JobTimingStats> {
    REGISTRY.read().await.jobs.get(job_id).cloned()
}

pub async fn summary(job_id: &str) -> Result<TimingSummary, Error> {
    match REGISTRY.read().await.jobs.get(job_id) {
        Some(stats) => Ok(stats.summary()),
        None => Err(Error::NotFound(format!(
            "No timing stats for job '{}'",
            job_id
        ))),
    }
}

///
/// Remove the stats for a job, returning them if they existed
///
pub async fn remove(job_id: &str) -> Option<JobTimingStats> {
    let removed = REGISTRY.write().await.jobs.remove(job_id);

    if removed.is_some() {
        tracing::debug!("Removed timing stats for job {}", job_id);
    }

    removed
}

pub async fn job_ids() -> Vec<String> {
    let mut ids: Vec<String> = REGISTRY.read().await.jobs.keys().cloned().collect();
    ids.sort();
    ids
}
