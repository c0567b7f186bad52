// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

mod args;
mod samples;
mod store;

use anyhow::Result;

use timingstats::{codec, registry};

use crate::args::{process_args, Action};
use crate::samples::read_samples;
use crate::store::StateStore;

///
/// Load any stored stats for the job into the registry
///
async fn restore(store: &StateStore, job: &str) -> Result<()> {
    if let Some(stats) = store.load(job)? {
        registry::insert(stats).await;
    }

    Ok(())
}

///
/// Write the job's stats from the registry back to the store
///
async fn persist(store: &StateStore, job: &str) -> Result<()> {
    if let Some(stats) = registry::get(job).await {
        store.save(&stats)?;
    }

    Ok(())
}

///
/// Carry out the action against the stored stats, returning the text
/// to report to the user
///
async fn run(store: &StateStore, action: Action) -> Result<String> {
    match action {
        Action::Record {
            job,
            timestamp,
            duration_ms,
        } => {
            restore(store, &job).await?;
            let summary = registry::record_bucket(&job, timestamp, duration_ms).await?;
            persist(store, &job).await?;

            Ok(summary.to_string())
        }
        Action::Replay { job, input } => {
            restore(store, &job).await?;

            let mut accepted = 0;
            let mut skipped = 0;

            for sample in read_samples(&input)? {
                match registry::record_bucket(&job, sample.timestamp, sample.duration_ms).await {
                    Ok(_) => accepted += 1,
                    Err(e) => {
                        tracing::warn!(
                            "Skipping bucket at {} ({} ms): {}",
                            sample.timestamp,
                            sample.duration_ms,
                            e
                        );
                        skipped += 1;
                    }
                }
            }

            persist(store, &job).await?;

            tracing::info!(
                "Replayed {} buckets for {} ({} skipped)",
                accepted,
                job,
                skipped
            );

            match registry::summary(&job).await {
                Ok(summary) => Ok(summary.to_string()),
                Err(_) => Ok(format!("{}: no buckets recorded", job)),
            }
        }
        Action::Show { job, json } => match store.load(&job)? {
            Some(stats) => {
                if json {
                    Ok(codec::encode_pretty(&stats)?)
                } else {
                    Ok(stats.summary().to_string())
                }
            }
            None => {
                anyhow::bail!("No timing stats stored for job '{}'", job);
            }
        },
        Action::Delete { job } => {
            registry::remove(&job).await;

            if store.delete(&job)? {
                Ok(format!("Deleted timing stats for {}", job))
            } else {
                Ok(format!("No timing stats stored for {}", job))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    timingstats::config::initialise_tracing();

    let (config, action) = match process_args()? {
        Some(parsed) => parsed,
        None => {
            // nothing more to do
            return Ok(());
        }
    };

    let store = StateStore::new(&config.state_dir);

    println!("{}", run(&store, action).await?);

    Ok(())
}
