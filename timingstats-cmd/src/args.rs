// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::Context;
use anyhow::Error as AnyError;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{absolute, PathBuf};
use thiserror::Error;

use timingstats::config;

use crate::samples::parse_timestamp;

#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("{0}")]
    IOError(#[from] std::io::Error),

    #[error("{0}")]
    TimingStats(#[from] timingstats::Error),

    #[error("{0}")]
    AnyError(#[from] AnyError),

    #[error("{0}")]
    ConfigExists(String),
}

fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

fn default_config_file() -> PathBuf {
    dirs::config_local_dir()
        .unwrap_or(PathBuf::from("."))
        .join("timingstats")
        .join("config.toml")
}

fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or(PathBuf::from("."))
        .join("timingstats")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CmdConfig {
    /// Directory holding one `<job>_timing_stats.json` file per job
    pub state_dir: PathBuf,
}

impl Default for CmdConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

#[derive(Parser)]
#[command(version = version(), about, long_about = None)]
struct Args {
    #[arg(
        long,
        short='c',
        help=format!(
            "Path to the timingstats config file [default: {}]",
            &default_config_file().display(),
        )
    )]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the config file
    Init {
        #[arg(long, short = 's', help = "Directory in which to keep job timing stats")]
        state_dir: Option<PathBuf>,

        #[arg(long, short = 'f', help = "Force reinitialisation")]
        force: bool,
    },

    /// Record a single completed bucket
    Record {
        #[arg(long, short = 'j')]
        job: String,

        #[arg(long, short = 'd', help = "Bucket processing time in milliseconds")]
        duration_ms: f64,

        #[arg(
            long,
            short = 't',
            help = "When the bucket completed (RFC 3339 or epoch milliseconds) [default: now]"
        )]
        timestamp: Option<String>,
    },

    /// Replay a file of 'timestamp,duration_ms' lines
    Replay {
        #[arg(long, short = 'j')]
        job: String,

        #[arg(long, short = 'i')]
        input: PathBuf,
    },

    /// Show the timing stats of a job
    Show {
        #[arg(long, short = 'j')]
        job: String,

        #[arg(long, help = "Print the stored JSON document")]
        json: bool,
    },

    /// Delete the timing stats of a job
    Delete {
        #[arg(long, short = 'j')]
        job: String,
    },
}

/// What the tool has been asked to do with a job
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Record {
        job: String,
        timestamp: DateTime<Utc>,
        duration_ms: f64,
    },
    Replay {
        job: String,
        input: PathBuf,
    },
    Show {
        job: String,
        json: bool,
    },
    Delete {
        job: String,
    },
}

///
/// Parse the command line. Returns None if there is nothing further
/// to do (e.g. after initialising the config file)
///
pub fn process_args() -> Result<Option<(CmdConfig, Action)>, ArgsError> {
    let args = Args::parse();

    let config_file = absolute(match &args.config_file {
        Some(f) => f.clone(),
        None => default_config_file(),
    })?;

    let action = match args.command {
        Some(Commands::Init { state_dir, force }) => {
            if config_file.try_exists()? {
                if force {
                    std::fs::remove_file(&config_file)
                        .context("Could not remove existing config file.")?;
                } else {
                    return Err(ArgsError::ConfigExists(format!(
                        "Config file {} already exists - use --force to overwrite.",
                        config_file.display()
                    )));
                }
            }

            let config = CmdConfig {
                state_dir: absolute(state_dir.unwrap_or_else(default_state_dir))?,
            };

            config::save(&config, &config_file)?;

            tracing::info!("Wrote config to {}", config_file.display());
            return Ok(None);
        }
        Some(Commands::Record {
            job,
            duration_ms,
            timestamp,
        }) => Action::Record {
            job,
            timestamp: match timestamp {
                Some(timestamp) => parse_timestamp(&timestamp)?,
                None => Utc::now(),
            },
            duration_ms,
        },
        Some(Commands::Replay { job, input }) => Action::Replay { job, input },
        Some(Commands::Show { job, json }) => Action::Show { job, json },
        Some(Commands::Delete { job }) => Action::Delete { job },
        None => {
            tracing::warn!("No command given - see --help");
            return Ok(None);
        }
    };

    let config = match config::load::<CmdConfig>(&config_file) {
        Ok(config) => config,
        Err(timingstats::Error::NotExists(_)) => {
            tracing::info!(
                "No config file at {} - using defaults",
                config_file.display()
            );
            CmdConfig::default()
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Some((config, action)))
}
