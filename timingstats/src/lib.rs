// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

// public API
pub mod codec;
pub mod config;
pub mod error;
pub mod ewma;
pub mod jobtiming;
pub mod registry;
pub mod runningmean;

pub use error::Error;
pub use ewma::WindowedEwmaTracker;
pub use jobtiming::{storage_key, JobTimingStats, TimingSummary};
pub use runningmean::RunningMeanTracker;
