// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::Context;
use std::path::{Path, PathBuf};

use timingstats::{codec, storage_key, Error, JobTimingStats};

///
/// Keeps the timing stats of each job as a JSON document named after
/// the job's storage key, in a single directory
///
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path(&self, job_id: &str) -> Result<PathBuf, Error> {
        if job_id.is_empty()
            || job_id.contains(['/', '\\'])
            || job_id == "."
            || job_id == ".."
        {
            return Err(Error::InvalidArgument(format!(
                "Invalid job id '{}'",
                job_id
            )));
        }

        Ok(self.dir.join(format!("{}.json", storage_key(job_id))))
    }

    pub fn load(&self, job_id: &str) -> Result<Option<JobTimingStats>, Error> {
        let path = self.path(job_id)?;

        if !path.try_exists()? {
            return Ok(None);
        }

        let document = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read timing stats: {}", path.display()))?;

        let stats = codec::decode(&document)?;

        if stats.job_id() != job_id {
            return Err(Error::Decode(format!(
                "{} holds timing stats for job '{}', not '{}'",
                path.display(),
                stats.job_id(),
                job_id
            )));
        }

        Ok(Some(stats))
    }

    ///
    /// Write the stats via a temporary file so that a crash part way
    /// through never leaves a truncated document
    ///
    pub fn save(&self, stats: &JobTimingStats) -> Result<(), Error> {
        let path = self.path(stats.job_id())?;

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Could not create state directory: {}", self.dir.display()))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, codec::encode_pretty(stats)?)
            .with_context(|| format!("Could not write timing stats: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Could not replace timing stats: {}", path.display()))?;

        Ok(())
    }

    /// Delete the stored stats, returning whether there were any
    pub fn delete(&self, job_id: &str) -> Result<bool, Error> {
        let path = self.path(job_id)?;

        if !path.try_exists()? {
            return Ok(false);
        }

        std::fs::remove_file(&path)?;
        Ok(true)
    }
}
