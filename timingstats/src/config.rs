// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::Context;
use std::path;

use crate::error::Error;

pub fn initialise_tracing() {
    let sub = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env());

    match std::env::var("RUST_LOG_FORMAT") {
        Ok(format) => {
            let format = format.to_lowercase();
            match format.as_str() {
                "json" => {
                    sub.json().init();
                }
                "pretty" => {
                    sub.pretty().init();
                }
                _ => {
                    sub.init();
                }
            }
        }
        Err(_) => sub.init(),
    };
}

///
/// Load a toml config file into the passed type. Returns NotExists
/// if the file is missing
///
pub fn load<T: serde::de::DeserializeOwned>(
    config_file: &path::Path,
) -> Result<T, Error> {
    let config_file = path::absolute(config_file)?;

    if !config_file.try_exists()? {
        return Err(Error::NotExists(config_file));
    }

    let config = std::fs::read_to_string(&config_file)
        .with_context(|| format!("Could not read config file: {:?}", config_file))?;

    let config: T = toml::from_str(&config)
        .with_context(|| format!("Could not parse config file from toml: {:?}", config_file))?;

    Ok(config)
}

///
/// Save the passed config to a toml file, creating any missing
/// parent directories
///
pub fn save<T: serde::Serialize + ?Sized>(
    config: &T,
    config_file: &path::Path,
) -> Result<(), Error> {
    let config_toml =
        toml::to_string(config).with_context(|| "Could not serialise config to toml")?;

    let config_file_string = config_file.to_string_lossy();

    let prefix = config_file.parent().with_context(|| {
        format!(
            "Could not get parent directory for config file: {:?}",
            config_file_string
        )
    })?;

    std::fs::create_dir_all(prefix).with_context(|| {
        format!(
            "Could not create parent directory for config file: {:?}",
            config_file_string
        )
    })?;

    std::fs::write(config_file, config_toml)
        .with_context(|| format!("Could not write config file: {:?}", config_file_string))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        state_dir: std::path::PathBuf,
    }

    #[test]
    fn test_save_then_load() -> Result<(), Error> {
        let dir = std::env::temp_dir().join(format!("timingstats-config-{}", std::process::id()));
        let file = dir.join("nested").join("config.toml");

        let sample = Sample {
            name: "job".to_owned(),
            state_dir: dir.join("state"),
        };

        save(&sample, &file)?;
        let loaded: Sample = load(&file)?;
        assert_eq!(loaded, sample);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct ReadOnly {
        name: String,
    }

    #[test]
    fn test_load_and_save_need_one_direction_only() -> Result<(), Error> {
        let dir = std::env::temp_dir().join(format!("timingstats-oneway-{}", std::process::id()));
        let file = dir.join("config.toml");

        let mut written = std::collections::BTreeMap::new();
        written.insert("name", "job");
        save(&written, &file)?;

        let loaded: ReadOnly = load(&file)?;
        assert_eq!(
            loaded,
            ReadOnly {
                name: "job".to_owned()
            }
        );

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let file = std::env::temp_dir().join("timingstats-definitely-missing.toml");
        let result: Result<Sample, Error> = load(&file);
        assert!(matches!(result, Err(Error::NotExists(_))));
    }
}
