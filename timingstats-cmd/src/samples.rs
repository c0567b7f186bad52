// SPDX-FileCopyrightText: © 2025 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// One completed bucket read from a replay file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub duration_ms: f64,
}

///
/// Parse a timestamp given either in RFC 3339 format or as
/// milliseconds since the unix epoch
///
pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>> {
    let timestamp = timestamp.trim();

    if let Ok(millis) = timestamp.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .with_context(|| format!("Timestamp out of range: '{}'", timestamp));
    }

    Ok(DateTime::parse_from_rfc3339(timestamp)
        .with_context(|| format!("Could not parse timestamp '{}'", timestamp))?
        .with_timezone(&Utc))
}

///
/// Parse a single 'timestamp,duration_ms' line. Blank lines and
/// lines starting with '#' give None
///
pub fn parse_line(line: &str) -> Result<Option<Sample>> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (timestamp, duration_ms) = line
        .split_once(',')
        .with_context(|| format!("Expected 'timestamp,duration_ms', got '{}'", line))?;

    let duration_ms = duration_ms
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Could not parse duration '{}'", duration_ms.trim()))?;

    Ok(Some(Sample {
        timestamp: parse_timestamp(timestamp)?,
        duration_ms,
    }))
}

pub fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read samples from {}", path.display()))?;

    let mut samples = Vec::new();

    for (i, line) in contents.lines().enumerate() {
        if let Some(sample) = parse_line(line)
            .with_context(|| format!("{}: line {}", path.display(), i + 1))?
        {
            samples.push(sample);
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() -> Result<()> {
        let rfc = parse_timestamp("2024-03-05T10:15:00Z")?;
        let millis = parse_timestamp("1709633700000")?;
        assert_eq!(rfc, millis);

        let offset = parse_timestamp(" 2024-03-05T11:15:00+01:00 ")?;
        assert_eq!(offset, rfc);

        assert!(parse_timestamp("yesterday").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_line() -> Result<()> {
        assert_eq!(parse_line("")?, None);
        assert_eq!(parse_line("   # a comment")?, None);

        let sample = parse_line("2024-03-05T10:15:00Z, 12.5")?;
        assert_eq!(
            sample,
            Some(Sample {
                timestamp: parse_timestamp("2024-03-05T10:15:00Z")?,
                duration_ms: 12.5,
            })
        );

        assert!(parse_line("2024-03-05T10:15:00Z").is_err());
        assert!(parse_line("2024-03-05T10:15:00Z,fast").is_err());
        Ok(())
    }

    #[test]
    fn test_read_samples() -> Result<()> {
        let file = std::env::temp_dir().join(format!(
            "timingstats-samples-{}.csv",
            std::process::id()
        ));

        std::fs::write(
            &file,
            "# timestamp,duration_ms\n1709633700000,4\n\n2024-03-05T10:20:00Z,6.5\n",
        )?;

        let samples = read_samples(&file)?;
        std::fs::remove_file(&file)?;

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].duration_ms, 4.0);
        assert_eq!(samples[1].timestamp, parse_timestamp("2024-03-05T10:20:00Z")?);
        Ok(())
    }
}
