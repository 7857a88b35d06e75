// src/config.rs
//
// Configuration for sessions, batches and directory scans.
// Plain structs with defaults and builder setters; batch settings can also
// come from the environment.

use crate::engine::MAX_CONCURRENCY;
use crate::error::{LunarzError, Result};
use crate::ops::OutputFormat;

pub const BATCH_CONCURRENCY_ENV: &str = "LUNARZ_BATCH_CONCURRENCY";

/// Default extensions accepted by a directory scan.
pub const DEFAULT_SCAN_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Maximum edits kept above the original. None = unbounded.
    pub max_history: Option<usize>,
}

impl SessionConfig {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_history(mut self, limit: usize) -> Self {
        self.max_history = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.max_history {
            Some(0) => Err(LunarzError::invalid_parameter(
                "session",
                "max_history",
                "0",
                "must be at least 1 when set",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// 0 = shared global pool, 1 = sequential, n = dedicated pool of n threads
    pub concurrency: usize,
    /// Output format for every file. None = keep the input's format when
    /// it is encodable, PNG otherwise.
    pub output_format: Option<OutputFormat>,
    /// Keep processed buffers in the report in addition to writing them.
    pub keep_images: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            output_format: None,
            keep_images: true,
        }
    }
}

impl BatchConfig {
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            ..Self::default()
        }
    }

    /// Defaults overridden by LUNARZ_BATCH_CONCURRENCY when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(BATCH_CONCURRENCY_ENV) {
            config.concurrency = parse_concurrency(&raw)?;
        }
        Ok(config)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_keep_images(mut self, keep: bool) -> Self {
        self.keep_images = keep;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency > MAX_CONCURRENCY {
            return Err(LunarzError::invalid_parameter(
                "batch",
                "concurrency",
                self.concurrency.to_string(),
                format!("must be 0 or 1-{MAX_CONCURRENCY}"),
            ));
        }
        Ok(())
    }
}

fn parse_concurrency(raw: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|_| {
        LunarzError::invalid_parameter(
            BATCH_CONCURRENCY_ENV,
            "concurrency",
            raw.to_string(),
            "must be a non-negative integer",
        )
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    /// Lowercase extensions without the dot
    pub extensions: Vec<String>,
    pub follow_links: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_SCAN_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            follow_links: false,
        }
    }
}

impl ScanConfig {
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn accepts(&self, extension: &str) -> bool {
        let ext = extension.to_ascii_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }
}
