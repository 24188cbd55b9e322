//! Memory admission control.
//!
//! [`MemoryGuard`] turns a memory reading into an allow/deny decision; [`MemoryProbe`] is the
//! resource-manager seam that supplies readings. The default probe parses `/proc/meminfo`; tests
//! and alternative deployments (cgroup limits, quotas) plug in their own implementation without
//! touching the scheduler.
//!
//! The check and the following dispatch are not atomic. Utilization can rise in between, so the
//! guard is a coarse backpressure signal rather than a hard limit.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Default utilization above which batches are refused.
pub const DEFAULT_MEMORY_THRESHOLD: f64 = 0.8;

/// Errors raised while sampling memory counters.
#[derive(Debug, Error)]
pub enum MemoryProbeError {
    /// Counter source could not be read.
    #[error("failed to read memory counters from {path}: {source}")]
    Io {
        /// Source that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Counter source was readable but lacked a required field.
    #[error("memory counter '{0}' missing or malformed")]
    MissingField(&'static str),
}

/// Point-in-time view of system memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryReading {
    /// Total memory in bytes.
    pub total_bytes: u64,
    /// Memory available to new work, in bytes.
    pub free_bytes: u64,
}

impl MemoryReading {
    /// Fraction of memory in use; a zero total counts as fully used.
    pub fn utilization(&self) -> f64 {
        utilization(self.total_bytes, self.free_bytes)
    }
}

/// Capability to query current memory counters.
pub trait MemoryProbe: Send + Sync {
    /// Sample total and free memory.
    fn read(&self) -> Result<MemoryReading, MemoryProbeError>;
}

/// Probe backed by the Linux `/proc/meminfo` file.
#[derive(Debug, Clone)]
pub struct ProcMeminfoProbe {
    path: PathBuf,
}

impl Default for ProcMeminfoProbe {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl ProcMeminfoProbe {
    /// Read counters from a custom meminfo-formatted file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MemoryProbe for ProcMeminfoProbe {
    fn read(&self) -> Result<MemoryReading, MemoryProbeError> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(|source| MemoryProbeError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        parse_meminfo(&contents)
    }
}

/// Parse `MemTotal` and `MemAvailable` (falling back to `MemFree`) from meminfo text.
pub(crate) fn parse_meminfo(contents: &str) -> Result<MemoryReading, MemoryProbeError> {
    let mut total = None;
    let mut available = None;
    let mut free = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            "MemFree" => &mut free,
            _ => continue,
        };
        *slot = parse_kib(value);
    }

    let total_bytes = total.ok_or(MemoryProbeError::MissingField("MemTotal"))?;
    let free_bytes = available
        .or(free)
        .ok_or(MemoryProbeError::MissingField("MemAvailable"))?;
    Ok(MemoryReading {
        total_bytes,
        free_bytes,
    })
}

fn parse_kib(value: &str) -> Option<u64> {
    let mut parts = value.split_whitespace();
    let amount: u64 = parts.next()?.parse().ok()?;
    match parts.next() {
        Some("kB") | None => amount.checked_mul(1024),
        Some(_) => None,
    }
}

fn utilization(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    total.saturating_sub(free) as f64 / total as f64
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    /// Utilization is at or below the threshold.
    Allow {
        /// Observed utilization.
        utilization: f64,
    },
    /// Utilization exceeds the threshold.
    Deny {
        /// Observed utilization.
        utilization: f64,
    },
}

impl Admission {
    /// Whether the batch may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Utilization the decision was based on.
    pub fn utilization(&self) -> f64 {
        match self {
            Self::Allow { utilization } | Self::Deny { utilization } => *utilization,
        }
    }
}

/// Compares memory utilization against a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryGuard {
    threshold: f64,
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_THRESHOLD)
    }
}

impl MemoryGuard {
    /// Build a guard; the threshold is clamped into `[0, 1]`.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pure decision: allow iff `(total - free) / total <= threshold`.
    pub fn admit(&self, total_bytes: u64, free_bytes: u64) -> Admission {
        let utilization = utilization(total_bytes, free_bytes);
        if utilization > self.threshold {
            Admission::Deny { utilization }
        } else {
            Admission::Allow { utilization }
        }
    }

    /// Sample `probe` and decide. An unreadable probe admits the batch and logs a warning.
    pub fn check(&self, probe: &dyn MemoryProbe) -> Admission {
        match probe.read() {
            Ok(reading) => {
                let admission = self.admit(reading.total_bytes, reading.free_bytes);
                if !admission.is_allowed() {
                    tracing::warn!(
                        utilization_percent = (admission.utilization() * 100.0).round(),
                        threshold_percent = (self.threshold * 100.0).round(),
                        "High memory usage detected"
                    );
                }
                admission
            }
            Err(error) => {
                tracing::warn!(%error, "Memory probe failed; admitting batch");
                Admission::Allow { utilization: 0.0 }
            }
        }
    }
}
