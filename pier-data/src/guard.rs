//! Circuit breaker around repository construction.
//!
//! The registry asks the [`LoopGuard`] before every construction attempt.
//! The guard trips when an entity type has been attempted too often or the
//! process is about to run out of memory. Trip events and construction
//! failures go to a [`DiagnosticSink`], a channel kept apart from `tracing`.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use pier_core::{ByteSize, ConfigError, ConfigProperties, PierConfig};
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

pub const DEFAULT_MAX_ATTEMPTS: u64 = 100_000;

/// Breaker settings, read from the `pier.registry` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Construction attempts allowed per entity type.
    pub max_attempts: u64,
    /// Trip when process memory gets within `safety_margin` of this.
    pub memory_limit: Option<ByteSize>,
    pub safety_margin: ByteSize,
    /// Append diagnostics to this file instead of stderr.
    pub diagnostic_log: Option<PathBuf>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            memory_limit: None,
            safety_margin: ByteSize(ByteSize::MIB),
            diagnostic_log: None,
        }
    }
}

impl ConfigProperties for GuardConfig {
    fn prefix() -> &'static str {
        "pier.registry"
    }

    fn from_config(config: &PierConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_attempts: config.get_or(&Self::key("max_attempts"), defaults.max_attempts)?,
            memory_limit: config.get_or(&Self::key("memory_limit"), None)?,
            safety_margin: config.get_or(&Self::key("safety_margin"), defaults.safety_margin)?,
            diagnostic_log: config
                .get_or::<Option<String>>(&Self::key("diagnostic_log"), None)?
                .map(PathBuf::from),
        })
    }
}

// ── Memory ──────────────────────────────────────────────────────────────────

/// Source of the current process memory usage.
pub trait MemoryProbe: Send + Sync {
    /// Resident bytes, or `None` when unknown.
    fn used_bytes(&self) -> Option<u64>;
}

/// Reads the resident set size of the current process through `sysinfo`.
pub struct ProcessMemoryProbe {
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn used_bytes(&self) -> Option<u64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = system.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
        system.process(pid).map(sysinfo::Process::memory)
    }
}

// ── Diagnostics ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    AttemptsExceeded { ceiling: u64 },
    MemoryExhausted { used: u64, limit: u64 },
    /// The type was requested again while its own construction was running.
    Reentrant,
    ConstructionFailed(String),
}

impl DiagnosticKind {
    pub fn trips_breaker(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::AttemptsExceeded { .. } | DiagnosticKind::MemoryExhausted { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub at: DateTime<Utc>,
    pub entity: &'static str,
    pub attempts: u64,
    pub kind: DiagnosticKind,
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (attempt {}): ",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.entity,
            self.attempts
        )?;
        match &self.kind {
            DiagnosticKind::AttemptsExceeded { ceiling } => {
                write!(f, "construction attempts exceeded {ceiling}, breaker tripped")
            }
            DiagnosticKind::MemoryExhausted { used, limit } => write!(
                f,
                "memory usage {used} bytes is within the safety margin of {limit} bytes, breaker tripped"
            ),
            DiagnosticKind::Reentrant => write!(f, "re-entrant construction detected"),
            DiagnosticKind::ConstructionFailed(reason) => {
                write!(f, "construction failed: {reason}")
            }
        }
    }
}

/// Destination for breaker diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);
}

pub struct StderrDiagnosticSink;

impl DiagnosticSink for StderrDiagnosticSink {
    fn record(&self, event: &DiagnosticEvent) {
        eprintln!("{event}");
    }
}

/// Appends one line per event to a log file.
pub struct FileDiagnosticSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDiagnosticSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn record(&self, event: &DiagnosticEvent) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{event}"));
        if let Err(err) = written {
            eprintln!("{event} (diagnostic log {} unavailable: {err})", self.path.display());
        }
    }
}

/// Keeps events in memory; handy for assertions.
#[derive(Default)]
pub struct MemoryDiagnosticSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl MemoryDiagnosticSink {
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for MemoryDiagnosticSink {
    fn record(&self, event: &DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

// ── Metrics ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct GuardMetrics {
    attempts: AtomicU64,
    failures: AtomicU64,
    trips: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuardSnapshot {
    pub attempts: u64,
    pub failures: u64,
    pub trips: u64,
}

impl GuardMetrics {
    pub fn snapshot(&self) -> GuardSnapshot {
        GuardSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            trips: self.trips.load(Ordering::Relaxed),
        }
    }
}

// ── Guard ───────────────────────────────────────────────────────────────────

pub struct LoopGuard {
    config: GuardConfig,
    probe: Arc<dyn MemoryProbe>,
    sink: Arc<dyn DiagnosticSink>,
    metrics: GuardMetrics,
}

impl LoopGuard {
    pub fn new(
        config: GuardConfig,
        probe: Arc<dyn MemoryProbe>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            config,
            probe,
            sink,
            metrics: GuardMetrics::default(),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn metrics(&self) -> GuardSnapshot {
        self.metrics.snapshot()
    }

    /// Count one attempt and decide whether it may proceed.
    pub(crate) fn admit(&self, attempts: u64) -> Result<(), DiagnosticKind> {
        self.metrics.attempts.fetch_add(1, Ordering::Relaxed);
        if attempts > self.config.max_attempts {
            return Err(DiagnosticKind::AttemptsExceeded {
                ceiling: self.config.max_attempts,
            });
        }
        if let Some(limit) = self.config.memory_limit {
            let threshold = limit.0.saturating_sub(self.config.safety_margin.0);
            if let Some(used) = self.probe.used_bytes() {
                if used > threshold {
                    return Err(DiagnosticKind::MemoryExhausted {
                        used,
                        limit: limit.0,
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn report(&self, entity: &'static str, attempts: u64, kind: DiagnosticKind) {
        if kind.trips_breaker() {
            self.metrics.trips.fetch_add(1, Ordering::Relaxed);
        } else {
            self.metrics.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.sink.record(&DiagnosticEvent {
            at: Utc::now(),
            entity,
            attempts,
            kind,
        });
    }
}
