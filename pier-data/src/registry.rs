use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use pier_core::PierConfig;

use crate::adapter::Adapter;
use crate::crud::DataManager;
use crate::entity::Entity;
use crate::error::DataError;
use crate::guard::{
    DiagnosticKind, DiagnosticSink, FileDiagnosticSink, GuardConfig, GuardSnapshot, LoopGuard,
    MemoryProbe, ProcessMemoryProbe, StderrDiagnosticSink,
};

// ── State ───────────────────────────────────────────────────────────────────

enum Slot {
    Building(ThreadId),
    Ready(Arc<dyn Any + Send + Sync>),
}

#[derive(Default)]
struct Entry {
    slot: Option<Slot>,
    attempts: u64,
    tripped: bool,
}

type State = HashMap<TypeId, Entry>;

/// Holds one lazily built [`DataManager`] per entity type.
///
/// The registry is owned by the application context and shared by
/// reference (or `Arc`). Concurrent first requests for a type build exactly
/// one manager; re-entrant requests from the thread doing the build get
/// `None`. Every build attempt passes through a [`LoopGuard`]; once the
/// guard trips for a type, that type stays unavailable for the lifetime
/// of the registry.
///
/// # Example
///
/// ```ignore
/// let registry = RepositoryRegistry::builder(adapter)
///     .config(config.section::<GuardConfig>()?)
///     .build();
/// let options = registry.instance::<ConfigOption>().expect("repository");
/// ```
pub struct RepositoryRegistry {
    adapter: Arc<dyn Adapter>,
    guard: LoopGuard,
    state: Mutex<State>,
    ready: Condvar,
}

impl RepositoryRegistry {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self::builder(adapter).build()
    }

    pub fn builder(adapter: Arc<dyn Adapter>) -> RegistryBuilder {
        RegistryBuilder {
            adapter,
            config: GuardConfig::default(),
            probe: None,
            sink: None,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn metrics(&self) -> GuardSnapshot {
        self.guard.metrics()
    }

    pub fn guard_config(&self) -> &GuardConfig {
        self.guard.config()
    }

    /// The manager for `E`, building it on first use.
    pub fn instance<E: Entity>(&self) -> Option<Arc<DataManager<E>>> {
        self.instance_with(|| DataManager::new(self.adapter.clone()))
    }

    /// Like [`instance`](Self::instance), with a custom constructor for the
    /// first build.
    pub fn instance_with<E, F>(&self, build: F) -> Option<Arc<DataManager<E>>>
    where
        E: Entity,
        F: FnOnce() -> Result<DataManager<E>, DataError>,
    {
        let type_id = TypeId::of::<E>();
        let entity = E::entity_name();
        let me = thread::current().id();

        let mut state = self.lock();
        loop {
            let entry = state.entry(type_id).or_default();
            if entry.tripped {
                return None;
            }
            match &entry.slot {
                Some(Slot::Ready(any)) => return any.clone().downcast::<DataManager<E>>().ok(),
                Some(Slot::Building(owner)) if *owner == me => {
                    entry.attempts += 1;
                    let attempts = entry.attempts;
                    let kind = match self.guard.admit(attempts) {
                        Err(kind) => {
                            entry.tripped = true;
                            kind
                        }
                        Ok(()) => DiagnosticKind::Reentrant,
                    };
                    drop(state);
                    self.guard.report(entity, attempts, kind);
                    return None;
                }
                Some(Slot::Building(_)) => {
                    state = self
                        .ready
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => break,
            }
        }

        let entry = state.entry(type_id).or_default();
        entry.attempts += 1;
        let attempts = entry.attempts;
        if let Err(kind) = self.guard.admit(attempts) {
            entry.tripped = true;
            drop(state);
            self.guard.report(entity, attempts, kind);
            self.ready.notify_all();
            return None;
        }
        entry.slot = Some(Slot::Building(me));
        drop(state);

        let pending = PendingBuild {
            registry: self,
            type_id,
            armed: true,
        };
        let built = build();
        pending.disarm();

        let mut state = self.lock();
        let entry = state.entry(type_id).or_default();
        let result = match built {
            Ok(manager) => {
                let manager = Arc::new(manager);
                entry.slot = Some(Slot::Ready(manager.clone()));
                tracing::debug!(entity, attempts, "Repository constructed");
                Some(manager)
            }
            Err(err) => {
                entry.slot = None;
                drop(state);
                self.guard.report(
                    entity,
                    attempts,
                    DiagnosticKind::ConstructionFailed(err.to_string()),
                );
                None
            }
        };
        self.ready.notify_all();
        result
    }

    /// Like [`instance`](Self::instance), reporting why no manager is
    /// available.
    pub fn require<E: Entity>(&self) -> Result<Arc<DataManager<E>>, DataError> {
        if let Some(manager) = self.instance::<E>() {
            return Ok(manager);
        }
        let state = self.lock();
        match state.get(&TypeId::of::<E>()) {
            Some(entry) if entry.tripped => Err(DataError::BootstrapExhausted {
                entity: E::entity_name(),
                attempts: entry.attempts,
            }),
            _ => Err(DataError::InvalidArgument(format!(
                "repository for {} could not be constructed",
                type_name::<E>()
            ))),
        }
    }

    /// Whether the breaker for `E` has tripped.
    pub fn is_tripped<E: Entity>(&self) -> bool {
        self.lock()
            .get(&TypeId::of::<E>())
            .is_some_and(|entry| entry.tripped)
    }

    /// Construction attempts made so far for `E`.
    pub fn attempts<E: Entity>(&self) -> u64 {
        self.lock()
            .get(&TypeId::of::<E>())
            .map_or(0, |entry| entry.attempts)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a `Building` slot if the constructor unwinds.
struct PendingBuild<'a> {
    registry: &'a RepositoryRegistry,
    type_id: TypeId,
    armed: bool,
}

impl PendingBuild<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingBuild<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(entry) = self.registry.lock().get_mut(&self.type_id) {
            entry.slot = None;
        }
        self.registry.ready.notify_all();
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

pub struct RegistryBuilder {
    adapter: Arc<dyn Adapter>,
    config: GuardConfig,
    probe: Option<Arc<dyn MemoryProbe>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Read the breaker settings from the `pier.registry` config section.
    pub fn with_config(self, config: &PierConfig) -> Result<Self, DataError> {
        Ok(self.config(config.section::<GuardConfig>()?))
    }

    pub fn memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> RepositoryRegistry {
        let probe = self
            .probe
            .unwrap_or_else(|| Arc::new(ProcessMemoryProbe::new()));
        let sink = self.sink.unwrap_or_else(|| match &self.config.diagnostic_log {
            Some(path) => Arc::new(FileDiagnosticSink::new(path.clone())),
            None => Arc::new(StderrDiagnosticSink),
        });
        RepositoryRegistry {
            adapter: self.adapter,
            guard: LoopGuard::new(self.config, probe, sink),
            state: Mutex::new(HashMap::new()),
            ready: Condvar::new(),
        }
    }
}
