//! Table of loaded translations with coalesced loading.
//!
//! Each id is either `Loaded` or has one load in flight. The first caller for
//! an unloaded id becomes the leader and runs the load without holding the
//! table lock; later callers wait on the same in-flight slot and receive the
//! leader's outcome. Failures are handed to every waiter and then forgotten,
//! so the next request retries.

use std::collections::hash_map::{Entry, HashMap};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::error::{Result, ScriptureError};
use crate::models::TranslationInfo;
use crate::source::TranslationSource;
use crate::store::TranslationStore;

type LoadOutcome = Result<Arc<TranslationStore>>;

enum Slot {
    Loaded(Arc<TranslationStore>),
    Loading(Arc<InFlight>),
}

#[derive(Default)]
struct InFlight {
    outcome: Mutex<Option<LoadOutcome>>,
    done: Condvar,
}

impl InFlight {
    fn wait(&self) -> LoadOutcome {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut outcome);
        }
    }

    fn finish(&self, result: LoadOutcome) {
        *self.outcome.lock() = Some(result);
        self.done.notify_all();
    }
}

enum Claim {
    Ready(Arc<TranslationStore>),
    Wait(Arc<InFlight>),
    Lead(Arc<InFlight>),
}

pub struct TranslationRegistry {
    source: Box<dyn TranslationSource>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl TranslationRegistry {
    /// An empty registry that loads from `source` on demand.
    pub fn new(source: impl TranslationSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the store for `id`, loading it if needed. Concurrent callers for
    /// the same unloaded id share a single load.
    pub fn get(&self, id: &str) -> LoadOutcome {
        let claim = {
            let mut slots = self.slots.lock();
            match slots.entry(id.to_string()) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Loaded(store) => Claim::Ready(Arc::clone(store)),
                    Slot::Loading(flight) => Claim::Wait(Arc::clone(flight)),
                },
                Entry::Vacant(entry) => {
                    let flight = Arc::new(InFlight::default());
                    entry.insert(Slot::Loading(Arc::clone(&flight)));
                    Claim::Lead(flight)
                }
            }
        };

        match claim {
            Claim::Ready(store) => Ok(store),
            Claim::Wait(flight) => {
                debug!(translation = id, "waiting on in-flight load");
                flight.wait()
            }
            Claim::Lead(flight) => {
                let mut guard = LeaderGuard {
                    registry: self,
                    id,
                    flight,
                    outcome: None,
                };
                let outcome = self.load(id);
                guard.outcome = Some(outcome.clone());
                drop(guard);
                outcome
            }
        }
    }

    /// Install `store` under its id, replacing whatever was there. Readers
    /// holding the previous store keep a consistent view of it.
    pub fn replace(&self, store: TranslationStore) -> Arc<TranslationStore> {
        let id = store.id().to_string();
        let store = Arc::new(store);
        let previous = self
            .slots
            .lock()
            .insert(id.clone(), Slot::Loaded(Arc::clone(&store)));
        match previous {
            Some(Slot::Loaded(_)) => info!(translation = %id, "translation replaced"),
            Some(Slot::Loading(_)) => {
                info!(translation = %id, "translation replaced while a load was in flight")
            }
            None => info!(translation = %id, "translation installed"),
        }
        store
    }

    /// Forget a loaded translation so the next `get` reloads it. In-flight
    /// loads are left alone. Returns whether anything was evicted.
    pub fn evict(&self, id: &str) -> bool {
        let mut slots = self.slots.lock();
        if matches!(slots.get(id), Some(Slot::Loaded(_))) {
            slots.remove(id);
            debug!(translation = id, "translation evicted");
            true
        } else {
            false
        }
    }

    /// Whether `id` is currently loaded, without triggering a load.
    pub fn is_loaded(&self, id: &str) -> bool {
        matches!(self.slots.lock().get(id), Some(Slot::Loaded(_)))
    }

    /// Every translation the source offers plus everything installed or
    /// loaded, sorted by id. Loaded stores supply the display name. A source
    /// that cannot be listed is logged and skipped so loaded translations are
    /// still reported.
    pub fn translations(&self) -> Vec<TranslationInfo> {
        let mut by_id: HashMap<String, TranslationInfo> = match self.source.available() {
            Ok(list) => list.into_iter().map(|t| (t.id.clone(), t)).collect(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "failed to list available translations");
                HashMap::new()
            }
        };
        for slot in self.slots.lock().values() {
            if let Slot::Loaded(store) = slot {
                by_id.insert(store.id().to_string(), store.info().clone());
            }
        }
        let mut list: Vec<_> = by_id.into_values().collect();
        list.sort();
        list
    }

    fn load(&self, id: &str) -> LoadOutcome {
        info!(translation = id, "loading translation");
        let data = match self.source.load(id) {
            Ok(Some(data)) => data,
            Ok(None) => return Err(ScriptureError::TranslationNotFound(id.to_string())),
            Err(err) => return Err(ScriptureError::load(id, &err)),
        };
        let count = data.records.len();
        let store = TranslationStore::build(data.info, data.records)?;
        info!(translation = id, verses = count, "translation loaded");
        Ok(Arc::new(store))
    }

    /// Publish a leader's outcome. The slot is only updated if it still holds
    /// this flight; a `replace` that landed mid-load wins.
    fn complete(&self, id: &str, flight: &Arc<InFlight>, outcome: &LoadOutcome) {
        {
            let mut slots = self.slots.lock();
            let current = matches!(
                slots.get(id),
                Some(Slot::Loading(slot)) if Arc::ptr_eq(slot, flight)
            );
            if current {
                match outcome {
                    Ok(store) => {
                        slots.insert(id.to_string(), Slot::Loaded(Arc::clone(store)));
                    }
                    Err(err) => {
                        if err.is_integrity_failure() {
                            warn!(translation = id, error = %err, "translation data rejected");
                        } else if matches!(err, ScriptureError::TranslationNotFound(_)) {
                            debug!(translation = id, "translation not found");
                        } else {
                            warn!(translation = id, error = %err, "translation load failed");
                        }
                        slots.remove(id);
                    }
                }
            }
        }
        flight.finish(outcome.clone());
    }
}

/// Ensures waiters are released even if the leader's load panics.
struct LeaderGuard<'a> {
    registry: &'a TranslationRegistry,
    id: &'a str,
    flight: Arc<InFlight>,
    outcome: Option<LoadOutcome>,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            Err(ScriptureError::Load {
                translation: self.id.to_string(),
                message: "loader panicked".to_string(),
            })
        });
        self.registry.complete(self.id, &self.flight, &outcome);
    }
}
