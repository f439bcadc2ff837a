//! Registry of requests currently on the wire.
//!
//! The first caller for a fingerprint becomes the owner and performs the
//! network call; later callers with the same fingerprint join and wait on a
//! `watch` channel that is written exactly once. The owner removes its entry
//! from the registry *before* publishing the outcome, so a caller arriving
//! after removal always starts a fresh request and never observes a finished
//! entry.

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::{CallError, Fingerprint};

/// Successful response shared by the owner and all joiners.
#[derive(Clone)]
pub(crate) struct Completed {
    pub(crate) body: Bytes,
    pub(crate) decoded: Option<Arc<dyn Any + Send + Sync>>,
}

impl Completed {
    /// Returns the owner's decoded value when it was decoded as `T`, so every
    /// caller asking for the same type shares one allocation. Otherwise the
    /// shared body bytes are decoded as `T`; decoding is deterministic, so
    /// callers asking for the same `T` see the same result whichever of
    /// them performed the request.
    pub(crate) fn typed<T>(&self) -> Result<Arc<T>, CallError>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        if let Some(decoded) = &self.decoded {
            if let Ok(value) = Arc::clone(decoded).downcast::<T>() {
                return Ok(value);
            }
        }

        serde_json::from_slice::<T>(&self.body)
            .map(Arc::new)
            .map_err(|e| CallError::Decode(e.to_string()))
    }
}

pub(crate) type Outcome = Result<Completed, CallError>;

type Signal = watch::Receiver<Option<Outcome>>;

struct Slot {
    generation: u64,
    signal: Signal,
}

pub(crate) enum Registration<'a> {
    Owner(OwnerGuard<'a>),
    Joiner(Signal),
}

#[derive(Default)]
pub(crate) struct InFlight {
    entries: Mutex<HashMap<Fingerprint, Slot>>,
    next_generation: AtomicU64,
}

impl InFlight {
    pub(crate) fn register(&self, fingerprint: Fingerprint) -> Registration<'_> {
        let mut entries = self.lock();
        if let Some(slot) = entries.get(&fingerprint) {
            return Registration::Joiner(slot.signal.clone());
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (sender, signal) = watch::channel(None);
        entries.insert(fingerprint.clone(), Slot { generation, signal });

        Registration::Owner(OwnerGuard {
            registry: self,
            fingerprint,
            generation,
            sender: Some(sender),
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn remove(&self, fingerprint: &Fingerprint, generation: u64) {
        let mut entries = self.lock();
        if entries
            .get(fingerprint)
            .is_some_and(|slot| slot.generation == generation)
        {
            entries.remove(fingerprint);
        }
    }

    // The map holds no invariants that a panicking holder could break
    // half-way, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held by the caller performing the network request.
///
/// Dropping the guard without calling [`OwnerGuard::complete`] (the owning
/// future was cancelled) still removes the entry; joiners then see the
/// channel close and report [`CallError::Abandoned`].
pub(crate) struct OwnerGuard<'a> {
    registry: &'a InFlight,
    fingerprint: Fingerprint,
    generation: u64,
    sender: Option<watch::Sender<Option<Outcome>>>,
}

impl OwnerGuard<'_> {
    pub(crate) fn complete(mut self, outcome: Outcome) -> Outcome {
        self.registry.remove(&self.fingerprint, self.generation);
        if let Some(sender) = self.sender.take() {
            sender.send_replace(Some(outcome.clone()));
        }
        outcome
    }
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.registry.remove(&self.fingerprint, self.generation);
        }
    }
}

pub(crate) async fn wait(mut signal: Signal) -> Outcome {
    match signal.wait_for(Option::is_some).await {
        Ok(outcome) => (*outcome).clone().unwrap_or(Err(CallError::Abandoned)),
        Err(_) => Err(CallError::Abandoned),
    }
}
