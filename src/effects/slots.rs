//! A single effect slot holding at most one active effect and one in-flight load.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc;

use crate::effects::fetch::EffectFetcher;
use crate::effects::source::{EffectSource, MAX_FACE_INDEX, SwitchOptions};
use crate::engine::backend::{EffectHandle, TrackingEngine};
use crate::foundation::error::{MiravaError, MiravaResult};

/// Terminal outcome of one effect load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The effect was constructed and now occupies its slot.
    Applied,
    /// The load was superseded by a newer switch or a clear before it could
    /// apply. Not a failure.
    Canceled,
    /// Fetch, decode, or engine construction failed. The slot is unchanged.
    Failed(MiravaError),
}

/// Caller-visible handle to one in-flight effect load.
///
/// Each ticket settles into exactly one [`LoadOutcome`]. Outcomes are
/// delivered when the session pumps load completions on its tick, so a
/// blocking [`wait`](LoadTicket::wait) must happen on a different thread than
/// the one driving frames.
#[derive(Debug)]
pub struct LoadTicket {
    rx: mpsc::Receiver<LoadOutcome>,
}

impl LoadTicket {
    /// Block until the load settles.
    ///
    /// Cancellation is reported as [`MiravaError::SwitchEffectCanceled`] so a
    /// caller can tell benign replacement apart from a real failure. A session
    /// that shuts down with the load still pending also settles as canceled.
    pub fn wait(self) -> MiravaResult<()> {
        match self.rx.recv() {
            Ok(LoadOutcome::Applied) => Ok(()),
            Ok(LoadOutcome::Canceled) | Err(mpsc::RecvError) => {
                Err(MiravaError::SwitchEffectCanceled)
            }
            Ok(LoadOutcome::Failed(e)) => Err(e),
        }
    }

    /// The outcome, if the load has already settled.
    pub fn try_outcome(&self) -> Option<LoadOutcome> {
        self.rx.try_recv().ok()
    }
}

/// What the slot manager did with one drained completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PumpEvent {
    /// The load applied; the slot now holds its effect.
    Applied {
        /// Slot that received the effect.
        slot: String,
    },
    /// The load failed; the slot is unchanged.
    Failed {
        /// Slot whose load failed.
        slot: String,
    },
    /// A superseded load completed and its result was discarded.
    DiscardedStale {
        /// Slot the stale completion belonged to.
        slot: String,
    },
}

struct FetchedPackage {
    bytes: Arc<[u8]>,
    envmap: Option<Arc<[u8]>>,
    diamond_envmap: Option<Arc<[u8]>>,
}

struct Completion {
    slot: String,
    generation: u64,
    result: MiravaResult<FetchedPackage>,
}

struct PendingLoad {
    generation: u64,
    face: u32,
    outcome_tx: mpsc::Sender<LoadOutcome>,
}

/// Per-slot state. Entries are never removed once created: the generation
/// counter must stay monotonic for the slot's whole lifetime so a stale
/// completion can never collide with a later load's generation.
#[derive(Default)]
struct SlotState {
    last_generation: u64,
    active: Option<EffectHandle>,
    pending: Option<PendingLoad>,
}

/// Owns the slot table and serializes effect loads per slot.
///
/// Fetching runs on spawned worker threads; slot mutation and engine calls
/// happen only on the session thread, when the session pumps completions on
/// its tick. Superseding a pending load settles its ticket as canceled
/// immediately; the worker's eventual completion is discarded by a
/// generation check.
pub struct SlotManager {
    fetcher: Arc<dyn EffectFetcher>,
    slots: HashMap<String, SlotState>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
}

impl SlotManager {
    /// Create a manager that resolves sources through `fetcher`.
    pub fn new(fetcher: Arc<dyn EffectFetcher>) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            fetcher,
            slots: HashMap::new(),
            completion_tx,
            completion_rx,
        }
    }

    /// Begin loading `source` into the slot named by `opts`.
    ///
    /// Any load already pending on that slot is canceled: its ticket settles
    /// as [`LoadOutcome::Canceled`] right away and its completion will be
    /// discarded. Operations on other slots are unaffected.
    #[tracing::instrument(skip(self, source, opts), fields(slot = %opts.slot))]
    pub fn switch_effect(
        &mut self,
        source: EffectSource,
        opts: SwitchOptions,
    ) -> MiravaResult<LoadTicket> {
        if opts.face > MAX_FACE_INDEX {
            return Err(MiravaError::validation(format!(
                "face index {} out of range 0..={MAX_FACE_INDEX}",
                opts.face
            )));
        }

        let slot = self.slots.entry(opts.slot.clone()).or_default();
        if let Some(prev) = slot.pending.take() {
            let _ = prev.outcome_tx.send(LoadOutcome::Canceled);
        }
        slot.last_generation += 1;
        let generation = slot.last_generation;

        let (outcome_tx, outcome_rx) = mpsc::channel();
        slot.pending = Some(PendingLoad {
            generation,
            face: opts.face,
            outcome_tx,
        });

        let fetcher = Arc::clone(&self.fetcher);
        let completion_tx = self.completion_tx.clone();
        let slot_name = opts.slot;
        let envmap = opts.envmap;
        let diamond_envmap = opts.diamond_envmap;
        std::thread::spawn(move || {
            let result = fetch_package(
                fetcher.as_ref(),
                &source,
                envmap.as_ref(),
                diamond_envmap.as_ref(),
            );
            // The manager may be gone by the time the fetch finishes.
            let _ = completion_tx.send(Completion {
                slot: slot_name,
                generation,
                result,
            });
        });

        Ok(LoadTicket { rx: outcome_rx })
    }

    /// Cancel any pending load for `slot` and release its active effect.
    ///
    /// Idempotent: clearing an empty or unknown slot is a no-op.
    pub fn clear_effect(&mut self, slot: &str, engine: &mut dyn TrackingEngine) {
        let Some(state) = self.slots.get_mut(slot) else {
            return;
        };
        if let Some(pending) = state.pending.take() {
            let _ = pending.outcome_tx.send(LoadOutcome::Canceled);
        }
        if let Some(handle) = state.active.take() {
            engine.release_effect(handle);
        }
    }

    /// Clear every slot. Used on session shutdown.
    pub(crate) fn clear_all(&mut self, engine: &mut dyn TrackingEngine) {
        let names: Vec<String> = self.slots.keys().cloned().collect();
        for name in names {
            self.clear_effect(&name, engine);
        }
    }

    /// Drain completed fetches and settle them against the current slot state.
    ///
    /// Must be called from the session thread; this is where engine
    /// construction, handle replacement, and ticket resolution happen.
    pub(crate) fn pump(&mut self, engine: &mut dyn TrackingEngine) -> Vec<PumpEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            events.push(self.settle(completion, engine));
        }
        events
    }

    /// The handle currently loaded into `slot`, if any.
    pub fn active_effect(&self, slot: &str) -> Option<EffectHandle> {
        self.slots.get(slot).and_then(|s| s.active)
    }

    /// True while a load is pending on `slot`.
    pub fn is_loading(&self, slot: &str) -> bool {
        self.slots.get(slot).is_some_and(|s| s.pending.is_some())
    }

    fn settle(&mut self, completion: Completion, engine: &mut dyn TrackingEngine) -> PumpEvent {
        let slot_name = completion.slot;
        let Some(state) = self.slots.get_mut(&slot_name) else {
            return PumpEvent::DiscardedStale { slot: slot_name };
        };
        // Only the completion matching the slot's current pending load may
        // mutate anything; everything else was superseded and is dropped here,
        // releasing the fetched bytes.
        let Some(pending) = state
            .pending
            .take_if(|p| p.generation == completion.generation)
        else {
            return PumpEvent::DiscardedStale { slot: slot_name };
        };

        let package = match completion.result {
            Ok(package) => package,
            Err(e) => {
                let _ = pending.outcome_tx.send(LoadOutcome::Failed(e));
                return PumpEvent::Failed { slot: slot_name };
            }
        };

        match construct_effect(engine, &slot_name, &pending, &package) {
            Ok(handle) => {
                if let Some(old) = state.active.replace(handle) {
                    engine.release_effect(old);
                }
                let _ = pending.outcome_tx.send(LoadOutcome::Applied);
                PumpEvent::Applied { slot: slot_name }
            }
            Err(e) => {
                let _ = pending.outcome_tx.send(LoadOutcome::Failed(e));
                PumpEvent::Failed { slot: slot_name }
            }
        }
    }
}

fn fetch_package(
    fetcher: &dyn EffectFetcher,
    source: &EffectSource,
    envmap: Option<&EffectSource>,
    diamond_envmap: Option<&EffectSource>,
) -> MiravaResult<FetchedPackage> {
    let bytes = fetcher.fetch(source)?;
    let envmap = envmap.map(|s| fetcher.fetch(s)).transpose()?;
    let diamond_envmap = diamond_envmap.map(|s| fetcher.fetch(s)).transpose()?;
    Ok(FetchedPackage {
        bytes,
        envmap,
        diamond_envmap,
    })
}

/// Construct the effect and its auxiliary resources in the engine. On any
/// failure the partially constructed handle is released so the slot's
/// previous effect stays untouched.
fn construct_effect(
    engine: &mut dyn TrackingEngine,
    slot: &str,
    pending: &PendingLoad,
    package: &FetchedPackage,
) -> MiravaResult<EffectHandle> {
    let handle = engine.load_effect(&package.bytes, slot, pending.face)?;
    if let Err(e) = apply_aux_resources(engine, package) {
        engine.release_effect(handle);
        return Err(e);
    }
    Ok(handle)
}

fn apply_aux_resources(
    engine: &mut dyn TrackingEngine,
    package: &FetchedPackage,
) -> MiravaResult<()> {
    if let Some(bytes) = package.envmap.as_deref() {
        engine.set_environment_map(bytes)?;
    }
    if let Some(bytes) = package.diamond_envmap.as_deref() {
        engine.set_diamond_environment_map(bytes)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/slots.rs"]
mod tests;
