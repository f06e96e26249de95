use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use super::*;
use crate::effects::fetch::MemoryFetcher;
use crate::effects::source::DEFAULT_SLOT;
use crate::engine::backend::TickOutput;
use crate::foundation::core::FrameRGBA;

/// Engine fake that records every load/release and hands out sequential
/// handles.
#[derive(Default)]
struct FakeEngine {
    next_handle: u64,
    loads: Vec<(Vec<u8>, String, u32)>,
    released: Vec<EffectHandle>,
    reject_loads: bool,
}

impl TrackingEngine for FakeEngine {
    fn load_effect(&mut self, bytes: &[u8], slot: &str, face: u32) -> MiravaResult<EffectHandle> {
        if self.reject_loads {
            return Err(MiravaError::effect_load("engine rejected package"));
        }
        self.loads.push((bytes.to_vec(), slot.to_string(), face));
        self.next_handle += 1;
        Ok(EffectHandle::from_raw(self.next_handle))
    }

    fn release_effect(&mut self, handle: EffectHandle) {
        self.released.push(handle);
    }

    fn set_environment_map(&mut self, _bytes: &[u8]) -> MiravaResult<()> {
        Ok(())
    }

    fn set_diamond_environment_map(&mut self, _bytes: &[u8]) -> MiravaResult<()> {
        Ok(())
    }

    fn process_frame(&mut self, _input: &FrameRGBA) -> MiravaResult<TickOutput> {
        Ok(TickOutput::default())
    }

    fn fire_trigger(&mut self, _trigger: &str) {}
}

/// Fetcher that echoes the URL as package bytes, optionally holding a fetch
/// until the test opens its gate. Opening order controls completion order.
#[derive(Default)]
struct GatedFetcher {
    gates: Mutex<HashMap<String, mpsc::Receiver<()>>>,
}

impl GatedFetcher {
    fn gate(&self, url: &str) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(url.to_string(), rx);
        tx
    }
}

impl EffectFetcher for GatedFetcher {
    fn fetch(&self, source: &EffectSource) -> MiravaResult<Arc<[u8]>> {
        match source {
            EffectSource::Bytes(bytes) => Ok(bytes.clone()),
            EffectSource::Url(url) => {
                let gate = self.gates.lock().unwrap().remove(url);
                if let Some(rx) = gate {
                    // Err just means the test dropped the sender; both count
                    // as opening the gate.
                    let _ = rx.recv();
                }
                Ok(url.as_bytes().into())
            }
        }
    }
}

fn pump_until(
    mgr: &mut SlotManager,
    engine: &mut FakeEngine,
    mut done: impl FnMut(&[PumpEvent]) -> bool,
) -> Vec<PumpEvent> {
    let mut seen = Vec::new();
    for _ in 0..5000 {
        seen.extend(mgr.pump(engine));
        if done(&seen) {
            return seen;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("timed out waiting for pump events, saw {seen:?}");
}

fn applied(events: &[PumpEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PumpEvent::Applied { .. }))
        .count()
}

fn discarded(events: &[PumpEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PumpEvent::DiscardedStale { .. }))
        .count()
}

#[test]
fn superseded_load_is_canceled_and_its_completion_discarded() {
    let fetcher = Arc::new(GatedFetcher::default());
    let gate_x = fetcher.gate("x.fx");
    let gate_y = fetcher.gate("y.fx");
    let mut mgr = SlotManager::new(fetcher);
    let mut engine = FakeEngine::default();

    let ticket_x = mgr
        .switch_effect("x.fx".into(), SwitchOptions::default())
        .unwrap();
    let ticket_y = mgr
        .switch_effect("y.fx".into(), SwitchOptions::default())
        .unwrap();

    // Superseding settles the old ticket immediately, before any IO finishes.
    assert!(matches!(ticket_x.try_outcome(), Some(LoadOutcome::Canceled)));

    gate_y.send(()).unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 1);
    assert!(matches!(ticket_y.try_outcome(), Some(LoadOutcome::Applied)));
    let active = mgr.active_effect(DEFAULT_SLOT).expect("Y applied");

    // X completes late; its result must be discarded, not applied.
    gate_x.send(()).unwrap();
    pump_until(&mut mgr, &mut engine, |ev| discarded(ev) == 1);
    assert_eq!(mgr.active_effect(DEFAULT_SLOT), Some(active));
    assert_eq!(engine.loads.len(), 1);
    assert_eq!(engine.loads[0].0, b"y.fx");
    assert!(engine.released.is_empty());
}

#[test]
fn supersession_holds_even_when_old_load_finishes_first() {
    let fetcher = Arc::new(GatedFetcher::default());
    let gate_x = fetcher.gate("x.fx");
    let gate_y = fetcher.gate("y.fx");
    let mut mgr = SlotManager::new(fetcher);
    let mut engine = FakeEngine::default();

    let _ticket_x = mgr
        .switch_effect("x.fx".into(), SwitchOptions::default())
        .unwrap();
    let ticket_y = mgr
        .switch_effect("y.fx".into(), SwitchOptions::default())
        .unwrap();

    // X's fetch finishes before Y's, so its stale completion is drained first.
    gate_x.send(()).unwrap();
    pump_until(&mut mgr, &mut engine, |ev| discarded(ev) == 1);
    assert!(mgr.active_effect(DEFAULT_SLOT).is_none());

    gate_y.send(()).unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 1);
    assert!(matches!(ticket_y.try_outcome(), Some(LoadOutcome::Applied)));
    assert_eq!(engine.loads.len(), 1);
    assert_eq!(engine.loads[0].0, b"y.fx");
}

#[test]
fn loads_into_different_slots_never_cancel_each_other() {
    let fetcher = Arc::new(GatedFetcher::default());
    let gate_a = fetcher.gate("a.fx");
    let gate_b = fetcher.gate("b.fx");
    let mut mgr = SlotManager::new(fetcher);
    let mut engine = FakeEngine::default();

    let ticket_a = mgr
        .switch_effect("a.fx".into(), SwitchOptions::for_slot("background"))
        .unwrap();
    let ticket_b = mgr
        .switch_effect("b.fx".into(), SwitchOptions::for_slot("mask"))
        .unwrap();
    assert!(ticket_a.try_outcome().is_none());
    assert!(ticket_b.try_outcome().is_none());

    gate_b.send(()).unwrap();
    gate_a.send(()).unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 2);

    assert!(matches!(ticket_a.try_outcome(), Some(LoadOutcome::Applied)));
    assert!(matches!(ticket_b.try_outcome(), Some(LoadOutcome::Applied)));
    assert!(mgr.active_effect("background").is_some());
    assert!(mgr.active_effect("mask").is_some());
}

#[test]
fn wait_reports_cancellation_distinctly() {
    let fetcher = Arc::new(GatedFetcher::default());
    let _gate = fetcher.gate("slow.fx");
    let mut mgr = SlotManager::new(fetcher);

    let ticket = mgr
        .switch_effect("slow.fx".into(), SwitchOptions::default())
        .unwrap();
    let _replacement = mgr
        .switch_effect(EffectSource::Bytes(b"new".as_slice().into()), SwitchOptions::default())
        .unwrap();

    let err = ticket.wait().unwrap_err();
    assert!(err.is_cancellation());
}

#[test]
fn clear_effect_is_idempotent() {
    let fetcher = Arc::new(GatedFetcher::default());
    let mut mgr = SlotManager::new(fetcher);
    let mut engine = FakeEngine::default();

    // Clearing an empty or unknown slot is a no-op, twice as much as once.
    mgr.clear_effect("nothing-here", &mut engine);
    mgr.clear_effect("nothing-here", &mut engine);
    assert!(engine.released.is_empty());
}

#[test]
fn clear_effect_cancels_pending_and_releases_active() {
    let fetcher = Arc::new(GatedFetcher::default());
    let gate = fetcher.gate("slow.fx");
    let mut mgr = SlotManager::new(fetcher.clone());
    let mut engine = FakeEngine::default();

    let first = mgr
        .switch_effect(EffectSource::Bytes(b"first".as_slice().into()), SwitchOptions::default())
        .unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 1);
    first.wait().unwrap();
    let handle = mgr.active_effect(DEFAULT_SLOT).unwrap();

    let pending = mgr
        .switch_effect("slow.fx".into(), SwitchOptions::default())
        .unwrap();
    mgr.clear_effect(DEFAULT_SLOT, &mut engine);

    assert!(matches!(pending.try_outcome(), Some(LoadOutcome::Canceled)));
    assert_eq!(engine.released, vec![handle]);
    assert!(mgr.active_effect(DEFAULT_SLOT).is_none());

    // The canceled load's completion still drains harmlessly.
    gate.send(()).unwrap();
    pump_until(&mut mgr, &mut engine, |ev| discarded(ev) == 1);
    assert!(mgr.active_effect(DEFAULT_SLOT).is_none());
    assert_eq!(engine.loads.len(), 1);
}

#[test]
fn failed_load_leaves_previous_effect_in_place() {
    let fetcher = Arc::new(GatedFetcher::default());
    let mut mgr = SlotManager::new(fetcher);
    let mut engine = FakeEngine::default();

    let first = mgr
        .switch_effect(EffectSource::Bytes(b"good".as_slice().into()), SwitchOptions::default())
        .unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 1);
    first.wait().unwrap();
    let handle = mgr.active_effect(DEFAULT_SLOT).unwrap();

    engine.reject_loads = true;
    let second = mgr
        .switch_effect(EffectSource::Bytes(b"bad".as_slice().into()), SwitchOptions::default())
        .unwrap();
    pump_until(&mut mgr, &mut engine, |ev| {
        ev.iter().any(|e| matches!(e, PumpEvent::Failed { .. }))
    });

    assert!(matches!(
        second.wait(),
        Err(MiravaError::EffectLoadFailed(_))
    ));
    assert_eq!(mgr.active_effect(DEFAULT_SLOT), Some(handle));
    assert!(engine.released.is_empty());
}

#[test]
fn fetch_failure_surfaces_as_effect_load_failed() {
    let mut table = MemoryFetcher::new();
    table.insert("known.fx", b"pkg".as_slice());
    let mut mgr = SlotManager::new(Arc::new(table));
    let mut engine = FakeEngine::default();

    let ticket = mgr
        .switch_effect("missing.fx".into(), SwitchOptions::default())
        .unwrap();
    pump_until(&mut mgr, &mut engine, |ev| {
        ev.iter().any(|e| matches!(e, PumpEvent::Failed { .. }))
    });
    assert!(matches!(
        ticket.wait(),
        Err(MiravaError::EffectLoadFailed(_))
    ));
    assert!(mgr.active_effect(DEFAULT_SLOT).is_none());
}

#[test]
fn face_index_out_of_range_is_rejected_up_front() {
    let fetcher = Arc::new(GatedFetcher::default());
    let mut mgr = SlotManager::new(fetcher);
    let opts = SwitchOptions {
        face: MAX_FACE_INDEX + 1,
        ..SwitchOptions::default()
    };
    assert!(matches!(
        mgr.switch_effect("x.fx".into(), opts),
        Err(MiravaError::Validation(_))
    ));
}

#[test]
fn replacing_an_applied_effect_releases_the_old_handle() {
    let fetcher = Arc::new(GatedFetcher::default());
    let mut mgr = SlotManager::new(fetcher);
    let mut engine = FakeEngine::default();

    let first = mgr
        .switch_effect(EffectSource::Bytes(b"one".as_slice().into()), SwitchOptions::default())
        .unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 1);
    first.wait().unwrap();
    let old = mgr.active_effect(DEFAULT_SLOT).unwrap();

    let second = mgr
        .switch_effect(EffectSource::Bytes(b"two".as_slice().into()), SwitchOptions::default())
        .unwrap();
    pump_until(&mut mgr, &mut engine, |ev| applied(ev) == 2);
    second.wait().unwrap();

    assert_eq!(engine.released, vec![old]);
    assert_ne!(mgr.active_effect(DEFAULT_SLOT), Some(old));
}
