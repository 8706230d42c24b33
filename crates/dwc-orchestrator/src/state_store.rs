use std::collections::HashMap;
use std::sync::Mutex;

use dwc_types::{ProcessingState, SpecimenId};

/// In-memory `(specimen_id, module)` processing-state table (§3 data
/// model). Persistence across runs is the run controller's job — it
/// hydrates one of these from a snapshot file at startup and writes
/// [`ProcessingStateStore::snapshot`] back out after the run, mirroring
/// how [`dwc_ocr_cache::OcrCache`] layers an in-memory map over on-disk
/// state.
#[derive(Default)]
pub struct ProcessingStateStore {
    states: Mutex<HashMap<(SpecimenId, String), ProcessingState>>,
}

impl ProcessingStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_snapshot(states: Vec<ProcessingState>) -> Self {
        let map = states
            .into_iter()
            .map(|s| ((s.specimen_id.clone(), s.module.clone()), s))
            .collect();
        Self {
            states: Mutex::new(map),
        }
    }

    #[must_use]
    pub fn get(&self, specimen_id: &str, module: &str) -> Option<ProcessingState> {
        self.states
            .lock()
            .expect("state store mutex poisoned")
            .get(&(specimen_id.to_string(), module.to_string()))
            .cloned()
    }

    pub fn upsert(&self, state: ProcessingState) {
        self.states
            .lock()
            .expect("state store mutex poisoned")
            .insert((state.specimen_id.clone(), state.module.clone()), state);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ProcessingState> {
        let states = self.states.lock().expect("state store mutex poisoned");
        let mut values: Vec<ProcessingState> = states.values().cloned().collect();
        values.sort_by(|a, b| (&a.specimen_id, &a.module).cmp(&(&b.specimen_id, &b.module)));
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwc_types::ProcessingStatus;

    #[test]
    fn missing_entry_is_none() {
        let store = ProcessingStateStore::new();
        assert!(store.get("sp1", "process").is_none());
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let store = ProcessingStateStore::new();
        store.upsert(ProcessingState::new_pending("sp1".to_string(), "process"));
        let state = store.get("sp1", "process").unwrap();
        assert_eq!(state.status, ProcessingStatus::Pending);
    }

    #[test]
    fn snapshot_round_trips_through_from_snapshot() {
        let store = ProcessingStateStore::new();
        store.upsert(ProcessingState::new_pending("sp1".to_string(), "process"));
        store.upsert(ProcessingState::new_pending("sp2".to_string(), "process"));

        let reloaded = ProcessingStateStore::from_snapshot(store.snapshot());
        assert!(reloaded.get("sp1", "process").is_some());
        assert!(reloaded.get("sp2", "process").is_some());
    }
}
