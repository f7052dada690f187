use crate::stage::StageId;
use serde_json::Value;

/// Latest result per stage. `None` means the stage has not run for the current file.
#[derive(Debug, Default, Clone)]
pub struct ResultStore {
    entries: [Option<Value>; 6],
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: StageId) -> Option<&Value> {
        self.entries[stage.index()].as_ref()
    }

    /// Replaces the whole entry; results are never patched field by field.
    pub fn set(&mut self, stage: StageId, result: Value) {
        self.entries[stage.index()] = Some(result);
    }

    pub fn reset_all(&mut self) {
        self.entries = Default::default();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    /// Stages holding a result, in chain order.
    pub fn completed(&self) -> Vec<StageId> {
        StageId::ORDER
            .into_iter()
            .filter(|stage| self.get(*stage).is_some())
            .collect()
    }
}
