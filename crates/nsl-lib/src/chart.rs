//! Slot registry owning at most one live chart per display slot.

use crate::plot::Figure;
use crate::stage::ChartSlot;
use anyhow::Result;
use log::debug;
use std::collections::BTreeMap;

/// Rendering layer that materialises figures into live chart instances.
pub trait ChartBackend {
    type Instance;

    fn create(&mut self, slot: ChartSlot, figure: &Figure) -> Result<Self::Instance>;

    /// Release everything held by `instance`.
    fn destroy(&mut self, slot: ChartSlot, instance: Self::Instance);
}

pub struct ChartHandle<I> {
    id: u64,
    slot: ChartSlot,
    figure: Figure,
    instance: I,
}

impl<I> ChartHandle<I> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot(&self) -> ChartSlot {
        self.slot
    }

    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    pub fn instance(&self) -> &I {
        &self.instance
    }
}

pub struct ChartLifecycleManager<B: ChartBackend> {
    backend: B,
    slots: BTreeMap<ChartSlot, ChartHandle<B::Instance>>,
    next_id: u64,
}

impl<B: ChartBackend> ChartLifecycleManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slots: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Destroy whatever occupies `slot`, then create and register a chart for `figure`.
    /// If creation fails the slot is left empty.
    pub fn draw(&mut self, slot: ChartSlot, figure: Figure) -> Result<&ChartHandle<B::Instance>> {
        self.destroy(slot);
        let instance = self.backend.create(slot, &figure)?;
        let id = self.next_id;
        self.next_id += 1;
        debug!("chart #{id} created in {slot}");
        let handle = ChartHandle {
            id,
            slot,
            figure,
            instance,
        };
        let handle: &ChartHandle<B::Instance> = self.slots.entry(slot).or_insert(handle);
        Ok(handle)
    }

    /// Returns true if a chart was registered for `slot`.
    pub fn destroy(&mut self, slot: ChartSlot) -> bool {
        match self.slots.remove(&slot) {
            Some(old) => {
                debug!("chart #{} destroyed in {slot}", old.id);
                self.backend.destroy(slot, old.instance);
                true
            }
            None => false,
        }
    }

    pub fn destroy_all(&mut self) {
        let slots: Vec<ChartSlot> = self.slots.keys().copied().collect();
        for slot in slots {
            self.destroy(slot);
        }
    }

    pub fn get(&self, slot: ChartSlot) -> Option<&ChartHandle<B::Instance>> {
        self.slots.get(&slot)
    }

    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: ChartBackend> Drop for ChartLifecycleManager<B> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartEvent {
    Created { slot: ChartSlot, serial: u64 },
    Destroyed { slot: ChartSlot, serial: u64 },
}

/// Retained in-memory backend. Instances are serial numbers. A journaled backend also
/// records every create and destroy in order.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    next_serial: u64,
    live: usize,
    journal: Option<Vec<ChartEvent>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journaled() -> Self {
        Self {
            journal: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    /// Recorded events; always empty unless built with `journaled`.
    pub fn events(&self) -> &[ChartEvent] {
        self.journal.as_deref().unwrap_or(&[])
    }

    fn record(&mut self, event: ChartEvent) {
        if let Some(journal) = &mut self.journal {
            journal.push(event);
        }
    }
}

impl ChartBackend for MemoryBackend {
    type Instance = u64;

    fn create(&mut self, slot: ChartSlot, _figure: &Figure) -> Result<u64> {
        self.next_serial += 1;
        self.live += 1;
        self.record(ChartEvent::Created {
            slot,
            serial: self.next_serial,
        });
        Ok(self.next_serial)
    }

    fn destroy(&mut self, slot: ChartSlot, serial: u64) {
        self.live = self.live.saturating_sub(1);
        self.record(ChartEvent::Destroyed { slot, serial });
    }
}
