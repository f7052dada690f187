//! Background execution of stage requests.
//!
//! Workers never touch session state. Their updates queue on a channel until the UI thread
//! drains them into its `Dashboard`, one whole update at a time.

use crate::chart::ChartBackend;
use crate::client::StageService;
use crate::dashboard::Dashboard;
use crate::error::StageError;
use crate::session::{execute, StageUpdate};
use crate::stage::ActionId;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Notify = Arc<dyn Fn() + Send + Sync>;

pub struct StageRunner {
    service: Arc<dyn StageService>,
    update_tx: Sender<StageUpdate>,
    update_rx: Receiver<StageUpdate>,
    notify: Option<Notify>,
    in_flight: usize,
}

impl StageRunner {
    pub fn new(service: Arc<dyn StageService>) -> Self {
        let (update_tx, update_rx) = unbounded();
        Self {
            service,
            update_tx,
            update_rx,
            notify: None,
            in_flight: 0,
        }
    }

    /// Called from a worker after each update is queued, e.g. to request a repaint.
    pub fn with_notifier(mut self, notify: impl Fn() + Send + Sync + 'static) -> Self {
        self.notify = Some(Arc::new(notify));
        self
    }

    /// Begin `action` on the dashboard and run it on a fresh worker.
    pub fn trigger<B: ChartBackend>(
        &mut self,
        dashboard: &mut Dashboard<B>,
        action: ActionId,
    ) -> Result<(), StageError> {
        let ticket = dashboard.begin(action)?;
        let service = Arc::clone(&self.service);
        let tx = self.update_tx.clone();
        let notify = self.notify.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("stage-{}", action.label()))
            .spawn(move || {
                execute(service.as_ref(), &ticket, |update| {
                    let _ = tx.send(update);
                    if let Some(notify) = &notify {
                        (**notify)();
                    }
                });
            });
        match spawned {
            Ok(_) => {
                self.in_flight += 1;
                debug!("dispatched {}", action.label());
                Ok(())
            }
            Err(err) => {
                error!("failed to spawn worker: {err}");
                let generation = dashboard.session().generation();
                let error = StageError::Network(format!("Cannot start request: {err}"));
                dashboard.apply(StageUpdate::Failed {
                    generation,
                    action,
                    error: error.clone(),
                });
                dashboard.apply(StageUpdate::Finished { generation, action });
                Err(error)
            }
        }
    }

    /// Apply every queued update. Returns how many were applied.
    pub fn drain_into<B: ChartBackend>(&mut self, dashboard: &mut Dashboard<B>) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.update_rx.try_recv() {
            self.apply(dashboard, update);
            applied += 1;
        }
        applied
    }

    /// Block until every dispatched action has finished or `timeout` elapses.
    /// Returns true when nothing is left in flight.
    pub fn wait_into<B: ChartBackend>(
        &mut self,
        dashboard: &mut Dashboard<B>,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.update_rx.recv_timeout(remaining) {
                Ok(update) => self.apply(dashboard, update),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.in_flight == 0
    }

    /// Actions dispatched whose `Finished` has not been drained yet.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    fn apply<B: ChartBackend>(&mut self, dashboard: &mut Dashboard<B>, update: StageUpdate) {
        if matches!(update, StageUpdate::Finished { .. }) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        dashboard.apply(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::MemoryBackend;
    use crate::session::tests::{arff, ScriptedService};
    use crate::stage::{ChartSlot, StageId};
    use crate::transform::Limits;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Condvar, Mutex};

    const WAIT: Duration = Duration::from_secs(5);

    fn dashboard() -> Dashboard<MemoryBackend> {
        let mut dash = Dashboard::new(MemoryBackend::new(), Limits::default());
        dash.select_file(Some(arff())).unwrap();
        dash
    }

    #[test]
    fn independent_triggers_update_disjoint_stages() {
        let service = Arc::new(ScriptedService::default());
        let repaints = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&repaints);
        let mut runner = StageRunner::new(service.clone()).with_notifier(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let mut dash = dashboard();
        runner
            .trigger(&mut dash, ActionId::Stage(StageId::Training))
            .unwrap();
        runner
            .trigger(&mut dash, ActionId::Stage(StageId::Preprocessing))
            .unwrap();
        assert!(dash.session().is_loading(ActionId::Stage(StageId::Training)));
        assert!(runner.wait_into(&mut dash, WAIT));
        assert_eq!(runner.pending(), 0);
        assert_eq!(
            dash.session().store().completed(),
            [StageId::Training, StageId::Preprocessing]
        );
        assert!(!dash.session().any_loading());
        assert_eq!(repaints.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn trigger_without_file_never_dispatches() {
        let service = Arc::new(ScriptedService::default());
        let mut runner = StageRunner::new(service.clone());
        let mut dash = Dashboard::new(MemoryBackend::new(), Limits::default());
        assert!(runner.trigger(&mut dash, ActionId::RunAll).is_err());
        assert_eq!(runner.pending(), 0);
        assert!(service.calls().is_empty());
    }

    /// Blocks every call until released, so a test can reselect the file mid-flight.
    struct GatedService {
        open: Mutex<bool>,
        cond: Condvar,
    }

    impl StageService for GatedService {
        fn run_stage(
            &self,
            _stage: StageId,
            _file: &crate::file::SelectedFile,
        ) -> Result<Value, StageError> {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cond.wait(open).unwrap();
            }
            Ok(json!({
                "metrics": {"accuracy": 0.5, "precision": 0.5, "recall": 0.5, "f1": 0.5},
                "confusion_matrix": {"tn": 1, "fp": 1, "fn": 1, "tp": 1}
            }))
        }
    }

    #[test]
    fn late_response_for_replaced_file_is_dropped() {
        let service = Arc::new(GatedService {
            open: Mutex::new(false),
            cond: Condvar::new(),
        });
        let mut runner = StageRunner::new(service.clone());
        let mut dash = dashboard();
        runner
            .trigger(&mut dash, ActionId::Stage(StageId::Evaluation))
            .unwrap();
        dash.select_file(Some(arff())).unwrap();

        *service.open.lock().unwrap() = true;
        service.cond.notify_all();
        assert!(runner.wait_into(&mut dash, WAIT));
        assert!(dash.session().store().is_empty());
        assert!(dash.charts().get(ChartSlot::Confusion).is_none());
        assert!(!dash.session().any_loading());
    }
}
