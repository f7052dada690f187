use crate::chart::{ChartBackend, ChartLifecycleManager};
use crate::client::StageService;
use crate::error::{PayloadError, StageError};
use crate::file::SelectedFile;
use crate::plot::Figure;
use crate::session::{drive, Applied, RequestTicket, Session, StageUpdate};
use crate::stage::{ActionId, ChartSlot, StageId};
use crate::transform::{self, Limits, Table};
use log::warn;

/// Session state plus the charts drawn from it. Lives on the UI thread.
pub struct Dashboard<B: ChartBackend> {
    session: Session,
    charts: ChartLifecycleManager<B>,
    limits: Limits,
}

impl<B: ChartBackend> Dashboard<B> {
    pub fn new(backend: B, limits: Limits) -> Self {
        Self {
            session: Session::new(),
            charts: ChartLifecycleManager::new(backend),
            limits,
        }
    }

    /// On success every chart is torn down along with the stored results.
    pub fn select_file(&mut self, candidate: Option<SelectedFile>) -> Result<(), StageError> {
        self.session.select_file(candidate)?;
        self.charts.destroy_all();
        Ok(())
    }

    pub fn begin(&mut self, action: ActionId) -> Result<RequestTicket, StageError> {
        self.session.begin(action)
    }

    pub fn apply(&mut self, update: StageUpdate) -> Applied {
        let applied = self.session.apply(update);
        if let Applied::Stored(stage) = applied {
            self.redraw(stage);
        }
        applied
    }

    pub fn run_blocking(
        &mut self,
        service: &dyn StageService,
        action: ActionId,
    ) -> Result<Vec<StageId>, StageError> {
        let ticket = self.begin(action)?;
        drive(service, &ticket, |update| self.apply(update))
    }

    fn redraw(&mut self, stage: StageId) {
        let Some(payload) = self.session.store().get(stage) else {
            return;
        };
        let figures = match transform::figures_for(stage, payload, &self.limits) {
            Ok(figures) => figures,
            Err(err) => {
                warn!("cannot chart {stage}: {err}");
                for slot in stage.slots() {
                    self.charts.destroy(*slot);
                }
                self.session.report_error(err.to_string());
                return;
            }
        };
        for slot in stage.slots() {
            if !figures.iter().any(|(drawn, _)| drawn == slot) {
                self.charts.destroy(*slot);
            }
        }
        for (slot, figure) in figures {
            if let Err(err) = self.charts.draw(slot, figure) {
                warn!("drawing {slot} failed: {err:#}");
                self.session.report_error(format!("Cannot draw {slot}: {err}"));
            }
        }
    }

    /// Tables for `stage`, or `None` if it has not run for the current file.
    pub fn tables(&self, stage: StageId) -> Option<Result<Vec<Table>, PayloadError>> {
        self.session
            .store()
            .get(stage)
            .map(|payload| transform::tables_for(stage, payload, &self.limits))
    }

    pub fn figure(&self, slot: ChartSlot) -> Option<&Figure> {
        self.charts.get(slot).map(|handle| handle.figure())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn charts(&self) -> &ChartLifecycleManager<B> {
        &self.charts
    }

    pub fn charts_mut(&mut self) -> &mut ChartLifecycleManager<B> {
        &mut self.charts
    }
}
