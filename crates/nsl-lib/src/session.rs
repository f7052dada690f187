//! Upload controller: file selection, request tickets and routing of stage outcomes.

use crate::client::StageService;
use crate::error::StageError;
use crate::file::{validate_candidate, SelectedFile, MISSING_FILE_MESSAGE};
use crate::stage::{ActionId, StageId};
use crate::store::ResultStore;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;

/// Single-slot, last-write-wins error message.
#[derive(Debug, Default, Clone)]
pub struct ErrorChannel {
    current: Option<String>,
}

impl ErrorChannel {
    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn set(&mut self, message: impl Into<String>) {
        self.current = Some(message.into());
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

/// Everything a worker needs to run an action, tagged with the file generation it was issued for.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub action: ActionId,
    pub generation: u64,
    pub file: SelectedFile,
}

#[derive(Debug, Clone)]
pub enum StageUpdate {
    Completed {
        generation: u64,
        stage: StageId,
        result: Value,
    },
    Failed {
        generation: u64,
        action: ActionId,
        error: StageError,
    },
    /// Last update of every ticket, whatever the outcome.
    Finished { generation: u64, action: ActionId },
}

/// What `Session::apply` did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Stored(StageId),
    Failed(ActionId),
    Finished(ActionId),
    /// Issued for a file that has since been replaced.
    Stale,
}

/// Run the ticket's stage, or the whole chain for `RunAll`, reporting through `emit`.
///
/// The chain stops at the first failure. Exactly one `Failed` is emitted for it, and
/// `Finished` always comes last.
pub fn execute(service: &dyn StageService, ticket: &RequestTicket, mut emit: impl FnMut(StageUpdate)) {
    let stages: &[StageId] = match &ticket.action {
        ActionId::Stage(stage) => std::slice::from_ref(stage),
        ActionId::RunAll => &StageId::ORDER,
    };
    for &stage in stages {
        debug!("running {stage} for {} (gen {})", ticket.file.name(), ticket.generation);
        match service.run_stage(stage, &ticket.file) {
            Ok(result) => emit(StageUpdate::Completed {
                generation: ticket.generation,
                stage,
                result,
            }),
            Err(error) => {
                warn!("{stage} failed: {error}");
                emit(StageUpdate::Failed {
                    generation: ticket.generation,
                    action: ticket.action,
                    error,
                });
                break;
            }
        }
    }
    emit(StageUpdate::Finished {
        generation: ticket.generation,
        action: ticket.action,
    });
}

/// Execute `ticket` on the calling thread, feeding each update to `apply`.
/// Returns the stages stored, or the failure that stopped the action.
pub(crate) fn drive(
    service: &dyn StageService,
    ticket: &RequestTicket,
    mut apply: impl FnMut(StageUpdate) -> Applied,
) -> Result<Vec<StageId>, StageError> {
    let mut stored = Vec::new();
    let mut failure = None;
    execute(service, ticket, |update| {
        if let StageUpdate::Failed { error, .. } = &update {
            failure = Some(error.clone());
        }
        if let Applied::Stored(stage) = apply(update) {
            stored.push(stage);
        }
    });
    match failure {
        Some(error) => Err(error),
        None => Ok(stored),
    }
}

#[derive(Debug, Default)]
pub struct Session {
    file: Option<SelectedFile>,
    generation: u64,
    store: ResultStore,
    errors: ErrorChannel,
    loading: BTreeMap<ActionId, usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a new dataset. A rejected candidate only surfaces the error; an accepted one
    /// replaces the file, clears the error, resets every stage and bumps the generation.
    pub fn select_file(&mut self, candidate: Option<SelectedFile>) -> Result<(), StageError> {
        if let Err(err) = validate_candidate(candidate.as_ref()) {
            self.errors.set(err.message());
            return Err(err);
        }
        self.file = candidate;
        self.generation += 1;
        self.errors.clear();
        self.store.reset_all();
        info!(
            "selected {} (gen {})",
            self.file.as_ref().map(SelectedFile::name).unwrap_or_default(),
            self.generation
        );
        Ok(())
    }

    /// Start `action`: clears the error, raises its loading flag and hands out a ticket.
    pub fn begin(&mut self, action: ActionId) -> Result<RequestTicket, StageError> {
        let Some(file) = self.file.clone() else {
            let err = StageError::Validation(MISSING_FILE_MESSAGE.to_string());
            self.errors.set(err.message());
            return Err(err);
        };
        self.errors.clear();
        *self.loading.entry(action).or_default() += 1;
        Ok(RequestTicket {
            action,
            generation: self.generation,
            file,
        })
    }

    pub fn apply(&mut self, update: StageUpdate) -> Applied {
        match update {
            StageUpdate::Completed {
                generation,
                stage,
                result,
            } => {
                if generation != self.generation {
                    warn!("dropping {stage} result from gen {generation}");
                    return Applied::Stale;
                }
                info!("{stage} completed");
                self.store.set(stage, result);
                Applied::Stored(stage)
            }
            StageUpdate::Failed {
                generation,
                action,
                error,
            } => {
                if generation != self.generation {
                    warn!("dropping {} failure from gen {generation}", action.label());
                    return Applied::Stale;
                }
                self.errors.set(error.message());
                Applied::Failed(action)
            }
            StageUpdate::Finished { action, .. } => {
                if let Some(count) = self.loading.get_mut(&action) {
                    *count -= 1;
                    if *count == 0 {
                        self.loading.remove(&action);
                    }
                }
                Applied::Finished(action)
            }
        }
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        self.errors.set(message);
    }

    pub fn run_blocking(
        &mut self,
        service: &dyn StageService,
        action: ActionId,
    ) -> Result<Vec<StageId>, StageError> {
        let ticket = self.begin(action)?;
        drive(service, &ticket, |update| self.apply(update))
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn errors(&self) -> &ErrorChannel {
        &self.errors
    }

    pub fn is_loading(&self, action: ActionId) -> bool {
        self.loading.contains_key(&action)
    }

    pub fn any_loading(&self) -> bool {
        !self.loading.is_empty()
    }
}
