pub mod chart;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod download;
pub mod error;
pub mod file;
pub mod plot;
pub mod runner;
pub mod session;
pub mod stage;
pub mod store;
pub mod transform;

pub use chart::{ChartBackend, ChartHandle, ChartLifecycleManager, MemoryBackend};
pub use client::{HttpStageClient, StageService};
pub use config::{ConfigError, DashboardConfig};
pub use dashboard::Dashboard;
pub use error::{PayloadError, StageError};
pub use file::SelectedFile;
pub use runner::StageRunner;
pub use session::{Applied, ErrorChannel, RequestTicket, Session, StageUpdate};
pub use stage::{ActionId, ChartSlot, StageId};
pub use store::ResultStore;
pub use transform::{Limits, Table};
