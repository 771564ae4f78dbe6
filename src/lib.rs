//! Control surface for the echo-upgrade optimizer: discard schedule and
//! resource weight editors, the analysis service client, the automation loop
//! and the history ledger.

#[path = "core/model.rs"]
pub mod model;

#[path = "core/discard.rs"]
pub mod discard;

#[path = "core/history.rs"]
pub mod history;

#[path = "core/schedule_editor.rs"]
pub mod schedule_editor;

#[path = "core/weight_editor.rs"]
pub mod weight_editor;

#[path = "core/session.rs"]
pub mod session;

#[path = "core/automation.rs"]
pub mod automation;

#[path = "core/panel.rs"]
pub mod panel;

pub mod config;
pub mod debounce;
pub mod service;
pub mod surface;

#[cfg(feature = "http")]
pub mod http;

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::automation::{AutomationController, RunOutcome, RunState};
    pub use crate::config::{AppPaths, ClientConfig, ConfigError};
    pub use crate::history::{HistoryEntry, HistoryLedger, HistorySortKey};
    pub use crate::model::{
        Analysis, BriefAnalysis, Candidate, CandidateStatus, Profile, ScheduleVector, WeightSlot,
        WeightVector, BRACKETS,
    };
    pub use crate::panel::ControlPanel;
    pub use crate::service::{AnalysisService, FilterSelection, ServiceError};
    pub use crate::session::{Action, ActionStatus, SessionState};
    pub use crate::surface::{DisplayList, DrawSurface};

    #[cfg(feature = "http")]
    pub use crate::http::HttpAnalysisService;
}
