//! Scheduling core of the Chime alarm app.
//!
//! Keeps a user-facing list of recurring alarms consistent with the
//! platform's one-shot trigger primitives. Intents are planned as pure state
//! transitions plus backend calls, executed against one of two trigger
//! backends, and committed only when the backend work succeeds.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::alarm_service::{AlarmService, ConsistencyReport, ToggleOutcome};
pub use application::app::AlarmApp;
pub use application::bootstrap::{BootstrapResult, bootstrap_workspace};
pub use application::plan::{AppModel, BackendCall, Intent, Plan, plan};
pub use domain::models::{Alarm, AlarmDraft, AlarmMode, AlarmPatch, ViewState};
pub use infrastructure::error::InfraError;
pub use infrastructure::exact_alarm::{AlarmClockModule, ExactAlarmBackend, NativeAlarm};
pub use infrastructure::notification_center::{
    NotificationCenter, NotificationTriggerBackend, ScheduledNotification, WeeklyNotification,
};
pub use infrastructure::state_repository::{
    InMemoryStateRepository, PersistedState, SqliteStateRepository, StateRepository,
    initialize_database,
};
pub use infrastructure::trigger_backend::{
    OWNER_TAG, TriggerBackend, TriggerRecord, TriggerRequest,
};
