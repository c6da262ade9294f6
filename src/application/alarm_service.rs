use crate::application::plan::{AppModel, BackendCall, Intent, Plan, plan};
use crate::domain::models::{
    Alarm, AlarmDraft, AlarmMode, AlarmPatch, ViewState, expected_triggers, filter_active,
    today_weekday,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_repository::StateRepository;
use crate::infrastructure::trigger_backend::TriggerBackend;
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type NowProvider = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("alarm-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Drift between the backend's outstanding records and the expected trigger
/// set. Reported, never auto-repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub missing: BTreeSet<(String, u8)>,
    pub unexpected: BTreeSet<(String, u8)>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Outcome of a toggle: the alarm as committed, plus the split-off alarm when
/// the weekly single-day rule applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub alarm: Alarm,
    pub split_off: Option<Alarm>,
}

/// The reconciliation engine. Each intent is planned against a snapshot of
/// the model, the backend calls run sequentially, and only when they all
/// succeed is the successor state committed and persisted.
///
/// Callers must not overlap mutating intents; `set_view_mode` in particular
/// must be awaited before the next intent, since it rebuilds the whole
/// trigger set.
pub struct AlarmService<B, S>
where
    B: TriggerBackend + ?Sized,
    S: StateRepository + ?Sized,
{
    backend: Arc<B>,
    repository: Arc<S>,
    model: Mutex<AppModel>,
    now_provider: NowProvider,
}

impl<B, S> AlarmService<B, S>
where
    B: TriggerBackend + ?Sized,
    S: StateRepository + ?Sized,
{
    /// Loads the committed state, or seeds and persists `seed` on first run.
    pub fn load(backend: Arc<B>, repository: Arc<S>, seed: Vec<Alarm>) -> Result<Self, InfraError> {
        let model = match repository.load()? {
            Some(state) => AppModel::from_persisted(state),
            None => {
                let model = AppModel {
                    alarms: seed,
                    view: ViewState::default(),
                };
                repository.save(&model.to_persisted())?;
                model
            }
        };
        Ok(Self {
            backend,
            repository,
            model: Mutex::new(model),
            now_provider: Arc::new(Local::now),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn add_alarm(&self, draft: AlarmDraft) -> Result<Alarm, InfraError> {
        let plan = self.dispatch(Intent::AddAlarm(draft)).await?;
        plan.created
            .into_iter()
            .next()
            .ok_or_else(|| InfraError::Backend("add produced no alarm".to_string()))
    }

    pub async fn update_alarm(&self, id: &str, patch: AlarmPatch) -> Result<Alarm, InfraError> {
        let plan = self
            .dispatch(Intent::UpdateAlarm {
                id: id.to_string(),
                patch,
            })
            .await?;
        // The edited alarm is the split-off when the weekly rule applied,
        // otherwise the merged alarm under the original id.
        if let Some(created) = plan.created.into_iter().next() {
            return Ok(created);
        }
        plan.next
            .alarms
            .iter()
            .find(|alarm| alarm.id == id)
            .cloned()
            .ok_or_else(|| InfraError::NotFound(id.to_string()))
    }

    pub async fn toggle_alarm(&self, id: &str) -> Result<ToggleOutcome, InfraError> {
        let plan = self
            .dispatch(Intent::ToggleAlarm { id: id.to_string() })
            .await?;
        let alarm = plan
            .next
            .alarms
            .iter()
            .find(|alarm| alarm.id == id)
            .cloned()
            .ok_or_else(|| InfraError::NotFound(id.to_string()))?;
        Ok(ToggleOutcome {
            alarm,
            split_off: plan.created.into_iter().next(),
        })
    }

    /// Removes the alarm no matter what the backend cleanup does; failed
    /// cancellations are logged, never surfaced.
    pub async fn delete_alarm(&self, id: &str) -> Result<(), InfraError> {
        self.dispatch(Intent::DeleteAlarm { id: id.to_string() })
            .await?;
        Ok(())
    }

    pub async fn delete_alarms(&self, ids: Vec<String>) -> Result<(), InfraError> {
        self.dispatch(Intent::DeleteAlarms { ids }).await?;
        Ok(())
    }

    /// The global reconciliation point: cancels every outstanding trigger,
    /// then rebuilds the set for the new mode's enabled alarms.
    pub async fn set_view_mode(&self, mode: AlarmMode) -> Result<(), InfraError> {
        self.dispatch(Intent::SetViewMode(mode)).await?;
        Ok(())
    }

    pub async fn set_selected_day(&self, day: u8) -> Result<(), InfraError> {
        self.dispatch(Intent::SetSelectedDay(day)).await?;
        Ok(())
    }

    pub async fn toggle_edit_mode(&self) -> Result<(), InfraError> {
        self.dispatch(Intent::ToggleEditMode).await?;
        Ok(())
    }

    pub async fn toggle_select(&self, id: &str) -> Result<(), InfraError> {
        self.dispatch(Intent::ToggleSelect { id: id.to_string() })
            .await?;
        Ok(())
    }

    pub async fn clear_selection(&self) -> Result<(), InfraError> {
        self.dispatch(Intent::ClearSelection).await?;
        Ok(())
    }

    pub fn alarms(&self) -> Result<Vec<Alarm>, InfraError> {
        Ok(self.lock_model()?.alarms.clone())
    }

    pub fn view_state(&self) -> Result<ViewState, InfraError> {
        Ok(self.lock_model()?.view.clone())
    }

    /// The alarms the current view shows; scheduling never uses this filter.
    pub fn active_alarms(&self) -> Result<Vec<Alarm>, InfraError> {
        let model = self.lock_model()?;
        let today = today_weekday((self.now_provider)());
        Ok(filter_active(
            &model.alarms,
            model.view.view_mode,
            today,
            model.view.selected_day,
        )
        .into_iter()
        .cloned()
        .collect())
    }

    pub async fn request_permission(&self) -> Result<bool, InfraError> {
        self.backend.request_permission().await
    }

    pub async fn stop_ringing(&self) -> Result<(), InfraError> {
        self.backend.stop_ringing().await
    }

    pub async fn snooze_ringing(&self) -> Result<(), InfraError> {
        self.backend.snooze_ringing().await
    }

    /// Compares the backend's outstanding records against the expected set.
    /// Drift is logged as a warning; repairing it is the caller's decision
    /// (typically a `set_view_mode` rebuild).
    pub async fn verify_triggers(&self) -> Result<ConsistencyReport, InfraError> {
        let expected = {
            let model = self.lock_model()?;
            expected_triggers(&model.alarms, model.view.view_mode)
        };
        let outstanding: BTreeSet<(String, u8)> = self
            .backend
            .list()
            .await?
            .into_iter()
            .map(|record| (record.alarm_id, record.day))
            .collect();

        let report = ConsistencyReport {
            missing: expected.difference(&outstanding).cloned().collect(),
            unexpected: outstanding.difference(&expected).cloned().collect(),
        };
        if !report.is_consistent() {
            warn!(
                "trigger set drift: {} missing, {} unexpected",
                report.missing.len(),
                report.unexpected.len()
            );
        }
        Ok(report)
    }

    async fn dispatch(&self, intent: Intent) -> Result<Plan, InfraError> {
        let snapshot = self.lock_model()?.clone();
        let now = (self.now_provider)();
        let plan = plan(&snapshot, intent, now, &mut next_id)?;

        // Permission gate: abort before any mutation when triggers would be
        // re-created without the scheduling permission.
        if plan.needs_permission() && !self.backend.permission_granted().await? {
            return Err(InfraError::PermissionDenied);
        }

        for call in &plan.calls {
            let result = self.execute(call).await;
            match result {
                Ok(()) => {}
                Err(error) if plan.best_effort => {
                    warn!("best-effort backend call failed, continuing: {error}");
                }
                Err(error) => return Err(error),
            }
        }

        {
            let mut model = self.lock_model()?;
            *model = plan.next.clone();
        }
        self.repository.save(&plan.next.to_persisted())?;
        info!("committed intent, {} backend calls", plan.calls.len());
        Ok(plan)
    }

    async fn execute(&self, call: &BackendCall) -> Result<(), InfraError> {
        match call {
            BackendCall::Schedule(request) => self.backend.schedule(request).await,
            BackendCall::Update(request) => self.backend.update(request).await,
            BackendCall::SetEnabled(request, enabled) => {
                self.backend.set_enabled(request, *enabled).await
            }
            BackendCall::Cancel(alarm_id) => self.backend.cancel(alarm_id).await,
            BackendCall::CancelAll => self.backend.cancel_all().await,
        }
    }

    fn lock_model(&self) -> Result<std::sync::MutexGuard<'_, AppModel>, InfraError> {
        self.model
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("model lock poisoned: {error}")))
    }
}
