use crate::domain::models::{
    Alarm, AlarmDraft, AlarmMode, AlarmPatch, ViewState, split_for_day, today_weekday,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_repository::PersistedState;
use crate::infrastructure::trigger_backend::TriggerRequest;
use chrono::{DateTime, Local};

/// The shared mutable state: the committed alarm list plus view state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppModel {
    pub alarms: Vec<Alarm>,
    pub view: ViewState,
}

impl AppModel {
    pub fn from_persisted(state: PersistedState) -> Self {
        Self {
            alarms: state.alarms,
            view: state.view,
        }
    }

    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            alarms: self.alarms.clone(),
            view: self.view.clone(),
            ..PersistedState::default()
        }
    }

    fn find(&self, id: &str) -> Result<&Alarm, InfraError> {
        self.alarms
            .iter()
            .find(|alarm| alarm.id == id)
            .ok_or_else(|| InfraError::NotFound(id.to_string()))
    }

    fn replace(&mut self, alarm: Alarm) {
        if let Some(slot) = self.alarms.iter_mut().find(|slot| slot.id == alarm.id) {
            *slot = alarm;
        }
    }
}

/// A mutating intent from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AddAlarm(AlarmDraft),
    UpdateAlarm { id: String, patch: AlarmPatch },
    ToggleAlarm { id: String },
    DeleteAlarm { id: String },
    DeleteAlarms { ids: Vec<String> },
    SetViewMode(AlarmMode),
    SetSelectedDay(u8),
    ToggleEditMode,
    ToggleSelect { id: String },
    ClearSelection,
}

/// One primitive backend operation, issued sequentially in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Schedule(TriggerRequest),
    Update(TriggerRequest),
    SetEnabled(TriggerRequest, bool),
    Cancel(String),
    CancelAll,
}

/// Outcome of planning one intent: the backend calls to run and the state to
/// commit once they succeed. The model is never mutated before the calls
/// resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub calls: Vec<BackendCall>,
    pub next: AppModel,
    /// Alarms this intent brings into existence (created alarm, split-off).
    pub created: Vec<Alarm>,
    /// Best-effort plans attempt every call independently and swallow
    /// failures; the state commit happens regardless. Used by deletes.
    pub best_effort: bool,
}

impl Plan {
    fn state_only(next: AppModel) -> Self {
        Self {
            calls: Vec::new(),
            next,
            created: Vec::new(),
            best_effort: false,
        }
    }

    /// Whether the plan re-creates triggers and therefore needs the exact
    /// scheduling permission before anything runs.
    pub fn needs_permission(&self) -> bool {
        self.calls.iter().any(|call| {
            matches!(
                call,
                BackendCall::Schedule(_) | BackendCall::Update(_) | BackendCall::SetEnabled(_, true)
            )
        })
    }
}

/// Translates an intent into backend calls and the successor state. Pure:
/// fresh ids come from `next_id`, the clock from `now`.
///
/// Backend calls are only emitted for alarms whose mode matches the current
/// view mode; alarms of the other mode hold no outstanding triggers (the
/// `set_view_mode` rebuild re-establishes them when their mode becomes live).
pub fn plan(
    model: &AppModel,
    intent: Intent,
    now: DateTime<Local>,
    next_id: &mut dyn FnMut() -> String,
) -> Result<Plan, InfraError> {
    match intent {
        Intent::AddAlarm(draft) => {
            let alarm = draft.into_alarm(fresh_id(model, next_id), model.view.view_mode, now);
            let request = TriggerRequest::from_alarm(&alarm)?;
            let mut next = model.clone();
            next.alarms.push(alarm.clone());
            Ok(Plan {
                calls: vec![BackendCall::Schedule(request)],
                next,
                created: vec![alarm],
                best_effort: false,
            })
        }
        Intent::UpdateAlarm { id, patch } => plan_update(model, &id, patch, next_id),
        Intent::ToggleAlarm { id } => plan_toggle(model, &id, next_id),
        Intent::DeleteAlarm { id } => {
            model.find(&id)?;
            let mut next = model.clone();
            next.alarms.retain(|alarm| alarm.id != id);
            next.view.selected_ids.retain(|selected| *selected != id);
            Ok(Plan {
                calls: vec![BackendCall::Cancel(id)],
                next,
                created: Vec::new(),
                best_effort: true,
            })
        }
        Intent::DeleteAlarms { ids } => {
            let calls = ids
                .iter()
                .filter(|id| model.alarms.iter().any(|alarm| alarm.id == **id))
                .map(|id| BackendCall::Cancel(id.clone()))
                .collect();
            let mut next = model.clone();
            next.alarms.retain(|alarm| !ids.contains(&alarm.id));
            next.view.selected_ids.clear();
            next.view.edit_mode = false;
            Ok(Plan {
                calls,
                next,
                created: Vec::new(),
                best_effort: true,
            })
        }
        Intent::SetViewMode(mode) => {
            // Deliberately wipe-and-rebuild: the two modes are disjoint
            // trigger sets, so an incremental diff buys nothing.
            let mut calls = vec![BackendCall::CancelAll];
            for alarm in model
                .alarms
                .iter()
                .filter(|alarm| alarm.mode == mode && alarm.enabled)
            {
                calls.push(BackendCall::Schedule(TriggerRequest::from_alarm(alarm)?));
            }
            let mut next = model.clone();
            next.view.view_mode = mode;
            if mode == AlarmMode::Weekly {
                next.view.selected_day = today_weekday(now);
            }
            Ok(Plan {
                calls,
                next,
                created: Vec::new(),
                best_effort: false,
            })
        }
        Intent::SetSelectedDay(day) => {
            if day > 6 {
                return Err(InfraError::InvalidAlarm(format!(
                    "selected day must be 0..=6, got {day}"
                )));
            }
            let mut next = model.clone();
            next.view.selected_day = day;
            Ok(Plan::state_only(next))
        }
        Intent::ToggleEditMode => {
            let mut next = model.clone();
            next.view.edit_mode = !next.view.edit_mode;
            if !next.view.edit_mode {
                next.view.selected_ids.clear();
            }
            Ok(Plan::state_only(next))
        }
        Intent::ToggleSelect { id } => {
            model.find(&id)?;
            let mut next = model.clone();
            if next.view.selected_ids.contains(&id) {
                next.view.selected_ids.retain(|selected| *selected != id);
            } else {
                next.view.selected_ids.push(id);
            }
            Ok(Plan::state_only(next))
        }
        Intent::ClearSelection => {
            let mut next = model.clone();
            next.view.selected_ids.clear();
            next.view.edit_mode = false;
            Ok(Plan::state_only(next))
        }
    }
}

/// Draws ids until one is free. The generator is assumed to eventually
/// produce an id no committed alarm holds; two alarms must never share one.
fn fresh_id(model: &AppModel, next_id: &mut dyn FnMut() -> String) -> String {
    loop {
        let id = next_id();
        if model.alarms.iter().all(|alarm| alarm.id != id) {
            return id;
        }
    }
}

/// A single-day interaction with a multi-day weekly alarm must not leak into
/// the days the user is not viewing, so the alarm is split first.
fn weekly_split_applies(model: &AppModel, alarm: &Alarm) -> bool {
    model.view.view_mode == AlarmMode::Weekly
        && alarm.mode == AlarmMode::Weekly
        && alarm.days.len() > 1
        && alarm.days.contains(&model.view.selected_day)
}

fn plan_update(
    model: &AppModel,
    id: &str,
    patch: AlarmPatch,
    next_id: &mut dyn FnMut() -> String,
) -> Result<Plan, InfraError> {
    let alarm = model.find(id)?;

    // An explicit day-set edit addresses the whole alarm, not the viewed day.
    if patch.days.is_none()
        && weekly_split_applies(model, alarm)
        && let Some((remainder, split_off)) =
            split_for_day(alarm, model.view.selected_day, fresh_id(model, next_id))
    {
        let edited = patch.apply(&split_off);
        let calls = vec![
            BackendCall::Update(TriggerRequest::from_alarm(&remainder)?),
            BackendCall::Schedule(TriggerRequest::from_alarm(&edited)?),
        ];
        let mut next = model.clone();
        next.replace(remainder);
        next.alarms.push(edited.clone());
        return Ok(Plan {
            calls,
            next,
            created: vec![edited],
            best_effort: false,
        });
    }

    let merged = patch.apply(alarm);
    merged.validate().map_err(InfraError::InvalidAlarm)?;
    let calls = if merged.mode == model.view.view_mode {
        // The update call fully replaces the id's trigger set; days that were
        // dropped must not leave stale records behind.
        vec![BackendCall::Update(TriggerRequest::from_alarm(&merged)?)]
    } else {
        Vec::new()
    };
    let mut next = model.clone();
    next.replace(merged);
    Ok(Plan {
        calls,
        next,
        created: Vec::new(),
        best_effort: false,
    })
}

fn plan_toggle(
    model: &AppModel,
    id: &str,
    next_id: &mut dyn FnMut() -> String,
) -> Result<Plan, InfraError> {
    let alarm = model.find(id)?;

    if weekly_split_applies(model, alarm)
        && let Some((remainder, mut split_off)) =
            split_for_day(alarm, model.view.selected_day, fresh_id(model, next_id))
    {
        split_off.enabled = !alarm.enabled;
        let calls = vec![
            BackendCall::Update(TriggerRequest::from_alarm(&remainder)?),
            BackendCall::Schedule(TriggerRequest::from_alarm(&split_off)?),
        ];
        let mut next = model.clone();
        next.replace(remainder);
        next.alarms.push(split_off.clone());
        return Ok(Plan {
            calls,
            next,
            created: vec![split_off],
            best_effort: false,
        });
    }

    let mut toggled = alarm.clone();
    toggled.enabled = !toggled.enabled;
    let calls = if toggled.mode != model.view.view_mode {
        Vec::new()
    } else if toggled.enabled {
        // Re-create the full trigger set; a cheap per-id enable could target
        // an id the last mode-switch wipe removed from the backend.
        vec![BackendCall::Schedule(TriggerRequest::from_alarm(&toggled)?)]
    } else {
        vec![BackendCall::SetEnabled(
            TriggerRequest::from_alarm(&toggled)?,
            false,
        )]
    };
    let mut next = model.clone();
    next.replace(toggled);
    Ok(Plan {
        calls,
        next,
        created: Vec::new(),
        best_effort: false,
    })
}
