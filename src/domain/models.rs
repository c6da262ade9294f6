use chrono::{DateTime, Datelike, Duration, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Partitions the alarm set for scheduling: only alarms whose mode matches the
/// current view mode hold outstanding triggers. Doubles as the view mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlarmMode {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alarm {
    pub id: String,
    /// Wall-clock "HH:MM", local device time.
    pub time: String,
    pub title: String,
    pub enabled: bool,
    /// Weekdays, 0 = Sunday .. 6 = Saturday. Sorted, unique, never empty.
    pub days: Vec<u8>,
    pub vibration: bool,
    pub sound: String,
    pub mode: AlarmMode,
}

impl Alarm {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "alarm.id")?;
        validate_hhmm(&self.time, "alarm.time")?;
        if self.days.is_empty() {
            return Err("alarm.days must not be empty".to_string());
        }
        let normalized = normalize_days(&self.days);
        if normalized != self.days {
            return Err("alarm.days must be sorted and unique".to_string());
        }
        for day in &self.days {
            if *day > 6 {
                return Err(format!("alarm.days[] must be 0..=6, got {day}"));
            }
        }
        Ok(())
    }

    /// Parsed hour and minute. Only valid after `validate`.
    pub fn hour_minute(&self) -> Result<(u8, u8), String> {
        parse_hhmm(&self.time).ok_or_else(|| format!("alarm.time '{}' is not HH:MM", self.time))
    }
}

/// Input for alarm creation. Every field is optional; defaults absorb
/// omissions, so construction never fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlarmDraft {
    pub time: Option<String>,
    pub title: Option<String>,
    pub enabled: Option<bool>,
    pub days: Option<Vec<u8>>,
    pub vibration: Option<bool>,
    pub sound: Option<String>,
}

impl AlarmDraft {
    /// Materializes the draft. Mode comes from the current view context and
    /// the default day set is the current weekday.
    pub fn into_alarm(self, id: String, mode: AlarmMode, now: DateTime<Local>) -> Alarm {
        let next_minute = now + Duration::minutes(1);
        let default_time = format!("{:02}:{:02}", next_minute.hour(), next_minute.minute());
        let days = self
            .days
            .filter(|days| !days.is_empty())
            .map(|days| normalize_days(&days))
            .unwrap_or_else(|| vec![today_weekday(now)]);
        Alarm {
            id,
            time: self.time.unwrap_or(default_time),
            title: self.title.unwrap_or_else(|| "Alarm".to_string()),
            enabled: self.enabled.unwrap_or(true),
            days,
            vibration: self.vibration.unwrap_or(true),
            sound: self.sound.unwrap_or_else(|| "default".to_string()),
            mode,
        }
    }
}

/// Partial update applied over an existing alarm.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlarmPatch {
    pub time: Option<String>,
    pub title: Option<String>,
    pub enabled: Option<bool>,
    pub days: Option<Vec<u8>>,
    pub vibration: Option<bool>,
    pub sound: Option<String>,
}

impl AlarmPatch {
    pub fn apply(&self, alarm: &Alarm) -> Alarm {
        Alarm {
            id: alarm.id.clone(),
            time: self.time.clone().unwrap_or_else(|| alarm.time.clone()),
            title: self.title.clone().unwrap_or_else(|| alarm.title.clone()),
            enabled: self.enabled.unwrap_or(alarm.enabled),
            days: self
                .days
                .as_deref()
                .map(normalize_days)
                .unwrap_or_else(|| alarm.days.clone()),
            vibration: self.vibration.unwrap_or(alarm.vibration),
            sound: self.sound.clone().unwrap_or_else(|| alarm.sound.clone()),
            mode: alarm.mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// UI-facing view state. `selected_day` only drives weekly-mode operations;
/// `edit_mode` and `selected_ids` back the multi-select delete flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewState {
    pub view_mode: AlarmMode,
    pub selected_day: u8,
    pub edit_mode: bool,
    pub selected_ids: Vec<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            view_mode: AlarmMode::Daily,
            // Monday
            selected_day: 1,
            edit_mode: false,
            selected_ids: Vec::new(),
        }
    }
}

/// Presentation filter: which alarms the current view shows. Scheduling never
/// uses this; it works off all alarms of the view's mode.
pub fn filter_active<'a>(
    alarms: &'a [Alarm],
    mode: AlarmMode,
    today: u8,
    selected_day: u8,
) -> Vec<&'a Alarm> {
    let day = match mode {
        AlarmMode::Daily => today,
        AlarmMode::Weekly => selected_day,
    };
    alarms
        .iter()
        .filter(|alarm| alarm.mode == mode && alarm.days.contains(&day))
        .collect()
}

/// The trigger-set invariant: one outstanding record per (id, day) for every
/// enabled alarm of the current view mode.
pub fn expected_triggers(alarms: &[Alarm], view_mode: AlarmMode) -> BTreeSet<(String, u8)> {
    alarms
        .iter()
        .filter(|alarm| alarm.enabled && alarm.mode == view_mode)
        .flat_map(|alarm| alarm.days.iter().map(|day| (alarm.id.clone(), *day)))
        .collect()
}

/// Splits a multi-day alarm so a single-day interaction leaves the other days
/// untouched: the original keeps every day except `day`, and a new alarm with
/// id `split_id` holds `day` alone. Returns `None` when no split applies,
/// i.e. the alarm has one day or does not cover `day`.
pub fn split_for_day(alarm: &Alarm, day: u8, split_id: String) -> Option<(Alarm, Alarm)> {
    if alarm.days.len() < 2 || !alarm.days.contains(&day) {
        return None;
    }
    let mut remainder = alarm.clone();
    remainder.days.retain(|candidate| *candidate != day);
    let mut split_off = alarm.clone();
    split_off.id = split_id;
    split_off.days = vec![day];
    Some((remainder, split_off))
}

pub fn today_weekday(now: DateTime<Local>) -> u8 {
    now.weekday().num_days_from_sunday() as u8
}

/// Starter alarms written on first run when seeding is enabled.
pub fn seed_alarms() -> Vec<Alarm> {
    vec![
        Alarm {
            id: "seed-1".to_string(),
            time: "07:00".to_string(),
            title: "Wake Up".to_string(),
            enabled: true,
            days: vec![1, 2, 3, 4, 5],
            vibration: true,
            sound: "default".to_string(),
            mode: AlarmMode::Daily,
        },
        Alarm {
            id: "seed-2".to_string(),
            time: "08:30".to_string(),
            title: "Commute".to_string(),
            enabled: true,
            days: vec![1, 2, 3, 4, 5],
            vibration: true,
            sound: "default".to_string(),
            mode: AlarmMode::Daily,
        },
        Alarm {
            id: "seed-3".to_string(),
            time: "10:00".to_string(),
            title: "Meeting".to_string(),
            enabled: false,
            days: vec![3],
            vibration: false,
            sound: "default".to_string(),
            mode: AlarmMode::Weekly,
        },
        Alarm {
            id: "seed-4".to_string(),
            time: "09:00".to_string(),
            title: "Workout".to_string(),
            enabled: true,
            days: vec![0, 6],
            vibration: true,
            sound: "default".to_string(),
            mode: AlarmMode::Weekly,
        },
    ]
}

pub fn normalize_days(days: &[u8]) -> Vec<u8> {
    let unique: BTreeSet<u8> = days.iter().copied().collect();
    unique.into_iter().collect()
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    parse_hhmm(value)
        .map(|_| ())
        .ok_or_else(|| format!("{field_name} must be HH:MM"))
}

fn parse_hhmm(value: &str) -> Option<(u8, u8)> {
    let mut split = value.split(':');
    let hour = split.next()?.parse::<u8>().ok()?;
    let minute = split.next()?.parse::<u8>().ok()?;
    if split.next().is_some() || hour > 23 || minute > 59 {
        return None;
    }
    Some((hour, minute))
}
