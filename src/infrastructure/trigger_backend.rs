use crate::domain::models::Alarm;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;

/// Tag carried in trigger metadata so owner-scoped backends never touch
/// records scheduled by other callers sharing the platform mechanism.
pub const OWNER_TAG: &str = "chime.alarms";

/// One trigger set for an alarm id: the wake time plus every weekday it
/// covers, in domain numbering. Built from a validated alarm so the backends
/// never re-parse the wall-clock string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerRequest {
    pub alarm_id: String,
    pub hour: u8,
    pub minute: u8,
    pub title: String,
    pub body: String,
    pub days: Vec<u8>,
    pub sound: String,
    pub vibration: bool,
    pub enabled: bool,
}

impl TriggerRequest {
    pub fn from_alarm(alarm: &Alarm) -> Result<Self, InfraError> {
        alarm.validate().map_err(InfraError::InvalidAlarm)?;
        let (hour, minute) = alarm.hour_minute().map_err(InfraError::InvalidAlarm)?;
        Ok(Self {
            alarm_id: alarm.id.clone(),
            hour,
            minute,
            title: alarm.title.clone(),
            body: alarm.title.clone(),
            days: alarm.days.clone(),
            sound: alarm.sound.clone(),
            vibration: alarm.vibration,
            enabled: alarm.enabled,
        })
    }
}

/// One outstanding wake event, reported back in domain numbering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TriggerRecord {
    pub alarm_id: String,
    pub day: u8,
}

/// Capability contract over the platform's wake-trigger mechanism. One
/// implementation per target platform, selected once at startup.
///
/// `schedule` and `update` fully replace the trigger set for the request's
/// alarm id; stale records for dropped days must not survive either call.
#[async_trait]
pub trait TriggerBackend: Send + Sync {
    async fn schedule(&self, request: &TriggerRequest) -> Result<(), InfraError>;

    async fn update(&self, request: &TriggerRequest) -> Result<(), InfraError>;

    /// Cancels every outstanding record for the alarm id.
    async fn cancel(&self, alarm_id: &str) -> Result<(), InfraError>;

    /// Cancels every outstanding record this crate owns. On platforms without
    /// owner scoping this wipes the whole mechanism.
    async fn cancel_all(&self) -> Result<(), InfraError>;

    async fn list(&self) -> Result<Vec<TriggerRecord>, InfraError>;

    /// Flips an alarm's triggers without changing its day set. Platforms
    /// without a cheap per-id toggle fall back to cancel-then-reschedule.
    async fn set_enabled(&self, request: &TriggerRequest, enabled: bool) -> Result<(), InfraError>;

    async fn permission_granted(&self) -> Result<bool, InfraError>;

    async fn request_permission(&self) -> Result<bool, InfraError>;

    /// Silences the currently ringing alarm, where the platform exposes it.
    async fn stop_ringing(&self) -> Result<(), InfraError>;

    /// Snoozes the currently ringing alarm, where the platform exposes it.
    async fn snooze_ringing(&self) -> Result<(), InfraError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AlarmMode, Alarm};

    fn sample_alarm() -> Alarm {
        Alarm {
            id: "alarm-1".to_string(),
            time: "06:45".to_string(),
            title: "Wake Up".to_string(),
            enabled: true,
            days: vec![1, 3, 5],
            vibration: false,
            sound: "chime".to_string(),
            mode: AlarmMode::Daily,
        }
    }

    #[test]
    fn request_captures_parsed_time_and_days() {
        let request = TriggerRequest::from_alarm(&sample_alarm()).expect("valid alarm");
        assert_eq!(request.alarm_id, "alarm-1");
        assert_eq!((request.hour, request.minute), (6, 45));
        assert_eq!(request.days, vec![1, 3, 5]);
        assert!(!request.vibration);
        assert!(request.enabled);
    }

    #[test]
    fn request_rejects_invalid_alarm() {
        let mut alarm = sample_alarm();
        alarm.days.clear();
        assert!(matches!(
            TriggerRequest::from_alarm(&alarm),
            Err(InfraError::InvalidAlarm(_))
        ));
    }
}
