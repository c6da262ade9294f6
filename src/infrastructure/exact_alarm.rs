use crate::infrastructure::error::InfraError;
use crate::infrastructure::trigger_backend::{
    OWNER_TAG, TriggerBackend, TriggerRecord, TriggerRequest,
};
use crate::infrastructure::weekday::{from_backend_days, to_backend_days};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_SNOOZE_MINUTES: u8 = 5;

/// Wire shape of one persistent alarm as the native clock module stores it.
/// `days` uses the backend weekday numbering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeAlarm {
    pub uid: String,
    pub hour: u8,
    pub minutes: u8,
    pub title: String,
    pub description: String,
    pub days: Vec<u8>,
    pub sound: String,
    pub vibration: bool,
    pub active: bool,
    pub repeating: bool,
    pub snooze_interval: u8,
    pub owner: String,
}

/// The capability-rich platform primitive: persistent per-alarm triggers with
/// update, per-id cancel, cheap enable/disable, and an exact-scheduling
/// permission gate. `remove_all` and `get_all` are owner-scoped because the
/// module may hold alarms belonging to other apps' helpers.
#[async_trait]
pub trait AlarmClockModule: Send + Sync {
    async fn set(&self, alarm: NativeAlarm) -> Result<(), InfraError>;
    async fn update(&self, alarm: NativeAlarm) -> Result<(), InfraError>;
    async fn enable(&self, uid: &str) -> Result<(), InfraError>;
    async fn disable(&self, uid: &str) -> Result<(), InfraError>;
    async fn remove(&self, uid: &str) -> Result<(), InfraError>;
    async fn remove_all(&self, owner: &str) -> Result<(), InfraError>;
    async fn get_all(&self, owner: &str) -> Result<Vec<NativeAlarm>, InfraError>;
    async fn check_exact_alarm_permission(&self) -> Result<bool, InfraError>;
    async fn request_exact_alarm_permission(&self) -> Result<bool, InfraError>;
    async fn stop(&self) -> Result<(), InfraError>;
    async fn snooze(&self) -> Result<(), InfraError>;
}

/// Trigger backend over the capability-rich module. Applies the weekday
/// numbering adapter on every boundary call, both directions.
pub struct ExactAlarmBackend<M: AlarmClockModule> {
    module: M,
    snooze_minutes: u8,
}

impl<M: AlarmClockModule> ExactAlarmBackend<M> {
    pub fn new(module: M) -> Self {
        Self {
            module,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
        }
    }

    pub fn with_snooze_minutes(mut self, snooze_minutes: u8) -> Self {
        self.snooze_minutes = snooze_minutes;
        self
    }

    fn to_native(&self, request: &TriggerRequest) -> NativeAlarm {
        NativeAlarm {
            uid: request.alarm_id.clone(),
            hour: request.hour,
            minutes: request.minute,
            title: request.title.clone(),
            description: request.body.clone(),
            days: to_backend_days(&request.days),
            sound: request.sound.clone(),
            vibration: request.vibration,
            active: request.enabled,
            repeating: true,
            snooze_interval: self.snooze_minutes,
            owner: OWNER_TAG.to_string(),
        }
    }
}

#[async_trait]
impl<M: AlarmClockModule> TriggerBackend for ExactAlarmBackend<M> {
    async fn schedule(&self, request: &TriggerRequest) -> Result<(), InfraError> {
        self.module.set(self.to_native(request)).await
    }

    async fn update(&self, request: &TriggerRequest) -> Result<(), InfraError> {
        self.module.update(self.to_native(request)).await
    }

    async fn cancel(&self, alarm_id: &str) -> Result<(), InfraError> {
        self.module.remove(alarm_id).await
    }

    async fn cancel_all(&self) -> Result<(), InfraError> {
        self.module.remove_all(OWNER_TAG).await
    }

    async fn list(&self) -> Result<Vec<TriggerRecord>, InfraError> {
        let alarms = self.module.get_all(OWNER_TAG).await?;
        let mut records = Vec::new();
        for alarm in alarms {
            if !alarm.active {
                continue;
            }
            for day in from_backend_days(&alarm.days) {
                records.push(TriggerRecord {
                    alarm_id: alarm.uid.clone(),
                    day,
                });
            }
        }
        Ok(records)
    }

    async fn set_enabled(&self, request: &TriggerRequest, enabled: bool) -> Result<(), InfraError> {
        if enabled {
            self.module.enable(&request.alarm_id).await
        } else {
            self.module.disable(&request.alarm_id).await
        }
    }

    async fn permission_granted(&self) -> Result<bool, InfraError> {
        self.module.check_exact_alarm_permission().await
    }

    async fn request_permission(&self) -> Result<bool, InfraError> {
        self.module.request_exact_alarm_permission().await
    }

    async fn stop_ringing(&self) -> Result<(), InfraError> {
        self.module.stop().await
    }

    async fn snooze_ringing(&self) -> Result<(), InfraError> {
        self.module.snooze().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeAlarmClockModule {
        alarms: Mutex<HashMap<String, NativeAlarm>>,
        permission: Mutex<bool>,
        enable_calls: AtomicUsize,
    }

    impl FakeAlarmClockModule {
        fn stored(&self, uid: &str) -> Option<NativeAlarm> {
            self.alarms
                .lock()
                .expect("alarm lock poisoned")
                .get(uid)
                .cloned()
        }

        fn seed_foreign(&self, uid: &str) {
            let mut alarms = self.alarms.lock().expect("alarm lock poisoned");
            alarms.insert(
                uid.to_string(),
                NativeAlarm {
                    uid: uid.to_string(),
                    hour: 12,
                    minutes: 0,
                    title: "other app".to_string(),
                    description: String::new(),
                    days: vec![2],
                    sound: "default".to_string(),
                    vibration: false,
                    active: true,
                    repeating: true,
                    snooze_interval: 1,
                    owner: "someone.else".to_string(),
                },
            );
        }
    }

    #[async_trait]
    impl AlarmClockModule for FakeAlarmClockModule {
        async fn set(&self, alarm: NativeAlarm) -> Result<(), InfraError> {
            let mut alarms = self.alarms.lock().expect("alarm lock poisoned");
            alarms.insert(alarm.uid.clone(), alarm);
            Ok(())
        }

        async fn update(&self, alarm: NativeAlarm) -> Result<(), InfraError> {
            self.set(alarm).await
        }

        async fn enable(&self, uid: &str) -> Result<(), InfraError> {
            self.enable_calls.fetch_add(1, Ordering::SeqCst);
            let mut alarms = self.alarms.lock().expect("alarm lock poisoned");
            let alarm = alarms
                .get_mut(uid)
                .ok_or_else(|| InfraError::Backend(format!("unknown uid {uid}")))?;
            alarm.active = true;
            Ok(())
        }

        async fn disable(&self, uid: &str) -> Result<(), InfraError> {
            let mut alarms = self.alarms.lock().expect("alarm lock poisoned");
            let alarm = alarms
                .get_mut(uid)
                .ok_or_else(|| InfraError::Backend(format!("unknown uid {uid}")))?;
            alarm.active = false;
            Ok(())
        }

        async fn remove(&self, uid: &str) -> Result<(), InfraError> {
            let mut alarms = self.alarms.lock().expect("alarm lock poisoned");
            alarms.remove(uid);
            Ok(())
        }

        async fn remove_all(&self, owner: &str) -> Result<(), InfraError> {
            let mut alarms = self.alarms.lock().expect("alarm lock poisoned");
            alarms.retain(|_, alarm| alarm.owner != owner);
            Ok(())
        }

        async fn get_all(&self, owner: &str) -> Result<Vec<NativeAlarm>, InfraError> {
            let alarms = self.alarms.lock().expect("alarm lock poisoned");
            Ok(alarms
                .values()
                .filter(|alarm| alarm.owner == owner)
                .cloned()
                .collect())
        }

        async fn check_exact_alarm_permission(&self) -> Result<bool, InfraError> {
            Ok(*self.permission.lock().expect("permission lock poisoned"))
        }

        async fn request_exact_alarm_permission(&self) -> Result<bool, InfraError> {
            *self.permission.lock().expect("permission lock poisoned") = true;
            Ok(true)
        }

        async fn stop(&self) -> Result<(), InfraError> {
            Ok(())
        }

        async fn snooze(&self) -> Result<(), InfraError> {
            Ok(())
        }
    }

    fn sample_request() -> TriggerRequest {
        TriggerRequest {
            alarm_id: "alarm-1".to_string(),
            hour: 7,
            minute: 30,
            title: "Wake Up".to_string(),
            body: "Wake Up".to_string(),
            days: vec![0, 3, 6],
            sound: "default".to_string(),
            vibration: true,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn schedule_converts_days_to_backend_numbering() {
        let backend = ExactAlarmBackend::new(FakeAlarmClockModule::default());
        backend.schedule(&sample_request()).await.expect("schedule");

        let stored = backend.module.stored("alarm-1").expect("stored alarm");
        // Sunday 0 -> 1, Wednesday 3 -> 4, Saturday 6 -> 0
        assert_eq!(stored.days, vec![1, 4, 0]);
        assert!(stored.repeating);
        assert_eq!(stored.owner, OWNER_TAG);
    }

    #[tokio::test]
    async fn list_converts_days_back_and_skips_inactive() {
        let backend = ExactAlarmBackend::new(FakeAlarmClockModule::default());
        backend.schedule(&sample_request()).await.expect("schedule");

        let mut disabled = sample_request();
        disabled.alarm_id = "alarm-2".to_string();
        disabled.enabled = false;
        backend.schedule(&disabled).await.expect("schedule");

        let mut records = backend.list().await.expect("list");
        records.sort();
        let days: Vec<u8> = records.iter().map(|record| record.day).collect();
        assert!(records.iter().all(|record| record.alarm_id == "alarm-1"));
        assert_eq!(days, vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn cancel_all_leaves_foreign_alarms_alone() {
        let backend = ExactAlarmBackend::new(FakeAlarmClockModule::default());
        backend.module.seed_foreign("foreign-1");
        backend.schedule(&sample_request()).await.expect("schedule");

        backend.cancel_all().await.expect("cancel all");

        assert!(backend.module.stored("alarm-1").is_none());
        assert!(backend.module.stored("foreign-1").is_some());
        // Owner-scoped list never reports the foreign record either.
        assert!(backend.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn set_enabled_uses_cheap_toggle_without_reschedule() {
        let backend = ExactAlarmBackend::new(FakeAlarmClockModule::default());
        let request = sample_request();
        backend.schedule(&request).await.expect("schedule");

        backend.set_enabled(&request, false).await.expect("disable");
        let stored = backend.module.stored("alarm-1").expect("stored alarm");
        assert!(!stored.active);
        assert_eq!(stored.days, vec![1, 4, 0]);

        backend.set_enabled(&request, true).await.expect("enable");
        assert_eq!(backend.module.enable_calls.load(Ordering::SeqCst), 1);
        assert!(backend.module.stored("alarm-1").expect("stored").active);
    }

    #[tokio::test]
    async fn permission_round_trip() {
        let backend = ExactAlarmBackend::new(FakeAlarmClockModule::default());
        assert!(!backend.permission_granted().await.expect("check"));
        assert!(backend.request_permission().await.expect("request"));
        assert!(backend.permission_granted().await.expect("check"));
    }
}
