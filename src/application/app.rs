use crate::application::alarm_service::{AlarmService, ConsistencyReport, ToggleOutcome};
use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::domain::models::{Alarm, AlarmDraft, AlarmMode, AlarmPatch, ViewState, seed_alarms};
use crate::infrastructure::config::{read_seed_starter_alarms, read_snooze_minutes};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::exact_alarm::{AlarmClockModule, ExactAlarmBackend};
use crate::infrastructure::notification_center::{NotificationCenter, NotificationTriggerBackend};
use crate::infrastructure::state_repository::SqliteStateRepository;
use crate::infrastructure::trigger_backend::TriggerBackend;
use chrono::Utc;
use std::fs::OpenOptions;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Top-level facade wiring the workspace, the persisted state, and the
/// platform's trigger backend into one alarm service. The backend variant is
/// chosen once at construction, by which platform handle the host passes in,
/// and never re-selected per call.
pub struct AlarmApp {
    service: AlarmService<dyn TriggerBackend, SqliteStateRepository>,
    logs_dir: PathBuf,
    log_guard: Mutex<()>,
}

impl AlarmApp {
    /// Wires the capability-rich backend (persistent per-alarm triggers with
    /// update and per-id cancel).
    pub fn with_alarm_clock<M>(workspace_root: &Path, module: M) -> Result<Self, InfraError>
    where
        M: AlarmClockModule + 'static,
    {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let snooze_minutes = read_snooze_minutes(&bootstrap.config_dir)?;
        let backend: Arc<dyn TriggerBackend> =
            Arc::new(ExactAlarmBackend::new(module).with_snooze_minutes(snooze_minutes));
        Self::assemble(bootstrap, backend)
    }

    /// Wires the limited backend (fire-and-forget weekly notifications with
    /// scan-based cancellation).
    pub fn with_notification_center<N>(workspace_root: &Path, center: N) -> Result<Self, InfraError>
    where
        N: NotificationCenter + 'static,
    {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let backend: Arc<dyn TriggerBackend> = Arc::new(NotificationTriggerBackend::new(center));
        Self::assemble(bootstrap, backend)
    }

    fn assemble(
        bootstrap: BootstrapResult,
        backend: Arc<dyn TriggerBackend>,
    ) -> Result<Self, InfraError> {
        let seed = if read_seed_starter_alarms(&bootstrap.config_dir)? {
            seed_alarms()
        } else {
            Vec::new()
        };
        let repository = Arc::new(SqliteStateRepository::new(&bootstrap.database_path));
        let service = AlarmService::load(backend, repository, seed)?;
        Ok(Self {
            service,
            logs_dir: bootstrap.logs_dir,
            log_guard: Mutex::new(()),
        })
    }

    pub async fn add_alarm(&self, draft: AlarmDraft) -> Result<Alarm, InfraError> {
        self.run("add_alarm", self.service.add_alarm(draft)).await
    }

    pub async fn update_alarm(&self, id: &str, patch: AlarmPatch) -> Result<Alarm, InfraError> {
        self.run("update_alarm", self.service.update_alarm(id, patch))
            .await
    }

    pub async fn toggle_alarm(&self, id: &str) -> Result<ToggleOutcome, InfraError> {
        self.run("toggle_alarm", self.service.toggle_alarm(id))
            .await
    }

    pub async fn delete_alarm(&self, id: &str) -> Result<(), InfraError> {
        self.run("delete_alarm", self.service.delete_alarm(id))
            .await
    }

    pub async fn delete_alarms(&self, ids: Vec<String>) -> Result<(), InfraError> {
        self.run("delete_alarms", self.service.delete_alarms(ids))
            .await
    }

    pub async fn set_view_mode(&self, mode: AlarmMode) -> Result<(), InfraError> {
        self.run("set_view_mode", self.service.set_view_mode(mode))
            .await
    }

    pub async fn set_selected_day(&self, day: u8) -> Result<(), InfraError> {
        self.run("set_selected_day", self.service.set_selected_day(day))
            .await
    }

    pub async fn toggle_edit_mode(&self) -> Result<(), InfraError> {
        self.run("toggle_edit_mode", self.service.toggle_edit_mode())
            .await
    }

    pub async fn toggle_select(&self, id: &str) -> Result<(), InfraError> {
        self.run("toggle_select", self.service.toggle_select(id))
            .await
    }

    pub async fn clear_selection(&self) -> Result<(), InfraError> {
        self.run("clear_selection", self.service.clear_selection())
            .await
    }

    pub fn alarms(&self) -> Result<Vec<Alarm>, InfraError> {
        self.service.alarms()
    }

    pub fn active_alarms(&self) -> Result<Vec<Alarm>, InfraError> {
        self.service.active_alarms()
    }

    pub fn view_state(&self) -> Result<ViewState, InfraError> {
        self.service.view_state()
    }

    pub async fn request_permission(&self) -> Result<bool, InfraError> {
        self.run("request_permission", self.service.request_permission())
            .await
    }

    pub async fn stop_ringing(&self) -> Result<(), InfraError> {
        self.run("stop_ringing", self.service.stop_ringing()).await
    }

    pub async fn snooze_ringing(&self) -> Result<(), InfraError> {
        self.run("snooze_ringing", self.service.snooze_ringing())
            .await
    }

    pub async fn verify_triggers(&self) -> Result<ConsistencyReport, InfraError> {
        self.run("verify_triggers", self.service.verify_triggers())
            .await
    }

    async fn run<T>(
        &self,
        command: &str,
        operation: impl Future<Output = Result<T, InfraError>>,
    ) -> Result<T, InfraError> {
        match operation.await {
            Ok(value) => {
                self.append_log("info", command, "ok");
                Ok(value)
            }
            Err(error) => {
                self.append_log("error", command, &error.to_string());
                Err(error)
            }
        }
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::exact_alarm::NativeAlarm;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubAlarmClock {
        alarms: Mutex<HashMap<String, NativeAlarm>>,
    }

    #[async_trait]
    impl AlarmClockModule for StubAlarmClock {
        async fn set(&self, alarm: NativeAlarm) -> Result<(), InfraError> {
            let mut alarms = self.alarms.lock().expect("lock poisoned");
            alarms.insert(alarm.uid.clone(), alarm);
            Ok(())
        }

        async fn update(&self, alarm: NativeAlarm) -> Result<(), InfraError> {
            self.set(alarm).await
        }

        async fn enable(&self, _uid: &str) -> Result<(), InfraError> {
            Ok(())
        }

        async fn disable(&self, uid: &str) -> Result<(), InfraError> {
            if let Some(alarm) = self.alarms.lock().expect("lock poisoned").get_mut(uid) {
                alarm.active = false;
            }
            Ok(())
        }

        async fn remove(&self, uid: &str) -> Result<(), InfraError> {
            self.alarms.lock().expect("lock poisoned").remove(uid);
            Ok(())
        }

        async fn remove_all(&self, owner: &str) -> Result<(), InfraError> {
            self.alarms
                .lock()
                .expect("lock poisoned")
                .retain(|_, alarm| alarm.owner != owner);
            Ok(())
        }

        async fn get_all(&self, owner: &str) -> Result<Vec<NativeAlarm>, InfraError> {
            Ok(self
                .alarms
                .lock()
                .expect("lock poisoned")
                .values()
                .filter(|alarm| alarm.owner == owner)
                .cloned()
                .collect())
        }

        async fn check_exact_alarm_permission(&self) -> Result<bool, InfraError> {
            Ok(true)
        }

        async fn request_exact_alarm_permission(&self) -> Result<bool, InfraError> {
            Ok(true)
        }

        async fn stop(&self) -> Result<(), InfraError> {
            Ok(())
        }

        async fn snooze(&self) -> Result<(), InfraError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn app_bootstraps_seeds_and_logs_commands() {
        let dir = tempfile::tempdir().expect("temp dir");
        let app =
            AlarmApp::with_alarm_clock(dir.path(), StubAlarmClock::default()).expect("build app");

        // First run seeds the starter alarms.
        assert_eq!(app.alarms().expect("alarms").len(), 4);

        let draft = AlarmDraft {
            time: Some("06:00".to_string()),
            days: Some(vec![2]),
            ..AlarmDraft::default()
        };
        app.add_alarm(draft).await.expect("add");
        assert_eq!(app.alarms().expect("alarms").len(), 5);

        let log = std::fs::read_to_string(dir.path().join("logs/commands.log"))
            .expect("command log exists");
        assert!(log.contains("add_alarm"));

        // A failing command is logged too, and surfaces the error.
        assert!(app.toggle_alarm("missing").await.is_err());
        let log = std::fs::read_to_string(dir.path().join("logs/commands.log"))
            .expect("command log exists");
        assert!(log.contains("Alarm not found"));
    }

    #[tokio::test]
    async fn app_reload_uses_persisted_state_over_seed() {
        let dir = tempfile::tempdir().expect("temp dir");
        {
            let app = AlarmApp::with_alarm_clock(dir.path(), StubAlarmClock::default())
                .expect("build app");
            app.delete_alarms(vec![
                "seed-1".to_string(),
                "seed-2".to_string(),
                "seed-3".to_string(),
                "seed-4".to_string(),
            ])
            .await
            .expect("clear seeds");
        }

        let app =
            AlarmApp::with_alarm_clock(dir.path(), StubAlarmClock::default()).expect("rebuild app");
        assert!(app.alarms().expect("alarms").is_empty());
    }
}
