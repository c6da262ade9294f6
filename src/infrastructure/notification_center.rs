use crate::infrastructure::error::InfraError;
use crate::infrastructure::trigger_backend::{
    OWNER_TAG, TriggerBackend, TriggerRecord, TriggerRequest,
};
use crate::infrastructure::weekday::{from_backend_day, to_backend_day};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata embedded in every notification so the owning alarm can be found
/// again; the platform offers no indexed lookup by tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationData {
    pub alarm_id: String,
    pub owner: String,
}

/// One weekly-recurrence notification to schedule. `weekday` uses the backend
/// numbering; the platform has no multi-day primitive, so one request covers
/// exactly one weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyNotification {
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub title: String,
    pub body: String,
    pub sound: String,
    pub vibration: bool,
    pub data: NotificationData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub identifier: String,
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub data: NotificationData,
}

/// The limited platform primitive: fire-and-forget weekly notifications,
/// cancellation only by scheduling identifier, and an unscoped cancel-all.
#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn schedule_weekly(&self, request: WeeklyNotification) -> Result<String, InfraError>;
    async fn get_all_scheduled(&self) -> Result<Vec<ScheduledNotification>, InfraError>;
    async fn cancel(&self, identifier: &str) -> Result<(), InfraError>;
    async fn cancel_all(&self) -> Result<(), InfraError>;
    async fn permissions_granted(&self) -> Result<bool, InfraError>;
    async fn request_permissions(&self) -> Result<bool, InfraError>;
}

/// Trigger backend over the limited primitive. Per-id cancellation is an O(n)
/// scan over all pending notifications filtering the embedded alarm id, and
/// `cancel_all` wipes every pending notification regardless of owner, so this
/// backend cannot coexist with other schedulers on the same mechanism.
pub struct NotificationTriggerBackend<N: NotificationCenter> {
    center: N,
}

impl<N: NotificationCenter> NotificationTriggerBackend<N> {
    pub fn new(center: N) -> Self {
        Self { center }
    }

    async fn cancel_by_alarm_id(&self, alarm_id: &str) -> Result<(), InfraError> {
        let scheduled = self.center.get_all_scheduled().await?;
        for notification in scheduled {
            if notification.data.alarm_id == alarm_id {
                self.center.cancel(&notification.identifier).await?;
            }
        }
        Ok(())
    }

    async fn schedule_days(&self, request: &TriggerRequest) -> Result<(), InfraError> {
        for day in &request.days {
            self.center
                .schedule_weekly(WeeklyNotification {
                    weekday: to_backend_day(*day),
                    hour: request.hour,
                    minute: request.minute,
                    title: request.title.clone(),
                    body: request.body.clone(),
                    sound: request.sound.clone(),
                    vibration: request.vibration,
                    data: NotificationData {
                        alarm_id: request.alarm_id.clone(),
                        owner: OWNER_TAG.to_string(),
                    },
                })
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<N: NotificationCenter> TriggerBackend for NotificationTriggerBackend<N> {
    async fn schedule(&self, request: &TriggerRequest) -> Result<(), InfraError> {
        // Cancel the id's previous set first so a reschedule never duplicates.
        self.cancel_by_alarm_id(&request.alarm_id).await?;
        if !request.enabled {
            return Ok(());
        }
        self.schedule_days(request).await
    }

    async fn update(&self, request: &TriggerRequest) -> Result<(), InfraError> {
        // No update-in-place on this platform; cancel-then-reschedule.
        self.schedule(request).await
    }

    async fn cancel(&self, alarm_id: &str) -> Result<(), InfraError> {
        self.cancel_by_alarm_id(alarm_id).await
    }

    async fn cancel_all(&self) -> Result<(), InfraError> {
        self.center.cancel_all().await
    }

    async fn list(&self) -> Result<Vec<TriggerRecord>, InfraError> {
        let scheduled = self.center.get_all_scheduled().await?;
        Ok(scheduled
            .into_iter()
            .filter(|notification| notification.data.owner == OWNER_TAG)
            .map(|notification| TriggerRecord {
                alarm_id: notification.data.alarm_id,
                day: from_backend_day(notification.weekday),
            })
            .collect())
    }

    async fn set_enabled(&self, request: &TriggerRequest, enabled: bool) -> Result<(), InfraError> {
        if enabled {
            let mut request = request.clone();
            request.enabled = true;
            self.schedule(&request).await
        } else {
            self.cancel_by_alarm_id(&request.alarm_id).await
        }
    }

    async fn permission_granted(&self) -> Result<bool, InfraError> {
        self.center.permissions_granted().await
    }

    async fn request_permission(&self) -> Result<bool, InfraError> {
        self.center.request_permissions().await
    }

    async fn stop_ringing(&self) -> Result<(), InfraError> {
        Err(InfraError::Backend(
            "ringing control is not available on this platform".to_string(),
        ))
    }

    async fn snooze_ringing(&self) -> Result<(), InfraError> {
        Err(InfraError::Backend(
            "ringing control is not available on this platform".to_string(),
        ))
    }
}
