//! In-memory backend for exercising the sync pipeline and the notification
//! store without a network.

use crate::api::TelemetryBackend;
use crate::api::types::{
    ComponentState, DatabaseHealth, HealthCheckResponse, HealthInfo, HealthState,
    PredictionRequest, PredictionResponse, Sensor,
};
use crate::error::AppError;
use crate::notifications::Notification;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
pub struct MockBackendBehavior {
    pub health_ok: bool,
    pub sensors_ok: bool,
    pub predictions_ok: bool,
    pub notifications_ok: bool,
    pub unread_count_ok: bool,
    pub last_unread_ok: bool,
    pub mark_as_read_ok: bool,
    pub mark_all_as_read_ok: bool,
}

impl MockBackendBehavior {
    pub fn ok() -> Self {
        Self {
            health_ok: true,
            sensors_ok: true,
            predictions_ok: true,
            notifications_ok: true,
            unread_count_ok: true,
            last_unread_ok: true,
            mark_as_read_ok: true,
            mark_all_as_read_ok: true,
        }
    }

    pub fn fail_mark_as_read() -> Self {
        Self {
            mark_as_read_ok: false,
            ..Self::ok()
        }
    }

    pub fn fail_mark_all_as_read() -> Self {
        Self {
            mark_all_as_read_ok: false,
            ..Self::ok()
        }
    }

    pub fn fail_sensors() -> Self {
        Self {
            sensors_ok: false,
            ..Self::ok()
        }
    }

    pub fn fail_notifications() -> Self {
        Self {
            notifications_ok: false,
            ..Self::ok()
        }
    }

    pub fn fail_predictions() -> Self {
        Self {
            predictions_ok: false,
            ..Self::ok()
        }
    }
}

pub struct MockBackend {
    behavior: MockBackendBehavior,
    sensors: Vec<Sensor>,
    predictions: Vec<PredictionResponse>,
    notifications: Mutex<Vec<Notification>>,
    marked_read: Mutex<Vec<String>>,
    mark_all_calls: Mutex<u32>,
}

impl MockBackend {
    pub fn new(behavior: MockBackendBehavior) -> Self {
        Self {
            behavior,
            sensors: Vec::new(),
            predictions: Vec::new(),
            notifications: Mutex::new(Vec::new()),
            marked_read: Mutex::new(Vec::new()),
            mark_all_calls: Mutex::new(0),
        }
    }

    pub fn with_sensors(mut self, sensors: Vec<Sensor>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn with_predictions(mut self, predictions: Vec<PredictionResponse>) -> Self {
        self.predictions = predictions;
        self
    }

    pub fn with_notifications(self, notifications: Vec<Notification>) -> Self {
        if let Ok(mut guard) = self.notifications.lock() {
            *guard = notifications;
        }
        self
    }

    /// Ids confirmed through `confirm_mark_as_read`, in call order.
    pub fn marked_read(&self) -> Vec<String> {
        self.marked_read
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn mark_all_calls(&self) -> u32 {
        self.mark_all_calls.lock().map(|guard| *guard).unwrap_or(0)
    }

    fn mock_error(operation: &str) -> AppError {
        AppError::Api {
            status: 500,
            message: format!("mock {operation} failed"),
        }
    }
}

impl TelemetryBackend for MockBackend {
    async fn fetch_health(&self) -> Result<HealthCheckResponse, AppError> {
        if !self.behavior.health_ok {
            return Err(Self::mock_error("fetch health"));
        }
        Ok(HealthCheckResponse {
            status: HealthState::Ok,
            info: HealthInfo {
                database: DatabaseHealth {
                    status: ComponentState::Up,
                },
            },
        })
    }

    async fn fetch_sensors(&self) -> Result<Vec<Sensor>, AppError> {
        if !self.behavior.sensors_ok {
            return Err(Self::mock_error("fetch sensors"));
        }
        Ok(self.sensors.clone())
    }

    async fn fetch_predictions(
        &self,
        sensor_id: &str,
        _request: PredictionRequest,
    ) -> Result<PredictionResponse, AppError> {
        if !self.behavior.predictions_ok {
            return Err(Self::mock_error("fetch predictions"));
        }
        self.predictions
            .iter()
            .find(|prediction| prediction.sensor_id == sensor_id)
            .cloned()
            .ok_or(AppError::Api {
                status: 404,
                message: format!("no mock prediction for sensor {sensor_id}"),
            })
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, AppError> {
        if !self.behavior.notifications_ok {
            return Err(Self::mock_error("fetch notifications"));
        }
        let guard = self.notifications.lock().map_err(|_| AppError::StateLock)?;
        Ok(guard.clone())
    }

    async fn fetch_unread_count(&self) -> Result<usize, AppError> {
        if !self.behavior.unread_count_ok {
            return Err(Self::mock_error("fetch unread count"));
        }
        let guard = self.notifications.lock().map_err(|_| AppError::StateLock)?;
        Ok(guard.iter().filter(|n| !n.read).count())
    }

    async fn fetch_last_unread(&self) -> Result<Option<Notification>, AppError> {
        if !self.behavior.last_unread_ok {
            return Err(Self::mock_error("fetch last unread"));
        }
        let guard = self.notifications.lock().map_err(|_| AppError::StateLock)?;
        let mut latest: Option<&Notification> = None;
        for notification in guard.iter().filter(|n| !n.read) {
            if latest.is_none_or(|current| notification.created_at > current.created_at) {
                latest = Some(notification);
            }
        }
        Ok(latest.cloned())
    }

    async fn confirm_mark_as_read(&self, id: &str) -> Result<(), AppError> {
        if !self.behavior.mark_as_read_ok {
            return Err(Self::mock_error("mark as read"));
        }
        let mut guard = self.notifications.lock().map_err(|_| AppError::StateLock)?;
        if let Some(notification) = guard.iter_mut().find(|n| n.id == id) {
            notification.read = true;
        }
        drop(guard);
        self.marked_read
            .lock()
            .map_err(|_| AppError::StateLock)?
            .push(id.to_string());
        Ok(())
    }

    async fn confirm_mark_all_as_read(&self) -> Result<(), AppError> {
        if !self.behavior.mark_all_as_read_ok {
            return Err(Self::mock_error("mark all as read"));
        }
        let mut guard = self.notifications.lock().map_err(|_| AppError::StateLock)?;
        for notification in guard.iter_mut() {
            notification.read = true;
        }
        drop(guard);
        *self.mark_all_calls.lock().map_err(|_| AppError::StateLock)? += 1;
        Ok(())
    }
}
