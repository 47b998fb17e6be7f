use crate::api::types::{ConnectionStatus, PredictionResponse, Sensor};
use crate::error::AppError;
use crate::level::WaterLevel;
use time::OffsetDateTime;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub enum LevelStatus {
    Ok,
    Unavailable { reason: String },
}

/// Display-ready level for one sensor, derived from its latest reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorLevel {
    pub sensor_id: String,
    pub name: String,
    pub connection: Option<ConnectionStatus>,
    pub level: Option<WaterLevel>,
    pub observed_at: Option<OffsetDateTime>,
    pub status: LevelStatus,
}

#[derive(Debug)]
pub struct AppState {
    sensors: Vec<Sensor>,
    sensors_tx: watch::Sender<Vec<Sensor>>,
    levels: Vec<SensorLevel>,
    levels_tx: watch::Sender<Vec<SensorLevel>>,
    predictions: Vec<PredictionResponse>,
    predictions_tx: watch::Sender<Vec<PredictionResponse>>,
}

impl AppState {
    pub fn new() -> Self {
        let (sensors_tx, _sensors_rx) = watch::channel(Vec::new());
        let (levels_tx, _levels_rx) = watch::channel(Vec::new());
        let (predictions_tx, _predictions_rx) = watch::channel(Vec::new());
        Self {
            sensors: Vec::new(),
            sensors_tx,
            levels: Vec::new(),
            levels_tx,
            predictions: Vec::new(),
            predictions_tx,
        }
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn subscribe_sensors(&self) -> watch::Receiver<Vec<Sensor>> {
        self.sensors_tx.subscribe()
    }

    pub fn set_sensors(&mut self, sensors: Vec<Sensor>) -> Result<(), AppError> {
        self.sensors = sensors.clone();
        self.sensors_tx
            .send(sensors)
            .map_err(|_| AppError::WatchSend)
    }

    pub fn levels(&self) -> &[SensorLevel] {
        &self.levels
    }

    pub fn subscribe_levels(&self) -> watch::Receiver<Vec<SensorLevel>> {
        self.levels_tx.subscribe()
    }

    pub fn set_levels(&mut self, levels: Vec<SensorLevel>) -> Result<(), AppError> {
        self.levels = levels.clone();
        self.levels_tx.send(levels).map_err(|_| AppError::WatchSend)
    }

    pub fn predictions(&self) -> &[PredictionResponse] {
        &self.predictions
    }

    pub fn subscribe_predictions(&self) -> watch::Receiver<Vec<PredictionResponse>> {
        self.predictions_tx.subscribe()
    }

    pub fn set_predictions(&mut self, predictions: Vec<PredictionResponse>) -> Result<(), AppError> {
        self.predictions = predictions.clone();
        self.predictions_tx
            .send(predictions)
            .map_err(|_| AppError::WatchSend)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor_level(sensor_id: &str, percentage: f64) -> SensorLevel {
        SensorLevel {
            sensor_id: sensor_id.to_string(),
            name: format!("sensor {sensor_id}"),
            connection: Some(ConnectionStatus::Connected),
            level: Some(WaterLevel {
                current_level: percentage,
                percentage,
            }),
            observed_at: Some(OffsetDateTime::UNIX_EPOCH),
            status: LevelStatus::Ok,
        }
    }

    #[test]
    fn set_levels_updates_state_and_watch() {
        let mut state = AppState::new();
        let receiver = state.subscribe_levels();
        let level = sensor_level("s-1", 42.0);

        assert!(state.set_levels(vec![level.clone()]).is_ok());

        assert_eq!(state.levels(), &[level.clone()]);
        assert_eq!(receiver.borrow().as_slice(), &[level]);
    }

    #[test]
    fn set_levels_accepts_unavailable_status() {
        let mut state = AppState::new();
        let _receiver = state.subscribe_levels();
        let level = SensorLevel {
            sensor_id: "s-2".to_string(),
            name: "Tanque Jardin".to_string(),
            connection: None,
            level: None,
            observed_at: None,
            status: LevelStatus::Unavailable {
                reason: "no readings received".to_string(),
            },
        };

        assert!(state.set_levels(vec![level.clone()]).is_ok());

        assert_eq!(state.levels(), &[level]);
    }

    #[test]
    fn set_without_subscriber_reports_watch_error() {
        let mut state = AppState::new();

        let result = state.set_levels(vec![sensor_level("s-3", 10.0)]);

        assert!(matches!(result, Err(AppError::WatchSend)));
    }
}
