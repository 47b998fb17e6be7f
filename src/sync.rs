//! Periodic refresh pipeline: sensors and readings in, derived levels and
//! notification views out.

use crate::api::TelemetryBackend;
use crate::api::types::{PredictionRequest, Sensor};
use crate::error::AppError;
use crate::level;
use crate::notifications::{self, NotificationStore};
use crate::state::{AppState, LevelStatus, SensorLevel};
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Derive display levels for a batch of sensors. A sensor that cannot be
/// computed (missing geometry, no readings, malformed reading, degenerate
/// geometry) yields an `Unavailable` entry instead of failing the batch.
pub fn compute_levels(sensors: &[Sensor]) -> Vec<SensorLevel> {
    sensors.iter().map(compute_level).collect()
}

fn compute_level(sensor: &Sensor) -> SensorLevel {
    let Some(geometry) = sensor.tank_geometry() else {
        debug!(sensor_id = %sensor.id, "Skipping level derivation, tank geometry not configured");
        return unavailable(sensor, None, "tank geometry not configured".to_string());
    };
    let Some(reading) = sensor.latest_reading() else {
        debug!(sensor_id = %sensor.id, "Skipping level derivation, no readings received");
        return unavailable(sensor, None, "no readings received".to_string());
    };

    let distance = match reading.distance_cm() {
        Ok(distance) => distance,
        Err(err) => {
            warn!(
                sensor_id = %sensor.id,
                reading = %reading.reading,
                error = %err,
                "Malformed distance reading"
            );
            return unavailable(
                sensor,
                Some(reading.created_at),
                format!("malformed reading {:?}", reading.reading),
            );
        }
    };

    match level::water_level(geometry, distance) {
        Ok(water) => SensorLevel {
            sensor_id: sensor.id.clone(),
            name: sensor.name.clone(),
            connection: sensor.status,
            level: Some(water),
            observed_at: Some(reading.created_at),
            status: LevelStatus::Ok,
        },
        Err(err) => {
            warn!(sensor_id = %sensor.id, error = %err, "Water level derivation failed");
            unavailable(sensor, Some(reading.created_at), err.to_string())
        }
    }
}

fn unavailable(sensor: &Sensor, observed_at: Option<OffsetDateTime>, reason: String) -> SensorLevel {
    SensorLevel {
        sensor_id: sensor.id.clone(),
        name: sensor.name.clone(),
        connection: sensor.status,
        level: None,
        observed_at,
        status: LevelStatus::Unavailable { reason },
    }
}

/// Fetch the sensor list and store it together with freshly derived levels.
pub async fn refresh_sensor_levels<B>(
    backend: &B,
    state: &Arc<RwLock<AppState>>,
) -> Result<Vec<SensorLevel>, AppError>
where
    B: TelemetryBackend,
{
    let sensors = backend.fetch_sensors().await?;
    let levels = compute_levels(&sensors);

    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.set_sensors(sensors)?;
    guard.set_levels(levels.clone())?;
    Ok(levels)
}

/// Fetch predictions for every known sensor. Per-sensor failures are logged
/// and skipped; the remaining predictions are still stored.
pub async fn refresh_predictions<B>(
    backend: &B,
    state: &Arc<RwLock<AppState>>,
    request: PredictionRequest,
) -> Result<(), AppError>
where
    B: TelemetryBackend,
{
    let sensors = {
        let guard = state.read().map_err(|_| AppError::StateLock)?;
        guard.sensors().to_vec()
    };

    let mut predictions = Vec::with_capacity(sensors.len());
    for sensor in &sensors {
        match backend.fetch_predictions(&sensor.id, request).await {
            Ok(prediction) => predictions.push(prediction),
            Err(err) => {
                warn!(sensor_id = %sensor.id, error = %err, "Prediction fetch failed");
            }
        }
    }

    let mut guard = state.write().map_err(|_| AppError::StateLock)?;
    guard.set_predictions(predictions)
}

/// One full refresh: sensor levels, predictions (when enabled), and the
/// notification views.
pub async fn run_refresh_cycle<B>(
    backend: &B,
    state: &Arc<RwLock<AppState>>,
    store: &Arc<RwLock<NotificationStore>>,
    include_predictions: bool,
) -> Result<(), AppError>
where
    B: TelemetryBackend,
{
    refresh_sensor_levels(backend, state).await?;
    if include_predictions {
        refresh_predictions(backend, state, PredictionRequest::default()).await?;
    }
    notifications::refresh(backend, store).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockBackend, MockBackendBehavior};
    use crate::api::types::{ConnectionStatus, SensorReading};
    use time::macros::datetime;

    fn reading(sensor_id: &str, value: &str, minute: u8) -> SensorReading {
        SensorReading {
            sensor_id: sensor_id.to_string(),
            reading: value.to_string(),
            rssi: -68,
            created_at: datetime!(2026-01-11 12:00:00 UTC) + time::Duration::minutes(minute as i64),
        }
    }

    fn sensor(id: &str, readings: Vec<SensorReading>) -> Sensor {
        Sensor {
            id: id.to_string(),
            name: format!("tank {id}"),
            capacity: 100.0,
            location: None,
            status: Some(ConnectionStatus::Connected),
            measurement_interval: Some(600),
            sensor_readings: readings,
            water_distance: Some(10.0),
            height: Some(100.0),
        }
    }

    #[test]
    fn levels_derive_from_most_recent_reading() {
        let sensors = vec![sensor(
            "s-1",
            vec![
                reading("s-1", "100.0", 0),
                reading("s-1", "10.0", 5),
                reading("s-1", "55.0", 2),
            ],
        )];

        let levels = compute_levels(&sensors);

        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].status, LevelStatus::Ok);
        let water = levels[0].level.expect("water level");
        assert_eq!(water.percentage, 100.0);
        assert_eq!(water.current_level, 100.0);
    }

    #[test]
    fn missing_geometry_and_readings_become_unavailable() {
        let mut no_geometry = sensor("s-1", vec![reading("s-1", "50.0", 0)]);
        no_geometry.height = None;
        let no_readings = sensor("s-2", Vec::new());

        let levels = compute_levels(&[no_geometry, no_readings]);

        assert!(matches!(
            &levels[0].status,
            LevelStatus::Unavailable { reason } if reason.contains("geometry")
        ));
        assert!(matches!(
            &levels[1].status,
            LevelStatus::Unavailable { reason } if reason.contains("no readings")
        ));
    }

    #[test]
    fn malformed_reading_does_not_fail_the_batch() {
        let sensors = vec![
            sensor("s-1", vec![reading("s-1", "n/a", 0)]),
            sensor("s-2", vec![reading("s-2", "55.0", 0)]),
        ];

        let levels = compute_levels(&sensors);

        assert!(matches!(
            &levels[0].status,
            LevelStatus::Unavailable { reason } if reason.contains("malformed")
        ));
        assert_eq!(levels[1].status, LevelStatus::Ok);
    }

    #[test]
    fn degenerate_geometry_becomes_unavailable() {
        let mut degenerate = sensor("s-1", vec![reading("s-1", "50.0", 0)]);
        degenerate.water_distance = Some(100.0);

        let levels = compute_levels(&[degenerate]);

        assert!(matches!(
            &levels[0].status,
            LevelStatus::Unavailable { reason } if reason.contains("span")
        ));
        assert_eq!(levels[0].observed_at, Some(datetime!(2026-01-11 12:00:00 UTC)));
    }

    #[tokio::test]
    async fn refresh_cycle_updates_levels_and_notifications() -> Result<(), AppError> {
        let backend = MockBackend::new(MockBackendBehavior::ok())
            .with_sensors(vec![sensor("s-1", vec![reading("s-1", "32.5", 0)])]);
        let state = Arc::new(RwLock::new(AppState::new()));
        let store = Arc::new(RwLock::new(NotificationStore::new()));
        let _state_subs = {
            let guard = state.read().map_err(|_| AppError::StateLock)?;
            (
                guard.subscribe_sensors(),
                guard.subscribe_levels(),
                guard.subscribe_predictions(),
            )
        };
        let _store_subs = {
            let guard = store.read().map_err(|_| AppError::StateLock)?;
            (
                guard.subscribe_notifications(),
                guard.subscribe_unread_count(),
                guard.subscribe_last_unread(),
            )
        };

        run_refresh_cycle(&backend, &state, &store, false).await?;

        let guard = state.read().map_err(|_| AppError::StateLock)?;
        assert_eq!(guard.sensors().len(), 1);
        assert_eq!(guard.levels().len(), 1);
        assert_eq!(guard.levels()[0].status, LevelStatus::Ok);
        drop(guard);

        let guard = store.read().map_err(|_| AppError::StateLock)?;
        assert_eq!(guard.unread_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn refresh_cycle_fails_when_sensor_fetch_fails() {
        let backend = MockBackend::new(MockBackendBehavior::fail_sensors());
        let state = Arc::new(RwLock::new(AppState::new()));
        let store = Arc::new(RwLock::new(NotificationStore::new()));

        let result = run_refresh_cycle(&backend, &state, &store, false).await;

        assert!(matches!(result, Err(AppError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn prediction_failures_do_not_fail_the_cycle() -> Result<(), AppError> {
        let backend = MockBackend::new(MockBackendBehavior::fail_predictions())
            .with_sensors(vec![sensor("s-1", vec![reading("s-1", "32.5", 0)])]);
        let state = Arc::new(RwLock::new(AppState::new()));
        let store = Arc::new(RwLock::new(NotificationStore::new()));
        let _state_subs = {
            let guard = state.read().map_err(|_| AppError::StateLock)?;
            (
                guard.subscribe_sensors(),
                guard.subscribe_levels(),
                guard.subscribe_predictions(),
            )
        };
        let _store_subs = {
            let guard = store.read().map_err(|_| AppError::StateLock)?;
            (
                guard.subscribe_notifications(),
                guard.subscribe_unread_count(),
                guard.subscribe_last_unread(),
            )
        };

        run_refresh_cycle(&backend, &state, &store, true).await?;

        let guard = state.read().map_err(|_| AppError::StateLock)?;
        assert!(guard.predictions().is_empty());
        assert_eq!(guard.levels().len(), 1);
        Ok(())
    }
}
