use std::sync::{Arc, RwLock};
use tinaco_flow::api::TelemetryBackend;
use tinaco_flow::api::client::HttpApiClient;
use tinaco_flow::api::types::{PredictionResponse, Sensor};
use tinaco_flow::error::AppError;
use tinaco_flow::notifications::{Notification, NotificationStore};
use tinaco_flow::state::{AppState, LevelStatus, SensorLevel};
use tinaco_flow::{config, sync};
use tokio::sync::watch;

fn init_tracing(level: &str) {
    let max_level = level.parse().unwrap_or(tracing::Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

struct DashboardViews {
    sensors: watch::Receiver<Vec<Sensor>>,
    levels: watch::Receiver<Vec<SensorLevel>>,
    predictions: watch::Receiver<Vec<PredictionResponse>>,
    notifications: watch::Receiver<Vec<Notification>>,
    unread_count: watch::Receiver<usize>,
    last_unread: watch::Receiver<Option<Notification>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(&config.logging.level);
    tracing::info!(
        app = %config.app.name,
        config_path = config::DEFAULT_CONFIG_PATH,
        "tinaco-flow starting"
    );

    let client = HttpApiClient::from_config(&config)?;
    match client.fetch_health().await {
        Ok(health) if health.is_healthy() => tracing::info!("Backend healthy"),
        Ok(_) => tracing::warn!("Backend reports degraded health"),
        Err(err) => tracing::warn!(error = %err, "Backend health check failed"),
    }

    let state = Arc::new(RwLock::new(AppState::new()));
    let store = Arc::new(RwLock::new(NotificationStore::new()));
    let mut views = subscribe_views(&state, &store)?;

    let include_predictions = config.predictions_base_url().is_some();
    let interval = config.refresh_interval();
    tracing::info!(
        interval_secs = interval.as_secs(),
        include_predictions,
        "Starting sync loop"
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) =
                    sync::run_refresh_cycle(&client, &state, &store, include_predictions).await
                {
                    tracing::warn!(error = %err, "Refresh cycle failed");
                }
                log_dashboard(&mut views);
            }
        }
    }

    Ok(())
}

fn subscribe_views(
    state: &Arc<RwLock<AppState>>,
    store: &Arc<RwLock<NotificationStore>>,
) -> Result<DashboardViews, AppError> {
    let state_guard = state.read().map_err(|_| AppError::StateLock)?;
    let store_guard = store.read().map_err(|_| AppError::StateLock)?;
    Ok(DashboardViews {
        sensors: state_guard.subscribe_sensors(),
        levels: state_guard.subscribe_levels(),
        predictions: state_guard.subscribe_predictions(),
        notifications: store_guard.subscribe_notifications(),
        unread_count: store_guard.subscribe_unread_count(),
        last_unread: store_guard.subscribe_last_unread(),
    })
}

fn log_dashboard(views: &mut DashboardViews) {
    if views.levels.has_changed().unwrap_or(false) {
        let sensors = views.sensors.borrow_and_update();
        tracing::info!(count = sensors.len(), "Sensors refreshed");
        drop(sensors);

        for level in views.levels.borrow_and_update().iter() {
            match &level.status {
                LevelStatus::Ok => {
                    if let Some(water) = level.level {
                        tracing::info!(
                            sensor = %level.name,
                            percentage = water.percentage,
                            liters = water.current_level,
                            "Water level"
                        );
                    }
                }
                LevelStatus::Unavailable { reason } => {
                    tracing::info!(sensor = %level.name, reason = %reason, "Water level unavailable");
                }
            }
        }
    }

    if views.predictions.has_changed().unwrap_or(false) {
        for prediction in views.predictions.borrow_and_update().iter() {
            tracing::info!(
                sensor_id = %prediction.sensor_id,
                risk = ?prediction.insights.risk_level,
                trend = %prediction.insights.trend,
                "Level forecast"
            );
        }
    }

    if views.unread_count.has_changed().unwrap_or(false) {
        let unread = *views.unread_count.borrow_and_update();
        match views.last_unread.borrow_and_update().as_ref() {
            Some(last) => tracing::info!(
                unread,
                latest = %last.sensor.name,
                "Unread notifications"
            ),
            None => tracing::info!(unread, "Unread notifications"),
        }

        for notification in views.notifications.borrow_and_update().iter().take(4) {
            tracing::debug!(
                id = %notification.id,
                kind = ?notification.kind,
                sensor = %notification.sensor.name,
                read = notification.read,
                "Notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tinaco_flow::config;

    #[test]
    fn default_config_is_valid_toml() -> Result<(), Box<dyn std::error::Error>> {
        let _config = config::load_default()?;
        Ok(())
    }
}
