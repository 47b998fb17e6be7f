use crate::error::AppError;
use crate::notifications::Notification;

pub mod client;
pub mod mock;
pub mod types;

use types::{HealthCheckResponse, PredictionRequest, PredictionResponse, Sensor};

/// The remote data-fetching collaborator. The sync pipeline and the
/// notification store are generic over this trait so they run unchanged
/// against the HTTP client or the mock.
#[allow(async_fn_in_trait)]
pub trait TelemetryBackend {
    async fn fetch_health(&self) -> Result<HealthCheckResponse, AppError>;
    async fn fetch_sensors(&self) -> Result<Vec<Sensor>, AppError>;
    async fn fetch_predictions(
        &self,
        sensor_id: &str,
        request: PredictionRequest,
    ) -> Result<PredictionResponse, AppError>;
    async fn fetch_notifications(&self) -> Result<Vec<Notification>, AppError>;
    async fn fetch_unread_count(&self) -> Result<usize, AppError>;
    async fn fetch_last_unread(&self) -> Result<Option<Notification>, AppError>;
    async fn confirm_mark_as_read(&self, id: &str) -> Result<(), AppError>;
    async fn confirm_mark_all_as_read(&self) -> Result<(), AppError>;
}
