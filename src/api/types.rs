//! Wire types for the telemetry and prediction backends.

use crate::level::TankGeometry;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// One raw measurement as reported by the ingest service. The distance is
/// transported as a decimal string, not a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub reading: String,
    pub rssi: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl SensorReading {
    /// Parse the transported decimal string into centimeters.
    pub fn distance_cm(&self) -> Result<f64, std::num::ParseFloatError> {
        self.reading.trim().parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    pub capacity: f64,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<ConnectionStatus>,
    #[serde(default)]
    pub measurement_interval: Option<u32>,
    #[serde(default)]
    pub sensor_readings: Vec<SensorReading>,
    #[serde(default)]
    pub water_distance: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl Sensor {
    /// Tank geometry for level derivation, if the sensor has been configured
    /// with both a height and a full-level distance.
    pub fn tank_geometry(&self) -> Option<TankGeometry> {
        Some(TankGeometry {
            capacity: self.capacity,
            height: self.height?,
            water_distance: self.water_distance?,
        })
    }

    /// The most recent reading by `created_at`, if any.
    pub fn latest_reading(&self) -> Option<&SensorReading> {
        self.sensor_readings
            .iter()
            .max_by_key(|reading| reading.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DatabaseHealth {
    pub status: ComponentState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HealthInfo {
    pub database: DatabaseHealth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthState,
    pub info: HealthInfo,
}

impl HealthCheckResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Ok && self.info.database.status == ComponentState::Up
    }
}

// Prediction service types. Risk levels come back in Spanish.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "bajo")]
    Low,
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "alto")]
    High,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionPoint {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionInsights {
    pub summary: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub warning: Option<String>,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionResponse {
    pub sensor_id: String,
    pub predictions: Vec<PredictionPoint>,
    pub insights: PredictionInsights,
    pub confidence_score: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Granularity {
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "30min")]
    Min30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "12h")]
    Hour12,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PredictionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
}
