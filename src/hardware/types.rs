// Licensed under the Open Software License version 3.0
use crate::collector::CollectorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    CommandLine,
    Redfish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentHint {
    DelimitedText,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Temperature,
    Voltage,
    Fan,
    Current,
    Power,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Voltage => "Voltage",
            Self::Fan => "Fan",
            Self::Current => "Current",
            Self::Power => "Power",
            Self::Other => "Other",
        }
    }
}

impl SensorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: String,
    pub name: String,
    pub sensor_type: SensorType,
    /// `None` when the sensor reported "N/A" or nothing at all
    pub value: Option<f64>,
    pub unit: String,
    pub status: SensorStatus,
}

/// Bytes exactly as a source produced them, consumed by a single parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReport {
    pub source_kind: SourceKind,
    pub payload: Vec<u8>,
    pub content_hint: ContentHint,
}

impl RawReport {
    pub fn new(source_kind: SourceKind, payload: Vec<u8>, content_hint: ContentHint) -> Self {
        Self {
            source_kind,
            payload,
            content_hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub source_kind: SourceKind,
    pub readings: Vec<SensorReading>,
    pub error: Option<CollectorError>,
}

impl Snapshot {
    pub fn success(target: String, source_kind: SourceKind, readings: Vec<SensorReading>) -> Self {
        Self {
            timestamp: Utc::now(),
            target,
            source_kind,
            readings,
            error: None,
        }
    }

    /// A failed cycle never carries readings
    pub fn failure(target: String, source_kind: SourceKind, error: CollectorError) -> Self {
        Self {
            timestamp: Utc::now(),
            target,
            source_kind,
            readings: vec![],
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;

    #[test]
    fn failure_has_no_readings() {
        let snapshot = Snapshot::failure(
            String::from("bmc-1"),
            SourceKind::CommandLine,
            CollectorError::Source(SourceError::ToolFailed {
                exit_code: Some(1),
                stderr: String::from("permission denied"),
            }),
        );
        assert!(!snapshot.is_success());
        assert!(snapshot.readings.is_empty());
    }

    #[test]
    fn snapshot_survives_json() {
        let snapshot = Snapshot::success(
            String::from("bmc-1"),
            SourceKind::Redfish,
            vec![SensorReading {
                id: String::from("CPU_Temp"),
                name: String::from("CPU"),
                sensor_type: SensorType::Temperature,
                value: None,
                unit: String::from("C"),
                status: SensorStatus::Ok,
            }],
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.readings[0].value, None);
    }
}
