// Licensed under the Open Software License version 3.0
use super::{
    classify::{health_status, sensor_type},
    ParseError,
};
use crate::hardware::types::{SensorReading, SensorType};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MemberId {
    Text(String),
    Number(serde_json::Number),
}

impl MemberId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Status {
    health: Option<String>,
}

/// Fields shared by the `Sensor` schema and the legacy `Thermal`/`Power` arrays
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RedfishSensor {
    member_id: Option<MemberId>,
    id: Option<MemberId>,
    name: Option<String>,
    reading: Option<f64>,
    reading_celsius: Option<f64>,
    reading_volts: Option<f64>,
    reading_units: Option<String>,
    reading_type: Option<String>,
    status: Option<Status>,
}

/// Arrays of the deprecated `Thermal` and `Power` resources
#[derive(Debug, Clone, Copy)]
enum LegacyArray {
    Temperatures,
    Fans,
    Voltages,
}

impl LegacyArray {
    const ALL: [LegacyArray; 3] = [Self::Temperatures, Self::Fans, Self::Voltages];

    fn key(self) -> &'static str {
        match self {
            Self::Temperatures => "Temperatures",
            Self::Fans => "Fans",
            Self::Voltages => "Voltages",
        }
    }
}

fn malformed(reason: impl Into<String>) -> ParseError {
    ParseError::MalformedDocument {
        reason: reason.into(),
    }
}

/// Every sensor object of the document with the legacy array it came from
fn collect_sensors(document: &Value) -> Result<Vec<(Option<LegacyArray>, &Value)>, ParseError> {
    if let Some(sensors) = document.as_array() {
        return Ok(sensors.iter().map(|sensor| (None, sensor)).collect());
    }
    let Some(object) = document.as_object() else {
        return Err(malformed("expected an object or an array"));
    };
    if let Some(members) = object.get("Members") {
        let members = members
            .as_array()
            .ok_or_else(|| malformed("\"Members\" is not an array"))?;
        return Ok(members.iter().map(|sensor| (None, sensor)).collect());
    }
    let legacy: Vec<(Option<LegacyArray>, &Value)> = LegacyArray::ALL
        .iter()
        .filter_map(|array| {
            object
                .get(array.key())
                .and_then(Value::as_array)
                .map(|sensors| (*array, sensors))
        })
        .flat_map(|(array, sensors)| sensors.iter().map(move |sensor| (Some(array), sensor)))
        .collect();
    if !legacy.is_empty() {
        return Ok(legacy);
    }
    // A single Sensor resource
    if object.contains_key("Reading") || object.contains_key("ReadingType") {
        return Ok(vec![(None, document)]);
    }
    Err(malformed("no sensor array found"))
}

fn to_reading(
    sensor: RedfishSensor,
    legacy: Option<LegacyArray>,
) -> Result<SensorReading, ParseError> {
    let member_id = sensor
        .member_id
        .or(sensor.id)
        .map(MemberId::into_string)
        .ok_or_else(|| ParseError::MissingColumn {
            name: String::from("MemberId"),
        })?;
    let status = health_status(sensor.status.unwrap_or_default().health.as_deref());
    let name = sensor.name.unwrap_or_else(|| member_id.clone());

    let (id, value, unit, kind) = match legacy {
        // MemberIds restart at 0 in every legacy array
        Some(array) => {
            let id = format!("{}/{}", array.key(), member_id);
            match array {
                LegacyArray::Temperatures => (
                    id,
                    sensor.reading_celsius.or(sensor.reading),
                    String::from("Cel"),
                    SensorType::Temperature,
                ),
                LegacyArray::Fans => (
                    id,
                    sensor.reading,
                    sensor.reading_units.unwrap_or_else(|| String::from("RPM")),
                    SensorType::Fan,
                ),
                LegacyArray::Voltages => (
                    id,
                    sensor.reading_volts.or(sensor.reading),
                    String::from("V"),
                    SensorType::Voltage,
                ),
            }
        }
        None => {
            let unit = sensor.reading_units.unwrap_or_default();
            let kind = sensor_type(sensor.reading_type.as_deref().unwrap_or_default(), &unit);
            (member_id, sensor.reading, unit, kind)
        }
    };

    Ok(SensorReading {
        id,
        name,
        sensor_type: kind,
        value,
        unit,
        status,
    })
}

/// Decodes Redfish sensor documents. Positions in errors are 1-based.
pub fn parse_redfish(text: &str) -> Result<Vec<SensorReading>, ParseError> {
    let document: Value = serde_json::from_str(text).map_err(|error| malformed(error.to_string()))?;
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut readings: Vec<SensorReading> = Vec::new();
    for (index, (legacy, sensor)) in collect_sensors(&document)?.into_iter().enumerate() {
        let sensor = RedfishSensor::deserialize(sensor)
            .map_err(|error| malformed(format!("sensor {}: {}", index + 1, error)))?;
        let reading = to_reading(sensor, legacy)?;
        if !seen_ids.insert(reading.id.clone()) {
            return Err(ParseError::DuplicateId {
                id: reading.id,
                line_number: index + 1,
            });
        }
        readings.push(reading);
    }
    Ok(readings)
}
