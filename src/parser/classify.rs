// Licensed under the Open Software License version 3.0
//! Mapping of free-form type, unit and status strings onto the fixed enums.
//! IPMI and Redfish never agree on spelling, so matching is case-insensitive
//! and falls back to the unit when the type text says nothing useful.
use crate::hardware::types::{SensorStatus, SensorType};

/// Strips whitespace and the single quotes `ipmi-sensors` puts around events
pub fn clean_cell(cell: &str) -> &str {
    let cell = cell.trim();
    cell.strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(cell)
        .trim()
}

/// Empty and "N/A" mean the sensor has no reading
pub fn is_absent(reading: &str) -> bool {
    let reading = reading.trim();
    reading.is_empty() || reading.eq_ignore_ascii_case("n/a")
}

pub fn sensor_type(type_text: &str, unit: &str) -> SensorType {
    let type_text = type_text.trim().to_lowercase();
    if type_text.contains("temp") {
        SensorType::Temperature
    } else if type_text.contains("volt") {
        SensorType::Voltage
    } else if type_text.contains("fan") || type_text == "rotational" {
        SensorType::Fan
    } else if type_text.contains("current") {
        SensorType::Current
    } else if type_text.starts_with("power") || type_text.contains("watt") {
        SensorType::Power
    } else {
        type_from_unit(unit)
    }
}

fn type_from_unit(unit: &str) -> SensorType {
    match unit.trim().to_lowercase().as_str() {
        "c" | "°c" | "cel" | "degc" | "degrees c" | "f" | "degrees f" => SensorType::Temperature,
        "v" | "volts" => SensorType::Voltage,
        "rpm" => SensorType::Fan,
        "a" | "amps" => SensorType::Current,
        "w" | "watts" => SensorType::Power,
        _ => SensorType::Other,
    }
}

/// Status column of delimited reports, e.g. `'OK'` or `'Lower Non-Critical'`
pub fn sensor_status(status: &str) -> SensorStatus {
    let status = clean_cell(status).to_lowercase();
    if status == "ok" || status == "nominal" {
        SensorStatus::Ok
    } else if status.contains("non-recoverable") {
        SensorStatus::Critical
    } else if status.contains("non-critical") || status.contains("warning") {
        SensorStatus::Warning
    } else if status.contains("critical") {
        SensorStatus::Critical
    } else {
        SensorStatus::Unknown
    }
}

/// Redfish `Status.Health`: only OK, Warning and Critical are meaningful
pub fn health_status(health: Option<&str>) -> SensorStatus {
    match health.map(|health| health.trim().to_lowercase()).as_deref() {
        Some("ok") => SensorStatus::Ok,
        Some("warning") => SensorStatus::Warning,
        Some("critical") => SensorStatus::Critical,
        _ => SensorStatus::Unknown,
    }
}
