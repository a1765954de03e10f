// Licensed under the Open Software License version 3.0
use crate::hardware::types::{SensorReading, Snapshot, SourceKind};
use chrono::SecondsFormat;

const HEADER: &str = "ID|Name|Type|Reading|Units|Status";

/// Pipe separated report that `parser::delimited` reads back unchanged
pub fn to_delimited(readings: &[SensorReading]) -> String {
    let mut output = String::from(HEADER);
    output.push('\n');
    for reading in readings {
        let value = match reading.value {
            Some(value) => value.to_string(),
            None => String::from("N/A"),
        };
        output.push_str(&format!(
            "{}|{}|{}|{}|{}|{}\n",
            reading.id,
            reading.name,
            reading.sensor_type.as_str(),
            value,
            reading.unit,
            reading.status.as_str()
        ));
    }
    output
}

fn source_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::CommandLine => "ipmi-sensors",
        SourceKind::Redfish => "redfish",
    }
}

/// Title line followed by the readings table, or by the error
pub fn to_table(snapshot: &Snapshot) -> String {
    let title = format!(
        "[{}] {} via {}",
        snapshot.target,
        snapshot.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        source_label(snapshot.source_kind)
    );
    match &snapshot.error {
        Some(error) => format!("{}\nerror: {}\n", title, error),
        None => format!("{}\n{}", title, to_delimited(&snapshot.readings)),
    }
}

pub fn to_json(snapshot: &Snapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collector::CollectorError,
        hardware::types::{SensorStatus, SensorType},
    };

    fn fan(value: Option<f64>) -> SensorReading {
        SensorReading {
            id: String::from("FAN1"),
            name: String::from("Fan 1"),
            sensor_type: SensorType::Fan,
            value,
            unit: String::from("RPM"),
            status: SensorStatus::Ok,
        }
    }

    #[test]
    fn delimited_rows() {
        assert_eq!(
            to_delimited(&[fan(Some(3400.0)), fan(None)]),
            "ID|Name|Type|Reading|Units|Status\nFAN1|Fan 1|Fan|3400|RPM|OK\nFAN1|Fan 1|Fan|N/A|RPM|OK\n"
        );
    }

    #[test]
    fn empty_readings_keep_header() {
        assert_eq!(to_delimited(&[]), "ID|Name|Type|Reading|Units|Status\n");
    }

    #[test]
    fn table_shows_error() {
        let snapshot = Snapshot::failure(
            String::from("bmc.lan"),
            SourceKind::CommandLine,
            CollectorError::TimedOut { timeout_ms: 30000 },
        );
        let table = to_table(&snapshot);
        assert!(table.starts_with("[bmc.lan] "));
        assert!(table.contains("via ipmi-sensors"));
        assert!(table.ends_with("error: collection timed out after 30000 ms\n"));
    }

    #[test]
    fn json_contains_readings() {
        let snapshot = Snapshot::success(
            String::from("bmc.lan"),
            SourceKind::Redfish,
            vec![fan(Some(3400.0))],
        );
        let json: serde_json::Value = serde_json::from_str(&to_json(&snapshot).unwrap()).unwrap();
        assert_eq!(json["target"], "bmc.lan");
        assert_eq!(json["readings"][0]["value"], 3400.0);
        assert!(json["error"].is_null());
    }
}
