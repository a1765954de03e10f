// Licensed under the Open Software License version 3.0
use super::{
    classify::{clean_cell, is_absent, sensor_status, sensor_type},
    ParseError,
};
use crate::hardware::types::SensorReading;
use std::collections::HashSet;

const SEPARATOR: char = '|';

/// Column positions resolved from the header row
struct Columns {
    id: usize,
    name: usize,
    sensor_type: usize,
    reading: usize,
    units: usize,
    status: usize,
    count: usize,
}

fn find_column(header: &[String], names: &[&str]) -> Result<usize, ParseError> {
    header
        .iter()
        .position(|cell| names.iter().any(|name| cell.eq_ignore_ascii_case(name)))
        .ok_or_else(|| ParseError::MissingColumn {
            name: names[0].to_string(),
        })
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, ParseError> {
        let header: Vec<String> = header
            .split(SEPARATOR)
            .map(|cell| clean_cell(cell).to_string())
            .collect();
        Ok(Self {
            id: find_column(&header, &["ID"])?,
            name: find_column(&header, &["Name"])?,
            sensor_type: find_column(&header, &["Type"])?,
            reading: find_column(&header, &["Reading"])?,
            units: find_column(&header, &["Units"])?,
            // ipmi-sensors calls it "Event"
            status: find_column(&header, &["Status", "Event"])?,
            count: header.len(),
        })
    }
}

fn parse_reading(cell: &str, line_number: usize) -> Result<Option<f64>, ParseError> {
    if is_absent(cell) {
        return Ok(None);
    }
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(ParseError::MalformedRow { line_number }),
    }
}

/// Pipe separated report with a header row, as printed by `ipmi-sensors`.
/// Line numbers in errors are 1-based and count blank lines.
pub fn parse_delimited(text: &str) -> Result<Vec<SensorReading>, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(ParseError::MissingColumn {
            name: String::from("ID"),
        });
    };
    let columns = Columns::from_header(header)?;

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut readings: Vec<SensorReading> = Vec::new();
    for (line_number, line) in lines {
        let cells: Vec<&str> = line.split(SEPARATOR).map(clean_cell).collect();
        if cells.len() != columns.count {
            return Err(ParseError::MalformedRow { line_number });
        }
        let id = cells[columns.id];
        if id.is_empty() {
            return Err(ParseError::MalformedRow { line_number });
        }
        if !seen_ids.insert(id.to_string()) {
            return Err(ParseError::DuplicateId {
                id: id.to_string(),
                line_number,
            });
        }
        let unit = cells[columns.units];
        readings.push(SensorReading {
            id: id.to_string(),
            name: cells[columns.name].to_string(),
            sensor_type: sensor_type(cells[columns.sensor_type], unit),
            value: parse_reading(cells[columns.reading], line_number)?,
            unit: unit.to_string(),
            status: sensor_status(cells[columns.status]),
        });
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::types::{SensorStatus, SensorType};
    use crate::render::to_delimited;

    const IPMI_SENSORS_OUTPUT: &str = "\
ID  | Name            | Type              | Reading    | Units | Event
4   | CPU Temp        | Temperature       | 36.00      | C     | 'OK'
71  | FAN1            | Fan               | 3400.00    | RPM   | 'OK'
72  | FAN2            | Fan               | 300.00     | RPM   | 'Lower Critical'
90  | 12V             | Voltage           | 12.19      | V     | 'OK'
118 | PS1 Status      | Power Supply      | N/A        | N/A   | 'Presence detected'
";

    #[test]
    fn single_row() {
        let readings = parse_delimited(
            "ID|Name|Type|Reading|Units|Status\nCPU_Temp|CPU|Temperature|45|C|OK\n",
        )
        .unwrap();
        assert_eq!(
            readings,
            vec![SensorReading {
                id: String::from("CPU_Temp"),
                name: String::from("CPU"),
                sensor_type: SensorType::Temperature,
                value: Some(45.0),
                unit: String::from("C"),
                status: SensorStatus::Ok,
            }]
        );
    }

    #[test]
    fn not_available_reading_keeps_status() {
        let readings = parse_delimited(
            "ID|Name|Type|Reading|Units|Status\nFAN3|Fan 3|Fan|N/A|RPM|Critical\nFAN4|Fan 4|Fan||RPM|OK\n",
        )
        .unwrap();
        assert_eq!(readings[0].value, None);
        assert_eq!(readings[0].status, SensorStatus::Critical);
        assert_eq!(readings[1].value, None);
        assert_eq!(readings[1].status, SensorStatus::Ok);
    }

    #[test]
    fn ipmi_sensors_format() {
        let readings = parse_delimited(IPMI_SENSORS_OUTPUT).unwrap();
        let ids: Vec<&str> = readings.iter().map(|reading| reading.id.as_str()).collect();
        assert_eq!(ids, vec!["4", "71", "72", "90", "118"]);
        assert_eq!(readings[0].name, "CPU Temp");
        assert_eq!(readings[1].value, Some(3400.0));
        assert_eq!(readings[2].status, SensorStatus::Critical);
        assert_eq!(readings[3].sensor_type, SensorType::Voltage);
        assert_eq!(readings[4].sensor_type, SensorType::Power);
        assert_eq!(readings[4].value, None);
        assert_eq!(readings[4].status, SensorStatus::Unknown);
    }

    #[test]
    fn missing_column() {
        let error = parse_delimited("ID|Name|Type|Reading|Status\n1|CPU|Temperature|45|OK\n")
            .unwrap_err();
        assert_eq!(
            error,
            ParseError::MissingColumn {
                name: String::from("Units")
            }
        );
    }

    #[test]
    fn empty_report_has_no_header() {
        assert!(matches!(
            parse_delimited("\n\n"),
            Err(ParseError::MissingColumn { .. })
        ));
    }

    #[test]
    fn short_row_is_malformed() {
        let error = parse_delimited(
            "ID|Name|Type|Reading|Units|Status\n\n1|CPU|Temperature|45|C|OK\n2|FAN|Fan|3000\n",
        )
        .unwrap_err();
        assert_eq!(error, ParseError::MalformedRow { line_number: 4 });
    }

    #[test]
    fn garbage_reading_is_malformed() {
        let error = parse_delimited("ID|Name|Type|Reading|Units|Status\n1|CPU|Temperature|hot|C|OK\n")
            .unwrap_err();
        assert_eq!(error, ParseError::MalformedRow { line_number: 2 });
    }

    #[test]
    fn duplicate_id() {
        let error = parse_delimited(
            "ID|Name|Type|Reading|Units|Status\n1|CPU|Temperature|45|C|OK\n1|CPU|Temperature|46|C|OK\n",
        )
        .unwrap_err();
        assert_eq!(
            error,
            ParseError::DuplicateId {
                id: String::from("1"),
                line_number: 3
            }
        );
    }

    #[test]
    fn reserialized_report_keeps_count_and_order() {
        let readings = parse_delimited(IPMI_SENSORS_OUTPUT).unwrap();
        let reparsed = parse_delimited(&to_delimited(&readings)).unwrap();
        assert_eq!(reparsed.len(), readings.len());
        assert_eq!(reparsed, readings);
    }
}
