// Licensed under the Open Software License version 3.0
pub mod classify;
pub mod delimited;
pub mod redfish;

use crate::hardware::types::{ContentHint, RawReport, SensorReading};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ParseError {
    #[error("malformed row at line {line_number}")]
    MalformedRow { line_number: usize },

    #[error("required column \"{name}\" is missing")]
    MissingColumn { name: String },

    #[error("report is not valid UTF-8")]
    UnsupportedEncoding,

    #[error("sensor id \"{id}\" repeated at line {line_number}")]
    DuplicateId { id: String, line_number: usize },

    #[error("malformed sensor document: {reason}")]
    MalformedDocument { reason: String },
}

/// Turns a raw report into readings, in report order.
/// Pure: the same bytes always give the same readings.
pub fn parse(report: &RawReport) -> Result<Vec<SensorReading>, ParseError> {
    let text = std::str::from_utf8(&report.payload).map_err(|_| ParseError::UnsupportedEncoding)?;
    match report.content_hint {
        ContentHint::DelimitedText => delimited::parse_delimited(text),
        ContentHint::Json => redfish::parse_redfish(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::types::{SensorStatus, SourceKind};

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut payload = b"ID|Name|Type|Reading|Units|Status\n1|CPU ".to_vec();
        payload.push(0xff);
        payload.extend_from_slice(b"|Temperature|45|C|OK\n");
        for content_hint in [ContentHint::DelimitedText, ContentHint::Json] {
            let report = RawReport::new(SourceKind::CommandLine, payload.clone(), content_hint);
            assert_eq!(parse(&report), Err(ParseError::UnsupportedEncoding));
        }
    }

    #[test]
    fn parse_is_idempotent() {
        let report = RawReport::new(
            SourceKind::CommandLine,
            b"ID|Name|Type|Reading|Units|Status\n1|CPU|Temperature|45|C|OK\n2|FAN1|Fan|N/A|RPM|Critical\n"
                .to_vec(),
            ContentHint::DelimitedText,
        );
        let first = parse(&report).unwrap();
        let second = parse(&report).unwrap();
        assert_eq!(first, second);
        assert_eq!(second[1].status, SensorStatus::Critical);
    }

    #[test]
    fn dispatches_on_content_hint() {
        let report = RawReport::new(
            SourceKind::Redfish,
            br#"[{"MemberId": "0", "Name": "Inlet", "Reading": 21, "ReadingUnits": "Cel"}]"#.to_vec(),
            ContentHint::Json,
        );
        let readings = parse(&report).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, Some(21.0));
    }
}
