// Data models and XML parsing for the Seoul subway real-time position service
// Official portal: https://data.seoul.go.kr/
//
// API Endpoint:
// - Real-time train positions (XML): http://swopenapi.seoul.go.kr/api/subway/{key}/xml/realtimePosition/{start}/{end}/{line}

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Seoul;
use chrono_tz::Tz;
use log::debug;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Data Structures
// ============================================================================

/// One train as reported by a `row` element of the position feed.
///
/// All fields are raw text; codes are mapped to display labels by the views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRecord {
    pub train_no: String,
    pub station_name: String,
    pub status: String,
    pub direction: String,
    pub last_car_flag: String,
    pub received_at: String,
}

/// Lines offered by the line selector, in menu order.
pub const SUBWAY_LINES: &[&str] = &[
    "1호선",
    "2호선",
    "3호선",
    "4호선",
    "5호선",
    "6호선",
    "7호선",
    "8호선",
    "9호선",
    "경의중앙선",
    "공항철도",
    "경춘선",
    "수인분당선",
    "신분당선",
    "우이신설선",
];

pub const DEFAULT_LINE: &str = "7호선";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Code Tables
// ============================================================================

/// Travel direction (`directAt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
    Other(String),
    Unspecified,
}

impl Direction {
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => Direction::Down,
            "1" => Direction::Up,
            "" => Direction::Unspecified,
            other => Direction::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Direction::Down => "하행 ⬇️",
            Direction::Up => "상행 ⬆️",
            Direction::Other(raw) => raw,
            Direction::Unspecified => "미정",
        }
    }
}

/// Operating status (`trainSttus`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainStatus {
    Running,
    Arriving,
    WaitingToDepart,
    Terminated,
    Other(String),
    Unknown,
}

impl TrainStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => TrainStatus::Running,
            "1" => TrainStatus::Arriving,
            "2" => TrainStatus::WaitingToDepart,
            "3" => TrainStatus::Terminated,
            "" => TrainStatus::Unknown,
            other => TrainStatus::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TrainStatus::Running => "운행중 🟢",
            TrainStatus::Arriving => "진입중 🟡",
            TrainStatus::WaitingToDepart => "출발대기 🔵",
            TrainStatus::Terminated => "종료 🔴",
            TrainStatus::Other(raw) => raw,
            TrainStatus::Unknown => "알 수 없음",
        }
    }
}

/// Last-train flag (`lstcarAt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarType {
    Regular,
    LastTrain,
    Other(String),
    Unspecified,
}

impl CarType {
    pub fn from_code(code: &str) -> Self {
        match code {
            "0" => CarType::Regular,
            "1" => CarType::LastTrain,
            "" => CarType::Unspecified,
            other => CarType::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CarType::Regular => "막차아님 🚇",
            CarType::LastTrain => "막차 🌙",
            CarType::Other(raw) => raw,
            CarType::Unspecified => "일반",
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

// ============================================================================
// Row Extraction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowField {
    TrainNo,
    StationName,
    Status,
    Direction,
    LastCarFlag,
    ReceivedAt,
}

impl RowField {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"trainNo" => Some(RowField::TrainNo),
            b"statnNm" => Some(RowField::StationName),
            b"trainSttus" => Some(RowField::Status),
            b"directAt" => Some(RowField::Direction),
            b"lstcarAt" => Some(RowField::LastCarFlag),
            b"recptnDt" => Some(RowField::ReceivedAt),
            _ => None,
        }
    }
}

/// Child texts of one `row`; `None` until the first matching element closes.
#[derive(Debug, Default)]
struct RawRow {
    train_no: Option<String>,
    station_name: Option<String>,
    status: Option<String>,
    direction: Option<String>,
    last_car_flag: Option<String>,
    received_at: Option<String>,
}

impl RawRow {
    fn slot(&mut self, field: RowField) -> &mut Option<String> {
        match field {
            RowField::TrainNo => &mut self.train_no,
            RowField::StationName => &mut self.station_name,
            RowField::Status => &mut self.status,
            RowField::Direction => &mut self.direction,
            RowField::LastCarFlag => &mut self.last_car_flag,
            RowField::ReceivedAt => &mut self.received_at,
        }
    }

    /// Keeps only the first occurrence of each child element.
    fn fill(&mut self, field: RowField, text: String) {
        let slot = self.slot(field);
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    fn into_record(self, position: usize, now: &str) -> TrainRecord {
        TrainRecord {
            train_no: or_default(self.train_no, || format!("열차{}", position)),
            station_name: or_default(self.station_name, || "정보없음".to_string()),
            status: or_default(self.status, || "운행중".to_string()),
            direction: or_default(self.direction, || "상행".to_string()),
            last_car_flag: or_default(self.last_car_flag, || "일반".to_string()),
            received_at: or_default(self.received_at, || now.to_string()),
        }
    }
}

fn or_default(value: Option<String>, default: impl FnOnce() -> String) -> String {
    match value {
        Some(text) if !text.is_empty() => text,
        _ => default(),
    }
}

// ============================================================================
// Main Implementation
// ============================================================================

pub struct SSTModels;

impl SSTModels {
    /// Parse the position feed into train records, in document order.
    ///
    /// Malformed XML never propagates: it degrades to an empty list.
    pub fn parse_xml_data(xml_text: &str) -> Vec<TrainRecord> {
        let now = Self::format_local(&Self::now_seoul());
        match Self::read_rows(xml_text) {
            Ok(rows) => rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| row.into_record(i + 1, &now))
                .collect(),
            Err(e) => {
                debug!("XML parsing error: {}", e);
                Vec::new()
            }
        }
    }

    fn read_rows(xml_text: &str) -> Result<Vec<RawRow>> {
        // Child text is kept verbatim, whitespace included
        let mut reader = Reader::from_str(xml_text);

        let mut rows = Vec::new();
        let mut current: Option<RawRow> = None;
        let mut field: Option<(RowField, usize)> = None;
        let mut text = String::new();
        let mut depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    let name = e.local_name();
                    if name.as_ref() == b"row" {
                        if current.is_none() {
                            current = Some(RawRow::default());
                        }
                    } else if current.is_some() && field.is_none() {
                        if let Some(f) = RowField::from_tag(name.as_ref()) {
                            field = Some((f, depth));
                            text.clear();
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = e.local_name();
                    if name.as_ref() == b"row" {
                        if current.is_none() {
                            rows.push(RawRow::default());
                        }
                    } else if let (Some(row), None) = (current.as_mut(), field) {
                        if let Some(f) = RowField::from_tag(name.as_ref()) {
                            row.fill(f, String::new());
                        }
                    }
                }
                Ok(Event::Text(e)) => {
                    if field.is_some() {
                        let unescaped = e
                            .unescape()
                            .map_err(|e| TrackerError::ParseError(e.to_string()))?;
                        text.push_str(&unescaped);
                    }
                }
                Ok(Event::CData(e)) => {
                    if field.is_some() {
                        let raw = std::str::from_utf8(&e)
                            .map_err(|e| TrackerError::ParseError(e.to_string()))?;
                        text.push_str(raw);
                    }
                }
                Ok(Event::End(e)) => {
                    if let Some((f, open_depth)) = field {
                        if open_depth == depth {
                            if let Some(row) = current.as_mut() {
                                row.fill(f, std::mem::take(&mut text));
                            }
                            field = None;
                        }
                    } else if e.local_name().as_ref() == b"row" {
                        if let Some(row) = current.take() {
                            rows.push(row);
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(TrackerError::ParseError(e.to_string())),
                _ => {}
            }
        }

        if depth != 0 || current.is_some() {
            return Err(TrackerError::ParseError(format!(
                "document ended with {} unclosed element(s)",
                depth
            )));
        }

        Ok(rows)
    }

    /// Fixed records shown when live data cannot be retrieved.
    pub fn sample_trains(received_at: &str) -> Vec<TrainRecord> {
        let sample = |train_no: &str, station: &str, status: &str, direction: &str, last_car: &str| {
            TrainRecord {
                train_no: train_no.to_string(),
                station_name: station.to_string(),
                status: status.to_string(),
                direction: direction.to_string(),
                last_car_flag: last_car.to_string(),
                received_at: received_at.to_string(),
            }
        };

        vec![
            sample("7001", "강남구청역", "0", "1", "1"),
            sample("7002", "논현역", "1", "0", "0"),
            sample("7003", "반포역", "0", "1", "1"),
        ]
    }

    pub fn now_seoul() -> DateTime<Tz> {
        Utc::now().with_timezone(&Seoul)
    }

    pub fn format_local(time: &DateTime<Tz>) -> String {
        time.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ROWS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<realtimePosition>
    <RESULT><CODE>INFO-000</CODE><MESSAGE>정상 처리되었습니다.</MESSAGE></RESULT>
    <row>
        <subwayNm>7호선</subwayNm>
        <statnNm>청담</statnNm>
        <trainNo>7124</trainNo>
        <recptnDt>2024-05-01 08:15:02</recptnDt>
        <directAt>1</directAt>
        <trainSttus>0</trainSttus>
        <lstcarAt>0</lstcarAt>
    </row>
    <row>
        <statnNm>학동</statnNm>
        <trainNo>7131</trainNo>
        <recptnDt>2024-05-01 08:15:09</recptnDt>
        <trainSttus>1</trainSttus>
        <lstcarAt>1</lstcarAt>
    </row>
</realtimePosition>"#;

    #[test]
    fn test_parse_rows_in_document_order() {
        let trains = SSTModels::parse_xml_data(TWO_ROWS);
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[0].train_no, "7124");
        assert_eq!(trains[0].station_name, "청담");
        assert_eq!(trains[0].status, "0");
        assert_eq!(trains[0].direction, "1");
        assert_eq!(trains[0].received_at, "2024-05-01 08:15:02");
        assert_eq!(trains[1].train_no, "7131");
        assert_eq!(trains[1].station_name, "학동");
    }

    #[test]
    fn test_missing_child_takes_default() {
        let trains = SSTModels::parse_xml_data(TWO_ROWS);
        assert_eq!(trains[1].direction, "상행");
    }

    #[test]
    fn test_all_defaults_for_empty_row() {
        let trains = SSTModels::parse_xml_data("<root><row></row><row/></root>");
        assert_eq!(trains.len(), 2);
        assert_eq!(trains[1].train_no, "열차2");
        let train = &trains[0];
        assert_eq!(train.train_no, "열차1");
        assert_eq!(train.station_name, "정보없음");
        assert_eq!(train.status, "운행중");
        assert_eq!(train.direction, "상행");
        assert_eq!(train.last_car_flag, "일반");
        assert!(train.received_at.contains(':'));
    }

    #[test]
    fn test_placeholder_uses_position() {
        let xml = "<root><row><trainNo>1001</trainNo></row><row><statnNm>서울역</statnNm></row></root>";
        let trains = SSTModels::parse_xml_data(xml);
        assert_eq!(trains[0].train_no, "1001");
        assert_eq!(trains[1].train_no, "열차2");
    }

    #[test]
    fn test_empty_elements_take_defaults() {
        let xml = "<root><row><trainNo></trainNo><directAt/><statnNm>서울역</statnNm></row></root>";
        let trains = SSTModels::parse_xml_data(xml);
        assert_eq!(trains.len(), 1);
        assert_eq!(trains[0].train_no, "열차1");
        assert_eq!(trains[0].direction, "상행");
        assert_eq!(trains[0].station_name, "서울역");
    }

    #[test]
    fn test_whitespace_text_is_kept() {
        let xml = "<root>\n  <row>\n    <statnNm>  </statnNm>\n    <trainNo> 7001 </trainNo>\n  </row>\n</root>";
        let trains = SSTModels::parse_xml_data(xml);
        assert_eq!(trains.len(), 1);
        assert_eq!(trains[0].station_name, "  ");
        assert_eq!(trains[0].train_no, " 7001 ");
        assert_eq!(trains[0].status, "운행중");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let xml = "<root><row><trainNo>1</trainNo><trainNo>2</trainNo></row></root>";
        let trains = SSTModels::parse_xml_data(xml);
        assert_eq!(trains[0].train_no, "1");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = "<root><row><statnNm>A &amp; B</statnNm><trainNo><![CDATA[K-12]]></trainNo></row></root>";
        let trains = SSTModels::parse_xml_data(xml);
        assert_eq!(trains[0].station_name, "A & B");
        assert_eq!(trains[0].train_no, "K-12");
    }

    #[test]
    fn test_empty_root_has_no_rows() {
        assert!(SSTModels::parse_xml_data("<root></root>").is_empty());
        assert!(SSTModels::parse_xml_data("").is_empty());
    }

    #[test]
    fn test_malformed_xml_is_empty() {
        assert!(SSTModels::parse_xml_data("<root><row><trainNo>1</trainNo></root>").is_empty());
        assert!(SSTModels::parse_xml_data("<root><row><trainNo>1</trainNo>").is_empty());
    }

    #[test]
    fn test_direction_table() {
        assert_eq!(Direction::from_code("0").label(), "하행 ⬇️");
        assert_eq!(Direction::from_code("1").label(), "상행 ⬆️");
        assert_eq!(Direction::from_code("상행").label(), "상행");
        assert_eq!(Direction::from_code("").label(), "미정");
    }

    #[test]
    fn test_status_table() {
        assert_eq!(TrainStatus::from_code("0").label(), "운행중 🟢");
        assert_eq!(TrainStatus::from_code("1").label(), "진입중 🟡");
        assert_eq!(TrainStatus::from_code("2").label(), "출발대기 🔵");
        assert_eq!(TrainStatus::from_code("3").label(), "종료 🔴");
        assert_eq!(TrainStatus::from_code("9").label(), "9");
        assert_eq!(TrainStatus::from_code("").label(), "알 수 없음");
    }

    #[test]
    fn test_car_type_table() {
        assert_eq!(CarType::from_code("0").label(), "막차아님 🚇");
        assert_eq!(CarType::from_code("1").label(), "막차 🌙");
        assert_eq!(CarType::from_code("일반").label(), "일반");
        assert_eq!(CarType::from_code("").label(), "일반");
        assert_eq!(CarType::from_code("x"), CarType::Other("x".to_string()));
    }

    #[test]
    fn test_sample_trains() {
        let trains = SSTModels::sample_trains("2024-05-01 09:00:00");
        let numbers: Vec<&str> = trains.iter().map(|t| t.train_no.as_str()).collect();
        assert_eq!(numbers, ["7001", "7002", "7003"]);
        assert_eq!(trains[1].station_name, "논현역");
        assert!(trains.iter().all(|t| t.received_at == "2024-05-01 09:00:00"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(TrackerError::HttpStatus(503).to_string(), "HTTP error! status: 503");
        assert!(TrackerError::NetworkError("refused".to_string()).to_string().contains("refused"));
    }
}
