// Views for the Seoul subway tracker
use crate::sst_models::{CarType, Direction, SSTModels, TrainRecord, TrainStatus};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, Write};

pub const NO_DATA_MESSAGE: &str = "현재 운행중인 열차 정보가 없습니다.";

// ============================================================================
// Status line
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Info,
    Loading,
    Success,
    Error,
}

impl StatusKind {
    /// Style modifier appended to the base class; `Info` is the bare style.
    pub fn modifier(&self) -> Option<&'static str> {
        match self {
            StatusKind::Info => None,
            StatusKind::Loading => Some("loading"),
            StatusKind::Success => Some("success"),
            StatusKind::Error => Some("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub message: String,
    pub kind: StatusKind,
}

impl StatusLine {
    pub fn new(message: impl Into<String>, kind: StatusKind) -> Self {
        StatusLine {
            message: message.into(),
            kind,
        }
    }

    pub fn class_name(&self) -> String {
        match self.kind.modifier() {
            Some(modifier) => format!("status {}", modifier),
            None => "status".to_string(),
        }
    }
}

// ============================================================================
// Rendered list
// ============================================================================

/// Display block for one train, with every code already mapped to its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainCard {
    pub train_no: String,
    pub direction: String,
    pub station_name: String,
    pub status: String,
    pub car_type: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainList {
    /// The "no running trains" placeholder
    Empty,
    Trains(Vec<TrainCard>),
}

impl TrainList {
    pub fn cards(&self) -> &[TrainCard] {
        match self {
            TrainList::Empty => &[],
            TrainList::Trains(cards) => cards,
        }
    }
}

// ============================================================================
// Screens
// ============================================================================

/// Display surface the pipeline writes to. Each call replaces what was shown
/// before.
pub trait Screen: Send {
    fn set_status(&mut self, status: StatusLine);
    fn show_trains(&mut self, list: TrainList);
}

/// Screen that keeps only the latest status and list in memory.
#[derive(Debug, Default)]
pub struct MemoryScreen {
    status: Option<StatusLine>,
    list: Option<TrainList>,
}

impl MemoryScreen {
    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn list(&self) -> Option<&TrainList> {
        self.list.as_ref()
    }
}

impl Screen for MemoryScreen {
    fn set_status(&mut self, status: StatusLine) {
        self.status = Some(status);
    }

    fn show_trains(&mut self, list: TrainList) {
        self.list = Some(list);
    }
}

/// Screen printing to stdout with ANSI styling.
#[derive(Debug, Default)]
pub struct TerminalScreen;

impl Screen for TerminalScreen {
    fn set_status(&mut self, status: StatusLine) {
        println!("{}", SSTViews::format_status(&status));
        let _ = io::stdout().flush();
    }

    fn show_trains(&mut self, list: TrainList) {
        print!("{}", SSTViews::format_list(&list));
        let _ = io::stdout().flush();
    }
}

// ============================================================================
// Rendering
// ============================================================================

pub struct SSTViews;

impl SSTViews {
    /// Map train records to display cards, keeping their order.
    pub fn render(trains: &[TrainRecord], now: &DateTime<Tz>) -> TrainList {
        if trains.is_empty() {
            return TrainList::Empty;
        }

        TrainList::Trains(trains.iter().map(|train| Self::train_card(train, now)).collect())
    }

    pub fn train_card(train: &TrainRecord, now: &DateTime<Tz>) -> TrainCard {
        TrainCard {
            train_no: train.train_no.clone(),
            direction: Direction::from_code(&train.direction).label().to_string(),
            station_name: train.station_name.clone(),
            status: TrainStatus::from_code(&train.status).label().to_string(),
            car_type: CarType::from_code(&train.last_car_flag).label().to_string(),
            updated_at: Self::format_time(&train.received_at, now),
        }
    }

    /// Date-like timestamps pass through; anything else becomes `now`.
    pub fn format_time(time: &str, now: &DateTime<Tz>) -> String {
        if time.is_empty() {
            return "정보없음".to_string();
        }

        if time.contains('-') || time.contains(':') {
            return time.to_string();
        }

        SSTModels::format_local(now)
    }

    pub fn format_list(list: &TrainList) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", "═".repeat(60));

        match list {
            TrainList::Empty => {
                let _ = writeln!(out, "\n  {}", NO_DATA_MESSAGE);
            }
            TrainList::Trains(cards) => {
                for (i, card) in cards.iter().enumerate() {
                    if i > 0 {
                        let _ = writeln!(out, "{}", "  ┄".repeat(20));
                    }
                    Self::format_card(&mut out, card);
                }
            }
        }

        let _ = writeln!(out, "{}", "═".repeat(60));
        out
    }

    fn format_card(out: &mut String, card: &TrainCard) {
        let _ = writeln!(out, "\n  🚇 {}    {}", card.train_no, card.direction);
        let _ = writeln!(out, "     📍 현재 위치      {}", card.station_name);
        let _ = writeln!(out, "     🚦 운행 상태      {}", card.status);
        let _ = writeln!(out, "     🚃 차량 타입      {}", card.car_type);
        let _ = writeln!(out, "     ⏰ 업데이트 시간  {}", card.updated_at);
    }

    /// Status line with an ANSI color per kind.
    pub fn format_status(status: &StatusLine) -> String {
        let (icon, color) = match status.kind {
            StatusKind::Info => ("ℹ️ ", "0"),
            StatusKind::Loading => ("🔄", "36"),
            StatusKind::Success => ("✓ ", "32"),
            StatusKind::Error => ("❌", "31"),
        };
        format!("\x1b[{}m{} {}\x1b[0m", color, icon, status.message)
    }

    // ========================================================================
    // Menu
    // ========================================================================

    pub fn show_welcome_screen() {
        println!("\n{}", "═".repeat(60));
        println!("  ╔════════════════════════════════════════════════════╗");
        println!("  ║     🚇 SEOUL SUBWAY - 실시간 열차 위치 정보          ║");
        println!("  ╚════════════════════════════════════════════════════╝");
        println!("{}", "═".repeat(60));
        println!("\n  🌐 Data source: Seoul Open Data Plaza");
        println!("     http://swopenapi.seoul.go.kr/");
        println!("\n{}", "═".repeat(60));
    }

    pub fn show_menu(selected_line: Option<&str>, auto_refresh: bool) {
        println!("\n{}", "─".repeat(60));
        println!(
            "  노선: {}    자동 새로고침: {}",
            selected_line.unwrap_or("선택 안 됨"),
            if auto_refresh { "ON 🔄" } else { "OFF" }
        );
        println!("{}", "─".repeat(60));
        println!("  1️⃣  노선 선택");
        println!("  2️⃣  검색");
        println!("  3️⃣  새로고침");
        println!("  4️⃣  자동 새로고침 켜기/끄기");
        println!("  0️⃣  종료");
        println!("{}", "─".repeat(60));
        print!("➜ 선택: ");
        let _ = io::stdout().flush();
    }

    pub fn show_line_choices(lines: &[&str]) {
        println!("\n🚇 노선 목록");
        for chunk in lines.iter().enumerate().collect::<Vec<_>>().chunks(5) {
            let row: Vec<String> = chunk
                .iter()
                .map(|(i, line)| format!("{:>2}. {}", i + 1, line))
                .collect();
            println!("  {}", row.join("   "));
        }
        print!("➜ 번호 또는 노선 이름: ");
        let _ = io::stdout().flush();
    }

    pub fn show_line_selected(line: &str) {
        println!("\n✓ {} 선택됨", line);
    }

    pub fn no_line_selected() {
        println!("\n✗ 선택된 노선이 없습니다. 먼저 노선을 선택해 주세요.");
    }

    pub fn invalid_choice(choice: &str) {
        println!("\n✗ 잘못된 선택 '{}'. 0-4 중에서 골라 주세요.", choice);
    }

    pub fn auto_refresh_started(interval_secs: u64) {
        println!("\n🔄 자동 새로고침 시작 ({}초마다)", interval_secs);
    }

    pub fn auto_refresh_stopped() {
        println!("\n⏹️  자동 새로고침 중지");
    }

    pub fn goodbye_message() {
        println!("\n{}", "═".repeat(60));
        println!("       👋 이용해 주셔서 감사합니다!");
        println!("{}", "═".repeat(60));
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Seoul;

    fn fixed_now() -> DateTime<Tz> {
        Seoul.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn record(status: &str, direction: &str, last_car: &str, received_at: &str) -> TrainRecord {
        TrainRecord {
            train_no: "7001".to_string(),
            station_name: "강남구청역".to_string(),
            status: status.to_string(),
            direction: direction.to_string(),
            last_car_flag: last_car.to_string(),
            received_at: received_at.to_string(),
        }
    }

    #[test]
    fn test_empty_renders_placeholder() {
        assert_eq!(SSTViews::render(&[], &fixed_now()), TrainList::Empty);
        let text = SSTViews::format_list(&TrainList::Empty);
        assert!(text.contains(NO_DATA_MESSAGE));
    }

    #[test]
    fn test_card_labels() {
        let card = SSTViews::train_card(&record("2", "0", "1", "2024-05-01 09:29:58"), &fixed_now());
        assert_eq!(card.train_no, "7001");
        assert_eq!(card.direction, "하행 ⬇️");
        assert_eq!(card.station_name, "강남구청역");
        assert_eq!(card.status, "출발대기 🔵");
        assert_eq!(card.car_type, "막차 🌙");
        assert_eq!(card.updated_at, "2024-05-01 09:29:58");
    }

    #[test]
    fn test_unknown_and_empty_codes() {
        let card = SSTViews::train_card(&record("7", "X", "", "x"), &fixed_now());
        assert_eq!(card.status, "7");
        assert_eq!(card.direction, "X");
        assert_eq!(card.car_type, "일반");

        let card = SSTViews::train_card(&record("", "", "Q", "x"), &fixed_now());
        assert_eq!(card.status, "알 수 없음");
        assert_eq!(card.direction, "미정");
        assert_eq!(card.car_type, "Q");
    }

    #[test]
    fn test_format_time() {
        let now = fixed_now();
        assert_eq!(SSTViews::format_time("2024-05-01", &now), "2024-05-01");
        assert_eq!(SSTViews::format_time("09:12", &now), "09:12");
        assert_eq!(SSTViews::format_time("20240501091200", &now), "2024-05-01 09:30:00");
        assert_eq!(SSTViews::format_time("", &now), "정보없음");
    }

    #[test]
    fn test_render_keeps_order() {
        let mut second = record("0", "1", "0", "2024-05-01 09:00:00");
        second.train_no = "7002".to_string();
        let list = SSTViews::render(&[record("1", "0", "0", "10:00"), second], &fixed_now());
        let numbers: Vec<&str> = list.cards().iter().map(|c| c.train_no.as_str()).collect();
        assert_eq!(numbers, ["7001", "7002"]);
        let text = SSTViews::format_list(&list);
        assert!(text.find("진입중").unwrap() < text.find("운행중").unwrap());
    }

    #[test]
    fn test_status_class_names() {
        assert_eq!(StatusLine::new("a", StatusKind::Info).class_name(), "status");
        assert_eq!(StatusLine::new("a", StatusKind::Loading).class_name(), "status loading");
        assert_eq!(StatusLine::new("a", StatusKind::Success).class_name(), "status success");
        assert_eq!(StatusLine::new("a", StatusKind::Error).class_name(), "status error");
    }

    #[test]
    fn test_memory_screen_keeps_latest() {
        let mut screen = MemoryScreen::default();
        screen.set_status(StatusLine::new("first", StatusKind::Loading));
        screen.set_status(StatusLine::new("second", StatusKind::Success));
        screen.show_trains(TrainList::Empty);
        assert_eq!(screen.status().unwrap().message, "second");
        assert_eq!(screen.list(), Some(&TrainList::Empty));

        screen.show_trains(TrainList::Trains(Vec::new()));
        assert_eq!(screen.list(), Some(&TrainList::Trains(Vec::new())));
    }
}
