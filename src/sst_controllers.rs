// Controllers for the Seoul subway tracker
use crate::sst_config::TrackerConfig;
use crate::sst_models::{Result, SSTModels, SUBWAY_LINES, TrainRecord};
use crate::sst_requester::Requester;
use crate::sst_views::{SSTViews, Screen, StatusKind, StatusLine, TerminalScreen};
use log::{error, info};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// ============================================================================
// Tracker
// ============================================================================

/// Fetch → parse → render pipeline plus the selected line.
///
/// Clones share the same selection and screen, so a poller tick and a manual
/// search drive the same view. Overlapping fetches are not sequenced; the
/// last one to finish is what stays on screen.
pub struct Tracker<S: Screen> {
    requester: Arc<Requester>,
    selected_line: Arc<Mutex<Option<String>>>,
    screen: Arc<Mutex<S>>,
}

impl<S: Screen> Clone for Tracker<S> {
    fn clone(&self) -> Self {
        Tracker {
            requester: self.requester.clone(),
            selected_line: self.selected_line.clone(),
            screen: self.screen.clone(),
        }
    }
}

impl<S: Screen> Tracker<S> {
    pub fn new(requester: Requester, screen: S, initial_line: Option<String>) -> Self {
        Tracker {
            requester: Arc::new(requester),
            selected_line: Arc::new(Mutex::new(initial_line)),
            screen: Arc::new(Mutex::new(screen)),
        }
    }

    pub fn screen(&self) -> MutexGuard<'_, S> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_line(&self) -> Option<String> {
        self.selected_line
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn select_line(&self, line: impl Into<String>) {
        let line = line.into();
        info!("Selected line {}", line);
        *self.selected_line.lock().unwrap_or_else(PoisonError::into_inner) = Some(line);
    }

    pub fn load_initial_data(&self) {
        let message = match self.current_line() {
            Some(line) => format!("{}을 선택하고 검색 버튼을 눌러주세요.", line),
            None => "노선을 선택하고 검색 버튼을 눌러주세요.".to_string(),
        };
        self.set_status(message, StatusKind::Info);
    }

    /// Select `line` and fetch it.
    pub async fn search(&self, line: &str) {
        self.select_line(line);
        self.fetch_train_data(line).await;
    }

    /// Fetch the selected line; does nothing when no line is selected.
    pub async fn refresh(&self) {
        if let Some(line) = self.current_line() {
            self.fetch_train_data(&line).await;
        }
    }

    /// Run the pipeline for `line`. Any failure falls back to the sample data.
    pub async fn fetch_train_data(&self, line: &str) {
        self.set_status(format!("{} 실시간 위치 정보를 가져오는 중...", line), StatusKind::Loading);

        match self.load_trains(line).await {
            Ok(trains) => {
                self.display_trains(&trains);
                self.set_status(
                    format!("{} 실시간 위치 정보 ({}개 열차)", line, trains.len()),
                    StatusKind::Success,
                );
            }
            Err(e) => {
                error!("Error fetching train data for {}: {}", line, e);
                self.set_status(
                    "데이터를 가져오는 중 오류가 발생했습니다. CORS 정책으로 인해 직접 접근이 제한될 수 있습니다.",
                    StatusKind::Error,
                );
                self.show_sample_data(line);
            }
        }
    }

    async fn load_trains(&self, line: &str) -> Result<Vec<TrainRecord>> {
        let xml_text = self.requester.fetch(line).await?;
        Ok(SSTModels::parse_xml_data(&xml_text))
    }

    pub fn show_sample_data(&self, line: &str) {
        let now = SSTModels::format_local(&SSTModels::now_seoul());
        self.display_trains(&SSTModels::sample_trains(&now));
        self.set_status(
            format!("{} 샘플 데이터 (실제 API 접근 제한으로 인한 데모)", line),
            StatusKind::Info,
        );
    }

    fn display_trains(&self, trains: &[TrainRecord]) {
        let list = SSTViews::render(trains, &SSTModels::now_seoul());
        self.screen().show_trains(list);
    }

    fn set_status(&self, message: impl Into<String>, kind: StatusKind) {
        self.screen().set_status(StatusLine::new(message, kind));
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Repeating timer driving refreshes. At most one timer is active.
#[derive(Debug, Default)]
pub struct Poller {
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

    /// Start calling `tick` every `interval`, first call one interval from
    /// now. A timer already running is stopped first.
    ///
    /// Each tick runs as its own task: stopping the timer never cancels a
    /// refresh already under way, and a slow refresh does not hold back the
    /// next tick.
    ///
    /// Must be called inside a tokio runtime; `interval` must be non-zero.
    pub fn start<F, Fut>(&mut self, interval: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        info!("Auto refresh every {:?}", interval);

        self.handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately
            timer.tick().await;

            loop {
                timer.tick().await;
                tokio::spawn(tick());
            }
        }));
    }

    /// Stop the timer; no-op when idle. Refreshes already started run to
    /// completion.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Auto refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

/// Start `poller` refreshing `tracker`'s selected line.
pub fn start_auto_refresh<S: Screen + 'static>(poller: &mut Poller, tracker: &Tracker<S>, interval: Duration) {
    let tracker = tracker.clone();
    poller.start(interval, move || {
        let tracker = tracker.clone();
        async move { tracker.refresh().await }
    });
}

// ============================================================================
// Interactive loop
// ============================================================================

pub struct SSTControllers;

impl SSTControllers {
    /// Main application loop
    pub async fn run(config: TrackerConfig) -> Result<()> {
        let requester = Requester::new(&config)?;
        let tracker = Tracker::new(requester, TerminalScreen, config.initial_line());
        let mut poller = Poller::default();

        SSTViews::show_welcome_screen();
        tracker.load_initial_data();

        if config.watch {
            start_auto_refresh(&mut poller, &tracker, config.interval());
            SSTViews::auto_refresh_started(config.interval_secs);
        }

        let mut input = BufReader::new(tokio::io::stdin()).lines();

        loop {
            SSTViews::show_menu(tracker.current_line().as_deref(), poller.is_running());

            let Some(choice) = Self::read_input(&mut input).await else {
                break;
            };

            match choice.trim() {
                "1" => {
                    SSTViews::show_line_choices(SUBWAY_LINES);
                    let Some(answer) = Self::read_input(&mut input).await else {
                        break;
                    };
                    match Self::resolve_line_choice(&answer) {
                        Some(line) => {
                            tracker.select_line(line.clone());
                            SSTViews::show_line_selected(&line);
                        }
                        None => SSTViews::no_line_selected(),
                    }
                }
                "2" => match tracker.current_line() {
                    Some(line) => tracker.search(&line).await,
                    None => SSTViews::no_line_selected(),
                },
                "3" => {
                    if tracker.current_line().is_some() {
                        tracker.refresh().await;
                    } else {
                        SSTViews::no_line_selected();
                    }
                }
                "4" => {
                    if poller.is_running() {
                        poller.stop();
                        SSTViews::auto_refresh_stopped();
                    } else {
                        start_auto_refresh(&mut poller, &tracker, config.interval());
                        SSTViews::auto_refresh_started(config.interval_secs);
                    }
                }
                "0" => break,
                "" => {}
                other => SSTViews::invalid_choice(other),
            }
        }

        poller.stop();
        SSTViews::goodbye_message();
        Ok(())
    }

    /// Menu number (1-based) or line name. Names outside the list are
    /// accepted as typed.
    pub fn resolve_line_choice(input: &str) -> Option<String> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(number) = input.parse::<usize>() {
            if (1..=SUBWAY_LINES.len()).contains(&number) {
                return Some(SUBWAY_LINES[number - 1].to_string());
            }
        }

        let known = SUBWAY_LINES
            .iter()
            .find(|line| line.eq_ignore_ascii_case(input));
        Some(known.map_or_else(|| input.to_string(), |line| line.to_string()))
    }

    /// Next stdin line; `None` on end of input.
    async fn read_input(input: &mut Lines<BufReader<Stdin>>) -> Option<String> {
        match input.next_line().await {
            Ok(line) => line,
            Err(e) => {
                eprintln!("⚠️  Error reading input: {}", e);
                None
            }
        }
    }
}
