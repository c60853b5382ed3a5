//! State behind the terminal dashboard: the two forms, the latest results and
//! the log console.

use std::collections::VecDeque;

use crate::competition::{Competition, StatType};
use crate::pipeline::StatsRequest;
use crate::season_table::SeasonFilter;
use crate::worker::{CompareResult, Delta, ScoutResult, WorkerCommand};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Scout,
    Compare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    OtherName,
    Competition,
    Season,
    StatType,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Player",
            Field::OtherName => "Versus",
            Field::Competition => "Competition",
            Field::Season => "Season",
            Field::StatType => "Stat type",
        }
    }

    fn is_text(self) -> bool {
        matches!(self, Field::Name | Field::OtherName | Field::Season)
    }
}

const SCOUT_FIELDS: [Field; 4] = [Field::Name, Field::Competition, Field::Season, Field::StatType];
const COMPARE_FIELDS: [Field; 5] = [
    Field::Name,
    Field::OtherName,
    Field::Competition,
    Field::Season,
    Field::StatType,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub name: String,
    pub other_name: String,
    pub competition: Competition,
    pub season: String,
    pub stat_type: StatType,
}

impl Default for Form {
    fn default() -> Self {
        Self {
            name: String::new(),
            other_name: String::new(),
            competition: Competition::DomesticLeagues,
            season: "all".to_string(),
            stat_type: StatType::Standard,
        }
    }
}

impl Form {
    pub fn value(&self, field: Field) -> String {
        match field {
            Field::Name => self.name.clone(),
            Field::OtherName => self.other_name.clone(),
            Field::Competition => format!("{} ({})", self.competition.code(), self.competition.label()),
            Field::Season => self.season.clone(),
            Field::StatType => self.stat_type.key().to_string(),
        }
    }

    fn text_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Name => Some(&mut self.name),
            Field::OtherName => Some(&mut self.other_name),
            Field::Season => Some(&mut self.season),
            Field::Competition | Field::StatType => None,
        }
    }

    fn request(&self) -> StatsRequest {
        StatsRequest {
            competition: self.competition,
            season: SeasonFilter::parse(Some(&self.season)),
            stat_type: self.stat_type,
        }
    }
}

pub struct DashboardState {
    pub screen: Screen,
    pub form: Form,
    pub focus: Field,
    pub busy: bool,
    pub scout_result: Option<ScoutResult>,
    pub compare_result: Option<CompareResult>,
    pub last_error: Option<String>,
    pub stats_scroll: usize,
    pub logs: VecDeque<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Scout,
            form: Form::default(),
            focus: Field::Name,
            busy: false,
            scout_result: None,
            compare_result: None,
            last_error: None,
            stats_scroll: 0,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        match self.screen {
            Screen::Scout => &SCOUT_FIELDS,
            Screen::Compare => &COMPARE_FIELDS,
        }
    }

    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        if !self.fields().contains(&self.focus) {
            self.focus = Field::Name;
        }
    }

    pub fn focus_next(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + fields.len() - 1) % fields.len()];
    }

    /// Typing into a selector field cycles it instead.
    pub fn input_char(&mut self, c: char) {
        if let Some(text) = self.form.text_mut(self.focus) {
            text.push(c);
        } else if c == ' ' {
            self.cycle_focused();
        }
    }

    pub fn backspace(&mut self) {
        if let Some(text) = self.form.text_mut(self.focus) {
            text.pop();
        }
    }

    pub fn cycle_focused(&mut self) {
        match self.focus {
            Field::Competition => self.form.competition = self.form.competition.next(),
            Field::StatType => self.form.stat_type = self.form.stat_type.next(),
            _ => {}
        }
    }

    pub fn focused_is_text(&self) -> bool {
        self.focus.is_text()
    }

    pub fn scroll_stats(&mut self, delta: isize) {
        let rows = self
            .scout_result
            .as_ref()
            .and_then(|r| r.report.stats.as_ref())
            .and_then(|outcome| outcome.as_ref().ok())
            .map(|stats| stats.rows().count())
            .unwrap_or(0);
        self.stats_scroll = self
            .stats_scroll
            .saturating_add_signed(delta)
            .min(rows.saturating_sub(1));
    }

    /// Validates the current form into a worker command.
    pub fn build_command(&self) -> Result<WorkerCommand, String> {
        let name = self.form.name.trim();
        if name.is_empty() {
            return Err("player name is empty".to_string());
        }
        let request = self.form.request();
        match self.screen {
            Screen::Scout => Ok(WorkerCommand::Scout {
                name: name.to_string(),
                request,
            }),
            Screen::Compare => {
                let other = self.form.other_name.trim();
                if other.is_empty() {
                    return Err("comparison needs exactly two player names".to_string());
                }
                Ok(WorkerCommand::Compare {
                    names: [name.to_string(), other.to_string()],
                    request,
                })
            }
        }
    }

    pub fn apply_delta(&mut self, delta: Delta) {
        match delta {
            Delta::Log(msg) => self.push_log(msg),
            Delta::Scouted(result) => {
                self.busy = false;
                self.last_error = result.stats_error.clone();
                self.push_log(format!("[INFO] Loaded {}", result.report.profile.name));
                if let Some(Err(miss)) = &result.report.stats {
                    self.push_log(format!("[WARN] {}", miss.message()));
                }
                if let Some(err) = &result.stats_error {
                    self.push_log(format!("[WARN] {err}"));
                }
                self.scout_result = Some(*result);
                self.stats_scroll = 0;
            }
            Delta::Compared(result) => {
                self.busy = false;
                self.last_error = None;
                self.push_log(format!(
                    "[INFO] Compared {} and {}",
                    result.players[0], result.players[1]
                ));
                self.compare_result = Some(*result);
            }
            Delta::Failed(msg) => {
                self.busy = false;
                self.push_log(format!("[WARN] {msg}"));
                self.last_error = Some(msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardState, Field, Screen};
    use crate::competition::Competition;
    use crate::pipeline::{PlayerReport, StatsRequest};
    use crate::profile::PlayerProfile;
    use crate::search::SearchHit;
    use crate::worker::{Delta, ScoutResult, WorkerCommand};

    #[test]
    fn console_keeps_the_latest_200_lines() {
        let mut state = DashboardState::new();
        for i in 0..250 {
            state.push_log(format!("line {i}"));
        }
        assert_eq!(state.logs.len(), 200);
        assert_eq!(state.logs.front().map(String::as_str), Some("line 50"));
    }

    #[test]
    fn focus_wraps_within_the_screen_fields() {
        let mut state = DashboardState::new();
        state.focus_prev();
        assert_eq!(state.focus, Field::StatType);
        state.set_screen(Screen::Compare);
        state.focus = Field::Name;
        state.focus_next();
        assert_eq!(state.focus, Field::OtherName);
        state.set_screen(Screen::Scout);
        assert_eq!(state.focus, Field::Name);
    }

    #[test]
    fn typing_edits_text_and_space_cycles_selectors() {
        let mut state = DashboardState::new();
        for c in "Pedri".chars() {
            state.input_char(c);
        }
        state.backspace();
        assert_eq!(state.form.name, "Pedr");
        state.focus = Field::Competition;
        state.input_char(' ');
        assert_eq!(state.form.competition, Competition::DomesticCups);
    }

    #[test]
    fn compare_requires_two_names() {
        let mut state = DashboardState::new();
        state.set_screen(Screen::Compare);
        state.form.name = "Pedri".to_string();
        assert!(state.build_command().is_err());
        state.form.other_name = "Gavi".to_string();
        assert!(matches!(
            state.build_command(),
            Ok(WorkerCommand::Compare { .. })
        ));
    }

    #[test]
    fn failure_clears_busy_and_is_logged() {
        let mut state = DashboardState::new();
        state.busy = true;
        state.apply_delta(Delta::Failed("search failed".to_string()));
        assert!(!state.busy);
        assert_eq!(state.last_error.as_deref(), Some("search failed"));
        assert_eq!(state.logs.back().map(String::as_str), Some("[WARN] search failed"));
    }

    #[test]
    fn stats_download_failure_keeps_the_passport() {
        let mut state = DashboardState::new();
        state.busy = true;
        let profile = PlayerProfile {
            name: "Lamine Yamal".to_string(),
            ..PlayerProfile::default()
        };
        state.apply_delta(Delta::Scouted(Box::new(ScoutResult {
            report: PlayerReport {
                hit: SearchHit {
                    text: "Lamine Yamal".to_string(),
                    url: "https://fbref.com/en/players/82ec26c1/Lamine-Yamal".to_string(),
                },
                profile,
                stats: None,
            },
            request: StatsRequest::parse("nt", "all", "standard").expect("valid"),
            passport: Some("output/passport/passport_Lamine_Yamal.html".into()),
            csv: None,
            stats_error: Some("download failed: stats page".to_string()),
        })));

        assert!(!state.busy);
        let result = state.scout_result.as_ref().expect("result kept");
        assert!(result.passport.is_some());
        assert_eq!(state.last_error.as_deref(), Some("download failed: stats page"));
        assert_eq!(
            state.logs.back().map(String::as_str),
            Some("[WARN] download failed: stats page")
        );
    }
}
