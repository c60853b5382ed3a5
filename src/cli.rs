//! The `scout` command-line tool.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::compare::render_text;
use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::export::{ExportLabel, to_csv, to_json, to_passport_html, to_xlsx, write_chart_svg};
use crate::fetch::PageSource;
use crate::pipeline::{Comparison, PlayerReport, Scout, ScoutError, Stage, StatsRequest, compare_reports};
use crate::season_table::StatsOutcome;

pub const EXIT_OK: i32 = 0;
pub const EXIT_SEARCH_FAILED: i32 = 2;
pub const EXIT_NO_RESULTS: i32 = 3;
pub const EXIT_DOWNLOAD_FAILED: i32 = 4;
pub const EXIT_EXTRACTION_FAILED: i32 = 5;
pub const EXIT_INVALID_INPUT: i32 = 64;

const CHART_HALF_WIDTH: usize = 24;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "scout",
    about = "Look up a player's profile and season stats on fbref",
    after_help = "Competitions: all, dl, dc, ic, nt. Stat types: standard, shooting, passing, \
                  passing_types, gca, defense, possession, playing_time, misc, keeper, keeper_adv."
)]
pub struct Args {
    /// Player name; several words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub name: Vec<String>,

    #[arg(long)]
    pub competition: Option<String>,

    /// Season label such as 2023-2024, "all" for every season or "career"
    /// for the totals row.
    #[arg(long)]
    pub season: Option<String>,

    #[arg(long)]
    pub stat_type: Option<String>,

    /// Second player to compare against (needs the three stats flags).
    #[arg(long)]
    pub compare_with: Option<String>,

    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub xlsx: bool,

    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    #[arg(long)]
    pub passport_dir: Option<PathBuf>,

    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Checked form of [`Args`]; building it never touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: String,
    pub stats: Option<StatsRequest>,
    pub compare_with: Option<String>,
    pub json: bool,
    pub xlsx: bool,
}

impl Args {
    pub fn plan(&self) -> Result<Plan, ScrapeError> {
        let name = self.name.join(" ").trim().to_string();
        if name.is_empty() {
            return Err(ScrapeError::InvalidInput("player name is empty".to_string()));
        }

        let flags = [&self.competition, &self.season, &self.stat_type];
        let given = flags.iter().filter(|flag| flag.is_some()).count();
        let stats = match (&self.competition, &self.season, &self.stat_type) {
            (Some(competition), Some(season), Some(stat_type)) => {
                Some(StatsRequest::parse(competition, season, stat_type)?)
            }
            (None, None, None) => None,
            _ => {
                return Err(ScrapeError::InvalidInput(format!(
                    "--competition, --season and --stat-type go together ({given} of 3 given)"
                )));
            }
        };

        let compare_with = match self.compare_with.as_deref().map(str::trim) {
            Some("") => {
                return Err(ScrapeError::InvalidInput(
                    "--compare-with needs a player name".to_string(),
                ));
            }
            Some(other) if stats.is_none() => {
                return Err(ScrapeError::InvalidInput(format!(
                    "comparing with {other} needs --competition, --season and --stat-type"
                )));
            }
            other => other.map(str::to_string),
        };

        Ok(Plan {
            name,
            stats,
            compare_with,
            json: self.json,
            xlsx: self.xlsx,
        })
    }

    /// Configuration with the directory flags applied.
    pub fn apply_to(&self, mut config: ScraperConfig) -> ScraperConfig {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.passport_dir {
            config.passport_dir = dir.clone();
        }
        config
    }
}

/// Exit code for a failed pipeline step.
pub fn exit_code(err: &ScoutError) -> i32 {
    match (err.stage, &err.source) {
        (_, ScrapeError::InvalidInput(_))
        | (_, ScrapeError::UnknownCompetition(_))
        | (_, ScrapeError::UnknownStatType(_)) => EXIT_INVALID_INPUT,
        (Stage::Input, _) => EXIT_INVALID_INPUT,
        (Stage::Search, ScrapeError::NoResults { .. }) => EXIT_NO_RESULTS,
        (Stage::Search, _) => EXIT_SEARCH_FAILED,
        (Stage::Download, _) => EXIT_DOWNLOAD_FAILED,
    }
}

macro_rules! say {
    ($out:expr, $($arg:tt)*) => {
        let _ = writeln!($out, $($arg)*);
    };
}

/// Runs the tool and returns the process exit code. Status lines go to
/// `out`, one per stage.
pub fn run(args: &Args, source: &mut dyn PageSource, config: &ScraperConfig, out: &mut dyn Write) -> i32 {
    let plan = match args.plan() {
        Ok(plan) => plan,
        Err(err) => {
            say!(out, "error: {err}");
            return EXIT_INVALID_INPUT;
        }
    };

    let mut scout = Scout::new(source, config);

    say!(out, "Searching for \"{}\"...", plan.name);
    let (hit, profile) = match scout.lookup(&plan.name) {
        Ok(found) => found,
        Err(err) => {
            say!(out, "error: {err}");
            return exit_code(&err);
        }
    };
    say!(out, "Found {} ({})", profile.name, hit.url);
    for (label, value) in profile.fields() {
        say!(out, "  {label:<14} {value}");
    }

    match to_passport_html(&profile, &config.passport_dir) {
        Ok((_, path)) => {
            say!(out, "Passport written to {}", path.display());
        }
        Err(err) => {
            say!(out, "error: passport export failed: {err:#}");
            return EXIT_EXTRACTION_FAILED;
        }
    }

    let stats = match &plan.stats {
        Some(request) => {
            say!(
                out,
                "Fetching {} {} stats ({})...",
                request.competition.label(),
                request.stat_type,
                request.season.label()
            );
            match scout.stats(&hit.url, request) {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    say!(out, "error: {err}");
                    return exit_code(&err);
                }
            }
        }
        None => None,
    };
    let report = PlayerReport { hit, profile, stats };

    if plan.json {
        let label = match &plan.stats {
            Some(request) => request.label(&report.profile.name),
            None => ExportLabel::new(&report.profile.name, "profile", "none", "none"),
        };
        match to_json(&report.profile, report.stats.as_ref(), &label, &config.data_dir) {
            Ok(path) => {
                say!(out, "JSON written to {}", path.display());
            }
            Err(err) => {
                say!(out, "error: json export failed: {err:#}");
                return EXIT_EXTRACTION_FAILED;
            }
        }
    }

    let (Some(request), Some(outcome)) = (&plan.stats, &report.stats) else {
        return EXIT_OK;
    };
    let code = export_stats(&report, outcome, request, &plan, config, out);
    if code != EXIT_OK {
        return code;
    }

    let Some(other) = &plan.compare_with else {
        return EXIT_OK;
    };
    say!(out, "Searching for \"{other}\" to compare...");
    let other_report = match scout.report(other, Some(request)) {
        Ok(report) => report,
        Err(err) => {
            say!(out, "error: {err}");
            return exit_code(&err);
        }
    };
    say!(out, "Found {} ({})", other_report.profile.name, other_report.hit.url);

    match compare_reports(&report, &other_report, request) {
        Ok(Comparison::Chart(chart)) => {
            let label = request.label(&format!(
                "{}_vs_{}",
                report.profile.name, other_report.profile.name
            ));
            for line in render_text(&chart, CHART_HALF_WIDTH) {
                say!(out, "{line}");
            }
            match write_chart_svg(&chart, &label, &config.chart_dir) {
                Ok(path) => {
                    say!(out, "Chart written to {}", path.display());
                    EXIT_OK
                }
                Err(err) => {
                    say!(out, "error: chart export failed: {err:#}");
                    EXIT_EXTRACTION_FAILED
                }
            }
        }
        Ok(Comparison::NothingInCommon) => {
            say!(out, "No numeric stat in common; nothing to compare");
            EXIT_EXTRACTION_FAILED
        }
        Ok(Comparison::Missing { player, miss }) => {
            say!(out, "No stats for {player}: {}", miss.message());
            EXIT_EXTRACTION_FAILED
        }
        Err(err) => {
            say!(out, "error: {err}");
            EXIT_INVALID_INPUT
        }
    }
}

fn export_stats(
    report: &PlayerReport,
    outcome: &StatsOutcome,
    request: &StatsRequest,
    plan: &Plan,
    config: &ScraperConfig,
    out: &mut dyn Write,
) -> i32 {
    let stats = match outcome {
        Ok(stats) if !stats.is_empty() => stats,
        Ok(_) => {
            say!(out, "No season rows found");
            return EXIT_EXTRACTION_FAILED;
        }
        Err(miss) => {
            say!(out, "No stats: {}", miss.message());
            return EXIT_EXTRACTION_FAILED;
        }
    };
    say!(
        out,
        "Extracted {} season(s): {}",
        stats.len(),
        stats.season_labels().join(", ")
    );

    let label = request.label(&report.profile.name);
    match to_csv(outcome, &label, &config.data_dir) {
        Ok(Some(path)) => {
            say!(out, "CSV written to {}", path.display());
        }
        Ok(None) => {
            warn!("csv export skipped");
        }
        Err(err) => {
            say!(out, "error: csv export failed: {err:#}");
            return EXIT_EXTRACTION_FAILED;
        }
    }

    if plan.xlsx {
        match to_xlsx(outcome, &label, &config.data_dir) {
            Ok(Some(path)) => {
                say!(out, "XLSX written to {}", path.display());
            }
            Ok(None) => {}
            Err(err) => {
                say!(out, "error: xlsx export failed: {err:#}");
                return EXIT_EXTRACTION_FAILED;
            }
        }
    }
    EXIT_OK
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Args, EXIT_INVALID_INPUT, run};
    use crate::config::ScraperConfig;
    use crate::fetch::{FetchOutcome, PageSource};

    struct Unreachable;

    impl PageSource for Unreachable {
        fn fetch(&mut self, url: &str) -> FetchOutcome {
            panic!("no request expected, got {url}");
        }
    }

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("scout").chain(argv.iter().copied())).expect("parses")
    }

    #[test]
    fn name_words_are_joined() {
        let plan = args(&["Lamine", "Yamal"]).plan().expect("valid");
        assert_eq!(plan.name, "Lamine Yamal");
        assert!(plan.stats.is_none());
    }

    #[test]
    fn partial_stats_flags_are_rejected_before_any_request() {
        let mut out = Vec::new();
        let code = run(
            &args(&["Pedri", "--competition", "dl", "--season", "2023-2024"]),
            &mut Unreachable,
            &ScraperConfig::default(),
            &mut out,
        );
        assert_eq!(code, EXIT_INVALID_INPUT);
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("2 of 3 given"));
    }

    #[test]
    fn compare_needs_stats_flags() {
        let err = args(&["Pedri", "--compare-with", "Gavi"]).plan().unwrap_err();
        assert!(err.to_string().contains("needs --competition"));
    }

    #[test]
    fn bad_competition_is_invalid_input() {
        let mut out = Vec::new();
        let code = run(
            &args(&[
                "Pedri",
                "--competition",
                "euro",
                "--season",
                "all",
                "--stat-type",
                "standard",
            ]),
            &mut Unreachable,
            &ScraperConfig::default(),
            &mut out,
        );
        assert_eq!(code, EXIT_INVALID_INPUT);
    }

    #[test]
    fn directory_flags_override_config() {
        let cfg = args(&["Pedri", "--data-dir", "/tmp/d", "--passport-dir", "/tmp/p"])
            .apply_to(ScraperConfig::default());
        assert_eq!(cfg.data_dir, std::path::PathBuf::from("/tmp/d"));
        assert_eq!(cfg.passport_dir, std::path::PathBuf::from("/tmp/p"));
    }
}
