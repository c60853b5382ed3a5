use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::warn;

use crate::config::ScraperConfig;
use crate::export::{to_csv, to_passport_html, write_chart_svg};
use crate::fetch::PageSource;
use crate::pipeline::{Comparison, PlayerReport, Scout, StatsRequest, compare_reports};

#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Scout {
        name: String,
        request: StatsRequest,
    },
    Compare {
        names: [String; 2],
        request: StatsRequest,
    },
}

#[derive(Debug, Clone)]
pub struct ScoutResult {
    pub report: PlayerReport,
    pub request: StatsRequest,
    pub passport: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    /// Set when the profile loaded but its stats page could not be fetched.
    pub stats_error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompareResult {
    pub players: [String; 2],
    pub request: StatsRequest,
    pub comparison: Comparison,
    pub svg: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum Delta {
    Log(String),
    Scouted(Box<ScoutResult>),
    Compared(Box<CompareResult>),
    Failed(String),
}

/// Runs every blocking lookup on one background thread. The thread exits
/// when the command channel closes.
pub fn spawn_worker<S>(
    mut source: S,
    config: ScraperConfig,
    tx: Sender<Delta>,
    cmd_rx: Receiver<WorkerCommand>,
) -> JoinHandle<()>
where
    S: PageSource + Send + 'static,
{
    thread::spawn(move || {
        for cmd in cmd_rx {
            let delta = handle_command(&mut source, &config, cmd, &tx);
            if tx.send(delta).is_err() {
                break;
            }
        }
    })
}

/// Executes one command; progress lines go to `tx` as [`Delta::Log`].
pub fn handle_command(
    source: &mut dyn PageSource,
    config: &ScraperConfig,
    cmd: WorkerCommand,
    tx: &Sender<Delta>,
) -> Delta {
    let log = |msg: String| {
        let _ = tx.send(Delta::Log(msg));
    };
    let mut scout = Scout::new(source, config);

    match cmd {
        WorkerCommand::Scout { name, request } => {
            log(format!("[INFO] Searching for {name}"));
            let (hit, profile) = match scout.lookup(&name) {
                Ok(found) => found,
                Err(err) => return Delta::Failed(err.to_string()),
            };
            log(format!("[INFO] Found {}", profile.name));

            let passport = match to_passport_html(&profile, &config.passport_dir) {
                Ok((_, path)) => Some(path),
                Err(err) => {
                    warn!(error = %err, "passport export failed");
                    log(format!("[WARN] Passport export failed: {err:#}"));
                    None
                }
            };

            log(format!("[INFO] Fetching {} stats", request.stat_type));
            let (stats, stats_error) = match scout.stats(&hit.url, &request) {
                Ok(outcome) => (Some(outcome), None),
                Err(err) => (None, Some(err.to_string())),
            };
            let report = PlayerReport { hit, profile, stats };

            let csv = match &report.stats {
                Some(outcome) => {
                    match to_csv(outcome, &request.label(&report.profile.name), &config.data_dir) {
                        Ok(path) => path,
                        Err(err) => {
                            log(format!("[WARN] CSV export failed: {err:#}"));
                            None
                        }
                    }
                }
                None => None,
            };
            Delta::Scouted(Box::new(ScoutResult {
                report,
                request,
                passport,
                csv,
                stats_error,
            }))
        }
        WorkerCommand::Compare { names, request } => {
            let mut reports = Vec::with_capacity(2);
            for name in &names {
                log(format!("[INFO] Searching for {name}"));
                match scout.report(name, Some(&request)) {
                    Ok(report) => reports.push(report),
                    Err(err) => return Delta::Failed(format!("{name}: {err}")),
                }
            }
            let [left, right] = reports.as_slice() else {
                return Delta::Failed("comparison needs two players".to_string());
            };
            let comparison = match compare_reports(left, right, &request) {
                Ok(comparison) => comparison,
                Err(err) => return Delta::Failed(err.to_string()),
            };
            let svg = match &comparison {
                Comparison::Chart(chart) => {
                    let label = request.label(&format!(
                        "{}_vs_{}",
                        left.profile.name, right.profile.name
                    ));
                    match write_chart_svg(chart, &label, &config.chart_dir) {
                        Ok(path) => Some(path),
                        Err(err) => {
                            log(format!("[WARN] Chart export failed: {err:#}"));
                            None
                        }
                    }
                }
                _ => None,
            };
            Delta::Compared(Box::new(CompareResult {
                players: [left.profile.name.clone(), right.profile.name.clone()],
                request,
                comparison,
                svg,
            }))
        }
    }
}
