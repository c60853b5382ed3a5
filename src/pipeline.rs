//! The search -> profile -> stats control flow shared by the CLI and the
//! dashboard worker.

use std::fmt;

use tracing::info;

use crate::compare::{ComparisonChart, compare, core_stats};
use crate::competition::{Competition, StatType, route, table_id_for};
use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::export::ExportLabel;
use crate::fetch::PageSource;
use crate::profile::{PlayerProfile, extract_profile};
use crate::search::{SearchHit, find_player};
use crate::season_table::{SeasonFilter, StatsMiss, StatsOutcome, extract};

/// Which step of the pipeline gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Download,
    Input,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Search => "search",
            Stage::Download => "download",
            Stage::Input => "input",
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct ScoutError {
    pub stage: Stage,
    #[source]
    pub source: ScrapeError,
}

impl ScoutError {
    fn at(stage: Stage) -> impl FnOnce(ScrapeError) -> Self {
        move |source| Self { stage, source }
    }
}

/// A validated (competition, season, stat type) selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRequest {
    pub competition: Competition,
    pub season: SeasonFilter,
    pub stat_type: StatType,
}

impl StatsRequest {
    pub fn parse(competition: &str, season: &str, stat_type: &str) -> Result<Self> {
        Ok(Self {
            competition: competition.parse()?,
            season: SeasonFilter::parse(Some(season)),
            stat_type: stat_type.parse()?,
        })
    }

    pub fn label(&self, player: &str) -> ExportLabel {
        ExportLabel::new(
            player,
            self.competition.code(),
            self.season.label(),
            self.stat_type.key(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct PlayerReport {
    pub hit: SearchHit,
    pub profile: PlayerProfile,
    /// `None` when no stats were asked for.
    pub stats: Option<StatsOutcome>,
}

/// Result of putting two players side by side.
#[derive(Debug, Clone)]
pub enum Comparison {
    Chart(ComparisonChart),
    NothingInCommon,
    Missing { player: String, miss: StatsMiss },
}

/// Drives one lookup at a time over a page source. Holds no state of its own
/// besides the borrowed source and configuration.
pub struct Scout<'a> {
    source: &'a mut dyn PageSource,
    config: &'a ScraperConfig,
}

impl<'a> Scout<'a> {
    pub fn new(source: &'a mut dyn PageSource, config: &'a ScraperConfig) -> Self {
        Self { source, config }
    }

    /// Resolves `name` to a profile page and parses it.
    pub fn lookup(&mut self, name: &str) -> std::result::Result<(SearchHit, PlayerProfile), ScoutError> {
        let hit = find_player(self.source, self.config, name).map_err(|err| match err {
            ScrapeError::InvalidInput(_) => ScoutError::at(Stage::Input)(err),
            other => ScoutError::at(Stage::Search)(other),
        })?;
        info!(player = %hit.text, url = %hit.url, "player resolved");

        let outcome = self.source.fetch(&hit.url);
        let Some(html) = outcome.ok_body() else {
            return Err(ScoutError::at(Stage::Download)(ScrapeError::Transport {
                url: hit.url.clone(),
                status: outcome.status,
            }));
        };
        let profile = extract_profile(html, &outcome.final_url, name);
        Ok((hit, profile))
    }

    /// Downloads and parses the stats table selected by `request`.
    pub fn stats(
        &mut self,
        profile_url: &str,
        request: &StatsRequest,
    ) -> std::result::Result<StatsOutcome, ScoutError> {
        let stats_route =
            route(profile_url, request.competition.code()).map_err(ScoutError::at(Stage::Input))?;
        let table_id = table_id_for(request.stat_type.key(), request.competition.code())
            .map_err(ScoutError::at(Stage::Input))?;

        info!(url = %stats_route.stats_url, %table_id, "fetching stats");
        let outcome = self.source.fetch(&stats_route.stats_url);
        let Some(html) = outcome.ok_body() else {
            return Err(ScoutError::at(Stage::Download)(ScrapeError::Transport {
                url: stats_route.stats_url,
                status: outcome.status,
            }));
        };
        Ok(extract(html, &table_id, &request.season))
    }

    /// Lookup plus (optionally) stats for one player.
    pub fn report(
        &mut self,
        name: &str,
        request: Option<&StatsRequest>,
    ) -> std::result::Result<PlayerReport, ScoutError> {
        let (hit, profile) = self.lookup(name)?;
        let stats = match request {
            Some(request) => Some(self.stats(&hit.url, request)?),
            None => None,
        };
        Ok(PlayerReport { hit, profile, stats })
    }
}

/// Compares two reports that carry stats for `request`.
pub fn compare_reports(
    left: &PlayerReport,
    right: &PlayerReport,
    request: &StatsRequest,
) -> Result<Comparison> {
    let season = request.season.label();
    let mut flattened = Vec::with_capacity(2);
    for report in [left, right] {
        let player = report.profile.name.clone();
        let stats = match &report.stats {
            Some(Ok(stats)) => stats,
            Some(Err(miss)) => {
                return Ok(Comparison::Missing {
                    player,
                    miss: miss.clone(),
                });
            }
            None => {
                return Err(ScrapeError::InvalidInput(
                    "comparison needs stats for both players".to_string(),
                ));
            }
        };
        match core_stats(&player, stats, season) {
            Some(core) => flattened.push(core),
            None => {
                return Ok(Comparison::Missing {
                    player,
                    miss: StatsMiss::SeasonNotFound {
                        season: season.to_string(),
                    },
                });
            }
        }
    }

    let chart = compare(
        &flattened,
        season,
        request.competition.label(),
        request.stat_type,
    )?;
    Ok(chart.map_or(Comparison::NothingInCommon, Comparison::Chart))
}
