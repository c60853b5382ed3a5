//! Maps a (competition, stat type) choice onto the site's URL layout and
//! table identifiers.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::search::is_player_profile_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Competition {
    All,
    DomesticLeagues,
    DomesticCups,
    InternationalCups,
    NationalTeam,
}

struct CompetitionRoute {
    code: &'static str,
    label: &'static str,
    folder: &'static str,
    url_suffix: &'static str,
    table_suffix: &'static str,
}

static ROUTES: [(Competition, CompetitionRoute); 5] = [
    (
        Competition::All,
        CompetitionRoute {
            code: "all",
            label: "All competitions",
            folder: "all_comps",
            url_suffix: "Stats---All-Competitions",
            table_suffix: "collapsed",
        },
    ),
    (
        Competition::DomesticLeagues,
        CompetitionRoute {
            code: "dl",
            label: "Domestic leagues",
            folder: "dom_lg",
            url_suffix: "Domestic-League-Stats",
            table_suffix: "dom_lg",
        },
    ),
    (
        Competition::DomesticCups,
        CompetitionRoute {
            code: "dc",
            label: "Domestic cups",
            folder: "dom_cup",
            url_suffix: "Domestic-Cup-Stats",
            table_suffix: "dom_cup",
        },
    ),
    (
        Competition::InternationalCups,
        CompetitionRoute {
            code: "ic",
            label: "International cups",
            folder: "intl_cup",
            url_suffix: "International-Cup-Stats",
            table_suffix: "intl_cup",
        },
    ),
    (
        Competition::NationalTeam,
        CompetitionRoute {
            code: "nt",
            label: "National team",
            folder: "nat_tm",
            url_suffix: "National-Team-Stats",
            table_suffix: "nat_tm",
        },
    ),
];

impl Competition {
    pub const ALL: [Competition; 5] = [
        Competition::All,
        Competition::DomesticLeagues,
        Competition::DomesticCups,
        Competition::InternationalCups,
        Competition::NationalTeam,
    ];

    fn route(self) -> &'static CompetitionRoute {
        let idx = match self {
            Competition::All => 0,
            Competition::DomesticLeagues => 1,
            Competition::DomesticCups => 2,
            Competition::InternationalCups => 3,
            Competition::NationalTeam => 4,
        };
        &ROUTES[idx].1
    }

    pub fn code(self) -> &'static str {
        self.route().code
    }

    pub fn label(self) -> &'static str {
        self.route().label
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Competition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Competition {
    type Err = ScrapeError;

    /// Accepts the short code, optionally followed by a description, as in
    /// `"dl (domestic leagues)"`.
    fn from_str(raw: &str) -> Result<Self> {
        let code = raw
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        ROUTES
            .iter()
            .find(|(_, route)| route.code == code)
            .map(|(comp, _)| *comp)
            .ok_or_else(|| ScrapeError::UnknownCompetition(raw.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatType {
    Standard,
    Shooting,
    Passing,
    PassingTypes,
    Gca,
    Defense,
    Possession,
    PlayingTime,
    Misc,
    Keeper,
    KeeperAdv,
}

impl StatType {
    pub const ALL: [StatType; 11] = [
        StatType::Standard,
        StatType::Shooting,
        StatType::Passing,
        StatType::PassingTypes,
        StatType::Gca,
        StatType::Defense,
        StatType::Possession,
        StatType::PlayingTime,
        StatType::Misc,
        StatType::Keeper,
        StatType::KeeperAdv,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatType::Standard => "standard",
            StatType::Shooting => "shooting",
            StatType::Passing => "passing",
            StatType::PassingTypes => "passing_types",
            StatType::Gca => "gca",
            StatType::Defense => "defense",
            StatType::Possession => "possession",
            StatType::PlayingTime => "playing_time",
            StatType::Misc => "misc",
            StatType::Keeper => "keeper",
            StatType::KeeperAdv => "keeper_adv",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StatType {
    type Err = ScrapeError;

    fn from_str(raw: &str) -> Result<Self> {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|stat| stat.key() == key)
            .ok_or_else(|| ScrapeError::UnknownStatType(raw.trim().to_string()))
    }
}

/// Where a competition's stats live for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRoute {
    pub stats_url: String,
    pub table_id: String,
}

/// Player id and slug from a profile URL such as
/// `https://fbref.com/en/players/82ec26c1/Lamine-Yamal`.
pub fn player_id_and_slug(profile_url: &str) -> Result<(String, String)> {
    if !is_player_profile_url(profile_url) {
        return Err(ScrapeError::InvalidProfileUrl(profile_url.to_string()));
    }
    let path = Url::parse(profile_url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| profile_url.to_string());
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    match segments.as_slice() {
        ["en", "players", id, slug] => Ok((id.to_string(), slug.to_string())),
        _ => Err(ScrapeError::InvalidProfileUrl(profile_url.to_string())),
    }
}

/// Stats page URL and default (standard stats) table id for `competition`.
pub fn route(profile_url: &str, competition: &str) -> Result<StatsRoute> {
    let competition = competition.parse::<Competition>()?;
    let (id, slug) = player_id_and_slug(profile_url)?;
    let route = competition.route();

    let path = format!(
        "/en/players/{id}/{}/{slug}-{}",
        route.folder, route.url_suffix
    );
    let stats_url = match Url::parse(profile_url).and_then(|base| base.join(&path)) {
        Ok(url) => url.to_string(),
        Err(_) => path,
    };
    Ok(StatsRoute {
        stats_url,
        table_id: format!("stats_standard_{}", route.table_suffix),
    })
}

/// Table id for a stat type within a competition page, e.g.
/// `stats_shooting_dom_lg` or `stats_passing_collapsed`.
pub fn table_id_for(stat_type: &str, competition: &str) -> Result<String> {
    let stat_type = stat_type.parse::<StatType>()?;
    let competition = competition.parse::<Competition>()?;
    Ok(format!(
        "stats_{}_{}",
        stat_type.key(),
        competition.route().table_suffix
    ))
}
