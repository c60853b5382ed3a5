use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::fetch::PageSource;
use crate::similarity::rank;

/// Candidates scoring below this are not considered the same person.
pub const MIN_MATCH_SCORE: f64 = 0.3;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));
static PLAYER_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/en/players/([0-9a-f]{8})/([^/]+)/?$").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub url: String,
}

/// Links found on a search page, grouped by what they point at. Each list is
/// in document order with duplicate URLs removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchHits {
    pub players: Vec<SearchHit>,
    pub squads: Vec<SearchHit>,
    pub comps: Vec<SearchHit>,
}

impl SearchHits {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.squads.is_empty() && self.comps.is_empty()
    }
}

pub fn search_url(config: &ScraperConfig, name: &str) -> String {
    let query = url::form_urlencoded::byte_serialize(name.trim().as_bytes()).collect::<String>();
    config.site_url(&format!("/search/search.fcgi?search={query}"))
}

/// True for `/en/players/<id>/<slug>` profile URLs (absolute or not).
pub fn is_player_profile_url(raw: &str) -> bool {
    PLAYER_PATH.is_match(&url_path(raw))
}

fn url_path(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Classifies every hyperlink of a search result page.
pub fn parse_search_page(html: &str, base_url: &str) -> SearchHits {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();
    let mut hits = SearchHits::default();

    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let text = link.text().collect::<String>().trim().to_string();
        if href.trim().is_empty() || text.is_empty() {
            continue;
        }
        let absolute = match base.as_ref().and_then(|b| b.join(href).ok()) {
            Some(url) => url.to_string(),
            None => href.to_string(),
        };
        let path = url_path(&absolute);

        let bucket = if PLAYER_PATH.is_match(&path) {
            &mut hits.players
        } else if path.contains("/en/squads/") || path.contains("/en/teams/") {
            &mut hits.squads
        } else if path.contains("/en/comps/") {
            &mut hits.comps
        } else {
            continue;
        };
        if bucket.iter().any(|hit| hit.url == absolute) {
            continue;
        }
        bucket.push(SearchHit {
            text,
            url: absolute,
        });
    }

    debug!(
        players = hits.players.len(),
        squads = hits.squads.len(),
        comps = hits.comps.len(),
        "parsed search page"
    );
    hits
}

/// Picks the player whose link text best resembles `query`.
pub fn resolve_player(hits: &SearchHits, query: &str) -> Result<SearchHit> {
    let ranked = rank(query, hits.players.iter().map(|hit| hit.text.as_str()));
    let Some(best) = ranked.first() else {
        return Err(ScrapeError::NoResults {
            query: query.to_string(),
        });
    };
    let hit = &hits.players[best.index];
    if best.score < MIN_MATCH_SCORE {
        return Err(ScrapeError::NoMatch {
            query: query.to_string(),
            best: hit.text.clone(),
        });
    }
    debug!(query, best = %hit.text, score = best.score, "resolved player");
    Ok(hit.clone())
}

/// Runs a site search. A search that lands directly on a profile page (the
/// site redirects unambiguous queries) yields that profile as the only
/// player hit.
pub fn search(source: &mut dyn PageSource, config: &ScraperConfig, name: &str) -> Result<SearchHits> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ScrapeError::InvalidInput("player name is empty".to_string()));
    }

    let url = search_url(config, name);
    info!(%url, "searching");
    let outcome = source.fetch(&url);
    let Some(html) = outcome.ok_body() else {
        return Err(ScrapeError::Transport {
            url,
            status: outcome.status,
        });
    };

    if is_player_profile_url(&outcome.final_url) {
        let document = Html::parse_document(html);
        let text = document
            .select(&H1_SELECTOR)
            .next()
            .map(|h1| h1.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| name.to_string());
        return Ok(SearchHits {
            players: vec![SearchHit {
                text,
                url: outcome.final_url.clone(),
            }],
            ..SearchHits::default()
        });
    }

    Ok(parse_search_page(html, &config.base_url))
}

/// Search, then resolve the best-matching player profile.
pub fn find_player(
    source: &mut dyn PageSource,
    config: &ScraperConfig,
    name: &str,
) -> Result<SearchHit> {
    let hits = search(source, config, name)?;
    resolve_player(&hits, name)
}
