//! Season-by-season statistics tables.
//!
//! A stats table has a two-row header: an "over header" of categories that
//! may span several columns (`colspan`) and a row with one sub-statistic per
//! column. Body rows start with the season label. The parsed result is a
//! season -> category -> stat -> value mapping that keeps table order.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tracing::{debug, warn};

pub const GENERAL_CATEGORY: &str = "General";
pub const CAREER_SEASON: &str = "All";
pub const MISSING_VALUE: &str = "N/A";
/// Largest `colspan` browsers honour.
const MAX_COLSPAN: usize = 1000;

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("static selector"));
static HEAD_ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("thead > tr").expect("static selector"));
static BODY_ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tbody > tr").expect("static selector"));
static FOOT_ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tfoot > tr").expect("static selector"));
static SEASON_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}(-\d{4})?$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub stats: Vec<(String, String)>,
}

impl CategoryStats {
    pub fn get(&self, stat: &str) -> Option<&str> {
        self.stats
            .iter()
            .find(|(name, _)| name == stat)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonEntry {
    pub season: String,
    pub categories: Vec<CategoryStats>,
}

impl SeasonEntry {
    pub fn category(&self, name: &str) -> Option<&CategoryStats> {
        self.categories.iter().find(|c| c.category == name)
    }
}

/// Ordered season -> category -> stat -> value mapping. Keys are unique at
/// every level and keep the order in which the table first produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonStats {
    pub seasons: Vec<SeasonEntry>,
}

impl SeasonStats {
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.seasons.len()
    }

    pub fn season(&self, label: &str) -> Option<&SeasonEntry> {
        self.seasons.iter().find(|s| s.season == label)
    }

    pub fn season_labels(&self) -> Vec<&str> {
        self.seasons.iter().map(|s| s.season.as_str()).collect()
    }

    /// Sets one value. A repeated key overwrites the value in place.
    pub fn insert(&mut self, season: &str, category: &str, stat: &str, value: &str) {
        let season_idx = match self.seasons.iter().position(|s| s.season == season) {
            Some(idx) => idx,
            None => {
                self.seasons.push(SeasonEntry {
                    season: season.to_string(),
                    categories: Vec::new(),
                });
                self.seasons.len() - 1
            }
        };
        let categories = &mut self.seasons[season_idx].categories;
        let cat_idx = match categories.iter().position(|c| c.category == category) {
            Some(idx) => idx,
            None => {
                categories.push(CategoryStats {
                    category: category.to_string(),
                    stats: Vec::new(),
                });
                categories.len() - 1
            }
        };
        let stats = &mut categories[cat_idx].stats;
        match stats.iter_mut().find(|(name, _)| name == stat) {
            Some(slot) => slot.1 = value.to_string(),
            None => stats.push((stat.to_string(), value.to_string())),
        }
    }

    /// Flat `(season, category, stat, value)` rows in table order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &str, &str, &str)> + '_ {
        self.seasons.iter().flat_map(|season| {
            season.categories.iter().flat_map(move |cat| {
                cat.stats.iter().map(move |(stat, value)| {
                    (
                        season.season.as_str(),
                        cat.category.as_str(),
                        stat.as_str(),
                        value.as_str(),
                    )
                })
            })
        })
    }

    fn only(mut self, label: &str) -> Option<SeasonStats> {
        let idx = self.seasons.iter().position(|s| s.season == label)?;
        let entry = self.seasons.swap_remove(idx);
        Some(SeasonStats {
            seasons: vec![entry],
        })
    }
}

impl Serialize for SeasonStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Stats<'a>(&'a [(String, String)]);
        impl Serialize for Stats<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, value) in self.0 {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
        struct Categories<'a>(&'a [CategoryStats]);
        impl Serialize for Categories<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for cat in self.0 {
                    map.serialize_entry(&cat.category, &Stats(&cat.stats))?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(self.seasons.len()))?;
        for season in &self.seasons {
            map.serialize_entry(&season.season, &Categories(&season.categories))?;
        }
        map.end()
    }
}

/// Which rows of a stats table the caller wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonFilter {
    /// Every `YYYY` / `YYYY-YYYY` row.
    Every,
    /// The table footer (career totals), keyed as `"All"`.
    Career,
    /// One season label.
    Season(String),
}

impl SeasonFilter {
    /// `None`, blank and `"all"` (any case) mean every season; `"career"` or
    /// `"total"` select the footer totals; anything else is a season label.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return SeasonFilter::Every;
        };
        match raw.to_ascii_lowercase().as_str() {
            "all" => SeasonFilter::Every,
            "career" | "total" | "totals" => SeasonFilter::Career,
            _ => SeasonFilter::Season(raw.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SeasonFilter::Every => "all",
            SeasonFilter::Career => "career",
            SeasonFilter::Season(label) => label,
        }
    }
}

/// Why a page produced no stats. These are expected outcomes (the player may
/// simply have no such table or season), not failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsMiss {
    #[error("table \"{table_id}\" not found on the page")]
    TableNotFound { table_id: String },
    #[error("no data for season {season}")]
    SeasonNotFound { season: String },
}

impl StatsMiss {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type StatsOutcome = Result<SeasonStats, StatsMiss>;

/// Expands category labels by colspan and aligns them 1:1 with the
/// sub-headers. Returns `(category, sub_header)` pairs; categories may be
/// empty here and are only renamed to [`GENERAL_CATEGORY`] when grouping.
pub fn reconcile_headers(categories: &[(String, usize)], sub_headers: &[String]) -> Vec<(String, String)> {
    let mut expanded = categories
        .iter()
        .flat_map(|(label, span)| std::iter::repeat_n(label.clone(), (*span).clamp(1, MAX_COLSPAN)))
        .collect::<Vec<_>>();

    let target = sub_headers.len();
    if expanded.len() != target {
        warn!(
            categories = expanded.len(),
            sub_headers = target,
            "header rows disagree, realigning"
        );
    }

    let last_label = expanded
        .iter()
        .rev()
        .find(|label| !label.is_empty())
        .cloned()
        .unwrap_or_default();

    if expanded.len() < target {
        expanded.resize(target, last_label);
    } else if expanded.len() > target {
        let surplus = expanded.len() - target;
        let head_keeps_last = last_label.is_empty()
            || expanded[..expanded.len() - surplus].contains(&last_label);
        if head_keeps_last {
            expanded.truncate(target);
        } else {
            expanded.drain(..surplus);
        }
    }

    if expanded.len() > 1 && expanded[0].is_empty() {
        expanded[0] = expanded[1].clone();
    }

    expanded
        .into_iter()
        .zip(sub_headers.iter().cloned())
        .collect()
}

/// True for `YYYY` and `YYYY-YYYY`.
pub fn is_season_label(label: &str) -> bool {
    SEASON_LABEL.is_match(label.trim())
}

/// Parses the table `table_id` out of a stats page.
pub fn extract(html: &str, table_id: &str, filter: &SeasonFilter) -> StatsOutcome {
    let document = Html::parse_document(html);
    if let Some(table) = find_table(&document, table_id) {
        return extract_from_table(table, table_id, filter);
    }

    // Secondary tables are shipped inside HTML comments.
    if html.contains("<!--") {
        let uncommented = html.replace("<!--", "").replace("-->", "");
        let document = Html::parse_document(&uncommented);
        if let Some(table) = find_table(&document, table_id) {
            debug!(table_id, "table found inside a comment");
            return extract_from_table(table, table_id, filter);
        }
    }

    Err(StatsMiss::TableNotFound {
        table_id: table_id.to_string(),
    })
}

fn find_table<'a>(document: &'a Html, table_id: &str) -> Option<ElementRef<'a>> {
    document
        .select(&TABLE_SELECTOR)
        .find(|table| table.value().id() == Some(table_id))
}

fn extract_from_table(table: ElementRef, table_id: &str, filter: &SeasonFilter) -> StatsOutcome {
    let head_rows = table.select(&HEAD_ROW_SELECTOR).collect::<Vec<_>>();
    let sub_headers = head_rows
        .last()
        .map(|row| row_cells(*row).into_iter().map(|(text, _)| text).collect::<Vec<_>>())
        .unwrap_or_default();
    let categories = if head_rows.len() >= 2 {
        row_cells(head_rows[0])
    } else {
        Vec::new()
    };
    let mut pairs = reconcile_headers(&categories, &sub_headers);

    let mut stats = SeasonStats::default();

    if *filter == SeasonFilter::Career {
        let Some(foot) = table.select(&FOOT_ROW_SELECTOR).next() else {
            return Err(StatsMiss::SeasonNotFound {
                season: CAREER_SEASON.to_string(),
            });
        };
        let mut cells = expand_cells(row_cells(foot));
        if let Some(age_idx) = pairs
            .iter()
            .position(|(_, sub)| sub.eq_ignore_ascii_case("age"))
        {
            pairs.remove(age_idx);
            if age_idx < cells.len() {
                cells.remove(age_idx);
            }
        }
        push_row(&mut stats, CAREER_SEASON, &cells, &pairs);
        debug!(table_id, "extracted career totals");
        return Ok(stats);
    }

    for row in table.select(&BODY_ROW_SELECTOR) {
        let cells = expand_cells(row_cells(row));
        let Some(label) = cells.first() else {
            continue;
        };
        if !is_season_label(label) {
            continue;
        }
        let label = label.clone();
        push_row(&mut stats, &label, &cells, &pairs);
    }
    debug!(table_id, seasons = stats.len(), "extracted season rows");

    match filter {
        SeasonFilter::Season(wanted) => {
            stats
                .only(wanted)
                .ok_or_else(|| StatsMiss::SeasonNotFound {
                    season: wanted.clone(),
                })
        }
        _ => Ok(stats),
    }
}

/// Zips every cell after the label against its `(category, sub_header)`
/// pair by column index.
fn push_row(stats: &mut SeasonStats, season: &str, cells: &[String], pairs: &[(String, String)]) {
    for (cell, (category, sub)) in cells.iter().zip(pairs.iter()).skip(1) {
        if sub.is_empty() {
            continue;
        }
        let category = if category.is_empty() {
            GENERAL_CATEGORY
        } else {
            category.as_str()
        };
        let value = if cell.is_empty() {
            MISSING_VALUE
        } else {
            cell.as_str()
        };
        stats.insert(season, category, sub, value);
    }
}

/// Text and colspan of each `th`/`td` in a row.
fn row_cells(row: ElementRef) -> Vec<(String, usize)> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "th" | "td"))
        .map(|cell| {
            let text = cell
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let span = cell
                .value()
                .attr("colspan")
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .unwrap_or(1)
                .clamp(1, MAX_COLSPAN);
            (text, span)
        })
        .collect()
}

/// Body cells spanning several columns keep their text in the first column
/// and leave the others blank.
fn expand_cells(cells: Vec<(String, usize)>) -> Vec<String> {
    let mut out = Vec::with_capacity(cells.len());
    for (text, span) in cells {
        out.push(text);
        out.extend(std::iter::repeat_n(String::new(), span - 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{SeasonFilter, SeasonStats, extract, is_season_label, reconcile_headers};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn colspans_expand_to_one_category_per_column() {
        let cats = vec![
            (String::new(), 2),
            ("Playing Time".to_string(), 2),
            ("Performance".to_string(), 3),
        ];
        let subs = strings(&["Season", "Age", "MP", "Min", "Gls", "Ast", "G+A"]);
        let pairs = reconcile_headers(&cats, &subs);
        assert_eq!(pairs.len(), subs.len());
        assert_eq!(pairs[0].0, "");
        assert_eq!(pairs[2], ("Playing Time".to_string(), "MP".to_string()));
        assert_eq!(pairs[6], ("Performance".to_string(), "G+A".to_string()));
        assert_eq!(
            pairs.iter().filter(|(c, _)| c == "Performance").count(),
            3
        );
    }

    #[test]
    fn short_category_row_extends_the_trailing_category() {
        let cats = vec![(String::new(), 1), ("Expected".to_string(), 1)];
        let subs = strings(&["Season", "xG", "npxG", "xAG"]);
        let pairs = reconcile_headers(&cats, &subs);
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[3].0, "Expected");
    }

    #[test]
    fn long_category_row_keeps_the_last_category() {
        let cats = vec![("Per 90".to_string(), 4)];
        let subs = strings(&["Gls", "Ast"]);
        let pairs = reconcile_headers(&cats, &subs);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|(c, _)| c == "Per 90"));

        let cats = vec![
            (String::new(), 3),
            ("Performance".to_string(), 2),
        ];
        let subs = strings(&["Season", "Gls", "Ast"]);
        let pairs = reconcile_headers(&cats, &subs);
        assert_eq!(pairs[1].0, "Performance");
        assert_eq!(pairs[2].0, "Performance");
    }

    #[test]
    fn leading_empty_category_borrows_its_neighbour_once() {
        let cats = vec![(String::new(), 1), ("Performance".to_string(), 2)];
        let subs = strings(&["Gls", "Ast", "PK"]);
        let pairs = reconcile_headers(&cats, &subs);
        assert_eq!(pairs[0].0, "Performance");
    }

    #[test]
    fn season_labels() {
        assert!(is_season_label("2022-2023"));
        assert!(is_season_label("2023"));
        assert!(!is_season_label("Career"));
        assert!(!is_season_label("Season"));
        assert!(!is_season_label("3 Seasons"));
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(SeasonFilter::parse(None), SeasonFilter::Every);
        assert_eq!(SeasonFilter::parse(Some("All")), SeasonFilter::Every);
        assert_eq!(SeasonFilter::parse(Some(" career ")), SeasonFilter::Career);
        assert_eq!(
            SeasonFilter::parse(Some("2023-2024")),
            SeasonFilter::Season("2023-2024".to_string())
        );
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut stats = SeasonStats::default();
        stats.insert("2023", "General", "Squad", "A");
        stats.insert("2023", "General", "MP", "3");
        stats.insert("2023", "General", "Squad", "B");
        let rows = stats.rows().collect::<Vec<_>>();
        assert_eq!(rows[0], ("2023", "General", "Squad", "B"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn serializes_as_nested_maps_in_order() {
        let mut stats = SeasonStats::default();
        stats.insert("2023-2024", "Performance", "Gls", "5");
        stats.insert("2022-2023", "Performance", "Gls", "1");
        let json = serde_json::to_string(&stats).expect("json");
        assert_eq!(
            json,
            r#"{"2023-2024":{"Performance":{"Gls":"5"}},"2022-2023":{"Performance":{"Gls":"1"}}}"#
        );
    }

    #[test]
    fn oversized_colspans_are_capped() {
        let cats = vec![(String::new(), usize::MAX), ("Performance".to_string(), 1)];
        let subs = strings(&["Season", "Gls"]);
        let pairs = reconcile_headers(&cats, &subs);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0, "Performance");

        let html = format!(
            r#"<table id="stats_standard_dom_lg">
            <thead>
              <tr><th colspan="1"></th><th colspan="1">Performance</th></tr>
              <tr><th>Season</th><th>Gls</th></tr>
            </thead>
            <tbody>
              <tr><th>2023-2024</th><td>5</td></tr>
              <tr><th colspan="{}">Career</th></tr>
            </tbody>
            </table>"#,
            u64::MAX
        );
        let stats = extract(&html, "stats_standard_dom_lg", &SeasonFilter::Every).expect("stats");
        assert_eq!(stats.season_labels(), vec!["2023-2024"]);
        assert_eq!(
            stats.rows().collect::<Vec<_>>(),
            vec![("2023-2024", "Performance", "Gls", "5")]
        );
    }
}
