//! Head-to-head comparison of two players' season stats.

use serde::Serialize;
use tracing::debug;

use crate::competition::StatType;
use crate::error::{Result, ScrapeError};
use crate::export::escape_markup;
use crate::season_table::SeasonStats;

const COMMON_EXCLUDED: &[&str] = &[
    "general_age",
    "general_born",
    "general_squad",
    "general_country",
    "general_comp",
    "general_lgrank",
    "general_matches",
    "general_90s",
];

const PLAYING_TIME_EXCLUDED: &[&str] = &[
    "playing_time_mp",
    "playing_time_starts",
    "playing_time_min",
    "playing_time_90s",
];

const LABELS: &[(&str, &str)] = &[
    ("performance_gls", "Goals"),
    ("performance_ast", "Assists"),
    ("performance_g_plus_a", "Goals + assists"),
    ("performance_g_pk", "Non-penalty goals"),
    ("performance_pk", "Penalties scored"),
    ("performance_pkatt", "Penalties attempted"),
    ("performance_crdy", "Yellow cards"),
    ("performance_crdr", "Red cards"),
    ("performance_fls", "Fouls committed"),
    ("performance_fld", "Fouls drawn"),
    ("performance_off", "Offsides"),
    ("performance_int", "Interceptions"),
    ("performance_tklw", "Tackles won"),
    ("performance_recov", "Ball recoveries"),
    ("expected_xg", "Expected goals (xG)"),
    ("expected_npxg", "Non-penalty xG"),
    ("expected_xag", "Expected assisted goals (xAG)"),
    ("expected_npxg_plus_xag", "npxG + xAG"),
    ("progression_prgc", "Progressive carries"),
    ("progression_prgp", "Progressive passes"),
    ("progression_prgr", "Progressive passes received"),
    ("per_90_minutes_gls", "Goals per 90"),
    ("per_90_minutes_ast", "Assists per 90"),
    ("per_90_minutes_g_plus_a", "Goals + assists per 90"),
    ("per_90_minutes_xg", "xG per 90"),
    ("per_90_minutes_xag", "xAG per 90"),
    ("standard_sh", "Shots"),
    ("standard_sot", "Shots on target"),
    ("standard_sot_pct", "Shots on target %"),
    ("standard_sh_90", "Shots per 90"),
    ("standard_g_sh", "Goals per shot"),
    ("standard_dist", "Average shot distance"),
    ("total_cmp", "Passes completed"),
    ("total_att", "Passes attempted"),
    ("total_cmp_pct", "Pass completion %"),
    ("total_prgdist", "Progressive passing distance"),
    ("general_kp", "Key passes"),
    ("general_ppa", "Passes into the penalty area"),
    ("general_prgp", "Progressive passes"),
    ("sca_sca", "Shot-creating actions"),
    ("sca_sca90", "Shot-creating actions per 90"),
    ("gca_gca", "Goal-creating actions"),
    ("gca_gca90", "Goal-creating actions per 90"),
    ("tackles_tkl", "Tackles"),
    ("tackles_tklw", "Tackles won"),
    ("challenges_tkl_pct", "Dribblers tackled %"),
    ("blocks_blocks", "Blocks"),
    ("general_int", "Interceptions"),
    ("general_clr", "Clearances"),
    ("touches_touches", "Touches"),
    ("take_ons_succ", "Successful take-ons"),
    ("take_ons_succ_pct", "Take-on success %"),
    ("carries_carries", "Carries"),
    ("carries_prgc", "Progressive carries"),
    ("receiving_rec", "Passes received"),
    ("aerial_duels_won", "Aerial duels won"),
    ("aerial_duels_won_pct", "Aerial duels won %"),
    ("performance_ga", "Goals against"),
    ("performance_ga90", "Goals against per 90"),
    ("performance_saves", "Saves"),
    ("performance_save_pct", "Save %"),
    ("performance_cs", "Clean sheets"),
    ("performance_cs_pct", "Clean sheet %"),
];

/// One flattened stat of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreStat {
    pub key: String,
    pub category: String,
    pub stat: String,
    pub value: String,
}

/// A single season of one player's stats, flattened to `<category>_<stat>`
/// keys for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreStats {
    pub player: String,
    pub season: String,
    pub stats: Vec<CoreStat>,
}

impl CoreStats {
    pub fn get(&self, key: &str) -> Option<&CoreStat> {
        self.stats.iter().find(|stat| stat.key == key)
    }
}

/// `"Per 90 Minutes"`, `"G+A-PK"` becomes `per_90_minutes_g_plus_a_pk`.
pub fn stat_key(category: &str, stat: &str) -> String {
    let raw = format!("{category}_{stat}").to_lowercase();
    let mut key = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => key.push_str("_pct_"),
            '+' => key.push_str("_plus_"),
            c if c.is_ascii_alphanumeric() => key.push(c),
            _ => key.push('_'),
        }
    }
    key.split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Flattens `season` out of `stats`, or the most recent season when that
/// label is absent (single-season results carry exactly one entry).
pub fn core_stats(player: &str, stats: &SeasonStats, season: &str) -> Option<CoreStats> {
    let entry = stats.season(season).or_else(|| stats.seasons.last())?;
    let flat = entry
        .categories
        .iter()
        .flat_map(|cat| {
            cat.stats.iter().map(move |(stat, value)| CoreStat {
                key: stat_key(&cat.category, stat),
                category: cat.category.clone(),
                stat: stat.clone(),
                value: value.clone(),
            })
        })
        .collect();
    Some(CoreStats {
        player: player.to_string(),
        season: entry.season.clone(),
        stats: flat,
    })
}

pub fn excluded_keys(stat_type: StatType) -> Vec<&'static str> {
    let mut keys = COMMON_EXCLUDED.to_vec();
    match stat_type {
        StatType::PlayingTime => keys.push("playing_time_mp"),
        _ => keys.extend_from_slice(PLAYING_TIME_EXCLUDED),
    }
    keys
}

/// Human label for a flattened key.
pub fn stat_label(key: &str) -> Option<&'static str> {
    LABELS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, label)| *label)
}

/// `"1,234.5"` is 1234.5; blanks, `N/A` and text are `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    let cleaned = cleaned.trim_end_matches('%');
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub key: String,
    pub label: String,
    pub left: f64,
    pub right: f64,
}

impl ChartRow {
    /// Positions on the diverging axis: the left player is drawn negated.
    pub fn plotted(&self) -> (f64, f64) {
        (-self.left, self.right)
    }
}

/// Horizontal diverging bar chart data for two players.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonChart {
    pub title: String,
    pub left_player: String,
    pub right_player: String,
    pub rows: Vec<ChartRow>,
    pub axis_max: f64,
    pub ticks: Vec<f64>,
}

/// Builds the comparison of exactly two players. Only stats both players
/// have as numbers survive; `Ok(None)` when nothing is left to compare.
pub fn compare(
    players: &[CoreStats],
    season: &str,
    competition: &str,
    stat_type: StatType,
) -> Result<Option<ComparisonChart>> {
    let [left, right] = players else {
        return Err(ScrapeError::InvalidInput(format!(
            "comparison needs exactly two players, got {}",
            players.len()
        )));
    };

    let excluded = excluded_keys(stat_type);
    let mut rows = Vec::new();
    for stat in &left.stats {
        if excluded.contains(&stat.key.as_str()) || rows.iter().any(|r: &ChartRow| r.key == stat.key) {
            continue;
        }
        let Some(lv) = parse_number(&stat.value) else {
            continue;
        };
        let Some(rv) = right.get(&stat.key).and_then(|other| parse_number(&other.value)) else {
            continue;
        };
        let label = stat_label(&stat.key)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} ({})", stat.stat, stat.category));
        rows.push(ChartRow {
            key: stat.key.clone(),
            label,
            left: lv,
            right: rv,
        });
    }

    debug!(common = rows.len(), "comparable stats");
    if rows.is_empty() {
        return Ok(None);
    }

    let axis_max = rows
        .iter()
        .flat_map(|row| [row.left.abs(), row.right.abs()])
        .fold(0.0_f64, f64::max);
    let axis_max = if axis_max > 0.0 { axis_max } else { 1.0 };

    Ok(Some(ComparisonChart {
        title: format!(
            "{} vs {} | {} | {} | {}",
            left.player, right.player, season, competition, stat_type
        ),
        left_player: left.player.clone(),
        right_player: right.player.clone(),
        rows,
        axis_max,
        ticks: symmetric_ticks(axis_max),
    }))
}

pub fn symmetric_ticks(max: f64) -> Vec<f64> {
    vec![-max, -max / 2.0, 0.0, max / 2.0, max]
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Plain-text rendering: one line per stat, bars growing out of a centre
/// column. `half_width` is the number of cells available on each side.
pub fn render_text(chart: &ComparisonChart, half_width: usize) -> Vec<String> {
    let label_width = chart
        .rows
        .iter()
        .map(|row| row.label.chars().count())
        .max()
        .unwrap_or(0);
    let half_width = half_width.max(1);

    let mut lines = vec![format!(
        "{:>lw$} {:>hw$}|{}",
        "",
        chart.left_player,
        chart.right_player,
        lw = label_width,
        hw = half_width
    )];
    for row in &chart.rows {
        let (left, right) = row.plotted();
        let bars = [(left, LEFT_BAR), (right, RIGHT_BAR)];
        let left_bar = half_bar(&bars, Side::Negative, chart.axis_max, half_width);
        let right_bar = half_bar(&bars, Side::Positive, chart.axis_max, half_width);
        lines.push(format!(
            "{:>lw$} {left_bar}|{right_bar} {} / {}",
            row.label,
            format_value(row.left),
            format_value(row.right),
            lw = label_width
        ));
    }
    let ticks = chart
        .ticks
        .iter()
        .map(|t| format_value(*t))
        .collect::<Vec<_>>()
        .join("  ");
    lines.push(format!("{:>lw$} {ticks}", "", lw = label_width));
    lines
}

const LEFT_BAR: char = '█';
const RIGHT_BAR: char = '▓';

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Negative,
    Positive,
}

/// One half of a text row. Bars whose plotted value falls on `side` grow
/// away from the centre; the shorter of two overlapping bars is drawn last.
fn half_bar(bars: &[(f64, char)], side: Side, axis_max: f64, half_width: usize) -> String {
    let mut lengths = bars
        .iter()
        .filter(|(value, _)| match side {
            Side::Negative => *value < 0.0,
            Side::Positive => *value > 0.0,
        })
        .map(|(value, fill)| (bar_cells(*value, axis_max, half_width), *fill))
        .collect::<Vec<_>>();
    lengths.sort_by(|a, b| b.0.cmp(&a.0));

    let mut cells = vec![' '; half_width];
    for (len, fill) in lengths {
        for i in 0..len {
            let idx = match side {
                Side::Negative => half_width - 1 - i,
                Side::Positive => i,
            };
            cells[idx] = fill;
        }
    }
    cells.into_iter().collect()
}

fn bar_cells(value: f64, axis_max: f64, half_width: usize) -> usize {
    let ratio = (value.abs() / axis_max).clamp(0.0, 1.0);
    ((ratio * half_width as f64).round() as usize).min(half_width)
}

/// Standalone SVG document for the chart.
pub fn render_svg(chart: &ComparisonChart) -> String {
    const WIDTH: f64 = 960.0;
    const LABEL_WIDTH: f64 = 260.0;
    const ROW_HEIGHT: f64 = 26.0;
    const TOP: f64 = 70.0;
    const SIDE_PAD: f64 = 40.0;

    let plot_left = LABEL_WIDTH;
    let plot_right = WIDTH - SIDE_PAD;
    let center = (plot_left + plot_right) / 2.0;
    let half = (plot_right - plot_left) / 2.0;
    let height = TOP + ROW_HEIGHT * chart.rows.len() as f64 + 60.0;
    let scale = |v: f64| center + v / chart.axis_max * half;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{height}\" \
         font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\">\n"
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>\n\
         <text x=\"{}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\" font-weight=\"bold\">{}</text>\n",
        WIDTH / 2.0,
        escape_markup(&chart.title)
    ));
    svg.push_str(&format!(
        "<text x=\"{}\" y=\"48\" text-anchor=\"end\" fill=\"#1f77b4\">{}</text>\n\
         <text x=\"{}\" y=\"48\" text-anchor=\"start\" fill=\"#d62728\">{}</text>\n",
        center - 8.0,
        escape_markup(&chart.left_player),
        center + 8.0,
        escape_markup(&chart.right_player)
    ));

    for (i, row) in chart.rows.iter().enumerate() {
        let y = TOP + ROW_HEIGHT * i as f64;
        let (left, right) = row.plotted();
        let left_x = scale(left);
        let right_x = scale(right);
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{}</text>\n",
            plot_left - 10.0,
            y + ROW_HEIGHT * 0.6,
            escape_markup(&row.label)
        ));
        for (x, fill) in [(left_x, "#1f77b4"), (right_x, "#d62728")] {
            svg.push_str(&format!(
                "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{fill}\"/>\n",
                x.min(center),
                y + 4.0,
                (x - center).abs(),
                ROW_HEIGHT - 8.0
            ));
        }
        for (x, value) in [(left_x, row.left), (right_x, row.right)] {
            let (anchor, text_x) = if x < center {
                ("end", x - 4.0)
            } else {
                ("start", x + 4.0)
            };
            svg.push_str(&format!(
                "<text x=\"{text_x:.1}\" y=\"{:.1}\" text-anchor=\"{anchor}\" font-size=\"10\">{}</text>\n",
                y + ROW_HEIGHT * 0.6,
                format_value(value)
            ));
        }
    }

    let axis_y = TOP + ROW_HEIGHT * chart.rows.len() as f64 + 10.0;
    svg.push_str(&format!(
        "<line x1=\"{center:.1}\" y1=\"{}\" x2=\"{center:.1}\" y2=\"{axis_y:.1}\" stroke=\"#333\"/>\n\
         <line x1=\"{plot_left:.1}\" y1=\"{axis_y:.1}\" x2=\"{plot_right:.1}\" y2=\"{axis_y:.1}\" stroke=\"#333\"/>\n",
        TOP - 4.0
    ));
    for tick in &chart.ticks {
        let x = scale(*tick);
        svg.push_str(&format!(
            "<line x1=\"{x:.1}\" y1=\"{axis_y:.1}\" x2=\"{x:.1}\" y2=\"{:.1}\" stroke=\"#333\"/>\n\
             <text x=\"{x:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"10\">{}</text>\n",
            axis_y + 5.0,
            axis_y + 18.0,
            format_value(tick.abs())
        ));
    }
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::{
        ChartRow, ComparisonChart, CoreStat, CoreStats, LABELS, compare, parse_number, render_svg,
        render_text, stat_key, symmetric_ticks,
    };
    use crate::competition::StatType;

    fn player(name: &str, stats: &[(&str, &str)]) -> CoreStats {
        CoreStats {
            player: name.to_string(),
            season: "2023-2024".to_string(),
            stats: stats
                .iter()
                .map(|(key, value)| CoreStat {
                    key: key.to_string(),
                    category: "Performance".to_string(),
                    stat: key.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn keys_are_lowercased_and_punctuation_free() {
        assert_eq!(stat_key("Per 90 Minutes", "G+A-PK"), "per_90_minutes_g_plus_a_pk");
        assert_eq!(stat_key("Standard", "SoT%"), "standard_sot_pct");
        assert_eq!(stat_key("General", "90s"), "general_90s");
    }

    #[test]
    fn numbers_accept_thousands_separators() {
        assert_eq!(parse_number("1,234"), Some(1234.0));
        assert_eq!(parse_number("45.5%"), Some(45.5));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn needs_exactly_two_players() {
        let one = vec![player("A", &[("performance_gls", "1")])];
        assert!(compare(&one, "2023-2024", "dl", StatType::Standard).is_err());
    }

    #[test]
    fn no_common_numeric_column_yields_none() {
        let players = vec![
            player("A", &[("performance_gls", "3"), ("general_squad", "Barcelona")]),
            player("B", &[("performance_ast", "4"), ("general_squad", "Real Madrid")]),
        ];
        let chart = compare(&players, "2023-2024", "dl", StatType::Standard).expect("ok");
        assert!(chart.is_none());
    }

    #[test]
    fn keeps_only_intersection_and_drops_excluded() {
        let players = vec![
            player(
                "A",
                &[
                    ("general_age", "16"),
                    ("playing_time_mp", "37"),
                    ("performance_gls", "7"),
                    ("performance_ast", "N/A"),
                    ("expected_xg", "5.5"),
                ],
            ),
            player(
                "B",
                &[
                    ("general_age", "25"),
                    ("playing_time_mp", "30"),
                    ("performance_gls", "1,012"),
                    ("performance_ast", "4"),
                ],
            ),
        ];
        let chart = compare(&players, "2023-2024", "dl", StatType::Standard)
            .expect("ok")
            .expect("chart");
        assert_eq!(chart.rows.len(), 1);
        assert_eq!(chart.rows[0].label, "Goals");
        assert_eq!(chart.rows[0].plotted(), (-7.0, 1012.0));
        assert_eq!(chart.axis_max, 1012.0);
        assert_eq!(chart.ticks, symmetric_ticks(1012.0));
    }

    fn chart(left: f64, right: f64) -> ComparisonChart {
        let axis_max = left.abs().max(right.abs());
        ComparisonChart {
            title: "A vs B".to_string(),
            left_player: "A".to_string(),
            right_player: "B".to_string(),
            rows: vec![ChartRow {
                key: "general_plus_minus".to_string(),
                label: "+/-".to_string(),
                left,
                right,
            }],
            axis_max,
            ticks: symmetric_ticks(axis_max),
        }
    }

    #[test]
    fn negative_left_value_is_drawn_right_of_centre() {
        let chart = chart(-3.0, 5.0);
        assert_eq!(chart.rows[0].plotted(), (3.0, 5.0));

        let svg = render_svg(&chart);
        assert!(!svg.contains("width=\"-"));
        assert!(svg.contains(
            "<rect x=\"590.0\" y=\"74.0\" width=\"198.0\" height=\"18.0\" fill=\"#1f77b4\"/>"
        ));
        assert!(svg.contains(
            "<rect x=\"590.0\" y=\"74.0\" width=\"330.0\" height=\"18.0\" fill=\"#d62728\"/>"
        ));

        let lines = render_text(&chart, 10);
        assert!(lines[1].contains("          |██████▓▓▓▓ -3 / 5"), "{}", lines[1]);
    }

    #[test]
    fn negative_right_value_is_drawn_left_of_centre() {
        let chart = chart(2.0, -4.0);
        let svg = render_svg(&chart);
        assert!(!svg.contains("width=\"-"));
        assert!(svg.contains(
            "<rect x=\"260.0\" y=\"74.0\" width=\"330.0\" height=\"18.0\" fill=\"#d62728\"/>"
        ));
        assert!(svg.contains(
            "<rect x=\"425.0\" y=\"74.0\" width=\"165.0\" height=\"18.0\" fill=\"#1f77b4\"/>"
        ));

        let lines = render_text(&chart, 4);
        assert!(lines[1].contains("▓▓██|     2 / -4"), "{}", lines[1]);
    }

    #[test]
    fn positive_values_diverge_from_the_centre() {
        let lines = render_text(&chart(4.0, 2.0), 4);
        assert!(lines[1].contains("████|▓▓   4 / 2"), "{}", lines[1]);
    }

    #[test]
    fn every_label_key_is_reachable_from_stat_key() {
        for (key, _) in LABELS {
            let (category, stat) = key.split_once('_').expect("category prefix");
            assert!(!category.is_empty(), "{key}");
            assert_eq!(stat_key(category, stat), *key);
        }
    }
}
