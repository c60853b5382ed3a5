use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::json;
use tracing::info;

use crate::compare::{ComparisonChart, render_svg};
use crate::profile::{PlayerProfile, UNKNOWN};
use crate::season_table::{SeasonStats, StatsOutcome};

const CSV_HEADER: [&str; 4] = ["Season", "Category", "Stat", "Value"];

/// What a stats export is about; used to name output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLabel {
    pub player: String,
    pub competition: String,
    pub season: String,
    pub stat_type: String,
}

impl ExportLabel {
    pub fn new(player: &str, competition: &str, season: &str, stat_type: &str) -> Self {
        Self {
            player: player.to_string(),
            competition: competition.to_string(),
            season: season.to_string(),
            stat_type: stat_type.to_string(),
        }
    }

    pub fn file_stem(&self) -> String {
        sanitize_file_name(&format!(
            "{}_{}_{}_{}",
            self.player, self.competition, self.season, self.stat_type
        ))
    }
}

/// Spaces and path separators become underscores.
pub fn sanitize_file_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect()
}

/// Escapes text for HTML and SVG bodies and attribute values.
pub fn escape_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn usable(outcome: &StatsOutcome) -> Option<&SeasonStats> {
    outcome.as_ref().ok().filter(|stats| !stats.is_empty())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))
}

/// Writes `Season,Category,Stat,Value` rows. Empty results and soft misses
/// write nothing and return `None`.
pub fn to_csv(outcome: &StatsOutcome, label: &ExportLabel, dir: &Path) -> Result<Option<PathBuf>> {
    let Some(stats) = usable(outcome) else {
        return Ok(None);
    };
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.csv", label.file_stem()));

    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("open csv {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;
    for (season, category, stat, value) in stats.rows() {
        writer.write_record([season, category, stat, value])?;
    }
    writer
        .flush()
        .with_context(|| format!("flush csv {}", path.display()))?;

    info!(path = %path.display(), "wrote csv");
    Ok(Some(path))
}

/// Same rows as [`to_csv`] in a single worksheet.
pub fn to_xlsx(outcome: &StatsOutcome, label: &ExportLabel, dir: &Path) -> Result<Option<PathBuf>> {
    let Some(stats) = usable(outcome) else {
        return Ok(None);
    };
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.xlsx", label.file_stem()));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Stats")?;
        write_row(sheet, 0, &CSV_HEADER)?;
        for (idx, (season, category, stat, value)) in stats.rows().enumerate() {
            write_row(sheet, idx as u32 + 1, &[season, category, stat, value])?;
        }
    }
    workbook
        .save(&path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    info!(path = %path.display(), "wrote xlsx");
    Ok(Some(path))
}

fn write_row(sheet: &mut Worksheet, row: u32, values: &[&str]) -> Result<()> {
    for (col, value) in values.iter().enumerate() {
        sheet
            .write_string(row, col as u16, *value)
            .with_context(|| format!("write cell ({row},{col})"))?;
    }
    Ok(())
}

/// Profile plus stats (or the reason there are none) as one JSON document.
/// `outcome` is `None` when no stats were requested.
pub fn to_json(
    profile: &PlayerProfile,
    outcome: Option<&StatsOutcome>,
    label: &ExportLabel,
    dir: &Path,
) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.json", label.file_stem()));
    let (stats, message) = match outcome {
        Some(Ok(stats)) => (serde_json::to_value(stats)?, None),
        Some(Err(miss)) => (serde_json::Value::Null, Some(miss.message())),
        None => (serde_json::Value::Null, None),
    };
    let doc = json!({
        "profile": profile,
        "competition": label.competition,
        "season": label.season,
        "stat_type": label.stat_type,
        "stats": stats,
        "message": message,
    });
    let text = serde_json::to_string_pretty(&doc)?;
    fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "wrote json");
    Ok(path)
}

pub fn passport_path(profile: &PlayerProfile, dir: &Path) -> PathBuf {
    dir.join(format!("passport_{}.html", sanitize_file_name(&profile.name)))
}

/// Renders the passport card and writes it under `dir`, replacing any earlier
/// passport for the same player name.
pub fn to_passport_html(profile: &PlayerProfile, dir: &Path) -> Result<(String, PathBuf)> {
    let html = render_passport(profile, &Local::now().format("%Y-%m-%d %H:%M").to_string());
    ensure_dir(dir)?;
    let path = passport_path(profile, dir);
    fs::write(&path, &html).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "wrote passport");
    Ok((html, path))
}

pub fn render_passport(profile: &PlayerProfile, generated_at: &str) -> String {
    let photo = if profile.photo_url == UNKNOWN {
        "<div class=\"photo placeholder\">?</div>".to_string()
    } else {
        format!(
            "<img class=\"photo\" src=\"{}\" alt=\"{}\">",
            escape_markup(&profile.photo_url),
            escape_markup(&profile.name)
        )
    };
    let rows = profile
        .fields()
        .iter()
        .skip(1)
        .map(|(label, value)| {
            format!(
                "      <tr><th>{}</th><td>{}</td></tr>\n",
                label,
                escape_markup(value)
            )
        })
        .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Passport: {name}</title>
<style>
  body {{ font-family: Helvetica, Arial, sans-serif; background: #eef1f4; }}
  .card {{ max-width: 560px; margin: 40px auto; background: #fff; border-radius: 10px;
          box-shadow: 0 2px 10px rgba(0,0,0,.15); padding: 24px; }}
  .head {{ display: flex; align-items: center; gap: 20px; border-bottom: 2px solid #1f3a5f; padding-bottom: 12px; }}
  .photo {{ width: 110px; height: 140px; object-fit: cover; border-radius: 6px; }}
  .placeholder {{ background: #ccd; display: flex; align-items: center; justify-content: center; font-size: 40px; }}
  h1 {{ margin: 0; color: #1f3a5f; }}
  table {{ width: 100%; border-collapse: collapse; margin-top: 16px; }}
  th {{ text-align: left; color: #555; width: 35%; padding: 6px 0; }}
  td {{ padding: 6px 0; }}
  footer {{ margin-top: 16px; font-size: 11px; color: #888; }}
</style>
</head>
<body>
  <div class="card">
    <div class="head">
      {photo}
      <h1>{name}</h1>
    </div>
    <table>
{rows}    </table>
    <footer>Generated {generated_at}</footer>
  </div>
</body>
</html>
"#,
        name = escape_markup(&profile.name),
        photo = photo,
        rows = rows,
        generated_at = escape_markup(generated_at),
    )
}

/// Writes the comparison chart as a standalone SVG file.
pub fn write_chart_svg(chart: &ComparisonChart, label: &ExportLabel, dir: &Path) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("compare_{}.svg", label.file_stem()));
    fs::write(&path, render_svg(chart)).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "wrote comparison chart");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{ExportLabel, escape_markup, render_passport, sanitize_file_name};
    use crate::profile::PlayerProfile;

    #[test]
    fn file_names_lose_spaces_and_slashes() {
        assert_eq!(sanitize_file_name("Lamine Yamal"), "Lamine_Yamal");
        let label = ExportLabel::new("Lamine Yamal", "dl", "2023-2024", "standard");
        assert_eq!(label.file_stem(), "Lamine_Yamal_dl_2023-2024_standard");
        assert_eq!(sanitize_file_name("a/b\\c"), "a_b_c");
    }

    #[test]
    fn passport_escapes_field_values() {
        let profile = PlayerProfile {
            name: "Tom <script>".to_string(),
            club: "Brighton & Hove Albion".to_string(),
            ..PlayerProfile::default()
        };
        let html = render_passport(&profile, "2024-05-01 12:00");
        assert!(html.contains("Tom &lt;script&gt;"));
        assert!(html.contains("Brighton &amp; Hove Albion"));
        assert!(html.contains("Generated 2024-05-01 12:00"));
        assert!(html.contains("placeholder"));
    }

    #[test]
    fn markup_escaping() {
        assert_eq!(escape_markup("a\"b'c"), "a&quot;b&#39;c");
    }
}
