use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::similarity::{similarity, tokens_overlap};

pub const UNKNOWN: &str = "unknown";

const FULL_NAME_MIN_SIMILARITY: f64 = 0.70;
const SEPARATORS: [char; 5] = ['▪', '•', '|', '·', '●'];
const NOT_A_NAME: &[&str] = &[
    "goalkeeper",
    "defender",
    "midfielder",
    "forward",
    "winger",
    "striker",
    "centre",
    "center",
    "back",
    "left",
    "right",
    "footed",
    "position",
    "born",
    "club",
    "wages",
    "national",
    "team",
    "citizenship",
    "height",
    "weight",
    "twitter",
    "instagram",
    "via",
];

static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));
static META_P_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#meta p").expect("static selector"));
static PHOTO_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#meta .media-item img, #meta img").expect("static selector")
});

static POSITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^position\s*:\s*(.+)$").expect("static regex"));
static FOOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^foot(?:ed)?\s*:\s*(.+)$").expect("static regex"));
static BORN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^born\s*:\s*(.+)$").expect("static regex"));
static NATIONAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:national\s+team|citizenship)\s*:\s*(.+)$").expect("static regex")
});
static CLUB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^club\s*:\s*(.+)$").expect("static regex"));
static WAGES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^wages\s*:?\s*(.+)$").expect("static regex"));

/// Biographical card for one player. Fields the page does not carry hold
/// [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerProfile {
    pub name: String,
    pub full_name: String,
    pub position: String,
    pub footed: String,
    pub birth: String,
    pub national_team: String,
    pub club: String,
    pub wages: String,
    pub photo_url: String,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            full_name: UNKNOWN.to_string(),
            position: UNKNOWN.to_string(),
            footed: UNKNOWN.to_string(),
            birth: UNKNOWN.to_string(),
            national_team: UNKNOWN.to_string(),
            club: UNKNOWN.to_string(),
            wages: UNKNOWN.to_string(),
            photo_url: UNKNOWN.to_string(),
        }
    }
}

impl PlayerProfile {
    /// `(label, value)` pairs in display order.
    pub fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("Name", self.name.as_str()),
            ("Full name", self.full_name.as_str()),
            ("Position", self.position.as_str()),
            ("Footed", self.footed.as_str()),
            ("Born", self.birth.as_str()),
            ("National team", self.national_team.as_str()),
            ("Club", self.club.as_str()),
            ("Wages", self.wages.as_str()),
        ]
    }
}

#[derive(Clone, Copy)]
enum Field {
    Position,
    Footed,
    Birth,
    National,
    Club,
    Wages,
}

/// Parses a profile page. `page_url` resolves a relative photo path and
/// `query_name` (what the user typed) helps recognise the full-name line.
pub fn extract_profile(html: &str, page_url: &str, query_name: &str) -> PlayerProfile {
    let document = Html::parse_document(html);
    let mut profile = PlayerProfile::default();

    if let Some(name) = document
        .select(&H1_SELECTOR)
        .next()
        .map(clean_text)
        .filter(|text| !text.is_empty())
    {
        profile.name = name;
    }

    if let Some(src) = document
        .select(&PHOTO_SELECTOR)
        .find_map(|img| img.value().attr("src"))
    {
        profile.photo_url = resolve_url(page_url, src);
    }

    for paragraph in document.select(&META_P_SELECTOR) {
        let text = clean_text(paragraph);
        for fragment in text.split(SEPARATORS) {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            if let Some((field, value)) = labelled_field(fragment) {
                set_once(&mut profile, field, value);
                continue;
            }
            if profile.full_name == UNKNOWN
                && is_full_name(fragment, query_name, &profile.name)
            {
                profile.full_name = fragment.to_string();
            }
        }
    }

    debug!(name = %profile.name, full_name = %profile.full_name, "extracted profile");
    profile
}

fn labelled_field(fragment: &str) -> Option<(Field, String)> {
    let patterns: [(&Regex, Field); 6] = [
        (&*POSITION_RE, Field::Position),
        (&*FOOTED_RE, Field::Footed),
        (&*BORN_RE, Field::Birth),
        (&*NATIONAL_RE, Field::National),
        (&*CLUB_RE, Field::Club),
        (&*WAGES_RE, Field::Wages),
    ];
    for (re, field) in patterns {
        if let Some(caps) = re.captures(fragment) {
            let value = caps.get(1)?.as_str().trim();
            let value = match field {
                Field::Wages => first_sentence(value),
                _ => value.to_string(),
            };
            if value.is_empty() {
                return None;
            }
            return Some((field, value));
        }
    }
    None
}

fn set_once(profile: &mut PlayerProfile, field: Field, value: String) {
    let slot = match field {
        Field::Position => &mut profile.position,
        Field::Footed => &mut profile.footed,
        Field::Birth => &mut profile.birth,
        Field::National => &mut profile.national_team,
        Field::Club => &mut profile.club,
        Field::Wages => &mut profile.wages,
    };
    if *slot == UNKNOWN {
        *slot = value;
    }
}

fn first_sentence(value: &str) -> String {
    let cut = value.find(". ").unwrap_or(value.len());
    value[..cut].trim().trim_end_matches('.').trim().to_string()
}

/// Whether a metadata fragment is the player's full legal name.
pub fn is_full_name(fragment: &str, query_name: &str, canonical_name: &str) -> bool {
    if fragment.contains(':') || fragment.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let references = [query_name, canonical_name];
    for reference in references {
        if reference.trim().is_empty() || reference == UNKNOWN {
            continue;
        }
        if tokens_overlap(fragment, reference)
            || similarity(fragment, reference) >= FULL_NAME_MIN_SIMILARITY
        {
            return true;
        }
    }
    looks_like_name(fragment)
}

fn looks_like_name(fragment: &str) -> bool {
    let words = fragment.split_whitespace().collect::<Vec<_>>();
    if words.len() < 2 {
        return false;
    }
    !words.iter().any(|word| {
        let lower = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        NOT_A_NAME.contains(&lower.as_str())
    })
}

fn clean_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_url(page_url: &str, src: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => url.to_string(),
        Err(_) => src.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{first_sentence, is_full_name, labelled_field};

    #[test]
    fn wages_keep_only_the_first_sentence() {
        assert_eq!(
            first_sentence("€ 1,000,000 Weekly Wages (€ 52,000,000 Annual). Via Capology"),
            "€ 1,000,000 Weekly Wages (€ 52,000,000 Annual)"
        );
        assert_eq!(first_sentence("£ 40,000 Weekly."), "£ 40,000 Weekly");
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert!(labelled_field("FOOTED: Left").is_some());
        assert!(labelled_field("Citizenship: Spain").is_some());
        assert!(labelled_field("Lamine Yamal Nasraoui Ebana").is_none());
    }

    #[test]
    fn full_name_detection() {
        assert!(is_full_name("Lamine Yamal Nasraoui Ebana", "yamal", "Lamine Yamal"));
        assert!(is_full_name("Pedro González López", "pedri", "Pedri"));
        assert!(!is_full_name("180cm, 68kg", "yamal", "Lamine Yamal"));
        assert!(!is_full_name("Left Winger", "xyz", "Nobody"));
        assert!(!is_full_name("Barcelona", "xyz", "Nobody"));
    }
}
