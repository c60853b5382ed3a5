//! Failures raised by the scraping pipeline.
//!
//! Structural misses inside a fetched page (a table that is not there, a
//! season without data) are not errors; see [`crate::season_table::StatsMiss`].

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// Every attempt with every client failed. `status` is the last HTTP
    /// status seen, or 0 when no response ever arrived.
    #[error("download failed for {url} (last status {status})")]
    Transport { url: String, status: u16 },

    /// The search page contained no player links at all.
    #[error("no player found for \"{query}\"")]
    NoResults { query: String },

    /// Player links exist but none resembles the query closely enough.
    #[error("no player resembles \"{query}\" (best candidate: {best})")]
    NoMatch { query: String, best: String },

    #[error("unknown competition \"{0}\" (expected one of: all, dl, dc, ic, nt)")]
    UnknownCompetition(String),

    #[error("unknown stat type \"{0}\"")]
    UnknownStatType(String),

    #[error("not a player profile url: {0}")]
    InvalidProfileUrl(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ScrapeError {
    /// True for the rejected-query family (nothing usable came back from the
    /// search), as opposed to transport trouble.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoResults { .. } | Self::NoMatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::ScrapeError;

    #[test]
    fn only_search_misses_count_as_no_match() {
        let transport = ScrapeError::Transport {
            url: "https://fbref.com/x".to_string(),
            status: 0,
        };
        assert!(!transport.is_no_match());
        assert_eq!(
            transport.to_string(),
            "download failed for https://fbref.com/x (last status 0)"
        );
        assert!(!ScrapeError::InvalidInput("empty".to_string()).is_no_match());
        assert!(
            ScrapeError::NoResults {
                query: "Pedri".to_string()
            }
            .is_no_match()
        );
    }
}
