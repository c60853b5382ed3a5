//! Page fetching with retry, backoff, a politeness floor and a fallback
//! client for pages that keep refusing the plain one.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::Result;
use crate::http_client::{browser_client, primary_client};

const MAX_JITTER_MS: u64 = 250;

/// What a fetch produced. `status` is 0 when no HTTP response was ever
/// received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: Option<String>,
    pub final_url: String,
}

impl FetchOutcome {
    pub fn failed(url: &str, status: u16) -> Self {
        Self {
            status,
            body: None,
            final_url: url.to_string(),
        }
    }

    /// Body of a 200 response, if that is what came back.
    pub fn ok_body(&self) -> Option<&str> {
        if self.status == 200 {
            self.body.as_deref()
        } else {
            None
        }
    }
}

/// Anything that can turn a URL into a page. The live implementation is
/// [`PageFetcher`]; tests swap in fixture-backed sources.
pub trait PageSource {
    fn fetch(&mut self, url: &str) -> FetchOutcome;
}

pub struct PageFetcher {
    primary: Client,
    fallback: Option<Client>,
    max_retries: u32,
    backoff_base: Duration,
    rate_floor: Duration,
    last_success: Option<Instant>,
}

enum Attempt {
    Done(FetchOutcome),
    Retry(u16),
}

impl PageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let primary = primary_client(&config.base_url, config.timeout)?;
        let fallback = if config.fallback_enabled {
            Some(browser_client(&config.base_url, config.timeout)?)
        } else {
            None
        };
        Ok(Self {
            primary,
            fallback,
            max_retries: config.max_retries.max(1),
            backoff_base: config.backoff_base,
            rate_floor: config.rate_floor,
            last_success: None,
        })
    }

    fn wait_for_rate_floor(&self) {
        let Some(last) = self.last_success else {
            return;
        };
        if let Some(remaining) = self.rate_floor.checked_sub(last.elapsed()) {
            if !remaining.is_zero() {
                debug!(wait_ms = remaining.as_millis() as u64, "politeness delay");
                thread::sleep(remaining);
            }
        }
    }

    fn backoff(&self, attempt: u32) {
        let delay = backoff_delay(self.backoff_base, attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
        thread::sleep(delay);
    }

    fn primary_attempt(&mut self, url: &str) -> Attempt {
        self.wait_for_rate_floor();
        let resp = match self.primary.get(url).send() {
            Ok(resp) => resp,
            Err(err) => {
                warn!(url, error = %err, "request failed");
                return Attempt::Retry(0);
            }
        };

        let status = resp.status();
        if status == StatusCode::OK {
            return self.finish_success(url, resp);
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url, status = status.as_u16(), "blocked or rate limited");
            return Attempt::Retry(status.as_u16());
        }

        // Anything else is final; 5xx bodies are not worth keeping.
        let final_url = resp.url().to_string();
        let body = if status.is_server_error() {
            None
        } else {
            resp.text().ok()
        };
        Attempt::Done(FetchOutcome {
            status: status.as_u16(),
            body,
            final_url,
        })
    }

    fn fallback_attempt(&mut self, url: &str) -> Attempt {
        let Some(client) = self.fallback.as_ref() else {
            return Attempt::Retry(0);
        };
        self.wait_for_rate_floor();
        let resp = match client.get(url).send() {
            Ok(resp) => resp,
            Err(err) => {
                warn!(url, error = %err, "fallback request failed");
                return Attempt::Retry(0);
            }
        };
        let status = resp.status();
        if status == StatusCode::OK {
            return self.finish_success(url, resp);
        }
        warn!(url, status = status.as_u16(), "fallback refused");
        Attempt::Retry(status.as_u16())
    }

    fn finish_success(&mut self, url: &str, resp: Response) -> Attempt {
        let final_url = resp.url().to_string();
        match resp.text() {
            Ok(body) => {
                self.last_success = Some(Instant::now());
                Attempt::Done(FetchOutcome {
                    status: 200,
                    body: Some(body),
                    final_url,
                })
            }
            Err(err) => {
                warn!(url, error = %err, "failed reading body");
                Attempt::Retry(200)
            }
        }
    }
}

impl PageSource for PageFetcher {
    fn fetch(&mut self, url: &str) -> FetchOutcome {
        let mut last_status = 0u16;

        for attempt in 0..self.max_retries {
            debug!(url, attempt, "fetching");
            match self.primary_attempt(url) {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(status) => {
                    if status != 0 {
                        last_status = status;
                    }
                    self.backoff(attempt);
                }
            }
        }

        if self.fallback.is_some() {
            info!(url, "escalating to browser-like client");
            for attempt in 0..self.max_retries {
                match self.fallback_attempt(url) {
                    Attempt::Done(outcome) => return outcome,
                    Attempt::Retry(status) => {
                        if status != 0 {
                            last_status = status;
                        }
                        self.backoff(attempt);
                    }
                }
            }
        }

        warn!(url, last_status, "giving up");
        FetchOutcome::failed(url, last_status)
    }
}

/// `base * 2^attempt` plus a little jitter (never more than `base` itself).
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.min(16)));
    let jitter_cap = (base.as_millis() as u64).min(MAX_JITTER_MS);
    if jitter_cap == 0 {
        return exp;
    }
    let jitter = rand::thread_rng().gen_range(0..=jitter_cap);
    exp + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{FetchOutcome, backoff_delay};

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(1000);
        let first = backoff_delay(base, 0);
        let third = backoff_delay(base, 2);
        assert!(first >= Duration::from_millis(1000) && first <= Duration::from_millis(1250));
        assert!(third >= Duration::from_millis(4000) && third <= Duration::from_millis(4250));
    }

    #[test]
    fn zero_base_means_no_wait() {
        assert_eq!(backoff_delay(Duration::ZERO, 3), Duration::ZERO);
    }

    #[test]
    fn only_200_exposes_a_body() {
        let not_found = FetchOutcome {
            status: 404,
            body: Some("gone".to_string()),
            final_url: "u".to_string(),
        };
        assert!(not_found.ok_body().is_none());
        assert!(FetchOutcome::failed("u", 0).ok_body().is_none());
    }
}
