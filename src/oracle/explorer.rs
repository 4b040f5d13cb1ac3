//! Lichess opening explorer client.

use clap::ValueEnum;
use log::trace;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::board::cozy::Position;
use crate::error::{RepertoireError, Result};
use crate::oracle::{frequencies_from_counts, MoveStat, OracleError, StatisticsOracle};
use crate::repertoire::key::PositionKey;

pub const RATING_BANDS: [u16; 5] = [1600, 1800, 2000, 2200, 2500];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    /// Over-the-board master games.
    Masters,
    /// Online games from lichess.org, filtered by rating band.
    #[default]
    Lichess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub database: Database,
    /// Lichess database only: smallest band at or above this rating.
    pub min_rating: Option<u16>,
    /// Lichess database only, e.g. `["blitz", "rapid", "classical"]`.
    pub speeds: Vec<String>,
    pub token: Option<String>,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://explorer.lichess.ovh".to_string(),
            database: Database::Lichess,
            min_rating: Some(2500),
            speeds: Vec::new(),
            token: None,
            timeout_ms: 10_000,
            user_agent: concat!("repertoire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Smallest rating band covering `min_rating`, or the top band.
pub fn rating_band(min_rating: u16) -> u16 {
    RATING_BANDS.iter().copied().find(|&b| b >= min_rating).unwrap_or(RATING_BANDS[RATING_BANDS.len() - 1])
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    #[serde(default)]
    moves: Vec<ExplorerMove>,
}

#[derive(Debug, Deserialize)]
struct ExplorerMove {
    uci: String,
    #[serde(default)]
    white: u64,
    #[serde(default)]
    draws: u64,
    #[serde(default)]
    black: u64,
}

/// Parses an explorer JSON body into moves with frequencies over the position total.
pub fn parse_response(body: &str) -> std::result::Result<Vec<MoveStat>, OracleError> {
    let resp: ExplorerResponse =
        serde_json::from_str(body).map_err(|e| OracleError::unavailable(format!("bad explorer response: {e}")))?;
    Ok(frequencies_from_counts(resp.moves.into_iter().map(|m| (m.uci, m.white + m.draws + m.black)).collect()))
}

pub struct Explorer {
    client: Client,
    config: ExplorerConfig,
}

impl Explorer {
    pub fn new(config: ExplorerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RepertoireError::config(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> String {
        let db = match self.config.database { Database::Masters => "masters", Database::Lichess => "lichess" };
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), db)
    }

    /// Query parameters for the position reached by `key`; FEN is cut to its first four fields.
    pub fn query(&self, key: &PositionKey) -> Vec<(&'static str, String)> {
        let fen = Position::from_key(key).fen();
        let fen4 = fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ");
        let mut q = vec![("fen", fen4)];
        if self.config.database == Database::Lichess {
            q.push(("variant", "standard".to_string()));
            if let Some(r) = self.config.min_rating { q.push(("ratings", rating_band(r).to_string())); }
            if !self.config.speeds.is_empty() { q.push(("speeds", self.config.speeds.join(","))); }
        }
        q
    }
}

impl StatisticsOracle for Explorer {
    fn lookup(&self, key: &PositionKey) -> std::result::Result<Vec<MoveStat>, OracleError> {
        let mut req = self.client.get(self.endpoint()).query(&self.query(key));
        if let Some(t) = &self.config.token { req = req.bearer_auth(t); }
        let resp = req.send().map_err(|e| OracleError::unavailable(format!("explorer request: {e}")))?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(OracleError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(OracleError::unavailable(format!("explorer returned HTTP {status}")));
        }
        let body = resp.text().map_err(|e| OracleError::unavailable(format!("explorer body: {e}")))?;
        trace!("explorer [{}]: {}", key.line(), body);
        parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Color;

    #[test]
    fn picks_smallest_band_at_or_above() {
        assert_eq!(rating_band(0), 1600);
        assert_eq!(rating_band(1800), 1800);
        assert_eq!(rating_band(2100), 2200);
        assert_eq!(rating_band(2800), 2500);
    }

    #[test]
    fn parses_counts_into_frequencies() {
        let body = r#"{"white":10,"draws":5,"black":5,"moves":[
            {"uci":"e2e4","san":"e4","averageRating":2400,"white":6,"draws":3,"black":3},
            {"uci":"d2d4","san":"d4","averageRating":2410,"white":4,"draws":2,"black":2}
        ]}"#;
        let stats = parse_response(body).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].notation, "e2e4");
        assert_eq!(stats[0].games, 12);
        assert!((stats[0].frequency - 0.6).abs() < 1e-12);
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn lichess_query_carries_band_and_speeds() {
        let cfg = ExplorerConfig {
            database: Database::Lichess,
            min_rating: Some(1900),
            speeds: vec!["blitz".into(), "rapid".into()],
            ..Default::default()
        };
        let ex = Explorer::new(cfg).unwrap();
        assert_eq!(ex.endpoint(), "https://explorer.lichess.ovh/lichess");
        let q = ex.query(&PositionKey::root(Color::White));
        assert_eq!(q[0], ("fen", "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -".to_string()));
        assert!(q.contains(&("ratings", "2000".to_string())));
        assert!(q.contains(&("speeds", "blitz,rapid".to_string())));
    }

    #[test]
    fn defaults_to_lichess_top_band() {
        let ex = Explorer::new(ExplorerConfig::default()).unwrap();
        assert_eq!(ex.endpoint(), "https://explorer.lichess.ovh/lichess");
        assert!(ex.query(&PositionKey::root(Color::White)).contains(&("ratings", "2500".to_string())));
    }
}
