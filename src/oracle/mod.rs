//! Read-only collaborators consulted during expansion.

pub mod engine;
pub mod explorer;
pub mod synthetic;
pub mod table;

use std::time::Duration;
use thiserror::Error;

use crate::repertoire::key::PositionKey;

/// Both variants are transient: callers retry, then give up on that node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },
}

impl OracleError {
    pub fn unavailable(msg: impl Into<String>) -> Self { OracleError::Unavailable(msg.into()) }
}

/// A move as reported by a statistics source, not yet checked for legality.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveStat {
    /// SAN or UCI.
    pub notation: String,
    /// Share of games at the position, in `[0, 1]`.
    pub frequency: f64,
    pub games: u64,
}

impl MoveStat {
    pub fn new(notation: impl Into<String>, frequency: f64) -> Self {
        Self { notation: notation.into(), frequency, games: 0 }
    }
}

pub trait StatisticsOracle: Send + Sync {
    /// Moves played at the position reached by `key`. An empty list means no data.
    fn lookup(&self, key: &PositionKey) -> Result<Vec<MoveStat>, OracleError>;
}

pub trait EvaluationOracle: Send + Sync {
    /// Centipawns for the side that made the last move of `key`.
    fn score(&self, key: &PositionKey) -> Result<i32, OracleError>;
}

impl<T: StatisticsOracle + ?Sized> StatisticsOracle for &T {
    fn lookup(&self, key: &PositionKey) -> Result<Vec<MoveStat>, OracleError> { (**self).lookup(key) }
}

impl<T: EvaluationOracle + ?Sized> EvaluationOracle for &T {
    fn score(&self, key: &PositionKey) -> Result<i32, OracleError> { (**self).score(key) }
}

impl<T: StatisticsOracle + ?Sized> StatisticsOracle for Box<T> {
    fn lookup(&self, key: &PositionKey) -> Result<Vec<MoveStat>, OracleError> { (**self).lookup(key) }
}

impl<T: EvaluationOracle + ?Sized> EvaluationOracle for Box<T> {
    fn score(&self, key: &PositionKey) -> Result<i32, OracleError> { (**self).score(key) }
}

/// Turns raw per-move game counts into frequencies over the position total.
pub fn frequencies_from_counts(counts: Vec<(String, u64)>) -> Vec<MoveStat> {
    let total: u64 = counts.iter().map(|(_, g)| *g).sum();
    counts
        .into_iter()
        .map(|(notation, games)| {
            let frequency = if total > 0 { games as f64 / total as f64 } else { 0.0 };
            MoveStat { notation, frequency, games }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_become_shares_of_the_total() {
        let stats = frequencies_from_counts(vec![("e4".into(), 60), ("d4".into(), 30), ("c4".into(), 10)]);
        let f: Vec<f64> = stats.iter().map(|s| s.frequency).collect();
        assert_eq!(f, vec![0.6, 0.3, 0.1]);
        assert_eq!(stats[0].games, 60);
        assert!(frequencies_from_counts(vec![("e4".into(), 0)])[0].frequency == 0.0);
    }
}
