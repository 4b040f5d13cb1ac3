//! In-memory statistics and scores keyed by SAN line, loadable from JSON.
//!
//! ```json
//! { "moves":  { "":   [{"move": "e4", "frequency": 0.6}, {"move": "d4", "frequency": 0.3}],
//!               "e4": [{"move": "e5", "games": 700}, {"move": "c5", "games": 300}] },
//!   "scores": { "e4": 30, "d4": 25 },
//!   "default_score": 0,
//!   "unavailable": ["e4 c5"] }
//! ```
//!
//! A line lists either frequencies or game counts for all of its moves, never a mix.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{RepertoireError, Result};
use crate::oracle::{frequencies_from_counts, EvaluationOracle, MoveStat, OracleError, StatisticsOracle};
use crate::repertoire::key::PositionKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMove {
    #[serde(rename = "move")]
    pub notation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableOracle {
    #[serde(default)]
    pub moves: HashMap<String, Vec<TableMove>>,
    #[serde(default)]
    pub scores: HashMap<String, i32>,
    #[serde(default)]
    pub default_score: Option<i32>,
    /// Lines for which both lookups fail as `Unavailable`.
    #[serde(default)]
    pub unavailable: HashSet<String>,
}

impl TableOracle {
    pub fn new() -> Self { Self::default() }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RepertoireError::Io { path: path.to_path_buf(), source })?;
        let table: Self =
            serde_json::from_str(&text).map_err(|source| RepertoireError::Json { path: path.to_path_buf(), source })?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        for (line, entries) in &self.moves {
            let with_freq = entries.iter().filter(|e| e.frequency.is_some()).count();
            if with_freq != 0 && with_freq != entries.len() {
                return Err(RepertoireError::config(format!(
                    "table line [{line}] mixes frequencies and game counts"
                )));
            }
        }
        Ok(())
    }

    pub fn with_moves(mut self, line: &str, moves: &[(&str, f64)]) -> Self {
        let entries = moves
            .iter()
            .map(|(m, f)| TableMove { notation: m.to_string(), frequency: Some(*f), games: None })
            .collect();
        self.moves.insert(line.to_string(), entries);
        self
    }

    pub fn with_score(mut self, line: &str, cp: i32) -> Self {
        self.scores.insert(line.to_string(), cp);
        self
    }

    pub fn with_default_score(mut self, cp: i32) -> Self { self.default_score = Some(cp); self }

    pub fn with_unavailable(mut self, line: &str) -> Self {
        self.unavailable.insert(line.to_string());
        self
    }

    fn find<'t, T>(&self, map: &'t HashMap<String, T>, key: &PositionKey) -> Option<&'t T> {
        map.get(&key.line()).or_else(|| map.get(&key.uci_moves().join(" ")))
    }

    fn check_available(&self, key: &PositionKey) -> std::result::Result<(), OracleError> {
        let line = key.line();
        if self.unavailable.contains(&line) { return Err(OracleError::unavailable(format!("table marks [{line}] unavailable"))); }
        Ok(())
    }
}

impl StatisticsOracle for TableOracle {
    fn lookup(&self, key: &PositionKey) -> std::result::Result<Vec<MoveStat>, OracleError> {
        self.check_available(key)?;
        let Some(entries) = self.find(&self.moves, key) else { return Ok(Vec::new()) };
        if entries.iter().all(|e| e.frequency.is_none()) {
            let counts = entries.iter().map(|e| (e.notation.clone(), e.games.unwrap_or(0))).collect();
            return Ok(frequencies_from_counts(counts));
        }
        Ok(entries
            .iter()
            .map(|e| MoveStat { notation: e.notation.clone(), frequency: e.frequency.unwrap_or(0.0), games: e.games.unwrap_or(0) })
            .collect())
    }
}

impl EvaluationOracle for TableOracle {
    fn score(&self, key: &PositionKey) -> std::result::Result<i32, OracleError> {
        self.check_available(key)?;
        self.find(&self.scores, key)
            .copied()
            .or(self.default_score)
            .ok_or_else(|| OracleError::unavailable(format!("no score for [{}]", key.line())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Color;

    #[test]
    fn parses_fixture_with_counts() {
        let json = r#"{ "moves": { "": [{"move": "e4", "games": 3}, {"move": "d2d4", "games": 1}] }, "scores": { "e4": 20 } }"#;
        let t: TableOracle = serde_json::from_str(json).unwrap();
        let root = PositionKey::root(Color::White);
        let stats = t.lookup(&root).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].frequency, 0.75);
        assert_eq!(stats[1].notation, "d2d4");
        assert!(t.score(&root).is_err(), "no default score");
    }

    #[test]
    fn documented_example_keeps_every_move() {
        let json = r#"{ "moves": { "": [{"move": "e4", "frequency": 0.6}, {"move": "d4", "frequency": 0.3}],
                                  "e4": [{"move": "e5", "games": 700}, {"move": "c5", "games": 300}] } }"#;
        let t: TableOracle = serde_json::from_str(json).unwrap();
        assert!(t.validate().is_ok());
        let e4 = PositionKey::parse_line(Color::White, "e4").unwrap();
        let f: Vec<f64> = t.lookup(&e4).unwrap().iter().map(|s| s.frequency).collect();
        assert_eq!(f, vec![0.7, 0.3]);
    }

    #[test]
    fn rejects_lines_mixing_frequencies_and_counts() {
        let dir = std::path::Path::new("target/table_test");
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("mixed.json");
        std::fs::write(&path, r#"{ "moves": { "": [{"move": "e4", "frequency": 0.6}, {"move": "d4", "games": 300}] } }"#).unwrap();
        assert!(matches!(TableOracle::load(&path), Err(RepertoireError::ConfigInvalid(_))));
    }
}
