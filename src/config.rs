use clap::ValueEnum;
use cozy_chess::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RepertoireError, Result};
use crate::oracle::explorer::ExplorerConfig;
use crate::repertoire::emit::LineStyle;
use crate::repertoire::policy::ExpansionPolicy;
use crate::repertoire::retry::RetryPolicy;
use crate::uci::EngineConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Colors {
    White,
    Black,
    #[default]
    Both,
}

impl Colors {
    pub fn perspectives(self) -> Vec<Color> {
        match self {
            Colors::White => vec![Color::White],
            Colors::Black => vec![Color::Black],
            Colors::Both => vec![Color::White, Color::Black],
        }
    }
}

/// Everything a run needs; loaded from JSON and then overridden by command line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub policy: ExpansionPolicy,
    pub retry: RetryPolicy,
    pub explorer: ExplorerConfig,
    pub engine: EngineConfig,
    /// JSON table used instead of the opening explorer.
    pub statistics_table: Option<PathBuf>,
    /// JSON table used instead of the engine.
    pub score_table: Option<PathBuf>,
    /// Seeded pseudo-random oracles replacing explorer and engine (dry runs).
    pub synthetic_seed: Option<u64>,
    pub colors: Colors,
    pub white_out: PathBuf,
    pub black_out: PathBuf,
    /// Directory for `white_tree.json` / `black_tree.json` reports.
    pub tree_dir: Option<PathBuf>,
    pub style: LineStyle,
    pub threads: usize,
    /// Per color; nodes reached after it are left as leaves.
    pub timeout_secs: Option<u64>,
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            policy: ExpansionPolicy::default(),
            retry: RetryPolicy::default(),
            explorer: ExplorerConfig::default(),
            engine: EngineConfig::default(),
            statistics_table: None,
            score_table: None,
            synthetic_seed: None,
            colors: Colors::Both,
            white_out: PathBuf::from("white_openings.txt"),
            black_out: PathBuf::from("black_openings.txt"),
            tree_dir: None,
            style: LineStyle::San,
            threads: 1,
            timeout_secs: None,
            progress: true,
        }
    }
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RepertoireError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text).map_err(|source| RepertoireError::Json { path: path.to_path_buf(), source })
    }

    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        if self.threads == 0 { return Err(RepertoireError::config("threads must be at least 1")); }
        if self.retry.attempts == 0 { return Err(RepertoireError::config("retry.attempts must be at least 1")); }
        if self.score_table.is_none() && self.synthetic_seed.is_none() {
            if self.engine.instances == 0 { return Err(RepertoireError::config("engine.instances must be at least 1")); }
            if self.engine.depth == Some(0) || (self.engine.depth.is_none() && self.engine.movetime_ms == 0) {
                return Err(RepertoireError::config("engine needs a non-zero depth or movetime"));
            }
        }
        if self.timeout_secs == Some(0) { return Err(RepertoireError::config("timeout_secs must be positive when set")); }
        if self.colors == Colors::Both && self.white_out == self.black_out {
            return Err(RepertoireError::config(format!("white and black outputs both point at {}", self.white_out.display())));
        }
        Ok(())
    }

    pub fn output_for(&self, color: Color) -> &Path {
        if color == Color::White { &self.white_out } else { &self.black_out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: RunConfig = serde_json::from_str(r#"{ "policy": { "max_depth": 4 }, "colors": "black" }"#).unwrap();
        assert_eq!(cfg.policy.max_depth, 4);
        assert_eq!(cfg.policy.max_branching, ExpansionPolicy::default().max_branching);
        assert_eq!(cfg.colors.perspectives(), vec![Color::Black]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_shared_output_path() {
        let mut cfg = RunConfig::default();
        cfg.black_out = cfg.white_out.clone();
        assert!(matches!(cfg.validate(), Err(RepertoireError::ConfigInvalid(_))));
    }
}
