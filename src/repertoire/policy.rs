use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{RepertoireError, Result};
use crate::repertoire::candidate::MoveCandidate;

/// Order applied to candidates before the width cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Ranking {
    /// Most played first, evaluation breaks ties.
    #[default]
    Frequency,
    /// Best scored first, frequency breaks ties.
    Evaluation,
}

/// Thresholds that decide which candidate moves become children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionPolicy {
    /// Lines never grow beyond this many plies.
    pub max_depth: usize,
    /// Minimum share of games a move needs at its position.
    pub min_frequency: f64,
    /// Largest allowed gap, in centipawns, between the node's best evaluation and a kept move.
    pub max_loss: f64,
    pub max_branching: usize,
    /// Cap used instead of `max_branching` where the perspective color is to move.
    pub own_branching: Option<usize>,
    /// Ordering where the perspective color is to move; opponent nodes always rank by frequency.
    pub own_ranking: Ranking,
    /// At opponent nodes, keep the shortest ranked prefix whose frequencies sum to this.
    pub coverage: Option<f64>,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_frequency: 0.05,
            max_loss: 50.0,
            max_branching: 3,
            own_branching: None,
            own_ranking: Ranking::Frequency,
            coverage: None,
        }
    }
}

impl ExpansionPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(RepertoireError::config("max_depth must be at least 1"));
        }
        if self.max_branching == 0 {
            return Err(RepertoireError::config("max_branching must be at least 1"));
        }
        if !(self.min_frequency.is_finite() && (0.0..=1.0).contains(&self.min_frequency)) {
            return Err(RepertoireError::config(format!("min_frequency must lie in [0, 1], got {}", self.min_frequency)));
        }
        if self.max_loss.is_nan() || self.max_loss < 0.0 {
            return Err(RepertoireError::config(format!("max_loss must be non-negative, got {}", self.max_loss)));
        }
        if self.own_branching == Some(0) {
            return Err(RepertoireError::config("own_branching must be at least 1 when set"));
        }
        if let Some(c) = self.coverage {
            if !(c.is_finite() && c > 0.0 && c <= 1.0) {
                return Err(RepertoireError::config(format!("coverage must lie in (0, 1], got {c}")));
            }
        }
        Ok(())
    }

    pub fn branching_at(&self, perspective_to_move: bool) -> usize {
        if perspective_to_move { self.own_branching.unwrap_or(self.max_branching) } else { self.max_branching }
    }

    pub fn passes_frequency(&self, c: &MoveCandidate) -> bool { c.frequency >= self.min_frequency }

    pub fn frequency_floor(&self, candidates: Vec<MoveCandidate>) -> Vec<MoveCandidate> {
        candidates.into_iter().filter(|c| self.passes_frequency(c)).collect()
    }

    /// Loss filter, composite ordering and width cap over fully evaluated candidates.
    /// Candidates without an evaluation are dropped.
    pub fn rank(&self, candidates: Vec<MoveCandidate>, perspective_to_move: bool) -> Vec<MoveCandidate> {
        let mut kept: Vec<MoveCandidate> = candidates.into_iter().filter(|c| c.evaluation.is_some()).collect();
        if let Some(best) = kept.iter().filter_map(|c| c.evaluation).max() {
            kept.retain(|c| c.evaluation.map_or(false, |e| (best as f64 - e as f64) <= self.max_loss));
        }
        // Stable: equal keys keep oracle order.
        let ranking = if perspective_to_move { self.own_ranking } else { Ranking::Frequency };
        match ranking {
            Ranking::Frequency => {
                kept.sort_by(|a, b| b.frequency.total_cmp(&a.frequency).then_with(|| b.evaluation.cmp(&a.evaluation)))
            }
            Ranking::Evaluation => {
                kept.sort_by(|a, b| b.evaluation.cmp(&a.evaluation).then_with(|| b.frequency.total_cmp(&a.frequency)))
            }
        }
        if !perspective_to_move {
            if let Some(coverage) = self.coverage {
                let mut acc = 0.0;
                let mut take = 0;
                for c in &kept {
                    take += 1;
                    acc += c.frequency;
                    if acc + 1e-9 >= coverage { break; }
                }
                kept.truncate(take);
            }
        }
        kept.truncate(self.branching_at(perspective_to_move));
        kept
    }

    /// The whole decision for one node over already evaluated candidates.
    pub fn select(&self, candidates: Vec<MoveCandidate>, ply: usize, perspective_to_move: bool) -> Vec<MoveCandidate> {
        if ply >= self.max_depth { return Vec::new(); }
        self.rank(self.frequency_floor(candidates), perspective_to_move)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert!(ExpansionPolicy::default().validate().is_ok());
    }

    #[test]
    fn rejects_unbounded_or_out_of_range_thresholds() {
        let bad = [
            ExpansionPolicy { max_depth: 0, ..Default::default() },
            ExpansionPolicy { max_branching: 0, ..Default::default() },
            ExpansionPolicy { min_frequency: -0.1, ..Default::default() },
            ExpansionPolicy { min_frequency: 1.5, ..Default::default() },
            ExpansionPolicy { max_loss: -1.0, ..Default::default() },
            ExpansionPolicy { max_loss: f64::NAN, ..Default::default() },
            ExpansionPolicy { own_branching: Some(0), ..Default::default() },
            ExpansionPolicy { coverage: Some(0.0), ..Default::default() },
        ];
        for p in bad {
            assert!(matches!(p.validate(), Err(RepertoireError::ConfigInvalid(_))), "accepted {p:?}");
        }
        let inf = ExpansionPolicy { max_loss: f64::INFINITY, ..Default::default() };
        assert!(inf.validate().is_ok());
    }

    #[test]
    fn own_branching_only_applies_on_own_turn() {
        let p = ExpansionPolicy { max_branching: 4, own_branching: Some(1), ..Default::default() };
        assert_eq!(p.branching_at(true), 1);
        assert_eq!(p.branching_at(false), 4);
    }
}
