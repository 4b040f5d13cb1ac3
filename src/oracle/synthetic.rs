//! Deterministic pseudo-random oracles for dry runs and benchmarks.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::board::cozy::Position;
use crate::oracle::{EvaluationOracle, MoveStat, OracleError, StatisticsOracle};
use crate::repertoire::key::PositionKey;

#[derive(Debug, Clone)]
pub struct SyntheticOracle {
    pub seed: u64,
    /// Moves reported per position.
    pub width: usize,
    /// Scores are drawn from `-spread..=spread` centipawns.
    pub spread: i32,
}

impl SyntheticOracle {
    pub fn new(seed: u64) -> Self { Self { seed, width: 5, spread: 80 } }

    fn rng(&self, salt: &str, key: &PositionKey) -> SmallRng {
        let mut h = DefaultHasher::new();
        salt.hash(&mut h);
        key.uci_moves().hash(&mut h);
        SmallRng::seed_from_u64(self.seed ^ h.finish())
    }
}

impl StatisticsOracle for SyntheticOracle {
    fn lookup(&self, key: &PositionKey) -> Result<Vec<MoveStat>, OracleError> {
        let pos = Position::from_key(key);
        let mut moves = pos.legal_moves();
        moves.sort_by_key(|&m| pos.uci(m));
        let mut rng = self.rng("moves", key);
        moves.shuffle(&mut rng);
        moves.truncate(self.width);
        let games: Vec<u64> = moves.iter().map(|_| rng.gen_range(1..=1000)).collect();
        let total: u64 = games.iter().sum();
        Ok(moves
            .into_iter()
            .zip(games)
            .map(|(m, g)| MoveStat { notation: pos.san(m), frequency: g as f64 / total.max(1) as f64, games: g })
            .collect())
    }
}

impl EvaluationOracle for SyntheticOracle {
    fn score(&self, key: &PositionKey) -> Result<i32, OracleError> {
        Ok(self.rng("score", key).gen_range(-self.spread..=self.spread))
    }
}
