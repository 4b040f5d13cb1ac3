use crate::repertoire::key::Ply;

/// Centipawn value assigned to a forced mate, reduced by the distance in moves.
pub const MATE_SCORE: i32 = 30_000;

/// Engine score reported for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Centipawns(i32),
    /// Moves to mate; negative when the side to move is getting mated. `Mate(0)` means
    /// the side to move is already mated.
    Mate(i32),
}

impl Evaluation {
    pub fn to_cp(self) -> i32 {
        match self {
            Evaluation::Centipawns(cp) => cp.clamp(-MATE_SCORE + 1000, MATE_SCORE - 1000),
            Evaluation::Mate(n) if n > 0 => MATE_SCORE - n,
            Evaluation::Mate(n) => -MATE_SCORE - n,
        }
    }

    /// Centipawns for the side that just moved into this position.
    pub fn for_mover(self) -> i32 { -self.to_cp() }
}

#[derive(Debug, Clone)]
pub struct MoveCandidate {
    pub ply: Ply,
    /// Share of games at the parent position, in `[0, 1]`.
    pub frequency: f64,
    pub games: u64,
    /// Mover-relative centipawns; `None` when the evaluation oracle gave up.
    pub evaluation: Option<i32>,
}

impl MoveCandidate {
    pub fn new(ply: Ply, frequency: f64, games: u64) -> Self {
        let frequency = if frequency.is_finite() { frequency.clamp(0.0, 1.0) } else { 0.0 };
        Self { ply, frequency, games, evaluation: None }
    }

    pub fn with_evaluation(mut self, cp: i32) -> Self { self.evaluation = Some(cp); self }

    pub fn san(&self) -> &str { &self.ply.san }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_scores_flip_for_the_mover() {
        assert_eq!(Evaluation::Mate(0).for_mover(), MATE_SCORE);
        assert_eq!(Evaluation::Mate(-2).to_cp(), -MATE_SCORE + 2);
        assert_eq!(Evaluation::Mate(3).for_mover(), -(MATE_SCORE - 3));
        assert_eq!(Evaluation::Centipawns(-35).for_mover(), 35);
    }
}
