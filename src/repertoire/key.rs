use cozy_chess::{Color, Move};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::board::cozy::Position;
use crate::error::{RepertoireError, Result};

/// One resolved half-move: the legal move plus its SAN and standard UCI text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ply {
    pub mv: Move,
    pub san: String,
    pub uci: String,
}

/// Identity of a position by the move sequence that reached it. Transpositions are
/// distinct keys; the perspective is carried along but is not part of identity.
#[derive(Clone, Debug)]
pub struct PositionKey {
    plies: Arc<[Ply]>,
    perspective: Color,
}

impl PartialEq for PositionKey {
    fn eq(&self, other: &Self) -> bool { self.plies == other.plies }
}

impl Eq for PositionKey {}

impl Hash for PositionKey {
    fn hash<H: Hasher>(&self, state: &mut H) { self.plies.hash(state); }
}

impl PositionKey {
    pub fn root(perspective: Color) -> Self {
        Self { plies: Arc::from(Vec::new()), perspective }
    }

    pub fn child(&self, ply: Ply) -> Self {
        let mut plies = self.plies.to_vec();
        plies.push(ply);
        Self { plies: plies.into(), perspective: self.perspective }
    }

    /// Builds a key from whitespace separated SAN or UCI moves, e.g. `"e4 e5 Nf3"`.
    pub fn parse_line(perspective: Color, line: &str) -> Result<Self> {
        let mut key = Self::root(perspective);
        let mut pos = Position::startpos();
        for notation in line.split_whitespace() {
            let mv = pos.resolve(notation).ok_or_else(|| RepertoireError::IllegalMove {
                notation: notation.to_string(),
                line: key.line(),
            })?;
            key = key.child(Ply { mv, san: pos.san(mv), uci: pos.uci(mv) });
            pos.play(mv);
        }
        Ok(key)
    }

    pub fn plies(&self) -> &[Ply] { &self.plies }
    pub fn ply_count(&self) -> usize { self.plies.len() }
    pub fn perspective(&self) -> Color { self.perspective }
    pub fn last(&self) -> Option<&Ply> { self.plies.last() }

    pub fn side_to_move(&self) -> Color {
        if self.plies.len() % 2 == 0 { Color::White } else { Color::Black }
    }

    pub fn is_perspective_turn(&self) -> bool { self.side_to_move() == self.perspective }

    pub fn san_moves(&self) -> Vec<&str> { self.plies.iter().map(|p| p.san.as_str()).collect() }
    pub fn uci_moves(&self) -> Vec<&str> { self.plies.iter().map(|p| p.uci.as_str()).collect() }

    /// Space-joined SAN, `""` at the root.
    pub fn line(&self) -> String { self.san_moves().join(" ") }

    pub fn is_prefix_of(&self, other: &PositionKey) -> bool {
        other.plies.len() >= self.plies.len() && other.plies[..self.plies.len()] == self.plies[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_perspective_but_not_order() {
        let w = PositionKey::parse_line(Color::White, "e4").unwrap();
        let b = PositionKey::parse_line(Color::Black, "e2e4").unwrap();
        assert_eq!(w, b);

        let a = PositionKey::parse_line(Color::White, "e4 Nc6 Nf3").unwrap();
        let t = PositionKey::parse_line(Color::White, "Nf3 Nc6 e4").unwrap();
        assert_ne!(a, t, "transpositions stay distinct");
        assert_eq!(a.ply_count(), 3);
        assert!(w.is_prefix_of(&a));
        assert!(!a.is_prefix_of(&w));
    }

    #[test]
    fn parse_line_mixes_notations_and_reports_illegal_moves() {
        let k = PositionKey::parse_line(Color::White, "e2e4 e5 Nf3 Nc6 Bb5").unwrap();
        assert_eq!(k.line(), "e4 e5 Nf3 Nc6 Bb5");
        assert_eq!(k.uci_moves(), vec!["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]);
        let err = PositionKey::parse_line(Color::White, "e4 e4").unwrap_err();
        assert!(matches!(err, RepertoireError::IllegalMove { ref notation, .. } if notation == "e4"));
    }

    #[test]
    fn turn_follows_ply_parity() {
        let root = PositionKey::root(Color::Black);
        assert_eq!(root.side_to_move(), Color::White);
        assert!(!root.is_perspective_turn());
        assert!(PositionKey::parse_line(Color::Black, "d4").unwrap().is_perspective_turn());
    }
}
