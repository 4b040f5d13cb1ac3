use cozy_chess::{Board as CozyBoard, File, Move, Piece, Square};

use crate::board::san;
use crate::repertoire::key::PositionKey;

#[derive(Clone, Debug)]
pub struct Position {
    board: CozyBoard,
}

impl Default for Position {
    fn default() -> Self { Self::startpos() }
}

impl Position {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default() }
    }

    pub fn from_fen(fen: &str) -> Result<Self, String> {
        CozyBoard::from_fen(fen, false).map(|b| Self { board: b }).map_err(|e| format!("FEN error: {e:?}"))
    }

    pub fn fen(&self) -> String { format!("{}", self.board) }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut out = Vec::new();
        self.board.generate_moves(|moves| { out.extend(moves); false });
        out
    }

    pub fn has_legal_moves(&self) -> bool {
        let mut any = false;
        self.board.generate_moves(|moves| { any = !moves.is_empty(); any });
        any
    }

    /// Plays a move previously returned by one of the `resolve*` methods.
    pub fn play(&mut self, mv: Move) { self.board.play(mv); }

    pub fn after(&self, mv: Move) -> Position {
        let mut child = self.clone();
        child.play(mv);
        child
    }

    /// Resolves a move in UCI (`e2e4`, `e1g1` or `e1h1`) or SAN (`Nf3`, `O-O`) to a legal move.
    pub fn resolve(&self, notation: &str) -> Option<Move> {
        let s = notation.trim();
        if looks_like_uci(s) {
            if let Some(m) = self.resolve_uci(s) { return Some(m); }
        }
        san::parse(&self.board, s)
    }

    pub fn resolve_uci(&self, s: &str) -> Option<Move> {
        self.legal_moves().into_iter().find(|&m| self.uci(m) == s || format!("{}", m) == s)
    }

    /// UCI text with castling written as the king's two-square move.
    pub fn uci(&self, mv: Move) -> String {
        let to = match castle_side(&self.board, mv) {
            Some(kingside) => Square::new(if kingside { File::G } else { File::C }, mv.from.rank()),
            None => mv.to,
        };
        let mut s = format!("{}{}", mv.from, to);
        if let Some(p) = mv.promotion { s.push(promotion_char(p)); }
        s
    }

    pub fn san(&self, mv: Move) -> String { san::render(&self.board, mv) }

    /// Replays the already validated plies of `key` from the start position.
    pub fn from_key(key: &PositionKey) -> Self {
        let mut pos = Self::startpos();
        for p in key.plies() { pos.play(p.mv); }
        pos
    }
}

/// `Some(true)` for kingside castling, `Some(false)` for queenside. cozy-chess encodes
/// castling as the king capturing its own rook.
pub(crate) fn castle_side(board: &CozyBoard, mv: Move) -> Option<bool> {
    if board.piece_on(mv.from) != Some(Piece::King) { return None; }
    if board.color_on(mv.to) != Some(board.side_to_move()) { return None; }
    Some((mv.to.file() as u8) > (mv.from.file() as u8))
}

fn promotion_char(p: Piece) -> char {
    match p {
        Piece::Queen => 'q',
        Piece::Rook => 'r',
        Piece::Bishop => 'b',
        Piece::Knight => 'n',
        Piece::Pawn => 'p',
        Piece::King => 'k',
    }
}

fn looks_like_uci(s: &str) -> bool {
    let b = s.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"qrbn".contains(&b[4]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn castling_is_reported_as_king_two_squares() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        let short = pos.resolve("e1g1").expect("short castle");
        assert_eq!(pos.uci(short), "e1g1");
        assert_eq!(pos.resolve("e1h1"), Some(short));
        let long = pos.resolve("O-O-O").expect("long castle");
        assert_eq!(pos.uci(long), "e1c1");
    }

    #[test]
    fn rejects_illegal_and_garbage() {
        let pos = Position::startpos();
        assert!(pos.resolve("e2e5").is_none());
        assert!(pos.resolve("Ke2").is_none());
        assert!(pos.resolve("zz").is_none());
        assert!(pos.resolve("").is_none());
    }
}
