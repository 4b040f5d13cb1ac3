//! Standard Algebraic Notation on top of cozy-chess move generation.

use cozy_chess::{Board, Move, Piece, Square};

use crate::board::cozy::castle_side;

fn letter(p: Piece) -> char {
    match p {
        Piece::King => 'K',
        Piece::Queen => 'Q',
        Piece::Rook => 'R',
        Piece::Bishop => 'B',
        Piece::Knight => 'N',
        Piece::Pawn => 'P',
    }
}

fn square_str(sq: Square) -> String { format!("{}", sq) }

fn has_legal(board: &Board) -> bool {
    let mut any = false;
    board.generate_moves(|ml| { any = !ml.is_empty(); any });
    any
}

fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let mut rivals: Vec<Square> = Vec::new();
    board.generate_moves(|ml| {
        if ml.piece == piece {
            for m in ml { if m.to == mv.to && m.from != mv.from { rivals.push(m.from); } }
        }
        false
    });
    if rivals.is_empty() { return String::new(); }
    let from = square_str(mv.from);
    let (file, rank) = (&from[0..1], &from[1..2]);
    if rivals.iter().all(|r| r.file() != mv.from.file()) { return file.to_string(); }
    if rivals.iter().all(|r| r.rank() != mv.from.rank()) { return rank.to_string(); }
    from
}

/// Renders a legal move in SAN, including `+`/`#`.
pub fn render(board: &Board, mv: Move) -> String {
    let stm = board.side_to_move();
    let piece = board.piece_on(mv.from).unwrap_or(Piece::Pawn);
    let mut out = String::new();
    if let Some(kingside) = castle_side(board, mv) {
        out.push_str(if kingside { "O-O" } else { "O-O-O" });
    } else {
        let capture = matches!(board.color_on(mv.to), Some(c) if c != stm)
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());
        if piece == Piece::Pawn {
            if capture {
                out.push_str(&square_str(mv.from)[0..1]);
                out.push('x');
            }
            out.push_str(&square_str(mv.to));
            if let Some(p) = mv.promotion { out.push('='); out.push(letter(p)); }
        } else {
            out.push(letter(piece));
            out.push_str(&disambiguation(board, mv, piece));
            if capture { out.push('x'); }
            out.push_str(&square_str(mv.to));
        }
    }
    let mut child = board.clone();
    child.play(mv);
    if !child.checkers().is_empty() {
        out.push(if has_legal(&child) { '+' } else { '#' });
    }
    out
}

fn normalize(s: &str) -> String {
    let core = s.trim().trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'));
    let core = match core {
        "0-0" => "O-O",
        "0-0-0" => "O-O-O",
        other => other,
    };
    core.replace('=', "")
}

/// Finds the legal move whose SAN matches `s`, ignoring check marks and annotations.
pub fn parse(board: &Board, s: &str) -> Option<Move> {
    let want = normalize(s);
    if want.is_empty() { return None; }
    let mut found = None;
    board.generate_moves(|ml| {
        for m in ml {
            if normalize(&render(board, m)) == want { found = Some(m); break; }
        }
        found.is_some()
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn san_of(fen: &str, uci: &str) -> String {
        let b = Board::from_fen(fen, false).unwrap();
        let mut mv = None;
        b.generate_moves(|ml| { for m in ml { if format!("{}", m) == uci { mv = Some(m); } } mv.is_some() });
        render(&b, mv.expect("legal move"))
    }

    #[test]
    fn pawn_and_piece_moves_from_startpos() {
        let start = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        assert_eq!(san_of(start, "e2e4"), "e4");
        assert_eq!(san_of(start, "g1f3"), "Nf3");
    }

    #[test]
    fn disambiguates_by_file_then_rank() {
        // Knights on b1 and f1 both reach d2.
        assert_eq!(san_of("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1", "b1d2"), "Nbd2");
        // Rooks on a1 and a5 both reach a3.
        assert_eq!(san_of("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1", "a1a3"), "R1a3");
    }

    #[test]
    fn captures_promotions_and_checks() {
        assert_eq!(san_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), "exd5");
        assert_eq!(san_of("8/4P3/8/8/8/8/k7/4K3 w - - 0 1", "e7e8q"), "e8=Q");
        assert_eq!(san_of("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", "a1a8"), "Ra8+");
        assert_eq!(san_of("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1", "a1a8"), "Ra8#");
    }

    #[test]
    fn parse_accepts_suffixes_and_zero_castling() {
        let b = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", false).unwrap();
        let mv = parse(&b, "0-0").expect("castle");
        assert_eq!(render(&b, mv), "O-O");
        assert!(parse(&b, "Rxa8+").is_some());
        assert!(parse(&b, "Nf3").is_none());
    }
}
