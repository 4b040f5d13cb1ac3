use anyhow::Result;
use clap::Parser;
use cozy_chess::Color;
use repertoire::board::cozy::Position;
use repertoire::oracle::engine::EnginePool;
use repertoire::oracle::explorer::{Database, Explorer, ExplorerConfig};
use repertoire::oracle::table::TableOracle;
use repertoire::uci::EngineConfig;
use repertoire::{EvaluationOracle, PositionKey, StatisticsOracle};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "probe", about = "Show explorer statistics and engine scores for the moves after one line")]
struct Args {
    /// Moves from the start position, SAN or UCI (e.g. "e4 e5 Nf3")
    #[arg(value_name = "LINE", default_value = "")]
    line: String,
    /// Defaults to the lichess database at the 2500 band
    #[arg(long, value_enum)]
    database: Option<Database>,
    #[arg(long)]
    min_rating: Option<u16>,
    /// Score each move with this UCI engine
    #[arg(long)]
    engine: Option<String>,
    #[arg(long, default_value_t = 500)]
    movetime_ms: u64,
    /// Use a JSON table for both statistics and scores
    #[arg(long)]
    table: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let a = Args::parse();
    let key = PositionKey::parse_line(Color::White, &a.line)?;
    let pos = Position::from_key(&key);
    println!("[{}] {}", key.line(), pos.fen());

    let stats: Box<dyn StatisticsOracle> = match &a.table {
        Some(p) => Box::new(TableOracle::load(p)?),
        None => {
            let mut cfg = ExplorerConfig::default();
            if let Some(db) = a.database { cfg.database = db; }
            if a.min_rating.is_some() { cfg.min_rating = a.min_rating; }
            Box::new(Explorer::new(cfg)?)
        }
    };
    let eval: Option<Box<dyn EvaluationOracle>> = match (&a.table, &a.engine) {
        (Some(p), _) => Some(Box::new(TableOracle::load(p)?) as Box<dyn EvaluationOracle>),
        (None, Some(path)) => {
            let cfg = EngineConfig { path: path.clone(), movetime_ms: a.movetime_ms, ..Default::default() };
            Some(Box::new(EnginePool::start(cfg)?))
        }
        (None, None) => None,
    };

    let moves = stats.lookup(&key)?;
    if moves.is_empty() { println!("no games"); }
    for m in moves {
        let Some(mv) = pos.resolve(&m.notation) else {
            println!("{:>8}  illegal here", m.notation);
            continue;
        };
        let san = pos.san(mv);
        let child = PositionKey::parse_line(Color::White, &format!("{} {}", key.line(), san))?;
        let score = match &eval {
            Some(e) => e.score(&child).map(|cp| format!("{cp:+}")).unwrap_or_else(|err| format!("({err})")),
            None => "-".to_string(),
        };
        println!("{:>8}  {:>5.1}%  {:>8} games  {:>7}", san, m.frequency * 100.0, m.games, score);
    }
    Ok(())
}
