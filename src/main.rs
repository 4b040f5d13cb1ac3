use anyhow::{Context, Result};
use clap::Parser;
use cozy_chess::Color;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use repertoire::oracle::engine::EnginePool;
use repertoire::oracle::explorer::{Database, Explorer};
use repertoire::oracle::synthetic::SyntheticOracle;
use repertoire::oracle::table::TableOracle;
use repertoire::repertoire::{Ranking, TreeReport};
use repertoire::{emit, write_lines, Colors, EvaluationOracle, Expander, LineStyle, RunConfig, StatisticsOracle};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build White and Black opening repertoires from explorer statistics and engine evaluation", long_about = None)]
struct Args {
    /// JSON run configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which repertoires to build
    #[arg(long, value_enum)]
    colors: Option<Colors>,

    /// Maximum line length in plies
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum share of games a move needs at its position (0..1)
    #[arg(long)]
    min_frequency: Option<f64>,

    /// Largest centipawn gap to the best move at a node ("inf" disables)
    #[arg(long)]
    max_loss: Option<f64>,

    /// Maximum kept moves per node
    #[arg(long)]
    max_branching: Option<usize>,

    /// Maximum kept moves where the repertoire side is to move
    #[arg(long)]
    own_branching: Option<usize>,

    /// Ordering of the repertoire side's own moves
    #[arg(long, value_enum)]
    own_ranking: Option<Ranking>,

    /// Keep opponent replies until their frequencies sum to this (0..1]
    #[arg(long)]
    coverage: Option<f64>,

    /// Explorer database
    #[arg(long, value_enum)]
    database: Option<Database>,

    /// Lichess database: minimum rating band
    #[arg(long)]
    min_rating: Option<u16>,

    /// Lichess database: comma separated speeds (blitz,rapid,classical)
    #[arg(long, value_delimiter = ',')]
    speeds: Option<Vec<String>>,

    /// Explorer API token
    #[arg(long, env = "LICHESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Read statistics from a JSON table instead of the explorer
    #[arg(long)]
    statistics_table: Option<PathBuf>,

    /// Read scores from a JSON table instead of running an engine
    #[arg(long)]
    score_table: Option<PathBuf>,

    /// Replace explorer and engine with seeded pseudo-random oracles
    #[arg(long, value_name = "SEED")]
    synthetic: Option<u64>,

    /// UCI engine executable
    #[arg(long)]
    engine: Option<String>,

    /// Engine processes to run side by side
    #[arg(long)]
    engine_instances: Option<usize>,

    /// Threads per engine process
    #[arg(long)]
    engine_threads: Option<usize>,

    /// Engine hash in MB
    #[arg(long)]
    hash_mb: Option<usize>,

    /// Search time per evaluated move
    #[arg(long)]
    movetime_ms: Option<u64>,

    /// Fixed search depth (overrides movetime)
    #[arg(long)]
    depth: Option<u32>,

    /// Worker threads expanding sibling lines
    #[arg(long)]
    threads: Option<usize>,

    /// Tries per oracle call, including the first
    #[arg(long)]
    retries: Option<u32>,

    /// Give up expanding a color after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Output file for White lines
    #[arg(long)]
    white_out: Option<PathBuf>,

    /// Output file for Black lines
    #[arg(long)]
    black_out: Option<PathBuf>,

    /// Also write JSON tree reports into this directory
    #[arg(long)]
    tree_dir: Option<PathBuf>,

    /// Line format
    #[arg(long, value_enum)]
    style: Option<LineStyle>,

    /// Hide the progress spinner
    #[arg(long)]
    quiet: bool,
}

impl Args {
    fn apply(self, cfg: &mut RunConfig) {
        let p = &mut cfg.policy;
        if let Some(v) = self.max_depth { p.max_depth = v; }
        if let Some(v) = self.min_frequency { p.min_frequency = v; }
        if let Some(v) = self.max_loss { p.max_loss = v; }
        if let Some(v) = self.max_branching { p.max_branching = v; }
        if self.own_branching.is_some() { p.own_branching = self.own_branching; }
        if let Some(v) = self.own_ranking { p.own_ranking = v; }
        if self.coverage.is_some() { p.coverage = self.coverage; }

        let x = &mut cfg.explorer;
        if let Some(v) = self.database { x.database = v; }
        if self.min_rating.is_some() { x.min_rating = self.min_rating; }
        if let Some(v) = self.speeds { x.speeds = v; }
        if self.token.is_some() { x.token = self.token; }

        let e = &mut cfg.engine;
        if let Some(v) = self.engine { e.path = v; }
        if let Some(v) = self.engine_instances { e.instances = v; }
        if let Some(v) = self.engine_threads { e.threads = v; }
        if let Some(v) = self.hash_mb { e.hash_mb = v; }
        if let Some(v) = self.movetime_ms { e.movetime_ms = v; }
        if self.depth.is_some() { e.depth = self.depth; }

        if self.statistics_table.is_some() { cfg.statistics_table = self.statistics_table; }
        if self.score_table.is_some() { cfg.score_table = self.score_table; }
        if self.synthetic.is_some() { cfg.synthetic_seed = self.synthetic; }
        if let Some(v) = self.colors { cfg.colors = v; }
        if let Some(v) = self.threads { cfg.threads = v; }
        if let Some(v) = self.retries { cfg.retry.attempts = v; }
        if self.timeout_secs.is_some() { cfg.timeout_secs = self.timeout_secs; }
        if let Some(v) = self.white_out { cfg.white_out = v; }
        if let Some(v) = self.black_out { cfg.black_out = v; }
        if self.tree_dir.is_some() { cfg.tree_dir = self.tree_dir; }
        if let Some(v) = self.style { cfg.style = v; }
        if self.quiet { cfg.progress = false; }
    }
}

fn spinner(color: Color) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {prefix}: {pos} nodes [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix(color_name(color));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn color_name(color: Color) -> &'static str { if color == Color::White { "White" } else { "Black" } }

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(p) => RunConfig::load(p)?,
        None => RunConfig::default(),
    };
    args.apply(&mut cfg);
    cfg.validate()?;

    let statistics: Box<dyn StatisticsOracle> = match (&cfg.statistics_table, cfg.synthetic_seed) {
        (Some(p), _) => Box::new(TableOracle::load(p)?),
        (None, Some(seed)) => Box::new(SyntheticOracle::new(seed)),
        (None, None) => Box::new(Explorer::new(cfg.explorer.clone())?),
    };
    let evaluator: Box<dyn EvaluationOracle> = match (&cfg.score_table, cfg.synthetic_seed) {
        (Some(p), _) => Box::new(TableOracle::load(p)?),
        (None, Some(seed)) => Box::new(SyntheticOracle::new(seed)),
        (None, None) => Box::new(EnginePool::start(cfg.engine.clone())?),
    };

    for color in cfg.colors.perspectives() {
        let mut expander = Expander::new(&*statistics, &*evaluator)
            .with_retry(cfg.retry.clone())
            .with_threads(cfg.threads)
            .with_timeout(cfg.timeout_secs.map(Duration::from_secs));
        let pb = cfg.progress.then(|| spinner(color));
        if let Some(pb) = &pb { expander = expander.with_progress(pb.clone()); }

        println!("Expanding {} openings...", color_name(color));
        let tree = expander.expand(color, &cfg.policy)?;
        if let Some(pb) = pb { pb.finish_and_clear(); }

        let lines = emit(&tree, cfg.style);
        let out = cfg.output_for(color);
        match write_lines(out, &lines) {
            Ok(n) => println!("Wrote {} {} lines to {}", n, color_name(color), out.display()),
            Err(e) => {
                error!("{e}; dumping {} lines to stdout", lines.len());
                for l in &lines { println!("{l}"); }
                return Err(e.into());
            }
        }

        if let Some(dir) = &cfg.tree_dir {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            let path = dir.join(format!("{}_tree.json", color_name(color).to_lowercase()));
            let json = serde_json::to_string_pretty(&TreeReport::from(&tree))?;
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(())
}
