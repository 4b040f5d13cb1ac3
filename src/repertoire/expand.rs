use cozy_chess::Color;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::board::cozy::Position;
use crate::error::{RepertoireError, Result};
use crate::oracle::{EvaluationOracle, MoveStat, StatisticsOracle};
use crate::repertoire::candidate::MoveCandidate;
use crate::repertoire::key::{PositionKey, Ply};
use crate::repertoire::policy::ExpansionPolicy;
use crate::repertoire::retry::RetryPolicy;
use crate::repertoire::tree::{ExpansionStats, LineEnd, Tree, TreeNode};

/// Builds repertoire trees by alternating statistics lookups, evaluations and policy
/// decisions. The oracles are only borrowed, so White and Black runs can share them.
pub struct Expander<'a> {
    statistics: &'a dyn StatisticsOracle,
    evaluator: &'a dyn EvaluationOracle,
    retry: RetryPolicy,
    threads: usize,
    timeout: Option<Duration>,
    progress: Option<ProgressBar>,
}

#[derive(Default)]
struct Counters {
    nodes: AtomicU64,
    statistics_queries: AtomicU64,
    evaluation_queries: AtomicU64,
    retries: AtomicU64,
    illegal_moves: AtomicU64,
    unavailable: AtomicU64,
}

impl Counters {
    fn bump(c: &AtomicU64, n: u64) { c.fetch_add(n, Ordering::Relaxed); }

    fn snapshot(&self) -> ExpansionStats {
        ExpansionStats {
            nodes: self.nodes.load(Ordering::Relaxed),
            statistics_queries: self.statistics_queries.load(Ordering::Relaxed),
            evaluation_queries: self.evaluation_queries.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            illegal_moves: self.illegal_moves.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
        }
    }
}

struct Run<'r, 'a> {
    ex: &'r Expander<'a>,
    policy: &'r ExpansionPolicy,
    deadline: Option<Instant>,
    counters: &'r Counters,
}

impl<'a> Expander<'a> {
    pub fn new(statistics: &'a dyn StatisticsOracle, evaluator: &'a dyn EvaluationOracle) -> Self {
        Self { statistics, evaluator, retry: RetryPolicy::default(), threads: 1, timeout: None, progress: None }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self { self.retry = retry; self }
    pub fn with_threads(mut self, threads: usize) -> Self { self.threads = threads.max(1); self }
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self { self.timeout = timeout; self }
    pub fn with_progress(mut self, pb: ProgressBar) -> Self { self.progress = Some(pb); self }

    pub fn expand(&self, perspective: Color, policy: &ExpansionPolicy) -> Result<Tree> {
        policy.validate()?;
        let counters = Counters::default();
        let run = Run { ex: self, policy, deadline: self.timeout.map(|t| Instant::now() + t), counters: &counters };
        let t0 = Instant::now();
        let root_key = PositionKey::root(perspective);
        let root = if self.threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build()
                .map_err(|e| RepertoireError::config(format!("thread pool: {e}")))?;
            pool.install(|| run.node(root_key, Position::startpos()))
        } else {
            run.node(root_key, Position::startpos())
        };
        let stats = counters.snapshot();
        let tree = Tree { perspective, root, stats };
        info!(
            "{:?} tree: {} nodes, {} lines, max ply {} in {:.1}s ({} lookups, {} evals, {} retries, {} illegal, {} unavailable)",
            perspective, tree.stats.nodes, tree.line_count(), tree.root.max_ply(), t0.elapsed().as_secs_f64(),
            tree.stats.statistics_queries, tree.stats.evaluation_queries, tree.stats.retries,
            tree.stats.illegal_moves, tree.stats.unavailable,
        );
        Ok(tree)
    }
}

impl Run<'_, '_> {
    fn expired(&self) -> bool { self.deadline.map_or(false, |d| Instant::now() >= d) }

    fn node(&self, key: PositionKey, pos: Position) -> TreeNode {
        Counters::bump(&self.counters.nodes, 1);
        if let Some(pb) = &self.ex.progress { pb.inc(1); }

        if key.ply_count() >= self.policy.max_depth { return TreeNode::leaf(key, LineEnd::MaxDepth); }
        if !pos.has_legal_moves() { return TreeNode::leaf(key, LineEnd::GameOver); }
        if self.expired() { return TreeNode::leaf(key, LineEnd::DeadlineReached); }

        let (res, retries) = self.ex.retry.run(self.deadline, || {
            Counters::bump(&self.counters.statistics_queries, 1);
            self.ex.statistics.lookup(&key)
        });
        Counters::bump(&self.counters.retries, retries as u64);
        let reported = match res {
            Ok(s) => s,
            Err(e) => {
                warn!("statistics unavailable at [{}]: {e}", key.line());
                Counters::bump(&self.counters.unavailable, 1);
                return TreeNode::leaf(key, LineEnd::DataUnavailable);
            }
        };
        if reported.is_empty() { return TreeNode::leaf(key, LineEnd::NoData); }

        let floor = self.policy.frequency_floor(self.resolve(&key, &pos, reported));
        if floor.is_empty() { return TreeNode::leaf(key, LineEnd::Exhausted); }

        let evaluated = self.evaluate(&key, floor);
        if evaluated.iter().all(|c| c.evaluation.is_none()) {
            if self.expired() { return TreeNode::leaf(key, LineEnd::DeadlineReached); }
            Counters::bump(&self.counters.unavailable, 1);
            warn!("no evaluation available for any move at [{}]", key.line());
            return TreeNode::leaf(key, LineEnd::DataUnavailable);
        }

        let survivors = self.policy.rank(evaluated, key.is_perspective_turn());
        if survivors.is_empty() { return TreeNode::leaf(key, LineEnd::Exhausted); }
        debug!(
            "[{}] keeps {}",
            key.line(),
            survivors.iter().map(|c| format!("{}({:.2},{:?})", c.san(), c.frequency, c.evaluation)).collect::<Vec<_>>().join(" ")
        );

        let expand_child = |c: MoveCandidate| {
            let child_pos = pos.after(c.ply.mv);
            self.node(key.child(c.ply), child_pos)
        };
        let children: Vec<TreeNode> = if self.ex.threads > 1 {
            survivors.into_par_iter().map(expand_child).collect()
        } else {
            survivors.into_iter().map(expand_child).collect()
        };
        TreeNode { key, children, end: None }
    }

    /// Legal, de-duplicated candidates in oracle order.
    fn resolve(&self, key: &PositionKey, pos: &Position, reported: Vec<MoveStat>) -> Vec<MoveCandidate> {
        let mut out: Vec<MoveCandidate> = Vec::with_capacity(reported.len());
        for stat in reported {
            match pos.resolve(&stat.notation) {
                Some(mv) if out.iter().any(|c| c.ply.mv == mv) => {
                    debug!("duplicate move {} at [{}]", stat.notation, key.line());
                }
                Some(mv) => {
                    let ply = Ply { mv, san: pos.san(mv), uci: pos.uci(mv) };
                    out.push(MoveCandidate::new(ply, stat.frequency, stat.games));
                }
                None => {
                    Counters::bump(&self.counters.illegal_moves, 1);
                    let err = RepertoireError::IllegalMove { notation: stat.notation, line: key.line() };
                    warn!("dropping candidate: {err}");
                }
            }
        }
        out
    }

    /// Scores every candidate before any ranking happens.
    fn evaluate(&self, key: &PositionKey, candidates: Vec<MoveCandidate>) -> Vec<MoveCandidate> {
        let score = |mut c: MoveCandidate| {
            let child = key.child(c.ply.clone());
            let (res, retries) = self.ex.retry.run(self.deadline, || {
                Counters::bump(&self.counters.evaluation_queries, 1);
                self.ex.evaluator.score(&child)
            });
            Counters::bump(&self.counters.retries, retries as u64);
            match res {
                Ok(cp) => c.evaluation = Some(cp),
                Err(e) => debug!("evaluation unavailable for [{}]: {e}", child.line()),
            }
            c
        };
        if self.ex.threads > 1 {
            candidates.into_par_iter().map(score).collect()
        } else {
            candidates.into_iter().map(score).collect()
        }
    }
}
