use cozy_chess::Color;
use serde::Serialize;

use crate::repertoire::key::PositionKey;

/// Why a line stops at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnd {
    MaxDepth,
    NoData,
    Exhausted,
    DataUnavailable,
    GameOver,
    DeadlineReached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub key: PositionKey,
    /// Mainline first.
    pub children: Vec<TreeNode>,
    /// Set exactly when `children` is empty.
    pub end: Option<LineEnd>,
}

impl TreeNode {
    pub fn leaf(key: PositionKey, end: LineEnd) -> Self { Self { key, children: Vec::new(), end: Some(end) } }

    pub fn is_terminal(&self) -> bool { self.children.is_empty() }

    pub fn ply(&self) -> usize { self.key.ply_count() }

    pub fn count_leaves(&self) -> usize {
        if self.is_terminal() { 1 } else { self.children.iter().map(|c| c.count_leaves()).sum() }
    }

    pub fn max_ply(&self) -> usize {
        self.children.iter().map(|c| c.max_ply()).max().unwrap_or(self.ply())
    }

    /// Depth-first walk over every node, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a TreeNode)) {
        f(self);
        for c in &self.children { c.walk(f); }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionStats {
    pub nodes: u64,
    pub statistics_queries: u64,
    pub evaluation_queries: u64,
    pub retries: u64,
    pub illegal_moves: u64,
    pub unavailable: u64,
}

#[derive(Debug, Clone)]
pub struct Tree {
    pub perspective: Color,
    pub root: TreeNode,
    pub stats: ExpansionStats,
}

impl Tree {
    pub fn line_count(&self) -> usize {
        if self.root.is_terminal() { 0 } else { self.root.count_leaves() }
    }
}

#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub san: Option<String>,
    pub uci: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<LineEnd>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeReport>,
}

impl From<&TreeNode> for NodeReport {
    fn from(n: &TreeNode) -> Self {
        Self {
            san: n.key.last().map(|p| p.san.clone()),
            uci: n.key.last().map(|p| p.uci.clone()),
            end: n.end,
            children: n.children.iter().map(NodeReport::from).collect(),
        }
    }
}

/// Serializable view of a finished tree with its run counters.
#[derive(Debug, Serialize)]
pub struct TreeReport {
    pub perspective: &'static str,
    pub lines: usize,
    pub max_ply: usize,
    pub stats: ExpansionStats,
    pub root: NodeReport,
}

impl From<&Tree> for TreeReport {
    fn from(t: &Tree) -> Self {
        Self {
            perspective: if t.perspective == Color::White { "white" } else { "black" },
            lines: t.line_count(),
            max_ply: t.root.max_ply(),
            stats: t.stats.clone(),
            root: NodeReport::from(&t.root),
        }
    }
}
