use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{RepertoireError, Result};
use crate::repertoire::key::PositionKey;
use crate::repertoire::tree::{Tree, TreeNode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    /// `e4 e5 Nf3`
    #[default]
    San,
    /// `e2e4 e7e5 g1f3`
    Uci,
    /// `1. e4 e5 2. Nf3`
    Numbered,
}

impl LineStyle {
    pub fn format(self, key: &PositionKey) -> String {
        match self {
            LineStyle::San => key.san_moves().join(" "),
            LineStyle::Uci => key.uci_moves().join(" "),
            LineStyle::Numbered => {
                let mut out = String::new();
                for (i, san) in key.san_moves().into_iter().enumerate() {
                    if i > 0 { out.push(' '); }
                    if i % 2 == 0 { out.push_str(&format!("{}. ", i / 2 + 1)); }
                    out.push_str(san);
                }
                out
            }
        }
    }
}

/// Depth-first walk yielding each terminal node's key, mainline first.
pub struct Lines<'a> {
    stack: Vec<&'a TreeNode>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a PositionKey;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if node.is_terminal() {
                if node.ply() > 0 { return Some(&node.key); }
                continue;
            }
            self.stack.extend(node.children.iter().rev());
        }
        None
    }
}

pub fn lines(tree: &Tree) -> Lines<'_> { Lines { stack: vec![&tree.root] } }

pub fn emit(tree: &Tree, style: LineStyle) -> Vec<String> {
    lines(tree).map(|k| style.format(k)).collect()
}

/// Truncates or creates `path` and writes one line per entry. Returns the count written.
pub fn write_lines<P: AsRef<Path>>(path: P, lines: &[String]) -> Result<usize> {
    let path = path.as_ref();
    let fail = |source| RepertoireError::OutputWriteFailure { path: path.to_path_buf(), source };
    let mut w = BufWriter::new(File::create(path).map_err(fail)?);
    for l in lines { writeln!(w, "{}", l).map_err(fail)?; }
    w.flush().map_err(fail)?;
    Ok(lines.len())
}
