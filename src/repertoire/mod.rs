pub mod candidate;
pub mod emit;
pub mod expand;
pub mod key;
pub mod policy;
pub mod retry;
pub mod tree;

pub use candidate::{Evaluation, MoveCandidate, MATE_SCORE};
pub use emit::{emit, lines, write_lines, LineStyle};
pub use expand::Expander;
pub use key::{Ply, PositionKey};
pub use policy::{ExpansionPolicy, Ranking};
pub use retry::RetryPolicy;
pub use tree::{ExpansionStats, LineEnd, Tree, TreeNode, TreeReport};
