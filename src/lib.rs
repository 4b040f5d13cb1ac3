// Opening repertoire builder: explorer statistics + UCI engine scores -> White/Black lines
pub mod board;
pub mod config;
pub mod error;
pub mod oracle;
pub mod repertoire;
pub mod uci;

pub use config::{Colors, RunConfig};
pub use error::{RepertoireError, Result};
pub use oracle::{EvaluationOracle, MoveStat, OracleError, StatisticsOracle};
pub use repertoire::{emit, write_lines, ExpansionPolicy, Expander, LineStyle, PositionKey, Tree};
