//! Client side of the UCI protocol: drives an external engine over stdin/stdout.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::{Duration, Instant};

use crate::oracle::OracleError;
use crate::repertoire::candidate::Evaluation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable name or path; resolved through `PATH` when bare.
    pub path: String,
    pub threads: usize,
    pub hash_mb: usize,
    pub movetime_ms: u64,
    /// Fixed depth search; takes precedence over `movetime_ms`.
    pub depth: Option<u32>,
    /// Engine processes in the pool; each handles one position at a time.
    pub instances: usize,
    /// Grace on top of the search limit before a call is abandoned.
    pub timeout_ms: u64,
    /// How long a caller waits for a free engine.
    pub checkout_timeout_ms: u64,
    /// Extra `setoption` pairs.
    pub options: Vec<(String, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: "stockfish".to_string(),
            threads: 1,
            hash_mb: 256,
            movetime_ms: 500,
            depth: None,
            instances: 1,
            timeout_ms: 10_000,
            checkout_timeout_ms: 120_000,
            options: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn limit(&self) -> SearchLimit {
        match self.depth {
            Some(d) => SearchLimit::Depth(d),
            None => SearchLimit::MoveTime(Duration::from_millis(self.movetime_ms)),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        let search = if self.depth.is_some() { 0 } else { self.movetime_ms };
        Duration::from_millis(search + self.timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    MoveTime(Duration),
    Depth(u32),
}

impl SearchLimit {
    fn go(self) -> String {
        match self {
            SearchLimit::MoveTime(t) => format!("go movetime {}", t.as_millis()),
            SearchLimit::Depth(d) => format!("go depth {d}"),
        }
    }
}

/// Score from a UCI `info` line, from the side to move's point of view. Bound scores and
/// secondary `multipv` lines are ignored.
pub fn parse_info_score(line: &str) -> Option<Evaluation> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some("info") { return None; }
    let toks: Vec<&str> = tokens.collect();
    if let Some(i) = toks.iter().position(|&t| t == "multipv") {
        if toks.get(i + 1) != Some(&"1") { return None; }
    }
    if toks.iter().any(|&t| t == "lowerbound" || t == "upperbound") { return None; }
    let i = toks.iter().position(|&t| t == "score")?;
    let value: i32 = toks.get(i + 2)?.parse().ok()?;
    match *toks.get(i + 1)? {
        "cp" => Some(Evaluation::Centipawns(value)),
        "mate" => Some(Evaluation::Mate(value)),
        _ => None,
    }
}

pub fn position_command(uci_moves: &[&str]) -> String {
    if uci_moves.is_empty() { "position startpos".to_string() } else { format!("position startpos moves {}", uci_moves.join(" ")) }
}

pub struct UciProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    name: String,
    healthy: bool,
}

impl UciProcess {
    pub fn spawn(cfg: &EngineConfig) -> Result<Self, OracleError> {
        let mut child = Command::new(&cfg.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| OracleError::unavailable(format!("cannot start engine '{}': {e}", cfg.path)))?;
        let stdin = child.stdin.take().ok_or_else(|| OracleError::unavailable("engine stdin not captured"))?;
        let stdout = child.stdout.take().ok_or_else(|| OracleError::unavailable("engine stdout not captured"))?;
        let (tx, rx) = unbounded();
        std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() { break; }
            }
        });
        let mut p = Self { child, stdin, lines: rx, name: cfg.path.clone(), healthy: true };
        p.handshake(cfg)?;
        Ok(p)
    }

    fn handshake(&mut self, cfg: &EngineConfig) -> Result<(), OracleError> {
        let t = Duration::from_millis(cfg.timeout_ms);
        self.send("uci")?;
        let mut lines = Vec::new();
        self.read_until("uciok", t, &mut lines)?;
        for line in &lines {
            if let Some(n) = line.strip_prefix("id name ") { self.name = n.trim().to_string(); }
        }
        self.send(&format!("setoption name Threads value {}", cfg.threads.max(1)))?;
        self.send(&format!("setoption name Hash value {}", cfg.hash_mb.max(1)))?;
        for (k, v) in &cfg.options { self.send(&format!("setoption name {k} value {v}"))?; }
        self.send("isready")?;
        self.read_until("readyok", t, &mut Vec::new())?;
        debug!("engine ready: {}", self.name);
        Ok(())
    }

    pub fn name(&self) -> &str { &self.name }

    /// False once the process stopped answering; such an engine must be replaced.
    pub fn is_healthy(&self) -> bool { self.healthy }

    fn send(&mut self, cmd: &str) -> Result<(), OracleError> {
        trace!("> {cmd}");
        let res = writeln!(self.stdin, "{cmd}").and_then(|_| self.stdin.flush());
        res.map_err(|e| {
            self.healthy = false;
            OracleError::unavailable(format!("engine write failed: {e}"))
        })
    }

    /// Appends lines to `seen` up to and including the first one starting with `token`.
    /// Lines read before a timeout stay in `seen`.
    fn read_until(&mut self, token: &str, timeout: Duration, seen: &mut Vec<String>) -> Result<(), OracleError> {
        let deadline = Instant::now() + timeout;
        loop {
            let wait = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(wait) {
                Ok(line) => {
                    trace!("< {line}");
                    let done = line.starts_with(token);
                    seen.push(line);
                    if done { return Ok(()); }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(OracleError::unavailable(format!("engine timed out waiting for '{token}'")));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.healthy = false;
                    return Err(OracleError::unavailable("engine exited"));
                }
            }
        }
    }

    /// Searches the position after `uci_moves` and returns the final score for the side to move.
    pub fn evaluate(&mut self, uci_moves: &[&str], limit: SearchLimit, timeout: Duration) -> Result<Evaluation, OracleError> {
        self.send(&position_command(uci_moves))?;
        self.send(&limit.go())?;
        let mut lines = Vec::new();
        if let Err(e) = self.read_until("bestmove", timeout, &mut lines) {
            if !self.healthy { return Err(e); }
            // Ask the search to stop; an engine that still never answers is retired.
            let _ = self.send("stop");
            if self.read_until("bestmove", Duration::from_secs(2), &mut lines).is_err() {
                self.healthy = false;
                return Err(e);
            }
            debug!("engine {} stopped after a timeout, using its last score", self.name);
        }
        lines
            .iter()
            .rev()
            .find_map(|l| parse_info_score(l))
            .ok_or_else(|| OracleError::unavailable("engine reported no score"))
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "quit").and_then(|_| self.stdin.flush());
        let t0 = Instant::now();
        while t0.elapsed() < Duration::from_millis(200) {
            if let Ok(Some(_)) = self.child.try_wait() { return; }
            std::thread::sleep(Duration::from_millis(10));
        }
        if let Err(e) = self.child.kill() { warn!("failed to kill engine {}: {e}", self.name); }
        let _ = self.child.wait();
    }
}
