#![cfg(unix)]

use cozy_chess::Color;
use repertoire::oracle::engine::EnginePool;
use repertoire::uci::{EngineConfig, SearchLimit, UciProcess};
use repertoire::{EvaluationOracle, PositionKey};
use std::collections::HashMap;
use std::fs::{create_dir_all, set_permissions, write, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Writes a tiny UCI engine as a shell script. `on_go` and `on_stop` are shell snippets.
fn fake_engine(name: &str, on_go: &str, on_stop: &str) -> String {
    let dir = Path::new("target/uci_test");
    create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let script = format!(
        "#!/bin/sh\n\
         while read -r line; do\n\
           case \"$line\" in\n\
             uci) echo \"id name {name}\"; echo uciok ;;\n\
             isready) echo readyok ;;\n\
             go*) {on_go} ;;\n\
             stop) {on_stop} ;;\n\
             quit) exit 0 ;;\n\
           esac\n\
         done\n"
    );
    write(&path, script).unwrap();
    set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
    path.canonicalize().unwrap().to_string_lossy().into_owned()
}

/// All scripts are written before any test spawns one, so no exec races an open writer.
fn engine(name: &str) -> String {
    static SCRIPTS: OnceLock<HashMap<&'static str, String>> = OnceLock::new();
    let scripts = SCRIPTS.get_or_init(|| {
        let good = "echo 'info depth 1 score cp 35 pv e7e5'; echo 'bestmove e7e5'";
        [
            ("steady.sh", good, "true"),
            ("crash.sh", "exit 1", "true"),
            ("slow.sh", "echo 'info depth 3 score cp 12'", "echo 'bestmove e7e5'"),
            ("mute.sh", "true", "true"),
        ]
        .into_iter()
        .map(|(n, go, stop)| (n, fake_engine(n, go, stop)))
        .collect()
    });
    scripts[name].clone()
}

fn config(path: String) -> EngineConfig {
    EngineConfig { path, instances: 1, movetime_ms: 10, timeout_ms: 2_000, checkout_timeout_ms: 5_000, ..Default::default() }
}

fn after_e4() -> PositionKey { PositionKey::parse_line(Color::White, "e4").unwrap() }

#[test]
fn handshake_reads_engine_name_and_scores_side_to_move() {
    let path = engine("steady.sh");
    let mut p = UciProcess::spawn(&config(path)).unwrap();
    assert_eq!(p.name(), "steady.sh");
    let eval = p.evaluate(&["e2e4"], SearchLimit::MoveTime(Duration::from_millis(10)), Duration::from_secs(2)).unwrap();
    assert_eq!(eval.to_cp(), 35);
    assert!(p.is_healthy());
}

#[test]
fn pool_score_is_from_the_movers_view() {
    let path = engine("steady.sh");
    let pool = EnginePool::start(config(path)).unwrap();
    assert_eq!(pool.score(&after_e4()), Ok(-35));
    assert_eq!(pool.score(&after_e4()), Ok(-35), "engine went back to the pool");
    assert_eq!(pool.size(), 1);
}

#[test]
fn crashed_engine_is_replaced() {
    let path = engine("crash.sh");
    let pool = EnginePool::start(config(path)).unwrap();
    assert!(pool.score(&after_e4()).is_err());
    assert_eq!(pool.size(), 1);
    assert!(pool.score(&after_e4()).is_err());
    assert_eq!(pool.size(), 1);
}

#[test]
fn concurrent_crashes_never_exceed_instances() {
    let path = engine("crash.sh");
    let pool = EnginePool::start(config(path)).unwrap();
    let t0 = Instant::now();
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..5 {
                    assert!(pool.score(&after_e4()).is_err());
                    assert!(pool.size() <= 1, "live engines {} above instances", pool.size());
                }
            });
        }
    });
    assert!(pool.size() <= 1);
    assert!(t0.elapsed() < Duration::from_secs(60), "workers stalled");
}

#[test]
fn timed_out_search_keeps_score_reported_after_stop() {
    let path = engine("slow.sh");
    let cfg = EngineConfig { depth: Some(40), timeout_ms: 500, ..config(path) };
    let pool = EnginePool::start(cfg).unwrap();
    assert_eq!(pool.score(&after_e4()), Ok(-12));
    assert_eq!(pool.score(&after_e4()), Ok(-12), "stopped engine stays usable");
    assert_eq!(pool.size(), 1);
}

#[test]
fn engine_ignoring_stop_is_retired() {
    let path = engine("mute.sh");
    let cfg = EngineConfig { depth: Some(40), timeout_ms: 300, ..config(path) };
    let mut p = UciProcess::spawn(&cfg).unwrap();
    assert!(p.evaluate(&["e2e4"], cfg.limit(), cfg.call_timeout()).is_err());
    assert!(!p.is_healthy());

    let pool = EnginePool::start(cfg).unwrap();
    assert!(pool.score(&after_e4()).is_err());
    assert_eq!(pool.size(), 1, "unresponsive engine was swapped for a fresh one");
}
