//! Pool of UCI engine processes used as the evaluation oracle.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{info, warn};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{RepertoireError, Result};
use crate::oracle::{EvaluationOracle, OracleError};
use crate::repertoire::key::PositionKey;
use crate::uci::{EngineConfig, UciProcess};

pub struct EnginePool {
    config: EngineConfig,
    idle_tx: Sender<UciProcess>,
    idle_rx: Receiver<UciProcess>,
    live: AtomicUsize,
}

/// Exclusive use of one engine; it goes back to the pool on drop, or is replaced if it broke.
pub struct EngineGuard<'p> {
    pool: &'p EnginePool,
    engine: Option<UciProcess>,
}

impl Deref for EngineGuard<'_> {
    type Target = UciProcess;
    fn deref(&self) -> &UciProcess { self.engine.as_ref().expect("engine present until drop") }
}

impl DerefMut for EngineGuard<'_> {
    fn deref_mut(&mut self) -> &mut UciProcess { self.engine.as_mut().expect("engine present until drop") }
}

impl Drop for EngineGuard<'_> {
    fn drop(&mut self) {
        let Some(engine) = self.engine.take() else { return };
        if engine.is_healthy() {
            self.pool.give_back(engine);
            return;
        }
        warn!("retiring unresponsive engine {}", engine.name());
        drop(engine);
        self.pool.live.fetch_sub(1, Ordering::SeqCst);
        self.pool.replenish();
    }
}

impl EnginePool {
    /// Starts `config.instances` engines. Fails if none of them comes up.
    pub fn start(config: EngineConfig) -> Result<Self> {
        let n = config.instances.max(1);
        let (idle_tx, idle_rx) = bounded(n);
        let pool = Self { config, idle_tx, idle_rx, live: AtomicUsize::new(0) };
        let mut last_err = None;
        for _ in 0..n {
            if let Err(e) = pool.spawn_one() {
                warn!("engine failed to start: {e}");
                last_err = Some(e);
            }
        }
        if pool.size() == 0 {
            return Err(RepertoireError::OracleUnavailable(last_err.unwrap_or_else(|| OracleError::unavailable("no engines"))));
        }
        Ok(pool)
    }

    pub fn size(&self) -> usize { self.live.load(Ordering::SeqCst) }

    /// Claims one of the `instances` slots; false when all are taken.
    fn reserve(&self) -> bool {
        let cap = self.config.instances.max(1);
        let mut cur = self.live.load(Ordering::SeqCst);
        while cur < cap {
            match self.live.compare_exchange(cur, cur + 1, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
        false
    }

    /// Starts an engine into a free slot. Does nothing when the pool is full.
    fn spawn_one(&self) -> std::result::Result<(), OracleError> {
        if !self.reserve() { return Ok(()); }
        match UciProcess::spawn(&self.config) {
            Ok(p) => {
                info!("started engine {}", p.name());
                self.give_back(p);
                Ok(())
            }
            Err(e) => {
                self.live.fetch_sub(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Returns an engine to the idle queue without blocking; a surplus engine is shut down.
    fn give_back(&self, engine: UciProcess) {
        if let Err(e) = self.idle_tx.try_send(engine) {
            warn!("idle queue full, stopping surplus engine");
            drop(e.into_inner());
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn replenish(&self) {
        if let Err(e) = self.spawn_one() { warn!("could not replace engine ({} left): {e}", self.size()); }
    }

    pub fn checkout(&self) -> std::result::Result<EngineGuard<'_>, OracleError> {
        if self.size() == 0 { self.replenish(); }
        if self.size() == 0 { return Err(OracleError::unavailable("no live engines")); }
        match self.idle_rx.recv_timeout(Duration::from_millis(self.config.checkout_timeout_ms)) {
            Ok(engine) => Ok(EngineGuard { pool: self, engine: Some(engine) }),
            Err(RecvTimeoutError::Timeout) => Err(OracleError::unavailable("timed out waiting for a free engine")),
            Err(RecvTimeoutError::Disconnected) => Err(OracleError::unavailable("engine pool closed")),
        }
    }
}

impl EvaluationOracle for EnginePool {
    fn score(&self, key: &PositionKey) -> std::result::Result<i32, OracleError> {
        let mut engine = self.checkout()?;
        let moves = key.uci_moves();
        let eval = engine.evaluate(&moves, self.config.limit(), self.config.call_timeout())?;
        Ok(eval.for_mover())
    }
}
