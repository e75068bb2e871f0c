//! # Schulte Pool Runtime
//!
//! Wires the mining service to a block store and drives a session of
//! simulated solvers against it.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment)
//! 2. Open the block store (SQLite file or in-memory)
//! 3. Create the mining service and open the first block
//! 4. Spawn solver tasks
//! 5. Stop after `rounds` mined blocks or on Ctrl+C
//! 6. Report chain, leaderboard and metrics

pub mod config;
pub mod simulation;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sp_01_block_mining::{
    BlockStore, InMemoryBlockStore, MiningPoolApi, MiningPoolService, ParticipantQuery,
    StorageConfig, SystemClock,
};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

pub use config::{load_config, RuntimeConfig};
pub use simulation::{SolverProfile, SolverReport};

/// Open the store named by the storage configuration.
pub fn open_store(storage: &StorageConfig) -> Result<Arc<dyn BlockStore>> {
    match &storage.path {
        #[cfg(feature = "sqlite")]
        Some(path) => {
            let store = sp_01_block_mining::SqliteBlockStore::open(path)
                .with_context(|| format!("Failed to open block store at {}", path.display()))?;
            info!("Block store: SQLite at {}", path.display());
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        Some(path) => anyhow::bail!(
            "storage path {} requires the sqlite feature",
            path.display()
        ),
        None => {
            info!("Block store: in-memory");
            Ok(Arc::new(InMemoryBlockStore::new()))
        }
    }
}

/// The pool runtime: one service, many simulated solvers.
pub struct PoolRuntime {
    /// Session configuration.
    config: RuntimeConfig,
    /// Mining service shared by every solver.
    service: Arc<MiningPoolService>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl PoolRuntime {
    /// Create a runtime over the store named in the configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let store = open_store(&config.pool.storage)?;
        Self::with_store(config, store)
    }

    /// Create a runtime over an already opened store.
    pub fn with_store(config: RuntimeConfig, store: Arc<dyn BlockStore>) -> Result<Self> {
        info!("Creating Schulte pool runtime");
        let service = MiningPoolService::new(config.pool.clone(), store, Arc::new(SystemClock))
            .context("Failed to create mining service")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            service: Arc::new(service),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// The mining service.
    pub fn service(&self) -> Arc<MiningPoolService> {
        Arc::clone(&self.service)
    }

    /// Run the session until `rounds` blocks are mined or shutdown is signalled.
    ///
    /// Returns one report per solver.
    pub async fn run(&self) -> Result<Vec<SolverReport>> {
        info!("===========================================");
        info!("  Schulte Pool Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Solvers: {}", self.config.miners);
        info!(
            "  Rounds: {}",
            if self.config.rounds == 0 {
                "unlimited".to_string()
            } else {
                self.config.rounds.to_string()
            }
        );
        info!("===========================================");

        let service = self.service();
        let first = tokio::task::spawn_blocking(move || service.ensure_open_block(false))
            .await?
            .context("Failed to open the first block")?;
        info!("Current block #{} ({}x{})", first.id, first.width, first.height);

        let (wins_tx, mut wins_rx) = mpsc::unbounded_channel();
        let roster = SolverProfile::roster(
            self.config.miners,
            Duration::from_millis(self.config.think_time_ms),
            self.config.mistake_rate,
        );
        let handles: Vec<_> = roster
            .into_iter()
            .map(|profile| {
                tokio::spawn(simulation::run_solver(
                    self.service(),
                    profile,
                    wins_tx.clone(),
                    self.shutdown_rx.clone(),
                ))
            })
            .collect();
        drop(wins_tx);

        let mut shutdown = self.shutdown_rx.clone();
        let mut mined = 0u64;
        while !*shutdown.borrow() {
            tokio::select! {
                win = wins_rx.recv() => match win {
                    Some(_) => {
                        mined += 1;
                        if self.config.rounds > 0 && mined >= self.config.rounds {
                            info!("Mined {} blocks, stopping", mined);
                            break;
                        }
                    }
                    None => break,
                },
                _ = shutdown.changed() => break,
            }
        }
        self.shutdown();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await? {
                Ok(report) => reports.push(report),
                Err(e) => error!("Solver task failed: {:#}", e),
            }
        }
        Ok(reports)
    }

    /// Signal every solver to stop.
    pub fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }
        info!("Initiating graceful shutdown...");
    }

    /// Log the chain, leaderboard and pool counters.
    pub fn report(&self, solvers: &[SolverReport]) -> Result<()> {
        info!("----------------- chain -----------------");
        for block in self.service.blocks(sp_01_block_mining::DEFAULT_BLOCK_LISTING)? {
            info!(
                "#{:<4} diff={:<2} miner={:<12} prev={}.. hash={}",
                block.id,
                block.difficulty,
                block.miner_name.as_deref().unwrap_or("-"),
                block.prev_hash.get(..12).unwrap_or(&block.prev_hash),
                block.hash.as_deref().unwrap_or("(open)")
            );
        }

        info!("-------------- leaderboard --------------");
        for (rank, entry) in self.service.leaderboard()?.iter().enumerate() {
            info!(
                "{:>2}. {} ({}) - {} wins",
                rank + 1,
                entry.name,
                entry.school,
                entry.wins
            );
        }

        let participants = self.service.list_participants(&ParticipantQuery::default())?;
        info!("Participants: {}", participants.total);

        for solver in solvers {
            info!(
                "{}: wins={} mistakes={} late={}",
                solver.name, solver.wins, solver.mistakes, solver.late
            );
        }

        let metrics = self.service.metrics();
        info!("Metrics: {}", serde_json::to_string(&metrics.snapshot())?);
        info!("Average proof time: {:.0}us", metrics.avg_proof_time_us());
        Ok(())
    }
}
