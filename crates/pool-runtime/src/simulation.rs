//! # Simulated Solvers
//!
//! Each solver is a tokio task that fetches the current puzzle, "thinks" for
//! a random while, then submits a sequence pinned to the block it looked at.
//! Some answers are deliberately wrong, and several solvers often finish the
//! same block, so both rejection paths of the claim protocol get traffic.
//!
//! The service API is synchronous; calls go through `spawn_blocking`.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sp_01_block_mining::domain::solve;
use sp_01_block_mining::{
    BlockId, MiningPoolApi, MiningPoolService, Participant, RejectReason, SchulteTask,
    Submission, SubmissionOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Identity and habits of one simulated solver.
#[derive(Debug, Clone)]
pub struct SolverProfile {
    /// Display name.
    pub name: String,
    /// School.
    pub school: String,
    /// Mean pause before each submission.
    pub think_time: Duration,
    /// Chance of submitting a wrong sequence.
    pub mistake_rate: f64,
}

impl SolverProfile {
    /// Profiles for `count` solvers spread over a few schools.
    pub fn roster(count: usize, think_time: Duration, mistake_rate: f64) -> Vec<Self> {
        const SCHOOLS: [&str; 3] = ["North High", "River Academy", "Hillside"];
        (0..count)
            .map(|i| SolverProfile {
                name: format!("bot-{:02}", i + 1),
                school: SCHOOLS[i % SCHOOLS.len()].to_string(),
                think_time,
                mistake_rate,
            })
            .collect()
    }
}

/// What a solver did during the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverReport {
    /// Display name.
    pub name: String,
    /// Blocks mined.
    pub wins: u64,
    /// Wrong sequences submitted.
    pub mistakes: u64,
    /// Correct sequences that arrived after the block was claimed.
    pub late: u64,
}

fn random_pause(rng: &mut StdRng, mean: Duration) -> Duration {
    let mean_ms = mean.as_millis() as u64;
    if mean_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(mean_ms / 2..=mean_ms + mean_ms / 2))
}

/// One attempt: look at the open block and submit an answer for it.
fn attempt(
    service: &MiningPoolService,
    solver: &Participant,
    wrong: bool,
) -> Result<(BlockId, SubmissionOutcome)> {
    let view = service.current_block()?;
    let task = SchulteTask {
        size: view.task.size,
        grid: view.task.grid,
    };
    let mut positions =
        solve(&task).ok_or_else(|| anyhow!("block #{} has an unsolvable grid", view.id))?;
    if wrong && positions.len() > 1 {
        positions.swap(0, 1);
    }
    let outcome = service.submit(&Submission::for_block(solver.id, view.id, positions))?;
    Ok((view.id, outcome))
}

/// Run one solver until shutdown is signalled.
///
/// Every block this solver mines is reported on `wins`.
pub async fn run_solver(
    service: Arc<MiningPoolService>,
    profile: SolverProfile,
    wins: mpsc::UnboundedSender<BlockId>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<SolverReport> {
    let mut rng = StdRng::from_entropy();
    let mut report = SolverReport {
        name: profile.name.clone(),
        ..SolverReport::default()
    };

    let svc = Arc::clone(&service);
    let (name, school) = (profile.name.clone(), profile.school.clone());
    let solver =
        tokio::task::spawn_blocking(move || svc.join(&name, &school, None)).await??;
    debug!("{} joined as participant #{}", solver.name, solver.id);

    while !*shutdown.borrow() {
        let pause = random_pause(&mut rng, profile.think_time);
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = shutdown.changed() => break,
        }

        let wrong = rng.gen_bool(profile.mistake_rate);
        let svc = Arc::clone(&service);
        let me = solver.clone();
        let result = tokio::task::spawn_blocking(move || attempt(&svc, &me, wrong)).await?;

        match result {
            Ok((block_id, SubmissionOutcome::Accepted(receipt))) => {
                report.wins += 1;
                info!(
                    "{} mined block #{} (nonce={})",
                    report.name, block_id, receipt.pow.nonce
                );
                if wins.send(block_id).is_err() {
                    break;
                }
            }
            Ok((_, SubmissionOutcome::Rejected(RejectReason::IncorrectSequence))) => {
                report.mistakes += 1;
            }
            Ok((block_id, SubmissionOutcome::Rejected(RejectReason::AlreadyMined))) => {
                report.late += 1;
                debug!("{} was late for block #{}", report.name, block_id);
            }
            Ok((block_id, SubmissionOutcome::Rejected(reason))) => {
                warn!("{} rejected on block #{}: {}", report.name, block_id, reason);
            }
            Err(e) => {
                warn!("{} attempt failed: {:#}", report.name, e);
            }
        }
    }

    Ok(report)
}
