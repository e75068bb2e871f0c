//! Mining Pool Service Implementation
//!
//! Orchestrates the block lifecycle (open, repair, mine, open next) and the
//! submission claim protocol on top of a [`BlockStore`]. The service holds no
//! mutable pool state of its own: every coordination point is a conditional
//! write reported back by the store, so any number of service instances may
//! share one store.

use crate::{
    config::PoolConfig,
    domain::{
        check_sequence, invariants::check_block, parse_positions, policy_for, puzzle, Block,
        BlockId, BlockSummary, ChainLinker, CurrentBlockView, DifficultyController,
        LeaderboardEntry, MiningClaim, MiningReceipt, NewBlock, Participant, ParticipantId,
        ParticipantPage, ParticipantQuery, Position, ProofInput, ProofMode, ProofOfWork,
        ProofPolicy, Registration, RejectReason, SchulteTask, Submission, SubmissionOutcome,
        TaskView, Winner, EMPTY_SOLUTION_JSON, SCHULTE_TYPE,
    },
    error::{PoolError, Result},
    metrics::PoolMetrics,
    ports::{BlockStore, Clock, MiningPoolApi},
    utils::{normalize_participant_query, validate_join},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Rounds of read/insert/rewrite before `ensure_open_block` gives up
pub const MAX_OPEN_ATTEMPTS: usize = 3;

/// Real search above this many zeros is unlikely to finish in reasonable time
const REAL_SEARCH_WARN_DIFFICULTY: u32 = 6;

/// Mining pool service
///
/// Implements [`MiningPoolApi`] over any [`BlockStore`] and [`Clock`].
pub struct MiningPoolService {
    store: Arc<dyn BlockStore>,
    clock: Arc<dyn Clock>,
    difficulty: DifficultyController,
    chain: ChainLinker,
    proof: Box<dyn ProofPolicy>,
    metrics: PoolMetrics,
}

impl MiningPoolService {
    /// Create a new mining pool service
    pub fn new(config: PoolConfig, store: Arc<dyn BlockStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        info!("[sp-01] Initializing Mining Pool Service");
        info!(
            "  Puzzle Size: {} (bounds {}..={})",
            config.difficulty.base_size, config.difficulty.min_size, config.difficulty.max_size
        );
        info!(
            "  Target Block Time: {}s (window {})",
            config.difficulty.target_block_time, config.difficulty.window
        );
        info!("  Proof Mode: {}", config.proof.mode.as_str());

        let chain = ChainLinker::new(config.chain);
        if config.proof.mode == ProofMode::RealSearch
            && chain.max_difficulty() > REAL_SEARCH_WARN_DIFFICULTY
        {
            warn!(
                "[sp-01] real-search with max_difficulty {} may stall submissions",
                chain.max_difficulty()
            );
        }

        Ok(Self {
            store,
            clock,
            proof: policy_for(&config.proof),
            difficulty: DifficultyController::new(config.difficulty),
            chain,
            metrics: PoolMetrics::new(),
        })
    }

    /// Replace the proof policy chosen by the config
    pub fn with_proof_policy(mut self, policy: Box<dyn ProofPolicy>) -> Self {
        info!("[sp-01] Proof policy overridden: {}", policy.mode().as_str());
        self.proof = policy;
        self
    }

    /// Pool counters
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Submit a raw `[[row, col], ...]` JSON body
    ///
    /// A body of any other shape is rejected as malformed, after the solver
    /// and the puzzle type have been checked.
    pub fn submit_json(
        &self,
        solver_id: ParticipantId,
        block_id: Option<BlockId>,
        positions: &Value,
    ) -> Result<SubmissionOutcome> {
        let positions = parse_positions(positions);
        self.process_submission(solver_id, block_id, positions.as_deref())
    }

    /// Content for the next open block: DDA size, fresh puzzle, chain link
    fn draft_block(&self) -> Result<NewBlock> {
        let history = self.store.recent_mined(self.difficulty.config().window)?;
        let (size, decision) = self.difficulty.decide(&history);
        debug!("[sp-01] Next puzzle size {} ({:?})", size, decision);

        let puzzle = puzzle::generate(size, &mut rand::thread_rng())?;
        Ok(NewBlock {
            created_at: self.clock.now(),
            size,
            task_json: puzzle.to_task_json()?,
            solution_json: EMPTY_SOLUTION_JSON.to_string(),
            prev_hash: self.chain.link(self.store.last_mined_hash()?),
            difficulty: self.chain.difficulty_for(size),
        })
    }

    /// An open block is playable when it holds a well-formed Schulte task of
    /// its own width and passes the per-block invariants
    fn is_playable(block: &Block) -> bool {
        match SchulteTask::parse(&block.task_json) {
            Ok(task) => task.size == block.width && check_block(block).is_ok(),
            Err(_) => false,
        }
    }

    /// Rewrite a malformed open block in place
    ///
    /// Returns `None` if the block was mined before the rewrite landed.
    fn repair_open_block(&self, block: &Block) -> Result<Option<Block>> {
        let defect = SchulteTask::parse(&block.task_json)
            .err()
            .map_or_else(|| "invariant violation".to_string(), |d| d.to_string());
        warn!("[sp-01] Open block #{} is not playable ({}), rewriting", block.id, defect);

        let draft = self.draft_block()?;
        let Some(rewritten) = self.store.rewrite_open_block(block.id, &draft)? else {
            debug!("[sp-01] Block #{} was mined before the rewrite", block.id);
            return Ok(None);
        };
        check_block(&rewritten)?;
        self.metrics.record_block_rewritten();
        info!(
            "[sp-01] Block #{} reopened: {}x{} difficulty={} prev={}",
            rewritten.id,
            rewritten.width,
            rewritten.height,
            rewritten.difficulty,
            short_hash(&rewritten.prev_hash)
        );
        Ok(Some(rewritten))
    }

    fn reject(&self, solver_id: ParticipantId, reason: RejectReason) -> SubmissionOutcome {
        debug!("[sp-01] Submission from #{} rejected: {}", solver_id, reason);
        self.metrics.record_rejected();
        SubmissionOutcome::Rejected(reason)
    }

    /// Block a submission targets
    ///
    /// A pinned id is looked up as-is. Otherwise the current open block is
    /// used without repair, so a malformed one is reported to the solver
    /// rather than silently swapped.
    fn target_block(&self, block_id: Option<BlockId>) -> Result<Option<Block>> {
        match block_id {
            Some(id) => self.store.block(id),
            None => match self.store.open_block()? {
                Some(block) => Ok(Some(block)),
                None => self.ensure_open_block(false).map(Some),
            },
        }
    }

    /// Fail-fast submission pipeline
    ///
    /// `positions` is `None` when the body did not decode as coordinate pairs.
    fn process_submission(
        &self,
        solver_id: ParticipantId,
        block_id: Option<BlockId>,
        positions: Option<&[Position]>,
    ) -> Result<SubmissionOutcome> {
        let Some(solver) = self.store.participant(solver_id)? else {
            return Ok(self.reject(solver_id, RejectReason::NotJoined));
        };

        let Some(block) = self.target_block(block_id)? else {
            return Ok(self.reject(solver_id, RejectReason::UnknownBlock));
        };

        let task = match SchulteTask::parse(&block.task_json) {
            Ok(task) => task,
            Err(defect) => {
                debug!("[sp-01] Block #{} task defect: {}", block.id, defect);
                return Ok(self.reject(solver_id, RejectReason::WrongPuzzleType));
            }
        };

        let Some(positions) = positions else {
            return Ok(self.reject(solver_id, RejectReason::MalformedSubmission));
        };

        if let Err(err) = check_sequence(&task, positions) {
            debug!("[sp-01] Block #{} sequence check failed: {:?}", block.id, err);
            return Ok(self.reject(solver_id, RejectReason::IncorrectSequence));
        }

        if !block.is_open() {
            return Ok(self.reject(solver_id, RejectReason::AlreadyMined));
        }

        let task_json = task.to_task_json()?;
        let solver_tag = solver.solver_tag();
        let started = Instant::now();
        let proof = self.proof.issue(&ProofInput {
            prev_hash: &block.prev_hash,
            task_json: &task_json,
            solver_tag: &solver_tag,
            difficulty: block.difficulty,
        });
        let elapsed = started.elapsed();
        self.metrics.record_proof_time(elapsed.as_micros() as u64);
        info!(
            "[sp-01] Proof for block #{} ({}): difficulty={} nonce={} iterations={:?} in {:?}",
            block.id,
            proof.meta.mode.as_str(),
            block.difficulty,
            proof.nonce,
            proof.meta.iterations,
            elapsed
        );

        let claimed = self.store.claim_block(&MiningClaim {
            block_id: block.id,
            mined_at: self.clock.now(),
            miner_id: solver.id,
            nonce: proof.nonce,
            hash: proof.hash.clone(),
        })?;
        if !claimed {
            self.metrics.record_claim_lost();
            info!(
                "[sp-01] {} solved block #{} but lost the claim",
                solver.name, block.id
            );
            return Ok(self.reject(solver_id, RejectReason::AlreadyMined));
        }

        self.metrics.record_accepted();
        info!(
            "[sp-01] Block #{} mined by {} ({}) hash={}",
            block.id,
            solver.name,
            solver.school,
            short_hash(&proof.hash)
        );

        // The win is already persisted; a failure here only delays the next
        // block until someone asks for it.
        if let Err(e) = self.ensure_open_block(true) {
            error!("[sp-01] Failed to open the block after #{}: {}", block.id, e);
        }

        Ok(SubmissionOutcome::Accepted(MiningReceipt {
            block_id: block.id,
            winner: Winner {
                name: solver.name,
                school: solver.school,
            },
            pow: ProofOfWork {
                nonce: proof.nonce,
                hash: proof.hash,
            },
        }))
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

impl MiningPoolApi for MiningPoolService {
    fn join(&self, name: &str, school: &str, group: Option<&str>) -> Result<Participant> {
        let fields = validate_join(name, school, group)?;
        let participant = self.store.upsert_participant(&Registration {
            name: fields.name,
            school: fields.school,
            group: fields.group,
            joined_at: self.clock.now(),
        })?;
        info!(
            "[sp-01] Participant #{} joined: {} ({})",
            participant.id, participant.name, participant.school
        );
        Ok(participant)
    }

    fn ensure_open_block(&self, force_new: bool) -> Result<Block> {
        let mut insert_first = force_new;

        for attempt in 1..=MAX_OPEN_ATTEMPTS {
            if !insert_first {
                if let Some(block) = self.store.open_block()? {
                    if Self::is_playable(&block) {
                        return Ok(block);
                    }
                    if let Some(repaired) = self.repair_open_block(&block)? {
                        return Ok(repaired);
                    }
                    continue;
                }
            }
            insert_first = false;

            let draft = self.draft_block()?;
            match self.store.insert_open_block(&draft)? {
                Some(block) => {
                    check_block(&block)?;
                    self.metrics.record_block_opened();
                    info!(
                        "[sp-01] Block #{} opened: {}x{} difficulty={} prev={}",
                        block.id,
                        block.width,
                        block.height,
                        block.difficulty,
                        short_hash(&block.prev_hash)
                    );
                    return Ok(block);
                }
                None => debug!(
                    "[sp-01] Another caller opened a block first (attempt {})",
                    attempt
                ),
            }
        }

        Err(PoolError::InconsistentState {
            reason: format!(
                "no open block settled after {} attempts",
                MAX_OPEN_ATTEMPTS
            ),
        })
    }

    fn current_block(&self) -> Result<CurrentBlockView> {
        let block = self.ensure_open_block(false)?;
        let task = SchulteTask::parse(&block.task_json).map_err(|defect| {
            PoolError::InconsistentState {
                reason: format!("open block #{} after repair: {}", block.id, defect),
            }
        })?;
        Ok(CurrentBlockView {
            id: block.id,
            created_at: block.created_at,
            puzzle_type: SCHULTE_TYPE.to_string(),
            difficulty: block.difficulty,
            task: TaskView {
                size: task.size,
                grid: task.grid,
            },
        })
    }

    fn submit(&self, submission: &Submission) -> Result<SubmissionOutcome> {
        self.process_submission(
            submission.solver_id,
            submission.block_id,
            Some(&submission.positions),
        )
    }

    fn blocks(&self, limit: usize) -> Result<Vec<BlockSummary>> {
        self.store.list_blocks(limit)
    }

    fn list_participants(&self, query: &ParticipantQuery) -> Result<ParticipantPage> {
        self.store.list_participants(&normalize_participant_query(query))
    }

    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        self.store.leaderboard()
    }
}
