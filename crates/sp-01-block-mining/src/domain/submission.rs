//! Submission validation
//!
//! A candidate solution is the list of grid coordinates the solver pointed at,
//! in order. It is correct when it has exactly `size²` entries and the cell
//! at the i-th coordinate holds `i` (1-based). The walk stops at the first
//! mismatch.
//!
//! Rejections are outcomes, not errors: guessing wrong or losing the claim
//! race is expected steady-state behavior.

use super::entities::{BlockId, ParticipantId};
use super::puzzle::SchulteTask;
use serde::Serialize;
use serde_json::Value;

/// A `[row, col]` grid coordinate as sent by the client
pub type Position = [i64; 2];

/// A solver's attempt at a block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// Who is submitting
    pub solver_id: ParticipantId,
    /// Block the solution targets; `None` means the current open block
    pub block_id: Option<BlockId>,
    /// Coordinates in the order they were pointed at
    pub positions: Vec<Position>,
}

impl Submission {
    /// Submission against whatever block is currently open
    pub fn for_open_block(solver_id: ParticipantId, positions: Vec<Position>) -> Self {
        Self {
            solver_id,
            block_id: None,
            positions,
        }
    }

    /// Submission pinned to a specific block
    pub fn for_block(solver_id: ParticipantId, block_id: BlockId, positions: Vec<Position>) -> Self {
        Self {
            solver_id,
            block_id: Some(block_id),
            positions,
        }
    }
}

/// Parse a raw `[[row, col], ...]` JSON body into positions
///
/// Returns `None` for any other shape, including non-integer coordinates.
pub fn parse_positions(value: &Value) -> Option<Vec<Position>> {
    value
        .as_array()?
        .iter()
        .map(|pair| match pair.as_array()?.as_slice() {
            [row, col] => Some([row.as_i64()?, col.as_i64()?]),
            _ => None,
        })
        .collect()
}

/// First reason a candidate sequence failed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SequenceError {
    /// Candidate does not cover every cell
    WrongLength {
        /// `size²`
        expected: usize,
        /// Submitted length
        actual: usize,
    },
    /// Coordinate outside the grid
    OutOfRange {
        /// Index into the candidate
        step: usize,
    },
    /// Grid cell is not an integer
    NonIntegerCell {
        /// Index into the candidate
        step: usize,
    },
    /// Cell holds the wrong value for this step
    OutOfOrder {
        /// Index into the candidate
        step: usize,
        /// Value the step needed
        expected: i64,
        /// Value found at the coordinate
        found: i64,
    },
}

/// Walk a candidate against a Schulte task
pub fn check_sequence(task: &SchulteTask, positions: &[Position]) -> Result<(), SequenceError> {
    let expected_len = task.cell_count();
    if positions.len() != expected_len {
        return Err(SequenceError::WrongLength {
            expected: expected_len,
            actual: positions.len(),
        });
    }

    for (step, &[row, col]) in positions.iter().enumerate() {
        let cell = usize::try_from(row)
            .ok()
            .and_then(|r| task.grid.get(r))
            .and_then(|cells| usize::try_from(col).ok().and_then(|c| cells.get(c)))
            .ok_or(SequenceError::OutOfRange { step })?;
        let found = cell.as_i64().ok_or(SequenceError::NonIntegerCell { step })?;
        let expected = step as i64 + 1;
        if found != expected {
            return Err(SequenceError::OutOfOrder {
                step,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Why a submission was not accepted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Solver id is not a known participant
    NotJoined,
    /// Pinned block id does not exist
    UnknownBlock,
    /// Target block does not hold a Schulte table (repaired on next access)
    WrongPuzzleType,
    /// Body was not a list of `[row, col]` pairs
    MalformedSubmission,
    /// Sequence does not visit `1..=size²` in order
    IncorrectSequence,
    /// Another solver claimed the block first
    AlreadyMined,
}

impl RejectReason {
    /// Stable reason string reported to clients
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NotJoined => "not joined",
            RejectReason::UnknownBlock => "unknown block",
            RejectReason::WrongPuzzleType => "wrong puzzle type",
            RejectReason::MalformedSubmission => "malformed submission",
            RejectReason::IncorrectSequence => "incorrect sequence",
            RejectReason::AlreadyMined => "already mined",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Winner identity returned on acceptance
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Winner {
    /// Name
    pub name: String,
    /// School
    pub school: String,
}

/// Proof attached to a mined block
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProofOfWork {
    /// Issued nonce
    pub nonce: u64,
    /// Issued hash (satisfies the block's zero prefix)
    pub hash: String,
}

/// Everything a winning solver gets back
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningReceipt {
    /// Block that was mined
    pub block_id: BlockId,
    /// Winner
    pub winner: Winner,
    /// Proof stored on the block
    pub pow: ProofOfWork,
}

/// Result of a submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The block was claimed by this submission
    Accepted(MiningReceipt),
    /// Nothing changed
    Rejected(RejectReason),
}

impl SubmissionOutcome {
    /// True if this submission mined the block
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted(_))
    }

    /// Rejection reason, if any
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            SubmissionOutcome::Accepted(_) => None,
            SubmissionOutcome::Rejected(reason) => Some(*reason),
        }
    }

    /// Client-facing response body
    pub fn to_response(&self) -> SubmitResponse {
        match self {
            SubmissionOutcome::Accepted(receipt) => SubmitResponse {
                ok: true,
                reason: None,
                winner: Some(receipt.winner.clone()),
                pow: Some(receipt.pow.clone()),
            },
            SubmissionOutcome::Rejected(reason) => SubmitResponse {
                ok: false,
                reason: Some(reason.as_str()),
                winner: None,
                pow: None,
            },
        }
    }
}

/// `{ok, reason?}` or `{ok: true, winner, pow}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    /// Whether the block was mined
    pub ok: bool,
    /// Rejection reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Winner identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    /// Issued proof
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pow: Option<ProofOfWork>,
}

/// Coordinates that solve a Schulte task, in order
///
/// Used by bots and tests; returns `None` if a value is missing from the grid.
pub fn solve(task: &SchulteTask) -> Option<Vec<Position>> {
    let mut positions = vec![None; task.cell_count()];
    for (r, row) in task.grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let value = cell.as_u64()? as usize;
            let slot = positions.get_mut(value.checked_sub(1)?)?;
            *slot = Some([r as i64, c as i64]);
        }
    }
    positions.into_iter().collect()
}
