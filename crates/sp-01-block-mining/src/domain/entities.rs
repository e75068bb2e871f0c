//! Domain entities for block mining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Block identifier, assigned monotonically by the store
pub type BlockId = u64;

/// Participant identifier, assigned by the store on first join
pub type ParticipantId = u64;

/// A registered solver
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Store-assigned id, stable across re-joins
    pub id: ParticipantId,
    /// Display name (unique together with `school`)
    pub name: String,
    /// School the participant represents
    pub school: String,
    /// Group, the only field a re-join may change
    pub group: Option<String>,
    /// First join time
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    /// Identity string bound into the proof hash
    pub fn solver_tag(&self) -> String {
        format!("{}|{}", self.name, self.school)
    }
}

/// Join request handed to the store after sanitizing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    /// Display name
    pub name: String,
    /// School
    pub school: String,
    /// Optional group
    pub group: Option<String>,
    /// Join time, kept only when the participant is new
    pub joined_at: DateTime<Utc>,
}

/// Lifecycle state of a block
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    /// Waiting for a valid solution
    Open,
    /// Claimed by exactly one solver (terminal)
    Mined,
}

/// One puzzle round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Monotonic id
    pub id: BlockId,
    /// Open time
    pub created_at: DateTime<Utc>,
    /// Win time, set exactly once
    pub mined_at: Option<DateTime<Utc>>,
    /// Winner, set together with `mined_at`
    pub miner_id: Option<ParticipantId>,
    /// Puzzle width
    pub width: u32,
    /// Puzzle height (always equal to `width`)
    pub height: u32,
    /// Opaque task payload, `{type, size, grid}` for Schulte tables
    pub task_json: String,
    /// Solution payload, empty object for Schulte tables
    pub solution_json: String,
    /// Hash of the most recently mined block when this one opened
    pub prev_hash: String,
    /// Required number of leading hex zeros
    pub difficulty: u32,
    /// Proof nonce, set when mined
    pub nonce: Option<u64>,
    /// Proof hash, set when mined
    pub hash: Option<String>,
}

impl Block {
    /// Current lifecycle state
    pub fn state(&self) -> BlockState {
        if self.mined_at.is_none() {
            BlockState::Open
        } else {
            BlockState::Mined
        }
    }

    /// True while nobody has claimed the block
    pub fn is_open(&self) -> bool {
        self.state() == BlockState::Open
    }
}

/// Content of a block about to be opened (fresh insert or in-place rewrite)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBlock {
    /// Open time
    pub created_at: DateTime<Utc>,
    /// Side length of the puzzle
    pub size: u32,
    /// Encoded task
    pub task_json: String,
    /// Encoded solution
    pub solution_json: String,
    /// Link to the previous mined block
    pub prev_hash: String,
    /// Required zero-prefix length
    pub difficulty: u32,
}

/// Fields written by the single conditional claim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningClaim {
    /// Block being claimed
    pub block_id: BlockId,
    /// Claim time
    pub mined_at: DateTime<Utc>,
    /// Winner
    pub miner_id: ParticipantId,
    /// Issued nonce
    pub nonce: u64,
    /// Issued hash
    pub hash: String,
}

/// Mined block data the difficulty controller looks at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinedBlockInfo {
    /// Block id
    pub id: BlockId,
    /// Open time
    pub created_at: DateTime<Utc>,
    /// Win time
    pub mined_at: DateTime<Utc>,
    /// Puzzle width
    pub width: u32,
}

impl MinedBlockInfo {
    /// Solve duration in seconds (may be zero or negative on clock skew)
    pub fn solve_secs(&self) -> f64 {
        (self.mined_at - self.created_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Chain listing row: task and solution are never included
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    /// Block id
    pub id: BlockId,
    /// Open time
    pub created_at: DateTime<Utc>,
    /// Win time
    pub mined_at: Option<DateTime<Utc>>,
    /// Winner name
    pub miner_name: Option<String>,
    /// Winner school
    pub miner_school: Option<String>,
    /// Required zero-prefix length
    pub difficulty: u32,
    /// Proof nonce
    pub nonce: Option<u64>,
    /// Proof hash
    pub hash: Option<String>,
    /// Link to the previous mined block
    pub prev_hash: String,
}

/// Leaderboard row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// Participant name
    pub name: String,
    /// Participant school
    pub school: String,
    /// Number of mined blocks
    pub wins: u64,
}

/// Default page size of a participant listing
pub const DEFAULT_PARTICIPANT_PAGE: usize = 200;

/// Largest page a participant listing returns
pub const MAX_PARTICIPANT_PAGE: usize = 500;

/// Direction of a participant listing, by join time
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

/// Participant listing filter
///
/// `q` is a case-insensitive substring of name, school or group; `school`
/// must match exactly.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParticipantQuery {
    /// Free-text search
    pub q: Option<String>,
    /// Exact school
    pub school: Option<String>,
    /// Join-time order
    pub order: SortOrder,
    /// Page size
    pub limit: usize,
    /// Rows skipped before the page
    pub offset: usize,
}

impl Default for ParticipantQuery {
    fn default() -> Self {
        Self {
            q: None,
            school: None,
            order: SortOrder::Asc,
            limit: DEFAULT_PARTICIPANT_PAGE,
            offset: 0,
        }
    }
}

/// One page of a participant listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipantPage {
    /// Participants on this page
    pub items: Vec<Participant>,
    /// Matches before paging
    pub total: u64,
    /// Page size applied
    pub limit: usize,
    /// Offset applied
    pub offset: usize,
}

/// Puzzle part of the current block view
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskView {
    /// Side length
    pub size: u32,
    /// Grid cells
    pub grid: Vec<Vec<serde_json::Value>>,
}

/// Current open block as exposed to clients (no solution)
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentBlockView {
    /// Block id
    pub id: BlockId,
    /// Open time
    pub created_at: DateTime<Utc>,
    /// Puzzle type tag
    #[serde(rename = "type")]
    pub puzzle_type: String,
    /// Required zero-prefix length
    pub difficulty: u32,
    /// Puzzle
    pub task: TaskView,
}
