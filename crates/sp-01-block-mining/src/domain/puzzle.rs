//! Schulte table puzzles
//!
//! A Schulte table is a `size × size` grid holding every integer in
//! `1..=size²` exactly once. Solving it means pointing at the cells in
//! increasing order, so there is no answer key to store: validity is
//! structural (see [`super::submission`]).

use crate::error::{PoolError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use std::io;

/// Task type tag of the ordered-grid puzzle
pub const SCHULTE_TYPE: &str = "schulte";

/// Solution payload stored for Schulte blocks (no fixed answer key)
pub const EMPTY_SOLUTION_JSON: &str = "{}";

/// A freshly generated Schulte table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Puzzle {
    /// Side length of the square grid
    pub size: u32,
    /// Row-major grid of `1..=size²`
    pub grid: Vec<Vec<u32>>,
}

/// Wire shape of a task payload, keys in sorted order
#[derive(Serialize)]
struct TaskPayload<'a, C> {
    grid: &'a [Vec<C>],
    size: u32,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// JSON with `", "` between items and `": "` after keys, the layout task
/// payloads are hashed in
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn encode_task<C: Serialize>(grid: &[Vec<C>], size: u32) -> Result<String> {
    let payload = TaskPayload {
        grid,
        size,
        kind: SCHULTE_TYPE,
    };
    let mut out = Vec::new();
    payload.serialize(&mut Serializer::with_formatter(&mut out, SpacedFormatter))?;
    String::from_utf8(out).map_err(|e| PoolError::Serialization(e.to_string()))
}

impl Puzzle {
    /// Number of cells in the grid
    pub fn cell_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    /// Encode as the opaque task payload stored on a block
    pub fn to_task_json(&self) -> Result<String> {
        encode_task(&self.grid, self.size)
    }
}

/// Generate a uniformly random Schulte table of the given size
pub fn generate<R: Rng + ?Sized>(size: u32, rng: &mut R) -> Result<Puzzle> {
    if size == 0 {
        return Err(PoolError::InvalidPuzzleSize { size });
    }
    let side = size as usize;
    let cells = side
        .checked_mul(side)
        .filter(|cells| *cells <= u32::MAX as usize)
        .ok_or(PoolError::InvalidPuzzleSize { size })?;

    let mut values: Vec<u32> = (1..=cells as u32).collect();
    values.shuffle(rng);
    let grid = values.chunks(side).map(<[u32]>::to_vec).collect();

    Ok(Puzzle { size, grid })
}

/// Why a stored task is not a playable Schulte table
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskDefect {
    /// Payload is not valid JSON
    Unparseable,
    /// Payload has a different (or missing) `type`
    WrongType(Option<String>),
    /// Type matches but `size`/`grid` do not describe a square table
    MalformedGrid,
}

impl std::fmt::Display for TaskDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskDefect::Unparseable => write!(f, "task payload is not JSON"),
            TaskDefect::WrongType(Some(kind)) => write!(f, "task type is {kind:?}"),
            TaskDefect::WrongType(None) => write!(f, "task type is missing"),
            TaskDefect::MalformedGrid => write!(f, "task grid is not a square table"),
        }
    }
}

/// A Schulte task decoded from a stored block
///
/// Cells are kept as raw JSON values: a corrupted cell must fail the
/// submission walk, not the decode.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SchulteTask {
    /// Side length of the square grid
    pub size: u32,
    /// Row-major grid cells
    pub grid: Vec<Vec<Value>>,
}

impl SchulteTask {
    /// Decode a stored task payload, rejecting anything but a Schulte table
    pub fn parse(task_json: &str) -> std::result::Result<Self, TaskDefect> {
        let value: Value = serde_json::from_str(task_json).map_err(|_| TaskDefect::Unparseable)?;
        match value.get("type").and_then(Value::as_str) {
            Some(SCHULTE_TYPE) => {}
            other => return Err(TaskDefect::WrongType(other.map(str::to_string))),
        }

        let task: SchulteTask =
            serde_json::from_value(value).map_err(|_| TaskDefect::MalformedGrid)?;
        let side = task.size as usize;
        if side == 0 || task.grid.len() != side || task.grid.iter().any(|row| row.len() != side) {
            return Err(TaskDefect::MalformedGrid);
        }
        Ok(task)
    }

    /// Number of cells a full solution must point at
    pub fn cell_count(&self) -> usize {
        (self.size as usize) * (self.size as usize)
    }

    /// Canonical payload used for proof hashing, whatever key order the
    /// stored text had
    pub fn to_task_json(&self) -> Result<String> {
        encode_task(&self.grid, self.size)
    }
}
