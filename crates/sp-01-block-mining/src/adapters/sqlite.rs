//! SQLite block store
//!
//! Every lifecycle write is one statement guarded by `mined_at IS NULL` (or
//! `NOT EXISTS` an open block), so several pool processes may share a single
//! database file. Timestamps are RFC 3339 text at second precision.

use crate::domain::{
    Block, BlockId, BlockSummary, LeaderboardEntry, MinedBlockInfo, MiningClaim, NewBlock,
    Participant, ParticipantId, ParticipantPage, ParticipantQuery, Registration, SortOrder,
};
use crate::error::{PoolError, Result};
use crate::ports::BlockStore;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS participants (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  school TEXT NOT NULL,
  grp TEXT,
  joined_at TEXT NOT NULL,
  CONSTRAINT uq_name_school UNIQUE(name, school)
);

CREATE TABLE IF NOT EXISTS blocks (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  created_at TEXT NOT NULL,
  mined_at TEXT,
  miner_id INTEGER,
  width INTEGER NOT NULL,
  height INTEGER NOT NULL,
  task_json TEXT NOT NULL,
  solution_json TEXT NOT NULL,
  prev_hash TEXT NOT NULL,
  difficulty INTEGER NOT NULL DEFAULT 3,
  nonce INTEGER,
  hash TEXT,
  FOREIGN KEY(miner_id) REFERENCES participants(id)
);
";

const BLOCK_COLUMNS: &str = "id, created_at, mined_at, miner_id, width, height, \
    task_json, solution_json, prev_hash, difficulty, nonce, hash";

/// `?1` is a LIKE pattern (or NULL), `?2` an exact school (or NULL)
const PARTICIPANT_FILTER: &str = "(?1 IS NULL OR name LIKE ?1 ESCAPE '\\' \
    OR school LIKE ?1 ESCAPE '\\' OR COALESCE(grp, '') LIKE ?1 ESCAPE '\\') \
    AND (?2 IS NULL OR school = ?2)";

/// How long a writer waits on another process holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(idx, &r)).transpose()
}

/// Substring pattern with LIKE wildcards in the needle escaped
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn to_sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| PoolError::Storage(format!("id {} out of range", id)))
}

fn block_from_row(row: &Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        id: row.get::<_, i64>(0)? as u64,
        created_at: ts_column(row, 1)?,
        mined_at: opt_ts_column(row, 2)?,
        miner_id: row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
        width: row.get(4)?,
        height: row.get(5)?,
        task_json: row.get(6)?,
        solution_json: row.get(7)?,
        prev_hash: row.get(8)?,
        difficulty: row.get(9)?,
        nonce: row.get::<_, Option<i64>>(10)?.map(|v| v as u64),
        hash: row.get(11)?,
    })
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get::<_, i64>(0)? as u64,
        name: row.get(1)?,
        school: row.get(2)?,
        group: row.get(3)?,
        joined_at: ts_column(row, 4)?,
    })
}

/// SQLite-backed `BlockStore`
///
/// One connection per store, serialized by a mutex; cross-process safety comes
/// from the conditional statements themselves.
pub struct SqliteBlockStore {
    conn: Mutex<Connection>,
}

impl SqliteBlockStore {
    /// Open (or create) a database file and apply the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("[sp-01] Opening block store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn fetch_block(conn: &Connection, id: i64) -> Result<Option<Block>> {
        let sql = format!("SELECT {} FROM blocks WHERE id = ?1", BLOCK_COLUMNS);
        Ok(conn.query_row(&sql, params![id], block_from_row).optional()?)
    }

    /// Every block in id order
    pub fn all_blocks(&self) -> Result<Vec<Block>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM blocks ORDER BY id ASC", BLOCK_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], block_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl BlockStore for SqliteBlockStore {
    fn open_block(&self) -> Result<Option<Block>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM blocks WHERE mined_at IS NULL ORDER BY id DESC LIMIT 1",
            BLOCK_COLUMNS
        );
        Ok(conn.query_row(&sql, [], block_from_row).optional()?)
    }

    fn block(&self, id: BlockId) -> Result<Option<Block>> {
        let conn = self.conn.lock();
        Self::fetch_block(&conn, to_sql_id(id)?)
    }

    fn recent_mined(&self, limit: usize) -> Result<Vec<MinedBlockInfo>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, created_at, mined_at, width FROM blocks \
             WHERE mined_at IS NOT NULL ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(MinedBlockInfo {
                id: row.get::<_, i64>(0)? as u64,
                created_at: ts_column(row, 1)?,
                mined_at: ts_column(row, 2)?,
                width: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn last_mined_hash(&self) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let hash: Option<Option<String>> = conn
            .query_row(
                "SELECT hash FROM blocks WHERE mined_at IS NOT NULL ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash.flatten())
    }

    fn insert_open_block(&self, draft: &NewBlock) -> Result<Option<Block>> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO blocks(created_at, width, height, task_json, solution_json, prev_hash, difficulty) \
             SELECT ?1, ?2, ?2, ?3, ?4, ?5, ?6 \
             WHERE NOT EXISTS (SELECT 1 FROM blocks WHERE mined_at IS NULL)",
            params![
                format_ts(&draft.created_at),
                draft.size,
                draft.task_json,
                draft.solution_json,
                draft.prev_hash,
                draft.difficulty,
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        Self::fetch_block(&conn, conn.last_insert_rowid())
    }

    fn rewrite_open_block(&self, id: BlockId, draft: &NewBlock) -> Result<Option<Block>> {
        let conn = self.conn.lock();
        let id = to_sql_id(id)?;
        let updated = conn.execute(
            "UPDATE blocks SET created_at = ?1, width = ?2, height = ?2, task_json = ?3, \
             solution_json = ?4, prev_hash = ?5, difficulty = ?6, \
             miner_id = NULL, nonce = NULL, hash = NULL \
             WHERE id = ?7 AND mined_at IS NULL",
            params![
                format_ts(&draft.created_at),
                draft.size,
                draft.task_json,
                draft.solution_json,
                draft.prev_hash,
                draft.difficulty,
                id,
            ],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        Self::fetch_block(&conn, id)
    }

    fn claim_block(&self, claim: &MiningClaim) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE blocks SET mined_at = ?1, miner_id = ?2, nonce = ?3, hash = ?4 \
             WHERE id = ?5 AND mined_at IS NULL",
            params![
                format_ts(&claim.mined_at),
                to_sql_id(claim.miner_id)?,
                to_sql_id(claim.nonce)?,
                claim.hash,
                to_sql_id(claim.block_id)?,
            ],
        )?;
        Ok(updated == 1)
    }

    fn upsert_participant(&self, registration: &Registration) -> Result<Participant> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO participants(name, school, grp, joined_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name, school) DO UPDATE SET grp = excluded.grp",
            params![
                registration.name,
                registration.school,
                registration.group,
                format_ts(&registration.joined_at),
            ],
        )?;
        let participant = conn.query_row(
            "SELECT id, name, school, grp, joined_at FROM participants \
             WHERE name = ?1 AND school = ?2",
            params![registration.name, registration.school],
            participant_from_row,
        )?;
        Ok(participant)
    }

    fn participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT id, name, school, grp, joined_at FROM participants WHERE id = ?1",
                params![to_sql_id(id)?],
                participant_from_row,
            )
            .optional()?)
    }

    fn list_participants(&self, query: &ParticipantQuery) -> Result<ParticipantPage> {
        let conn = self.conn.lock();
        let pattern = query.q.as_deref().map(like_pattern);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM participants WHERE {}", PARTICIPANT_FILTER),
            params![pattern, query.school],
            |row| row.get(0),
        )?;

        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT id, name, school, grp, joined_at FROM participants WHERE {} \
             ORDER BY joined_at {dir}, id {dir} LIMIT ?3 OFFSET ?4",
            PARTICIPANT_FILTER,
            dir = direction
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                pattern,
                query.school,
                query.limit as i64,
                query.offset as i64
            ],
            participant_from_row,
        )?;

        Ok(ParticipantPage {
            items: rows.collect::<rusqlite::Result<Vec<_>>>()?,
            total: total as u64,
            limit: query.limit,
            offset: query.offset,
        })
    }

    fn list_blocks(&self, limit: usize) -> Result<Vec<BlockSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT * FROM ( \
               SELECT b.id, b.created_at, b.mined_at, p.name, p.school, \
                      b.difficulty, b.nonce, b.hash, b.prev_hash \
               FROM blocks b LEFT JOIN participants p ON p.id = b.miner_id \
               ORDER BY b.id DESC LIMIT ?1 \
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(BlockSummary {
                id: row.get::<_, i64>(0)? as u64,
                created_at: ts_column(row, 1)?,
                mined_at: opt_ts_column(row, 2)?,
                miner_name: row.get(3)?,
                miner_school: row.get(4)?,
                difficulty: row.get(5)?,
                nonce: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
                hash: row.get(7)?,
                prev_hash: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT p.name, p.school, COUNT(b.id) AS wins \
             FROM blocks b JOIN participants p ON p.id = b.miner_id \
             WHERE b.mined_at IS NOT NULL \
             GROUP BY p.id ORDER BY wins DESC, MIN(b.mined_at) ASC, p.id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LeaderboardEntry {
                name: row.get(0)?,
                school: row.get(1)?,
                wins: row.get::<_, i64>(2)? as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
