//! In-memory block store for unit tests and single-process pools.
//!
//! All conditional writes run under one mutex, which gives them the same
//! check-and-set behavior the SQLite adapter gets from `WHERE mined_at IS NULL`.

use crate::domain::{
    Block, BlockId, BlockSummary, LeaderboardEntry, MinedBlockInfo, MiningClaim, NewBlock,
    Participant, ParticipantId, ParticipantPage, ParticipantQuery, Registration, SortOrder,
};
use crate::error::Result;
use crate::ports::BlockStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Tables {
    blocks: Vec<Block>,
    participants: Vec<Participant>,
}

impl Tables {
    fn open_index(&self) -> Option<usize> {
        self.blocks.iter().rposition(Block::is_open)
    }

    fn next_block_id(&self) -> BlockId {
        self.blocks.last().map_or(1, |b| b.id + 1)
    }

    fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }
}

fn open_from_draft(id: BlockId, draft: &NewBlock) -> Block {
    Block {
        id,
        created_at: draft.created_at,
        mined_at: None,
        miner_id: None,
        width: draft.size,
        height: draft.size,
        task_json: draft.task_json.clone(),
        solution_json: draft.solution_json.clone(),
        prev_hash: draft.prev_hash.clone(),
        difficulty: draft.difficulty,
        nonce: None,
        hash: None,
    }
}

/// In-memory `BlockStore`
///
/// Block ids are assigned in insertion order starting at 1, and are never
/// reused.
#[derive(Default)]
pub struct InMemoryBlockStore {
    tables: Mutex<Tables>,
}

impl InMemoryBlockStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every block in id order
    pub fn all_blocks(&self) -> Vec<Block> {
        self.tables.lock().blocks.clone()
    }

    /// Place a block as-is, bypassing the conditional writes
    ///
    /// Used to seed inconsistent states (e.g. a malformed open block).
    pub fn seed_block(&self, block: Block) {
        let mut tables = self.tables.lock();
        tables.blocks.push(block);
        tables.blocks.sort_by_key(|b| b.id);
    }
}

impl BlockStore for InMemoryBlockStore {
    fn open_block(&self) -> Result<Option<Block>> {
        let tables = self.tables.lock();
        Ok(tables.open_index().map(|i| tables.blocks[i].clone()))
    }

    fn block(&self, id: BlockId) -> Result<Option<Block>> {
        Ok(self
            .tables
            .lock()
            .blocks
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    fn recent_mined(&self, limit: usize) -> Result<Vec<MinedBlockInfo>> {
        let tables = self.tables.lock();
        Ok(tables
            .blocks
            .iter()
            .rev()
            .filter_map(|b| {
                b.mined_at.map(|mined_at| MinedBlockInfo {
                    id: b.id,
                    created_at: b.created_at,
                    mined_at,
                    width: b.width,
                })
            })
            .take(limit)
            .collect())
    }

    fn last_mined_hash(&self) -> Result<Option<String>> {
        let tables = self.tables.lock();
        Ok(tables
            .blocks
            .iter()
            .rev()
            .find(|b| b.mined_at.is_some())
            .and_then(|b| b.hash.clone()))
    }

    fn insert_open_block(&self, draft: &NewBlock) -> Result<Option<Block>> {
        let mut tables = self.tables.lock();
        if tables.open_index().is_some() {
            return Ok(None);
        }
        let block = open_from_draft(tables.next_block_id(), draft);
        tables.blocks.push(block.clone());
        Ok(Some(block))
    }

    fn rewrite_open_block(&self, id: BlockId, draft: &NewBlock) -> Result<Option<Block>> {
        let mut tables = self.tables.lock();
        let Some(slot) = tables.blocks.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if !slot.is_open() {
            return Ok(None);
        }
        *slot = open_from_draft(id, draft);
        Ok(Some(slot.clone()))
    }

    fn claim_block(&self, claim: &MiningClaim) -> Result<bool> {
        let mut tables = self.tables.lock();
        let Some(block) = tables.blocks.iter_mut().find(|b| b.id == claim.block_id) else {
            return Ok(false);
        };
        if !block.is_open() {
            return Ok(false);
        }
        block.mined_at = Some(claim.mined_at);
        block.miner_id = Some(claim.miner_id);
        block.nonce = Some(claim.nonce);
        block.hash = Some(claim.hash.clone());
        Ok(true)
    }

    fn upsert_participant(&self, registration: &Registration) -> Result<Participant> {
        let mut tables = self.tables.lock();
        if let Some(existing) = tables
            .participants
            .iter_mut()
            .find(|p| p.name == registration.name && p.school == registration.school)
        {
            existing.group = registration.group.clone();
            return Ok(existing.clone());
        }
        let id = tables.participants.last().map_or(1, |p| p.id + 1);
        let participant = Participant {
            id,
            name: registration.name.clone(),
            school: registration.school.clone(),
            group: registration.group.clone(),
            joined_at: registration.joined_at,
        };
        tables.participants.push(participant.clone());
        Ok(participant)
    }

    fn participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        Ok(self.tables.lock().participant(id).cloned())
    }

    fn list_participants(&self, query: &ParticipantQuery) -> Result<ParticipantPage> {
        let tables = self.tables.lock();
        // ASCII case folding, as SQLite's LIKE does
        let needle = query.q.as_deref().map(str::to_ascii_lowercase);
        let mut matches: Vec<&Participant> = tables
            .participants
            .iter()
            .filter(|p| query.school.as_deref().map_or(true, |school| p.school == school))
            .filter(|p| {
                needle.as_deref().map_or(true, |needle| {
                    [Some(p.name.as_str()), Some(p.school.as_str()), p.group.as_deref()]
                        .into_iter()
                        .flatten()
                        .any(|field| field.to_ascii_lowercase().contains(needle))
                })
            })
            .collect();
        matches.sort_by_key(|p| (p.joined_at, p.id));
        if query.order == SortOrder::Desc {
            matches.reverse();
        }

        Ok(ParticipantPage {
            total: matches.len() as u64,
            items: matches
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .cloned()
                .collect(),
            limit: query.limit,
            offset: query.offset,
        })
    }

    fn list_blocks(&self, limit: usize) -> Result<Vec<BlockSummary>> {
        let tables = self.tables.lock();
        let skip = tables.blocks.len().saturating_sub(limit);
        Ok(tables
            .blocks
            .iter()
            .skip(skip)
            .map(|b| {
                let miner = b.miner_id.and_then(|id| tables.participant(id));
                BlockSummary {
                    id: b.id,
                    created_at: b.created_at,
                    mined_at: b.mined_at,
                    miner_name: miner.map(|p| p.name.clone()),
                    miner_school: miner.map(|p| p.school.clone()),
                    difficulty: b.difficulty,
                    nonce: b.nonce,
                    hash: b.hash.clone(),
                    prev_hash: b.prev_hash.clone(),
                }
            })
            .collect())
    }

    fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let tables = self.tables.lock();
        // miner -> (wins, first win)
        let mut tally: HashMap<ParticipantId, (u64, DateTime<Utc>)> = HashMap::new();
        for block in &tables.blocks {
            if let (Some(miner), Some(mined_at)) = (block.miner_id, block.mined_at) {
                let entry = tally.entry(miner).or_insert((0, mined_at));
                entry.0 += 1;
                entry.1 = entry.1.min(mined_at);
            }
        }
        let mut rows: Vec<_> = tally
            .into_iter()
            .filter_map(|(id, (wins, first))| {
                tables.participant(id).map(|p| (p, wins, first))
            })
            .collect();
        rows.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.2.cmp(&b.2))
                .then(a.0.id.cmp(&b.0.id))
        });
        Ok(rows
            .into_iter()
            .map(|(p, wins, _)| LeaderboardEntry {
                name: p.name.clone(),
                school: p.school.clone(),
                wins,
            })
            .collect())
    }
}
