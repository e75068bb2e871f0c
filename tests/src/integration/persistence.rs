//! # SQLite Persistence
//!
//! The chain, participants and the open block survive closing and reopening
//! the database file, and a restarted service resumes where the previous one
//! stopped: same open block, same difficulty history, same links.

#[cfg(test)]
mod tests {
    use super::super::{answer_for, fixed_clock, service_over};
    use chrono::Duration;
    use sp_01_block_mining::domain::invariants::check_chain_links;
    use sp_01_block_mining::{
        Block, BlockStore, MiningPoolApi, RejectReason, SqliteBlockStore, Submission,
        GENESIS_HASH,
    };
    use std::path::Path;
    use std::sync::Arc;

    fn open(path: &Path) -> Arc<SqliteBlockStore> {
        Arc::new(SqliteBlockStore::open(path).unwrap())
    }

    #[test]
    fn test_restart_resumes_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");

        let (alice_id, open_before): (u64, Block) = {
            let store = open(&path);
            let clock = fixed_clock();
            let service = service_over(store.clone(), clock.clone());
            let alice = service.join("alice", "north", None).unwrap();

            for _ in 0..2 {
                let block = service.ensure_open_block(false).unwrap();
                clock.advance(Duration::seconds(30));
                assert!(service
                    .submit(&Submission::for_open_block(alice.id, answer_for(&block)))
                    .unwrap()
                    .is_accepted());
            }
            (alice.id, store.open_block().unwrap().unwrap())
        };

        let store = open(&path);
        let service = service_over(store.clone(), fixed_clock());

        // Same open block, nothing regenerated
        let resumed = service.ensure_open_block(false).unwrap();
        assert_eq!(resumed, open_before);
        assert_eq!(resumed.id, 3);
        assert_eq!(resumed.width, 7);

        // Participant identity survives; re-join keeps the id
        let alice = service.join("alice", "north", Some("7B")).unwrap();
        assert_eq!(alice.id, alice_id);

        assert!(service
            .submit(&Submission::for_open_block(alice.id, answer_for(&resumed)))
            .unwrap()
            .is_accepted());

        let blocks = store.all_blocks().unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].prev_hash, GENESIS_HASH);
        check_chain_links(&blocks).unwrap();
        assert_eq!(service.leaderboard().unwrap()[0].wins, 3);
    }

    #[test]
    fn test_malformed_open_block_repaired_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let store = open(&path);
        let service = service_over(store.clone(), fixed_clock());
        let block = service.ensure_open_block(false).unwrap();
        drop(service);
        drop(store);

        // Another writer leaves a foreign task in the open block
        {
            let conn = rusqlite_conn(&path);
            conn.execute(
                "UPDATE blocks SET task_json = '{\"type\":\"maze\"}' WHERE id = ?1",
                [block.id as i64],
            )
            .unwrap();
        }

        let store = open(&path);
        let service = service_over(store.clone(), fixed_clock());
        let solver = service.join("carol", "east", None).unwrap();

        let outcome = service
            .submit(&Submission::for_open_block(solver.id, answer_for(&block)))
            .unwrap();
        assert_eq!(outcome.reason(), Some(RejectReason::WrongPuzzleType));

        let repaired = service.ensure_open_block(false).unwrap();
        assert_eq!(repaired.id, block.id);
        assert!(service
            .submit(&Submission::for_open_block(solver.id, answer_for(&repaired)))
            .unwrap()
            .is_accepted());
        assert_eq!(service.metrics().snapshot().blocks_rewritten, 1);
    }

    fn rusqlite_conn(path: &Path) -> rusqlite::Connection {
        rusqlite::Connection::open(path).unwrap()
    }
}
