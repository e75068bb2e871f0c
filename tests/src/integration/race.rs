//! # Concurrent Claim Race
//!
//! Many solvers hold a correct answer for the same block and submit at the
//! same instant. Exactly one claim may succeed; every other solver must see
//! "already mined", and the pool must end with exactly one open block.

#[cfg(test)]
mod tests {
    use super::super::{answer_for, fixed_clock, service_over};
    use chrono::{TimeZone, Utc};
    use sp_01_block_mining::domain::invariants::{check_block, check_chain_links, check_single_open};
    use sp_01_block_mining::{
        Block, BlockStore, InMemoryBlockStore, MiningPoolApi, MiningPoolService, RejectReason,
        SchulteTask, SqliteBlockStore, Submission, SubmissionOutcome, GENESIS_HASH,
    };
    use std::sync::{Arc, Barrier};
    use std::thread;

    const RACERS: usize = 8;

    fn race(service: &MiningPoolService, block: &Block) -> Vec<SubmissionOutcome> {
        let solvers: Vec<_> = (0..RACERS)
            .map(|i| {
                service
                    .join(&format!("racer-{i}"), "Track", None)
                    .unwrap()
            })
            .collect();
        let positions = answer_for(block);
        let barrier = Barrier::new(RACERS);

        thread::scope(|scope| {
            let handles: Vec<_> = solvers
                .iter()
                .map(|solver| {
                    let submission = Submission::for_block(solver.id, block.id, positions.clone());
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        service.submit(&submission).unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        })
    }

    fn assert_single_winner(outcomes: &[SubmissionOutcome]) {
        let winners = outcomes.iter().filter(|o| o.is_accepted()).count();
        assert_eq!(winners, 1, "outcomes: {:?}", outcomes);
        assert!(outcomes
            .iter()
            .filter(|o| !o.is_accepted())
            .all(|o| o.reason() == Some(RejectReason::AlreadyMined)));
    }

    #[test]
    fn test_race_in_memory() {
        let store = Arc::new(InMemoryBlockStore::new());
        let service = service_over(store.clone(), fixed_clock());
        let block = service.ensure_open_block(false).unwrap();

        let outcomes = race(&service, &block);
        assert_single_winner(&outcomes);

        let sealed = store.block(block.id).unwrap().unwrap();
        let SubmissionOutcome::Accepted(receipt) =
            outcomes.iter().find(|o| o.is_accepted()).unwrap()
        else {
            unreachable!();
        };
        assert_eq!(sealed.hash.as_deref(), Some(receipt.pow.hash.as_str()));

        let blocks = store.all_blocks();
        check_single_open(&blocks).unwrap();
        check_chain_links(&blocks).unwrap();
        assert_eq!(blocks.len(), 2);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.submissions_accepted, 1);
        assert_eq!(snapshot.submissions_rejected, (RACERS - 1) as u64);
    }

    #[test]
    fn test_race_sqlite_shared_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");

        // Two independent services, two connections, one database
        let store_a: Arc<dyn BlockStore> = Arc::new(SqliteBlockStore::open(&path).unwrap());
        let store_b: Arc<dyn BlockStore> = Arc::new(SqliteBlockStore::open(&path).unwrap());
        let service_a = service_over(store_a, fixed_clock());
        let service_b = service_over(store_b, fixed_clock());

        let block = service_a.ensure_open_block(false).unwrap();
        assert_eq!(service_b.ensure_open_block(false).unwrap().id, block.id);

        let alice = service_a.join("alice", "A", None).unwrap();
        let bob = service_b.join("bob", "B", None).unwrap();
        let positions = answer_for(&block);
        let barrier = Barrier::new(2);

        let (a, b) = thread::scope(|scope| {
            let ha = scope.spawn(|| {
                barrier.wait();
                service_a
                    .submit(&Submission::for_block(alice.id, block.id, positions.clone()))
                    .unwrap()
            });
            let hb = scope.spawn(|| {
                barrier.wait();
                service_b
                    .submit(&Submission::for_block(bob.id, block.id, positions.clone()))
                    .unwrap()
            });
            (ha.join().unwrap(), hb.join().unwrap())
        });
        assert_single_winner(&[a, b]);

        let check = SqliteBlockStore::open(&path).unwrap();
        let blocks = check.all_blocks().unwrap();
        check_single_open(&blocks).unwrap();
        check_chain_links(&blocks).unwrap();
    }

    #[test]
    fn test_concurrent_ensure_open_block_creates_one() {
        let store = Arc::new(InMemoryBlockStore::new());
        let service = service_over(store.clone(), fixed_clock());
        let barrier = Barrier::new(RACERS);

        let ids: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..RACERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        service.ensure_open_block(false).unwrap().id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(store.all_blocks().len(), 1);
    }

    #[test]
    fn test_concurrent_repair_keeps_one_block() {
        let store = Arc::new(InMemoryBlockStore::new());
        store.seed_block(Block {
            id: 1,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            mined_at: None,
            miner_id: None,
            width: 5,
            height: 5,
            task_json: r#"{"type":"maze","size":5}"#.into(),
            solution_json: "{}".into(),
            prev_hash: GENESIS_HASH.into(),
            difficulty: 5,
            nonce: None,
            hash: None,
        });
        let service = service_over(store.clone(), fixed_clock());
        let barrier = Barrier::new(RACERS);

        let ids: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..RACERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        service.ensure_open_block(false).unwrap().id
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.iter().all(|id| *id == 1));
        let blocks = store.all_blocks();
        assert_eq!(blocks.len(), 1);
        check_single_open(&blocks).unwrap();
        check_block(&blocks[0]).unwrap();
        assert!(SchulteTask::parse(&blocks[0].task_json).is_ok());
        assert!(service.metrics().snapshot().blocks_rewritten >= 1);
    }
}
