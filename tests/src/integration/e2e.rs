//! # End-to-End Mining Flow
//!
//! Empty store → block #1 linked to genesis → correct submission accepted
//! with the required zero prefix → block #2 linked to block #1's hash.
//! Runs identically over the in-memory and SQLite stores.

#[cfg(test)]
mod tests {
    use super::super::{answer_for, fixed_clock, service_over};
    use chrono::Duration;
    use sp_01_block_mining::domain::invariants::{check_block, check_chain_links, check_single_open};
    use sp_01_block_mining::domain::{ChainConfig, ChainLinker};
    use sp_01_block_mining::utils::meets_zero_prefix;
    use sp_01_block_mining::{
        BlockStore, InMemoryBlockStore, MiningPoolApi, RejectReason, SqliteBlockStore,
        Submission, SubmissionOutcome, GENESIS_HASH,
    };
    use std::sync::Arc;

    fn run_flow(store: Arc<dyn BlockStore>) {
        let clock = fixed_clock();
        let service = service_over(store.clone(), clock.clone());
        let linker = ChainLinker::new(ChainConfig::default());

        assert!(store.open_block().unwrap().is_none());
        let alice = service.join("Alice", "North High", Some("7A")).unwrap();

        // Block #1 links to genesis
        let view = service.current_block().unwrap();
        assert_eq!(view.id, 1);
        let block1 = store.block(1).unwrap().unwrap();
        assert_eq!(block1.prev_hash, GENESIS_HASH);
        assert_eq!(block1.difficulty, linker.difficulty_for(block1.width));

        // Correct submission mines it
        clock.advance(Duration::seconds(95));
        let outcome = service
            .submit(&Submission::for_open_block(alice.id, answer_for(&block1)))
            .unwrap();
        let SubmissionOutcome::Accepted(receipt) = &outcome else {
            panic!("expected acceptance, got {:?}", outcome);
        };
        assert_eq!(receipt.block_id, 1);
        assert!(meets_zero_prefix(&receipt.pow.hash, block1.difficulty));

        let response = serde_json::to_value(outcome.to_response()).unwrap();
        assert_eq!(response["ok"], true);
        assert_eq!(response["winner"]["name"], "Alice");
        assert_eq!(response["pow"]["hash"], receipt.pow.hash.as_str());
        assert!(response.get("reason").is_none());

        // Block #2 links to block #1
        let sealed = store.block(1).unwrap().unwrap();
        check_block(&sealed).unwrap();
        let block2 = store.open_block().unwrap().unwrap();
        assert_eq!(block2.id, 2);
        assert_eq!(block2.prev_hash, sealed.hash.clone().unwrap());

        // Late answer for #1 observes the seal
        let bob = service.join("Bob", "River Academy", None).unwrap();
        let late = service
            .submit(&Submission::for_block(bob.id, 1, answer_for(&block1)))
            .unwrap();
        assert_eq!(late.reason(), Some(RejectReason::AlreadyMined));
        let response = serde_json::to_value(late.to_response()).unwrap();
        assert_eq!(response["ok"], false);
        assert_eq!(response["reason"], "already mined");

        // Bob takes #2
        clock.advance(Duration::seconds(40));
        assert!(service
            .submit(&Submission::for_open_block(bob.id, answer_for(&block2)))
            .unwrap()
            .is_accepted());

        let listing = service.blocks(10).unwrap();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing[0].miner_name.as_deref(), Some("Alice"));
        assert_eq!(listing[1].miner_school.as_deref(), Some("River Academy"));
        let listing_json = serde_json::to_value(&listing).unwrap();
        assert!(listing_json[0].get("task_json").is_none());

        let board = service.leaderboard().unwrap();
        let names: Vec<_> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);

        let snapshot = service.metrics().snapshot();
        assert_eq!(snapshot.submissions_accepted, 2);
        assert_eq!(snapshot.blocks_opened, 3);
    }

    #[test]
    fn test_flow_in_memory() {
        let store = Arc::new(InMemoryBlockStore::new());
        run_flow(store.clone());

        let blocks = store.all_blocks();
        check_single_open(&blocks).unwrap();
        check_chain_links(&blocks).unwrap();
    }

    #[test]
    fn test_flow_sqlite() {
        let store = Arc::new(SqliteBlockStore::open_in_memory().unwrap());
        run_flow(store.clone());

        let blocks = store.all_blocks().unwrap();
        check_single_open(&blocks).unwrap();
        check_chain_links(&blocks).unwrap();
    }

    #[test]
    fn test_dda_walks_size_up_and_down() {
        let store = Arc::new(InMemoryBlockStore::new());
        let clock = fixed_clock();
        let service = service_over(store.clone(), clock.clone());
        let solver = service.join("Quick", "Hillside", None).unwrap();

        let mut widths = Vec::new();
        for secs in [20, 20, 20, 400, 400, 400, 400, 400] {
            let block = service.ensure_open_block(false).unwrap();
            widths.push(block.width);
            clock.advance(Duration::seconds(secs));
            assert!(service
                .submit(&Submission::for_open_block(solver.id, answer_for(&block)))
                .unwrap()
                .is_accepted());
        }
        widths.push(service.ensure_open_block(false).unwrap().width);

        // Fast solves grow one step per block; slow ones pull back once the
        // smoothed time crosses the slow threshold
        assert_eq!(&widths[..4], &[5, 6, 7, 8]);
        assert!(widths.windows(2).all(|w| w[0].abs_diff(w[1]) <= 1));
        assert!(widths.last().unwrap() < &8);

        let blocks = store.all_blocks();
        check_chain_links(&blocks).unwrap();
        for block in &blocks {
            check_block(block).unwrap();
        }
    }
}
