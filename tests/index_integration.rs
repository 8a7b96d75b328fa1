//! # Index Integration Tests
//!
//! End-to-end scenarios over real files: creation, header consistency,
//! splits, persistence across sessions, and ordered dumps. These drive the
//! public API the way the CLI does.

use ordex::{BTree, BlockFile, Node, BLOCK_SIZE};
use tempfile::tempdir;

fn dump(tree: &mut BTree) -> Vec<(i64, i64)> {
    let mut cursor = tree.cursor();
    let mut out = Vec::new();
    while let Some(entry) = cursor.next_entry().unwrap() {
        out.push(entry);
    }
    out
}

mod creation {
    use super::*;

    #[test]
    fn create_writes_consistent_header_and_root_leaf() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.ord");

        BTree::create(&path).unwrap().close().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw.len(), 2 * BLOCK_SIZE);
        assert_eq!(&raw[..8], b"ORDEXv01");

        let mut file = BlockFile::open(&path).unwrap();
        assert_eq!(file.root_block(), 1);
        assert_eq!(file.next_block(), 2);

        let root = Node::decode(&file.read_block(1).unwrap()).unwrap();
        assert_eq!(root.block_id(), 1);
        assert!(root.is_leaf());
        assert_eq!(root.num_keys(), 0);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.ord");

        BTree::create(&path).unwrap().close().unwrap();
        assert!(BTree::create(&path).is_err());
    }

    #[test]
    fn open_refuses_foreign_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foreign.bin");
        std::fs::write(&path, vec![7u8; 4 * BLOCK_SIZE]).unwrap();

        assert!(BTree::open(&path).is_err());
    }
}

mod insert_and_search {
    use super::*;

    #[test]
    fn twenty_five_ascending_keys_split_and_stay_searchable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("split.ord");

        let mut tree = BTree::create(&path).unwrap();
        for key in 1..=25i64 {
            tree.insert(key, key * 100).unwrap();
        }
        tree.close().unwrap();

        // 25 keys at MAX_KEYS = 19 forces at least one split: root plus
        // two leaves means at least four blocks including the header.
        let len = std::fs::metadata(&path).unwrap().len();
        assert!(len >= 4 * BLOCK_SIZE as u64, "file too small: {}", len);

        let mut tree = BTree::open(&path).unwrap();
        assert_eq!(tree.search(13).unwrap(), Some(1300));
        assert_eq!(tree.search(1).unwrap(), Some(100));
        assert_eq!(tree.search(25).unwrap(), Some(2500));
        assert_eq!(tree.search(0).unwrap(), None);
        assert_eq!(tree.search(26).unwrap(), None);

        let expected: Vec<(i64, i64)> = (1..=25).map(|k| (k, k * 100)).collect();
        assert_eq!(dump(&mut tree), expected);
    }

    #[test]
    fn negative_and_positive_keys_sort_correctly() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::create(dir.path().join("neg.ord")).unwrap();

        let keys = [0i64, -5, 17, i64::MIN, 3, -100, i64::MAX, 8, -1];
        for (i, key) in keys.iter().enumerate() {
            tree.insert(*key, i as i64).unwrap();
        }

        let dumped: Vec<i64> = dump(&mut tree).into_iter().map(|(k, _)| k).collect();
        let mut expected = keys.to_vec();
        expected.sort_unstable();
        assert_eq!(dumped, expected);

        assert_eq!(tree.search(i64::MIN).unwrap(), Some(3));
        assert_eq!(tree.search(i64::MAX).unwrap(), Some(6));
    }

    #[test]
    fn large_shuffled_workload_survives_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.ord");

        // 500 keys inserted in a deterministic shuffled order, split
        // across two sessions.
        let keys: Vec<i64> = (0..500).map(|i| (i * 211) % 500).collect();

        let mut tree = BTree::create(&path).unwrap();
        for key in &keys[..250] {
            tree.insert(*key, key * 2).unwrap();
        }
        tree.close().unwrap();

        let mut tree = BTree::open(&path).unwrap();
        for key in &keys[250..] {
            tree.insert(*key, key * 2).unwrap();
        }

        for key in [0i64, 13, 250, 499] {
            assert_eq!(tree.search(key).unwrap(), Some(key * 2));
        }
        assert_eq!(tree.search(500).unwrap(), None);

        let expected: Vec<(i64, i64)> = (0..500).map(|k| (k, k * 2)).collect();
        assert_eq!(dump(&mut tree), expected);
    }

    #[test]
    fn duplicate_keys_accumulate_across_splits() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::create(dir.path().join("dups.ord")).unwrap();

        // Enough duplicates to force splits made of a single key value.
        for i in 0..30i64 {
            tree.insert(42, i).unwrap();
        }
        tree.insert(41, -1).unwrap();
        tree.insert(43, -2).unwrap();

        let entries = dump(&mut tree);
        assert_eq!(entries.len(), 32);
        assert_eq!(entries.first(), Some(&(41, -1)));
        assert_eq!(entries.last(), Some(&(43, -2)));
        assert_eq!(entries.iter().filter(|(k, _)| *k == 42).count(), 30);

        // Keys come out non-decreasing even with heavy duplication.
        let keys: Vec<i64> = entries.iter().map(|(k, _)| *k).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    }
}

mod dump_order {
    use super::*;

    #[test]
    fn cursor_on_fresh_index_yields_nothing() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::create(dir.path().join("empty.ord")).unwrap();
        assert!(dump(&mut tree).is_empty());
    }

    #[test]
    fn cursor_visits_every_entry_of_a_three_level_tree() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::create(dir.path().join("deep.ord")).unwrap();

        for i in 0..2000i64 {
            let key = (i * 997) % 2000;
            tree.insert(key, !key).unwrap();
        }

        let entries = dump(&mut tree);
        assert_eq!(entries.len(), 2000);
        for (i, (key, value)) in entries.iter().enumerate() {
            assert_eq!(*key, i as i64);
            assert_eq!(*value, !key);
        }
    }
}
