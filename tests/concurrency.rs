#![cfg(feature = "sync")]

mod test {
    use std::sync::Arc;
    use std::thread;
    use stride_match::{Algorithm, Family, Index, SyncIndex};

    #[test]
    fn concurrent_readers_see_a_consistent_snapshot() {
        let mut idx = Index::create(Family::V4, Algorithm::Trie8).unwrap();
        idx.insert(&[10, 0, 0, 0], 8, 100).unwrap();
        idx.insert(&[10, 1, 2, 0], 24, 200).unwrap();
        let shared = Arc::new(SyncIndex::new(idx));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    let hop = shared.read(|idx| idx.lookup_single(&[10, 1, 2, 3]));
                    assert!(hop == 200);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn writer_mutation_is_visible_to_later_readers() {
        let idx = Index::create(Family::V4, Algorithm::Trie8).unwrap();
        let shared = SyncIndex::new(idx);

        shared.write(|idx| idx.insert(&[10, 0, 0, 0], 8, 1).unwrap());
        assert_eq!(shared.read(|idx| idx.lookup_single(&[10, 1, 1, 1])), 1);

        shared.write(|idx| idx.insert(&[10, 1, 0, 0], 16, 2).unwrap());
        assert_eq!(shared.read(|idx| idx.lookup_single(&[10, 1, 1, 1])), 2);
    }
}
