//! Property-based tests for livemirror-incremental using proptest.

use livemirror_incremental::{ChangeRecord, MaterializedCollection, PendingChangeLog};
use proptest::prelude::*;

/// Turns raw (kind, a, b) triples into records that are valid against the
/// state they are applied to, applying each one to `source` as it goes.
fn drive(source: &mut Vec<u32>, ops: &[(u8, usize, usize)]) -> Vec<ChangeRecord<u32>> {
    let mut records = Vec::new();
    let mut next = 0u32;
    for &(kind, a, b) in ops {
        let len = source.len();
        let record = match kind % 3 {
            0 => {
                let index = a % (len + 1);
                next += 1;
                source.insert(index, next);
                ChangeRecord::add(index, next)
            }
            1 if len > 0 => {
                let (from, to) = (a % len, b % len);
                let item = source.remove(from);
                source.insert(to, item);
                ChangeRecord::moved(from, to)
            }
            2 if len > 0 => {
                let index = a % len;
                source.remove(index);
                ChangeRecord::remove(index)
            }
            _ => continue,
        };
        records.push(record);
    }
    records
}

proptest! {
    /// Replaying every record onto an empty collection reproduces the source.
    #[test]
    fn replay_reproduces_source(ops in prop::collection::vec((0u8..3, 0usize..64, 0usize..64), 0..200)) {
        let mut source = Vec::new();
        let records = drive(&mut source, &ops);

        let mut mirror = MaterializedCollection::new();
        prop_assert!(mirror.replay(&records).is_ok());
        prop_assert_eq!(mirror.as_slice(), source.as_slice());
    }

    /// Splitting the records into batches at arbitrary points does not change
    /// the outcome, as long as the batches are replayed in order.
    #[test]
    fn batched_replay_matches(
        ops in prop::collection::vec((0u8..3, 0usize..32, 0usize..32), 0..120),
        cuts in prop::collection::vec(any::<bool>(), 120)
    ) {
        let mut source = Vec::new();
        let records = drive(&mut source, &ops);

        let mut log = PendingChangeLog::new();
        let mut batches = Vec::new();
        for (i, record) in records.into_iter().enumerate() {
            log.push(record);
            if cuts[i % cuts.len()] {
                batches.push(log.take());
            }
        }
        batches.push(log.take());
        prop_assert!(log.is_empty());

        let mut mirror = MaterializedCollection::new();
        for batch in &batches {
            prop_assert!(mirror.replay(batch).is_ok());
        }
        prop_assert_eq!(mirror.to_vec(), source);
    }

    /// Draining emits one remove per item and empties any mirror.
    #[test]
    fn drain_descending_empties_mirror(items in prop::collection::vec(any::<u32>(), 0..100)) {
        let mut coll = MaterializedCollection::from_items(items.clone());
        let mut mirror = MaterializedCollection::from_items(items.clone());

        let records = coll.drain_descending();
        prop_assert_eq!(records.len(), items.len());
        prop_assert!(coll.is_empty());
        prop_assert!(mirror.replay(&records).is_ok());
        prop_assert!(mirror.is_empty());
    }
}
