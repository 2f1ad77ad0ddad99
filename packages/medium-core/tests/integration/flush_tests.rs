//! Flush execution against memory media.

use medium_core::{MediumConfig, MediumError};
use ntest::timeout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::helpers::{memory_store, pattern, counting_store, small_config, CountingAccessor};

#[timeout(1000)]
#[test]
fn test_insert_round_trip() {
    let mut store = memory_store(pattern(20), small_config());
    let offset = store.create_offset(10).unwrap();
    store.insert_data(offset, b"XY".to_vec()).unwrap();

    let flushed = store.flush().unwrap();

    assert_eq!(flushed.len(), 1);
    assert!(!flushed[0].is_pending());
    let mut expected = pattern(20)[..10].to_vec();
    expected.extend_from_slice(b"XY");
    expected.extend_from_slice(&pattern(20)[10..]);
    assert_eq!(store.accessor().bytes(), expected.as_slice());
    assert_eq!(store.medium_length().unwrap(), 22);
    assert!(store.pending_actions().is_empty());
}

#[timeout(1000)]
#[test]
fn test_mixed_edits_flush() {
    let mut store = memory_store(pattern(100), small_config());
    store
        .remove_data(store.create_offset(10).unwrap(), 20)
        .unwrap();
    store
        .replace_data(store.create_offset(50).unwrap(), 5, vec![0xEE; 17])
        .unwrap();
    store
        .insert_data(store.create_offset(90).unwrap(), vec![0xAB; 3])
        .unwrap();

    store.flush().unwrap();

    let original = pattern(100);
    let mut expected = original[..10].to_vec();
    expected.extend_from_slice(&original[30..50]);
    expected.extend_from_slice(&[0xEE; 17]);
    expected.extend_from_slice(&original[55..90]);
    expected.extend_from_slice(&[0xAB; 3]);
    expected.extend_from_slice(&original[90..]);
    assert_eq!(store.accessor().bytes(), expected.as_slice());
}

#[timeout(1000)]
#[test]
fn test_shrinking_flush_truncates() {
    let mut store = memory_store(pattern(40), small_config());
    store.remove_data(store.create_offset(0).unwrap(), 15).unwrap();

    store.flush().unwrap();

    assert_eq!(store.accessor().bytes(), &pattern(40)[15..]);
    assert_eq!(store.medium_length().unwrap(), 25);
}

#[timeout(1000)]
#[test]
fn test_inserts_into_empty_medium_flush() {
    let mut store = memory_store(Vec::new(), small_config());
    let start = store.create_offset(0).unwrap();
    store.insert_data(start, b"ID3".to_vec()).unwrap();
    store.insert_data(start, pattern(20)).unwrap();

    let flushed = store.flush().unwrap();

    assert_eq!(flushed.len(), 2);
    let mut expected = b"ID3".to_vec();
    expected.extend_from_slice(&pattern(20));
    assert_eq!(store.accessor().bytes(), expected.as_slice());
    assert_eq!(store.medium_length().unwrap(), 23);
    assert!(store.pending_actions().is_empty());
    assert_eq!(store.get_data(start, 23).unwrap(), expected);
}

#[timeout(1000)]
#[test]
fn test_flushed_edits_are_not_applied_again() {
    let mut store = memory_store(pattern(30), small_config());
    store
        .insert_data(store.create_offset(5).unwrap(), b"abc".to_vec())
        .unwrap();
    store.remove_data(store.create_offset(20).unwrap(), 4).unwrap();

    assert_eq!(store.flush().unwrap().len(), 2);
    let once = store.accessor().bytes().to_vec();

    assert!(store.pending_actions().is_empty());
    assert!(store.flush().unwrap().is_empty());
    assert_eq!(store.accessor().bytes(), once.as_slice());
}

#[timeout(1000)]
#[test]
fn test_flush_refreshes_cached_data() {
    let mut store = memory_store(pattern(60), small_config());
    let start = store.create_offset(0).unwrap();
    assert_eq!(store.get_data(start, 60).unwrap(), pattern(60));

    store
        .insert_data(store.create_offset(20).unwrap(), b"inserted".to_vec())
        .unwrap();
    store.remove_data(store.create_offset(40).unwrap(), 10).unwrap();
    store.flush().unwrap();

    let length = store.medium_length().unwrap();
    assert_eq!(length, 58);
    let data = store.get_data(start, length).unwrap();
    assert_eq!(data, store.accessor().bytes().to_vec());
    assert_eq!(&data[20..28], b"inserted");

    // Bytes before the first edit stay cached, payloads are cached at their new place.
    assert!(store.get_cached_byte_count_at(start).unwrap() >= 20);
}

#[timeout(1000)]
#[test]
fn test_failed_flush_keeps_edits_and_drops_cache() {
    let mut store = counting_store(CountingAccessor::new(pattern(40)).failing_after(1), small_config());
    let start = store.create_offset(0).unwrap();
    store.cache(start, 40).unwrap();
    store
        .insert_data(store.create_offset(5).unwrap(), b"abc".to_vec())
        .unwrap();

    let error = store.flush().unwrap_err();

    assert!(matches!(error, MediumError::MediumAccessFailure(_)));
    assert_eq!(store.pending_actions().len(), 1);
    assert_eq!(store.get_cached_byte_count_at(start).unwrap(), 0);
}

#[timeout(1000)]
#[test]
fn test_block_size_bounds_every_write() {
    let config = MediumConfig {
        max_read_write_block_size: 3,
        ..small_config()
    };
    let accessor = CountingAccessor::new(pattern(30)).failing_after(usize::MAX);
    let mut store = counting_store(accessor, config);
    store
        .insert_data(store.create_offset(0).unwrap(), vec![7; 10])
        .unwrap();

    store.flush().unwrap();

    // 30 moved bytes and 10 payload bytes, three bytes per write at most.
    let writes = usize::MAX - store.accessor().writes_before_failure.unwrap();
    assert_eq!(writes, 10 + 4);
    let mut expected = vec![7; 10];
    expected.extend_from_slice(&pattern(30));
    assert_eq!(store.accessor().inner.bytes(), expected.as_slice());
}

#[timeout(5000)]
#[test]
fn test_random_edit_sequences_match_model() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut model = pattern(300);
    let mut store = memory_store(model.clone(), small_config());

    for _ in 0..150 {
        let length = model.len();
        let start = rng.gen_range(0..length);

        if rng.gen_bool(0.3) {
            let read_size = rng.gen_range(1..=length - start) as u64;
            let offset = store.create_offset(start as u64).unwrap();
            assert_eq!(
                store.get_data(offset, read_size).unwrap(),
                model[start..start + read_size as usize].to_vec()
            );
        }

        let offset = store.create_offset(start as u64).unwrap();
        let payload: Vec<u8> = (0..rng.gen_range(1..24)).map(|_| rng.gen()).collect();
        match rng.gen_range(0..3) {
            0 => {
                store.insert_data(offset, payload.clone()).unwrap();
                model.splice(start..start, payload);
            }
            1 if length > 1 => {
                let size = rng.gen_range(1..=(length - start).min(length - 1));
                store.remove_data(offset, size as u64).unwrap();
                model.drain(start..start + size);
            }
            _ => {
                let size = rng.gen_range(1..=length - start);
                store.replace_data(offset, size as u64, payload.clone()).unwrap();
                model.splice(start..start + size, payload);
            }
        }

        store.flush().unwrap();
        assert_eq!(store.accessor().bytes(), model.as_slice());
    }

    let length = store.medium_length().unwrap();
    let start = store.create_offset(0).unwrap();
    assert_eq!(store.get_data(start, length).unwrap(), model);
}
