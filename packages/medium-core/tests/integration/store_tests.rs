//! Reads, caching and edit validation through `MediumStore`.

use medium_core::{
    ActionKind, MediumConfig, MediumError, MediumId, MediumStore, MemoryAccessor, Offset,
};
use ntest::timeout;

use super::helpers::{memory_store, pattern, counting_store, small_config, CountingAccessor};

#[timeout(1000)]
#[test]
fn test_get_data_reads_and_caches() {
    let mut store = memory_store(pattern(100), small_config());
    let offset = store.create_offset(5).unwrap();

    let data = store.get_data(offset, 30).unwrap();

    assert_eq!(data, pattern(100)[5..35].to_vec());
    assert!(store.get_cached_byte_count_at(offset).unwrap() >= 30);
}

#[timeout(1000)]
#[test]
fn test_cached_data_is_not_read_again() {
    let mut store = counting_store(CountingAccessor::new(pattern(64)), small_config());
    let offset = store.create_offset(10).unwrap();

    store.cache(offset, 20).unwrap();
    let reads = store.accessor().reads;
    assert!(reads > 0);

    let inner = store.create_offset(12).unwrap();
    assert_eq!(store.get_data(inner, 15).unwrap(), pattern(64)[12..27].to_vec());
    assert_eq!(store.accessor().reads, reads);

    // Only the uncached tail is read.
    store.get_data(inner, 30).unwrap();
    assert!(store.accessor().reads > reads);
}

#[timeout(1000)]
#[test]
fn test_get_data_at_end_of_medium_returns_partial_bytes() {
    let mut store = memory_store(pattern(20), small_config());
    let offset = store.create_offset(15).unwrap();

    let error = store.get_data(offset, 10).unwrap_err();

    assert!(error.is_end_of_medium());
    assert_eq!(error.bytes_read(), Some(5));
    assert_eq!(error.partial_bytes(), Some(&pattern(20)[15..20]));
    assert_eq!(store.get_cached_byte_count_at(offset).unwrap(), 5);
}

#[timeout(1000)]
#[test]
fn test_partial_read_behind_cached_front() {
    let mut store = memory_store(pattern(40), small_config());
    store.cache(store.create_offset(0).unwrap(), 16).unwrap();

    let error = store
        .get_data(store.create_offset(10).unwrap(), 40)
        .unwrap_err();

    assert_eq!(error.partial_bytes(), Some(&pattern(40)[10..40]));
}

#[timeout(1000)]
#[test]
fn test_get_data_behind_end_reads_nothing() {
    let mut store = memory_store(pattern(20), small_config());
    let end = store.create_offset(20).unwrap();

    assert!(store.is_at_end_of_medium(end).unwrap());
    let error = store.get_data(end, 4).unwrap_err();
    assert_eq!(error.bytes_read(), Some(0));
    assert_eq!(error.partial_bytes(), Some(&[][..]));
}

#[timeout(1000)]
#[test]
fn test_caching_disabled_reads_through() {
    let config = MediumConfig {
        caching_enabled: false,
        ..small_config()
    };
    let mut store = memory_store(pattern(50), config);
    let offset = store.create_offset(3).unwrap();

    store.cache(offset, 10).unwrap();
    assert_eq!(store.get_cached_byte_count_at(offset).unwrap(), 0);

    assert_eq!(store.get_data(offset, 40).unwrap(), pattern(50)[3..43].to_vec());
    assert_eq!(store.get_cached_byte_count_at(offset).unwrap(), 0);

    let error = store.get_data(offset, 50).unwrap_err();
    assert_eq!(error.partial_bytes(), Some(&pattern(50)[3..]));
}

#[timeout(1000)]
#[test]
fn test_create_offset_bounds() {
    let store = memory_store(pattern(10), small_config());

    assert_eq!(store.create_offset(10).unwrap().absolute(), 10);
    assert!(matches!(
        store.create_offset(11),
        Err(MediumError::InvalidRange { .. })
    ));
    assert!(!store.is_at_end_of_medium(store.create_offset(9).unwrap()).unwrap());
}

#[timeout(1000)]
#[test]
fn test_closed_store_rejects_operations() {
    let mut store = MediumStore::new(MemoryAccessor::new(pattern(10)), small_config()).unwrap();
    let offset = Offset::new(store.medium(), 0);

    assert!(!store.is_open());
    assert_eq!(store.create_offset(0), Err(MediumError::MediumClosed));
    assert_eq!(store.get_data(offset, 1), Err(MediumError::MediumClosed));
    assert!(matches!(
        store.insert_data(offset, vec![1]),
        Err(MediumError::MediumClosed)
    ));
    assert_eq!(store.close(), Err(MediumError::MediumClosed));

    store.open().unwrap();
    store.close().unwrap();
    assert_eq!(store.close(), Err(MediumError::MediumClosed));
}

#[timeout(1000)]
#[test]
fn test_close_drops_cache_and_pending_edits() {
    let mut store = memory_store(pattern(30), small_config());
    let offset = store.create_offset(0).unwrap();
    store.cache(offset, 30).unwrap();
    store.insert_data(offset, b"new".to_vec()).unwrap();

    store.close().unwrap();
    store.open().unwrap();

    assert!(store.pending_actions().is_empty());
    assert_eq!(store.get_cached_byte_count_at(offset).unwrap(), 0);
    assert!(store.flush().unwrap().is_empty());
    assert_eq!(store.accessor().bytes(), pattern(30).as_slice());
}

#[timeout(1000)]
#[test]
fn test_read_only_medium_rejects_edits() {
    let mut store =
        MediumStore::new(MemoryAccessor::read_only(pattern(10)), small_config()).unwrap();
    store.open().unwrap();
    let offset = store.create_offset(2).unwrap();

    assert!(matches!(
        store.insert_data(offset, vec![1]),
        Err(MediumError::ReadOnlyMedium(_))
    ));
    assert!(matches!(
        store.remove_data(offset, 1),
        Err(MediumError::ReadOnlyMedium(_))
    ));
    assert!(matches!(
        store.replace_data(offset, 1, vec![2]),
        Err(MediumError::ReadOnlyMedium(_))
    ));
    assert_eq!(store.get_data(offset, 3).unwrap(), pattern(10)[2..5].to_vec());
    assert!(store.flush().unwrap().is_empty());
}

#[timeout(1000)]
#[test]
fn test_edits_validated_against_medium_length() {
    let mut store = memory_store(pattern(10), small_config());
    let offset = store.create_offset(8).unwrap();

    assert!(matches!(
        store.remove_data(offset, 3),
        Err(MediumError::InvalidRange { .. })
    ));
    assert!(matches!(
        store.replace_data(offset, 0, vec![1]),
        Err(MediumError::InvalidRange { .. })
    ));
    assert!(store.remove_data(offset, 2).is_ok());

    let end = store.create_offset(10).unwrap();
    assert!(store.insert_data(end, b"tail".to_vec()).is_ok());
    assert_eq!(store.pending_actions().len(), 2);
}

#[timeout(1000)]
#[test]
fn test_foreign_offsets_rejected() {
    let mut store = memory_store(pattern(10), small_config());
    let foreign = Offset::new(MediumId::next(), 0);

    assert!(matches!(
        store.get_data(foreign, 1),
        Err(MediumError::InvalidRange { .. })
    ));
    assert!(matches!(
        store.insert_data(foreign, vec![1]),
        Err(MediumError::InvalidRange { .. })
    ));
    assert!(store.is_at_end_of_medium(foreign).is_err());
}

#[timeout(1000)]
#[test]
fn test_undo_through_store() {
    let mut store = memory_store(pattern(10), small_config());
    let offset = store.create_offset(4).unwrap();

    let action = store.replace_data(offset, 2, b"zz".to_vec()).unwrap();
    assert_eq!(action.kind(), ActionKind::Replace);
    assert!(action.is_pending());

    let undone = store.undo(&action).unwrap();
    assert!(!undone.is_pending());
    assert!(store.pending_actions().is_empty());
    assert!(matches!(
        store.undo(&action),
        Err(MediumError::UnknownAction { .. })
    ));
}

#[timeout(1000)]
#[test]
fn test_invalid_config_rejected() {
    let config = MediumConfig {
        max_cache_size: 8,
        max_cache_region_size: 16,
        ..small_config()
    };
    assert!(matches!(
        MediumStore::new(MemoryAccessor::new(Vec::new()), config),
        Err(MediumError::InvalidArgument(_))
    ));
}
