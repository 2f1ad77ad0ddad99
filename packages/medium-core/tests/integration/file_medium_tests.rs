//! File-backed media through `FileAccessor`.

use std::fs;

use medium_core::{FileAccessor, MediumConfig, MediumError, MediumStore};
use ntest::timeout;
use tempfile::tempdir;

use super::helpers::pattern;

fn file_config() -> MediumConfig {
    MediumConfig {
        max_cache_size: 4096,
        max_cache_region_size: 512,
        max_read_write_block_size: 64,
        caching_enabled: true,
    }
}

#[timeout(5000)]
#[test]
fn test_file_edits_survive_reopen() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("medium.bin");
    let original = pattern(10_000);
    fs::write(&path, &original).unwrap();

    let mut store = MediumStore::new(FileAccessor::new(&path, false), file_config()).unwrap();
    store.open().unwrap();
    store
        .insert_data(store.create_offset(100).unwrap(), b"header".to_vec())
        .unwrap();
    store
        .remove_data(store.create_offset(5_000).unwrap(), 1_000)
        .unwrap();
    store
        .replace_data(store.create_offset(9_000).unwrap(), 4, vec![0xFF; 300])
        .unwrap();
    let flushed = store.flush().unwrap();
    assert_eq!(flushed.len(), 3);
    store.close().unwrap();

    let mut expected = original[..100].to_vec();
    expected.extend_from_slice(b"header");
    expected.extend_from_slice(&original[100..5_000]);
    expected.extend_from_slice(&original[6_000..9_000]);
    expected.extend_from_slice(&[0xFF; 300]);
    expected.extend_from_slice(&original[9_004..]);
    assert_eq!(fs::read(&path).unwrap(), expected);

    let mut reopened = MediumStore::new(FileAccessor::new(&path, true), file_config()).unwrap();
    reopened.open().unwrap();
    let length = reopened.medium_length().unwrap();
    assert_eq!(length, expected.len() as u64);
    let data = reopened
        .get_data(reopened.create_offset(0).unwrap(), length)
        .unwrap();
    assert_eq!(data, expected);
}

#[timeout(2000)]
#[test]
fn test_read_only_file_store() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("readonly.bin");
    fs::write(&path, pattern(50)).unwrap();

    let mut store = MediumStore::new(FileAccessor::new(&path, true), file_config()).unwrap();
    store.open().unwrap();
    let offset = store.create_offset(40).unwrap();

    assert!(matches!(
        store.insert_data(offset, vec![1]),
        Err(MediumError::ReadOnlyMedium(_))
    ));
    let error = store.get_data(offset, 20).unwrap_err();
    assert_eq!(error.partial_bytes(), Some(&pattern(50)[40..]));
    assert_eq!(store.into_accessor().path(), path.as_path());
}

#[timeout(2000)]
#[test]
fn test_missing_file_fails_to_open() {
    let temp_dir = tempdir().unwrap();
    let mut store = MediumStore::new(
        FileAccessor::new(temp_dir.path().join("missing.bin"), false),
        file_config(),
    )
    .unwrap();

    assert!(matches!(
        store.open(),
        Err(MediumError::MediumAccessFailure(_))
    ));
    assert!(!store.is_open());
}
