//! Shared fixtures for integration tests.

use medium_core::{
    Accessor, MediumConfig, MediumError, MediumId, MediumStore, MemoryAccessor, Offset,
};

/// Deterministic medium content: byte `i` is `i % 251`.
pub fn pattern(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Small sizes so that short media span many regions and blocks.
pub fn small_config() -> MediumConfig {
    MediumConfig {
        max_cache_size: 256,
        max_cache_region_size: 16,
        max_read_write_block_size: 8,
        caching_enabled: true,
    }
}

/// Opened store over a writable memory medium.
pub fn memory_store(bytes: Vec<u8>, config: MediumConfig) -> MediumStore<MemoryAccessor> {
    let mut store = MediumStore::new(MemoryAccessor::new(bytes), config).unwrap();
    store.open().unwrap();
    store
}

/// Opened store over a counting medium.
pub fn counting_store(accessor: CountingAccessor, config: MediumConfig) -> MediumStore<CountingAccessor> {
    let mut store = MediumStore::new(accessor, config).unwrap();
    store.open().unwrap();
    store
}

/// Memory accessor that counts reads and can fail writes.
#[derive(Debug)]
pub struct CountingAccessor {
    pub inner: MemoryAccessor,
    /// Number of successful or short `read` calls
    pub reads: usize,
    /// Writes allowed before every further write fails
    pub writes_before_failure: Option<usize>,
}

impl CountingAccessor {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: MemoryAccessor::new(bytes),
            reads: 0,
            writes_before_failure: None,
        }
    }

    /// Lets `writes` writes succeed and fails every later one.
    pub fn failing_after(mut self, writes: usize) -> Self {
        self.writes_before_failure = Some(writes);
        self
    }
}

impl Accessor for CountingAccessor {
    fn medium(&self) -> MediumId {
        self.inner.medium()
    }

    fn open(&mut self) -> Result<(), MediumError> {
        self.inner.open()
    }

    fn close(&mut self) -> Result<(), MediumError> {
        self.inner.close()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn len(&self) -> Result<u64, MediumError> {
        self.inner.len()
    }

    fn set_position(&mut self, offset: Offset) -> Result<(), MediumError> {
        self.inner.set_position(offset)
    }

    fn current_position(&self) -> Result<Offset, MediumError> {
        self.inner.current_position()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, MediumError> {
        self.reads += 1;
        self.inner.read(buffer)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<(), MediumError> {
        match self.writes_before_failure {
            Some(0) => Err(MediumError::MediumAccessFailure(
                "injected write failure".to_string(),
            )),
            Some(left) => {
                self.writes_before_failure = Some(left - 1);
                self.inner.write(buffer)
            }
            None => self.inner.write(buffer),
        }
    }

    fn truncate(&mut self) -> Result<(), MediumError> {
        self.inner.truncate()
    }
}
