//! Recording patch backend for tests.

use std::collections::{BTreeMap, HashSet};

use super::{HostAddress, PatchMemory};
use crate::error::{Error, Result};

/// In-memory [`PatchMemory`] that records protection changes and writes.
#[derive(Debug, Default)]
pub struct RecordingMemory {
    bytes: BTreeMap<HostAddress, u8>,
    protected: Vec<(HostAddress, usize)>,
    writes: usize,
    failing: HashSet<HostAddress>,
}

impl RecordingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the protection change at `address` fail
    pub fn fail_protection_at(&mut self, address: HostAddress) {
        self.failing.insert(address);
    }

    pub fn protected_ranges(&self) -> &[(HostAddress, usize)] {
        &self.protected
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn byte(&self, address: HostAddress) -> Option<u8> {
        self.bytes.get(&address).copied()
    }

    pub fn read_u32(&self, address: HostAddress) -> Option<u32> {
        let mut buf = [0u8; 4];
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.byte(address + i as u32)?;
        }
        Some(u32::from_le_bytes(buf))
    }
}

impl PatchMemory for RecordingMemory {
    fn make_writable(&mut self, address: HostAddress, len: usize) -> Result<()> {
        if self.failing.contains(&address) {
            return Err(Error::PatchInstall {
                address,
                size: len,
                message: "Invalid access to memory location.".to_string(),
            });
        }
        self.protected.push((address, len));
        Ok(())
    }

    fn write(&mut self, address: HostAddress, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.bytes.insert(address + i as u32, *b);
        }
        self.writes += 1;
    }
}
