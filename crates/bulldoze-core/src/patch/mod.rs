//! Inline patching of the host executable image.
//!
//! A patch is described by a [`PatchDescriptor`] and written through a
//! [`PatchMemory`] backend. The backend is responsible for relaxing page
//! protection on exactly the bytes touched; the [`Patcher`] builds the
//! instruction bytes and applies descriptors in order.
//!
//! ```text
//! Kind        Bytes written                     Size
//! ───────────────────────────────────────────────────
//! Jump        E9 <rel32>                        5
//! Call        E8 <rel32>                        5
//! TableEntry  <u32 little endian>               4
//! Byte        <u8>                              1
//!
//! rel32 = destination - address - 5   (32-bit wrapping)
//! ```
//!
//! There is no uninstall path: original bytes are not saved and the
//! original page protection is not restored.

#[cfg(test)]
pub mod mock;
#[cfg(target_os = "windows")]
mod win32;

use strum::Display;
use tracing::debug;

use crate::error::{Error, Result};

#[cfg(test)]
pub use mock::RecordingMemory;
#[cfg(target_os = "windows")]
pub use win32::ProcessMemory;

/// `jmp rel32` opcode
pub const JMP_REL32: u8 = 0xE9;
/// `call rel32` opcode
pub const CALL_REL32: u8 = 0xE8;
/// Length of a `jmp rel32` / `call rel32` instruction
pub const REL32_INSTRUCTION_LEN: u32 = 5;

/// Address in the host's 32-bit address space
pub type HostAddress = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PatchKind {
    #[strum(serialize = "jump")]
    Jump,
    #[strum(serialize = "table entry")]
    TableEntry,
    #[strum(serialize = "call")]
    Call,
    #[strum(serialize = "byte")]
    Byte,
}

/// A single write into the host image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub address: HostAddress,
    pub kind: PatchKind,
    pub bytes: Vec<u8>,
}

impl PatchDescriptor {
    /// Unconditional `jmp` from `address` to `destination`.
    pub fn jump(address: HostAddress, destination: HostAddress) -> Self {
        Self::rel32(PatchKind::Jump, JMP_REL32, address, destination)
    }

    /// Replace the pointer-sized slot at `address` (vtable or jump table entry).
    pub fn table_entry(address: HostAddress, value: HostAddress) -> Self {
        Self {
            address,
            kind: PatchKind::TableEntry,
            bytes: value.to_le_bytes().to_vec(),
        }
    }

    /// `call` from `address` to `function`.
    pub fn call(address: HostAddress, function: HostAddress) -> Self {
        Self::rel32(PatchKind::Call, CALL_REL32, address, function)
    }

    /// Overwrite one byte, e.g. to insert a `push` ahead of a call hook.
    pub fn byte(address: HostAddress, value: u8) -> Self {
        Self {
            address,
            kind: PatchKind::Byte,
            bytes: vec![value],
        }
    }

    fn rel32(kind: PatchKind, opcode: u8, address: HostAddress, destination: HostAddress) -> Self {
        let mut bytes = Vec::with_capacity(REL32_INSTRUCTION_LEN as usize);
        bytes.push(opcode);
        bytes.extend_from_slice(&relative_displacement(address, destination).to_le_bytes());
        Self {
            address,
            kind,
            bytes,
        }
    }

    /// Number of bytes this patch touches
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Displacement operand of a 5-byte relative jump/call placed at `address`.
pub fn relative_displacement(address: HostAddress, destination: HostAddress) -> u32 {
    destination
        .wrapping_sub(address)
        .wrapping_sub(REL32_INSTRUCTION_LEN)
}

/// Backend that can write into the host image.
pub trait PatchMemory {
    /// Grant write and execute access to `len` bytes at `address`.
    fn make_writable(&mut self, address: HostAddress, len: usize) -> Result<()>;

    /// Copy `bytes` to `address`. Only called after a successful
    /// [`make_writable`](Self::make_writable) covering the same range.
    fn write(&mut self, address: HostAddress, bytes: &[u8]);
}

impl<M: PatchMemory + ?Sized> PatchMemory for &mut M {
    fn make_writable(&mut self, address: HostAddress, len: usize) -> Result<()> {
        (**self).make_writable(address, len)
    }

    fn write(&mut self, address: HostAddress, bytes: &[u8]) {
        (**self).write(address, bytes)
    }
}

/// Applies patch descriptors to a [`PatchMemory`] backend.
pub struct Patcher<M: PatchMemory> {
    memory: M,
    applied: usize,
}

impl<M: PatchMemory> Patcher<M> {
    pub fn new(memory: M) -> Self {
        Self { memory, applied: 0 }
    }

    /// Number of patches written so far
    pub fn applied(&self) -> usize {
        self.applied
    }

    pub fn into_inner(self) -> M {
        self.memory
    }

    pub fn apply(&mut self, patch: &PatchDescriptor) -> Result<()> {
        if patch.address == 0 {
            return Err(Error::InvalidPatchAddress(patch.address));
        }

        self.memory.make_writable(patch.address, patch.len())?;
        self.memory.write(patch.address, &patch.bytes);
        self.applied += 1;

        debug!(
            "Patched {} at 0x{:X} ({} bytes)",
            patch.kind,
            patch.address,
            patch.len()
        );
        Ok(())
    }

    /// Apply `patches` in order, stopping at the first failure.
    ///
    /// Patches written before the failure stay in place.
    pub fn apply_all(&mut self, patches: &[PatchDescriptor]) -> Result<()> {
        patches.iter().try_for_each(|patch| self.apply(patch))
    }

    pub fn install_jump(&mut self, address: HostAddress, destination: HostAddress) -> Result<()> {
        self.apply(&PatchDescriptor::jump(address, destination))
    }

    pub fn install_jump_table_hook(
        &mut self,
        address: HostAddress,
        new_value: HostAddress,
    ) -> Result<()> {
        self.apply(&PatchDescriptor::table_entry(address, new_value))
    }

    pub fn install_call_hook(&mut self, address: HostAddress, function: HostAddress) -> Result<()> {
        self.apply(&PatchDescriptor::call(address, function))
    }

    pub fn overwrite_memory(&mut self, address: HostAddress, value: u8) -> Result<()> {
        self.apply(&PatchDescriptor::byte(address, value))
    }
}
