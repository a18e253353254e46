//! Hook installation plan for the demolish control.
//!
//! ```text
//! Target     Address   Patch
//! ──────────────────────────────────────────────────────────────
//! OnKeyDown      0xA901D8  vtable slot  -> on_key_down
//! OnMouseWheel   0xA901F4  vtable slot  -> on_mouse_wheel
//! Activate       0xA901FC  vtable slot  -> activate
//! preview call   0x4B97ED  56           push esi (placeholder argument)
//!                0x4B97EE  50           push eax
//!                0x4B97EF  E8 <rel32>   call preview_demolish_region
//! commit call    0x4B9D02  E8 <rel32>   call commit_demolish_region
//! ```
//!
//! The preview call site originally pushes the privilege type and calls
//! through the demolition vtable (`call [edx + 0x18]`). The rewritten site pushes a placeholder
//! in its place and calls the hook directly; the hook restores the
//! privilege argument when it forwards to the host.

use tracing::{error, info, warn};

use crate::error::Result;
use crate::host::check_game_version;
use crate::patch::{HostAddress, PatchDescriptor, PatchMemory, Patcher};

/// Patch targets (game version 641)
pub mod targets {
    /// `cISC4ViewInputControl` vtable slots of the demolish control
    pub const ON_KEY_DOWN_SLOT: u32 = 0x00A9_01D8;
    pub const ON_MOUSE_WHEEL_SLOT: u32 = 0x00A9_01F4;
    pub const ACTIVATE_SLOT: u32 = 0x00A9_01FC;

    /// Preview `DemolishRegion` call site: `push 1`, `push eax`, `call [edx + 0x18]`
    pub const PREVIEW_PUSH_PLACEHOLDER: u32 = 0x004B_97ED;
    pub const PREVIEW_PUSH_EAX: u32 = 0x004B_97EE;
    pub const PREVIEW_CALL: u32 = 0x004B_97EF;

    pub const COMMIT_CALL: u32 = 0x004B_9D02;
}

/// `push esi`
const PUSH_ESI: u8 = 0x56;
/// `push eax`
const PUSH_EAX: u8 = 0x50;

/// Addresses of the plugin functions the hooks redirect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookEntryPoints {
    pub on_key_down: HostAddress,
    pub on_mouse_wheel: HostAddress,
    pub activate: HostAddress,
    pub preview_demolish_region: HostAddress,
    pub commit_demolish_region: HostAddress,
}

/// Ordered patch list for `entry`
pub fn hook_patches(entry: &HookEntryPoints) -> Vec<PatchDescriptor> {
    vec![
        PatchDescriptor::table_entry(targets::ON_KEY_DOWN_SLOT, entry.on_key_down),
        PatchDescriptor::table_entry(targets::ON_MOUSE_WHEEL_SLOT, entry.on_mouse_wheel),
        PatchDescriptor::table_entry(targets::ACTIVATE_SLOT, entry.activate),
        PatchDescriptor::byte(targets::PREVIEW_PUSH_PLACEHOLDER, PUSH_ESI),
        PatchDescriptor::byte(targets::PREVIEW_PUSH_EAX, PUSH_EAX),
        PatchDescriptor::call(targets::PREVIEW_CALL, entry.preview_demolish_region),
        PatchDescriptor::call(targets::COMMIT_CALL, entry.commit_demolish_region),
    ]
}

/// Version gate, then every hook patch in order.
pub fn try_install<M: PatchMemory>(game_version: u16, memory: M, entry: &HookEntryPoints) -> Result<()> {
    check_game_version(game_version)?;

    let mut patcher = Patcher::new(memory);
    patcher.apply_all(&hook_patches(entry))
}

/// Install the hooks, logging the outcome.
///
/// Patches applied before a failure stay in place.
pub fn install<M: PatchMemory>(game_version: u16, memory: M, entry: &HookEntryPoints) -> bool {
    match try_install(game_version, memory, entry) {
        Ok(()) => {
            info!("Installed the bulldoze extensions.");
            true
        }
        Err(e) => {
            error!("Failed to install the bulldoze extensions: {}", e);
            if e.is_patch_failure() {
                warn!("Hooks patched before the failure remain in place");
            }
            false
        }
    }
}
