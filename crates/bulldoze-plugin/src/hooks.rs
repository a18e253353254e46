//! Hook entry points patched into the host, and the state they share.
//!
//! Every hook runs on the host's UI thread. State lives in a thread local;
//! each hook copies the session out before calling back into the host, so
//! re-entrant calls (e.g. `UpdateSelectedRegion` leading to the preview
//! hook) never observe a borrowed cell.

use std::cell::RefCell;
use std::ffi::c_void;

use bulldoze_core::host::layout::{CellRegionLayout, DemolishControlLayout};
use bulldoze_core::{
    DemolishControl, DemolishSession, HighlightColors, HookEntryPoints, KeyBindings, ModifierKeys,
    ResourceManager, route_demolish_region,
};
use tracing::debug;

use crate::adapters::{
    ForwardedArgs, HostCellRegion, HostControl, HostDemolition, HostResourceManager,
};

#[derive(Default)]
struct PluginState {
    colors: HighlightColors,
    bindings: KeyBindings,
    session: Option<DemolishSession>,
    /// Control of the current session; the demolition hooks only get the
    /// demolition service
    control: Option<*mut DemolishControlLayout>,
}

thread_local! {
    static STATE: RefCell<PluginState> = RefCell::new(PluginState::default());
}

pub fn set_key_bindings(bindings: KeyBindings) {
    STATE.with_borrow_mut(|state| state.bindings = bindings);
}

/// Forget the session and the resolved colors.
pub fn reset() {
    STATE.with_borrow_mut(|state| {
        state.session = None;
        state.control = None;
        state.colors.shutdown();
    });
}

fn current_session() -> Option<(DemolishSession, *mut DemolishControlLayout)> {
    STATE.with_borrow(|state| Some((state.session.clone()?, state.control?)))
}

fn store_session(session: DemolishSession) {
    STATE.with_borrow_mut(|state| {
        if state.session.is_some() {
            state.session = Some(session);
        }
    });
}

pub fn entry_points() -> HookEntryPoints {
    HookEntryPoints {
        on_key_down: on_key_down as usize as u32,
        on_mouse_wheel: on_mouse_wheel as usize as u32,
        activate: activate as usize as u32,
        preview_demolish_region: preview_demolish_region as usize as u32,
        commit_demolish_region: commit_demolish_region as usize as u32,
    }
}

/// Replaces `cISC4ViewInputControl::Activate` of the demolish control.
unsafe extern "thiscall" fn activate(this: *mut DemolishControlLayout) {
    // SAFETY: the host calls Activate on a live control.
    let Some(control) = (unsafe { HostControl::new(this) }) else {
        return;
    };

    STATE.with_borrow_mut(|state| {
        if !state.colors.is_initialized() {
            let manager = HostResourceManager::acquire();
            if manager.is_none() {
                debug!("No resource manager, using the game's highlight color");
            }
            let rejected = state
                .colors
                .init(manager.as_ref().map(|m| m as &dyn ResourceManager))
                .len();
            if rejected > 0 {
                debug!("{} highlight color properties rejected", rejected);
            }
        }
        let cursor_id = control.cursor_id();
        state.session = Some(DemolishSession::activate(
            cursor_id,
            state.colors.clone(),
            state.bindings,
        ));
        state.control = Some(this);
    });
}

/// Replaces `cISC4ViewInputControl::OnKeyDown`.
unsafe extern "thiscall" fn on_key_down(
    this: *mut DemolishControlLayout,
    vk_code: i32,
    modifiers: u32,
) -> bool {
    let Some((mut session, _)) = current_session() else {
        return false;
    };
    // SAFETY: the host calls OnKeyDown on a live control.
    let Some(mut control) = (unsafe { HostControl::new(this) }) else {
        return false;
    };

    let handled = session.on_key_down(
        &mut control,
        vk_code,
        ModifierKeys::from_bits_truncate(modifiers),
    );
    store_session(session);
    control.run_deferred();
    handled
}

/// Replaces `cISC4ViewInputControl::OnMouseWheel`.
///
/// Returning `false` leaves the wheel to the host (camera zoom).
unsafe extern "thiscall" fn on_mouse_wheel(
    this: *mut DemolishControlLayout,
    _x: i32,
    _z: i32,
    modifiers: u32,
    delta: i32,
) -> bool {
    let Some((mut session, _)) = current_session() else {
        return false;
    };
    // SAFETY: the host calls OnMouseWheel on a live control.
    let Some(mut control) = (unsafe { HostControl::new(this) }) else {
        return false;
    };

    let handled = session.on_mouse_wheel(
        &mut control,
        ModifierKeys::from_bits_truncate(modifiers),
        delta,
    );
    store_session(session);
    control.run_deferred();
    handled
}

/// Target of the patched preview call site.
///
/// `_placeholder` is the `esi` pushed where the privilege type used to be.
#[allow(clippy::too_many_arguments)]
unsafe extern "thiscall" fn preview_demolish_region(
    demolition: *mut c_void,
    region: *mut CellRegionLayout,
    _placeholder: u32,
    flags: u32,
    clear_zoned_area: bool,
    _host_filter: *mut c_void,
    total_cost: *mut i64,
    demolished_occupants: isize,
    effect_occupant: *mut c_void,
    effect_x: i32,
    effect_z: i32,
) -> bool {
    let args = ForwardedArgs {
        region,
        flags,
        clear_zoned_area,
        total_cost,
        demolished_occupants,
        effect_occupant,
        effect_x,
        effect_z,
    };
    // SAFETY: the host passes its live demolition service and region.
    unsafe { dispatch(demolition, args, false) }
}

/// Target of the patched commit call site.
#[allow(clippy::too_many_arguments)]
unsafe extern "thiscall" fn commit_demolish_region(
    demolition: *mut c_void,
    region: *mut CellRegionLayout,
    _placeholder: u32,
    flags: u32,
    clear_zoned_area: bool,
    _host_filter: *mut c_void,
    total_cost: *mut i64,
    demolished_occupants: isize,
    effect_occupant: *mut c_void,
    effect_x: i32,
    effect_z: i32,
) -> bool {
    let args = ForwardedArgs {
        region,
        flags,
        clear_zoned_area,
        total_cost,
        demolished_occupants,
        effect_occupant,
        effect_x,
        effect_z,
    };
    // SAFETY: as above.
    unsafe { dispatch(demolition, args, true) }
}

/// # Safety
///
/// `demolition` and `args.region` must be the live objects of a hooked call.
unsafe fn dispatch(demolition: *mut c_void, args: ForwardedArgs, demolish: bool) -> bool {
    // SAFETY: guaranteed by the caller.
    let mut host = unsafe { HostDemolition::new(demolition, args) };

    let current = current_session();
    let (session, control) = match &current {
        // SAFETY: the session's control is alive while its demolition hooks run.
        Some((session, control)) => (Some(session), unsafe { HostControl::new(*control) }),
        None => (None, None),
    };
    // SAFETY: the hooked call's region, only edited through this view.
    let mut cells = unsafe { HostCellRegion::from_ptr(args.region) };

    route_demolish_region(session, control.as_mut(), &mut host, cells.as_mut(), demolish)
}
