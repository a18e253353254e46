//! Calling conventions, ids and vtable slots of the host interfaces the
//! plugin calls into.
//!
//! All host methods are MSVC `__thiscall`: `this` in `ecx`, arguments on
//! the stack, callee cleans up. Slots count from the first `cIGZUnknown`
//! method; MSVC groups overloads together in reverse declaration order.

use std::ffi::c_void;
use std::ptr::NonNull;

use bulldoze_core::ResourceKey;
use bulldoze_core::host::functions;
use bulldoze_core::host::layout::{CellRegionLayout, DemolishControlLayout};

pub mod iids {
    pub const GZ_UNKNOWN: u32 = 0x0000_0001;
    pub const COM_DIRECTOR: u32 = 0xA21E_E941;
    pub const FRAMEWORK_HOOKS: u32 = 0x03FA_40BF;
    pub const MESSAGE_TARGET2: u32 = 0x652E_8F28;
    pub const MESSAGE_SERVER2: u32 = 0x652E_E8EF;
    pub const PERSIST_RESOURCE_MANAGER: u32 = 0xA56B_8C2E;
    pub const SC4_APP: u32 = 0x26CE_01C0;
    pub const SC4_VIEW3D_WIN: u32 = 0xFA47_B3F9;
    pub const WIN_KEY_ACCELERATOR_RES: u32 = 0xA2E3_BD4A;
    pub const SC_RES_EXEMPLAR: u32 = 0x4787_BB1F;
    pub const SC4_OCCUPANT_FILTER: u32 = 0x8A4C_5CFB;
    pub const SC4_NETWORK_OCCUPANT: u32 = 0x49C1_B1E9;
}

/// Framework system service ids
pub mod services {
    pub const MESSAGE_SERVER2: u32 = 0x6522_94C7;
    pub const PERSIST_RESOURCE_MANAGER: u32 = 0xC4C4_AC35;
}

/// Window ids on the way from the main window to the city view
pub mod window_ids {
    pub const SC4_APP: u32 = 0x6104_489A;
    pub const SC4_VIEW3D: u32 = 0x9A47_B417;
}

pub mod slots {
    pub const QUERY_INTERFACE: usize = 0;
    pub const ADD_REF: usize = 1;
    pub const RELEASE: usize = 2;

    /// `cIGZCOM`
    pub const COM_FRAMEWORK: usize = 4;
    pub const COM_ALLOCATOR_SERVICE: usize = 5;

    /// `cIGZFrameWork`
    pub const FRAMEWORK_GET_SYSTEM_SERVICE: usize = 5;
    pub const FRAMEWORK_ADD_HOOK: usize = 7;
    pub const FRAMEWORK_APPLICATION: usize = 28;

    /// `cIGZAllocatorService::Allocate(uint32_t)`
    pub const ALLOCATOR_ALLOCATE: usize = 3;

    /// `cIGZMessageServer2`
    pub const MESSAGE_SERVER_ADD_NOTIFICATION: usize = 5;
    pub const MESSAGE_SERVER_REMOVE_NOTIFICATION: usize = 6;

    /// `cIGZMessage2::GetType()`
    pub const MESSAGE_GET_TYPE: usize = 4;

    /// `cISC4App`
    pub const APP_GET_CITY: usize = 21;
    pub const APP_GET_MAIN_WINDOW: usize = 22;

    /// `cISC4City::GetEstablished()`
    pub const CITY_GET_ESTABLISHED: usize = 13;

    /// `cIGZWin`
    pub const WIN_GET_CHILD_WINDOW_FROM_ID: usize = 37;
    pub const WIN_GET_CHILD_AS: usize = 40;

    /// `cISC4View3DWin`
    pub const VIEW3D_GET_KEY_ACCELERATOR: usize = 25;
    pub const VIEW3D_GET_CURRENT_VIEW_INPUT_CONTROL: usize = 28;
    pub const VIEW3D_SET_CURRENT_VIEW_INPUT_CONTROL: usize = 29;

    /// `cIGZWinKeyAcceleratorRes::RegisterResources(cIGZWinKeyAccelerator*)`
    pub const ACCELERATOR_RES_REGISTER_RESOURCES: usize = 4;

    /// `cIGZPersistResourceManager`
    pub const RESOURCE_MANAGER_GET_RESOURCE: usize = 16;
    pub const RESOURCE_MANAGER_GET_PRIVATE_RESOURCE: usize = 17;

    /// `cISCResExemplar::AsISCPropertyHolder()`
    pub const EXEMPLAR_AS_PROPERTY_HOLDER: usize = 3;
    /// `cISCPropertyHolder::GetProperty(uint32_t) const`
    pub const PROPERTY_HOLDER_GET_PROPERTY: usize = 4;
    /// `cISCProperty::GetPropertyValue() const`
    pub const PROPERTY_GET_VALUE: usize = 6;
    /// `cIGZVariant`
    pub const VARIANT_GET_TYPE: usize = 3;
    pub const VARIANT_GET_COUNT: usize = 6;
    pub const VARIANT_REF_FLOAT32: usize = 37;

    /// `cISC4ViewInputControl`, from its declaration
    pub const CONTROL_INIT: usize = 3;
    pub const CONTROL_GET_ID: usize = 5;
    pub const CONTROL_SET_CURSOR: usize = 8;

    /// `cISC4Demolition::DemolishRegion`, the overload that takes the
    /// `demolish` flag; the call sites hooked at install use the one at 6.
    pub const DEMOLITION_DEMOLISH_REGION: usize = 5;

    /// `cISC4Occupant::GetType()`
    pub const OCCUPANT_GET_TYPE: usize = 7;

    /// `cISC4NetworkOccupant::GetNetworkFlag()`
    pub const NETWORK_OCCUPANT_GET_NETWORK_FLAG: usize = 22;
}

/// Privilege type the hooked call sites originally passed
pub const DEMOLISH_PRIVILEGE: u32 = 1;

/// `cISC4View3DWin::ViewInputControlStackOperation::RemoveAllControls`
pub const REMOVE_ALL_CONTROLS: u32 = 2;

/// `cIGZVariant` type code of a float32 array
pub const VARIANT_FLOAT32_ARRAY: u16 = 0x8009;

/// `cGZPersistResourceKey`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PersistResourceKey {
    pub type_id: u32,
    pub group: u32,
    pub instance: u32,
}

impl From<&ResourceKey> for PersistResourceKey {
    fn from(key: &ResourceKey) -> Self {
        Self {
            type_id: key.type_id,
            group: key.group,
            instance: key.instance,
        }
    }
}

pub type QueryInterfaceFn =
    unsafe extern "thiscall" fn(this: *mut c_void, iid: u32, out: *mut *mut c_void) -> bool;
pub type RefCountFn = unsafe extern "thiscall" fn(this: *mut c_void) -> u32;
pub type GetU32Fn = unsafe extern "thiscall" fn(this: *mut c_void) -> u32;
pub type GetU16Fn = unsafe extern "thiscall" fn(this: *mut c_void) -> u16;
pub type GetBoolFn = unsafe extern "thiscall" fn(this: *mut c_void) -> bool;
pub type GetPtrFn = unsafe extern "thiscall" fn(this: *mut c_void) -> *mut c_void;
pub type GetPtrByIdFn = unsafe extern "thiscall" fn(this: *mut c_void, id: u32) -> *mut c_void;
pub type TakePtrFn = unsafe extern "thiscall" fn(this: *mut c_void, object: *mut c_void) -> bool;
pub type AllocateFn = unsafe extern "thiscall" fn(this: *mut c_void, size: u32) -> *mut c_void;

/// `GetSystemService` and `GetChildAs` share this shape
pub type GetInterfaceByIdFn =
    unsafe extern "thiscall" fn(this: *mut c_void, id: u32, iid: u32, out: *mut *mut c_void) -> bool;

pub type NotificationFn =
    unsafe extern "thiscall" fn(this: *mut c_void, target: *mut c_void, message_type: u32) -> bool;

pub type GetResourceFn = unsafe extern "thiscall" fn(
    this: *mut c_void,
    key: *const PersistResourceKey,
    iid: u32,
    out: *mut *mut c_void,
    flags: u32,
    factory: *mut c_void,
) -> bool;

pub type SetViewInputControlFn =
    unsafe extern "thiscall" fn(this: *mut c_void, control: *mut c_void, operation: u32) -> bool;

pub type ControlFn = unsafe extern "thiscall" fn(this: *mut DemolishControlLayout);
pub type IsOnTopFn = unsafe extern "thiscall" fn(this: *mut DemolishControlLayout) -> bool;
pub type SetCursorFn =
    unsafe extern "thiscall" fn(this: *mut c_void, cursor_id: u32) -> bool;

/// `cISC4Demolition::DemolishRegion(bool, SC4CellRegion const&, ...)`
pub type DemolishRegionFn = unsafe extern "thiscall" fn(
    this: *mut c_void,
    demolish: bool,
    region: *const CellRegionLayout,
    privilege: u32,
    flags: u32,
    clear_zoned_area: bool,
    filter: *mut c_void,
    total_cost: *mut i64,
    demolished_occupants: isize,
    effect_occupant: *mut c_void,
    effect_x: i32,
    effect_z: i32,
) -> bool;

pub fn is_on_top_fn() -> IsOnTopFn {
    // SAFETY: fixed entry point of the supported executable, checked at install.
    unsafe { std::mem::transmute::<usize, IsOnTopFn>(functions::IS_ON_TOP as usize) }
}

pub fn end_input_fn() -> ControlFn {
    // SAFETY: as above.
    unsafe { std::mem::transmute::<usize, ControlFn>(functions::END_INPUT as usize) }
}

pub fn update_selected_region_fn() -> ControlFn {
    // SAFETY: as above.
    unsafe { std::mem::transmute::<usize, ControlFn>(functions::UPDATE_SELECTED_REGION as usize) }
}

/// `cSC4ViewInputControlDemolish::cSC4ViewInputControlDemolish()`
pub fn demolish_control_ctor_fn() -> GetPtrFn {
    // SAFETY: as above.
    unsafe { std::mem::transmute::<usize, GetPtrFn>(functions::DEMOLISH_CONTROL_CTOR as usize) }
}

/// Read slot `slot` of the vtable of `object`.
///
/// # Safety
///
/// `object` must be a live host object whose vtable has a function of type
/// `F` at `slot`.
pub unsafe fn vtable_fn<F: Copy>(object: *const c_void, slot: usize) -> F {
    debug_assert_eq!(size_of::<F>(), size_of::<usize>());
    // SAFETY: guaranteed by the caller.
    unsafe {
        let vtable = *(object as *const *const usize);
        std::mem::transmute_copy::<usize, F>(&*vtable.add(slot))
    }
}

/// `cIGZUnknown::QueryInterface`, `None` when the interface is not supported.
///
/// # Safety
///
/// `object` must be a live host COM object.
pub unsafe fn query_interface(object: *mut c_void, iid: u32) -> Option<ComPtr> {
    let mut out = std::ptr::null_mut();
    // SAFETY: guaranteed by the caller.
    unsafe {
        let query: QueryInterfaceFn = vtable_fn(object, slots::QUERY_INTERFACE);
        if !query(object, iid, &mut out) {
            return None;
        }
        ComPtr::from_raw(out)
    }
}

/// Owned reference to a host COM object, released on drop.
pub struct ComPtr(NonNull<c_void>);

impl ComPtr {
    /// Take over one reference; `None` for null.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live host COM object carrying a reference
    /// the caller owns.
    pub unsafe fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    /// Add a reference to a borrowed object.
    ///
    /// # Safety
    ///
    /// `raw` must be null or a live host COM object.
    pub unsafe fn from_borrowed(raw: *mut c_void) -> Option<Self> {
        let ptr = NonNull::new(raw)?;
        // SAFETY: guaranteed by the caller.
        unsafe {
            let add_ref: RefCountFn = vtable_fn(raw, slots::ADD_REF);
            add_ref(raw);
        }
        Some(Self(ptr))
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// # Safety
    ///
    /// Slot `slot` of the object's vtable must hold a function of type `F`.
    pub unsafe fn method<F: Copy>(&self, slot: usize) -> F {
        // SAFETY: the object is alive while referenced, slot per the caller.
        unsafe { vtable_fn(self.as_ptr(), slot) }
    }

    pub fn query(&self, iid: u32) -> Option<ComPtr> {
        // SAFETY: the object is alive while referenced.
        unsafe { query_interface(self.as_ptr(), iid) }
    }
}

impl Drop for ComPtr {
    fn drop(&mut self) {
        // SAFETY: this pointer owns one reference.
        unsafe {
            let release: RefCountFn = vtable_fn(self.as_ptr(), slots::RELEASE);
            release(self.as_ptr());
        }
    }
}
