//! Host objects behind the `bulldoze-core` traits.

use std::ffi::c_void;
use std::ptr;

use bulldoze_core::host::layout::{CellRegionLayout, DemolishControlLayout};
use bulldoze_core::{
    BulldozeCursor, CellPoint, CellRect, CellSelection, Color, ComObject, ControlView,
    DemolishControl, Demolition, NetworkTypeFlags, Occupant, OccupantFilter, PropertyHolder,
    PropertyValue, ResourceKey, ResourceManager,
};
use tracing::{debug, warn};

use crate::abi::{
    self, ComPtr, DemolishRegionFn, GetPtrByIdFn, GetPtrFn, GetResourceFn, GetU16Fn, GetU32Fn,
    PersistResourceKey, SetCursorFn, iids, slots,
};
use crate::services;

/// The host's demolish control.
///
/// `EndInput` and `UpdateSelectedRegion` re-enter the demolition hooks, so
/// they are queued and run by [`HostControl::run_deferred`] once the caller
/// has stored its session back.
pub struct HostControl {
    raw: *mut DemolishControlLayout,
    end_input: bool,
    update_region: bool,
}

impl HostControl {
    /// # Safety
    ///
    /// `raw` must point to a live `cSC4ViewInputControlDemolish` for as long
    /// as the adapter is used.
    pub unsafe fn new(raw: *mut DemolishControlLayout) -> Option<Self> {
        (!raw.is_null()).then_some(Self {
            raw,
            end_input: false,
            update_region: false,
        })
    }

    fn view(&self) -> ControlView<'_> {
        // SAFETY: non-null and live per the contract of `new`.
        ControlView::new(unsafe { &mut *self.raw })
    }

    /// Run the host calls queued during the last event.
    pub fn run_deferred(&mut self) {
        // SAFETY: fixed host functions of the supported version, `raw` is live.
        unsafe {
            if std::mem::take(&mut self.end_input) {
                abi::end_input_fn()(self.raw);
            }
            if std::mem::take(&mut self.update_region) {
                abi::update_selected_region_fn()(self.raw);
            }
        }
    }
}

impl DemolishControl for HostControl {
    fn is_on_top(&self) -> bool {
        // SAFETY: see `run_deferred`.
        unsafe { abi::is_on_top_fn()(self.raw) }
    }

    fn cursor_id(&self) -> u32 {
        self.view().cursor_id()
    }

    fn is_cell_picked(&self) -> bool {
        self.view().is_cell_picked()
    }

    fn drag_origin(&self) -> CellPoint {
        self.view().drag_origin()
    }

    fn end_input(&mut self) {
        self.end_input = true;
    }

    fn set_cursor(&mut self, cursor: BulldozeCursor) {
        // SAFETY: `raw` is a live control and slot 8 is SetCursor(uint32_t).
        let ok = unsafe {
            let this = self.raw.cast::<c_void>();
            let set_cursor: SetCursorFn = abi::vtable_fn(this, slots::CONTROL_SET_CURSOR);
            set_cursor(this, cursor.id())
        };
        if !ok {
            warn!("Host rejected cursor {}", cursor);
        }
    }

    fn update_selected_region(&mut self) {
        self.update_region = true;
    }

    fn set_demolish_ok_color(&mut self, color: Color) {
        // SAFETY: non-null and live per the contract of `new`.
        ControlView::new(unsafe { &mut *self.raw }).set_demolish_ok_color(color);
    }
}

/// Cells of a host `SC4CellRegion<int32_t>`, edited in place.
pub struct HostCellRegion {
    bounds: CellRect,
    cells: *mut bool,
    len: usize,
}

impl HostCellRegion {
    /// `None` when the cell map does not cover the bounds exactly.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point to a live host cell region whose cell
    /// map holds `width * height` bytes of 0 or 1, not accessed elsewhere
    /// while the view exists.
    pub unsafe fn from_ptr(raw: *const CellRegionLayout) -> Option<Self> {
        // SAFETY: guaranteed by the caller.
        let layout = unsafe { raw.as_ref() }?;
        let Some((bounds, len)) = layout.checked_cells() else {
            warn!(
                "Unexpected cell region layout: {:?}, {}x{} cells",
                layout.bounds, layout.cell_map.width, layout.cell_map.height
            );
            return None;
        };

        Some(Self {
            bounds,
            cells: layout.cell_map.data as usize as *mut bool,
            len,
        })
    }
}

impl CellSelection for HostCellRegion {
    fn bounds(&self) -> CellRect {
        self.bounds
    }

    fn cells(&self) -> &[bool] {
        // SAFETY: checked length, live buffer per the contract of `from_ptr`.
        unsafe { std::slice::from_raw_parts(self.cells, self.len) }
    }

    fn cells_mut(&mut self) -> &mut [bool] {
        // SAFETY: as above, and `&mut self` makes the borrow unique.
        unsafe { std::slice::from_raw_parts_mut(self.cells, self.len) }
    }
}

/// Arguments of the hooked call that are forwarded unchanged
#[derive(Debug, Clone, Copy)]
pub struct ForwardedArgs {
    pub region: *const CellRegionLayout,
    pub flags: u32,
    pub clear_zoned_area: bool,
    pub total_cost: *mut i64,
    pub demolished_occupants: isize,
    pub effect_occupant: *mut c_void,
    pub effect_x: i32,
    pub effect_z: i32,
}

/// The host's `cISC4Demolition` service, bound to one hooked call.
///
/// The region is edited in place, so the host region pointer is passed on
/// whatever the tool did to its cells.
pub struct HostDemolition {
    raw: *mut c_void,
    args: ForwardedArgs,
}

impl HostDemolition {
    /// # Safety
    ///
    /// `raw` must be a live `cISC4Demolition` of the supported host version
    /// and `args.region` the live region of the hooked call.
    pub unsafe fn new(raw: *mut c_void, args: ForwardedArgs) -> Self {
        Self { raw, args }
    }

    fn call(&mut self, demolish: bool, filter: *mut c_void) -> bool {
        let args = self.args;
        // SAFETY: `raw` is live per the contract of `new`; the slot holds the
        // 11 argument DemolishRegion overload.
        unsafe {
            let demolish_region: DemolishRegionFn =
                abi::vtable_fn(self.raw, slots::DEMOLITION_DEMOLISH_REGION);
            demolish_region(
                self.raw,
                demolish,
                args.region,
                abi::DEMOLISH_PRIVILEGE,
                args.flags,
                args.clear_zoned_area,
                filter,
                args.total_cost,
                args.demolished_occupants,
                args.effect_occupant,
                args.effect_x,
                args.effect_z,
            )
        }
    }
}

impl Demolition for HostDemolition {
    type Region = HostCellRegion;

    fn demolish_region(
        &mut self,
        demolish: bool,
        _region: &HostCellRegion,
        filter: Option<Box<dyn OccupantFilter>>,
    ) -> bool {
        match filter {
            Some(filter) => {
                let object = FilterObject::into_raw(&FILTER_VTABLE, filter);
                let result = self.call(demolish, object.cast());
                // SAFETY: drops the reference created by `into_raw`.
                unsafe { FilterObject::release(object) };
                result
            }
            // A null filter keeps the host's default
            None => self.call(demolish, ptr::null_mut()),
        }
    }

    fn forward(&mut self, demolish: bool) -> bool {
        self.call(demolish, ptr::null_mut())
    }
}

/// Borrowed host `cISC4Occupant`.
struct HostOccupant(*mut c_void);

impl Occupant for HostOccupant {
    fn occupant_type(&self) -> u32 {
        // SAFETY: the host passes live occupants to filter callbacks.
        unsafe {
            let get_type: GetU32Fn = abi::vtable_fn(self.0, slots::OCCUPANT_GET_TYPE);
            get_type(self.0)
        }
    }

    fn network_flags(&self) -> Option<NetworkTypeFlags> {
        // SAFETY: as above; the queried interface is released on drop.
        unsafe {
            let network = abi::query_interface(self.0, iids::SC4_NETWORK_OCCUPANT)?;
            let get_flags: GetU32Fn = network.method(slots::NETWORK_OCCUPANT_GET_NETWORK_FLAG);
            Some(NetworkTypeFlags::from_bits_retain(get_flags(network.as_ptr())))
        }
    }
}

/// `cISC4OccupantFilter` vtable
#[repr(C)]
struct FilterVtable {
    query_interface:
        unsafe extern "thiscall" fn(this: *mut FilterObject, iid: u32, out: *mut *mut c_void) -> bool,
    add_ref: unsafe extern "thiscall" fn(this: *mut FilterObject) -> u32,
    release: unsafe extern "thiscall" fn(this: *mut FilterObject) -> u32,
    is_occupant_included:
        unsafe extern "thiscall" fn(this: *mut FilterObject, occupant: *mut c_void) -> bool,
    is_occupant_type_included:
        unsafe extern "thiscall" fn(this: *mut FilterObject, occupant_type: u32) -> bool,
    is_property_holder_included:
        unsafe extern "thiscall" fn(this: *mut FilterObject, holder: *mut c_void) -> bool,
}

/// Reference counted occupant filter the host can call
type FilterObject = ComObject<FilterVtable, Box<dyn OccupantFilter>>;

static FILTER_VTABLE: FilterVtable = FilterVtable {
    query_interface: filter_query_interface,
    add_ref: filter_add_ref,
    release: filter_release,
    is_occupant_included: filter_is_occupant_included,
    is_occupant_type_included: filter_is_occupant_type_included,
    is_property_holder_included: filter_is_property_holder_included,
};

const FILTER_IIDS: [u32; 2] = [iids::GZ_UNKNOWN, iids::SC4_OCCUPANT_FILTER];

unsafe extern "thiscall" fn filter_query_interface(
    this: *mut FilterObject,
    iid: u32,
    out: *mut *mut c_void,
) -> bool {
    // SAFETY: `this` is a live filter object, the host passes a writable `out`.
    unsafe { FilterObject::query_interface(this, iid, &FILTER_IIDS, out) }
}

unsafe extern "thiscall" fn filter_add_ref(this: *mut FilterObject) -> u32 {
    // SAFETY: the host only calls this on a live object.
    unsafe { FilterObject::add_ref(this) }
}

unsafe extern "thiscall" fn filter_release(this: *mut FilterObject) -> u32 {
    // SAFETY: the host releases only references it holds.
    unsafe { FilterObject::release(this) }
}

unsafe extern "thiscall" fn filter_is_occupant_included(
    this: *mut FilterObject,
    occupant: *mut c_void,
) -> bool {
    if occupant.is_null() {
        return false;
    }
    // SAFETY: `this` is live while the host calls it.
    unsafe { FilterObject::value(this).is_occupant_included(&HostOccupant(occupant)) }
}

unsafe extern "thiscall" fn filter_is_occupant_type_included(
    this: *mut FilterObject,
    occupant_type: u32,
) -> bool {
    // SAFETY: `this` is live while the host calls it.
    unsafe { FilterObject::value(this).is_occupant_type_included(occupant_type) }
}

unsafe extern "thiscall" fn filter_is_property_holder_included(
    _this: *mut FilterObject,
    _holder: *mut c_void,
) -> bool {
    true
}

/// The host's `cIGZPersistResourceManager`.
pub struct HostResourceManager(ComPtr);

impl HostResourceManager {
    /// `None` before the framework is up
    pub fn acquire() -> Option<Self> {
        services::resource_manager().map(Self)
    }

    /// Load `key` as interface `iid`, from the private resources if asked.
    pub fn load(&self, key: &ResourceKey, iid: u32, private: bool) -> Option<ComPtr> {
        let slot = if private {
            slots::RESOURCE_MANAGER_GET_PRIVATE_RESOURCE
        } else {
            slots::RESOURCE_MANAGER_GET_RESOURCE
        };
        let key = PersistResourceKey::from(key);
        let mut out = ptr::null_mut();
        // SAFETY: the resource manager is alive while referenced; `out`
        // receives an owned reference on success.
        unsafe {
            let get_resource: GetResourceFn = self.0.method(slot);
            if !get_resource(self.0.as_ptr(), &key, iid, &mut out, 0, ptr::null_mut()) {
                return None;
            }
            ComPtr::from_raw(out)
        }
    }
}

impl ResourceManager for HostResourceManager {
    fn exemplar(&self, key: &ResourceKey) -> Option<Box<dyn PropertyHolder + '_>> {
        let exemplar = self.load(key, iids::SC_RES_EXEMPLAR, false);
        if exemplar.is_none() {
            debug!("Exemplar {:?} not found", key);
        }
        Some(Box::new(HostExemplar(exemplar?)))
    }
}

/// Loaded `cISCResExemplar`.
struct HostExemplar(ComPtr);

impl PropertyHolder for HostExemplar {
    fn property(&self, id: u32) -> Option<PropertyValue> {
        // SAFETY: the exemplar is alive while referenced. The holder,
        // property and variant are owned by it and only borrowed here.
        unsafe {
            let as_holder: GetPtrFn = self.0.method(slots::EXEMPLAR_AS_PROPERTY_HOLDER);
            let holder = non_null(as_holder(self.0.as_ptr()))?;

            let get_property: GetPtrByIdFn =
                abi::vtable_fn(holder, slots::PROPERTY_HOLDER_GET_PROPERTY);
            let property = non_null(get_property(holder, id))?;

            let get_value: GetPtrFn = abi::vtable_fn(property, slots::PROPERTY_GET_VALUE);
            let variant = non_null(get_value(property))?;

            let get_type: GetU16Fn = abi::vtable_fn(variant, slots::VARIANT_GET_TYPE);
            let variant_type = get_type(variant);
            if variant_type != abi::VARIANT_FLOAT32_ARRAY {
                return Some(PropertyValue::Other(variant_type));
            }

            let get_count: GetU32Fn = abi::vtable_fn(variant, slots::VARIANT_GET_COUNT);
            let count = get_count(variant) as usize;
            let ref_float32: GetPtrFn = abi::vtable_fn(variant, slots::VARIANT_REF_FLOAT32);
            let data = ref_float32(variant).cast::<f32>();
            if data.is_null() {
                return Some(PropertyValue::Float32Array(Vec::new()));
            }
            Some(PropertyValue::Float32Array(
                std::slice::from_raw_parts(data, count).to_vec(),
            ))
        }
    }
}

fn non_null(ptr: *mut c_void) -> Option<*mut c_void> {
    (!ptr.is_null()).then_some(ptr)
}
