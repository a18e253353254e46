//! The plugin's COM director: the object the game's DLL loader asks for.
//!
//! One static object exposes three host interfaces, each behind its own
//! vtable pointer:
//!
//! ```text
//! +0  cIGZCOMDirector      InitializeCOM, OnStart, GetDirectorID, ...
//! +4  cIGZFrameWorkHooks   PostAppInit (hook install), the rest no-ops
//! +8  cIGZMessageTarget2   DoMessage (city lifecycle, shortcuts)
//! ```
//!
//! The object is never freed, so reference counting is a constant.

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use bulldoze_core::host::layout::DEMOLISH_CONTROL_SIZE;
use bulldoze_core::host::messages::DIRECTOR_ID;
use bulldoze_core::patch::ProcessMemory;
use bulldoze_core::{BULLDOZE_CONTROL_ID, BulldozeCursor, Director, DirectorHost, ResourceKey};
use tracing::{debug, error, info};

use crate::abi::{
    self, AllocateFn, ComPtr, GetBoolFn, GetInterfaceByIdFn, GetPtrByIdFn, GetPtrFn, GetU32Fn,
    NotificationFn, SetCursorFn, SetViewInputControlFn, TakePtrFn, iids, slots, window_ids,
};
use crate::adapters::HostResourceManager;
use crate::{hooks, module, services};

#[repr(C)]
pub struct DirectorObject {
    director: &'static DirectorVtable,
    hooks: &'static FrameworkHooksVtable,
    target: &'static MessageTargetVtable,
}

static DIRECTOR: DirectorObject = DirectorObject {
    director: &DIRECTOR_VTABLE,
    hooks: &HOOKS_VTABLE,
    target: &TARGET_VTABLE,
};

static INSTALLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static STATE: RefCell<Director> = RefCell::new(Director::new());
    /// `cISC4View3DWin` of the current city
    static VIEW: RefCell<Option<ComPtr>> = const { RefCell::new(None) };
    static REF_COUNT: Cell<u32> = const { Cell::new(1) };
}

/// `cIGZCOMDirector` pointer handed to the loader
pub fn director_ptr() -> *mut c_void {
    ptr::from_ref(&DIRECTOR).cast_mut().cast()
}

fn hooks_ptr() -> *mut c_void {
    ptr::from_ref(&DIRECTOR.hooks).cast_mut().cast()
}

fn target_ptr() -> *mut c_void {
    ptr::from_ref(&DIRECTOR.target).cast_mut().cast()
}

/// Interface pointer of the director for `iid`
fn interface(iid: u32) -> Option<*mut c_void> {
    match iid {
        iids::GZ_UNKNOWN | iids::COM_DIRECTOR => Some(director_ptr()),
        iids::FRAMEWORK_HOOKS => Some(hooks_ptr()),
        iids::MESSAGE_TARGET2 => Some(target_ptr()),
        _ => None,
    }
}

type ThisFn<R> = unsafe extern "thiscall" fn(this: *mut c_void) -> R;

#[repr(C)]
struct DirectorVtable {
    query_interface:
        unsafe extern "thiscall" fn(this: *mut c_void, iid: u32, out: *mut *mut c_void) -> bool,
    add_ref: ThisFn<u32>,
    release: ThisFn<u32>,
    initialize_com:
        unsafe extern "thiscall" fn(this: *mut c_void, com: *mut c_void, library_path: *const c_void) -> bool,
    on_start: unsafe extern "thiscall" fn(this: *mut c_void, com: *mut c_void) -> bool,
    enum_class_objects:
        unsafe extern "thiscall" fn(this: *mut c_void, callback: *mut c_void, context: *mut c_void),
    get_class_object: unsafe extern "thiscall" fn(
        this: *mut c_void,
        clsid: u32,
        iid: u32,
        out: *mut *mut c_void,
    ) -> bool,
    can_unload_now: ThisFn<bool>,
    on_unload: ThisFn<bool>,
    ref_count: ThisFn<u32>,
    remove_ref: ThisFn<u32>,
    framework: ThisFn<*mut c_void>,
    gz_com: ThisFn<*mut c_void>,
    get_director_id: ThisFn<u32>,
    get_library_path: unsafe extern "thiscall" fn(this: *mut c_void, path: *mut c_void) -> bool,
    get_heap_allocated_size: ThisFn<u32>,
}

#[repr(C)]
struct FrameworkHooksVtable {
    query_interface:
        unsafe extern "thiscall" fn(this: *mut c_void, iid: u32, out: *mut *mut c_void) -> bool,
    add_ref: ThisFn<u32>,
    release: ThisFn<u32>,
    pre_framework_init: ThisFn<bool>,
    pre_app_init: ThisFn<bool>,
    post_app_init: ThisFn<bool>,
    pre_app_shutdown: ThisFn<bool>,
    post_app_shutdown: ThisFn<bool>,
    post_system_service_shutdown: ThisFn<bool>,
    abortive_quit: ThisFn<bool>,
    on_install: ThisFn<bool>,
}

#[repr(C)]
struct MessageTargetVtable {
    query_interface:
        unsafe extern "thiscall" fn(this: *mut c_void, iid: u32, out: *mut *mut c_void) -> bool,
    add_ref: ThisFn<u32>,
    release: ThisFn<u32>,
    do_message: unsafe extern "thiscall" fn(this: *mut c_void, message: *mut c_void) -> bool,
}

static DIRECTOR_VTABLE: DirectorVtable = DirectorVtable {
    query_interface,
    add_ref,
    release,
    initialize_com,
    on_start,
    enum_class_objects,
    get_class_object,
    can_unload_now: returns_false,
    on_unload: returns_true,
    ref_count,
    remove_ref: release,
    framework,
    gz_com,
    get_director_id,
    get_library_path,
    get_heap_allocated_size,
};

static HOOKS_VTABLE: FrameworkHooksVtable = FrameworkHooksVtable {
    query_interface,
    add_ref,
    release,
    pre_framework_init: returns_true,
    pre_app_init: returns_true,
    post_app_init,
    pre_app_shutdown: returns_true,
    post_app_shutdown: returns_true,
    post_system_service_shutdown: returns_true,
    abortive_quit: returns_true,
    on_install: returns_true,
};

static TARGET_VTABLE: MessageTargetVtable = MessageTargetVtable {
    query_interface,
    add_ref,
    release,
    do_message,
};

unsafe extern "thiscall" fn query_interface(
    _this: *mut c_void,
    iid: u32,
    out: *mut *mut c_void,
) -> bool {
    if out.is_null() {
        return false;
    }
    let found = interface(iid);
    // SAFETY: the host passes a writable `out`.
    unsafe { *out = found.unwrap_or(ptr::null_mut()) };
    if found.is_some() {
        REF_COUNT.set(REF_COUNT.get() + 1);
    }
    found.is_some()
}

unsafe extern "thiscall" fn add_ref(_this: *mut c_void) -> u32 {
    REF_COUNT.set(REF_COUNT.get() + 1);
    REF_COUNT.get()
}

/// The static object stays alive whatever the count says.
unsafe extern "thiscall" fn release(_this: *mut c_void) -> u32 {
    REF_COUNT.set(REF_COUNT.get().saturating_sub(1).max(1));
    REF_COUNT.get()
}

unsafe extern "thiscall" fn ref_count(_this: *mut c_void) -> u32 {
    REF_COUNT.get()
}

unsafe extern "thiscall" fn returns_true(_this: *mut c_void) -> bool {
    true
}

unsafe extern "thiscall" fn returns_false(_this: *mut c_void) -> bool {
    false
}

unsafe extern "thiscall" fn initialize_com(
    _this: *mut c_void,
    com: *mut c_void,
    _library_path: *const c_void,
) -> bool {
    // SAFETY: the loader passes its live cIGZCOM.
    let attached = unsafe { services::attach(com) };
    if !attached {
        error!("The game passed no framework to the director");
    }
    attached
}

unsafe extern "thiscall" fn on_start(_this: *mut c_void, _com: *mut c_void) -> bool {
    let framework = services::framework();
    if framework.is_null() {
        return false;
    }
    // SAFETY: the framework lives as long as the process; the hooks
    // interface is static.
    let added = unsafe {
        let add_hook: TakePtrFn = abi::vtable_fn(framework, slots::FRAMEWORK_ADD_HOOK);
        add_hook(framework, hooks_ptr())
    };
    if !added {
        error!("Failed to register the framework hooks");
    }
    true
}

unsafe extern "thiscall" fn enum_class_objects(
    _this: *mut c_void,
    _callback: *mut c_void,
    _context: *mut c_void,
) {
}

unsafe extern "thiscall" fn get_class_object(
    _this: *mut c_void,
    _clsid: u32,
    _iid: u32,
    out: *mut *mut c_void,
) -> bool {
    if !out.is_null() {
        // SAFETY: the host passes a writable `out`.
        unsafe { *out = ptr::null_mut() };
    }
    false
}

unsafe extern "thiscall" fn framework(_this: *mut c_void) -> *mut c_void {
    services::framework()
}

unsafe extern "thiscall" fn gz_com(_this: *mut c_void) -> *mut c_void {
    services::com()
}

unsafe extern "thiscall" fn get_director_id(_this: *mut c_void) -> u32 {
    DIRECTOR_ID
}

unsafe extern "thiscall" fn get_library_path(_this: *mut c_void, _path: *mut c_void) -> bool {
    false
}

unsafe extern "thiscall" fn get_heap_allocated_size(_this: *mut c_void) -> u32 {
    0
}

unsafe extern "thiscall" fn post_app_init(_this: *mut c_void) -> bool {
    let installed = install_hooks();
    let mut director = STATE.take();
    director.post_app_init(&mut HostDirector, installed);
    STATE.set(director);
    true
}

fn install_hooks() -> bool {
    if INSTALLED.load(Ordering::Relaxed) {
        return true;
    }
    let version = match module::game_version() {
        Ok(version) => version,
        Err(e) => {
            error!("Failed to detect the game version: {:#}", e);
            return false;
        }
    };

    // SAFETY: runs once on the host's main thread, before any hooked code
    // can execute; every target address lies in the game executable.
    let memory = unsafe { ProcessMemory::new() };
    let installed = bulldoze_core::install(version, memory, &hooks::entry_points());
    INSTALLED.store(installed, Ordering::Relaxed);
    installed
}

unsafe extern "thiscall" fn do_message(_this: *mut c_void, message: *mut c_void) -> bool {
    if message.is_null() {
        return true;
    }
    // SAFETY: the message server passes a live cIGZMessage2.
    let message_type = unsafe {
        let get_type: GetU32Fn = abi::vtable_fn(message, slots::MESSAGE_GET_TYPE);
        get_type(message)
    };

    // Taken out so a message sent while handling one finds a fresh state
    let mut director = STATE.take();
    director.handle_message(&mut HostDirector, message_type);
    STATE.set(director);
    true
}

/// The game services behind [`DirectorHost`].
struct HostDirector;

impl HostDirector {
    fn with_view<R>(f: impl FnOnce(*mut c_void) -> Option<R>) -> Option<R> {
        VIEW.with_borrow(|view| f(view.as_ref()?.as_ptr()))
    }

    fn set_notification(message_type: u32, slot: usize) -> bool {
        let Some(server) = services::message_server() else {
            return false;
        };
        // SAFETY: the server is alive while referenced; the target is static.
        unsafe {
            let notify: NotificationFn = server.method(slot);
            notify(server.as_ptr(), target_ptr(), message_type)
        }
    }
}

impl DirectorHost for HostDirector {
    fn add_notification(&mut self, message_type: u32) -> bool {
        Self::set_notification(message_type, slots::MESSAGE_SERVER_ADD_NOTIFICATION)
    }

    fn remove_notification(&mut self, message_type: u32) {
        Self::set_notification(message_type, slots::MESSAGE_SERVER_REMOVE_NOTIFICATION);
    }

    fn attach_view(&mut self) -> bool {
        let Some(app) = services::sc4_app() else {
            return false;
        };
        // SAFETY: windows returned by the app and its children are borrowed
        // and alive for the duration of the call; `GetChildAs` returns an
        // owned reference.
        let view = unsafe {
            let get_main_window: GetPtrFn = app.method(slots::APP_GET_MAIN_WINDOW);
            let main = get_main_window(app.as_ptr());
            if main.is_null() {
                return false;
            }
            let child_by_id: GetPtrByIdFn = abi::vtable_fn(main, slots::WIN_GET_CHILD_WINDOW_FROM_ID);
            let app_window = child_by_id(main, window_ids::SC4_APP);
            if app_window.is_null() {
                return false;
            }
            let child_as: GetInterfaceByIdFn = abi::vtable_fn(app_window, slots::WIN_GET_CHILD_AS);
            let mut out = ptr::null_mut();
            if !child_as(app_window, window_ids::SC4_VIEW3D, iids::SC4_VIEW3D_WIN, &mut out) {
                return false;
            }
            ComPtr::from_raw(out)
        };
        let found = view.is_some();
        VIEW.set(view);
        found
    }

    fn release_view(&mut self) {
        VIEW.take();
    }

    fn is_city_established(&self) -> Option<bool> {
        let app = services::sc4_app()?;
        // SAFETY: the city is borrowed from the live app.
        unsafe {
            let get_city: GetPtrFn = app.method(slots::APP_GET_CITY);
            let city = get_city(app.as_ptr());
            if city.is_null() {
                return None;
            }
            let get_established: GetBoolFn = abi::vtable_fn(city, slots::CITY_GET_ESTABLISHED);
            Some(get_established(city))
        }
    }

    fn register_key_config(&mut self, key: &ResourceKey) -> bool {
        let Some(manager) = HostResourceManager::acquire() else {
            return false;
        };
        let Some(accelerator_res) = manager.load(key, iids::WIN_KEY_ACCELERATOR_RES, true) else {
            return false;
        };
        Self::with_view(|view| {
            // SAFETY: the accelerator is borrowed from the held view.
            unsafe {
                let get_accelerator: GetPtrFn =
                    abi::vtable_fn(view, slots::VIEW3D_GET_KEY_ACCELERATOR);
                let accelerator = get_accelerator(view);
                if accelerator.is_null() {
                    return None;
                }
                let register: TakePtrFn =
                    accelerator_res.method(slots::ACCELERATOR_RES_REGISTER_RESOURCES);
                Some(register(accelerator_res.as_ptr(), accelerator))
            }
        })
        .unwrap_or(false)
    }

    fn is_bulldoze_tool_active(&self) -> bool {
        Self::with_view(|view| {
            // SAFETY: the current control is borrowed from the held view.
            unsafe {
                let get_current: GetPtrFn =
                    abi::vtable_fn(view, slots::VIEW3D_GET_CURRENT_VIEW_INPUT_CONTROL);
                let control = get_current(view);
                if control.is_null() {
                    return None;
                }
                let get_id: GetU32Fn = abi::vtable_fn(control, slots::CONTROL_GET_ID);
                Some(get_id(control) == BULLDOZE_CONTROL_ID)
            }
        })
        .unwrap_or(false)
    }

    fn activate_bulldoze_tool(&mut self, cursor: BulldozeCursor) -> bool {
        let Some(allocator) = services::allocator() else {
            return false;
        };
        let activated = Self::with_view(|view| {
            // SAFETY: the allocator and view are live host objects; the
            // constructor initializes the whole allocation before any
            // virtual call, and the reference taken here is dropped after
            // the view holds its own.
            unsafe {
                let allocate: AllocateFn = abi::vtable_fn(allocator, slots::ALLOCATOR_ALLOCATE);
                let memory = allocate(allocator, DEMOLISH_CONTROL_SIZE as u32);
                if memory.is_null() {
                    return None;
                }
                abi::demolish_control_ctor_fn()(memory);
                let control = ComPtr::from_borrowed(memory)?;

                // Init sets the game's default cursor, so the mode cursor goes after it
                let init: GetBoolFn = control.method(slots::CONTROL_INIT);
                init(control.as_ptr());
                let set_cursor: SetCursorFn = control.method(slots::CONTROL_SET_CURSOR);
                set_cursor(control.as_ptr(), cursor.id());

                let set_current: SetViewInputControlFn =
                    abi::vtable_fn(view, slots::VIEW3D_SET_CURRENT_VIEW_INPUT_CONTROL);
                Some(set_current(view, control.as_ptr(), abi::REMOVE_ALL_CONTROLS))
            }
        });
        match activated {
            Some(true) => {
                info!("Opened the bulldoze tool ({})", cursor);
                true
            }
            _ => false,
        }
    }

    fn end_session(&mut self) {
        hooks::reset();
        debug!("Bulldoze session cleared");
    }
}
