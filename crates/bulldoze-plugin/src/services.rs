//! Host framework access for the director and the hooks.
//!
//! The framework hands the director its `cIGZCOM` in `InitializeCOM`; every
//! service the plugin needs is reached from there.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::abi::{self, ComPtr, GetInterfaceByIdFn, GetPtrFn, iids, services, slots};

static COM: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());
static FRAMEWORK: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

/// Remember the host COM object and its framework.
///
/// # Safety
///
/// `com` must be the live `cIGZCOM` the host passed to the director; it
/// outlives the plugin.
pub unsafe fn attach(com: *mut c_void) -> bool {
    if com.is_null() {
        return false;
    }
    // SAFETY: guaranteed by the caller.
    let framework = unsafe {
        let get_framework: GetPtrFn = abi::vtable_fn(com, slots::COM_FRAMEWORK);
        get_framework(com)
    };
    COM.store(com, Ordering::Release);
    FRAMEWORK.store(framework, Ordering::Release);
    !framework.is_null()
}

/// Borrowed `cIGZCOM`, null before `InitializeCOM`
pub fn com() -> *mut c_void {
    COM.load(Ordering::Acquire)
}

/// Borrowed `cIGZFrameWork`, null before `InitializeCOM`
pub fn framework() -> *mut c_void {
    FRAMEWORK.load(Ordering::Acquire)
}

/// `cIGZFrameWork::GetSystemService`
pub fn system_service(service_id: u32, iid: u32) -> Option<ComPtr> {
    let framework = framework();
    if framework.is_null() {
        return None;
    }
    let mut out = ptr::null_mut();
    // SAFETY: the framework lives as long as the process.
    unsafe {
        let get_service: GetInterfaceByIdFn =
            abi::vtable_fn(framework, slots::FRAMEWORK_GET_SYSTEM_SERVICE);
        if !get_service(framework, service_id, iid, &mut out) {
            return None;
        }
        ComPtr::from_raw(out)
    }
}

pub fn message_server() -> Option<ComPtr> {
    system_service(services::MESSAGE_SERVER2, iids::MESSAGE_SERVER2)
}

pub fn resource_manager() -> Option<ComPtr> {
    system_service(
        services::PERSIST_RESOURCE_MANAGER,
        iids::PERSIST_RESOURCE_MANAGER,
    )
}

/// The running `cISC4App`
pub fn sc4_app() -> Option<ComPtr> {
    let framework = framework();
    if framework.is_null() {
        return None;
    }
    // SAFETY: as above; `Application` returns a borrowed pointer.
    unsafe {
        let application: GetPtrFn = abi::vtable_fn(framework, slots::FRAMEWORK_APPLICATION);
        let app = application(framework);
        if app.is_null() {
            return None;
        }
        abi::query_interface(app, iids::SC4_APP)
    }
}

/// Borrowed `cIGZAllocatorService`
pub fn allocator() -> Option<*mut c_void> {
    let com = com();
    if com.is_null() {
        return None;
    }
    // SAFETY: the COM object lives as long as the process.
    let allocator = unsafe {
        let get_allocator: GetPtrFn = abi::vtable_fn(com, slots::COM_ALLOCATOR_SERVICE);
        get_allocator(com)
    };
    (!allocator.is_null()).then_some(allocator)
}
