//! Reference counted objects handed to the host as `cIGZUnknown` interfaces.

use std::ffi::c_void;

/// Heap object shared with the host.
///
/// The vtable pointer comes first so a `*mut ComObject` is also a valid
/// interface pointer. The object frees itself when the last reference is
/// released.
#[repr(C)]
pub struct ComObject<V: 'static, T> {
    vtable: &'static V,
    ref_count: u32,
    value: T,
}

impl<V, T> ComObject<V, T> {
    /// Heap object holding one reference.
    pub fn into_raw(vtable: &'static V, value: T) -> *mut Self {
        Box::into_raw(Box::new(Self {
            vtable,
            ref_count: 1,
            value,
        }))
    }

    /// # Safety
    ///
    /// `this` must come from [`into_raw`](Self::into_raw) and still be alive.
    pub unsafe fn add_ref(this: *mut Self) -> u32 {
        // SAFETY: guaranteed by the caller.
        unsafe {
            (*this).ref_count += 1;
            (*this).ref_count
        }
    }

    /// Drop one reference, freeing the object at zero.
    ///
    /// # Safety
    ///
    /// `this` must come from [`into_raw`](Self::into_raw) and the caller
    /// must own one of its references.
    pub unsafe fn release(this: *mut Self) -> u32 {
        // SAFETY: guaranteed by the caller.
        unsafe {
            (*this).ref_count -= 1;
            let remaining = (*this).ref_count;
            if remaining == 0 {
                drop(Box::from_raw(this));
            }
            remaining
        }
    }

    /// `QueryInterface`: hands out `this` with a new reference when `iid`
    /// is one of `supported`, otherwise writes null.
    ///
    /// # Safety
    ///
    /// `this` must be alive and `out` null or writable.
    pub unsafe fn query_interface(
        this: *mut Self,
        iid: u32,
        supported: &[u32],
        out: *mut *mut c_void,
    ) -> bool {
        if out.is_null() {
            return false;
        }
        // SAFETY: guaranteed by the caller.
        unsafe {
            if supported.contains(&iid) {
                Self::add_ref(this);
                *out = this.cast();
                true
            } else {
                *out = std::ptr::null_mut();
                false
            }
        }
    }

    /// # Safety
    ///
    /// `this` must stay alive for `'a`.
    pub unsafe fn value<'a>(this: *const Self) -> &'a T {
        // SAFETY: guaranteed by the caller.
        unsafe { &(*this).value }
    }

    /// # Safety
    ///
    /// `this` must be alive.
    pub unsafe fn ref_count(this: *const Self) -> u32 {
        // SAFETY: guaranteed by the caller.
        unsafe { (*this).ref_count }
    }
}
