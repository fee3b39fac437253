//! C interface around [Bridge] for native host applications.
//!
//! The host creates an opaque handle, drives it through initialize, render and cleanup,
//! and finally destroys it. Null handles are ignored everywhere.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::bridge::{Bridge, BridgeParams};

pub const TRACER_OK: c_int = 0;
pub const TRACER_CONFIG_ERROR: c_int = 1;
pub const TRACER_ERROR: c_int = 2;
pub const TRACER_INVALID_ARGUMENT: c_int = -1;

/// Initialization options, string fields may be null to use their default.
#[repr(C)]
pub struct TracerInitParams {
    pub width: c_int,
    pub height: c_int,
    pub filepath: *const c_char,
    pub samples: c_int,
    pub threads: c_int,
    pub shading_system: *const c_char,
    pub use_auto_tile: bool,
    pub tile_size: c_int,
    pub background: bool,
    pub quiet: bool,
    pub use_profiling: bool,
    pub device: *const c_char,
    pub output_path: *const c_char,
}

pub struct TracerBridge {
    bridge: Bridge,
}

/// # Safety
/// `ptr` must be null or point to a nul-terminated string.
unsafe fn string_or(ptr: *const c_char, default: &str) -> String {
    if ptr.is_null() {
        default.to_owned()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

impl TracerInitParams {
    /// # Safety
    /// Every non-null string field must point to a nul-terminated string.
    unsafe fn to_bridge_params(&self) -> BridgeParams {
        let defaults = BridgeParams::default();
        BridgeParams {
            width: u32::try_from(self.width).unwrap_or(0),
            height: u32::try_from(self.height).unwrap_or(0),
            filepath: string_or(self.filepath, &defaults.filepath),
            samples: self.samples,
            threads: usize::try_from(self.threads).unwrap_or(0),
            shading_system: string_or(self.shading_system, &defaults.shading_system),
            use_auto_tile: self.use_auto_tile,
            tile_size: u32::try_from(self.tile_size).unwrap_or(0),
            background: self.background,
            quiet: self.quiet,
            use_profiling: self.use_profiling,
            device: string_or(self.device, &defaults.device),
            output_path: string_or(self.output_path, &defaults.output_path),
        }
    }
}

#[no_mangle]
pub extern "C" fn tracer_bridge_create() -> *mut TracerBridge {
    match catch_unwind(|| Box::new(TracerBridge { bridge: Bridge::new() })) {
        Ok(handle) => Box::into_raw(handle),
        Err(_) => std::ptr::null_mut(),
    }
}

/// # Safety
/// `handle` must be null or come from [tracer_bridge_create], `params` must be null or
/// point to a valid [TracerInitParams].
#[no_mangle]
pub unsafe extern "C" fn tracer_bridge_initialize(handle: *mut TracerBridge, params: *const TracerInitParams) -> c_int {
    let (Some(handle), Some(params)) = (handle.as_mut(), params.as_ref()) else {
        return TRACER_INVALID_ARGUMENT;
    };
    let params = params.to_bridge_params();

    let result = catch_unwind(AssertUnwindSafe(|| handle.bridge.initialize(&params)));
    match result {
        Ok(Ok(())) => TRACER_OK,
        Ok(Err(e)) if e.is_config() => TRACER_CONFIG_ERROR,
        Ok(Err(_)) => TRACER_ERROR,
        Err(_) => {
            error!("panic during initialization");
            TRACER_ERROR
        }
    }
}

/// # Safety
/// `handle` must be null or come from [tracer_bridge_create].
#[no_mangle]
pub unsafe extern "C" fn tracer_bridge_render(handle: *mut TracerBridge) {
    if let Some(handle) = handle.as_mut() {
        if catch_unwind(AssertUnwindSafe(|| handle.bridge.render())).is_err() {
            error!("panic during render");
        }
    }
}

/// # Safety
/// `handle` must be null or come from [tracer_bridge_create].
#[no_mangle]
pub unsafe extern "C" fn tracer_bridge_cleanup(handle: *mut TracerBridge) {
    if let Some(handle) = handle.as_mut() {
        if catch_unwind(AssertUnwindSafe(|| handle.bridge.cleanup())).is_err() {
            error!("panic during cleanup");
        }
    }
}

/// # Safety
/// `handle` must be null or come from [tracer_bridge_create], and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn tracer_bridge_destroy(handle: *mut TracerBridge) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}
