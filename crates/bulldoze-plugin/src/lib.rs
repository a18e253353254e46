//! # sc4_bulldoze_extensions
//!
//! SimCity 4 plugin DLL that extends the bulldoze tool.
//!
//! The game's DLL loader asks for the plugin's COM director through
//! `GZDllGetGZCOMDirector` (also exported as `RZGetCOMDllDirector`). The
//! first request reads the config and opens the log file next to the DLL.
//! The director then:
//!
//! - patches the demolish control's hooks into the executable once the
//!   application is initialized,
//! - follows the city lifecycle to register the bulldoze shortcuts,
//! - opens the bulldoze tool when one of them is pressed.
//!
//! All of it is specific to the 32-bit Windows game; on any other target
//! this crate is empty.

#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod abi;
#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod adapters;
#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod director;
#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod hooks;
#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod module;
#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod services;

#[cfg(all(target_os = "windows", target_arch = "x86"))]
mod entry {
    use std::ffi::c_void;
    use std::sync::Once;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Context, Result};
    use bulldoze_core::{PluginConfig, PluginPaths, init_file_logging, log_header};
    use tracing::{error, info};
    use windows::Win32::Foundation::{BOOL, HINSTANCE, HMODULE, TRUE};
    use windows::Win32::System::SystemServices::DLL_PROCESS_ATTACH;

    use crate::{director, hooks, module};

    static MODULE: AtomicUsize = AtomicUsize::new(0);
    static INIT: Once = Once::new();

    #[unsafe(no_mangle)]
    extern "system" fn DllMain(instance: HINSTANCE, reason: u32, _reserved: *mut c_void) -> BOOL {
        if reason == DLL_PROCESS_ATTACH {
            MODULE.store(instance.0 as usize, Ordering::Relaxed);
        }
        TRUE
    }

    /// Config and log file, both next to this DLL.
    fn initialize() -> Result<()> {
        let this_module = HMODULE(MODULE.load(Ordering::Relaxed) as *mut c_void);
        let paths = PluginPaths::for_module(module::module_path(this_module)?)?;

        // The log level comes from the config, so its load is reported below
        let config = PluginConfig::load_or_default(&paths.config);

        init_file_logging(
            &paths.log,
            &config.log.level,
            &log_header(env!("CARGO_PKG_VERSION")),
        )
        .context("Failed to open the log file")?;
        info!("Config file: {}", paths.config.display());

        let bindings = config.key_bindings()?;
        info!("Key bindings: {}", bindings);
        hooks::set_key_bindings(bindings);
        Ok(())
    }

    fn get_director() -> *mut c_void {
        INIT.call_once(|| {
            if let Err(e) = initialize() {
                // The log may not be open; this reaches it only if it is
                error!("Plugin initialization failed: {:#}", e);
            }
        });
        director::director_ptr()
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn GZDllGetGZCOMDirector() -> *mut c_void {
        get_director()
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn RZGetCOMDllDirector() -> *mut c_void {
        get_director()
    }
}
