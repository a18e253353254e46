//! # bulldoze-core
//!
//! Core library of the SimCity 4 bulldoze extensions plugin.
//!
//! This crate provides:
//! - Inline patching of the host executable (jump, call, table entry, byte)
//! - The memory layout of the host's demolish input control
//! - Bulldoze tool modes: occupant filters, diagonal selection and thickness
//! - Highlight color resolution from exemplar properties
//! - The director's city lifecycle and shortcut handling
//! - Plugin configuration and log file setup
//!
//! Nothing here touches the host directly except `patch::ProcessMemory`
//! (Windows only) and [`host::ControlView::from_ptr`]. The plugin crate
//! supplies the host objects through the traits in [`host`], [`filter`] and
//! [`colors`].

pub mod colors;
pub mod config;
pub mod director;
pub mod error;
pub mod filter;
pub mod host;
pub mod install;
pub mod logging;
pub mod patch;
pub mod region;
pub mod tool;

pub use colors::{
    Color, HighlightColorKind, HighlightColors, PropertyHolder, PropertyValue, ResourceKey,
    ResourceManager,
};
pub use config::{PluginConfig, PluginPaths};
pub use director::{Director, DirectorHost, DirectorMessage};
pub use error::{Error, Result};
pub use filter::{
    AcceptAllFilter, DezoneKeepNetworksFilter, FloraFilter, KeepNetworksFilter, LotManager,
    NetworkFilter, NetworkTypeFlags, Occupant, OccupantFilter, OccupantFilterKind, ZoneType,
};
pub use host::{
    BULLDOZE_CONTROL_ID, BulldozeCursor, ComObject, ControlView, DemolishControl,
    DemolishControlLayout, Demolition, ModifierKeys, SUPPORTED_GAME_VERSION,
};
pub use install::{HookEntryPoints, install};
pub use logging::{init_file_logging, log_header};
pub use patch::{PatchDescriptor, PatchKind, PatchMemory, Patcher};
pub use region::{CellPoint, CellRect, CellRegion, CellSelection, Thickness, overwrite_selection};
pub use tool::{DemolishSession, KeyBindings, ToolMode, route_demolish_region};
