//! randrbar platform core contracts.
//!
//! Platform-neutral monitor records and the ordering bars use to map
//! segments onto monitors. Backends in other crates produce these records.

pub mod monitor;
pub mod ordering;

pub use monitor::{
    make_monitor, virtual_desktop_bounds, BacklightRange, Monitor, MonitorOutput, OutputId,
};
pub use ordering::{compare_monitors, sort_monitors};

/// Display server / platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    #[default]
    Unknown,
}
