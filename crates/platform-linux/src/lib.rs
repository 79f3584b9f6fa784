//! randrbar Linux platform integration
//!
//! - **RandR:** output enumeration, bar ordering, backlight properties
//! - **X11:** x11rb-backed connection to a live X server
//! - **Display Detection:** display server detection and monitor discovery

pub mod display;
pub mod randr;
pub mod x11;

pub use display::*;
pub use randr::{
    enumerate_outputs, get_backlight_range, get_backlight_value, get_monitors, refresh_backlight,
    RandrConnection, RandrError,
};
pub use x11::X11Connection;
