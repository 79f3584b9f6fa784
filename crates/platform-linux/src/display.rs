//! Display server detection and monitor discovery.

use randrbar_common::{AppConfig, RandrbarResult};
use randrbar_platform_core::{DisplayServer, Monitor};

use crate::randr::{get_monitors, refresh_backlight};
use crate::x11::X11Connection;

/// Detect connected monitors through RandR, in bar order.
///
/// Backlight range and value are read as well when `config.backlight` is set.
pub fn detect_monitors(config: &AppConfig) -> RandrbarResult<Vec<Monitor>> {
    tracing::debug!(display = ?config.display, "Detecting monitors");

    let conn = X11Connection::connect(config.display.as_deref())?;
    let monitors = get_monitors(&conn, conn.root())?;

    if config.backlight {
        for monitor in &monitors {
            match refresh_backlight(&conn, monitor) {
                Ok(_) => {}
                Err(e) if e.is_resource_gone() => {
                    tracing::debug!(output = monitor.output, "Backlight not read: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    tracing::debug!("Found {} monitor(s)", monitors.len());
    Ok(monitors)
}

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    display_server_from(
        std::env::var_os("WAYLAND_DISPLAY").is_some(),
        std::env::var_os("DISPLAY").is_some(),
    )
}

fn display_server_from(wayland: bool, x11: bool) -> DisplayServer {
    if wayland {
        DisplayServer::Wayland
    } else if x11 {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}
