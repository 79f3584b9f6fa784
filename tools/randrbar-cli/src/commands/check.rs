//! Check display server and RandR availability.

use randrbar_common::AppConfig;
use randrbar_platform_core::{virtual_desktop_bounds, DisplayServer};
use randrbar_platform_linux::detect_display_server;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("randrbar System Check");
    println!("{}", "=".repeat(50));

    match detect_display_server() {
        DisplayServer::Wayland => println!("[WARN] Display server: Wayland (RandR via XWayland only)"),
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        DisplayServer::Unknown => println!("[WARN] Display server: Unknown"),
    }

    let monitors = match randrbar_platform_linux::detect_monitors(config) {
        Ok(monitors) => monitors,
        Err(e) => {
            println!("[FAIL] RandR: {e}");
            return Ok(());
        }
    };

    println!("[OK] Monitors detected: {}", monitors.len());
    for m in &monitors {
        println!(
            "     {} {}x{}+{}+{}{}",
            m.name,
            m.width,
            m.height,
            m.x,
            m.y,
            if m.backlight().is_supported() {
                " (backlight)"
            } else {
                ""
            }
        );
    }
    if let Some((x, y, w, h)) = virtual_desktop_bounds(&monitors) {
        println!("     virtual desktop: {w}x{h}+{x}+{y}");
    }

    Ok(())
}
