//! List monitors in bar order.

use randrbar_common::AppConfig;
use randrbar_platform_core::MonitorOutput;

pub fn run(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let monitors = randrbar_platform_linux::detect_monitors(config)?;

    if json {
        let records: Vec<&MonitorOutput> = monitors.iter().map(|m| &**m).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for (index, m) in monitors.iter().enumerate() {
        let backlight = m.backlight();
        let level = match backlight.percent() {
            Some(pct) if config.backlight => format!(
                "backlight {}/{} [{}..{}] {pct}%",
                backlight.val, backlight.max, backlight.min, backlight.max
            ),
            _ => "no backlight".to_string(),
        };
        println!(
            "{index}: {} {}x{}+{}+{} (output {:#x}) {level}",
            m.name, m.width, m.height, m.x, m.y, m.output
        );
    }

    Ok(())
}
