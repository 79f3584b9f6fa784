//! Monitor records produced by output enumeration.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Protocol-level output handle. Stable for the lifetime of a connection.
pub type OutputId = u32;

/// Shared handle to a monitor record.
///
/// Layout and rendering code keep these around independently of the
/// enumeration that produced them.
pub type Monitor = Rc<MonitorOutput>;

/// Legal range and current reading of an output's backlight property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BacklightRange {
    pub min: u32,
    pub max: u32,
    pub val: u32,
}

impl BacklightRange {
    /// Whether a usable range has been read (`max > min`).
    pub fn is_supported(&self) -> bool {
        self.max > self.min
    }

    /// Current value as a percentage of the range, if the range is usable.
    pub fn percent(&self) -> Option<u8> {
        if !self.is_supported() {
            return None;
        }
        let span = u64::from(self.max - self.min);
        let offset = u64::from(self.val.clamp(self.min, self.max) - self.min);
        Some(((offset * 100 + span / 2) / span) as u8)
    }
}

/// One connected display output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorOutput {
    /// Output handle the record was built from.
    pub output: OutputId,

    /// Connector name (e.g. "eDP-1", "HDMI-2").
    pub name: String,

    /// Geometry from the output's CRTC. Zero when the CRTC is unset.
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,

    backlight: Cell<BacklightRange>,
}

impl MonitorOutput {
    pub fn new(
        output: OutputId,
        name: impl Into<String>,
        width: i32,
        height: i32,
        x: i32,
        y: i32,
    ) -> Self {
        Self {
            output,
            name: name.into(),
            width,
            height,
            x,
            y,
            backlight: Cell::new(BacklightRange::default()),
        }
    }

    /// Last backlight reading stored on this record.
    pub fn backlight(&self) -> BacklightRange {
        self.backlight.get()
    }

    /// Replace the stored backlight reading. Works through a shared handle.
    pub fn set_backlight(&self, range: BacklightRange) {
        self.backlight.set(range);
    }

    /// Whether the point lies inside this monitor (right/bottom edges excluded).
    pub fn contains_point(&self, px: i32, py: i32) -> bool {
        let (px, py) = (i64::from(px), i64::from(py));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        px >= x && py >= y && px < x + i64::from(self.width) && py < y + i64::from(self.height)
    }
}

impl AsRef<MonitorOutput> for MonitorOutput {
    fn as_ref(&self) -> &MonitorOutput {
        self
    }
}

/// Build a shared monitor record.
pub fn make_monitor(
    output: OutputId,
    name: impl Into<String>,
    width: i32,
    height: i32,
    x: i32,
    y: i32,
) -> Monitor {
    Rc::new(MonitorOutput::new(output, name, width, height, x, y))
}

/// Compute virtual desktop bounds that include all given monitors.
/// Returns `(min_x, min_y, width, height)`, or `None` for an empty slice.
pub fn virtual_desktop_bounds<M: AsRef<MonitorOutput>>(
    monitors: &[M],
) -> Option<(i32, i32, u32, u32)> {
    let first = monitors.first()?.as_ref();
    let mut min_x = i64::from(first.x);
    let mut min_y = i64::from(first.y);
    let mut max_x = min_x + i64::from(first.width);
    let mut max_y = min_y + i64::from(first.height);

    for m in monitors.iter().skip(1).map(AsRef::as_ref) {
        min_x = min_x.min(i64::from(m.x));
        min_y = min_y.min(i64::from(m.y));
        max_x = max_x.max(i64::from(m.x) + i64::from(m.width));
        max_y = max_y.max(i64::from(m.y) + i64::from(m.height));
    }

    let width = (max_x - min_x).clamp(0, i64::from(u32::MAX)) as u32;
    let height = (max_y - min_y).clamp(0, i64::from(u32::MAX)) as u32;
    Some((min_x as i32, min_y as i32, width, height))
}
