//! RandR output enumeration and backlight properties.
//!
//! Everything here talks to the display server through [`RandrConnection`],
//! so it runs the same against a live X server and an in-memory fake.
//!
//! The display configuration can change between listing outputs and resolving
//! them. A vanished output or CRTC is reported as
//! [`RandrError::InvalidOutput`] / [`RandrError::InvalidCrtc`] and only drops
//! that output from the result; every other error aborts the call.

use randrbar_platform_core::{
    make_monitor, sort_monitors, BacklightRange, Monitor, MonitorOutput, OutputId,
};
use tracing::{debug, trace};

/// CRTC handle.
pub type CrtcId = u32;

/// Window handle (the root window for screen queries).
pub type WindowId = u32;

/// Property name used by current drivers.
pub const BACKLIGHT: &str = "Backlight";

/// Property name used by older drivers.
pub const LEGACY_BACKLIGHT: &str = "BACKLIGHT";

/// Errors returned by a [`RandrConnection`].
#[derive(Debug, thiserror::Error)]
pub enum RandrError {
    #[error("output {0:#x} no longer exists")]
    InvalidOutput(OutputId),

    #[error("crtc {0:#x} no longer exists")]
    InvalidCrtc(CrtcId),

    #[error("X server does not support the RandR extension")]
    MissingExtension,

    #[error("failed to connect to the X server: {0}")]
    Connect(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl RandrError {
    /// Whether the error means a resource disappeared under a
    /// concurrent reconfiguration.
    pub fn is_resource_gone(&self) -> bool {
        matches!(self, Self::InvalidOutput(_) | Self::InvalidCrtc(_))
    }
}

impl From<RandrError> for randrbar_common::RandrbarError {
    fn from(err: RandrError) -> Self {
        let message = err.to_string();
        match err {
            RandrError::MissingExtension => Self::unsupported(message),
            _ => Self::platform(message),
        }
    }
}

/// Connection state reported for an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

/// Screen resources of a root window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenResources {
    pub outputs: Vec<OutputId>,
}

/// Output info reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub connection: ConnectionState,
    pub crtc: CrtcId,
    /// Raw connector name bytes.
    pub name: Vec<u8>,
}

/// CRTC info reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrtcInfo {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

/// Reply to an output property query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Whether `valid_values` describes a `[min, max]` range.
    pub range: bool,
    pub valid_values: Vec<u32>,
}

impl PropertyInfo {
    pub fn length(&self) -> usize {
        self.valid_values.len()
    }

    /// `(min, max)` when the reply is a range of exactly two values.
    pub fn as_range(&self) -> Option<(u32, u32)> {
        match (self.range, self.valid_values.as_slice()) {
            (true, &[min, max]) => Some((min, max)),
            _ => None,
        }
    }
}

/// Parameters of an output property read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRequest {
    /// Property type to accept. `None` accepts any type.
    pub type_filter: Option<String>,
    /// Offset into the value, in 32-bit units.
    pub offset: u32,
    /// Length to read, in 32-bit units.
    pub length: u32,
    pub delete: bool,
    pub pending: bool,
}

impl PropertyRequest {
    /// Untyped read of the first `length` units, no delete, no pending.
    pub fn first(length: u32) -> Self {
        Self {
            type_filter: None,
            offset: 0,
            length,
            delete: false,
            pending: false,
        }
    }
}

/// Current value of an output property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyValue {
    /// Item count announced by the server.
    pub num_items: u32,
    /// Decoded items, widened to `u32`.
    pub data: Vec<u32>,
}

impl PropertyValue {
    /// First item, if the server announced one and it was actually decoded.
    pub fn first(&self) -> Option<u32> {
        if self.num_items == 0 {
            return None;
        }
        self.data.first().copied()
    }
}

/// Requests this crate needs from the display server.
///
/// Calls block until the server replies. Callers serialize access.
pub trait RandrConnection {
    fn get_screen_resources(&self, root: WindowId) -> Result<ScreenResources, RandrError>;

    /// Fails with [`RandrError::InvalidOutput`] if the output no longer exists.
    fn get_output_info(&self, output: OutputId) -> Result<OutputInfo, RandrError>;

    /// Fails with [`RandrError::InvalidCrtc`] if the CRTC no longer exists.
    fn get_crtc_info(&self, crtc: CrtcId) -> Result<CrtcInfo, RandrError>;

    fn query_output_property(
        &self,
        output: OutputId,
        property: &str,
    ) -> Result<PropertyInfo, RandrError>;

    fn get_output_property(
        &self,
        output: OutputId,
        property: &str,
        request: &PropertyRequest,
    ) -> Result<PropertyValue, RandrError>;
}

/// Resolve one output into a monitor record.
///
/// `Ok(None)` means the output is not connected.
fn resolve_output<C: RandrConnection + ?Sized>(
    conn: &C,
    output: OutputId,
) -> Result<Option<Monitor>, RandrError> {
    let info = conn.get_output_info(output)?;
    if info.connection != ConnectionState::Connected {
        return Ok(None);
    }

    let crtc = conn.get_crtc_info(info.crtc)?;
    let name = String::from_utf8_lossy(&info.name).into_owned();

    Ok(Some(make_monitor(
        output,
        name,
        i32::from(crtc.width),
        i32::from(crtc.height),
        i32::from(crtc.x),
        i32::from(crtc.y),
    )))
}

/// List connected outputs of `root` in the order the server reports them.
pub fn enumerate_outputs<C: RandrConnection + ?Sized>(
    conn: &C,
    root: WindowId,
) -> Result<Vec<Monitor>, RandrError> {
    let resources = conn.get_screen_resources(root)?;
    let mut monitors = Vec::with_capacity(resources.outputs.len());

    for output in resources.outputs {
        match resolve_output(conn, output) {
            Ok(Some(monitor)) => {
                trace!(
                    output,
                    name = %monitor.name,
                    "{}x{}+{}+{}",
                    monitor.width,
                    monitor.height,
                    monitor.x,
                    monitor.y
                );
                monitors.push(monitor);
            }
            Ok(None) => debug!(output, "Skipping disconnected output"),
            Err(e) if e.is_resource_gone() => debug!(output, "Skipping output: {e}"),
            Err(e) => return Err(e),
        }
    }

    Ok(monitors)
}

/// List connected outputs of `root`, ordered the way lemonbar orders them.
pub fn get_monitors<C: RandrConnection + ?Sized>(
    conn: &C,
    root: WindowId,
) -> Result<Vec<Monitor>, RandrError> {
    let mut monitors = enumerate_outputs(conn, root)?;
    sort_monitors(&mut monitors);
    Ok(monitors)
}

/// Read the backlight range of `monitor` into its `min`/`max`.
///
/// Falls back to the legacy property name. Leaves the stored values alone
/// when neither name yields a two-value range.
pub fn get_backlight_range<C: RandrConnection + ?Sized>(
    conn: &C,
    monitor: &MonitorOutput,
) -> Result<(), RandrError> {
    let mut reply = conn.query_output_property(monitor.output, BACKLIGHT)?;
    if reply.as_range().is_none() {
        debug!(output = monitor.output, "No {BACKLIGHT} range, trying {LEGACY_BACKLIGHT}");
        reply = conn.query_output_property(monitor.output, LEGACY_BACKLIGHT)?;
    }

    let Some((min, max)) = reply.as_range() else {
        debug!(
            output = monitor.output,
            range = reply.range,
            length = reply.length(),
            "Output has no backlight range"
        );
        return Ok(());
    };

    monitor.set_backlight(BacklightRange {
        min,
        max,
        ..monitor.backlight()
    });
    Ok(())
}

/// Read the current backlight value of `monitor` into its `val`.
///
/// Falls back to the legacy property name. Leaves the stored value alone
/// when neither name returns an item.
pub fn get_backlight_value<C: RandrConnection + ?Sized>(
    conn: &C,
    monitor: &MonitorOutput,
) -> Result<(), RandrError> {
    let request = PropertyRequest::first(4);

    let mut reply = conn.get_output_property(monitor.output, BACKLIGHT, &request)?;
    if reply.num_items == 0 {
        debug!(output = monitor.output, "No {BACKLIGHT} value, trying {LEGACY_BACKLIGHT}");
        reply = conn.get_output_property(monitor.output, LEGACY_BACKLIGHT, &request)?;
    }

    let Some(val) = reply.first() else {
        debug!(
            output = monitor.output,
            num_items = reply.num_items,
            "Output has no backlight value"
        );
        return Ok(());
    };

    monitor.set_backlight(BacklightRange {
        val,
        ..monitor.backlight()
    });
    Ok(())
}

/// Refresh range and current value of `monitor`.
pub fn refresh_backlight<C: RandrConnection + ?Sized>(
    conn: &C,
    monitor: &MonitorOutput,
) -> Result<BacklightRange, RandrError> {
    get_backlight_range(conn, monitor)?;
    get_backlight_value(conn, monitor)?;
    Ok(monitor.backlight())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeServer {
        outputs: Vec<OutputId>,
        infos: HashMap<OutputId, OutputInfo>,
        broken: HashSet<OutputId>,
        crtcs: HashMap<CrtcId, CrtcInfo>,
        ranges: HashMap<(OutputId, &'static str), PropertyInfo>,
        values: HashMap<(OutputId, &'static str), PropertyValue>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeServer {
        fn connected(&mut self, output: OutputId, crtc: CrtcId, name: &str, geom: CrtcInfo) {
            self.outputs.push(output);
            self.infos.insert(
                output,
                OutputInfo {
                    connection: ConnectionState::Connected,
                    crtc,
                    name: name.as_bytes().to_vec(),
                },
            );
            self.crtcs.insert(crtc, geom);
        }
    }

    impl RandrConnection for FakeServer {
        fn get_screen_resources(&self, _root: WindowId) -> Result<ScreenResources, RandrError> {
            Ok(ScreenResources {
                outputs: self.outputs.clone(),
            })
        }

        fn get_output_info(&self, output: OutputId) -> Result<OutputInfo, RandrError> {
            if self.broken.contains(&output) {
                return Err(RandrError::Connection("broken pipe".to_string()));
            }
            self.infos
                .get(&output)
                .cloned()
                .ok_or(RandrError::InvalidOutput(output))
        }

        fn get_crtc_info(&self, crtc: CrtcId) -> Result<CrtcInfo, RandrError> {
            self.crtcs
                .get(&crtc)
                .copied()
                .ok_or(RandrError::InvalidCrtc(crtc))
        }

        fn query_output_property(
            &self,
            output: OutputId,
            property: &str,
        ) -> Result<PropertyInfo, RandrError> {
            self.requests.borrow_mut().push(format!("query {property}"));
            Ok(self
                .ranges
                .iter()
                .find(|((o, p), _)| *o == output && *p == property)
                .map(|(_, r)| r.clone())
                .unwrap_or_default())
        }

        fn get_output_property(
            &self,
            output: OutputId,
            property: &str,
            request: &PropertyRequest,
        ) -> Result<PropertyValue, RandrError> {
            assert_eq!(request, &PropertyRequest::first(4));
            self.requests.borrow_mut().push(format!("get {property}"));
            Ok(self
                .values
                .iter()
                .find(|((o, p), _)| *o == output && *p == property)
                .map(|(_, v)| v.clone())
                .unwrap_or_default())
        }
    }

    fn geom(x: i16, y: i16, width: u16, height: u16) -> CrtcInfo {
        CrtcInfo {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn disconnected_outputs_are_excluded() {
        let mut server = FakeServer::default();
        server.connected(1, 10, "eDP-1", geom(0, 0, 1920, 1080));
        for (output, state) in [
            (2, ConnectionState::Disconnected),
            (3, ConnectionState::Unknown),
        ] {
            server.outputs.push(output);
            server.infos.insert(
                output,
                OutputInfo {
                    connection: state,
                    crtc: 10,
                    name: b"ghost".to_vec(),
                },
            );
        }

        let monitors = enumerate_outputs(&server, 0).unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].name, "eDP-1");
    }

    #[test]
    fn vanished_resources_skip_only_that_output() {
        let mut server = FakeServer::default();
        server.connected(1, 10, "DP-1", geom(0, 0, 1920, 1080));
        // Output listed but gone by the time it is resolved.
        server.outputs.push(2);
        // Output whose CRTC went away.
        server.outputs.push(3);
        server.infos.insert(
            3,
            OutputInfo {
                connection: ConnectionState::Connected,
                crtc: 99,
                name: b"DP-3".to_vec(),
            },
        );
        server.connected(4, 40, "HDMI-1", geom(1920, 0, 1280, 1024));

        let monitors = enumerate_outputs(&server, 0).unwrap();
        let names: Vec<_> = monitors.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["DP-1", "HDMI-1"]);
    }

    #[test]
    fn connection_errors_propagate() {
        let mut server = FakeServer::default();
        server.connected(1, 10, "DP-1", geom(0, 0, 1920, 1080));
        server.outputs.push(2);
        server.broken.insert(2);

        let err = enumerate_outputs(&server, 0).unwrap_err();
        assert!(matches!(err, RandrError::Connection(_)));
    }

    #[test]
    fn geometry_comes_from_the_crtc() {
        let mut server = FakeServer::default();
        server.connected(7, 70, "eDP-1", geom(-1366, 200, 1366, 768));

        let monitors = enumerate_outputs(&server, 0).unwrap();
        let mon = &monitors[0];
        assert_eq!(mon.output, 7);
        assert_eq!((mon.width, mon.height, mon.x, mon.y), (1366, 768, -1366, 200));
    }

    #[test]
    fn invalid_utf8_names_are_decoded_lossily() {
        let mut server = FakeServer::default();
        server.connected(1, 10, "x", geom(0, 0, 10, 10));
        server.infos.insert(
            1,
            OutputInfo {
                connection: ConnectionState::Connected,
                crtc: 10,
                name: vec![b'D', b'P', 0xff],
            },
        );

        let monitors = enumerate_outputs(&server, 0).unwrap();
        assert_eq!(monitors[0].name, "DP\u{fffd}");
    }

    #[test]
    fn get_monitors_sorts_discovery_order() {
        let mut server = FakeServer::default();
        server.connected(1, 10, "C", geom(0, 150, 100, 100));
        server.connected(2, 20, "B", geom(150, 0, 100, 100));
        server.connected(3, 30, "A", geom(0, 0, 100, 100));

        let discovered = enumerate_outputs(&server, 0).unwrap();
        assert_eq!(discovered[0].name, "C");

        let mut sorted = get_monitors(&server, 0).unwrap();
        let names: Vec<String> = sorted.iter().map(|m| m.name.clone()).collect();
        assert_eq!(names[0], "A");

        sort_monitors(&mut sorted);
        let resorted: Vec<String> = sorted.iter().map(|m| m.name.clone()).collect();
        assert_eq!(resorted, names);
    }

    #[test]
    fn range_falls_back_to_legacy_name() {
        let mut server = FakeServer::default();
        server.ranges.insert(
            (1, BACKLIGHT),
            PropertyInfo {
                range: true,
                valid_values: vec![0, 10, 20],
            },
        );
        server.ranges.insert(
            (1, LEGACY_BACKLIGHT),
            PropertyInfo {
                range: true,
                valid_values: vec![5, 1000],
            },
        );
        let mon = MonitorOutput::new(1, "eDP-1", 1920, 1080, 0, 0);

        get_backlight_range(&server, &mon).unwrap();
        assert_eq!(mon.backlight().min, 5);
        assert_eq!(mon.backlight().max, 1000);
    }

    #[test]
    fn non_range_reply_leaves_min_max_unchanged() {
        let mut server = FakeServer::default();
        for name in [BACKLIGHT, LEGACY_BACKLIGHT] {
            server.ranges.insert(
                (1, name),
                PropertyInfo {
                    range: false,
                    valid_values: vec![0, 255],
                },
            );
        }
        let mon = MonitorOutput::new(1, "eDP-1", 1920, 1080, 0, 0);
        let before = BacklightRange {
            min: 3,
            max: 9,
            val: 4,
        };
        mon.set_backlight(before);

        get_backlight_range(&server, &mon).unwrap();
        assert_eq!(mon.backlight(), before);
    }

    #[test]
    fn preferred_name_wins_without_fallback() {
        let mut server = FakeServer::default();
        server.ranges.insert(
            (1, BACKLIGHT),
            PropertyInfo {
                range: true,
                valid_values: vec![0, 937],
            },
        );
        server.values.insert(
            (1, BACKLIGHT),
            PropertyValue {
                num_items: 1,
                data: vec![400],
            },
        );
        let mon = MonitorOutput::new(1, "eDP-1", 1920, 1080, 0, 0);

        let range = refresh_backlight(&server, &mon).unwrap();
        assert_eq!(
            range,
            BacklightRange {
                min: 0,
                max: 937,
                val: 400
            }
        );
        assert_eq!(
            *server.requests.borrow(),
            vec!["query Backlight".to_string(), "get Backlight".to_string()]
        );
    }

    #[test]
    fn value_falls_back_to_legacy_name() {
        let mut server = FakeServer::default();
        server.values.insert(
            (1, LEGACY_BACKLIGHT),
            PropertyValue {
                num_items: 1,
                data: vec![77],
            },
        );
        let mon = MonitorOutput::new(1, "LVDS-1", 1280, 800, 0, 0);

        get_backlight_value(&server, &mon).unwrap();
        assert_eq!(mon.backlight().val, 77);
        assert_eq!(
            *server.requests.borrow(),
            vec!["get Backlight".to_string(), "get BACKLIGHT".to_string()]
        );
    }

    #[test]
    fn empty_value_replies_leave_val_unchanged() {
        let server = FakeServer::default();
        let mon = MonitorOutput::new(1, "DP-1", 1920, 1080, 0, 0);
        mon.set_backlight(BacklightRange {
            min: 0,
            max: 10,
            val: 6,
        });

        get_backlight_value(&server, &mon).unwrap();
        assert_eq!(mon.backlight().val, 6);
    }

    #[test]
    fn announced_items_without_data_are_ignored() {
        let mut server = FakeServer::default();
        server.values.insert(
            (1, BACKLIGHT),
            PropertyValue {
                num_items: 1,
                data: Vec::new(),
            },
        );
        let mon = MonitorOutput::new(1, "eDP-1", 1920, 1080, 0, 0);

        get_backlight_value(&server, &mon).unwrap();
        assert_eq!(mon.backlight().val, 0);
    }

    #[test]
    fn resource_gone_classification() {
        assert!(RandrError::InvalidOutput(1).is_resource_gone());
        assert!(RandrError::InvalidCrtc(1).is_resource_gone());
        assert!(!RandrError::MissingExtension.is_resource_gone());
        assert!(!RandrError::Connection("eof".to_string()).is_resource_gone());
    }
}
