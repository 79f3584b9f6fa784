//! [`RandrConnection`] over an x11rb connection to a live X server.

use std::cell::RefCell;
use std::collections::HashMap;

use randrbar_platform_core::OutputId;
use x11rb::connection::{Connection as _, RequestConnection as _};
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{Atom, ConnectionExt as _};
use x11rb::protocol::ErrorKind;
use x11rb::rust_connection::RustConnection;

use crate::randr::{
    ConnectionState, CrtcId, CrtcInfo, OutputInfo, PropertyInfo, PropertyRequest, PropertyValue,
    RandrConnection, RandrError, ScreenResources, WindowId,
};

impl From<ConnectionError> for RandrError {
    fn from(err: ConnectionError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<ReplyError> for RandrError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::X11Error(e) if matches!(e.error_kind, ErrorKind::RandrBadOutput) => {
                Self::InvalidOutput(e.bad_value)
            }
            ReplyError::X11Error(e) if matches!(e.error_kind, ErrorKind::RandrBadCrtc) => {
                Self::InvalidCrtc(e.bad_value)
            }
            ReplyError::X11Error(e) => Self::Connection(format!("X11 error {:?}", e.error_kind)),
            ReplyError::ConnectionError(e) => e.into(),
        }
    }
}

/// Connection to an X server with the RandR extension.
pub struct X11Connection {
    conn: RustConnection,
    root: WindowId,
    atoms: RefCell<HashMap<String, Option<Atom>>>,
}

impl X11Connection {
    /// Connect to `display` (or `$DISPLAY` when `None`) and check for RandR.
    pub fn connect(display: Option<&str>) -> Result<Self, RandrError> {
        let (conn, screen_num) =
            RustConnection::connect(display).map_err(|e| RandrError::Connect(e.to_string()))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| RandrError::Connect(format!("screen {screen_num} does not exist")))?;

        if conn
            .extension_information(randr::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Err(RandrError::MissingExtension);
        }
        let version = conn.randr_query_version(1, 5)?.reply()?;
        tracing::debug!(
            screen = screen_num,
            root,
            "RandR {}.{}",
            version.major_version,
            version.minor_version
        );

        Ok(Self {
            conn,
            root,
            atoms: RefCell::new(HashMap::new()),
        })
    }

    /// Root window of the default screen.
    pub fn root(&self) -> WindowId {
        self.root
    }

    /// Look up an existing atom. `None` if the server has never seen the name.
    fn atom(&self, name: &str) -> Result<Option<Atom>, RandrError> {
        if let Some(atom) = self.atoms.borrow().get(name) {
            return Ok(*atom);
        }
        let atom = self.conn.intern_atom(true, name.as_bytes())?.reply()?.atom;
        let atom = (atom != x11rb::NONE).then_some(atom);
        self.atoms.borrow_mut().insert(name.to_string(), atom);
        Ok(atom)
    }
}

impl RandrConnection for X11Connection {
    fn get_screen_resources(&self, root: WindowId) -> Result<ScreenResources, RandrError> {
        let reply = self.conn.randr_get_screen_resources(root)?.reply()?;
        Ok(ScreenResources {
            outputs: reply.outputs,
        })
    }

    fn get_output_info(&self, output: OutputId) -> Result<OutputInfo, RandrError> {
        let reply = self
            .conn
            .randr_get_output_info(output, x11rb::CURRENT_TIME)?
            .reply()?;
        let connection = if reply.connection == randr::Connection::CONNECTED {
            ConnectionState::Connected
        } else if reply.connection == randr::Connection::DISCONNECTED {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Unknown
        };
        Ok(OutputInfo {
            connection,
            crtc: reply.crtc,
            name: reply.name,
        })
    }

    fn get_crtc_info(&self, crtc: CrtcId) -> Result<CrtcInfo, RandrError> {
        let reply = self
            .conn
            .randr_get_crtc_info(crtc, x11rb::CURRENT_TIME)?
            .reply()?;
        Ok(CrtcInfo {
            x: reply.x,
            y: reply.y,
            width: reply.width,
            height: reply.height,
        })
    }

    fn query_output_property(
        &self,
        output: OutputId,
        property: &str,
    ) -> Result<PropertyInfo, RandrError> {
        let Some(atom) = self.atom(property)? else {
            return Ok(PropertyInfo::default());
        };
        // Outputs without the property answer with BadName.
        let reply = match self.conn.randr_query_output_property(output, atom)?.reply() {
            Ok(reply) => reply,
            Err(ReplyError::X11Error(e)) if matches!(e.error_kind, ErrorKind::Name) => {
                return Ok(PropertyInfo::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(PropertyInfo {
            range: reply.range,
            valid_values: reply.valid_values.into_iter().map(|v| v as u32).collect(),
        })
    }

    fn get_output_property(
        &self,
        output: OutputId,
        property: &str,
        request: &PropertyRequest,
    ) -> Result<PropertyValue, RandrError> {
        let Some(atom) = self.atom(property)? else {
            return Ok(PropertyValue::default());
        };
        let type_filter = match request.type_filter.as_deref() {
            None => x11rb::NONE,
            Some(name) => match self.atom(name)? {
                Some(atom) => atom,
                None => return Ok(PropertyValue::default()),
            },
        };

        let reply = self
            .conn
            .randr_get_output_property(
                output,
                atom,
                type_filter,
                request.offset,
                request.length,
                request.delete,
                request.pending,
            )?
            .reply()?;

        Ok(PropertyValue {
            num_items: reply.num_items,
            data: decode_items(reply.format, reply.num_items, &reply.data),
        })
    }
}

/// Decode raw property bytes into items of `format` bits.
///
/// Never yields more than `num_items` items or reads past `data`; a
/// trailing partial item is dropped.
pub(crate) fn decode_items(format: u8, num_items: u32, data: &[u8]) -> Vec<u32> {
    let limit = usize::try_from(num_items).unwrap_or(usize::MAX);
    match format {
        8 => data.iter().take(limit).map(|&b| u32::from(b)).collect(),
        16 => data
            .chunks_exact(2)
            .take(limit)
            .map(|c| u32::from(u16::from_ne_bytes([c[0], c[1]])))
            .collect(),
        32 => data
            .chunks_exact(4)
            .take(limit)
            .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        _ => Vec::new(),
    }
}
