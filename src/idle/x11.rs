//! X11 idle time source via the MIT-SCREEN-SAVER extension.
//!
//! Queries the screen saver extension for milliseconds since the last
//! keyboard or mouse event.

use super::{IdleError, IdleSource};
use std::env;
use tracing::info;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::screensaver::{self, ConnectionExt as _};
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

/// X11 idle source implementation.
pub struct X11IdleSource {
    conn: RustConnection,
    root: Window,
}

impl X11IdleSource {
    /// Connect to the X server and verify the screen saver extension.
    pub fn connect() -> Result<Self, IdleError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| IdleError::ConnectionFailed(e.to_string()))?;

        let extension = conn
            .extension_information(screensaver::X11_EXTENSION_NAME)
            .map_err(|e| IdleError::QueryFailed(e.to_string()))?;
        if extension.is_none() {
            return Err(IdleError::ExtensionMissing(
                screensaver::X11_EXTENSION_NAME.to_string(),
            ));
        }

        let root = conn.setup().roots[screen_num].root;
        info!("Connected to X display (screen {})", screen_num);

        Ok(Self { conn, root })
    }

    /// Get diagnostic information about the X environment.
    pub fn get_diagnostics() -> Vec<String> {
        let mut diags = Vec::new();

        match env::var("DISPLAY") {
            Ok(v) => diags.push(format!("DISPLAY={}", v)),
            Err(_) => diags.push("DISPLAY: NOT SET".to_string()),
        }

        match env::var("XAUTHORITY") {
            Ok(v) => diags.push(format!("XAUTHORITY={}", v)),
            Err(_) => diags.push("XAUTHORITY: NOT SET".to_string()),
        }

        diags
    }
}

impl IdleSource for X11IdleSource {
    fn sample_idle_ms(&mut self) -> Result<u64, IdleError> {
        let reply = self
            .conn
            .screensaver_query_info(self.root)
            .map_err(|e| IdleError::QueryFailed(e.to_string()))?
            .reply()
            .map_err(|e| IdleError::QueryFailed(e.to_string()))?;

        Ok(u64::from(reply.ms_since_user_input))
    }
}
