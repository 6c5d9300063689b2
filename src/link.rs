use anyhow::{Context, Result};
use log::debug;
use xcb::{x, Connection, Xid, XidNew};

use crate::error::Error;

const BORDER_WIDTH: u16 = 10;

/// Something the server had queued, reduced to what this program acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    /// Client message carrying a protocol atom in its first data word.
    Protocol(u32),
    Other,
}

/// The slice of the display-server API this program consumes. Atoms cross
/// the seam as raw resource ids; the link owns the one window it manages.
pub trait ServerLink {
    fn create_window(&mut self, width: u16, height: u16) -> Result<(), Error>;
    fn map_window(&mut self) -> Result<(), Error>;
    fn set_title(&mut self, title: &str) -> Result<(), Error>;
    fn intern_atom(&mut self, only_if_exists: bool, name: &[u8]) -> Result<u32, Error>;
    fn advertise_close(&mut self, protocols: u32, delete: u32) -> Result<(), Error>;
    fn poll_event(&mut self) -> Result<Option<ServerEvent>, Error>;
}

pub struct XcbLink {
    conn: Connection,
    screen: x::ScreenBuf,
    window: Option<x::Window>,
}

impl XcbLink {
    pub fn connect() -> Result<XcbLink> {
        // connect to server
        let (conn, scr_num) = Connection::connect(None).map_err(Error::Connection)?;

        // get screen handle
        let screen = conn
            .get_setup()
            .roots()
            .nth(scr_num as usize)
            .context("server reported no usable screen")?
            .to_owned();

        debug!("connected, using screen {}", scr_num);

        Ok(XcbLink {
            conn,
            screen,
            window: None,
        })
    }

    fn window(&self) -> x::Window {
        self.window.expect("no window created on this link yet")
    }
}

impl ServerLink for XcbLink {
    fn create_window(&mut self, width: u16, height: u16) -> Result<(), Error> {
        let wid: x::Window = self.conn.generate_id();

        let cookie = self.conn.send_request_checked(&x::CreateWindow {
            depth: x::COPY_FROM_PARENT as u8,
            wid,
            parent: self.screen.root(),
            x: 0,
            y: 0,
            width,
            height,
            border_width: BORDER_WIDTH,
            class: x::WindowClass::InputOutput,
            visual: self.screen.root_visual(),
            value_list: &[
                x::Cw::EventMask(
                    x::EventMask::EXPOSURE |
                    x::EventMask::KEY_PRESS |
                    x::EventMask::KEY_RELEASE |
                    x::EventMask::BUTTON_PRESS |
                    x::EventMask::BUTTON_RELEASE |
                    x::EventMask::POINTER_MOTION |
                    x::EventMask::BUTTON_MOTION
                ),
            ],
        });
        self.conn.check_request(cookie)?;

        debug!("created window {:?} at {}x{}", wid, width, height);

        self.window = Some(wid);
        Ok(())
    }

    fn map_window(&mut self) -> Result<(), Error> {
        let cookie = self.conn.send_request_checked(&x::MapWindow {
            window: self.window(),
        });
        self.conn.check_request(cookie)?;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), Error> {
        let cookie = self.conn.send_request_checked(&x::ChangeProperty {
            mode: x::PropMode::Replace,
            window: self.window(),
            property: x::ATOM_WM_NAME,
            r#type: x::ATOM_STRING,
            data: title.as_bytes(),
        });
        self.conn.check_request(cookie)?;
        Ok(())
    }

    fn intern_atom(&mut self, only_if_exists: bool, name: &[u8]) -> Result<u32, Error> {
        let cookie = self.conn.send_request(&x::InternAtom {
            only_if_exists,
            name,
        });
        let reply = self.conn.wait_for_reply(cookie)?;
        Ok(reply.atom().resource_id())
    }

    fn advertise_close(&mut self, protocols: u32, delete: u32) -> Result<(), Error> {
        // ids handed back by intern_atom on this same connection
        let property = unsafe { x::Atom::new(protocols) };

        let cookie = self.conn.send_request_checked(&x::ChangeProperty {
            mode: x::PropMode::Replace,
            window: self.window(),
            property,
            r#type: x::ATOM_ATOM,
            data: &[delete],
        });
        self.conn.check_request(cookie)?;
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<ServerEvent>, Error> {
        let event = match self.conn.poll_for_event()? {
            Some(event) => event,
            None => return Ok(None),
        };

        Ok(Some(match event {
            xcb::Event::X(x::Event::ClientMessage(ev)) => match ev.data() {
                x::ClientMessageData::Data32(words) => ServerEvent::Protocol(words[0]),
                _ => ServerEvent::Other,
            },
            _ => ServerEvent::Other,
        }))
    }
}

impl Drop for XcbLink {
    fn drop(&mut self) {
        // best effort; the connection goes away right after
        if let Some(window) = self.window {
            debug!("destroying window {:?}", window);
            self.conn.send_request(&x::DestroyWindow { window });
            let _ = self.conn.flush();
        }
    }
}
