use std::fmt;

use xcb::x;

/// A protocol error decoded from the server's error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    Request { code: u8, major: u8, minor: u16 },
    Value { code: u8, major: u8, minor: u16 },
    Unknown { code: u8 },
}

#[derive(Debug)]
pub enum Error {
    Connection(xcb::ConnError),
    Wire(WireError),
}

// Core protocol error code table, xproto codes 1 through 17.
fn error_name(code: u8) -> &'static str {
    match code {
        1 => "Request",
        2 => "Value",
        3 => "Window",
        4 => "Pixmap",
        5 => "Atom",
        6 => "Cursor",
        7 => "Font",
        8 => "Match",
        9 => "Drawable",
        10 => "Access",
        11 => "Alloc",
        12 => "Colormap",
        13 => "GContext",
        14 => "IdChoice",
        15 => "Name",
        16 => "Length",
        17 => "Implementation",
        _ => "unknown",
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            WireError::Request { code, major, minor } => write!(
                f,
                "request error {} (code {code}, opcode {major}:{minor})",
                error_name(code)
            ),
            WireError::Value { code, major, minor } => write!(
                f,
                "value error {} (code {code}, opcode {major}:{minor})",
                error_name(code)
            ),
            WireError::Unknown { code } => write!(f, "unknown protocol error (code {code})"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "connection to the X server failed: {e}"),
            Error::Wire(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<&x::Error> for WireError {
    fn from(err: &x::Error) -> WireError {
        match err {
            x::Error::Request(e) => WireError::Request {
                code: 1,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Value(e) => WireError::Value {
                code: 2,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Window(e) => WireError::Value {
                code: 3,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Pixmap(e) => WireError::Value {
                code: 4,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Atom(e) => WireError::Value {
                code: 5,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Cursor(e) => WireError::Value {
                code: 6,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Font(e) => WireError::Value {
                code: 7,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Match(e) => WireError::Request {
                code: 8,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Drawable(e) => WireError::Value {
                code: 9,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Access(e) => WireError::Request {
                code: 10,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Alloc(e) => WireError::Request {
                code: 11,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Colormap(e) => WireError::Value {
                code: 12,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::GContext(e) => WireError::Value {
                code: 13,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::IdChoice(e) => WireError::Value {
                code: 14,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Name(e) => WireError::Request {
                code: 15,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Length(e) => WireError::Request {
                code: 16,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            x::Error::Implementation(e) => WireError::Request {
                code: 17,
                major: e.major_opcode(),
                minor: e.minor_opcode(),
            },
            _ => WireError::Unknown { code: 0 },
        }
    }
}

impl From<xcb::ProtocolError> for Error {
    fn from(err: xcb::ProtocolError) -> Error {
        if let xcb::ProtocolError::X(ref e, _) = err {
            Error::Wire(WireError::from(e))
        } else {
            Error::Wire(WireError::Unknown { code: 0 })
        }
    }
}

impl From<xcb::Error> for Error {
    fn from(err: xcb::Error) -> Error {
        match err {
            xcb::Error::Connection(e) => Error::Connection(e),
            xcb::Error::Protocol(e) => Error::from(e),
        }
    }
}
