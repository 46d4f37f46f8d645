//! Lanserve Static File Module
//!
//! Root-confined static file resolution with:
//! - MIME type detection
//! - Index file handling
//! - Byte-range requests
//! - Last-Modified / ETag validators

mod file_server;
mod mime;

pub use file_server::{FileServer, FileServerConfig, Lookup, ServedFile};
pub use mime::guess_mime_type;
