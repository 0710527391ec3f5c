//! Newline-delimited text framing for tickpipe.
//!
//! Every message on the wire is one line of UTF-8 text terminated by a
//! single `\n`: JSON status objects outbound, plain-text commands inbound.
//! Inbound bytes are reassembled incrementally in a [`LineBuffer`], so a
//! command split across several reads comes out whole.

pub mod codec;
pub mod escape;

pub use codec::{decode_line, encode_line, Line, LineBuffer, LINE_TERMINATOR};
pub use escape::json_escape;
