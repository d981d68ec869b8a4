//! Protocol Module
//!
//! The RESP wire protocol spoken by clients and used for the append-only
//! log.
//!
//! ## Frames
//! - `+` status, `-` error, `:` signed 64-bit integer
//! - `$` bulk string (binary safe, `$-1` = null)
//! - `*` array of bulk strings (`*0` = empty, no null array)
//!
//! ## Requests
//! Every request is an array whose first element is the command name:
//! ```text
//! *3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n
//! ```

mod command;
mod frame;
mod codec;
mod decoder;

pub use command::{command_line, select_command, CommandKind, CommandLine};
pub use frame::Frame;
pub use codec::{decode_frame, encode_frame, encode_into, encoded_len, write_frame};
pub use decoder::{
    DecodeResult, FrameDecoder, MAX_ARRAY_LEN, MAX_BULK_LEN, MAX_LINE_LEN,
};
