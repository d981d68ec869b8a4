//! Codec Tests
//!
//! Tests for byte-exact frame encoding and the stream helpers.

use bytes::Bytes;
use respkv::protocol::{
    command_line, decode_frame, encode_frame, encoded_len, select_command, write_frame,
    CommandKind, Frame,
};
use respkv::DecodeError;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_status() {
    assert_eq!(encode_frame(&Frame::ok()), b"+OK\r\n");
    assert_eq!(encode_frame(&Frame::pong()), b"+PONG\r\n");
}

#[test]
fn test_encode_error() {
    assert_eq!(
        encode_frame(&Frame::error("ERR unknown command 'foo'")),
        b"-ERR unknown command 'foo'\r\n"
    );
}

#[test]
fn test_encode_integer() {
    assert_eq!(encode_frame(&Frame::Integer(0)), b":0\r\n");
    assert_eq!(encode_frame(&Frame::Integer(-42)), b":-42\r\n");
    assert_eq!(
        encode_frame(&Frame::Integer(i64::MAX)),
        b":9223372036854775807\r\n"
    );
}

#[test]
fn test_encode_bulk() {
    assert_eq!(encode_frame(&Frame::bulk("hello")), b"$5\r\nhello\r\n");
    assert_eq!(encode_frame(&Frame::bulk("")), b"$0\r\n\r\n");
    assert_eq!(encode_frame(&Frame::null_bulk()), b"$-1\r\n");
}

#[test]
fn test_encode_array() {
    let frame = Frame::command(["SET", "a", "1"]);
    assert_eq!(
        encode_frame(&frame),
        b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n"
    );
    assert_eq!(encode_frame(&Frame::Array(vec![])), b"*0\r\n");
}

#[test]
fn test_encode_array_with_null_element() {
    let frame = Frame::Array(vec![Some(Bytes::from_static(b"x")), None]);
    assert_eq!(encode_frame(&frame), b"*2\r\n$1\r\nx\r\n$-1\r\n");
}

#[test]
fn test_encode_select_command() {
    let frame = Frame::from(select_command(12));
    assert_eq!(encode_frame(&frame), b"*2\r\n$6\r\nSELECT\r\n$2\r\n12\r\n");
}

#[test]
fn test_encoded_len_is_exact() {
    let frame = Frame::from(command_line(["SET", "key", "a much longer value"]));
    assert_eq!(encoded_len(&frame), encode_frame(&frame).len());
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

#[test]
fn test_write_frame() {
    let mut out = Vec::new();
    write_frame(&mut out, &Frame::Integer(3)).unwrap();
    write_frame(&mut out, &Frame::ok()).unwrap();
    assert_eq!(out, b":3\r\n+OK\r\n");
}

#[test]
fn test_decode_frame_takes_first_frame() {
    let frame = decode_frame(b"+first\r\n+second\r\n").unwrap();
    assert_eq!(frame, Frame::Status("first".into()));
}

#[test]
fn test_decode_frame_empty_input() {
    assert!(matches!(decode_frame(b""), Err(DecodeError::Closed)));
}

// =============================================================================
// Command Table Tests
// =============================================================================

#[test]
fn test_command_frame_to_command_line() {
    let frame = decode_frame(b"*2\r\n$3\r\nget\r\n$1\r\nk\r\n").unwrap();
    let argv = frame.into_command_line().unwrap();

    assert_eq!(CommandKind::lookup(&argv[0]), Some(CommandKind::Get));
    assert_eq!(argv, command_line(["get", "k"]));
}

#[test]
fn test_write_commands_are_flagged() {
    assert!(CommandKind::Set.is_write());
    assert!(CommandKind::Del.is_write());
    assert!(CommandKind::FlushDb.is_write());
    assert!(!CommandKind::Get.is_write());
    assert!(!CommandKind::Select.is_write());
    assert!(!CommandKind::Shutdown.is_write());
}
