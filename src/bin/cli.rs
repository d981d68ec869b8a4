//! RespKV CLI Client
//!
//! Sends one command to a RespKV server and prints the reply.

use std::net::TcpStream;
use std::process::ExitCode;

use clap::Parser;
use respkv::protocol::{command_line, write_frame, Frame, FrameDecoder};

/// RespKV CLI
#[derive(Parser, Debug)]
#[command(name = "respkv-cli")]
#[command(about = "CLI for RespKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Command and arguments, e.g. `SET key value`
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(reply) => {
            print_reply(&reply);
            if reply.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> respkv::Result<Frame> {
    let stream = TcpStream::connect(&args.server)?;
    let mut writer = stream.try_clone()?;

    let request = Frame::from(command_line(&args.command));
    write_frame(&mut writer, &request)?;

    let mut decoder = FrameDecoder::new(stream);
    match decoder.next() {
        Some(Ok(reply)) => Ok(reply),
        Some(Err(e)) => Err(e.into()),
        None => Err(respkv::KvError::Network("no reply".to_string())),
    }
}

fn print_reply(reply: &Frame) {
    match reply {
        Frame::Status(text) => println!("{}", text),
        Frame::Error(text) => println!("(error) {}", text),
        Frame::Integer(value) => println!("(integer) {}", value),
        Frame::Bulk(Some(data)) => println!("\"{}\"", String::from_utf8_lossy(data)),
        Frame::Bulk(None) => println!("(nil)"),
        Frame::Array(elements) if elements.is_empty() => println!("(empty array)"),
        Frame::Array(elements) => {
            for (i, element) in elements.iter().enumerate() {
                match element {
                    Some(data) => println!("{}) \"{}\"", i + 1, String::from_utf8_lossy(data)),
                    None => println!("{}) (nil)", i + 1),
                }
            }
        }
    }
}
