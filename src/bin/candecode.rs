// socketcan-codec/src/bin/candecode.rs
//
// Decodes SocketCAN frames and netlink messages from hex.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Simple CLI tool to decode the raw bytes of SocketCAN frames and
//! netlink messages, given as hex, like they'd be captured from a socket.
//!
//! ```text
//! $ candecode classic 2301000002000000 1122000000000000
//! 123#11 22
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Arg, Command};
use socketcan_codec::{
    nl::{
        self, attributes, messages, NetlinkErrorMessage, RoutingAttribute, NLMSG_ERROR,
        RTM_DELLINK, RTM_DELROUTE, RTM_GETLINK, RTM_GETROUTE, RTM_NEWLINK, RTM_NEWROUTE,
    },
    ClassicFrame, FdFrame, Frame, XlFrame,
};
use std::process;

// Make the app version the same as the package.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// --------------------------------------------------------------------------

/// Parses the hex input, ignoring whitespace and ':' or '.' separators.
fn parse_hex(args: &[&String]) -> Result<Vec<u8>> {
    let s: String = args
        .iter()
        .flat_map(|s| s.chars())
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '.')
        .collect();
    hex::decode(&s).context("Invalid hex input")
}

/// Prints a list of attributes, descending into the nested ones.
fn print_attrs(buf: &[u8], depth: usize) -> Result<()> {
    for attr in attributes(buf) {
        let attr: RoutingAttribute = attr?;
        let indent = "  ".repeat(depth + 1);
        println!(
            "{}[{}] len={}{}: {}",
            indent,
            attr.attr_type(),
            attr.len,
            if attr.is_nested() { " (nested)" } else { "" },
            hex::encode(attr.data)
        );
        if attr.is_nested() {
            print_attrs(attr.data, depth + 1)?;
        }
    }
    Ok(())
}

/// Decodes and prints each netlink message in the buffer.
fn netlink_cmd(buf: &[u8]) -> Result<()> {
    let mut iter = messages(buf);
    for msg in iter.by_ref() {
        let (hdr, payload) = msg?;
        println!(
            "type={} flags={:#06X} len={} seq={} pid={}",
            hdr.msg_type, hdr.flags, hdr.len, hdr.seq, hdr.pid
        );

        let family_len = match hdr.msg_type {
            NLMSG_ERROR => {
                let err = NetlinkErrorMessage::decode(payload)?;
                match err.errno() {
                    None => println!("  ACK"),
                    Some(errno) => println!(
                        "  Error: {}",
                        std::io::Error::from_raw_os_error(errno)
                    ),
                }
                continue;
            }
            RTM_NEWLINK | RTM_DELLINK | RTM_GETLINK => nl::link::IFINFOMSG_LEN,
            RTM_NEWROUTE | RTM_DELROUTE | RTM_GETROUTE => nl::cgw::RTCANMSG_LEN,
            _ => 0,
        };

        if payload.len() < family_len {
            println!("  {}", hex::encode(payload));
            continue;
        }
        if family_len > 0 {
            println!("  header: {}", hex::encode(&payload[..family_len]));
        }
        print_attrs(&payload[family_len..], 0)?;
    }
    if iter.is_incomplete() {
        println!("(incomplete message at offset {})", iter.offset());
    }
    Ok(())
}

/// Decodes and prints the gateway rules in the buffer.
fn cgw_cmd(buf: &[u8]) -> Result<()> {
    if let Some(err) = NetlinkErrorMessage::find(buf)? {
        if let Some(errno) = err.errno() {
            return Err(anyhow!(
                "Error reply: {}",
                std::io::Error::from_raw_os_error(errno)
            ));
        }
    }

    let batch = nl::parse_rules(buf)?;
    for rule in &batch.rules {
        println!("{}", rule);
    }
    if batch.has_more {
        println!("(more rules follow)");
    } else if batch.done {
        println!("(done)");
    }
    Ok(())
}

// --------------------------------------------------------------------------

fn main() {
    let opts = Command::new("candecode")
        .version(VERSION)
        .about("Decode SocketCAN frames and netlink messages given as hex")
        .arg(
            Arg::new("kind")
                .help("The kind of data to decode")
                .required(true)
                .index(1)
                .value_parser(["classic", "fd", "xl", "netlink", "cgw"]),
        )
        .arg(
            Arg::new("hex")
                .help("The bytes, in hex. Whitespace and ':' separators are ignored")
                .required(true)
                .multiple_values(true)
                .index(2),
        )
        .get_matches();

    let kind = opts
        .get_one::<String>("kind")
        .map(String::as_str)
        .unwrap_or_default();
    let args: Vec<&String> = opts
        .get_many::<String>("hex")
        .map(|vals| vals.collect())
        .unwrap_or_default();

    let res = parse_hex(&args).and_then(|buf| match kind {
        "classic" => {
            let frame = ClassicFrame::decode(&buf)?;
            println!("{:X}", frame);
            Ok(())
        }
        "fd" => {
            let frame = FdFrame::decode(&buf)?;
            println!("{:X}", frame);
            Ok(())
        }
        "xl" => {
            let frame = XlFrame::decode(&buf)?;
            println!("{:X}", frame);
            Ok(())
        }
        "netlink" => netlink_cmd(&buf),
        "cgw" => cgw_cmd(&buf),
        _ => Err(anyhow!("Unknown kind: '{}'", kind)),
    });

    if let Err(err) = res {
        eprintln!("{}", err);
        process::exit(1);
    }
}
