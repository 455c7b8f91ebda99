use std::iter::once;

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use colored::Colorize;
use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    Result,
    commands::{self, Host},
    err::Error,
    parse_property,
};

#[derive(Parser)]
struct Repl {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ping the bootloader.
    Ping,
    /// Read property `tag` (name or id).
    GetProperty {
        #[arg(value_parser = parse_property)]
        tag: u32,
        #[arg(default_value_t = 0, value_parser = maybe_hex::<u32>)]
        index: u32,
    },
    /// Read `count` bytes at `addr`.
    ReadMemory {
        #[arg(value_parser = maybe_hex::<u32>)]
        addr: u32,
        #[arg(value_parser = maybe_hex::<u32>)]
        count: u32,
        #[arg(short, long, default_value_t = 0, value_parser = maybe_hex::<u32>)]
        memory_id: u32,
    },
    /// Write `data` to `addr`.
    WriteMemory {
        #[arg(value_parser = maybe_hex::<u32>)]
        addr: u32,
        #[arg(num_args = 1.., value_parser = hex_u8)]
        data: Vec<u8>,
        #[arg(short, long, default_value_t = 0, value_parser = maybe_hex::<u32>)]
        memory_id: u32,
    },
}

impl Command {
    fn run(self, host: &mut Host) -> Result<()> {
        match self {
            Self::Ping => commands::ping(host),
            Self::GetProperty { tag, index } => commands::get_property(host, tag, index),
            Self::ReadMemory {
                addr,
                count,
                memory_id,
            } => commands::read_memory(host, addr, count, memory_id, None),
            Self::WriteMemory {
                addr,
                data,
                memory_id,
            } => commands::write_memory(host, addr, &data, memory_id),
        }
    }
}

pub fn run_repl(host: &mut Host) -> Result<()> {
    println!("Enter --help for help, Ctrl-C to exit");

    let mut rl = DefaultEditor::new()?;

    loop {
        let line = rl.readline("> ").map(|l| l.trim().to_owned());
        match line {
            Ok(line) => {
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line)?;

                match Repl::try_parse_from(once("repl").chain(line.split_whitespace())) {
                    Ok(repl) => match repl.command.run(host) {
                        Ok(()) => (),
                        // The link is gone, nothing else will work either
                        Err(Error::Protocol(e)) if e.is_fatal() => return Err(e.into()),
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    },
                    Err(e) => {
                        e.print().ok();
                    }
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => Err(e)?,
        }
    }

    Ok(())
}

fn hex_u8(s: &str) -> core::result::Result<u8, String> {
    let s = s
        .strip_prefix("0x")
        .ok_or("byte must be 0x-prefixed hex (e.g. 0x1f)")?;

    u8::from_str_radix(s, 16).map_err(|_| format!("invalid hex byte: 0x{s}"))
}
