use std::{fs, path::PathBuf, time::Duration};

use blhost_port::Port;
use blhost_protocol::{Blhost, Config, property::Property};
use clap::{ArgAction, Parser, Subcommand};
use clap_num::maybe_hex;
use log::info;
use serialport::{
    DataBits, FlowControl, Parity, SerialPortInfo, SerialPortType, StopBits, available_ports,
};

use crate::{commands::Host, err::Error, repl::run_repl};

mod commands;
mod err;
mod logging;
mod repl;

type Result<T> = core::result::Result<T, Error>;

/// USB vendor ids of debug probes and boards exposing the bootloader UART
const VENDOR_IDS: [u16; 2] = [0x1fc9, 0x15a2];

#[derive(Parser)]
#[command(version, about = "Talk to a serial bootloader")]
struct Cli {
    /// Serial port, auto-detected if not set
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = 115200)]
    baud: u32,

    /// Read timeout in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    timeout: u64,

    /// Log more, repeat for frame dumps
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the bootloader answers
    Ping,
    /// Read a property by name or id
    GetProperty {
        #[arg(value_parser = parse_property)]
        tag: u32,
        #[arg(default_value_t = 0, value_parser = maybe_hex::<u32>)]
        index: u32,
    },
    /// Read memory
    ReadMemory {
        #[arg(value_parser = maybe_hex::<u32>)]
        addr: u32,
        #[arg(value_parser = maybe_hex::<u32>)]
        count: u32,
        /// Save to a file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, default_value_t = 0, value_parser = maybe_hex::<u32>)]
        memory_id: u32,
    },
    /// Write a file to memory
    WriteMemory {
        #[arg(value_parser = maybe_hex::<u32>)]
        addr: u32,
        file: PathBuf,
        #[arg(short, long, default_value_t = 0, value_parser = maybe_hex::<u32>)]
        memory_id: u32,
    },
    /// Interactive shell
    Repl,
}

fn parse_property(s: &str) -> core::result::Result<u32, String> {
    match Property::from_name(s) {
        Some(p) => Ok(p as u32),
        None => maybe_hex::<u32>(s).map_err(|_| format!("unknown property: {s}")),
    }
}

fn get_ports() -> Result<Vec<SerialPortInfo>> {
    Ok(available_ports()?
        .into_iter()
        .filter(|s| match &s.port_type {
            SerialPortType::UsbPort(p) => VENDOR_IDS.contains(&p.vid),
            _ => false,
        })
        .collect())
}

fn find_port() -> Result<String> {
    let mut ports = get_ports()?;
    match ports.len() {
        0 => Err(Error::NoDevice),
        1 => Ok(ports.remove(0).port_name),
        _ => Err(Error::MoreThanOneDevice),
    }
}

fn open_port(cli: &Cli) -> Result<Port> {
    let name = match &cli.port {
        Some(name) => name.clone(),
        None => find_port()?,
    };

    info!("opening {name} at {} baud", cli.baud);
    Ok(serialport::new(&name, cli.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(cli.timeout))
        .open()?)
}

fn run(cli: Cli) -> Result<()> {
    let port = open_port(&cli)?;
    let config = Config::default().with_timeout(Duration::from_millis(cli.timeout));
    let mut host: Host = Blhost::with_config(port, config);

    match cli.command {
        Command::Ping => commands::ping(&mut host),
        Command::GetProperty { tag, index } => commands::get_property(&mut host, tag, index),
        Command::ReadMemory {
            addr,
            count,
            output,
            memory_id,
        } => commands::read_memory(&mut host, addr, count, memory_id, output.as_deref()),
        Command::WriteMemory {
            addr,
            file,
            memory_id,
        } => commands::write_memory(&mut host, addr, &fs::read(file)?, memory_id),
        Command::Repl => run_repl(&mut host),
    }
}

fn main() -> core::result::Result<(), String> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli).map_err(|e| e.to_string())
}
