use std::{fs, path::Path};

use blhost_port::Port;
use blhost_protocol::{Blhost, property::Property, status::Status};

use crate::{Result, err::Error, progress, status};

pub type Host = Blhost<Port>;

fn check(status: u32) -> Result<()> {
    let status = Status(status);
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Status(status))
    }
}

pub fn ping(host: &mut Host) -> Result<()> {
    progress!("Pinging bootloader...");
    match status!(host.ping())? {
        Some(info) => println!("Protocol version: {info}"),
        None => println!("No ping response, the device may still accept commands"),
    }
    Ok(())
}

pub fn get_property(host: &mut Host, tag: u32, index: u32) -> Result<()> {
    let name = Property::from_id(tag)
        .map(|p| p.to_string())
        .unwrap_or_else(|| format!("{tag:#x}"));
    progress!("Reading property {name}...");
    let (status, values) = status!(host.get_property(tag, index))?;
    check(status)?;

    for (i, value) in values.iter().enumerate() {
        println!("Value[{i}]: {value:#010x} ({value})");
    }
    Ok(())
}

pub fn read_memory(
    host: &mut Host,
    addr: u32,
    count: u32,
    memory_id: u32,
    output: Option<&Path>,
) -> Result<()> {
    progress!("Reading {count:#x} bytes at {addr:#x}...");
    let (status, data) = status!(host.read_memory(addr, count, memory_id))?;
    check(status)?;

    match output {
        Some(path) => {
            fs::write(path, &data)?;
            println!("Saved {} bytes to {}", data.len(), path.display());
        }
        None => print_hex(addr, &data),
    }
    Ok(())
}

pub fn write_memory(host: &mut Host, addr: u32, data: &[u8], memory_id: u32) -> Result<()> {
    progress!("Writing {:#x} bytes to {addr:#x}...", data.len());
    let (status, _) = status!(host.write_memory(addr, data, memory_id))?;
    check(status)
}

fn print_hex(addr: u32, data: &[u8]) {
    for (i, line) in data.chunks(16).enumerate() {
        let bytes: Vec<String> = line.iter().map(|b| format!("{b:02x}")).collect();
        println!("{:08x}: {}", addr as usize + i * 16, bytes.join(" "));
    }
}
