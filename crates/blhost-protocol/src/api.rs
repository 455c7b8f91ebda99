//! Bootloader commands on top of the [`Engine`].

use std::{fs, path::Path};

use blhost_port::{SimpleRead, SimpleWrite};

use crate::{
    Config, Result,
    engine::Engine,
    err::Error,
    frame::PingInfo,
    packet::{CommandPacket, CommandTag},
    response::ResponseKind,
};

pub struct Blhost<T: SimpleRead + SimpleWrite> {
    engine: Engine<T>,
}

impl<T: SimpleRead + SimpleWrite> Blhost<T> {
    pub fn new(io: T) -> Self {
        Self {
            engine: Engine::new(io),
        }
    }

    pub fn with_config(io: T, config: Config) -> Self {
        Self {
            engine: Engine::with_config(io, config),
        }
    }

    pub fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    pub fn into_inner(self) -> T {
        self.engine.into_inner()
    }

    /// Ping the device, returning its version block if it answered.
    pub fn ping(&mut self) -> Result<Option<PingInfo>> {
        self.engine.ping()
    }

    /// Read property `tag`. Returns the status and the property values.
    pub fn get_property(&mut self, tag: u32, index: u32) -> Result<(u32, Vec<u32>)> {
        let command = CommandPacket::new(CommandTag::GetProperty as u8, 0, vec![tag, index]);
        self.engine
            .execute_command(&command, None, false, ResponseKind::GetProperty as u8)
            .map(|r| r.into_parts())
    }

    /// Read `byte_count` bytes at `addr`. Returns the status and the bytes read.
    pub fn read_memory(
        &mut self,
        addr: u32,
        byte_count: u32,
        memory_id: u32,
    ) -> Result<(u32, Vec<u8>)> {
        if byte_count == 0 {
            return Err(Error::InvalidArgument("nothing to read".into()));
        }

        let command = CommandPacket::new(
            CommandTag::ReadMemory as u8,
            0,
            vec![addr, byte_count, memory_id],
        );
        let response = self.engine.execute_command(
            &command,
            None,
            true,
            ResponseKind::ReadMemory as u8,
        )?;
        Ok((response.status, response.data.unwrap_or_default()))
    }

    /// Write `data` at `addr`. Returns the status and the response values.
    pub fn write_memory(
        &mut self,
        addr: u32,
        data: &[u8],
        memory_id: u32,
    ) -> Result<(u32, Vec<u32>)> {
        if data.is_empty() {
            return Err(Error::InvalidArgument("nothing to write".into()));
        }
        let byte_count = u32::try_from(data.len()).map_err(|_| {
            Error::InvalidArgument(format!("{} bytes don't fit one write", data.len()))
        })?;

        let command = CommandPacket::new(
            CommandTag::WriteMemory as u8,
            0,
            vec![addr, byte_count, memory_id],
        );
        self.engine
            .execute_command(&command, Some(data), false, ResponseKind::Generic as u8)
            .map(|r| r.into_parts())
    }

    /// Write the contents of the file at `path` to `addr`.
    pub fn write_memory_file(
        &mut self,
        addr: u32,
        path: impl AsRef<Path>,
        memory_id: u32,
    ) -> Result<(u32, Vec<u32>)> {
        let data = fs::read(path)?;
        self.write_memory(addr, &data, memory_id)
    }
}
