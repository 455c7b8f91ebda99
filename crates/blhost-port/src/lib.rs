//! Blocking byte transport used by the bootloader host.
//!
//! Every read is all-or-nothing: either the whole buffer is filled before the
//! port deadline or the call fails with [`Error::Timeout`].

use std::{
    io::{Read, Write},
    time::Duration,
};

use serialport::SerialPort;

use crate::err::Error;

pub mod err;
#[cfg(feature = "mock")]
pub mod mock;

pub type Result<T> = core::result::Result<T, Error>;

pub type Port = Box<dyn SerialPort>;

pub trait FromBytes<const N: usize> {
    fn from_le(bytes: [u8; N]) -> Self;
}

impl FromBytes<2> for u16 {
    fn from_le(bytes: [u8; 2]) -> Self {
        Self::from_le_bytes(bytes)
    }
}

pub trait SimpleRead {
    /// Fill `buf` completely or fail.
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Change the deadline applied to every following read.
    fn set_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn read_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; n];
        self.read(&mut buf)?;
        Ok(buf)
    }

    fn simple_read_le<T: FromBytes<N>, const N: usize>(&mut self) -> Result<T> {
        let mut bytes = [0; N];
        self.read(&mut bytes)?;
        Ok(T::from_le(bytes))
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        self.simple_read_le()
    }
}

pub trait SimpleWrite {
    /// Write all of `buf` and flush it out.
    fn write(&mut self, buf: &[u8]) -> Result<()>;
}

impl SimpleRead for Port {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_exact(buf).map_err(|e| e.into())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        SerialPort::set_timeout(self.as_mut(), timeout).map_err(|e| e.into())
    }
}

impl SimpleWrite for Port {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.write_all(buf)?;
        self.flush().map_err(|e| e.into())
    }
}

impl<T: SimpleRead + ?Sized> SimpleRead for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }
}

impl<T: SimpleWrite + ?Sized> SimpleWrite for &mut T {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }
}
