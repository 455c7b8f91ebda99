//! Scripted in-memory port for exercising protocol code without hardware.

use std::{collections::VecDeque, time::Duration};

use crate::{Result, SimpleRead, SimpleWrite, err::Error};

enum Script {
    Bytes(VecDeque<u8>),
    Silence,
}

/// Port that replays a fixed device script and records everything written.
///
/// A read that crosses a [`MockPort::silence`] marker, or runs past the end of
/// the script, fails with [`Error::Timeout`] and drops the bytes it consumed,
/// the same way a serial port loses a partial read.
#[derive(Default)]
pub struct MockPort {
    script: VecDeque<Script>,
    tx: Vec<u8>,
    timeouts: Vec<Duration>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes the device sends.
    pub fn reply(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.script
            .push_back(Script::Bytes(bytes.as_ref().iter().copied().collect()));
        self
    }

    /// Queue a period where the device stays quiet.
    pub fn silence(mut self) -> Self {
        self.script.push_back(Script::Silence);
        self
    }

    /// Bytes written by the host so far.
    pub fn tx(&self) -> &[u8] {
        &self.tx
    }

    /// Deadlines requested through [`SimpleRead::set_timeout`].
    pub fn timeouts(&self) -> &[Duration] {
        &self.timeouts
    }

    /// Whether every scripted byte has been consumed.
    pub fn is_drained(&self) -> bool {
        self.script.iter().all(|s| match s {
            Script::Bytes(b) => b.is_empty(),
            Script::Silence => false,
        })
    }
}

impl SimpleRead for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.script.front_mut() {
                Some(Script::Bytes(bytes)) => match bytes.pop_front() {
                    Some(b) => {
                        buf[filled] = b;
                        filled += 1;
                    }
                    None => {
                        self.script.pop_front();
                    }
                },
                Some(Script::Silence) => {
                    self.script.pop_front();
                    return Err(Error::Timeout);
                }
                None => return Err(Error::Timeout),
            }
        }

        Ok(())
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeouts.push(timeout);
        Ok(())
    }
}

impl SimpleWrite for MockPort {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.tx.extend_from_slice(buf);
        Ok(())
    }
}
