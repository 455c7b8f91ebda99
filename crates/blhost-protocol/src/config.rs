use std::time::Duration;

use crate::consts::DEFAULT_MAX_CHUNK;

/// Engine settings applied at the start of every transaction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Deadline for each read on the link
    pub timeout: Duration,
    /// Chunk size used when the max packet size query fails
    pub fallback_chunk: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            fallback_chunk: DEFAULT_MAX_CHUNK,
        }
    }
}

impl Config {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fallback chunk bounded to what one DATA frame can carry.
    pub(crate) fn fallback_chunk(&self) -> usize {
        self.fallback_chunk.clamp(1, u16::MAX as usize)
    }
}
