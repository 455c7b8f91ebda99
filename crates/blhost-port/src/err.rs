use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    /// Fewer bytes than requested arrived before the read deadline
    #[error("timed out waiting for data")]
    Timeout,

    /// `serialport` crate error
    #[error("serialport error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::UnexpectedEof => Self::Timeout,
            _ => Self::Io(e),
        }
    }
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
