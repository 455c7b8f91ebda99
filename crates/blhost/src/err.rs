use blhost_protocol::status::Status;
use thiserror::Error as TError;

#[derive(Debug, TError)]
pub enum Error {
    /// More than one bootloader-capable device is connected
    #[error("More than one device found, please pick one with --port")]
    MoreThanOneDevice,
    /// No bootloader-capable device is connected
    #[error("No device found, please connect one or pass --port")]
    NoDevice,

    /// The device answered with a failure status
    #[error("Device returned {0}")]
    Status(Status),

    /// blhost-protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] blhost_protocol::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// serialport crate error
    #[error("serialport error: {0}")]
    SerialPort(#[from] serialport::Error),
    /// rustyline crate error
    #[error("readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
