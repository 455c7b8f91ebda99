//! Host side of the bootloader serial protocol.
//!
//! [`Engine`] runs one framed command exchange at a time over a blocking
//! [`blhost_port`] link; [`Blhost`] wraps it with the individual commands.
//! Nothing here is thread-safe by itself: wrap the engine in a mutex to share
//! one link.

pub mod api;
pub mod checksum;
pub mod config;
pub mod consts;
pub mod engine;
pub mod err;
pub mod frame;
pub mod packet;
pub mod property;
pub mod response;
pub mod status;

pub use api::Blhost;
pub use config::Config;
pub use engine::{CommandResponse, Engine, State};
pub use err::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
pub(crate) mod testutil;
