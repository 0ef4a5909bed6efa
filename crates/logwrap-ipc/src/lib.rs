//! Logwrap IPC - Local control channel over Unix sockets

pub mod client;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use protocol::{Request, Response, ResponseCode};
pub use server::{ControlConnection, ControlServer};
