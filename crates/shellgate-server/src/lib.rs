//! shellgate-server: terminal sessions bridged over WebSocket.
//!
//! A [`TerminalManager`] resolves the shell, opens the [`Gateway`] listener
//! and hands out extra tab identifiers. Every accepted WebSocket becomes one
//! [`Session`]: one shell behind one pseudo-terminal, with an input loop
//! (client to shell, plus the embedded resize control) and an output loop
//! (shell to client, binary frames).

pub mod descriptor;
pub mod gateway;
pub mod manager;
pub mod ports;
pub mod registry;
pub mod resize;
pub mod session;

#[cfg(test)]
mod test_support;

pub use descriptor::{TerminalDescriptor, TerminalRole};
pub use gateway::Gateway;
pub use manager::TerminalManager;
pub use ports::{PortAllocator, TabDirectory, TAB_CAPACITY, TAB_PORT_OFFSET};
pub use registry::SessionRegistry;
pub use session::{Inbound, Session, OUTPUT_BUFFER_SIZE};
