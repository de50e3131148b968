//! Network subsystem: byte-stream transports and the transport loop

pub mod pump;
pub mod transport;

pub use pump::{Pump, PumpEnd, PumpReport};
pub use transport::{read_full, write_full, TcpEndpoint, Transport};
