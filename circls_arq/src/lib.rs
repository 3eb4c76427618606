/// Circular ID space and the half-range window test.
mod seq;
pub use seq::SeqSpace;

/// Channel configuration and its validation.
mod config;
pub use config::{ChannelConfig, ConfigError, WindowPolicy};

/// The reorder window: buffer arrivals, drain in order, decide which IDs to NAK.
pub mod window;

/// Thread-safe front of the reorder window, wired to the output stream and the NAK path.
mod engine;
pub use engine::{NakSink, ReorderEngine};

/// NAKs as IR pulse frames on the transmit scheduler.
mod nak;
pub use nak::NakTransmitter;

/// Far-end retransmit buffer for loopback runs.
mod sender;
pub use sender::{SendStats, SendWindow};

/// Session control surface: open, start, submit, stop, close.
mod session;
pub use session::{Session, SessionError, SessionStats, StopMode};

/// the payload type carried by the link
pub type Payload = Vec<u8>;

/// command line helpers shared by the binaries
pub mod cli_util;
