/// protocol defaults: ID space, pulse unit, carrier, queue sizes
mod default_config;
pub use default_config::DefaultConfig;

/// define [`traits::Emitter`] and [`traits::FrameDecoder`]: the physical capabilities
/// supplied at the boundary (IR transmitter, camera frame decoder).
pub mod traits;

/// IR word framing and the 3:1 pulse-width ratio code.
pub mod pulse;

/// serialize transmissions from many producers onto the single optical emitter.
pub mod scheduler;

/// a bounded pool of decode workers between the camera and the receiver.
pub mod capture;

/// software loopback capabilities, bypassing the optical medium.
pub mod loopback;
