/// The 16-bit IR word: magic, frame control and ID.
mod word;
pub use word::{FrameControl, IrWord};

/// bit <-> pulse conversion.
mod codec;
pub use codec::{PulseCodec, PulseSequence};
