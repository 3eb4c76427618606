mod decoder;
mod emitter;
pub use decoder::{Decoded, Frame, FrameDecoder};
pub use emitter::{EmitError, Emitter};
