/// A captured camera frame: an opaque pixel buffer and its dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub width: u32,
  pub height: u32,
  pub pixels: Vec<u8>,
}

impl Frame {
  pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
    Self { width, height, pixels }
  }
}

/// A decoded arrival: message ID and payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
  pub id: u16,
  pub payload: Vec<u8>,
}

impl Decoded {
  pub fn new(id: u16, payload: Vec<u8>) -> Self {
    Self { id, payload }
  }

  /// Split a decoder symbol buffer.
  /// The first byte is the message ID, the remaining bytes are the payload:
  /// the ID byte is not repeated in [`Decoded::payload`].
  /// An empty buffer carries no message.
  pub fn from_symbols(symbols: &[u8]) -> Option<Self> {
    let (&id, payload) = symbols.split_first()?;
    Some(Self::new(id as u16, payload.to_vec()))
  }
}

/// The external frame decoder: turns one camera frame into zero or one [`Decoded`] event.
/// Every capture worker owns a clone.
pub trait FrameDecoder: Clone + Send + 'static {
  /// Decode a frame.
  /// A frame without a recognizable pattern is not an error, it yields [`None`].
  fn decode(&mut self, frame: &Frame) -> Option<Decoded>;
}
