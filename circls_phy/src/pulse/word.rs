/// IR frame control field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
  /// the receiver missed the carried ID and asks for it again
  Nak,
  /// sent when a session starts, gives the far end camera time to settle
  Syn,
}

impl FrameControl {
  /// frame control -> field value
  fn into_id(self) -> u16 {
    match self {
      FrameControl::Nak => 0,
      FrameControl::Syn => 1,
    }
  }
  /// field value -> frame control, [`None`] for unassigned values
  fn from_id(id: u16) -> Option<Self> {
    match id {
      0 => Some(FrameControl::Nak),
      1 => Some(FrameControl::Syn),
      _ => None,
    }
  }
}

/// The logical value carried by one IR pulse frame:
/// - bits 15..12: magic `0b1010`, a cheap sync check
/// - bits 11..8: frame control
/// - bits 7..0: message ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrWord {
  control: FrameControl,
  id: u16,
}

impl IrWord {
  /// number of bits in one word
  pub const BITS: usize = 16;
  pub const MAGIC: u16 = 0b1010_0000 << 8;
  pub const MAGIC_MASK: u16 = 0b1111_0000 << 8;
  pub const ID_MASK: u16 = 0b1111_1111;
  /// the number of distinct IDs a word can carry
  pub const ID_SPACE: u16 = Self::ID_MASK + 1;
  const CONTROL_SHIFT: u16 = 8;
  const CONTROL_MASK: u16 = 0b1111 << Self::CONTROL_SHIFT;

  /// A retransmission request for `id`.
  /// Panic if `id` does not fit in the ID field.
  pub fn nak(id: u16) -> Self {
    assert!(id <= Self::ID_MASK, "id {id} does not fit in the IR word");
    Self {
      control: FrameControl::Nak,
      id,
    }
  }

  pub fn syn() -> Self {
    Self {
      control: FrameControl::Syn,
      id: 0,
    }
  }

  pub fn control(&self) -> FrameControl {
    self.control
  }

  pub fn id(&self) -> u16 {
    self.id
  }

  pub fn into_bits(self) -> u16 {
    Self::MAGIC | (self.control.into_id() << Self::CONTROL_SHIFT) | self.id
  }

  /// Parse a received word.
  /// Return [`None`] if the magic does not match or the frame control is unassigned.
  pub fn from_bits(bits: u16) -> Option<Self> {
    if bits & Self::MAGIC_MASK != Self::MAGIC {
      return None;
    }
    let control = FrameControl::from_id((bits & Self::CONTROL_MASK) >> Self::CONTROL_SHIFT)?;
    Some(Self {
      control,
      id: bits & Self::ID_MASK,
    })
  }
}
