use super::{FrameControl, IrWord};
use bitvec::prelude::*;

/// Alternating on/off pulse durations, in carrier cycles.
pub type PulseSequence = Vec<u32>;

/// Pulse-width ratio code for [`IrWord`]s.
///
/// Every bit, MSB first, takes four pulse units:
/// a set bit is `(3, 1)` units on/off, a clear bit is `(1, 3)`.
/// Only the on:off ratio carries information, so decoding tolerates carrier drift.
/// With the tail marker profile two single-unit pulses close the word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseCodec {
  pulse_width: u32,
  max_id: u16,
  tail_marker: bool,
}

impl PulseCodec {
  /// pulse units (on, off) for a set bit
  const ONE: (u32, u32) = (3, 1);
  /// pulse units (on, off) for a clear bit
  const ZERO: (u32, u32) = (1, 3);
  /// number of pulses in the end marker
  const TAIL_PULSES: usize = 2;
  /// pulse units spent by the 16 data bits
  const BODY_UNITS: u64 = 4 * IrWord::BITS as u64;

  /// Widest base pulse whose three-unit pulses still fit in a `u32`.
  pub const MAX_PULSE_WIDTH: u32 = u32::MAX / 4;

  /// `pulse_width` must be in `1..=MAX_PULSE_WIDTH`.
  /// `max_id` must be a power of two that fits in the ID field of an [`IrWord`].
  pub fn new(pulse_width: u32, max_id: u16, tail_marker: bool) -> Self {
    assert!(pulse_width > 0, "pulse width must be positive");
    assert!(
      pulse_width <= Self::MAX_PULSE_WIDTH,
      "pulse width {pulse_width} exceeds {}",
      Self::MAX_PULSE_WIDTH
    );
    assert!(
      max_id.is_power_of_two() && max_id <= IrWord::ID_SPACE,
      "max id {max_id} is not a power of two within the IR word"
    );
    Self {
      pulse_width,
      max_id,
      tail_marker,
    }
  }

  pub fn pulse_width(&self) -> u32 {
    self.pulse_width
  }

  pub fn max_id(&self) -> u16 {
    self.max_id
  }

  pub fn tail_marker(&self) -> bool {
    self.tail_marker
  }

  /// number of pulses in one encoded word
  pub fn pulses_per_word(&self) -> usize {
    let tail = if self.tail_marker { Self::TAIL_PULSES } else { 0 };
    2 * IrWord::BITS + tail
  }

  /// Encode a NAK for `id`.
  /// Panic if `id` is outside `[0, max_id)`: the caller owns the ID space.
  pub fn encode(&self, id: u16) -> PulseSequence {
    assert!(id < self.max_id, "id {id} is outside the ID space of {}", self.max_id);
    self.encode_word(IrWord::nak(id))
  }

  pub fn encode_word(&self, word: IrWord) -> PulseSequence {
    let bits = word.into_bits();
    let mut pulses = Vec::with_capacity(self.pulses_per_word());
    for bit in bits.view_bits::<Msb0>().iter() {
      let (on, off) = if *bit { Self::ONE } else { Self::ZERO };
      pulses.push(on * self.pulse_width);
      pulses.push(off * self.pulse_width);
    }
    if self.tail_marker {
      pulses.extend([self.pulse_width; Self::TAIL_PULSES]);
    }
    pulses
  }

  /// Recover the raw 16-bit value.
  /// Return [`None`] if the sequence has the wrong length for this profile,
  /// a pair has no dominant half, or the tail marker is malformed.
  pub fn decode_bits(&self, pulses: &[u32]) -> Option<u16> {
    if pulses.len() != self.pulses_per_word() {
      return None;
    }
    let (body, tail) = pulses.split_at(2 * IrWord::BITS);
    // tail pulses are single units of the received timing, anything near a long pulse is noise
    let body_cycles: u64 = body.iter().map(|&pulse| pulse as u64).sum();
    if tail
      .iter()
      .any(|&pulse| pulse as u64 * Self::BODY_UNITS >= 2 * body_cycles)
    {
      return None;
    }
    if body.chunks_exact(2).any(|pair| pair[0] == pair[1]) {
      return None;
    }

    let mut bits = 0_u16;
    body
      .chunks_exact(2)
      .zip(bits.view_bits_mut::<Msb0>().iter_mut())
      .for_each(|(pair, mut bit)| *bit = pair[0] > pair[1]);
    Some(bits)
  }

  /// Decode the ID half of a pulse frame.
  /// The flag tells whether the magic and frame control checked out as a NAK inside the ID space.
  pub fn decode(&self, pulses: &[u32]) -> Option<(u16, bool)> {
    let bits = self.decode_bits(pulses)?;
    let valid = matches!(
      IrWord::from_bits(bits),
      Some(word) if word.control() == FrameControl::Nak && word.id() < self.max_id
    );
    Some((bits & IrWord::ID_MASK, valid))
  }

  /// Decode a full word, rejecting bad magic or frame control.
  pub fn decode_word(&self, pulses: &[u32]) -> Option<IrWord> {
    IrWord::from_bits(self.decode_bits(pulses)?)
  }
}

impl Default for PulseCodec {
  fn default() -> Self {
    use crate::DefaultConfig;
    Self::new(DefaultConfig::PULSE_WIDTH, DefaultConfig::MAX_ID, DefaultConfig::TAIL_MARKER)
  }
}
