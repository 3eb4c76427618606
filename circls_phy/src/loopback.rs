use crate::{
  pulse::{IrWord, PulseSequence},
  traits::{Decoded, EmitError, Emitter, Frame, FrameDecoder},
};
use crc::{Crc, CRC_16_IBM_3740};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

/// An emitted pulse pattern and its carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
  pub pulses: PulseSequence,
  pub carrier_hz: u32,
}

/// A software IR channel.
/// Every emitted pattern comes out of the paired receiver.
/// Clones share the availability switch, so a test can revoke the transmitter mid-session.
#[derive(Clone)]
pub struct LoopbackEmitter {
  out: Sender<Transmission>,
  available: Arc<AtomicBool>,
  acquired: Arc<AtomicBool>,
}

impl LoopbackEmitter {
  pub fn new() -> (Self, Receiver<Transmission>) {
    let (out, rx) = unbounded();
    let emitter = Self {
      out,
      available: Arc::new(AtomicBool::new(true)),
      acquired: Arc::new(AtomicBool::new(false)),
    };
    (emitter, rx)
  }

  /// simulate the transmitter appearing or the permission being revoked
  pub fn set_available(&self, available: bool) {
    self.available.store(available, Ordering::Relaxed);
  }

  /// whether a transmit worker currently holds the channel
  pub fn is_acquired(&self) -> bool {
    self.acquired.load(Ordering::Relaxed)
  }
}

impl Emitter for LoopbackEmitter {
  fn acquire(&mut self) {
    self.acquired.store(true, Ordering::Relaxed);
  }

  fn transmit(&mut self, pulses: &[u32], carrier_hz: u32) -> Result<(), EmitError> {
    if !self.available.load(Ordering::Relaxed) {
      return Err(EmitError::Unavailable);
    }
    let transmission = Transmission {
      pulses: pulses.to_vec(),
      carrier_hz,
    };
    self.out.send(transmission).map_err(|_| EmitError::Failed)
  }

  fn release(&mut self) {
    self.acquired.store(false, Ordering::Relaxed);
  }
}

/// the checksum guarding software frames
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Software rendition of a camera frame: a single row of "pixels" holding
/// `id | payload | CRC-16`.
/// A corrupted frame decodes to nothing, the way the optical decoder's error correction rejects it.
pub struct LoopbackFrame;

impl LoopbackFrame {
  /// number of non-payload bytes in a frame
  pub const OVERHEAD: usize = 3;

  /// Render a message as a frame.
  /// `id` must fit in the ID field of an [`IrWord`].
  pub fn encode(id: u16, payload: &[u8]) -> Frame {
    assert!(id <= IrWord::ID_MASK, "id {id} does not fit in a frame");
    let mut pixels = Vec::with_capacity(payload.len() + Self::OVERHEAD);
    pixels.push(id as u8);
    pixels.extend_from_slice(payload);
    let checksum = CRC16.checksum(&pixels);
    pixels.extend(checksum.to_be_bytes());
    Frame::new(pixels.len() as u32, 1, pixels)
  }

  /// Verify the checksum and return the symbol buffer (`id | payload`).
  pub fn decode(frame: &Frame) -> Option<&[u8]> {
    if frame.pixels.len() < Self::OVERHEAD {
      return None;
    }
    let (symbols, checksum) = frame.pixels.split_at(frame.pixels.len() - 2);
    if CRC16.checksum(symbols) == u16::from_be_bytes([checksum[0], checksum[1]]) {
      Some(symbols)
    } else {
      None
    }
  }
}

/// [`FrameDecoder`] for [`LoopbackFrame`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackDecoder;

impl FrameDecoder for LoopbackDecoder {
  fn decode(&mut self, frame: &Frame) -> Option<Decoded> {
    Decoded::from_symbols(LoopbackFrame::decode(frame)?)
  }
}
