use crate::NakSink;
use circls_phy::{
  pulse::{IrWord, PulseCodec},
  scheduler::TxHandle,
};

/// Turns NAKs into IR words queued on the transmit scheduler.
#[derive(Clone)]
pub struct NakTransmitter {
  codec: PulseCodec,
  carrier_hz: u32,
  tx: TxHandle,
}

impl NakTransmitter {
  pub fn new(codec: PulseCodec, carrier_hz: u32, tx: TxHandle) -> Self {
    Self { codec, carrier_hz, tx }
  }

  /// Request a retransmission of `id`, returns whether the request was queued.
  pub fn send_nak(&self, id: u16) -> bool {
    log::debug!("[Tx] nak {id}");
    self.tx.request(self.codec.encode(id), self.carrier_hz)
  }

  /// Announce the receiver to the far end.
  pub fn send_syn(&self) -> bool {
    log::debug!("[Tx] syn");
    self.tx.request(self.codec.encode_word(IrWord::syn()), self.carrier_hz)
  }
}

impl NakSink for NakTransmitter {
  fn nak(&self, id: u16) {
    self.send_nak(id);
  }
}

#[cfg(test)]
mod tests {
  use super::NakTransmitter;
  use crate::NakSink;
  use circls_phy::{
    loopback::LoopbackEmitter,
    pulse::{FrameControl, PulseCodec},
    scheduler::{TransmitScheduler, TxShutdown},
  };

  #[test]
  fn naks_become_pulse_words() {
    let (emitter, transmissions) = LoopbackEmitter::new();
    let scheduler = TransmitScheduler::new(emitter, 8);
    let codec = PulseCodec::new(8, 256, true);
    let naks = NakTransmitter::new(codec, 38_000, scheduler.handle());

    assert!(naks.send_syn());
    naks.nak(42);
    naks.nak(7);
    assert!(scheduler.shutdown(TxShutdown::Flush).is_some());

    let words: Vec<_> = transmissions
      .try_iter()
      .map(|transmission| {
        assert_eq!(transmission.carrier_hz, 38_000);
        codec.decode_word(&transmission.pulses).unwrap()
      })
      .collect();
    assert_eq!(words.len(), 3);
    assert_eq!(words[0].control(), FrameControl::Syn);
    assert_eq!((words[1].control(), words[1].id()), (FrameControl::Nak, 42));
    assert_eq!((words[2].control(), words[2].id()), (FrameControl::Nak, 7));
  }
}
