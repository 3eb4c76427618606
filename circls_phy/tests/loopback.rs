use circls_phy::{
  capture::{CapturePipeline, CaptureShutdown, OverflowPolicy},
  loopback::{LoopbackDecoder, LoopbackEmitter, LoopbackFrame},
  pulse::{FrameControl, PulseCodec},
  scheduler::{TransmitScheduler, TxShutdown},
  traits::{Decoded, Frame, FrameDecoder},
  DefaultConfig,
};
use crossbeam::channel::unbounded;
use rand::{Rng, RngCore};

const TESTS: usize = 100;

#[test]
fn frame_round_trip() {
  let mut rng = rand::thread_rng();
  let mut decoder = LoopbackDecoder;
  for _ in 0..TESTS {
    let id = rng.gen_range(0..256);
    let mut payload = vec![0; rng.gen_range(0..32)];
    rng.fill_bytes(&mut payload);
    let frame = LoopbackFrame::encode(id, &payload);
    assert_eq!(decoder.decode(&frame), Some(Decoded::new(id, payload)));
  }
}

#[test]
fn corrupted_frame_yields_nothing() {
  let mut rng = rand::thread_rng();
  let mut decoder = LoopbackDecoder;
  for _ in 0..TESTS {
    let mut frame = LoopbackFrame::encode(rng.gen_range(0..256), b"hello circls");
    let byte = rng.gen_range(0..frame.pixels.len());
    frame.pixels[byte] ^= 1 << rng.gen_range(0..8);
    assert_eq!(decoder.decode(&frame), None);
  }
  assert_eq!(decoder.decode(&Frame::new(0, 0, vec![])), None);
}

/// NAK pulses travel through the scheduler and the loopback emitter, and decode back on the far side
#[test]
fn nak_uplink() {
  let codec = PulseCodec::default();
  let (emitter, uplink) = LoopbackEmitter::new();
  let probe = emitter.clone();
  let scheduler = TransmitScheduler::new(emitter, DefaultConfig::TX_QUEUE);
  assert!(scheduler.request(codec.encode(200), DefaultConfig::CARRIER_HZ));
  assert!(scheduler.request(codec.encode(3), DefaultConfig::CARRIER_HZ));
  scheduler.shutdown(TxShutdown::Flush).unwrap();
  assert!(!probe.is_acquired());

  let words: Vec<_> = uplink
    .try_iter()
    .map(|transmission| {
      assert_eq!(transmission.carrier_hz, DefaultConfig::CARRIER_HZ);
      codec.decode_word(&transmission.pulses).unwrap()
    })
    .collect();
  assert_eq!(words.len(), 2);
  assert!(words.iter().all(|word| word.control() == FrameControl::Nak));
  assert_eq!(words.iter().map(|word| word.id()).collect::<Vec<_>>(), vec![200, 3]);
}

#[test]
fn revoked_emitter() {
  let (emitter, uplink) = LoopbackEmitter::new();
  emitter.set_available(false);
  let scheduler = TransmitScheduler::new(emitter, 4);
  assert!(scheduler.request(vec![8, 8], 38_000));
  let handle = scheduler.handle();
  scheduler.shutdown(TxShutdown::Flush).unwrap();
  assert_eq!(uplink.try_iter().count(), 0);
  assert_eq!(handle.stats().skipped, 1);
}

#[test]
fn camera_to_events() {
  let (events_tx, events_rx) = unbounded();
  let mut pipeline = CapturePipeline::new(LoopbackDecoder, 3, 64, OverflowPolicy::DropNewest, move |decoded| {
    events_tx.send(decoded).unwrap()
  });
  for id in 0..40 {
    let mut frame = LoopbackFrame::encode(id, format!("msg {id}").as_bytes());
    if id % 4 == 0 {
      frame.pixels[1] ^= 0xff;
    }
    pipeline.submit(frame).unwrap();
  }
  pipeline.shutdown(CaptureShutdown::Drain);

  let mut ids: Vec<u16> = events_rx.try_iter().map(|decoded| decoded.id).collect();
  ids.sort_unstable();
  assert_eq!(ids, (0..40).filter(|id| id % 4 != 0).collect::<Vec<_>>());
  assert_eq!(pipeline.stats().empty, 10);
}
