use super::{CapturePipeline, CaptureShutdown, OverflowPolicy, Stopped};
use crate::traits::{Decoded, Frame, FrameDecoder};
use crossbeam::channel::{unbounded, Receiver};
use std::thread;

/// Read the symbols straight from the pixels, optionally waiting on a gate first.
#[derive(Clone)]
struct PixelDecoder {
  gate: Option<Receiver<()>>,
}

impl FrameDecoder for PixelDecoder {
  fn decode(&mut self, frame: &Frame) -> Option<Decoded> {
    if let Some(gate) = &self.gate {
      let _ = gate.recv();
    }
    Decoded::from_symbols(&frame.pixels)
  }
}

fn frame(id: u8) -> Frame {
  Frame::new(2, 1, vec![id, id.wrapping_mul(3)])
}

fn pipeline(
  workers: usize,
  capacity: usize,
  overflow: OverflowPolicy,
  gate: Option<Receiver<()>>,
) -> (CapturePipeline, Receiver<Decoded>) {
  let (events_tx, events_rx) = unbounded();
  let pipeline = CapturePipeline::new(PixelDecoder { gate }, workers, capacity, overflow, move |decoded| {
    events_tx.send(decoded).unwrap()
  });
  (pipeline, events_rx)
}

#[test]
fn single_worker_keeps_capture_order() {
  let (mut pipeline, events) = pipeline(1, 64, OverflowPolicy::DropNewest, None);
  for id in 0..50 {
    pipeline.submit(frame(id)).unwrap();
  }
  pipeline.submit(Frame::new(0, 0, vec![])).unwrap();
  pipeline.shutdown(CaptureShutdown::Drain);

  let ids: Vec<u16> = events.try_iter().map(|decoded| decoded.id).collect();
  assert_eq!(ids, (0..50).collect::<Vec<_>>());
  let stats = pipeline.stats();
  assert_eq!(stats.submitted, 51);
  assert_eq!(stats.decoded, 50);
  assert_eq!(stats.empty, 1);
}

#[test]
fn worker_pool_decodes_everything() {
  let (mut pipeline, events) = pipeline(4, 256, OverflowPolicy::DropNewest, None);
  for id in 0..=255 {
    pipeline.submit(frame(id)).unwrap();
  }
  pipeline.shutdown(CaptureShutdown::Drain);

  let mut ids: Vec<u16> = events.try_iter().map(|decoded| decoded.id).collect();
  ids.sort_unstable();
  assert_eq!(ids, (0..=255).collect::<Vec<_>>());
}

fn overflow(policy: OverflowPolicy) -> Vec<u16> {
  let (gate_tx, gate_rx) = unbounded();
  let (mut pipeline, events) = pipeline(1, 2, policy, Some(gate_rx));
  pipeline.submit(frame(0)).unwrap();
  // wait for the worker to pick the first frame
  while pipeline.queued() > 0 {
    thread::yield_now();
  }
  for id in 1..=3 {
    pipeline.submit(frame(id)).unwrap();
  }
  assert_eq!(pipeline.stats().dropped, 1);
  (0..3).for_each(|_| gate_tx.send(()).unwrap());
  pipeline.shutdown(CaptureShutdown::Drain);
  events.try_iter().map(|decoded| decoded.id).collect()
}

#[test]
fn drop_newest_on_overflow() {
  assert_eq!(overflow(OverflowPolicy::DropNewest), vec![0, 1, 2]);
}

#[test]
fn drop_oldest_on_overflow() {
  assert_eq!(overflow(OverflowPolicy::DropOldest), vec![0, 2, 3]);
}

#[test]
fn discard_on_shutdown() {
  let (gate_tx, gate_rx) = unbounded();
  let (mut pipeline, events) = pipeline(1, 8, OverflowPolicy::DropNewest, Some(gate_rx));
  pipeline.submit(frame(0)).unwrap();
  while pipeline.queued() > 0 {
    thread::yield_now();
  }
  pipeline.submit(frame(1)).unwrap();
  pipeline.submit(frame(2)).unwrap();

  let queue = pipeline.frames_rx.clone();
  let stopper = thread::spawn(move || {
    pipeline.shutdown(CaptureShutdown::Discard);
    pipeline
  });
  // the worker is held by the gate, only the shutdown can empty the queue
  while !queue.is_empty() {
    thread::yield_now();
  }
  gate_tx.send(()).unwrap();
  let pipeline = stopper.join().unwrap();

  assert_eq!(events.try_iter().map(|decoded| decoded.id).collect::<Vec<_>>(), vec![0]);
  assert_eq!(pipeline.stats().discarded, 2);
  assert_eq!(pipeline.submit(frame(3)), Err(Stopped));
}
