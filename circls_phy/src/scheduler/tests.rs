use super::{TransmitScheduler, TxShutdown, TxStats};
use crate::traits::{EmitError, Emitter};
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::thread;

/// Forward every pattern, optionally waiting on a gate before each one.
struct GatedEmitter {
  gate: Option<Receiver<()>>,
  out: Sender<Vec<u32>>,
  available: bool,
  acquired: bool,
}

impl GatedEmitter {
  fn new(gate: Option<Receiver<()>>) -> (Self, Receiver<Vec<u32>>) {
    let (out, rx) = unbounded();
    let emitter = Self {
      gate,
      out,
      available: true,
      acquired: false,
    };
    (emitter, rx)
  }
}

impl Emitter for GatedEmitter {
  fn acquire(&mut self) {
    self.acquired = true;
  }
  fn transmit(&mut self, pulses: &[u32], _carrier_hz: u32) -> Result<(), EmitError> {
    if let Some(gate) = &self.gate {
      gate.recv().map_err(|_| EmitError::Failed)?;
    }
    if !self.available {
      return Err(EmitError::Unavailable);
    }
    self.out.send(pulses.to_vec()).map_err(|_| EmitError::Failed)
  }
  fn release(&mut self) {
    self.acquired = false;
  }
}

#[test]
fn fifo_order() {
  let (emitter, out) = GatedEmitter::new(None);
  let scheduler = TransmitScheduler::new(emitter, 128);
  for i in 0..100 {
    assert!(scheduler.request(vec![i], 56_000));
  }
  let emitter = scheduler.shutdown(TxShutdown::Flush).unwrap();
  assert!(!emitter.acquired);
  let sent: Vec<u32> = out.try_iter().map(|pulses| pulses[0]).collect();
  assert_eq!(sent, (0..100).collect::<Vec<_>>());
}

/// concurrent producers: each producer's requests keep their relative order
#[test]
fn many_producers() {
  const PRODUCERS: u32 = 4;
  const REQUESTS: u32 = 50;
  let (emitter, out) = GatedEmitter::new(None);
  let scheduler = TransmitScheduler::new(emitter, 1024);
  let producers: Vec<_> = (0..PRODUCERS)
    .map(|p| {
      let handle = scheduler.handle();
      thread::spawn(move || (0..REQUESTS).for_each(|i| assert!(handle.request(vec![p, i], 38_000))))
    })
    .collect();
  producers.into_iter().for_each(|producer| producer.join().unwrap());
  scheduler.shutdown(TxShutdown::Flush).unwrap();

  let sent: Vec<Vec<u32>> = out.try_iter().collect();
  assert_eq!(sent.len(), (PRODUCERS * REQUESTS) as usize);
  for p in 0..PRODUCERS {
    let order: Vec<u32> = sent.iter().filter(|pulses| pulses[0] == p).map(|pulses| pulses[1]).collect();
    assert_eq!(order, (0..REQUESTS).collect::<Vec<_>>());
  }
}

#[test]
fn unavailable_emitter_skips() {
  let (mut emitter, out) = GatedEmitter::new(None);
  emitter.available = false;
  let scheduler = TransmitScheduler::new(emitter, 16);
  let handle = scheduler.handle();
  for _ in 0..5 {
    assert!(handle.request(vec![1, 2], 56_000));
  }
  scheduler.shutdown(TxShutdown::Flush).unwrap();
  assert_eq!(out.try_iter().count(), 0);
  assert_eq!(
    handle.stats(),
    TxStats {
      sent: 0,
      skipped: 5,
      overflowed: 0
    }
  );
}

#[test]
fn overflow_and_discard() {
  let (gate_tx, gate_rx) = unbounded();
  let (emitter, out) = GatedEmitter::new(Some(gate_rx));
  let scheduler = TransmitScheduler::new(emitter, 2);
  let handle = scheduler.handle();

  // the first request is picked by the worker and waits on the gate
  assert!(handle.request(vec![0], 56_000));
  while !scheduler.handle.requests.is_empty() {
    thread::yield_now();
  }
  assert!(handle.request(vec![1], 56_000));
  assert!(handle.request(vec![2], 56_000));
  assert!(!handle.request(vec![3], 56_000));

  // stop while the first transmission is still in flight
  scheduler.control.send(TxShutdown::Discard).unwrap();
  gate_tx.send(()).unwrap();
  scheduler.shutdown(TxShutdown::Discard).unwrap();

  assert_eq!(out.try_iter().collect::<Vec<_>>(), vec![vec![0]]);
  assert_eq!(handle.stats().overflowed, 1);
  assert_eq!(handle.stats().sent, 1);
  // the scheduler is gone
  assert!(!handle.request(vec![4], 56_000));
  assert_eq!(handle.stats().skipped, 1);
}
