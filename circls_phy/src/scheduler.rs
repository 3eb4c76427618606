use crate::{pulse::PulseSequence, traits::Emitter};
use crossbeam::channel::{bounded, select, Receiver, Sender, TrySendError};
use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread::{self, JoinHandle},
};

/// A queued transmission.
struct TxRequest {
  pulses: PulseSequence,
  carrier_hz: u32,
}

/// What to do with requests still queued when the scheduler stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxShutdown {
  /// emit them before releasing the emitter
  Flush,
  /// drop them
  Discard,
}

#[derive(Debug, Default)]
struct TxCounters {
  sent: AtomicUsize,
  skipped: AtomicUsize,
  overflowed: AtomicUsize,
}

/// Transmit counters:
/// - `sent`: patterns the emitter put on the channel.
/// - `skipped`: requests dropped because the emitter was unavailable or the scheduler stopped.
/// - `overflowed`: requests dropped because the queue was full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxStats {
  pub sent: usize,
  pub skipped: usize,
  pub overflowed: usize,
}

/// A cloneable producer handle of a [`TransmitScheduler`].
#[derive(Clone)]
pub struct TxHandle {
  requests: Sender<TxRequest>,
  counters: Arc<TxCounters>,
}

impl TxHandle {
  /// Enqueue a transmission.
  /// The function returns immediately; `false` means the request was dropped.
  pub fn request(&self, pulses: PulseSequence, carrier_hz: u32) -> bool {
    match self.requests.try_send(TxRequest { pulses, carrier_hz }) {
      Ok(()) => true,
      Err(TrySendError::Full(_)) => {
        self.counters.overflowed.fetch_add(1, Ordering::Relaxed);
        log::warn!("[Tx] queue full, drop request");
        false
      }
      Err(TrySendError::Disconnected(_)) => {
        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
        log::warn!("[Tx] scheduler stopped, skip request");
        false
      }
    }
  }

  pub fn stats(&self) -> TxStats {
    TxStats {
      sent: self.counters.sent.load(Ordering::Relaxed),
      skipped: self.counters.skipped.load(Ordering::Relaxed),
      overflowed: self.counters.overflowed.load(Ordering::Relaxed),
    }
  }
}

/// Single-worker FIFO in front of the emitter.
///
/// Producers enqueue through [`TxHandle`]s without blocking.
/// One worker thread owns the emitter and issues requests one at a time, in arrival order,
/// never preempting a transmission. Requests are not coalesced.
/// A request the emitter refuses is skipped, not retried:
/// the receiver re-NAKs while the gap persists.
pub struct TransmitScheduler<E: Emitter> {
  handle: TxHandle,
  control: Sender<TxShutdown>,
  worker: Option<JoinHandle<E>>,
}

impl<E: Emitter> TransmitScheduler<E> {
  /// Move `emitter` into a new worker thread.
  /// At most `capacity` requests wait in the queue; more are dropped.
  pub fn new(emitter: E, capacity: usize) -> Self {
    assert!(capacity > 0);
    let (requests_tx, requests_rx) = bounded(capacity);
    let (control_tx, control_rx) = bounded(1);
    let counters = Arc::new(TxCounters::default());

    let worker = {
      let counters = counters.clone();
      thread::spawn(move || Self::worker(emitter, requests_rx, control_rx, counters))
    };

    Self {
      handle: TxHandle {
        requests: requests_tx,
        counters,
      },
      control: control_tx,
      worker: Some(worker),
    }
  }

  /// The worker blocks on the queue between transmissions,
  /// and exits when notified by the control channel.
  /// A pending control signal wins over pending requests.
  fn worker(mut emitter: E, requests: Receiver<TxRequest>, control: Receiver<TxShutdown>, counters: Arc<TxCounters>) -> E {
    emitter.acquire();
    loop {
      if let Ok(mode) = control.try_recv() {
        Self::finish(&mut emitter, &requests, mode, &counters);
        break;
      }
      select! {
        recv(requests) -> request => match request {
          Ok(request) => Self::emit(&mut emitter, request, &counters),
          Err(_) => break,
        },
        recv(control) -> signal => {
          Self::finish(&mut emitter, &requests, signal.unwrap_or(TxShutdown::Discard), &counters);
          break;
        }
      }
    }
    emitter.release();
    emitter
  }

  /// flush or discard whatever is still queued
  fn finish(emitter: &mut E, requests: &Receiver<TxRequest>, mode: TxShutdown, counters: &TxCounters) {
    match mode {
      TxShutdown::Flush => requests
        .try_iter()
        .for_each(|request| Self::emit(emitter, request, counters)),
      TxShutdown::Discard => {
        let discarded = requests.try_iter().count();
        log::debug!("[Tx] discard {discarded} pending requests");
      }
    }
  }

  fn emit(emitter: &mut E, request: TxRequest, counters: &TxCounters) {
    match emitter.transmit(&request.pulses, request.carrier_hz) {
      Ok(()) => {
        counters.sent.fetch_add(1, Ordering::Relaxed);
      }
      Err(err) => {
        counters.skipped.fetch_add(1, Ordering::Relaxed);
        log::warn!("[Tx] transmit skipped: {err:?}");
      }
    }
  }

  /// A producer handle; handles outliving the scheduler have their requests skipped.
  pub fn handle(&self) -> TxHandle {
    self.handle.clone()
  }

  /// Enqueue a transmission, see [`TxHandle::request`].
  pub fn request(&self, pulses: PulseSequence, carrier_hz: u32) -> bool {
    self.handle.request(pulses, carrier_hz)
  }

  pub fn stats(&self) -> TxStats {
    self.handle.stats()
  }

  /// Stop the worker, flushing or discarding the queue, and take the released emitter back.
  /// [`None`] if the worker panicked inside the emitter.
  pub fn shutdown(mut self, mode: TxShutdown) -> Option<E> {
    self.stop(mode)
  }

  fn stop(&mut self, mode: TxShutdown) -> Option<E> {
    let worker = self.worker.take()?;
    // the worker may already be gone, join reports it
    let _ = self.control.send(mode);
    worker.join().ok()
  }
}

impl<E: Emitter> Drop for TransmitScheduler<E> {
  fn drop(&mut self) {
    self.stop(TxShutdown::Discard);
  }
}

#[cfg(test)]
mod tests;
