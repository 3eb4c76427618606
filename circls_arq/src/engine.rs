use crate::window::{ArrivalOutcome, ReorderWindow, WindowStats};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};

/// Where the engine sends the IDs it wants retransmitted.
pub trait NakSink: Send + Sync + 'static {
  fn nak(&self, id: u16);
}

/// Queue NAKs for someone else to put on the uplink.
/// Once the receiving end is gone the NAKs are dropped, the window keeps running.
impl NakSink for Sender<u16> {
  fn nak(&self, id: u16) {
    if self.send(id).is_err() {
      log::debug!("[Engine] nak for {id} dropped, nak receiver hung up");
    }
  }
}

struct Inner<P, N> {
  window: Mutex<ReorderWindow<P>>,
  output: Sender<P>,
  naks: N,
}

/// A [`ReorderWindow`] shared by every decode worker.
///
/// One lock guards the whole window. Deliveries and NAKs are handed on while the lock is held,
/// so the output stream sees payloads in exactly the order the window drained them.
/// The output stream ends when the last clone of the engine is dropped.
pub struct ReorderEngine<P, N> {
  inner: Arc<Inner<P, N>>,
}

impl<P, N> Clone for ReorderEngine<P, N> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<P: Send + 'static, N: NakSink> ReorderEngine<P, N> {
  pub fn new(window: ReorderWindow<P>, naks: N) -> (Self, Receiver<P>) {
    let (output, delivered) = unbounded();
    let inner = Inner {
      window: Mutex::new(window),
      output,
      naks,
    };
    (
      Self {
        inner: Arc::new(inner),
      },
      delivered,
    )
  }

  pub fn on_arrival(&self, id: u16, payload: P) -> ArrivalOutcome {
    let mut window = self.inner.window.lock();
    let arrival = window.on_arrival(id, payload, Instant::now());
    for payload in arrival.delivered {
      // the consumer may have hung up, the window still advances
      let _ = self.inner.output.send(payload);
    }
    for id in arrival.naks {
      self.inner.naks.nak(id);
    }
    arrival.outcome
  }

  /// Fire the timeout NAKs that are due, returns how many were sent.
  pub fn on_tick(&self) -> usize {
    let naks = self.inner.window.lock().on_tick(Instant::now());
    for &id in naks.iter() {
      self.inner.naks.nak(id);
    }
    naks.len()
  }

  pub fn head(&self) -> u16 {
    self.inner.window.lock().head()
  }

  pub fn pending(&self) -> usize {
    self.inner.window.lock().pending()
  }

  pub fn stats(&self) -> WindowStats {
    self.inner.window.lock().stats()
  }
}
