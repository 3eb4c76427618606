use crate::traits::{Decoded, Frame, FrameDecoder};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread::{self, JoinHandle},
};

/// Which frame to lose when the capture queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
  /// keep the queue, drop the frame being submitted
  DropNewest,
  /// evict the oldest queued frame, the freshest frame is the most useful
  #[default]
  DropOldest,
}

/// What happens to queued frames when the pipeline stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureShutdown {
  /// decode every queued frame before the workers exit
  Drain,
  /// drop queued frames, only in-flight decodes complete
  Discard,
}

/// Submission refused: the pipeline no longer accepts frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped;

#[derive(Debug, Default)]
struct CaptureCounters {
  submitted: AtomicUsize,
  decoded: AtomicUsize,
  empty: AtomicUsize,
  dropped: AtomicUsize,
  discarded: AtomicUsize,
}

/// Capture counters:
/// - `submitted`: frames handed to [`CapturePipeline::submit`].
/// - `decoded`: frames that yielded an event.
/// - `empty`: frames without a recognizable pattern.
/// - `dropped`: frames lost to queue overflow.
/// - `discarded`: queued frames dropped by a [`CaptureShutdown::Discard`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
  pub submitted: usize,
  pub decoded: usize,
  pub empty: usize,
  pub dropped: usize,
  pub discarded: usize,
}

/// Bridge between the camera and the receiver.
///
/// Frames go into a bounded queue and a pool of worker threads, each owning a clone of the decoder,
/// pull from it. Every decoded event is handed to `on_decoded` on the worker thread.
/// With one worker, events come out in capture order;
/// with more, decode completions may reorder.
pub struct CapturePipeline {
  frames_tx: Option<Sender<Frame>>,
  frames_rx: Receiver<Frame>,
  overflow: OverflowPolicy,
  counters: Arc<CaptureCounters>,
  workers: Vec<JoinHandle<()>>,
}

impl CapturePipeline {
  /// Start `workers` decode threads behind a queue of `capacity` frames.
  pub fn new<D, F>(decoder: D, workers: usize, capacity: usize, overflow: OverflowPolicy, on_decoded: F) -> Self
  where
    D: FrameDecoder,
    F: Fn(Decoded) + Send + Sync + 'static,
  {
    assert!(workers > 0, "at least one decode worker is required");
    assert!(capacity > 0);
    let (frames_tx, frames_rx) = bounded(capacity);
    let counters = Arc::new(CaptureCounters::default());
    let on_decoded = Arc::new(on_decoded);

    let workers = (0..workers)
      .map(|_| {
        let decoder = decoder.clone();
        let frames = frames_rx.clone();
        let on_decoded = on_decoded.clone();
        let counters = counters.clone();
        thread::spawn(move || Self::worker(decoder, frames, on_decoded, counters))
      })
      .collect();

    Self {
      frames_tx: Some(frames_tx),
      frames_rx,
      overflow,
      counters,
      workers,
    }
  }

  /// Decode frames until the queue is closed and empty.
  fn worker<D, F>(mut decoder: D, frames: Receiver<Frame>, on_decoded: Arc<F>, counters: Arc<CaptureCounters>)
  where
    D: FrameDecoder,
    F: Fn(Decoded),
  {
    for frame in frames.iter() {
      match decoder.decode(&frame) {
        Some(decoded) => {
          counters.decoded.fetch_add(1, Ordering::Relaxed);
          on_decoded(decoded);
        }
        None => {
          counters.empty.fetch_add(1, Ordering::Relaxed);
        }
      }
    }
  }

  /// Queue a captured frame for decoding.
  /// The function never blocks; a full queue loses a frame according to the [`OverflowPolicy`].
  pub fn submit(&self, frame: Frame) -> Result<(), Stopped> {
    let frames = self.frames_tx.as_ref().ok_or(Stopped)?;
    self.counters.submitted.fetch_add(1, Ordering::Relaxed);
    let frame = match frames.try_send(frame) {
      Ok(()) => return Ok(()),
      Err(TrySendError::Disconnected(_)) => return Err(Stopped),
      Err(TrySendError::Full(frame)) => frame,
    };

    match self.overflow {
      OverflowPolicy::DropNewest => {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        log::debug!("[Capture] queue full, drop newest frame");
      }
      OverflowPolicy::DropOldest => {
        if self.frames_rx.try_recv().is_ok() {
          self.counters.dropped.fetch_add(1, Ordering::Relaxed);
          log::debug!("[Capture] queue full, drop oldest frame");
        }
        // another submitter may have refilled the slot
        if frames.try_send(frame).is_err() {
          self.counters.dropped.fetch_add(1, Ordering::Relaxed);
          log::debug!("[Capture] queue full, drop newest frame");
        }
      }
    }
    Ok(())
  }

  pub fn is_running(&self) -> bool {
    self.frames_tx.is_some()
  }

  /// number of frames waiting for a worker
  pub fn queued(&self) -> usize {
    self.frames_rx.len()
  }

  pub fn stats(&self) -> CaptureStats {
    CaptureStats {
      submitted: self.counters.submitted.load(Ordering::Relaxed),
      decoded: self.counters.decoded.load(Ordering::Relaxed),
      empty: self.counters.empty.load(Ordering::Relaxed),
      dropped: self.counters.dropped.load(Ordering::Relaxed),
      discarded: self.counters.discarded.load(Ordering::Relaxed),
    }
  }

  /// Stop accepting frames, drain or discard the queue, and wait for every worker to exit.
  /// No event is handed out after this returns.
  pub fn shutdown(&mut self, mode: CaptureShutdown) {
    let Some(frames) = self.frames_tx.take() else {
      return;
    };
    drop(frames);
    if mode == CaptureShutdown::Discard {
      let discarded = self.frames_rx.try_iter().count();
      self.counters.discarded.fetch_add(discarded, Ordering::Relaxed);
      log::debug!("[Capture] discard {discarded} queued frames");
    }
    for worker in self.workers.drain(..) {
      if worker.join().is_err() {
        log::warn!("[Capture] decode worker panicked");
      }
    }
  }
}

impl Drop for CapturePipeline {
  fn drop(&mut self) {
    self.shutdown(CaptureShutdown::Discard);
  }
}

#[cfg(test)]
mod tests;
