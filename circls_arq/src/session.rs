use crate::{window::ReorderWindow, window::WindowStats, ChannelConfig, ConfigError, NakTransmitter, Payload, ReorderEngine};
use circls_phy::{
  capture::{CapturePipeline, CaptureShutdown, CaptureStats},
  pulse::PulseSequence,
  scheduler::{TransmitScheduler, TxShutdown, TxStats},
  traits::{Decoded, Emitter, Frame, FrameDecoder},
};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::{
  thread::{self, JoinHandle},
  time::Duration,
};
use thiserror::Error;

/// What happens to in-flight work when a session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
  /// decode the queued frames and emit the queued transmissions first
  Drain,
  /// drop both
  #[default]
  Discard,
}

impl StopMode {
  fn capture(self) -> CaptureShutdown {
    match self {
      StopMode::Drain => CaptureShutdown::Drain,
      StopMode::Discard => CaptureShutdown::Discard,
    }
  }

  fn tx(self) -> TxShutdown {
    match self {
      StopMode::Drain => TxShutdown::Flush,
      StopMode::Discard => TxShutdown::Discard,
    }
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
  #[error("invalid channel config: {0}")]
  Config(#[from] ConfigError),
  #[error("session already started")]
  AlreadyRunning,
  #[error("session not started")]
  NotRunning,
  #[error("the emitter was lost by a panicking transmit worker")]
  EmitterLost,
  #[error("id {0} is outside the id space")]
  InvalidId(u16),
}

/// A snapshot of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
  pub window: WindowStats,
  pub tx: TxStats,
  pub capture: CaptureStats,
  /// the oldest ID not yet delivered
  pub head: u16,
}

/// Periodically drives the timeout NAKs of the engine.
struct Ticker {
  exit: Sender<()>,
  worker: Option<JoinHandle<()>>,
}

impl Ticker {
  fn new<F>(period: Duration, on_tick: F) -> Self
  where
    F: Fn() + Send + 'static,
  {
    let (exit, exit_rx) = bounded(1);
    let worker = thread::spawn(move || {
      let ticks = tick(period);
      loop {
        select! {
          recv(ticks) -> _ => on_tick(),
          recv(exit_rx) -> _ => break,
        }
      }
    });
    Self {
      exit,
      worker: Some(worker),
    }
  }
}

impl Drop for Ticker {
  fn drop(&mut self) {
    let _ = self.exit.send(());
    if let Some(worker) = self.worker.take() {
      let _ = worker.join();
    }
  }
}

/// Everything that lives exactly as long as one started session.
struct Running<E: Emitter> {
  engine: ReorderEngine<Payload, NakTransmitter>,
  naks: NakTransmitter,
  scheduler: TransmitScheduler<E>,
  pipeline: CapturePipeline,
  ticker: Option<Ticker>,
}

/// The receiving end of an optical channel.
///
/// A session is opened once with its capabilities and can be started and stopped repeatedly.
/// Each [`Session::start`] builds fresh window state and returns a fresh output stream;
/// [`Session::stop`] tears all of it down and gives the emitter back, so nothing leaks into the next run.
///
/// ```text
///   frames --submit--> CapturePipeline --decoded--> ReorderEngine --ordered--> output
///                                                        |
///                                                       NAK
///                                                        v
///                          transmit --------------> TransmitScheduler --> Emitter
/// ```
pub struct Session<E: Emitter, D: FrameDecoder> {
  config: ChannelConfig,
  emitter: Option<E>,
  decoder: D,
  running: Option<Running<E>>,
  last_stats: SessionStats,
}

impl<E: Emitter, D: FrameDecoder> Session<E, D> {
  pub fn open(config: ChannelConfig, emitter: E, decoder: D) -> Result<Self, SessionError> {
    config.validate()?;
    log::info!("[Session] open {config:?}");
    Ok(Self {
      config,
      emitter: Some(emitter),
      decoder,
      running: None,
      last_stats: SessionStats::default(),
    })
  }

  pub fn config(&self) -> &ChannelConfig {
    &self.config
  }

  pub fn is_running(&self) -> bool {
    self.running.is_some()
  }

  /// Start receiving.
  /// Returns the stream of delivered payloads, in ID order; it ends when the session stops.
  pub fn start(&mut self) -> Result<Receiver<Payload>, SessionError> {
    if self.running.is_some() {
      return Err(SessionError::AlreadyRunning);
    }
    let emitter = self.emitter.take().ok_or(SessionError::EmitterLost)?;
    let config = &self.config;

    let scheduler = TransmitScheduler::new(emitter, config.tx_queue);
    let naks = NakTransmitter::new(config.pulse_codec(), config.carrier_hz, scheduler.handle());
    let (engine, output) = ReorderEngine::new(ReorderWindow::from_config(config), naks.clone());

    let pipeline = {
      let engine = engine.clone();
      CapturePipeline::new(
        self.decoder.clone(),
        config.worker_count,
        config.capture_queue,
        config.overflow,
        move |decoded: Decoded| {
          engine.on_arrival(decoded.id, decoded.payload);
        },
      )
    };

    let ticker = config.nak_timeout.map(|timeout| {
      let engine = engine.clone();
      let period = (timeout / 4).max(Duration::from_millis(1));
      Ticker::new(period, move || {
        engine.on_tick();
      })
    });

    if config.send_syn {
      naks.send_syn();
    }
    log::info!(
      "[Session] start, max id {}, policy {:?}, {} workers",
      config.max_id,
      config.window_policy,
      config.worker_count
    );
    self.running = Some(Running {
      engine,
      naks,
      scheduler,
      pipeline,
      ticker,
    });
    Ok(output)
  }

  /// Hand a captured frame to the decode workers, never blocks.
  pub fn submit(&self, frame: Frame) -> Result<(), SessionError> {
    let running = self.running.as_ref().ok_or(SessionError::NotRunning)?;
    running.pipeline.submit(frame).map_err(|_| SessionError::NotRunning)
  }

  /// Ask the far end for `id` outside the window's own NAK decisions.
  /// `Ok(false)` if the transmit queue dropped the request.
  pub fn request_nak(&self, id: u16) -> Result<bool, SessionError> {
    let running = self.running.as_ref().ok_or(SessionError::NotRunning)?;
    if id >= self.config.max_id {
      return Err(SessionError::InvalidId(id));
    }
    Ok(running.naks.send_nak(id))
  }

  /// Queue an arbitrary pattern on the emitter behind the pending NAKs.
  /// `Ok(false)` if the transmit queue dropped the request.
  pub fn transmit(&self, pulses: PulseSequence) -> Result<bool, SessionError> {
    let running = self.running.as_ref().ok_or(SessionError::NotRunning)?;
    Ok(running.scheduler.request(pulses, self.config.carrier_hz))
  }

  /// Stop receiving: no more frames are accepted, in-flight work is drained or discarded per `mode`,
  /// every worker is joined and the emitter is released. The output stream ends.
  pub fn stop(&mut self, mode: StopMode) -> Result<(), SessionError> {
    let Running {
      engine,
      naks,
      scheduler,
      mut pipeline,
      ticker,
    } = self.running.take().ok_or(SessionError::NotRunning)?;

    pipeline.shutdown(mode.capture());
    drop(ticker);
    drop(naks);
    let tx = scheduler.handle();
    self.emitter = scheduler.shutdown(mode.tx());
    if self.emitter.is_none() {
      log::warn!("[Session] transmit worker panicked, emitter lost");
    }

    self.last_stats = SessionStats {
      window: engine.stats(),
      tx: tx.stats(),
      capture: pipeline.stats(),
      head: engine.head(),
    };
    log::info!("[Session] stop ({mode:?}), {:?}", self.last_stats);
    Ok(())
  }

  /// Live counters while running, those of the last run otherwise.
  pub fn stats(&self) -> SessionStats {
    match self.running.as_ref() {
      Some(running) => SessionStats {
        window: running.engine.stats(),
        tx: running.scheduler.stats(),
        capture: running.pipeline.stats(),
        head: running.engine.head(),
      },
      None => self.last_stats,
    }
  }

  /// Stop if running, and give the capabilities back.
  /// The emitter is [`None`] if a transmit worker panicked with it.
  pub fn close(mut self) -> (Option<E>, D) {
    if self.running.is_some() {
      let _ = self.stop(StopMode::Discard);
    }
    log::info!("[Session] close");
    (self.emitter.take(), self.decoder.clone())
  }
}

impl<E: Emitter, D: FrameDecoder> Drop for Session<E, D> {
  fn drop(&mut self) {
    if self.running.is_some() {
      let _ = self.stop(StopMode::Discard);
    }
  }
}
