use circls_arq::{
  cli_util::{err_prompt, note_prompt, ok_prompt, OverflowArg, PolicyArg},
  ChannelConfig, SendWindow, Session, SessionError, StopMode,
};
use circls_phy::{
  loopback::{LoopbackDecoder, LoopbackEmitter, LoopbackFrame},
  pulse::FrameControl,
  traits::Frame,
};
use clap::Parser;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
  time::{Duration, Instant},
};

/// Run a receiving session against a simulated sender over a lossy software link.
/// NAKs come back through the loopback emitter and trigger retransmissions.
#[derive(Parser)]
struct Loopback {
  #[arg(long, default_value_t = 1000)]
  /// number of messages to send
  messages: usize,

  #[arg(long, default_value_t = 0.1)]
  /// probability that a frame is lost on the way
  loss: f64,

  #[arg(long, default_value_t = 0.02)]
  /// probability that a frame arrives corrupted
  corrupt: f64,

  #[arg(long, default_value_t = 4)]
  /// frames shuffled together on the way, 1 keeps the sending order
  reorder: usize,

  #[arg(long, value_enum, default_value_t = PolicyArg::Threshold)]
  /// NAK policy of the receiver
  policy: PolicyArg,

  #[arg(long, default_value_t = 1)]
  /// decode workers of the receiver
  workers: usize,

  #[arg(long, value_enum, default_value_t = OverflowArg::DropOldest)]
  /// frame lost when the capture queue is full
  overflow: OverflowArg,

  #[arg(long, default_value_t = 64)]
  /// messages the sender may have outstanding
  ahead: u16,

  #[arg(long, default_value_t = 50)]
  /// re-NAK a stalled head after this many milliseconds
  nak_timeout: u64,

  #[arg(long, default_value_t = 30)]
  /// give up after this many seconds
  deadline: u64,

  #[arg(long)]
  /// seed of the link simulation
  seed: Option<u64>,

  #[arg(long)]
  /// do not print delivered messages
  quiet: bool,
}

/// Loses, corrupts and shuffles frames.
struct LossyLink {
  rng: StdRng,
  loss: f64,
  corrupt: f64,
  reorder: usize,
  in_flight: Vec<Frame>,
}

impl LossyLink {
  fn send(&mut self, mut frame: Frame) {
    if self.rng.gen_bool(self.loss) {
      return;
    }
    if self.rng.gen_bool(self.corrupt) && !frame.pixels.is_empty() {
      let at = self.rng.gen_range(0..frame.pixels.len());
      frame.pixels[at] ^= 0xff;
    }
    self.in_flight.push(frame);
  }

  fn flush(&mut self, session: &Session<LoopbackEmitter, LoopbackDecoder>) -> Result<(), SessionError> {
    for chunk in self.in_flight.chunks_mut(self.reorder.max(1)) {
      chunk.shuffle(&mut self.rng);
    }
    for frame in self.in_flight.drain(..) {
      session.submit(frame)?;
    }
    Ok(())
  }
}

fn message(seq: usize) -> Vec<u8> {
  format!("message #{seq}").into_bytes()
}

fn main() -> Result<(), SessionError> {
  env_logger::init();
  let args = Loopback::parse();

  let timeout = Duration::from_millis(args.nak_timeout.max(1));
  let config = ChannelConfig::default()
    .with_window_policy(args.policy.into())
    .with_workers(args.workers)
    .with_capture_queue(256, args.overflow.into())
    .with_nak_timeout(Some(timeout));
  let (emitter, uplink) = LoopbackEmitter::new();
  let mut session = Session::open(config, emitter, LoopbackDecoder)?;
  let space = session.config().seq_space();
  let codec = session.config().pulse_codec();
  let output = session.start()?;

  let delivered = Arc::new(AtomicUsize::new(0));
  let consumer = {
    let delivered = delivered.clone();
    let quiet = args.quiet;
    thread::spawn(move || {
      let mut out_of_order = 0;
      for (seq, payload) in output.iter().enumerate() {
        if payload != message(seq) {
          out_of_order += 1;
        }
        if !quiet {
          println!("{} {}", note_prompt(format!("[{seq}]")), String::from_utf8_lossy(&payload));
        }
        delivered.fetch_add(1, Ordering::Relaxed);
      }
      out_of_order
    })
  };

  let seed = args.seed.unwrap_or_else(rand::random);
  let mut link = LossyLink {
    rng: StdRng::seed_from_u64(seed),
    loss: args.loss.clamp(0.0, 1.0),
    corrupt: args.corrupt.clamp(0.0, 1.0),
    reorder: args.reorder,
    in_flight: Vec::new(),
  };
  let mut sender = SendWindow::new(space, args.ahead.clamp(1, space.window_size()));
  // the far end repeats everything outstanding when nothing moves, so a lost tail still gets through
  let repeat_after = timeout * 4;

  let start = Instant::now();
  let deadline = start + Duration::from_secs(args.deadline);
  let mut next = 0;
  let mut last_delivered = 0;
  let mut last_progress = start;
  while delivered.load(Ordering::Relaxed) < args.messages && Instant::now() < deadline {
    let now = Instant::now();
    let done = delivered.load(Ordering::Relaxed);
    sender.acknowledge(done as u64);
    if done != last_delivered {
      last_delivered = done;
      last_progress = now;
    }

    while next < args.messages {
      let payload = message(next);
      let Some(id) = sender.push(payload.clone()) else {
        break;
      };
      link.send(LoopbackFrame::encode(id, &payload));
      next += 1;
    }

    for transmission in uplink.try_iter() {
      match codec.decode_word(&transmission.pulses) {
        Some(word) if word.control() == FrameControl::Nak => {
          if let Some(payload) = sender.on_nak(word.id()) {
            link.send(LoopbackFrame::encode(word.id(), payload));
          }
        }
        Some(_) => log::info!("[Loopback] syn from the receiver"),
        None => log::warn!("[Loopback] undecodable uplink pattern"),
      }
    }

    if now.duration_since(last_progress) >= repeat_after {
      for (id, payload) in sender.outstanding_iter() {
        link.send(LoopbackFrame::encode(id, payload));
      }
      last_progress = now;
    }

    link.flush(&session)?;
    thread::sleep(Duration::from_millis(1));
  }

  session.stop(StopMode::Drain)?;
  let out_of_order = consumer.join().unwrap_or(usize::MAX);
  let done = delivered.load(Ordering::Relaxed);
  let stats = session.stats();
  let send_stats = sender.stats();

  println!();
  println!("{} seed {seed}, {:?}", note_prompt("link"), start.elapsed());
  println!(
    "{} sent {}, retransmitted {}, stale naks {}",
    note_prompt("sender"),
    send_stats.sent,
    send_stats.retransmitted,
    send_stats.stale_naks
  );
  println!("{} {:?}", note_prompt("window"), stats.window);
  println!("{} {:?}", note_prompt("capture"), stats.capture);
  println!("{} {:?}", note_prompt("transmit"), stats.tx);
  if done == args.messages && out_of_order == 0 {
    println!("{}", ok_prompt(format!("delivered {done} messages in order")));
  } else {
    println!(
      "{}",
      err_prompt(format!("delivered {done}/{} messages, {out_of_order} out of order", args.messages))
    );
  }
  session.close();
  Ok(())
}
