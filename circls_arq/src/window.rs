use crate::{ChannelConfig, SeqSpace, WindowPolicy};
use bitvec::{bitvec, vec::BitVec};
use std::time::{Duration, Instant};

/// What a single arrival did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
  /// stored ahead of a gap
  Buffered,
  /// the arrival filled the head, this many payloads were drained
  Delivered(usize),
  /// replaced a payload already pending for the same ID
  Duplicate,
  /// behind the head, an old ID that wrapped around
  Stale,
  /// outside the ID space
  Invalid,
}

impl ArrivalOutcome {
  /// Was the payload taken into the window
  pub fn is_accepted(&self) -> bool {
    !matches!(self, ArrivalOutcome::Stale | ArrivalOutcome::Invalid)
  }
}

/// The effect of one arrival: payloads to deliver in order, IDs to NAK.
#[derive(Debug, PartialEq, Eq)]
pub struct Arrival<P> {
  pub outcome: ArrivalOutcome,
  pub delivered: Vec<P>,
  pub naks: Vec<u16>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
  pub delivered: usize,
  pub duplicates: usize,
  pub stale: usize,
  pub invalid: usize,
  /// all NAKs issued, timeout NAKs included
  pub naks: usize,
  pub timeout_naks: usize,
}

/// Receive window over a circular ID space.
///
/// Payloads are stored in the slot of their ID and drained from `head` as soon as the head slot is filled,
/// so the output is in ID order whatever the arrival order is.
/// When the head is blocked the window decides which missing IDs to NAK according to its [`WindowPolicy`].
///
/// Not thread-safe, see [`crate::ReorderEngine`] for the shared version.
#[derive(Debug)]
pub struct ReorderWindow<P> {
  space: SeqSpace,
  policy: WindowPolicy,
  threshold: u16,
  holdoff: Duration,
  timeout: Option<Duration>,
  slots: Vec<Option<P>>,
  occupied: BitVec,
  head: u16,
  // distance from the head to the furthest buffered ID, zero when nothing is buffered
  furthest: u16,
  last_nak: Vec<Option<Instant>>,
  last_activity: Instant,
  stats: WindowStats,
}

impl<P> ReorderWindow<P> {
  pub fn new(space: SeqSpace, policy: WindowPolicy) -> Self {
    let size = space.max_id() as usize;
    Self {
      space,
      policy,
      threshold: 1,
      holdoff: Duration::ZERO,
      timeout: None,
      slots: std::iter::repeat_with(|| None).take(size).collect(),
      occupied: bitvec![0; size],
      head: 0,
      furthest: 0,
      last_nak: vec![None; size],
      last_activity: Instant::now(),
      stats: WindowStats::default(),
    }
  }

  /// Window configured by a validated [`ChannelConfig`].
  pub fn from_config(config: &ChannelConfig) -> Self {
    Self::new(config.seq_space(), config.window_policy)
      .with_threshold(config.nak_threshold)
      .with_holdoff(config.nak_holdoff)
      .with_timeout(config.nak_timeout)
  }

  /// Under [`WindowPolicy::Threshold`], NAK the head once an arrival lands at least `threshold` IDs ahead of it.
  pub fn with_threshold(mut self, threshold: u16) -> Self {
    assert!(
      threshold >= 1 && threshold <= self.space.window_size(),
      "threshold {threshold} outside the window"
    );
    self.threshold = threshold;
    self
  }

  /// Suppress a NAK for an ID that was already NAKed less than `holdoff` ago.
  pub fn with_holdoff(mut self, holdoff: Duration) -> Self {
    self.holdoff = holdoff;
    self
  }

  /// Re-NAK a blocked head after `timeout` without progress.
  pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
    assert!(timeout != Some(Duration::ZERO), "nak timeout must be positive");
    self.timeout = timeout;
    self
  }

  pub fn space(&self) -> SeqSpace {
    self.space
  }

  pub fn policy(&self) -> WindowPolicy {
    self.policy
  }

  /// The oldest ID not yet delivered.
  pub fn head(&self) -> u16 {
    self.head
  }

  /// Number of payloads waiting behind a gap.
  pub fn pending(&self) -> usize {
    self.occupied.count_ones()
  }

  /// The head is missing while later IDs are buffered.
  pub fn is_blocked(&self) -> bool {
    self.furthest > 0
  }

  pub fn stats(&self) -> WindowStats {
    self.stats
  }

  pub fn on_arrival(&mut self, id: u16, payload: P, now: Instant) -> Arrival<P> {
    if !self.space.contains(id) {
      log::debug!("[Window] invalid id {id} discarded");
      self.stats.invalid += 1;
      return self.rejected(ArrivalOutcome::Invalid);
    }
    let distance = self.space.distance(self.head, id);
    if distance > self.space.window_size() {
      log::debug!("[Window] stale id {id} discarded, head {}", self.head);
      self.stats.stale += 1;
      return self.rejected(ArrivalOutcome::Stale);
    }

    let was_blocked = self.is_blocked();
    let slot = id as usize;
    let duplicate = self.occupied[slot];
    self.slots[slot] = Some(payload);
    self.occupied.set(slot, true);
    self.furthest = self.furthest.max(distance);

    let delivered = self.drain();
    let outcome = if !delivered.is_empty() {
      ArrivalOutcome::Delivered(delivered.len())
    } else if duplicate {
      self.stats.duplicates += 1;
      ArrivalOutcome::Duplicate
    } else {
      ArrivalOutcome::Buffered
    };
    if !delivered.is_empty() || (!was_blocked && self.is_blocked()) {
      self.last_activity = now;
    }

    let candidates = match self.policy {
      WindowPolicy::Threshold => {
        let still_pending = self.occupied[slot];
        if still_pending && self.space.distance(self.head, id) >= self.threshold {
          vec![self.head]
        } else {
          Vec::new()
        }
      }
      WindowPolicy::Sweep => self.gaps(),
    };
    let naks = self.filter_naks(candidates, now);
    if !naks.is_empty() {
      log::debug!("[Window] id {id} arrived, head {} missing, nak {naks:?}", self.head);
      self.last_activity = now;
    }
    Arrival { outcome, delivered, naks }
  }

  /// Re-NAK when the head has been blocked for the configured timeout.
  /// Returns the IDs to NAK, empty when nothing is due.
  pub fn on_tick(&mut self, now: Instant) -> Vec<u16> {
    let Some(timeout) = self.timeout else {
      return Vec::new();
    };
    if !self.is_blocked() || now.saturating_duration_since(self.last_activity) < timeout {
      return Vec::new();
    }
    self.last_activity = now;
    let candidates = match self.policy {
      WindowPolicy::Threshold => vec![self.head],
      WindowPolicy::Sweep => self.gaps(),
    };
    let naks = self.filter_naks(candidates, now);
    if !naks.is_empty() {
      log::info!("[Window] head {} stalled for {timeout:?}, nak {naks:?}", self.head);
      self.stats.timeout_naks += naks.len();
    }
    naks
  }

  fn rejected(&self, outcome: ArrivalOutcome) -> Arrival<P> {
    Arrival {
      outcome,
      delivered: Vec::new(),
      naks: Vec::new(),
    }
  }

  fn drain(&mut self) -> Vec<P> {
    let mut delivered = Vec::new();
    loop {
      let slot = self.head as usize;
      if !self.occupied[slot] {
        break;
      }
      if let Some(payload) = self.slots[slot].take() {
        delivered.push(payload);
      }
      self.occupied.set(slot, false);
      self.last_nak[slot] = None;
      self.head = self.space.next(self.head);
      self.furthest = self.furthest.saturating_sub(1);
    }
    self.stats.delivered += delivered.len();
    delivered
  }

  /// Every empty slot between the head and the furthest buffered ID.
  fn gaps(&self) -> Vec<u16> {
    (0..self.furthest)
      .map(|offset| self.space.add(self.head, offset))
      .filter(|&id| !self.occupied[id as usize])
      .collect()
  }

  fn filter_naks(&mut self, candidates: Vec<u16>, now: Instant) -> Vec<u16> {
    let mut naks = Vec::with_capacity(candidates.len());
    for id in candidates {
      let slot = id as usize;
      debug_assert!(!self.occupied[slot]);
      let held = match self.last_nak[slot] {
        Some(at) => now.saturating_duration_since(at) < self.holdoff,
        None => false,
      };
      if held {
        continue;
      }
      self.last_nak[slot] = Some(now);
      naks.push(id);
    }
    self.stats.naks += naks.len();
    naks
  }
}
