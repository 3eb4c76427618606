use crate::{Payload, SeqSpace};
use std::collections::VecDeque;

/// Send side counters:
/// - `sent`: payloads given an ID.
/// - `retransmitted`: NAKs answered with a stored payload.
/// - `stale_naks`: NAKs for IDs no longer (or not yet) outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendStats {
  pub sent: usize,
  pub retransmitted: usize,
  pub stale_naks: usize,
}

/// The far end of the link: assigns IDs and keeps every outstanding payload for retransmission.
///
/// At most `limit` payloads are outstanding, `limit` no larger than the receive window,
/// which keeps the receiver able to tell a new ID from a wrapped-around one.
/// The optical link has no positive acknowledgement, the owner reports deliveries with [`SendWindow::acknowledge`].
#[derive(Debug)]
pub struct SendWindow {
  space: SeqSpace,
  limit: usize,
  /// sequence number of the oldest outstanding payload
  base: u64,
  buffer: VecDeque<Payload>,
  stats: SendStats,
}

impl SendWindow {
  pub fn new(space: SeqSpace, limit: u16) -> Self {
    assert!(
      limit > 0 && limit <= space.window_size(),
      "send limit {limit} outside the window"
    );
    Self {
      space,
      limit: limit as usize,
      base: 0,
      buffer: VecDeque::with_capacity(limit as usize),
      stats: SendStats::default(),
    }
  }

  fn id_of(&self, seq: u64) -> u16 {
    (seq % self.space.max_id() as u64) as u16
  }

  pub fn is_full(&self) -> bool {
    self.buffer.len() >= self.limit
  }

  pub fn outstanding(&self) -> usize {
    self.buffer.len()
  }

  /// Sequence number the next payload will get.
  pub fn next_seq(&self) -> u64 {
    self.base + self.buffer.len() as u64
  }

  pub fn stats(&self) -> SendStats {
    self.stats
  }

  /// Assign the next ID to `payload`, [`None`] while `limit` payloads are outstanding.
  pub fn push(&mut self, payload: Payload) -> Option<u16> {
    if self.is_full() {
      return None;
    }
    let id = self.id_of(self.next_seq());
    self.buffer.push_back(payload);
    self.stats.sent += 1;
    Some(id)
  }

  /// The first `delivered` payloads reached the consumer, forget them.
  /// Returns the number of payloads released.
  pub fn acknowledge(&mut self, delivered: u64) -> usize {
    let mut released = 0;
    while self.base < delivered && self.buffer.pop_front().is_some() {
      self.base += 1;
      released += 1;
    }
    released
  }

  /// The payload to retransmit for a NAKed `id`.
  pub fn on_nak(&mut self, id: u16) -> Option<&Payload> {
    let offset = self.space.distance(self.id_of(self.base), id) as usize;
    if offset >= self.buffer.len() {
      log::debug!("[Sender] nak for {id} not outstanding");
      self.stats.stale_naks += 1;
      return None;
    }
    self.stats.retransmitted += 1;
    self.buffer.get(offset)
  }

  /// Every outstanding payload with its ID, oldest first.
  pub fn outstanding_iter(&self) -> impl Iterator<Item = (u16, &Payload)> + '_ {
    (self.base..).zip(self.buffer.iter()).map(|(seq, payload)| (self.id_of(seq), payload))
  }
}
