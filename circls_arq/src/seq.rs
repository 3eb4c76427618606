/// A circular sequence-number space of `max_id` IDs, `max_id` a power of two.
///
/// The window relative to a tail covers the `window_size() + 1` IDs from the tail onwards.
/// Everything else counts as behind the tail: a stale, wrapped-around duplicate.
/// This is only sound while the sender keeps at most `window_size()` items outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpace {
  max_id: u16,
}

impl SeqSpace {
  pub fn new(max_id: u16) -> Self {
    assert!(
      max_id.is_power_of_two() && max_id >= 2,
      "max id {max_id} is not a power of two"
    );
    Self { max_id }
  }

  pub fn max_id(&self) -> u16 {
    self.max_id
  }

  pub fn window_size(&self) -> u16 {
    self.max_id / 2
  }

  fn mask(&self) -> u16 {
    self.max_id - 1
  }

  /// Is `id` a valid ID of this space
  pub fn contains(&self, id: u16) -> bool {
    id < self.max_id
  }

  /// The number of increments needed to get from `from` to `to`.
  pub fn distance(&self, from: u16, to: u16) -> u16 {
    to.wrapping_sub(from) & self.mask()
  }

  /// Is `id` within the window starting at `tail`
  pub fn in_window(&self, tail: u16, id: u16) -> bool {
    self.distance(tail, id) <= self.window_size()
  }

  /// The ID `n` steps past `id`.
  pub fn add(&self, id: u16, n: u16) -> u16 {
    id.wrapping_add(n) & self.mask()
  }

  /// The ID after `id`, wrapping around to 0.
  pub fn next(&self, id: u16) -> u16 {
    self.add(id, 1)
  }
}

#[cfg(test)]
mod tests;
