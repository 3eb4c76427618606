use crate::SeqSpace;
use circls_phy::{capture::OverflowPolicy, pulse::IrWord, pulse::PulseCodec, DefaultConfig};
use std::time::Duration;
use thiserror::Error;

/// How the receiver decides which IDs to NAK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowPolicy {
  /// NAK only the head, the oldest missing ID,
  /// when an arrival lands at least `nak_threshold` IDs ahead of it.
  #[default]
  Threshold,
  /// NAK every empty slot between the head and the furthest buffered ID.
  Sweep,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
  #[error("max id {0} is not a power of two of at least 2")]
  MaxIdNotPowerOfTwo(u16),
  #[error("max id {0} does not fit in the {id_space}-entry IR id field", id_space = IrWord::ID_SPACE)]
  MaxIdTooLarge(u16),
  #[error("pulse width must be positive")]
  ZeroPulseWidth,
  #[error("pulse width {0} exceeds {max} carrier cycles", max = PulseCodec::MAX_PULSE_WIDTH)]
  PulseWidthTooLarge(u32),
  #[error("carrier frequency must be positive")]
  ZeroCarrier,
  #[error("at least one decode worker is required")]
  NoWorkers,
  #[error("{0} queue capacity must be positive")]
  ZeroQueue(&'static str),
  #[error("nak timeout must be positive, use none to disable it")]
  ZeroNakTimeout,
  #[error("nak threshold {0} is outside 1..={1}")]
  NakThreshold(u16, u16),
}

/// Options of one optical channel.
///
/// - `max_id`: size of the circular ID space, a power of two up to 256.
/// - `pulse_width`: base pulse unit of the IR uplink, in carrier cycles, at most [`PulseCodec::MAX_PULSE_WIDTH`].
/// - `carrier_hz`: IR carrier frequency.
/// - `window_policy`: NAK decision policy.
/// - `worker_count`: number of decode workers.
/// - `tail_marker`: close every IR word with the two-pulse end marker.
/// - `capture_queue`/`overflow`: capture queue bound and what to lose when it is full.
/// - `tx_queue`: transmit queue bound.
/// - `nak_timeout`: re-NAK a stalled head after this long without progress, [`None`] to only NAK on arrivals.
///   A zero timeout is rejected.
/// - `nak_holdoff`: minimum time between two NAKs of the same ID, zero to never suppress.
/// - `nak_threshold`: distance ahead of the head that triggers a NAK under [`WindowPolicy::Threshold`].
/// - `send_syn`: emit a SYN word when the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
  pub max_id: u16,
  pub pulse_width: u32,
  pub carrier_hz: u32,
  pub window_policy: WindowPolicy,
  pub worker_count: usize,
  pub tail_marker: bool,
  pub capture_queue: usize,
  pub overflow: OverflowPolicy,
  pub tx_queue: usize,
  pub nak_timeout: Option<Duration>,
  pub nak_holdoff: Duration,
  pub nak_threshold: u16,
  pub send_syn: bool,
}

impl Default for ChannelConfig {
  fn default() -> Self {
    Self {
      max_id: DefaultConfig::MAX_ID,
      pulse_width: DefaultConfig::PULSE_WIDTH,
      carrier_hz: DefaultConfig::CARRIER_HZ,
      window_policy: WindowPolicy::default(),
      worker_count: DefaultConfig::WORKERS,
      tail_marker: DefaultConfig::TAIL_MARKER,
      capture_queue: DefaultConfig::CAPTURE_QUEUE,
      overflow: OverflowPolicy::default(),
      tx_queue: DefaultConfig::TX_QUEUE,
      nak_timeout: Some(DefaultConfig::NAK_TIMEOUT),
      nak_holdoff: Duration::ZERO,
      nak_threshold: 1,
      send_syn: true,
    }
  }
}

impl ChannelConfig {
  pub fn with_max_id(mut self, max_id: u16) -> Self {
    self.max_id = max_id;
    self
  }
  pub fn with_pulse_width(mut self, pulse_width: u32) -> Self {
    self.pulse_width = pulse_width;
    self
  }
  pub fn with_carrier(mut self, carrier_hz: u32) -> Self {
    self.carrier_hz = carrier_hz;
    self
  }
  pub fn with_window_policy(mut self, window_policy: WindowPolicy) -> Self {
    self.window_policy = window_policy;
    self
  }
  pub fn with_workers(mut self, worker_count: usize) -> Self {
    self.worker_count = worker_count;
    self
  }
  pub fn with_tail_marker(mut self, tail_marker: bool) -> Self {
    self.tail_marker = tail_marker;
    self
  }
  pub fn with_capture_queue(mut self, capacity: usize, overflow: OverflowPolicy) -> Self {
    self.capture_queue = capacity;
    self.overflow = overflow;
    self
  }
  pub fn with_tx_queue(mut self, capacity: usize) -> Self {
    self.tx_queue = capacity;
    self
  }
  pub fn with_nak_timeout(mut self, timeout: Option<Duration>) -> Self {
    self.nak_timeout = timeout;
    self
  }
  pub fn with_nak_holdoff(mut self, holdoff: Duration) -> Self {
    self.nak_holdoff = holdoff;
    self
  }
  pub fn with_nak_threshold(mut self, threshold: u16) -> Self {
    self.nak_threshold = threshold;
    self
  }
  pub fn with_syn(mut self, send_syn: bool) -> Self {
    self.send_syn = send_syn;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.max_id.is_power_of_two() || self.max_id < 2 {
      return Err(ConfigError::MaxIdNotPowerOfTwo(self.max_id));
    }
    if self.max_id > IrWord::ID_SPACE {
      return Err(ConfigError::MaxIdTooLarge(self.max_id));
    }
    if self.pulse_width == 0 {
      return Err(ConfigError::ZeroPulseWidth);
    }
    if self.pulse_width > PulseCodec::MAX_PULSE_WIDTH {
      return Err(ConfigError::PulseWidthTooLarge(self.pulse_width));
    }
    if self.carrier_hz == 0 {
      return Err(ConfigError::ZeroCarrier);
    }
    if self.worker_count == 0 {
      return Err(ConfigError::NoWorkers);
    }
    if self.capture_queue == 0 {
      return Err(ConfigError::ZeroQueue("capture"));
    }
    if self.tx_queue == 0 {
      return Err(ConfigError::ZeroQueue("transmit"));
    }
    if self.nak_timeout == Some(Duration::ZERO) {
      return Err(ConfigError::ZeroNakTimeout);
    }
    let window_size = self.max_id / 2;
    if self.nak_threshold == 0 || self.nak_threshold > window_size {
      return Err(ConfigError::NakThreshold(self.nak_threshold, window_size));
    }
    Ok(())
  }

  /// The ID space. Only meaningful on a validated config.
  pub fn seq_space(&self) -> SeqSpace {
    SeqSpace::new(self.max_id)
  }

  /// The IR uplink codec. Only meaningful on a validated config.
  pub fn pulse_codec(&self) -> PulseCodec {
    PulseCodec::new(self.pulse_width, self.max_id, self.tail_marker)
  }
}

#[cfg(test)]
mod tests {
  use super::{ChannelConfig, ConfigError, WindowPolicy};
  use circls_phy::pulse::PulseCodec;
  use std::time::Duration;

  #[test]
  fn default_is_valid() {
    let config = ChannelConfig::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.seq_space().window_size(), 128);
    assert_eq!(config.pulse_codec().pulses_per_word(), 34);
    assert_eq!(config.window_policy, WindowPolicy::Threshold);
  }

  #[test]
  fn rejects_bad_options() {
    let base = ChannelConfig::default;
    assert_eq!(
      base().with_max_id(100).validate(),
      Err(ConfigError::MaxIdNotPowerOfTwo(100))
    );
    assert_eq!(base().with_max_id(1).validate(), Err(ConfigError::MaxIdNotPowerOfTwo(1)));
    assert_eq!(base().with_max_id(512).validate(), Err(ConfigError::MaxIdTooLarge(512)));
    assert_eq!(base().with_pulse_width(0).validate(), Err(ConfigError::ZeroPulseWidth));
    assert_eq!(
      base().with_pulse_width(u32::MAX / 2).validate(),
      Err(ConfigError::PulseWidthTooLarge(u32::MAX / 2))
    );
    assert_eq!(
      base().with_nak_timeout(Some(Duration::ZERO)).validate(),
      Err(ConfigError::ZeroNakTimeout)
    );
    assert_eq!(base().with_carrier(0).validate(), Err(ConfigError::ZeroCarrier));
    assert_eq!(base().with_workers(0).validate(), Err(ConfigError::NoWorkers));
    assert_eq!(base().with_tx_queue(0).validate(), Err(ConfigError::ZeroQueue("transmit")));
    assert_eq!(
      base().with_max_id(16).with_nak_threshold(9).validate(),
      Err(ConfigError::NakThreshold(9, 8))
    );
  }

  #[test]
  fn error_messages() {
    assert_eq!(
      ConfigError::MaxIdTooLarge(512).to_string(),
      "max id 512 does not fit in the 256-entry IR id field"
    );
    assert_eq!(ConfigError::ZeroQueue("capture").to_string(), "capture queue capacity must be positive");
    assert_eq!(
      ConfigError::PulseWidthTooLarge(u32::MAX).to_string(),
      format!("pulse width {} exceeds {} carrier cycles", u32::MAX, u32::MAX / 4)
    );
  }

  #[test]
  fn widest_pulse_width_is_usable() {
    let config = ChannelConfig::default().with_pulse_width(PulseCodec::MAX_PULSE_WIDTH);
    assert_eq!(config.validate(), Ok(()));
    let codec = config.pulse_codec();
    assert_eq!(codec.decode(&codec.encode(3)), Some((3, true)));
    // a timer is either off or positive
    assert_eq!(ChannelConfig::default().with_nak_timeout(None).validate(), Ok(()));
    assert_eq!(
      ChannelConfig::default().with_nak_timeout(Some(Duration::from_nanos(1))).validate(),
      Ok(())
    );
  }
}
