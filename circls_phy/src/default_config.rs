use std::time::Duration;

pub struct DefaultConfig;
impl DefaultConfig {
  /// size of the circular ID space
  pub const MAX_ID: u16 = 256;
  /// base pulse unit, in carrier cycles
  pub const PULSE_WIDTH: u32 = 8;
  /// consumer IR carrier
  pub const CARRIER_HZ: u32 = 56_000;
  /// append the two-pulse end marker to every IR word
  pub const TAIL_MARKER: bool = true;
  /// one decode worker keeps decode completions in capture order
  pub const WORKERS: usize = 1;
  pub const CAPTURE_QUEUE: usize = 8;
  pub const TX_QUEUE: usize = 64;
  /// re-NAK a stalled head after this long without progress
  pub const NAK_TIMEOUT: Duration = Duration::from_millis(500);
}
