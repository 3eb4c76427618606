/// Reasons an [`Emitter`] could not put a pulse sequence on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
  /// the transmitter is not initialized, or the permission was revoked
  Unavailable,
  /// the driver accepted the pattern but failed to emit it
  Failed,
}

/// The physical transmitter (IR blaster, LED driver).
/// The optical channel is a single exclusive resource:
/// only the transmit scheduler worker owns and drives an emitter.
pub trait Emitter: Send + 'static {
  /// Claim the channel before the first transmission of a session.
  fn acquire(&mut self) {}

  /// Emit `pulses`, alternating on/off durations in carrier cycles, modulated on a `carrier_hz` carrier.
  /// The function should not return until the whole pattern is out.
  fn transmit(&mut self, pulses: &[u32], carrier_hz: u32) -> Result<(), EmitError>;

  /// Give the channel back at the end of a session.
  fn release(&mut self) {}
}
