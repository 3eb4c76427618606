use crate::WindowPolicy;
use circls_phy::capture::OverflowPolicy;
use clap::ValueEnum;
use console::{style, StyledObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
  /// NAK the oldest missing ID
  Threshold,
  /// NAK every missing ID
  Sweep,
}

impl From<PolicyArg> for WindowPolicy {
  fn from(arg: PolicyArg) -> Self {
    match arg {
      PolicyArg::Threshold => WindowPolicy::Threshold,
      PolicyArg::Sweep => WindowPolicy::Sweep,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverflowArg {
  DropNewest,
  DropOldest,
}

impl From<OverflowArg> for OverflowPolicy {
  fn from(arg: OverflowArg) -> Self {
    match arg {
      OverflowArg::DropNewest => OverflowPolicy::DropNewest,
      OverflowArg::DropOldest => OverflowPolicy::DropOldest,
    }
  }
}

pub fn ok_prompt<D>(prompt: D) -> StyledObject<D> {
  style(prompt).green().bold()
}
pub fn err_prompt<D>(prompt: D) -> StyledObject<D> {
  style(prompt).red().bold()
}
pub fn note_prompt<D>(prompt: D) -> StyledObject<D> {
  style(prompt).yellow().dim()
}
