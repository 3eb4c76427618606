use circls_arq::cli_util::{err_prompt, note_prompt, ok_prompt};
use circls_phy::{
  pulse::{IrWord, PulseCodec},
  DefaultConfig,
};
use clap::{Parser, Subcommand};
use std::process;

/// Print the IR pulse pattern of a NAK or SYN word
#[derive(Parser)]
struct NakPattern {
  #[command(subcommand)]
  word: Word,

  #[arg(
    long,
    default_value_t = DefaultConfig::PULSE_WIDTH,
    value_parser = clap::value_parser!(u32).range(1..=PulseCodec::MAX_PULSE_WIDTH as i64)
  )]
  /// base pulse unit, in carrier cycles
  pulse_width: u32,

  #[arg(long, default_value_t = DefaultConfig::CARRIER_HZ, value_parser = clap::value_parser!(u32).range(1..))]
  /// carrier frequency in Hz
  carrier: u32,

  #[arg(long)]
  /// leave out the two-pulse end marker
  no_tail: bool,

  #[arg(long)]
  /// decode the pattern back and check it
  decode: bool,
}

#[derive(Subcommand, Clone, Copy)]
enum Word {
  /// Request a retransmission of an ID
  Nak {
    #[arg(value_parser = clap::value_parser!(u16).range(0..256))]
    id: u16,
  },
  /// Announce the receiver
  Syn,
}

fn main() {
  env_logger::init();
  let NakPattern {
    word,
    pulse_width,
    carrier,
    no_tail,
    decode,
  } = NakPattern::parse();

  let codec = PulseCodec::new(pulse_width, IrWord::ID_SPACE, !no_tail);
  let word = match word {
    Word::Nak { id } => IrWord::nak(id),
    Word::Syn => IrWord::syn(),
  };
  let pulses = codec.encode_word(word);
  let cycles: u64 = pulses.iter().map(|&pulse| pulse as u64).sum();

  println!("{} {:?}", note_prompt("word"), word);
  println!("{} {:#018b}", note_prompt("bits"), word.into_bits());
  println!(
    "{} {}",
    note_prompt(format!("pulses[{}]", pulses.len())),
    pulses.iter().map(|pulse| pulse.to_string()).collect::<Vec<_>>().join(",")
  );
  println!(
    "{} {cycles} cycles, {}us at {carrier}Hz",
    note_prompt("duration"),
    cycles * 1_000_000 / carrier as u64
  );

  if decode {
    match codec.decode_word(&pulses) {
      Some(decoded) if decoded == word => println!("{} {:?}", ok_prompt("decoded"), decoded),
      decoded => {
        println!("{} {:?}", err_prompt("decode mismatch"), decoded);
        process::exit(1);
      }
    }
  }
}
