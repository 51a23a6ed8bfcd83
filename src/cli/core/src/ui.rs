/* src/cli/core/src/ui.rs */

// Terminal output of the build binary. Library logs go through tracing to
// stderr; these progress lines go to stdout.

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level lines sit under the banner; detail lines under a step.
#[derive(Clone, Copy)]
enum Indent {
  Top,
  Detail,
}

impl Indent {
  fn pad(self) -> &'static str {
    match self {
      Self::Top => "  ",
      Self::Detail => "        ",
    }
  }
}

fn mark(indent: Indent, color: &str, symbol: char, msg: &str) {
  println!("{}{color}{symbol}{RESET} {msg}", indent.pad());
}

pub fn banner(project: &str) {
  println!();
  println!("  {BOLD}tessera-build{RESET} {project} {DIM}v{VERSION}{RESET}");
  println!();
}

pub fn step(n: u32, total: u32, msg: &str) {
  println!("  {BOLD}[{n}/{total}]{RESET} {msg}...");
}

pub fn ok(msg: &str) {
  mark(Indent::Top, GREEN, '\u{2713}', msg);
}

pub fn fail(msg: &str) {
  mark(Indent::Top, RED, '\u{2717}', msg);
}

pub fn warn(msg: &str) {
  println!("  {YELLOW}warning{RESET}: {msg}");
}

pub fn detail(msg: &str) {
  println!("{}{DIM}{msg}{RESET}", Indent::Detail.pad());
}

pub fn detail_ok(msg: &str) {
  mark(Indent::Detail, GREEN, '\u{2713}', msg);
}

/// One failed page under the current step.
pub fn detail_fail(msg: &str) {
  mark(Indent::Detail, RED, '\u{2717}', msg);
}

pub fn blank() {
  println!();
}

/// Human-readable size of a written artifact (decimal units).
pub fn format_size(bytes: u64) -> String {
  match bytes {
    0..1_000 => format!("{bytes} B"),
    1_000..1_000_000 => format!("{:.1} kB", bytes as f64 / 1_000.0),
    _ => format!("{:.1} MB", bytes as f64 / 1_000_000.0),
  }
}
