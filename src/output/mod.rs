//! Styled terminal output for the cloudmap CLI
//!
//! Only `plain` results go to stdout through the caller; everything styled
//! here except section listings is written to stderr, so piping a rendered
//! request into another tool keeps working.

use owo_colors::OwoColorize;

const GREEN: (u8, u8, u8) = (152, 225, 152);
const RED: (u8, u8, u8) = (255, 160, 160);
const YELLOW: (u8, u8, u8) = (255, 230, 160);
const BLUE: (u8, u8, u8) = (160, 200, 255);
const LAVENDER: (u8, u8, u8) = (181, 174, 254);
const GREY: (u8, u8, u8) = (160, 160, 160);

fn marked(symbol: &str, (r, g, b): (u8, u8, u8), message: &str) -> String {
    format!("{} {}", symbol.truecolor(r, g, b).bold(), message.bright_white())
}

fn grey(text: &str) -> String {
    let (r, g, b) = GREY;
    text.truecolor(r, g, b).to_string()
}

pub fn success(message: &str) {
    eprintln!("{}", marked("✓", GREEN, message));
}

/// Used by `main` for the final error of a failed invocation
pub fn error(message: &str) {
    eprintln!("{}", marked("✗", RED, message));
}

pub fn warning(message: &str) {
    eprintln!("{}", marked("⚠", YELLOW, message));
}

pub fn info(message: &str) {
    eprintln!("{}", marked("ℹ", BLUE, message));
}

/// Section header for listings (`commands`, `path`), printed to stdout
pub fn section(title: &str) {
    let (r, g, b) = LAVENDER;
    println!("\n{}", title.truecolor(r, g, b).bold());
    println!("{}", grey(&"─".repeat(50)));
}

pub fn key_value(key: &str, value: &str) {
    println!("  {} {}", grey(&format!("{}:", key)), value.bright_white());
}

pub fn dimmed(message: &str) {
    eprintln!("{}", grey(message));
}
