//! Terminal output and prompts for the rendezvous demo

use colored::{ColoredString, Colorize};
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn status(mark: ColoredString, message: &str) {
    println!("{} {}", mark.bold(), message);
}

pub fn success(message: &str) {
    status("✓".green(), message);
}

/// Errors go to stderr so piped invites stay clean
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn info(message: &str) {
    status("•".blue(), message);
}

pub fn warning(message: &str) {
    status("!".yellow(), message);
}

/// Title for a session step
pub fn header(text: &str) {
    println!("\n{}", format!("== {text} ==").bold());
}

/// Indented `label: value` line
pub fn key_value(label: &str, value: &str) {
    println!("  {:<11} {}", format!("{label}:").cyan(), value);
}

/// The check code, boxed so both devices can be compared at a glance
pub fn check_code(code: &str) {
    let rule = "─".repeat(code.len() + 4);
    println!("\n  ┌{rule}┐");
    println!("  │  {}  │", code.bold().green());
    println!("  └{rule}┘\n");
}

/// Spinner shown while a long poll is outstanding
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("◐◓◑◒ ")
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Whether we can prompt the user for a code comparison
pub fn is_interactive() -> bool {
    Term::stderr().is_term()
}

pub fn confirm(prompt: &str, default: bool) -> anyhow::Result<bool> {
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

pub fn input(prompt: &str) -> anyhow::Result<String> {
    Ok(dialoguer::Input::new()
        .with_prompt(prompt)
        .interact_text()?)
}

/// Render the invite as a QR code for the joining device to scan
pub fn qr_code(invite: &str) -> anyhow::Result<()> {
    let rendered = qrcode::QrCode::new(invite.as_bytes())?
        .render::<char>()
        .dark_color('█')
        .light_color(' ')
        .quiet_zone(true)
        .module_dimensions(2, 1)
        .build();

    println!("{rendered}");
    Ok(())
}

pub fn separator() {
    println!("{}", "┄".repeat(60).dimmed());
}

/// Pretty-printed invite JSON for verbose runs
pub fn json(value: &serde_json::Value) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        println!("{}", pretty.dimmed());
    }
}
