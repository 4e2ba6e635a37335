//! Terminal stand-ins for the shop UI.

use cartsync_client::{CountIndicator, GuardedAction, SignInPrompt};
use serde::Serialize;

/// Cart badge rendered as a status line on stderr.
pub struct TerminalBadge;

impl CountIndicator for TerminalBadge {
    #[allow(clippy::print_stderr)]
    fn show(&self, count: u32) {
        eprintln!("[cart: {count}]");
    }

    fn hide(&self) {}
}

/// Sign-in prompt that tells the user where to sign in.
pub struct TerminalPrompt;

impl SignInPrompt for TerminalPrompt {
    #[allow(clippy::print_stderr)]
    fn require_sign_in(&self, action: GuardedAction, sign_in_url: &str) {
        eprintln!("{}", action.prompt_message());
        eprintln!("Sign in at {sign_in_url} and retry with --user <id>.");
    }
}

/// Write a value to stdout as pretty JSON.
///
/// # Errors
///
/// Returns error if the value cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write a one-line result to stdout.
#[allow(clippy::print_stdout)]
pub fn print_line(line: &str) {
    println!("{line}");
}

/// Report a failure before logging is initialized.
#[allow(clippy::print_stderr)]
pub fn report_failure(message: &str) {
    eprintln!("{message}");
}
