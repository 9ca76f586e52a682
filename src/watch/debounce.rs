use std::time::{Duration, Instant};

use crate::types::Address;

pub const INVALID_ADDRESS_MESSAGE: &str =
    "Invalid wallet address. Must start with 0x and be 42 chars long.";

/// Outcome of a settled input burst. Exactly one event is emitted per burst,
/// for the final text only.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressEvent {
    /// Final text parsed as a wallet address.
    Accepted(Address),
    /// Final text was empty; the selection should be cleared without error.
    Cleared,
    /// Final text was non-empty but malformed.
    Invalid(String),
}

/// Quiet-period debouncer for the address input.
///
/// Every keystroke restarts the timer; intermediate values are discarded
/// unvalidated. Validation happens once, when the input has been quiet for
/// the full window.
#[derive(Debug)]
pub struct AddressDebouncer {
    quiet: Duration,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    text: String,
    last_edit: Instant,
}

impl AddressDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Record an edit, restarting the quiet window.
    pub fn push(&mut self, raw: &str, now: Instant) {
        self.pending = Some(Pending {
            text: raw.to_string(),
            last_edit: now,
        });
    }

    /// Emit the burst's single event once the window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<AddressEvent> {
        let pending = self.pending.as_ref()?;
        if now.saturating_duration_since(pending.last_edit) < self.quiet {
            return None;
        }
        let pending = self.pending.take()?;

        let trimmed = pending.text.trim();
        if trimmed.is_empty() {
            return Some(AddressEvent::Cleared);
        }
        match Address::parse(trimmed) {
            Some(address) => Some(AddressEvent::Accepted(address)),
            None => Some(AddressEvent::Invalid(INVALID_ADDRESS_MESSAGE.to_string())),
        }
    }
}
