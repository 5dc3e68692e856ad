//! List/preview windowing over the registry's live order.
//!
//! Pure view concern: the only state is the toggle. The window always
//! derives from the live sequence passed in, so toggling is instant and
//! registry updates show through immediately — no re-subscription, no
//! copy of the data.

use crate::config::PreviewConfig;
use crate::store::TicketDoc;

/// Preview-or-full windowing over an ordered ticket sequence.
#[derive(Debug, Clone, Copy)]
pub struct TicketList {
    preview: bool,
    preview_len: usize,
}

impl TicketList {
    /// Consoles start in preview mode, matching the dashboard default.
    #[must_use]
    pub const fn new(config: &PreviewConfig) -> Self {
        Self {
            preview: true,
            preview_len: config.preview_len,
        }
    }

    #[must_use]
    pub const fn is_preview(&self) -> bool {
        self.preview
    }

    pub const fn toggle(&mut self) {
        self.preview = !self.preview;
    }

    pub const fn set_preview(&mut self, preview: bool) {
        self.preview = preview;
    }

    /// The visible window: the first `preview_len` tickets of the live
    /// order in preview mode, the whole sequence otherwise. Never
    /// reorders or skips — a prefix of the input, always.
    #[must_use]
    pub fn display<'a>(&self, tickets: &'a [TicketDoc]) -> &'a [TicketDoc] {
        if self.preview {
            &tickets[..tickets.len().min(self.preview_len)]
        } else {
            tickets
        }
    }
}
