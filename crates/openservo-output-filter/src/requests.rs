//! Clear and inject request registers
//!
//! Two independent per-channel flag arrays with different retirement rules:
//!
//! - `clear` is a pulse. Whatever sets it, it is visible for exactly one cycle
//!   and is dropped at the end of that cycle whether or not anything in the
//!   pipeline consumed it.
//! - `inject` is sticky. It stays set until the engine services it, until a
//!   clear pulse on the same channel, or until it is cancelled by a write.
//!
//! The engine reads both arrays during a cycle, then calls
//! [`RequestRegisters::retire_cycle`] and only afterwards applies the writes
//! presented on that cycle, so a write always wins over the self-clear.

use tracing::warn;

/// Per-channel clear and inject flags.
///
/// # Example
///
/// ```
/// use openservo_output_filter::RequestRegisters;
///
/// let mut requests = RequestRegisters::new(8);
/// requests.request_inject(5);
/// requests.request_inject(2);
/// assert_eq!(requests.lowest_pending_inject(), Some(2));
///
/// requests.retire_cycle(Some(2));
/// assert_eq!(requests.lowest_pending_inject(), Some(5));
/// ```
#[derive(Debug, Clone)]
pub struct RequestRegisters {
    clear: Vec<bool>,
    inject: Vec<bool>,
}

impl RequestRegisters {
    /// Create registers for `channels` channels, all flags low.
    #[must_use]
    pub fn new(channels: usize) -> Self {
        Self {
            clear: vec![false; channels],
            inject: vec![false; channels],
        }
    }

    /// Raise the clear pulse for `channel`.
    pub fn request_clear(&mut self, channel: usize) {
        match self.clear.get_mut(channel) {
            Some(flag) => *flag = true,
            None => warn!(channel, "clear request for unknown channel dropped"),
        }
    }

    /// Set the sticky inject flag for `channel`.
    pub fn request_inject(&mut self, channel: usize) {
        match self.inject.get_mut(channel) {
            Some(flag) => *flag = true,
            None => warn!(channel, "inject request for unknown channel dropped"),
        }
    }

    /// Drop a pending injection for `channel`.
    pub fn cancel_inject(&mut self, channel: usize) {
        if let Some(flag) = self.inject.get_mut(channel) {
            *flag = false;
        }
    }

    /// Whether the clear pulse for `channel` is visible this cycle.
    #[must_use]
    pub fn is_clear(&self, channel: usize) -> bool {
        self.clear.get(channel).copied().unwrap_or(false)
    }

    /// Whether an injection is pending for `channel`.
    #[must_use]
    pub fn is_inject_pending(&self, channel: usize) -> bool {
        self.inject.get(channel).copied().unwrap_or(false)
    }

    /// Lowest-indexed channel with a pending injection.
    #[must_use]
    pub fn lowest_pending_inject(&self) -> Option<usize> {
        self.inject.iter().position(|&pending| pending)
    }

    /// Channels with a pending injection, low to high.
    pub fn pending_injections(&self) -> impl Iterator<Item = usize> + '_ {
        self.inject
            .iter()
            .enumerate()
            .filter_map(|(channel, &pending)| pending.then_some(channel))
    }

    /// Channels whose clear pulse is visible this cycle, low to high.
    pub fn active_clears(&self) -> impl Iterator<Item = usize> + '_ {
        self.clear
            .iter()
            .enumerate()
            .filter_map(|(channel, &set)| set.then_some(channel))
    }

    /// Whether any clear pulse is visible this cycle.
    #[must_use]
    pub fn any_clear(&self) -> bool {
        self.clear.iter().any(|&set| set)
    }

    /// End-of-cycle retirement.
    ///
    /// Every clear pulse drops (taking the channel's pending injection with
    /// it) and the injection serviced this cycle, if any, is acknowledged.
    pub fn retire_cycle(&mut self, serviced_inject: Option<usize>) {
        for (clear, inject) in self.clear.iter_mut().zip(self.inject.iter_mut()) {
            if *clear {
                *inject = false;
            }
            *clear = false;
        }

        if let Some(channel) = serviced_inject {
            self.cancel_inject(channel);
        }
    }

    /// Synchronous reset: every clear pulse raised, every injection dropped.
    pub fn assert_reset(&mut self) {
        self.clear.fill(true);
        self.inject.fill(false);
    }
}
