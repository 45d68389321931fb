//! Session statistics collection

/// Session statistics
///
/// Updated by [`crate::Session`] as it sends and receives messages.
#[derive(Debug, Clone, Default)]
pub struct SessionStatistics {
    /// Total number of messages sent
    pub messages_sent: u64,
    /// Total number of complete messages received, unsolicited included
    pub messages_received: u64,
    /// Number of `automatic_output` pushes received
    pub unsolicited_received: u64,
    /// Number of timeout events
    pub timeouts: u64,
    /// Number of framing failures (desync or undecodable payload)
    pub framing_errors: u64,
    /// Number of replies whose op or transmission ID did not match
    pub correlation_errors: u64,
    /// Number of `parse_fail` replies
    pub parse_failures: u64,
}

impl SessionStatistics {
    /// Create new statistics with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all statistics counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn increment_messages_sent(&mut self) {
        self.messages_sent += 1;
    }

    pub fn increment_messages_received(&mut self) {
        self.messages_received += 1;
    }

    pub fn increment_unsolicited(&mut self) {
        self.unsolicited_received += 1;
    }

    pub fn increment_timeouts(&mut self) {
        self.timeouts += 1;
    }

    pub fn increment_framing_errors(&mut self) {
        self.framing_errors += 1;
    }

    pub fn increment_correlation_errors(&mut self) {
        self.correlation_errors += 1;
    }

    pub fn increment_parse_failures(&mut self) {
        self.parse_failures += 1;
    }

    /// Get error rate as a percentage of all messages exchanged
    ///
    /// Returns 0.0 if nothing has been exchanged.
    pub fn error_rate(&self) -> f64 {
        let total_errors = self.framing_errors + self.correlation_errors + self.parse_failures;
        let total_messages = self.messages_received + self.messages_sent;
        if total_messages == 0 {
            0.0
        } else {
            (total_errors as f64 / total_messages as f64) * 100.0
        }
    }
}
