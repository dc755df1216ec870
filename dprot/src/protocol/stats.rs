//! Per-role counters.

/// Statistics about master operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MasterStats {
    /// Logical messages started (data, pings).
    pub messages_sent: u64,

    /// Logical messages that ended with an ACK.
    pub messages_acked: u64,

    /// Logical messages that ran out of attempts.
    pub messages_failed: u64,

    /// Frames put on the wire, first attempts included.
    pub transmissions: u64,

    /// Frames put on the wire again for the same message.
    pub retransmissions: u64,

    /// ACKs accepted.
    pub acks_received: u64,

    /// NACKs accepted.
    pub nacks_received: u64,

    /// Replies discarded as short, stale or corrupted.
    pub replies_rejected: u64,
}

impl MasterStats {
    /// Creates new empty statistics.
    pub const fn new() -> Self {
        Self {
            messages_sent: 0,
            messages_acked: 0,
            messages_failed: 0,
            transmissions: 0,
            retransmissions: 0,
            acks_received: 0,
            nacks_received: 0,
            replies_rejected: 0,
        }
    }

    /// Returns the retransmission rate as a percentage.
    pub fn retransmit_rate(&self) -> f32 {
        if self.transmissions == 0 {
            0.0
        } else {
            (self.retransmissions as f32 / self.transmissions as f32) * 100.0
        }
    }

    /// Returns the success rate as a percentage.
    pub fn success_rate(&self) -> f32 {
        let total = self.messages_acked + self.messages_failed;
        if total == 0 {
            100.0
        } else {
            (self.messages_acked as f32 / total as f32) * 100.0
        }
    }

    /// Resets all statistics.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Statistics about slave operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SlaveStats {
    /// Frames taken off the link.
    pub frames_received: u64,

    /// Data payloads handed to the application.
    pub delivered: u64,

    /// Retransmissions recognized by parity.
    pub duplicates: u64,

    /// Pings accepted.
    pub pings: u64,

    /// SYNC messages accepted.
    pub syncs: u64,

    /// NACKs sent for corrupted frames.
    pub nacks_sent: u64,

    /// Frames rejected without a NACK (short or unknown type).
    pub rejected: u64,
}

impl SlaveStats {
    /// Creates new empty statistics.
    pub const fn new() -> Self {
        Self {
            frames_received: 0,
            delivered: 0,
            duplicates: 0,
            pings: 0,
            syncs: 0,
            nacks_sent: 0,
            rejected: 0,
        }
    }

    /// Returns the share of frames that were retransmissions, as a percentage.
    pub fn duplicate_rate(&self) -> f32 {
        if self.frames_received == 0 {
            0.0
        } else {
            (self.duplicates as f32 / self.frames_received as f32) * 100.0
        }
    }

    /// Resets all statistics.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_rates() {
        let mut stats = MasterStats::new();
        assert_eq!(stats.retransmit_rate(), 0.0);
        assert_eq!(stats.success_rate(), 100.0);

        stats.transmissions = 10;
        stats.retransmissions = 5;
        stats.messages_acked = 3;
        stats.messages_failed = 1;
        assert_eq!(stats.retransmit_rate(), 50.0);
        assert_eq!(stats.success_rate(), 75.0);

        stats.reset();
        assert_eq!(stats, MasterStats::default());
    }

    #[test]
    fn test_slave_duplicate_rate() {
        let stats = SlaveStats {
            frames_received: 4,
            duplicates: 1,
            ..SlaveStats::new()
        };
        assert_eq!(stats.duplicate_rate(), 25.0);
    }
}
