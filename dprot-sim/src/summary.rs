//! End-of-run accounting.

use std::fmt;

use dprot::{MasterStats, Reply, Result, SlaveStats};

/// How one message sent by the master ended.
#[derive(Debug, Clone)]
pub struct Sent {
    pub payload: Vec<u8>,
    pub outcome: Result<Reply>,
}

impl Sent {
    /// Returns true if the master saw an ACK for this message.
    pub fn acked(&self) -> bool {
        matches!(self.outcome, Ok(Reply::Ack))
    }
}

/// Result of matching delivered payloads against the sent sequence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Messages found in the delivered stream, in order.
    pub matched: usize,
    /// ACKed messages that never reached the application.
    pub missing: usize,
    /// Deliveries that do not correspond to any sent message in order.
    pub unexpected: usize,
}

impl Delivery {
    /// Walks both sequences in order.
    ///
    /// Each delivered payload consumes the next sent message equal to it;
    /// the sent messages it skips over were lost. A delivery that equals no
    /// later sent message is unexpected and consumes nothing. Unacknowledged
    /// messages may or may not have arrived; acknowledged ones must have.
    pub fn check(sent: &[Sent], delivered: &[Vec<u8>]) -> Self {
        let mut check = Self::default();
        let mut next = 0;

        for payload in delivered {
            match sent[next..].iter().position(|m| &m.payload == payload) {
                Some(offset) => {
                    let skipped = &sent[next..next + offset];
                    check.missing += skipped.iter().filter(|m| m.acked()).count();
                    check.matched += 1;
                    next += offset + 1;
                }
                None => check.unexpected += 1,
            }
        }

        check.missing += sent[next..].iter().filter(|m| m.acked()).count();
        check
    }

    /// Every ACKed message was delivered exactly once, in order.
    pub fn exactly_once(&self) -> bool {
        self.missing == 0 && self.unexpected == 0
    }
}

/// Everything printed at the end of a run.
#[derive(Debug)]
pub struct Summary {
    pub acks: usize,
    pub nacks: usize,
    pub errors: usize,
    pub delivery: Delivery,
    pub master: MasterStats,
    pub slave: SlaveStats,
    pub corrupted: (u64, u64),
    pub overwritten: (u64, u64),
}

impl Summary {
    pub fn new(sent: &[Sent], delivered: &[Vec<u8>], master: MasterStats, slave: SlaveStats) -> Self {
        Self {
            acks: sent.iter().filter(|m| m.acked()).count(),
            nacks: sent
                .iter()
                .filter(|m| matches!(m.outcome, Ok(Reply::Nack)))
                .count(),
            errors: sent.iter().filter(|m| m.outcome.is_err()).count(),
            delivery: Delivery::check(sent, delivered),
            master,
            slave,
            corrupted: (0, 0),
            overwritten: (0, 0),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Simulation Summary ===")?;
        writeln!(
            f,
            "Master: {} ACK, {} NACK, {} errors ({} transmissions, {:.1}% retransmitted)",
            self.acks,
            self.nacks,
            self.errors,
            self.master.transmissions,
            self.master.retransmit_rate()
        )?;
        writeln!(
            f,
            "Slave: {} delivered, {} duplicates, {} NACKs sent, {} rejected",
            self.slave.delivered, self.slave.duplicates, self.slave.nacks_sent, self.slave.rejected
        )?;
        writeln!(
            f,
            "Line: {} / {} bytes corrupted, {} / {} bytes overwritten (to slave / to master)",
            self.corrupted.0, self.corrupted.1, self.overwritten.0, self.overwritten.1
        )?;
        write!(
            f,
            "Delivery: {} matched, {} missing, {} unexpected => exactly once: {}",
            self.delivery.matched,
            self.delivery.missing,
            self.delivery.unexpected,
            if self.delivery.exactly_once() { "yes" } else { "NO" }
        )
    }
}
