//! Simulated serial endpoint with bit-error injection.

use std::sync::Arc;
use std::time::Duration;

use dprot::Link;
use log::{debug, trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::queue::{ByteQueue, OverflowPolicy};

/// One end of a simulated line: writes go to `tx`, reads come from `rx`.
///
/// Each outgoing byte is replaced by a random one with probability `ber`.
#[derive(Debug)]
pub struct SimLink {
    tx: Arc<ByteQueue>,
    rx: Arc<ByteQueue>,
    ber: f64,
    rng: ChaCha8Rng,
    corrupted: u64,
}

impl SimLink {
    /// Creates an endpoint corrupting its writes with probability `ber`.
    pub fn new(tx: Arc<ByteQueue>, rx: Arc<ByteQueue>, ber: f64, seed: u64) -> Self {
        Self {
            tx,
            rx,
            ber: ber.clamp(0.0, 1.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
            corrupted: 0,
        }
    }

    /// Returns how many outgoing bytes were replaced.
    pub fn corrupted(&self) -> u64 {
        self.corrupted
    }

    /// Returns how many outgoing bytes the full queue dropped.
    pub fn overwritten(&self) -> u64 {
        self.tx.overwritten()
    }

    /// Hangs up both directions. The peer reads `None` once the line
    /// drains and its writes are discarded.
    pub fn close(&self) {
        self.tx.close();
        self.rx.close();
    }

    /// True once the inbound direction has been closed.
    pub fn rx_closed(&self) -> bool {
        self.rx.is_closed()
    }
}

impl Link for SimLink {
    fn put_byte(&mut self, byte: u8) {
        let byte = if self.ber > 0.0 && self.rng.gen_bool(self.ber) {
            self.corrupted += 1;
            let noise = self.rng.gen_range(0..=u8::MAX);
            trace!("SimLink corrupted 0x{:02X} -> 0x{:02X}", byte, noise);
            noise
        } else {
            byte
        };
        self.tx.push(byte);
    }

    fn get_byte(&mut self) -> Option<u8> {
        self.rx.pop_blocking()
    }

    fn get_byte_timeout(&mut self, timeout_ms: u32) -> Option<u8> {
        self.rx.pop_timeout(Duration::from_millis(u64::from(timeout_ms)))
    }
}

/// Creates two connected endpoints, the first for the master.
pub fn pair(
    capacity: usize,
    policy: OverflowPolicy,
    master_ber: f64,
    slave_ber: f64,
    seed: u64,
) -> (SimLink, SimLink) {
    let to_slave = Arc::new(ByteQueue::new(capacity, policy));
    let to_master = Arc::new(ByteQueue::new(capacity, policy));
    debug!(
        "Line: {} bytes each way, {:?} when full",
        to_slave.capacity(),
        to_slave.policy()
    );
    (
        SimLink::new(Arc::clone(&to_slave), Arc::clone(&to_master), master_ber, seed),
        SimLink::new(to_master, to_slave, slave_ber, seed.wrapping_add(1)),
    )
}
