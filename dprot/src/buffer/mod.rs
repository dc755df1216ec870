//! Buffer management for links.
//!
//! - RingBuffer: Fixed-capacity byte FIFO with an overwrite mode

mod ring;

pub use ring::RingBuffer;
