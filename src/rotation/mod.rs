//! Deterministic rotation engine: epoch clock, per-pool cyclic rotation and
//! boosted/primary interleaving. Everything here is pure and synchronous.

pub mod clock;
pub mod interleaver;
pub mod rotator;

pub use clock::{now_ms, RotationClock};
pub use interleaver::{interleave, unique_key};
pub use rotator::rotate;
