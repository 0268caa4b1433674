//! Multitouch tracking and gesture extraction for touchpads.
//!
//! Two cooperating state machines, consumed in strict order once per input
//! sample:
//! 1. [`touch::TouchTracker`] reconciles a raw per-sample finger list into
//!    identity-stable touch records with thumb/palm classification.
//! 2. [`gestures::GestureEngine`] classifies the per-cycle touch deltas into
//!    pointer motion, taps, clicks, drags, scrolls, multi-finger swipes,
//!    pinch-scale and rotate gestures, emitted as a button bitmask plus a
//!    pointer delta.
//!
//! [`pipeline::Pipeline`] wires the two together and reports the next
//! mandatory wake so the caller can service delayed click releases and coast
//! deceleration between hardware samples.
//!
//! All timing is driven by monotonic millisecond timestamps supplied by the
//! caller; nothing in here reads a clock, so the whole pipeline can be driven
//! by synthetic sample sequences in tests.

pub mod config;
pub mod error;
pub mod gestures;
pub mod pipeline;
pub mod sample;
pub mod touch;
pub mod trig;

pub use config::Config;
pub use error::Error;
pub use gestures::GestureEngine;
pub use pipeline::{Output, Pipeline};
pub use sample::{Finger, Sample};
pub use touch::TouchTracker;
