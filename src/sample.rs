//! Hardware-sample input contract.
//!
//! The transport layer (evdev, a replay file, a test harness) delivers one
//! [`Sample`] per hardware event: a monotonic timestamp, the raw button
//! bitmask, and the list of fingers currently reported by the device. This
//! crate only reads these records.

/// One finger record in a hardware sample.
///
/// `tracking_id` is assigned by the device and stays stable across samples
/// while the finger remains down; it is the identity key the touch tracker
/// reconciles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finger {
    pub tracking_id: i32,
    pub x: i32,
    pub y: i32,
    /// Major axis of the touch ellipse.
    pub touch_major: i32,
    /// Minor axis of the touch ellipse (0 if the device does not report one).
    pub touch_minor: i32,
    /// Reference width the major axis is compared against under the scale
    /// threshold policy.
    pub width_major: i32,
    pub pressure: i32,
}

/// One raw sample from the hardware transport.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    /// Monotonic event time in milliseconds.
    pub evtime: u64,
    /// Elapsed milliseconds since the previous sample.
    pub deltat: u64,
    /// Raw hardware button bitmask (bit 0 = primary physical button).
    pub buttons: u32,
    pub fingers: Vec<Finger>,
}

impl Sample {
    /// Look up a finger by tracking id.
    pub fn finger(&self, tracking_id: i32) -> Option<&Finger> {
        self.fingers.iter().find(|f| f.tracking_id == tracking_id)
    }
}
