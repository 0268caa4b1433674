//! Touch lifecycle tracking.
//!
//! Reconciles each raw hardware sample against a fixed-capacity slot arena of
//! tracked touches, keeping tracking-id identity stable across samples and
//! classifying thumb and palm contacts. A released touch stays visible for
//! exactly one cycle (so gesture logic can observe the release) and its slot
//! is reclaimed at the start of the next. Gesture decisions live in
//! [`crate::gestures`]; this layer only maintains the touch set.

use bitflags::bitflags;
use tracing::{trace, warn};

use crate::config::{Config, ThresholdPolicy, TouchConfig};
use crate::sample::{Finger, Sample};
use crate::trig;

/// Slot capacity of the tracker, matched to the width of the used-slots mask.
pub const MAX_TOUCHES: usize = 32;

bitflags! {
    /// Lifecycle state of a tracked touch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TouchFlags: u8 {
        /// First sample this touch appeared in.
        const NEW = 1 << 0;
        /// No longer present; the slot is reclaimed next cycle.
        const RELEASED = 1 << 1;
        /// Excluded from gesture consideration.
        const INVALID = 1 << 2;
        const THUMB = 1 << 3;
        const PALM = 1 << 4;
    }
}

bitflags! {
    /// Gesture-scratch flags. The gesture engine owns these; they are stored
    /// per touch so they vanish with the slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ScratchFlags: u8 {
        /// Currently a tap candidate.
        const TAP = 1 << 0;
        /// Reassigned as a virtual-button finger.
        const BUTTON = 1 << 1;
    }
}

bitflags! {
    /// Cycle-scoped summary of the tracked set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PadFlags: u8 {
        const THUMB = 1 << 0;
        const PALM = 1 << 1;
    }
}

/// One tracked contact.
#[derive(Debug, Clone, Copy, Default)]
pub struct Touch {
    pub tracking_id: i32,
    pub x: i32,
    pub y: i32,
    /// Delta since the previous sample.
    pub dx: i32,
    pub dy: i32,
    /// Cumulative delta since touch-down.
    pub total_dx: i32,
    pub total_dy: i32,
    /// Quantized direction of the last delta, eighth-turns.
    pub direction: Option<f64>,
    /// Touch-down timestamp, ms.
    pub down: u64,
    pub state: TouchFlags,
    pub flags: ScratchFlags,
}

impl Touch {
    /// Whether the touch participates in gesture consideration.
    pub fn valid(&self) -> bool {
        !self.state.contains(TouchFlags::INVALID)
    }
}

/// Iterate the set bit indices of a slot mask.
pub fn bits(mask: u32) -> impl Iterator<Item = usize> {
    (0..MAX_TOUCHES).filter(move |i| mask & (1 << i) != 0)
}

/// Fixed-capacity touch arena addressed by a used-slots bitmask.
///
/// A slot is live iff its bit is set in `used`. Slots are only reused after
/// explicit reclamation, so an index stays bound to the same contact for that
/// contact's whole lifetime.
#[derive(Debug, Default)]
pub struct TouchTracker {
    pub touches: [Touch; MAX_TOUCHES],
    pub used: u32,
    /// Event time of the current cycle, ms.
    pub evtime: u64,
    /// Cycle-scoped thumb/palm summary.
    pub summary: PadFlags,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live slots (including touches released this cycle).
    pub fn count(&self) -> usize {
        self.used.count_ones() as usize
    }

    /// Ingest one hardware sample and update the tracked set.
    pub fn update(&mut self, cfg: &Config, hw: &Sample) {
        self.summary = PadFlags::empty();
        self.evtime = hw.evtime;

        self.reclaim();

        // Release touches absent from this sample.
        for i in bits(self.used) {
            if hw.finger(self.touches[i].tracking_id).is_none() {
                self.release(i);
            }
        }

        // Reconcile fingers against existing touches, then classify.
        let mut disable = false;
        for f in &hw.fingers {
            let n = match self.find(f.tracking_id) {
                Some(n) => {
                    if is_release(&cfg.touch, f) {
                        self.release(n);
                    } else {
                        self.advance(n, f);
                    }
                    Some(n)
                }
                None if is_touch(&cfg.touch, f) => self.append(f),
                None => None,
            };
            let Some(n) = n else { continue };

            let t = &mut self.touches[n];
            if !t.state.contains(TouchFlags::INVALID) {
                if is_thumb(&cfg.touch, f) {
                    if cfg.touch.ignore_thumb {
                        t.state.insert(TouchFlags::INVALID);
                    }
                    t.state.insert(TouchFlags::THUMB);
                }
                if is_palm(&cfg.touch, f) {
                    if cfg.touch.ignore_palm {
                        t.state.insert(TouchFlags::INVALID);
                    }
                    t.state.insert(TouchFlags::PALM);
                }
            }
            if t.state.contains(TouchFlags::THUMB) {
                self.summary.insert(PadFlags::THUMB);
                disable |= cfg.touch.disable_on_thumb;
            }
            if t.state.contains(TouchFlags::PALM) {
                self.summary.insert(PadFlags::PALM);
                disable |= cfg.touch.disable_on_palm;
            }
        }

        if disable {
            self.invalidate_all();
        }
    }

    /// Look up a live touch by tracking id.
    pub fn find(&self, tracking_id: i32) -> Option<usize> {
        bits(self.used).find(|&i| self.touches[i].tracking_id == tracking_id)
    }

    /// Free every slot still marked released from the prior cycle.
    fn reclaim(&mut self) {
        for i in bits(self.used) {
            if self.touches[i].state.contains(TouchFlags::RELEASED) {
                self.used &= !(1 << i);
            }
        }
    }

    fn append(&mut self, f: &Finger) -> Option<usize> {
        let n = (!self.used).trailing_zeros() as usize;
        if n >= MAX_TOUCHES {
            warn!(
                tracking_id = f.tracking_id,
                "too many touches to track, ignoring touch"
            );
            return None;
        }
        self.touches[n] = Touch {
            tracking_id: f.tracking_id,
            x: f.x,
            y: f.y,
            down: self.evtime,
            state: TouchFlags::NEW,
            ..Touch::default()
        };
        self.used |= 1 << n;
        trace!(slot = n, tracking_id = f.tracking_id, "touch down");
        Some(n)
    }

    fn advance(&mut self, n: usize, f: &Finger) {
        let t = &mut self.touches[n];
        t.dx = f.x - t.x;
        t.dy = f.y - t.y;
        t.total_dx += t.dx;
        t.total_dy += t.dy;
        t.x = f.x;
        t.y = f.y;
        t.direction = trig::direction(t.dx as f64, t.dy as f64);
        t.state.remove(TouchFlags::NEW);
    }

    fn release(&mut self, n: usize) {
        let t = &mut self.touches[n];
        t.dx = 0;
        t.dy = 0;
        t.direction = None;
        t.state.remove(TouchFlags::NEW);
        t.state.insert(TouchFlags::RELEASED);
        trace!(slot = n, tracking_id = t.tracking_id, "touch released");
    }

    fn invalidate_all(&mut self) {
        for i in bits(self.used) {
            self.touches[i].state.insert(TouchFlags::INVALID);
        }
    }
}

fn percentage(part: i32, whole: i32) -> i32 {
    if whole == 0 {
        0
    } else {
        (part as f64 / whole as f64 * 100.0) as i32
    }
}

fn range_ratio(cfg: &TouchConfig, value: i32) -> i32 {
    percentage(value - cfg.min, cfg.max - cfg.min)
}

fn is_touch(cfg: &TouchConfig, f: &Finger) -> bool {
    match cfg.policy {
        ThresholdPolicy::Scale => percentage(f.touch_major, f.width_major) > cfg.down,
        ThresholdPolicy::Size => range_ratio(cfg, f.touch_major) > cfg.down,
        ThresholdPolicy::Pressure => range_ratio(cfg, f.pressure) > cfg.down,
        ThresholdPolicy::Always => true,
    }
}

fn is_release(cfg: &TouchConfig, f: &Finger) -> bool {
    match cfg.policy {
        ThresholdPolicy::Scale => percentage(f.touch_major, f.width_major) < cfg.up,
        ThresholdPolicy::Size => range_ratio(cfg, f.touch_major) < cfg.up,
        ThresholdPolicy::Pressure => range_ratio(cfg, f.pressure) < cfg.up,
        ThresholdPolicy::Always => false,
    }
}

fn is_thumb(cfg: &TouchConfig, f: &Finger) -> bool {
    if !cfg.minor {
        return false;
    }
    let ratio = percentage(f.touch_minor.min(f.touch_major), f.touch_minor.max(f.touch_major));
    let size = range_ratio(cfg, f.touch_major);
    ratio > cfg.thumb_ratio && size > cfg.thumb_size
}

fn is_palm(cfg: &TouchConfig, f: &Finger) -> bool {
    // Only the size-derived policies can tell a palm from a finger.
    if cfg.policy != ThresholdPolicy::Scale && cfg.policy != ThresholdPolicy::Size {
        return false;
    }
    range_ratio(cfg, f.touch_major) > cfg.palm_size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finger(id: i32, x: i32, y: i32) -> Finger {
        Finger {
            tracking_id: id,
            x,
            y,
            touch_major: 10,
            touch_minor: 10,
            width_major: 100,
            pressure: 50,
        }
    }

    fn sample(evtime: u64, fingers: Vec<Finger>) -> Sample {
        Sample {
            evtime,
            deltat: 10,
            buttons: 0,
            fingers,
        }
    }

    #[test]
    fn test_identity_stable_across_samples() {
        let cfg = Config::default();
        let mut ms = TouchTracker::new();

        ms.update(&cfg, &sample(0, vec![finger(7, 100, 100)]));
        assert_eq!(ms.count(), 1);
        let slot = ms.find(7).unwrap();
        assert!(ms.touches[slot].state.contains(TouchFlags::NEW));

        ms.update(&cfg, &sample(10, vec![finger(7, 110, 95)]));
        ms.update(&cfg, &sample(20, vec![finger(7, 125, 90)]));

        assert_eq!(ms.count(), 1);
        assert_eq!(ms.find(7), Some(slot));
        let t = &ms.touches[slot];
        assert!(!t.state.contains(TouchFlags::NEW));
        assert_eq!((t.dx, t.dy), (15, -5));
        assert_eq!((t.total_dx, t.total_dy), (25, -10));
        assert_eq!((t.x, t.y), (125, 90));
    }

    #[test]
    fn test_release_visible_one_cycle_then_reclaimed() {
        let cfg = Config::default();
        let mut ms = TouchTracker::new();

        ms.update(&cfg, &sample(0, vec![finger(1, 10, 10)]));
        ms.update(&cfg, &sample(10, vec![]));

        let slot = ms.find(1).unwrap();
        let t = &ms.touches[slot];
        assert!(t.state.contains(TouchFlags::RELEASED));
        assert_eq!((t.dx, t.dy), (0, 0));
        assert_eq!(t.direction, None);

        ms.update(&cfg, &sample(20, vec![]));
        assert_eq!(ms.count(), 0);
        assert_eq!(ms.find(1), None);
    }

    #[test]
    fn test_slot_reuse_after_reclaim() {
        let cfg = Config::default();
        let mut ms = TouchTracker::new();

        ms.update(&cfg, &sample(0, vec![finger(1, 10, 10)]));
        ms.update(&cfg, &sample(10, vec![]));
        ms.update(&cfg, &sample(20, vec![finger(2, 50, 50)]));

        let slot = ms.find(2).unwrap();
        assert_eq!(slot, 0);
        let t = &ms.touches[slot];
        assert!(t.state.contains(TouchFlags::NEW));
        assert_eq!(t.flags, ScratchFlags::empty());
        assert_eq!(t.down, 20);
    }

    #[test]
    fn test_capacity_bound_drops_excess() {
        let cfg = Config::default();
        let mut ms = TouchTracker::new();

        let fingers: Vec<Finger> = (0..40).map(|i| finger(i, i * 10, 100)).collect();
        ms.update(&cfg, &sample(0, fingers));

        assert_eq!(ms.count(), MAX_TOUCHES);
        // The first 32 fingers are tracked, the rest were dropped.
        assert!(ms.find(31).is_some());
        assert!(ms.find(32).is_none());

        // Existing slots survive further over-capacity samples intact.
        let fingers: Vec<Finger> = (0..40).map(|i| finger(i, i * 10 + 5, 100)).collect();
        ms.update(&cfg, &sample(10, fingers));
        let slot = ms.find(0).unwrap();
        assert_eq!(ms.touches[slot].dx, 5);
    }

    #[test]
    fn test_release_threshold_policy() {
        let mut cfg = Config::default();
        cfg.touch.policy = ThresholdPolicy::Pressure;
        cfg.touch.down = 30;
        cfg.touch.up = 20;
        let mut ms = TouchTracker::new();

        // Below the touch-down threshold: never tracked.
        let mut light = finger(1, 10, 10);
        light.pressure = 20;
        ms.update(&cfg, &sample(0, vec![light]));
        assert_eq!(ms.count(), 0);

        // Firm press: tracked. Pressure dropping below `up` releases it even
        // though the finger is still reported.
        let firm = finger(1, 10, 10);
        ms.update(&cfg, &sample(10, vec![firm]));
        assert_eq!(ms.count(), 1);
        let mut fading = finger(1, 12, 10);
        fading.pressure = 10;
        ms.update(&cfg, &sample(20, vec![fading]));
        let slot = ms.find(1).unwrap();
        assert!(ms.touches[slot].state.contains(TouchFlags::RELEASED));
    }

    #[test]
    fn test_thumb_invalidated_when_ignored() {
        let mut cfg = Config::default();
        cfg.touch.policy = ThresholdPolicy::Size;
        cfg.touch.down = 5;
        cfg.touch.up = 4;
        cfg.touch.ignore_thumb = true;
        let mut ms = TouchTracker::new();

        // Elongated large contact: minor/major = 80% > 70, size 50 > 25.
        let mut thumb = finger(1, 10, 10);
        thumb.touch_major = 50;
        thumb.touch_minor = 40;
        ms.update(&cfg, &sample(0, vec![thumb, finger(2, 200, 200)]));

        let t = &ms.touches[ms.find(1).unwrap()];
        assert!(t.state.contains(TouchFlags::THUMB));
        assert!(t.state.contains(TouchFlags::INVALID));
        assert!(ms.summary.contains(PadFlags::THUMB));
        // The other touch is unaffected.
        assert!(ms.touches[ms.find(2).unwrap()].valid());
    }

    #[test]
    fn test_palm_disables_all_touches() {
        let mut cfg = Config::default();
        cfg.touch.policy = ThresholdPolicy::Size;
        cfg.touch.down = 5;
        cfg.touch.up = 4;
        cfg.touch.disable_on_palm = true;
        let mut ms = TouchTracker::new();

        let mut palm = finger(1, 10, 10);
        palm.touch_major = 60;
        palm.touch_minor = 20;
        ms.update(&cfg, &sample(0, vec![finger(2, 200, 200), palm]));

        assert!(ms.summary.contains(PadFlags::PALM));
        for i in bits(ms.used) {
            assert!(!ms.touches[i].valid());
        }
    }
}
