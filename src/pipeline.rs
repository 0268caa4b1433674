//! End-to-end processing pipeline.
//!
//! Owns the touch tracker and the gesture engine and exposes the two entry
//! points a transport loop needs: feed a hardware sample, or fire a timer
//! after the requested wake delay. Both return the same [`Output`] record
//! describing what the pointer layer should do this cycle.

use tracing::info;

use crate::config::Config;
use crate::gestures::GestureEngine;
use crate::sample::Sample;
use crate::touch::TouchTracker;

/// Per-cycle result handed to the pointer-emission layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    /// Emulated button bitmask after this cycle.
    pub buttons: u32,
    /// Pointer delta to apply.
    pub dx: i32,
    pub dy: i32,
    /// If set, call [`Pipeline::handle_timer`] after this many milliseconds
    /// unless a hardware sample arrives first.
    pub wake: Option<u64>,
}

/// Touch tracking and gesture extraction behind a single entry point.
pub struct Pipeline {
    config: Config,
    tracker: TouchTracker,
    engine: GestureEngine,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        info!(
            trackpad_disable = config.trackpad_disable,
            sensitivity = config.sensitivity,
            "pipeline ready"
        );
        Self {
            config,
            tracker: TouchTracker::new(),
            engine: GestureEngine::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one hardware sample.
    pub fn handle_sample(&mut self, hw: &Sample) -> Output {
        self.tracker.update(&self.config, hw);
        self.engine.extract(&self.config, hw, &mut self.tracker);
        self.output()
    }

    /// Service pending delayed work (click releases, coast deceleration).
    /// `now` is the same monotonic millisecond clock the samples carry.
    pub fn handle_timer(&mut self, now: u64) -> Output {
        self.engine.tick(&self.config, now, &self.tracker);
        self.output()
    }

    fn output(&self) -> Output {
        Output {
            buttons: self.engine.buttons,
            dx: self.engine.move_dx,
            dy: self.engine.move_dy,
            wake: self.engine.sleep_hint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Finger;

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
    fn test_tap_click_through_pipeline() {
        let mut cfg = Config::default();
        cfg.drag.enable = false;
        let mut p = Pipeline::new(cfg);

        let out = p.handle_sample(&sample(1000, vec![finger(1, 100, 100)]));
        assert_eq!(out.buttons, 0);

        // Release resolves the tap: press now, release after tap.hold.
        let out = p.handle_sample(&sample(1050, vec![]));
        assert_eq!(out.buttons, 1);
        assert_eq!(out.wake, Some(50));

        let out = p.handle_timer(1100);
        assert_eq!(out.buttons, 0);
        assert_eq!(out.wake, None);
    }

    #[test]
    fn test_pointer_motion_through_pipeline() {
        let mut cfg = Config::default();
        cfg.drag.enable = false;
        let mut p = Pipeline::new(cfg);

        p.handle_sample(&sample(1000, vec![finger(1, 100, 100)]));
        // Far enough to stop being a tap candidate.
        let out = p.handle_sample(&sample(1010, vec![finger(1, 600, 90)]));
        assert_eq!((out.dx, out.dy), (500, -10));
        assert_eq!(out.buttons, 0);
    }
}
