//! Gesture extraction.
//!
//! Consumes the tracked touch set once per cycle and runs five cooperating
//! sub-state-machines: physical buttons (with click-finger emulation), tap
//! detection, movement classification (move / scroll / swipe / scale /
//! rotate), tap-to-drag, and the delayed timers (click release and coast
//! deceleration). Each cycle produces an output button bitmask, a pointer
//! delta, and the next mandatory wake.
//!
//! The engine never blocks: all waiting is a stored wake timestamp compared
//! against the timestamp of the next invocation. Between hardware samples the
//! caller drives [`GestureEngine::tick`] after the reported sleep to service
//! the delayed click release and coast deceleration.

use tracing::debug;

use crate::config::{Config, MotionConfig};
use crate::sample::Sample;
use crate::touch::{bits, ScratchFlags, Touch, TouchFlags, TouchTracker};
use crate::trig::{self, Cardinal};

/// Interval between synthetic deceleration ticks while coasting, ms.
pub const DECEL_TICK_MS: u64 = 20;

/// Movement gesture currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveKind {
    #[default]
    None,
    Move,
    Scroll,
    Swipe3,
    Swipe4,
    Scale,
    Rotate,
}

impl MoveKind {
    /// Scale and rotate accumulate squared per-touch distance, so their
    /// click threshold is squared too.
    fn squared_dist(self) -> bool {
        matches!(self, Self::Scale | Self::Rotate)
    }

    /// Only the coasting-eligible gestures track speed.
    fn tracks_speed(self) -> bool {
        matches!(self, Self::Scroll | Self::Swipe3 | Self::Swipe4)
    }
}

/// Tap-to-drag sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    None,
    /// Armed by a primary tap; reverts to `None` if no motion starts the
    /// drag before `expire`.
    Ready { expire: u64 },
    /// Motion seen; the button press is held back until `until`, and the
    /// accumulated delta cancels the drag if it grows past the cancel
    /// distance.
    Wait { until: u64, dx: i32, dy: i32 },
    Active,
}

#[derive(Debug, Clone, Copy)]
struct DelayedClick {
    button: i32,
    wake: u64,
}

#[derive(Debug, Clone, Copy)]
struct Coast {
    /// Synthetic speed, decremented every tick.
    speed: f64,
    wake: u64,
    /// Hardware button bitmask snapshot at coast start; any change stops the
    /// coast.
    buttons: u32,
}

/// Per-session gesture state. Created zeroed once and mutated in place every
/// cycle; `buttons`, `move_dx`/`move_dy` and the sleep hint are the per-cycle
/// outputs.
#[derive(Debug, Default)]
pub struct GestureEngine {
    /// Output button bitmask, consumed by the pointer-emission layer.
    pub buttons: u32,
    /// Pointer delta for the current cycle.
    pub move_dx: i32,
    pub move_dy: i32,

    /// Where an emulated primary press was remapped to, so the matching
    /// release restores correctly.
    button_emulate: Option<i32>,
    /// Hardware button bitmask of the previous sample, for edge detection.
    button_prev: u32,

    /// Timestamp of the first touch-down of the current tap session.
    tap_time_down: u64,
    tap_touching: i32,
    tap_released: i32,

    move_kind: MoveKind,
    /// End of the post-click debounce window; movement gestures other than
    /// the one in progress are suppressed until then.
    move_wait: u64,
    /// Distance accumulated since gesture start (or direction reversal),
    /// consumed modulo the click threshold.
    move_dist: i32,
    move_dir: Option<Cardinal>,
    move_speed: f64,

    drag: DragState,

    delayed_click: Option<DelayedClick>,
    coast: Option<Coast>,

    /// Minimum sleep before the caller must invoke `tick`, ms.
    sleep: Option<u64>,
}

fn valid_button(button: i32) -> bool {
    (0..32).contains(&button)
}

fn sqr(v: i32) -> i32 {
    v * v
}

fn dist_sqr(dx: i32, dy: i32) -> i32 {
    dx * dx + dy * dy
}

fn speed_of(dist: i32, deltat: u64) -> f64 {
    if deltat == 0 {
        0.0
    } else {
        dist as f64 / deltat as f64
    }
}

fn motion_cfg(cfg: &Config, kind: MoveKind) -> Option<&MotionConfig> {
    match kind {
        MoveKind::Scroll => Some(&cfg.scroll),
        MoveKind::Swipe3 => Some(&cfg.swipe3),
        MoveKind::Swipe4 => Some(&cfg.swipe4),
        MoveKind::Scale => Some(&cfg.scale),
        MoveKind::Rotate => Some(&cfg.rotate),
        MoveKind::None | MoveKind::Move => None,
    }
}

fn dir_button(mc: &MotionConfig, dir: Cardinal) -> u8 {
    match dir {
        Cardinal::Up => mc.up_btn,
        Cardinal::Down => mc.down_btn,
        Cardinal::Left => mc.left_btn,
        Cardinal::Right => mc.right_btn,
    }
}

/// Two touches moving the same way scroll along the generalized axis of the
/// first.
fn scroll_dir(t1: &Touch, t2: &Touch) -> Option<Cardinal> {
    let (d1, d2) = (t1.direction?, t2.direction?);
    if trig::angles_acute(d1, d2) < 2.0 {
        Some(trig::generalize(d1))
    } else {
        None
    }
}

/// Two touches moving perpendicular to the touch-to-touch vector, in
/// opposite senses, rotate.
fn rotate_dir(t1: &Touch, t2: &Touch) -> Option<Cardinal> {
    let (d1, d2) = (t1.direction?, t2.direction?);
    let v = trig::direction((t2.x - t1.x) as f64, (t2.y - t1.y) as f64)?;
    let cw = trig::angles_add(v, 2.0);
    let ccw = trig::angles_sub(v, 2.0);
    if trig::angles_acute(d1, cw) < 2.0 && trig::angles_acute(d2, ccw) < 2.0 {
        Some(Cardinal::Right)
    } else if trig::angles_acute(d1, ccw) < 2.0 && trig::angles_acute(d2, cw) < 2.0 {
        Some(Cardinal::Left)
    } else {
        None
    }
}

/// Two touches approaching (`Down`) or separating (`Up`) along the
/// touch-to-touch vector scale.
fn scale_dir(t1: &Touch, t2: &Touch) -> Option<Cardinal> {
    let (d1, d2) = (t1.direction?, t2.direction?);
    if trig::angles_acute(d1, d2) < 2.0 {
        return None;
    }
    let v = trig::direction((t2.x - t1.x) as f64, (t2.y - t1.y) as f64)?;
    if trig::angles_acute(v, d1) < 2.0 {
        Some(Cardinal::Down)
    } else {
        Some(Cardinal::Up)
    }
}

/// All touches moving within a quarter turn of each other swipe along the
/// generalized direction of the first.
fn swipe_dir(touches: &[&Touch]) -> Option<Cardinal> {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for t in touches {
        let d = t.direction?;
        min = min.min(d);
        max = max.max(d);
    }
    if trig::angles_acute(min, max) < 2.0 {
        Some(trig::generalize(touches[0].direction?))
    } else {
        None
    }
}

impl GestureEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one full extraction cycle over the updated touch set.
    pub fn extract(&mut self, cfg: &Config, hw: &Sample, touches: &mut TouchTracker) {
        self.dragging_update(hw.evtime);
        self.buttons_update(cfg, hw, touches);
        self.tapping_update(cfg, hw.evtime, touches);
        self.moving_update(cfg, hw, touches);
        self.delayed_update(cfg, hw.evtime, hw.buttons, hw.deltat, touches.used != 0);
    }

    /// Service pending timers between hardware samples. The caller invokes
    /// this after sleeping for [`GestureEngine::sleep_hint`].
    pub fn tick(&mut self, cfg: &Config, now: u64, touches: &TouchTracker) {
        self.move_dx = 0;
        self.move_dy = 0;
        self.delayed_update(cfg, now, self.button_prev, DECEL_TICK_MS, touches.used != 0);
    }

    /// Minimum duration to sleep before `tick` must run, or `None` when no
    /// timer is pending.
    pub fn sleep_hint(&self) -> Option<u64> {
        self.sleep
    }

    pub fn move_kind(&self) -> MoveKind {
        self.move_kind
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    fn trigger_button_up(&mut self, button: i32) {
        if !valid_button(button) {
            return;
        }
        let button = if button == 0 {
            self.button_emulate.take().unwrap_or(0)
        } else {
            button
        };
        self.buttons &= !(1 << button);
        debug!(button, "button up");
    }

    fn trigger_button_down(&mut self, button: i32) {
        if !valid_button(button) {
            return;
        }
        if self.delayed_click.is_some_and(|dc| dc.button == button) {
            debug!(button, "button down ignored, delayed release pending");
            return;
        }
        self.buttons |= 1 << button;
        debug!(button, "button down");
    }

    /// Atomically move an ongoing primary press to `button` and remember the
    /// remap for the matching release.
    fn trigger_button_emulation(&mut self, button: i32) {
        if !valid_button(button) || self.buttons & 1 == 0 {
            return;
        }
        self.buttons &= !1;
        self.buttons |= 1 << button;
        self.button_emulate = (button != 0).then_some(button);
        debug!(button, "button emulated");
    }

    /// Press `button` now and arm its release at `up_time`. Only one delayed
    /// click may be pending at a time.
    fn trigger_button_click(&mut self, button: i32, up_time: u64) {
        if !valid_button(button) {
            return;
        }
        if self.delayed_click.is_some() {
            debug!(button, "click ignored, another delayed click pending");
            return;
        }
        self.trigger_button_down(button);
        self.delayed_click = Some(DelayedClick {
            button,
            wake: up_time,
        });
        debug!(button, up_time, "click armed for delayed release");
    }

    fn trigger_drag_ready(&mut self, cfg: &Config, evtime: u64) {
        self.drag = DragState::Ready {
            expire: evtime + cfg.drag.timeout,
        };
        debug!("drag ready");
    }

    /// Feed a movement attempt into the drag machine. Returns false while the
    /// wait window swallows the motion.
    fn trigger_drag_start(&mut self, cfg: &Config, evtime: u64, dx: i32, dy: i32) -> bool {
        match self.drag {
            DragState::Ready { .. } => {
                if cfg.drag.wait == 0 {
                    self.drag = DragState::Active;
                    self.trigger_button_down(0);
                    debug!("drag active");
                } else {
                    self.drag = DragState::Wait {
                        until: evtime + cfg.drag.wait,
                        dx,
                        dy,
                    };
                    debug!("drag waiting");
                }
            }
            DragState::Wait { until, dx: wx, dy: wy } => {
                let (ax, ay) = (wx + dx, wy + dy);
                if evtime >= until {
                    self.drag = DragState::Active;
                    self.trigger_button_down(0);
                    debug!("drag active");
                } else if dist_sqr(ax, ay) > sqr(cfg.drag.dist) {
                    self.drag = DragState::None;
                    debug!("drag canceled, moved too far");
                } else {
                    self.drag = DragState::Wait { until, dx: ax, dy: ay };
                }
            }
            _ => {}
        }
        !matches!(self.drag, DragState::Wait { .. })
    }

    fn trigger_drag_stop(&mut self, force: bool) {
        match self.drag {
            DragState::Ready { .. } if force => {
                self.drag = DragState::None;
                debug!("drag canceled");
            }
            DragState::Active => {
                self.drag = DragState::None;
                self.trigger_button_up(0);
                debug!("drag stopped");
            }
            _ => {}
        }
    }

    fn trigger_reset(&mut self) {
        self.trigger_drag_stop(false);
        self.move_dx = 0;
        self.move_dy = 0;
        self.move_kind = MoveKind::None;
        self.move_wait = 0;
        self.move_dist = 0;
        self.move_speed = 0.0;
        self.move_dir = None;
    }

    fn trigger_move(&mut self, cfg: &Config, evtime: u64, dx: i32, dy: i32) {
        if (self.move_kind == MoveKind::Move || evtime >= self.move_wait)
            && (dx != 0 || dy != 0)
            && self.trigger_drag_start(cfg, evtime, dx, dy)
        {
            self.move_dx = (dx as f64 * cfg.sensitivity) as i32;
            self.move_dy = (dy as f64 * cfg.sensitivity) as i32;
            self.move_kind = MoveKind::Move;
            self.move_wait = 0;
            self.move_dist = 0;
            self.move_dir = None;
            debug!(dx, dy, "pointer move");
        }
    }

    /// Shared trigger for scroll / swipe / scale / rotate: accepted when the
    /// gesture is already in progress or the debounce window has elapsed,
    /// accumulates distance, and emits one directional click per threshold
    /// crossing, carrying the remainder over.
    fn trigger_motion(
        &mut self,
        cfg: &Config,
        kind: MoveKind,
        evtime: u64,
        deltat: u64,
        dist: i32,
        dir: Cardinal,
    ) {
        let Some(mc) = motion_cfg(cfg, kind) else {
            return;
        };
        if self.move_kind != kind && evtime < self.move_wait {
            return;
        }
        self.trigger_drag_stop(true);
        if self.move_kind != kind || self.move_dir != Some(dir) {
            self.move_dist = 0;
        }
        self.move_dx = 0;
        self.move_dy = 0;
        self.move_kind = kind;
        self.move_wait = evtime + cfg.gesture.wait;
        // The accumulator is never reduced while the threshold is 0, so it
        // must not wrap on long uninterrupted gestures.
        self.move_dist = self.move_dist.saturating_add(dist.abs());
        if kind.tracks_speed() {
            self.move_speed = speed_of(self.move_dist, deltat);
        }
        self.move_dir = Some(dir);

        let threshold = if kind.squared_dist() {
            sqr(mc.dist)
        } else {
            mc.dist
        };
        // A zero threshold disables click emission; accumulation is harmless.
        if threshold > 0 && self.move_dist >= threshold {
            self.move_dist %= threshold;
            let button = dir_button(mc, dir) as i32 - 1;
            self.trigger_button_click(button, evtime + cfg.gesture.hold);
        }
        debug!(?kind, dist, ?dir, at = self.move_dist, "gesture step");
    }

    /// Arm coast deceleration if the finished gesture qualifies.
    fn trigger_decel(&mut self, cfg: &Config, evtime: u64, hw_buttons: u32) -> bool {
        let Some(mc) = motion_cfg(cfg, self.move_kind) else {
            return false;
        };
        if !self.move_kind.tracks_speed() {
            return false;
        }
        let coast = &mc.coast;
        if coast.enable && coast.decel > 0.0 && self.move_speed >= coast.speed {
            self.coast = Some(Coast {
                speed: self.move_speed,
                wake: evtime + DECEL_TICK_MS,
                buttons: hw_buttons,
            });
            debug!(speed = self.move_speed, "coast started");
            true
        } else {
            false
        }
    }

    /// Detect rising/falling edges on the hardware button bitmask and map
    /// presses of the primary button to an emulated button by zone or by
    /// touch count.
    fn buttons_update(&mut self, cfg: &Config, hw: &Sample, touches: &mut TouchTracker) {
        if !cfg.button.enable || cfg.trackpad_disable >= 3 {
            return;
        }
        let emulate = hw.buttons & 1 != 0 && self.button_prev & 1 == 0;
        let mut down = 0;
        for i in 0..32u32 {
            let now = hw.buttons >> i & 1;
            let was = self.button_prev >> i & 1;
            if now == was {
                continue;
            }
            if now == 1 {
                down += 1;
                self.trigger_button_down(i as i32);
            } else {
                self.trigger_button_up(i as i32);
            }
        }
        self.button_prev = hw.buttons;

        if down == 0 {
            return;
        }
        // A fresh press resets movement and opens the debounce window.
        self.move_kind = MoveKind::None;
        self.move_wait = hw.evtime + cfg.gesture.wait;

        let mut earliest: Option<usize> = None;
        let mut latest: Option<usize> = None;
        for i in bits(touches.used) {
            if !touches.touches[i].valid() {
                continue;
            }
            if cfg.button.integrated {
                touches.touches[i].flags.insert(ScratchFlags::BUTTON);
            }
            if earliest.map_or(true, |e| touches.touches[i].down < touches.touches[e].down) {
                earliest = Some(i);
            }
            if latest.map_or(true, |l| touches.touches[i].down > touches.touches[l].down) {
                latest = Some(i);
            }
        }

        if !emulate {
            return;
        }
        if cfg.button.zones {
            if let Some(e) = earliest {
                self.emulate_zones(cfg, touches.touches[e].x);
            }
        } else if let Some(l) = latest {
            self.emulate_count(cfg, touches, l);
        }
    }

    /// Zone mode: the earliest touch's x position selects one of up to three
    /// equal-width zones across the pad. x has its origin at the pad center.
    fn emulate_zones(&mut self, cfg: &Config, touch_x: i32) {
        let zones = [cfg.button.touch1, cfg.button.touch2, cfg.button.touch3]
            .iter()
            .filter(|b| **b > 0)
            .count();
        if zones == 0 || cfg.button.pad_width <= 0 {
            return;
        }
        let width = cfg.button.pad_width as f64 / zones as f64;
        let pos = (cfg.button.pad_width / 2 + touch_x) as f64;
        let mut zone = zones;
        for i in 0..zones {
            if pos >= width * i as f64 && pos <= width * (i + 1) as f64 {
                zone = i;
                break;
            }
        }
        debug!(pos, zone, zones, "button zone selected");
        let button = match zone {
            0 => cfg.button.touch1,
            1 => cfg.button.touch2,
            _ => cfg.button.touch3,
        };
        self.trigger_button_emulation(button as i32 - 1);
    }

    /// Count mode: the number of valid touching fingers selects the emulated
    /// button, optionally discounting touches older than the expiry.
    fn emulate_count(&mut self, cfg: &Config, touches: &TouchTracker, latest: usize) {
        let newest_down = touches.touches[latest].down;
        let mut touching = 0i32;
        for i in bits(touches.used) {
            let t = &touches.touches[i];
            if !t.valid() {
                continue;
            }
            if cfg.button.move_emulate
                || cfg.button.expire == 0
                || newest_down < t.down + cfg.button.expire
            {
                touching += 1;
            }
        }
        if cfg.button.integrated {
            // The clicking finger itself does not count.
            touching -= 1;
        }
        let button = match touching {
            1 => cfg.button.touch1,
            2 => cfg.button.touch2,
            3 => cfg.button.touch3,
            _ => 0,
        };
        if button > 0 {
            self.trigger_button_emulation(button as i32 - 1);
        }
    }

    /// Track tap candidates and resolve a released set into a delayed click.
    fn tapping_update(&mut self, cfg: &Config, evtime: u64, touches: &mut TouchTracker) {
        if cfg.trackpad_disable >= 1 {
            return;
        }
        let released_max = if cfg.tap.touch4 > 0 {
            4
        } else if cfg.tap.touch3 > 0 {
            3
        } else if cfg.tap.touch2 > 0 {
            2
        } else if cfg.tap.touch1 > 0 {
            1
        } else {
            return;
        };

        if self.tap_time_down != 0 && evtime >= self.tap_time_down + cfg.tap.timeout {
            self.tap_time_down = 0;
            self.tap_touching = 0;
            self.tap_released = 0;
            for i in bits(touches.used) {
                touches.touches[i].flags.remove(ScratchFlags::TAP);
            }
            debug!("tap timed out");
        } else {
            for i in bits(touches.used) {
                let t = &mut touches.touches[i];
                if t.state.contains(TouchFlags::INVALID) || t.flags.contains(ScratchFlags::BUTTON)
                {
                    if t.flags.contains(ScratchFlags::TAP) {
                        t.flags.remove(ScratchFlags::TAP);
                        self.tap_touching -= 1;
                        debug!(tap_touching = self.tap_touching, "tap candidate dropped");
                    }
                    continue;
                }
                if t.state.contains(TouchFlags::NEW) {
                    t.flags.insert(ScratchFlags::TAP);
                    self.tap_touching += 1;
                    if self.tap_time_down == 0 {
                        self.tap_time_down = evtime;
                    }
                }
                if t.flags.contains(ScratchFlags::TAP) {
                    if dist_sqr(t.total_dx, t.total_dy) >= sqr(cfg.tap.dist) {
                        t.flags.remove(ScratchFlags::TAP);
                        self.tap_touching -= 1;
                        debug!(tap_touching = self.tap_touching, "tap candidate moved too far");
                    } else if t.state.contains(TouchFlags::RELEASED) {
                        self.tap_touching -= 1;
                        self.tap_released += 1;
                        debug!(
                            tap_released = self.tap_released,
                            "tap candidate released"
                        );
                    }
                }
            }
        }

        if (self.tap_touching == 0 && self.tap_released > 0)
            || self.tap_released >= released_max
        {
            for i in bits(touches.used) {
                touches.touches[i].flags.remove(ScratchFlags::TAP);
            }
            let button = match self.tap_released {
                1 => cfg.tap.touch1,
                2 => cfg.tap.touch2,
                3 => cfg.tap.touch3,
                _ => cfg.tap.touch4,
            } as i32
                - 1;
            self.trigger_button_click(button, evtime + cfg.tap.hold);
            if cfg.drag.enable && button == 0 {
                self.trigger_drag_ready(cfg, evtime);
            }
            self.move_kind = MoveKind::None;
            self.move_wait = evtime + cfg.gesture.wait;
            self.tap_time_down = 0;
            self.tap_touching = 0;
            self.tap_released = 0;
        }
    }

    /// Partition touches into button-assigned / tap-flagged / free and run
    /// the gesture family selected by the free count.
    fn moving_update(&mut self, cfg: &Config, hw: &Sample, touches: &TouchTracker) {
        let mut free = [0usize; 4];
        let mut count = 0;
        let mut btn_count = 0;
        let (mut dx, mut dy) = (0, 0);

        self.move_dx = 0;
        self.move_dy = 0;

        for i in bits(touches.used) {
            let t = &touches.touches[i];
            if t.state.contains(TouchFlags::INVALID) {
                continue;
            }
            if t.flags.contains(ScratchFlags::BUTTON) {
                btn_count += 1;
                dx += t.dx;
                dy += t.dy;
            } else if !t.flags.contains(ScratchFlags::TAP) && count < 4 {
                free[count] = i;
                count += 1;
            }
        }
        let t = |k: usize| &touches.touches[free[k]];

        match count {
            0 => {
                if btn_count >= 1 && cfg.trackpad_disable < 2 {
                    self.trigger_move(cfg, hw.evtime, dx, dy);
                } else if btn_count < 1 && !self.trigger_decel(cfg, hw.evtime, hw.buttons) {
                    self.trigger_reset();
                }
            }
            1 if cfg.trackpad_disable < 2 => {
                let (dx, dy) = (dx + t(0).dx, dy + t(0).dy);
                self.trigger_move(cfg, hw.evtime, dx, dy);
            }
            2 if cfg.trackpad_disable < 1 => {
                if let Some(dir) = scroll_dir(t(0), t(1)) {
                    let dist = match dir {
                        Cardinal::Left | Cardinal::Right => t(0).dx + t(1).dx,
                        Cardinal::Up | Cardinal::Down => t(0).dy + t(1).dy,
                    };
                    self.trigger_motion(cfg, MoveKind::Scroll, hw.evtime, hw.deltat, dist / 2, dir);
                } else if let Some(dir) = rotate_dir(t(0), t(1)) {
                    let dist = dist_sqr(t(0).dx, t(0).dy) + dist_sqr(t(1).dx, t(1).dy);
                    self.trigger_motion(cfg, MoveKind::Rotate, hw.evtime, hw.deltat, dist / 2, dir);
                } else if let Some(dir) = scale_dir(t(0), t(1)) {
                    let dist = dist_sqr(t(0).dx, t(0).dy) + dist_sqr(t(1).dx, t(1).dy);
                    self.trigger_motion(cfg, MoveKind::Scale, hw.evtime, hw.deltat, dist / 2, dir);
                }
            }
            3 if cfg.trackpad_disable < 1 => {
                if let Some(dir) = swipe_dir(&[t(0), t(1), t(2)]) {
                    let dist = match dir {
                        Cardinal::Left | Cardinal::Right => t(0).dx + t(1).dx + t(2).dx,
                        Cardinal::Up | Cardinal::Down => t(0).dy + t(1).dy + t(2).dy,
                    };
                    self.trigger_motion(cfg, MoveKind::Swipe3, hw.evtime, hw.deltat, dist / 3, dir);
                }
            }
            4 if cfg.trackpad_disable < 1 => {
                if let Some(dir) = swipe_dir(&[t(0), t(1), t(2), t(3)]) {
                    let dist = match dir {
                        Cardinal::Left | Cardinal::Right => {
                            t(0).dx + t(1).dx + t(2).dx + t(3).dx
                        }
                        Cardinal::Up | Cardinal::Down => t(0).dy + t(1).dy + t(2).dy + t(3).dy,
                    };
                    self.trigger_motion(cfg, MoveKind::Swipe4, hw.evtime, hw.deltat, dist / 4, dir);
                }
            }
            _ => {}
        }
    }

    fn dragging_update(&mut self, evtime: u64) {
        if let DragState::Ready { expire } = self.drag {
            if evtime > expire {
                debug!("drag expired");
                self.trigger_drag_stop(true);
            }
        }
    }

    fn delayed_update(
        &mut self,
        cfg: &Config,
        evtime: u64,
        hw_buttons: u32,
        deltat: u64,
        any_touch: bool,
    ) {
        let click = self.delayed_click_update(evtime);
        let decel = self.delayed_decel_update(cfg, evtime, hw_buttons, deltat, any_touch);
        self.sleep = match (click, decel) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
    }

    /// Release a pending delayed click once its wake time elapses. Returns
    /// the remaining sleep, if any.
    fn delayed_click_update(&mut self, evtime: u64) -> Option<u64> {
        let dc = self.delayed_click?;
        if evtime >= dc.wake {
            self.trigger_button_up(dc.button);
            self.delayed_click = None;
            None
        } else {
            Some(dc.wake - evtime)
        }
    }

    /// Step coast deceleration: reduce the synthetic speed and re-feed it to
    /// the coasting gesture as this tick's distance. Returns the remaining
    /// sleep, if any.
    fn delayed_decel_update(
        &mut self,
        cfg: &Config,
        evtime: u64,
        hw_buttons: u32,
        deltat: u64,
        any_touch: bool,
    ) -> Option<u64> {
        let mut coast = self.coast?;
        if evtime < coast.wake {
            return Some(coast.wake - evtime);
        }

        let decel = motion_cfg(cfg, self.move_kind)
            .filter(|_| self.move_kind.tracks_speed())
            .map(|mc| mc.coast.decel)
            .filter(|d| *d > 0.0);
        coast.speed = match decel {
            Some(d) => coast.speed - d,
            None => 0.0,
        };

        if any_touch || coast.buttons != hw_buttons || coast.speed <= 0.0 {
            self.coast = None;
            debug!("coast stopped");
            return None;
        }

        if let Some(dir) = self.move_dir {
            let kind = self.move_kind;
            self.trigger_motion(cfg, kind, evtime, deltat, coast.speed as i32, dir);
        }
        coast.wake = evtime + DECEL_TICK_MS;
        self.coast = Some(coast);
        debug!(speed = coast.speed, "coast tick");
        Some(DECEL_TICK_MS)
    }
}
