//! Configuration store.
//!
//! Every numeric threshold consumed by the touch tracker and the gesture
//! engine lives here. The tree deserializes from TOML; missing top-level
//! fields and sections fall back to the defaults below. A gesture section
//! (`[scroll]`, `[swipe3]`, ...) that appears in a file replaces the whole
//! section, so it must name its full binding set.
//!
//! Button bindings are 1-based; 0 means unbound. Durations are milliseconds,
//! distances are device coordinate units, size thresholds are percentages.

use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

/// How finger size/pressure metrics map to touch-down and release decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Touch major axis relative to the reported width, percent.
    Scale,
    /// Touch major axis relative to the calibrated `[min, max]` range, percent.
    Size,
    /// Pressure relative to the calibrated `[min, max]` range, percent.
    Pressure,
    /// Every reported finger counts as touching.
    #[default]
    Always,
}

/// Touch-down, release, and thumb/palm classification thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub policy: ThresholdPolicy,
    /// Touch-down threshold, percent of the policy metric.
    pub down: i32,
    /// Release threshold, percent of the policy metric.
    pub up: i32,
    /// Calibrated metric range for the size and pressure policies.
    pub min: i32,
    pub max: i32,
    /// Device reports a minor touch axis; required for thumb detection.
    pub minor: bool,
    /// Minor/major axis ratio above which a touch may be a thumb, percent.
    pub thumb_ratio: i32,
    /// Size above which a touch may be a thumb, percent.
    pub thumb_size: i32,
    pub ignore_thumb: bool,
    pub disable_on_thumb: bool,
    /// Size above which a touch is a palm, percent.
    pub palm_size: i32,
    pub ignore_palm: bool,
    pub disable_on_palm: bool,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::Always,
            down: 5,
            up: 5,
            min: 0,
            max: 100,
            minor: true,
            thumb_ratio: 70,
            thumb_size: 25,
            ignore_thumb: false,
            disable_on_thumb: false,
            palm_size: 40,
            ignore_palm: true,
            disable_on_palm: false,
        }
    }
}

/// Physical button handling and click-finger emulation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub enable: bool,
    /// The pad itself is the button; the clicking finger rides the press.
    pub integrated: bool,
    /// Count mode: ignore touches older than this relative to the newest
    /// touch, ms. 0 disables the age check.
    pub expire: u64,
    /// Count mode: count touches regardless of age.
    pub move_emulate: bool,
    /// Select the emulated button by touch position instead of touch count.
    pub zones: bool,
    /// Pad width for zone mode; x coordinates have their origin at the pad
    /// center.
    pub pad_width: i32,
    /// Emulated buttons for 1/2/3-finger presses (or zones left to right).
    pub touch1: u8,
    pub touch2: u8,
    pub touch3: u8,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enable: true,
            integrated: true,
            expire: 100,
            move_emulate: true,
            zones: false,
            pad_width: 0,
            touch1: 1,
            touch2: 3,
            touch3: 2,
        }
    }
}

/// Tap detection thresholds and per-arity button bindings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Emulated buttons for 1/2/3/4-finger taps; 0 disables that arity.
    pub touch1: u8,
    pub touch2: u8,
    pub touch3: u8,
    pub touch4: u8,
    /// Tap session timeout from the first touch-down, ms.
    pub timeout: u64,
    /// How long the emitted click is held before the delayed release, ms.
    pub hold: u64,
    /// Cumulative motion beyond which a touch stops being a tap candidate.
    pub dist: i32,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            touch1: 1,
            touch2: 3,
            touch3: 2,
            touch4: 0,
            timeout: 120,
            hold: 50,
            dist: 400,
        }
    }
}

/// Tap-to-drag behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    pub enable: bool,
    /// How long after a primary tap the drag stays armed, ms.
    pub timeout: u64,
    /// Delay between the first drag motion and the button press, ms.
    /// 0 presses immediately.
    pub wait: u64,
    /// Motion beyond this during the wait window cancels the drag.
    pub dist: i32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            enable: true,
            timeout: 500,
            wait: 0,
            dist: 20,
        }
    }
}

/// Timing shared by all movement gestures.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Debounce window after a click during which new movement gestures are
    /// suppressed, ms.
    pub wait: u64,
    /// Hold duration for gesture-emitted clicks, ms.
    pub hold: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { wait: 100, hold: 50 }
    }
}

/// Coast (inertial deceleration) settings for one gesture kind.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CoastConfig {
    pub enable: bool,
    /// Minimum gesture speed (distance per ms) required to start coasting.
    pub speed: f64,
    /// Speed subtracted on every deceleration tick.
    pub decel: f64,
}

/// Distance threshold and per-direction button bindings for one movement
/// gesture. Scale and rotate compare against the square of `dist`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Distance per emitted click; 0 disables click emission.
    pub dist: i32,
    pub up_btn: u8,
    pub down_btn: u8,
    pub left_btn: u8,
    pub right_btn: u8,
    pub coast: CoastConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Master switch: 0 = everything on, 1 = no tap/scroll/swipe/scale/rotate,
    /// 2 = additionally no pointer movement, 3 = additionally no buttons.
    pub trackpad_disable: u8,
    /// Pointer delta multiplier.
    pub sensitivity: f64,
    pub touch: TouchConfig,
    pub button: ButtonConfig,
    pub tap: TapConfig,
    pub drag: DragConfig,
    pub gesture: TimingConfig,
    pub scroll: MotionConfig,
    pub swipe3: MotionConfig,
    pub swipe4: MotionConfig,
    pub scale: MotionConfig,
    pub rotate: MotionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trackpad_disable: 0,
            sensitivity: 1.0,
            touch: TouchConfig::default(),
            button: ButtonConfig::default(),
            tap: TapConfig::default(),
            drag: DragConfig::default(),
            gesture: TimingConfig::default(),
            scroll: MotionConfig {
                dist: 150,
                up_btn: 4,
                down_btn: 5,
                left_btn: 6,
                right_btn: 7,
                coast: CoastConfig::default(),
            },
            swipe3: MotionConfig {
                dist: 700,
                up_btn: 8,
                down_btn: 9,
                left_btn: 10,
                right_btn: 11,
                coast: CoastConfig::default(),
            },
            swipe4: MotionConfig {
                dist: 700,
                ..MotionConfig::default()
            },
            scale: MotionConfig {
                dist: 150,
                up_btn: 12,
                down_btn: 13,
                ..MotionConfig::default()
            },
            rotate: MotionConfig {
                dist: 150,
                left_btn: 14,
                right_btn: 15,
                ..MotionConfig::default()
            },
        }
    }
}

impl Config {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }
}
