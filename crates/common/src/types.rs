//! Core time types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Ticks per second for [`TickTime`].
///
/// Divisible by every common video/audio rate (24, 25, 30, 48000, 96000,
/// 30000/1001, ...) so frame and sample boundaries land on exact ticks.
pub const TICKS_PER_SECOND: i64 = 254_016_000_000;

/// Fixed-point time position or duration, in ticks.
///
/// All marker and clip boundaries are stored in ticks; frame counts are
/// derived on demand from a [`Rational`] rate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickTime(pub i64);

impl TickTime {
    pub const ZERO: Self = Self(0);

    pub fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub fn ticks(self) -> i64 {
        self.0
    }

    pub fn from_seconds(secs: f64) -> Self {
        Self((secs * TICKS_PER_SECOND as f64).round() as i64)
    }

    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    /// Converts a frame count at `rate` into ticks.
    ///
    /// Exact for every rate whose frame duration divides the tick rate;
    /// intermediate math is done in 128 bits so hour-scale positions at
    /// fractional rates do not overflow.
    pub fn from_frames(frames: i64, rate: Rational) -> Self {
        debug_assert!(rate.num > 0, "frame rate must be non-zero");
        let ticks = frames as i128 * TICKS_PER_SECOND as i128 * rate.den as i128
            / rate.num as i128;
        Self(ticks as i64)
    }

    /// Converts this time into whole frames at `rate`, truncating toward zero.
    pub fn to_frames(self, rate: Rational) -> i64 {
        debug_assert!(rate.num > 0, "frame rate must be non-zero");
        let frames =
            self.0 as i128 * rate.num as i128 / (rate.den as i128 * TICKS_PER_SECOND as i128);
        frames as i64
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for TickTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TickTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for TickTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}

/// Rational number for frame rates (e.g., 30000/1001 for 29.97fps).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    pub const FPS_24: Self = Self { num: 24, den: 1 };
    pub const FPS_25: Self = Self { num: 25, den: 1 };
    pub const FPS_30: Self = Self { num: 30, den: 1 };
    pub const FPS_29_97: Self = Self {
        num: 30000,
        den: 1001,
    };
    pub const FPS_50: Self = Self { num: 50, den: 1 };
    pub const FPS_60: Self = Self { num: 60, den: 1 };
    pub const FPS_59_94: Self = Self {
        num: 60000,
        den: 1001,
    };

    pub fn new(num: u32, den: u32) -> Self {
        assert!(den > 0, "Rational denominator must be > 0");
        Self { num, den }
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// A zero numerator marks an unusable rate; callers must check before
    /// deriving frame counts.
    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    /// Nominal whole frames per second (30 for 29.97, 24 for 24, ...).
    pub fn nominal_fps(self) -> i64 {
        if self.den == 0 {
            return 0;
        }
        (self.num as f64 / self.den as f64).round() as i64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Formats a tick position as a non-drop `HH:MM:SS:FF` timecode at `rate`.
///
/// Negative times format as `00:00:00:00`; display only, never parsed back.
pub fn format_timecode(time: TickTime, rate: Rational) -> String {
    if rate.is_zero() || time.is_negative() {
        return "00:00:00:00".to_string();
    }
    let fps = rate.nominal_fps().max(1);
    let total_frames = time.to_frames(rate);
    let frames = total_frames % fps;
    let total_secs = total_frames / fps;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours:02}:{mins:02}:{secs:02}:{frames:02}")
}

/// Stable identifier for markers, tags, assets, and media-info records.
///
/// Generated ids are v4 UUID strings, but foreign ids read back from
/// metadata written by other tools are preserved verbatim, so the payload
/// stays an opaque string rather than a parsed UUID.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The empty id, used where a parent reference does not apply.
    pub fn nil() -> Self {
        Self(String::new())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
