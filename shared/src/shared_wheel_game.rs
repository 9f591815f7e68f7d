use std::f64::consts::PI;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{
    BIG_REWARD_THRESHOLD, COLOR_MPT_BLUE, COLOR_MPT_YELLOW, COLOR_WHITE, CONFETTI_THRESHOLD,
    EMPTY_SLICES_ERROR, NO_WEIGHT_ERROR,
};
use crate::validation::HEX_COLOR;

/// One weighted, selectable outcome on the wheel.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Slice {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 64))]
    pub label: String,
    pub reward: u64,
    pub glyph: String,
    #[validate(range(min = 0.0))]
    pub weight: f64,
    #[validate(regex = "HEX_COLOR")]
    pub color: String,
}

impl Slice {
    pub fn new(id: &str, label: &str, reward: u64, glyph: &str, weight: f64, color: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            reward,
            glyph: glyph.to_string(),
            weight,
            color: color.to_string(),
        }
    }

    pub fn tier(&self) -> RewardTier {
        RewardTier::of(self.reward)
    }
}

/// The reward set a fresh store starts with.
pub fn default_slices() -> Vec<Slice> {
    vec![
        Slice::new("1", "NoteBook", 2500, "📓", 3.0, COLOR_MPT_BLUE),
        Slice::new("2", "500MB", 7400, "📶", 21.0, COLOR_MPT_YELLOW),
        Slice::new("3", "1 GB", 15000, "📶", 17.0, COLOR_MPT_BLUE),
        Slice::new("4", "500MB", 7400, "📶", 21.0, COLOR_MPT_YELLOW),
        Slice::new("5", "1 GB", 15000, "📶", 16.0, COLOR_MPT_BLUE),
        Slice::new("6", "5 GB", 75000, "⚡", 21.0, COLOR_WHITE),
    ]
}

/// Produced exactly once per completed spin.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinResult {
    pub index: usize,
    pub slice: Slice,
    pub timestamp: DateTime<Utc>,
}

/// A persisted history entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinRecord {
    pub id: String,
    pub slice_id: String,
    pub label: String,
    pub reward: u64,
    pub timestamp: DateTime<Utc>,
}

impl SpinRecord {
    pub fn from_result(id: String, result: &SpinResult) -> Self {
        Self {
            id,
            slice_id: result.slice.id.clone(),
            label: result.slice.label.clone(),
            reward: result.slice.reward,
            timestamp: result.timestamp,
        }
    }
}

/// Magnitude bucket of a reward, used for fallback messages and effects.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RewardTier {
    Nothing,
    Small,
    Medium,
    Big,
}

impl RewardTier {
    pub fn of(reward: u64) -> Self {
        if reward == 0 {
            Self::Nothing
        } else if reward < CONFETTI_THRESHOLD {
            Self::Small
        } else if reward < BIG_REWARD_THRESHOLD {
            Self::Medium
        } else {
            Self::Big
        }
    }
}

/// Which victory effects a result deserves.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Celebration {
    pub fanfare: bool,
    pub wow: bool,
    pub confetti: bool,
}

impl Celebration {
    pub fn for_reward(reward: u64) -> Self {
        Self {
            fanfare: true,
            wow: reward > 0,
            confetti: reward >= CONFETTI_THRESHOLD,
        }
    }
}

/// Engine tunables. None of these change which slice wins.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WheelConfig {
    pub spin_duration_ms: f64,
    pub ease_exponent: i32,
    pub extra_spins_min: u32,
    pub extra_spins_max: u32,
    /// Fraction of the sector width kept clear on each side of the landing point.
    pub slice_padding: f64,
    /// Screen angle of the pointer. 0 is "right", angles grow clockwise.
    pub pointer_angle: f64,
    pub settle_delay_ms: u64,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            spin_duration_ms: 7000.0,
            ease_exponent: 5,
            extra_spins_min: 10,
            extra_spins_max: 14,
            slice_padding: 0.1,
            pointer_angle: 1.5 * PI,
            settle_delay_ms: 500,
        }
    }
}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), WheelError> {
        if !self.spin_duration_ms.is_finite() || self.spin_duration_ms <= 0.0 {
            return Err(WheelError::InvalidConfig("spin duration must be positive".to_string()));
        }
        if self.ease_exponent < 1 {
            return Err(WheelError::InvalidConfig("ease exponent must be at least 1".to_string()));
        }
        if self.extra_spins_min > self.extra_spins_max {
            return Err(WheelError::InvalidConfig(format!(
                "extra spin range {}..={} is empty",
                self.extra_spins_min, self.extra_spins_max
            )));
        }
        if !(self.slice_padding > 0.0 && self.slice_padding < 0.5) {
            return Err(WheelError::InvalidConfig("slice padding must be in (0, 0.5)".to_string()));
        }
        if !self.pointer_angle.is_finite() {
            return Err(WheelError::InvalidConfig("pointer angle must be finite".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors. A spin that fails with one of these never starts.
#[derive(Debug, Clone, PartialEq)]
pub enum WheelError {
    EmptySlices,
    NoPositiveWeight,
    InvalidWeight { index: usize },
    WinnerOutOfRange { index: usize, len: usize },
    InvalidSlice(String),
    InvalidConfig(String),
}

impl fmt::Display for WheelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySlices => write!(f, "{}", EMPTY_SLICES_ERROR),
            Self::NoPositiveWeight => write!(f, "{}", NO_WEIGHT_ERROR),
            Self::InvalidWeight { index } => write!(f, "Slice {} has a negative or non-finite weight", index),
            Self::WinnerOutOfRange { index, len } => {
                write!(f, "Selected index {} is out of range for {} slices", index, len)
            }
            Self::InvalidSlice(msg) => write!(f, "Invalid slice: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "Invalid wheel configuration: {}", msg),
        }
    }
}

impl std::error::Error for WheelError {}
