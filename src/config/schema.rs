//! Configuration schema
//!
//! Typed structures deserialized from a game YAML file. Every field has
//! a default, so an empty mapping is a complete configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::icon::IconPool;

/// Complete game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Names of every icon the grid may draw from.
    pub icons: Vec<String>,

    /// Animation pacing and timer period.
    pub timings: Timings,

    /// Title texts for each stage of a round.
    pub titles: Titles,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            icons: [
                "anchor", "bell", "clover", "crown", "diamond", "feather", "flame", "key", "moon",
                "star",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            timings: Timings::default(),
            titles: Titles::default(),
        }
    }
}

impl GameConfig {
    /// Builds the icon pool.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PoolTooSmall`] if the configured icons cannot
    /// fill the grid.
    pub fn icon_pool(&self) -> Result<IconPool, GameError> {
        IconPool::from_names(self.icons.iter().cloned())
    }
}

/// Animation pacing and timer period.
///
/// Durations are written in humantime form (`250ms`, `1s`, `1m 30s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timings {
    /// Scale and move animations.
    #[serde(with = "humantime_duration")]
    pub animation: Duration,

    /// Colour fades.
    #[serde(with = "humantime_duration")]
    pub fade: Duration,

    /// Delay between consecutive grid slot animations.
    #[serde(with = "humantime_duration")]
    pub stagger: Duration,

    /// How long each icon stays up during the reveal; also the pause
    /// after the win acknowledgement.
    #[serde(with = "humantime_duration")]
    pub hold: Duration,

    /// Timer period.
    #[serde(with = "humantime_duration")]
    pub tick: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            animation: Duration::from_millis(300),
            fade: Duration::from_millis(200),
            stagger: Duration::from_millis(100),
            hold: Duration::from_secs(1),
            tick: Duration::from_secs(1),
        }
    }
}

impl Timings {
    /// Returns every animation duration multiplied by `factor`.
    ///
    /// The timer period is left untouched so elapsed time stays in
    /// game seconds. Negative or non-finite factors are treated as zero.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            0.0
        };
        Self {
            animation: self.animation.mul_f64(factor),
            fade: self.fade.mul_f64(factor),
            stagger: self.stagger.mul_f64(factor),
            hold: self.hold.mul_f64(factor),
            tick: self.tick,
        }
    }
}

/// Title texts for each stage of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Titles {
    /// Shown once the game starts, before the first round.
    pub idle: String,
    /// Shown while the sequence is revealed.
    pub reveal: String,
    /// Shown while taps are collected.
    pub input: String,
    /// Shown after the sequence was reproduced.
    pub win: String,
}

impl Default for Titles {
    fn default() -> Self {
        Self {
            idle: "Press New Game to start".to_string(),
            reveal: "Remember\nthe icon sequence".to_string(),
            input: "Tap icons\nin correct sequence".to_string(),
            win: "You Win!\nPress New Game to play".to_string(),
        }
    }
}

/// Serde adapter for humantime duration strings.
mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
