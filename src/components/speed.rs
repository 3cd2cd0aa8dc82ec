use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Movement speed classes in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Speed {
    #[default]
    Zero,
    Crawl,
    Stroll,
    XxxSlow,
    XxSlow,
    XSlow,
    Slow,
    Normal,
    Fast,
    XFast,
    XxFast,
    XxxFast,
    Extreme,
    Sound,
    Light,
    Ridiculous,
}

impl Speed {
    pub const ALL: [Speed; 16] = [
        Speed::Zero,
        Speed::Crawl,
        Speed::Stroll,
        Speed::XxxSlow,
        Speed::XxSlow,
        Speed::XSlow,
        Speed::Slow,
        Speed::Normal,
        Speed::Fast,
        Speed::XFast,
        Speed::XxFast,
        Speed::XxxFast,
        Speed::Extreme,
        Speed::Sound,
        Speed::Light,
        Speed::Ridiculous,
    ];

    pub const fn pixels_per_second(self) -> u32 {
        match self {
            Speed::Zero => 0,
            Speed::Crawl => 12,
            Speed::Stroll => 20,
            Speed::XxxSlow => 30,
            Speed::XxSlow => 45,
            Speed::XSlow => 68,
            Speed::Slow => 100,
            Speed::Normal => 140,
            Speed::Fast => 190,
            Speed::XFast => 250,
            Speed::XxFast => 320,
            Speed::XxxFast => 420,
            Speed::Extreme => 600,
            Speed::Sound => 850,
            Speed::Light => 1200,
            Speed::Ridiculous => 2000,
        }
    }

    /// Distance travelled during `delta_time` seconds.
    pub fn stretch(self, delta_time: f32) -> f32 {
        self.pixels_per_second() as f32 * delta_time
    }

    /// Distance for a jump; jumps are faster than walking and never slower
    /// than 120 px/s.
    pub fn stretch_jump(self, delta_time: f32) -> f32 {
        (self.pixels_per_second() as f32 * 1.4).max(120.0) * delta_time
    }

    /// Parses an index (`"7"`) or a name (`"normal"`, `"S07_NORMAL"`,
    /// `"XX_FAST"`), case-insensitive.
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        let err = || EngineError::Parse {
            kind: "speed",
            value: value.to_string(),
        };
        let trimmed = value.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return Self::ALL.get(index).copied().ok_or_else(err);
        }
        let upper = trimmed.to_ascii_uppercase();
        let name = match upper.split_once('_') {
            Some((prefix, rest))
                if prefix.len() == 3
                    && prefix.starts_with('S')
                    && prefix[1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                rest
            }
            _ => upper.as_str(),
        };
        let speed = match name.replace('_', "").as_str() {
            "ZERO" => Speed::Zero,
            "CRAWL" => Speed::Crawl,
            "STROLL" => Speed::Stroll,
            "XXXSLOW" => Speed::XxxSlow,
            "XXSLOW" => Speed::XxSlow,
            "XSLOW" => Speed::XSlow,
            "SLOW" => Speed::Slow,
            "NORMAL" => Speed::Normal,
            "FAST" => Speed::Fast,
            "XFAST" => Speed::XFast,
            "XXFAST" => Speed::XxFast,
            "XXXFAST" => Speed::XxxFast,
            "EXTREME" | "EXTREMESPEED" => Speed::Extreme,
            "SOUND" | "SOUNDSPEED" => Speed::Sound,
            "LIGHT" | "LIGHTSPEED" => Speed::Light,
            "RIDICULOUS" | "RIDICULOUSSPEED" => Speed::Ridiculous,
            _ => return Err(err()),
        };
        Ok(speed)
    }
}
