//! Conversion configuration.
//!
//! A run is parameterized by a gamma direction and a size/quality control.
//! Quality is either a named level or a 0-100 scale; both map to the palette
//! size handed to the PNG encoder, and named levels above lossless also cap
//! the texture size.
//!
//! Configuration can be loaded from TOML:
//!
//! ```toml
//! gamma = "delinearize"
//! level = "balanced"     # or: quality = 80
//! max_dimension = 2048   # optional override
//! ```

use crate::codec::LOSSLESS;
use crate::gamma::GammaDirection;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Palette size of the balanced level
pub const BALANCED_PALETTE: u16 = 256;
/// Palette size of the aggressive level
pub const AGGRESSIVE_PALETTE: u16 = 64;
/// Longest edge allowed by the balanced and aggressive levels
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Smallest palette the 0-100 scale maps to
const SCALE_MIN_PALETTE: u32 = 8;

/// Named optimization level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// Lossless: no quantization, no resizing
    None,
    Balanced,
    Aggressive,
}

impl QualityLevel {
    pub fn label(&self) -> &'static str {
        match self {
            QualityLevel::None => "none",
            QualityLevel::Balanced => "balanced",
            QualityLevel::Aggressive => "aggressive",
        }
    }
}

impl FromStr for QualityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "lossless" => Ok(QualityLevel::None),
            "balanced" => Ok(QualityLevel::Balanced),
            "aggressive" => Ok(QualityLevel::Aggressive),
            _ => Err(Error::Config(format!(
                "Unknown level: {}. Use none, balanced, or aggressive.",
                s
            ))),
        }
    }
}

/// Size/quality control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Level(QualityLevel),
    /// 0 (smallest palette) to 100 (lossless)
    Scale(u8),
}

impl Default for Quality {
    fn default() -> Self {
        Quality::Level(QualityLevel::None)
    }
}

impl Quality {
    /// Validated 0-100 scale
    pub fn scale(value: u32) -> Result<Self> {
        if value > 100 {
            return Err(Error::Config(format!(
                "Quality {} is out of range. Use 0-100.",
                value
            )));
        }
        Ok(Quality::Scale(value as u8))
    }

    /// Palette size for the encoder, [`LOSSLESS`] for no quantization.
    /// The scale maps 0..=99 linearly onto 8..=256 colors and 100 to lossless.
    pub fn palette_size(&self) -> u16 {
        match self {
            Quality::Level(QualityLevel::None) => LOSSLESS,
            Quality::Level(QualityLevel::Balanced) => BALANCED_PALETTE,
            Quality::Level(QualityLevel::Aggressive) => AGGRESSIVE_PALETTE,
            Quality::Scale(q) if *q >= 100 => LOSSLESS,
            Quality::Scale(q) => {
                let span = BALANCED_PALETTE as u32 - SCALE_MIN_PALETTE;
                (SCALE_MIN_PALETTE + (*q as u32 * span) / 99) as u16
            }
        }
    }

    /// Longest edge allowed by this quality, if it resizes at all
    pub fn max_dimension(&self) -> Option<u32> {
        match self {
            Quality::Level(QualityLevel::Balanced) | Quality::Level(QualityLevel::Aggressive) => {
                Some(DEFAULT_MAX_DIMENSION)
            }
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Quality::Level(level) => level.label().to_string(),
            Quality::Scale(q) => format!("quality {}", q),
        }
    }
}

/// Settings for one conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertConfig {
    pub gamma: GammaDirection,
    pub quality: Quality,
    /// Overrides the quality's own size cap
    pub max_dimension: Option<u32>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            gamma: GammaDirection::Linearize,
            quality: Quality::default(),
            max_dimension: None,
        }
    }
}

/// TOML representation of [`ConvertConfig`]; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub gamma: Option<GammaDirection>,
    pub level: Option<QualityLevel>,
    pub quality: Option<u32>,
    pub max_dimension: Option<u32>,
}

impl ConvertConfig {
    pub fn with_gamma(mut self, gamma: GammaDirection) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = Some(max_dimension);
        self
    }

    /// Size cap in effect: explicit override, else the quality's default
    pub fn effective_max_dimension(&self) -> Option<u32> {
        self.max_dimension.or_else(|| self.quality.max_dimension())
    }

    /// Applies the keys present in `file` on top of `self`
    pub fn merge(mut self, file: &ConfigFile) -> Result<Self> {
        if file.level.is_some() && file.quality.is_some() {
            return Err(Error::Config(
                "Set either level or quality, not both.".to_string(),
            ));
        }
        if let Some(gamma) = file.gamma {
            self.gamma = gamma;
        }
        if let Some(level) = file.level {
            self.quality = Quality::Level(level);
        }
        if let Some(q) = file.quality {
            self.quality = Quality::scale(q)?;
        }
        if let Some(max) = file.max_dimension {
            if max == 0 {
                return Err(Error::Config("max_dimension must be at least 1.".to_string()));
            }
            self.max_dimension = Some(max);
        }
        Ok(self)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        ConvertConfig::default().merge(&file)
    }

    /// Loads a TOML config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_levels_map_to_palettes_and_caps() {
        let none = Quality::Level(QualityLevel::None);
        let balanced = Quality::Level(QualityLevel::Balanced);
        let aggressive = Quality::Level(QualityLevel::Aggressive);

        assert_eq!(none.palette_size(), LOSSLESS);
        assert_eq!(none.max_dimension(), None);
        assert_eq!(balanced.palette_size(), 256);
        assert_eq!(balanced.max_dimension(), Some(1024));
        assert_eq!(aggressive.palette_size(), 64);
        assert_eq!(aggressive.max_dimension(), Some(1024));
        assert!(aggressive.palette_size() < balanced.palette_size());
    }

    #[test]
    fn scale_is_monotonic() {
        let sizes: Vec<u16> = (0..100).map(|q| Quality::Scale(q).palette_size()).collect();
        assert_eq!(sizes[0], 8);
        assert_eq!(sizes[99], 256);
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(Quality::Scale(100).palette_size(), LOSSLESS);
        assert!(Quality::scale(101).is_err());
    }

    #[test]
    fn toml_config() {
        let config = ConvertConfig::from_toml_str(
            r#"
            gamma = "delinearize"
            level = "aggressive"
            max_dimension = 512
            "#,
        )
        .unwrap();
        assert_eq!(config.gamma, GammaDirection::Delinearize);
        assert_eq!(config.quality, Quality::Level(QualityLevel::Aggressive));
        assert_eq!(config.effective_max_dimension(), Some(512));

        let scaled = ConvertConfig::from_toml_str("quality = 40").unwrap();
        assert_eq!(scaled.quality, Quality::Scale(40));
        assert_eq!(scaled.gamma, GammaDirection::Linearize);
        assert_eq!(scaled.effective_max_dimension(), None);
    }

    #[test]
    fn toml_rejects_conflicts_and_unknown_keys() {
        assert!(ConvertConfig::from_toml_str("level = \"balanced\"\nquality = 10").is_err());
        assert!(ConvertConfig::from_toml_str("colour = 3").is_err());
        assert!(ConvertConfig::from_toml_str("gamma = \"sideways\"").is_err());
        assert!(ConvertConfig::from_toml_str("max_dimension = 0").is_err());
    }
}
