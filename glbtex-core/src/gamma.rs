//! sRGB/linear gamma correction via a 256-entry lookup table.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display gamma approximating the sRGB transfer curve
pub const GAMMA: f64 = 2.2;

/// Direction of the gamma curve applied to diffuse textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GammaDirection {
    /// `out = in^2.2`: sRGB-encoded values to linear
    Linearize,
    /// `out = in^(1/2.2)`: linear values to sRGB-encoded
    Delinearize,
}

impl GammaDirection {
    pub fn exponent(&self) -> f64 {
        match self {
            GammaDirection::Linearize => GAMMA,
            GammaDirection::Delinearize => 1.0 / GAMMA,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GammaDirection::Linearize => "linearize",
            GammaDirection::Delinearize => "delinearize",
        }
    }
}

impl FromStr for GammaDirection {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linearize" | "linear" | "to-linear" => Ok(GammaDirection::Linearize),
            "delinearize" | "srgb" | "to-srgb" => Ok(GammaDirection::Delinearize),
            _ => Err(crate::Error::Config(format!(
                "Unknown gamma direction: {}. Use linearize or delinearize.",
                s
            ))),
        }
    }
}

/// Precomputed gamma curve for 8-bit channels. Built once per run and shared
/// by every diffuse texture, so equal inputs always map to equal outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaTable {
    direction: GammaDirection,
    table: [u8; 256],
}

impl GammaTable {
    pub fn new(direction: GammaDirection) -> Self {
        let exponent = direction.exponent();
        let mut table = [0u8; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let normalized = i as f64 / 255.0;
            *entry = (255.0 * normalized.powf(exponent)).round().clamp(0.0, 255.0) as u8;
        }
        Self { direction, table }
    }

    pub fn direction(&self) -> GammaDirection {
        self.direction
    }

    #[inline]
    pub fn lookup(&self, value: u8) -> u8 {
        self.table[value as usize]
    }

    pub fn as_slice(&self) -> &[u8; 256] {
        &self.table
    }

    /// Maps R, G and B of every RGBA pixel through the table. Alpha is left as is.
    pub fn apply_rgba(&self, data: &mut [u8]) {
        for pixel in data.chunks_exact_mut(4) {
            pixel[0] = self.table[pixel[0] as usize];
            pixel[1] = self.table[pixel[1] as usize];
            pixel[2] = self.table[pixel[2] as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_monotonic_with_fixed_endpoints() {
        for direction in [GammaDirection::Linearize, GammaDirection::Delinearize] {
            let table = GammaTable::new(direction);
            let values = table.as_slice();
            assert_eq!(values[0], 0);
            assert_eq!(values[255], 255);
            assert!(
                values.windows(2).all(|w| w[0] <= w[1]),
                "{:?} table is not non-decreasing",
                direction
            );
        }
    }

    #[test]
    fn directions_bend_opposite_ways() {
        let linear = GammaTable::new(GammaDirection::Linearize);
        let srgb = GammaTable::new(GammaDirection::Delinearize);
        assert!(linear.lookup(128) < 128);
        assert!(srgb.lookup(128) > 128);
        assert_eq!(srgb.lookup(128), 186);
    }

    #[test]
    fn apply_leaves_alpha_untouched() {
        let table = GammaTable::new(GammaDirection::Delinearize);
        let mut data = vec![128, 64, 0, 77, 255, 128, 32, 0];
        table.apply_rgba(&mut data);
        assert_eq!(
            data,
            vec![
                table.lookup(128),
                table.lookup(64),
                0,
                77,
                255,
                table.lookup(128),
                table.lookup(32),
                0
            ]
        );
    }

    #[test]
    fn parse_direction() {
        assert_eq!("linearize".parse::<GammaDirection>().unwrap(), GammaDirection::Linearize);
        assert_eq!("SRGB".parse::<GammaDirection>().unwrap(), GammaDirection::Delinearize);
        assert!("sideways".parse::<GammaDirection>().is_err());
    }
}
