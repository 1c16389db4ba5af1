//! Parameter types for texture operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides the output size) and the [`backend`](super::backend)
//! (which does the actual pixel work and block compression).
//!
//! ## Types
//!
//! - [`TargetFormat`]: Block-compressed DDS format (BC1, BC2, BC3, BC7).
//! - [`MaxDimension`]: Upper bound on either side, restricted to a preset.
//! - [`TransformSettings`]: The two persisted settings a transform run needs.
//! - [`TransformTask`]: One staged original and where its output goes.
//! - [`TransformParams`]: Fully resolved work for the backend: exact size + requested format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Allowed values for [`MaxDimension`], largest first.
pub const MAX_DIMENSION_PRESETS: [u32; 4] = [4096, 2048, 1024, 512];

/// Block-compressed output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetFormat {
    #[serde(rename = "BC1")]
    Bc1,
    #[serde(rename = "BC2")]
    Bc2,
    #[serde(rename = "BC3")]
    Bc3,
    #[serde(rename = "BC7")]
    Bc7,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 4] = [
        TargetFormat::Bc1,
        TargetFormat::Bc2,
        TargetFormat::Bc3,
        TargetFormat::Bc7,
    ];

    /// Whether the format stores a usable alpha channel.
    ///
    /// BC1 has at most 1-bit punch-through alpha, which is not enough for
    /// game textures with soft edges.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, TargetFormat::Bc1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetFormat::Bc1 => "BC1",
            TargetFormat::Bc2 => "BC2",
            TargetFormat::Bc3 => "BC3",
            TargetFormat::Bc7 => "BC7",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetFormat::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown format `{s}` (expected BC1, BC2, BC3 or BC7)"))
    }
}

/// Largest allowed width or height, one of [`MAX_DIMENSION_PRESETS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxDimension(u32);

impl MaxDimension {
    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for MaxDimension {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if MAX_DIMENSION_PRESETS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "max dimension {value} is not a preset (expected one of 4096, 2048, 1024, 512)"
            ))
        }
    }
}

impl From<MaxDimension> for u32 {
    fn from(value: MaxDimension) -> Self {
        value.0
    }
}

impl fmt::Display for MaxDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

/// Resize and format settings for one transform run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSettings {
    pub max_dimension: MaxDimension,
    pub format: TargetFormat,
}

/// One staged original to transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformTask {
    pub source: PathBuf,
    pub output: PathBuf,
    pub settings: TransformSettings,
}

/// Resolved backend work: decode `source`, scale to exactly
/// `width`×`height`, encode as `requested` (or its alpha-capable upgrade).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub requested: TargetFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("bc7".parse::<TargetFormat>().unwrap(), TargetFormat::Bc7);
        assert_eq!(" BC1 ".parse::<TargetFormat>().unwrap(), TargetFormat::Bc1);
        assert!("DXT5".parse::<TargetFormat>().is_err());
    }

    #[test]
    fn only_bc1_lacks_alpha() {
        assert!(!TargetFormat::Bc1.supports_alpha());
        assert!(TargetFormat::Bc2.supports_alpha());
        assert!(TargetFormat::Bc3.supports_alpha());
        assert!(TargetFormat::Bc7.supports_alpha());
    }

    #[test]
    fn max_dimension_accepts_presets_only() {
        assert_eq!(MaxDimension::try_from(1024).unwrap().value(), 1024);
        assert!(MaxDimension::try_from(1000).is_err());
        assert!(MaxDimension::try_from(0).is_err());
    }

    #[test]
    fn max_dimension_deserializes_through_validation() {
        #[derive(Deserialize)]
        struct Wrapper {
            max: MaxDimension,
        }
        let ok: Wrapper = toml::from_str("max = 2048").unwrap();
        assert_eq!(ok.max.value(), 2048);
        assert!(toml::from_str::<Wrapper>("max = 300").is_err());
    }
}
