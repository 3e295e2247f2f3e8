use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How trimmed frames are emitted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    /// Paste onto a transparent canvas of the original (untrimmed) size.
    #[default]
    Full,
    /// Emit only the trimmed pixels.
    Compact,
}

impl FromStr for PaddingMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "compact" | "trimmed" => Ok(Self::Compact),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnpackConfig {
    /// Re-pad trimmed frames to their original size, or keep them compact.
    #[serde(default)]
    pub padding: PaddingMode,
    /// Reconstruct frames in parallel when feature "parallel" is on.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Also write `tex_<name>.xml` and `spr_<name>.json`.
    #[serde(default)]
    pub export_metadata: bool,
    /// Extension of descriptor files picked up from a directory scan.
    #[serde(default = "default_descriptor_extension")]
    pub descriptor_extension: String,
    /// Silently drop frames with an all-zero atlas rectangle instead of
    /// reporting them as skipped.
    #[serde(default = "default_skip_empty_frames")]
    pub skip_empty_frames: bool,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        Self {
            padding: PaddingMode::default(),
            parallel: default_parallel(),
            export_metadata: false,
            descriptor_extension: default_descriptor_extension(),
            skip_empty_frames: default_skip_empty_frames(),
        }
    }
}

impl UnpackConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TexUnpackerError;

        let ext = self.descriptor_extension.trim_start_matches('.');
        if ext.is_empty() {
            return Err(TexUnpackerError::InvalidConfig(
                "descriptor_extension must not be empty".into(),
            ));
        }
        if ext.contains(['/', '\\']) {
            return Err(TexUnpackerError::InvalidConfig(format!(
                "descriptor_extension `{}` must not contain path separators",
                self.descriptor_extension
            )));
        }
        Ok(())
    }

    /// Extension without a leading dot.
    pub fn extension(&self) -> &str {
        self.descriptor_extension.trim_start_matches('.')
    }

    /// Create a fluent builder for `UnpackConfig`.
    pub fn builder() -> UnpackConfigBuilder {
        UnpackConfigBuilder::new()
    }
}

fn default_parallel() -> bool {
    false
}
fn default_descriptor_extension() -> String {
    "plist".into()
}
fn default_skip_empty_frames() -> bool {
    false
}

/// Builder for `UnpackConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct UnpackConfigBuilder {
    cfg: UnpackConfig,
}

impl UnpackConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: UnpackConfig::default(),
        }
    }
    pub fn padding(mut self, v: PaddingMode) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn compact(mut self, v: bool) -> Self {
        self.cfg.padding = if v {
            PaddingMode::Compact
        } else {
            PaddingMode::Full
        };
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn export_metadata(mut self, v: bool) -> Self {
        self.cfg.export_metadata = v;
        self
    }
    pub fn descriptor_extension(mut self, v: impl Into<String>) -> Self {
        self.cfg.descriptor_extension = v.into();
        self
    }
    pub fn skip_empty_frames(mut self, v: bool) -> Self {
        self.cfg.skip_empty_frames = v;
        self
    }
    pub fn build(self) -> UnpackConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_mode_from_str() {
        assert_eq!("FULL".parse::<PaddingMode>(), Ok(PaddingMode::Full));
        assert_eq!("compact".parse::<PaddingMode>(), Ok(PaddingMode::Compact));
        assert!("sideways".parse::<PaddingMode>().is_err());
    }

    #[test]
    fn validate_rejects_bad_extension() {
        assert!(UnpackConfig::default().validate().is_ok());
        let cfg = UnpackConfig::builder().descriptor_extension(".").build();
        assert!(cfg.validate().is_err());
        let cfg = UnpackConfig::builder().descriptor_extension("a/b").build();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn defaults_round_trip_through_serde() {
        let cfg: UnpackConfig = serde_json::from_str("{}").expect("defaults");
        assert_eq!(cfg, UnpackConfig::default());
        assert_eq!(cfg.extension(), "plist");
    }
}
