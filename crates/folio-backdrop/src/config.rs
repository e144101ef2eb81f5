use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::Duration;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse background config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid background config: {0}")]
    Invalid(String),
}

/// Per device class effect parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectTuning {
    pub scale: f32,
    pub size: f32,
    pub spacing: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectColors {
    pub color: String,
    pub color2: String,
    pub background: String,
}

impl Default for EffectColors {
    fn default() -> Self {
        Self {
            color: "#3B82F6".into(),
            color2: "#8B5CF6".into(),
            background: "#0A0A0A".into(),
        }
    }
}

/// Thresholds and tuning for the animated background.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use folio_backdrop::BackgroundConfig;
///
/// let cfg = BackgroundConfig::from_json(r#"{ "low_fps_threshold": 24 }"#).unwrap();
/// assert_eq!(cfg.low_fps_threshold, 24);
/// assert_eq!(cfg.mobile_breakpoint_px, 768.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Viewports narrower than this are treated as mobile.
    pub mobile_breakpoint_px: f32,
    /// Mobile devices reporting fewer logical cores never get the live effect.
    pub min_mobile_cores: u32,
    pub load_delay_ms: u64,
    pub sample_window_ms: u64,
    pub low_fps_threshold: u32,
    /// Consecutive low windows before the effect is torn down.
    pub low_fps_windows: u32,
    /// Case-insensitive user-agent pattern for mobile platforms.
    pub mobile_signature: String,
    pub desktop: EffectTuning,
    pub mobile: EffectTuning,
    pub colors: EffectColors,
    pub min_height: f32,
    pub min_width: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            mobile_breakpoint_px: 768.0,
            min_mobile_cores: 4,
            load_delay_ms: 100,
            sample_window_ms: 1000,
            low_fps_threshold: 30,
            low_fps_windows: 3,
            mobile_signature: "Android|webOS|iPhone|iPad|iPod|BlackBerry|IEMobile|Opera Mini".into(),
            desktop: EffectTuning {
                scale: 1.0,
                size: 3.0,
                spacing: 35.0,
            },
            mobile: EffectTuning {
                scale: 0.8,
                size: 2.0,
                spacing: 45.0,
            },
            colors: EffectColors::default(),
            min_height: 200.0,
            min_width: 200.0,
        }
    }
}

impl BackgroundConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_window_ms == 0 {
            return Err(ConfigError::Invalid("sample_window_ms must be non-zero".into()));
        }
        if self.low_fps_windows == 0 {
            return Err(ConfigError::Invalid("low_fps_windows must be non-zero".into()));
        }
        if self.mobile_breakpoint_px < 0.0 {
            return Err(ConfigError::Invalid("mobile_breakpoint_px must be >= 0".into()));
        }
        crate::device::DeviceClassifier::new(self)?;
        Ok(())
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.sample_window_ms)
    }
}
