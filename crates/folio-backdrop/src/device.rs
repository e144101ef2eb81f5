use regex::{Regex, RegexBuilder};

use crate::config::{BackgroundConfig, ConfigError};

/// Read-only view of the platform the page runs on.
pub trait DeviceProbe {
    /// CSS pixels; `None` when the platform would not say.
    fn viewport_width(&self) -> Option<f32>;
    fn user_agent(&self) -> String;
    /// Logical processor count, if the platform reports one.
    fn hardware_concurrency(&self) -> Option<u32>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeviceProfile {
    pub is_mobile: bool,
    pub core_count: Option<u32>,
    pub viewport_width: Option<f32>,
}

impl DeviceProfile {
    /// Mobile with a known core count below `min_cores`. Unknown counts never qualify.
    pub fn is_low_end(&self, min_cores: u32) -> bool {
        self.is_mobile && self.core_count.is_some_and(|c| c < min_cores)
    }
}

#[derive(Clone, Debug)]
pub struct DeviceClassifier {
    breakpoint: f32,
    signature: Regex,
}

impl DeviceClassifier {
    pub fn new(cfg: &BackgroundConfig) -> Result<Self, ConfigError> {
        let signature = RegexBuilder::new(&cfg.mobile_signature)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("mobile_signature: {e}")))?;
        Ok(Self {
            breakpoint: cfg.mobile_breakpoint_px,
            signature,
        })
    }

    pub fn classify(&self, probe: &dyn DeviceProbe) -> DeviceProfile {
        let viewport_width = probe.viewport_width();
        if viewport_width.is_none() {
            log::debug!("backdrop: viewport width unknown, classifying by user agent only");
        }
        let narrow = viewport_width.is_some_and(|w| w < self.breakpoint);
        let is_mobile = narrow || self.signature.is_match(&probe.user_agent());
        DeviceProfile {
            is_mobile,
            core_count: probe.hardware_concurrency(),
            viewport_width,
        }
    }
}
