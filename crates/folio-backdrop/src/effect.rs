use std::rc::Rc;

use folio_core::Color;
use serde::Serialize;
use thiserror::Error;

use crate::config::BackgroundConfig;
use crate::device::DeviceProfile;
use crate::host::LocalBoxFuture;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EffectLoadError {
    #[error("no effect library was provided")]
    Unavailable,
    #[error("effect library failed to load: {0}")]
    Import(String),
    #[error("effect creation failed: {0}")]
    Create(String),
}

/// Options handed to the rendering library when an effect is created.
/// Field names follow the library's camelCase option keys.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectConfig {
    pub mouse_controls: bool,
    pub touch_controls: bool,
    pub gyro_controls: bool,
    pub min_height: f32,
    pub min_width: f32,
    pub scale: f32,
    pub scale_mobile: f32,
    pub color: u32,
    pub color2: u32,
    pub background_color: u32,
    pub size: f32,
    pub spacing: f32,
    pub show_lines: bool,
}

impl EffectConfig {
    pub fn for_profile(cfg: &BackgroundConfig, profile: DeviceProfile) -> Self {
        let mobile = profile.is_mobile;
        let tuning = if mobile { cfg.mobile } else { cfg.desktop };
        Self {
            mouse_controls: !mobile,
            touch_controls: mobile,
            gyro_controls: false,
            min_height: cfg.min_height,
            min_width: cfg.min_width,
            scale: tuning.scale,
            scale_mobile: cfg.mobile.scale,
            color: Color::from_hex(&cfg.colors.color).to_rgb_u32(),
            color2: Color::from_hex(&cfg.colors.color2).to_rgb_u32(),
            background_color: Color::from_hex(&cfg.colors.background).to_rgb_u32(),
            size: tuning.size,
            spacing: tuning.spacing,
            show_lines: !mobile,
        }
    }
}

/// A live effect instance. Consumed by `destroy`, so it can only be torn down once.
pub trait EffectHandle {
    fn resize(&self);
    fn destroy(self: Box<Self>);
}

/// A loaded rendering library, able to attach effects to a container `C`.
pub trait EffectFactory<C> {
    fn create(
        &self,
        container: &C,
        config: &EffectConfig,
    ) -> Result<Box<dyn EffectHandle>, EffectLoadError>;
}

/// Asynchronous access to the rendering library.
pub trait EffectLoader<C> {
    fn load(&self) -> LocalBoxFuture<Result<Rc<dyn EffectFactory<C>>, EffectLoadError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn profile(is_mobile: bool) -> DeviceProfile {
        DeviceProfile {
            is_mobile,
            core_count: Some(8),
            viewport_width: Some(if is_mobile { 390.0 } else { 1440.0 }),
        }
    }

    #[test]
    fn desktop_config_enables_mouse_and_lines() {
        let c = EffectConfig::for_profile(&BackgroundConfig::default(), profile(false));
        assert!(c.mouse_controls);
        assert!(!c.touch_controls);
        assert!(!c.gyro_controls);
        assert!(c.show_lines);
        assert_eq!((c.scale, c.size, c.spacing), (1.0, 3.0, 35.0));
    }

    #[test]
    fn mobile_config_enables_touch_only() {
        let c = EffectConfig::for_profile(&BackgroundConfig::default(), profile(true));
        assert!(!c.mouse_controls);
        assert!(c.touch_controls);
        assert!(!c.gyro_controls);
        assert!(!c.show_lines);
        assert_eq!((c.scale, c.size, c.spacing), (0.8, 2.0, 45.0));
    }

    #[test]
    fn serializes_with_library_option_names() {
        let c = EffectConfig::for_profile(&BackgroundConfig::default(), profile(true));
        assert_snapshot!(
            serde_json::to_string(&c).unwrap(),
            @r#"{"mouseControls":false,"touchControls":true,"gyroControls":false,"minHeight":200.0,"minWidth":200.0,"scale":0.8,"scaleMobile":0.8,"color":3900150,"color2":9133302,"backgroundColor":657930,"size":2.0,"spacing":45.0,"showLines":false}"#
        );
    }
}
