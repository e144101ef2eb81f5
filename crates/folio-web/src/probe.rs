use folio_backdrop::DeviceProbe;

pub struct BrowserProbe {
    window: web_sys::Window,
}

impl BrowserProbe {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            window: web_sys::window().ok_or("no window")?,
        })
    }
}

impl DeviceProbe for BrowserProbe {
    fn viewport_width(&self) -> Option<f32> {
        let width = self.window.inner_width().ok().and_then(|w| w.as_f64());
        if width.is_none() {
            log::warn!("backdrop: could not read window.innerWidth");
        }
        width.map(|w| w as f32)
    }

    fn user_agent(&self) -> String {
        self.window.navigator().user_agent().unwrap_or_default()
    }

    // Browsers that hide the value report 0.
    fn hardware_concurrency(&self) -> Option<u32> {
        let n = self.window.navigator().hardware_concurrency();
        (n >= 1.0).then_some(n as u32)
    }
}
