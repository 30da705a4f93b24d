/// Drawable size used when nothing else is configured.
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (400, 300);

/// Settings for the preview window that hosts the shader canvas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Initial inner size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Keep the window hidden; used by headless smoke runs.
    pub show_window: bool,
}

impl RendererConfig {
    pub fn with_surface_size(mut self, width: u32, height: u32) -> Self {
        self.surface_size = (width.max(1), height.max(1));
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: DEFAULT_SURFACE_SIZE,
            title: "promptshade".to_string(),
            show_window: true,
        }
    }
}
