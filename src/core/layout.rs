use crate::common::config::ViewportConfig;
use crate::core::geometry::Rect;

/// On-screen placement of the camera container and the guide overlay.
pub trait LayoutProvider {
    fn container_rect(&self) -> Option<Rect>;
    fn guide_rect(&self) -> Option<Rect>;
}

/// Layout that never changes, typically built from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLayout {
    pub container: Option<Rect>,
    pub guide: Option<Rect>,
}

impl FixedLayout {
    pub fn new(container: Rect, guide: Rect) -> Self {
        Self {
            container: Some(container),
            guide: Some(guide),
        }
    }

    pub fn from_config(viewport: &ViewportConfig) -> Self {
        Self::new(
            Rect::new(
                viewport.container_left,
                viewport.container_top,
                viewport.container_width,
                viewport.container_height,
            ),
            Rect::new(
                viewport.guide_left,
                viewport.guide_top,
                viewport.guide_width,
                viewport.guide_height,
            ),
        )
    }
}

impl LayoutProvider for FixedLayout {
    fn container_rect(&self) -> Option<Rect> {
        self.container
    }

    fn guide_rect(&self) -> Option<Rect> {
        self.guide
    }
}
