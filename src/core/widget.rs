use crate::camera::FrameSource;
use crate::common::config::CaptureConfig;
use crate::common::{CaptureError, Result};
use crate::core::encoding::encode_data_url;
use crate::core::geometry::{guide_to_source, rasterize, SourceRegion};
use crate::core::layout::LayoutProvider;
use crate::core::quality::{BrightnessPolicy, Exposure, FrameQuality};
use crate::storage::ImageStore;
use image::RgbaImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Feed is running.
    Live,
    /// Feed is paused on the last accepted frame.
    Frozen,
}

/// What to do when an accepted frame cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistencePolicy {
    /// Log the failure and freeze anyway.
    #[default]
    Permissive,
    /// Alert the user and stay live.
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub brightness: BrightnessPolicy,
    pub storage_key: String,
    pub persistence: PersistencePolicy,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            brightness: BrightnessPolicy::default(),
            storage_key: "image".to_string(),
            persistence: PersistencePolicy::default(),
        }
    }
}

impl CaptureSettings {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            brightness: BrightnessPolicy {
                min_brightness: config.min_brightness,
                max_brightness: config.max_brightness,
            },
            storage_key: config.storage_key.clone(),
            persistence: if config.strict_persistence {
                PersistencePolicy::Strict
            } else {
                PersistencePolicy::Permissive
            },
        }
    }
}

/// The warning indicator next to the feed, plus blocking user alerts.
pub trait UserFeedback {
    fn set_warning(&mut self, visible: bool);
    fn alert(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Was frozen; feed resumed and the stored image discarded.
    Resumed,
    /// Frame accepted and the widget is frozen. `stored` is false only when
    /// storing failed under the permissive policy.
    Accepted { quality: FrameQuality, stored: bool },
    /// Brightness out of range; still live.
    Rejected { exposure: Exposure, quality: FrameQuality },
    /// Frame accepted but could not be stored under the strict policy; still live.
    PersistenceFailed { quality: FrameQuality },
    DeviceUnavailable,
    GeometryUnavailable,
}

/// Where the guide overlay of `layout` falls on a video of size `video`.
pub fn locate_guide<L>(video: (u32, u32), layout: &L) -> Result<SourceRegion>
where
    L: LayoutProvider + ?Sized,
{
    let (container, guide) = match (layout.container_rect(), layout.guide_rect()) {
        (Some(container), Some(guide)) => (container, guide),
        _ => return Err(CaptureError::GeometryUnavailable("Guide box or container not found".into())),
    };

    guide_to_source(video, &container, &guide).ok_or_else(|| {
        CaptureError::GeometryUnavailable(format!(
            "Cannot map guide box onto a {}x{} video", video.0, video.1
        ))
    })
}

/// Crop the current frame of `source` to the guide overlay of `layout`.
pub fn crop_to_guide<S, L>(source: &mut S, layout: &L) -> Result<(RgbaImage, SourceRegion)>
where
    S: FrameSource + ?Sized,
    L: LayoutProvider + ?Sized,
{
    let region = locate_guide(source.dimensions(), layout)?;

    let frame = source.current_frame()?;
    let crop = rasterize(&frame, &region).ok_or_else(|| {
        CaptureError::GeometryUnavailable(format!(
            "Guide box maps to an empty or oversized crop ({:.1}x{:.1})", region.width, region.height
        ))
    })?;

    tracing::debug!(
        "Cropped {}x{} from source ({:.1}, {:.1}, {:.1}, {:.1})",
        crop.width(), crop.height(), region.x, region.y, region.width, region.height
    );
    Ok((crop, region))
}

/// One camera widget: a feed, a guide overlay, and a capture/retake toggle.
pub struct CaptureWidget<S, L, St, F> {
    source: Option<S>,
    layout: L,
    store: St,
    feedback: F,
    settings: CaptureSettings,
    state: CaptureState,
    last_quality: Option<FrameQuality>,
}

impl<S, L, St, F> CaptureWidget<S, L, St, F>
where
    S: FrameSource,
    L: LayoutProvider,
    St: ImageStore,
    F: UserFeedback,
{
    /// A widget with no feed yet; see [`setup_camera`](Self::setup_camera).
    pub fn new(layout: L, store: St, feedback: F, settings: CaptureSettings) -> Self {
        Self {
            source: None,
            layout,
            store,
            feedback,
            settings,
            state: CaptureState::Live,
            last_quality: None,
        }
    }

    pub fn with_source(source: S, layout: L, store: St, feedback: F, settings: CaptureSettings) -> Self {
        let mut widget = Self::new(layout, store, feedback, settings);
        widget.source = Some(source);
        widget
    }

    /// Acquire the feed. Failure is logged and leaves the widget without one.
    pub fn setup_camera<A>(&mut self, acquire: A) -> bool
    where
        A: FnOnce() -> Result<S>,
    {
        match acquire() {
            Ok(source) => {
                let (width, height) = source.dimensions();
                tracing::info!("Camera stream ready ({}x{})", width, height);
                self.source = Some(source);
                true
            }
            Err(e) => {
                tracing::error!("Error accessing camera: {}", e);
                false
            }
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == CaptureState::Frozen
    }

    pub fn last_quality(&self) -> Option<FrameQuality> {
        self.last_quality
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// The full current frame and where the guide box falls on it.
    pub fn guide_preview(&mut self) -> Result<(RgbaImage, SourceRegion)> {
        let source = self.source.as_mut()
            .ok_or_else(|| CaptureError::DeviceUnavailable("No camera stream available".into()))?;
        let region = locate_guide(source.dimensions(), &self.layout)?;
        Ok((source.current_frame()?, region))
    }

    /// The capture button: capture when live, retake when frozen.
    pub fn on_trigger(&mut self) -> TriggerOutcome {
        match self.state {
            CaptureState::Frozen => self.retake(),
            CaptureState::Live => self.capture(),
        }
    }

    fn retake(&mut self) -> TriggerOutcome {
        if let Some(source) = self.source.as_mut() {
            source.resume();
        }
        self.state = CaptureState::Live;

        match self.store.remove(&self.settings.storage_key) {
            Ok(()) => tracing::info!("Camera unfrozen, old image cleared"),
            Err(e) => tracing::error!("Camera unfrozen, but failed to clear old image: {}", e),
        }
        TriggerOutcome::Resumed
    }

    fn capture(&mut self) -> TriggerOutcome {
        let Some(source) = self.source.as_mut() else {
            tracing::error!("No camera stream available");
            return TriggerOutcome::DeviceUnavailable;
        };

        let crop = match crop_to_guide(source, &self.layout) {
            Ok((crop, _region)) => crop,
            Err(CaptureError::GeometryUnavailable(reason)) => {
                tracing::error!("{}", reason);
                return TriggerOutcome::GeometryUnavailable;
            }
            Err(e) => {
                tracing::error!("Failed to read camera frame: {}", e);
                return TriggerOutcome::DeviceUnavailable;
            }
        };

        let Some(quality) = FrameQuality::measure(&crop) else {
            tracing::error!("Crop has no pixels");
            return TriggerOutcome::GeometryUnavailable;
        };
        self.last_quality = Some(quality);
        tracing::debug!("{}", quality.get_quality_assessment());

        let exposure = self.settings.brightness.judge(quality.brightness);
        if !exposure.is_acceptable() {
            tracing::warn!("Rejected capture: {} (brightness {:.1})", exposure.message(), quality.brightness);
            self.feedback.set_warning(true);
            self.feedback.alert(exposure.message());
            return TriggerOutcome::Rejected { exposure, quality };
        }

        self.feedback.set_warning(false);
        tracing::info!("{} (brightness {:.1})", exposure.message(), quality.brightness);

        let stored = match self.persist(&crop) {
            Ok(()) => {
                tracing::info!("Image saved under '{}'", self.settings.storage_key);
                true
            }
            Err(e) => {
                tracing::error!("Failed to save image to storage: {}", e);
                // Never leave an older image behind to be submitted instead
                if let Err(e) = self.store.remove(&self.settings.storage_key) {
                    tracing::warn!("Failed to clear stale image: {}", e);
                }
                if self.settings.persistence == PersistencePolicy::Strict {
                    self.feedback.alert("Failed to save the image, please try again");
                    return TriggerOutcome::PersistenceFailed { quality };
                }
                false
            }
        };

        if let Some(source) = self.source.as_mut() {
            source.pause();
        }
        self.state = CaptureState::Frozen;
        TriggerOutcome::Accepted { quality, stored }
    }

    fn persist(&mut self, crop: &RgbaImage) -> Result<()> {
        let data_url = encode_data_url(crop)?;
        tracing::debug!("Encoded crop as {} byte data URL", data_url.len());
        self.store.set(&self.settings.storage_key, &data_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::StillFrame;
    use crate::core::encoding::decode_data_url;
    use crate::core::geometry::Rect;
    use crate::core::layout::FixedLayout;
    use crate::storage::MemoryStore;
    use approx::assert_relative_eq;
    use image::Rgba;
    use rstest::rstest;

    #[derive(Default)]
    struct RecordingFeedback {
        warning: Option<bool>,
        alerts: Vec<String>,
    }

    impl UserFeedback for RecordingFeedback {
        fn set_warning(&mut self, visible: bool) {
            self.warning = Some(visible);
        }

        fn alert(&mut self, message: &str) {
            self.alerts.push(message.to_string());
        }
    }

    /// Store whose writes always fail.
    #[derive(Default)]
    struct BrokenStore {
        inner: MemoryStore,
    }

    impl ImageStore for BrokenStore {
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(CaptureError::Storage("quota exceeded".into()))
        }

        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn remove(&mut self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    type TestWidget<St> = CaptureWidget<StillFrame, FixedLayout, St, RecordingFeedback>;

    fn layout() -> FixedLayout {
        FixedLayout::new(
            Rect::new(0.0, 0.0, 640.0, 480.0),
            Rect::new(220.0, 90.0, 200.0, 300.0),
        )
    }

    fn uniform_frame(value: u8) -> StillFrame {
        StillFrame::new(RgbaImage::from_pixel(1280, 720, Rgba([value, value, value, 255])))
    }

    fn widget_with<St: ImageStore>(value: u8, store: St, settings: CaptureSettings) -> TestWidget<St> {
        CaptureWidget::with_source(uniform_frame(value), layout(), store, RecordingFeedback::default(), settings)
    }

    fn widget(value: u8) -> TestWidget<MemoryStore> {
        widget_with(value, MemoryStore::new(), CaptureSettings::default())
    }

    #[test]
    fn test_mid_gray_is_accepted_and_frozen() {
        let mut w = widget(128);
        let outcome = w.on_trigger();

        let TriggerOutcome::Accepted { quality, stored } = outcome else {
            panic!("expected acceptance, got {:?}", outcome);
        };
        assert!(stored);
        assert_relative_eq!(quality.brightness, 128.0, epsilon = 1e-6);
        assert_eq!(w.state(), CaptureState::Frozen);
        assert!(w.source().unwrap().is_paused());
        assert_eq!(w.feedback().warning, Some(false));
        assert!(w.feedback().alerts.is_empty());
        assert_eq!(w.store().len(), 1);
    }

    #[test]
    fn test_stored_image_is_the_guide_crop() {
        let mut w = widget(128);
        w.on_trigger();

        let stored = w.store().get("image").unwrap().unwrap();
        let decoded = decode_data_url(&stored).unwrap();
        // Guide 200x300 at cover scale 2/3 maps to 300x450 source pixels
        assert_eq!((decoded.width(), decoded.height()), (300, 450));
    }

    #[rstest]
    #[case::black(0, Exposure::TooDark, "The image is too dark")]
    #[case::white(255, Exposure::TooBright, "The image is too bright")]
    fn test_out_of_range_frame_is_rejected(
        #[case] value: u8,
        #[case] expected: Exposure,
        #[case] alert: &str,
    ) {
        let mut w = widget(value);
        let outcome = w.on_trigger();

        assert!(matches!(outcome, TriggerOutcome::Rejected { exposure, .. } if exposure == expected));
        assert_eq!(w.state(), CaptureState::Live);
        assert!(!w.source().unwrap().is_paused());
        assert_eq!(w.feedback().warning, Some(true));
        assert_eq!(w.feedback().alerts, vec![alert.to_string()]);
        assert!(w.store().is_empty());
    }

    #[rstest]
    #[case::accepted(128)]
    #[case::rejected(0)]
    fn test_two_triggers_return_to_live_without_image(#[case] value: u8) {
        let mut w = widget(value);
        w.on_trigger();
        w.on_trigger();

        assert_eq!(w.state(), CaptureState::Live);
        assert!(w.store().get("image").unwrap().is_none());
        assert!(!w.source().unwrap().is_paused());
    }

    #[test]
    fn test_retake_reports_resumed() {
        let mut w = widget(128);
        w.on_trigger();
        assert_eq!(w.on_trigger(), TriggerOutcome::Resumed);
    }

    #[test]
    fn test_recapture_overwrites_single_entry() {
        let mut store = MemoryStore::new();
        store.set("image", "stale").unwrap();
        let mut w = widget_with(128, store, CaptureSettings::default());

        w.on_trigger();
        let first = w.store().get("image").unwrap();
        w.on_trigger();
        w.on_trigger();

        assert_eq!(w.store().len(), 1);
        assert_ne!(w.store().get("image").unwrap().as_deref(), Some("stale"));
        assert_eq!(w.store().get("image").unwrap(), first);
    }

    #[test]
    fn test_custom_storage_key() {
        let settings = CaptureSettings { storage_key: "face".to_string(), ..CaptureSettings::default() };
        let mut w = widget_with(128, MemoryStore::new(), settings);
        w.on_trigger();

        assert!(w.store().get("face").unwrap().is_some());
        assert!(w.store().get("image").unwrap().is_none());
    }

    #[test]
    fn test_permissive_persistence_failure_still_freezes() {
        let mut w = widget_with(128, BrokenStore::default(), CaptureSettings::default());
        let outcome = w.on_trigger();

        assert!(matches!(outcome, TriggerOutcome::Accepted { stored: false, .. }));
        assert!(w.is_frozen());
        assert!(w.feedback().alerts.is_empty());
    }

    #[test]
    fn test_strict_persistence_failure_stays_live() {
        let settings = CaptureSettings { persistence: PersistencePolicy::Strict, ..CaptureSettings::default() };
        let mut w = widget_with(128, BrokenStore::default(), settings);
        let outcome = w.on_trigger();

        assert!(matches!(outcome, TriggerOutcome::PersistenceFailed { .. }));
        assert_eq!(w.state(), CaptureState::Live);
        assert!(!w.source().unwrap().is_paused());
        assert_eq!(w.feedback().alerts.len(), 1);
    }

    #[test]
    fn test_failed_store_clears_stale_image() {
        let mut store = BrokenStore::default();
        store.inner.set("image", "stale").unwrap();
        let mut w = widget_with(128, store, CaptureSettings::default());
        w.on_trigger();

        assert!(w.store().get("image").unwrap().is_none());
    }

    #[test]
    fn test_missing_guide_box_changes_nothing() {
        let layout = FixedLayout { container: Some(Rect::new(0.0, 0.0, 640.0, 480.0)), guide: None };
        let mut w: TestWidget<MemoryStore> = CaptureWidget::with_source(
            uniform_frame(128), layout, MemoryStore::new(), RecordingFeedback::default(), CaptureSettings::default(),
        );

        assert_eq!(w.on_trigger(), TriggerOutcome::GeometryUnavailable);
        assert_eq!(w.state(), CaptureState::Live);
        assert!(w.feedback().warning.is_none());
        assert!(w.store().is_empty());
    }

    #[test]
    fn test_oversized_guide_is_geometry_unavailable() {
        let layout = FixedLayout::new(Rect::new(0.0, 0.0, 640.0, 480.0), Rect::new(0.0, 0.0, 1e9, 1e9));
        let mut w: TestWidget<MemoryStore> = CaptureWidget::with_source(
            uniform_frame(128), layout, MemoryStore::new(), RecordingFeedback::default(), CaptureSettings::default(),
        );

        assert_eq!(w.on_trigger(), TriggerOutcome::GeometryUnavailable);
        assert_eq!(w.state(), CaptureState::Live);
        assert!(w.store().is_empty());
    }

    #[test]
    fn test_zero_sized_video_is_geometry_unavailable() {
        let mut w: TestWidget<MemoryStore> = CaptureWidget::with_source(
            StillFrame::new(RgbaImage::new(0, 0)), layout(), MemoryStore::new(),
            RecordingFeedback::default(), CaptureSettings::default(),
        );
        assert_eq!(w.on_trigger(), TriggerOutcome::GeometryUnavailable);
    }

    #[test]
    fn test_failed_camera_setup_leaves_widget_without_feed() {
        let mut w: TestWidget<MemoryStore> = CaptureWidget::new(
            layout(), MemoryStore::new(), RecordingFeedback::default(), CaptureSettings::default(),
        );
        let acquired = w.setup_camera(|| Err(CaptureError::DeviceUnavailable("permission denied".into())));

        assert!(!acquired);
        assert_eq!(w.on_trigger(), TriggerOutcome::DeviceUnavailable);
        assert_eq!(w.state(), CaptureState::Live);
    }

    #[test]
    fn test_setup_camera_attaches_feed() {
        let mut w: TestWidget<MemoryStore> = CaptureWidget::new(
            layout(), MemoryStore::new(), RecordingFeedback::default(), CaptureSettings::default(),
        );
        assert!(w.setup_camera(|| Ok(uniform_frame(128))));
        assert!(matches!(w.on_trigger(), TriggerOutcome::Accepted { stored: true, .. }));
    }

    #[test]
    fn test_guide_preview_returns_full_frame() {
        let mut w = widget(128);
        let (frame, region) = w.guide_preview().unwrap();
        assert_eq!(frame.dimensions(), (1280, 720));
        assert_relative_eq!(region.x, 490.0, epsilon = 1e-9);
        assert_eq!(w.state(), CaptureState::Live);
    }

    #[test]
    fn test_accept_after_reject_hides_warning() {
        let mut w = widget(0);
        w.on_trigger();
        assert_eq!(w.feedback().warning, Some(true));

        w.source = Some(uniform_frame(128));
        w.on_trigger();
        assert_eq!(w.feedback().warning, Some(false));
        assert!(w.is_frozen());
    }
}
