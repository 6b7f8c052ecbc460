pub mod encoding;
pub mod geometry;
pub mod layout;
pub mod quality;
pub mod widget;

pub use encoding::{decode_data_url, encode_data_url};
pub use geometry::{guide_to_source, rasterize, CoverFit, Rect, SourceRegion};
pub use layout::{FixedLayout, LayoutProvider};
pub use quality::{BrightnessPolicy, Exposure, FrameQuality};
pub use widget::{
    crop_to_guide, locate_guide, CaptureSettings, CaptureState, CaptureWidget, PersistencePolicy, TriggerOutcome,
    UserFeedback,
};
