pub mod anchor;
pub mod config;
pub mod error;
pub mod frame_rate;
pub mod nutrition;
pub mod overlay;
pub mod presentation;
pub mod session;

pub use anchor::{PanelAnchor, PlaneTracking, Pose, Vec3};
pub use config::AppConfig;
pub use error::PanelError;
pub use frame_rate::FrameRateMeter;
pub use nutrition::{DEFAULT_FOOD, Indicator, Indicators, NutritionFacts, NutritionTable};
pub use overlay::{BoxOverlay, OverlayStyle, ScreenRect, overlays};
pub use presentation::PresentationState;
pub use session::FoodLens;
