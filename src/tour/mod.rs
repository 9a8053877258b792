//! Onboarding tour engine
//!
//! - [`catalog`]: the per-page step scripts
//! - [`controller`]: pure step cursor returning [`Cmd`] effects
//! - [`anchor`]: tooltip placement against a [`Document`]
//! - [`session`]: executes effects against the profile store and navigator

pub mod anchor;
pub mod catalog;
pub mod controller;
pub mod deep_link;
pub mod navigator;
pub mod session;
pub mod step;
pub mod timer;

pub use anchor::{
    AnchorKind, AnchorResolver, AnchorTarget, Document, Point, Rect, Resolution,
    ResolverSettings, RetryTicket, Side, Size,
};
pub use catalog::{SkipRule, TourCatalog, TourPage, TourStepDef};
pub use controller::{
    Cmd, ControllerSettings, NoConditions, PageConditions, PageEvent, Phase, TourController,
};
pub use deep_link::TourPosition;
pub use navigator::{History, NavigateOptions, Navigator, RecordingNavigator};
pub use session::{Notification, TooltipView, TourSession};
pub use step::StepId;
pub use timer::{TimerId, TimerQueue};
