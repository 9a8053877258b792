//! Pinch - onboarding tour engine for a wedding-concierge product
//!
//! Walks a couple through the product page by page, one tooltip at a time,
//! and records how far they got in their wedding profile.
//!
//! # Overview
//!
//! | Piece | Purpose |
//! |-------|---------|
//! | [`tour::TourCatalog`] | Per-page step scripts, editable as TOML |
//! | [`tour::TourController`] | Pure cursor over one page's steps |
//! | [`tour::AnchorResolver`] | Places the tooltip next to its on-screen target |
//! | [`tour::TourSession`] | Runs the controller's effects against a store and navigator |
//! | [`profile::ProfileStore`] | Reads and patches the wedding profile |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::rc::Rc;
//! use pinch::{Config, MemoryProfileStore, TourCatalog, TourSession};
//! use pinch::tour::{RecordingNavigator, NoConditions};
//! use pinch::tui::screen::ScreenDocument;
//!
//! let catalog = TourCatalog::builtin().unwrap();
//! let store = Rc::new(MemoryProfileStore::new());
//! let navigator = Rc::new(RecordingNavigator::new());
//! let mut session = TourSession::new(catalog, &Config::default(), store, navigator);
//!
//! let screen = ScreenDocument::default();
//! let now = std::time::Instant::now();
//! session.open("/onboarding/step-2", &screen, now);
//! session.advance(&NoConditions, &screen, now);
//! println!("{:?}", session.tooltip().map(|t| t.label));
//! ```

pub mod concierge;
pub mod config;
pub mod db;
pub mod error;
pub mod init;
pub mod profile;
pub mod schema;
pub mod tour;
pub mod tui;

pub use concierge::MockConcierge;
pub use config::Config;
pub use db::{Database, KvEntry, CURRENT_SCHEMA};
pub use error::{CatalogError, DeepLinkError, StepIdError, StoreError};
pub use profile::{
    MemoryProfileStore, ProfilePatch, ProfileStore, SqliteProfileStore, TourProgress,
    TourSection, WeddingProfile,
};
pub use tour::{StepId, TourCatalog, TourPosition, TourSession};

// Re-export TS trait for type generation
#[cfg(feature = "ts-rs")]
pub use ts_rs::TS;
