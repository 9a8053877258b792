//! Wedding profile and the Profile Store interface
//!
//! The profile is owned elsewhere; the tour only reads it and merges partial
//! updates into it. Stores persist it as a single JSON blob under
//! [`PROFILE_KEY`], the same layout the web client keeps in `localStorage`.

use std::cell::{Cell, RefCell};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::error::StoreError;

/// Storage key of the profile blob
pub const PROFILE_KEY: &str = "pinch.weddingProfile";

// =============================================================================
// Tour progress
// =============================================================================

/// Named tour sections tracked in [`TourProgress`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TourSection {
    Homepage,
    Conversations,
    GuestPage,
    WeddingInfo,
    ChatbotSettings,
    Reminders,
    Analytics,
}

impl TourSection {
    pub const ALL: [TourSection; 7] = [
        TourSection::Homepage,
        TourSection::Conversations,
        TourSection::GuestPage,
        TourSection::WeddingInfo,
        TourSection::ChatbotSettings,
        TourSection::Reminders,
        TourSection::Analytics,
    ];

    /// Field name as it appears in the persisted blob
    pub fn key(self) -> &'static str {
        match self {
            TourSection::Homepage => "homepage",
            TourSection::Conversations => "conversations",
            TourSection::GuestPage => "guestPage",
            TourSection::WeddingInfo => "weddingInfo",
            TourSection::ChatbotSettings => "chatbotSettings",
            TourSection::Reminders => "reminders",
            TourSection::Analytics => "analytics",
        }
    }
}

impl fmt::Display for TourSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Which tour sections the user has finished. Every flag defaults to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts-rs", derive(ts_rs::TS))]
pub struct TourProgress {
    pub homepage: bool,
    pub conversations: bool,
    pub guest_page: bool,
    pub wedding_info: bool,
    pub chatbot_settings: bool,
    pub reminders: bool,
    pub analytics: bool,
}

impl TourProgress {
    pub fn get(&self, section: TourSection) -> bool {
        match section {
            TourSection::Homepage => self.homepage,
            TourSection::Conversations => self.conversations,
            TourSection::GuestPage => self.guest_page,
            TourSection::WeddingInfo => self.wedding_info,
            TourSection::ChatbotSettings => self.chatbot_settings,
            TourSection::Reminders => self.reminders,
            TourSection::Analytics => self.analytics,
        }
    }

    fn flag_mut(&mut self, section: TourSection) -> &mut bool {
        match section {
            TourSection::Homepage => &mut self.homepage,
            TourSection::Conversations => &mut self.conversations,
            TourSection::GuestPage => &mut self.guest_page,
            TourSection::WeddingInfo => &mut self.wedding_info,
            TourSection::ChatbotSettings => &mut self.chatbot_settings,
            TourSection::Reminders => &mut self.reminders,
            TourSection::Analytics => &mut self.analytics,
        }
    }

    pub fn set(&mut self, section: TourSection, value: bool) {
        *self.flag_mut(section) = value;
    }

    /// Progress with every section marked done
    pub fn all_complete() -> Self {
        let mut progress = Self::default();
        for section in TourSection::ALL {
            progress.set(section, true);
        }
        progress
    }

    pub fn completed_count(&self) -> usize {
        TourSection::ALL.iter().filter(|s| self.get(**s)).count()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() == TourSection::ALL.len()
    }
}

// =============================================================================
// Profile
// =============================================================================

/// The slice of the wedding profile the tour reads and writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts-rs", derive(ts_rs::TS))]
pub struct WeddingProfile {
    #[cfg_attr(feature = "ts-rs", ts(type = "string"))]
    pub id: Uuid,
    #[serde(default)]
    pub couple_names: Option<String>,
    #[serde(default)]
    pub wedding_date: Option<String>,
    /// Last completed top-level onboarding stage
    #[serde(default)]
    pub onboarding_step: u32,
    #[serde(default)]
    pub onboarding_complete: bool,
    #[serde(default)]
    pub tour_mode: bool,
    #[serde(default)]
    pub tour_progress: TourProgress,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl WeddingProfile {
    /// Fresh profile at the start of onboarding, in tour mode
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            couple_names: None,
            wedding_date: None,
            onboarding_step: 0,
            onboarding_complete: false,
            tour_mode: true,
            tour_progress: TourProgress::default(),
            updated_at: None,
        }
    }

    /// Merge a partial update into this profile. Absent fields are untouched.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(step) = patch.onboarding_step {
            self.onboarding_step = step;
        }
        if let Some(complete) = patch.onboarding_complete {
            self.onboarding_complete = complete;
        }
        if let Some(tour_mode) = patch.tour_mode {
            self.tour_mode = tour_mode;
        }
        for (section, value) in &patch.tour_progress {
            self.tour_progress.set(*section, *value);
        }
    }
}

impl Default for WeddingProfile {
    fn default() -> Self {
        Self::new()
    }
}

/// A partial profile update (`Partial<WeddingProfile>`).
///
/// Applying the same patch twice yields the same profile, so a retried write
/// is harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub onboarding_step: Option<u32>,
    pub onboarding_complete: Option<bool>,
    pub tour_mode: Option<bool>,
    /// Section flags to set, in the order they were requested
    pub tour_progress: Vec<(TourSection, bool)>,
}

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn onboarding_step(mut self, step: u32) -> Self {
        self.onboarding_step = Some(step);
        self
    }

    pub fn onboarding_complete(mut self, complete: bool) -> Self {
        self.onboarding_complete = Some(complete);
        self
    }

    pub fn tour_mode(mut self, tour_mode: bool) -> Self {
        self.tour_mode = Some(tour_mode);
        self
    }

    pub fn complete_section(mut self, section: TourSection) -> Self {
        self.tour_progress.retain(|(s, _)| *s != section);
        self.tour_progress.push((section, true));
        self
    }

    /// Everything a skipped tour writes: every section done, out of tour mode
    pub fn tour_skipped() -> Self {
        let mut patch = Self::new().onboarding_complete(true).tour_mode(false);
        for section in TourSection::ALL {
            patch = patch.complete_section(section);
        }
        patch
    }

    /// Forget every field `newer` also sets
    pub fn drop_overlap(&mut self, newer: &ProfilePatch) {
        if newer.onboarding_step.is_some() {
            self.onboarding_step = None;
        }
        if newer.onboarding_complete.is_some() {
            self.onboarding_complete = None;
        }
        if newer.tour_mode.is_some() {
            self.tour_mode = None;
        }
        self.tour_progress
            .retain(|(s, _)| !newer.tour_progress.iter().any(|(n, _)| n == s));
    }

    pub fn is_empty(&self) -> bool {
        self.onboarding_step.is_none()
            && self.onboarding_complete.is_none()
            && self.tour_mode.is_none()
            && self.tour_progress.is_empty()
    }
}

// =============================================================================
// Store interface
// =============================================================================

/// Persistence abstraction for the wedding profile
pub trait ProfileStore {
    /// Current profile, `None` if none has been created yet
    fn get_profile(&self) -> Result<Option<WeddingProfile>, StoreError>;

    /// Merge `patch` into the stored profile. Creates a fresh profile first if
    /// none exists.
    fn update_profile(&self, patch: &ProfilePatch) -> Result<WeddingProfile, StoreError>;
}

/// Profile blob stored in the SQLite key/value table
pub struct SqliteProfileStore {
    db: Database,
}

impl SqliteProfileStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Write a whole profile, replacing the blob
    pub fn put_profile(&self, profile: &WeddingProfile) -> Result<(), StoreError> {
        let json = serde_json::to_string(profile)?;
        self.db.set_item(PROFILE_KEY, &json)
    }

    /// Delete the stored profile. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, StoreError> {
        self.db.remove_item(PROFILE_KEY)
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get_profile(&self) -> Result<Option<WeddingProfile>, StoreError> {
        match self.db.get_item(PROFILE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn update_profile(&self, patch: &ProfilePatch) -> Result<WeddingProfile, StoreError> {
        let mut profile = self.get_profile()?.unwrap_or_default();
        profile.apply(patch);
        profile.updated_at = Some(chrono::Local::now().to_rfc3339());
        self.put_profile(&profile)?;
        Ok(profile)
    }
}

/// In-memory store for tests and `--ephemeral` runs.
///
/// Counts writes and can be switched into a failing mode to exercise the
/// "storage unavailable" path.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profile: RefCell<Option<WeddingProfile>>,
    writes: RefCell<Vec<ProfilePatch>>,
    failing: Cell<bool>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: WeddingProfile) -> Self {
        Self {
            profile: RefCell::new(Some(profile)),
            ..Self::default()
        }
    }

    /// Patches received so far, in order
    pub fn writes(&self) -> Vec<ProfilePatch> {
        self.writes.borrow().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get_profile(&self) -> Result<Option<WeddingProfile>, StoreError> {
        Ok(self.profile.borrow().clone())
    }

    fn update_profile(&self, patch: &ProfilePatch) -> Result<WeddingProfile, StoreError> {
        self.writes.borrow_mut().push(patch.clone());
        if self.failing.get() {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }
        let mut slot = self.profile.borrow_mut();
        let profile = slot.get_or_insert_with(WeddingProfile::new);
        profile.apply(patch);
        Ok(profile.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_progress_serializes_camel_case() {
        let mut progress = TourProgress::default();
        progress.set(TourSection::GuestPage, true);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["guestPage"], true);
        assert_eq!(json["homepage"], false);
        assert_eq!(json.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_drop_overlap_keeps_untouched_fields() {
        let mut older = ProfilePatch::new()
            .onboarding_step(5)
            .complete_section(TourSection::Homepage);
        older.drop_overlap(&ProfilePatch::new().onboarding_step(11));
        assert_eq!(older.onboarding_step, None);
        assert_eq!(older.tour_progress, vec![(TourSection::Homepage, true)]);

        older.drop_overlap(&ProfilePatch::new().complete_section(TourSection::Homepage));
        assert!(older.is_empty());
    }

    #[test]
    fn test_progress_missing_fields_default_false() {
        let progress: TourProgress = serde_json::from_str(r#"{"homepage": true}"#).unwrap();
        assert!(progress.homepage);
        assert!(!progress.analytics);
        assert_eq!(progress.completed_count(), 1);
    }

    #[test]
    fn test_all_complete() {
        let progress = TourProgress::all_complete();
        assert!(progress.is_complete());
        for section in TourSection::ALL {
            assert!(progress.get(section), "{section} should be set");
        }
    }

    #[test]
    fn test_profile_blob_layout() {
        let profile = WeddingProfile::new();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["onboardingStep"], 0);
        assert_eq!(json["onboardingComplete"], false);
        assert_eq!(json["tourMode"], true);
        assert!(json["tourProgress"].is_object());
    }

    #[test]
    fn test_apply_leaves_unrelated_fields() {
        let mut profile = WeddingProfile::new();
        profile.couple_names = Some("Ana & Ben".to_string());
        profile.tour_progress.reminders = true;

        let patch = ProfilePatch::new()
            .onboarding_step(4)
            .complete_section(TourSection::Homepage);
        profile.apply(&patch);

        assert_eq!(profile.onboarding_step, 4);
        assert!(profile.tour_progress.homepage);
        assert!(profile.tour_progress.reminders);
        assert!(profile.tour_mode);
        assert_eq!(profile.couple_names.as_deref(), Some("Ana & Ben"));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let patch = ProfilePatch::new()
            .onboarding_step(2)
            .tour_mode(false)
            .complete_section(TourSection::Analytics);
        let mut once = WeddingProfile::new();
        once.apply(&patch);
        let mut twice = once.clone();
        twice.apply(&patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_complete_section_dedups() {
        let patch = ProfilePatch::new()
            .complete_section(TourSection::Homepage)
            .complete_section(TourSection::Homepage);
        assert_eq!(patch.tour_progress.len(), 1);
        assert!(!patch.is_empty());
        assert!(ProfilePatch::new().is_empty());
    }

    #[test]
    fn test_memory_store_creates_on_first_write() {
        let store = MemoryProfileStore::new();
        assert!(store.get_profile().unwrap().is_none());

        store
            .update_profile(&ProfilePatch::new().onboarding_step(1))
            .unwrap();
        let profile = store.get_profile().unwrap().unwrap();
        assert_eq!(profile.onboarding_step, 1);
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn test_memory_store_failure_keeps_profile() {
        let store = MemoryProfileStore::with_profile(WeddingProfile::new());
        store.set_failing(true);
        let result = store.update_profile(&ProfilePatch::new().onboarding_complete(true));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(!store.get_profile().unwrap().unwrap().onboarding_complete);
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(dir.path().join("pinch.db")).unwrap();
        let store = SqliteProfileStore::new(db);

        assert!(store.get_profile().unwrap().is_none());
        let updated = store
            .update_profile(&ProfilePatch::new().complete_section(TourSection::Conversations))
            .unwrap();
        assert!(updated.updated_at.is_some());

        let loaded = store.get_profile().unwrap().unwrap();
        assert_eq!(loaded.id, updated.id);
        assert!(loaded.tour_progress.conversations);

        assert!(store.clear().unwrap());
        assert!(store.get_profile().unwrap().is_none());
    }

    #[test]
    fn test_sqlite_store_rejects_corrupt_blob() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(dir.path().join("pinch.db")).unwrap();
        db.set_item(PROFILE_KEY, "{not json").unwrap();
        let store = SqliteProfileStore::new(db);
        assert!(matches!(store.get_profile(), Err(StoreError::Corrupt(_))));
    }
}
