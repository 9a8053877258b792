//! Tour catalog: the fixed step script for every tour page
//!
//! The catalog is configuration, not state. The default one is compiled in
//! from `catalog.toml`; page authors can point `tour.catalog_path` at a
//! replacement with the same shape. Catalogs are validated once on load so
//! the controller can trust sequences, skip targets and anchor keys.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::anchor::{AnchorKind, AnchorTarget};
use super::step::StepId;
use crate::config::Config;
use crate::error::CatalogError;
use crate::profile::TourSection;

/// Catalog shipped with the binary
const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// Prefix of page events that report a dialog opening
pub const DIALOG_OPENED: &str = "dialog-opened:";

/// Redirects `advance` past one or more steps while a page condition holds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkipRule {
    /// Condition name, evaluated against live page state when Next is pressed
    pub when: String,
    pub to: StepId,
}

/// One step of a tour page's script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TourStepDef {
    pub id: StepId,
    pub title: String,
    pub body: String,
    pub anchor: AnchorTarget,
    /// Page event that must have happened before advancing past this step
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub skip: Vec<SkipRule>,
}

/// A routed page of the tour
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TourPage {
    pub route: String,
    pub title: String,
    /// Progress flag set when this page's last step is passed
    #[serde(default)]
    pub section: Option<TourSection>,
    pub steps: Vec<TourStepDef>,
    /// 1-based position in the catalog; assigned on load
    #[serde(skip)]
    pub stage: u32,
}

impl TourPage {
    /// Last path segment, e.g. `step-4`
    pub fn slug(&self) -> &str {
        self.route.rsplit('/').next().unwrap_or(&self.route)
    }

    pub fn sequence(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }

    pub fn first_step(&self) -> Option<StepId> {
        self.steps.first().map(|s| s.id)
    }

    pub fn last_step(&self) -> Option<StepId> {
        self.steps.last().map(|s| s.id)
    }

    pub fn index_of(&self, id: StepId) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    pub fn step(&self, id: StepId) -> Option<&TourStepDef> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// "Total" in "Step N of Total"
    pub fn total(&self) -> u32 {
        self.last_step().map(StepId::display_number).unwrap_or(0)
    }

    /// Dialog ids this page's steps wait on
    pub fn dialogs(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for step in &self.steps {
            if let Some(id) = step
                .requires
                .as_deref()
                .and_then(|r| r.strip_prefix(DIALOG_OPENED))
            {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }

    /// Condition names referenced by this page's skip rules
    pub fn conditions(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for rule in self.steps.iter().flat_map(|s| s.skip.iter()) {
            if !out.contains(&rule.when.as_str()) {
                out.push(&rule.when);
            }
        }
        out
    }
}

/// Catalog as written in TOML, before validation
#[derive(Deserialize)]
struct CatalogFile {
    pages: Vec<TourPage>,
}

/// Always validated: deserializing goes through [`TourCatalog::from_pages`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct TourCatalog {
    pages: Vec<TourPage>,
}

impl TryFrom<CatalogFile> for TourCatalog {
    type Error = CatalogError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        Self::from_pages(file.pages)
    }
}

impl TourCatalog {
    /// The catalog compiled into the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// TOML text of the builtin catalog, as a starting point for overrides
    pub fn builtin_source() -> &'static str {
        BUILTIN_CATALOG
    }

    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(s)?;
        Self::try_from(file)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// The configured override if there is one, the builtin catalog otherwise
    pub fn load_configured(config: &Config) -> Result<Self, CatalogError> {
        match &config.tour.catalog_path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Build a catalog directly from pages (tests, embedders)
    pub fn from_pages(pages: Vec<TourPage>) -> Result<Self, CatalogError> {
        let mut catalog = TourCatalog { pages };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&mut self) -> Result<(), CatalogError> {
        if self.pages.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut routes = HashSet::new();
        for (idx, page) in self.pages.iter_mut().enumerate() {
            page.stage = idx as u32 + 1;

            if !routes.insert(page.route.clone()) {
                return Err(CatalogError::DuplicateRoute(page.route.clone()));
            }
            if page.steps.is_empty() {
                return Err(CatalogError::EmptyPage {
                    route: page.route.clone(),
                });
            }

            let mut seen = HashSet::new();
            for step in &page.steps {
                if !seen.insert(step.id) {
                    return Err(CatalogError::DuplicateStep {
                        route: page.route.clone(),
                        step: step.id.to_string(),
                    });
                }
                let needs_key = matches!(
                    step.anchor.kind,
                    AnchorKind::ElementById | AnchorKind::ElementByText
                );
                if needs_key && !step.anchor.key.as_deref().is_some_and(|k| !k.is_empty()) {
                    return Err(CatalogError::MissingAnchorKey {
                        route: page.route.clone(),
                        step: step.id.to_string(),
                        kind: step.anchor.kind.as_str().to_string(),
                    });
                }
            }

            for (from_idx, step) in page.steps.iter().enumerate() {
                for rule in &step.skip {
                    match page.steps.iter().position(|s| s.id == rule.to) {
                        None => {
                            return Err(CatalogError::UnknownSkipTarget {
                                route: page.route.clone(),
                                from: step.id.to_string(),
                                to: rule.to.to_string(),
                            })
                        }
                        Some(to_idx) if to_idx <= from_idx => {
                            return Err(CatalogError::BackwardSkip {
                                route: page.route.clone(),
                                from: step.id.to_string(),
                                to: rule.to.to_string(),
                            })
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        Ok(())
    }

    pub fn pages(&self) -> &[TourPage] {
        &self.pages
    }

    pub fn first(&self) -> Option<&TourPage> {
        self.pages.first()
    }

    pub fn page(&self, route: &str) -> Option<&TourPage> {
        self.pages.iter().find(|p| p.route == route)
    }

    /// Look a page up by route or by slug (`step-4`)
    pub fn find(&self, route_or_slug: &str) -> Option<&TourPage> {
        self.page(route_or_slug)
            .or_else(|| self.pages.iter().find(|p| p.slug() == route_or_slug))
    }

    pub fn position(&self, route: &str) -> Option<usize> {
        self.pages.iter().position(|p| p.route == route)
    }

    pub fn next_page(&self, route: &str) -> Option<&TourPage> {
        self.position(route).and_then(|i| self.pages.get(i + 1))
    }

    pub fn prev_page(&self, route: &str) -> Option<&TourPage> {
        self.position(route)
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.pages.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::anchor::Side;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = TourCatalog::builtin().unwrap();
        assert_eq!(catalog.pages().len(), 13);
        assert_eq!(catalog.first().unwrap().route, "/onboarding/step-1a");
        assert_eq!(catalog.pages().last().unwrap().route, "/onboarding/step-11");

        // Stages follow catalog order
        for (i, page) in catalog.pages().iter().enumerate() {
            assert_eq!(page.stage, i as u32 + 1);
        }
    }

    #[test]
    fn test_builtin_covers_every_section_once() {
        let catalog = TourCatalog::builtin().unwrap();
        for section in TourSection::ALL {
            let count = catalog
                .pages()
                .iter()
                .filter(|p| p.section == Some(section))
                .count();
            assert_eq!(count, 1, "{section} should be completed by exactly one page");
        }
    }

    #[test]
    fn test_guest_page_sub_steps() {
        let catalog = TourCatalog::builtin().unwrap();
        let page = catalog.find("step-4").unwrap();
        let ids: Vec<String> = page.sequence().iter().map(|s| s.to_string()).collect();
        assert_eq!(
            ids,
            vec!["1", "2", "3", "4", "5", "6", "7a", "7b", "7c", "7d", "7e", "8"]
        );
        assert_eq!(page.total(), 8);
        assert_eq!(page.dialogs(), vec!["send-message"]);
        assert_eq!(page.section, Some(TourSection::GuestPage));
    }

    #[test]
    fn test_conversations_page_conditions() {
        let catalog = TourCatalog::builtin().unwrap();
        let page = catalog.find("/onboarding/step-3").unwrap();
        assert_eq!(page.conditions(), vec!["conversation-auto-answered"]);
        let rule = &page.step(StepId::Number(2)).unwrap().skip[0];
        assert_eq!(rule.to, StepId::Number(4));
    }

    #[test]
    fn test_text_fallback_on_welcome() {
        let catalog = TourCatalog::builtin().unwrap();
        let anchor = &catalog.first().unwrap().step(StepId::Number(2)).unwrap().anchor;
        assert_eq!(anchor.kind, AnchorKind::ElementById);
        assert_eq!(anchor.fallback_text.as_deref(), Some("Skip intro"));
        assert_eq!(anchor.side, Side::Bottom);
    }

    #[test]
    fn test_neighbours() {
        let catalog = TourCatalog::builtin().unwrap();
        assert_eq!(
            catalog.next_page("/onboarding/step-1c").unwrap().route,
            "/onboarding/step-2"
        );
        assert_eq!(
            catalog.prev_page("/onboarding/step-2").unwrap().route,
            "/onboarding/step-1c"
        );
        assert!(catalog.prev_page("/onboarding/step-1a").is_none());
        assert!(catalog.next_page("/onboarding/step-11").is_none());
        assert!(catalog.next_page("/nowhere").is_none());
    }

    #[test]
    fn test_rejects_unknown_skip_target() {
        let toml = r#"
[[pages]]
route = "/a"
title = "A"
[[pages.steps]]
id = 1
title = "t"
body = "b"
anchor = { kind = "viewport-centered" }
skip = [{ when = "x", to = 9 }]
"#;
        assert!(matches!(
            TourCatalog::from_toml_str(toml),
            Err(CatalogError::UnknownSkipTarget { .. })
        ));
    }

    #[test]
    fn test_rejects_backward_skip() {
        let toml = r#"
[[pages]]
route = "/a"
title = "A"
[[pages.steps]]
id = 1
title = "t"
body = "b"
anchor = { kind = "viewport-centered" }
[[pages.steps]]
id = 2
title = "t"
body = "b"
anchor = { kind = "viewport-centered" }
skip = [{ when = "x", to = 1 }]
"#;
        assert!(matches!(
            TourCatalog::from_toml_str(toml),
            Err(CatalogError::BackwardSkip { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_missing_keys() {
        let dup_step = r#"
[[pages]]
route = "/a"
title = "A"
[[pages.steps]]
id = "2a"
title = "t"
body = "b"
anchor = { kind = "viewport-centered" }
[[pages.steps]]
id = "2a"
title = "t"
body = "b"
anchor = { kind = "viewport-centered" }
"#;
        assert!(matches!(
            TourCatalog::from_toml_str(dup_step),
            Err(CatalogError::DuplicateStep { .. })
        ));

        let no_key = r#"
[[pages]]
route = "/a"
title = "A"
[[pages.steps]]
id = 1
title = "t"
body = "b"
anchor = { kind = "element-by-id" }
"#;
        assert!(matches!(
            TourCatalog::from_toml_str(no_key),
            Err(CatalogError::MissingAnchorKey { .. })
        ));

        assert!(matches!(
            TourCatalog::from_pages(Vec::new()),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn test_deserialize_runs_validation() {
        // Any serde entry point, not just from_toml_str
        let empty: Result<TourCatalog, _> = toml::from_str("pages = []");
        let err = empty.unwrap_err();
        assert!(err.to_string().contains("catalog has no pages"));

        let catalog: TourCatalog = toml::from_str(TourCatalog::builtin_source()).unwrap();
        assert_eq!(catalog.pages()[1].stage, 2);
        assert_eq!(catalog, TourCatalog::builtin().unwrap());
    }
}
