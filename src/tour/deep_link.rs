//! Shareable tour positions
//!
//! A position encodes as a query string, `page=step-4&step=7b`. `step` may be
//! left out to mean the page's first step. Positions are only ever produced
//! and consumed explicitly (`pinch link`, `pinch tour --at`); nothing else
//! reads or writes them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::TourCatalog;
use super::step::StepId;
use crate::error::DeepLinkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourPosition {
    pub route: String,
    pub step: StepId,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkQuery {
    page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step: Option<String>,
}

impl TourPosition {
    pub fn new(route: impl Into<String>, step: StepId) -> Self {
        Self {
            route: route.into(),
            step,
        }
    }

    /// Parse and check against `catalog`. Accepts a leading `?` or `#`.
    pub fn decode(link: &str, catalog: &TourCatalog) -> Result<Self, DeepLinkError> {
        let query = link.trim().trim_start_matches(['?', '#']);
        let raw: LinkQuery = serde_urlencoded::from_str(query)?;

        let page = catalog
            .find(&raw.page)
            .ok_or_else(|| DeepLinkError::UnknownPage(raw.page.clone()))?;

        let step = match raw.step.as_deref() {
            Some(s) => s.parse::<StepId>()?,
            None => page
                .first_step()
                .ok_or_else(|| DeepLinkError::UnknownPage(raw.page.clone()))?,
        };
        if page.index_of(step).is_none() {
            return Err(DeepLinkError::UnknownStep {
                page: page.route.clone(),
                step: step.to_string(),
            });
        }

        Ok(Self::new(page.route.clone(), step))
    }

    /// Query string form, using the page slug
    pub fn encode(&self) -> String {
        let page = self
            .route
            .rsplit('/')
            .next()
            .unwrap_or(&self.route)
            .to_string();
        let query = LinkQuery {
            page,
            step: Some(self.step.to_string()),
        };
        serde_urlencoded::to_string(&query).unwrap_or_default()
    }
}

impl fmt::Display for TourPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step {}", self.route, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TourCatalog {
        TourCatalog::builtin().unwrap()
    }

    #[test]
    fn test_encode_uses_slug() {
        let pos = TourPosition::new("/onboarding/step-4", StepId::Sub(7, 'b'));
        assert_eq!(pos.encode(), "page=step-4&step=7b");
    }

    #[test]
    fn test_decode_sub_step() {
        let pos = TourPosition::decode("?page=step-4&step=7b", &catalog()).unwrap();
        assert_eq!(pos.route, "/onboarding/step-4");
        assert_eq!(pos.step, StepId::Sub(7, 'b'));
    }

    #[test]
    fn test_decode_full_route_and_default_step() {
        let pos = TourPosition::decode("page=%2Fonboarding%2Fstep-3", &catalog()).unwrap();
        assert_eq!(pos.route, "/onboarding/step-3");
        assert_eq!(pos.step, StepId::Number(1));
    }

    #[test]
    fn test_decode_errors() {
        let cat = catalog();
        assert!(matches!(
            TourPosition::decode("page=step-99", &cat),
            Err(DeepLinkError::UnknownPage(_))
        ));
        assert!(matches!(
            TourPosition::decode("page=step-2&step=7b", &cat),
            Err(DeepLinkError::UnknownStep { .. })
        ));
        assert!(matches!(
            TourPosition::decode("page=step-2&step=x", &cat),
            Err(DeepLinkError::Step(_))
        ));
        assert!(matches!(
            TourPosition::decode("step=1", &cat),
            Err(DeepLinkError::Malformed(_))
        ));
    }
}
