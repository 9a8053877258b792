//! Tour step controller
//!
//! Owns the "current step" cursor for one tour page. Following The Elm
//! Architecture the controller does no I/O: every operation mutates the cursor
//! and returns a [`Cmd`] describing the side effects (profile writes,
//! navigation, re-anchoring) for the session to carry out.
//!
//! ```text
//! advance : PageConditions -> Controller -> (Controller, Cmd)
//! ```
//!
//! Once a page transition or skip has been issued the controller is terminal
//! and every later call returns [`Cmd::None`]. That is what keeps a double
//! click from writing progress or navigating twice.

use std::collections::HashSet;

use super::catalog::{TourCatalog, TourPage, TourStepDef, DIALOG_OPENED};
use super::step::StepId;
use crate::config::TourConfig;
use crate::profile::ProfilePatch;

// =============================================================================
// Messages in
// =============================================================================

/// Something the page reports to the tour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    DialogOpened(String),
    DialogClosed(String),
    /// Any other named interaction a step can wait on
    Named(String),
}

/// Live page state consulted by conditional skip rules at the moment
/// `advance` runs
pub trait PageConditions {
    fn holds(&self, condition: &str) -> bool;
}

impl PageConditions for HashSet<String> {
    fn holds(&self, condition: &str) -> bool {
        self.contains(condition)
    }
}

impl<F: Fn(&str) -> bool> PageConditions for F {
    fn holds(&self, condition: &str) -> bool {
        self(condition)
    }
}

/// A page where no condition ever holds
pub struct NoConditions;

impl PageConditions for NoConditions {
    fn holds(&self, _condition: &str) -> bool {
        false
    }
}

// =============================================================================
// Commands out
// =============================================================================

/// Side effects for the session to execute
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// No command
    None,
    /// Multiple commands, executed in order
    Batch(Vec<Cmd>),
    /// Merge a partial update into the wedding profile
    UpdateProfile(ProfilePatch),
    /// Leave this page
    Navigate { route: String, replace: bool },
    /// The visible step changed; point the tooltip at its anchor
    ShowStep(StepId),
    /// Page layout changed under the current step; re-resolve its anchor
    RefreshAnchor,
}

impl Cmd {
    /// Create a batch of commands
    pub fn batch(cmds: Vec<Cmd>) -> Cmd {
        let mut cmds: Vec<Cmd> = cmds
            .into_iter()
            .filter(|c| !matches!(c, Cmd::None))
            .collect();
        match cmds.len() {
            0 => Cmd::None,
            1 => cmds.pop().unwrap_or(Cmd::None),
            _ => Cmd::Batch(cmds),
        }
    }

    /// Flatten nested batches into execution order
    pub fn flatten(self) -> Vec<Cmd> {
        match self {
            Cmd::None => Vec::new(),
            Cmd::Batch(cmds) => cmds.into_iter().flat_map(Cmd::flatten).collect(),
            other => vec![other],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    /// Handed off to another page (forward or backward)
    Departed,
    /// User skipped the tour
    Skipped,
}

/// Route and stage of a neighbouring page
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageLink {
    route: String,
    stage: u32,
}

impl From<&TourPage> for PageLink {
    fn from(page: &TourPage) -> Self {
        Self {
            route: page.route.clone(),
            stage: page.stage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub home_route: String,
    pub rewind_onboarding_step: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&TourConfig::default())
    }
}

impl From<&TourConfig> for ControllerSettings {
    fn from(config: &TourConfig) -> Self {
        Self {
            home_route: config.home_route.clone(),
            rewind_onboarding_step: config.rewind_onboarding_step,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TourController {
    page: TourPage,
    next: Option<PageLink>,
    prev: Option<PageLink>,
    current: StepId,
    phase: Phase,
    events: HashSet<String>,
    settings: ControllerSettings,
    /// `onboardingStep` as last known; forward transitions never lower it
    known_onboarding_step: u32,
}

impl TourController {
    /// Controller for `route`, starting on the page's first step.
    /// `None` if the catalog has no such page.
    pub fn new(
        catalog: &TourCatalog,
        route: &str,
        settings: ControllerSettings,
        known_onboarding_step: u32,
    ) -> Option<Self> {
        let page = catalog.page(route)?;
        let current = page.first_step()?;
        Some(Self {
            page: page.clone(),
            next: catalog.next_page(route).map(PageLink::from),
            prev: catalog.prev_page(route).map(PageLink::from),
            current,
            phase: Phase::Active,
            events: HashSet::new(),
            settings,
            known_onboarding_step,
        })
    }

    /// Jump straight to `step` (deep links). Ignored if the page lacks it.
    pub fn start_at(&mut self, step: StepId) -> bool {
        if self.phase == Phase::Active && self.page.index_of(step).is_some() {
            self.current = step;
            true
        } else {
            false
        }
    }

    pub fn page(&self) -> &TourPage {
        &self.page
    }

    pub fn current(&self) -> StepId {
        self.current
    }

    pub fn current_def(&self) -> Option<&TourStepDef> {
        self.page.step(self.current)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// ("Step N", "of Total") numbers for the tooltip header
    pub fn progress(&self) -> (u32, u32) {
        (self.current.display_number(), self.page.total())
    }

    /// Whether the current step's required interaction has happened
    pub fn precondition_met(&self) -> bool {
        match self.current_def().and_then(|s| s.requires.as_deref()) {
            Some(event) => self.events.contains(event),
            None => true,
        }
    }

    /// Record a page interaction
    pub fn notify(&mut self, event: PageEvent) -> Cmd {
        if !self.is_active() {
            return Cmd::None;
        }
        match event {
            PageEvent::DialogOpened(id) => {
                self.events.insert(format!("{DIALOG_OPENED}{id}"));
            }
            PageEvent::DialogClosed(id) => {
                self.events.remove(&format!("{DIALOG_OPENED}{id}"));
            }
            PageEvent::Named(name) => {
                self.events.insert(name);
            }
        }
        Cmd::RefreshAnchor
    }

    /// Move forward one step, follow a conditional skip, or hand off to the
    /// next page after the last step
    pub fn advance(&mut self, live: &dyn PageConditions) -> Cmd {
        if !self.is_active() {
            return Cmd::None;
        }
        let Some(idx) = self.page.index_of(self.current) else {
            tracing::debug!(step = %self.current, route = %self.page.route, "advance from unknown step ignored");
            return Cmd::None;
        };
        let step = &self.page.steps[idx];

        if let Some(required) = step.requires.as_deref() {
            if !self.events.contains(required) {
                tracing::debug!(step = %step.id, required, "advance blocked until page event");
                return Cmd::None;
            }
        }

        if let Some(rule) = step.skip.iter().find(|r| live.holds(&r.when)) {
            tracing::debug!(from = %step.id, to = %rule.to, condition = %rule.when, "conditional skip");
            self.current = rule.to;
            return Cmd::ShowStep(self.current);
        }

        match self.page.steps.get(idx + 1) {
            Some(next) => {
                self.current = next.id;
                Cmd::ShowStep(self.current)
            }
            None => self.finish_page(),
        }
    }

    /// Move back one step (undoing a skip that still holds), or hand off to
    /// the previous page from the first step
    pub fn retreat(&mut self, live: &dyn PageConditions) -> Cmd {
        if !self.is_active() {
            return Cmd::None;
        }
        let Some(idx) = self.page.index_of(self.current) else {
            tracing::debug!(step = %self.current, route = %self.page.route, "retreat from unknown step ignored");
            return Cmd::None;
        };

        let current = self.current;
        let skipped_from = self.page.steps[..idx]
            .iter()
            .rev()
            .find(|s| s.skip.iter().any(|r| r.to == current && live.holds(&r.when)));
        if let Some(source) = skipped_from {
            self.current = source.id;
            return Cmd::ShowStep(self.current);
        }

        if idx > 0 {
            self.current = self.page.steps[idx - 1].id;
            return Cmd::ShowStep(self.current);
        }

        let Some(prev) = self.prev.clone() else {
            return Cmd::None;
        };
        self.phase = Phase::Departed;
        tracing::info!(from = %self.page.route, to = %prev.route, "tour page back");

        let rewind = if self.settings.rewind_onboarding_step {
            Cmd::UpdateProfile(ProfilePatch::new().onboarding_step(prev.stage))
        } else {
            Cmd::None
        };
        Cmd::batch(vec![
            rewind,
            Cmd::Navigate {
                route: prev.route,
                replace: false,
            },
        ])
    }

    /// Abandon the tour: mark every section done, leave tour mode, go home
    pub fn skip(&mut self) -> Cmd {
        if !self.is_active() {
            return Cmd::None;
        }
        self.phase = Phase::Skipped;
        tracing::info!(route = %self.page.route, step = %self.current, "tour skipped");

        Cmd::batch(vec![
            Cmd::UpdateProfile(ProfilePatch::tour_skipped()),
            Cmd::Navigate {
                route: self.settings.home_route.clone(),
                replace: true,
            },
        ])
    }

    fn finish_page(&mut self) -> Cmd {
        self.phase = Phase::Departed;

        let mut patch = ProfilePatch::new();
        if let Some(section) = self.page.section {
            patch = patch.complete_section(section);
        }

        let navigate = match &self.next {
            Some(next) => {
                patch = patch.onboarding_step(self.known_onboarding_step.max(next.stage));
                tracing::info!(from = %self.page.route, to = %next.route, "tour page complete");
                Cmd::Navigate {
                    route: next.route.clone(),
                    replace: false,
                }
            }
            None => {
                patch = patch
                    .onboarding_step(self.known_onboarding_step.max(self.page.stage))
                    .onboarding_complete(true)
                    .tour_mode(false);
                tracing::info!(from = %self.page.route, "tour complete");
                Cmd::Navigate {
                    route: self.settings.home_route.clone(),
                    replace: true,
                }
            }
        };

        Cmd::batch(vec![Cmd::UpdateProfile(patch), navigate])
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::profile::TourSection;
    use crate::tour::anchor::AnchorTarget;
    use crate::tour::catalog::SkipRule;
    use proptest::prelude::*;

    pub(crate) fn step(id: StepId) -> TourStepDef {
        TourStepDef {
            id,
            title: format!("Step {id}"),
            body: String::new(),
            anchor: AnchorTarget::centered(),
            requires: None,
            skip: Vec::new(),
        }
    }

    pub(crate) fn page(route: &str, section: Option<TourSection>, ids: &[StepId]) -> TourPage {
        TourPage {
            route: route.to_string(),
            title: route.to_string(),
            section,
            steps: ids.iter().map(|id| step(*id)).collect(),
            stage: 0,
        }
    }

    fn n(v: u32) -> StepId {
        StepId::Number(v)
    }

    fn sub(v: u32, tag: char) -> StepId {
        StepId::Sub(v, tag)
    }

    /// intro -> homepage [1,2,3] -> guests [6, 7a..7e, 8]
    pub(crate) fn three_page_catalog() -> TourCatalog {
        let intro = page("/onboarding/step-1a", None, &[n(1)]);
        let home = page(
            "/onboarding/step-2",
            Some(TourSection::Homepage),
            &[n(1), n(2), n(3)],
        );
        let mut guests = page(
            "/onboarding/step-4",
            Some(TourSection::GuestPage),
            &[
                n(6),
                sub(7, 'a'),
                sub(7, 'b'),
                sub(7, 'c'),
                sub(7, 'd'),
                sub(7, 'e'),
                n(8),
            ],
        );
        guests.steps[1].requires = Some("dialog-opened:send-message".to_string());
        TourCatalog::from_pages(vec![intro, home, guests]).unwrap()
    }

    fn controller(route: &str) -> TourController {
        TourController::new(
            &three_page_catalog(),
            route,
            ControllerSettings::default(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_route() {
        assert!(TourController::new(
            &three_page_catalog(),
            "/nope",
            ControllerSettings::default(),
            0
        )
        .is_none());
    }

    #[test]
    fn test_homepage_walkthrough() {
        let mut c = controller("/onboarding/step-2");
        assert_eq!(c.current(), n(1));
        assert_eq!(c.advance(&NoConditions), Cmd::ShowStep(n(2)));
        assert_eq!(c.advance(&NoConditions), Cmd::ShowStep(n(3)));

        let cmd = c.advance(&NoConditions);
        let patch = ProfilePatch::new()
            .complete_section(TourSection::Homepage)
            .onboarding_step(3);
        assert_eq!(
            cmd.flatten(),
            vec![
                Cmd::UpdateProfile(patch),
                Cmd::Navigate {
                    route: "/onboarding/step-4".to_string(),
                    replace: false
                }
            ]
        );
        // Cursor stays on the last step, never out of range
        assert_eq!(c.current(), n(3));
        assert_eq!(c.phase(), Phase::Departed);
    }

    #[test]
    fn test_transition_happens_once() {
        let mut c = controller("/onboarding/step-2");
        c.start_at(n(3));
        let first = c.advance(&NoConditions).flatten();
        assert_eq!(
            first
                .iter()
                .filter(|c| matches!(c, Cmd::UpdateProfile(_)))
                .count(),
            1
        );
        assert_eq!(
            first
                .iter()
                .filter(|c| matches!(c, Cmd::Navigate { .. }))
                .count(),
            1
        );
        assert!(c.advance(&NoConditions).is_none());
        assert!(c.retreat(&NoConditions).is_none());
        assert!(c.skip().is_none());
    }

    #[test]
    fn test_retreat_from_first_step_goes_back_a_page() {
        let mut c = controller("/onboarding/step-2");
        let cmd = c.retreat(&NoConditions);
        assert_eq!(
            cmd,
            Cmd::Navigate {
                route: "/onboarding/step-1a".to_string(),
                replace: false
            }
        );
        assert_eq!(c.phase(), Phase::Departed);
    }

    #[test]
    fn test_retreat_rewinds_when_configured() {
        let settings = ControllerSettings {
            rewind_onboarding_step: true,
            ..ControllerSettings::default()
        };
        let mut c =
            TourController::new(&three_page_catalog(), "/onboarding/step-2", settings, 2).unwrap();
        assert_eq!(
            c.retreat(&NoConditions).flatten(),
            vec![
                Cmd::UpdateProfile(ProfilePatch::new().onboarding_step(1)),
                Cmd::Navigate {
                    route: "/onboarding/step-1a".to_string(),
                    replace: false
                }
            ]
        );
    }

    #[test]
    fn test_retreat_on_first_page_is_noop() {
        let mut c = controller("/onboarding/step-1a");
        assert!(c.retreat(&NoConditions).is_none());
        assert!(c.is_active());
    }

    #[test]
    fn test_dialog_precondition_blocks_advance() {
        let mut c = controller("/onboarding/step-4");
        assert_eq!(c.advance(&NoConditions), Cmd::ShowStep(sub(7, 'a')));
        assert!(!c.precondition_met());

        // Dialog not open yet: still on 7a
        assert!(c.advance(&NoConditions).is_none());
        assert_eq!(c.current(), sub(7, 'a'));

        assert_eq!(
            c.notify(PageEvent::DialogOpened("send-message".to_string())),
            Cmd::RefreshAnchor
        );
        assert!(c.precondition_met());
        assert_eq!(c.advance(&NoConditions), Cmd::ShowStep(sub(7, 'b')));
        assert_eq!(c.progress(), (7, 8));
    }

    #[test]
    fn test_closing_dialog_rearms_precondition() {
        let mut c = controller("/onboarding/step-4");
        c.start_at(sub(7, 'a'));
        c.notify(PageEvent::DialogOpened("send-message".to_string()));
        c.notify(PageEvent::DialogClosed("send-message".to_string()));
        assert!(c.advance(&NoConditions).is_none());
    }

    #[test]
    fn test_last_page_completes_tour() {
        let mut c = TourController::new(
            &three_page_catalog(),
            "/onboarding/step-4",
            ControllerSettings::default(),
            2,
        )
        .unwrap();
        c.start_at(n(8));
        let cmds = c.advance(&NoConditions).flatten();
        let patch = ProfilePatch::new()
            .complete_section(TourSection::GuestPage)
            .onboarding_step(3)
            .onboarding_complete(true)
            .tour_mode(false);
        assert_eq!(
            cmds,
            vec![
                Cmd::UpdateProfile(patch),
                Cmd::Navigate {
                    route: "/dashboard".to_string(),
                    replace: true
                }
            ]
        );
    }

    #[test]
    fn test_onboarding_step_never_lowered() {
        let mut c = TourController::new(
            &three_page_catalog(),
            "/onboarding/step-2",
            ControllerSettings::default(),
            9,
        )
        .unwrap();
        c.start_at(n(3));
        match &c.advance(&NoConditions).flatten()[0] {
            Cmd::UpdateProfile(patch) => assert_eq!(patch.onboarding_step, Some(9)),
            other => panic!("expected profile update, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_is_terminal() {
        let mut c = controller("/onboarding/step-2");
        let cmds = c.skip().flatten();
        match &cmds[0] {
            Cmd::UpdateProfile(patch) => {
                assert_eq!(patch.tour_progress.len(), TourSection::ALL.len());
                assert!(patch.tour_progress.iter().all(|(_, v)| *v));
                assert_eq!(patch.onboarding_complete, Some(true));
                assert_eq!(patch.tour_mode, Some(false));
                assert_eq!(patch.onboarding_step, None);
            }
            other => panic!("expected profile update, got {other:?}"),
        }
        assert_eq!(
            cmds[1],
            Cmd::Navigate {
                route: "/dashboard".to_string(),
                replace: true
            }
        );
        assert_eq!(c.phase(), Phase::Skipped);

        assert!(c.skip().is_none());
        assert!(c.advance(&NoConditions).is_none());
        assert!(c
            .notify(PageEvent::Named("anything".to_string()))
            .is_none());
    }

    #[test]
    fn test_unknown_current_step_is_noop() {
        let mut c = controller("/onboarding/step-2");
        // Force a step id the page doesn't have
        c.current = n(42);
        assert!(c.advance(&NoConditions).is_none());
        assert!(c.retreat(&NoConditions).is_none());
        assert_eq!(c.current(), n(42));
        assert!(c.is_active());
        assert!(!c.start_at(n(99)));
    }

    fn skip_catalog() -> TourCatalog {
        let mut convo = page(
            "/onboarding/step-3",
            Some(TourSection::Conversations),
            &[n(1), n(2), n(3), n(4)],
        );
        convo.steps[1].skip.push(SkipRule {
            when: "auto-answered".to_string(),
            to: n(4),
        });
        TourCatalog::from_pages(vec![convo]).unwrap()
    }

    #[test]
    fn test_conditional_skip_uses_live_state() {
        let catalog = skip_catalog();
        let mut live: HashSet<String> = HashSet::new();
        let mut c = TourController::new(
            &catalog,
            "/onboarding/step-3",
            ControllerSettings::default(),
            0,
        )
        .unwrap();
        c.start_at(n(2));

        // Condition became true after the step was entered
        live.insert("auto-answered".to_string());
        assert_eq!(c.advance(&live), Cmd::ShowStep(n(4)));

        // Symmetric retreat while the condition still holds
        assert_eq!(c.retreat(&live), Cmd::ShowStep(n(2)));

        // Condition cleared: plain sequence again
        live.clear();
        assert_eq!(c.advance(&live), Cmd::ShowStep(n(3)));
        assert_eq!(c.advance(&live), Cmd::ShowStep(n(4)));
        assert_eq!(c.retreat(&live), Cmd::ShowStep(n(3)));
    }

    #[test]
    fn test_closure_conditions() {
        let catalog = skip_catalog();
        let mut c = TourController::new(
            &catalog,
            "/onboarding/step-3",
            ControllerSettings::default(),
            0,
        )
        .unwrap();
        c.start_at(n(2));
        let live = |cond: &str| cond == "auto-answered";
        assert_eq!(c.advance(&live), Cmd::ShowStep(n(4)));
    }

    #[test]
    fn test_cmd_batch() {
        assert_eq!(Cmd::batch(vec![Cmd::None, Cmd::None]), Cmd::None);
        assert_eq!(
            Cmd::batch(vec![Cmd::None, Cmd::RefreshAnchor]),
            Cmd::RefreshAnchor
        );
        let nested = Cmd::Batch(vec![
            Cmd::RefreshAnchor,
            Cmd::Batch(vec![Cmd::ShowStep(n(1)), Cmd::None]),
        ]);
        assert_eq!(
            nested.flatten(),
            vec![Cmd::RefreshAnchor, Cmd::ShowStep(n(1))]
        );
    }

    fn plain_sequence(len: usize) -> TourCatalog {
        let ids: Vec<StepId> = (1..=len as u32).map(StepId::Number).collect();
        TourCatalog::from_pages(vec![
            page("/onboarding/step-1a", None, &[n(1)]),
            page("/onboarding/step-2", Some(TourSection::Homepage), &ids),
            page("/onboarding/step-3", None, &[n(1)]),
        ])
        .unwrap()
    }

    proptest! {
        #[test]
        fn prop_advance_moves_to_next_index(len in 2usize..12, start in 0usize..11) {
            let start = start % (len - 1);
            let catalog = plain_sequence(len);
            let mut c = TourController::new(
                &catalog, "/onboarding/step-2", ControllerSettings::default(), 0,
            ).unwrap();
            let seq = c.page().sequence();
            c.start_at(seq[start]);
            prop_assert_eq!(c.advance(&NoConditions), Cmd::ShowStep(seq[start + 1]));
            prop_assert_eq!(c.current(), seq[start + 1]);
        }

        #[test]
        fn prop_retreat_undoes_advance(len in 3usize..12, start in 1usize..10) {
            let start = 1 + start % (len - 2);
            let catalog = plain_sequence(len);
            let mut c = TourController::new(
                &catalog, "/onboarding/step-2", ControllerSettings::default(), 0,
            ).unwrap();
            let seq = c.page().sequence();
            c.start_at(seq[start]);
            c.advance(&NoConditions);
            c.retreat(&NoConditions);
            prop_assert_eq!(c.current(), seq[start]);
            prop_assert!(c.is_active());
        }
    }
}
