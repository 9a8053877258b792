//! Tour session: the imperative shell around [`TourController`]
//!
//! The controller decides, the session acts. It owns the controller for the
//! page currently shown, the anchor resolver and its retry timers, and an
//! optimistic copy of the wedding profile. Commands coming back from the
//! controller are executed here against the [`ProfileStore`] and
//! [`Navigator`].
//!
//! Storage failures never block the tour. They are logged, queued as a
//! [`Notification`] for the host to show, and the session carries on with the
//! in-memory profile.

use std::rc::Rc;
use std::time::Instant;

use super::anchor::{
    AnchorResolver, Document, Point, Resolution, ResolverSettings, RetryTicket, Size,
};
use super::catalog::{TourCatalog, TourPage, TourStepDef};
use super::controller::{Cmd, ControllerSettings, PageConditions, PageEvent, TourController};
use super::deep_link::TourPosition;
use super::navigator::{NavigateOptions, Navigator};
use super::timer::TimerQueue;
use crate::config::Config;
use crate::profile::{ProfilePatch, ProfileStore, WeddingProfile};

/// Non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

/// What the host needs to draw the tooltip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipView {
    pub title: String,
    pub body: String,
    /// "Step N of Total"
    pub label: String,
    pub at: Point,
    /// False while the step waits on a page event; Next does nothing
    pub can_advance: bool,
    pub can_retreat: bool,
}

pub struct TourSession {
    catalog: TourCatalog,
    settings: ControllerSettings,
    store: Rc<dyn ProfileStore>,
    navigator: Rc<dyn Navigator>,
    profile: WeddingProfile,
    route: String,
    controller: Option<TourController>,
    resolver: AnchorResolver,
    timers: TimerQueue<RetryTicket>,
    notifications: Vec<Notification>,
    /// Patches the store rejected; replayed over every copy read back from it
    unsaved: Vec<ProfilePatch>,
}

impl TourSession {
    pub fn new(
        catalog: TourCatalog,
        config: &Config,
        store: Rc<dyn ProfileStore>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        let mut notifications = Vec::new();
        let profile = match store.get_profile() {
            Ok(Some(profile)) => profile,
            Ok(None) => WeddingProfile::new(),
            Err(e) => {
                tracing::warn!(error = %e, "could not load wedding profile, starting fresh");
                notifications.push(Notification {
                    message: format!("Saved progress unavailable: {e}"),
                });
                WeddingProfile::new()
            }
        };

        Self {
            catalog,
            settings: ControllerSettings::from(&config.tour),
            store,
            navigator,
            profile,
            route: String::new(),
            controller: None,
            resolver: AnchorResolver::new(ResolverSettings::from(&config.tooltip)),
            timers: TimerQueue::new(),
            notifications,
            unsaved: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &TourCatalog {
        &self.catalog
    }

    pub fn profile(&self) -> &WeddingProfile {
        &self.profile
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn controller(&self) -> Option<&TourController> {
        self.controller.as_ref()
    }

    pub fn page(&self) -> Option<&TourPage> {
        self.controller.as_ref().map(TourController::page)
    }

    pub fn current_step(&self) -> Option<&TourStepDef> {
        self.controller.as_ref().and_then(TourController::current_def)
    }

    /// Where a returning user picks the tour back up
    pub fn resume_route(&self) -> String {
        if self.profile.onboarding_complete || !self.profile.tour_mode {
            return self.settings.home_route.clone();
        }
        let stage = self.profile.onboarding_step.max(1);
        self.catalog
            .pages()
            .iter()
            .find(|p| p.stage == stage)
            .or_else(|| self.catalog.pages().last())
            .map(|p| p.route.clone())
            .unwrap_or_else(|| self.settings.home_route.clone())
    }

    /// Mount `route`. Tour pages get a fresh controller at their first step
    /// while tour mode is on; anything else shows no tooltip.
    pub fn open(&mut self, route: &str, doc: &dyn Document, now: Instant) {
        self.teardown();
        self.route = route.to_string();

        if !self.profile.tour_mode {
            tracing::debug!(route, "tour mode off, no tooltip");
            return;
        }
        self.controller = TourController::new(
            &self.catalog,
            route,
            self.settings.clone(),
            self.profile.onboarding_step,
        );
        let Some(step) = self.controller.as_ref().map(TourController::current) else {
            return;
        };
        tracing::debug!(route, %step, "tour page mounted");
        self.show_current(doc, now);
    }

    /// Mount a deep-linked position
    pub fn open_at(&mut self, position: &TourPosition, doc: &dyn Document, now: Instant) {
        self.open(&position.route, doc, now);
        if let Some(controller) = self.controller.as_mut() {
            if controller.start_at(position.step) {
                self.show_current(doc, now);
            }
        }
    }

    /// Current position, for `pinch link`
    pub fn position(&self) -> Option<TourPosition> {
        self.controller
            .as_ref()
            .filter(|c| c.is_active())
            .map(|c| TourPosition::new(c.page().route.clone(), c.current()))
    }

    pub fn advance(&mut self, live: &dyn PageConditions, doc: &dyn Document, now: Instant) {
        let cmd = match self.controller.as_mut() {
            Some(c) => c.advance(live),
            None => Cmd::None,
        };
        self.execute(cmd, doc, now);
    }

    pub fn retreat(&mut self, live: &dyn PageConditions, doc: &dyn Document, now: Instant) {
        let cmd = match self.controller.as_mut() {
            Some(c) => c.retreat(live),
            None => Cmd::None,
        };
        self.execute(cmd, doc, now);
    }

    pub fn skip(&mut self, doc: &dyn Document, now: Instant) {
        let cmd = match self.controller.as_mut() {
            Some(c) => c.skip(),
            None => Cmd::None,
        };
        self.execute(cmd, doc, now);
    }

    pub fn notify(&mut self, event: PageEvent, doc: &dyn Document, now: Instant) {
        let cmd = match self.controller.as_mut() {
            Some(c) => c.notify(event),
            None => Cmd::None,
        };
        self.execute(cmd, doc, now);
    }

    /// Fire due anchor retries. Call once per event-loop tick.
    pub fn tick(&mut self, doc: &dyn Document, now: Instant) {
        for ticket in self.timers.drain_due(now) {
            self.resolver.on_retry(ticket, doc, now, &mut self.timers);
        }
    }

    /// Viewport resized or page content moved
    pub fn layout_changed(&mut self, doc: &dyn Document, now: Instant) {
        if self.controller.is_some() {
            self.resolver.on_layout_change(doc, now, &mut self.timers);
        }
    }

    pub fn drag_by(&mut self, dx: i32, dy: i32) {
        self.resolver.drag_by(dx, dy);
    }

    pub fn drag_to(&mut self, p: Point) {
        self.resolver.drag_to(p);
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn tooltip_size(&self) -> Size {
        self.resolver.settings().tooltip
    }

    pub fn resolution(&self) -> Resolution {
        self.resolver.current()
    }

    /// Tooltip for the current step, `None` while its anchor is unresolved
    pub fn tooltip(&self) -> Option<TooltipView> {
        let controller = self.controller.as_ref().filter(|c| c.is_active())?;
        let step = controller.current_def()?;
        let at = self.resolver.current().point()?;
        let (n, total) = controller.progress();
        let first = controller.page().first_step() == Some(controller.current());
        Some(TooltipView {
            title: step.title.clone(),
            body: step.body.clone(),
            label: format!("Step {n} of {total}"),
            at,
            can_advance: controller.precondition_met(),
            can_retreat: !first || self.catalog.prev_page(&controller.page().route).is_some(),
        })
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Re-read the profile from the store, keeping progress it never received
    pub fn reload_profile(&mut self) {
        match self.store.get_profile() {
            Ok(Some(profile)) => self.adopt(profile),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "profile reload failed"),
        }
    }

    fn execute(&mut self, cmd: Cmd, doc: &dyn Document, now: Instant) {
        for cmd in cmd.flatten() {
            match cmd {
                Cmd::None | Cmd::Batch(_) => {}
                Cmd::UpdateProfile(patch) => self.write_profile(&patch),
                Cmd::Navigate { route, replace } => {
                    self.navigator
                        .navigate_to(&route, NavigateOptions { replace });
                    self.open(&route, doc, now);
                }
                Cmd::ShowStep(_) => self.show_current(doc, now),
                Cmd::RefreshAnchor => {
                    self.resolver.on_layout_change(doc, now, &mut self.timers);
                }
            }
        }
    }

    fn write_profile(&mut self, patch: &ProfilePatch) {
        // Optimistic: the tour moves on whether or not the write lands
        self.profile.apply(patch);
        match self.store.update_profile(patch) {
            Ok(stored) => {
                for older in &mut self.unsaved {
                    older.drop_overlap(patch);
                }
                self.unsaved.retain(|p| !p.is_empty());
                self.adopt(stored);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save tour progress");
                self.notifications.push(Notification {
                    message: format!("Tour progress not saved: {e}"),
                });
                self.unsaved.push(patch.clone());
            }
        }
    }

    fn adopt(&mut self, stored: WeddingProfile) {
        self.profile = stored;
        for patch in &self.unsaved {
            self.profile.apply(patch);
        }
    }

    fn show_current(&mut self, doc: &dyn Document, now: Instant) {
        let Some(step) = self.current_step() else {
            return;
        };
        let anchor = step.anchor.clone();
        self.resolver.set_step(anchor, &mut self.timers);
        self.resolver.resolve(doc, now, &mut self.timers);
    }

    fn teardown(&mut self) {
        self.resolver.reset(&mut self.timers);
        self.timers.cancel_all();
        self.controller = None;
    }
}
