//! Application state for the tour TUI

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect as Area;

use super::screen::ScreenDocument;
use super::update::{Cmd, Model};
use crate::concierge::{MockConcierge, AUTO_ANSWERED};
use crate::tour::{History, TourPosition, TourSession};

pub struct App {
    pub session: TourSession,
    pub history: Rc<History>,
    pub concierge: MockConcierge,
    /// What the last frame put on screen
    pub screen: ScreenDocument,
    pub model: Model,
    pub status_message: Option<(String, Instant)>,
    pub refresh_shown_at: Option<Instant>,
    drag_origin: Option<(u16, u16)>,
    watch_path: Option<PathBuf>,
    route: String,
}

impl App {
    pub fn new(
        session: TourSession,
        history: Rc<History>,
        concierge: MockConcierge,
        watch_path: Option<PathBuf>,
        start: Option<TourPosition>,
    ) -> Self {
        let mut app = Self {
            session,
            history,
            concierge,
            screen: ScreenDocument::default(),
            model: Model::default(),
            status_message: None,
            refresh_shown_at: None,
            drag_origin: None,
            watch_path,
            route: String::new(),
        };

        let now = Instant::now();
        match start {
            Some(position) => app.session.open_at(&position, &app.screen, now),
            None => {
                let route = app.history.current();
                app.session.open(&route, &app.screen, now);
            }
        }
        app.sync_route();
        for note in app.session.take_notifications() {
            app.set_status(note.message);
        }
        app
    }

    /// Database file to watch for outside changes, if any
    pub fn watch_path(&self) -> Option<&Path> {
        self.watch_path.as_deref()
    }

    /// Execute a command from the update function
    pub fn run_cmd(&mut self, cmd: Cmd) -> bool {
        let now = Instant::now();
        match cmd {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    if self.run_cmd(cmd) {
                        return true;
                    }
                }
            }
            Cmd::Quit => return true,
            Cmd::Advance => {
                let auto = self.concierge.auto_answered();
                let live = move |c: &str| c == AUTO_ANSWERED && auto;
                self.session.advance(&live, &self.screen, now);
            }
            Cmd::Retreat => {
                let auto = self.concierge.auto_answered();
                let live = move |c: &str| c == AUTO_ANSWERED && auto;
                self.session.retreat(&live, &self.screen, now);
            }
            Cmd::SkipTour => {
                self.session.skip(&self.screen, now);
                self.set_status("Tour skipped".to_string());
            }
            Cmd::Page(event) => self.session.notify(event, &self.screen, now),
            Cmd::DragTooltip(dx, dy) => self.session.drag_by(dx, dy),
            Cmd::Ask(question) => self.concierge.ask(&question, now),
            Cmd::ShowLink => {
                let message = match self.session.position() {
                    Some(position) => format!("pinch tour --at '{}'", position.encode()),
                    None => "Not on a tour step".to_string(),
                };
                self.set_status(message);
            }
        }
        self.sync_route();
        for note in self.session.take_notifications() {
            self.set_status(note.message);
        }
        false
    }

    /// Reset page-scoped UI state when the session moved to another route
    fn sync_route(&mut self) {
        if self.session.route() == self.route {
            return;
        }
        self.route = self.session.route().to_string();
        if self.concierge.cancel() {
            tracing::debug!("dropped concierge reply on navigation");
        }
        let page = self.session.catalog().page(&self.route);
        self.model = Model {
            help_open: self.model.help_open,
            dialog_open: None,
            page_dialogs: page
                .map(|p| p.dialogs().into_iter().map(String::from).collect())
                .unwrap_or_default(),
            has_concierge: page.is_some_and(|p| p.conditions().contains(&AUTO_ANSWERED)),
            question_index: 0,
        };
    }

    /// Database changed on disk
    pub fn reload_profile(&mut self) {
        self.session.reload_profile();
        self.refresh_shown_at = Some(Instant::now());
    }

    /// Periodic tick: anchor retries, concierge replies, status expiry
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.session.tick(&self.screen, now);
        self.concierge.tick(now);

        if let Some(shown_at) = self.refresh_shown_at {
            if shown_at.elapsed().as_secs() >= 2 {
                self.refresh_shown_at = None;
            }
        }
        if let Some((_, shown_at)) = &self.status_message {
            if shown_at.elapsed().as_secs() >= 3 {
                self.status_message = None;
            }
        }
    }

    /// Called after each frame with the previous frame's document
    pub fn frame_drawn(&mut self, previous: &ScreenDocument) {
        if &self.screen != previous {
            self.session.layout_changed(&self.screen, Instant::now());
        }
    }

    /// Screen area of the tooltip, if one is shown
    pub fn tooltip_area(&self, bounds: Area) -> Option<Area> {
        let tip = self.session.tooltip()?;
        let size = self.session.tooltip_size();
        let area = Area::new(
            tip.at.x.max(0) as u16,
            tip.at.y.max(0) as u16,
            size.width.max(0) as u16,
            size.height.max(0) as u16,
        );
        Some(area.intersection(bounds))
    }

    pub fn handle_mouse(&mut self, event: MouseEvent, bounds: Area) {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = self.tooltip_area(bounds).is_some_and(|a| {
                    a.contains(ratatui::layout::Position::new(event.column, event.row))
                });
                self.drag_origin = hit.then_some((event.column, event.row));
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((x, y)) = self.drag_origin {
                    let dx = i32::from(event.column) - i32::from(x);
                    let dy = i32::from(event.row) - i32::from(y);
                    self.session.drag_by(dx, dy);
                    self.drag_origin = Some((event.column, event.row));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.drag_origin = None,
            _ => {}
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::profile::MemoryProfileStore;
    use crate::tour::anchor::Document;
    use crate::tour::TourCatalog;
    use ratatui::layout::Rect;

    fn app_at(route: &str) -> App {
        let history = Rc::new(History::new(route));
        let session = TourSession::new(
            TourCatalog::builtin().unwrap(),
            &Config::default(),
            Rc::new(MemoryProfileStore::new()),
            history.clone(),
        );
        let concierge = MockConcierge::new(&Config::default().concierge);
        App::new(session, history, concierge, None, None)
    }

    #[test]
    fn test_route_sync_sets_page_state() {
        let app = app_at("/onboarding/step-4");
        assert_eq!(app.model.page_dialogs, vec!["send-message".to_string()]);
        assert!(!app.model.has_concierge);

        let app = app_at("/onboarding/step-3");
        assert!(app.model.has_concierge);
        assert!(app.model.page_dialogs.is_empty());
    }

    #[test]
    fn test_skip_navigates_home() {
        let mut app = app_at("/onboarding/step-2");
        app.run_cmd(Cmd::SkipTour);
        assert_eq!(app.history.current(), "/dashboard");
        assert_eq!(app.session.route(), "/dashboard");
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_navigation_cancels_concierge_reply() {
        let mut app = app_at("/onboarding/step-3");
        app.run_cmd(Cmd::Ask("Where can we park?".to_string()));
        assert!(app.concierge.is_typing());
        app.run_cmd(Cmd::SkipTour);
        assert!(!app.concierge.is_typing());
    }

    #[test]
    fn test_tooltip_drag_with_mouse() {
        let mut app = app_at("/onboarding/step-11");
        // Centered step is placed without any rendered widgets
        app.screen.begin_frame(Rect::new(0, 0, 100, 30));
        app.frame_drawn(&ScreenDocument::default());
        let bounds = Rect::new(0, 0, 100, 30);
        let before = app.tooltip_area(bounds).unwrap();

        let at = |kind, column, row| MouseEvent {
            kind,
            column,
            row,
            modifiers: crossterm::event::KeyModifiers::NONE,
        };
        app.handle_mouse(at(MouseEventKind::Down(MouseButton::Left), before.x + 1, before.y + 1), bounds);
        app.handle_mouse(at(MouseEventKind::Drag(MouseButton::Left), before.x + 4, before.y + 2), bounds);
        app.handle_mouse(at(MouseEventKind::Up(MouseButton::Left), before.x + 4, before.y + 2), bounds);

        let after = app.tooltip_area(bounds).unwrap();
        assert_eq!((after.x, after.y), (before.x + 3, before.y + 1));
        assert_eq!(app.screen.viewport().width, 100);
    }
}
