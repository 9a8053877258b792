//! Event handling for the TUI
//!
//! Keys become [`Msg`]s, the pure update function turns them into a new
//! model plus a [`Cmd`](super::update::Cmd), and the app executes the
//! command.

use crossterm::event::{KeyEvent, KeyEventKind};

use super::app::App;
use super::msg::{key_to_msg, Msg};
use super::update::update;

/// Handle a key event, returns true if app should quit
pub fn handle_event(app: &mut App, key: KeyEvent) -> bool {
    // Windows reports releases too
    if key.kind == KeyEventKind::Release {
        return false;
    }
    let msg = key_to_msg(key.code, key.modifiers, app.model.help_open);
    dispatch(app, msg)
}

/// Run one message through update and execute the resulting command
pub fn dispatch(app: &mut App, msg: Msg) -> bool {
    if msg == Msg::Noop {
        return false;
    }
    let (model, cmd) = update(msg, app.model.clone());
    app.model = model;
    app.run_cmd(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concierge::MockConcierge;
    use crate::config::Config;
    use crate::profile::MemoryProfileStore;
    use crate::tour::{History, StepId, TourCatalog, TourSession};
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::rc::Rc;

    fn app_at(route: &str) -> (App, Rc<MemoryProfileStore>) {
        let store = Rc::new(MemoryProfileStore::new());
        let history = Rc::new(History::new(route));
        let session = TourSession::new(
            TourCatalog::builtin().unwrap(),
            &Config::default(),
            store.clone(),
            history.clone(),
        );
        let concierge = MockConcierge::new(&Config::default().concierge);
        (App::new(session, history, concierge, None, None), store)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_event(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_keys_walk_the_tour() {
        let (mut app, store) = app_at("/onboarding/step-10");
        assert!(!press(&mut app, KeyCode::Right));
        assert_eq!(
            app.session.controller().map(|c| c.current()),
            Some(StepId::Number(2))
        );
        press(&mut app, KeyCode::Right);
        assert_eq!(app.history.current(), "/onboarding/step-11");
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn test_help_swallows_tour_keys() {
        let (mut app, _) = app_at("/onboarding/step-10");
        press(&mut app, KeyCode::Char('?'));
        assert!(app.model.help_open);
        press(&mut app, KeyCode::Right);
        assert_eq!(
            app.session.controller().map(|c| c.current()),
            Some(StepId::Number(1))
        );
        press(&mut app, KeyCode::Esc);
        assert!(!app.model.help_open);
    }

    #[test]
    fn test_dialog_key_unblocks_sub_step() {
        let (mut app, _) = app_at("/onboarding/step-6");
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        assert_eq!(
            app.session.controller().map(|c| c.current()),
            Some(StepId::Sub(3, 'a'))
        );
        // Blocked until the tone dialog is open
        press(&mut app, KeyCode::Right);
        assert_eq!(
            app.session.controller().map(|c| c.current()),
            Some(StepId::Sub(3, 'a'))
        );
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.model.dialog_open.as_deref(), Some("tone-settings"));
        press(&mut app, KeyCode::Right);
        assert_eq!(
            app.session.controller().map(|c| c.current()),
            Some(StepId::Sub(3, 'b'))
        );
    }

    #[test]
    fn test_quit() {
        let (mut app, _) = app_at("/onboarding/step-10");
        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
