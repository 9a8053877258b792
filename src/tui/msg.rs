//! TEA Message Types for the TUI
//!
//! Messages describe what the user did, never how to handle it. They are the
//! only way state changes, and a single update function processes them.

use crossterm::event::{KeyCode, KeyModifiers, MouseEvent};

/// All possible messages/actions in the TUI
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    // === Tour ===
    /// Tooltip "Next"
    Next,
    /// Tooltip "Back"
    Back,
    /// Leave the tour
    SkipTour,
    /// Nudge the tooltip by a cell offset
    DragTooltip(i32, i32),

    // === Page ===
    /// Open or close the page's dialog
    ToggleDialog,
    /// Post the next sample guest question (conversations page)
    AskConcierge,
    /// Show the deep link for the current position
    CopyLink,

    // === Modals ===
    ToggleHelp,
    CloseModal,

    // === Lifecycle ===
    Quit,
    Tick,
    Resize(u16, u16),
    Mouse(MouseEvent),

    /// Unhandled key
    Noop,
}

/// Convert a key event to a message
pub fn key_to_msg(code: KeyCode, modifiers: KeyModifiers, modal_open: bool) -> Msg {
    if modal_open {
        return match code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Msg::CloseModal,
            _ => Msg::Noop,
        };
    }

    let shift = modifiers.contains(KeyModifiers::SHIFT);
    match code {
        KeyCode::Char('q') => Msg::Quit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Msg::Quit,

        // Shift+arrows move the tooltip
        KeyCode::Left if shift => Msg::DragTooltip(-1, 0),
        KeyCode::Right if shift => Msg::DragTooltip(1, 0),
        KeyCode::Up if shift => Msg::DragTooltip(0, -1),
        KeyCode::Down if shift => Msg::DragTooltip(0, 1),

        KeyCode::Right | KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char('l') => Msg::Next,
        KeyCode::Left | KeyCode::Backspace | KeyCode::Char('b') | KeyCode::Char('h') => Msg::Back,
        KeyCode::Char('S') => Msg::SkipTour,

        KeyCode::Char('o') => Msg::ToggleDialog,
        KeyCode::Char('a') => Msg::AskConcierge,
        KeyCode::Char('y') => Msg::CopyLink,

        KeyCode::Char('?') => Msg::ToggleHelp,
        KeyCode::Esc => Msg::CloseModal,

        _ => Msg::Noop,
    }
}

/// Check if a message should cause the app to quit
pub fn is_quit(msg: &Msg) -> bool {
    matches!(msg, Msg::Quit)
}

/// Check if a message drives the tour
pub fn is_tour_action(msg: &Msg) -> bool {
    matches!(msg, Msg::Next | Msg::Back | Msg::SkipTour)
}
