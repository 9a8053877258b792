//! TEA Update Function
//!
//! ```text
//! update : Msg -> Model -> (Model, Cmd)
//! ```
//!
//! Pure: no I/O and no mutation. Side effects come back as [`Cmd`]s that the
//! runtime (events.rs) executes against the tour session.

use super::msg::Msg;
use super::state;
use crate::tour::controller::PageEvent;

/// Commands that need to be executed by the runtime (imperative shell)
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// No command
    None,
    /// Multiple commands to execute
    Batch(Vec<Cmd>),
    /// Quit the application
    Quit,
    Advance,
    Retreat,
    SkipTour,
    /// Report a page interaction to the tour
    Page(PageEvent),
    DragTooltip(i32, i32),
    /// Post a guest question to the mock concierge
    Ask(String),
    ShowLink,
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

    /// Check if this is a quit command
    pub fn is_quit(&self) -> bool {
        matches!(self, Cmd::Quit)
    }
}

/// UI state the update function owns. Tour state lives in the session.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub help_open: bool,
    pub dialog_open: Option<String>,
    /// Dialogs the current page can open
    pub page_dialogs: Vec<String>,
    /// Whether the page shows the concierge transcript
    pub has_concierge: bool,
    pub question_index: usize,
}

pub fn update(msg: Msg, model: Model) -> (Model, Cmd) {
    match msg {
        // === Lifecycle ===
        Msg::Quit => (model, Cmd::Quit),
        Msg::Tick | Msg::Resize(_, _) | Msg::Mouse(_) | Msg::Noop => (model, Cmd::None),

        // === Tour ===
        Msg::Next => (model, Cmd::Advance),
        Msg::Back => (model, Cmd::Retreat),
        Msg::SkipTour => (
            Model {
                dialog_open: None,
                ..model
            },
            Cmd::SkipTour,
        ),
        Msg::DragTooltip(dx, dy) => (model, Cmd::DragTooltip(dx, dy)),

        // === Page ===
        Msg::ToggleDialog => {
            let next = state::toggle_dialog(model.dialog_open.as_deref(), &model.page_dialogs);
            let cmd = match (&model.dialog_open, &next) {
                (Some(closed), None) => Cmd::Page(PageEvent::DialogClosed(closed.clone())),
                (None, Some(opened)) => Cmd::Page(PageEvent::DialogOpened(opened.clone())),
                _ => Cmd::None,
            };
            (
                Model {
                    dialog_open: next,
                    ..model
                },
                cmd,
            )
        }

        Msg::AskConcierge => {
            if !model.has_concierge {
                return (model, Cmd::None);
            }
            let question = state::SAMPLE_QUESTIONS[model.question_index].to_string();
            (
                Model {
                    question_index: state::next_question(model.question_index),
                    ..model
                },
                Cmd::Ask(question),
            )
        }

        Msg::CopyLink => (model, Cmd::ShowLink),

        // === Modals ===
        Msg::ToggleHelp => (
            Model {
                help_open: !model.help_open,
                ..model
            },
            Cmd::None,
        ),

        Msg::CloseModal => {
            if model.help_open {
                return (
                    Model {
                        help_open: false,
                        ..model
                    },
                    Cmd::None,
                );
            }
            // Esc closes the page dialog when no modal is up
            match model.dialog_open.clone() {
                Some(id) => (
                    Model {
                        dialog_open: None,
                        ..model
                    },
                    Cmd::Page(PageEvent::DialogClosed(id)),
                ),
                None => (model, Cmd::None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest_page() -> Model {
        Model {
            page_dialogs: vec!["send-message".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_tour_keys_map_to_commands() {
        assert_eq!(update(Msg::Next, Model::default()).1, Cmd::Advance);
        assert_eq!(update(Msg::Back, Model::default()).1, Cmd::Retreat);
        assert_eq!(
            update(Msg::DragTooltip(2, -1), Model::default()).1,
            Cmd::DragTooltip(2, -1)
        );
    }

    #[test]
    fn test_toggle_dialog_reports_events() {
        let (m1, cmd) = update(Msg::ToggleDialog, guest_page());
        assert_eq!(m1.dialog_open.as_deref(), Some("send-message"));
        assert_eq!(
            cmd,
            Cmd::Page(PageEvent::DialogOpened("send-message".to_string()))
        );

        let (m2, cmd) = update(Msg::ToggleDialog, m1);
        assert_eq!(m2.dialog_open, None);
        assert_eq!(
            cmd,
            Cmd::Page(PageEvent::DialogClosed("send-message".to_string()))
        );
    }

    #[test]
    fn test_toggle_dialog_without_dialogs() {
        let (model, cmd) = update(Msg::ToggleDialog, Model::default());
        assert_eq!(model.dialog_open, None);
        assert_eq!(cmd, Cmd::None);
    }

    #[test]
    fn test_escape_closes_help_before_dialog() {
        let model = Model {
            help_open: true,
            dialog_open: Some("send-message".to_string()),
            ..guest_page()
        };
        let (m1, cmd) = update(Msg::CloseModal, model);
        assert!(!m1.help_open);
        assert_eq!(cmd, Cmd::None);

        let (m2, cmd) = update(Msg::CloseModal, m1);
        assert_eq!(m2.dialog_open, None);
        assert!(matches!(cmd, Cmd::Page(PageEvent::DialogClosed(_))));
    }

    #[test]
    fn test_skip_closes_dialog() {
        let model = Model {
            dialog_open: Some("send-message".to_string()),
            ..guest_page()
        };
        let (model, cmd) = update(Msg::SkipTour, model);
        assert_eq!(model.dialog_open, None);
        assert_eq!(cmd, Cmd::SkipTour);
    }

    #[test]
    fn test_ask_concierge_cycles_questions() {
        let model = Model {
            has_concierge: true,
            ..Default::default()
        };
        let (m1, cmd) = update(Msg::AskConcierge, model);
        assert_eq!(cmd, Cmd::Ask(state::SAMPLE_QUESTIONS[0].to_string()));
        assert_eq!(m1.question_index, 1);

        let (_, cmd) = update(Msg::AskConcierge, Model::default());
        assert_eq!(cmd, Cmd::None);
    }

    #[test]
    fn test_quit_command() {
        let (_, cmd) = update(Msg::Quit, Model::default());
        assert!(cmd.is_quit());
    }

    #[test]
    fn test_cmd_batch() {
        assert_eq!(Cmd::batch(vec![]), Cmd::None);
        assert_eq!(Cmd::batch(vec![Cmd::None, Cmd::Quit, Cmd::None]), Cmd::Quit);
        assert_eq!(
            Cmd::batch(vec![Cmd::Advance, Cmd::ShowLink]),
            Cmd::Batch(vec![Cmd::Advance, Cmd::ShowLink])
        );
    }
}
