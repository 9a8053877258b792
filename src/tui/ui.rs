//! UI rendering for the TUI
//!
//! Each frame draws a mock of the current page, registering every widget an
//! anchor can point at in [`App::screen`], then overlays the tour tooltip.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::app::App;
use super::state::{self, MockElement};
use crate::concierge::Speaker;

/// Main draw function - orchestrates all rendering
pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    app.screen.begin_frame(area);

    let main_layout = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Min(5),    // Page
        Constraint::Length(1), // Footer/status
    ])
    .split(area);

    draw_header(frame, app, main_layout[0]);

    let page = app.session.catalog().page(app.session.route()).cloned();
    match page {
        Some(page) => {
            let body = main_layout[1];
            let block = Block::default()
                .title(format!(" {} ", page.title))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray));
            let inner = block.inner(body);
            frame.render_widget(block, body);

            let (grid_area, chat_area) = if app.model.has_concierge {
                let split =
                    Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                        .split(inner);
                (split[0], Some(split[1]))
            } else {
                (inner, None)
            };

            draw_elements(frame, app, grid_area, &state::page_elements(&page), 3);
            if let Some(chat) = chat_area {
                draw_transcript(frame, app, chat);
            }
            if let Some(dialog) = app.model.dialog_open.clone() {
                draw_dialog(frame, app, inner, &dialog, &state::dialog_elements(&page));
            }
        }
        None => draw_home(frame, app, main_layout[1]),
    }

    draw_footer(frame, app, main_layout[2]);
    draw_tooltip(frame, app, area);

    if app.model.help_open {
        draw_help_overlay(frame, area);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let profile = app.session.profile();
    let progress = profile.tour_progress.completed_count();

    let refresh_indicator = if app.refresh_shown_at.is_some() {
        " [Updated]"
    } else {
        ""
    };

    let header_text = format!(
        " Pinch │ {} │ [{}/7 sections] [history {}]{}",
        app.session.route(),
        progress,
        app.history.depth(),
        refresh_indicator
    );

    let header =
        Paragraph::new(header_text).style(Style::default().bg(Color::Magenta).fg(Color::White).bold());

    frame.render_widget(header, area);
}

fn draw_elements(
    frame: &mut Frame,
    app: &mut App,
    area: Rect,
    elements: &[MockElement],
    height: u16,
) {
    let boxes = state::grid(area, elements.len(), height);
    for (element, rect) in elements.iter().zip(boxes) {
        let widget = Paragraph::new(element.label.clone())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(widget, rect);
        app.screen.register(&element.id, &element.label, rect);
    }
}

fn draw_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines: Vec<Line> = app
        .concierge
        .transcript()
        .iter()
        .map(|line| match line.speaker {
            Speaker::Guest => Line::from(vec![
                Span::styled("Guest: ", Style::default().fg(Color::Cyan).bold()),
                Span::raw(line.text.clone()),
            ]),
            Speaker::Concierge => Line::from(vec![
                Span::styled("Pinch: ", Style::default().fg(Color::Magenta).bold()),
                Span::raw(line.text.clone()),
            ]),
        })
        .collect();
    if app.concierge.is_typing() {
        lines.push(Line::styled("Pinch is typing…", Style::default().italic()));
    }

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(" Guest chat (a: ask) ").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(transcript, area);
}

fn draw_dialog(
    frame: &mut Frame,
    app: &mut App,
    area: Rect,
    dialog: &str,
    elements: &[MockElement],
) {
    let popup = state::centered(area, 64, 16);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(format!(" {} ", state::humanize(dialog)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    app.screen.set_dialog(popup);

    draw_elements(frame, app, inner, elements, 3);
}

fn draw_home(frame: &mut Frame, app: &App, area: Rect) {
    let profile = app.session.profile();
    let mut lines = vec![
        Line::from(Span::styled("Dashboard", Style::default().bold())),
        Line::raw(""),
        Line::raw(format!("Onboarding stage: {}", profile.onboarding_step)),
        Line::raw(format!(
            "Onboarding complete: {}",
            if profile.onboarding_complete { "yes" } else { "no" }
        )),
        Line::raw(""),
    ];
    for section in crate::profile::TourSection::ALL {
        let mark = if profile.tour_progress.get(section) { "✓" } else { "·" };
        lines.push(Line::raw(format!("  {mark} {section}")));
    }

    let home = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(home, area);
}

fn draw_tooltip(frame: &mut Frame, app: &App, area: Rect) {
    let Some(tip) = app.session.tooltip() else {
        return;
    };
    let Some(rect) = app.tooltip_area(area) else {
        return;
    };
    if rect.width < 4 || rect.height < 3 {
        return;
    }

    let mut lines = vec![
        Line::from(Span::styled(tip.title.clone(), Style::default().bold())),
        Line::raw(tip.body.clone()),
        Line::raw(""),
    ];
    if !tip.can_advance {
        lines.push(Line::styled(
            "Open the dialog (o) to continue",
            Style::default().fg(Color::Yellow),
        ));
    }
    let back = if tip.can_retreat { "←:back  " } else { "" };
    lines.push(Line::styled(
        format!("{back}→:next  S:skip tour"),
        Style::default().fg(Color::DarkGray),
    ));

    let tooltip = Paragraph::new(lines)
        .block(
            Block::default()
                .title(format!(" {} ", tip.label))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, rect);
    frame.render_widget(tooltip, rect);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keybinds = "→/←:next/back  S:skip  o:dialog  a:ask  y:link  Shift+arrows/mouse:drag  ?:help  q:quit";

    let footer_text = if let Some((ref msg, _)) = app.status_message {
        msg.clone()
    } else {
        keybinds.to_string()
    };

    let footer = Paragraph::new(format!(" {}", footer_text))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(footer, area);
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = state::centered(area, 56, 20);
    frame.render_widget(Clear, popup_area);

    let help_text = r#"
  Tour
  ─────────────────────────────────
  →, Enter, n   Next step
  ←, b          Previous step
  S             Skip the tour
  Shift+arrows  Move the tooltip
  Mouse drag    Move the tooltip

  Page
  ─────────────────────────────────
  o             Open/close the page dialog
  a             Ask the concierge a question
  y             Show a link to this step
  q             Quit

  Press ? or Esc to close
"#;

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White).bg(Color::Black));

    frame.render_widget(help, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concierge::MockConcierge;
    use crate::config::Config;
    use crate::profile::MemoryProfileStore;
    use crate::tour::anchor::Document;
    use crate::tour::{History, TourCatalog, TourSession};
    use ratatui::backend::TestBackend;
    use std::rc::Rc;

    fn app_at(route: &str) -> App {
        let history = Rc::new(History::new(route));
        let session = TourSession::new(
            TourCatalog::builtin().unwrap(),
            &Config::default(),
            Rc::new(MemoryProfileStore::new()),
            history.clone(),
        );
        App::new(
            session,
            history,
            MockConcierge::new(&Config::default().concierge),
            None,
            None,
        )
    }

    #[test]
    fn test_draw_registers_anchors_and_shows_tooltip() {
        let mut app = app_at("/onboarding/step-5");
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        // First frame mounts the page; the tooltip was still pending
        let previous = app.screen.clone();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(app.screen.element_by_id("faq-list").is_some());
        app.frame_drawn(&previous);

        // Second frame draws it
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Step 1 of 3"));
    }

    #[test]
    fn test_dialog_registers_dialog_rect() {
        let mut app = app_at("/onboarding/step-4");
        app.model.dialog_open = Some("send-message".to_string());
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(app.screen.open_dialog().is_some());
        assert!(app.screen.element_by_id("message-recipients").is_some());
    }

    #[test]
    fn test_home_page_draws_without_tooltip() {
        let mut app = app_at("/dashboard");
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| draw(f, &mut app)).unwrap();
        assert!(app.screen.is_empty());
        assert!(app.session.tooltip().is_none());
    }
}
