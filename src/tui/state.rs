//! Pure state transformations for the TUI (Functional Core)
//!
//! No I/O here. The imperative shell (app.rs, events.rs) calls these to lay
//! out mock pages and step through demo content.

use ratatui::layout::Rect;

use crate::tour::anchor::AnchorKind;
use crate::tour::catalog::TourPage;

/// Questions the demo guest cycles through on the conversations page
pub const SAMPLE_QUESTIONS: &[&str] = &[
    "Where can we park?",
    "Can I bring my dog?",
    "What should I wear?",
    "When does the ceremony start?",
    "Is there a kids table?",
];

/// A widget the mock page draws for one anchor key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    pub id: String,
    pub label: String,
}

/// `send-message` -> `Send Message`
pub fn humanize(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn element(kind: AnchorKind, key: &str) -> MockElement {
    match kind {
        // Text anchors are found by their label, not by id
        AnchorKind::ElementByText => MockElement {
            id: format!("text:{key}"),
            label: key.to_string(),
        },
        _ => MockElement {
            id: key.to_string(),
            label: humanize(key),
        },
    }
}

fn push_unique(out: &mut Vec<MockElement>, el: MockElement) {
    if !out.iter().any(|e| e.id == el.id) {
        out.push(el);
    }
}

/// Widgets drawn on the page itself, in first-use order
pub fn page_elements(page: &TourPage) -> Vec<MockElement> {
    let mut out = Vec::new();
    for step in &page.steps {
        let anchor = &step.anchor;
        if matches!(
            anchor.kind,
            AnchorKind::DialogRelative | AnchorKind::ViewportCentered
        ) {
            continue;
        }
        if let Some(key) = anchor.key.as_deref() {
            push_unique(&mut out, element(anchor.kind, key));
        }
    }
    out
}

/// Widgets drawn inside the page's dialog while it is open
pub fn dialog_elements(page: &TourPage) -> Vec<MockElement> {
    let mut out = Vec::new();
    for step in &page.steps {
        if step.anchor.kind != AnchorKind::DialogRelative {
            continue;
        }
        if let Some(key) = step.anchor.key.as_deref() {
            push_unique(&mut out, element(AnchorKind::ElementById, key));
        }
    }
    out
}

/// Two-column grid of `count` boxes, `height` rows each, inside `area`.
/// Boxes that would fall below the area are dropped.
pub fn grid(area: Rect, count: usize, height: u16) -> Vec<Rect> {
    let col_width = area.width / 2;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let col = (i % 2) as u16;
        let row = (i / 2) as u16;
        let y = area.y + row * height;
        if y + height > area.y + area.height {
            break;
        }
        out.push(Rect::new(
            area.x + col * col_width,
            y,
            col_width.saturating_sub(1),
            height,
        ));
    }
    out
}

/// Centered rectangle of at most `width` x `height` inside `area`
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Toggle the page's dialog. Returns the new open dialog.
pub fn toggle_dialog(open: Option<&str>, available: &[String]) -> Option<String> {
    match open {
        Some(_) => None,
        None => available.first().cloned(),
    }
}

pub fn next_question(index: usize) -> usize {
    (index + 1) % SAMPLE_QUESTIONS.len()
}
