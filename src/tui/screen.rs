//! The terminal frame as a [`Document`]
//!
//! Page widgets register their rectangles here while drawing. The tour then
//! resolves anchors against what was actually on screen in the last frame.

use ratatui::layout::Rect as Area;

use crate::tour::anchor::{Document, Rect, Size};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    id: String,
    text: String,
    rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenDocument {
    viewport: Size,
    elements: Vec<Element>,
    dialog: Option<Rect>,
}

/// Convert a ratatui area to tour coordinates
pub fn to_rect(area: Area) -> Rect {
    Rect::new(
        i32::from(area.x),
        i32::from(area.y),
        i32::from(area.width),
        i32::from(area.height),
    )
}

impl ScreenDocument {
    /// Start a new frame of `area`
    pub fn begin_frame(&mut self, area: Area) {
        self.viewport = Size::new(i32::from(area.width), i32::from(area.height));
        self.elements.clear();
        self.dialog = None;
    }

    pub fn register(&mut self, id: &str, text: &str, area: Area) {
        self.elements.push(Element {
            id: id.to_string(),
            text: text.to_string(),
            rect: to_rect(area),
        });
    }

    pub fn set_dialog(&mut self, area: Area) {
        self.dialog = Some(to_rect(area));
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Document for ScreenDocument {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn element_by_id(&self, id: &str) -> Option<Rect> {
        self.elements.iter().find(|e| e.id == id).map(|e| e.rect)
    }

    fn element_by_text(&self, text: &str) -> Option<Rect> {
        let needle = text.to_lowercase();
        self.elements
            .iter()
            .find(|e| e.text.to_lowercase().contains(&needle))
            .map(|e| e.rect)
    }

    fn open_dialog(&self) -> Option<Rect> {
        self.dialog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_registration() {
        let mut doc = ScreenDocument::default();
        doc.begin_frame(Area::new(0, 0, 100, 30));
        doc.register("send-message", "Send Message", Area::new(4, 2, 16, 3));
        assert_eq!(doc.viewport(), Size::new(100, 30));
        assert_eq!(doc.element_by_id("send-message"), Some(Rect::new(4, 2, 16, 3)));
        assert_eq!(doc.element_by_text("send message"), Some(Rect::new(4, 2, 16, 3)));
        assert_eq!(doc.open_dialog(), None);

        doc.set_dialog(Area::new(10, 5, 50, 15));
        assert!(doc.open_dialog().is_some());

        doc.begin_frame(Area::new(0, 0, 80, 24));
        assert!(doc.is_empty());
        assert_eq!(doc.open_dialog(), None);
    }
}
