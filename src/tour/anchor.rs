//! Anchor resolution for tour tooltips
//!
//! Turns the active step's [`AnchorTarget`] into a screen position. The page
//! under the tooltip may not have drawn the anchor yet (a dialog that opens a
//! frame later, a list still loading), so a missing anchor schedules a bounded
//! retry instead of guessing. Until something is found the tooltip stays
//! hidden.
//!
//! Coordinates are integer cells with the origin at the top-left corner.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::timer::TimerQueue;
use crate::config::TooltipConfig;

// =============================================================================
// Geometry
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

// =============================================================================
// Anchor targets
// =============================================================================

/// How a step's anchor is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorKind {
    /// Stable id assigned by the page author
    ElementById,
    /// Visible text match; kept for copy-matched anchors only
    ElementByText,
    /// The dialog currently open on the page
    DialogRelative,
    /// No element; the middle of the viewport
    ViewportCentered,
}

impl AnchorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorKind::ElementById => "element-by-id",
            AnchorKind::ElementByText => "element-by-text",
            AnchorKind::DialogRelative => "dialog-relative",
            AnchorKind::ViewportCentered => "viewport-centered",
        }
    }
}

/// Which side of the anchor the tooltip sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
    Center,
}

/// Where one step's tooltip attaches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTarget {
    pub kind: AnchorKind,
    /// Element id or text, depending on `kind`
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub side: Side,
    /// Text to match when an id lookup finds nothing
    #[serde(default)]
    pub fallback_text: Option<String>,
}

impl AnchorTarget {
    pub fn by_id(id: &str, side: Side) -> Self {
        Self {
            kind: AnchorKind::ElementById,
            key: Some(id.to_string()),
            side,
            fallback_text: None,
        }
    }

    pub fn by_text(text: &str, side: Side) -> Self {
        Self {
            kind: AnchorKind::ElementByText,
            key: Some(text.to_string()),
            side,
            fallback_text: None,
        }
    }

    pub fn dialog(side: Side) -> Self {
        Self {
            kind: AnchorKind::DialogRelative,
            key: None,
            side,
            fallback_text: None,
        }
    }

    pub fn centered() -> Self {
        Self {
            kind: AnchorKind::ViewportCentered,
            key: None,
            side: Side::Center,
            fallback_text: None,
        }
    }

    pub fn with_fallback_text(mut self, text: &str) -> Self {
        self.fallback_text = Some(text.to_string());
        self
    }
}

/// The rendered page as the resolver sees it
pub trait Document {
    fn viewport(&self) -> Size;
    fn element_by_id(&self, id: &str) -> Option<Rect>;
    /// First element whose visible text contains `text`
    fn element_by_text(&self, text: &str) -> Option<Rect>;
    /// Bounds of the open dialog, if any
    fn open_dialog(&self) -> Option<Rect>;
}

/// Find the rectangle a target refers to in `doc`
pub fn locate(target: &AnchorTarget, doc: &dyn Document) -> Option<Rect> {
    match target.kind {
        AnchorKind::ViewportCentered => {
            let vp = doc.viewport();
            Some(Rect::new(0, 0, vp.width, vp.height))
        }
        AnchorKind::DialogRelative => match target.key.as_deref() {
            Some(id) => doc.open_dialog().and_then(|_| doc.element_by_id(id)),
            None => doc.open_dialog(),
        },
        AnchorKind::ElementById => target
            .key
            .as_deref()
            .and_then(|id| doc.element_by_id(id))
            .or_else(|| {
                target
                    .fallback_text
                    .as_deref()
                    .and_then(|text| doc.element_by_text(text))
            }),
        AnchorKind::ElementByText => target.key.as_deref().and_then(|t| doc.element_by_text(t)),
    }
}

/// Top-left corner for a tooltip of `tip` size placed on `side` of `anchor`,
/// kept inside the viewport
pub fn place(anchor: Rect, side: Side, tip: Size, gap: i32, viewport: Size) -> Point {
    let centered_x = anchor.x + (anchor.width - tip.width) / 2;
    let centered_y = anchor.y + (anchor.height - tip.height) / 2;
    let raw = match side {
        Side::Bottom => Point::new(centered_x, anchor.bottom() + gap),
        Side::Top => Point::new(centered_x, anchor.y - tip.height - gap),
        Side::Left => Point::new(anchor.x - tip.width - gap, centered_y),
        Side::Right => Point::new(anchor.right() + gap, centered_y),
        Side::Center => Point::new(centered_x, centered_y),
    };
    clamp_into(raw, tip, viewport)
}

fn clamp_into(p: Point, tip: Size, viewport: Size) -> Point {
    let max_x = (viewport.width - tip.width).max(0);
    let max_y = (viewport.height - tip.height).max(0);
    Point::new(p.x.clamp(0, max_x), p.y.clamp(0, max_y))
}

// =============================================================================
// Resolver
// =============================================================================

/// Result of a resolution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Placed(Point),
    /// Anchor not found (yet); render nothing
    Pending,
}

impl Resolution {
    pub fn point(self) -> Option<Point> {
        match self {
            Resolution::Placed(p) => Some(p),
            Resolution::Pending => None,
        }
    }
}

/// A queued retry, tagged with the resolver generation that scheduled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTicket {
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub tooltip: Size,
    pub gap: i32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&TooltipConfig::default())
    }
}

impl From<&TooltipConfig> for ResolverSettings {
    fn from(config: &TooltipConfig) -> Self {
        Self {
            retry_delay: config.retry_delay(),
            max_retries: config.max_retries,
            tooltip: Size::new(config.width, config.height),
            gap: config.gap,
        }
    }
}

/// Resolves the active step's anchor, retrying while it is missing.
///
/// Each step change starts a new generation. Retries carry the generation
/// that queued them and are dropped if it no longer matches.
#[derive(Debug)]
pub struct AnchorResolver {
    settings: ResolverSettings,
    generation: u64,
    target: Option<AnchorTarget>,
    attempts: u32,
    retry_pending: bool,
    exhausted: bool,
    drag: Option<Point>,
    last: Resolution,
}

impl AnchorResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            generation: 0,
            target: None,
            attempts: 0,
            retry_pending: false,
            exhausted: false,
            drag: None,
            last: Resolution::Pending,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last computed resolution
    pub fn current(&self) -> Resolution {
        self.last
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Point the resolver at a new step. Clears drag state and cancels retries
    /// queued for the previous step.
    pub fn set_step(&mut self, target: AnchorTarget, timers: &mut TimerQueue<RetryTicket>) {
        self.begin_generation(timers);
        self.target = Some(target);
    }

    /// Forget the current step entirely (page unmounted)
    pub fn reset(&mut self, timers: &mut TimerQueue<RetryTicket>) {
        self.begin_generation(timers);
        self.target = None;
    }

    fn begin_generation(&mut self, timers: &mut TimerQueue<RetryTicket>) {
        self.generation += 1;
        let current = self.generation;
        timers.cancel_where(|t| t.generation != current);
        self.attempts = 0;
        self.retry_pending = false;
        self.exhausted = false;
        self.drag = None;
        self.last = Resolution::Pending;
    }

    /// Resolve against the document as it is now
    pub fn resolve(
        &mut self,
        doc: &dyn Document,
        now: Instant,
        timers: &mut TimerQueue<RetryTicket>,
    ) -> Resolution {
        let Some(target) = self.target.as_ref() else {
            self.last = Resolution::Pending;
            return self.last;
        };

        if let Some(p) = self.drag {
            self.last = Resolution::Placed(p);
            return self.last;
        }

        // A centred tooltip sits in the middle whatever side the step names
        let side = match target.kind {
            AnchorKind::ViewportCentered => Side::Center,
            _ => target.side,
        };
        match locate(target, doc) {
            Some(anchor) => {
                let p = place(
                    anchor,
                    side,
                    self.settings.tooltip,
                    self.settings.gap,
                    doc.viewport(),
                );
                self.exhausted = false;
                self.last = Resolution::Placed(p);
            }
            None => {
                self.schedule_retry(now, timers);
                self.last = Resolution::Pending;
            }
        }
        self.last
    }

    fn schedule_retry(&mut self, now: Instant, timers: &mut TimerQueue<RetryTicket>) {
        if self.retry_pending || self.exhausted {
            return;
        }
        let key = self
            .target
            .as_ref()
            .and_then(|t| t.key.clone())
            .unwrap_or_default();
        if self.attempts >= self.settings.max_retries {
            self.exhausted = true;
            tracing::debug!(anchor = %key, attempts = self.attempts, "anchor never mounted, giving up");
            return;
        }
        self.attempts += 1;
        self.retry_pending = true;
        tracing::debug!(anchor = %key, attempt = self.attempts, "anchor not found, retrying");
        timers.schedule(
            now,
            self.settings.retry_delay,
            RetryTicket {
                generation: self.generation,
            },
        );
    }

    /// Handle a retry coming due. Returns `None` if the ticket belongs to a
    /// step that is no longer current.
    pub fn on_retry(
        &mut self,
        ticket: RetryTicket,
        doc: &dyn Document,
        now: Instant,
        timers: &mut TimerQueue<RetryTicket>,
    ) -> Option<Resolution> {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding stale anchor retry"
            );
            return None;
        }
        self.retry_pending = false;
        Some(self.resolve(doc, now, timers))
    }

    /// Viewport resized or content shifted: recompute with a fresh retry budget
    pub fn on_layout_change(
        &mut self,
        doc: &dyn Document,
        now: Instant,
        timers: &mut TimerQueue<RetryTicket>,
    ) -> Resolution {
        if self.exhausted {
            self.exhausted = false;
            self.attempts = 0;
        }
        self.resolve(doc, now, timers)
    }

    /// Pin the tooltip where the user dropped it, until the step changes
    pub fn drag_to(&mut self, p: Point) {
        if self.target.is_some() {
            self.drag = Some(p);
            self.last = Resolution::Placed(p);
        }
    }

    /// Move the tooltip by a delta from wherever it is shown now
    pub fn drag_by(&mut self, dx: i32, dy: i32) {
        if let Some(p) = self.drag.or_else(|| self.last.point()) {
            self.drag_to(Point::new(p.x + dx, p.y + dy));
        }
    }

    pub fn is_dragged(&self) -> bool {
        self.drag.is_some()
    }
}
