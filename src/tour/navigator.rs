//! Route changes requested by the tour

use std::cell::RefCell;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one
    pub replace: bool,
}

/// Whatever owns routing in the host (the TUI's page stack, a test recorder)
pub trait Navigator {
    fn navigate_to(&self, route: &str, options: NavigateOptions);
}

/// One recorded call to [`Navigator::navigate_to`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub route: String,
    pub replace: bool,
}

/// Navigator that only remembers what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    calls: RefCell<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Navigation> {
        self.calls.borrow().clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.calls.borrow().last().cloned()
    }

    /// Take the recorded calls, leaving the log empty
    pub fn take(&self) -> Vec<Navigation> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, route: &str, options: NavigateOptions) {
        self.calls.borrow_mut().push(Navigation {
            route: route.to_string(),
            replace: options.replace,
        });
    }
}

/// Browser-style history stack: `replace` overwrites the top entry
#[derive(Debug)]
pub struct History {
    entries: RefCell<Vec<String>>,
}

impl History {
    pub fn new(start: &str) -> Self {
        Self {
            entries: RefCell::new(vec![start.to_string()]),
        }
    }

    pub fn current(&self) -> String {
        self.entries.borrow().last().cloned().unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl Navigator for History {
    fn navigate_to(&self, route: &str, options: NavigateOptions) {
        let mut entries = self.entries.borrow_mut();
        if options.replace {
            entries.pop();
        }
        entries.push(route.to_string());
    }
}
