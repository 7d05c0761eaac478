//! Quotation context tracked while descending into a pattern.

use crate::types::builtin::{LOCAL_QUOTE_LINK, QUOTE_LINK, UNQUOTE_LINK};
use crate::types::AtomType;

/// Quote depth plus the one-level "locally quoted" flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quotation {
    level: i32,
    local: bool,
}

impl Quotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn is_locally_quoted(&self) -> bool {
        self.local
    }

    pub fn is_unquoted(&self) -> bool {
        self.level <= 0
    }

    /// Whether anything at this position is taken literally.
    pub fn is_quoted(&self) -> bool {
        self.level > 0 || self.local
    }

    /// State a freshly created child starts from.
    pub fn descend(&self) -> Self {
        Self {
            level: self.level,
            local: false,
        }
    }

    /// Whether a wrapper of type `ty` is consumed (stripped) here.
    pub fn consumable(&self, ty: AtomType) -> bool {
        (ty == QUOTE_LINK && self.level == 0)
            || (ty == UNQUOTE_LINK && self.level == 1)
            || (ty == LOCAL_QUOTE_LINK && self.level == 0)
    }

    /// Advance the state past an atom of type `ty`.
    pub fn update(&mut self, ty: AtomType) {
        if ty == LOCAL_QUOTE_LINK && self.is_unquoted() {
            self.local = true;
            return;
        }
        self.local = false;
        if ty == QUOTE_LINK {
            self.level += 1;
        } else if ty == UNQUOTE_LINK {
            self.level -= 1;
        }
    }
}
