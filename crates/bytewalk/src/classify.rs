//! Byte classification.
//!
//! A classifier partitions byte values into the small class ids a select
//! step branches on. Class 0 is reserved for "no rule matched" and routes
//! to the select's otherwise target; rule classes start at 1.
//!
//! Two strategies compute the same function and differ only in dispatch
//! cost: `Branch` walks an ordered rule list (first match wins) and lets
//! the compiler inline the comparisons, `Table` indexes a precomputed
//! 256-entry array and costs one load regardless of input distribution.
//! `benches/dispatch.rs` measures the trade-off on sustained input.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;

/// Reserved class id meaning "no rule matched".
pub const OTHERWISE: u8 = 0;

/// One classification rule: bytes in `lo..=hi` map to `class`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub(crate) lo: u8,
    pub(crate) hi: u8,
    pub(crate) class: u8,
}

impl Rule {
    /// Map a single byte to `class`.
    #[must_use]
    pub const fn byte(b: u8, class: u8) -> Self {
        Self { lo: b, hi: b, class }
    }

    /// Map an inclusive byte range to `class`.
    #[must_use]
    pub const fn range(lo: u8, hi: u8, class: u8) -> Self {
        Self { lo, hi, class }
    }
}

/// Byte-to-class dispatch.
#[derive(Clone, PartialEq, Eq)]
pub enum Classifier {
    /// Ordered rule cascade; the first rule containing the byte wins.
    Branch(Vec<Rule>),
    /// Precomputed direct-indexed table.
    Table(Box<[u8; 256]>),
}

impl Classifier {
    /// Classifier over an ordered rule list.
    #[must_use]
    pub fn branch(rules: impl Into<Vec<Rule>>) -> Self {
        Classifier::Branch(rules.into())
    }

    /// Precompute the table form of `rules`, first match winning exactly
    /// as in the branch form.
    #[must_use]
    pub fn table(rules: &[Rule]) -> Self {
        let mut table = [OTHERWISE; 256];
        let mut claimed = [false; 256];
        for rule in rules {
            for b in rule.lo..=rule.hi {
                let i = usize::from(b);
                if !claimed[i] {
                    claimed[i] = true;
                    table[i] = rule.class;
                }
            }
        }
        Classifier::Table(Box::new(table))
    }

    /// The same classification function in table form.
    #[must_use]
    pub fn tabulated(&self) -> Self {
        match self {
            Classifier::Branch(rules) => Classifier::table(rules),
            Classifier::Table(_) => self.clone(),
        }
    }

    /// Class of `byte`.
    #[inline]
    #[must_use]
    pub fn classify(&self, byte: u8) -> u8 {
        match self {
            Classifier::Branch(rules) => {
                for rule in rules {
                    if rule.lo <= byte && byte <= rule.hi {
                        return rule.class;
                    }
                }
                OTHERWISE
            }
            Classifier::Table(table) => table[usize::from(byte)],
        }
    }

    /// Largest class this classifier can produce.
    pub(crate) fn max_class(&self) -> u8 {
        match self {
            Classifier::Branch(rules) => {
                rules.iter().map(|rule| rule.class).max().unwrap_or(OTHERWISE)
            }
            Classifier::Table(table) => table.iter().copied().max().unwrap_or(OTHERWISE),
        }
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classifier::Branch(rules) => f.debug_tuple("Branch").field(rules).finish(),
            Classifier::Table(_) => f.write_str("Table(..)"),
        }
    }
}
