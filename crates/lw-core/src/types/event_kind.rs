//! Filesystem event kinds.
//!
//! This module provides [`WatchEventKind`], the three kinds of filesystem
//! mutation that can trigger a recompile, and [`EventKindSet`], the
//! configured subset of them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A kind of filesystem mutation observed under the watched root.
///
/// # Examples
///
/// ```
/// use lw_core::WatchEventKind;
///
/// let kind: WatchEventKind = "changed".parse().unwrap();
/// assert_eq!(kind, WatchEventKind::Changed);
/// assert_eq!(kind.label(), "changed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEventKind {
    /// A file or directory was created.
    Created,

    /// A file's contents or metadata changed, or it was renamed.
    Changed,

    /// A file or directory was removed.
    Removed,
}

impl WatchEventKind {
    /// All event kinds, in their canonical order.
    pub const ALL: [Self; 3] = [Self::Created, Self::Changed, Self::Removed];

    /// Returns the configuration name of this kind.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Changed => "changed",
            Self::Removed => "removed",
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Self::Created => 0b001,
            Self::Changed => 0b010,
            Self::Removed => 0b100,
        }
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WatchEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "created" => Ok(Self::Created),
            "changed" => Ok(Self::Changed),
            "removed" => Ok(Self::Removed),
            other => Err(format!(
                "unknown event '{other}' (expected created, changed or removed)"
            )),
        }
    }
}

/// A set of [`WatchEventKind`]s.
///
/// Stored as a bitmask; the set is `Copy` and cheap to hand to the watcher
/// thread.
///
/// # Examples
///
/// ```
/// use lw_core::{EventKindSet, WatchEventKind};
///
/// let set: EventKindSet = [WatchEventKind::Created, WatchEventKind::Removed]
///     .into_iter()
///     .collect();
/// assert!(set.contains(WatchEventKind::Created));
/// assert!(!set.contains(WatchEventKind::Changed));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventKindSet(u8);

impl EventKindSet {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates a set containing every event kind.
    #[inline]
    #[must_use]
    pub const fn all() -> Self {
        Self(0b111)
    }

    /// Adds a kind to the set.
    #[inline]
    pub fn insert(&mut self, kind: WatchEventKind) {
        self.0 |= kind.bit();
    }

    /// Returns `true` if the set contains `kind`.
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: WatchEventKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns `true` if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of kinds in the set.
    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the kinds in the set in canonical order.
    pub fn iter(self) -> impl Iterator<Item = WatchEventKind> {
        WatchEventKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl FromIterator<WatchEventKind> for EventKindSet {
    fn from_iter<T: IntoIterator<Item = WatchEventKind>>(iter: T) -> Self {
        let mut set = Self::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Display for EventKindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for kind in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(kind.label())?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_parse() {
        assert_eq!("created".parse(), Ok(WatchEventKind::Created));
        assert_eq!(" changed ".parse(), Ok(WatchEventKind::Changed));
        assert_eq!("removed".parse(), Ok(WatchEventKind::Removed));
        assert!("renamed".parse::<WatchEventKind>().is_err());
        assert!("Created".parse::<WatchEventKind>().is_err());
    }

    #[test]
    fn test_event_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&WatchEventKind::Changed).unwrap(),
            r#""changed""#
        );
        let kinds: Vec<WatchEventKind> =
            serde_json::from_str(r#"["created", "removed"]"#).unwrap();
        assert_eq!(kinds, vec![WatchEventKind::Created, WatchEventKind::Removed]);
    }

    #[test]
    fn test_event_kind_set_collect_dedups() {
        let set: EventKindSet = [
            WatchEventKind::Changed,
            WatchEventKind::Changed,
            WatchEventKind::Created,
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert!(set.contains(WatchEventKind::Changed));
        assert!(set.contains(WatchEventKind::Created));
        assert!(!set.contains(WatchEventKind::Removed));
    }

    #[test]
    fn test_event_kind_set_all_and_empty() {
        assert_eq!(EventKindSet::all().len(), 3);
        assert!(EventKindSet::empty().is_empty());
        assert_eq!(EventKindSet::default(), EventKindSet::empty());
    }

    #[test]
    fn test_event_kind_set_display() {
        assert_eq!(EventKindSet::all().to_string(), "created, changed, removed");
        let set: EventKindSet = [WatchEventKind::Removed, WatchEventKind::Created]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "created, removed");
    }
}
