//! File filtering for watch events.
//!
//! Filters run in the blocking watcher thread, before events reach the
//! channel, so unrelated changes never wake the trigger loop.
//!
//! # Examples
//!
//! ```
//! use lw_watcher::{ExtensionFilter, FileEvent, FileFilter};
//! use lw_core::WatchEventKind;
//!
//! let filter = ExtensionFilter::new([".less"]);
//!
//! assert!(filter.should_process(&FileEvent::new("styles/main.less", WatchEventKind::Changed)));
//! assert!(!filter.should_process(&FileEvent::new("styles/main.css", WatchEventKind::Changed)));
//! // Matching is exact and case-sensitive.
//! assert!(!filter.should_process(&FileEvent::new("styles/MAIN.LESS", WatchEventKind::Changed)));
//! ```

use lw_core::{EventKindSet, WatchConfig};
use smallvec::SmallVec;

use crate::events::FileEvent;

/// A predicate deciding which file events reach the trigger loop.
///
/// Filters must be [`Send`], [`Sync`] and `'static` because they are moved
/// into the blocking watcher task.
///
/// # Examples
///
/// ```
/// use lw_watcher::{FileEvent, FileFilter};
///
/// struct NoPartials;
///
/// impl FileFilter for NoPartials {
///     fn should_process(&self, event: &FileEvent) -> bool {
///         !event.file_name().is_some_and(|name| name.starts_with('_'))
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the event should be sent to the channel.
    fn should_process(&self, event: &FileEvent) -> bool;
}

/// A filter that accepts every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _event: &FileEvent) -> bool {
        true
    }
}

/// Accepts events whose path extension is in a set of leading-dot
/// extensions such as `.less`.
///
/// The comparison is exact and case-sensitive. Paths without an extension,
/// including dotfiles like `.less`, never match.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: SmallVec<[String; 4]>,
}

impl ExtensionFilter {
    /// Creates a filter for the given leading-dot extensions.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the accepted extensions.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl FileFilter for ExtensionFilter {
    fn should_process(&self, event: &FileEvent) -> bool {
        event.extension().is_some_and(|ext| {
            self.extensions
                .iter()
                .any(|accepted| accepted.strip_prefix('.') == Some(ext))
        })
    }
}

/// Accepts events whose kind is in a set.
#[derive(Debug, Clone, Copy)]
pub struct EventKindFilter(pub EventKindSet);

impl FileFilter for EventKindFilter {
    #[inline]
    fn should_process(&self, event: &FileEvent) -> bool {
        self.0.contains(event.kind)
    }
}

/// A composite filter that combines multiple filters with AND logic.
///
/// An empty composite accepts everything.
///
/// # Examples
///
/// ```
/// use lw_watcher::{CompositeFilter, EventKindFilter, ExtensionFilter, FileEvent, FileFilter};
/// use lw_core::{EventKindSet, WatchEventKind};
///
/// let filter = CompositeFilter::new()
///     .and(EventKindFilter([WatchEventKind::Changed].into_iter().collect::<EventKindSet>()))
///     .and(ExtensionFilter::new([".less"]));
///
/// assert!(filter.should_process(&FileEvent::new("a.less", WatchEventKind::Changed)));
/// assert!(!filter.should_process(&FileEvent::new("a.less", WatchEventKind::Removed)));
/// ```
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates a new empty composite filter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter to the composite.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of combined filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if no filters were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, event: &FileEvent) -> bool {
        self.filters.iter().all(|f| f.should_process(event))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, event: &FileEvent) -> bool {
        (**self).should_process(event)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, event: &FileEvent) -> bool {
        (**self).should_process(event)
    }
}

/// Builds the filter for a validated configuration: the configured event
/// kinds, then the configured extensions.
#[must_use]
pub fn style_filter(config: &WatchConfig) -> CompositeFilter {
    CompositeFilter::new()
        .and(EventKindFilter(config.watch_events))
        .and(ExtensionFilter::new(config.extensions.iter().cloned()))
}
