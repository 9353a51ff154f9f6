//! Per-dispatch recognition context
//!
//! Each recognition event gets a fresh [`RecognitionContext`] built
//! immediately before dispatch and dropped when the dispatch pass ends.
//! The context is passed explicitly to every plugin invocation — there is
//! no ambient global to leak state across events.

use std::collections::BTreeSet;

use crate::session::{RecognitionEvent, Segment};

/// The set of configured trigger keywords
///
/// Seeded from configuration, extensible at runtime. Reads dominate;
/// mutation happens only between dispatch passes.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    keywords: BTreeSet<String>,
}

impl KeywordSet {
    /// Build a keyword set from seed keywords
    pub fn new<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: seed.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a keyword; returns `false` if it was already present
    pub fn add(&mut self, keyword: impl Into<String>) -> bool {
        self.keywords.insert(keyword.into())
    }

    /// Remove a keyword; returns `false` if it was not present
    pub fn remove(&mut self, keyword: &str) -> bool {
        self.keywords.remove(keyword)
    }

    /// Whether any keyword occurs in `text`
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| text.contains(keyword))
    }

    /// Remove the first occurrence of each keyword from `text`
    #[must_use]
    pub fn strip(&self, text: &str) -> String {
        let mut stripped = text.to_string();
        for keyword in &self.keywords {
            stripped = stripped.replacen(keyword, "", 1).trim().to_string();
        }
        stripped
    }

    /// Snapshot of the keywords, in lexicographic order
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.keywords.iter().cloned().collect()
    }

    /// Number of keywords
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

/// Short-lived view over one recognition event
///
/// Owned exclusively by the in-flight dispatch; never shared between
/// concurrent dispatches and never reused across events.
#[derive(Debug, Clone)]
pub struct RecognitionContext {
    event: RecognitionEvent,
    keyword_triggered: bool,
    keywords: KeywordSet,
}

impl RecognitionContext {
    /// Build a context for one dispatch pass
    ///
    /// `keyword_triggered` records whether the acoustic hotword gate fired
    /// since the previous dispatch; `keywords` is snapshotted so mutation
    /// elsewhere cannot affect an in-flight pass.
    #[must_use]
    pub fn new(event: RecognitionEvent, keyword_triggered: bool, keywords: KeywordSet) -> Self {
        Self {
            event,
            keyword_triggered,
            keywords,
        }
    }

    /// The raw recognition event
    #[must_use]
    pub const fn event(&self) -> &RecognitionEvent {
        &self.event
    }

    /// The full recognized text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.event.text
    }

    /// The recognized text with the first occurrence of each keyword
    /// removed
    #[must_use]
    pub fn stripped_text(&self) -> String {
        self.keywords.strip(&self.event.text)
    }

    /// Whether the acoustic hotword gate triggered for this event window
    ///
    /// Distinguishes a sound-matched trigger from a text-matched one.
    #[must_use]
    pub const fn keyword_triggered(&self) -> bool {
        self.keyword_triggered
    }

    /// Result mode string
    #[must_use]
    pub fn mode(&self) -> &str {
        &self.event.mode
    }

    /// Whether this is an offline (more accurate) result
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.event.is_offline()
    }

    /// Service-side timestamp string, when present
    #[must_use]
    pub fn timestamp(&self) -> Option<&str> {
        self.event.timestamp.as_deref()
    }

    /// Timestamped segments, when present
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        self.event.stamp_sents.as_deref().unwrap_or_default()
    }

    /// Whether any configured keyword occurs in `text`
    #[must_use]
    pub fn has_keyword(&self, text: &str) -> bool {
        self.keywords.matches(text)
    }

    /// The keyword snapshot this context was built with
    #[must_use]
    pub const fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }
}
