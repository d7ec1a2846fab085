//! Route Classification
//!
//! Turns the named path segments of a request into a logical route key.

use super::PathSegments;

/// Logical route used when nothing more specific matches.
pub const ROOT_ROUTE: &str = "/";

/// Maps path segments to a logical route. Must be pure and deterministic.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, segments: &PathSegments) -> String;
}

impl<F> Classifier for F
where
    F: Fn(&PathSegments) -> String + Send + Sync + 'static,
{
    fn classify(&self, segments: &PathSegments) -> String {
        (self)(segments)
    }
}

// == Priority Classifier ==
/// Checks segment names in a fixed order; the first one present maps to
/// `/<name>`. Falls back to [`ROOT_ROUTE`].
#[derive(Debug, Clone, Default)]
pub struct PriorityClassifier {
    keys: Vec<String>,
}

impl PriorityClassifier {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Classifier that always yields [`ROOT_ROUTE`].
    pub fn root() -> Self {
        Self::default()
    }

    // == Function Presets ==
    // Route keys of the sibling functions deployed on this crate. The cache
    // admin binary uses its own table (`ops::classifier`), so these are only
    // called by downstream binaries.

    /// Project function: members, details, statuses and tags.
    ///
    /// ```
    /// use taskfn::api::path_segments;
    /// use taskfn::dispatch::{Classifier, PriorityClassifier};
    ///
    /// let classifier = PriorityClassifier::projects();
    /// assert_eq!(classifier.classify(&path_segments("/projects/9/tag/3")), "/tag");
    /// assert_eq!(classifier.classify(&path_segments("/projects/9")), "/");
    /// ```
    pub fn projects() -> Self {
        Self::new(["users", "details", "status", "tag"])
    }

    /// Public auth function; pair it with `AuthMode::Public`.
    ///
    /// ```
    /// use taskfn::api::path_segments;
    /// use taskfn::dispatch::{Classifier, PriorityClassifier};
    ///
    /// let classifier = PriorityClassifier::auth();
    /// assert_eq!(classifier.classify(&path_segments("/login")), "/login");
    /// ```
    pub fn auth() -> Self {
        Self::new(["login", "register"])
    }
}

impl Classifier for PriorityClassifier {
    fn classify(&self, segments: &PathSegments) -> String {
        self.keys
            .iter()
            .find(|key| segments.contains_key(key.as_str()))
            .map(|key| format!("/{key}"))
            .unwrap_or_else(|| ROOT_ROUTE.to_string())
    }
}
