//! Interpreter parameters.

/// Options controlling one interpreter run.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterOptions {
    /// Skip failing operators and record a diagnostic instead of aborting
    /// the page.
    pub lenient: bool,

    /// Intersect painted paths with the current clipping path before they
    /// are emitted. Paths that end up fully clipped are dropped.
    pub clip_paths: bool,

    /// Maximum nesting depth for form XObjects.
    pub max_form_depth: usize,

    /// Share fonts, color spaces and shadings between pages by reference.
    pub caching: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            lenient: true,
            clip_paths: false,
            max_form_depth: 32,
            caching: true,
        }
    }
}

impl InterpreterOptions {
    /// Options that fail on the first operator error.
    pub fn strict() -> Self {
        Self {
            lenient: false,
            ..Self::default()
        }
    }

    pub fn with_clip_paths(mut self, clip_paths: bool) -> Self {
        self.clip_paths = clip_paths;
        self
    }
}
