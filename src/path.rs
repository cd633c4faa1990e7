//! Dotted-path access into a state tree.
//!
//! A path such as `"a.b.0.c"` names one location in a [`StateValue`] tree.
//! Map nodes are traversed by key; list nodes are traversed by numeric
//! index. A lookup that runs off the tree returns `None` rather than
//! failing, so watching a path that does not exist yet is allowed.

use crate::error::ValidationError;
use crate::value::StateValue;

/// A parsed, validated dotted path.
///
/// Parsing is the only fallible step; lookups never error.
///
/// # Examples
///
/// ```
/// use vigil::{PathAccessor, StateValue};
///
/// let state = StateValue::from(serde_json::json!({"a": {"b": [10, 20]}}));
/// let accessor = PathAccessor::parse("a.b.1").unwrap();
/// assert_eq!(accessor.lookup(&state), Some(&StateValue::Int(20)));
/// assert_eq!(PathAccessor::parse("a.missing.x").unwrap().lookup(&state), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathAccessor {
    raw: String,
    segments: Vec<String>,
}

impl PathAccessor {
    /// Parses a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPath`] for an empty input and
    /// [`ValidationError::EmptyPathSegment`] when two dots are adjacent or
    /// the path starts or ends with a dot.
    pub fn parse(path: &str) -> Result<Self, ValidationError> {
        if path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ValidationError::EmptyPathSegment {
                path: path.to_string(),
            });
        }

        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    /// The original path string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against a state tree.
    ///
    /// Each segment descends one level: by key for maps, by parsed numeric
    /// index for lists. Any miss yields `None`.
    #[must_use]
    pub fn lookup<'a>(&self, state: &'a StateValue) -> Option<&'a StateValue> {
        let mut current = state;
        for segment in &self.segments {
            current = match current {
                StateValue::Map(map) => map.get(segment)?,
                StateValue::List(items) => {
                    let idx: usize = segment.parse().ok()?;
                    items.get(idx)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}
