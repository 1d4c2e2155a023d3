//! Per-request option bag.
//!
//! Every middleware looks up its configuration in the [`RequestOptions`] of
//! the request it handles: a request-scoped option of the right
//! [`OptionKind`] replaces the middleware default for that single call.
//!
//! # Example
//!
//! ```ignore
//! let mut options = RequestOptions::new();
//! options.add(RetryHandlerOption::new().max_retry(1));
//!
//! let retry = options.get::<RetryHandlerOption>()?;
//! ```

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use derive_more::Display;

use crate::{Error, Result};

/// Stable identifier of an option kind.
///
/// The bag holds at most one option per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum OptionKind {
    /// URI replacement rules.
    #[display("uri-replacement")]
    UriReplacement,
    /// Retry policy.
    #[display("retry")]
    Retry,
    /// Redirect policy.
    #[display("redirect")]
    Redirect,
    /// Query parameter name decoding.
    #[display("parameters-name-decoding")]
    ParametersNameDecoding,
    /// User-agent product token.
    #[display("user-agent")]
    UserAgent,
    /// Header inspection maps.
    #[display("headers-inspection")]
    HeadersInspection,
    /// Response handler override.
    #[display("response-handler")]
    ResponseHandler,
    /// Option contributed by a custom middleware.
    #[display("{_0}")]
    Custom(&'static str),
}

/// A value that can be stored in a [`RequestOptions`] bag.
pub trait RequestOption: Any + Send + Sync + fmt::Debug {
    /// Kind under which the option is stored.
    const KIND: OptionKind;
}

/// Type-erased option stored in the bag.
pub type SharedOption = Arc<dyn Any + Send + Sync>;

/// Mapping from [`OptionKind`] to option instance.
#[derive(Clone, Default)]
pub struct RequestOptions {
    entries: HashMap<OptionKind, SharedOption>,
}

impl RequestOptions {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option, replacing any option of the same kind.
    pub fn add<O: RequestOption>(&mut self, option: O) -> &mut Self {
        self.add_shared(Arc::new(option))
    }

    /// Adds an option the caller keeps a handle on.
    ///
    /// Used by options with interior mutability, like header inspection maps.
    pub fn add_shared<O: RequestOption>(&mut self, option: Arc<O>) -> &mut Self {
        self.entries.insert(O::KIND, option);
        self
    }

    /// Stores a type-erased option under an explicit kind.
    pub fn insert_erased(&mut self, kind: OptionKind, option: SharedOption) -> &mut Self {
        self.entries.insert(kind, option);
        self
    }

    /// Looks up the option of type `O`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionTypeMismatch`] when the entry stored under
    /// `O::KIND` has another type.
    pub fn get<O: RequestOption>(&self) -> Result<Option<Arc<O>>> {
        let Some(entry) = self.entries.get(&O::KIND) else {
            return Ok(None);
        };
        Arc::clone(entry)
            .downcast::<O>()
            .map(Some)
            .map_err(|_| Error::OptionTypeMismatch {
                kind: O::KIND,
                expected: type_name::<O>(),
            })
    }

    /// Looks up the option of type `O`, falling back to `default`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionTypeMismatch`] like [`Self::get`].
    pub fn get_or<O: RequestOption>(&self, default: &Arc<O>) -> Result<Arc<O>> {
        Ok(self.get::<O>()?.unwrap_or_else(|| Arc::clone(default)))
    }

    /// Type-erased lookup by kind.
    #[must_use]
    pub fn get_erased(&self, kind: OptionKind) -> Option<&SharedOption> {
        self.entries.get(&kind)
    }

    /// Returns `true` if an option of this kind is present.
    #[must_use]
    pub fn contains(&self, kind: OptionKind) -> bool {
        self.entries.contains_key(&kind)
    }

    /// Removes the option of this kind.
    pub fn remove(&mut self, kind: OptionKind) -> Option<SharedOption> {
        self.entries.remove(&kind)
    }

    /// Kinds present in the bag.
    pub fn kinds(&self) -> impl Iterator<Item = OptionKind> + '_ {
        self.entries.keys().copied()
    }

    /// Number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every option of `other` into this bag, replacing same kinds.
    pub fn extend(&mut self, other: &Self) {
        self.entries
            .extend(other.entries.iter().map(|(kind, option)| (*kind, Arc::clone(option))));
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Limit(u32);

    impl RequestOption for Limit {
        const KIND: OptionKind = OptionKind::Custom("limit");
    }

    #[derive(Debug)]
    struct Other;

    impl RequestOption for Other {
        const KIND: OptionKind = OptionKind::Custom("limit");
    }

    #[test]
    fn add_and_get() {
        let mut options = RequestOptions::new();
        assert!(options.is_empty());

        options.add(Limit(3));
        let limit = options.get::<Limit>().expect("same type").expect("present");
        assert_eq!(*limit, Limit(3));
        assert!(options.contains(OptionKind::Custom("limit")));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn one_option_per_kind() {
        let mut options = RequestOptions::new();
        options.add(Limit(1)).add(Limit(2));

        assert_eq!(options.len(), 1);
        let limit = options.get::<Limit>().expect("same type").expect("present");
        assert_eq!(*limit, Limit(2));
    }

    #[test]
    fn missing_option_is_none() {
        let options = RequestOptions::new();
        assert!(options.get::<Limit>().expect("no mismatch").is_none());
    }

    #[test]
    fn get_or_prefers_request_option() {
        let default = Arc::new(Limit(10));
        let mut options = RequestOptions::new();
        assert_eq!(*options.get_or(&default).expect("no mismatch"), Limit(10));

        options.add(Limit(1));
        assert_eq!(*options.get_or(&default).expect("no mismatch"), Limit(1));
    }

    #[test]
    fn type_mismatch_fails_clearly() {
        let mut options = RequestOptions::new();
        options.add(Other);

        let_assert!(Err(err) = options.get::<Limit>());
        let_assert!(Error::OptionTypeMismatch { kind, expected } = &err);
        check!(*kind == OptionKind::Custom("limit"));
        check!(expected.ends_with("Limit"));
        check!(err.to_string().starts_with("request option limit is not a "));
    }

    #[test]
    fn shared_option_keeps_caller_handle() {
        let shared = Arc::new(Limit(7));
        let mut options = RequestOptions::new();
        options.add_shared(Arc::clone(&shared));

        let stored = options.get::<Limit>().expect("same type").expect("present");
        assert!(Arc::ptr_eq(&shared, &stored));
    }

    #[test]
    fn extend_replaces_same_kind() {
        let mut base = RequestOptions::new();
        base.add(Limit(1));
        let mut other = RequestOptions::new();
        other.add(Limit(2));

        base.extend(&other);
        let limit = base.get::<Limit>().expect("same type").expect("present");
        assert_eq!(*limit, Limit(2));
    }

    #[test]
    fn remove_option() {
        let mut options = RequestOptions::new();
        options.add(Limit(1));
        assert!(options.remove(OptionKind::Custom("limit")).is_some());
        assert!(options.is_empty());
    }
}
