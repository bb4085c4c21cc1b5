//! Hornet error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The hornet error type.
///
/// Missing data and ambiguous AS resolution are never errors. They are
/// modeled by `Option` and by the ambiguity predicates. What remains is
/// collaborator failure, storage failure and store corruption.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HornetError {
    /// The durable cache holds a key that neither the recency list nor
    /// the reserved metadata key accounts for.
    ///
    /// This means the store was corrupted or written by an incompatible
    /// run. It is not recoverable.
    #[error("cache integrity violation: unaccounted key {key:?}")]
    CacheIntegrity {
        /// The offending key.
        key: Arc<str>,
    },

    /// Generic hornet internal error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

impl HornetError {
    /// Construct a cache integrity error for the given key.
    pub fn cache_integrity<K: std::fmt::Display>(key: K) -> Self {
        Self::CacheIntegrity {
            key: key.to_string().into_boxed_str().into(),
        }
    }

    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// Is this the fatal store-corruption error?
    pub fn is_cache_integrity(&self) -> bool {
        matches!(self, Self::CacheIntegrity { .. })
    }
}

/// The hornet result type.
pub type HornetResult<T> = Result<T, HornetError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            "bla (src: None)",
            HornetError::other("bla").to_string().as_str(),
        );
        assert_eq!(
            "foo (src: bar)",
            HornetError::other_src("foo", std::io::Error::other("bar"))
                .to_string()
                .as_str(),
        );
        assert_eq!(
            "cache integrity violation: unaccounted key \"paths-1 2\"",
            HornetError::cache_integrity("paths-1 2").to_string().as_str(),
        );
    }

    #[test]
    fn integrity_is_distinguishable() {
        assert!(HornetError::cache_integrity("k").is_cache_integrity());
        assert!(!HornetError::other("k").is_cache_integrity());
    }

    #[test]
    fn ensure_error_type_is_send_and_sync() {
        fn ensure<T: std::fmt::Display + Send + Sync>(_t: T) {}
        ensure(HornetError::other("bla"));
    }
}
