//! Guildfetch error types.

use crate::{ListRange, Token};
use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => std::fmt::Display::fmt(s, f),
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

/// The guildfetch error type. Every retrieval future resolves with either
/// its result or one of these kinds.
///
/// This type is required to implement `Clone` so that an outcome can be
/// handed through channels and shared futures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GfError {
    /// Malformed input, rejected before any network action.
    #[error("invalid argument: {ctx}")]
    InvalidArgument {
        /// What was wrong with the input.
        ctx: Arc<str>,
    },

    /// The deadline of a request elapsed before it completed.
    /// Members accumulated so far are discarded.
    #[error("member retrieval timed out (token: {token})")]
    RetrievalTimeout {
        /// The correlation token of the request.
        token: Token,
    },

    /// The server invalidated a member list range and no retries remain.
    #[error("member list range {range} invalidated, retries exhausted")]
    Invalidated {
        /// The last range the server invalidated.
        range: ListRange,
    },

    /// The request was cancelled, either explicitly or by shutdown.
    #[error("member retrieval cancelled (token: {token})")]
    Cancelled {
        /// The correlation token of the request.
        token: Token,
    },

    /// A token was registered twice. This is a programming error.
    #[error("duplicate correlation token: {token}")]
    DuplicateToken {
        /// The offending token.
        token: Token,
    },

    /// Generic internal or collaborator error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

impl GfError {
    /// Construct an "invalid argument" error.
    pub fn invalid_argument<C: std::fmt::Display>(ctx: C) -> Self {
        Self::InvalidArgument {
            ctx: ctx.to_string().into_boxed_str().into(),
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
}

/// The guildfetch result type.
pub type GfResult<T> = Result<T, GfError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            "bla (src: None)",
            GfError::other("bla").to_string().as_str(),
        );
        assert_eq!(
            "foo (src: bar)",
            GfError::other_src("foo", std::io::Error::other("bar"))
                .to_string()
                .as_str(),
        );
        assert_eq!(
            "invalid argument: depth must be at least 1",
            GfError::invalid_argument("depth must be at least 1")
                .to_string()
                .as_str(),
        );
        assert_eq!(
            "member list range [100, 199] invalidated, retries exhausted",
            GfError::Invalidated {
                range: ListRange(100, 199)
            }
            .to_string()
            .as_str(),
        );
    }

    #[test]
    fn timeout_and_cancel_are_distinct() {
        let token = Token::new("abc").unwrap();
        let timeout = GfError::RetrievalTimeout {
            token: token.clone(),
        };
        let cancel = GfError::Cancelled { token };
        assert_eq!(
            "member retrieval timed out (token: abc)",
            timeout.to_string()
        );
        assert_eq!(
            "member retrieval cancelled (token: abc)",
            cancel.to_string()
        );
    }

    #[test]
    fn ensure_gferror_type_is_send_and_sync() {
        fn ensure<T: std::fmt::Display + Send + Sync>(_t: T) {}
        ensure(GfError::other("bla"));
    }
}
