//! Runtime errors
//!
//! Every future carries an [`Outcome`]: either the produced value or a
//! captured [`Error`]. Errors are reference counted so that all readers of a
//! shared result observe the very same instance.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error as ThisError;

/// Value-or-error delivered through a future.
pub type Outcome<T> = std::result::Result<T, Error>;

/// Failures produced by the runtime itself rather than by user code.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RuntimeError {
    #[error("promise dropped without a result")]
    BrokenPromise,

    #[error("continuation panicked: {0}")]
    Panicked(String),

    #[error("executor rejected the task: {0}")]
    Rejected(String),
}

/// Thread pool errors
#[derive(Debug, ThisError)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("thread pool is no longer accepting tasks")]
    ShutDown,
}

/// A captured error.
///
/// Cloning is cheap and preserves identity, see [`Error::ptr_eq`]. Like
/// `anyhow::Error`, this type does not implement `std::error::Error` itself,
/// which lets any standard error convert into it with `?`.
#[derive(Clone)]
pub struct Error {
    inner: Arc<anyhow::Error>,
}

impl Error {
    /// Capture a standard error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::from_anyhow(anyhow::Error::new(error))
    }

    /// Capture a plain message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::from_anyhow(anyhow::Error::msg(message))
    }

    /// Wrap an existing `anyhow::Error`.
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        Self {
            inner: Arc::new(error),
        }
    }

    /// The error written by a promise dropped before it was fulfilled.
    #[inline]
    pub fn broken_promise() -> Self {
        Self::new(RuntimeError::BrokenPromise)
    }

    /// Convert a panic payload caught by `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(RuntimeError::Panicked(message))
    }

    /// Borrow the underlying error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Check whether the underlying error is of type `E`.
    #[inline]
    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.is::<E>()
    }

    /// The runtime failure behind this error, if any.
    #[inline]
    pub fn runtime_error(&self) -> Option<&RuntimeError> {
        self.downcast_ref::<RuntimeError>()
    }

    /// True if a promise was dropped without producing a result.
    pub fn is_broken_promise(&self) -> bool {
        matches!(self.runtime_error(), Some(RuntimeError::BrokenPromise))
    }

    /// True if the error was captured from a panic.
    pub fn is_panic(&self) -> bool {
        matches!(self.runtime_error(), Some(RuntimeError::Panicked(_)))
    }

    /// True if both handles refer to the same captured error.
    #[inline]
    pub fn ptr_eq(
        &self,
        other: &Self,
    ) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Access the underlying `anyhow::Error`.
    #[inline]
    pub fn as_anyhow(&self) -> &anyhow::Error {
        &self.inner
    }
}

impl<E> From<E> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for Error {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Error {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}
