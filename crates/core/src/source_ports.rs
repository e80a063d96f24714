//! Authoritative data source port.
//!
//! Read-through patterns fall back to a [`DataSource`] on a cache miss. A
//! source may answer with a single row, a list, or a stream; the client
//! drains streams into a concrete `Vec` before encoding because most streams
//! can only be consumed once.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use cacheward_domain::Params;
use futures::stream::BoxStream;
use futures::TryStreamExt;

use crate::cache_ports::BoxedError;

/// Error raised by a data source
pub type SourceError = BoxedError;

/// Rows returned by a source query
pub enum QueryRows<T> {
    One(T),
    Many(Vec<T>),
    Stream(BoxStream<'static, Result<T, SourceError>>),
}

impl<T> QueryRows<T> {
    /// Drain into an ordered, reusable sequence
    ///
    /// # Errors
    /// Returns the first error yielded by a stream.
    pub async fn collect(self) -> Result<Vec<T>, SourceError> {
        match self {
            Self::One(row) => Ok(vec![row]),
            Self::Many(rows) => Ok(rows),
            Self::Stream(stream) => stream.try_collect().await,
        }
    }
}

impl<T> From<Vec<T>> for QueryRows<T> {
    fn from(rows: Vec<T>) -> Self {
        Self::Many(rows)
    }
}

impl<T> fmt::Debug for QueryRows<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(_) => f.write_str("QueryRows::One"),
            Self::Many(rows) => write!(f, "QueryRows::Many({} rows)", rows.len()),
            Self::Stream(_) => f.write_str("QueryRows::Stream"),
        }
    }
}

/// Port for the authoritative store behind a read-through pattern.
///
/// `params` are the fixed query arguments bound on the pattern.
#[async_trait]
pub trait DataSource<T: Send + 'static>: Send + Sync {
    async fn query(&self, params: &Params) -> Result<QueryRows<T>, SourceError>;
}

/// [`DataSource`] backed by an async closure
pub struct FnSource<F> {
    query: F,
}

/// Adapt an async closure into a [`DataSource`]
///
/// ```rust
/// use cacheward_core::{source_fn, QueryRows, SourceError};
/// use cacheward_domain::Params;
///
/// let shelters = source_fn(|_params: Params| async {
///     Ok::<_, SourceError>(QueryRows::Many(vec!["Union Gospel", "Covenant House"]))
/// });
/// # let _ = shelters;
/// ```
pub fn source_fn<F>(query: F) -> FnSource<F> {
    FnSource { query }
}

#[async_trait]
impl<T, F, Fut> DataSource<T> for FnSource<F>
where
    T: Send + 'static,
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<QueryRows<T>, SourceError>> + Send,
{
    async fn query(&self, params: &Params) -> Result<QueryRows<T>, SourceError> {
        (self.query)(params.clone()).await
    }
}

impl<F> fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSource(..)")
    }
}
