//! Caller-facing iterators.
//!
//! Both wrappers close the backend iterator exactly once, either through an
//! explicit `close` or when dropped, so early returns and `?` never leak a
//! backend connection.

use settee_driver::{CancellationToken, Step};
use settee_types::{BulkResult, Result, Row};
use tracing::warn;

/// Iterator over listing, view, find and changes results.
pub struct Rows {
    inner: Box<dyn settee_driver::Rows>,
    cancel: CancellationToken,
    closed: bool,
}

impl Rows {
    pub(crate) fn new(inner: Box<dyn settee_driver::Rows>, cancel: CancellationToken) -> Self {
        Self {
            inner,
            cancel,
            closed: false,
        }
    }

    /// Fills `row` with the next element.
    ///
    /// Returns [`Step::EndOfStream`] once the stream is exhausted, after
    /// [`Rows::close`], or as soon as the iterator's cancellation token fires,
    /// even while the backend is blocked waiting for data.
    pub async fn next_into(&mut self, row: &mut Row) -> Result<Step> {
        if self.closed || self.cancel.is_cancelled() {
            return Ok(Step::EndOfStream);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(Step::EndOfStream),
            step = self.inner.next(row) => step,
        }
    }

    /// Returns the next element, or `None` at end of stream.
    pub async fn next(&mut self) -> Result<Option<Row>> {
        let mut row = Row::default();
        match self.next_into(&mut row).await? {
            Step::Item => Ok(Some(row)),
            Step::EndOfStream => Ok(None),
        }
    }

    /// Drains the iterator and closes it.
    pub async fn collect(mut self) -> Result<Vec<Row>> {
        let mut out = Vec::new();
        while let Some(row) = self.next().await? {
            out.push(row);
        }
        self.close()?;
        Ok(out)
    }

    /// Releases backend resources. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cancel.cancel();
        self.inner.close()
    }

    /// A token that aborts an in-flight or future `next` when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn offset(&self) -> u64 {
        self.inner.offset()
    }

    pub fn total_rows(&self) -> u64 {
        self.inner.total_rows()
    }

    pub fn update_seq(&self) -> String {
        self.inner.update_seq()
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close rows iterator: {}", e);
        }
    }
}

/// Iterator over the per-document outcomes of a bulk write.
pub struct BulkResults {
    inner: Box<dyn settee_driver::BulkResults>,
    closed: bool,
}

impl BulkResults {
    pub(crate) fn new(inner: Box<dyn settee_driver::BulkResults>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    pub async fn next_into(&mut self, result: &mut BulkResult) -> Result<Step> {
        if self.closed {
            return Ok(Step::EndOfStream);
        }
        self.inner.next(result).await
    }

    /// Returns the next outcome, or `None` at end of stream.
    pub async fn next(&mut self) -> Result<Option<BulkResult>> {
        let mut result = BulkResult::default();
        match self.next_into(&mut result).await? {
            Step::Item => Ok(Some(result)),
            Step::EndOfStream => Ok(None),
        }
    }

    /// Drains the iterator and closes it.
    pub async fn collect(mut self) -> Result<Vec<BulkResult>> {
        let mut out = Vec::new();
        while let Some(result) = self.next().await? {
            out.push(result);
        }
        self.close()?;
        Ok(out)
    }

    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close()
    }
}

impl Drop for BulkResults {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close bulk results iterator: {}", e);
        }
    }
}
