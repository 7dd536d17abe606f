//! The pull-based result iterator protocol.
//!
//! An iterator owns backend resources until [`Rows::close`] is called.
//! `close` is idempotent: the second and later calls succeed without
//! releasing anything again. A single iterator is driven by one caller at
//! a time; `next` and `close` take `&mut self` for that reason.

use async_trait::async_trait;
use settee_types::{BulkResult, Result, Row};

/// Outcome of a successful `next` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The slot was populated.
    Item,
    /// The stream is exhausted; the slot is untouched.
    EndOfStream,
}

/// Iterator over listing, view, find and changes results.
#[async_trait]
pub trait Rows: Send {
    /// Populates `row` with the next element.
    async fn next(&mut self, row: &mut Row) -> Result<Step>;

    /// Releases backend resources. Safe to call more than once.
    fn close(&mut self) -> Result<()>;

    /// Offset of the first row. Zero until the first `next` has succeeded
    /// on backends that stream their metadata.
    fn offset(&self) -> u64 {
        0
    }

    /// Total rows in the underlying index. Same availability as `offset`.
    fn total_rows(&self) -> u64 {
        0
    }

    /// Update sequence marker. Same availability as `offset`.
    fn update_seq(&self) -> String {
        String::new()
    }
}

/// Iterator over the per-document outcomes of a bulk write.
#[async_trait]
pub trait BulkResults: Send {
    async fn next(&mut self, result: &mut BulkResult) -> Result<Step>;

    fn close(&mut self) -> Result<()>;
}

/// Iterators over results that are already fully materialized.
pub mod buffered {
    use super::*;
    use std::collections::VecDeque;

    /// Row metadata reported by [`BufferedRows`].
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RowsMeta {
        pub offset: u64,
        pub total_rows: u64,
        pub update_seq: String,
    }

    /// A [`Rows`] over an in-memory queue.
    ///
    /// Metadata is withheld until the first `next` call, mirroring backends
    /// that only learn it from the first chunk of a streamed response.
    #[derive(Debug, Default)]
    pub struct BufferedRows {
        rows: VecDeque<Row>,
        meta: RowsMeta,
        revealed: bool,
        closed: bool,
    }

    impl BufferedRows {
        pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
            Self {
                rows: rows.into_iter().collect(),
                ..Default::default()
            }
        }

        pub fn with_meta(mut self, meta: RowsMeta) -> Self {
            self.meta = meta;
            self
        }

        /// Returns true once `close` has been called.
        pub fn is_closed(&self) -> bool {
            self.closed
        }
    }

    #[async_trait]
    impl Rows for BufferedRows {
        async fn next(&mut self, row: &mut Row) -> Result<Step> {
            self.revealed = true;
            if self.closed {
                return Ok(Step::EndOfStream);
            }
            match self.rows.pop_front() {
                Some(next) => {
                    *row = next;
                    Ok(Step::Item)
                }
                None => Ok(Step::EndOfStream),
            }
        }

        fn close(&mut self) -> Result<()> {
            if !self.closed {
                self.closed = true;
                self.rows.clear();
            }
            Ok(())
        }

        fn offset(&self) -> u64 {
            if self.revealed { self.meta.offset } else { 0 }
        }

        fn total_rows(&self) -> u64 {
            if self.revealed { self.meta.total_rows } else { 0 }
        }

        fn update_seq(&self) -> String {
            if self.revealed {
                self.meta.update_seq.clone()
            } else {
                String::new()
            }
        }
    }

    /// A [`BulkResults`] over an in-memory queue.
    #[derive(Debug, Default)]
    pub struct BufferedBulkResults {
        results: VecDeque<BulkResult>,
        closed: bool,
    }

    impl BufferedBulkResults {
        pub fn new(results: impl IntoIterator<Item = BulkResult>) -> Self {
            Self {
                results: results.into_iter().collect(),
                closed: false,
            }
        }
    }

    #[async_trait]
    impl BulkResults for BufferedBulkResults {
        async fn next(&mut self, result: &mut BulkResult) -> Result<Step> {
            if self.closed {
                return Ok(Step::EndOfStream);
            }
            match self.results.pop_front() {
                Some(next) => {
                    *result = next;
                    Ok(Step::Item)
                }
                None => Ok(Step::EndOfStream),
            }
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            self.results.clear();
            Ok(())
        }
    }
}
