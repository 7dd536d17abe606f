//! The changes feed.
//!
//! `normal` and `longpoll` feeds report what is already recorded and end.
//! A `continuous` feed keeps waiting for new sequences until its
//! cancellation token fires, the optional `timeout` (milliseconds) elapses,
//! or the iterator is closed.

use crate::database::{Database, to_document};
use crate::listing::{count, flag};
use async_trait::async_trait;
use serde_json::{Value, json};
use settee_driver::{CancellationToken, Rows, Step};
use settee_types::{Error, Options, Result, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Normal,
    Continuous,
}

pub(crate) struct ChangesRows {
    db: Arc<Database>,
    feed: Feed,
    include_docs: bool,
    since: u64,
    /// The sequence the feed started from.
    update_seq: u64,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    rx: watch::Receiver<u64>,
    closed: bool,
}

impl ChangesRows {
    pub fn open(db: Arc<Database>, options: &Options, cancel: CancellationToken) -> Result<Self> {
        let feed = match options.get("feed").and_then(Value::as_str) {
            None | Some("normal") | Some("longpoll") => Feed::Normal,
            Some("continuous") => Feed::Continuous,
            Some(other) => return Err(Error::bad_request(format!("unknown feed type {other:?}"))),
        };
        let current = db.read(|s| Ok(s.update_seq))?;
        let since = match options.get("since") {
            None => 0,
            Some(Value::String(s)) if s == "now" => current,
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| Error::bad_request(format!("invalid since value {s:?}")))?,
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| Error::bad_request("since must be a non-negative integer"))?,
            Some(other) => return Err(Error::bad_request(format!("invalid since value {other}"))),
        };
        let deadline = count(options, "timeout")?
            .map(|ms| Instant::now() + Duration::from_millis(ms as u64));
        let rx = db.subscribe();
        debug!("Opened {:?} changes feed on {} since {}", feed, db.name, since);
        Ok(Self {
            feed,
            include_docs: flag(options, "include_docs")?.unwrap_or(false),
            since,
            update_seq: since,
            deadline,
            cancel,
            rx,
            closed: false,
            db,
        })
    }

    /// The first change recorded after `since`, if any.
    fn pending(&self) -> Result<Option<(u64, Row)>> {
        let include_docs = self.include_docs;
        let Some(after) = self.since.checked_add(1) else {
            return Ok(None);
        };
        self.db.read(|state| {
            let Some((&seq, id)) = state.by_seq.range(after..).next() else {
                return Ok(None);
            };
            let current = state
                .docs
                .get(id)
                .map(|d| d.current())
                .ok_or_else(|| Error::internal(format!("sequence {seq} names unknown document")))?;
            let mut value = json!({"changes": [{"rev": current.rev}]});
            if current.deleted {
                value["deleted"] = Value::Bool(true);
            }
            let row = Row {
                id: id.clone(),
                key: Value::String(seq.to_string()),
                value,
                doc: include_docs.then(|| to_document(id, current, false).to_value()),
                error: None,
            };
            Ok(Some((seq, row)))
        })
    }
}

#[async_trait]
impl Rows for ChangesRows {
    async fn next(&mut self, row: &mut Row) -> Result<Step> {
        loop {
            if self.closed || self.cancel.is_cancelled() {
                return Ok(Step::EndOfStream);
            }
            // Mark the current sequence seen before scanning so a write that
            // lands during the scan still wakes the wait below.
            self.rx.borrow_and_update();
            if let Some((seq, next)) = self.pending()? {
                self.since = seq;
                *row = next;
                return Ok(Step::Item);
            }
            if self.feed == Feed::Normal {
                return Ok(Step::EndOfStream);
            }
            let deadline = self.deadline;
            let timeout = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(Step::EndOfStream),
                _ = timeout => return Ok(Step::EndOfStream),
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        // Database dropped.
                        return Ok(Step::EndOfStream);
                    }
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn update_seq(&self) -> String {
        self.update_seq.to_string()
    }
}
