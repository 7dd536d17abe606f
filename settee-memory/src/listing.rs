//! Range, paging and ordering options shared by `all_docs` and `query`.

use crate::collate::collate;
use serde_json::Value;
use settee_driver::rows::buffered::{BufferedRows, RowsMeta};
use settee_types::{Error, Options, Result, Row};
use std::cmp::Ordering;

/// One candidate row before options are applied.
pub(crate) struct Entry {
    pub key: Value,
    pub id: String,
    pub value: Value,
    pub doc: Option<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct ListOptions {
    pub descending: bool,
    pub include_docs: bool,
    pub inclusive_end: bool,
    pub limit: Option<usize>,
    pub skip: usize,
    pub key: Option<Value>,
    pub start: Option<Value>,
    pub end: Option<Value>,
}

impl ListOptions {
    pub fn parse(options: &Options) -> Result<Self> {
        Ok(Self {
            descending: flag(options, "descending")?.unwrap_or(false),
            include_docs: flag(options, "include_docs")?.unwrap_or(false),
            inclusive_end: flag(options, "inclusive_end")?.unwrap_or(true),
            limit: count(options, "limit")?,
            skip: count(options, "skip")?.unwrap_or(0),
            key: options.get("key").cloned(),
            start: options
                .get("startkey")
                .or_else(|| options.get("start_key"))
                .cloned(),
            end: options
                .get("endkey")
                .or_else(|| options.get("end_key"))
                .cloned(),
        })
    }

    fn in_range(&self, key: &Value) -> bool {
        if let Some(k) = &self.key {
            return collate(key, k) == Ordering::Equal;
        }
        // In descending order the start bound is the high one.
        let (after_start, before_end) = if self.descending {
            (Ordering::Less, Ordering::Greater)
        } else {
            (Ordering::Greater, Ordering::Less)
        };
        if let Some(start) = &self.start {
            let ord = collate(key, start);
            if ord != Ordering::Equal && ord != after_start {
                return false;
            }
        }
        if let Some(end) = &self.end {
            let ord = collate(key, end);
            if ord == Ordering::Equal {
                return self.inclusive_end;
            }
            if ord != before_end {
                return false;
            }
        }
        true
    }
}

/// Sorts, filters and pages `entries`, returning an iterator whose
/// metadata reflects the full index.
pub(crate) fn build_rows(mut entries: Vec<Entry>, opts: &ListOptions, update_seq: u64) -> BufferedRows {
    entries.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
    if opts.descending {
        entries.reverse();
    }
    let total_rows = entries.len();
    let offset = entries
        .iter()
        .position(|e| opts.in_range(&e.key))
        .unwrap_or(total_rows);
    let rows: Vec<Row> = entries
        .into_iter()
        .filter(|e| opts.in_range(&e.key))
        .skip(opts.skip)
        .take(opts.limit.unwrap_or(usize::MAX))
        .map(|e| Row {
            id: e.id,
            key: e.key,
            value: e.value,
            doc: if opts.include_docs { e.doc } else { None },
            error: None,
        })
        .collect();
    BufferedRows::new(rows).with_meta(RowsMeta {
        offset: (offset + opts.skip).min(total_rows) as u64,
        total_rows: total_rows as u64,
        update_seq: update_seq.to_string(),
    })
}

/// Reads a boolean option, accepting JSON booleans and `"true"`/`"false"`.
pub(crate) fn flag(options: &Options, name: &str) -> Result<Option<bool>> {
    match options.get(name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s == "true" => Ok(Some(true)),
        Some(Value::String(s)) if s == "false" => Ok(Some(false)),
        Some(other) => Err(Error::bad_request(format!("invalid value for {name}: {other}"))),
    }
}

/// Reads a non-negative integer option, accepting numbers and numeric strings.
pub(crate) fn count(options: &Options, name: &str) -> Result<Option<usize>> {
    let invalid = || Error::bad_request(format!("{name} must be a non-negative integer"));
    match options.get(name) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        Some(Value::String(s)) => s.parse::<usize>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(value: Value) -> ListOptions {
        ListOptions::parse(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn start_and_end_bound_ascending() {
        let o = opts(json!({"startkey": "b", "endkey": "d"}));
        assert!(!o.in_range(&json!("a")));
        assert!(o.in_range(&json!("b")));
        assert!(o.in_range(&json!("d")));
        assert!(!o.in_range(&json!("e")));
    }

    #[test]
    fn exclusive_end() {
        let o = opts(json!({"endkey": "d", "inclusive_end": false}));
        assert!(o.in_range(&json!("c")));
        assert!(!o.in_range(&json!("d")));
    }

    #[test]
    fn descending_swaps_bounds() {
        let o = opts(json!({"descending": true, "startkey": "d", "endkey": "b"}));
        assert!(o.in_range(&json!("c")));
        assert!(!o.in_range(&json!("e")));
        assert!(!o.in_range(&json!("a")));
    }

    #[test]
    fn rejects_negative_limit() {
        let options = json!({"limit": -1});
        assert!(ListOptions::parse(options.as_object().unwrap()).is_err());
    }
}
