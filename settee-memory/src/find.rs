//! Selector queries and index bookkeeping.
//!
//! Indexes are recorded and listed but never consulted; every query scans
//! the live documents.

use crate::collate::collate;
use crate::database::{State, to_document};
use crate::listing::count;
use serde_json::{Map, Value, json};
use settee_driver::rows::buffered::BufferedRows;
use settee_types::{Checksum, DESIGN_PREFIX, Error, Index, Result, Row};
use std::cmp::Ordering;

/// Runs a `{"selector", "limit", "skip", "fields", "sort"}` query.
pub(crate) fn find(state: &State, query: &Value) -> Result<BufferedRows> {
    let query = query
        .as_object()
        .ok_or_else(|| Error::bad_request("query must be a JSON object"))?;
    let selector = query
        .get("selector")
        .ok_or_else(|| Error::bad_request("query must contain a selector"))?;
    let limit = count(query, "limit")?.unwrap_or(usize::MAX);
    let skip = count(query, "skip")?.unwrap_or(0);
    let fields = match query.get("fields") {
        None => None,
        Some(Value::Array(list)) => Some(
            list.iter()
                .map(|f| {
                    f.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::bad_request("fields must be strings"))
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        Some(_) => return Err(Error::bad_request("fields must be an array")),
    };
    let sort = parse_sort(query.get("sort"))?;

    let mut docs = Vec::new();
    for (id, revision) in state.live_docs() {
        if id.starts_with(DESIGN_PREFIX) {
            continue;
        }
        let doc = to_document(id, revision, false).to_value();
        if matches(&doc, selector)? {
            docs.push(doc);
        }
    }
    if !sort.is_empty() {
        docs.sort_by(|a, b| {
            sort.iter()
                .map(|(path, descending)| {
                    let ord = collate(
                        lookup(a, path).unwrap_or(&Value::Null),
                        lookup(b, path).unwrap_or(&Value::Null),
                    );
                    if *descending { ord.reverse() } else { ord }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let rows = docs.into_iter().skip(skip).take(limit).map(|doc| {
        let id = doc["_id"].as_str().unwrap_or_default().to_string();
        let doc = match &fields {
            Some(fields) => project(&doc, fields),
            None => doc,
        };
        Row {
            id,
            doc: Some(doc),
            ..Default::default()
        }
    });
    Ok(BufferedRows::new(rows.collect::<Vec<_>>()))
}

fn parse_sort(sort: Option<&Value>) -> Result<Vec<(String, bool)>> {
    let Some(sort) = sort else {
        return Ok(Vec::new());
    };
    let list = sort
        .as_array()
        .ok_or_else(|| Error::bad_request("sort must be an array"))?;
    list.iter()
        .map(|entry| match entry {
            Value::String(field) => Ok((field.clone(), false)),
            Value::Object(map) if map.len() == 1 => {
                let (field, dir) = map.iter().next().ok_or_else(|| Error::bad_request("empty sort"))?;
                match dir.as_str() {
                    Some("asc") => Ok((field.clone(), false)),
                    Some("desc") => Ok((field.clone(), true)),
                    _ => Err(Error::bad_request("sort direction must be asc or desc")),
                }
            }
            _ => Err(Error::bad_request("invalid sort entry")),
        })
        .collect()
}

/// Resolves a dotted path inside a JSON value.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, part| v.get(part))
}

fn project(doc: &Value, fields: &[String]) -> Value {
    let mut out = Map::new();
    for field in fields {
        if let Some(v) = lookup(doc, field) {
            insert_path(&mut out, field, v.clone());
        }
    }
    Value::Object(out)
}

fn insert_path(out: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            out.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = out
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}

fn matches(doc: &Value, selector: &Value) -> Result<bool> {
    let selector = selector
        .as_object()
        .ok_or_else(|| Error::bad_request("selector must be a JSON object"))?;
    for (key, condition) in selector {
        let ok = match key.as_str() {
            "$and" => all_of(doc, condition)?,
            "$or" => {
                let clauses = condition
                    .as_array()
                    .ok_or_else(|| Error::bad_request("$or takes an array"))?;
                let mut any = false;
                for clause in clauses {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(Error::bad_request(format!("unsupported combination operator {op}")));
            }
            path => field_matches(lookup(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_of(doc: &Value, clauses: &Value) -> Result<bool> {
    let clauses = clauses
        .as_array()
        .ok_or_else(|| Error::bad_request("$and takes an array"))?;
    for clause in clauses {
        if !matches(doc, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn field_matches(field: Option<&Value>, condition: &Value) -> Result<bool> {
    let Value::Object(ops) = condition else {
        // A bare value is implicit equality.
        return Ok(field.is_some_and(|f| collate(f, condition) == Ordering::Equal));
    };
    if !ops.keys().any(|k| k.starts_with('$')) {
        return Ok(field.is_some_and(|f| collate(f, condition) == Ordering::Equal));
    }
    for (op, arg) in ops {
        let ok = match op.as_str() {
            "$exists" => {
                let want = arg
                    .as_bool()
                    .ok_or_else(|| Error::bad_request("$exists takes a boolean"))?;
                field.is_some() == want
            }
            "$ne" => field.is_none_or(|f| collate(f, arg) != Ordering::Equal),
            "$in" => {
                let list = arg
                    .as_array()
                    .ok_or_else(|| Error::bad_request("$in takes an array"))?;
                field.is_some_and(|f| list.iter().any(|v| collate(f, v) == Ordering::Equal))
            }
            "$eq" | "$gt" | "$gte" | "$lt" | "$lte" => {
                let Some(f) = field else {
                    return Ok(false);
                };
                let ord = collate(f, arg);
                match op.as_str() {
                    "$eq" => ord == Ordering::Equal,
                    "$gt" => ord == Ordering::Greater,
                    "$gte" => ord != Ordering::Less,
                    "$lt" => ord == Ordering::Less,
                    _ => ord != Ordering::Greater,
                }
            }
            other => return Err(Error::bad_request(format!("unsupported operator {other}"))),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Records an index definition. Returns false when an index with the same
/// design document and name already exists.
pub(crate) fn create_index(
    state: &mut State,
    ddoc: Option<&str>,
    name: Option<&str>,
    definition: Value,
) -> Result<bool> {
    let fields = definition
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::bad_request("index definition must list fields"))?;
    if fields.is_empty() {
        return Err(Error::bad_request("index definition must list fields"));
    }
    let generated = Checksum::compute(definition.to_string().as_bytes()).to_hex();
    let ddoc = match ddoc.filter(|d| !d.is_empty()) {
        Some(d) if d.starts_with(DESIGN_PREFIX) => d.to_string(),
        Some(d) => format!("{DESIGN_PREFIX}{d}"),
        None => format!("{DESIGN_PREFIX}{generated}"),
    };
    let name = name
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or(generated);
    if state
        .indexes
        .iter()
        .any(|i| i.design_doc.as_deref() == Some(ddoc.as_str()) && i.name == name)
    {
        return Ok(false);
    }
    state.indexes.push(Index {
        design_doc: Some(ddoc),
        name,
        index_type: "json".to_string(),
        definition,
    });
    Ok(true)
}

/// Lists indexes, the built-in primary index first.
pub(crate) fn indexes(state: &State) -> Vec<Index> {
    let mut out = vec![Index {
        design_doc: None,
        name: "_all_docs".to_string(),
        index_type: "special".to_string(),
        definition: json!({"fields": [{"_id": "asc"}]}),
    }];
    out.extend(state.indexes.iter().cloned());
    out
}

pub(crate) fn delete_index(state: &mut State, ddoc: &str, name: &str) -> Result<()> {
    let ddoc = if ddoc.starts_with(DESIGN_PREFIX) {
        ddoc.to_string()
    } else {
        format!("{DESIGN_PREFIX}{ddoc}")
    };
    let before = state.indexes.len();
    state
        .indexes
        .retain(|i| !(i.design_doc.as_deref() == Some(ddoc.as_str()) && i.name == name));
    if state.indexes.len() == before {
        return Err(Error::not_found("index not found"));
    }
    Ok(())
}
