use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use settee::{Attachment, Client, Db, Error, Options};
use settee_memory::{Capabilities, MemoryClient, MemoryConfig};
use std::time::Duration;

fn opts(value: Value) -> Options {
    value.as_object().cloned().unwrap_or_default()
}

async fn open(caps: Capabilities) -> Db {
    let client = Client::from_driver(Box::new(MemoryClient::with_capabilities(caps)));
    client.create_db("animals").await.unwrap();
    client.db("animals").await.unwrap()
}

async fn ids(rows: settee::Rows) -> Vec<String> {
    rows.collect()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

// ── Databases ───────────────────────────────────────────────────

#[tokio::test]
async fn create_list_and_destroy_databases() {
    let client = Client::from_driver(Box::new(MemoryClient::new()));
    client.create_db("b").await.unwrap();
    client.create_db("a").await.unwrap();
    assert_eq!(client.all_dbs().await.unwrap(), vec!["a", "b"]);
    assert!(matches!(client.create_db("a").await, Err(Error::Conflict(_))));

    client.destroy_db("a").await.unwrap();
    assert!(!client.db_exists("a").await.unwrap());
    assert!(client.db("a").await.err().unwrap().is_not_found());
}

#[tokio::test]
async fn defaults_apply_to_databases_created_later() {
    let client = Client::from_driver(Box::new(MemoryClient::new()));
    client.set_default("revs_limit", json!(3)).unwrap();
    client.create_db("small").await.unwrap();
    let db = client.db("small").await.unwrap();
    assert_eq!(db.revs_limit().await.unwrap(), 3);
}

#[tokio::test]
async fn server_info_names_the_vendor() {
    let client = Client::from_driver(Box::new(MemoryClient::new()));
    let info = client.server_info().await.unwrap();
    assert_eq!(info.vendor, "settee");
    assert_eq!(info.response["couchdb"], "Welcome");
}

// ── Documents ───────────────────────────────────────────────────

#[tokio::test]
async fn put_get_update_delete() {
    let db = open(Capabilities::all()).await;
    let rev1 = db.put("cow", &json!({"says": "moo"})).await.unwrap();
    assert!(rev1.starts_with("1-"));

    let doc = db.get("cow", &Options::new()).await.unwrap();
    assert_eq!(doc.rev, rev1);
    assert_eq!(doc.body["says"], "moo");

    let stale = db.put("cow", &json!({"says": "baa"})).await.unwrap_err();
    assert!(matches!(stale, Error::Conflict(_)));

    let rev2 = db
        .put("cow", &json!({"_rev": &rev1, "says": "MOO"}))
        .await
        .unwrap();
    assert!(rev2.starts_with("2-"));

    let old = db.get("cow", &opts(json!({"rev": &rev1}))).await.unwrap();
    assert_eq!(old.body["says"], "moo");

    assert!(matches!(db.delete("cow", &rev1).await, Err(Error::Conflict(_))));
    assert!(matches!(db.delete("cow", "garbage").await, Err(Error::BadRequest(_))));
    db.delete("cow", &rev2).await.unwrap();
    assert!(db.get("cow", &Options::new()).await.unwrap_err().is_not_found());
    assert!(db.delete("cow", &rev2).await.unwrap_err().is_not_found());

    // A deleted document can be recreated without a revision.
    let rev4 = db.put("cow", &json!({"says": "again"})).await.unwrap();
    assert!(rev4.starts_with("4-"));
}

#[tokio::test]
async fn put_rejects_mismatched_id() {
    let db = open(Capabilities::all()).await;
    let err = db.put("cow", &json!({"_id": "pig"})).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn create_doc_generates_ids() {
    let db = open(Capabilities::all()).await;
    let (id, rev) = db.create_doc(&json!({"a": 1})).await.unwrap();
    assert_eq!(id.len(), 32);
    assert!(rev.starts_with("1-"));
    let (named, _) = db.create_doc(&json!({"_id": "given"})).await.unwrap();
    assert_eq!(named, "given");
}

#[tokio::test]
async fn identical_writes_derive_identical_revisions() {
    let a = open(Capabilities::all()).await;
    let b = open(Capabilities::all()).await;
    let rev_a = a.put("x", &json!({"v": 1})).await.unwrap();
    let rev_b = b.put("x", &json!({"v": 1})).await.unwrap();
    assert_eq!(rev_a, rev_b);
}

#[tokio::test]
async fn local_documents_count_revisions_and_stay_unlisted() {
    let db = open(Capabilities::all()).await;
    let rev = db.put("_local/checkpoint", &json!({"seq": 1})).await.unwrap();
    assert_eq!(rev, "0-1");
    let rev = db
        .put("_local/checkpoint", &json!({"_rev": rev, "seq": 2}))
        .await
        .unwrap();
    assert_eq!(rev, "0-2");

    assert!(ids(db.all_docs(&Options::new()).await.unwrap()).await.is_empty());
    let changes = db.changes(&Options::new()).await.unwrap();
    assert!(ids(changes).await.is_empty());
}

#[tokio::test]
async fn reserved_ids_are_rejected() {
    let db = open(Capabilities::all()).await;
    let err = db.put("_bogus", &json!({})).await.unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn revs_limit_trims_history() {
    let db = open(Capabilities::all()).await;
    db.set_revs_limit(2).await.unwrap();
    let rev1 = db.put("d", &json!({"n": 1})).await.unwrap();
    let rev2 = db.put("d", &json!({"_rev": &rev1, "n": 2})).await.unwrap();
    db.put("d", &json!({"_rev": rev2, "n": 3})).await.unwrap();
    let err = db.get("d", &opts(json!({"rev": &rev1}))).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(db.set_revs_limit(0).await.is_err());
}

#[tokio::test]
async fn info_counts_live_and_deleted() {
    let db = open(Capabilities::all()).await;
    db.put("a", &json!({})).await.unwrap();
    let rev = db.put("b", &json!({})).await.unwrap();
    db.delete("b", &rev).await.unwrap();

    let info = db.info().await.unwrap();
    assert_eq!(info.name, "animals");
    assert_eq!(info.doc_count, 1);
    assert_eq!(info.deleted_count, 1);
    assert_eq!(info.update_seq, "3");
}

#[tokio::test]
async fn security_round_trips() {
    let db = open(Capabilities::all()).await;
    let mut security = db.security().await.unwrap();
    security.admins.names.push("bob".into());
    db.set_security(&security).await.unwrap();
    assert_eq!(db.security().await.unwrap(), security);
}

// ── Bulk ────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_failures_are_reported_inline() {
    let db = open(Capabilities::all()).await;
    db.put("taken", &json!({})).await.unwrap();
    let results = db
        .bulk_docs(&[json!({"_id": "a"}), json!({"_id": "taken"}), json!({"_id": "b"})])
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].error.is_none());
    assert!(matches!(results[1].error, Some(Error::Conflict(_))));
    assert_eq!(results[1].id, "taken");
    assert!(results[2].error.is_none());
}

// ── Listings and views ──────────────────────────────────────────

#[tokio::test]
async fn all_docs_orders_pages_and_reports_metadata() {
    let db = open(Capabilities::all()).await;
    for id in ["c", "a", "d", "b"] {
        db.put(id, &json!({"id": id})).await.unwrap();
    }

    let mut rows = db
        .all_docs(&opts(json!({"startkey": "b", "limit": 2, "include_docs": true})))
        .await
        .unwrap();
    assert_eq!(rows.total_rows(), 0);
    let first = rows.next().await.unwrap().unwrap();
    assert_eq!(first.id, "b");
    assert_eq!(first.doc.as_ref().unwrap()["id"], "b");
    assert_eq!(rows.offset(), 1);
    assert_eq!(rows.total_rows(), 4);
    assert_eq!(rows.next().await.unwrap().unwrap().id, "c");
    assert!(rows.next().await.unwrap().is_none());

    let desc = db
        .all_docs(&opts(json!({"descending": true, "skip": 1})))
        .await
        .unwrap();
    assert_eq!(ids(desc).await, vec!["c", "b", "a"]);
}

#[tokio::test]
async fn views_emit_field_values() {
    let db = open(Capabilities::all()).await;
    db.put(
        "_design/zoo",
        &json!({"views": {"by_legs": {"map": "legs"}}}),
    )
    .await
    .unwrap();
    db.put("cow", &json!({"legs": 4})).await.unwrap();
    db.put("hen", &json!({"legs": 2})).await.unwrap();
    db.put("fish", &json!({"fins": 3})).await.unwrap();

    let rows = db
        .query("_design/zoo", "_view/by_legs", &Options::new())
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    let keys: Vec<_> = rows.iter().map(|r| (r.id.as_str(), r.key.clone())).collect();
    assert_eq!(keys, vec![("hen", json!(2)), ("cow", json!(4))]);
    assert_eq!(rows[0].value, Value::Null);

    let missing = db.query("zoo", "nope", &Options::new()).await.err().unwrap();
    assert!(missing.is_not_found());
    let no_ddoc = db.query("nope", "by_legs", &Options::new()).await.err().unwrap();
    assert!(no_ddoc.is_not_found());
}

#[tokio::test]
async fn compact_view_requires_design_document() {
    let db = open(Capabilities::all()).await;
    assert!(db.compact_view("_design/missing").await.unwrap_err().is_not_found());
    db.put("_design/zoo", &json!({})).await.unwrap();
    db.compact_view("_design/zoo").await.unwrap();
}

// ── Find ────────────────────────────────────────────────────────

#[tokio::test]
async fn find_filters_and_projects() {
    let db = open(Capabilities::all()).await;
    db.put("cow", &json!({"legs": 4, "name": "Daisy"})).await.unwrap();
    db.put("hen", &json!({"legs": 2, "name": "Henny"})).await.unwrap();

    let rows = db
        .find(&json!({"selector": {"legs": {"$gt": 2}}, "fields": ["name"]}))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "cow");
    assert_eq!(rows[0].doc, Some(json!({"name": "Daisy"})));
}

#[tokio::test]
async fn index_management() {
    let db = open(Capabilities::all()).await;
    let def = json!({"fields": ["legs"]});
    db.create_index(Some("zoo"), Some("legs"), &def).await.unwrap();
    db.create_index(Some("zoo"), Some("legs"), &def).await.unwrap();

    let indexes = db.get_indexes().await.unwrap();
    assert_eq!(indexes.len(), 2);
    assert_eq!(indexes[0].name, "_all_docs");
    assert_eq!(indexes[0].index_type, "special");
    assert_eq!(indexes[1].design_doc.as_deref(), Some("_design/zoo"));

    db.delete_index("zoo", "legs").await.unwrap();
    assert!(db.delete_index("zoo", "legs").await.unwrap_err().is_not_found());
}

// ── Attachments ─────────────────────────────────────────────────

#[tokio::test]
async fn attachments_keep_checksums_across_revisions() {
    let db = open(Capabilities::all()).await;
    let rev = db
        .put_attachment("cow", "", Attachment::from_bytes("moo.txt", "text/plain", b"moo".to_vec()))
        .await
        .unwrap();
    let rev = db.put("cow", &json!({"_rev": rev, "_attachments": {"moo.txt": {"stub": true}}, "n": 1}))
        .await
        .unwrap();

    let mut att = db.get_attachment("cow", "", "moo.txt").await.unwrap();
    assert_eq!(att.content_type, "text/plain");
    assert_eq!(att.bytes().unwrap(), b"moo");
    assert_eq!(att.md5, settee::Checksum::compute(b"moo"));

    let doc = db.get("cow", &Options::new()).await.unwrap();
    let stub = &doc.attachments["moo.txt"];
    assert_eq!(stub["stub"], true);
    assert_eq!(stub["digest"], settee::Checksum::compute(b"moo").to_digest());

    let rev = db.delete_attachment("cow", &rev, "moo.txt").await.unwrap();
    assert!(rev.starts_with("3-"));
    let err = db.get_attachment("cow", "", "moo.txt").await.unwrap_err();
    assert!(err.is_not_found());
}

// ── Changes ─────────────────────────────────────────────────────

#[tokio::test]
async fn normal_feed_reports_latest_revision_per_document() {
    let db = open(Capabilities::all()).await;
    let rev = db.put("a", &json!({})).await.unwrap();
    db.put("b", &json!({})).await.unwrap();
    db.delete("a", &rev).await.unwrap();

    let rows = db.changes(&Options::new()).await.unwrap().collect().await.unwrap();
    let seen: Vec<_> = rows.iter().map(|r| (r.id.as_str(), r.key.clone())).collect();
    assert_eq!(seen, vec![("b", json!("2")), ("a", json!("3"))]);
    assert_eq!(rows[1].value["deleted"], true);

    let since = db.changes(&opts(json!({"since": "2"}))).await.unwrap();
    assert_eq!(ids(since).await, vec!["a"]);
}

#[tokio::test]
async fn update_seq_stays_fixed_while_iterating() {
    let db = open(Capabilities::all()).await;
    for id in ["d0", "d1", "d2"] {
        db.put(id, &json!({})).await.unwrap();
    }

    let mut feed = db.changes(&opts(json!({"since": "0"}))).await.unwrap();
    feed.next().await.unwrap().unwrap();
    let first = feed.update_seq();
    feed.next().await.unwrap().unwrap();
    assert_eq!(feed.update_seq(), first);
    feed.next().await.unwrap().unwrap();
    assert_eq!(feed.update_seq(), first);
}

#[tokio::test]
async fn since_at_the_maximum_sequence_is_empty() {
    let db = open(Capabilities::all()).await;
    db.put("a", &json!({})).await.unwrap();

    let max = u64::MAX.to_string();
    let feed = db.changes(&opts(json!({"since": max}))).await.unwrap();
    assert!(ids(feed).await.is_empty());

    let feed = db.changes(&opts(json!({"since": u64::MAX}))).await.unwrap();
    assert!(ids(feed).await.is_empty());
}

#[tokio::test]
async fn continuous_feed_waits_for_writes() {
    let db = open(Capabilities::all()).await;
    let mut feed = db
        .changes(&opts(json!({"feed": "continuous", "since": "now"})))
        .await
        .unwrap();

    let writer = db.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        writer.put("late", &json!({})).await.unwrap();
    });

    let row = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .expect("change delivered")
        .unwrap()
        .unwrap();
    assert_eq!(row.id, "late");
}

#[tokio::test]
async fn continuous_feed_ends_at_timeout() {
    let db = open(Capabilities::all()).await;
    let mut feed = db
        .changes(&opts(json!({"feed": "continuous", "timeout": 10})))
        .await
        .unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .expect("feed timed out on its own");
    assert!(next.unwrap().is_none());
}

// ── Native capabilities ─────────────────────────────────────────

#[tokio::test]
async fn native_copy_overwrites_existing_target() {
    let db = open(Capabilities::all()).await;
    db.put("src", &json!({"v": 1})).await.unwrap();
    let old = db.put("dst", &json!({"v": 0})).await.unwrap();

    let rev = db.copy("dst", "src", &Options::new()).await.unwrap();
    assert!(rev.starts_with("2-"));
    assert_eq!(db.get("dst", &Options::new()).await.unwrap().body["v"], 1);

    let stale = db
        .copy("dst", "src", &opts(json!({"target_rev": old})))
        .await
        .unwrap_err();
    assert!(matches!(stale, Error::Conflict(_)));
}

#[tokio::test]
async fn flush_reports_open_time() {
    let db = open(Capabilities::all()).await;
    let first = db.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(db.flush().await.unwrap(), first);
}

// ── Config ──────────────────────────────────────────────────────

#[tokio::test]
async fn config_delete_of_missing_key_is_not_found() {
    let client = Client::from_driver(Box::new(
        MemoryClient::new().with_config(MemoryConfig::new().with("admins", "root", "x")),
    ));
    let config = client.config().await.unwrap();
    assert_eq!(config.get("admins", "root").await.unwrap(), "x");
    assert!(config.delete("admins", "nobody").await.unwrap_err().is_not_found());
    assert!(config.delete("nosection", "root").await.unwrap_err().is_not_found());
    config.delete("admins", "root").await.unwrap();
    assert!(config.get_section("admins").await.unwrap_err().is_not_found());
}
