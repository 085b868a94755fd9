//! End-to-end tests for the Durable Document Service: the concrete
//! scenarios of §8 plus recovery/snapshot-transparency properties.

use docstore_core::types::{Document, Value};
use docstore_core::{Config, DurabilityLevel};
use docstore_engine::DurableDocumentService;
use std::collections::BTreeMap;
use tempfile::tempdir;

fn doc_with(id: &str, key: &str, value: &str) -> Document {
    let mut data = BTreeMap::new();
    data.insert(key.to_string(), Value::Str(value.to_string()));
    Document { id: id.into(), data, ..Default::default() }
}

#[test]
fn create_put_get_scenario() {
    let dir = tempdir().unwrap();
    let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
    svc.create_db("a").unwrap();
    let put = svc.put("a", doc_with("x", "k", "v")).unwrap();
    assert!(put.rev.starts_with("1-"));
    let got = svc.get("a", "x", None).unwrap();
    assert_eq!(got.data.get("k"), Some(&Value::Str("v".into())));
}

#[test]
fn conflict_scenario() {
    let dir = tempdir().unwrap();
    let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
    svc.create_db("a").unwrap();
    let v1 = svc.put("a", doc_with("x", "k", "v")).unwrap();

    let stale = Document { rev: String::new(), ..doc_with("x", "k", "w") };
    assert!(svc.put("a", stale).unwrap_err().is_conflict());

    let fresh = Document { rev: v1.rev.clone(), ..doc_with("x", "k", "w") };
    let v2 = svc.put("a", fresh).unwrap();
    assert!(v2.rev.starts_with("2-"));
}

#[test]
fn soft_delete_scenario() {
    let dir = tempdir().unwrap();
    let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
    svc.create_db("a").unwrap();
    let v1 = svc.put("a", doc_with("x", "k", "v")).unwrap();
    let v2 = svc.put("a", Document { rev: v1.rev, ..doc_with("x", "k", "w") }).unwrap();

    svc.delete("a", "x", &v2.rev).unwrap();
    let got = svc.get("a", "x", None).unwrap();
    assert!(got.deleted);

    let mut equals = docstore_storage::Equals::new();
    equals.insert("k".to_string(), "w".to_string());
    assert!(svc.find_by_fields("a", &equals, None, 0, 10).unwrap().is_empty());
}

#[test]
fn recovery_scenario_reopen_preserves_seq_and_tombstones() {
    let dir = tempdir().unwrap();
    {
        let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
        svc.create_db("a").unwrap();
        let v1 = svc.put("a", doc_with("x", "k", "v")).unwrap();
        let v2 = svc.put("a", Document { rev: v1.rev, ..doc_with("x", "k", "w") }).unwrap();
        svc.delete("a", "x", &v2.rev).unwrap();
        assert_eq!(svc.seq("a").unwrap(), 3);
    }

    let (svc2, report) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
    assert_eq!(report.databases_recovered, 1);
    assert_eq!(svc2.seq("a").unwrap(), 3);
    let all = svc2.all_docs("a", 0, 10, true).unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].deleted);
}

#[test]
fn tag_and_text_search_scenario() {
    let dir = tempdir().unwrap();
    let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
    svc.create_db("a").unwrap();
    svc.put(
        "a",
        Document {
            id: "n1".into(),
            tags: vec!["red".into(), "big".into()],
            content: Some("Hello, World!".into()),
            ..Default::default()
        },
    )
    .unwrap();
    svc.put(
        "a",
        Document {
            id: "n2".into(),
            tags: vec!["red".into()],
            content: Some("hello there".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let tags = svc
        .find_by_tags("a", &["red".to_string()], &[], &["big".to_string()], 0, 10)
        .unwrap();
    assert_eq!(tags.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["n2"]);

    let mut text = svc.full_text_search("a", "hello", 0, 10).unwrap();
    text.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(text.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["n1", "n2"]);
}

#[test]
fn snapshot_transparency_recovered_state_matches_pre_snapshot_state() {
    let dir = tempdir().unwrap();
    let mut cfg = Config::new(dir.path());
    cfg.durability = DurabilityLevel::Strong;
    cfg.snapshot_every_n_operations = 3;

    {
        let (svc, _) = DurableDocumentService::open(cfg.clone()).unwrap();
        svc.create_db("a").unwrap();
        svc.put("a", doc_with("d1", "k", "1")).unwrap();
        svc.put("a", doc_with("d2", "k", "2")).unwrap();
        svc.put("a", doc_with("d3", "k", "3")).unwrap(); // trips the snapshot trigger
        svc.put("a", doc_with("d4", "k", "4")).unwrap(); // lands only in the rotated WAL
    }

    let (svc2, _) = DurableDocumentService::open(cfg).unwrap();
    assert_eq!(svc2.seq("a").unwrap(), 4);
    let mut ids: Vec<String> = svc2.all_docs("a", 0, 10, true).unwrap().into_iter().map(|d| d.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["d1", "d2", "d3", "d4"]);
}

#[test]
fn recovery_is_idempotent_across_repeated_reopen() {
    let dir = tempdir().unwrap();
    {
        let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
        svc.create_db("a").unwrap();
        svc.put("a", doc_with("x", "k", "v")).unwrap();
    }
    for _ in 0..3 {
        let (svc, _) = DurableDocumentService::open(Config::new(dir.path())).unwrap();
        assert_eq!(svc.seq("a").unwrap(), 1);
    }
}
