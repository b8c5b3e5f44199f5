//! Behaviour every `MeditationStore` backend must share.
//!
//! Each property runs against every backend: the in-memory store, the
//! key-addressed store over a transactional and a non-transactional local
//! client, and (with the `redb` feature) the key-addressed store over a redb
//! file in a temporary directory.

use std::collections::HashSet;
use std::sync::Arc;

use meditation_core::Meditation;
use meditation_server::storage::{
    DurableStoreConfig, KvMeditationStore, LocalKvClient, MemoryMeditationStore,
};
use meditation_server::{MeditationStore, StoreError};
use proptest::prelude::*;

struct Backend {
    label: &'static str,
    store: Arc<dyn MeditationStore>,
    // Keeps the database directory alive for the test's duration.
    _dir: Option<tempfile::TempDir>,
}

fn backends() -> Vec<Backend> {
    let mut all = vec![
        Backend {
            label: "memory",
            store: Arc::new(MemoryMeditationStore::new()),
            _dir: None,
        },
        Backend {
            label: "kv-transactional",
            store: Arc::new(KvMeditationStore::new(Arc::new(LocalKvClient::new()))),
            _dir: None,
        },
        Backend {
            label: "kv-independent-calls",
            store: Arc::new(KvMeditationStore::with_config(
                Arc::new(LocalKvClient::without_transactions()),
                DurableStoreConfig {
                    transactional_rename: false,
                },
            )),
            _dir: None,
        },
    ];
    #[cfg(feature = "redb")]
    {
        let dir = tempfile::tempdir().unwrap();
        let client =
            meditation_server::storage::RedbClient::open(dir.path().join("contract.redb")).unwrap();
        all.push(Backend {
            label: "redb",
            store: Arc::new(KvMeditationStore::new(Arc::new(client))),
            _dir: Some(dir),
        });
    }
    all
}

fn med(id: &str, owner: &str, name: &str, url: &str) -> Meditation {
    Meditation::with_id(id, owner, name, url)
}

fn as_set(records: Vec<Meditation>) -> HashSet<Meditation> {
    records.into_iter().collect()
}

#[tokio::test]
async fn save_then_get_returns_equal_record() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        b.store.save(m.clone()).await.unwrap();
        assert_eq!(b.store.get("u1", "a1").await.unwrap(), m, "{}", b.label);
    }
}

#[tokio::test]
async fn save_then_list_contains_exactly_one_copy() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        b.store.save(m.clone()).await.unwrap();
        b.store.save(m.clone()).await.unwrap();

        let listed = b.store.list("u1").await.unwrap();
        assert_eq!(listed, vec![m], "{}", b.label);
    }
}

#[tokio::test]
async fn list_of_unknown_owner_is_empty() {
    for b in backends() {
        assert!(b.store.list("nobody").await.unwrap().is_empty(), "{}", b.label);
    }
}

#[tokio::test]
async fn unknown_ids_are_not_found_and_change_nothing() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        b.store.save(m.clone()).await.unwrap();

        let cases = [("nobody", "a1"), ("u1", "missing")];
        for (owner, id) in cases {
            assert!(b.store.get(owner, id).await.unwrap_err().is_not_found());
            assert!(b.store.delete(owner, id).await.unwrap_err().is_not_found());
            let ghost = med(id, owner, "ghost", "http://g");
            assert!(b.store.update(ghost).await.unwrap_err().is_not_found());
        }

        assert_eq!(b.store.list("u1").await.unwrap(), vec![m], "{}", b.label);
        assert!(b.store.list("nobody").await.unwrap().is_empty(), "{}", b.label);
    }
}

#[tokio::test]
async fn not_found_reports_missing_owner_separately() {
    for b in backends() {
        let err = b.store.get("nobody", "a1").await.unwrap_err();
        assert!(
            matches!(err, StoreError::NotFound { id: None, .. }),
            "{}: {err:?}",
            b.label
        );

        b.store.save(med("a1", "u1", "calm", "http://x")).await.unwrap();
        let err = b.store.get("u1", "zz").await.unwrap_err();
        assert!(
            matches!(err, StoreError::NotFound { id: Some(ref id), .. } if id == "zz"),
            "{}: {err:?}",
            b.label
        );
    }
}

#[tokio::test]
async fn delete_removes_only_the_target() {
    for b in backends() {
        let records: Vec<Meditation> = (0..5)
            .map(|i| med(&format!("id{i}"), "u1", &format!("n{i}"), "http://x"))
            .collect();
        for r in &records {
            b.store.save(r.clone()).await.unwrap();
        }

        b.store.delete("u1", "id2").await.unwrap();

        let expected: HashSet<Meditation> =
            records.into_iter().filter(|r| r.id != "id2").collect();
        assert_eq!(as_set(b.store.list("u1").await.unwrap()), expected, "{}", b.label);
        assert!(b.store.get("u1", "id2").await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn url_only_update_keeps_identity_without_duplicates() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        b.store.save(m.clone()).await.unwrap();

        b.store.update(m.with_audio_url("http://y")).await.unwrap();

        let got = b.store.get("u1", "a1").await.unwrap();
        assert_eq!(got.id, "a1", "{}", b.label);
        assert_eq!(got.name, "calm", "{}", b.label);
        assert_eq!(got.audio_url, "http://y", "{}", b.label);
        assert_eq!(b.store.list("u1").await.unwrap().len(), 1, "{}", b.label);
    }
}

#[tokio::test]
async fn rename_leaves_exactly_one_entry() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        let other = med("b1", "u1", "calm", "http://z");
        b.store.save(m.clone()).await.unwrap();
        b.store.save(other.clone()).await.unwrap();

        b.store.update(m.renamed("calm2")).await.unwrap();

        let listed = b.store.list("u1").await.unwrap();
        let for_a1: Vec<&Meditation> = listed.iter().filter(|r| r.id == "a1").collect();
        assert_eq!(for_a1.len(), 1, "{}", b.label);
        assert_eq!(for_a1[0].name, "calm2", "{}", b.label);
        assert!(!listed.iter().any(|r| r.id == "a1" && r.name == "calm"));
        assert!(listed.contains(&other), "{}", b.label);
        assert_eq!(b.store.get("u1", "a1").await.unwrap().name, "calm2");
    }
}

#[tokio::test]
async fn same_display_name_is_allowed_for_different_ids() {
    for b in backends() {
        let a = med("a1", "u1", "calm", "http://a");
        let c = med("c1", "u1", "calm", "http://c");
        b.store.save(a.clone()).await.unwrap();
        b.store.save(c.clone()).await.unwrap();

        assert_eq!(
            as_set(b.store.list("u1").await.unwrap()),
            as_set(vec![a, c]),
            "{}",
            b.label
        );
    }
}

#[tokio::test]
async fn owners_are_isolated() {
    for b in backends() {
        let mine = med("a1", "u1", "calm", "http://x");
        let theirs = med("a1", "u2", "calm", "http://other");
        b.store.save(mine.clone()).await.unwrap();
        b.store.save(theirs.clone()).await.unwrap();

        b.store.update(mine.renamed("mine2")).await.unwrap();
        assert_eq!(b.store.get("u2", "a1").await.unwrap(), theirs, "{}", b.label);

        b.store.delete("u1", "a1").await.unwrap();
        assert_eq!(b.store.list("u2").await.unwrap(), vec![theirs], "{}", b.label);
        assert!(b.store.list("u1").await.unwrap().is_empty(), "{}", b.label);
    }
}

#[tokio::test]
async fn walkthrough_save_rename_delete() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        b.store.save(m.clone()).await.unwrap();
        assert_eq!(b.store.list("u1").await.unwrap(), vec![m.clone()]);

        let renamed = m.renamed("calm2");
        b.store.update(renamed.clone()).await.unwrap();
        assert_eq!(b.store.get("u1", "a1").await.unwrap(), renamed);
        assert_eq!(b.store.list("u1").await.unwrap().len(), 1, "{}", b.label);

        b.store.delete("u1", "a1").await.unwrap();
        assert!(b.store.get("u1", "a1").await.unwrap_err().is_not_found());
        assert!(b.store.list("u1").await.unwrap().is_empty(), "{}", b.label);
    }
}

#[tokio::test]
async fn names_containing_the_separator_round_trip() {
    for b in backends() {
        let m = med("a1", "u1", "morning/long", "http://x");
        b.store.save(m.clone()).await.unwrap();
        b.store.update(m.renamed("evening/short")).await.unwrap();

        let got = b.store.get("u1", "a1").await.unwrap();
        assert_eq!(got.name, "evening/short", "{}", b.label);
        assert_eq!(b.store.list("u1").await.unwrap().len(), 1, "{}", b.label);
    }
}

#[tokio::test]
async fn resaving_an_id_under_a_new_name_depends_on_backend() {
    for b in backends() {
        let m = med("a1", "u1", "calm", "http://x");
        b.store.save(m.clone()).await.unwrap();
        b.store.save(m.renamed("zen")).await.unwrap();

        let listed = b.store.list("u1").await.unwrap();
        if b.store.backend_name() == "memory" {
            assert_eq!(listed, vec![m.renamed("zen")], "{}", b.label);
        } else {
            assert_eq!(
                as_set(listed),
                as_set(vec![m.clone(), m.renamed("zen")]),
                "{}",
                b.label
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn saved_sets_are_listed_back(
        names in proptest::collection::vec("[a-z/]{0,8}", 1..12),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            for b in backends() {
                let records: Vec<Meditation> = names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| med(&format!("id{i}"), "u1", n, "http://x"))
                    .collect();
                for r in &records {
                    b.store.save(r.clone()).await.unwrap();
                }
                let listed = b.store.list("u1").await.unwrap();
                assert_eq!(listed.len(), records.len(), "{}", b.label);
                assert_eq!(as_set(listed), as_set(records), "{}", b.label);
            }
        });
    }
}
