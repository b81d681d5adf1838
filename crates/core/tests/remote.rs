//! Behaviour of cloud-side operations against the in-memory store

use std::sync::Arc;

use gsw_core::{
    BatchExecutor, Client, CopyOptions, Error, ExecutorConfig, MemoryStore, ObjectStore,
};

const BUCKET: &str = "bucket";
const PREFIX: &str = "prefix";

const TREE: &[&str] = &[
    "d1/d11/f111",
    "d1/d11/f112",
    "d1/f11",
    "d2/f21",
    "d2/f22",
    "d3/d31/d311/f3111",
    "d3/d31/d312/f3131",
    "d3/d31/d312/f3132",
    "d3/d32/f321",
    "play/d1/ff",
    "play/d2/ff",
    "play/test1",
];

async fn setup() -> (Client, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.create_bucket(BUCKET).unwrap();
    store.create_bucket("other").unwrap();
    for key in TREE {
        store
            .put_object_bytes(BUCKET, &format!("{PREFIX}/{key}"), b"test file".to_vec())
            .await
            .unwrap();
    }
    let executor = BatchExecutor::new(&ExecutorConfig {
        max_workers: Some(4),
    });
    let client = Client::new(Arc::clone(&store) as Arc<dyn ObjectStore>, executor);
    (client, store)
}

fn url(path: &str) -> String {
    format!("gs://{BUCKET}/{PREFIX}/{path}")
}

fn recursive() -> CopyOptions {
    CopyOptions {
        recursive: true,
        ..Default::default()
    }
}

fn keys_under(store: &MemoryStore, dir: &str) -> Vec<String> {
    let prefix = format!("{PREFIX}/{dir}");
    store
        .keys(BUCKET)
        .unwrap()
        .into_iter()
        .filter(|k| k.starts_with(&prefix))
        .map(|k| k[PREFIX.len() + 1..].to_string())
        .collect()
}

#[tokio::test]
async fn ls_lists_objects_then_prefixes() {
    let (client, _) = setup().await;

    let listed = client.ls(&url("d1"), false).await.unwrap();
    assert_eq!(listed, vec![url("d1/f11"), url("d1/d11/")]);

    let listed = client.ls(&url("d1/"), false).await.unwrap();
    assert_eq!(listed, vec![url("d1/f11"), url("d1/d11/")]);

    let listed = client.ls(&url("play"), false).await.unwrap();
    assert_eq!(listed, vec![url("play/test1"), url("play/d1/"), url("play/d2/")]);
}

#[tokio::test]
async fn ls_recursive_lists_every_object() {
    let (client, _) = setup().await;

    let listed = client.ls(&url("d3"), true).await.unwrap();
    assert_eq!(
        listed,
        vec![
            url("d3/d31/d311/f3111"),
            url("d3/d31/d312/f3131"),
            url("d3/d31/d312/f3132"),
            url("d3/d32/f321"),
        ]
    );
}

#[tokio::test]
async fn ls_does_not_match_sibling_prefixes() {
    let (client, _) = setup().await;

    let err = client.ls(&url("d"), false).await.unwrap_err();
    assert!(matches!(err, Error::NoMatch(_)));
}

#[tokio::test]
async fn cp_recursive_trailing_separator_matrix() {
    let cases = [
        ("d1", "dtest/", "dtest/d1/"),
        ("d1/", "dtest/", "dtest/d1/"),
        ("d1", "dtest", "dtest/"),
        ("d1/", "dtest", "dtest/"),
    ];

    for (src, dst, expected_root) in cases {
        let (client, store) = setup().await;
        client.cp(&url(src), &url(dst), recursive()).await.unwrap();

        let mut copied = keys_under(&store, "dtest");
        copied.sort();
        let mut expected: Vec<String> = ["d11/f111", "d11/f112", "f11"]
            .iter()
            .map(|rest| format!("{expected_root}{rest}"))
            .collect();
        expected.sort();
        assert_eq!(copied, expected, "cp -r {src} {dst}");
    }
}

#[tokio::test]
async fn cp_single_object_rename_or_nest() {
    let cases = [
        ("d3/d31/d311/f3111", "ftest", "ftest"),
        ("d3/d31/d311/f3111", "ftest/", "ftest/f3111"),
        ("d1/f11", "ftest", "ftest"),
        ("d1/f11", "ftest/", "ftest/f11"),
    ];

    for options in [CopyOptions::default(), recursive()] {
        for (src, dst, expected) in cases {
            let (client, store) = setup().await;
            client.cp(&url(src), &url(dst), options).await.unwrap();
            assert_eq!(keys_under(&store, "ftest"), vec![expected.to_string()]);
        }
    }
}

#[tokio::test]
async fn cp_non_recursive_directory_is_ambiguous() {
    let (client, store) = setup().await;
    let before = store.keys(BUCKET).unwrap();

    for src in ["d1", "d1/", "d2"] {
        for dst in ["dtest", "dtest/"] {
            let err = client
                .cp(&url(src), &url(dst), CopyOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, Error::AmbiguousCopy { .. }), "cp {src} {dst}");
        }
    }
    assert_eq!(store.keys(BUCKET).unwrap(), before);
}

#[tokio::test]
async fn cp_non_recursive_directory_with_one_file() {
    let (client, store) = setup().await;
    store
        .put_object_bytes(BUCKET, &format!("{PREFIX}/single/only"), b"x".to_vec())
        .await
        .unwrap();

    client
        .cp(&url("single"), &url("dtest/"), CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(keys_under(&store, "dtest"), vec!["dtest/single/only"]);
}

#[tokio::test]
async fn cp_no_clobber_keeps_update_time() {
    let (client, store) = setup().await;
    let src = url("d1/d11/f111");
    let dst = url("play/d2/ff");
    let src_key = format!("{PREFIX}/d1/d11/f111");
    let dst_key = format!("{PREFIX}/play/d2/ff");

    let src_before = store.head_object(BUCKET, &src_key).await.unwrap().unwrap();
    let dst_before = store.head_object(BUCKET, &dst_key).await.unwrap().unwrap();

    let options = CopyOptions {
        no_clobber: true,
        ..Default::default()
    };
    for _ in 0..2 {
        let report = client.cp(&src, &dst, options).await.unwrap();
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.copied().count(), 0);
    }

    let src_after = store.head_object(BUCKET, &src_key).await.unwrap().unwrap();
    let dst_after = store.head_object(BUCKET, &dst_key).await.unwrap().unwrap();
    assert_eq!(src_before.last_modified, src_after.last_modified);
    assert_eq!(dst_before.last_modified, dst_after.last_modified);
}

#[tokio::test]
async fn cp_clobber_changes_update_time() {
    let (client, store) = setup().await;
    let dst_key = format!("{PREFIX}/play/d2/ff");
    let src = url("d1/d11/f111");
    let dst = url("play/d2/ff");

    client.cp(&src, &dst, CopyOptions::default()).await.unwrap();
    let first = store.head_object(BUCKET, &dst_key).await.unwrap().unwrap();

    let report = client.cp(&src, &dst, CopyOptions::default()).await.unwrap();
    assert_eq!(report.copied().count(), 1);
    let second = store.head_object(BUCKET, &dst_key).await.unwrap().unwrap();
    assert_ne!(first.last_modified, second.last_modified);
}

#[tokio::test]
async fn cp_between_buckets_keeps_metadata() {
    let (client, store) = setup().await;
    let key = format!("{PREFIX}/d1/f11");
    let mut metadata = std::collections::HashMap::new();
    metadata.insert("owner".to_string(), "tests".to_string());
    store.patch_metadata(BUCKET, &key, metadata).await.unwrap();

    client
        .cp(&url("d1/f11"), "gs://other/copied", CopyOptions::default())
        .await
        .unwrap();

    let copied = store.head_object("other", "copied").await.unwrap().unwrap();
    assert_eq!(copied.metadata.get("owner").map(String::as_str), Some("tests"));
}

#[tokio::test]
async fn cp_sequential_matches_parallel() {
    let (parallel_client, parallel_store) = setup().await;
    let (sequential_client, sequential_store) = setup().await;

    parallel_client
        .cp(&url("d3"), &url("dtest/"), recursive())
        .await
        .unwrap();
    sequential_client
        .cp(
            &url("d3"),
            &url("dtest/"),
            CopyOptions {
                recursive: true,
                parallel: false,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        keys_under(&parallel_store, "dtest"),
        keys_under(&sequential_store, "dtest")
    );
}

#[tokio::test]
async fn cp_many_to_many() {
    let (client, store) = setup().await;
    let pairs = vec![
        (url("d1"), url("many/a/")),
        (url("d2/f21"), url("many/b")),
        (url("play/"), url("many/c")),
    ];

    let report = client.cp_many_to_many(&pairs, recursive()).await.unwrap();
    assert_eq!(report.len(), 7);

    let mut copied = keys_under(&store, "many");
    copied.sort();
    assert_eq!(
        copied,
        vec![
            "many/a/d1/d11/f111",
            "many/a/d1/d11/f112",
            "many/a/d1/f11",
            "many/b",
            "many/c/d1/ff",
            "many/c/d2/ff",
            "many/c/test1",
        ]
    );
}

#[tokio::test]
async fn cp_many_to_many_plans_before_copying() {
    let (client, store) = setup().await;
    let pairs = vec![
        (url("d1"), url("many/")),
        (url("missing"), url("many/")),
    ];

    let err = client.cp_many_to_many(&pairs, recursive()).await.unwrap_err();
    assert!(matches!(err, Error::NoMatch(_)));
    assert!(keys_under(&store, "many").is_empty());
}

#[tokio::test]
async fn cp_recursive_copies_keys_with_empty_and_dot_segments() {
    let (client, store) = setup().await;
    for key in ["odd/a//b", "odd/./x"] {
        store
            .put_object_bytes(BUCKET, &format!("{PREFIX}/{key}"), b"odd".to_vec())
            .await
            .unwrap();
    }

    let report = client
        .cp(&url("odd"), &url("normalized"), recursive())
        .await
        .unwrap();

    assert_eq!(report.copied().count(), 2);
    let mut copied = keys_under(&store, "normalized");
    copied.sort();
    assert_eq!(copied, vec!["normalized/a/b", "normalized/x"]);
}

#[tokio::test]
async fn rm_requires_exact_object_without_recursive() {
    let (client, store) = setup().await;

    let err = client.rm(&url("d1"), false, true).await.unwrap_err();
    assert!(matches!(err, Error::NoMatch(_)));
    assert_eq!(keys_under(&store, "d1").len(), 3);

    let removed = client.rm(&url("d1/f11"), false, true).await.unwrap();
    assert_eq!(removed, vec![url("d1/f11")]);
    assert_eq!(keys_under(&store, "d1").len(), 2);
}

#[tokio::test]
async fn rm_recursive_removes_children_and_exact_object() {
    let (client, store) = setup().await;
    store
        .put_object_bytes(BUCKET, &format!("{PREFIX}/d2"), b"x".to_vec())
        .await
        .unwrap();

    let removed = client.rm(&url("d2"), true, true).await.unwrap();
    assert_eq!(removed.len(), 3);
    assert!(keys_under(&store, "d2").is_empty());
    assert_eq!(keys_under(&store, "d1").len(), 3);

    let err = client.rm(&url("d2"), true, false).await.unwrap_err();
    assert!(matches!(err, Error::NoMatch(_)));
}

#[tokio::test]
async fn rm_trailing_separator_removes_directory_placeholder() {
    let (client, store) = setup().await;
    store
        .put_object_bytes(BUCKET, &format!("{PREFIX}/d1/"), Vec::new())
        .await
        .unwrap();

    let removed = client.rm(&url("d1/"), false, true).await.unwrap();
    assert_eq!(removed, vec![url("d1/")]);
    let mut left = keys_under(&store, "d1");
    left.sort();
    assert_eq!(left, vec!["d1/d11/f111", "d1/d11/f112", "d1/f11"]);

    let err = client.rm(&url("d1/"), false, true).await.unwrap_err();
    assert!(matches!(err, Error::NoMatch(_)));

    store
        .put_object_bytes(BUCKET, &format!("{PREFIX}/d1/"), Vec::new())
        .await
        .unwrap();
    let removed = client.rm(&url("d1/"), true, true).await.unwrap();
    assert_eq!(removed.len(), 4);
    assert!(keys_under(&store, "d1").is_empty());
}

#[tokio::test]
async fn stat_and_text_round_trip() {
    let (client, _) = setup().await;
    let address = url("notes.txt");

    assert!(client.stat(&address).await.unwrap().is_none());
    client.write_text(&address, "hello gsw").await.unwrap();

    let stat = client.stat(&address).await.unwrap().unwrap();
    assert_eq!(stat.content_length, Some(9));
    assert_eq!(stat.content_type.as_deref(), Some("text/plain"));
    assert!(stat.update_time.is_some());
    assert!(stat.posix.is_none());
    assert_eq!(client.read_text(&address).await.unwrap(), "hello gsw");
}

#[tokio::test]
async fn md5_hexdigests_in_input_order() {
    let (client, _) = setup().await;
    client.write_text(&url("hello"), "hello world").await.unwrap();

    let digests = client
        .md5_hexdigests(&[url("hello"), url("missing"), url("d1/f11")], true)
        .await
        .unwrap();
    assert_eq!(
        digests,
        vec![
            Some("5eb63bbbe01eeed093cb22bb8f5acdc3".to_string()),
            None,
            digests[2].clone(),
        ]
    );
    assert!(digests[2].is_some());
}
