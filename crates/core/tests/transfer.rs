//! Uploads, downloads and local copies against the in-memory store

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gsw_core::{Client, CopyOptions, Error, MemoryStore, ObjectStore};
use tempfile::TempDir;

const BUCKET: &str = "bucket";

const TREE: &[&str] = &["d1/d11/f111", "d1/d11/f112", "d1/f11", "d2/f21"];

fn local_tree(root: &Path) {
    for file in TREE {
        let path = root.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "test file").unwrap();
    }
}

async fn setup() -> (Client, Arc<MemoryStore>, TempDir) {
    let store = Arc::new(MemoryStore::new());
    store.create_bucket(BUCKET).unwrap();
    for key in TREE {
        store
            .put_object_bytes(BUCKET, &format!("remote/{key}"), b"test file".to_vec())
            .await
            .unwrap();
    }
    let client = Client::with_store(Arc::clone(&store) as Arc<dyn ObjectStore>);
    (client, store, TempDir::new().unwrap())
}

fn recursive() -> CopyOptions {
    CopyOptions {
        recursive: true,
        ..Default::default()
    }
}

fn local_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walk(root)
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap().display().to_string())
        .collect();
    files.sort();
    files
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(walk(&path));
            } else {
                out.push(path);
            }
        }
    }
    out
}

fn keys_with(store: &MemoryStore, prefix: &str) -> Vec<String> {
    store
        .keys(BUCKET)
        .unwrap()
        .into_iter()
        .filter(|k| k.starts_with(prefix))
        .collect()
}

#[tokio::test]
async fn upload_trailing_separator_matrix() {
    let cases = [
        ("d1", "gs://bucket/up/", "up/d1/"),
        ("d1/", "gs://bucket/up/", "up/d1/"),
        ("d1", "gs://bucket/up", "up/"),
        ("d1/", "gs://bucket/up", "up/"),
    ];

    for (src, dst, expected_root) in cases {
        let (client, store, temp) = setup().await;
        local_tree(temp.path());
        let src = format!("{}/{src}", temp.path().display());

        client.cp(&src, dst, recursive()).await.unwrap();

        let expected: Vec<String> = ["d11/f111", "d11/f112", "f11"]
            .iter()
            .map(|rest| format!("{expected_root}{rest}"))
            .collect();
        assert_eq!(keys_with(&store, "up/"), expected, "cp -r {src} {dst}");
    }
}

#[tokio::test]
async fn upload_single_file() {
    let (client, store, temp) = setup().await;
    local_tree(temp.path());
    let file = temp.path().join("d1/f11").display().to_string();

    client
        .cp(&file, "gs://bucket/renamed", CopyOptions::default())
        .await
        .unwrap();
    client
        .cp(&file, "gs://bucket/into/", CopyOptions::default())
        .await
        .unwrap();

    assert_eq!(keys_with(&store, "renamed"), vec!["renamed"]);
    assert_eq!(keys_with(&store, "into/"), vec!["into/f11"]);
}

#[tokio::test]
async fn upload_directory_requires_recursive() {
    let (client, _, temp) = setup().await;
    local_tree(temp.path());
    let dir = temp.path().join("d1").display().to_string();

    let err = client
        .cp(&dir, "gs://bucket/up/", CopyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousCopy { .. }));
}

#[tokio::test]
async fn upload_missing_source() {
    let (client, _, temp) = setup().await;
    let missing = temp.path().join("missing").display().to_string();

    let err = client
        .cp(&missing, "gs://bucket/up/", recursive())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SourceMissing(_)));
}

#[tokio::test]
async fn download_trailing_separator_matrix() {
    let cases = [
        ("gs://bucket/remote/d1", "/", "out/d1"),
        ("gs://bucket/remote/d1/", "/", "out/d1"),
        ("gs://bucket/remote/d1", "", "out"),
        ("gs://bucket/remote/d1/", "", "out"),
    ];

    for (src, trailing, expected_root) in cases {
        let (client, _, temp) = setup().await;
        let dst = format!("{}/out{trailing}", temp.path().display());

        client.cp(src, &dst, recursive()).await.unwrap();

        let expected: Vec<String> = ["d11/f111", "d11/f112", "f11"]
            .iter()
            .map(|rest| format!("{expected_root}/{rest}"))
            .collect();
        assert_eq!(local_files(temp.path()), expected, "cp -r {src} {dst}");
    }
}

#[tokio::test]
async fn download_never_writes_outside_destination() {
    let (client, store, temp) = setup().await;
    store
        .put_object_bytes(BUCKET, "remote/d1/../../escaped", b"outside".to_vec())
        .await
        .unwrap();
    let dst = temp.path().join("a/out").display().to_string();

    let report = client.cp("gs://bucket/remote/d1", &dst, recursive()).await.unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(
        local_files(temp.path()),
        vec!["a/out/d11/f111", "a/out/d11/f112", "a/out/f11"]
    );
}

#[tokio::test]
async fn download_single_object() {
    let (client, _, temp) = setup().await;
    let renamed = temp.path().join("renamed").display().to_string();

    client
        .cp("gs://bucket/remote/d1/f11", &renamed, CopyOptions::default())
        .await
        .unwrap();
    // an existing directory receives the object by name
    client
        .cp(
            "gs://bucket/remote/d2/f21",
            &temp.path().display().to_string(),
            CopyOptions::default(),
        )
        .await
        .unwrap();
    // missing parents are created
    let nested = temp.path().join("a/b/c").display().to_string();
    client
        .cp("gs://bucket/remote/d1/f11", &nested, CopyOptions::default())
        .await
        .unwrap();

    assert_eq!(local_files(temp.path()), vec!["a/b/c", "f21", "renamed"]);
    assert_eq!(
        std::fs::read_to_string(temp.path().join("renamed")).unwrap(),
        "test file"
    );
}

#[tokio::test]
async fn download_onto_file_is_not_a_directory() {
    let (client, _, temp) = setup().await;
    let file = temp.path().join("file");
    std::fs::write(&file, "x").unwrap();

    let err = client
        .cp(
            "gs://bucket/remote/d1",
            &file.display().to_string(),
            recursive(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotADirectory(_)));
}

#[tokio::test]
async fn download_no_clobber_keeps_local_file() {
    let (client, _, temp) = setup().await;
    let target = temp.path().join("existing");
    std::fs::write(&target, "local content").unwrap();

    let report = client
        .cp(
            "gs://bucket/remote/d1/f11",
            &target.display().to_string(),
            CopyOptions {
                no_clobber: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.skipped().count(), 1);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "local content");
}

#[cfg(unix)]
#[tokio::test]
async fn preserve_posix_round_trip() {
    use std::fs::FileTimes;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::time::{Duration, SystemTime};

    let (client, _, temp) = setup().await;
    let source = temp.path().join("source");
    std::fs::write(&source, "posix").unwrap();
    std::fs::set_permissions(&source, std::fs::Permissions::from_mode(0o640)).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&source)
        .unwrap()
        .set_times(
            FileTimes::new().set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_560_000_000)),
        )
        .unwrap();
    let options = CopyOptions {
        preserve_posix: true,
        ..Default::default()
    };

    client
        .cp(&source.display().to_string(), "gs://bucket/posix", options)
        .await
        .unwrap();

    let stat = client.stat("gs://bucket/posix").await.unwrap().unwrap();
    let posix = stat.posix.unwrap();
    let local = std::fs::metadata(&source).unwrap();
    assert_eq!(posix.mtime.map(|t| t.as_second()), Some(1_560_000_000));
    assert_eq!(posix.uid, Some(local.uid()));
    assert_eq!(posix.gid, Some(local.gid()));
    assert_eq!(posix.mode, Some(0o640));
    assert!(client.same_mod_time(&source, "gs://bucket/posix").await.unwrap());

    let restored = temp.path().join("restored");
    client
        .cp("gs://bucket/posix", &restored.display().to_string(), options)
        .await
        .unwrap();
    let meta = std::fs::metadata(&restored).unwrap();
    assert_eq!(meta.mtime(), 1_560_000_000);
    assert_eq!(meta.mode() & 0o777, 0o640);
}

#[tokio::test]
async fn same_md5_and_mod_time() {
    let (client, _, temp) = setup().await;
    let file = temp.path().join("f11");
    std::fs::write(&file, "test file").unwrap();

    assert!(client.same_md5(&file, "gs://bucket/remote/d1/f11").await.unwrap());
    std::fs::write(&file, "changed").unwrap();
    assert!(!client.same_md5(&file, "gs://bucket/remote/d1/f11").await.unwrap());

    // uploaded without POSIX metadata
    assert!(!client.same_mod_time(&file, "gs://bucket/remote/d1/f11").await.unwrap());
}

#[tokio::test]
async fn integrity_checks_on_missing_targets() {
    let (client, _, temp) = setup().await;
    let file = temp.path().join("f11");
    std::fs::write(&file, "test file").unwrap();
    let missing_local = temp.path().join("missing");

    assert!(matches!(
        client.same_md5(&file, "gs://bucket/missing").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        client.same_mod_time(&file, "gs://bucket/missing").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        client.same_md5(&missing_local, "gs://bucket/remote/d1/f11").await,
        Err(Error::SourceMissing(_))
    ));
}

#[tokio::test]
async fn local_copies() {
    let (client, _, temp) = setup().await;
    let src = temp.path().join("src");
    local_tree(&src);
    let out = temp.path().join("out");
    std::fs::create_dir(&out).unwrap();
    let (src, out_str) = (src.display().to_string(), out.display().to_string());

    client
        .cp(&format!("{src}/d1"), &out_str, recursive())
        .await
        .unwrap();
    client
        .cp(&format!("{src}/d2/f21"), &out_str, CopyOptions::default())
        .await
        .unwrap();

    assert_eq!(
        local_files(&out),
        vec!["d1/d11/f111", "d1/d11/f112", "d1/f11", "f21"]
    );

    let err = client
        .cp(&format!("{src}/d1"), &out_str, CopyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousCopy { .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn local_directory_copy_preserves_posix() {
    use std::fs::FileTimes;
    use std::os::unix::fs::MetadataExt;
    use std::time::{Duration, SystemTime};

    let (client, _, temp) = setup().await;
    let src = temp.path().join("src");
    local_tree(&src);
    std::fs::File::options()
        .write(true)
        .open(src.join("d1/d11/f111"))
        .unwrap()
        .set_times(
            FileTimes::new().set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_560_000_000)),
        )
        .unwrap();
    let out = temp.path().join("out");
    std::fs::create_dir(&out).unwrap();

    client
        .cp(
            &src.join("d1").display().to_string(),
            &out.display().to_string(),
            CopyOptions {
                recursive: true,
                preserve_posix: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let copied = std::fs::metadata(out.join("d1/d11/f111")).unwrap();
    assert_eq!(copied.mtime(), 1_560_000_000);
}

#[tokio::test]
async fn local_copy_no_clobber_is_silent() {
    let (client, _, temp) = setup().await;
    let src = temp.path().join("src");
    let dst = temp.path().join("dst");
    std::fs::write(&src, "new").unwrap();
    std::fs::write(&dst, "old").unwrap();

    let report = client
        .cp(
            &src.display().to_string(),
            &dst.display().to_string(),
            CopyOptions {
                no_clobber: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(report.skipped().count(), 1);
    assert_eq!(std::fs::read_to_string(&dst).unwrap(), "old");
}
