//! Destination planner
//!
//! Turns a `(source, destination, options)` request into concrete
//! `(source item, destination item)` pairs following gsutil's `cp` naming:
//!
//! - `cp -r d1 dtest/` and `cp -r d1/ dtest/` both produce `dtest/d1/...`
//! - `cp -r d1 dtest` and `cp -r d1/ dtest` both produce `dtest/...`
//!
//! Only the destination's trailing separator decides whether the copied
//! root keeps its own name. Planning reads the store and the local
//! filesystem but never writes.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::listing::delimiter_for;
use crate::local;
use crate::location::ResourceLocation;
use crate::path::{PathState, SEPARATOR};
use crate::traits::{ObjectInfo, ObjectStore};

/// Flags shared by `cp` and `cp_many_to_many`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    /// Copy whole prefixes and directory trees
    pub recursive: bool,
    /// Skip destinations that already exist
    pub no_clobber: bool,
    /// Run unit copies on the worker pool instead of one by one
    pub parallel: bool,
    /// Carry POSIX attributes through object metadata
    pub preserve_posix: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            no_clobber: false,
            parallel: true,
            preserve_posix: false,
        }
    }
}

/// One planned unit copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlanEntry {
    pub source: ResourceLocation,
    pub destination: ResourceLocation,
    /// Set right before execution when no-clobber finds the destination
    pub skip: bool,
}

impl CopyPlanEntry {
    pub fn new(source: ResourceLocation, destination: ResourceLocation) -> Self {
        Self {
            source,
            destination,
            skip: false,
        }
    }
}

/// Outcome of a copy: every planned entry with its skip flag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub entries: Vec<CopyPlanEntry>,
}

impl CopyReport {
    /// Entries that were actually copied
    pub fn copied(&self) -> impl Iterator<Item = &CopyPlanEntry> {
        self.entries.iter().filter(|e| !e.skip)
    }

    /// Entries skipped because the destination already existed
    pub fn skipped(&self) -> impl Iterator<Item = &CopyPlanEntry> {
        self.entries.iter().filter(|e| e.skip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether a destination path is addressed as a directory.
///
/// A bucket root or the current directory always is.
pub fn is_directory_target(path: &PathState) -> bool {
    path.had_trailing_separator() || path.is_root()
}

/// Destination of one item found under `root` (the shared naming rule)
pub fn nested_destination(item: &PathState, root: &PathState, dst: &PathState) -> Result<PathState> {
    let suffix = item
        .strip_base(root)
        .ok_or_else(|| Error::InvalidPath(format!("{item} is not under {root}")))?;
    Ok(suffix_destination(&suffix, root, dst))
}

/// Destination of the item found at `suffix` below `root`.
///
/// Leading separators of `suffix` are dropped so a key like `d1//x` still
/// lands under the destination.
pub fn suffix_destination(suffix: &str, root: &PathState, dst: &PathState) -> PathState {
    let base = if is_directory_target(dst) {
        dst.join(root.name())
    } else {
        dst.clone()
    };
    base.join(suffix.trim_start_matches(SEPARATOR))
}

/// Whether a relative suffix climbs out of its base through `..`
fn escapes_base(suffix: &str) -> bool {
    suffix.split(SEPARATOR).any(|segment| segment == "..")
}

/// Destination of a single object or file: the destination itself, or the
/// source's name under it when addressed as a directory
pub fn single_destination(src: &PathState, dst: &PathState) -> PathState {
    if is_directory_target(dst) {
        dst.join(src.name())
    } else {
        dst.clone()
    }
}

/// Plan a copy between any combination of local and cloud locations
pub async fn plan_copy(
    store: &dyn ObjectStore,
    src: &ResourceLocation,
    dst: &ResourceLocation,
    options: &CopyOptions,
) -> Result<Vec<CopyPlanEntry>> {
    let entries = match (src, dst) {
        (ResourceLocation::Cloud { .. }, _) => plan_from_cloud(store, src, dst, options).await?,
        (ResourceLocation::Local { .. }, ResourceLocation::Cloud { .. }) => {
            plan_upload(src, dst, options).await?
        }
        (ResourceLocation::Local { .. }, ResourceLocation::Local { .. }) => {
            vec![plan_local(src, dst, options)?]
        }
    };
    tracing::debug!(src = %src, dst = %dst, entries = entries.len(), "planned copy");
    Ok(entries)
}

/// What a cloud source resolves to
#[derive(Debug, Default)]
struct CloudSource {
    /// Object named exactly by the source key
    exact: Option<ObjectInfo>,
    /// Objects under `key/`
    nested: Vec<ObjectInfo>,
    /// Common prefixes seen by a non-recursive query
    prefixes: usize,
}

async fn resolve_cloud_source(
    store: &dyn ObjectStore,
    bucket: &str,
    path: &PathState,
    recursive: bool,
) -> Result<CloudSource> {
    let key = path.cloud_key();
    let mut source = CloudSource::default();

    if !key.is_empty() && !path.had_trailing_separator() {
        source.exact = store.head_object(bucket, &key).await?;
        if source.exact.is_some() && !recursive {
            return Ok(source);
        }
    }

    let prefix = path.to_key(true, true, true);
    let result = store
        .list_objects(bucket, &prefix, delimiter_for(recursive))
        .await?;
    source.prefixes = result.prefixes.len();
    source.nested = result
        .objects
        .into_iter()
        .filter(|info| {
            let placeholder = info.key.ends_with(SEPARATOR);
            if placeholder {
                tracing::debug!(key = %info.key, "skipping directory placeholder");
            }
            !placeholder
        })
        .collect();
    Ok(source)
}

async fn plan_from_cloud(
    store: &dyn ObjectStore,
    src: &ResourceLocation,
    dst: &ResourceLocation,
    options: &CopyOptions,
) -> Result<Vec<CopyPlanEntry>> {
    let (ResourceLocation::Cloud { bucket, path: root }, dst_path) = (src, dst.path()) else {
        return Err(Error::InvalidPath(format!("{src} is not a cloud location")));
    };

    let source = resolve_cloud_source(store, bucket, root, options.recursive).await?;
    // listed keys carry no leading separator
    let root = PathState::new(&root.cloud_key());
    let ambiguous = || Error::AmbiguousCopy {
        src: src.to_string(),
        dst: dst.to_string(),
    };

    // fan-out guard: objects and subdirectories both count as matches
    if source.exact.is_none() {
        let matched = source.nested.len() + source.prefixes;
        if matched == 0 {
            return Err(Error::NoMatch(src.to_string()));
        }
        if !options.recursive && (matched > 1 || source.nested.is_empty()) {
            return Err(ambiguous());
        }
    }

    let local_dst = (!dst.is_cloud()).then(|| PathBuf::from(dst_path.local_path()));
    if !source.nested.is_empty() {
        if let Some(path) = local_dst.as_deref().filter(|p| p.is_file()) {
            return Err(Error::NotADirectory(path.display().to_string()));
        }
    }

    let mut entries = Vec::with_capacity(source.nested.len() + 1);
    if let Some(info) = &source.exact {
        let item = PathState::object_key(&info.key);
        let target = match local_dst.as_deref() {
            Some(dir) if dir.is_dir() => dst_path.join(item.name()),
            _ => single_destination(&item, dst_path),
        };
        entries.push(CopyPlanEntry::new(
            src.with_path(item),
            dst.with_path(target),
        ));
    }
    let prefix = root.to_key(true, false, true);
    for info in &source.nested {
        let suffix = info.key.strip_prefix(&prefix).ok_or_else(|| {
            Error::InvalidPath(format!("{} is not under {prefix}", info.key))
        })?;
        if local_dst.is_some() && escapes_base(suffix) {
            tracing::warn!(key = %info.key, "skipping object whose name leaves the destination");
            continue;
        }
        let target = suffix_destination(suffix, &root, dst_path);
        entries.push(CopyPlanEntry::new(
            src.with_path(PathState::object_key(&info.key)),
            dst.with_path(target),
        ));
    }
    Ok(entries)
}

async fn plan_upload(
    src: &ResourceLocation,
    dst: &ResourceLocation,
    options: &CopyOptions,
) -> Result<Vec<CopyPlanEntry>> {
    let root = src.path();
    let local_root = PathBuf::from(root.local_path());
    let meta = source_metadata(&local_root).await?;

    if meta.is_file() {
        let target = single_destination(root, dst.path());
        return Ok(vec![CopyPlanEntry::new(src.clone(), dst.with_path(target))]);
    }
    if !options.recursive {
        return Err(Error::AmbiguousCopy {
            src: src.to_string(),
            dst: dst.to_string(),
        });
    }

    let walk_root = local_root.clone();
    let files = tokio::task::spawn_blocking(move || local::walk_files(&walk_root))
        .await
        .map_err(|e| Error::General(format!("directory walk failed: {e}")))??;
    if files.is_empty() {
        return Err(Error::NoMatch(src.to_string()));
    }

    files
        .iter()
        .map(|file| {
            let item = PathState::new(&file.to_string_lossy());
            let target = nested_destination(&item, root, dst.path())?;
            Ok(CopyPlanEntry::new(
                src.with_path(item),
                dst.with_path(target),
            ))
        })
        .collect()
}

fn plan_local(
    src: &ResourceLocation,
    dst: &ResourceLocation,
    options: &CopyOptions,
) -> Result<CopyPlanEntry> {
    let source = PathBuf::from(src.path().local_path());
    let target = PathBuf::from(dst.path().local_path());

    if source.is_file() {
        let destination = if target.is_dir() {
            dst.path().join(src.path().name())
        } else {
            dst.path().clone()
        };
        return Ok(CopyPlanEntry::new(src.clone(), dst.with_path(destination)));
    }
    if !source.exists() {
        return Err(Error::SourceMissing(src.to_string()));
    }
    if !options.recursive {
        return Err(Error::AmbiguousCopy {
            src: src.to_string(),
            dst: dst.to_string(),
        });
    }
    let destination = dst.path().join(src.path().name());
    Ok(CopyPlanEntry::new(src.clone(), dst.with_path(destination)))
}

async fn source_metadata(path: &Path) -> Result<std::fs::Metadata> {
    tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::SourceMissing(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })
}
