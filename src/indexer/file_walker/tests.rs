//! Tests for FileWalker

use super::*;
use crate::error::RagError;
use crate::indexer::Language;
use std::fs;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn relative_names(root: &Path, files: &[PathBuf]) -> Vec<String> {
    let root = root.canonicalize().unwrap();
    files
        .iter()
        .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

fn indexing_error(err: anyhow::Error) -> IndexingError {
    match RagError::from(err) {
        RagError::Indexing(e) => e,
        other => panic!("expected an indexing error, got {:?}", other),
    }
}

#[test]
fn test_new() {
    let walker = FileWalker::new("/tmp");
    assert_eq!(walker.root, PathBuf::from("/tmp"));
    assert_eq!(walker.max_file_size, DEFAULT_MAX_FILE_SIZE);
}

#[test]
fn test_with_max_file_size() {
    let walker = FileWalker::new("/tmp").with_max_file_size(1024);
    assert_eq!(walker.max_file_size, 1024);
}

#[test]
fn test_discover_nonexistent_path() {
    let err = FileWalker::new("/nonexistent/path/12345").discover().unwrap_err();
    assert!(matches!(indexing_error(err), IndexingError::InvalidPath(_)));
}

#[test]
fn test_discover_single_supported_file() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "main.rs", "fn main() {}\n");

    let files = FileWalker::new(temp_dir.path().join("main.rs"))
        .discover()
        .unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].is_absolute());
    assert!(files[0].ends_with("main.rs"));
}

#[test]
fn test_discover_single_unsupported_file() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "photo.png", "not really a png");

    let err = FileWalker::new(temp_dir.path().join("photo.png"))
        .discover()
        .unwrap_err();
    let err = indexing_error(err);
    assert!(matches!(err, IndexingError::UnsupportedFileType(_)));
}

#[test]
fn test_discover_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let err = FileWalker::new(temp_dir.path()).discover().unwrap_err();
    assert!(matches!(
        indexing_error(err),
        IndexingError::NoSourceFilesFound(_)
    ));
}

#[test]
fn test_discover_only_unsupported_files() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "notes.txt", "hello");
    write(temp_dir.path(), "logo.svg", "<svg/>");

    let err = FileWalker::new(temp_dir.path()).discover().unwrap_err();
    assert!(matches!(
        indexing_error(err),
        IndexingError::NoSourceFilesFound(_)
    ));
}

#[test]
fn test_discover_sorted_output() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "src/zeta.ts", "export const z = 1;\n");
    write(temp_dir.path(), "src/alpha.ts", "export const a = 1;\n");
    write(temp_dir.path(), "lib/util.py", "def f():\n    pass\n");
    write(temp_dir.path(), "Makefile", "all:\n\techo hi\n");

    let files = FileWalker::new(temp_dir.path()).discover().unwrap();
    assert_eq!(
        relative_names(temp_dir.path(), &files),
        vec!["Makefile", "lib/util.py", "src/alpha.ts", "src/zeta.ts"]
    );
    assert!(files.iter().all(|f| f.is_absolute()));
}

#[test]
fn test_discover_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..20 {
        write(temp_dir.path(), &format!("m{}/file{}.go", i % 3, i), "package main\n");
    }

    let first = FileWalker::new(temp_dir.path()).discover().unwrap();
    let second = FileWalker::new(temp_dir.path()).discover().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_discover_skips_builtin_ignores() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "src/index.js", "console.log(1);\n");
    write(temp_dir.path(), "node_modules/react/index.js", "module.exports = {};\n");
    write(temp_dir.path(), "target/debug/build/out.rs", "fn x() {}\n");
    write(temp_dir.path(), "dist/bundle.min.js", "var a;\n");
    write(temp_dir.path(), "public/app.min.js", "var a;\n");
    write(temp_dir.path(), "api.generated.ts", "export {};\n");

    let files = FileWalker::new(temp_dir.path()).discover().unwrap();
    assert_eq!(relative_names(temp_dir.path(), &files), vec!["src/index.js"]);
}

#[test]
fn test_discover_respects_gitignore() {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        ".gitignore",
        "# local scratch\nscratch/\n*.local.ts\n",
    );
    write(temp_dir.path(), "src/app.ts", "export const a = 1;\n");
    write(temp_dir.path(), "src/app.local.ts", "export const b = 1;\n");
    write(temp_dir.path(), "scratch/try.ts", "export const c = 1;\n");
    // trailing-slash rules only apply at the root
    write(temp_dir.path(), "src/scratch/keep.ts", "export const d = 1;\n");

    let files = FileWalker::new(temp_dir.path()).discover().unwrap();
    assert_eq!(
        relative_names(temp_dir.path(), &files),
        vec!["src/app.ts", "src/scratch/keep.ts"]
    );
}

#[test]
fn test_discover_skips_large_files() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "small.rs", "fn a() {}\n");
    write(temp_dir.path(), "large.rs", &"// padding\n".repeat(200));

    let files = FileWalker::new(temp_dir.path())
        .with_max_file_size(100)
        .discover()
        .unwrap();
    assert_eq!(relative_names(temp_dir.path(), &files), vec!["small.rs"]);
}

#[test]
fn test_discover_with_custom_filter() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "guide.md", "# Guide\n");
    write(temp_dir.path(), "main.rs", "fn main() {}\n");

    let files = FileWalker::new(temp_dir.path())
        .with_filter("document", |p| p.extension().is_some_and(|e| e == "md"))
        .discover()
        .unwrap();
    assert_eq!(relative_names(temp_dir.path(), &files), vec!["guide.md"]);
}

#[test]
fn test_discover_files_collects_mtime_and_language() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "main.py", "print('hi')\n");
    let path = temp_dir.path().join("main.py");
    filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

    let files = FileWalker::new(temp_dir.path()).discover_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].language, Language::Python);
    assert_eq!(files[0].mtime, 1_700_000_000_000.0);
}

#[test]
fn test_stat_files_skips_vanished_files() {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "kept.rs", "fn main() {}\n");

    let files = stat_files(vec![
        temp_dir.path().join("gone.rs"),
        temp_dir.path().join("kept.rs"),
    ]);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, temp_dir.path().join("kept.rs"));
    assert_eq!(files[0].language, Language::Rust);
}

#[cfg(unix)]
#[test]
fn test_symlinked_files_are_discovered() {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    write(outside.path(), "shared.rs", "pub fn shared() {}\n");
    write(outside.path(), "lib/inner.rs", "pub fn inner() {}\n");
    write(temp_dir.path(), "main.rs", "fn main() {}\n");

    symlink(outside.path().join("shared.rs"), temp_dir.path().join("shared.rs")).unwrap();
    symlink(outside.path().join("lib"), temp_dir.path().join("lib")).unwrap();
    symlink(temp_dir.path().join("missing.rs"), temp_dir.path().join("dangling.rs")).unwrap();

    let files = FileWalker::new(temp_dir.path()).discover().unwrap();
    assert_eq!(
        relative_names(temp_dir.path(), &files),
        vec!["main.rs", "shared.rs"]
    );
}
