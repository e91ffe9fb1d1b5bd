//! Discovery of repositories nested in a working tree.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Directories below `root` that are repositories of their own (contain a
/// `.git` entry), relative to `root`, `/`-separated and sorted.
///
/// Only direct nesting is reported: a repository inside another nested
/// repository belongs to that one. Symlinks are not followed and ignore files
/// are not honored, so vendored checkouts are found too.
#[must_use]
pub fn find_nested_repositories(root: &Path) -> Vec<String> {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false);
    builder.hidden(false);
    builder.follow_links(false);
    builder.sort_by_file_name(|a, b| a.cmp(b));
    builder.filter_entry(|entry| entry.file_name() != ".git");

    let mut found: Vec<PathBuf> = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(root = %root.display(), %error, "skipping unreadable entry");
                continue;
            }
        };
        if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
            continue;
        }
        if !entry.path().join(".git").exists() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if found.iter().any(|outer| relative.starts_with(outer)) {
            continue;
        }
        found.push(relative.to_path_buf());
    }

    let mut nested: Vec<String> = found
        .iter()
        .map(|path| {
            path.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    nested.sort();
    nested
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fake_repo(path: &Path) {
        std::fs::create_dir_all(path.join(".git")).unwrap();
    }

    #[test]
    fn only_direct_nesting_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fake_repo(root);
        fake_repo(&root.join("vendor/a"));
        fake_repo(&root.join("vendor/a/inner"));
        fake_repo(&root.join("libs/b"));
        std::fs::create_dir_all(root.join("src/plain")).unwrap();

        assert_eq!(
            find_nested_repositories(root),
            vec!["libs/b".to_string(), "vendor/a".to_string()]
        );
        assert_eq!(
            find_nested_repositories(&root.join("vendor/a")),
            vec!["inner".to_string()]
        );
    }

    #[test]
    fn gitlink_files_count_as_repositories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("modules/sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join(".git"), "gitdir: ../../.git/modules/sub\n").unwrap();

        assert_eq!(find_nested_repositories(dir.path()), vec!["modules/sub".to_string()]);
    }
}
