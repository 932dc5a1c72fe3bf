//! Git SHA discovery
//!
//! CI systems export the commit directly; otherwise the SHA is read from the
//! repository on disk without shelling out to `git`:
//! `HEAD` → loose ref → `packed-refs`. Linked worktrees (`.git` is a file
//! holding `gitdir: <path>`) are followed, and refs are looked up in the
//! common directory when the worktree names one.

use crate::error::{ReportError, ReportResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables holding the commit SHA, in lookup order
pub const SHA_ENV_VARS: [&str; 3] = ["GITHUB_SHA", "GIT_COMMIT", "CI_COMMIT_SHA"];

/// Find the git directory for `start` or its nearest ancestor
pub fn find_git_dir(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if candidate.is_file() {
            let content = fs::read_to_string(&candidate).ok()?;
            let target = content.trim().strip_prefix("gitdir:")?.trim();
            return Some(dir.join(target));
        }
    }
    None
}

/// Commit SHA for the repository containing `start`
///
/// Environment variables win over the repository. Returns `None` outside a
/// repository or when the ref cannot be resolved.
pub fn read_git_sha<F>(start: &Path, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(sha) = SHA_ENV_VARS
        .iter()
        .find_map(|key| lookup(*key).filter(|v| !v.is_empty()))
    {
        return Some(sha);
    }

    let git_dir = find_git_dir(start)?;
    match resolve_head(&git_dir) {
        Ok(sha) => sha,
        Err(e) => {
            debug!(
                target: "stories::report",
                git_dir = %git_dir.display(),
                error = %e,
                "Could not resolve HEAD"
            );
            None
        }
    }
}

fn resolve_head(git_dir: &Path) -> ReportResult<Option<String>> {
    let head = fs::read_to_string(git_dir.join("HEAD"))?;
    let head = head.trim();

    let Some(reference) = head.strip_prefix("ref:") else {
        // Detached HEAD holds the SHA itself.
        return Ok(Some(head.to_string()));
    };
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ReportError::config("HEAD points to an empty ref"));
    }
    if !is_ref_name(reference) {
        return Err(ReportError::config(format!(
            "HEAD points outside refs/: {}",
            reference
        )));
    }

    let common_dir = match fs::read_to_string(git_dir.join("commondir")) {
        Ok(relative) => git_dir.join(relative.trim()),
        Err(_) => git_dir.to_path_buf(),
    };

    for dir in [git_dir, common_dir.as_path()] {
        if let Ok(sha) = fs::read_to_string(dir.join(reference)) {
            return Ok(Some(sha.trim().to_string()));
        }
    }

    let packed = match fs::read_to_string(common_dir.join("packed-refs")) {
        Ok(packed) => packed,
        Err(_) => return Ok(None),
    };
    Ok(packed
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| name.trim() == reference)
        .map(|(sha, _)| sha.to_string()))
}

/// A relative path under `refs/` with no empty, `.` or `..` segments
fn is_ref_name(reference: &str) -> bool {
    reference.starts_with("refs/")
        && reference
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn repo_with_head(head: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git/refs/heads")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), head).unwrap();
        dir
    }

    #[test]
    fn test_env_wins() {
        let dir = repo_with_head(SHA);
        let sha = read_git_sha(dir.path(), |key| {
            (key == "GIT_COMMIT").then(|| "from-env".to_string())
        });
        assert_eq!(sha.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_env_order() {
        let sha = read_git_sha(Path::new("/"), |key| match key {
            "GITHUB_SHA" => Some(String::new()),
            "GIT_COMMIT" => Some("second".to_string()),
            "CI_COMMIT_SHA" => Some("third".to_string()),
            _ => None,
        });
        assert_eq!(sha.as_deref(), Some("second"));
    }

    #[test]
    fn test_detached_head() {
        let dir = repo_with_head(&format!("{}\n", SHA));
        assert_eq!(read_git_sha(dir.path(), no_env).as_deref(), Some(SHA));
    }

    #[test]
    fn test_loose_ref_from_subdirectory() {
        let dir = repo_with_head("ref: refs/heads/main\n");
        fs::write(dir.path().join(".git/refs/heads/main"), format!("{}\n", SHA)).unwrap();
        let nested = dir.path().join("crates/inner");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(read_git_sha(&nested, no_env).as_deref(), Some(SHA));
    }

    #[test]
    fn test_packed_ref() {
        let dir = repo_with_head("ref: refs/heads/release\n");
        fs::write(
            dir.path().join(".git/packed-refs"),
            format!(
                "# pack-refs with: peeled fully-peeled sorted\n{} refs/heads/release\n^ffffffffffffffffffffffffffffffffffffffff\n",
                SHA
            ),
        )
        .unwrap();

        assert_eq!(read_git_sha(dir.path(), no_env).as_deref(), Some(SHA));
    }

    #[test]
    fn test_unresolvable_ref() {
        let dir = repo_with_head("ref: refs/heads/missing\n");
        assert_eq!(read_git_sha(dir.path(), no_env), None);
    }

    #[test]
    fn test_head_ref_cannot_escape_git_dir() {
        let dir = repo_with_head("ref: ../secret\n");
        fs::write(dir.path().join("secret"), "do-not-leak\n").unwrap();
        assert_eq!(read_git_sha(dir.path(), no_env), None);

        fs::write(dir.path().join(".git/HEAD"), "ref: refs/../../secret\n").unwrap();
        assert_eq!(read_git_sha(dir.path(), no_env), None);

        fs::write(dir.path().join(".git/HEAD"), "ref: /etc/hostname\n").unwrap();
        assert_eq!(read_git_sha(dir.path(), no_env), None);
    }

    #[test]
    fn test_ref_name_check() {
        assert!(is_ref_name("refs/heads/main"));
        assert!(is_ref_name("refs/heads/feature/nested"));
        assert!(!is_ref_name("refs/heads/../../config"));
        assert!(!is_ref_name("refs/./heads/main"));
        assert!(!is_ref_name("refs//heads/main"));
        assert!(!is_ref_name("HEAD"));
    }

    #[test]
    fn test_worktree_gitdir_file() {
        let main = repo_with_head("ref: refs/heads/main\n");
        fs::write(main.path().join(".git/refs/heads/main"), "not-this-one\n").unwrap();
        let worktree_git = main.path().join(".git/worktrees/feature");
        fs::create_dir_all(&worktree_git).unwrap();
        fs::write(worktree_git.join("HEAD"), "ref: refs/heads/feature\n").unwrap();
        fs::write(worktree_git.join("commondir"), "../..\n").unwrap();
        fs::write(main.path().join(".git/refs/heads/feature"), format!("{}\n", SHA)).unwrap();

        let checkout = TempDir::new().unwrap();
        fs::write(
            checkout.path().join(".git"),
            format!("gitdir: {}\n", worktree_git.display()),
        )
        .unwrap();

        assert_eq!(
            find_git_dir(checkout.path()).as_deref(),
            Some(worktree_git.as_path())
        );
        assert_eq!(read_git_sha(checkout.path(), no_env).as_deref(), Some(SHA));
    }
}
