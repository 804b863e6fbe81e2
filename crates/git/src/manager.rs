// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production [`WorkspaceManager`]: a thin `git`-CLI driver implementing
//! init/ensureBranch/commit/push/recover (§4.4).

use std::path::Path;

use async_trait::async_trait;
use ew_core::ThreadId;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::error::GitError;
use crate::subprocess::{run_checked, run_with_timeout, CLONE_TIMEOUT, FETCH_TIMEOUT, PUSH_TIMEOUT, SHORT_TIMEOUT};

#[async_trait]
pub trait WorkspaceManager: Send + Sync {
    /// Clone or refresh `workspace` against `repo_url` (§4.4 `init`).
    async fn init(&self, workspace: &Path, repo_url: &str) -> Result<(), GitError>;

    /// Safe-switch `workspace` onto `thread-<threadId>`, creating it from
    /// the remote default branch if it does not yet exist (§4.4 "Safe
    /// switch algorithm").
    async fn ensure_branch(&self, workspace: &Path, thread_id: &ThreadId) -> Result<(), GitError>;

    /// `git status --porcelain` non-empty.
    async fn has_changes(&self, workspace: &Path) -> Result<bool, GitError>;

    /// Stage everything and commit. No-op (`Ok(false)`) if there is
    /// nothing to commit.
    async fn commit(&self, workspace: &Path, subject: &str, body: Option<&str>) -> Result<bool, GitError>;

    /// Safe-push `workspace`'s current branch (or `branch` if given),
    /// rebasing/merging through conflicts (§4.4 "Safe-push algorithm").
    async fn push(&self, workspace: &Path, branch: Option<&str>) -> Result<(), GitError>;

    /// Abort any in-progress merge/rebase/cherry-pick; `reset --hard HEAD`
    /// as a last resort.
    async fn recover(&self, workspace: &Path) -> Result<(), GitError>;

    /// Union of `git diff --name-only HEAD` and untracked files — the
    /// authoritative changed-file set for a code-mod run (§4.5).
    async fn changed_files(&self, workspace: &Path) -> Result<Vec<String>, GitError>;
}

pub struct GitWorkspaceManager;

impl GitWorkspaceManager {
    pub fn new() -> Self {
        Self
    }

    fn git(workspace: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(workspace).args(args);
        cmd
    }
}

impl Default for GitWorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkspaceManager for GitWorkspaceManager {
    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn init(&self, workspace: &Path, repo_url: &str) -> Result<(), GitError> {
        let is_existing_repo = workspace.join(".git").exists();

        if !is_existing_repo {
            tokio::fs::create_dir_all(workspace).await?;
            let is_empty = tokio::fs::read_dir(workspace).await?.next_entry().await?.is_none();
            if is_empty {
                let mut clone = Command::new("git");
                clone.args(["clone", repo_url]).arg(workspace);
                match run_checked(clone, CLONE_TIMEOUT, "git clone").await {
                    Ok(_) => return Ok(()),
                    Err(err) => {
                        warn!(%err, "clone failed, initializing empty repo with attached remote");
                        return self.init_empty_repo(workspace, repo_url).await;
                    }
                }
            }
        }

        run_checked(Self::git(workspace, &["fetch", "origin"]), FETCH_TIMEOUT, "git fetch").await?;
        let default_branch = self.default_branch(workspace).await?;
        run_checked(
            Self::git(workspace, &["checkout", &default_branch]),
            SHORT_TIMEOUT,
            "git checkout default",
        )
        .await?;
        run_checked(
            Self::git(workspace, &["merge", "--ff-only", &format!("origin/{default_branch}")]),
            SHORT_TIMEOUT,
            "git merge --ff-only",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(workspace = %workspace.display(), thread_id = %thread_id))]
    async fn ensure_branch(&self, workspace: &Path, thread_id: &ThreadId) -> Result<(), GitError> {
        let target = ew_core::branch_name(thread_id);

        let dirty = self.has_changes(workspace).await?;
        let stash_label = format!("ew-core auto-stash before {target}");
        if dirty {
            run_checked(
                Self::git(workspace, &["stash", "push", "-u", "-m", &stash_label]),
                SHORT_TIMEOUT,
                "git stash push",
            )
            .await?;
        }

        let checkout = Self::git(workspace, &["checkout", &target]);
        let checkout_result = run_with_timeout(checkout, SHORT_TIMEOUT, "git checkout").await?;
        if !checkout_result.status.success() {
            let default_branch = self.default_branch(workspace).await?;
            run_checked(
                Self::git(
                    workspace,
                    &["checkout", "-b", &target, &format!("origin/{default_branch}")],
                ),
                SHORT_TIMEOUT,
                "git checkout -b",
            )
            .await?;
        }

        if dirty {
            let pop = Self::git(workspace, &["stash", "pop"]);
            let pop_result = run_with_timeout(pop, SHORT_TIMEOUT, "git stash pop").await?;
            if !pop_result.status.success() {
                warn!(branch = %target, "stash pop conflicted, leaving stash intact");
                return Err(GitError::StashPopConflict { branch: target });
            }
        }

        Ok(())
    }

    async fn has_changes(&self, workspace: &Path) -> Result<bool, GitError> {
        let output =
            run_checked(Self::git(workspace, &["status", "--porcelain"]), SHORT_TIMEOUT, "git status").await?;
        Ok(!output.stdout.is_empty())
    }

    #[instrument(skip(self, body), fields(workspace = %workspace.display()))]
    async fn commit(&self, workspace: &Path, subject: &str, body: Option<&str>) -> Result<bool, GitError> {
        if !self.has_changes(workspace).await? {
            return Ok(false);
        }

        run_checked(Self::git(workspace, &["add", "-A"]), SHORT_TIMEOUT, "git add -A").await?;

        let message = match body {
            Some(body) => format!("{subject}\n\n{body}"),
            None => subject.to_string(),
        };
        let message_file = workspace.join(".ew-commit-message");
        tokio::fs::write(&message_file, &message).await?;
        let result =
            run_checked(Self::git(workspace, &["commit", "-F", ".ew-commit-message"]), SHORT_TIMEOUT, "git commit")
                .await;
        let _ = tokio::fs::remove_file(&message_file).await;
        result?;
        Ok(true)
    }

    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn push(&self, workspace: &Path, branch: Option<&str>) -> Result<(), GitError> {
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.current_branch(workspace).await?,
        };

        let push = Self::git(workspace, &["push", "origin", &branch]);
        let first = run_with_timeout(push, PUSH_TIMEOUT, "git push").await?;
        if first.status.success() {
            return Ok(());
        }

        info!(%branch, "push rejected, attempting pull --rebase");
        let rebase_pull =
            Self::git(workspace, &["pull", "--rebase", "origin", &branch]);
        let rebase_result = run_with_timeout(rebase_pull, FETCH_TIMEOUT, "git pull --rebase").await?;
        if rebase_result.status.success() {
            let retry = Self::git(workspace, &["push", "origin", &branch]);
            let retry_result = run_with_timeout(retry, PUSH_TIMEOUT, "git push retry").await?;
            if retry_result.status.success() {
                return Ok(());
            }
            return Err(GitError::PushDidNotConverge {
                branch,
                reason: "push still rejected after rebase".to_string(),
            });
        }

        info!(%branch, "rebase conflicted, escalating to merge preferring local");
        run_checked(Self::git(workspace, &["rebase", "--abort"]), SHORT_TIMEOUT, "git rebase --abort")
            .await
            .ok();
        let merge_pull = Self::git(workspace, &["pull", "origin", &branch]);
        let merge_result = run_with_timeout(merge_pull, FETCH_TIMEOUT, "git pull (merge)").await?;
        if !merge_result.status.success() {
            let resolved = self.resolve_conflicts_preferring_local(workspace).await?;
            self.commit_merge_resolution(workspace, &resolved).await?;
        }

        let final_push = Self::git(workspace, &["push", "origin", &branch]);
        let final_result = run_with_timeout(final_push, PUSH_TIMEOUT, "git push (after merge)").await?;
        if final_result.status.success() {
            Ok(())
        } else {
            Err(GitError::PushDidNotConverge { branch, reason: "push rejected after merge escalation".to_string() })
        }
    }

    #[instrument(skip(self), fields(workspace = %workspace.display()))]
    async fn recover(&self, workspace: &Path) -> Result<(), GitError> {
        for args in [["merge", "--abort"], ["rebase", "--abort"], ["cherry-pick", "--abort"]] {
            let _ = run_with_timeout(Self::git(workspace, &args), SHORT_TIMEOUT, "git abort").await;
        }

        if self.has_unresolved_conflicts(workspace).await? {
            warn!("unresolved conflicts persist after abort, resetting hard");
            run_checked(Self::git(workspace, &["reset", "--hard", "HEAD"]), SHORT_TIMEOUT, "git reset --hard")
                .await?;
        }
        Ok(())
    }

    async fn changed_files(&self, workspace: &Path) -> Result<Vec<String>, GitError> {
        let diff = run_checked(
            Self::git(workspace, &["diff", "--name-only", "HEAD"]),
            SHORT_TIMEOUT,
            "git diff --name-only",
        )
        .await?;
        let untracked = run_checked(
            Self::git(workspace, &["ls-files", "--others", "--exclude-standard"]),
            SHORT_TIMEOUT,
            "git ls-files --others",
        )
        .await?;

        let mut files: std::collections::BTreeSet<String> = String::from_utf8_lossy(&diff.stdout)
            .lines()
            .map(|l| l.to_string())
            .collect();
        files.extend(String::from_utf8_lossy(&untracked.stdout).lines().map(|l| l.to_string()));
        Ok(files.into_iter().collect())
    }
}

impl GitWorkspaceManager {
    async fn init_empty_repo(&self, workspace: &Path, repo_url: &str) -> Result<(), GitError> {
        run_checked(Self::git(workspace, &["init"]), SHORT_TIMEOUT, "git init").await?;
        run_checked(
            Self::git(workspace, &["remote", "add", "origin", repo_url]),
            SHORT_TIMEOUT,
            "git remote add",
        )
        .await?;
        tokio::fs::write(workspace.join("README.md"), "# Workspace\n").await?;
        run_checked(Self::git(workspace, &["add", "-A"]), SHORT_TIMEOUT, "git add -A (init)").await?;
        run_checked(
            Self::git(workspace, &["commit", "-m", "Initialize workspace"]),
            SHORT_TIMEOUT,
            "git commit (init)",
        )
        .await?;
        Ok(())
    }

    /// Resolve via `git ls-remote --symref origin HEAD`, which reports the
    /// remote's symbolic HEAD ref directly.
    async fn default_branch(&self, workspace: &Path) -> Result<String, GitError> {
        let output = run_checked(
            Self::git(workspace, &["ls-remote", "--symref", "origin", "HEAD"]),
            FETCH_TIMEOUT,
            "git ls-remote --symref",
        )
        .await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            if let Some(rest) = line.strip_prefix("ref: refs/heads/") {
                if let Some(branch) = rest.split_whitespace().next() {
                    return Ok(branch.to_string());
                }
            }
        }
        Ok("main".to_string())
    }

    async fn current_branch(&self, workspace: &Path) -> Result<String, GitError> {
        let output = run_checked(
            Self::git(workspace, &["rev-parse", "--abbrev-ref", "HEAD"]),
            SHORT_TIMEOUT,
            "git rev-parse --abbrev-ref HEAD",
        )
        .await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn has_unresolved_conflicts(&self, workspace: &Path) -> Result<bool, GitError> {
        let output =
            run_checked(Self::git(workspace, &["status", "--porcelain"]), SHORT_TIMEOUT, "git status").await?;
        Ok(String::from_utf8_lossy(&output.stdout).lines().any(|l| l.starts_with("UU")))
    }

    /// `checkout --ours` + `add` for each `UU` file, preferring local — the
    /// merge-escalation step of the safe-push algorithm (§4.4). Returns the
    /// resolved paths so the caller can annotate the merge commit with them.
    async fn resolve_conflicts_preferring_local(&self, workspace: &Path) -> Result<Vec<String>, GitError> {
        let status =
            run_checked(Self::git(workspace, &["status", "--porcelain"]), SHORT_TIMEOUT, "git status").await?;
        let conflicted: Vec<String> = String::from_utf8_lossy(&status.stdout)
            .lines()
            .filter(|l| l.starts_with("UU"))
            .filter_map(|l| l.get(3..).map(str::to_string))
            .collect();

        for path in &conflicted {
            run_checked(
                Self::git(workspace, &["checkout", "--ours", "--", path]),
                SHORT_TIMEOUT,
                "git checkout --ours",
            )
            .await?;
            run_checked(Self::git(workspace, &["add", "--", path]), SHORT_TIMEOUT, "git add (resolve)").await?;
        }
        Ok(conflicted)
    }

    /// §4.4 "An auto-resolved conflict is recorded in the commit message so
    /// humans can audit": commit the merge with a message naming every
    /// file that was force-resolved to the local side, instead of keeping
    /// git's default `--no-edit` merge message.
    async fn commit_merge_resolution(&self, workspace: &Path, resolved: &[String]) -> Result<(), GitError> {
        let message = if resolved.is_empty() {
            "Merge with auto-resolved conflicts (preferring local)".to_string()
        } else {
            let bullets = resolved.iter().map(|f| format!("- {f}")).collect::<Vec<_>>().join("\n");
            format!(
                "Merge with auto-resolved conflicts (preferring local)\n\n\
                 The following files had merge conflicts auto-resolved by keeping the\n\
                 local version; review before relying on the merged result:\n{bullets}"
            )
        };

        let message_file = workspace.join(".ew-commit-message");
        tokio::fs::write(&message_file, &message).await?;
        let result = run_checked(
            Self::git(workspace, &["commit", "-F", ".ew-commit-message"]),
            SHORT_TIMEOUT,
            "git commit (merge resolution)",
        )
        .await;
        let _ = tokio::fs::remove_file(&message_file).await;
        result?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
