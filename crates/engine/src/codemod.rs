// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Code-Mod Runner (C5, §4.5): invokes the code-modification engine as an
//! opaque child process and consumes its tagged event stream. The
//! subprocess's self-reported output is advisory; the authoritative
//! changed-file set comes from [`ew_git::WorkspaceManager::changed_files`]
//! after the process exits (left to the Job Controller, which owns both
//! the runner and the workspace manager).

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::CodeModError;

/// §5: the code-mod subprocess must exit within 5s of SIGINT or be killed.
const INTERRUPT_WAIT: Duration = Duration::from_secs(5);

/// §4.5 "Configuration": bounded conversation, tool allow-list, output and
/// thinking caps.
const MAX_TURNS: u32 = 3;
const OUTPUT_TOKEN_CAP: u32 = 4096;
const THINKING_TOKEN_CAP: u32 = 1024;
const ALLOWED_TOOLS: &[&str] = &["Read", "Write", "Edit", "Bash", "Grep", "LS", "Glob"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeModOutcome {
    pub output: String,
    pub session_id: Option<String>,
    pub cost_usd: Option<f64>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedEvent {
    System {
        #[serde(default, rename = "sessionId")]
        session_id: Option<String>,
    },
    Assistant {
        #[serde(default)]
        content: Vec<ContentBlock>,
    },
    Result {
        subtype: String,
        #[serde(default, rename = "totalCostUsd")]
        total_cost_usd: Option<f64>,
        #[serde(default, rename = "durationMs")]
        duration_ms: Option<u64>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[async_trait]
pub trait CodeModEngine: Send + Sync {
    async fn run(
        &self,
        workdir: &Path,
        instruction: &str,
        cancel: CancellationToken,
    ) -> Result<CodeModOutcome, CodeModError>;
}

/// Drives the code-modification engine via its CLI, treating it as opaque
/// per §4.5.
pub struct CodeModRunner {
    binary: String,
}

impl CodeModRunner {
    pub fn new() -> Self {
        Self { binary: "claude".to_string() }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for CodeModRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeModEngine for CodeModRunner {
    #[instrument(skip(self, instruction, cancel), fields(workdir = %workdir.display()))]
    async fn run(
        &self,
        workdir: &Path,
        instruction: &str,
        cancel: CancellationToken,
    ) -> Result<CodeModOutcome, CodeModError> {
        let mut child = Command::new(&self.binary)
            .current_dir(workdir)
            .arg("--print")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--max-turns")
            .arg(MAX_TURNS.to_string())
            .arg("--max-output-tokens")
            .arg(OUTPUT_TOKEN_CAP.to_string())
            .arg("--max-thinking-tokens")
            .arg(THINKING_TOKEN_CAP.to_string())
            .arg("--allowed-tools")
            .arg(ALLOWED_TOOLS.join(","))
            .arg(instruction)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(CodeModError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CodeModError::Spawn(std::io::Error::other("child had no stdout")))?;
        let mut lines = BufReader::new(stdout).lines();

        let mut outcome = CodeModOutcome::default();
        let mut output = String::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return interrupt(&mut child).await;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(raw)) => {
                            if raw.trim().is_empty() {
                                continue;
                            }
                            parse_event(&raw, &mut outcome, &mut output);
                        }
                        Ok(None) => break,
                        Err(err) => return Err(CodeModError::MalformedEvent(err.to_string())),
                    }
                }
            }
        }

        outcome.output = output;
        let status = child.wait().await.map_err(CodeModError::Spawn)?;
        if status.success() {
            Ok(outcome)
        } else {
            Err(CodeModError::ExecFailed(status.code()))
        }
    }
}

fn parse_event(raw: &str, outcome: &mut CodeModOutcome, output: &mut String) {
    match serde_json::from_str::<TaggedEvent>(raw) {
        Ok(TaggedEvent::System { session_id }) => outcome.session_id = session_id,
        Ok(TaggedEvent::Assistant { content }) => {
            for block in content {
                if let ContentBlock::Text { text } = block {
                    output.push_str(&text);
                }
            }
        }
        Ok(TaggedEvent::Result { subtype, total_cost_usd, duration_ms }) => {
            outcome.cost_usd = total_cost_usd;
            outcome.duration_ms = duration_ms;
            if subtype != "success" {
                warn!(subtype, "code-mod result subtype was not success");
            }
        }
        Err(err) => debug!(%err, line = %raw, "ignoring unparsable code-mod event"),
    }
}

async fn interrupt(child: &mut Child) -> Result<CodeModOutcome, CodeModError> {
    if let Some(pid) = child.id() {
        let pid = nix::unistd::Pid::from_raw(pid as i32);
        if let Err(err) = nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGINT) {
            warn!(%err, "failed to signal code-mod subprocess, killing directly");
            let _ = child.start_kill();
        }
    }
    if tokio::time::timeout(INTERRUPT_WAIT, child.wait()).await.is_err() {
        let _ = child.start_kill();
    }
    Err(CodeModError::Interrupted)
}

#[cfg(test)]
#[path = "codemod_tests.rs"]
mod tests;
