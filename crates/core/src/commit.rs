// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The commit-message formatter (§4.7.1).
//!
//! Pure and deterministic: given the same [`CommitInput`] it always produces
//! the same subject/body pair. No git access, no clock reads — the caller
//! supplies `now` so tests can pin it.

/// Everything the formatter needs to build a commit message. `now_iso8601`
/// is supplied by the caller (the git layer), never read internally.
#[derive(Debug, Clone, Default)]
pub struct CommitInput {
    pub instruction: Option<String>,
    pub files_changed: Vec<String>,
    pub session_id: Option<String>,
    pub interrupted: bool,
    pub now_iso8601: Option<String>,
}

impl CommitInput {
    pub fn new() -> Self {
        Self::default()
    }

    crate::setters! {
        option {
            instruction: String,
            session_id: String,
            now_iso8601: String,
        }
        set {
            interrupted: bool,
        }
    }

    pub fn with_files_changed(mut self, files: Vec<String>) -> Self {
        self.files_changed = files;
        self
    }
}

const SUBJECT_MAX: usize = 72;
const POLITE_PREFIXES: &[&str] =
    &["please ", "can you ", "could you ", "i need to ", "i want to ", "let's ", "help me ", "assist with "];
const VERB_MAP: &[(&str, &str)] = &[
    ("fix", "Fix"),
    ("add", "Add"),
    ("remove", "Remove"),
    ("update", "Update"),
    ("create", "Create"),
    ("delete", "Delete"),
    ("refactor", "Refactor"),
    ("implement", "Implement"),
    ("change", "Change"),
    ("modify", "Modify"),
];

/// Build the subject/body pair for a work commit. Returns `(subject, body)`
/// where `body` is `None` when there is nothing worth saying beyond the
/// subject line (no instruction, no files, no session).
pub fn format_commit_message(input: &CommitInput) -> (String, Option<String>) {
    let subject = format_subject(input);
    let body = format_body(input);
    (subject, body)
}

fn format_subject(input: &CommitInput) -> String {
    if input.interrupted {
        return truncate_subject(&interrupted_subject(input));
    }

    let subject = match &input.instruction {
        Some(instr) if !instr.trim().is_empty() => {
            let mut action = clean_instruction(instr);
            if let Some(context) = file_context_phrase(&input.files_changed) {
                action.push_str(&format!(" ({context})"));
            }
            if let Some(tag) = session_tag(input.session_id.as_deref()) {
                action.push_str(&format!(" [{tag}]"));
            }
            action
        }
        _ => file_context_summary(&input.files_changed).unwrap_or_else(|| "Update workspace".to_string()),
    };
    truncate_subject(&subject)
}

/// §4.7.1: the interrupted-subject template ignores `instruction` entirely,
/// reporting only how many files were touched before the preempt and (if
/// known) which code-mod session it happened in.
fn interrupted_subject(input: &CommitInput) -> String {
    let mut subject = if input.files_changed.is_empty() {
        "WIP: Session interrupted".to_string()
    } else {
        format!("WIP: Interrupted with {} file(s) modified", input.files_changed.len())
    };
    if let Some(tag) = session_tag(input.session_id.as_deref()) {
        subject.push_str(&format!(" [{tag}]"));
    }
    subject
}

fn session_tag(session_id: Option<&str>) -> Option<String> {
    session_id.map(|id| id.chars().take(8).collect())
}

/// Strip polite filler ("please", "can you", ...), uppercase the first
/// letter, and canonicalize a leading verb to its imperative form.
fn clean_instruction(instruction: &str) -> String {
    let mut text = instruction.trim().to_string();

    let lowered = text.to_lowercase();
    for prefix in POLITE_PREFIXES {
        if lowered.starts_with(prefix) {
            text = text[prefix.len()..].trim_start().to_string();
            break;
        }
    }

    text = uppercase_first(&text);

    let mut words = text.splitn(2, ' ');
    if let Some(first_word) = words.next() {
        let rest = words.next().unwrap_or("");
        let lower_first = first_word.to_lowercase();
        if let Some((_, canonical)) = VERB_MAP.iter().find(|(verb, _)| *verb == lower_first) {
            text = if rest.is_empty() { canonical.to_string() } else { format!("{canonical} {rest}") };
        }
    }

    text
}

fn uppercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Summarize the changed-file set: a single basename, "N <ext> files",
/// "N files in <dir>", or a bare "N files" count, in that order of
/// specificity.
fn file_context_summary(files: &[String]) -> Option<String> {
    file_context_phrase(files).map(|phrase| format!("Update {phrase}"))
}

/// The bare file-context phrase (no "Update " prefix), used both as the
/// whole-subject fallback (via [`file_context_summary`]) and appended in
/// parentheses after an instruction-derived action.
fn file_context_phrase(files: &[String]) -> Option<String> {
    if files.is_empty() {
        return None;
    }
    if files.len() == 1 {
        let basename = files[0].rsplit('/').next().unwrap_or(&files[0]);
        return Some(basename.to_string());
    }

    let extensions: Vec<&str> = files.iter().map(|f| extension_of(f)).collect();
    if let Some(first_ext) = extensions.first() {
        if !first_ext.is_empty() && extensions.iter().all(|ext| ext == first_ext) {
            return Some(format!("{} {} files", files.len(), first_ext));
        }
    }

    let dirs: Vec<&str> = files.iter().map(|f| dir_of(f)).collect();
    if let Some(first_dir) = dirs.first() {
        if !first_dir.is_empty() && dirs.iter().all(|dir| dir == first_dir) {
            return Some(format!("{} files in {}", files.len(), first_dir));
        }
    }

    Some(format!("{} files", files.len()))
}

fn extension_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path).rsplit('.').next().unwrap_or("")
}

fn dir_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn truncate_subject(subject: &str) -> String {
    if subject.chars().count() <= SUBJECT_MAX {
        return subject.to_string();
    }
    let truncated: String = subject.chars().take(SUBJECT_MAX - 1).collect();
    format!("{}\u{2026}", truncated.trim_end())
}

fn format_body(input: &CommitInput) -> Option<String> {
    let has_instruction = input.instruction.as_deref().is_some_and(|s| !s.trim().is_empty());
    let has_files = !input.files_changed.is_empty();
    let has_session = input.session_id.is_some();
    if !has_instruction && !has_files && !has_session {
        return None;
    }

    let mut sections = Vec::new();

    if let Some(instruction) = &input.instruction {
        if !instruction.trim().is_empty() {
            sections.push(wrap_text(instruction.trim(), 72));
        }
    }

    if input.files_changed.len() > 3 {
        let bullets = input.files_changed.iter().map(|f| format!("- {f}")).collect::<Vec<_>>().join("\n");
        sections.push(bullets);
    }

    let mut trailers = Vec::new();
    if let Some(session_id) = &input.session_id {
        trailers.push(format!("Session: {session_id}"));
    }
    if let Some(now) = &input.now_iso8601 {
        trailers.push(format!("Time: {now}"));
    }
    trailers.push("Generated-by: ew-core".to_string());
    sections.push(trailers.join("\n"));

    Some(sections.join("\n\n"))
}

/// Naive greedy word-wrap at `width` columns. Never splits a word.
fn wrap_text(text: &str, width: usize) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
