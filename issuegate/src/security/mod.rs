//! Input sanitization for paths, queries, field content and destructive operations
//!
//! Every check here runs before anything reaches the remote tracker or the
//! local filesystem. Rejections carry a [`SecurityCode`] so callers can tell
//! them apart from ordinary failures.

pub mod patterns;

use crate::config::{ConfirmationConfig, SecurityConfig};
use crate::error::SecurityCode;
use crate::{GatewayError, Result};
use patterns::{PatternTable, CONTENT_PATTERNS, JQL_PATTERNS, PATH_PATTERNS};
use std::path::{Component, Path, PathBuf};

/// Longest query accepted by [`sanitize_jql`], in characters
pub const MAX_JQL_LENGTH: usize = 2000;

/// Target used for security and audit tracing events
pub const AUDIT_TARGET: &str = "issuegate::audit";

/// Constraints for files read from local disk
#[derive(Debug, Clone)]
pub struct FilePathOptions {
    /// Lowercase extensions with a leading dot; empty allows any extension
    pub allowed_extensions: Vec<String>,
    /// Largest file accepted, in bytes
    pub max_file_size: u64,
    /// Directories the file must live under; empty denies everything
    pub allowed_directories: Vec<PathBuf>,
    /// Apply [`patterns::PATH_RULES`]
    pub block_dangerous_patterns: bool,
}

impl From<&SecurityConfig> for FilePathOptions {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            allowed_extensions: config.allowed_extensions.clone(),
            max_file_size: config.max_file_size,
            allowed_directories: config.allowed_directories.clone(),
            block_dangerous_patterns: config.block_dangerous_patterns,
        }
    }
}

/// Constraints for files written to local disk
#[derive(Debug, Clone)]
pub struct SavePathOptions {
    /// Directories the file may be written under; empty denies everything
    pub allowed_directories: Vec<PathBuf>,
    /// Apply [`patterns::PATH_RULES`]
    pub block_dangerous_patterns: bool,
}

impl From<&SecurityConfig> for SavePathOptions {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            allowed_directories: config.allowed_directories.clone(),
            block_dangerous_patterns: config.block_dangerous_patterns,
        }
    }
}

/// Kinds of operation that cannot be undone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveKind {
    /// Deleting an issue
    IssueDelete,
    /// Updating many issues at once
    BulkUpdate,
    /// Deleting an attachment
    AttachmentDelete,
}

/// Confirmation requirement for one destructive operation
#[derive(Debug, Clone)]
pub struct ConfirmationOptions {
    /// Whether a phrase must be supplied at all
    pub require_confirmation: bool,
    /// The exact phrase expected
    pub confirmation_phrase: String,
}

impl ConfirmationOptions {
    /// Requirement for `kind` under `config`
    pub fn for_kind(config: &ConfirmationConfig, kind: DestructiveKind) -> Self {
        let require_confirmation = match kind {
            DestructiveKind::IssueDelete => config.require_for_delete,
            DestructiveKind::BulkUpdate => config.require_for_bulk,
            DestructiveKind::AttachmentDelete => config.require_for_attachment_delete,
        };
        Self {
            require_confirmation,
            confirmation_phrase: config.phrase.clone(),
        }
    }
}

impl Default for ConfirmationOptions {
    fn default() -> Self {
        Self {
            require_confirmation: true,
            confirmation_phrase: crate::config::DEFAULT_CONFIRMATION_PHRASE.to_string(),
        }
    }
}

fn reject<T>(code: SecurityCode, message: impl Into<String>) -> Result<T> {
    Err(GatewayError::security(code, message))
}

fn check_table(table: &PatternTable, input: &str, subject: &str) -> Result<()> {
    match table.first_match(input) {
        Some(rule) => reject(
            rule.code,
            format!("{subject} matches dangerous pattern '{}'", rule.id),
        ),
        None => Ok(()),
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize_lexically(&joined))
}

/// Allowed roots in both their configured and their resolved forms
fn allowed_roots(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots = Vec::with_capacity(dirs.len() * 2);
    for dir in dirs {
        let lexical = normalize_lexically(dir);
        if let Ok(canonical) = lexical.canonicalize() {
            if canonical != lexical {
                roots.push(canonical);
            }
        }
        roots.push(lexical);
    }
    roots
}

fn ensure_allowed(path: &Path, roots: &[PathBuf], raw: &str) -> Result<()> {
    if roots.is_empty() {
        return reject(
            SecurityCode::PathNotAllowed,
            "No directories are configured for file access",
        );
    }
    if roots.iter().any(|root| path.starts_with(root)) {
        Ok(())
    } else {
        reject(
            SecurityCode::PathNotAllowed,
            format!("Path '{raw}' is outside the allowed directories"),
        )
    }
}

fn check_path_patterns(enabled: bool, path: &str) -> Result<()> {
    if enabled {
        check_table(&PATH_PATTERNS, path, "Path")
    } else {
        Ok(())
    }
}

/// Validate a file that will be read and uploaded
///
/// Patterns are checked on the raw input, the path is resolved, and both the
/// pattern and directory checks are repeated on the canonical form. Returns the
/// canonical absolute path.
pub fn validate_file_path(path: &str, options: &FilePathOptions) -> Result<PathBuf> {
    if path.trim().is_empty() {
        return reject(SecurityCode::FileNotFound, "File path is empty");
    }
    check_path_patterns(options.block_dangerous_patterns, path)?;

    let roots = allowed_roots(&options.allowed_directories);
    let resolved = absolute(Path::new(path))?;
    ensure_allowed(&resolved, &roots, path)?;

    let metadata = match std::fs::metadata(&resolved) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return reject(SecurityCode::FileNotFound, format!("File '{path}' does not exist"))
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return reject(SecurityCode::NotAFile, format!("'{path}' is not a regular file"));
    }

    let canonical = resolved.canonicalize()?;
    check_path_patterns(
        options.block_dangerous_patterns,
        &canonical.to_string_lossy(),
    )?;
    ensure_allowed(&canonical, &roots, path)?;

    if metadata.len() > options.max_file_size {
        return reject(
            SecurityCode::FileTooLarge,
            format!(
                "File is {} bytes, larger than the {} byte limit",
                metadata.len(),
                options.max_file_size
            ),
        );
    }

    if !options.allowed_extensions.is_empty() {
        let extension = canonical
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()));
        let permitted = extension
            .as_ref()
            .is_some_and(|ext| options.allowed_extensions.iter().any(|a| a == ext));
        if !permitted {
            return reject(
                SecurityCode::ExtensionNotAllowed,
                format!(
                    "Extension {} is not allowed (allowed: {})",
                    extension.as_deref().unwrap_or("<none>"),
                    options.allowed_extensions.join(", ")
                ),
            );
        }
    }

    Ok(canonical)
}

/// Validate a destination for a downloaded file
///
/// The parent directory must exist; the file itself need not.
pub fn validate_save_path(path: &str, options: &SavePathOptions) -> Result<PathBuf> {
    if path.trim().is_empty() {
        return reject(SecurityCode::NotAFile, "Save path is empty");
    }
    check_path_patterns(options.block_dangerous_patterns, path)?;

    let roots = allowed_roots(&options.allowed_directories);
    let resolved = absolute(Path::new(path))?;
    ensure_allowed(&resolved, &roots, path)?;

    let (Some(parent), Some(file_name)) = (resolved.parent(), resolved.file_name()) else {
        return reject(SecurityCode::NotAFile, format!("'{path}' does not name a file"));
    };
    if !parent.is_dir() {
        return reject(
            SecurityCode::ParentDirNotFound,
            format!("Directory '{}' does not exist", parent.display()),
        );
    }

    let target = parent.canonicalize()?.join(file_name);
    check_path_patterns(options.block_dangerous_patterns, &target.to_string_lossy())?;
    ensure_allowed(&target, &roots, path)?;

    if target.is_dir() {
        return reject(SecurityCode::NotAFile, format!("'{path}' is a directory"));
    }
    Ok(target)
}

/// Reject dangerous or oversized queries; returns the trimmed query otherwise
pub fn sanitize_jql(query: &str) -> Result<String> {
    let length = query.chars().count();
    if length > MAX_JQL_LENGTH {
        return reject(
            SecurityCode::JqlTooLong,
            format!("Query is {length} characters, the limit is {MAX_JQL_LENGTH}"),
        );
    }
    check_table(&JQL_PATTERNS, query, "Query")?;
    Ok(query.trim().to_string())
}

/// Reject markup or script content in a free-text field value
pub fn check_content(field: &str, value: &str) -> Result<()> {
    match CONTENT_PATTERNS.first_match(value) {
        Some(rule) => reject(
            rule.code,
            format!("Field '{field}' matches dangerous pattern '{}'", rule.id),
        ),
        None => Ok(()),
    }
}

/// Require the literal confirmation phrase before a destructive operation
///
/// Emits a warning on the audit target whenever the operation is allowed to proceed.
pub fn validate_destructive_operation(
    operation: &str,
    confirmation: Option<&str>,
    options: &ConfirmationOptions,
) -> Result<()> {
    if options.require_confirmation && confirmation != Some(options.confirmation_phrase.as_str()) {
        tracing::warn!(
            target: AUDIT_TARGET,
            operation,
            "destructive operation refused without confirmation"
        );
        return reject(
            SecurityCode::ConfirmationRequired,
            format!(
                "Operation '{operation}' is destructive; pass confirm: \"{}\" to proceed",
                options.confirmation_phrase
            ),
        );
    }

    tracing::warn!(
        target: AUDIT_TARGET,
        operation,
        confirmed = options.require_confirmation,
        "destructive operation authorized"
    );
    Ok(())
}
