//! Declarative dangerous-input rule tables
//!
//! Each table is an ordered list of `(id, pattern, code)` rules. Rules are
//! evaluated in order and the first match wins. Adding a rule means adding a
//! row here and bumping [`PATTERN_TABLE_VERSION`].

use crate::error::SecurityCode;
use once_cell::sync::Lazy;
use regex::Regex;

/// Version of the rule tables below
pub const PATTERN_TABLE_VERSION: u32 = 3;

/// One row of a rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRule {
    /// Stable identifier reported in rejections and audit details
    pub id: &'static str,
    /// Regular expression source
    pub pattern: &'static str,
    /// Code raised on match
    pub code: SecurityCode,
}

const fn rule(id: &'static str, pattern: &'static str, code: SecurityCode) -> PatternRule {
    PatternRule { id, pattern, code }
}

/// Raw file path checks, applied before and after resolution
pub const PATH_RULES: &[PatternRule] = &[
    rule(
        "path.parent_traversal",
        r"(^|[/\\])\.\.([/\\]|$)",
        SecurityCode::DangerousPathPattern,
    ),
    rule(
        "path.encoded_traversal",
        r"(?i)%2e%2e|%252e|%c0%ae|%2e\.|\.%2e|\.\.%2f|\.\.%5c",
        SecurityCode::DangerousPathPattern,
    ),
    rule(
        "path.encoded_separator",
        r"(?i)%2f|%5c",
        SecurityCode::DangerousPathPattern,
    ),
    rule(
        "path.protocol_prefix",
        r"(?i)^[a-z][a-z0-9+.\-]{1,}:(//|\\\\)",
        SecurityCode::DangerousPathPattern,
    ),
    rule(
        "path.scheme_file",
        r"(?i)^(file|data|javascript|vbscript):",
        SecurityCode::DangerousPathPattern,
    ),
    rule(
        "path.null_byte",
        r"(?i)\x00|%00",
        SecurityCode::DangerousPathPattern,
    ),
    rule("path.home_expansion", r"^~", SecurityCode::DangerousPathPattern),
];

/// Query-language injection checks
pub const JQL_RULES: &[PatternRule] = &[
    rule("jql.script_tag", r"(?i)<\s*/?\s*script", SecurityCode::DangerousJqlPattern),
    rule(
        "jql.markup_tag",
        r"(?i)<\s*/?\s*(iframe|object|embed|svg|img|link|meta)\b",
        SecurityCode::DangerousJqlPattern,
    ),
    rule("jql.javascript_uri", r"(?i)javascript\s*:", SecurityCode::DangerousJqlPattern),
    rule(
        "jql.event_handler",
        r"(?i)\bon(load|error|click|mouse\w*|focus|blur|submit|change|key\w*)\s*=",
        SecurityCode::DangerousJqlPattern,
    ),
    rule(
        "jql.statement_chain",
        r"(?i);\s*(drop|delete|truncate|alter|insert|update|exec|create|grant)\b",
        SecurityCode::DangerousJqlPattern,
    ),
    rule(
        "jql.union_select",
        r"(?i)\bunion\s+(all\s+)?select\b",
        SecurityCode::DangerousJqlPattern,
    ),
    rule(
        "jql.exec_call",
        r"(?i)\b(exec|execute|eval|xp_cmdshell)\s*\(",
        SecurityCode::DangerousJqlPattern,
    ),
    rule("jql.sql_comment", r"(--|/\*|\*/)\s*$", SecurityCode::DangerousJqlPattern),
];

/// Free-text field value checks
pub const CONTENT_RULES: &[PatternRule] = &[
    rule("content.script_tag", r"(?i)<\s*/?\s*script", SecurityCode::DangerousFieldValue),
    rule(
        "content.markup_tag",
        r"(?i)<\s*/?\s*(iframe|object|embed|frame|frameset|applet|meta)\b",
        SecurityCode::DangerousFieldValue,
    ),
    rule(
        "content.script_uri",
        r"(?i)(javascript|vbscript)\s*:",
        SecurityCode::DangerousFieldValue,
    ),
    rule(
        "content.data_html",
        r"(?i)data\s*:\s*text/html",
        SecurityCode::DangerousFieldValue,
    ),
    rule(
        "content.event_handler",
        r#"(?i)<[^>]*\bon[a-z]+\s*=\s*["']?"#,
        SecurityCode::DangerousFieldValue,
    ),
    rule(
        "content.css_expression",
        r"(?i)expression\s*\(",
        SecurityCode::DangerousFieldValue,
    ),
];

/// A rule table compiled once for matching
#[derive(Debug)]
pub struct PatternTable {
    compiled: Vec<(PatternRule, Regex)>,
}

impl PatternTable {
    /// Compile a rule table
    ///
    /// Panics if a rule's pattern is not a valid regex; tables are static
    /// literals covered by tests.
    pub fn compile(rules: &[PatternRule]) -> Self {
        let compiled = rules
            .iter()
            .map(|r| {
                let regex = Regex::new(r.pattern)
                    .unwrap_or_else(|e| panic!("invalid pattern for rule {}: {e}", r.id));
                (*r, regex)
            })
            .collect();
        Self { compiled }
    }

    /// First rule matching `input`, in table order
    pub fn first_match(&self, input: &str) -> Option<&PatternRule> {
        self.compiled
            .iter()
            .find(|(_, regex)| regex.is_match(input))
            .map(|(rule, _)| rule)
    }

    /// Number of rules in the table
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// True when the table has no rules
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

/// Compiled [`PATH_RULES`]
pub static PATH_PATTERNS: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(PATH_RULES));

/// Compiled [`JQL_RULES`]
pub static JQL_PATTERNS: Lazy<PatternTable> = Lazy::new(|| PatternTable::compile(JQL_RULES));

/// Compiled [`CONTENT_RULES`]
pub static CONTENT_PATTERNS: Lazy<PatternTable> =
    Lazy::new(|| PatternTable::compile(CONTENT_RULES));
