//! Capabilities each operation needs

/// One capability an operation asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    /// Capability key as the tracker names it
    pub capability: &'static str,
    /// Missing required capabilities deny; missing optional ones only warn
    pub required: bool,
}

const fn required(capability: &'static str) -> Requirement {
    Requirement {
        capability,
        required: true,
    }
}

const fn optional(capability: &'static str) -> Requirement {
    Requirement {
        capability,
        required: false,
    }
}

/// Capability implying every other capability
pub const ADMINISTER: &str = "ADMINISTER";

/// Capability implying [`PROJECT_ADMIN_IMPLIES`]
pub const ADMINISTER_PROJECTS: &str = "ADMINISTER_PROJECTS";

/// Capabilities granted by [`ADMINISTER_PROJECTS`]
pub const PROJECT_ADMIN_IMPLIES: &[&str] = &[
    "BROWSE_PROJECTS",
    "CREATE_ISSUES",
    "EDIT_ISSUES",
    "ASSIGN_ISSUES",
    "RESOLVE_ISSUES",
    "TRANSITION_ISSUES",
    "DELETE_ISSUES",
    "ADD_COMMENTS",
    "CREATE_ATTACHMENTS",
    "DELETE_OWN_ATTACHMENTS",
    "DELETE_ALL_ATTACHMENTS",
    "MANAGE_SPRINTS_PERMISSION",
];

static TABLE: &[(&str, &[Requirement])] = &[
    ("search_issues", &[required("BROWSE_PROJECTS")]),
    ("get_issue", &[required("BROWSE_PROJECTS")]),
    (
        "create_issue",
        &[required("CREATE_ISSUES"), optional("ASSIGN_ISSUES")],
    ),
    ("update_issue", &[required("EDIT_ISSUES")]),
    ("delete_issue", &[required("DELETE_ISSUES")]),
    (
        "transition_issue",
        &[required("TRANSITION_ISSUES"), optional("RESOLVE_ISSUES")],
    ),
    ("add_comment", &[required("ADD_COMMENTS")]),
    ("list_boards", &[optional("BROWSE_PROJECTS")]),
    ("list_sprints", &[optional("BROWSE_PROJECTS")]),
    ("search_users", &[required("BROWSE_USERS")]),
    ("upload_attachment", &[required("CREATE_ATTACHMENTS")]),
    ("download_attachment", &[required("BROWSE_PROJECTS")]),
    (
        "delete_attachment",
        &[
            required("DELETE_OWN_ATTACHMENTS"),
            optional("DELETE_ALL_ATTACHMENTS"),
        ],
    ),
    (
        "bulk_update_issues",
        &[required("EDIT_ISSUES"), required("BULK_CHANGE")],
    ),
];

/// Requirements for `operation`, `None` when it has no entry
pub fn requirements(operation: &str) -> Option<&'static [Requirement]> {
    TABLE
        .iter()
        .find(|(name, _)| *name == operation)
        .map(|(_, reqs)| *reqs)
}

/// Operations with an entry
pub fn operations() -> impl Iterator<Item = &'static str> {
    TABLE.iter().map(|(name, _)| *name)
}

/// True when `granted` holds `capability` directly or through a broader one
pub fn holds<'a, I>(granted: I, capability: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    granted.into_iter().any(|held| {
        held == capability
            || held == ADMINISTER
            || (held == ADMINISTER_PROJECTS && PROJECT_ADMIN_IMPLIES.contains(&capability))
    })
}
