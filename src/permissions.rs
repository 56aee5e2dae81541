use serde::Serialize;

/// What a role may do in the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub role: String,
}

impl Permissions {
    /// Roles in `allowed` (compared case-insensitively) get full access,
    /// everyone else is read-only.
    pub fn for_role<S: AsRef<str>>(role: &str, allowed: &[S]) -> Self {
        let role = role.trim();
        let granted = allowed
            .iter()
            .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(role));
        Self {
            can_create: granted,
            can_edit: granted,
            can_delete: granted,
            role: role.to_owned(),
        }
    }
}
