//! Role lookup by display name.
//!
//! The application exposes its built-in roles under short canonical names
//! ("Administrator", "Org Admin") while the portal and documentation use
//! longer ones ("App Administrator", "Org Administrator"). Lookups accept
//! either form, case-insensitively, and always hand back the record the
//! application returned.

use crate::types::Role;

/// Long-form names mapped to the canonical display name the API returns.
const ALIASES: &[(&str, &str)] = &[
    ("app administrator", "administrator"),
    ("app builder", "builder"),
    ("app operator", "operator"),
    ("org administrator", "org admin"),
];

/// Lowercased canonical form of a role display name.
#[must_use]
pub fn canonical_name(display_name: &str) -> String {
    let lowered = display_name.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| (*canonical).to_string())
        .unwrap_or(lowered)
}

/// Find a role by display name.
///
/// An exact (case-insensitive) match wins over an alias match.
#[must_use]
pub fn find_role<'a>(roles: &'a [Role], display_name: &str) -> Option<&'a Role> {
    let wanted = display_name.trim();
    roles
        .iter()
        .find(|r| r.display_name.eq_ignore_ascii_case(wanted))
        .or_else(|| {
            let canonical = canonical_name(wanted);
            roles
                .iter()
                .find(|r| r.display_name.to_lowercase() == canonical)
        })
}
