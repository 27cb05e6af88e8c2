//! Role assignments shared by the three user kinds
//!
//! Assignments are a set: two declarations listing the same role and
//! organization pairs in a different order are the same declaration.

use declarative::{Attribute, AttributeType, Mutability, Schema};
use iotcentral_client::RoleAssignment;
use serde::{Deserialize, Serialize};

/// One role assignment in canonical state
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleAssignmentModel {
    #[serde(default)]
    pub role: Option<String>,
    /// Present only for organization-scoped roles
    #[serde(default)]
    pub organization: Option<String>,
}

/// Schema of the `roles` attribute
pub fn roles_attribute() -> Attribute {
    let assignment = Schema::new()
        .with_attribute(
            "role",
            Attribute::required_string().with_description("ID of the role"),
        )
        .with_attribute(
            "organization",
            Attribute::optional_string()
                .with_description("ID of the organization the role is scoped to"),
        );
    Attribute::new(
        AttributeType::Set(Box::new(AttributeType::Object(assignment))),
        Mutability::Required,
    )
    .with_description("Role assignments")
}

/// One request role per declared assignment; an unset organization is left out.
pub fn to_request(roles: Option<&[RoleAssignmentModel]>) -> Vec<RoleAssignment> {
    roles
        .unwrap_or_default()
        .iter()
        .map(|r| RoleAssignment {
            role: r.role.clone().unwrap_or_default(),
            organization: r.organization.clone().filter(|o| !o.is_empty()),
        })
        .collect()
}

/// One state role per response role; an empty organization becomes unset.
pub fn to_state(roles: Vec<RoleAssignment>) -> Vec<RoleAssignmentModel> {
    roles
        .into_iter()
        .map(|r| RoleAssignmentModel {
            role: Some(r.role),
            organization: r.organization.filter(|o| !o.is_empty()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assignment(role: &str, organization: Option<&str>) -> RoleAssignmentModel {
        RoleAssignmentModel {
            role: Some(role.to_string()),
            organization: organization.map(str::to_string),
        }
    }

    #[test]
    fn test_to_request_omits_unset_organization() {
        let roles = [assignment("admin", None), assignment("operator", Some("org1"))];
        let request = to_request(Some(&roles));
        assert_eq!(
            request,
            vec![
                RoleAssignment::new("admin"),
                RoleAssignment::scoped("operator", "org1"),
            ]
        );
        assert_eq!(
            serde_json::to_value(&request[0]).unwrap(),
            json!({ "role": "admin" })
        );
    }

    #[test]
    fn test_to_state_maps_empty_organization_to_unset() {
        let state = to_state(vec![RoleAssignment {
            role: "admin".to_string(),
            organization: Some(String::new()),
        }]);
        assert_eq!(state, vec![assignment("admin", None)]);
    }

    #[test]
    fn test_round_trip_preserves_membership_in_any_order() {
        let schema = Schema::new().with_attribute("roles", roles_attribute());
        let declared = [
            assignment("operator", Some("org1")),
            assignment("admin", None),
            assignment("viewer", Some("org2")),
        ];
        let mut reversed = declared.clone();
        reversed.reverse();

        let round_tripped = to_state(to_request(Some(&reversed)));
        let round_tripped = to_request(Some(&round_tripped));
        let round_tripped = to_state(round_tripped);

        assert!(schema.values_equal(
            "roles",
            Some(&serde_json::to_value(&declared).unwrap()),
            Some(&serde_json::to_value(&round_tripped).unwrap()),
        ));
    }

    #[test]
    fn test_roles_attribute_requires_role() {
        let schema = Schema::new().with_attribute("roles", roles_attribute());
        let diagnostics = schema.validate(&json!({ "roles": [{ "organization": "org1" }] }));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "roles[0].role");
    }
}
