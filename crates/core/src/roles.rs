//! Operator roles and the place scope they can see.
//!
//! Role facts come from the authentication layer; this module only maps
//! them to the set of places the console loads.

use serde::{Deserialize, Serialize};

use crate::entities::{DirectorySnapshot, Place};
use crate::error::CoreError;
use crate::types::DbId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    PlaceAdmin,
    CompanyAdmin,
    CompanyStaff,
    PublicUser,
}

impl Role {
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            "PLACE_ADMIN" => Ok(Self::PlaceAdmin),
            "COMPANY_ADMIN" => Ok(Self::CompanyAdmin),
            "COMPANY_STAFF" => Ok(Self::CompanyStaff),
            "PUBLIC_USER" => Ok(Self::PublicUser),
            _ => Err(CoreError::Validation(format!(
                "Invalid role '{s}'. Must be one of: SUPER_ADMIN, PLACE_ADMIN, \
                 COMPANY_ADMIN, COMPANY_STAFF, PUBLIC_USER"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::PlaceAdmin => "PLACE_ADMIN",
            Self::CompanyAdmin => "COMPANY_ADMIN",
            Self::CompanyStaff => "COMPANY_STAFF",
            Self::PublicUser => "PUBLIC_USER",
        }
    }
}

/// The places an operator may load and edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "place_id", rename_all = "snake_case")]
pub enum AccessScope {
    AllPlaces,
    Place(DbId),
}

impl AccessScope {
    /// Derive the scope for an actor, refusing roles without console access.
    pub fn for_actor(role: Role, place_id: Option<DbId>) -> Result<Self, CoreError> {
        match (role, place_id) {
            (Role::SuperAdmin, _) => Ok(Self::AllPlaces),
            (Role::PlaceAdmin, Some(id)) => Ok(Self::Place(id)),
            (Role::PlaceAdmin, None) => Err(CoreError::Forbidden(
                "Place admin has no place assigned".to_string(),
            )),
            (other, _) => Err(CoreError::Forbidden(format!(
                "Role {} cannot use the directory console",
                other.as_str()
            ))),
        }
    }

    pub fn can_see(&self, place_id: DbId) -> bool {
        match self {
            Self::AllPlaces => true,
            Self::Place(id) => *id == place_id,
        }
    }

    /// Places from `snapshot` this scope includes.
    pub fn visible_places<'a>(&self, snapshot: &'a DirectorySnapshot) -> Vec<&'a Place> {
        snapshot
            .places
            .iter()
            .filter(|p| self.can_see(p.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::fixtures::food_and_drink;

    #[test]
    fn role_names_round_trip() {
        for name in [
            "SUPER_ADMIN",
            "PLACE_ADMIN",
            "COMPANY_ADMIN",
            "COMPANY_STAFF",
            "PUBLIC_USER",
        ] {
            assert_eq!(Role::from_str_db(name).unwrap().as_str(), name);
        }
        assert!(Role::from_str_db("ROOT").is_err());
    }

    #[test]
    fn super_admin_sees_everything() {
        let scope = AccessScope::for_actor(Role::SuperAdmin, None).unwrap();
        assert_eq!(scope, AccessScope::AllPlaces);
        assert_eq!(scope.visible_places(&food_and_drink()).len(), 2);
    }

    #[test]
    fn place_admin_is_restricted_to_own_place() {
        let scope = AccessScope::for_actor(Role::PlaceAdmin, Some(2)).unwrap();
        assert!(scope.can_see(2));
        assert!(!scope.can_see(1));
        let snapshot = food_and_drink();
        let visible = scope.visible_places(&snapshot);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, 2);
    }

    #[test]
    fn place_admin_without_place_is_forbidden() {
        assert_matches!(
            AccessScope::for_actor(Role::PlaceAdmin, None),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn company_roles_have_no_console_access() {
        for role in [Role::CompanyAdmin, Role::CompanyStaff, Role::PublicUser] {
            assert_matches!(
                AccessScope::for_actor(role, Some(1)),
                Err(CoreError::Forbidden(_))
            );
        }
    }
}
