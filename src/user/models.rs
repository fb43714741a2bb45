use super::permissions::{Permission, UserRole};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: String,
    pub handle: String,
    pub roles: Vec<UserRole>,
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.roles
            .iter()
            .any(|role| role.permissions().contains(&permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_union_over_roles() {
        let dj = User {
            id: "u1".to_string(),
            handle: "marfa".to_string(),
            roles: vec![UserRole::Dj],
        };
        assert!(dj.has_permission(Permission::OwnCrate));
        assert!(!dj.has_permission(Permission::ModerateReviews));

        let director = User {
            id: "u2".to_string(),
            handle: "md".to_string(),
            roles: vec![UserRole::Dj, UserRole::MusicDirector],
        };
        assert!(director.has_permission(Permission::ModerateReviews));
        assert!(director.has_permission(Permission::EditLibrary));
    }
}
