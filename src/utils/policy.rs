use crate::api::auth::Claims;

/// The single ownership rule applied across ticket detail, delete, replies
/// and profile updates: admins may touch anything, everyone else only what
/// they own. Keeping it in one place stops the per-handler copies from
/// drifting apart.
pub fn can_access(claims: &Claims, owner_id: i32) -> bool {
    if claims.is_admin() {
        return true;
    }
    claims
        .sub
        .parse::<i32>()
        .map(|id| id == owner_id)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "someone@example.com".to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn owner_is_allowed() {
        assert!(can_access(&claims("42", "user"), 42));
    }

    #[test]
    fn admin_is_allowed_on_anything() {
        assert!(can_access(&claims("1", "admin"), 42));
    }

    #[test]
    fn other_user_is_denied() {
        assert!(!can_access(&claims("7", "user"), 42));
    }

    #[test]
    fn malformed_subject_is_denied() {
        assert!(!can_access(&claims("not-a-number", "user"), 42));
    }
}
