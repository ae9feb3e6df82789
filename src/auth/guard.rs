//! Ownership and authorization guard
//!
//! Every update or delete of an existing comment, tweet, playlist or video
//! passes through [`ensure_owner`] (via `services::owned`) before the store
//! is touched.

use bson::oid::ObjectId;

use crate::auth::jwt::AccessClaims;
use crate::db::schemas::UserDoc;
use crate::types::{Result, VidtubeError};

/// The authenticated actor of a request
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub fullname: String,
}

impl Principal {
    /// Build from verified access token claims
    pub fn from_claims(claims: AccessClaims) -> Result<Self> {
        let id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| VidtubeError::Unauthorized("The access token is invalid".into()))?;

        Ok(Self {
            id,
            username: claims.username,
            email: claims.email,
            fullname: claims.fullname,
        })
    }

    /// Build from the stored user the token resolved to
    pub fn from_user(user: &UserDoc) -> Result<Self> {
        Ok(Self {
            id: user.id()?,
            username: user.username.clone(),
            email: user.email.clone(),
            fullname: user.fullname.clone(),
        })
    }
}

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Authorized,
    Forbidden,
}

/// Compare a principal with a resource owner by id value
pub fn authorize(principal: &ObjectId, owner: &ObjectId) -> Access {
    if principal == owner {
        Access::Authorized
    } else {
        Access::Forbidden
    }
}

/// Fail with `Forbidden` unless the principal owns the resource
///
/// `action` completes the message "Only the owner can ...".
pub fn ensure_owner(principal: &Principal, owner: &ObjectId, action: &str) -> Result<()> {
    match authorize(&principal.id, owner) {
        Access::Authorized => Ok(()),
        Access::Forbidden => Err(VidtubeError::Forbidden(format!(
            "Only the owner can {}",
            action
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: ObjectId) -> Principal {
        Principal {
            id,
            username: "carol".into(),
            email: "carol@example.com".into(),
            fullname: "Carol".into(),
        }
    }

    #[test]
    fn test_owner_is_authorized() {
        let id = ObjectId::new();
        assert_eq!(authorize(&id, &id), Access::Authorized);
        assert!(ensure_owner(&principal(id), &id, "edit this video").is_ok());
    }

    #[test]
    fn test_non_owner_is_forbidden() {
        let err = ensure_owner(&principal(ObjectId::new()), &ObjectId::new(), "delete this tweet")
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Only the owner can delete this tweet");
    }

    #[test]
    fn test_principal_requires_object_id_subject() {
        let claims = AccessClaims {
            sub: "abc".into(),
            username: "x".into(),
            email: "x@y.z".into(),
            fullname: "X".into(),
            iat: 0,
            exp: 0,
        };
        assert!(Principal::from_claims(claims).is_err());
    }
}
