//! User document schema
//!
//! A user is both an account and a channel other users subscribe to.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::hash_password;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{require_fields, Metadata};
use crate::db::serde_ext::{object_ids_as_hex, optional_datetime_as_rfc3339};
use crate::types::{Result, VidtubeError};

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Unique, lowercase handle
    pub username: String,

    /// Unique, lowercase email
    pub email: String,

    pub fullname: String,

    /// Media host URL of the avatar image
    pub avatar: String,

    /// Media host URL of the cover image, empty when none was uploaded
    #[serde(default)]
    pub cover_image: String,

    /// Videos this user has opened, without duplicates
    #[serde(default)]
    pub watch_history: Vec<ObjectId>,

    /// Argon2 password hash
    pub password_hash: String,

    /// Latest refresh token issued to this user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Registration input after trimming and lowercasing
#[derive(Debug, Clone)]
pub struct Registration {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Registration {
    /// Normalize and validate the text fields of a registration
    ///
    /// Runs before any upload so a rejected registration never leaves
    /// assets behind on the media host.
    pub fn normalized(
        fullname: Option<String>,
        email: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let fullname = fullname.unwrap_or_default().trim().to_string();
        let email = email.unwrap_or_default().trim().to_lowercase();
        let username = username.unwrap_or_default().trim().to_lowercase();
        let password = password.unwrap_or_default();

        require_fields(&[
            ("fullname", &fullname),
            ("email", &email),
            ("username", &username),
            ("password", &password),
        ])?;

        if !email.contains('@') {
            return Err(VidtubeError::InvalidInput("Invalid email address".into()));
        }

        if username.chars().any(char::is_whitespace) {
            return Err(VidtubeError::InvalidInput(
                "Username must not contain whitespace".into(),
            ));
        }

        Ok(Self {
            fullname,
            email,
            username,
            password,
        })
    }
}

impl UserDoc {
    /// Build a new user, hashing the password before the record exists
    pub fn create(
        registration: Registration,
        avatar: String,
        cover_image: Option<String>,
    ) -> Result<Self> {
        require_fields(&[("avatar", &avatar)])?;

        Ok(Self {
            _id: None,
            metadata: Metadata::new(),
            username: registration.username,
            email: registration.email,
            fullname: registration.fullname,
            avatar,
            cover_image: cover_image.unwrap_or_default(),
            watch_history: Vec::new(),
            password_hash: hash_password(&registration.password)?,
            refresh_token: None,
        })
    }

    pub fn id(&self) -> Result<ObjectId> {
        self._id
            .ok_or_else(|| VidtubeError::Internal("User document without _id".into()))
    }

    /// Client-facing representation without credentials
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self._id.map(|id| id.to_hex()).unwrap_or_default(),
            username: self.username.clone(),
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            watch_history: self.watch_history.clone(),
            created_at: self.metadata.created_at,
            updated_at: self.metadata.updated_at,
        }
    }
}

/// User as returned to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub avatar: String,
    pub cover_image: String,
    #[serde(serialize_with = "object_ids_as_hex")]
    pub watch_history: Vec<ObjectId>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub created_at: Option<DateTime>,
    #[serde(serialize_with = "optional_datetime_as_rfc3339")]
    pub updated_at: Option<DateTime>,
}

/// Partial update of account details
#[derive(Debug, Default, Clone)]
pub struct AccountUpdate {
    pub fullname: Option<String>,
    pub email: Option<String>,
}

impl AccountUpdate {
    /// Build the `$set` for the provided fields, `None` when nothing changes
    pub fn into_update(self) -> Result<Option<Document>> {
        let mut set = Document::new();

        if let Some(fullname) = self.fullname.map(|f| f.trim().to_string()) {
            if !fullname.is_empty() {
                set.insert("fullname", fullname);
            }
        }

        if let Some(email) = self.email.map(|e| e.trim().to_lowercase()) {
            if !email.is_empty() {
                if !email.contains('@') {
                    return Err(VidtubeError::InvalidInput("Invalid email address".into()));
                }
                set.insert("email", email);
            }
        }

        if set.is_empty() {
            return Ok(None);
        }

        Ok(Some(doc! { "$set": set }))
    }
}

/// Update storing a freshly issued refresh token
pub fn set_refresh_token(token: &str) -> Document {
    doc! { "$set": { "refresh_token": token } }
}

/// Update removing the stored refresh token (logout)
pub fn clear_refresh_token() -> Document {
    doc! { "$unset": { "refresh_token": 1 } }
}

/// Update replacing the password hash
pub fn set_password_hash(hash: &str) -> Document {
    doc! { "$set": { "password_hash": hash } }
}

/// Update replacing the avatar URL
pub fn set_avatar(url: &str) -> Document {
    doc! { "$set": { "avatar": url } }
}

/// Update replacing the cover image URL
pub fn set_cover_image(url: &str) -> Document {
    doc! { "$set": { "cover_image": url } }
}

/// Update recording a watched video, keeping history free of duplicates
pub fn add_to_watch_history(video_id: &ObjectId) -> Document {
    doc! { "$addToSet": { "watch_history": video_id } }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "username": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "fullname": 1 },
                Some(
                    IndexOptions::builder()
                        .name("fullname_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
