//! Accounts, sessions and channel pages

use bson::doc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, Principal, TokenIssuer, TokenPair};
use crate::db::schemas::{
    clear_refresh_token, set_avatar, set_cover_image, set_password_hash, set_refresh_token,
    AccountUpdate, Registration, UserDoc, UserProfile,
};
use crate::db::Store;
use crate::media::{delete_quietly, MediaStore, ResourceKind, TempUpload};
use crate::query::views::{ChannelProfile, VideoCard, WatchHistory};
use crate::query::{fetch_one, pipelines};
use crate::types::{Result, VidtubeError};

/// Create an account with an avatar and optional cover image
///
/// Text fields are validated and the handles checked for uniqueness before
/// anything is uploaded.
pub async fn register(
    store: &Store,
    media: &dyn MediaStore,
    registration: Registration,
    avatar: Option<TempUpload>,
    cover_image: Option<TempUpload>,
) -> Result<UserProfile> {
    let avatar = avatar.ok_or_else(|| VidtubeError::MissingFields(vec!["avatar".into()]))?;

    let taken = store
        .users
        .find_one(doc! {
            "$or": [
                { "username": registration.username.as_str() },
                { "email": registration.email.as_str() },
            ]
        })
        .await?;
    if taken.is_some() {
        return Err(VidtubeError::Conflict(
            "User with this email or username already exists".into(),
        ));
    }

    let avatar = media.upload(&avatar, ResourceKind::Image).await?;
    let cover_image = match cover_image {
        Some(file) => match media.upload(&file, ResourceKind::Image).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                delete_quietly(media, vec![avatar.url], ResourceKind::Image).await;
                return Err(e);
            }
        },
        None => None,
    };

    let uploaded: Vec<String> = std::iter::once(avatar.url.clone())
        .chain(cover_image.as_ref().map(|c| c.url.clone()))
        .collect();

    let created = async {
        let user = UserDoc::create(registration, avatar.url, cover_image.map(|c| c.url))?;
        let id = store.users.insert_one(user).await?;
        store
            .users
            .find_by_id(&id)
            .await?
            .ok_or_else(|| VidtubeError::Internal("Registered user not found".into()))
    }
    .await;

    match created {
        Ok(user) => {
            info!(username = %user.username, "User registered");
            Ok(user.profile())
        }
        Err(e) => {
            delete_quietly(media, uploaded, ResourceKind::Image).await;
            Err(e)
        }
    }
}

/// Credentials for [`login`]; either handle may identify the account
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Check credentials and start a session
pub async fn login(
    store: &Store,
    tokens: &TokenIssuer,
    credentials: Credentials,
) -> Result<(UserProfile, TokenPair)> {
    let normalize = |v: Option<String>| {
        v.map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    };
    let username = normalize(credentials.username);
    let email = normalize(credentials.email);

    let mut handles = Vec::new();
    if let Some(username) = &username {
        handles.push(doc! { "username": username.as_str() });
    }
    if let Some(email) = &email {
        handles.push(doc! { "email": email.as_str() });
    }
    if handles.is_empty() {
        return Err(VidtubeError::InvalidInput("Username or email is required".into()));
    }

    let password = credentials
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| VidtubeError::MissingFields(vec!["password".into()]))?;

    let user = store
        .users
        .find_one(doc! { "$or": handles })
        .await?
        .ok_or_else(|| VidtubeError::NotFound("User does not exist".into()))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(VidtubeError::Forbidden("Invalid user credentials".into()));
    }

    let pair = tokens.issue_pair(&user)?;
    let user = store
        .users
        .update_by_id(&user.id()?, set_refresh_token(&pair.refresh_token))
        .await?
        .ok_or_else(|| VidtubeError::NotFound("User does not exist".into()))?;

    info!(username = %user.username, "User logged in");
    Ok((user.profile(), pair))
}

/// End the session by forgetting the stored refresh token
pub async fn logout(store: &Store, principal: &Principal) -> Result<()> {
    store
        .users
        .update_by_id(&principal.id, clear_refresh_token())
        .await?;
    Ok(())
}

/// Exchange a refresh token for a new pair
///
/// The presented token must be the one stored on the user, so each refresh
/// token works once.
pub async fn refresh_session(
    store: &Store,
    tokens: &TokenIssuer,
    presented: Option<String>,
) -> Result<TokenPair> {
    let presented = presented
        .filter(|t| !t.is_empty())
        .ok_or_else(|| VidtubeError::Unauthorized("Refresh token is required".into()))?;

    let claims = tokens.verify_refresh(&presented)?;
    let user_id = bson::oid::ObjectId::parse_str(&claims.sub)
        .map_err(|_| VidtubeError::Unauthorized("Invalid refresh token".into()))?;

    let user = store
        .users
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| VidtubeError::Unauthorized("Invalid refresh token".into()))?;

    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        warn!(username = %user.username, "Rejected stale refresh token");
        return Err(VidtubeError::Unauthorized(
            "Refresh token is expired or used".into(),
        ));
    }

    let pair = tokens.issue_pair(&user)?;
    store
        .users
        .update_by_id(&user_id, set_refresh_token(&pair.refresh_token))
        .await?;

    Ok(pair)
}

pub async fn change_password(
    store: &Store,
    principal: &Principal,
    old_password: Option<String>,
    new_password: Option<String>,
) -> Result<()> {
    let old_password = old_password.unwrap_or_default();
    let new_password = new_password.unwrap_or_default();

    let mut missing = Vec::new();
    if old_password.is_empty() {
        missing.push("oldPassword".to_string());
    }
    if new_password.is_empty() {
        missing.push("newPassword".to_string());
    }
    if !missing.is_empty() {
        return Err(VidtubeError::MissingFields(missing));
    }

    let user = load(store, principal).await?;
    if !verify_password(&old_password, &user.password_hash)? {
        return Err(VidtubeError::InvalidInput("Invalid old password".into()));
    }

    store
        .users
        .update_by_id(&principal.id, set_password_hash(&hash_password(&new_password)?))
        .await?;

    info!(username = %user.username, "Password changed");
    Ok(())
}

pub async fn current_user(store: &Store, principal: &Principal) -> Result<UserProfile> {
    Ok(load(store, principal).await?.profile())
}

pub async fn update_account(
    store: &Store,
    principal: &Principal,
    update: AccountUpdate,
) -> Result<UserProfile> {
    let update = update.into_update()?.ok_or_else(|| {
        VidtubeError::InvalidInput("Provide fullname or email to update".into())
    })?;

    let user = store
        .users
        .update_by_id(&principal.id, update)
        .await?
        .ok_or_else(|| VidtubeError::NotFound("User does not exist".into()))?;

    Ok(user.profile())
}

/// Which profile image to replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    CoverImage,
}

impl ProfileImage {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::CoverImage => "coverImage",
        }
    }
}

/// Replace the avatar or cover image, removing the previous asset
pub async fn replace_image(
    store: &Store,
    media: &dyn MediaStore,
    principal: &Principal,
    which: ProfileImage,
    file: Option<TempUpload>,
) -> Result<UserProfile> {
    let file = file.ok_or_else(|| VidtubeError::MissingFields(vec![which.field().into()]))?;
    let previous = load(store, principal).await?;

    let asset = media.upload(&file, ResourceKind::Image).await?;
    let (update, old_url) = match which {
        ProfileImage::Avatar => (set_avatar(&asset.url), previous.avatar),
        ProfileImage::CoverImage => (set_cover_image(&asset.url), previous.cover_image),
    };

    let user = match store.users.update_by_id(&principal.id, update).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            delete_quietly(media, vec![asset.url], ResourceKind::Image).await;
            return Err(VidtubeError::NotFound("User does not exist".into()));
        }
        Err(e) => {
            delete_quietly(media, vec![asset.url], ResourceKind::Image).await;
            return Err(e);
        }
    };

    delete_quietly(media, vec![old_url], ResourceKind::Image).await;
    Ok(user.profile())
}

/// Channel page of a user by username
pub async fn channel_profile(
    store: &Store,
    username: &str,
    principal: Option<&Principal>,
) -> Result<ChannelProfile> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(VidtubeError::InvalidInput("Username is missing".into()));
    }

    fetch_one(
        &store.users,
        pipelines::channel_profile(&username, principal.map(|p| &p.id)),
    )
    .await?
    .ok_or_else(|| VidtubeError::NotFound("Channel does not exist".into()))
}

pub async fn watch_history(store: &Store, principal: &Principal) -> Result<Vec<VideoCard>> {
    let history: Option<WatchHistory> =
        fetch_one(&store.users, pipelines::watch_history(principal.id)).await?;
    Ok(history.map(|h| h.history).unwrap_or_default())
}

async fn load(store: &Store, principal: &Principal) -> Result<UserDoc> {
    store
        .users
        .find_by_id(&principal.id)
        .await?
        .ok_or_else(|| VidtubeError::NotFound("User does not exist".into()))
}
