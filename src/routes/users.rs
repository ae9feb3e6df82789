//! Account, session and channel routes (`/api/v1/users/*`)

use hyper::body::Incoming;
use hyper::header::COOKIE;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{
    expired_cookie, read_cookie, session_cookie, TokenPair, ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::db::schemas::{AccountUpdate, Registration, UserProfile};
use crate::routes::{
    json_response, ok, read_json, read_multipart, require_principal, optional_principal,
    route_not_found, with_cookies, FullBody,
};
use crate::server::AppState;
use crate::services::users::{self, Credentials, ProfileImage};
use crate::types::{ApiResponse, Result};

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::POST, ["register"]) => register(state, req).await,
        (&Method::POST, ["login"]) => login(state, req).await,
        (&Method::POST, ["logout"]) => logout(state, req).await,
        (&Method::POST, ["refresh-token"]) => refresh_token(state, req).await,
        (&Method::POST, ["change-password"]) => change_password(state, req).await,
        (&Method::GET, ["current-user"]) => {
            let principal = require_principal(state, req.headers()).await?;
            let user = users::current_user(&state.store, &principal).await?;
            ok(user, "Current user fetched successfully")
        }
        (&Method::PATCH, ["update-account"]) => update_account(state, req).await,
        (&Method::PATCH, ["avatar"]) => replace_image(state, req, ProfileImage::Avatar).await,
        (&Method::PATCH, ["cover-image"]) => {
            replace_image(state, req, ProfileImage::CoverImage).await
        }
        (&Method::GET, ["c", username]) => {
            let principal = optional_principal(state, req.headers()).await?;
            let channel = users::channel_profile(&state.store, username, principal.as_ref()).await?;
            ok(channel, "User channel fetched successfully")
        }
        (&Method::GET, ["history"]) => {
            let principal = require_principal(state, req.headers()).await?;
            let history = users::watch_history(&state.store, &principal).await?;
            ok(history, "Watch history fetched successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}

async fn register(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let mut form = read_multipart(state, req).await?;

    let registration = Registration::normalized(
        form.text("fullname"),
        form.text("email"),
        form.text("username"),
        form.text("password"),
    )?;
    let avatar = form.take_file("avatar");
    let cover_image = form.take_file("coverImage");

    let user = users::register(
        &state.store,
        state.media.as_ref(),
        registration,
        avatar,
        cover_image,
    )
    .await?;

    Ok(json_response(&ApiResponse::new(
        StatusCode::CREATED,
        user,
        "User registered successfully",
    )))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: UserProfile,
    access_token: String,
    refresh_token: String,
}

fn session_cookies(state: &AppState, tokens: &TokenPair) -> [String; 2] {
    [
        session_cookie(
            ACCESS_COOKIE,
            &tokens.access_token,
            state.tokens.access_expiry_seconds(),
        ),
        session_cookie(
            REFRESH_COOKIE,
            &tokens.refresh_token,
            state.tokens.refresh_expiry_seconds(),
        ),
    ]
}

async fn login(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let body: LoginBody = read_json(req).await?;
    let credentials = Credentials {
        username: body.username,
        email: body.email,
        password: body.password,
    };

    let (user, tokens) = users::login(&state.store, &state.tokens, credentials).await?;
    let cookies = session_cookies(state, &tokens);

    let data = SessionData {
        user,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    };
    Ok(with_cookies(
        json_response(&ApiResponse::ok(data, "User logged in successfully")),
        &cookies,
    ))
}

async fn logout(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let principal = require_principal(state, req.headers()).await?;
    users::logout(&state.store, &principal).await?;

    Ok(with_cookies(
        json_response(&ApiResponse::ok(
            serde_json::json!({}),
            "User logged out successfully",
        )),
        &[expired_cookie(ACCESS_COOKIE), expired_cookie(REFRESH_COOKIE)],
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    refresh_token: Option<String>,
}

async fn refresh_token(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let from_cookie = read_cookie(
        req.headers().get(COOKIE).and_then(|v| v.to_str().ok()),
        REFRESH_COOKIE,
    );
    let presented = match from_cookie {
        Some(token) => Some(token),
        None => read_json::<RefreshBody>(req).await?.refresh_token,
    };

    let tokens = users::refresh_session(&state.store, &state.tokens, presented).await?;
    let cookies = session_cookies(state, &tokens);

    Ok(with_cookies(
        json_response(&ApiResponse::ok(tokens, "Access token refreshed")),
        &cookies,
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordBody {
    old_password: Option<String>,
    new_password: Option<String>,
}

async fn change_password(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let principal = require_principal(state, req.headers()).await?;
    let body: ChangePasswordBody = read_json(req).await?;

    users::change_password(&state.store, &principal, body.old_password, body.new_password)
        .await?;
    ok(serde_json::json!({}), "Password changed successfully")
}

#[derive(Debug, Default, Deserialize)]
struct AccountBody {
    fullname: Option<String>,
    email: Option<String>,
}

async fn update_account(state: &AppState, req: Request<Incoming>) -> Result<Response<FullBody>> {
    let principal = require_principal(state, req.headers()).await?;
    let body: AccountBody = read_json(req).await?;

    let update = AccountUpdate {
        fullname: body.fullname,
        email: body.email,
    };
    let user = users::update_account(&state.store, &principal, update).await?;
    ok(user, "Account details updated successfully")
}

async fn replace_image(
    state: &AppState,
    req: Request<Incoming>,
    which: ProfileImage,
) -> Result<Response<FullBody>> {
    let principal = require_principal(state, req.headers()).await?;
    let mut form = read_multipart(state, req).await?;
    let file = form.take_file(which.field());

    let user =
        users::replace_image(&state.store, state.media.as_ref(), &principal, which, file).await?;

    let message = match which {
        ProfileImage::Avatar => "Avatar updated successfully",
        ProfileImage::CoverImage => "Cover image updated successfully",
    };
    ok(user, message)
}
