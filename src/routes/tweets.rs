//! Tweet routes (`/api/v1/tweets/*`)

use hyper::body::Incoming;
use hyper::{Method, Request, Response};

use crate::db::parse_id;
use crate::routes::{
    ok, optional_principal, page_request, read_json, require_principal, route_not_found,
    ContentBody, FullBody,
};
use crate::server::AppState;
use crate::services::tweets;
use crate::types::Result;

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::POST, []) => {
            let principal = require_principal(state, req.headers()).await?;
            let body: ContentBody = read_json(req).await?;
            let tweet = tweets::create(&state.store, &principal, body.content).await?;
            ok(tweet, "Tweet created successfully")
        }
        (&Method::GET, ["user", user_id]) => {
            let user_id = parse_id(user_id, "user id")?;
            let page = page_request(state, &req)?;
            let principal = optional_principal(state, req.headers()).await?;
            let items = tweets::user_tweets(&state.store, user_id, principal.as_ref(), &page).await?;
            ok(items, "Tweets fetched successfully")
        }
        (&Method::PATCH, [tweet_id]) => {
            let tweet_id = parse_id(tweet_id, "tweet id")?;
            let principal = require_principal(state, req.headers()).await?;
            let body: ContentBody = read_json(req).await?;
            let tweet = tweets::update(&state.store, &principal, tweet_id, body.content).await?;
            ok(tweet, "Tweet updated successfully")
        }
        (&Method::DELETE, [tweet_id]) => {
            let tweet_id = parse_id(tweet_id, "tweet id")?;
            let principal = require_principal(state, req.headers()).await?;
            tweets::delete(&state.store, &principal, tweet_id).await?;
            ok(serde_json::json!({}), "Tweet deleted successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}
