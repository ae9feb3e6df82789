//! Subscription routes (`/api/v1/subscriptions/*`)

use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use serde::Serialize;

use crate::db::parse_id;
use crate::routes::{ok, page_request, require_principal, route_not_found, FullBody};
use crate::server::AppState;
use crate::services::subscriptions;
use crate::types::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionState {
    is_subscribed: bool,
}

pub async fn handle(
    state: &AppState,
    req: Request<Incoming>,
    segments: &[&str],
) -> Result<Response<FullBody>> {
    let method = req.method().clone();

    match (&method, segments) {
        (&Method::POST, [channel_id]) => {
            let channel_id = parse_id(channel_id, "channel id")?;
            let principal = require_principal(state, req.headers()).await?;
            let is_subscribed =
                subscriptions::toggle_subscription(&state.store, &principal, channel_id).await?;
            let message = if is_subscribed {
                "Subscribed successfully"
            } else {
                "Unsubscribed successfully"
            };
            ok(SubscriptionState { is_subscribed }, message)
        }
        (&Method::GET, [channel_id, "subscribers"]) => {
            let channel_id = parse_id(channel_id, "channel id")?;
            let page = page_request(state, &req)?;
            let items = subscriptions::channel_subscribers(&state.store, channel_id, &page).await?;
            ok(items, "Subscribers fetched successfully")
        }
        (&Method::GET, ["u", subscriber_id]) => {
            let subscriber_id = parse_id(subscriber_id, "subscriber id")?;
            let page = page_request(state, &req)?;
            let items =
                subscriptions::subscribed_channels(&state.store, subscriber_id, &page).await?;
            ok(items, "Subscribed channels fetched successfully")
        }
        _ => Err(route_not_found(&method, req.uri().path())),
    }
}
