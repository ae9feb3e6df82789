//! Query layer behavior through the public API, without a database
//!
//! Pipelines are checked for the stages clients depend on; facet results
//! are hand-built the way MongoDB returns them.

use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use vidtube::query::views::{TweetItem, VideoCard};
use vidtube::query::{pipelines, FeedFilter, Page, PageRequest};
use vidtube::types::{ApiResponse, ErrorBody};
use vidtube::VidtubeError;

fn facet(items: Vec<Document>, total: i32) -> Vec<Document> {
    let items: Vec<Bson> = items.into_iter().map(Bson::Document).collect();
    let total = if total > 0 {
        vec![Bson::Document(doc! { "count": total })]
    } else {
        Vec::new()
    };
    vec![doc! { "items": items, "total": total }]
}

fn stage_names(pipeline: &[Document]) -> Vec<String> {
    pipeline
        .iter()
        .filter_map(|stage| stage.keys().next().cloned())
        .collect()
}

#[test]
fn page_past_the_end_is_empty_not_an_error() {
    let request = PageRequest::from_query(Some("2"), Some("5"), 100);
    let page: Page<VideoCard> = assert_ok!(Page::from_facet(&request, facet(Vec::new(), 3)));

    assert!(page.items.is_empty());
    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next_page);
    assert!(page.has_prev_page);
}

#[test]
fn empty_collection_yields_zero_pages() {
    let request = PageRequest::default();
    let page: Page<VideoCard> = assert_ok!(Page::from_facet(&request, Vec::new()));

    assert_eq!(page.total_items, 0);
    assert_eq!(page.total_pages, 0);
    assert!(!page.has_next_page);
    assert!(!page.has_prev_page);
}

#[test]
fn limit_is_capped_and_defaults_apply() {
    let request = PageRequest::from_query(Some("0"), Some("5000"), 100);
    assert_eq!(request.page, 1);
    assert_eq!(request.limit, 100);

    let request = PageRequest::from_query(Some("abc"), None, 100);
    assert_eq!(request, PageRequest::default());
}

#[test]
fn tweet_page_renders_client_json() {
    let tweet_id = ObjectId::new();
    let owner_id = ObjectId::new();
    let item = doc! {
        "_id": tweet_id,
        "content": "hello",
        "createdAt": DateTime::from_millis(0),
        "updatedAt": DateTime::from_millis(0),
        "likesCount": 2,
        "isLiked": true,
        "owner": { "_id": owner_id, "username": "alice", "fullname": "Alice", "avatar": "a.png" },
    };

    let request = PageRequest::from_query(Some("1"), Some("10"), 100);
    let page: Page<TweetItem> = assert_ok!(Page::from_facet(&request, facet(vec![item], 1)));
    let body = serde_json::to_value(ApiResponse::ok(page, "Tweets fetched successfully")).unwrap();

    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["totalItems"], 1);
    assert_eq!(body["data"]["hasNextPage"], false);

    let tweet = &body["data"]["items"][0];
    assert_eq!(tweet["_id"], json!(tweet_id.to_hex()));
    assert_eq!(tweet["likesCount"], 2);
    assert_eq!(tweet["isLiked"], true);
    assert_eq!(tweet["createdAt"], "1970-01-01T00:00:00Z");
    assert_eq!(tweet["owner"]["_id"], json!(owner_id.to_hex()));
    assert_eq!(tweet["owner"]["username"], "alice");
}

#[test]
fn malformed_page_item_is_an_internal_error() {
    let request = PageRequest::default();
    let bad = vec![doc! { "items": [1, 2], "total": [{ "count": 2 }] }];
    let err: VidtubeError = assert_err!(Page::<VideoCard>::from_facet(&request, bad));
    assert_eq!(err.status_code().as_u16(), 500);
}

#[test]
fn paginated_feed_ends_with_facet() {
    let filter = FeedFilter {
        owner: Some(ObjectId::new()),
        query: Some("rust".into()),
        sort_by: Some("views".into()),
        sort_type: Some("asc".into()),
    };
    let request = PageRequest::from_query(Some("3"), Some("4"), 100);
    let pipeline = request.paginate(pipelines::video_feed(&filter));

    let names = stage_names(&pipeline);
    assert_eq!(names.first().map(String::as_str), Some("$match"));
    assert_eq!(names.last().map(String::as_str), Some("$facet"));

    let facet = pipeline.last().unwrap().get_document("$facet").unwrap();
    let items = facet.get_array("items").unwrap();
    assert_eq!(items[0].as_document().unwrap().get_i64("$skip").unwrap(), 8);
    assert_eq!(items[1].as_document().unwrap().get_i64("$limit").unwrap(), 4);
}

#[test]
fn anonymous_tweet_feed_never_reports_liked() {
    let pipeline = pipelines::tweet_feed(ObjectId::new(), None);
    let is_liked = pipeline
        .iter()
        .filter_map(|stage| stage.get_document("$addFields").ok())
        .find_map(|fields| fields.get("isLiked").cloned());

    assert_eq!(is_liked, Some(Bson::Boolean(false)));
}

#[test]
fn signed_in_tweet_feed_checks_membership() {
    let viewer = ObjectId::new();
    let pipeline = pipelines::tweet_feed(ObjectId::new(), Some(&viewer));
    let is_liked = pipeline
        .iter()
        .filter_map(|stage| stage.get_document("$addFields").ok())
        .find_map(|fields| fields.get_document("isLiked").ok().cloned());

    let is_liked = is_liked.expect("isLiked expression");
    let operands = is_liked.get_array("$in").unwrap();
    assert_eq!(operands[0], Bson::ObjectId(viewer));
}

#[test]
fn error_envelope_lists_missing_fields() {
    let err = VidtubeError::MissingFields(vec!["title".into(), "videoFile".into()]);
    let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();

    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"], json!(["title", "videoFile"]));
}
