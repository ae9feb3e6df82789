//! Reusable aggregation stage builders
//!
//! Every per-endpoint pipeline in [`crate::query::pipelines`] is assembled
//! from these. Stored field names are snake_case; the final `$project` of a
//! pipeline maps them to the camelCase names clients see.

use bson::{doc, oid::ObjectId, Bson, Document};

use crate::db::schemas::{LikeKind, LIKE_COLLECTION, USER_COLLECTION};

/// `$match` on an arbitrary filter
pub fn match_filter(filter: Document) -> Document {
    doc! { "$match": filter }
}

/// `$match` on a single field equality
pub fn match_eq(field: &str, value: impl Into<Bson>) -> Document {
    let mut filter = Document::new();
    filter.insert(field, value.into());
    match_filter(filter)
}

pub fn match_published() -> Document {
    match_eq("is_published", true)
}

/// Case-insensitive title search, `None` for a blank query
///
/// The query is escaped, so it matches literally.
pub fn title_search(query: Option<&str>) -> Option<Document> {
    let query = query.map(str::trim).filter(|q| !q.is_empty())?;
    Some(match_filter(doc! {
        "title": { "$regex": escape_regex(query), "$options": "i" }
    }))
}

/// Escape regex metacharacters
pub fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(
            c,
            '\\' | '^' | '$' | '.' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '-'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Plain `$lookup` on a local/foreign key pair
pub fn lookup(from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Document {
    doc! {
        "$lookup": {
            "from": from,
            "localField": local_field,
            "foreignField": foreign_field,
            "as": as_field,
        }
    }
}

/// `$lookup` on a key pair with a nested sub-pipeline over the joined rows
pub fn lookup_with_pipeline(
    from: &str,
    local_field: &str,
    foreign_field: &str,
    as_field: &str,
    pipeline: Vec<Document>,
) -> Document {
    let mut stage = lookup(from, local_field, foreign_field, as_field);
    if let Ok(inner) = stage.get_document_mut("$lookup") {
        inner.insert("pipeline", pipeline);
    }
    stage
}

/// Join the likes of one target kind, keeping only `liked_by`
pub fn likes_lookup(kind: LikeKind, as_field: &str) -> Document {
    lookup_with_pipeline(
        LIKE_COLLECTION,
        "_id",
        "target.id",
        as_field,
        vec![
            match_eq("target.kind", kind.as_str()),
            doc! { "$project": { "liked_by": 1 } },
        ],
    )
}

/// Join a user as a small public card
///
/// `extra` runs inside the join before the card projection, for per-user
/// derived fields such as subscriber counts; `card_fields` names the
/// additional fields those stages produce.
pub fn user_card_lookup(
    local_field: &str,
    as_field: &str,
    mut extra: Vec<Document>,
    card_fields: &[&str],
) -> Document {
    let mut card = doc! { "username": 1, "fullname": 1, "avatar": 1 };
    for field in card_fields {
        card.insert(*field, 1);
    }
    extra.push(doc! { "$project": card });

    lookup_with_pipeline(USER_COLLECTION, local_field, "_id", as_field, extra)
}

/// Number of elements of an array field, 0 when missing
pub fn size_of(field: &str) -> Bson {
    Bson::Document(doc! { "$size": { "$ifNull": [field_path(field), []] } })
}

/// First element of an array field; the field disappears when the array is empty
pub fn first_of(field: &str) -> Bson {
    Bson::Document(doc! { "$arrayElemAt": [field_path(field), 0] })
}

/// Sum over an array path such as `videos.views`
pub fn sum_of(path: &str) -> Bson {
    Bson::Document(doc! { "$sum": field_path(path) })
}

/// Whether the acting principal appears in an array path
///
/// Anonymous callers get the literal `false`.
pub fn contains_principal(principal: Option<&ObjectId>, path: &str) -> Bson {
    match principal {
        Some(id) => contains_id(id, path),
        None => Bson::Boolean(false),
    }
}

/// Whether a fixed id appears in an array path
pub fn contains_id(id: &ObjectId, path: &str) -> Bson {
    Bson::Document(doc! {
        "$in": [*id, { "$ifNull": [field_path(path), []] }]
    })
}

pub fn add_fields(fields: Document) -> Document {
    doc! { "$addFields": fields }
}

pub fn project(fields: Document) -> Document {
    doc! { "$project": fields }
}

/// Newest first on a date field, `_id` as tie-breaker
pub fn sort_newest(field: &str) -> Document {
    let mut sort = Document::new();
    sort.insert(field, -1);
    sort.insert("_id", -1);
    doc! { "$sort": sort }
}

/// Sortable video fields: client name → stored field
pub const VIDEO_SORT_FIELDS: &[(&str, &str)] = &[
    ("createdAt", "metadata.created_at"),
    ("updatedAt", "metadata.updated_at"),
    ("views", "views"),
    ("duration", "duration"),
    ("title", "title"),
];

/// `$sort` from caller-supplied field and direction
///
/// Unknown fields fall back to newest first. `sortType=asc` sorts ascending,
/// anything else descending.
pub fn sort_by(
    requested: Option<&str>,
    sort_type: Option<&str>,
    allowed: &[(&str, &str)],
) -> Document {
    let field = requested.and_then(|requested| {
        allowed
            .iter()
            .find(|(name, _)| *name == requested)
            .map(|(_, stored)| *stored)
    });

    let Some(field) = field else {
        return sort_newest("metadata.created_at");
    };

    let direction = match sort_type.map(str::to_ascii_lowercase).as_deref() {
        Some("asc") | Some("ascending") | Some("1") => 1,
        _ => -1,
    };

    let mut sort = Document::new();
    sort.insert(field, direction);
    sort.insert("_id", direction);
    doc! { "$sort": sort }
}

fn field_path(field: &str) -> String {
    if field.starts_with('$') {
        field.to_string()
    } else {
        format!("${}", field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_search_is_escaped_and_case_insensitive() {
        let stage = title_search(Some(" rust (2024)? ")).unwrap();
        let title = stage
            .get_document("$match")
            .unwrap()
            .get_document("title")
            .unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), r"rust \(2024\)\?");
        assert_eq!(title.get_str("$options").unwrap(), "i");

        assert!(title_search(Some("   ")).is_none());
        assert!(title_search(None).is_none());
    }

    #[test]
    fn test_anonymous_membership_is_literal_false() {
        assert_eq!(contains_principal(None, "likes.liked_by"), Bson::Boolean(false));

        let id = ObjectId::new();
        let expr = contains_principal(Some(&id), "likes.liked_by");
        let args = expr.as_document().unwrap().get_array("$in").unwrap();
        assert_eq!(args[0], Bson::ObjectId(id));
        assert_eq!(
            args[1].as_document().unwrap().get_array("$ifNull").unwrap()[0],
            Bson::String("$likes.liked_by".into())
        );
    }

    #[test]
    fn test_sort_allow_list() {
        let stage = sort_by(Some("views"), Some("asc"), VIDEO_SORT_FIELDS);
        let sort = stage.get_document("$sort").unwrap();
        assert_eq!(sort.get_i32("views").unwrap(), 1);
        assert_eq!(sort.get_i32("_id").unwrap(), 1);

        // Stored names and unknown fields are not accepted from callers
        for requested in ["password_hash", "metadata.created_at", "nope"] {
            let stage = sort_by(Some(requested), Some("asc"), VIDEO_SORT_FIELDS);
            let sort = stage.get_document("$sort").unwrap();
            assert_eq!(sort.get_i32("metadata.created_at").unwrap(), -1);
            assert_eq!(sort.len(), 2);
        }

        let stage = sort_by(Some("createdAt"), None, VIDEO_SORT_FIELDS);
        assert_eq!(
            stage
                .get_document("$sort")
                .unwrap()
                .get_i32("metadata.created_at")
                .unwrap(),
            -1
        );
    }

    #[test]
    fn test_likes_lookup_filters_by_kind() {
        let stage = likes_lookup(LikeKind::Comment, "likes");
        let lookup = stage.get_document("$lookup").unwrap();
        assert_eq!(lookup.get_str("from").unwrap(), "likes");
        assert_eq!(lookup.get_str("foreignField").unwrap(), "target.id");

        let pipeline = lookup.get_array("pipeline").unwrap();
        let first = pipeline[0].as_document().unwrap();
        assert_eq!(
            first
                .get_document("$match")
                .unwrap()
                .get_str("target.kind")
                .unwrap(),
            "comment"
        );
    }

    #[test]
    fn test_user_card_never_exposes_credentials() {
        let stage = user_card_lookup("owner", "owner", Vec::new(), &["subscribersCount"]);
        let pipeline = stage
            .get_document("$lookup")
            .unwrap()
            .get_array("pipeline")
            .unwrap();
        let card = pipeline
            .last()
            .and_then(Bson::as_document)
            .unwrap()
            .get_document("$project")
            .unwrap();

        assert!(card.contains_key("username"));
        assert!(card.contains_key("subscribersCount"));
        assert!(!card.contains_key("password_hash"));
        assert!(!card.contains_key("refresh_token"));
        assert!(!card.contains_key("email"));
    }

    #[test]
    fn test_derived_field_expressions() {
        assert_eq!(
            size_of("likes"),
            Bson::Document(doc! { "$size": { "$ifNull": ["$likes", []] } })
        );
        assert_eq!(
            first_of("owner"),
            Bson::Document(doc! { "$arrayElemAt": ["$owner", 0] })
        );
        assert_eq!(
            sum_of("videos.views"),
            Bson::Document(doc! { "$sum": "$videos.views" })
        );
    }
}
