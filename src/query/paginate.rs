//! Pagination adapter
//!
//! Turns `page`/`limit` query parameters into a `$facet` appended to a
//! pipeline, and the facet result into a uniform [`Page`].

use bson::{doc, Bson, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::types::{Result, VidtubeError};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Validated page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Parse raw query values
    ///
    /// Missing or non-numeric values fall back to the defaults, a page below
    /// 1 becomes 1, a limit below 1 becomes the default and a limit above
    /// `max_limit` is capped.
    pub fn from_query(page: Option<&str>, limit: Option<&str>, max_limit: u64) -> Self {
        let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());

        let page = match parse(page) {
            Some(p) if p >= 1 => p as u64,
            _ => DEFAULT_PAGE,
        };
        let limit = match parse(limit) {
            Some(l) if l >= 1 => l as u64,
            _ => DEFAULT_LIMIT,
        };

        Self {
            page,
            limit: limit.min(max_limit.max(1)),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// The `$facet` stage producing one page of items and the total count
    pub fn facet(&self) -> Document {
        let skip = i64::try_from(self.skip()).unwrap_or(i64::MAX);
        let limit = i64::try_from(self.limit).unwrap_or(i64::MAX);

        doc! {
            "$facet": {
                "items": [{ "$skip": skip }, { "$limit": limit }],
                "total": [{ "$count": "count" }],
            }
        }
    }

    /// Append the facet to a pipeline
    pub fn paginate(&self, mut pipeline: Vec<Document>) -> Vec<Document> {
        pipeline.push(self.facet());
        pipeline
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl<T: Serialize + DeserializeOwned> Page<T> {
    /// Decode the single document a `$facet` stage emits
    pub fn from_facet(request: &PageRequest, result: Vec<Document>) -> Result<Self> {
        let Some(facet) = result.into_iter().next() else {
            return Ok(Self::assemble(request, Vec::new(), 0));
        };

        let items = match facet.get("items") {
            Some(Bson::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Bson::Document(d) => bson::from_document::<T>(d.clone()).map_err(VidtubeError::from),
                    other => Err(VidtubeError::Internal(format!(
                        "Unexpected page item: {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<T>>>()?,
            _ => Vec::new(),
        };

        let total = match facet.get("total") {
            Some(Bson::Array(total)) => total
                .first()
                .and_then(Bson::as_document)
                .and_then(|d| match d.get("count") {
                    Some(Bson::Int32(n)) => Some(*n as i64),
                    Some(Bson::Int64(n)) => Some(*n),
                    _ => None,
                })
                .unwrap_or(0),
            _ => 0,
        };

        Ok(Self::assemble(request, items, total.max(0) as u64))
    }
}

impl<T: Serialize> Page<T> {
    fn assemble(request: &PageRequest, items: Vec<T>, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.limit.max(1));
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total_items,
            total_pages,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}
