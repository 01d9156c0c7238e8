use rocket::{
    request::{self, FromRequest, Request},
    serde::json::{json, Value},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, FieldErrors};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// MongoDB stores the skip count as a signed 64-bit integer.
const MAX_SKIP: u64 = i64::MAX as u64;

/// Which page of a listing to return. Pages are numbered from 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Pagination {
    /// Create a pagination, rejecting zero page numbers, out-of-range sizes and
    /// pages whose offset the database cannot represent.
    pub fn new(page: u64, limit: u64) -> Option<Self> {
        if page == 0 || !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return None;
        }
        let skip = (page - 1).checked_mul(limit)?;
        (skip <= MAX_SKIP).then_some(Self { page, limit })
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// How many results precede this page.
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Wrap one page of results together with the size of the full result set.
    pub fn page_of<T>(self, results: Vec<T>, total_results: u64) -> Page<T> {
        Page {
            results,
            page: self.page,
            limit: self.limit,
            total_pages: (total_results + self.limit - 1) / self.limit,
            total_results,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Read `page` and `limit` from the query string.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for Pagination {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let page = req.query_value::<u64>("page").unwrap_or(Ok(1));
        let limit = req
            .query_value::<u64>("limit")
            .unwrap_or(Ok(DEFAULT_PAGE_SIZE));
        match (page, limit) {
            (Ok(page), Ok(limit)) => match Pagination::new(page, limit) {
                Some(pagination) => request::Outcome::Success(pagination),
                None => invalid_pagination().fail_guard(req),
            },
            _ => invalid_pagination().fail_guard(req),
        }
    }
}

fn invalid_pagination() -> Error {
    let mut fields = FieldErrors::new();
    fields.insert("page", "must be a number, at least 1".to_string());
    fields.insert(
        "limit",
        format!("must be a number between 1 and {MAX_PAGE_SIZE}"),
    );
    Error::Validation {
        message: "Invalid pagination".to_string(),
        fields,
    }
}

/// One page of a listing.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_results: u64,
}

impl<T> Page<T> {
    /// Convert every result, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }

    /// Split into the results and the paging information for the envelope.
    pub fn into_parts(self) -> (Vec<T>, Value) {
        let query = json!({
            "page": self.page,
            "limit": self.limit,
            "total_pages": self.total_pages,
            "total_results": self.total_results,
        });
        (self.results, query)
    }
}
