//! Paging, sorting and filtering contract shared by every list endpoint.

pub mod field_map;

pub use field_map::{FieldMap, CUSTOMER_FIELDS, ENTRY_FIELDS, SHIPMENT_FIELDS};

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Value of `per_page` that asks for every matching record.
pub const ALL_RECORDS: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub name: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: false,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    pub key: String,
    pub value: String,
}

impl FilterField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Paging parameters of a list request.
///
/// `skip` is private and only ever derived from `page` and `per_page` by
/// [`RequestMeta::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub page: i64,
    /// Requested records per page, [`ALL_RECORDS`] for no limit
    pub per_page: i64,
    #[serde(default)]
    pub sort: Vec<SortField>,
    #[serde(default)]
    pub filters: Vec<FilterField>,
    #[serde(skip)]
    skip: i64,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self::new(1, ALL_RECORDS)
    }
}

impl RequestMeta {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page,
            per_page,
            sort: Vec::new(),
            filters: Vec::new(),
            skip: 0,
        }
    }

    pub fn with_sort(mut self, field: SortField) -> Self {
        self.sort.push(field);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(FilterField::new(key, value));
        self
    }

    /// Clamps `page` to at least 1 and recomputes `skip`. Applying it twice
    /// yields the same value.
    ///
    /// `skip` is 0 whenever `per_page <= 0`, whatever the page: without a
    /// page size there is only one page.
    pub fn check(mut self) -> Self {
        if self.page < 1 {
            self.page = 1;
        }
        self.skip = if self.page > 1 && self.per_page > 0 {
            (self.page - 1).saturating_mul(self.per_page)
        } else {
            0
        };
        self
    }

    /// Number of records to skip. Zero until [`RequestMeta::check`] has run.
    pub fn skip(&self) -> i64 {
        self.skip
    }

    /// Backend limit, `None` when every record is requested.
    pub fn limit(&self) -> Option<i64> {
        (self.per_page >= 1).then_some(self.per_page)
    }

    /// Builds the meta from raw query pairs.
    ///
    /// Recognised keys: `page`, `per_page`, `sort` (comma separated, a leading
    /// `-` sorts descending, may repeat) and `filter[<field>]` / `filters[<field>]`.
    /// Anything else is ignored.
    pub fn from_query_pairs(
        pairs: &[(String, String)],
        default_per_page: i64,
    ) -> Result<Self, ServiceError> {
        let mut meta = Self::new(1, default_per_page);

        for (key, value) in pairs {
            match key.as_str() {
                "page" => meta.page = parse_int("page", value)?,
                "per_page" => meta.per_page = parse_int("per_page", value)?,
                "sort" => {
                    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        match name.strip_prefix('-') {
                            Some(stripped) => meta.sort.push(SortField::desc(stripped)),
                            None => meta.sort.push(SortField::asc(name)),
                        }
                    }
                }
                other => {
                    if let Some(field) = filter_key(other) {
                        meta.filters.push(FilterField::new(field, value.clone()));
                    }
                }
            }
        }

        Ok(meta.check())
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, ServiceError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::ValidationError(format!("{} must be an integer", name)))
}

fn filter_key(key: &str) -> Option<&str> {
    key.strip_prefix("filter[")
        .or_else(|| key.strip_prefix("filters["))
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Paging information returned beside every list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Current page
    pub page: i64,
    /// Records on this page
    pub count: i64,
    /// Records available for pagination
    pub total: i64,
}

impl ResponseMeta {
    pub fn empty(page: i64) -> Self {
        Self {
            page,
            count: 0,
            total: 0,
        }
    }

    /// Meta for a response holding exactly the given records.
    pub fn single_page(count: usize) -> Self {
        let count = count as i64;
        Self {
            page: 1,
            count,
            total: count,
        }
    }
}
