//! Product listing query builder.
//!
//! Turns the raw `GET /api/products` query string into a MongoDB filter, a sort
//! and a page window. Nothing here touches the database, the service layer
//! runs the resulting count and pipeline.

use mongodb::bson::{doc, Bson, Document, Regex};
use serde::Deserialize;

use crate::database::CATEGORIES;
use crate::utils::text::fold_diacritics;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_SORT_FIELD: &str = "price";

/// Raw listing parameters. Everything is kept as a string so that a bad
/// number degrades to its default instead of rejecting the request.
#[derive(Debug, Default, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Case- and accent-insensitive substring of the product name
    pub search: Option<String>,
    /// Inclusive lower price bound
    pub min_price: Option<String>,
    /// Inclusive upper price bound
    pub max_price: Option<String>,
    /// Field to sort by (default `price`)
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub sort_order: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 10, max 100)
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub filter: Document,
    pub sort: Document,
    pub page: u64,
    pub limit: u64,
}

impl ProductQuery {
    pub fn from_params(params: &ProductListParams) -> Self {
        Self {
            filter: build_filter(params),
            sort: build_sort(params.sort_by.as_deref(), params.sort_order.as_deref()),
            page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(params.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }

    /// Page window with the category reference resolved.
    pub fn pipeline(&self) -> Vec<Document> {
        let mut pipeline = vec![
            doc! { "$match": self.filter.clone() },
            doc! { "$sort": self.sort.clone() },
            doc! { "$skip": to_i64(self.skip()) },
            doc! { "$limit": to_i64(self.limit) },
        ];
        pipeline.extend(lookup_category_stages());
        pipeline
    }
}

/// `$lookup` + `$unwind` replacing `category` with the category document.
/// Products whose category was deleted keep flowing, without the field.
pub fn lookup_category_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": CATEGORIES,
                "localField": "category",
                "foreignField": "_id",
                "as": "category",
            }
        },
        doc! {
            "$unwind": {
                "path": "$category",
                "preserveNullAndEmptyArrays": true,
            }
        },
    ]
}

fn build_filter(params: &ProductListParams) -> Document {
    let mut filter = Document::new();

    if let Some(pattern) = params.search.as_deref().and_then(search_pattern) {
        filter.insert(
            "nameFolded",
            Bson::RegularExpression(Regex {
                pattern,
                options: "i".to_string(),
            }),
        );
    }

    let min_price = parse_price(params.min_price.as_deref());
    let max_price = parse_price(params.max_price.as_deref());
    if min_price.is_some() || max_price.is_some() {
        let mut range = Document::new();
        if let Some(min) = min_price {
            range.insert("$gte", min);
        }
        if let Some(max) = max_price {
            range.insert("$lte", max);
        }
        filter.insert("price", range);
    }

    filter
}

/// Folded, literal pattern for a search term. NUL cannot be encoded in a
/// BSON regex, so it is dropped before the blank check.
fn search_pattern(search: &str) -> Option<String> {
    let search = search.replace('\0', "");
    let search = search.trim();
    if search.is_empty() {
        return None;
    }
    Some(regex::escape(&fold_diacritics(search)))
}

fn build_sort(sort_by: Option<&str>, sort_order: Option<&str>) -> Document {
    let field = sort_by
        .map(str::trim)
        .filter(|f| is_sortable_field(f))
        .unwrap_or(DEFAULT_SORT_FIELD);
    let direction = match sort_order.map(str::trim) {
        Some(order) if order.eq_ignore_ascii_case("desc") => -1,
        _ => 1,
    };

    let mut sort = Document::new();
    sort.insert(field, direction);
    // Ties need a total order or pages overlap
    if field != "_id" {
        sort.insert("_id", 1);
    }
    sort
}

/// Field names the server would reject outright. Unknown but well-formed
/// names pass through and sort as a no-op.
fn is_sortable_field(field: &str) -> bool {
    !field.starts_with('$')
        && !field.contains('\0')
        && field.split('.').all(|segment| !segment.is_empty())
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
