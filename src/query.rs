//! Query builder: turns raw list-endpoint parameters into a normalized
//! filter, sort order and pagination window. Pure; the diesel translation
//! lives in `db::repository`.

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 12;

/// Raw parameters as submitted by the client. Parsed leniently: unparsable
/// numbers are treated as absent, and `size` may repeat.
#[derive(Debug, Default, Clone)]
pub struct ListParams {
    pub category: Option<String>,
    pub sizes: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub exclude: Option<i32>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListParams {
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
        let mut params = ListParams::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "category" => params.category = Some(value),
                "size" => params.sizes.push(value),
                "minPrice" => params.min_price = value.parse().ok(),
                "maxPrice" => params.max_price = value.parse().ok(),
                "search" => params.search = Some(value),
                "exclude" => params.exclude = value.parse().ok(),
                "sort" => params.sort = Some(value),
                "page" => params.page = value.parse().ok(),
                "limit" => params.limit = value.parse().ok(),
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    Newest,
    Oldest,
}

impl SortKey {
    /// Unrecognized or absent values fall back to newest-first.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("price-asc") => SortKey::PriceAsc,
            Some("price-desc") => SortKey::PriceDesc,
            Some("oldest") => SortKey::Oldest,
            _ => SortKey::Newest,
        }
    }
}

/// Normalized list query: all criteria AND-combine, the page window is
/// zero-based `(page - 1) * limit`.
#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub sizes: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    pub exclude: Option<i32>,
    pub sort: SortKey,
    pub page: i64,
    pub limit: i64,
}

impl ProductFilter {
    pub fn new(params: ListParams) -> Self {
        ProductFilter {
            category: params.category,
            sizes: params.sizes,
            min_price: params.min_price,
            max_price: params.max_price,
            search: params.search,
            exclude: params.exclude,
            sort: SortKey::parse(params.sort.as_deref()),
            page: params.page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT).max(1),
        }
    }

    pub fn offset(&self) -> i64 {
        // Saturating: page and limit come from the client, and an absurd
        // page must yield an empty page, not an overflow.
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter::new(ListParams::default())
    }
}
