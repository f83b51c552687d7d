use crate::config::PaginationConfig;
use crate::error::Result;
use crate::pagination::{Page, PageRequest};
use axum::http::Uri;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

pub fn query_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

pub fn page_request(pairs: &[(String, String)], config: &PaginationConfig) -> Result<PageRequest> {
    PageRequest::parse(query_value(pairs, "page"), query_value(pairs, "limit"), config)
}

/// Rewrites the request URI with `page` replaced. Page 1 drops the parameter.
fn page_link(uri: &Uri, page: u64) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();
    if page > 1 {
        params.push(format!("page={page}"));
    }

    if params.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}

impl<T> Paginated<T> {
    pub fn new(page: Page<T>, uri: &Uri) -> Self {
        let current = page.request.page;
        Self {
            next: page.has_next().then(|| page_link(uri, current + 1)),
            previous: page.has_previous().then(|| page_link(uri, current - 1)),
            count: page.count,
            results: page.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u64, count: u64) -> Page<u8> {
        Page {
            count,
            request: PageRequest { page, size: 2 },
            items: vec![],
        }
    }

    #[test]
    fn test_links_keep_other_parameters() {
        let uri: Uri = "/api/recipes?tags=lunch&page=2&limit=2".parse().unwrap();
        let paginated = Paginated::new(page(2, 5), &uri);

        assert_eq!(
            paginated.next.as_deref(),
            Some("/api/recipes?tags=lunch&limit=2&page=3")
        );
        assert_eq!(
            paginated.previous.as_deref(),
            Some("/api/recipes?tags=lunch&limit=2")
        );
    }

    #[test]
    fn test_single_page_has_no_links() {
        let uri: Uri = "/api/users".parse().unwrap();
        let paginated = Paginated::new(page(1, 2), &uri);

        assert!(paginated.next.is_none());
        assert!(paginated.previous.is_none());
        assert_eq!(paginated.count, 2);
    }

    #[test]
    fn test_next_link_without_query() {
        let uri: Uri = "/api/users".parse().unwrap();
        let paginated = Paginated::new(page(1, 3), &uri);
        assert_eq!(paginated.next.as_deref(), Some("/api/users?page=2"));
    }
}
