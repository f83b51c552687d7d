use crate::config::PaginationConfig;
use crate::error::{Error, Result};
use sea_orm::{ConnectionTrait, PaginatorTrait, SelectorTrait};

/// A 1-based page request with a size already clamped to the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub count: u64,
    pub request: PageRequest,
    pub items: Vec<T>,
}

impl PageRequest {
    /// Builds a request from raw `page` and `limit` parameters.
    ///
    /// A malformed page number is an error; a malformed or missing limit falls
    /// back to the default page size.
    pub fn parse(page: Option<&str>, limit: Option<&str>, config: &PaginationConfig) -> Result<Self> {
        let page = match page {
            None => 1,
            Some("last") => u64::MAX,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(Error::InvalidPage),
            },
        };

        let size = limit
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|size| *size > 0)
            .map(|size| size.min(config.max_page_size))
            .unwrap_or(config.page_size);

        Ok(Self { page, size })
    }

    pub fn first(size: u64) -> Self {
        Self { page: 1, size }
    }

    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(self.size).max(1)
    }

    /// Resolves `last` and rejects pages past the end. The first page is always valid.
    pub fn resolve(self, count: u64) -> Result<Self> {
        let num_pages = self.num_pages(count);
        let page = if self.page == u64::MAX {
            num_pages
        } else {
            self.page
        };

        if page > num_pages {
            return Err(Error::InvalidPage);
        }

        Ok(Self {
            page,
            size: self.size,
        })
    }

    pub fn has_next(&self, count: u64) -> bool {
        self.page < self.num_pages(count)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            request: self.request,
            items: self.items.into_iter().map(f).collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.request.has_next(self.count)
    }

    pub fn has_previous(&self) -> bool {
        self.request.has_previous()
    }
}

/// Counts the query's rows and loads the requested page.
pub async fn fetch_page<'db, C, Q>(
    db: &'db C,
    query: Q,
    request: PageRequest,
) -> Result<Page<<Q::Selector as SelectorTrait>::Item>>
where
    C: ConnectionTrait,
    Q: PaginatorTrait<'db, C>,
{
    let paginator = query.paginate(db, request.size);
    let count = paginator.num_items().await?;
    let request = request.resolve(count)?;
    let items = paginator.fetch_page(request.page - 1).await?;

    Ok(Page {
        count,
        request,
        items,
    })
}
