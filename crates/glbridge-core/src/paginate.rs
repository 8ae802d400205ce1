//! Lazy iteration over cursor-paginated upstream listings.
//!
//! A listing is described by a page fetcher `fetch(opts) -> Page<T>` and an
//! `advance(opts, next_page)` step. [`paginate`] turns that pair into a
//! stream of items that fetches pages serially, on demand:
//!
//! - items of a page are yielded before the next page is requested,
//! - a `next_page` of `0` ends the stream,
//! - a fetch error is yielded once and ends the stream,
//! - dropping the stream stops all further fetches.
//!
//! ```ignore
//! let issues = paginate_scoped(project, ListIssuesOptions::default(), |project, opts| async move {
//!     service.list_project_issues(&project, opts).await
//! });
//! let first_50 = collect_all(limited(issues, 50)).await?;
//! ```

use std::collections::VecDeque;
use std::future::Future;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::Result;

/// Largest page size the upstream accepts.
pub const MAX_PER_PAGE: u64 = 100;

/// One page of a listing plus the cursor of the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Next page number, `0` when this is the last page
    pub next_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: u64) -> Self {
        Self { items, next_page }
    }

    /// A page with nothing after it.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, 0)
    }
}

/// `page` / `per_page` query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "is_zero")]
    pub page: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub per_page: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl ListOptions {
    /// Options requesting the largest page size.
    pub fn max_page() -> Self {
        Self {
            page: 0,
            per_page: MAX_PER_PAGE,
        }
    }
}

/// Request options that carry a page cursor.
pub trait Paginated {
    fn list_options(&self) -> &ListOptions;
    fn list_options_mut(&mut self) -> &mut ListOptions;
}

impl Paginated for ListOptions {
    fn list_options(&self) -> &ListOptions {
        self
    }

    fn list_options_mut(&mut self) -> &mut ListOptions {
        self
    }
}

struct Pager<T, O, F, A> {
    opts: O,
    fetch: F,
    advance: A,
    buffer: VecDeque<T>,
    exhausted: bool,
}

/// Stream every item of a listing, advancing with an explicit step function.
pub fn paginate_with<'a, T, O, F, Fut, A>(opts: O, fetch: F, advance: A) -> BoxStream<'a, Result<T>>
where
    T: Send + 'a,
    O: Clone + Send + 'a,
    F: FnMut(O) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
    A: FnMut(&mut O, u64) + Send + 'a,
{
    let pager = Pager {
        opts,
        fetch,
        advance,
        buffer: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(pager, |mut pager| async move {
        loop {
            if let Some(item) = pager.buffer.pop_front() {
                return Some((Ok(item), pager));
            }
            if pager.exhausted {
                return None;
            }

            match (pager.fetch)(pager.opts.clone()).await {
                Ok(page) => {
                    pager.buffer.extend(page.items);
                    if page.next_page == 0 {
                        pager.exhausted = true;
                    } else {
                        (pager.advance)(&mut pager.opts, page.next_page);
                    }
                }
                Err(e) => {
                    pager.exhausted = true;
                    return Some((Err(e), pager));
                }
            }
        }
    })
    .boxed()
}

/// Stream every item of a listing whose options carry a page cursor.
pub fn paginate<'a, T, O, F, Fut>(opts: O, fetch: F) -> BoxStream<'a, Result<T>>
where
    T: Send + 'a,
    O: Paginated + Clone + Send + 'a,
    F: FnMut(O) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    paginate_with(opts, fetch, |opts: &mut O, next| {
        opts.list_options_mut().page = next;
    })
}

/// Like [`paginate`] for listings scoped to a parent (project, group,
/// merge request): the parent is handed to every fetch.
pub fn paginate_scoped<'a, P, T, O, F, Fut>(
    parent: P,
    opts: O,
    mut fetch: F,
) -> BoxStream<'a, Result<T>>
where
    P: Clone + Send + 'a,
    T: Send + 'a,
    O: Paginated + Clone + Send + 'a,
    F: FnMut(P, O) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    paginate(opts, move |opts| fetch(parent.clone(), opts))
}

/// Yield at most `n` items. Errors seen before the n-th item still surface.
pub fn limited<'a, T: Send + 'a>(items: BoxStream<'a, Result<T>>, n: usize) -> BoxStream<'a, Result<T>> {
    items.take(n).boxed()
}

/// Drain a stream, failing on the first error.
pub async fn collect_all<T>(items: BoxStream<'_, Result<T>>) -> Result<Vec<T>> {
    items.try_collect().await
}

/// Resolve a user-facing limit: non-positive values select `default`.
pub fn effective_limit(limit: i64, default: usize) -> usize {
    if limit <= 0 {
        default
    } else {
        limit as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves `pages` in order; page numbers are 1-based.
    fn fake_fetcher(
        pages: Vec<Vec<u32>>,
        calls: Arc<AtomicUsize>,
    ) -> impl FnMut(ListOptions) -> futures::future::Ready<Result<Page<u32>>> + Send {
        move |opts: ListOptions| {
            calls.fetch_add(1, Ordering::SeqCst);
            let index = opts.page.max(1) as usize - 1;
            let next = if index + 1 < pages.len() {
                index as u64 + 2
            } else {
                0
            };
            futures::future::ready(Ok(Page::new(pages[index].clone(), next)))
        }
    }

    #[tokio::test]
    async fn test_concatenates_pages() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = paginate(
            ListOptions::max_page(),
            fake_fetcher(vec![vec![1, 2], vec![3], vec![4, 5]], calls.clone()),
        );

        assert_eq!(collect_all(items).await.unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = paginate(ListOptions::default(), fake_fetcher(vec![vec![]], calls.clone()));

        assert!(collect_all(items).await.unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_limited_stops_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = paginate(
            ListOptions::max_page(),
            fake_fetcher(vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]], calls.clone()),
        );

        let taken = collect_all(limited(items, 2)).await.unwrap();
        assert_eq!(taken, vec![1, 2]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_limited_crossing_page_boundary() {
        let calls = Arc::new(AtomicUsize::new(0));
        let items = paginate(
            ListOptions::max_page(),
            fake_fetcher(vec![vec![1, 2], vec![3, 4], vec![5]], calls.clone()),
        );

        let taken = collect_all(limited(items, 3)).await.unwrap();
        assert_eq!(taken, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_error_yielded_once_then_ends() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let items = paginate(ListOptions::default(), move |opts: ListOptions| {
            counter.fetch_add(1, Ordering::SeqCst);
            let result = if opts.page <= 1 {
                Ok(Page::new(vec![1u32], 2))
            } else {
                Err(Error::Http("connection reset".into()))
            };
            futures::future::ready(result)
        });

        let all: Vec<Result<u32>> = items.collect().await;
        assert_eq!(all.len(), 2);
        assert_eq!(*all[0].as_ref().unwrap(), 1);
        assert!(matches!(all[1], Err(Error::Http(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_limited_surfaces_early_error() {
        let items = paginate(ListOptions::default(), |_opts: ListOptions| {
            futures::future::ready(Err::<Page<u32>, _>(Error::Http("down".into())))
        });

        let result = collect_all(limited(items, 10)).await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_paginate_scoped_passes_parent() {
        let items = paginate_scoped(
            "group/project".to_string(),
            ListOptions::max_page(),
            |parent: String, opts: ListOptions| async move {
                assert_eq!(parent, "group/project");
                assert_eq!(opts.per_page, MAX_PER_PAGE);
                let next = if opts.page == 0 { 2 } else { 0 };
                Ok(Page::new(vec![format!("{}#{}", parent, opts.page)], next))
            },
        );

        let all = collect_all(items).await.unwrap();
        assert_eq!(all, vec!["group/project#0", "group/project#2"]);
    }

    #[tokio::test]
    async fn test_paginate_with_custom_advance() {
        #[derive(Clone)]
        struct Cursor(u64);

        let items = paginate_with(
            Cursor(10),
            |cursor: Cursor| async move {
                let next = if cursor.0 < 30 { cursor.0 + 10 } else { 0 };
                Ok(Page::new(vec![cursor.0], next))
            },
            |cursor: &mut Cursor, next| cursor.0 = next,
        );

        assert_eq!(collect_all(items).await.unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(0, 1000), 1000);
        assert_eq!(effective_limit(-5, 100), 100);
        assert_eq!(effective_limit(25, 1000), 25);
    }

    #[test]
    fn test_list_options_query() {
        let value = serde_json::to_value(ListOptions::max_page()).unwrap();
        assert_eq!(value, serde_json::json!({"per_page": 100}));
    }
}
