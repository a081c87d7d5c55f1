//! Bounded pagination over listing pages.

use crate::listing::ListingError;

/// Hard ceiling on pages fetched per search.
pub const MAX_PAGES: u32 = 100;

/// Outcome of a paged search for an exact item.
#[derive(Debug, PartialEq, Eq)]
pub enum Search<T> {
    Found(T),
    /// No match. `fetched_any` is false when the very first page was empty.
    Exhausted { fetched_any: bool },
}

/// Fetch pages 1..=MAX_PAGES until `pred` matches an item or a page comes
/// back empty.
pub fn find<T, F, P>(mut fetch: F, pred: P) -> Result<Search<T>, ListingError>
where
    F: FnMut(u32) -> Result<Vec<T>, ListingError>,
    P: Fn(&T) -> bool,
{
    for page in 1..=MAX_PAGES {
        let items = fetch(page)?;
        if items.is_empty() {
            return Ok(Search::Exhausted {
                fetched_any: page > 1,
            });
        }
        if let Some(found) = items.into_iter().find(|item| pred(item)) {
            return Ok(Search::Found(found));
        }
    }
    Ok(Search::Exhausted { fetched_any: true })
}

/// Walk pages 1..=MAX_PAGES, handing each item to `visit` until it returns
/// `Some` or the listing ends. Returns the visitor's hit, if any.
pub fn scan<T, R, F, V>(mut fetch: F, mut visit: V) -> Result<Option<R>, ListingError>
where
    F: FnMut(u32) -> Result<Vec<T>, ListingError>,
    V: FnMut(T) -> Option<R>,
{
    for page in 1..=MAX_PAGES {
        let items = fetch(page)?;
        if items.is_empty() {
            break;
        }
        for item in items {
            if let Some(hit) = visit(item) {
                return Ok(Some(hit));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(data: Vec<Vec<u32>>) -> impl FnMut(u32) -> Result<Vec<u32>, ListingError> {
        move |page| Ok(data.get(page as usize - 1).cloned().unwrap_or_default())
    }

    #[test]
    fn find_across_pages() {
        let out = find(pages(vec![vec![1, 2], vec![3, 4]]), |n| *n == 4).unwrap();
        assert_eq!(out, Search::Found(4));
    }

    #[test]
    fn first_page_empty_means_nothing_fetched() {
        let out = find(pages(vec![]), |n: &u32| *n == 1).unwrap();
        assert_eq!(out, Search::Exhausted { fetched_any: false });
        let out = find(pages(vec![vec![7]]), |n| *n == 1).unwrap();
        assert_eq!(out, Search::Exhausted { fetched_any: true });
    }

    #[test]
    fn page_ceiling_bounds_calls() {
        let mut calls = 0;
        let out = find(
            |_| {
                calls += 1;
                Ok(vec![0u32])
            },
            |n| *n == 1,
        )
        .unwrap();
        assert_eq!(out, Search::Exhausted { fetched_any: true });
        assert_eq!(calls, MAX_PAGES);
    }

    #[test]
    fn errors_propagate() {
        let out = find(
            |_| -> Result<Vec<u32>, ListingError> {
                Err(ListingError::Http {
                    url: "u".into(),
                    status: 404,
                })
            },
            |_| true,
        );
        assert!(matches!(out, Err(ListingError::Http { status: 404, .. })));
    }
}
