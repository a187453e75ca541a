use std::time::Duration;

use castline_trait::fetcher::PageSource;
use castline_types::FetchError;

/// Walk a cursor-paginated listing from the first page to the last and
/// concatenate its items in page order.
///
/// Waits `pacing` between consecutive requests, never after the last page.
/// Any page error ends the listing with that error.
pub async fn collect_pages<S>(source: &S, pacing: Duration) -> Result<Vec<S::Item>, FetchError>
where
    S: PageSource + ?Sized,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.fetch_page(cursor.as_deref()).await?;
        pages += 1;
        tracing::debug!("Fetched page {} with {} items", pages, page.items.len());
        items.extend(page.items);

        match page.next {
            Some(next) => {
                cursor = Some(next);
                if !pacing.is_zero() {
                    tokio::time::sleep(pacing).await;
                }
            }
            None => break,
        }
    }

    tracing::debug!("Collected {} items over {} pages", items.len(), pages);
    Ok(items)
}
