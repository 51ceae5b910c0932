use crate::error::Result;
use crate::pacing::PacingState;
use crate::quota::OperationClass;

use either::Either;

use futures::stream::{self, Stream, StreamExt};
use futures::Future;

use std::iter;

/// One page of a paginated listing: the items fetched, plus the cursor for the next page.
/// `next: None` is the remote end-marker; an empty `items` also terminates the listing.
#[derive(Debug)]
pub(crate) struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

/// Drive a page-fetch capability into a lazy stream of items.
///
/// Every page request, the first included, is preceded by a `pace` suspension for the given
/// operation class, so consuming the stream slowly only ever makes the waits shorter. Items
/// are emitted in page order before the next page is requested. Any fetch (or registry)
/// error is yielded once and ends the stream; items already emitted stay valid.
pub(crate) fn paginate<'a, T, C, F, Fut>(
    pacing: &'a PacingState,
    class: OperationClass,
    first: C,
    fetch: F,
) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    C: 'a,
    F: FnMut(C) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T, C>>> + 'a,
{
    // The fetch capability travels through the unfold state so the returned future may
    // borrow it mutably; `None` marks an ended listing.
    stream::unfold(Some((first, fetch)), move |state| async move {
        let (cursor, mut fetch) = state?;

        if let Err(e) = pacing.pace(class).await {
            return Some((Either::Left(iter::once(Err(e))), None));
        }

        match fetch(cursor).await {
            Err(e) => Some((Either::Left(iter::once(Err(e))), None)),
            Ok(page) if page.items.is_empty() => None,
            Ok(page) => {
                let next = page.next.map(|cursor| (cursor, fetch));
                Some((Either::Right(page.items.into_iter().map(Ok)), next))
            }
        }
    })
    .map(stream::iter)
    .flatten()
}
