use crate::error::Result;
use crate::pacing::PacingState;
use crate::quota::OperationClass;

use either::Either;

use futures::stream::{self, Stream, StreamExt};
use futures::Future;

use std::iter;

/// The platform's documented ceiling on ids per bulk-lookup request. A policy value, not a
/// protocol constant; [`crate::client::Client::lookup_batch_size`] overrides it.
pub(crate) const DEFAULT_LOOKUP_BATCH: usize = 100;

/// Drive a bulk-lookup capability over an ordered id list, one paced request per batch.
///
/// Ids are partitioned into consecutive batches of at most `batch_size`, preserving input
/// order. Each batch is paced, resolved with a single call, and its items emitted before
/// the next batch is touched. A response carrying fewer items than the batch asked for is a
/// partial result, not an error: whatever came back is emitted and resolution continues. An
/// empty input produces an empty stream without any pacing at all.
pub(crate) fn resolve<'a, T, F, Fut>(
    pacing: &'a PacingState,
    class: OperationClass,
    batch_size: usize,
    ids: Vec<u64>,
    lookup: F,
) -> impl Stream<Item = Result<T>> + 'a
where
    T: 'a,
    F: FnMut(Vec<u64>) -> Fut + 'a,
    Fut: Future<Output = Result<Vec<T>>> + 'a,
{
    let batch_size = batch_size.max(1);

    stream::unfold(Some((ids, lookup)), move |state| async move {
        let (mut batch, mut lookup) = state?;

        if batch.is_empty() {
            return None;
        }

        let rest = if batch.len() > batch_size {
            batch.split_off(batch_size)
        } else {
            Vec::new()
        };

        if let Err(e) = pacing.pace(class).await {
            return Some((Either::Left(iter::once(Err(e))), None));
        }

        match lookup(batch).await {
            Err(e) => Some((Either::Left(iter::once(Err(e))), None)),
            Ok(resolved) => Some((
                Either::Right(resolved.into_iter().map(Ok)),
                Some((rest, lookup)),
            )),
        }
    })
    .map(stream::iter)
    .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AuthMode;
    use crate::error::Error;
    use crate::quota::QuotaRegistry;

    use std::sync::{Arc, Mutex};

    fn pacing() -> PacingState {
        PacingState::new(
            AuthMode::User,
            QuotaRegistry::new(vec![((OperationClass::Lookup, AuthMode::User), 900)]),
        )
    }

    /// Resolves every id to itself and records the batches it was handed.
    fn echo(
        batches: Arc<Mutex<Vec<usize>>>,
    ) -> impl FnMut(Vec<u64>) -> futures::future::Ready<Result<Vec<u64>>> {
        move |batch| {
            batches.lock().unwrap().push(batch.len());
            futures::future::ready(Ok(batch))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn partitions_into_batches_of_at_most_the_limit() {
        let pacing = pacing();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let ids: Vec<u64> = (0..250).collect();

        let resolved: Vec<_> = resolve(
            &pacing,
            OperationClass::Lookup,
            100,
            ids.clone(),
            echo(batches.clone()),
        )
        .collect()
        .await;

        assert_eq!(*batches.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(pacing.request_count(OperationClass::Lookup).await, 3);

        let resolved: Vec<u64> = resolved.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(resolved, ids);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_input_is_an_empty_stream_with_no_pacing() {
        let pacing = pacing();
        let batches = Arc::new(Mutex::new(Vec::new()));

        let resolved: Vec<Result<u64>> = resolve(
            &pacing,
            OperationClass::Lookup,
            100,
            Vec::new(),
            echo(batches.clone()),
        )
        .collect()
        .await;

        assert!(resolved.is_empty());
        assert!(batches.lock().unwrap().is_empty());
        assert_eq!(pacing.request_count(OperationClass::Lookup).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_ids_are_simply_absent() {
        let pacing = pacing();
        let ids: Vec<u64> = (0..150).collect();

        // Only even ids still exist on the remote side.
        let resolved: Vec<_> = resolve(&pacing, OperationClass::Lookup, 100, ids, |batch| {
            futures::future::ready(Ok(batch
                .into_iter()
                .filter(|id| id % 2 == 0)
                .collect::<Vec<_>>()))
        })
        .collect()
        .await;

        let resolved: Vec<u64> = resolved.into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(resolved, (0..150).filter(|id| id % 2 == 0).collect::<Vec<u64>>());
        assert_eq!(pacing.request_count(OperationClass::Lookup).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failed_batch_ends_the_stream() {
        let pacing = pacing();
        let ids: Vec<u64> = (0..150).collect();

        let collected: Vec<Result<u64>> =
            resolve(&pacing, OperationClass::Lookup, 100, ids, |batch| {
                futures::future::ready(if batch[0] == 0 {
                    Ok(batch)
                } else {
                    Err(Error::Http {
                        code: 503,
                        reason: None,
                    })
                })
            })
            .collect()
            .await;

        assert_eq!(collected.len(), 101);
        assert!(collected[..100].iter().all(|r| r.is_ok()));
        assert_eq!(
            collected[100],
            Err(Error::Http {
                code: 503,
                reason: None,
            })
        );
    }
}
