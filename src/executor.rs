//! Keep-one execution: spec.md §4.7.
//!
//! Grounded on `jplx05-wole/src/trash_ops.rs` for the trash-injection shape
//! (a plain function, panic-hardened, since `trash` can still panic on some
//! platform backends) and on
//! `jplx05-wole/src/categories/duplicates.rs::clean` for the "keep first,
//! trash the rest" traversal. Ranking is the *caller's* job — call
//! [`crate::ranker::rank`] on every group before invoking [`keep_one`] so
//! `members[0]` really is the winner.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::DuplicateFinderError;
use crate::model::DedupResult;
use crate::progress::{ProgressEvent, ProgressSink, StopToken};

/// Per-run tally of what happened to the losing members of every group.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    pub moved: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl DeleteOutcome {
    pub fn had_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Trashes every group's non-winning members, then rebuilds `result` to
/// contain only the survivors — groups reduced to one member are dropped
/// entirely. Cancellable between files, never between the two syscalls a
/// single move is made of (the `trash_fn` call is opaque to us, so there's
/// nothing to interrupt mid-call).
pub async fn keep_one<F>(
    result: &mut DedupResult,
    stop: &StopToken,
    progress: &Arc<dyn ProgressSink>,
    trash_fn: F,
) -> DeleteOutcome
where
    F: Fn(&Path) -> Result<(), DuplicateFinderError> + Send + Sync + 'static,
{
    let trash_fn = Arc::new(trash_fn);
    let mut outcome = DeleteOutcome::default();
    let mut surviving_groups = Vec::with_capacity(result.groups.len());

    // An explicit iterator (not `drain(..)`) so that breaking out early lets
    // us splice the not-yet-reached tail back into `surviving_groups` instead
    // of having `Drain`'s `Drop` impl silently discard it.
    let mut groups_iter = std::mem::take(&mut result.groups).into_iter();

    while let Some(mut group) = groups_iter.next() {
        if group.members.is_empty() {
            continue;
        }
        let winner = group.members.remove(0);
        let mut still_present = vec![winner];

        for loser in group.members.drain(..) {
            if stop.is_stopped() {
                still_present.push(loser);
                // Preserve the rest of this group's remaining members untouched,
                // then stop the whole operation, keeping every group the loop
                // hadn't reached yet intact too.
                still_present.extend(group.members.drain(..));
                group.members = still_present;
                surviving_groups.push(group);
                surviving_groups.extend(groups_iter);
                result.groups = surviving_groups;
                progress.emit(ProgressEvent::Done {
                    summary: format!(
                        "keep-one: {} moved, {} failed (cancelled)",
                        outcome.moved,
                        outcome.failed.len()
                    ),
                });
                return outcome;
            }

            let trash_fn = Arc::clone(&trash_fn);
            let path = loser.path.clone();
            let delete_result =
                tokio::task::spawn_blocking(move || trash_fn(&path))
                    .await
                    .unwrap_or_else(|join_err| {
                        Err(DuplicateFinderError::DeleteError {
                            path: loser.path.clone(),
                            message: format!("trash task panicked: {join_err}"),
                        })
                    });

            match delete_result {
                Ok(()) => {
                    outcome.moved += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    progress.emit(ProgressEvent::Warning {
                        path: loser.path.clone(),
                        message: message.clone(),
                    });
                    outcome.failed.push((loser.path.clone(), message));
                    still_present.push(loser);
                }
            }
        }

        if still_present.len() > 1 {
            group.members = still_present;
            surviving_groups.push(group);
        }
    }

    result.groups = surviving_groups;
    progress.emit(ProgressEvent::Done {
        summary: format!(
            "keep-one: {} moved, {} failed",
            outcome.moved,
            outcome.failed.len()
        ),
    });
    outcome
}

/// Default `move_to_trash` implementation: the OS trash/recycle bin via the
/// `trash` crate, hardened against the Windows-COM panic the `trash` crate
/// is known to raise when COM is already initialized with a different
/// concurrency model on the current thread.
pub fn move_to_trash(path: &Path) -> Result<(), DuplicateFinderError> {
    let owned = path.to_path_buf();
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| trash::delete(&owned))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DuplicateFinderError::DeleteError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Err(panic_payload) => Err(DuplicateFinderError::DeleteError {
            path: path.to_path_buf(),
            message: panic_payload_to_string(panic_payload),
        }),
    }
}

fn panic_payload_to_string(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
