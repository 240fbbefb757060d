//! Generic fold driver over an ordered event sequence.

use crate::{
  Error, Result,
  event::ActivityEvent,
  reducer::{PartialAggregate, Reducer},
};

/// Predicate deciding whether a folded state is a fully-formed document.
pub type CompletenessCheck = fn(&PartialAggregate) -> bool;

/// Fold `events` left to right through `reducer`, starting from the empty
/// state.
///
/// With a `check`, a final state it rejects yields
/// [`Error::IncompleteAggregate`]. Without one the partial state is returned
/// as-is and the caller decides how to fill the gaps.
pub fn aggregate_stream<R>(
  events: &[ActivityEvent],
  reducer: &R,
  check: Option<CompletenessCheck>,
) -> Result<PartialAggregate>
where
  R: Reducer + ?Sized,
{
  let state = events
    .iter()
    .try_fold(PartialAggregate::default(), |state, event| {
      reducer.reduce(state, event)
    })?;

  match check {
    Some(is_complete) if !is_complete(&state) => {
      Err(Error::IncompleteAggregate { events: events.len() })
    }
    _ => Ok(state),
  }
}
