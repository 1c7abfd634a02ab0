//! Newsfeed event stream

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/events
///
/// Streams RankChanged and MapSubmitted events as they are emitted.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    genji_common::sse::create_event_sse_stream(&state.events, "genji-ranks")
}
