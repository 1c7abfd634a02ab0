//! genji-ranks library - skill tiers and map submissions
//!
//! Computes player tiers from completion records, keeps tier roles in sync on
//! the community server, and persists new map submissions.

use axum::Router;
use genji_common::events::EventBus;

pub mod api;
pub mod config;
pub mod error;
pub mod maps;
pub mod membership;
pub mod ranks;

pub use error::{Error, Result};

use maps::MapService;
use ranks::RankService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub ranks: RankService,
    pub maps: MapService,
    /// Newsfeed bus
    pub events: EventBus,
}

impl AppState {
    /// Wire the map service to the rank service it resyncs through
    pub fn new(ranks: RankService, events: EventBus) -> Self {
        let maps = MapService::new(ranks.db().clone(), ranks.clone(), events.clone());
        Self { ranks, maps, events }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let api = Router::new()
        .route("/api/players/:id/ranks", get(api::get_ranks))
        .route("/api/players/:id/ranks/sync", post(api::sync_ranks))
        .route(
            "/api/players/:id/submissions/latest",
            get(api::get_last_submission),
        )
        .route("/api/maps", post(api::submit_map))
        .route("/api/maps/:code", get(api::get_map))
        .route("/api/maps/:code/ratings", post(api::rate_map))
        .route("/api/maps/:code/archived", put(api::set_archived))
        .route("/api/events", get(api::event_stream));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .with_state(state)
}
