//! REST API module.
//!
//! One set of generic CRUD handlers serves every resource kind; messages add
//! the like counter on top.

mod messages;
mod resource;

pub use messages::*;
pub use resource::*;

use axum::{
    routing::{post, put, MethodRouter},
    Router,
};

use crate::models::{EcoTest, Message, Resource, Tip, TrackingEntry};
use crate::AppState;

/// Routes for `/{collection}` and `/{collection}/{id}`.
///
/// `update` is the PUT handler for single documents, so a resource can
/// replace the generic field merge.
fn resource_routes<R: Resource>(update: MethodRouter<AppState>) -> Router<AppState> {
    let collection = format!("/{}", R::COLLECTION);
    let item = format!("/{}/{{id}}", R::COLLECTION);

    Router::new()
        .route(&collection, post(create::<R>).get(list::<R>))
        .route(&item, update.delete(remove::<R>))
}

/// All API routes, to be nested under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Tests
        .merge(resource_routes::<EcoTest>(put(update::<EcoTest>)))
        // Tips
        .merge(resource_routes::<Tip>(put(update::<Tip>)))
        // Tracking entries
        .merge(resource_routes::<TrackingEntry>(put(update::<TrackingEntry>)))
        // Messages
        .merge(resource_routes::<Message>(put(update_message)))
        .route("/mensajes/{id}/like", post(like_message))
}
