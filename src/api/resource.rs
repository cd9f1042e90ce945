//! Generic CRUD endpoints, instantiated once per resource kind.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::db::RawDocument;
use crate::errors::{AppError, AppJson};
use crate::logsink::LogKind;
use crate::models::{DeleteAck, InsertAck, Resource, UpdateAck};
use crate::AppState;

/// A document as listed to clients: the typed body plus its `_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Stored<R> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub document: R,
}

impl<R: Resource> Stored<R> {
    pub fn from_raw(raw: RawDocument) -> Result<Self, AppError> {
        Ok(Self {
            id: raw.id,
            document: serde_json::from_value(raw.body)?,
        })
    }
}

/// POST /api/{collection} - Create a document, stamping server defaults.
pub async fn create<R: Resource>(
    State(state): State<AppState>,
    AppJson(request): AppJson<R::Create>,
) -> Result<Json<InsertAck>, AppError> {
    let document = R::create(request, Utc::now());
    state.log(
        LogKind::Debug,
        format!("Creating {}", R::LABEL.to_lowercase()),
        serde_json::to_value(&document)?,
    );

    let id = state.store.insert(R::COLLECTION, &document).await?;
    state.log(
        LogKind::Info,
        format!("{} created", R::LABEL),
        json!({ "id": id }),
    );

    Ok(Json(InsertAck::new(id)))
}

/// GET /api/{collection} - List the whole collection.
pub async fn list<R: Resource>(
    State(state): State<AppState>,
) -> Result<Json<Vec<Stored<R>>>, AppError> {
    let documents = state
        .store
        .find_all(R::COLLECTION, R::list_order())
        .await?
        .into_iter()
        .map(Stored::<R>::from_raw)
        .collect::<Result<Vec<_>, _>>()?;

    state.log(
        LogKind::Info,
        format!("{} list retrieved", R::LABEL),
        json!({ "count": documents.len() }),
    );

    Ok(Json(documents))
}

/// PUT /api/{collection}/:id - Merge the given fields into a document.
pub async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<R::Update>,
) -> Result<Json<UpdateAck>, AppError> {
    let fields = fields_of(&request)?;
    let outcome = state.store.update_by_id(R::COLLECTION, &id, &fields).await?;

    Ok(Json(UpdateAck::new(outcome.matched, outcome.modified)))
}

/// DELETE /api/{collection}/:id - Delete a document.
pub async fn remove<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, AppError> {
    let deleted = state.store.delete_by_id(R::COLLECTION, &id).await?;
    state.log(
        LogKind::Info,
        format!("{} deleted", R::LABEL),
        json!({ "id": id }),
    );

    Ok(Json(DeleteAck::new(deleted)))
}

/// Serialize an update request into the field map handed to the store.
pub(crate) fn fields_of<T: Serialize>(request: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(request)? {
        Value::Object(fields) => Ok(fields),
        other => Err(AppError::Internal(format!(
            "Update payload must be an object, got {}",
            other
        ))),
    }
}
