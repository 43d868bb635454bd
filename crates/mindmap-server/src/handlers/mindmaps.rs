//! Mind map CRUD, generation, upload and export

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use mindmap_core::{OutlineNode, parse_markdown};
use mindmap_generator::{ExportFormat, GenerationRequest, Language};
use mindmap_store::{MindMap, MindMapSummary, NewMindMap};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::require_access;

#[derive(Debug, Deserialize)]
pub struct MarkdownMindMap {
    #[serde(default)]
    pub title: Option<String>,
    pub markdown: String,
    #[serde(default)]
    pub language: Language,
}

fn outline_from_markdown(markdown: &str, title: Option<&str>) -> ApiResult<(String, OutlineNode)> {
    let fallback = title.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("Mind Map");
    let outline = parse_markdown(markdown, fallback)
        .ok_or_else(|| ApiError::Validation("Markdown contains no headings or list items".into()))?;
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map_or_else(|| outline.label.clone(), str::to_string);
    Ok((title, outline))
}

pub async fn list_mindmaps(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<MindMapSummary>>> {
    Ok(Json(state.db.list_mindmaps(&auth.user.id).await?))
}

pub async fn create_mindmap(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<MarkdownMindMap>,
) -> ApiResult<(StatusCode, Json<MindMap>)> {
    let (title, outline) = outline_from_markdown(&request.markdown, request.title.as_deref())?;
    let language = request.language.resolve(&request.markdown);
    let map = state
        .db
        .create_mindmap(
            &auth.user.id,
            &NewMindMap {
                title,
                outline,
                language: language.code().to_string(),
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map)))
}

pub async fn generate_mindmap(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<(StatusCode, Json<MindMap>)> {
    require_access(&state, &auth.user).await?;

    let language = request.language.resolve(&request.input.render());
    let outline = state.generator.generate(&request).await?;
    let title = if request.title.trim().is_empty() {
        outline.label.clone()
    } else {
        request.title.trim().to_string()
    };

    tracing::info!(user_id = %auth.user.id, nodes = outline.node_count(), "Generated mind map");
    let map = state
        .db
        .create_mindmap(
            &auth.user.id,
            &NewMindMap {
                title,
                outline,
                language: language.code().to_string(),
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map)))
}

/// Multipart fields: `file` (PDF), optional `title` and `language`
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<MindMap>)> {
    require_access(&state, &auth.user).await?;

    let mut file = None;
    let mut file_name = None;
    let mut title = None;
    let mut language = Language::Auto;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| ApiError::Validation(e.to_string()))?;
                file = Some(bytes);
            }
            Some("title") => {
                title = Some(field.text().await.map_err(|e| ApiError::Validation(e.to_string()))?);
            }
            Some("language") => {
                let value = field.text().await.map_err(|e| ApiError::Validation(e.to_string()))?;
                language = value.parse().map_err(ApiError::Validation)?;
            }
            _ => {}
        }
    }

    let bytes = file.ok_or_else(|| ApiError::Validation("Missing 'file' field".into()))?;
    let title = title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| {
            file_name
                .as_deref()
                .map(|name| name.trim_end_matches(".pdf").trim_end_matches(".PDF").to_string())
        })
        .unwrap_or_else(|| "Document".into());

    tracing::info!(user_id = %auth.user.id, bytes = bytes.len(), %title, "Processing uploaded document");
    let outline = state.pipeline.generate_from_pdf(&bytes, &title, language).await?;

    let map = state
        .db
        .create_mindmap(
            &auth.user.id,
            &NewMindMap {
                title,
                outline,
                language: language.code().to_string(),
            },
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map)))
}

pub async fn get_mindmap(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MindMap>> {
    state
        .db
        .get_mindmap(&auth.user.id, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

pub async fn update_mindmap(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<MarkdownMindMap>,
) -> ApiResult<Json<MindMap>> {
    let (title, outline) = outline_from_markdown(&request.markdown, request.title.as_deref())?;
    let map = state
        .db
        .update_mindmap(&auth.user.id, &id, &title, &outline, Utc::now())
        .await?;
    Ok(Json(map))
}

pub async fn delete_mindmap(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_mindmap(&auth.user.id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_mindmap(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, format)): Path<(String, String)>,
) -> ApiResult<Response> {
    let format: ExportFormat = format.parse().map_err(ApiError::Validation)?;
    let map = state
        .db
        .get_mindmap(&auth.user.id, &id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let body = format.render(&map.title, &map.outline);
    let disposition = format!("attachment; filename=\"{}\"", format.file_name(&map.title));
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
