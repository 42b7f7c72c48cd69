//! Route handlers.

use super::{ApiError, AppState};
use crate::error::PipelineError;
use crate::models::{
    Chapter, ChapterTranslationRequest, Novel, NovelExtractionRequest, NovelRefreshRequest,
    SourceSite, Stats,
};
use crate::store::{NovelFilter, NovelOrder};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

/// Largest `n` accepted by the recently-updated and recently-read listings.
const MAX_RECENT: usize = 100;

/// Shortest accepted search query, in characters.
const MIN_SEARCH_CHARS: usize = 3;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn not_found(what: String) -> ApiError {
    ApiError::Pipeline(PipelineError::NotFound(what))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.pipeline.store().ping()?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(state.pipeline.store().stats()?))
}

pub async fn sources(State(state): State<AppState>) -> Json<Vec<SourceSite>> {
    Json(state.pipeline.sources().sites())
}

/// Query string of `GET /novels`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub genre: Option<String>,
    pub source: Option<String>,
    pub language: Option<String>,
    pub recently_updated: Option<usize>,
    pub recently_read: Option<usize>,
}

impl ListParams {
    /// Turns the query into a store filter. Languages resolve to the tags of
    /// the sources written in them.
    fn into_filter(self, sites: &[SourceSite]) -> Result<NovelFilter, ApiError> {
        let (order, limit) = match (self.recently_updated, self.recently_read) {
            (Some(_), Some(_)) => {
                return Err(ApiError::BadRequest(
                    "recently_updated and recently_read are mutually exclusive".to_string(),
                ));
            }
            (Some(n), None) => (NovelOrder::RecentlyUpdated, Some(n)),
            (None, Some(n)) => (NovelOrder::RecentlyRead, Some(n)),
            (None, None) => (NovelOrder::DateAdded, None),
        };
        if let Some(n) = limit
            && !(1..=MAX_RECENT).contains(&n)
        {
            return Err(ApiError::BadRequest(format!(
                "n must be between 1 and {}",
                MAX_RECENT
            )));
        }

        let mut sources: Option<Vec<String>> = self.source.map(|tag| vec![tag]);
        if let Some(language) = self.language {
            let tags: Vec<String> = sites
                .iter()
                .filter(|site| site.language.eq_ignore_ascii_case(&language))
                .map(|site| site.id.clone())
                .collect();
            sources = Some(match sources {
                Some(selected) => selected.into_iter().filter(|t| tags.contains(t)).collect(),
                None => tags,
            });
        }

        Ok(NovelFilter {
            genre: self.genre,
            sources,
            order,
            limit,
        })
    }
}

pub async fn list_novels(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Novel>>, ApiError> {
    let Query(params) = params.map_err(|r| ApiError::BadRequest(r.body_text()))?;
    let filter = params.into_filter(&state.pipeline.sources().sites())?;
    Ok(Json(state.pipeline.store().list_novels(&filter)?))
}

pub async fn search_novels(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<Vec<Novel>>, ApiError> {
    let query = query.trim();
    if query.chars().count() < MIN_SEARCH_CHARS {
        return Err(ApiError::BadRequest(format!(
            "search query must be at least {} characters",
            MIN_SEARCH_CHARS
        )));
    }
    Ok(Json(state.pipeline.store().search_novels(query)?))
}

pub async fn get_novel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Novel>, ApiError> {
    state
        .pipeline
        .store()
        .get_novel(&id)?
        .map(Json)
        .ok_or_else(|| not_found(format!("novel {} not found", id)))
}

pub async fn delete_novel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.delete_novel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_chapters(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    let store = state.pipeline.store();
    if store.get_novel(&id)?.is_none() {
        return Err(not_found(format!("novel {} not found", id)));
    }
    Ok(Json(store.list_chapters(&id)?))
}

/// Returns one chapter and moves the novel's last-read pointer to it.
pub async fn read_chapter(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<Chapter>, ApiError> {
    let Path((id, number)) = path.map_err(|r| ApiError::BadRequest(r.body_text()))?;
    let store = state.pipeline.store();

    let chapter = store
        .chapter_by_number(&id, number)?
        .ok_or_else(|| not_found(format!("chapter {} of novel {} not found", number, id)))?;

    if let Err(e) = store.update_last_read(&id, number, chrono::Utc::now().timestamp()) {
        warn!(novel_id = %id, number, error = %e, "failed to update last read chapter");
    }
    Ok(Json(chapter))
}

pub async fn extract_novel(
    State(state): State<AppState>,
    payload: Result<Json<NovelExtractionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Novel>), ApiError> {
    let request = body(payload)?;
    let novel = state
        .pipeline
        .extract_novel_details(&request.url, &request.source, request.html_content)
        .await?;
    Ok((StatusCode::CREATED, Json(novel)))
}

pub async fn translate_first_chapter(
    State(state): State<AppState>,
    payload: Result<Json<ChapterTranslationRequest>, JsonRejection>,
) -> Result<Json<Chapter>, ApiError> {
    let request = body(payload)?;
    let chapter = state
        .pipeline
        .translate_first_chapter(&request.novel_id, &request.chapter_url, request.html_content)
        .await?;
    Ok(Json(chapter))
}

pub async fn translate_chapter(
    State(state): State<AppState>,
    payload: Result<Json<ChapterTranslationRequest>, JsonRejection>,
) -> Result<Json<Chapter>, ApiError> {
    let request = body(payload)?;
    let chapter = state
        .pipeline
        .translate_chapter(&request.novel_id, request.html_content)
        .await?;
    Ok(Json(chapter))
}

pub async fn refresh_novel(
    State(state): State<AppState>,
    payload: Result<Json<NovelRefreshRequest>, JsonRejection>,
) -> Result<Json<Novel>, ApiError> {
    let request = body(payload)?;
    let novel = state
        .pipeline
        .refresh_novel(&request.novel_id, request.html_content)
        .await?;
    Ok(Json(novel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceRegistry;

    fn sites() -> Vec<SourceSite> {
        SourceRegistry::new().sites()
    }

    #[test]
    fn test_language_filter_resolves_tags() {
        let params = ListParams {
            language: Some("japanese".to_string()),
            ..ListParams::default()
        };
        let filter = params.into_filter(&sites()).unwrap();
        assert_eq!(filter.sources, Some(vec!["syosetu".to_string()]));
        assert_eq!(filter.order, NovelOrder::DateAdded);
    }

    #[test]
    fn test_source_and_language_intersect() {
        let params = ListParams {
            source: Some("69shuba".to_string()),
            language: Some("japanese".to_string()),
            ..ListParams::default()
        };
        let filter = params.into_filter(&sites()).unwrap();
        assert_eq!(filter.sources, Some(Vec::new()));
    }

    #[test]
    fn test_recent_limits() {
        let params = ListParams {
            recently_read: Some(5),
            ..ListParams::default()
        };
        let filter = params.into_filter(&sites()).unwrap();
        assert_eq!(filter.order, NovelOrder::RecentlyRead);
        assert_eq!(filter.limit, Some(5));

        for n in [0, 101] {
            let params = ListParams {
                recently_updated: Some(n),
                ..ListParams::default()
            };
            assert!(params.into_filter(&sites()).is_err());
        }

        let params = ListParams {
            recently_updated: Some(1),
            recently_read: Some(1),
            ..ListParams::default()
        };
        assert!(params.into_filter(&sites()).is_err());
    }
}
