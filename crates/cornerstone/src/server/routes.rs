//! Request handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::auth::SessionToken;
use super::error::ApiJson;
use super::state::AppState;
use crate::analytics::{render_chart, Period, Report};
use crate::auth::{self, Session};
use crate::error::{Error, Result};
use crate::gallery::{self, SyncReport};
use crate::model::{
    CalendarEvent, GalleryPhoto, PageContent, PublicSettings, Record, SiteSettings,
    TrainingProgram, Visit, SETTINGS_ID,
};
use crate::uploads::{self, StoredUpload, UploadTarget};

/// Body of `GET /api/health`.
#[derive(Debug, Serialize)]
pub(super) struct Health {
    status: &'static str,
    version: &'static str,
}

pub(super) async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// === Public content ===

pub(super) async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PageContent>> {
    let page = state
        .storage()?
        .load::<PageContent>(&id)?
        .ok_or_else(|| Error::not_found(PageContent::COLLECTION, id))?;
    Ok(Json(page))
}

fn sorted_programs(state: &AppState, include_unpublished: bool) -> Result<Vec<TrainingProgram>> {
    let mut programs: Vec<TrainingProgram> = state
        .storage()?
        .load_all::<TrainingProgram>()?
        .into_iter()
        .filter(|p| include_unpublished || p.published)
        .collect();
    programs.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    Ok(programs)
}

pub(super) async fn list_programs(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrainingProgram>>> {
    Ok(Json(sorted_programs(&state, false)?))
}

pub(super) async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrainingProgram>> {
    state
        .storage()?
        .load::<TrainingProgram>(&id)?
        .filter(|p| p.published)
        .map(Json)
        .ok_or_else(|| Error::not_found(TrainingProgram::COLLECTION, id))
}

/// Query of `GET /api/events`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct EventQuery {
    /// Only events today or later.
    #[serde(default)]
    pub upcoming: bool,
}

pub(super) async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<CalendarEvent>>> {
    let today = Utc::now().date_naive();
    let mut events: Vec<CalendarEvent> = state
        .storage()?
        .load_all::<CalendarEvent>()?
        .into_iter()
        .filter(|e| !query.upcoming || e.is_upcoming(today))
        .collect();
    events.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start().cmp(&b.start()))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(Json(events))
}

pub(super) async fn list_photos(State(state): State<AppState>) -> Result<Json<Vec<GalleryPhoto>>> {
    let mut photos = state.storage()?.load_all::<GalleryPhoto>()?;
    photos.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    Ok(Json(photos))
}

fn load_settings(state: &AppState) -> Result<SiteSettings> {
    Ok(state
        .storage()?
        .load::<SiteSettings>(SETTINGS_ID)?
        .unwrap_or_default())
}

pub(super) async fn public_settings(State(state): State<AppState>) -> Result<Json<PublicSettings>> {
    Ok(Json(load_settings(&state)?.public()))
}

pub(super) async fn track(
    State(state): State<AppState>,
    ApiJson(visit): ApiJson<Visit>,
) -> Result<StatusCode> {
    let today = Utc::now().date_naive();
    let max_paths = state.config().analytics.max_paths_per_day;
    state.storage()?.record_visit(today, &visit, max_paths)?;
    Ok(StatusCode::NO_CONTENT)
}

// === Admin session ===

/// Body of `POST /api/admin/login`.
#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    passcode: String,
}

pub(super) async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<Session>> {
    let storage = state.storage()?;
    let session = auth::login(&storage, state.sessions(), &body.passcode)?;
    Ok(Json(session))
}

pub(super) async fn logout(
    State(state): State<AppState>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<StatusCode> {
    state.sessions().revoke(&token)?;
    info!("Admin session closed");
    Ok(StatusCode::NO_CONTENT)
}

// === Admin content ===

/// Body returned after a save.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Saved {
    id: String,
    updated_at: DateTime<Utc>,
}

/// Replace the record at `id` with the request body.
///
/// A body without an id takes the path id; a body naming a different id is
/// rejected.
pub(super) async fn put_record<R: Record + Send + 'static>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(mut record): ApiJson<R>,
) -> Result<Json<Saved>> {
    record.bind_id(&id)?;
    let updated_at = state.storage()?.save(&record)?;
    debug!("Saved {}/{}", R::COLLECTION, id);
    Ok(Json(Saved { id, updated_at }))
}

pub(super) async fn delete_record<R: Record + Send + 'static>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.storage()?.remove::<R>(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(R::COLLECTION, id))
    }
}

pub(super) async fn list_pages(State(state): State<AppState>) -> Result<Json<Vec<PageContent>>> {
    Ok(Json(state.storage()?.load_all::<PageContent>()?))
}

pub(super) async fn list_all_programs(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrainingProgram>>> {
    Ok(Json(sorted_programs(&state, true)?))
}

pub(super) async fn get_settings(State(state): State<AppState>) -> Result<Json<SiteSettings>> {
    Ok(Json(load_settings(&state)?))
}

/// Replace the site settings. An empty passcode keeps the stored one.
pub(super) async fn put_settings(
    State(state): State<AppState>,
    ApiJson(mut settings): ApiJson<SiteSettings>,
) -> Result<Json<Saved>> {
    let storage = state.storage()?;
    if settings.admin_passcode.is_empty() {
        if let Some(current) = storage.load::<SiteSettings>(SETTINGS_ID)? {
            settings.admin_passcode = current.admin_passcode;
        }
    }
    let updated_at = storage.save(&settings)?;
    Ok(Json(Saved {
        id: SETTINGS_ID.to_string(),
        updated_at,
    }))
}

// === Analytics ===

/// Query of the analytics endpoints.
#[derive(Debug, Default, Deserialize)]
pub(super) struct AnalyticsQuery {
    /// `daily`, `weekly`, `monthly` or `yearly`.
    pub period: Option<String>,
    /// Most recent buckets to keep.
    pub last: Option<usize>,
    /// Number of top pages.
    pub top: Option<usize>,
}

fn build_report(state: &AppState, query: &AnalyticsQuery) -> Result<Report> {
    let defaults = &state.config().analytics;
    let period = match &query.period {
        Some(period) => period.parse::<Period>()?,
        None => defaults.default_period,
    };
    let last = query.last.unwrap_or(defaults.default_buckets);
    let top = query.top.unwrap_or(defaults.top_pages);

    let records = state.storage()?.daily_stats(None, None)?;
    Ok(Report::build(&records, period, Some(last), top))
}

pub(super) async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<Report>> {
    Ok(Json(build_report(&state, &query)?))
}

pub(super) async fn analytics_chart(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse> {
    let report = build_report(&state, &query)?;
    let svg = render_chart(&report.buckets, &state.config().chart_options());
    Ok(([(CONTENT_TYPE, "image/svg+xml")], svg))
}

// === Uploads and gallery ===

pub(super) async fn upload(
    State(state): State<AppState>,
    Path(target): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<StoredUpload>> {
    let target: UploadTarget = target.parse()?;
    let config = &state.config().uploads;
    let limit = config.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limit))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(|e| multipart_error(&e, limit))?;

        let stored = uploads::save_upload(
            &state.config().upload_dir(),
            &config.public_path,
            target,
            &data,
            &content_type,
            limit,
        )
        .await?;
        return Ok(Json(stored));
    }

    Err(Error::upload_rejected("no file field in the request"))
}

fn multipart_error(error: &axum::extract::multipart::MultipartError, limit: usize) -> Error {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit }
    } else {
        Error::upload_rejected(error.body_text())
    }
}

/// Body of `POST /api/admin/gallery/sync`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SyncRequest {
    album_url: String,
}

pub(super) async fn sync_gallery(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SyncRequest>,
) -> Result<Json<SyncReport>> {
    let source = state.albums()?;
    let report = gallery::sync_album(source, state.storage_mutex(), &body.album_url).await?;
    Ok(Json(report))
}
