use axum::extract::{Multipart, State};
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use super::form::FormData;
use super::{ApiJson, ApiPath};
use crate::auth::AdminPrincipal;
use crate::services::catalog::MovieInput;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};
use crate::utils::validation::Validator;

#[derive(Debug, Deserialize)]
pub struct GenreRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TheaterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
}

pub async fn list_genres(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    Ok(success(state.catalog.list_genres().await?, "Get genres success"))
}

pub async fn create_genre(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    ApiJson(request): ApiJson<GenreRequest>,
) -> Result<Response, AppError> {
    let genre = state.catalog.create_genre(&request.name).await?;
    Ok(success(genre, "Create genre success"))
}

pub async fn list_theaters(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    Ok(success(state.catalog.list_theaters().await?, "Get theaters success"))
}

pub async fn create_theater(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    ApiJson(request): ApiJson<TheaterRequest>,
) -> Result<Response, AppError> {
    let theater = state
        .catalog
        .create_theater(&request.name, &request.city)
        .await?;
    Ok(success(theater, "Create theater success"))
}

pub async fn list_movies(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    Ok(success(state.catalog.list_movies(false).await?, "Get movies success"))
}

pub async fn movie_detail(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let detail = state.catalog.movie_detail(id, None).await?;
    Ok(success(detail, "Get movie success"))
}

fn movie_input(form: &FormData) -> Result<MovieInput, AppError> {
    let mut v = Validator::new();
    let input = MovieInput {
        title: form.text("title"),
        genre_id: form.parsed(&mut v, "genre"),
        theater_ids: form.uuids(&mut v, "theaters"),
        available: form.parsed(&mut v, "available"),
        description: form.text("description"),
        price: form.parsed(&mut v, "price"),
        bonus: form.text("bonus"),
    };
    v.finish()?;
    Ok(input)
}

/// Multipart: movie fields plus a `thumbnail` image.
pub async fn create_movie(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = FormData::read(multipart).await?;
    let input = movie_input(&form)?;
    let movie = state
        .catalog
        .create_movie(input, form.take_file("thumbnail"))
        .await?;
    Ok(success(movie, "Create movie success"))
}

/// Same form as create; the `thumbnail` is optional.
pub async fn update_movie(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    ApiPath(id): ApiPath<Uuid>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = FormData::read(multipart).await?;
    let input = movie_input(&form)?;
    let movie = state
        .catalog
        .update_movie(id, input, form.take_file("thumbnail"))
        .await?;
    Ok(success(movie, "Update movie success"))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    state.catalog.delete_movie(id).await?;
    Ok(empty_success("Delete movie success"))
}

pub async fn list_customers(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    Ok(success(state.reports.customers().await?, "Get customers success"))
}

pub async fn list_wallet_transactions(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    let entries = state.reports.wallet_transactions().await?;
    Ok(success(entries, "Get wallet transactions success"))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    let transactions = state.reports.transactions().await?;
    Ok(success(transactions, "Get transactions success"))
}

pub async fn audit_relations(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    let report = state.catalog.relations().audit().await?;
    let message = if report.is_consistent() {
        "Relations are consistent"
    } else {
        "Relation drift found"
    };
    Ok(success(report, message))
}

pub async fn repair_relations(
    State(state): State<AppState>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<Response, AppError> {
    let report = state.catalog.relations().repair().await?;
    Ok(success(report, "Relations repaired"))
}
