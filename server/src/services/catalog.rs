use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::relations::RelationMaintainer;
use super::seats::{empty_seat_map, SeatInventory, SeatStatus};
use crate::models::{Genre, Movie, ShowingKey, Theater};
use crate::storage::{FileStorage, Upload, THUMBNAILS};
use crate::store::{CatalogStore, StoreError};
use crate::utils::error::AppError;
use crate::utils::validation::Validator;

/// Daily screening times offered for every movie.
pub const SHOWING_TIMES: [&str; 5] = ["12:30", "14:50", "18:30", "22:30", "23:30"];

/// Movie fields from the admin form. Missing fields are reported by
/// [`MovieInput::validate`], not by the form parser.
#[derive(Debug, Clone, Default)]
pub struct MovieInput {
    pub title: Option<String>,
    pub genre_id: Option<Uuid>,
    pub theater_ids: Vec<Uuid>,
    pub available: Option<bool>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub bonus: Option<String>,
}

struct MovieFields {
    title: String,
    genre_id: Uuid,
    theater_ids: Vec<Uuid>,
    available: bool,
    description: Option<String>,
    price: i64,
    bonus: Option<String>,
}

impl MovieInput {
    fn validate(self) -> Result<MovieFields, AppError> {
        let mut v = Validator::new();

        let title = self.title.unwrap_or_default();
        v.min_len("title", &title, 5);
        v.check(self.genre_id.is_some(), "genre is required");
        v.check(!self.theater_ids.is_empty(), "theaters must contain at least 1 theater");
        v.check(self.available.is_some(), "available is required");
        if let Some(description) = &self.description {
            v.min_len("description", description, 5);
        }
        match self.price {
            Some(price) => v.non_negative("price", price),
            None => v.check(false, "price is required"),
        };

        let mut theater_ids = self.theater_ids;
        let mut seen = HashSet::new();
        theater_ids.retain(|id| seen.insert(*id));

        v.finish()?;

        match (self.genre_id, self.available, self.price) {
            (Some(genre_id), Some(available), Some(price)) => Ok(MovieFields {
                title: title.trim().to_string(),
                genre_id,
                theater_ids,
                available,
                description: self.description,
                price,
                bonus: self.bonus.filter(|bonus| !bonus.trim().is_empty()),
            }),
            _ => Err(AppError::UnexpectedError(
                "validated movie is missing a field".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieView {
    #[serde(flatten)]
    pub movie: Movie,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: MovieView,
    pub genre_detail: Option<Genre>,
    pub theater_details: Vec<Theater>,
    pub seats: Vec<SeatStatus>,
    pub times: Vec<&'static str>,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    files: Arc<dyn FileStorage>,
    relations: RelationMaintainer,
    seats: SeatInventory,
}

impl CatalogService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        files: Arc<dyn FileStorage>,
        relations: RelationMaintainer,
        seats: SeatInventory,
    ) -> Self {
        Self {
            catalog,
            files,
            relations,
            seats,
        }
    }

    pub fn relations(&self) -> &RelationMaintainer {
        &self.relations
    }

    pub async fn create_genre(&self, name: &str) -> Result<Genre, AppError> {
        Validator::new().min_len("name", name, 5).finish()?;
        let genre = Genre::new(name.trim());
        self.catalog.insert_genre(&genre).await?;
        info!(genre_id = %genre.id, "Created genre");
        Ok(genre)
    }

    pub async fn list_genres(&self) -> Result<Vec<Genre>, AppError> {
        Ok(self.catalog.list_genres().await?)
    }

    pub async fn create_theater(&self, name: &str, city: &str) -> Result<Theater, AppError> {
        Validator::new()
            .min_len("name", name, 5)
            .min_len("city", city, 1)
            .finish()?;
        let theater = Theater::new(name.trim(), city.trim());
        self.catalog.insert_theater(&theater).await?;
        info!(theater_id = %theater.id, "Created theater");
        Ok(theater)
    }

    pub async fn list_theaters(&self) -> Result<Vec<Theater>, AppError> {
        Ok(self.catalog.list_theaters().await?)
    }

    fn view(&self, movie: Movie) -> MovieView {
        MovieView {
            thumbnail_url: self.files.public_url(THUMBNAILS, &movie.thumbnail),
            movie,
        }
    }

    /// Customers only see movies open for booking.
    pub async fn list_movies(&self, only_available: bool) -> Result<Vec<MovieView>, AppError> {
        Ok(self
            .catalog
            .list_movies()
            .await?
            .into_iter()
            .filter(|movie| movie.available || !only_available)
            .map(|movie| self.view(movie))
            .collect())
    }

    pub async fn find_movie(&self, id: Uuid) -> Result<Movie, AppError> {
        self.catalog
            .find_movie(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie not found".into()))
    }

    /// Movie page: the movie, where it plays, the show times and the seat
    /// map of `showing` (all free when no showing is given).
    pub async fn movie_detail(
        &self,
        id: Uuid,
        showing: Option<&ShowingKey>,
    ) -> Result<MovieDetail, AppError> {
        let movie = self.find_movie(id).await?;
        let genre = self.catalog.find_genre(movie.genre_id).await?;

        let mut theaters = Vec::with_capacity(movie.theater_ids.len());
        for theater_id in &movie.theater_ids {
            if let Some(theater) = self.catalog.find_theater(*theater_id).await? {
                theaters.push(theater);
            }
        }

        let seats = match showing {
            Some(showing) => self.seats.seat_map(movie.id, showing).await?,
            None => empty_seat_map(),
        };

        Ok(MovieDetail {
            movie: self.view(movie),
            genre_detail: genre,
            theater_details: theaters,
            seats,
            times: SHOWING_TIMES.to_vec(),
        })
    }

    /// Available movies of a genre, optionally only those playing in `city`.
    pub async fn browse(&self, genre_id: Uuid, city: Option<&str>) -> Result<Vec<MovieView>, AppError> {
        if self.catalog.find_genre(genre_id).await?.is_none() {
            return Err(AppError::NotFound("Genre not found".into()));
        }

        let in_city: Option<HashSet<Uuid>> = match city.map(str::trim).filter(|c| !c.is_empty()) {
            Some(city) => Some(
                self.catalog
                    .list_theaters()
                    .await?
                    .into_iter()
                    .filter(|theater| theater.city.eq_ignore_ascii_case(city))
                    .map(|theater| theater.id)
                    .collect(),
            ),
            None => None,
        };

        Ok(self
            .catalog
            .list_movies_by_genre(genre_id)
            .await?
            .into_iter()
            .filter(|movie| movie.available)
            .filter(|movie| match &in_city {
                Some(ids) => movie.theater_ids.iter().any(|id| ids.contains(id)),
                None => true,
            })
            .map(|movie| self.view(movie))
            .collect())
    }

    #[tracing::instrument(skip(self, input, thumbnail))]
    pub async fn create_movie(
        &self,
        input: MovieInput,
        thumbnail: Option<Upload>,
    ) -> Result<MovieView, AppError> {
        let fields = input.validate()?;
        let thumbnail = thumbnail.ok_or_else(|| AppError::validation("thumbnail is required"))?;
        self.relations
            .ensure_targets(fields.genre_id, &fields.theater_ids)
            .await?;

        let filename = self.files.store(THUMBNAILS, thumbnail).await?;
        let now = Utc::now();
        let movie = Movie {
            id: Uuid::new_v4(),
            title: fields.title,
            genre_id: fields.genre_id,
            theater_ids: fields.theater_ids,
            description: fields.description,
            price: fields.price,
            available: fields.available,
            bonus: fields.bonus,
            thumbnail: filename,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.catalog.insert_movie(&movie).await {
            self.relations.discard_thumbnail(&movie.thumbnail).await;
            return Err(e.into());
        }
        self.relations.on_create(&movie).await?;

        info!(movie_id = %movie.id, "Created movie");
        Ok(self.view(movie))
    }

    #[tracing::instrument(skip(self, input, thumbnail))]
    pub async fn update_movie(
        &self,
        id: Uuid,
        input: MovieInput,
        thumbnail: Option<Upload>,
    ) -> Result<MovieView, AppError> {
        let old = self.find_movie(id).await?;
        let fields = input.validate()?;
        self.relations
            .ensure_targets(fields.genre_id, &fields.theater_ids)
            .await?;

        let thumbnail = match thumbnail {
            Some(upload) => self.files.store(THUMBNAILS, upload).await?,
            None => old.thumbnail.clone(),
        };
        let movie = Movie {
            title: fields.title,
            genre_id: fields.genre_id,
            theater_ids: fields.theater_ids,
            description: fields.description,
            price: fields.price,
            available: fields.available,
            bonus: fields.bonus,
            thumbnail,
            updated_at: Utc::now(),
            ..old.clone()
        };

        match self.catalog.update_movie(&movie).await {
            Ok(()) => {}
            Err(e) => {
                if movie.thumbnail != old.thumbnail {
                    self.relations.discard_thumbnail(&movie.thumbnail).await;
                }
                return Err(match e {
                    StoreError::NotFound(_) => AppError::NotFound("Movie not found".into()),
                    other => other.into(),
                });
            }
        }
        self.relations.on_update(&old, &movie).await?;

        info!(movie_id = %movie.id, "Updated movie");
        Ok(self.view(movie))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_movie(&self, id: Uuid) -> Result<(), AppError> {
        let movie = self.find_movie(id).await?;
        self.catalog.delete_movie(movie.id).await?;
        self.relations.on_delete(&movie).await?;
        info!(movie_id = %movie.id, "Deleted movie");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::storage::LocalFileStorage;
    use axum::body::Bytes;

    struct Harness {
        fx: fixtures::Fixture,
        service: CatalogService,
        _dir: tempfile::TempDir,
        root: std::path::PathBuf,
    }

    async fn harness() -> Harness {
        let fx = fixtures::seeded(0).await;
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let files: Arc<dyn FileStorage> =
            Arc::new(LocalFileStorage::new(dir.path(), "http://localhost:3001"));
        let service = CatalogService::new(
            fx.stores.catalog.clone(),
            files.clone(),
            RelationMaintainer::new(fx.stores.catalog.clone(), files),
            SeatInventory::new(fx.stores.bookings.clone()),
        );
        Harness {
            fx,
            service,
            _dir: dir,
            root,
        }
    }

    fn png() -> Upload {
        Upload {
            field: "thumbnail".into(),
            content_type: "image/png".into(),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
        }
    }

    fn input(genre_id: Uuid, theater_ids: Vec<Uuid>) -> MovieInput {
        MovieInput {
            title: Some("Pengabdi Setan".into()),
            genre_id: Some(genre_id),
            theater_ids,
            available: Some(true),
            description: None,
            price: Some(35_000),
            bonus: Some("Free popcorn".into()),
        }
    }

    #[tokio::test]
    async fn test_create_links_genre_and_theaters() {
        let h = harness().await;
        let view = h
            .service
            .create_movie(input(h.fx.genre.id, vec![h.fx.theater.id]), Some(png()))
            .await
            .unwrap();

        assert!(view.thumbnail_url.starts_with("http://localhost:3001/uploads/thumbnails/"));
        assert!(h.root.join(THUMBNAILS).join(&view.movie.thumbnail).exists());

        let genre = h.fx.stores.catalog.find_genre(h.fx.genre.id).await.unwrap().unwrap();
        let theater = h.fx.stores.catalog.find_theater(h.fx.theater.id).await.unwrap().unwrap();
        assert!(genre.movie_ids.contains(&view.movie.id));
        assert!(theater.movie_ids.contains(&view.movie.id));
    }

    #[tokio::test]
    async fn test_create_requires_existing_targets() {
        let h = harness().await;
        let err = h
            .service
            .create_movie(input(Uuid::new_v4(), vec![h.fx.theater.id]), Some(png()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.fx.stores.catalog.list_movies().await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let h = harness().await;
        let err = h
            .service
            .create_movie(MovieInput::default(), Some(png()))
            .await
            .unwrap_err();
        match err {
            AppError::ValidationError(errors) => {
                assert!(errors.iter().any(|e| e.contains("title")));
                assert!(errors.iter().any(|e| e.contains("genre")));
                assert!(errors.iter().any(|e| e.contains("theaters")));
                assert!(errors.iter().any(|e| e.contains("price")));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_with_new_thumbnail_replaces_file() {
        let h = harness().await;
        let created = h
            .service
            .create_movie(input(h.fx.genre.id, vec![h.fx.theater.id]), Some(png()))
            .await
            .unwrap();
        let old_path = h.root.join(THUMBNAILS).join(&created.movie.thumbnail);

        let other_genre = Genre::new("Horror");
        h.fx.stores.catalog.insert_genre(&other_genre).await.unwrap();
        let updated = h
            .service
            .update_movie(created.movie.id, input(other_genre.id, vec![h.fx.theater.id]), Some(png()))
            .await
            .unwrap();

        assert_ne!(updated.movie.thumbnail, created.movie.thumbnail);
        assert!(!old_path.exists());
        assert!(h.root.join(THUMBNAILS).join(&updated.movie.thumbnail).exists());

        let g1 = h.fx.stores.catalog.find_genre(h.fx.genre.id).await.unwrap().unwrap();
        let g2 = h.fx.stores.catalog.find_genre(other_genre.id).await.unwrap().unwrap();
        assert!(!g1.movie_ids.contains(&created.movie.id));
        assert_eq!(g2.movie_ids, vec![created.movie.id]);
    }

    #[tokio::test]
    async fn test_delete_removes_movie_refs_and_file() {
        let h = harness().await;
        let created = h
            .service
            .create_movie(input(h.fx.genre.id, vec![h.fx.theater.id]), Some(png()))
            .await
            .unwrap();
        let path = h.root.join(THUMBNAILS).join(&created.movie.thumbnail);

        h.service.delete_movie(created.movie.id).await.unwrap();

        assert!(!path.exists());
        let genre = h.fx.stores.catalog.find_genre(h.fx.genre.id).await.unwrap().unwrap();
        assert!(!genre.movie_ids.contains(&created.movie.id));
        assert!(matches!(
            h.service.delete_movie(created.movie.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_detail_has_times_and_seat_map() {
        let h = harness().await;
        let detail = h.service.movie_detail(h.fx.movie.id, None).await.unwrap();

        assert_eq!(detail.times, SHOWING_TIMES.to_vec());
        assert_eq!(detail.seats.len(), 15);
        assert_eq!(detail.theater_details.len(), 1);
        assert_eq!(detail.genre_detail.map(|g| g.name), Some("Drama".to_string()));
    }

    #[tokio::test]
    async fn test_theater_accepts_short_city_names() {
        let h = harness().await;
        let theater = h.service.create_theater("Cinepolis Beachwalk", " Bali ").await.unwrap();
        assert_eq!(theater.city, "Bali");

        assert!(matches!(
            h.service.create_theater("Cinepolis Beachwalk", "  ").await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            h.service.create_theater("XXI", "Medan").await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_browse_filters_by_city() {
        let h = harness().await;
        let movies = h.service.browse(h.fx.genre.id, Some("jakarta")).await.unwrap();
        assert_eq!(movies.len(), 1);
        let movies = h.service.browse(h.fx.genre.id, Some("Surabaya")).await.unwrap();
        assert!(movies.is_empty());
        assert!(matches!(
            h.service.browse(Uuid::new_v4(), None).await,
            Err(AppError::NotFound(_))
        ));
    }
}
