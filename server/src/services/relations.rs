use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::Movie;
use crate::storage::{FileStorage, THUMBNAILS};
use crate::store::CatalogStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Genre,
    Theater,
}

/// One movie entry that should or should not be in a back-reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RelationEntry {
    pub kind: RelationKind,
    pub target_id: Uuid,
    pub movie_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationReport {
    /// Movie points at the target but the target does not list the movie.
    pub missing: Vec<RelationEntry>,
    /// Target lists a movie that does not point back at it.
    pub dangling: Vec<RelationEntry>,
    /// Target lists the same movie more than once.
    pub duplicated: Vec<RelationEntry>,
    /// Movie points at a genre or theater that does not exist.
    pub broken: Vec<RelationEntry>,
}

impl RelationReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty()
            && self.dangling.is_empty()
            && self.duplicated.is_empty()
            && self.broken.is_empty()
    }
}

/// Keeps the genre and theater back-reference lists in step with the movie
/// refs, which are authoritative.
#[derive(Clone)]
pub struct RelationMaintainer {
    catalog: Arc<dyn CatalogStore>,
    files: Arc<dyn FileStorage>,
}

impl RelationMaintainer {
    pub fn new(catalog: Arc<dyn CatalogStore>, files: Arc<dyn FileStorage>) -> Self {
        Self { catalog, files }
    }

    /// Fails with `NotFound` unless the genre and every theater exist.
    pub async fn ensure_targets(&self, genre_id: Uuid, theater_ids: &[Uuid]) -> Result<(), AppError> {
        if self.catalog.find_genre(genre_id).await?.is_none() {
            return Err(AppError::NotFound("Genre not found".into()));
        }
        for theater_id in theater_ids {
            if self.catalog.find_theater(*theater_id).await?.is_none() {
                return Err(AppError::NotFound(format!("Theater {theater_id} not found")));
            }
        }
        Ok(())
    }

    pub async fn on_create(&self, movie: &Movie) -> Result<(), AppError> {
        self.link(movie).await
    }

    /// Moves the movie id from the lists `old` was on to the lists `new` is on.
    pub async fn on_update(&self, old: &Movie, new: &Movie) -> Result<(), AppError> {
        self.unlink(old).await?;
        self.link(new).await?;

        if old.thumbnail != new.thumbnail {
            self.discard_thumbnail(&old.thumbnail).await;
        }
        Ok(())
    }

    pub async fn on_delete(&self, movie: &Movie) -> Result<(), AppError> {
        self.unlink(movie).await?;
        self.discard_thumbnail(&movie.thumbnail).await;
        Ok(())
    }

    /// Deletes a stored thumbnail. A leftover file never fails the write.
    pub async fn discard_thumbnail(&self, filename: &str) {
        if let Err(e) = self.files.delete(THUMBNAILS, filename).await {
            warn!(filename, error = %e, "Could not delete thumbnail");
        }
    }

    async fn link(&self, movie: &Movie) -> Result<(), AppError> {
        self.catalog.add_genre_movie(movie.genre_id, movie.id).await?;
        for theater_id in &movie.theater_ids {
            self.catalog.add_theater_movie(*theater_id, movie.id).await?;
        }
        Ok(())
    }

    async fn unlink(&self, movie: &Movie) -> Result<(), AppError> {
        self.catalog.remove_genre_movie(movie.genre_id, movie.id).await?;
        for theater_id in &movie.theater_ids {
            self.catalog.remove_theater_movie(*theater_id, movie.id).await?;
        }
        Ok(())
    }

    pub async fn audit(&self) -> Result<RelationReport, AppError> {
        let movies = self.catalog.list_movies().await?;

        // Each back-reference list, keyed by target, with its raw entries.
        let mut lists: HashMap<(RelationKind, Uuid), Vec<Uuid>> = HashMap::new();
        for genre in self.catalog.list_genres().await? {
            lists.insert((RelationKind::Genre, genre.id), genre.movie_ids);
        }
        for theater in self.catalog.list_theaters().await? {
            lists.insert((RelationKind::Theater, theater.id), theater.movie_ids);
        }

        let mut expected = HashSet::new();
        for movie in &movies {
            expected.insert(RelationEntry {
                kind: RelationKind::Genre,
                target_id: movie.genre_id,
                movie_id: movie.id,
            });
            for theater_id in &movie.theater_ids {
                expected.insert(RelationEntry {
                    kind: RelationKind::Theater,
                    target_id: *theater_id,
                    movie_id: movie.id,
                });
            }
        }

        let mut report = RelationReport::default();
        let mut actual = HashSet::new();
        for ((kind, target_id), movie_ids) in &lists {
            for movie_id in movie_ids {
                let entry = RelationEntry {
                    kind: *kind,
                    target_id: *target_id,
                    movie_id: *movie_id,
                };
                if !actual.insert(entry) && !report.duplicated.contains(&entry) {
                    report.duplicated.push(entry);
                }
            }
        }

        for entry in &expected {
            if !lists.contains_key(&(entry.kind, entry.target_id)) {
                report.broken.push(*entry);
            } else if !actual.contains(entry) {
                report.missing.push(*entry);
            }
        }
        report.dangling = actual.difference(&expected).copied().collect();

        report.missing.sort();
        report.dangling.sort();
        report.duplicated.sort();
        report.broken.sort();
        Ok(report)
    }

    /// Rewrites the lists from the movie refs. Returns the drift that was
    /// found before repairing; broken refs cannot be repaired here.
    pub async fn repair(&self) -> Result<RelationReport, AppError> {
        let report = self.audit().await?;
        if report.is_consistent() {
            return Ok(report);
        }

        for entry in report.dangling.iter().chain(&report.duplicated) {
            self.remove(entry).await?;
        }
        // Removing a duplicate strips every copy, so re-add the expected ones.
        for entry in report.missing.iter().chain(&report.duplicated) {
            if !report.dangling.contains(entry) {
                self.add(entry).await?;
            }
        }

        info!(
            missing = report.missing.len(),
            dangling = report.dangling.len(),
            duplicated = report.duplicated.len(),
            broken = report.broken.len(),
            "Repaired relation drift"
        );
        Ok(report)
    }

    async fn add(&self, entry: &RelationEntry) -> Result<(), AppError> {
        match entry.kind {
            RelationKind::Genre => self.catalog.add_genre_movie(entry.target_id, entry.movie_id).await?,
            RelationKind::Theater => {
                self.catalog
                    .add_theater_movie(entry.target_id, entry.movie_id)
                    .await?
            }
        }
        Ok(())
    }

    async fn remove(&self, entry: &RelationEntry) -> Result<(), AppError> {
        match entry.kind {
            RelationKind::Genre => {
                self.catalog
                    .remove_genre_movie(entry.target_id, entry.movie_id)
                    .await?
            }
            RelationKind::Theater => {
                self.catalog
                    .remove_theater_movie(entry.target_id, entry.movie_id)
                    .await?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Genre, Theater};
    use crate::services::fixtures;
    use crate::storage::LocalFileStorage;

    fn maintainer(fx: &fixtures::Fixture) -> RelationMaintainer {
        RelationMaintainer::new(
            fx.stores.catalog.clone(),
            Arc::new(LocalFileStorage::new("/tmp/cinema-test-uploads", "http://localhost:3001")),
        )
    }

    #[tokio::test]
    async fn test_genre_move_is_exact() {
        let fx = fixtures::seeded(0).await;
        let relations = maintainer(&fx);
        let g2 = Genre::new("Comedy");
        fx.stores.catalog.insert_genre(&g2).await.unwrap();

        let mut moved = fx.movie.clone();
        moved.genre_id = g2.id;
        for _ in 0..3 {
            relations.on_update(&fx.movie, &moved).await.unwrap();
        }
        // Repeating the final state is a no-op too.
        relations.on_update(&moved, &moved).await.unwrap();

        let g1 = fx.stores.catalog.find_genre(fx.genre.id).await.unwrap().unwrap();
        let g2 = fx.stores.catalog.find_genre(g2.id).await.unwrap().unwrap();
        assert!(!g1.movie_ids.contains(&fx.movie.id));
        assert_eq!(g2.movie_ids, vec![fx.movie.id]);
    }

    #[tokio::test]
    async fn test_delete_unlinks_everywhere() {
        let fx = fixtures::seeded(0).await;
        maintainer(&fx).on_delete(&fx.movie).await.unwrap();

        let genre = fx.stores.catalog.find_genre(fx.genre.id).await.unwrap().unwrap();
        let theater = fx.stores.catalog.find_theater(fx.theater.id).await.unwrap().unwrap();
        assert!(genre.movie_ids.is_empty());
        assert!(theater.movie_ids.is_empty());
    }

    #[tokio::test]
    async fn test_missing_theater_is_not_found() {
        let fx = fixtures::seeded(0).await;
        let err = maintainer(&fx)
            .ensure_targets(fx.genre.id, &[fx.theater.id, Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_audit_then_repair() {
        let fx = fixtures::seeded(0).await;
        let relations = maintainer(&fx);
        assert!(relations.audit().await.unwrap().is_consistent());

        // Drift: the theater forgets the movie, a second theater claims it.
        let stray = Theater::new("Cinepolis Lippo", "Bandung");
        fx.stores.catalog.insert_theater(&stray).await.unwrap();
        fx.stores
            .catalog
            .remove_theater_movie(fx.theater.id, fx.movie.id)
            .await
            .unwrap();
        fx.stores
            .catalog
            .add_theater_movie(stray.id, fx.movie.id)
            .await
            .unwrap();

        let report = relations.audit().await.unwrap();
        assert_eq!(
            report.missing,
            vec![RelationEntry {
                kind: RelationKind::Theater,
                target_id: fx.theater.id,
                movie_id: fx.movie.id,
            }]
        );
        assert_eq!(report.dangling.len(), 1);
        assert_eq!(report.dangling[0].target_id, stray.id);

        let repaired = relations.repair().await.unwrap();
        assert_eq!(repaired, report);
        assert!(relations.audit().await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_audit_flags_broken_refs() {
        let fx = fixtures::seeded(0).await;
        let orphan = fixtures::movie(Uuid::new_v4(), vec![fx.theater.id]);
        fx.stores.catalog.insert_movie(&orphan).await.unwrap();

        let report = maintainer(&fx).audit().await.unwrap();
        assert_eq!(report.broken.len(), 1);
        assert_eq!(report.broken[0].kind, RelationKind::Genre);
        // The theater side is simply missing, not broken.
        assert_eq!(report.missing.len(), 1);
    }
}
