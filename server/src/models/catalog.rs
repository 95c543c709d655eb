use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    /// Maintained copy of the movies pointing at this genre.
    #[serde(rename = "movies")]
    pub movie_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            movie_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Theater {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    /// Maintained copy of the movies screened here.
    #[serde(rename = "movies")]
    pub movie_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Theater {
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            city: city.into(),
            movie_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A movie is the authoritative side of the genre and theater relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "genre")]
    pub genre_id: Uuid,
    #[serde(rename = "theaters")]
    pub theater_ids: Vec<Uuid>,
    pub description: Option<String>,
    pub price: i64,
    pub available: bool,
    pub bonus: Option<String>,
    /// Stored filename inside the thumbnails folder.
    pub thumbnail: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn screens_at(&self, theater_id: Uuid) -> bool {
        self.theater_ids.contains(&theater_id)
    }
}
