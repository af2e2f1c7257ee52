//! services/api/src/adapters/tmdb.rs
//!
//! Implements the `MovieCatalog` port on top of The Movie Database (TMDB) v3 API.
//!
//! A random movie is picked in two steps: a `discover/movie` listing on a random
//! page within the requested range, then a `movie/{id}` lookup for the details
//! the question prompt needs (tagline, genres, budget, runtime, ...).

use async_trait::async_trait;
use movie_quiz_core::{Movie, MovieCatalog, MovieFilters, MovieSummary, PortError, PortResult};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info};

/// TMDB refuses `page` values above this.
const MAX_PAGE: u32 = 500;

//=========================================================================================
// TMDB Records
//=========================================================================================

#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default)]
    results: Vec<DiscoverRecord>,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscoverRecord {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MovieRecord {
    id: u64,
    #[serde(default)]
    title: String,
    tagline: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    genres: Vec<GenreRecord>,
    #[serde(default)]
    budget: u64,
    #[serde(default)]
    revenue: u64,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u64,
    release_date: Option<String>,
    runtime: Option<u32>,
    poster_path: Option<String>,
    imdb_id: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct TmdbCatalogAdapter {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    image_base_url: String,
}

impl TmdbCatalogAdapter {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        api_base: String,
        image_base_url: String,
    ) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            image_base_url: image_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> PortResult<T> {
        let url = format!("{}/{}", self.api_base, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("TMDB request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(format!("TMDB resource {}", path)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "TMDB error {}: {}",
                status, text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse TMDB reply: {}", e)))
    }

    async fn discover(
        &self,
        page: u32,
        vote_avg_min: f64,
        vote_count_min: f64,
    ) -> PortResult<DiscoverPage> {
        let query = [
            ("page", page.clamp(1, MAX_PAGE).to_string()),
            ("sort_by", "popularity.desc".to_string()),
            ("include_adult", "false".to_string()),
            ("vote_average.gte", vote_avg_min.to_string()),
            ("vote_count.gte", vote_count_min.to_string()),
        ];
        self.get("discover/movie", &query).await
    }

    async fn details(&self, id: u64) -> PortResult<MovieRecord> {
        self.get(&format!("movie/{}", id), &[]).await
    }

    fn poster_url(&self, poster_path: Option<String>) -> Option<String> {
        poster_path.map(|path| format!("{}/{}", self.image_base_url, path.trim_start_matches('/')))
    }

    fn summary(&self, record: DiscoverRecord) -> MovieSummary {
        MovieSummary {
            id: record.id,
            title: record.title,
            overview: record.overview,
            release_date: record.release_date,
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            poster_url: self.poster_url(record.poster_path),
        }
    }

    fn movie(&self, record: MovieRecord) -> Movie {
        Movie {
            id: record.id,
            title: record.title,
            tagline: record.tagline.unwrap_or_default(),
            overview: record.overview.unwrap_or_default(),
            genres: record.genres.into_iter().map(|g| g.name).collect(),
            budget: record.budget,
            revenue: record.revenue,
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            release_date: record.release_date.unwrap_or_default(),
            runtime: record.runtime.unwrap_or_default(),
            poster_url: self.poster_url(record.poster_path),
            imdb_id: record.imdb_id.filter(|id| !id.is_empty()),
        }
    }
}

/// Picks a page in `[page_min, page_max]`, tolerating a reversed range.
fn random_page(page_min: u32, page_max: u32) -> u32 {
    let low = page_min.min(page_max).clamp(1, MAX_PAGE);
    let high = page_min.max(page_max).clamp(1, MAX_PAGE);
    rand::rng().random_range(low..=high)
}

fn pick_one(records: &[DiscoverRecord]) -> Option<u64> {
    records.choose(&mut rand::rng()).map(|record| record.id)
}

//=========================================================================================
// `MovieCatalog` Trait Implementation
//=========================================================================================

#[async_trait]
impl MovieCatalog for TmdbCatalogAdapter {
    async fn random_movie(&self, filters: &MovieFilters) -> PortResult<Movie> {
        let page = random_page(filters.page_min, filters.page_max);
        let mut listing = self
            .discover(page, filters.vote_avg_min, filters.vote_count_min)
            .await?;

        // The range can point past the last page for strict filters; fall back to
        // a page that exists.
        if listing.results.is_empty() && listing.total_pages > 0 && page > listing.total_pages {
            let fallback = random_page(1, listing.total_pages);
            info!(
                "Page {} is beyond the {} available pages, retrying page {}",
                page, listing.total_pages, fallback
            );
            listing = self
                .discover(fallback, filters.vote_avg_min, filters.vote_count_min)
                .await?;
        }

        let id = pick_one(&listing.results).ok_or_else(|| {
            PortError::NotFound(format!("no movie matches the filters {:?}", filters))
        })?;
        let record = self.details(id).await?;
        Ok(self.movie(record))
    }

    async fn movies(
        &self,
        page: u32,
        vote_avg_min: f64,
        vote_count_min: f64,
    ) -> PortResult<Vec<MovieSummary>> {
        let listing = self.discover(page, vote_avg_min, vote_count_min).await?;
        Ok(listing
            .results
            .into_iter()
            .map(|record| self.summary(record))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> TmdbCatalogAdapter {
        TmdbCatalogAdapter::new(
            reqwest::Client::new(),
            "key".to_string(),
            "https://api.themoviedb.org/3/".to_string(),
            "https://image.tmdb.org/t/p/w500/".to_string(),
        )
    }

    #[test]
    fn details_map_into_a_movie_with_poster_url() {
        let record: MovieRecord = serde_json::from_value(json!({
            "id": 949,
            "title": "Heat",
            "tagline": "A Los Angeles crime saga",
            "overview": "Obsessive master thief...",
            "genres": [{ "id": 28, "name": "Action" }, { "id": 80, "name": "Crime" }],
            "budget": 60000000,
            "revenue": 187436818,
            "vote_average": 7.9,
            "vote_count": 7000,
            "release_date": "1995-12-15",
            "runtime": 170,
            "poster_path": "/umSVjVdbVwtx5ryCA2QXL44Durm.jpg",
            "imdb_id": "tt0113277"
        }))
        .unwrap();

        let movie = adapter().movie(record);
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.genres, vec!["Action", "Crime"]);
        assert_eq!(movie.runtime, 170);
        assert_eq!(
            movie.poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/umSVjVdbVwtx5ryCA2QXL44Durm.jpg")
        );
        assert_eq!(movie.imdb_id.as_deref(), Some("tt0113277"));
    }

    #[test]
    fn missing_optional_details_fall_back_to_empty_values() {
        let record: MovieRecord = serde_json::from_value(json!({
            "id": 1,
            "title": "Untitled",
            "tagline": null,
            "overview": null,
            "runtime": null,
            "poster_path": null,
            "imdb_id": ""
        }))
        .unwrap();

        let movie = adapter().movie(record);
        assert_eq!(movie.tagline, "");
        assert_eq!(movie.runtime, 0);
        assert!(movie.genres.is_empty());
        assert_eq!(movie.poster_url, None);
        assert_eq!(movie.imdb_id, None);
    }

    #[test]
    fn discover_results_map_into_summaries() {
        let page: DiscoverPage = serde_json::from_value(json!({
            "page": 1,
            "total_pages": 12,
            "results": [
                { "id": 2, "title": "Ronin", "overview": "", "release_date": "1998-09-25",
                  "vote_average": 6.9, "vote_count": 2100, "poster_path": "/r.jpg" }
            ]
        }))
        .unwrap();

        assert_eq!(page.total_pages, 12);
        let adapter = adapter();
        let summaries: Vec<_> = page.results.into_iter().map(|r| adapter.summary(r)).collect();
        assert_eq!(summaries[0].title, "Ronin");
        assert_eq!(
            summaries[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/r.jpg")
        );
    }

    #[test]
    fn random_page_stays_within_the_range() {
        for _ in 0..100 {
            let page = random_page(10, 100);
            assert!((10..=100).contains(&page));
        }
        assert_eq!(random_page(7, 7), 7);
        assert!((2..=4).contains(&random_page(4, 2)));
        assert_eq!(random_page(0, 0), 1);
        assert_eq!(random_page(900, 1000), MAX_PAGE);
    }

    #[test]
    fn picking_from_an_empty_listing_finds_nothing() {
        assert_eq!(pick_one(&[]), None);
    }
}
