//! Read flows behind the movie browser: search-or-discover, trending with a
//! fallback, and the details view with its trailer.

use rand::seq::SliceRandom;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::counters::{SearchCounter, SearchCounters};
use crate::tmdb::{embed_url, select_trailer, Movie, MovieDetails, TmdbApi, Video};

pub const TRENDING_LIMIT: usize = 5;
pub const NOT_CONFIGURED_MESSAGE: &str =
    "TMDB API key is not configured. Please check your environment variables.";
pub const FETCH_FAILED_MESSAGE: &str = "Error fetching movies. Please try again later.";
pub const DETAILS_FAILED_MESSAGE: &str = "Failed to load movie details";
pub const NO_TRENDING_MESSAGE: &str = "No trending movies available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendingSource {
    Tmdb,
    SearchCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendingItem {
    pub rank: usize,
    pub movie_id: Option<i64>,
    pub title: Option<String>,
    pub poster_url: Option<String>,
    pub source: TrendingSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trailer {
    pub video: Video,
    pub embed_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieView {
    pub details: MovieDetails,
    pub trailer: Option<Trailer>,
}

#[derive(Clone)]
pub struct Discovery {
    tmdb: Option<Arc<dyn TmdbApi>>,
    counters: SearchCounters,
}

impl Discovery {
    pub fn new(tmdb: Option<Arc<dyn TmdbApi>>, counters: SearchCounters) -> Self {
        Self { tmdb, counters }
    }

    pub fn counters(&self) -> &SearchCounters {
        &self.counters
    }

    /// Searches when `query` has text, otherwise lists popular movies. The error
    /// is a message meant for the user.
    ///
    /// A successful search with results is counted in the background; the
    /// returned list does not wait for it.
    pub async fn fetch_movies(&self, query: &str) -> Result<Vec<Movie>, &'static str> {
        let Some(tmdb) = &self.tmdb else {
            return Err(NOT_CONFIGURED_MESSAGE);
        };
        let query = query.trim();
        let result = if query.is_empty() {
            tmdb.discover_movies().await
        } else {
            tmdb.search_movies(query).await
        };

        let movies = result.map_err(|e| {
            error!("Error fetching movies: {:#}", e);
            FETCH_FAILED_MESSAGE
        })?;

        if !query.is_empty() {
            if let Some(first) = movies.first() {
                let counters = self.counters.clone();
                let term = query.to_string();
                let first = first.clone();
                tokio::spawn(async move {
                    counters.record_search(&term, &first).await;
                });
            }
        }
        Ok(movies)
    }

    pub async fn trending(&self) -> Vec<TrendingItem> {
        let Some(tmdb) = &self.tmdb else {
            info!("TMDB not configured, skipping trending movies");
            return Vec::new();
        };
        match tmdb.trending_movies().await {
            Ok(movies) => movies
                .into_iter()
                .take(TRENDING_LIMIT)
                .enumerate()
                .map(|(i, m)| TrendingItem {
                    rank: i + 1,
                    movie_id: Some(m.id),
                    poster_url: m.poster_url(),
                    title: Some(m.title),
                    source: TrendingSource::Tmdb,
                })
                .collect(),
            Err(e) => {
                warn!("Error fetching trending movies from TMDB, using search counts: {:#}", e);
                self.counters
                    .top_searches(TRENDING_LIMIT)
                    .await
                    .into_iter()
                    .enumerate()
                    .map(|(i, c)| from_counter(i + 1, c))
                    .collect()
            }
        }
    }

    /// One random entry of the current trending strip.
    pub async fn surprise(&self) -> Option<TrendingItem> {
        let items = self.trending().await;
        items.choose(&mut rand::thread_rng()).cloned()
    }

    /// Details and videos are requested together; a videos failure only costs
    /// the trailer.
    pub async fn movie(&self, id: i64) -> Result<MovieView, &'static str> {
        let Some(tmdb) = &self.tmdb else {
            return Err(NOT_CONFIGURED_MESSAGE);
        };
        let (details, videos) = tokio::join!(tmdb.movie_details(id), tmdb.movie_videos(id));

        let details = details.map_err(|e| {
            error!("Error fetching movie details for {}: {:#}", id, e);
            DETAILS_FAILED_MESSAGE
        })?;
        let videos = videos.unwrap_or_else(|e| {
            warn!("Error fetching movie videos for {}: {:#}", id, e);
            Vec::new()
        });

        let trailer = select_trailer(&videos).map(|v| Trailer {
            embed_url: embed_url(v),
            video: v.clone(),
        });
        Ok(MovieView { details, trailer })
    }
}

fn from_counter(rank: usize, counter: SearchCounter) -> TrendingItem {
    TrendingItem {
        rank,
        movie_id: counter.movie_id,
        title: None,
        poster_url: counter.poster_url,
        source: TrendingSource::SearchCounts,
    }
}
