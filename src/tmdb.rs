use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::MetadataConfig;

pub const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const YOUTUBE_EMBED: &str = "https://www.youtube.com/embed";
const VIMEO_EMBED: &str = "https://player.vimeo.com/video";

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>>;
    async fn discover_movies(&self) -> Result<Vec<Movie>>;
    async fn trending_movies(&self) -> Result<Vec<Movie>>;
    async fn movie_details(&self, id: i64) -> Result<MovieDetails>;
    async fn movie_videos(&self, id: i64) -> Result<Vec<Video>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
    pub original_language: Option<String>,
    pub overview: Option<String>,
}

impl Movie {
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path.as_deref().map(poster_url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub production_companies: Vec<Named>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Named {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub official: bool,
    pub key: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Clone)]
enum Auth {
    Bearer(String),
    /// Requests go through our own proxy, which adds the credential.
    Proxied,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl TmdbClient {
    /// Returns `None` when lookups are disabled by configuration.
    pub fn from_config(config: &MetadataConfig) -> Result<Option<Self>> {
        let (base_url, auth) = match config {
            MetadataConfig::Direct { api_key, base_url } => {
                (base_url.clone(), Auth::Bearer(api_key.clone()))
            }
            MetadataConfig::Proxied { base_url } => (base_url.clone(), Auth::Proxied),
            MetadataConfig::Disabled => return Ok(None),
        };
        Ok(Some(Self {
            client: http_client()?,
            base_url,
            auth,
        }))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path_and_query: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path_and_query);
        let mut req = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Auth::Bearer(token) = &self.auth {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            // Callers only learn that the fetch failed, not why.
            return Err(anyhow!("Failed to fetch {}", path_and_query));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

/// Shared client settings for outbound calls.
pub(crate) fn http_client() -> Result<Client> {
    let user_agent = format!("reelfinder/{}", env!("CARGO_PKG_VERSION"));
    Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search_movies(&self, query: &str) -> Result<Vec<Movie>> {
        let path = format!("search/movie?query={}", urlencoding::encode(query));
        let page: Page<Movie> = self.get_json(&path).await?;
        Ok(page.results)
    }

    async fn discover_movies(&self) -> Result<Vec<Movie>> {
        let page: Page<Movie> = self
            .get_json("discover/movie?sort_by=popularity.desc")
            .await?;
        Ok(page.results)
    }

    async fn trending_movies(&self) -> Result<Vec<Movie>> {
        let page: Page<Movie> = self.get_json("trending/movie/week").await?;
        Ok(page.results)
    }

    async fn movie_details(&self, id: i64) -> Result<MovieDetails> {
        self.get_json(&format!("movie/{id}")).await
    }

    async fn movie_videos(&self, id: i64) -> Result<Vec<Video>> {
        let page: Page<Video> = self.get_json(&format!("movie/{id}/videos")).await?;
        Ok(page.results)
    }
}

pub fn poster_url(path: &str) -> String {
    format!("{POSTER_BASE}{path}")
}

/// Official trailer first, then any trailer, then a teaser.
pub fn select_trailer(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .find(|v| v.video_type == "Trailer" && v.official)
        .or_else(|| videos.iter().find(|v| v.video_type == "Trailer"))
        .or_else(|| videos.iter().find(|v| v.video_type == "Teaser"))
}

pub fn embed_url(video: &Video) -> Option<String> {
    match video.site.as_str() {
        "YouTube" => Some(format!("{YOUTUBE_EMBED}/{}", video.key)),
        "Vimeo" => Some(format!("{VIMEO_EMBED}/{}", video.key)),
        _ => None,
    }
}
