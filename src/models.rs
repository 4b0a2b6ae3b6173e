use serde::{Deserialize, Serialize};

/// Upstream provider that produced a [`Movie`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierKind {
    Omdb,
    Tmdb,
}

impl SupplierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SupplierKind::Omdb => "omdb",
            SupplierKind::Tmdb => "tmdb",
        }
    }
}

impl std::fmt::Display for SupplierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical movie/series record shared by every supplier.
///
/// `genres` keeps one slot per upstream genre id; a slot is `None` when the id
/// could not be mapped back to a name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub movie_id: String,
    pub title: String,
    pub year: Option<String>,
    pub genres: Vec<Option<String>>,
    pub poster_url: Option<String>,
    pub supplier: SupplierKind,
}

/// TMDB genre as returned by `/genre/{type}/list`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

pub const DEFAULT_MEDIA_TYPE: &str = "movie";

/// Filters of a single search request.
///
/// Blank strings are treated as absent, and an empty `actors` list means no
/// actor filter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchFilters {
    pub title: Option<String>,
    pub media_type: String,
    pub actors: Vec<String>,
    pub genre: Option<String>,
    pub page: u32,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            title: None,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
            actors: Vec::new(),
            genre: None,
            page: 1,
        }
    }
}

impl SearchFilters {
    pub fn by_title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    pub fn with_actors<I, S>(mut self, actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actors = actors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    pub fn genre(&self) -> Option<&str> {
        non_blank(self.genre.as_deref())
    }

    pub fn actors(&self) -> impl Iterator<Item = &str> {
        self.actors.iter().map(|a| a.trim()).filter(|a| !a.is_empty())
    }

    pub fn has_actors(&self) -> bool {
        self.actors().next().is_some()
    }

    /// True when the request should go through cast/genre discovery.
    pub fn is_discovery(&self) -> bool {
        self.has_actors() || self.genre().is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub page: u32,
    pub results: Vec<Movie>,
}
