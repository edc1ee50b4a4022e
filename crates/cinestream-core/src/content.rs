//! Content records served by the catalog

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog identifier of a title
pub type ContentId = u64;

/// Section a title is grouped under on the home screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movies,
    Shows,
    Sports,
}

impl ContentType {
    /// Home sections in display order
    pub const ALL: [ContentType; 3] = [ContentType::Movies, ContentType::Shows, ContentType::Sports];

    /// Heading of the home section for this type
    pub fn section_title(&self) -> &'static str {
        match self {
            ContentType::Movies => "Trending Movies",
            ContentType::Shows => "Popular TV Shows",
            ContentType::Sports => "Latest Sports",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Movies => write!(f, "movies"),
            ContentType::Shows => write!(f, "shows"),
            ContentType::Sports => write!(f, "sports"),
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    /// Playable stream address
    pub url: String,
    pub is_premium: bool,
    /// Duration label, e.g. "1 hr 50 min" or "Live"
    pub duration: String,
    pub language: String,
    pub genre: String,
    pub rating: String,
    /// Release label, e.g. "29 Dec 2024" or "Live"
    pub release_date: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

impl ContentRecord {
    /// Parsed release date; `None` for labels such as "Live"
    pub fn release_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.release_date.trim(), "%d %b %Y").ok()
    }

    pub fn is_live(&self) -> bool {
        self.duration.eq_ignore_ascii_case("live")
    }

    /// Case-insensitive substring match on title or description
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }

    /// One-line metadata summary shown under the title
    pub fn metadata_line(&self) -> String {
        [
            self.release_date.as_str(),
            self.duration.as_str(),
            self.language.as_str(),
            self.genre.as_str(),
            self.rating.as_str(),
        ]
        .join(" • ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ContentRecord {
        ContentRecord {
            id: 7,
            title: "Night Shift".into(),
            description: "Thriller · English".into(),
            thumbnail_url: "https://img.example.com/7.jpg".into(),
            url: "https://cdn.example.com/7/master.m3u8".into(),
            is_premium: false,
            duration: "Live".into(),
            language: "English".into(),
            genre: "Thriller".into(),
            rating: "A".into(),
            release_date: "25 Dec 2024".into(),
            content_type: ContentType::Movies,
        }
    }

    #[test]
    fn test_release_date_parsing() {
        let mut r = record();
        assert_eq!(r.release_date(), NaiveDate::from_ymd_opt(2024, 12, 25));
        r.release_date = "Live".into();
        assert_eq!(r.release_date(), None);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["thumbnailUrl"], "https://img.example.com/7.jpg");
        assert_eq!(json["isPremium"], false);
        assert_eq!(json["releaseDate"], "25 Dec 2024");
        assert_eq!(json["type"], "movies");
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let r = record();
        assert!(r.matches("NIGHT"));
        assert!(r.matches("thriller"));
        assert!(r.matches(""));
        assert!(!r.matches("cricket"));
        assert!(r.is_live());
    }
}
