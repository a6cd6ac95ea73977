//! Domain models for bookmarks and the offline content index
//!
//! This module contains rich domain models with validation. Database row
//! mapping lives next to each repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{LibraryError, Result};
use crate::structure::{self, CHAPTER_COUNT, PAGE_COUNT};

// =============================================================================
// Verse References
// =============================================================================

/// A single verse, identified by chapter and verse number.
///
/// Can only be built through [`VerseReference::new`], which guarantees that
/// `global_number == cumulative_offset(chapter) + verse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerseReference {
    chapter: u16,
    verse: u16,
    global_number: u16,
}

impl VerseReference {
    /// First verse of the first chapter, used as the opening formula.
    pub const OPENING_FORMULA: VerseReference = VerseReference {
        chapter: 1,
        verse: 1,
        global_number: 1,
    };

    pub fn new(chapter: u16, verse: u16) -> Result<Self> {
        let global_number = structure::global_verse_number(chapter, verse)?;
        Ok(Self {
            chapter,
            verse,
            global_number,
        })
    }

    /// Build a reference from its global number in `1..=6236`.
    pub fn from_global(global_number: u16) -> Result<Self> {
        let (chapter, verse) = structure::locate_global(global_number)?;
        Ok(Self {
            chapter,
            verse,
            global_number,
        })
    }

    pub fn chapter(&self) -> u16 {
        self.chapter
    }

    pub fn verse(&self) -> u16 {
        self.verse
    }

    pub fn global_number(&self) -> u16 {
        self.global_number
    }

    /// Cache index key, `"chapter:verse"`.
    pub fn cache_id(&self) -> String {
        format!("{}:{}", self.chapter, self.verse)
    }
}

impl fmt::Display for VerseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

impl FromStr for VerseReference {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || LibraryError::InvalidInput {
            field: "verse_reference".to_string(),
            message: format!("expected \"chapter:verse\", got {:?}", s),
        };
        let (chapter, verse) = s.split_once(':').ok_or_else(invalid)?;
        let chapter = chapter.trim().parse::<u16>().map_err(|_| invalid())?;
        let verse = verse.trim().parse::<u16>().map_err(|_| invalid())?;
        Self::new(chapter, verse)
    }
}

// =============================================================================
// Bookmarks
// =============================================================================

/// Database identifier of a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookmarkId(pub i64);

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a bookmark points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkKind {
    Verse,
    Range,
    Chapter,
    Page,
}

impl BookmarkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkKind::Verse => "verse",
            BookmarkKind::Range => "range",
            BookmarkKind::Chapter => "chapter",
            BookmarkKind::Page => "page",
        }
    }
}

impl FromStr for BookmarkKind {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "verse" => Ok(BookmarkKind::Verse),
            "range" => Ok(BookmarkKind::Range),
            "chapter" => Ok(BookmarkKind::Chapter),
            "page" => Ok(BookmarkKind::Page),
            other => Err(LibraryError::InvalidInput {
                field: "kind".to_string(),
                message: format!("Unknown bookmark kind: {}", other),
            }),
        }
    }
}

/// A user bookmark
///
/// Page bookmarks keep the page number in `start_verse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Zero until the bookmark has been persisted
    pub id: BookmarkId,
    pub group_id: i64,
    pub kind: BookmarkKind,
    pub start_chapter: u16,
    pub start_verse: u16,
    pub end_chapter: u16,
    pub end_verse: u16,
    pub description: String,
    pub tags: Vec<String>,
    /// Timestamps, Unix milliseconds
    pub created_at: i64,
    pub updated_at: i64,
}

impl Bookmark {
    fn new(
        group_id: i64,
        kind: BookmarkKind,
        start_chapter: u16,
        start_verse: u16,
        end_verse: u16,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: BookmarkId(0),
            group_id,
            kind,
            start_chapter,
            start_verse,
            end_chapter: start_chapter,
            end_verse,
            description: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bookmark a single verse
    pub fn verse(group_id: i64, chapter: u16, verse: u16) -> Self {
        Self::new(group_id, BookmarkKind::Verse, chapter, verse, verse)
    }

    /// Bookmark `start..=end` within one chapter
    pub fn range(group_id: i64, chapter: u16, start: u16, end: u16) -> Self {
        Self::new(group_id, BookmarkKind::Range, chapter, start, end)
    }

    /// Bookmark a whole chapter
    pub fn chapter(group_id: i64, chapter: u16) -> Self {
        Self::new(group_id, BookmarkKind::Chapter, chapter, 1, 1)
    }

    /// Bookmark a mushaf page
    pub fn page(group_id: i64, page: u16) -> Self {
        Self::new(group_id, BookmarkKind::Page, 1, page, page)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Page number of a page bookmark
    pub fn page_number(&self) -> Option<u16> {
        (self.kind == BookmarkKind::Page).then_some(self.start_verse)
    }

    /// Human-readable location, e.g. `"Surah 2:1-5"`
    pub fn display_text(&self) -> String {
        match self.kind {
            BookmarkKind::Verse => format!("Surah {}:{}", self.start_chapter, self.start_verse),
            BookmarkKind::Range => format!(
                "Surah {}:{}-{}",
                self.start_chapter, self.start_verse, self.end_verse
            ),
            BookmarkKind::Chapter => format!("Surah {}", self.start_chapter),
            BookmarkKind::Page => format!("Page {}", self.start_verse),
        }
    }

    /// Validate bookmark data
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.kind == BookmarkKind::Page {
            if !(1..=PAGE_COUNT).contains(&self.start_verse) {
                return Err(format!(
                    "Page must be between 1 and {}, got {}",
                    PAGE_COUNT, self.start_verse
                ));
            }
            return Ok(());
        }

        if !(1..=CHAPTER_COUNT).contains(&self.start_chapter) {
            return Err(format!(
                "Chapter must be between 1 and {}, got {}",
                CHAPTER_COUNT, self.start_chapter
            ));
        }
        let length = structure::chapter_length(self.start_chapter).map_err(|e| e.to_string())?;

        match self.kind {
            BookmarkKind::Verse => {
                if !(1..=length).contains(&self.start_verse) {
                    return Err(format!(
                        "Verse must be between 1 and {} for chapter {}, got {}",
                        length, self.start_chapter, self.start_verse
                    ));
                }
            }
            BookmarkKind::Range => {
                if self.end_chapter != self.start_chapter {
                    return Err("Range must stay within a single chapter".to_string());
                }
                if self.start_verse < 1 || self.end_verse > length {
                    return Err(format!(
                        "Range {}-{} exceeds chapter {} ({} verses)",
                        self.start_verse, self.end_verse, self.start_chapter, length
                    ));
                }
                if self.end_verse <= self.start_verse {
                    return Err("Range end must come after its start".to_string());
                }
            }
            BookmarkKind::Chapter | BookmarkKind::Page => {}
        }

        Ok(())
    }
}

// =============================================================================
// Offline Content
// =============================================================================

/// Descriptive data for one verse as returned by the metadata service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseMetadata {
    pub text: String,
    pub chapter_name: String,
    pub chapter_name_en: String,
    pub chapter: u16,
    /// "Meccan" or "Medinan"
    pub revelation_type: String,
    /// Verse count of the chapter
    pub verse_count: u16,
    pub hizb_quarter: u16,
    pub ruku: u16,
    pub page: u16,
    pub manzil: u16,
    pub sajda: bool,
    pub global_number: u16,
    pub verse_in_chapter: u16,
}

/// Cache index row for one verse
///
/// Either path may be missing; the entry is usable for whatever is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// `"chapter:verse"`
    pub id: String,
    pub chapter: u16,
    pub verse: u16,
    pub image_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub metadata: Option<VerseMetadata>,
    pub downloaded_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Empty entry for `reference`
    pub fn new(reference: &VerseReference, downloaded_at: DateTime<Utc>) -> Self {
        Self {
            id: reference.cache_id(),
            chapter: reference.chapter(),
            verse: reference.verse(),
            image_path: None,
            audio_path: None,
            metadata: None,
            downloaded_at,
        }
    }

    pub fn with_image(mut self, path: Option<PathBuf>) -> Self {
        self.image_path = path;
        self
    }

    pub fn with_audio(mut self, path: Option<PathBuf>) -> Self {
        self.audio_path = path;
        self
    }

    pub fn with_metadata(mut self, metadata: Option<VerseMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// True when both the image and the recitation are on disk
    pub fn is_fully_cached(&self) -> bool {
        self.image_path.is_some() && self.audio_path.is_some()
    }

    pub fn reference(&self) -> Result<VerseReference> {
        VerseReference::new(self.chapter, self.verse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_verse_reference_new() {
        let reference = VerseReference::new(2, 255).unwrap();
        assert_eq!(reference.chapter(), 2);
        assert_eq!(reference.verse(), 255);
        assert_eq!(reference.global_number(), 262);
        assert_eq!(reference.cache_id(), "2:255");
        assert_eq!(reference.to_string(), "2:255");

        assert!(VerseReference::new(1, 8).is_err());
        assert!(VerseReference::new(115, 1).is_err());
    }

    #[test]
    fn test_opening_formula_constant_is_consistent() {
        assert_eq!(
            VerseReference::new(1, 1).unwrap(),
            VerseReference::OPENING_FORMULA
        );
        assert_eq!(VerseReference::from_global(1).unwrap(), VerseReference::OPENING_FORMULA);
    }

    #[test]
    fn test_verse_reference_parse() {
        let parsed: VerseReference = "18:10".parse().unwrap();
        assert_eq!(parsed, VerseReference::new(18, 10).unwrap());

        assert!(matches!(
            "18-10".parse::<VerseReference>(),
            Err(LibraryError::InvalidInput { .. })
        ));
        assert!(matches!(
            "18:200".parse::<VerseReference>(),
            Err(LibraryError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_verse_reference_hash_dedup() {
        let set: HashSet<_> = [
            VerseReference::new(3, 1).unwrap(),
            "3:1".parse().unwrap(),
            VerseReference::from_global(294).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_bookmark_kind_round_trip() {
        for kind in [
            BookmarkKind::Verse,
            BookmarkKind::Range,
            BookmarkKind::Chapter,
            BookmarkKind::Page,
        ] {
            assert_eq!(kind.as_str().parse::<BookmarkKind>().unwrap(), kind);
        }
        assert!("surah".parse::<BookmarkKind>().is_err());
    }

    #[test]
    fn test_bookmark_display_text() {
        assert_eq!(Bookmark::verse(1, 2, 255).display_text(), "Surah 2:255");
        assert_eq!(Bookmark::range(1, 2, 1, 5).display_text(), "Surah 2:1-5");
        assert_eq!(Bookmark::chapter(1, 36).display_text(), "Surah 36");
        assert_eq!(Bookmark::page(1, 604).display_text(), "Page 604");
    }

    #[test]
    fn test_bookmark_validation() {
        assert!(Bookmark::verse(1, 1, 7).validate().is_ok());
        assert!(Bookmark::verse(1, 1, 8).validate().is_err());
        assert!(Bookmark::verse(1, 0, 1).validate().is_err());
        assert!(Bookmark::verse(1, 115, 1).validate().is_err());

        assert!(Bookmark::range(1, 2, 1, 5).validate().is_ok());
        assert!(Bookmark::range(1, 2, 5, 5).validate().is_err());
        assert!(Bookmark::range(1, 2, 5, 1).validate().is_err());
        assert!(Bookmark::range(1, 1, 1, 8).validate().is_err());

        let mut cross_chapter = Bookmark::range(1, 2, 1, 5);
        cross_chapter.end_chapter = 3;
        assert!(cross_chapter.validate().is_err());

        assert!(Bookmark::chapter(1, 114).validate().is_ok());
        assert!(Bookmark::page(1, 1).validate().is_ok());
        assert!(Bookmark::page(1, 605).validate().is_err());
        assert!(Bookmark::page(1, 0).validate().is_err());
    }

    #[test]
    fn test_page_number() {
        assert_eq!(Bookmark::page(1, 42).page_number(), Some(42));
        assert_eq!(Bookmark::verse(1, 1, 1).page_number(), None);
    }

    #[test]
    fn test_cache_entry_fully_cached() {
        let reference = VerseReference::new(1, 2).unwrap();
        let entry = CacheEntry::new(&reference, Utc::now());
        assert_eq!(entry.id, "1:2");
        assert!(!entry.is_fully_cached());

        let entry = entry.with_image(Some(PathBuf::from("/tmp/image_1_2.png")));
        assert!(!entry.is_fully_cached());

        let entry = entry.with_audio(Some(PathBuf::from("/tmp/audio_1_2.mp3")));
        assert!(entry.is_fully_cached());
        assert_eq!(entry.reference().unwrap(), reference);
    }
}
