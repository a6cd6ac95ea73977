//! Reference resolution
//!
//! Expands a [`Bookmark`] into the ordered, duplicate-free list of verses it
//! denotes, and decides whether the opening formula has to be cached with
//! them. Everything here is a pure function over the structural index.

use std::collections::HashSet;

use crate::error::{LibraryError, Result};
use crate::models::{Bookmark, BookmarkKind, VerseReference};
use crate::structure::{self, CHAPTER_COUNT, CHAPTER_WITHOUT_OPENING_FORMULA};

/// Expand `bookmark` into the verses it covers.
///
/// - `Verse` yields exactly one reference.
/// - `Range` yields `start..=end` within the start chapter.
/// - `Chapter` yields every verse of the chapter.
/// - `Page` yields nothing; page-to-verse mapping is not tabulated.
///
/// Out-of-range chapter or verse numbers fail with
/// [`LibraryError::OutOfRange`]; a range whose end precedes its start fails
/// with [`LibraryError::InvalidInput`].
pub fn resolve(bookmark: &Bookmark) -> Result<Vec<VerseReference>> {
    let references = match bookmark.kind {
        BookmarkKind::Verse => {
            vec![VerseReference::new(
                bookmark.start_chapter,
                bookmark.start_verse,
            )?]
        }
        BookmarkKind::Range => {
            if bookmark.end_verse < bookmark.start_verse {
                return Err(LibraryError::InvalidInput {
                    field: "end_verse".to_string(),
                    message: format!(
                        "range end {} precedes start {}",
                        bookmark.end_verse, bookmark.start_verse
                    ),
                });
            }
            (bookmark.start_verse..=bookmark.end_verse)
                .map(|verse| VerseReference::new(bookmark.start_chapter, verse))
                .collect::<Result<Vec<_>>>()?
        }
        BookmarkKind::Chapter => {
            let length = structure::chapter_length(bookmark.start_chapter)?;
            (1..=length)
                .map(|verse| VerseReference::new(bookmark.start_chapter, verse))
                .collect::<Result<Vec<_>>>()?
        }
        BookmarkKind::Page => Vec::new(),
    };

    Ok(dedup_in_order(references))
}

/// Drop repeated references, keeping the first occurrence of each.
pub fn dedup_in_order(references: impl IntoIterator<Item = VerseReference>) -> Vec<VerseReference> {
    let mut seen = HashSet::new();
    references
        .into_iter()
        .filter(|reference| seen.insert(*reference))
        .collect()
}

/// True iff some reference is the first verse of a chapter that is recited
/// with the opening formula, i.e. any chapter other than 1 and 9.
pub fn needs_opening_formula(references: &[VerseReference]) -> bool {
    references.iter().any(|reference| {
        reference.verse() == 1
            && (2..=CHAPTER_COUNT).contains(&reference.chapter())
            && reference.chapter() != CHAPTER_WITHOUT_OPENING_FORMULA
    })
}

/// Append [`VerseReference::OPENING_FORMULA`] when it is needed and absent.
pub fn with_opening_formula(mut references: Vec<VerseReference>) -> Vec<VerseReference> {
    if needs_opening_formula(&references)
        && !references.contains(&VerseReference::OPENING_FORMULA)
    {
        references.push(VerseReference::OPENING_FORMULA);
    }
    references
}

/// Everything that must be on disk to read `bookmark` offline.
pub fn resolve_for_caching(bookmark: &Bookmark) -> Result<Vec<VerseReference>> {
    Ok(with_opening_formula(resolve(bookmark)?))
}
