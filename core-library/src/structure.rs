//! Structural index of the mushaf
//!
//! Static verse counts for the 114 chapters and the prefix sums used to map a
//! `(chapter, verse)` pair onto its global verse number in `1..=6236`.
//! Every lookup validates its input and fails with
//! [`LibraryError::OutOfRange`] instead of clamping.

use crate::error::{LibraryError, Result};

/// Number of chapters
pub const CHAPTER_COUNT: u16 = 114;

/// Number of verses across all chapters
pub const TOTAL_VERSES: u16 = 6236;

/// Number of pages in the standard Madani mushaf
pub const PAGE_COUNT: u16 = 604;

/// Chapter that does not open with the opening formula
pub const CHAPTER_WITHOUT_OPENING_FORMULA: u16 = 9;

/// Verse count per chapter, indexed by `chapter - 1`.
pub const CHAPTER_LENGTHS: [u16; CHAPTER_COUNT as usize] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, // 1-10
    123, 111, 43, 52, 99, 128, 111, 110, 98, 135, // 11-20
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, // 21-30
    34, 30, 73, 54, 45, 83, 182, 88, 75, 85, // 31-40
    54, 53, 89, 59, 37, 35, 38, 29, 18, 45, // 41-50
    60, 49, 62, 55, 78, 96, 29, 22, 24, 13, // 51-60
    14, 11, 11, 18, 12, 12, 30, 52, 52, 44, // 61-70
    28, 28, 20, 56, 40, 31, 50, 40, 46, 42, // 71-80
    29, 19, 36, 25, 22, 17, 19, 26, 30, 20, // 81-90
    15, 21, 11, 8, 8, 19, 5, 8, 8, 11, // 91-100
    11, 8, 3, 9, 5, 4, 7, 3, 6, 3, // 101-110
    5, 4, 5, 6, // 111-114
];

/// Number of verses preceding each chapter, indexed by `chapter - 1`.
pub const CHAPTER_OFFSETS: [u16; CHAPTER_COUNT as usize] = prefix_sums(&CHAPTER_LENGTHS);

const fn prefix_sums(lengths: &[u16; CHAPTER_COUNT as usize]) -> [u16; CHAPTER_COUNT as usize] {
    let mut offsets = [0u16; CHAPTER_COUNT as usize];
    let mut i = 1;
    while i < CHAPTER_COUNT as usize {
        offsets[i] = offsets[i - 1] + lengths[i - 1];
        i += 1;
    }
    offsets
}

const _: () = assert!(
    CHAPTER_OFFSETS[CHAPTER_COUNT as usize - 1] + CHAPTER_LENGTHS[CHAPTER_COUNT as usize - 1]
        == TOTAL_VERSES
);

fn check_chapter(chapter: u16) -> Result<usize> {
    if (1..=CHAPTER_COUNT).contains(&chapter) {
        Ok(chapter as usize - 1)
    } else {
        Err(LibraryError::out_of_range(
            "chapter",
            chapter,
            1,
            CHAPTER_COUNT as i64,
        ))
    }
}

/// Number of verses in `chapter`.
pub fn chapter_length(chapter: u16) -> Result<u16> {
    Ok(CHAPTER_LENGTHS[check_chapter(chapter)?])
}

/// Number of verses in all chapters before `chapter`.
pub fn cumulative_offset(chapter: u16) -> Result<u16> {
    Ok(CHAPTER_OFFSETS[check_chapter(chapter)?])
}

/// Global number in `1..=6236` of `chapter:verse`.
pub fn global_verse_number(chapter: u16, verse: u16) -> Result<u16> {
    let idx = check_chapter(chapter)?;
    let length = CHAPTER_LENGTHS[idx];
    if !(1..=length).contains(&verse) {
        return Err(LibraryError::out_of_range("verse", verse, 1, length as i64));
    }
    Ok(CHAPTER_OFFSETS[idx] + verse)
}

/// Inverse of [`global_verse_number`].
pub fn locate_global(global: u16) -> Result<(u16, u16)> {
    if !(1..=TOTAL_VERSES).contains(&global) {
        return Err(LibraryError::out_of_range(
            "global_number",
            global,
            1,
            TOTAL_VERSES as i64,
        ));
    }
    // Offsets are strictly increasing, so the owning chapter is the last one
    // whose offset is below `global`.
    let idx = CHAPTER_OFFSETS.partition_point(|&offset| offset < global) - 1;
    Ok((idx as u16 + 1, global - CHAPTER_OFFSETS[idx]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_sums_to_total() {
        let sum: u32 = CHAPTER_LENGTHS.iter().map(|&n| n as u32).sum();
        assert_eq!(sum, TOTAL_VERSES as u32);
    }

    #[test]
    fn test_known_offsets() {
        assert_eq!(cumulative_offset(1).unwrap(), 0);
        assert_eq!(cumulative_offset(2).unwrap(), 7);
        assert_eq!(cumulative_offset(3).unwrap(), 293);
        assert_eq!(cumulative_offset(9).unwrap(), 1235);
        assert_eq!(cumulative_offset(114).unwrap(), 6230);
    }

    #[test]
    fn test_global_numbers_endpoints() {
        assert_eq!(global_verse_number(1, 1).unwrap(), 1);
        assert_eq!(global_verse_number(2, 255).unwrap(), 262);
        assert_eq!(global_verse_number(114, 6).unwrap(), TOTAL_VERSES);
    }

    #[test]
    fn test_global_numbers_are_unique() {
        let mut seen = HashSet::new();
        for chapter in 1..=CHAPTER_COUNT {
            for verse in 1..=chapter_length(chapter).unwrap() {
                assert!(seen.insert(global_verse_number(chapter, verse).unwrap()));
            }
        }
        assert_eq!(seen.len(), TOTAL_VERSES as usize);
    }

    #[test]
    fn test_out_of_range_inputs() {
        assert!(matches!(
            chapter_length(0),
            Err(LibraryError::OutOfRange { .. })
        ));
        assert!(matches!(
            cumulative_offset(115),
            Err(LibraryError::OutOfRange { .. })
        ));
        assert!(matches!(
            global_verse_number(1, 8),
            Err(LibraryError::OutOfRange { .. })
        ));
        assert!(matches!(
            global_verse_number(2, 0),
            Err(LibraryError::OutOfRange { .. })
        ));
        assert!(locate_global(0).is_err());
        assert!(locate_global(TOTAL_VERSES + 1).is_err());
    }

    #[test]
    fn test_locate_global_inverts_numbering() {
        assert_eq!(locate_global(1).unwrap(), (1, 1));
        assert_eq!(locate_global(7).unwrap(), (1, 7));
        assert_eq!(locate_global(8).unwrap(), (2, 1));
        assert_eq!(locate_global(262).unwrap(), (2, 255));
        assert_eq!(locate_global(TOTAL_VERSES).unwrap(), (114, 6));

        for global in (1..=TOTAL_VERSES).step_by(97) {
            let (chapter, verse) = locate_global(global).unwrap();
            assert_eq!(global_verse_number(chapter, verse).unwrap(), global);
        }
    }
}
