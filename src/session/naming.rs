//! Filenames for captured images.
//!
//! Names follow `image_<YYYYMMDD_HHMMSS>_<index>.<ext>` so that downstream
//! tooling can group captures by time. The index is zero-padded to two
//! digits, which keeps names from one session in capture order under a
//! plain lexicographic sort for sessions of fewer than 100 images. Two
//! sessions started within the same second produce interleaved names.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Prefix shared by every captured image.
pub const CAPTURE_PREFIX: &str = "image_";

/// Builds the filename for capture `index` taken at `taken_at`.
pub fn capture_filename<Tz>(taken_at: &DateTime<Tz>, index: u32, extension: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}{}_{:02}.{}",
        CAPTURE_PREFIX,
        taken_at.format("%Y%m%d_%H%M%S"),
        index,
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    #[test]
    fn test_filename_format() {
        let taken_at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(
            capture_filename(&taken_at, 3, "jpg"),
            "image_20240307_090502_03.jpg"
        );
    }

    #[test]
    fn test_large_index_not_truncated() {
        let taken_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            capture_filename(&taken_at, 123, "png"),
            "image_20240101_000000_123.png"
        );
    }

    proptest! {
        #[test]
        fn prop_names_sort_in_capture_order(
            start in 0i64..2_000_000_000,
            steps in proptest::collection::vec(0i64..3, 1..99),
        ) {
            // Timestamps never go backwards within a session and may repeat
            let mut taken_at = Utc.timestamp_opt(start, 0).unwrap();
            let mut names = Vec::with_capacity(steps.len());
            for (index, step) in steps.iter().enumerate() {
                taken_at = taken_at + Duration::seconds(*step);
                names.push(capture_filename(&taken_at, index as u32, "jpg"));
            }

            let mut sorted = names.clone();
            sorted.sort();
            prop_assert_eq!(sorted, names);
        }
    }
}
