//! Timestamped output file names

use chrono::{Local, NaiveDateTime};
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Local time formatted as `yyyyMMddHHmmss`
pub fn timestamp_now() -> String {
    Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string()
}

/// `students_<timestamp>.xlsx`
pub fn generated_file_name(at: NaiveDateTime) -> String {
    format!("students_{}.xlsx", at.format(TIMESTAMP_FORMAT))
}

/// `<input stem>_processed_<timestamp>.csv`
pub fn processed_file_name(input: &Path, at: NaiveDateTime) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "students".into());
    format!("{}_processed_{}.csv", stem, at.format(TIMESTAMP_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap()
    }

    #[test]
    fn test_names() {
        assert_eq!(generated_file_name(at()), "students_20240309070501.xlsx");
        assert_eq!(
            processed_file_name(Path::new("/data/students_1.xlsx"), at()),
            "students_1_processed_20240309070501.csv"
        );
        assert_eq!(
            processed_file_name(Path::new(""), at()),
            "students_processed_20240309070501.csv"
        );
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), 14);
        assert!(ts.bytes().all(|b| b.is_ascii_digit()));
    }
}
