//! Reading processed student CSV files back into records

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;

use crate::csv::CsvParser;
use crate::error::{Result, SheetError};
use crate::generator::STUDENT_COLUMNS;

/// One student as read from a processed CSV. The id column is not carried
/// over; the store assigns its own.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StudentRecord {
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub class_name: String,
    pub score: Option<i64>,
}

impl StudentRecord {
    /// Build a record from CSV fields, `None` when there are fewer than six.
    ///
    /// An unparsable dob or score becomes `None`; `offset` is added to a
    /// valid score.
    pub fn from_fields(fields: &[String], offset: i64) -> Option<Self> {
        if fields.len() < STUDENT_COLUMNS.len() {
            return None;
        }
        let dob = match fields[3].as_str() {
            "" => None,
            s => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        };
        let score = match fields[5].as_str() {
            "" => None,
            s => s
                .parse::<i64>()
                .ok()
                .and_then(|v| v.checked_add(offset)),
        };
        Some(StudentRecord {
            first_name: fields[1].clone(),
            last_name: fields[2].clone(),
            dob,
            class_name: fields[4].clone(),
            score,
        })
    }
}

/// Iterator over the student records of a CSV stream.
///
/// The first record is taken as the header and skipped; records with fewer
/// than six fields are skipped as well.
pub struct StudentCsvReader<R: BufRead> {
    parser: CsvParser<R>,
    offset: i64,
    header_seen: bool,
    skipped: u64,
}

impl StudentCsvReader<BufReader<File>> {
    /// Open a CSV file; missing files yield [`SheetError::NotFound`]
    pub fn open<P: AsRef<Path>>(path: P, offset: i64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SheetError::NotFound(path.to_path_buf()),
            _ => SheetError::Io(e),
        })?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file), offset))
    }
}

impl<R: BufRead> StudentCsvReader<R> {
    pub fn new(reader: R, offset: i64) -> Self {
        StudentCsvReader {
            parser: CsvParser::new(reader),
            offset,
            header_seen: false,
            skipped: 0,
        }
    }

    /// Records dropped for having too few fields
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<R: BufRead> Iterator for StudentCsvReader<R> {
    type Item = Result<StudentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let fields = match self.parser.read_record() {
                Ok(Some(fields)) => fields,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            if !self.header_seen {
                self.header_seen = true;
                continue;
            }
            match StudentRecord::from_fields(&fields, self.offset) {
                Some(record) => return Some(Ok(record)),
                None => {
                    self.skipped += 1;
                    log::debug!(
                        "Skipping CSV record {} with {} fields",
                        self.parser.records_read(),
                        fields.len()
                    );
                }
            }
        }
    }
}

/// Read every student from the CSV at `path`, adding `offset` to each score
pub fn read_students<P: AsRef<Path>>(path: P, offset: i64) -> Result<Vec<StudentRecord>> {
    let reader = StudentCsvReader::open(path.as_ref(), offset)?;
    let records = reader.collect::<Result<Vec<_>>>()?;
    log::info!(
        "Read {} student records from {}",
        records.len(),
        path.as_ref().display()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    #[test]
    fn test_reads_and_offsets() {
        let csv = "studentId,firstName,lastName,dob,className,score\n\
                   1,Ann,Lee,2001-02-03,Class1,70\n\
                   2,\"Bo, Jr\",Kim,not-a-date,Class2,\n\
                   3,short,row\n\
                   4,Cy,Ng,,Class3,7x\n";
        let mut reader = StudentCsvReader::new(Cursor::new(csv), 5);
        let records: Vec<_> = reader.by_ref().collect::<Result<_>>().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            StudentRecord {
                first_name: "Ann".into(),
                last_name: "Lee".into(),
                dob: NaiveDate::from_ymd_opt(2001, 2, 3),
                class_name: "Class1".into(),
                score: Some(75),
            }
        );
        assert_eq!(records[1].first_name, "Bo, Jr");
        assert_eq!(records[1].dob, None);
        assert_eq!(records[1].score, None);
        assert_eq!(records[2].dob, None);
        assert_eq!(records[2].score, None);
        assert_eq!(reader.skipped(), 1);
    }

    #[test]
    fn test_header_only() {
        let mut reader = StudentCsvReader::new(Cursor::new("a,b,c,d,e,f\n"), 0);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = read_students("/nonexistent/students.csv", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
