//! File-backed and scripted line sources driving the scanner

#[path = "common/mod.rs"]
mod common;

use std::fs::File;
use std::io::{BufReader, Write};

use cellsh::{LineSource, ReadStatus, ReaderSource, Scanner, TokenKind};
use tempfile::NamedTempFile;

fn file_scanner(contents: &str) -> (NamedTempFile, Scanner<ReaderSource<BufReader<File>>>) {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    let reader = BufReader::new(File::open(file.path()).unwrap());
    let scanner = Scanner::new(file.path().display().to_string(), ReaderSource::new(reader));
    (file, scanner)
}

#[test]
fn test_file_source_reads_lines() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "first\nsecond").unwrap();
    let mut source = ReaderSource::new(BufReader::new(File::open(file.path()).unwrap()));

    let (text, status) = source.read_line('\n');
    assert_eq!(text, "first\n");
    assert!(matches!(status, ReadStatus::Ok));

    let (text, status) = source.read_line('\n');
    assert_eq!(text, "second");
    assert!(matches!(status, ReadStatus::EndOfStream));
}

#[test]
fn test_scan_file_with_continuations() {
    let (_file, mut scanner) = file_scanner("make \\\n  all\r\nrm -f *.o\n");
    let mut texts = Vec::new();
    loop {
        let t = scanner.next_token().unwrap();
        if t.kind == TokenKind::End {
            break;
        }
        texts.push(t.text);
    }
    assert_eq!(texts, ["make", "all", "\n", "rm", "-f", "*.o", "\n", "\n"]);
    assert_eq!(scanner.line_number(), 4);
}

#[test]
fn test_source_name_in_reports() {
    let reports = common::Reports::default();
    let (file, scanner) = file_scanner("x <");
    let mut scanner = scanner.with_error_handler(reports.handler());
    let expected = file.path().display().to_string();
    assert_eq!(scanner.name(), expected);

    scanner.next_token().unwrap();
    assert!(scanner.next_token().is_err());
    assert_eq!(reports.get(0).0, expected);
}
