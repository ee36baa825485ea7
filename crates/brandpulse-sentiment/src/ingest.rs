//! Readers and writers for posts and labeled corpora.
//!
//! Posts are JSON Lines. Corpora are JSON Lines or headerless CSV rows of
//! `id,brand,sentiment,text`. Readers are lenient: a record that does not
//! decode is counted and skipped, never fatal. Only failing to open or read
//! the file is an error.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use brandpulse_core::{Post, Sentiment};
use serde::{Deserialize, Serialize};

use crate::error::SentimentError;
use crate::types::LabeledText;

/// Records read from a source plus the number of records dropped.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: 0,
        }
    }
}

/// On-disk layout of a labeled corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    Jsonl,
    Csv,
}

impl CorpusFormat {
    /// `.csv` files are CSV; everything else is read as JSON Lines.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => CorpusFormat::Csv,
            _ => CorpusFormat::Jsonl,
        }
    }
}

impl std::fmt::Display for CorpusFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorpusFormat::Jsonl => write!(f, "jsonl"),
            CorpusFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for CorpusFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "json" => Ok(CorpusFormat::Jsonl),
            "csv" => Ok(CorpusFormat::Csv),
            other => Err(format!("unknown corpus format '{other}'; expected jsonl or csv")),
        }
    }
}

/// Corpus line shape. `sentiment` is free text so dataset labels such as
/// `Irrelevant` can be folded by [`Sentiment::from_str`](std::str::FromStr).
#[derive(Deserialize)]
struct RawLabeledText {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    brand: Option<String>,
    text: String,
    sentiment: String,
}

/// Call `f` with the 1-based number and raw bytes of every non-blank line.
/// Bytes are not UTF-8 checked here; decoding is the caller's per-record job.
fn for_each_line<R, F>(reader: R, mut f: F) -> Result<(), std::io::Error>
where
    R: BufRead,
    F: FnMut(usize, &[u8]),
{
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        f(idx + 1, &line);
    }
    Ok(())
}

/// Read posts from a JSON Lines file.
///
/// # Errors
///
/// Returns [`SentimentError::Io`] if the file cannot be opened or read.
pub fn read_posts(path: &Path) -> Result<Ingested<Post>, SentimentError> {
    let file = File::open(path).map_err(|e| SentimentError::io(path, e))?;
    parse_posts(BufReader::new(file)).map_err(|e| SentimentError::io(path, e))
}

/// Parse posts from a JSON Lines reader.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn parse_posts<R: BufRead>(reader: R) -> Result<Ingested<Post>, std::io::Error> {
    let mut out = Ingested::default();
    for_each_line(reader, |line_no, line| {
        match serde_json::from_slice::<Post>(line) {
            Ok(post) => out.records.push(post),
            Err(e) => {
                tracing::debug!(line = line_no, error = %e, "skipping unparseable post");
                out.malformed += 1;
            }
        }
    })?;
    if out.malformed > 0 {
        tracing::warn!(
            malformed = out.malformed,
            parsed = out.records.len(),
            "some post records could not be parsed"
        );
    }
    Ok(out)
}

/// Read a labeled corpus, picking the format from the file extension.
///
/// # Errors
///
/// Returns [`SentimentError::Io`] if the file cannot be opened or read.
pub fn read_corpus(path: &Path) -> Result<Ingested<LabeledText>, SentimentError> {
    read_corpus_as(path, CorpusFormat::from_path(path))
}

/// Read a labeled corpus in the given format.
///
/// # Errors
///
/// Returns [`SentimentError::Io`] if the file cannot be opened or read.
pub fn read_corpus_as(
    path: &Path,
    format: CorpusFormat,
) -> Result<Ingested<LabeledText>, SentimentError> {
    let file = File::open(path).map_err(|e| SentimentError::io(path, e))?;
    let reader = BufReader::new(file);
    let ingested = match format {
        CorpusFormat::Jsonl => parse_corpus(reader),
        CorpusFormat::Csv => parse_corpus_csv(reader),
    };
    ingested.map_err(|e| SentimentError::io(path, e))
}

/// Read a headerless `id,brand,sentiment,text` CSV corpus.
///
/// # Errors
///
/// Returns [`SentimentError::Io`] if the file cannot be opened or read.
pub fn read_corpus_csv(path: &Path) -> Result<Ingested<LabeledText>, SentimentError> {
    read_corpus_as(path, CorpusFormat::Csv)
}

/// Turn one corpus record into a [`LabeledText`], or `None` when the label
/// is unknown or the text is blank.
fn labeled_text(
    record_no: usize,
    id: Option<String>,
    brand: Option<String>,
    text: String,
    label: &str,
    fallback_id: impl FnOnce() -> String,
) -> Option<LabeledText> {
    let sentiment = match label.parse::<Sentiment>() {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(record = record_no, error = %e, "skipping corpus record");
            return None;
        }
    };
    if text.trim().is_empty() {
        tracing::debug!(record = record_no, "skipping corpus record without text");
        return None;
    }
    let id = id.filter(|s| !s.trim().is_empty()).unwrap_or_else(fallback_id);
    let brand = brand.filter(|b| !b.trim().is_empty());
    Some(LabeledText {
        id,
        brand,
        text,
        sentiment,
    })
}

/// Parse a labeled corpus from a JSON Lines reader.
///
/// Lines without an `id` get `line-<n>` so holdout splits stay stable.
/// Unknown sentiment labels and empty texts count as malformed.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn parse_corpus<R: BufRead>(reader: R) -> Result<Ingested<LabeledText>, std::io::Error> {
    let mut out = Ingested::default();
    for_each_line(reader, |line_no, line| {
        let raw = match serde_json::from_slice::<RawLabeledText>(line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(line = line_no, error = %e, "skipping unparseable corpus line");
                out.malformed += 1;
                return;
            }
        };
        let id = match raw.id {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        match labeled_text(line_no, id, raw.brand, raw.text, &raw.sentiment, || {
            format!("line-{line_no}")
        }) {
            Some(labeled) => out.records.push(labeled),
            None => out.malformed += 1,
        }
    })?;
    if out.malformed > 0 {
        tracing::warn!(
            malformed = out.malformed,
            parsed = out.records.len(),
            "some corpus lines were skipped"
        );
    }
    Ok(out)
}

/// Parse a headerless CSV corpus with columns `id,brand,sentiment,text`.
///
/// Rows with fewer than four fields, invalid UTF-8, unknown labels or blank
/// text count as malformed. Rows without an id get `row-<n>`.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn parse_corpus_csv<R: Read>(reader: R) -> Result<Ingested<LabeledText>, std::io::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut out = Ingested::default();
    for (idx, result) in csv_reader.records().enumerate() {
        let row_no = idx + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::debug!(row = row_no, error = %e, "skipping undecodable corpus row");
                out.malformed += 1;
                continue;
            }
        };
        let (Some(id), Some(brand), Some(label), Some(text)) =
            (record.get(0), record.get(1), record.get(2), record.get(3))
        else {
            tracing::debug!(row = row_no, fields = record.len(), "skipping short corpus row");
            out.malformed += 1;
            continue;
        };
        match labeled_text(
            row_no,
            Some(id.trim().to_string()),
            Some(brand.trim().to_string()),
            text.to_string(),
            label,
            || format!("row-{row_no}"),
        ) {
            Some(labeled) => out.records.push(labeled),
            None => out.malformed += 1,
        }
    }
    if out.malformed > 0 {
        tracing::warn!(
            malformed = out.malformed,
            parsed = out.records.len(),
            "some corpus rows were skipped"
        );
    }
    Ok(out)
}

/// Write each record as one JSON object per line.
///
/// # Errors
///
/// Returns [`SentimentError::Json`] on serialization failure (which also
/// wraps write failures).
pub fn write_jsonl<W, T>(mut writer: W, records: &[T]) -> Result<(), SentimentError>
where
    W: Write,
    T: Serialize,
{
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer
            .write_all(b"\n")
            .map_err(serde_json::Error::io)?;
    }
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_posts_skips_bad_lines() {
        let input = concat!(
            r#"{"id":"1","brand":"Apple","text":"love it","timestamp":"2024-01-01T00:00:00Z","author_id":"a"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"id":"2","brand":"Apple","timestamp":"2024-01-01T00:00:00Z","author_id":"a"}"#,
            "\n",
            r#"{"id":"3","brand":"Apple","text":"meh","timestamp":"2024-01-02T00:00:00Z","author_id":"b","engagement":{"likes":4}}"#,
            "\n",
        );
        let out = parse_posts(input.as_bytes()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.malformed, 2);
        assert_eq!(out.records[1].engagement.likes, 4);
        assert_eq!(out.records[1].engagement.retweets, 0);
    }

    #[test]
    fn invalid_utf8_line_is_counted_not_fatal() {
        let mut input = Vec::new();
        input.extend_from_slice(
            br#"{"id":"1","brand":"Apple","text":"love it","timestamp":"2024-01-01T00:00:00Z","author_id":"a"}"#,
        );
        input.extend_from_slice(b"\n\xff\xfe garbage\n");
        input.extend_from_slice(
            br#"{"id":"2","brand":"Apple","text":"broken again","timestamp":"2024-01-01T01:00:00Z","author_id":"b"}"#,
        );
        input.push(b'\n');

        let out = parse_posts(input.as_slice()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.malformed, 1);
        assert_eq!(out.records[1].id, "2");
    }

    #[test]
    fn invalid_utf8_corpus_line_is_counted() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"id":"a","text":"good","sentiment":"Positive"}"#);
        input.extend_from_slice(b"\r\n{\"id\":\"b\",\"text\":\"\xc3\x28\",\"sentiment\":\"Negative\"}\n");
        input.extend_from_slice(br#"{"id":"c","text":"bad","sentiment":"Negative"}"#);

        let out = parse_corpus(input.as_slice()).unwrap();
        let ids: Vec<&str> = out.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
        assert_eq!(out.malformed, 1);
    }

    #[test]
    fn parse_corpus_csv_reads_dataset_rows() {
        let input = concat!(
            "2401,Borderlands,Positive,\"im getting on borderlands and i will murder you all,\"\n",
            "2402,Borderlands,Irrelevant,random chatter\n",
            "2403,Verizon,Mixed,eh\n",
            "2404,Verizon,Negative,\n",
            "2405,Verizon\n",
            ",Nvidia,Negative,drivers crashed again\n",
        );
        let out = parse_corpus_csv(input.as_bytes()).unwrap();
        assert_eq!(out.malformed, 3);
        assert_eq!(out.records.len(), 3);

        assert_eq!(out.records[0].id, "2401");
        assert_eq!(out.records[0].brand.as_deref(), Some("Borderlands"));
        assert_eq!(out.records[0].sentiment, Sentiment::Positive);
        assert!(out.records[0].text.ends_with("you all,"));

        assert_eq!(out.records[1].sentiment, Sentiment::Neutral);

        assert_eq!(out.records[2].id, "row-6");
        assert_eq!(out.records[2].brand.as_deref(), Some("Nvidia"));
    }

    #[test]
    fn parse_corpus_csv_skips_undecodable_rows() {
        let mut input = Vec::new();
        input.extend_from_slice(b"1,Apple,Positive,love it\n");
        input.extend_from_slice(b"2,Apple,Negative,\xff\xfe\n");
        input.extend_from_slice(b"3,Apple,Negative,hate it\n");

        let out = parse_corpus_csv(input.as_slice()).unwrap();
        let ids: Vec<&str> = out.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(out.malformed, 1);
    }

    #[test]
    fn corpus_format_follows_extension() {
        assert_eq!(
            CorpusFormat::from_path(Path::new("data/twitter_training.CSV")),
            CorpusFormat::Csv
        );
        assert_eq!(
            CorpusFormat::from_path(Path::new("data/train.jsonl")),
            CorpusFormat::Jsonl
        );
        assert_eq!(CorpusFormat::from_path(Path::new("corpus")), CorpusFormat::Jsonl);
        assert_eq!("CSV".parse::<CorpusFormat>(), Ok(CorpusFormat::Csv));
        assert!("xml".parse::<CorpusFormat>().is_err());
    }

    #[test]
    fn read_corpus_picks_csv_by_extension() {
        let dir = std::env::temp_dir().join(format!("brandpulse-corpus-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("twitter_validation.csv");
        std::fs::write(&path, "3364,Facebook,Irrelevant,\"I mentioned on Facebook, as usual\"\n")
            .unwrap();

        let out = read_corpus(&path).unwrap();
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].text, "I mentioned on Facebook, as usual");

        let as_jsonl = read_corpus_as(&path, CorpusFormat::Jsonl).unwrap();
        assert!(as_jsonl.records.is_empty());
        assert_eq!(as_jsonl.malformed, 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn parse_corpus_folds_labels_and_fills_ids() {
        let input = concat!(
            r#"{"id":2401,"brand":"Borderlands","text":"im getting on borderlands","sentiment":"Positive"}"#,
            "\n",
            r#"{"text":"random chatter","sentiment":"Irrelevant"}"#,
            "\n",
            r#"{"id":"x","text":"eh","sentiment":"Mixed"}"#,
            "\n",
            r#"{"id":"y","text":"   ","sentiment":"Negative"}"#,
            "\n",
        );
        let out = parse_corpus(input.as_bytes()).unwrap();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.malformed, 2);
        assert_eq!(out.records[0].id, "2401");
        assert_eq!(out.records[0].sentiment, Sentiment::Positive);
        assert_eq!(out.records[1].id, "line-2");
        assert_eq!(out.records[1].sentiment, Sentiment::Neutral);
    }

    #[test]
    fn write_jsonl_emits_one_record_per_line() {
        let records = vec![
            LabeledText {
                id: "1".to_string(),
                brand: None,
                text: "a".to_string(),
                sentiment: Sentiment::Positive,
            },
            LabeledText {
                id: "2".to_string(),
                brand: Some("Google".to_string()),
                text: "b".to_string(),
                sentiment: Sentiment::Negative,
            },
        ];
        let mut buf = Vec::new();
        write_jsonl(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: LabeledText = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, records[1]);
    }

    #[test]
    fn read_posts_missing_file_is_io_error() {
        let err = read_posts(Path::new("/no/such/posts.jsonl")).unwrap_err();
        assert!(matches!(err, SentimentError::Io { .. }));
    }
}
