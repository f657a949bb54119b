use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::domain::{DirectoryError, Message};

/// One personnel entry. Fields are an open set; rendering only picks
/// out the ones it recognizes, everything else still participates in
/// free-text matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: serde_json::Map<String, Value>,
}

impl Record {
    /// Stringified value of a field, `None` when absent or null.
    pub fn field(&self, name: &str) -> Option<String> {
        match self.fields.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }

    /// Stringified values of all fields, in source order.
    pub fn values(&self) -> impl Iterator<Item = String> + '_ {
        self.fields.values().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        Record { fields }
    }
}

/// Where the dataset comes from. Anything that does not look like an
/// http(s) URL is treated as a local path.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    Http(String),
    File(PathBuf),
}

impl DatasetSource {
    pub fn detect(raw: &str) -> DatasetSource {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DatasetSource::Http(raw.to_string())
        } else {
            let expanded = shellexpand::full(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            DatasetSource::File(PathBuf::from(expanded))
        }
    }

    pub fn fetch(&self) -> Result<Vec<Record>, DirectoryError> {
        match self {
            DatasetSource::Http(url) => {
                let response = reqwest::blocking::get(url)?.error_for_status()?;
                Ok(response.json::<Vec<Record>>()?)
            }
            DatasetSource::File(path) => {
                let raw = fs::read_to_string(path)?;
                Ok(serde_json::from_str::<Vec<Record>>(&raw)?)
            }
        }
    }
}

/// Fetch the dataset off the event loop. The result comes back as a
/// Message; on failure the dataset simply stays empty.
pub fn spawn_fetch(source: DatasetSource, events: Sender<Message>) {
    thread::spawn(move || {
        let start_time = Instant::now();
        match source.fetch() {
            Ok(records) => {
                info!(
                    "Loaded {} records in {}ms from {:?}",
                    records.len(),
                    start_time.elapsed().as_millis(),
                    source
                );
                let _ = events.send(Message::DataLoaded(records));
            }
            Err(e) => {
                error!("Error fetching data from {:?}: {}", source, e);
                let _ = events.send(Message::LoadFailed(e.to_string()));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_prefers_urls() {
        assert!(matches!(
            DatasetSource::detect("https://example.org/faculty.json"),
            DatasetSource::Http(_)
        ));
        assert!(matches!(
            DatasetSource::detect("http://localhost:8000/faculty.json"),
            DatasetSource::Http(_)
        ));
        assert!(matches!(
            DatasetSource::detect("data/faculty.json"),
            DatasetSource::File(_)
        ));
    }

    #[test]
    fn fixture_parses_in_source_order() {
        let source = DatasetSource::detect("tests/fixtures/faculty.json");
        let records = source.fetch().expect("fixture should parse");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].field("Faculty Name").as_deref(), Some("Jane Doe"));
        assert_eq!(records[1].field("Faculty Name").as_deref(), Some("John Roe"));
        assert_eq!(records[2].field("Faculty Name"), None);
    }

    #[test]
    fn field_stringifies_non_string_values() {
        let raw = r#"[{"Faculty Name": "Ada", "Room No": 42, "On Leave": true}]"#;
        let records: Vec<Record> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].field("Room No").as_deref(), Some("42"));
        assert_eq!(records[0].field("On Leave").as_deref(), Some("true"));
        assert_eq!(records[0].field("Email"), None);
    }

    #[test]
    fn null_fields_count_as_absent() {
        let raw = r#"[{"Faculty Name": null, "Department": "CS"}]"#;
        let records: Vec<Record> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].field("Faculty Name"), None);
        let values: Vec<String> = records[0].values().collect();
        assert!(values.contains(&"CS".to_string()));
    }
}
