//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use conversation_scanner::{PathDecoder, ScanConfig, Scanner};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for creating test .claude directory structures
pub struct ClaudeDirBuilder {
    temp_dir: TempDir,
}

impl ClaudeDirBuilder {
    /// Create a new builder with an empty .claude directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    /// Get the path to the .claude directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add log files under `projects/<encoded_name>/`; may be called repeatedly per project
    pub fn with_project(self, encoded_name: &str, log_files: &[LogFileBuilder]) -> Self {
        let project_dir = self.temp_dir.path().join("projects").join(encoded_name);
        fs::create_dir_all(&project_dir).expect("Failed to create project dir");

        for log_file in log_files {
            log_file.create_in(&project_dir);
        }

        self
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for ClaudeDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `<id>.jsonl` conversation log
pub struct LogFileBuilder {
    id: String,
    lines: Vec<String>,
}

impl LogFileBuilder {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string(), lines: Vec::new() }
    }

    pub fn with_record(mut self, record: RecordBuilder) -> Self {
        self.lines.push(record.to_json());
        self
    }

    /// Add a line verbatim (malformed JSON, blank lines, ...)
    pub fn with_raw_line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Write the file into `dir`, replacing any previous contents
    pub fn create_in(&self, dir: &Path) -> PathBuf {
        let file_path = dir.join(format!("{}.jsonl", self.id));
        let mut file = fs::File::create(&file_path).expect("Failed to create log file");
        file.write_all(self.lines.join("\n").as_bytes()).expect("Failed to write log file");
        file_path
    }
}

/// Builder for a single log record
pub struct RecordBuilder {
    record_type: String,
    uuid: Option<String>,
    parent_uuid: Option<String>,
    leaf_uuid: Option<String>,
    text: Option<String>,
    summary: Option<String>,
    custom_title: Option<String>,
    cwd: Option<String>,
    is_sidechain: Option<bool>,
    timestamp: Option<String>,
}

impl RecordBuilder {
    fn of_type(record_type: &str) -> Self {
        Self {
            record_type: record_type.to_string(),
            uuid: None,
            parent_uuid: None,
            leaf_uuid: None,
            text: None,
            summary: None,
            custom_title: None,
            cwd: None,
            is_sidechain: None,
            timestamp: None,
        }
    }

    /// A user message with plain string content
    pub fn user(text: &str) -> Self {
        let mut record = Self::of_type("user");
        record.text = Some(text.to_string());
        record
    }

    pub fn assistant(text: &str) -> Self {
        let mut record = Self::of_type("assistant");
        record.text = Some(text.to_string());
        record
    }

    /// A summary record pointing at the leaf of the conversation it continues
    pub fn summary(summary: &str, leaf_uuid: &str) -> Self {
        let mut record = Self::of_type("summary");
        record.summary = Some(summary.to_string());
        record.leaf_uuid = Some(leaf_uuid.to_string());
        record
    }

    pub fn custom_title(title: &str) -> Self {
        let mut record = Self::of_type("custom-title");
        record.custom_title = Some(title.to_string());
        record
    }

    pub fn uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    pub fn parent(mut self, parent_uuid: &str) -> Self {
        self.parent_uuid = Some(parent_uuid.to_string());
        self
    }

    pub fn leaf(mut self, leaf_uuid: &str) -> Self {
        self.leaf_uuid = Some(leaf_uuid.to_string());
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.cwd = Some(cwd.to_string());
        self
    }

    pub fn sidechain(mut self, is_sidechain: bool) -> Self {
        self.is_sidechain = Some(is_sidechain);
        self
    }

    /// RFC 3339 timestamp
    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = Some(timestamp.to_string());
        self
    }

    /// Convert to a JSON line
    pub fn to_json(&self) -> String {
        let mut record = json!({ "type": self.record_type });
        let fields = [
            ("uuid", &self.uuid),
            ("parentUuid", &self.parent_uuid),
            ("leafUuid", &self.leaf_uuid),
            ("summary", &self.summary),
            ("customTitle", &self.custom_title),
            ("cwd", &self.cwd),
            ("timestamp", &self.timestamp),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                record[key] = Value::String(value.clone());
            }
        }
        if let Some(text) = &self.text {
            record["message"] = json!({ "role": self.record_type, "content": text });
        }
        if let Some(is_sidechain) = self.is_sidechain {
            record["isSidechain"] = Value::Bool(is_sidechain);
        }
        record.to_string()
    }
}

/// Cache directory and scan config for a test Claude directory
pub struct TestCache {
    pub cache_dir: TempDir,
    pub config: ScanConfig,
}

impl TestCache {
    pub fn new(claude_dir: &Path) -> Self {
        let cache_dir = TempDir::new().expect("Failed to create cache dir");
        let config = ScanConfig::new(claude_dir, cache_dir.path().join("conversation-cache.json"));
        Self { cache_dir, config }
    }

    /// Scanner with a fresh path decoder and overrides from the names file
    pub fn scanner(&self) -> Scanner {
        Scanner::from_config(self.config.clone())
    }

    /// Scanner sharing `decoder` with other scanners
    pub fn scanner_with_decoder(&self, decoder: Arc<PathDecoder>) -> Scanner {
        let names = Arc::new(conversation_scanner::NameOverrides::load(&self.config.names_file));
        Scanner::new(self.config.clone(), decoder, names)
    }

    pub fn cache_file(&self) -> &Path {
        &self.config.cache_file
    }
}

/// Helper to create a realistic .claude directory: a root, a continuation by record
/// reference, a continuation by leaf id and an unrelated conversation
pub fn realistic_claude_dir() -> TempDir {
    ClaudeDirBuilder::new()
        .with_project(
            "-Users-test-webapp",
            &[
                LogFileBuilder::new("root")
                    .with_record(
                        RecordBuilder::user("Set up the login page")
                            .uuid("r1")
                            .cwd("/Users/test/webapp"),
                    )
                    .with_record(RecordBuilder::assistant("Done").uuid("r2").parent("r1")),
                LogFileBuilder::new("child")
                    .with_record(RecordBuilder::user("Now add logout").uuid("c1").parent("r2"))
                    .with_record(RecordBuilder::assistant("Added").uuid("c2").parent("c1").leaf("leaf-child")),
                LogFileBuilder::new("grandchild")
                    .with_record(RecordBuilder::summary("Login and logout", "leaf-child"))
                    .with_record(RecordBuilder::user("Add remember me").uuid("g1")),
            ],
        )
        .with_project(
            "-Users-test-cli",
            &[LogFileBuilder::new("other")
                .with_record(RecordBuilder::user("Parse arguments").uuid("o1"))],
        )
        .build()
}
