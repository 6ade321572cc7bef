//! OCR engine invocation.
//!
//! The OCR engine is an external black box driven as a subprocess:
//! `program script <request_id> <bucket> <archive_key>`. Its stdout
//! interleaves diagnostic log lines with exactly one JSON payload line,
//! so the invoker captures output incrementally and scans from the end
//! for the last line that parses as a JSON object. The payload either
//! carries an `error` flag or a per-filename result map under one of
//! several legacy container keys.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::intake::error::IntakeError;
use crate::intake::types::OcrResultMap;

/// Legacy container keys the engine has shipped results under.
const RESULT_CONTAINER_KEYS: &[&str] = &["results", "file_ocr_map", "rawResponse"];

/// Cap on captured stderr carried inside process errors.
const STDERR_CAP: usize = 2000;

/// Drives the external OCR engine subprocess.
pub struct OcrInvoker {
    program: String,
    script: PathBuf,
    bucket: String,
}

impl OcrInvoker {
    pub fn new(program: impl Into<String>, script: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            bucket: bucket.into(),
        }
    }

    /// Run the engine against an archive and parse its result map.
    ///
    /// Fails fast with [`IntakeError::ScriptMissing`] when the engine is
    /// not deployed; that is a deployment defect, not a transient
    /// condition. Everything after a successful spawn classifies as
    /// retryable.
    pub async fn invoke(
        &self,
        request_id: &str,
        archive_key: &str,
    ) -> Result<OcrResultMap, IntakeError> {
        self.check_deployed()?;

        tracing::info!(
            request_id,
            archive_key,
            bucket = %self.bucket,
            "invoking OCR engine"
        );

        let mut child = Command::new(&self.program)
            .arg(&self.script)
            .arg(request_id)
            .arg(&self.bucket)
            .arg(archive_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    IntakeError::ScriptMissing(format!("{} not found in PATH", self.program))
                }
                _ => IntakeError::Io(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("OCR process stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("OCR process stderr was not captured"))?;

        // Drain both streams while the process runs; buffering the whole
        // output before inspection would not survive large OCR payloads.
        let (status, stdout_lines, stderr_lines) = tokio::join!(
            child.wait(),
            collect_lines(stdout, "stdout"),
            collect_lines(stderr, "stderr"),
        );
        let status = status?;

        if !status.success() {
            return Err(IntakeError::OcrProcess {
                code: status.code(),
                stderr: tail_text(&stderr_lines, STDERR_CAP),
            });
        }

        let payload = parse_trailing_json(&stdout_lines)?;
        normalize_result_map(&payload)
    }

    /// Verify the engine's program and script are both present.
    fn check_deployed(&self) -> Result<(), IntakeError> {
        if which::which(&self.program).is_err() {
            return Err(IntakeError::ScriptMissing(format!(
                "{} not found in PATH",
                self.program
            )));
        }
        if !self.script.exists() {
            return Err(IntakeError::ScriptMissing(format!(
                "OCR script not found at {}",
                self.script.display()
            )));
        }
        Ok(())
    }
}

/// Read a stream to completion, one line at a time.
async fn collect_lines<R: AsyncRead + Unpin>(reader: R, stream: &str) -> Vec<String> {
    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(stream, "{line}");
                collected.push(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(stream, "error reading OCR process output: {e}");
                break;
            }
        }
    }
    collected
}

/// Find the engine's JSON payload in its combined log output.
///
/// Scans from the last line backward for the first line that is
/// syntactically an object (`{`…`}`) and parses. Backward scanning
/// tolerates trailing log lines after the payload and brace-looking
/// noise earlier in the stream.
fn parse_trailing_json(stdout_lines: &[String]) -> Result<serde_json::Value, IntakeError> {
    for line in stdout_lines.iter().rev() {
        let trimmed = line.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) if value.is_object() => return Ok(value),
            _ => continue,
        }
    }
    Err(IntakeError::OutputParse(
        "no JSON object found in OCR process output".to_string(),
    ))
}

/// Interpret the payload: surface engine-reported errors, unwrap legacy
/// result containers, and reject empty maps.
fn normalize_result_map(payload: &serde_json::Value) -> Result<OcrResultMap, IntakeError> {
    if payload.get("error").map(truthy).unwrap_or(false) {
        let message = payload
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown OCR engine error");
        return Err(IntakeError::EngineReported(message.to_string()));
    }

    // The engine sometimes reports failure as a 200-shaped envelope.
    if let Some(status) = payload.get("status_code").and_then(|s| s.as_str()) {
        if status != "200" {
            let message = payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown OCR engine error");
            return Err(IntakeError::EngineReported(format!(
                "status {status}: {message}"
            )));
        }
    }

    let container = RESULT_CONTAINER_KEYS
        .iter()
        .find_map(|key| payload.get(*key).filter(|v| v.is_object()))
        .unwrap_or(payload);

    let mut map: OcrResultMap = BTreeMap::new();
    if let Some(object) = container.as_object() {
        for (name, text) in object {
            match text {
                serde_json::Value::String(s) => {
                    map.insert(name.clone(), Some(s.clone()));
                }
                serde_json::Value::Null => {
                    map.insert(name.clone(), None);
                }
                other => {
                    tracing::debug!(file = %name, "ignoring non-text OCR value: {other}");
                }
            }
        }
    }

    if map.is_empty() {
        return Err(IntakeError::OutputParse(
            "OCR engine returned an empty result set".to_string(),
        ));
    }
    Ok(map)
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty() && s != "false",
        serde_json::Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}

/// Last `cap` characters of the joined lines, newest preserved.
fn tail_text(lines: &[String], cap: usize) -> String {
    let joined = lines.join("\n");
    if joined.len() <= cap {
        return joined;
    }
    let start = joined.len() - cap;
    // Avoid splitting a UTF-8 sequence.
    let boundary = (start..joined.len())
        .find(|i| joined.is_char_boundary(*i))
        .unwrap_or(start);
    joined[boundary..].to_string()
}
