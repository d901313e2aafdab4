//! Introspection discovery
//!
//! Runs a short script in an isolated interpreter process that loads the
//! native library's reflective module and enumerates its algorithms. The
//! script reports names only; every name is classified here.

use std::collections::BTreeMap;
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Deserialize;

use super::DiscoveryStrategy;
use crate::classify::classify;
use crate::error::{Result, SigbindError};
use crate::metadata::{AlgorithmMetadata, DiscoverySource, Mode};

/// Enumeration script passed to the interpreter with `-c`
pub const INTROSPECTION_SCRIPT: &str = include_str!("introspect.py");

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    algorithms: Option<Vec<IntrospectedAlgorithm>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntrospectedAlgorithm {
    name: String,
    #[serde(default)]
    mode: Mode,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: BTreeMap<String, String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<IntrospectedAlgorithm> for AlgorithmMetadata {
    fn from(found: IntrospectedAlgorithm) -> Self {
        let category = classify(&found.name);
        let mut entry = AlgorithmMetadata::new(found.name, category, DiscoverySource::Introspection)
            .with_mode(found.mode);
        entry.description = found.description.filter(|d| !d.trim().is_empty());
        entry.parameters = found.parameters;
        entry.error = found.error;
        entry
    }
}

/// Enumerates algorithms through an external interpreter process
#[derive(Debug, Clone)]
pub struct IntrospectionStrategy {
    tool: String,
    script: String,
    timeout: Duration,
}

impl IntrospectionStrategy {
    pub fn new(tool: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            script: INTROSPECTION_SCRIPT.to_string(),
            timeout,
        }
    }

    /// Replace the enumeration script
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }

    /// Run the tool and capture stdout, killing it once the timeout expires
    fn run(&self) -> Result<(bool, String, String)> {
        let mut child = Command::new(&self.tool)
            .arg("-c")
            .arg(&self.script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SigbindError::IntrospectionFailed {
                reason: format!("failed to start {}: {}", self.tool, e),
            })?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SigbindError::IntrospectionTimeout {
                        timeout_secs: self.timeout.as_secs(),
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stdout = stdout.and_then(|h| h.join().ok()).unwrap_or_default();
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        Ok((status.success(), stdout, stderr))
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = String::new();
        let _ = reader.read_to_string(&mut buffer);
        buffer
    })
}

impl DiscoveryStrategy for IntrospectionStrategy {
    fn name(&self) -> &'static str {
        "introspection"
    }

    fn discover(&self) -> Result<Vec<AlgorithmMetadata>> {
        debug!("Running introspection via {}", self.tool);
        let (success, stdout, stderr) = self.run()?;

        if !success {
            // The script reports its own failures as JSON before exiting
            if let Ok(Payload {
                error: Some(reason),
                ..
            }) = serde_json::from_str::<Payload>(stdout.trim())
            {
                return Err(SigbindError::IntrospectionFailed { reason });
            }
            let detail = stderr.lines().last().unwrap_or("no diagnostic output");
            return Err(SigbindError::IntrospectionFailed {
                reason: format!("{} exited unsuccessfully: {}", self.tool, detail.trim()),
            });
        }

        let found = parse_payload(&stdout)?;
        info!("Introspection found {} algorithms", found.len());
        Ok(found)
    }
}

/// Parse the introspection script's output
///
/// A top-level `error` field, or a payload without an `algorithms` list, is
/// a discovery failure.
pub fn parse_payload(raw: &str) -> Result<Vec<AlgorithmMetadata>> {
    let payload: Payload =
        serde_json::from_str(raw.trim()).map_err(|e| SigbindError::MalformedIntrospection {
            reason: e.to_string(),
        })?;

    if let Some(reason) = payload.error {
        return Err(SigbindError::IntrospectionFailed { reason });
    }

    let algorithms = payload
        .algorithms
        .ok_or_else(|| SigbindError::MalformedIntrospection {
            reason: "missing 'algorithms' list".to_string(),
        })?;

    Ok(algorithms.into_iter().map(AlgorithmMetadata::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::metadata::Category;

    #[test]
    fn test_parse_payload_classifies_names() {
        let raw = r#"{"algorithms": [
            {"name": "PitchYin", "mode": "standard", "description": "Estimates pitch",
             "parameters": {"frameSize": "INT", "sampleRate": "REAL"}},
            {"name": "MonoLoader", "mode": "standard", "parameters": {},
             "error": "filename parameter required"},
            {"name": "VectorInput", "mode": "streaming"}
        ]}"#;

        let found = parse_payload(raw).unwrap();
        assert_eq!(found.len(), 3);

        assert_eq!(found[0].category, Category::Tonal);
        assert_eq!(found[0].description.as_deref(), Some("Estimates pitch"));
        assert_eq!(found[0].parameters["frameSize"], "INT");

        assert_eq!(found[1].category, Category::Io);
        assert!(found[1].error.is_some());

        assert_eq!(found[2].mode, Mode::Streaming);
        assert_eq!(found[2].source, DiscoverySource::Introspection);
    }

    #[test]
    fn test_reported_error_is_discovery_failure() {
        let err = parse_payload(r#"{"error": "native module not available"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Discovery);
        assert_eq!(err.error_code(), "INTROSPECTION_FAILED");
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_payload("Traceback (most recent call last):").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INTROSPECTION");

        let err = parse_payload("{}").unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_INTROSPECTION");
    }

    #[test]
    fn test_missing_tool_fails_gracefully() {
        let strategy =
            IntrospectionStrategy::new("/nonexistent/sigbind-python", Duration::from_secs(1));
        let err = strategy.discover().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Discovery);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_output_is_parsed() {
        let strategy = IntrospectionStrategy::new("sh", Duration::from_secs(5))
            .with_script(r#"echo '{"algorithms": [{"name": "Key"}]}'"#);
        let found = strategy.discover().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, Category::Tonal);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_script_error() {
        let strategy = IntrospectionStrategy::new("sh", Duration::from_secs(5))
            .with_script(r#"echo '{"error": "no module"}'; exit 1"#);
        match strategy.discover().unwrap_err() {
            SigbindError::IntrospectionFailed { reason } => assert_eq!(reason, "no module"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_tool_times_out() {
        let strategy =
            IntrospectionStrategy::new("sh", Duration::from_millis(100)).with_script("sleep 5");
        let err = strategy.discover().unwrap_err();
        assert_eq!(err.error_code(), "INTROSPECTION_TIMEOUT");
    }
}
