//! UmpleSync-based validator
//!
//! Runs `java -jar umplesync.jar -generate nothing <file>` and reads the
//! `{"results": [...]}` object it prints. Compile errors in that object are the
//! normal payload; only failing to run the process at all is an error.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::diagnostic_provider::{DiagnosticProvider, RawDiagnostic, ValidatorError};

#[derive(Debug, Deserialize)]
struct ValidatorOutput {
    #[serde(default)]
    results: Vec<RawDiagnostic>,
}

/// Extract the result records from the validator's console output.
///
/// Output without a results object means the model compiled cleanly.
pub fn parse_validator_output(output: &str) -> Vec<RawDiagnostic> {
    let Some(start) = output.find("{\"results\"") else {
        trace!("No results object in validator output");
        return Vec::new();
    };
    let mut stream = serde_json::Deserializer::from_str(&output[start..]).into_iter::<ValidatorOutput>();
    match stream.next() {
        Some(Ok(parsed)) => parsed.results,
        Some(Err(e)) => {
            warn!("Unreadable validator output: {}", e);
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// Diagnostic provider backed by the UmpleSync jar
#[derive(Debug, Clone)]
pub struct UmpleSyncValidator {
    java: PathBuf,
    jar: PathBuf,
}

impl UmpleSyncValidator {
    pub fn new(java: PathBuf, jar: PathBuf) -> Self {
        Self { java, jar }
    }

    fn command(&self, target: &Path) -> Command {
        let mut command = Command::new(&self.java);
        command
            .arg("-jar")
            .arg(&self.jar)
            .args(["-generate", "nothing"])
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = target.parent() {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait::async_trait]
impl DiagnosticProvider for UmpleSyncValidator {
    async fn validate(
        &self,
        target: &Path,
        token: &CancellationToken,
    ) -> Result<Vec<RawDiagnostic>, ValidatorError> {
        if !self.jar.is_file() {
            return Err(ValidatorError::MissingArtifact(self.jar.clone()));
        }
        debug!("Running UmpleSync on {}", target.display());

        let program = self.java.display().to_string();
        let output = tokio::select! {
            // Dropping the child future kills the process
            _ = token.cancelled() => return Err(ValidatorError::Cancelled),
            output = self.command(target).output() => output.map_err(|source| ValidatorError::Spawn {
                program: program.clone(),
                source,
            })?,
        };

        if output.status.code().is_none() {
            return Err(ValidatorError::Spawn {
                program,
                source: io::Error::other("validator terminated by signal"),
            });
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let results = parse_validator_output(&text);
        debug!(
            "UmpleSync exited with {} and {} result(s)",
            output.status,
            results.len()
        );
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "UmpleSync"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_parse_results_amid_console_noise() {
        let output = indoc! {r#"
            Processing -> Success! Processed A.ump.
            {"results" : [{"errorCode":"22","severity":"3","url":"http://manual.umple.org?E022.html","line":"2","filename":"A.ump","message":"Duplicate attribute"}]}
            trailing text
        "#};
        let results = parse_validator_output(output);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line, 2);
        assert_eq!(results[0].severity, 3);
        assert_eq!(results[0].message, "Duplicate attribute");
    }

    #[test]
    fn test_clean_output_has_no_results() {
        assert!(parse_validator_output("Success! Processed A.ump.").is_empty());
        assert!(parse_validator_output("{\"results\" : [ }").is_empty());
    }

    #[tokio::test]
    async fn test_missing_jar_is_reported() {
        let validator = UmpleSyncValidator::new("java".into(), "/no/such/umplesync.jar".into());
        let err = validator
            .validate(Path::new("/tmp/A.ump"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ValidatorError::MissingArtifact(_)));
    }

    #[tokio::test]
    async fn test_missing_java_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("umplesync.jar");
        std::fs::write(&jar, b"").unwrap();
        let validator = UmpleSyncValidator::new(dir.path().join("no-such-java"), jar);
        let err = validator
            .validate(&dir.path().join("A.ump"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_setup_problem());
    }
}
