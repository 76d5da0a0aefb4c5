//! Local Python execution tool.
//!
//! Writes the model-generated code to a temporary `.py` file and runs it
//! with the configured interpreter, capturing stdout and stderr. The
//! observation is a structured JSON outcome; execution problems (non-zero
//! exit, timeout, missing interpreter) are reported inside it.

use crate::agent::tool::Tool;
use crate::config::ExecutorConfig;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write as _;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// A tool that executes Python code with the configured interpreter.
pub struct ExecutePythonTool {
    config: ExecutorConfig,
}

impl ExecutePythonTool {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    async fn execute(&self, code: &str) -> ExecutionOutcome {
        let mut script = match tempfile::Builder::new().suffix(".py").tempfile() {
            Ok(file) => file,
            Err(err) => {
                return ExecutionOutcome::failure(
                    String::new(),
                    "TempFileError",
                    &err.to_string(),
                );
            }
        };
        if let Err(err) = script.write_all(code.as_bytes()).and_then(|_| script.flush()) {
            return ExecutionOutcome::failure(String::new(), "TempFileError", &err.to_string());
        }

        let interpreter = self.config.python_bin();
        info!(%interpreter, "executing generated code");

        let mut command = Command::new(&interpreter);
        command.arg(script.path()).kill_on_drop(true);

        let output = match tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            command.output(),
        )
        .await
        {
            Err(_) => {
                return ExecutionOutcome::failure(
                    String::new(),
                    "Timeout",
                    &format!("execution exceeded {} seconds", self.config.timeout_secs),
                );
            }
            Ok(Err(err)) => {
                return ExecutionOutcome::failure(
                    String::new(),
                    "ExecutionError",
                    &format!("failed to run '{interpreter}': {err}"),
                );
            }
            Ok(Ok(output)) => output,
        };

        let mut combined = String::new();
        if !output.stdout.is_empty() {
            combined.push_str("STDOUT:\n");
            combined.push_str(&String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            combined.push_str("STDERR:\n");
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return ExecutionOutcome::failure(
                combined,
                "PythonExecutionError",
                &format!("Return code {code}"),
            );
        }

        if combined.is_empty() {
            combined = "Code executed successfully but produced no output.".to_string();
        }
        ExecutionOutcome::success(combined)
    }
}

#[async_trait]
impl Tool for ExecutePythonTool {
    fn name(&self) -> &str {
        "execute_python"
    }

    fn description(&self) -> &str {
        "Execute Python code locally and return its stdout/stderr. Use this to analyze data and generate charts."
    }

    fn usage(&self) -> &str {
        r#"Pass the Python source directly, or JSON: {"code": "print('hello')"}."#
    }

    async fn call(&self, args: &str) -> Result<String> {
        let code = parse_args(args);
        let outcome = self.execute(&code).await;
        Ok(serde_json::to_string_pretty(&outcome)?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum ExecutionStatus {
    Success,
    Error,
}

#[derive(Debug, Serialize)]
struct ExecutionOutcome {
    status: ExecutionStatus,
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_value: Option<String>,
}

impl ExecutionOutcome {
    fn success(output: String) -> Self {
        Self {
            status: ExecutionStatus::Success,
            output,
            error_name: None,
            error_value: None,
        }
    }

    fn failure(output: String, name: &str, value: &str) -> Self {
        Self {
            status: ExecutionStatus::Error,
            output,
            error_name: Some(name.to_string()),
            error_value: Some(value.to_string()),
        }
    }
}

fn parse_args(args: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(args) {
        if let Some(code) = value.get("code").and_then(|v| v.as_str()) {
            return code.to_string();
        }
    }
    args.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // `sh` stands in for a Python interpreter: the tool only needs something
    // that runs a script file and exits.
    fn shell_tool(timeout_secs: u64) -> ExecutePythonTool {
        ExecutePythonTool::new(ExecutorConfig {
            python_bin: Some("sh".to_string()),
            timeout_secs,
        })
    }

    #[test]
    fn parses_raw_code_and_json_args() {
        assert_eq!(parse_args("print('x')"), "print('x')");
        assert_eq!(parse_args(r#"{"code": "print('y')"}"#), "print('y')");
    }

    #[tokio::test]
    async fn successful_run_reports_stdout() {
        let observation = shell_tool(10).call("echo hello").await.expect("call");
        let value: serde_json::Value = serde_json::from_str(&observation).expect("json");
        assert_eq!(value["status"], "success");
        assert!(value["output"].as_str().expect("output").contains("hello"));
        assert!(value.get("error_name").is_none());
    }

    #[tokio::test]
    async fn nonzero_exit_reports_the_return_code() {
        let observation = shell_tool(10).call("exit 3").await.expect("call");
        let value: serde_json::Value = serde_json::from_str(&observation).expect("json");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_name"], "PythonExecutionError");
        assert_eq!(value["error_value"], "Return code 3");
    }

    #[tokio::test]
    async fn stderr_is_captured() {
        let observation = shell_tool(10)
            .call("echo oops 1>&2")
            .await
            .expect("call");
        let value: serde_json::Value = serde_json::from_str(&observation).expect("json");
        assert!(value["output"].as_str().expect("output").contains("STDERR:"));
        assert!(value["output"].as_str().expect("output").contains("oops"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported_not_raised() {
        let tool = ExecutePythonTool::new(ExecutorConfig {
            python_bin: Some("definitely-not-an-interpreter".to_string()),
            timeout_secs: 5,
        });
        let observation = tool.call("print('x')").await.expect("call");
        let value: serde_json::Value = serde_json::from_str(&observation).expect("json");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_name"], "ExecutionError");
    }

    #[tokio::test]
    async fn long_running_code_times_out() {
        let observation = shell_tool(1).call("sleep 5").await.expect("call");
        let value: serde_json::Value = serde_json::from_str(&observation).expect("json");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_name"], "Timeout");
    }
}
