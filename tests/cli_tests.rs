use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn invoke(event: &str) -> Output {
    let exe = env!("CARGO_BIN_EXE_review-gate");
    let mut child = Command::new(exe)
        .arg("invoke")
        .env("REVIEW_TABLE_NAME", "Reviews")
        .env("TOKEN_VALIDATION_ENDPOINT", "http://127.0.0.1:9/validate")
        .env("LOG_LEVEL", "debug")
        .env("LOG_FORMAT", "json")
        .env_remove("RUST_LOG")
        .env_remove("REVIEW_DATA_DIR")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("run cli");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(event.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_invoke_stdout_is_one_json_document() {
    let out = invoke(
        r#"{"httpMethod":"OPTIONS","headers":{"Origin":"https://app.testdevops.com"},"body":null}"#,
    );
    assert!(out.status.success());

    // Debug logging is on, so anything but the result on stdout breaks this parse.
    let result: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["statusCode"], 200);
    assert_eq!(
        result["headers"]["Access-Control-Allow-Origin"],
        "https://app.testdevops.com"
    );
    let body: Value = serde_json::from_str(result["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["message"], "CORS preflight check successful");

    let logs = String::from_utf8_lossy(&out.stderr);
    assert!(logs.contains("Handled CORS preflight request"), "{logs}");
}

#[test]
fn test_invoke_lowercase_method_is_not_preflight() {
    let out = invoke(
        r#"{"httpMethod":"options","headers":{"Origin":"https://app.testdevops.com"},"body":null}"#,
    );
    assert!(out.status.success());

    let result: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["statusCode"], 401);
    let body: Value = serde_json::from_str(result["body"].as_str().unwrap()).unwrap();
    assert_eq!(body["message"], "Authorization header is missing.");
}
