use fieldhound::handlers::*;
use fieldhound_core::{CapturedRequest, ListConfig};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_expand_path_leaves_plain_paths_alone() {
    assert_eq!(expand_path(Path::new("/tmp/capture.json")), PathBuf::from("/tmp/capture.json"));
    assert_eq!(expand_path(Path::new("relative.json")), PathBuf::from("relative.json"));
}

#[test]
fn test_expand_path_expands_tilde() {
    let expanded = expand_path(Path::new("~/capture.json"));
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with("capture.json"));
}

#[test]
fn test_load_capture_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    write!(
        temp_file,
        r#"{{"origin": "https://api.example.com", "path": "/users", "method": "GET"}}"#
    )?;

    let capture = load_capture_file(temp_file.path())?;
    assert_eq!(capture.url(), "https://api.example.com/users");

    Ok(())
}

#[test]
fn test_load_capture_file_error_names_the_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");

    let err = load_capture_file(&missing).unwrap_err();
    assert!(format!("{:#}", err).contains("missing.json"));
}

#[test]
fn test_parse_target_value() {
    assert_eq!(parse_target_value("42", false).unwrap(), json!("42"));
    assert_eq!(parse_target_value("42", true).unwrap(), json!(42));
    assert_eq!(parse_target_value("true", true).unwrap(), json!(true));
    assert!(parse_target_value("not json", true).is_err());
}

#[test]
fn test_offline_mapping_uses_captured_response() {
    let list = CapturedRequest::new("https://api.example.com", "/users", "GET")
        .with_response_body(r#"{"data":{"list":[{"id":1,"userId":"u1"}]}}"#);
    let detail = CapturedRequest::new("https://api.example.com", "/user", "GET")
        .with_request_body(r#"{"userId":"","id":0}"#);

    let mapping = offline_mapping(&list, &detail, &ListConfig::default()).unwrap();

    assert_eq!(mapping.related_fields(), vec!["userId", "id"]);
    assert_eq!(mapping.best("userId").unwrap().value, json!("u1"));
}

#[test]
fn test_offline_mapping_without_response_body_fails() {
    let list = CapturedRequest::new("https://api.example.com", "/users", "GET");
    let detail = CapturedRequest::new("https://api.example.com", "/user", "GET")
        .with_request_body(r#"{"userId":""}"#);

    assert!(offline_mapping(&list, &detail, &ListConfig::default()).is_err());
}

#[test]
fn test_locate_in_document_first_and_all() {
    let document = json!({"id": 1, "owner": {"id": 2}});

    let first = locate_in_document(&document, "id", false);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].value, json!(1));

    let all = locate_in_document(&document, "id", true);
    let paths: Vec<String> = all.iter().map(|r| r.path.to_string()).collect();
    assert_eq!(paths, vec!["id", "owner.id"]);

    assert!(locate_in_document(&document, "missing", true).is_empty());
}

#[test]
fn test_write_output_to_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("out.txt");

    write_output("report body", Some(&path))?;

    assert_eq!(std::fs::read_to_string(&path)?, "report body");
    Ok(())
}
