//! Test fixtures
//!
//! Configuration wired to the scripted portal's controls, sample sheets and
//! hand-built multipart bodies.

use incident_autofill::Config;

/// Configuration whose form locators match [`super::portal::FORM_CONTROLS`]
pub fn test_config() -> Config {
    let yaml = r##"
processing:
  default_delay_ms: 0
  max_delay_ms: 120000
  log_capacity: 200
  log_window: 50
  max_upload_bytes: 65536

form:
  action_code: "AUTO"
  fields:
    status_code:
      label: "Status Code"
      kind: select
      locators:
        - { by: id, value: "statusCode", timeout_ms: 20 }
        - { by: css, value: "#status", timeout_ms: 20 }
    start_time:
      label: "Start Time"
      locators:
        - { by: css, value: "#start", timeout_ms: 20 }
    end_time:
      label: "End Time"
      locators:
        - { by: css, value: "#end", timeout_ms: 20 }
    comment:
      label: "Comment"
      locators:
        - { by: css, value: "#comment", timeout_ms: 20 }
    action_code:
      label: "Action Code"
      locators:
        - { by: css, value: "#action", timeout_ms: 20 }
  save:
    - { by: css, value: "#save", timeout_ms: 20 }
"##;
    match Config::from_yaml_str(yaml) {
        Ok(config) => config,
        Err(e) => panic!("test configuration is invalid: {}", e),
    }
}

/// A CSV sheet with the canonical headers and the given rows
pub fn sheet(rows: &[&str]) -> String {
    let mut text = String::from("External ID,Action Type,Start Time,End Time,Comment\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

pub const BOUNDARY: &str = "autofill-test-boundary";

/// Content type and body of a multipart upload carrying one `file` field
pub fn multipart_file(filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    multipart_field("file", filename, content)
}

/// Content type and body of a multipart upload with an arbitrary field name
pub fn multipart_field(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// JSON body of a start request
pub fn start_body(username: &str, password: &str, delay_ms: Option<u64>) -> serde_json::Value {
    let mut config = serde_json::Map::new();
    if let Some(delay) = delay_ms {
        config.insert("interRecordDelayMs".to_string(), delay.into());
    }
    serde_json::json!({
        "credentials": { "username": username, "password": password },
        "config": config,
    })
}
