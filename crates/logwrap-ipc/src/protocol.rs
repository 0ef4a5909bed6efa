//! Control protocol - Request/Response wire types
//!
//! One UTF-8 JSON object per line in each direction. Every request names
//! the working directory it targets; the listener rejects mismatches.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Control request from a client invocation to the running instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Request {
    /// Signal the supervised child for graceful termination
    Kill {
        #[serde(rename = "workDir")]
        work_dir: PathBuf,
    },

    /// Partial update of the rotation policy; absent fields stay untouched
    Set {
        #[serde(rename = "workDir")]
        work_dir: PathBuf,

        /// Max active file size in bytes
        #[serde(rename = "maxSize", skip_serializing_if = "Option::is_none")]
        max_size: Option<u64>,

        /// Max number of retained backup files
        #[serde(skip_serializing_if = "Option::is_none")]
        logs: Option<usize>,

        /// Max backup age in milliseconds
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,

        /// Maintenance interval in milliseconds
        #[serde(rename = "checkInterval", skip_serializing_if = "Option::is_none")]
        check_interval: Option<u64>,

        /// Gzip rotated backups
        #[serde(skip_serializing_if = "Option::is_none")]
        zip: Option<bool>,
    },

    /// Read the current rotation policy
    Get {
        #[serde(rename = "workDir")]
        work_dir: PathBuf,
    },
}

impl Request {
    /// Working directory the request targets
    pub fn work_dir(&self) -> &Path {
        match self {
            Request::Kill { work_dir }
            | Request::Set { work_dir, .. }
            | Request::Get { work_dir } => work_dir,
        }
    }
}

/// Outcome code carried by every response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
}

/// Control response from the running instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub code: ResponseCode,

    /// Present on `get` responses
    #[serde(rename = "maxSize", skip_serializing_if = "Option::is_none", default)]
    pub max_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub logs: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration: Option<u64>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            code: ResponseCode::Ok,
            max_size: None,
            logs: None,
            duration: None,
        }
    }

    pub fn fail() -> Self {
        Self {
            code: ResponseCode::Fail,
            max_size: None,
            logs: None,
            duration: None,
        }
    }

    pub fn policy(max_size: u64, logs: usize, duration_ms: u64) -> Self {
        Self {
            code: ResponseCode::Ok,
            max_size: Some(max_size),
            logs: Some(logs),
            duration: Some(duration_ms),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_request_wire_format() {
        let req = Request::Kill {
            work_dir: PathBuf::from("/var/app"),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"cmd\":\"kill\""));
        assert!(json.contains("\"workDir\":\"/var/app\""));
    }

    #[test]
    fn test_set_request_omits_absent_fields() {
        let req = Request::Set {
            work_dir: PathBuf::from("/var/app"),
            max_size: Some(10240),
            logs: None,
            duration: None,
            check_interval: None,
            zip: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"maxSize\":10240"));
        assert!(!json.contains("logs"));
        assert!(!json.contains("duration"));
        assert!(!json.contains("checkInterval"));
        assert!(!json.contains("zip"));
    }

    #[test]
    fn test_set_request_roundtrip() {
        let json = r#"{"cmd":"set","workDir":"/var/app","logs":30,"zip":true}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::Set {
                max_size,
                logs,
                zip,
                ..
            } => {
                assert_eq!(max_size, None);
                assert_eq!(logs, Some(30));
                assert_eq!(zip, Some(true));
            }
            _ => panic!("wrong request type"),
        }
    }

    #[test]
    fn test_unknown_cmd_is_rejected() {
        let json = r#"{"cmd":"restart","workDir":"/var/app"}"#;
        assert!(serde_json::from_str::<Request>(json).is_err());
    }

    #[test]
    fn test_ok_response_wire_format() {
        let json = serde_json::to_string(&Response::ok()).unwrap();
        assert_eq!(json, r#"{"code":"OK"}"#);
    }

    #[test]
    fn test_fail_response_wire_format() {
        let json = serde_json::to_string(&Response::fail()).unwrap();
        assert_eq!(json, r#"{"code":"FAIL"}"#);
    }

    #[test]
    fn test_policy_response_roundtrip() {
        let resp = Response::policy(10240, 30, 2_592_000_000);
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_ok());
        assert_eq!(parsed.max_size, Some(10240));
        assert_eq!(parsed.logs, Some(30));
        assert_eq!(parsed.duration, Some(2_592_000_000));
    }
}
