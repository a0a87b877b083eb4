use crate::common::{ApiReply, ApiStatus, ErrorCode};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum TraceLevel {
        None = 0 => "none",
        Error = 1 => "error",
        Warn = 2 => "warn",
        Info = 3 => "info",
        Debug = 4 => "debug",
        Verbose = 5 => "verbose",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceSpec {
    pub trace_level: TraceLevel,
    pub api_trace_en: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceRequest {
    pub spec: TraceSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceGetResponse {
    pub api_status: ApiStatus,
    pub error_code: ErrorCode,
    pub trace_level: TraceLevel,
    pub api_trace_en: bool,
    pub trace_file: String,
}

impl ApiReply for TraceGetResponse {
    fn api_status(&self) -> ApiStatus {
        self.api_status
    }

    fn error_code(&self) -> ErrorCode {
        self.error_code
    }
}
