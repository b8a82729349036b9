//! Chat4BA 백엔드 요청/응답 타입 정의

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{ExtractedFileData, FileKind, RecommendedQuestion, Thread};

/// 업로드할 파일 (이름 + 내용)
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// 로컬 파일 읽기
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self { name, bytes })
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }

    pub fn mime_type(&self) -> &'static str {
        match self.kind() {
            FileKind::Csv => "text/csv",
            FileKind::Excel => {
                if self.name.to_lowercase().ends_with(".xls") {
                    "application/vnd.ms-excel"
                } else {
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                }
            }
            FileKind::Pdf => "application/pdf",
            FileKind::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            FileKind::Text => "text/plain",
            FileKind::Json => "application/json",
            FileKind::Unknown => "application/octet-stream",
        }
    }
}

/// 파일별 처리 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// 미리보기 청크
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewChunk {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub filename: String,
    #[serde(default)]
    pub preview: Vec<PreviewChunk>,
    pub status: FileStatus,
    #[serde(default)]
    pub error: Option<String>,
}

/// POST /data/preview 응답
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub files: Vec<PreviewEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub filename: String,
    pub status: FileStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProcessEntry {
    pub fn success(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            status: FileStatus::Success,
            error: None,
        }
    }
}

/// POST /data/process 원본 응답 (files가 빠질 수 있음)
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawProcessResponse {
    #[serde(default)]
    pub files: Option<Vec<ProcessEntry>>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// POST /data/process 정규화된 응답
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResponse {
    pub files: Vec<ProcessEntry>,
    pub success: Option<bool>,
}

impl ProcessResponse {
    /// files 배열이 없으면 입력 파일마다 success 항목을 합성
    pub(crate) fn from_raw(raw: RawProcessResponse, inputs: &[UploadFile]) -> Self {
        let files = match raw.files {
            Some(files) => files,
            None => {
                tracing::warn!(
                    "[API] Process response had no files array, assuming success for {} file(s)",
                    inputs.len()
                );
                inputs.iter().map(|f| ProcessEntry::success(&f.name)).collect()
            }
        };
        Self {
            files,
            success: raw.success,
        }
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProcessEntry> {
        self.files.iter().filter(|f| f.status == FileStatus::Error)
    }
}

/// GET /data/extracted 응답 (`files` 또는 `data` 키)
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ExtractedResponse {
    #[serde(default)]
    pub files: Option<Vec<ExtractedFileData>>,
    #[serde(default)]
    pub data: Option<Vec<ExtractedFileData>>,
}

impl ExtractedResponse {
    pub fn into_files(self) -> Vec<ExtractedFileData> {
        self.files
            .or(self.data)
            .unwrap_or_default()
            .into_iter()
            .map(ExtractedFileData::normalized)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AskRequest<'a> {
    pub query: &'a str,
}

/// POST /query/ask/all-collections 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// POST /auth/login 응답 (토큰은 선택)
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// 성공 여부 + 에러를 함께 담는 /api/* 응답 공통 형태
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RecommendationsBody {
    #[serde(default)]
    pub recommendations: Vec<RecommendedQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FollowupRequest<'a> {
    pub question: &'a str,
    pub answer: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct FollowupBody {
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ThreadsBody {
    #[serde(default)]
    pub threads: Vec<Thread>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ThreadBody {
    #[serde(default)]
    pub thread: Option<Thread>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ThreadSavedBody {
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// DELETE /data/delete 응답
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_array_synthesizes_success_per_input() {
        let raw: RawProcessResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        let inputs = vec![
            UploadFile::new("a.csv", vec![1]),
            UploadFile::new("b.xlsx", vec![2]),
        ];
        let response = ProcessResponse::from_raw(raw, &inputs);
        assert_eq!(
            response.files,
            vec![ProcessEntry::success("a.csv"), ProcessEntry::success("b.xlsx")]
        );
        assert_eq!(response.failed().count(), 0);
    }

    #[test]
    fn test_unknown_status_string_is_tolerated() {
        let entry: ProcessEntry =
            serde_json::from_str(r#"{"filename": "a.csv", "status": "queued"}"#).unwrap();
        assert_eq!(entry.status, FileStatus::Unknown);
    }

    #[test]
    fn test_extracted_response_accepts_backend_data_key() {
        let json = r#"{"success": true, "data": [{"filename": "x.csv", "content": [{"a": 1}], "metadata": {}}]}"#;
        let response: ExtractedResponse = serde_json::from_str(json).unwrap();
        let files = response.into_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].metadata.row_count, 1);
        assert_eq!(files[0].metadata.column_count, 1);
    }
}
