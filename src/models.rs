//! Chat4BA Data Models
//!
//! 백엔드 JSON 및 로컬 저장 포맷과 매핑되는 Rust 데이터 모델

use serde::{Deserialize, Deserializer, Serialize};

/// 업로드 파일 종류 (확장자 기반)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Excel,
    Pdf,
    Word,
    Text,
    Json,
    Unknown,
}

impl FileKind {
    /// 파일명 확장자에서 종류 추론
    pub fn from_name(name: &str) -> Self {
        let extension = std::path::Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => FileKind::Csv,
            "xlsx" | "xls" => FileKind::Excel,
            "pdf" => FileKind::Pdf,
            "doc" | "docx" => FileKind::Word,
            "txt" | "md" => FileKind::Text,
            "json" => FileKind::Json,
            _ => FileKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Excel => "excel",
            FileKind::Pdf => "pdf",
            FileKind::Word => "word",
            FileKind::Text => "text",
            FileKind::Json => "json",
            FileKind::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Csv => "CSV",
            FileKind::Excel => "Excel workbook",
            FileKind::Pdf => "PDF document",
            FileKind::Word => "Word document",
            FileKind::Text => "Text",
            FileKind::Json => "JSON",
            FileKind::Unknown => "File",
        }
    }

    /// 터미널 목록에 쓰는 아이콘
    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Csv => "[csv]",
            FileKind::Excel => "[xls]",
            FileKind::Pdf => "[pdf]",
            FileKind::Word => "[doc]",
            FileKind::Text => "[txt]",
            FileKind::Json => "[{ }]",
            FileKind::Unknown => "[ ? ]",
        }
    }

    /// 행/열 구조를 가진 파일인지 (스키마 그리드 대상)
    pub fn is_tabular(&self) -> bool {
        match self {
            FileKind::Csv | FileKind::Excel => true,
            FileKind::Pdf | FileKind::Word | FileKind::Text | FileKind::Json | FileKind::Unknown => {
                false
            }
        }
    }
}

impl<'de> Deserialize<'de> for FileKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.to_lowercase().as_str() {
            "csv" => FileKind::Csv,
            "excel" | "xlsx" | "xls" => FileKind::Excel,
            "pdf" => FileKind::Pdf,
            "word" | "docx" | "doc" => FileKind::Word,
            "text" | "txt" => FileKind::Text,
            "json" => FileKind::Json,
            _ => FileKind::Unknown,
        })
    }
}

/// 로컬 레지스트리에 저장되는 업로드 파일 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFileDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// 추출 데이터의 한 행 (컬럼명 -> 값, 순서 유지)
pub type Row = serde_json::Map<String, serde_json::Value>;

/// 백엔드에서 추출된 파일 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFileData {
    #[serde(alias = "filename")]
    pub file_name: String,
    #[serde(default, deserialize_with = "deserialize_rows")]
    pub content: Vec<Row>,
    #[serde(default)]
    pub metadata: ExtractedMetadata,
}

impl ExtractedFileData {
    /// 메타데이터가 비어 있으면 행 데이터에서 계산
    pub fn normalized(mut self) -> Self {
        if self.metadata.row_count == 0 {
            self.metadata.row_count = self.content.len();
        }
        if self.metadata.column_count == 0 {
            self.metadata.column_count = self.content.first().map(|row| row.len()).unwrap_or(0);
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    #[serde(default, alias = "rows", alias = "rowCount")]
    pub row_count: usize,
    #[serde(default, alias = "columns", alias = "columnCount")]
    pub column_count: usize,
}

/// content 필드는 행 배열 또는 JSON 문자열로 올 수 있음
fn deserialize_rows<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Row>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(rows_from_value(value))
}

fn rows_from_value(value: serde_json::Value) -> Vec<Row> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        serde_json::Value::String(text) => serde_json::from_str::<serde_json::Value>(&text)
            .map(rows_from_value)
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// 스키마 컬럼 타입 (샘플 값에서 추론)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// 스키마 그리드의 카드 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaCard {
    pub id: String,
    pub title: String,
    pub columns: Vec<SchemaColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// 카드 간 필드 관계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from_schema: String,
    pub to_schema: String,
    pub from_field: String,
    pub to_field: String,
}

/// 채팅 메시지 발신자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
    System,
}

impl Sender {
    /// 스레드 저장 시 사용하는 role 문자열
    pub fn role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "assistant",
            Sender::System => "system",
        }
    }
}

/// 채팅 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub is_error: bool,
    pub timestamp: i64,
}

/// 로컬에 저장되는 인증 토큰 쌍
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// 백엔드에 저장되는 대화 스레드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    /// 목록 응답 payload에는 id가 없을 수 있음
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub messages: Vec<ThreadMessage>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub associated_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// 추천 질문
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedQuestion {
    pub question: String,
    #[serde(default)]
    pub context: String,
}

/// 현재 로그인 사용자 (/auth/me)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: serde_json::Value,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub google_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_name("sales.CSV"), FileKind::Csv);
        assert_eq!(FileKind::from_name("q3.xlsx"), FileKind::Excel);
        assert_eq!(FileKind::from_name("legacy.xls"), FileKind::Excel);
        assert_eq!(FileKind::from_name("notes.md"), FileKind::Text);
        assert_eq!(FileKind::from_name("archive.tar.gz"), FileKind::Unknown);
        assert_eq!(FileKind::from_name("README"), FileKind::Unknown);
    }

    #[test]
    fn test_unknown_stored_kind_reads_as_unknown() {
        let json = r#"{"name":"a.bin","type":"application/octet-stream","timestamp":"t"}"#;
        let descriptor: UploadedFileDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.kind, FileKind::Unknown);
        assert_eq!(descriptor.size, None);
    }

    #[test]
    fn test_extracted_content_accepts_json_string() {
        let json = r#"{
            "filename": "orders.csv",
            "content": "[{\"id\": 1, \"total\": 9.5}, {\"id\": 2, \"total\": 3}]",
            "metadata": {"rows": 2, "columns": 2}
        }"#;
        let data: ExtractedFileData = serde_json::from_str(json).unwrap();
        assert_eq!(data.file_name, "orders.csv");
        assert_eq!(data.content.len(), 2);
        assert_eq!(data.metadata.row_count, 2);
    }

    #[test]
    fn test_extracted_plain_text_content_has_no_rows() {
        let json = r#"{"fileName": "memo.txt", "content": "just text"}"#;
        let data: ExtractedFileData = serde_json::from_str::<ExtractedFileData>(json)
            .unwrap()
            .normalized();
        assert!(data.content.is_empty());
        assert_eq!(data.metadata.row_count, 0);
    }
}
