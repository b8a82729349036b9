//! Chat4BA 백엔드 API
//!
//! 화면 로직(업로드, 채팅)은 [`Backend`] 트레이트에만 의존하므로
//! 테스트에서는 메모리 구현으로 교체할 수 있습니다.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{ExtractedFileData, RecommendedQuestion};

pub use client::ApiClient;
pub use types::{
    AskResponse, DeleteResponse, FileStatus, LoginResponse, PreviewResponse, ProcessEntry,
    ProcessResponse, UploadFile,
};

#[async_trait]
pub trait Backend: Send + Sync {
    async fn preview_files(&self, files: &[UploadFile]) -> Result<PreviewResponse, ApiError>;

    async fn process_files(&self, files: &[UploadFile]) -> Result<ProcessResponse, ApiError>;

    /// 실패해도 에러 대신 빈 목록
    async fn get_extracted_data(&self) -> Vec<ExtractedFileData>;

    async fn ask_question(&self, text: &str) -> Result<AskResponse, ApiError>;

    async fn recommended_questions(
        &self,
        count: usize,
    ) -> Result<Vec<RecommendedQuestion>, ApiError>;

    async fn suggest_followups(&self, question: &str, answer: &str)
        -> Result<Vec<String>, ApiError>;
}
