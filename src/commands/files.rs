//! File Commands
//!
//! 업로드, 로컬 미리보기, 업로드 목록/삭제, 추출 데이터 조회

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::api::{PreviewResponse, ProcessEntry, UploadFile};
use crate::error::{AppError, CommandError, CommandResult};
use crate::models::{ExtractedFileData, UploadedFileDescriptor};
use crate::notify::Toast;
use crate::upload::{local_preview, LocalPreview, UploadFlow};

/// 로컬 미리보기 기본 행 수
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFilesArgs {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub skip_preview: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectFileArgs {
    pub path: PathBuf,
    pub max_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNameArgs {
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub preview: Option<PreviewResponse>,
    pub recorded: Vec<UploadedFileDescriptor>,
    pub failed: Vec<ProcessEntry>,
}

/// 파일 업로드 (미리보기 → 처리 → 기록)
pub async fn upload_files(args: UploadFilesArgs, state: &AppState) -> CommandResult<UploadSummary> {
    let mut files = Vec::with_capacity(args.paths.len());
    for path in &args.paths {
        let file = UploadFile::from_path(path).await.map_err(|e| {
            CommandError::from(AppError::NotFound(format!("{}: {}", path.display(), e)))
        })?;
        files.push(file);
    }

    let flow = UploadFlow::new(
        state.api.clone(),
        state.registry.clone(),
        state.notifier.clone(),
        state.navigator.clone(),
    );
    let outcome = flow.upload(&files, args.skip_preview).await?;

    Ok(UploadSummary {
        preview: outcome.preview,
        recorded: outcome.recorded,
        failed: outcome.failed,
    })
}

/// 업로드 전 로컬 표 미리보기
pub fn inspect_file(args: InspectFileArgs) -> CommandResult<LocalPreview> {
    let max_rows = args.max_rows.unwrap_or(DEFAULT_PREVIEW_ROWS);
    Ok(local_preview(&args.path, max_rows)?)
}

/// 업로드된 파일 목록 (로컬 레지스트리)
pub fn list_files(state: &AppState) -> CommandResult<Vec<UploadedFileDescriptor>> {
    state.registry.list().map_err(CommandError::from)
}

/// 백엔드에서 삭제한 뒤 레지스트리에서도 제거
pub async fn delete_file(args: FileNameArgs, state: &AppState) -> CommandResult<bool> {
    let response = state.api.delete_file(&args.file_name).await?;
    if !response.success {
        let message = response
            .message
            .unwrap_or_else(|| format!("Could not delete {}", args.file_name));
        state.notifier.notify(Toast::error(message.clone()));
        return Err(AppError::InvalidOperation(message).into());
    }

    let removed = state
        .registry
        .remove(&args.file_name)
        .map_err(CommandError::from)?;
    state
        .notifier
        .notify(Toast::success(format!("Deleted {}", args.file_name)));
    Ok(removed)
}

/// 백엔드에 저장된 파일 미리보기
pub async fn preview_stored_file(
    args: FileNameArgs,
    state: &AppState,
) -> CommandResult<PreviewResponse> {
    Ok(state.api.preview_stored_file(&args.file_name).await?)
}

/// 추출 데이터 (실패 시 빈 목록)
pub async fn list_extracted(state: &AppState) -> CommandResult<Vec<ExtractedFileData>> {
    Ok(state.api.get_extracted_data().await)
}
