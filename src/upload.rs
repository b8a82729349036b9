//! File Upload Flow
//!
//! 미리보기 → 처리 → 레지스트리 기록 → 모델링 화면 이동.
//!
//! 미리보기는 참고용이라 실패해도 처리를 막지 않습니다. 처리 응답이
//! 기준이며, 백엔드가 개별 파일 오류를 보고해도 입력 파일은 모두
//! 레지스트리에 기록하고 오류 파일마다 토스트를 띄웁니다.

use std::path::Path;
use std::sync::Arc;

use calamine::Reader;
use serde::Serialize;

use crate::api::{Backend, PreviewResponse, ProcessEntry, UploadFile};
use crate::error::AppError;
use crate::models::{FileKind, UploadedFileDescriptor};
use crate::notify::{Navigator, Notifier, Route, Toast};
use crate::registry::FileRegistry;

/// 업로드 결과 요약
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub preview: Option<PreviewResponse>,
    pub recorded: Vec<UploadedFileDescriptor>,
    pub failed: Vec<ProcessEntry>,
}

pub struct UploadFlow {
    backend: Arc<dyn Backend>,
    registry: Arc<FileRegistry>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl UploadFlow {
    pub fn new(
        backend: Arc<dyn Backend>,
        registry: Arc<FileRegistry>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            backend,
            registry,
            notifier,
            navigator,
        }
    }

    /// 백엔드 미리보기 (실패 시 None)
    pub async fn preview(&self, files: &[UploadFile]) -> Option<PreviewResponse> {
        match self.backend.preview_files(files).await {
            Ok(preview) => Some(preview),
            Err(e) => {
                tracing::warn!("[Upload] Preview failed, continuing without it: {}", e);
                None
            }
        }
    }

    /// 파일 처리 후 레지스트리 기록
    ///
    /// 처리 호출 자체가 실패하면 아무것도 기록하지 않습니다.
    pub async fn process(
        &self,
        files: &[UploadFile],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<UploadOutcome, AppError> {
        let response = match self.backend.process_files(files).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("[Upload] Processing failed: {}", e);
                self.notifier.notify(Toast::error(format!(
                    "Upload failed: {}",
                    e.user_message()
                )));
                return Err(e.into());
            }
        };

        let mut recorded = Vec::with_capacity(files.len());
        for file in files {
            let descriptor = self
                .registry
                .record_upload(&file.name, file.bytes.len() as u64, now)?;
            recorded.push(descriptor);
        }

        let failed: Vec<ProcessEntry> = response.failed().cloned().collect();
        for entry in &failed {
            let reason = entry.error.as_deref().unwrap_or("processing failed");
            self.notifier
                .notify(Toast::error(format!("{}: {}", entry.filename, reason)));
        }

        let succeeded = files.len().saturating_sub(failed.len());
        if succeeded > 0 {
            self.notifier
                .notify(Toast::success(format!("Processed {} file(s)", succeeded)));
        }
        tracing::info!(
            "[Upload] Recorded {} file(s), {} reported errors",
            recorded.len(),
            failed.len()
        );

        self.navigator.navigate(Route::Modeling);

        Ok(UploadOutcome {
            preview: None,
            recorded,
            failed,
        })
    }

    /// 미리보기(선택) + 처리
    pub async fn upload(
        &self,
        files: &[UploadFile],
        skip_preview: bool,
    ) -> Result<UploadOutcome, AppError> {
        if files.is_empty() {
            return Err(AppError::InvalidOperation("No files selected".to_string()));
        }

        let preview = if skip_preview {
            None
        } else {
            self.preview(files).await
        };

        let mut outcome = self.process(files, chrono::Utc::now()).await?;
        outcome.preview = preview;
        Ok(outcome)
    }
}

/// 업로드 전에 로컬에서 읽은 표 미리보기
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPreview {
    pub file_name: String,
    pub sheet: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

/// CSV / Excel 파일 헤더와 앞부분 행 읽기
pub fn local_preview(path: &Path, max_rows: usize) -> Result<LocalPreview, AppError> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    match FileKind::from_name(&file_name) {
        FileKind::Csv => csv_preview(path, file_name, max_rows),
        FileKind::Excel => excel_preview(path, file_name, max_rows),
        other => Err(AppError::InvalidOperation(format!(
            "{} files have no table preview",
            other.label()
        ))),
    }
}

fn csv_preview(path: &Path, file_name: String, max_rows: usize) -> Result<LocalPreview, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::Spreadsheet(format!("Failed to open {}: {}", file_name, e)))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::Spreadsheet(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    let mut total_rows = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| AppError::Spreadsheet(e.to_string()))?;
        total_rows += 1;
        if rows.len() < max_rows {
            rows.push(record.iter().map(|v| v.to_string()).collect());
        }
    }

    Ok(LocalPreview {
        file_name,
        sheet: None,
        headers,
        rows,
        total_rows,
    })
}

fn excel_preview(
    path: &Path,
    file_name: String,
    max_rows: usize,
) -> Result<LocalPreview, AppError> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| AppError::Spreadsheet(format!("Failed to open {}: {}", file_name, e)))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::Spreadsheet(format!("{} has no sheets", file_name)))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| AppError::Spreadsheet(format!("Failed to read sheet {}: {}", sheet, e)))?;

    let mut iter = range.rows();
    let headers = iter
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();

    let mut rows = Vec::new();
    let mut total_rows = 0usize;
    for row in iter {
        total_rows += 1;
        if rows.len() < max_rows {
            rows.push(row.iter().map(cell_to_string).collect());
        }
    }

    Ok(LocalPreview {
        file_name,
        sheet: Some(sheet),
        headers,
        rows,
        total_rows,
    })
}

fn cell_to_string(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Int(i) => i.to_string(),
        calamine::Data::Float(f) => f.to_string(),
        calamine::Data::Bool(b) => b.to_string(),
        calamine::Data::DateTime(d) => d.as_f64().to_string(),
        calamine::Data::DateTimeIso(s) => s.clone(),
        calamine::Data::DurationIso(s) => s.clone(),
        calamine::Data::Error(e) => format!("#ERR {:?}", e),
    }
}
