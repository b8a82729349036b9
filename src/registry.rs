//! Uploaded File Registry
//!
//! 업로드에 성공한 파일 목록을 로컬 저장소에 보관합니다.
//! 같은 이름의 파일은 최신 업로드로 교체됩니다.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::{FileKind, UploadedFileDescriptor};
use crate::store::KeyValueStore;

/// 레지스트리 저장 키
pub const REGISTRY_KEY: &str = "uploadedFiles";

/// 바이트 수를 사람이 읽기 쉬운 크기로 변환 ("1.5 KB", "2 MB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}

pub struct FileRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl FileRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 저장된 파일 목록 (손상된 데이터는 빈 목록으로 취급)
    pub fn list(&self) -> Result<Vec<UploadedFileDescriptor>, AppError> {
        let Some(raw) = self.store.get(REGISTRY_KEY)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<UploadedFileDescriptor>>(&raw) {
            Ok(files) => Ok(files),
            Err(e) => {
                tracing::warn!("[Registry] Ignoring unreadable file registry: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, files: &[UploadedFileDescriptor]) -> Result<(), AppError> {
        let json = serde_json::to_string(files)?;
        self.store.set(REGISTRY_KEY, &json)
    }

    /// 같은 이름의 기존 항목을 제거하고 목록 끝에 추가
    pub fn upsert(&self, descriptor: UploadedFileDescriptor) -> Result<(), AppError> {
        let mut files = self.list()?;
        files.retain(|f| f.name != descriptor.name);
        tracing::debug!("[Registry] Recording {}", descriptor.name);
        files.push(descriptor);
        self.save(&files)
    }

    /// 업로드 결과를 레지스트리에 기록
    pub fn record_upload(
        &self,
        name: &str,
        byte_len: u64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<UploadedFileDescriptor, AppError> {
        let descriptor = UploadedFileDescriptor {
            name: name.to_string(),
            kind: FileKind::from_name(name),
            timestamp: now.to_rfc3339(),
            size: Some(format_file_size(byte_len)),
        };
        self.upsert(descriptor.clone())?;
        Ok(descriptor)
    }

    /// 파일 항목 삭제, 삭제된 항목이 있으면 true
    pub fn remove(&self, name: &str) -> Result<bool, AppError> {
        let mut files = self.list()?;
        let before = files.len();
        files.retain(|f| f.name != name);
        if files.len() == before {
            return Ok(false);
        }
        self.save(&files)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.store.remove(REGISTRY_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn registry() -> FileRegistry {
        FileRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
    }

    #[test]
    fn test_same_name_uploaded_twice_keeps_latest_entry() {
        let registry = registry();
        let first = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let second = chrono::Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

        registry.record_upload("sales.csv", 100, first).unwrap();
        registry.record_upload("costs.xlsx", 200, first).unwrap();
        registry.record_upload("sales.csv", 4096, second).unwrap();

        let files = registry.list().unwrap();
        let sales: Vec<_> = files.iter().filter(|f| f.name == "sales.csv").collect();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].timestamp, second.to_rfc3339());
        assert_eq!(sales[0].size.as_deref(), Some("4 KB"));
        assert_eq!(files.len(), 2);
        assert_eq!(files.last().unwrap().name, "sales.csv");
    }

    #[test]
    fn test_remove_reports_whether_entry_existed() {
        let registry = registry();
        registry.record_upload("a.csv", 1, chrono::Utc::now()).unwrap();
        assert!(registry.remove("a.csv").unwrap());
        assert!(!registry.remove("a.csv").unwrap());
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_registry_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(REGISTRY_KEY, "{not json").unwrap();
        let registry = FileRegistry::new(store);
        assert!(registry.list().unwrap().is_empty());
    }
}
