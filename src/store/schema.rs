//! Store Schema
//!
//! 로컬 key-value 저장소 SQLite 스키마 정의

/// 저장소 스키마 생성 SQL
pub const CREATE_SCHEMA: &str = r#"
-- 키-값 엔트리 (브라우저 localStorage 대응)
CREATE TABLE IF NOT EXISTS kv_entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
