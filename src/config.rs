//! Configuration
//!
//! `.env.local` / `.env` 파일과 환경 변수에서 설정을 읽습니다.
//! `.env.local`이 markdown 등을 포함해 dotenvy(strict)가 실패하면
//! `KEY=VALUE` 라인만 읽는 lenient 로더로 보강합니다.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

pub const API_URL_VAR: &str = "CHAT4BA_API_URL";
pub const DATA_DIR_VAR: &str = "CHAT4BA_DATA_DIR";
pub const CALLBACK_PORT_VAR: &str = "CHAT4BA_CALLBACK_PORT";
pub const TIMEOUT_VAR: &str = "CHAT4BA_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// 백엔드가 SSO 후 돌려보내는 기본 프론트엔드 포트
pub const DEFAULT_CALLBACK_PORT: u16 = 7001;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// 로컬 저장소 파일 이름
pub const STORE_FILE_NAME: &str = "chat4ba.db";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub callback_port: u16,
    pub timeout: Duration,
}

impl AppConfig {
    /// 환경 변수 조회 함수를 받아 설정 구성 (테스트에서 주입)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        url::Url::parse(&api_url)
            .map_err(|e| AppError::Config(format!("{} is not a valid URL: {}", API_URL_VAR, e)))?;

        let data_dir = match get(DATA_DIR_VAR) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let callback_port = match get(CALLBACK_PORT_VAR) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                AppError::Config(format!("{} must be a port number, got {:?}", CALLBACK_PORT_VAR, raw))
            })?,
            None => DEFAULT_CALLBACK_PORT,
        };

        let timeout_secs = match get(TIMEOUT_VAR) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!("{} must be a number of seconds, got {:?}", TIMEOUT_VAR, raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            data_dir,
            callback_port,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// .env 파일 로드 후 프로세스 환경에서 읽기
    pub fn load() -> Result<Self, AppError> {
        load_env_files();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// CLI 플래그로 덮어쓰기
    pub fn with_overrides(mut self, api_url: Option<String>, data_dir: Option<PathBuf>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }
}

fn default_data_dir() -> Result<PathBuf, AppError> {
    directories::ProjectDirs::from("com", "Chat4BA", "chat4ba")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            AppError::Config(format!(
                "Could not determine a data directory; set {}",
                DATA_DIR_VAR
            ))
        })
}

fn is_valid_env_key(key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// `KEY=VALUE` 라인만 파싱 (주석, 코드펜스, 설명 라인 무시)
pub(crate) fn parse_env_lenient(text: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("```") {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line).trim();
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let key = k.trim();
        if !is_valid_env_key(key) {
            continue;
        }

        let mut value = v.trim().to_string();
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value = value[1..value.len() - 1].to_string();
        }
        pairs.push((key.to_string(), value));
    }

    pairs
}

fn try_load_env_lenient(path: &Path) -> std::io::Result<usize> {
    let text = std::fs::read_to_string(path)?;
    let mut loaded = 0usize;

    for (key, value) in parse_env_lenient(&text) {
        // 이미 비어있지 않은 값이 있으면 유지
        if let Ok(existing) = std::env::var(&key) {
            if !existing.trim().is_empty() {
                continue;
            }
        }
        std::env::set_var(&key, value);
        loaded += 1;
    }

    Ok(loaded)
}

fn find_upwards(start: PathBuf, filename: &str, max_hops: usize) -> Option<PathBuf> {
    let mut cur = start;
    for _ in 0..=max_hops {
        let candidate = cur.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        if !cur.pop() {
            break;
        }
    }
    None
}

/// `.env.local`(현재 디렉터리부터 상위로 탐색) 다음 `.env`
fn load_env_files() {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = find_upwards(cwd, ".env.local", 6) {
            if dotenvy::from_path(&path).is_err() {
                match try_load_env_lenient(&path) {
                    Ok(loaded) => {
                        tracing::debug!("[Config] Loaded {} value(s) leniently from {}", loaded, path.display())
                    }
                    Err(e) => tracing::warn!("[Config] Failed to read {}: {}", path.display(), e),
                }
            }
        }
    }

    // 파일이 없을 수 있으므로 실패는 무시
    let _ = dotenvy::dotenv();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[(DATA_DIR_VAR, "/tmp/chat4ba")]).unwrap();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.callback_port, 7001);
        assert_eq!(cfg.timeout, Duration::from_secs(60));
        assert_eq!(cfg.store_path(), PathBuf::from("/tmp/chat4ba/chat4ba.db"));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = config(&[(DATA_DIR_VAR, "/tmp/x"), (CALLBACK_PORT_VAR, "70000")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let err = config(&[(DATA_DIR_VAR, "/tmp/x"), (API_URL_VAR, "not a url")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_overrides_win() {
        let cfg = config(&[(DATA_DIR_VAR, "/tmp/x"), (API_URL_VAR, "http://a:1/")])
            .unwrap()
            .with_overrides(Some("http://b:2/".into()), Some(PathBuf::from("/data")));
        assert_eq!(cfg.api_url, "http://b:2");
        assert_eq!(cfg.data_dir, PathBuf::from("/data"));
    }

    #[test]
    fn test_lenient_parser_skips_markdown() {
        let text = "# Settings\n```bash\nexport CHAT4BA_API_URL=\"http://api:9000\"\n```\nSome prose = here\nlower_key=1\nCHAT4BA_TIMEOUT_SECS='30'\n";
        let pairs = parse_env_lenient(text);
        assert_eq!(
            pairs,
            vec![
                ("CHAT4BA_API_URL".to_string(), "http://api:9000".to_string()),
                ("CHAT4BA_TIMEOUT_SECS".to_string(), "30".to_string()),
            ]
        );
    }
}
