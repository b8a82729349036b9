//! 인증 토큰 저장소
//!
//! access/refresh 토큰을 key-value 저장소에 보관합니다.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::AuthSession;
use crate::store::KeyValueStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 저장된 세션 (access 토큰이 없으면 None)
    pub fn load(&self) -> Result<Option<AuthSession>, AppError> {
        let Some(access_token) = self.store.get(ACCESS_TOKEN_KEY)? else {
            return Ok(None);
        };
        if access_token.trim().is_empty() {
            return Ok(None);
        }
        let refresh_token = self
            .store
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.trim().is_empty());
        Ok(Some(AuthSession {
            access_token,
            refresh_token,
        }))
    }

    pub fn access_token(&self) -> Result<Option<String>, AppError> {
        Ok(self.load()?.map(|s| s.access_token))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, AppError> {
        Ok(self.load()?.and_then(|s| s.refresh_token))
    }

    pub fn save(&self, session: &AuthSession) -> Result<(), AppError> {
        self.store.set(ACCESS_TOKEN_KEY, &session.access_token)?;
        match &session.refresh_token {
            Some(token) => self.store.set(REFRESH_TOKEN_KEY, token)?,
            None => self.store.remove(REFRESH_TOKEN_KEY)?,
        }
        tracing::info!(
            "[Auth] Session saved (access_token length: {})",
            session.access_token.len()
        );
        Ok(())
    }

    /// 갱신된 access 토큰만 교체 (refresh 토큰 유지)
    pub fn replace_access_token(&self, access_token: &str) -> Result<(), AppError> {
        self.store.set(ACCESS_TOKEN_KEY, access_token)
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        tracing::info!("[Auth] Tokens cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_replace_access_token_keeps_refresh_token() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        tokens
            .save(&AuthSession {
                access_token: "old".to_string(),
                refresh_token: Some("r1".to_string()),
            })
            .unwrap();

        tokens.replace_access_token("new").unwrap();

        let session = tokens.load().unwrap().unwrap();
        assert_eq!(session.access_token, "new");
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_clear_removes_both_tokens() {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        tokens
            .save(&AuthSession {
                access_token: "a".to_string(),
                refresh_token: Some("r".to_string()),
            })
            .unwrap();
        tokens.clear().unwrap();
        assert!(tokens.load().unwrap().is_none());
        assert!(tokens.refresh_token().unwrap().is_none());
    }
}
