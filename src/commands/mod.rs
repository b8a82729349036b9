//! Chat4BA Commands Module
//!
//! 터미널 프론트엔드(또는 다른 UI 셸)에서 호출하는 명령 정의.
//! 모든 명령은 [`AppState`]를 받아 `CommandResult`를 반환합니다.

pub mod auth;
pub mod chat;
pub mod files;
pub mod schema;
pub mod threads;

use std::sync::Arc;

use crate::api::ApiClient;
use crate::auth::TokenStore;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::notify::{ConsoleNavigator, ConsoleNotifier, Navigator, Notifier};
use crate::registry::FileRegistry;
use crate::store::{KeyValueStore, SqliteStore};

/// 명령 간에 공유되는 클라이언트 상태
pub struct AppState {
    pub config: AppConfig,
    pub tokens: TokenStore,
    pub registry: Arc<FileRegistry>,
    pub api: Arc<ApiClient>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AppError> {
        let tokens = TokenStore::new(store.clone());
        let registry = Arc::new(FileRegistry::new(store));
        let api = Arc::new(ApiClient::new(
            &config.api_url,
            config.timeout,
            tokens.clone(),
            navigator.clone(),
        )?);

        Ok(Self {
            config,
            tokens,
            registry,
            api,
            notifier,
            navigator,
        })
    }

    /// SQLite 저장소 + 터미널 알림으로 상태 구성
    pub fn open(config: AppConfig) -> Result<Self, AppError> {
        let store_path = config.store_path();
        tracing::debug!("[State] Opening store at {}", store_path.display());
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&store_path)?);
        Self::new(
            config,
            store,
            Arc::new(ConsoleNotifier),
            Arc::new(ConsoleNavigator),
        )
    }
}
