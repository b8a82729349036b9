//! 인증 모듈
//!
//! - 토큰 저장/삭제 (로컬 저장소)
//! - 401 응답 시 1회 토큰 갱신 상태 머신
//! - Google/Microsoft SSO 리다이렉트 처리

pub mod refresh;
pub mod session;
pub mod sso;

pub use refresh::{RefreshAction, RefreshEvent, RefreshState};
pub use session::TokenStore;
pub use sso::SsoProvider;
