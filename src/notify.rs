//! 사용자 알림(토스트)과 화면 전환
//!
//! 뷰 모델은 UI를 직접 알지 못하고 이 트레잇들을 통해 알림/이동을 요청합니다.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: ToastLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: ToastLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: ToastLevel::Error, message: message.into() }
    }
}

/// 화면 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Login,
    Home,
    Modeling,
    Chat,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Home => "/home",
            Route::Modeling => "/modeling",
            Route::Chat => "/chat",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// 터미널 출력용 구현
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Info => println!("  {}", toast.message),
            ToastLevel::Success => println!("✓ {}", toast.message),
            ToastLevel::Error => eprintln!("✗ {}", toast.message),
        }
    }
}

pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!("[Navigate] {}", route.path());
        match route {
            Route::Login => eprintln!("Session expired. Run `chat4ba login` to sign in again."),
            Route::Modeling => println!("Files are ready. Run `chat4ba schema` to model them."),
            Route::Home | Route::Chat => {}
        }
    }
}
