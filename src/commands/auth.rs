//! Authentication Commands
//!
//! 이메일/비밀번호 로그인, SSO 로그인, 로그아웃, 현재 사용자 조회

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::auth::sso::{self, SsoProvider};
use crate::error::{AppError, CommandError, CommandResult};
use crate::models::CurrentUser;
use crate::notify::{Route, Toast};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordLoginArgs {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoLoginArgs {
    pub provider: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectLoginArgs {
    pub redirect_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub method: String,
    pub has_refresh_token: bool,
}

/// 이메일/비밀번호 로그인
pub async fn login_with_password(
    args: PasswordLoginArgs,
    state: &AppState,
) -> CommandResult<LoginResult> {
    if args.email.trim().is_empty() || args.password.is_empty() {
        return Err(AppError::Login("Email and password are required".to_string()).into());
    }

    let response = state.api.login(args.email.trim(), &args.password).await?;
    let session = state.tokens.load().map_err(CommandError::from)?;

    if session.is_none() {
        // 토큰을 주지 않는 백엔드는 SSO로만 세션을 발급
        tracing::info!("[Auth] Password login accepted without tokens");
        state.notifier.notify(Toast::info(
            response
                .message
                .unwrap_or_else(|| "Login accepted. Use SSO to start a session.".to_string()),
        ));
    } else {
        state.notifier.notify(Toast::success("Signed in"));
        state.navigator.navigate(Route::Home);
    }

    Ok(LoginResult {
        method: "password".to_string(),
        has_refresh_token: session.and_then(|s| s.refresh_token).is_some(),
    })
}

/// 브라우저 SSO 로그인
pub async fn login_with_sso(args: SsoLoginArgs, state: &AppState) -> CommandResult<LoginResult> {
    let provider: SsoProvider = args.provider.parse().map_err(CommandError::from)?;
    state.notifier.notify(Toast::info(format!(
        "Opening {} sign-in in your browser...",
        provider.display_name()
    )));

    let session = sso::login_with_browser(&state.config.api_url, provider, state.config.callback_port)
        .await
        .map_err(CommandError::from)?;
    state.tokens.save(&session).map_err(CommandError::from)?;

    state
        .notifier
        .notify(Toast::success(format!("Signed in with {}", provider.display_name())));
    state.navigator.navigate(Route::Home);

    Ok(LoginResult {
        method: provider.as_str().to_string(),
        has_refresh_token: session.refresh_token.is_some(),
    })
}

/// 브라우저 주소창의 리다이렉트 URL을 직접 붙여넣은 경우
pub fn login_with_redirect(
    args: RedirectLoginArgs,
    state: &AppState,
) -> CommandResult<LoginResult> {
    let session = sso::tokens_from_redirect(args.redirect_url.trim()).map_err(CommandError::from)?;
    state.tokens.save(&session).map_err(CommandError::from)?;
    state.notifier.notify(Toast::success("Signed in"));
    state.navigator.navigate(Route::Home);

    Ok(LoginResult {
        method: "redirect".to_string(),
        has_refresh_token: session.refresh_token.is_some(),
    })
}

pub fn logout(state: &AppState) -> CommandResult<()> {
    state.tokens.clear().map_err(CommandError::from)?;
    state.notifier.notify(Toast::success("Signed out"));
    Ok(())
}

/// GET /auth/me
pub async fn whoami(state: &AppState) -> CommandResult<CurrentUser> {
    if state.tokens.access_token().map_err(CommandError::from)?.is_none() {
        return Err(AppError::Login("Not signed in. Run `chat4ba login` first.".to_string()).into());
    }
    Ok(state.api.current_user().await?)
}
