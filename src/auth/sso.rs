//! SSO 로그인 (Google / Microsoft)
//!
//! 백엔드의 `/auth/{provider}/login`을 브라우저로 열고, 백엔드가 프론트엔드
//! 주소(`http://localhost:7001` 폴백)로 돌려보내는 리다이렉트를 로컬
//! 콜백 서버에서 받아 토큰을 추출합니다.
//!
//! - 성공: `/home?access_token=..&refresh_token=..`
//! - 실패: `/login?error=..`

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

use crate::error::AppError;
use crate::models::AuthSession;

/// 콜백 대기 최대 시간 (5분)
pub const SSO_TIMEOUT: Duration = Duration::from_secs(300);

/// 지원되는 SSO 제공자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SsoProvider {
    Google,
    Microsoft,
}

impl SsoProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SsoProvider::Google => "google",
            SsoProvider::Microsoft => "microsoft",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SsoProvider::Google => "Google",
            SsoProvider::Microsoft => "Microsoft",
        }
    }

    pub fn login_path(&self) -> &'static str {
        match self {
            SsoProvider::Google => "/auth/google/login",
            SsoProvider::Microsoft => "/auth/microsoft/login",
        }
    }

    /// 백엔드 기준 로그인 시작 URL
    pub fn login_url(&self, api_base: &str) -> Result<Url, AppError> {
        let base = format!("{}{}", api_base.trim_end_matches('/'), self.login_path());
        Url::parse(&base).map_err(|e| AppError::Config(format!("Invalid API URL: {}", e)))
    }
}

impl std::str::FromStr for SsoProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(SsoProvider::Google),
            "microsoft" | "ms" => Ok(SsoProvider::Microsoft),
            other => Err(AppError::InvalidOperation(format!(
                "Unsupported SSO provider: {}",
                other
            ))),
        }
    }
}

/// 리다이렉트 URL에서 토큰 추출 (사용자가 주소를 직접 붙여넣는 경우)
pub fn tokens_from_redirect(redirect_url: &str) -> Result<AuthSession, AppError> {
    let url = Url::parse(redirect_url)
        .map_err(|e| AppError::Login(format!("Invalid redirect URL: {}", e)))?;
    session_from_query(&url)
}

fn session_from_query(url: &Url) -> Result<AuthSession, AppError> {
    let params: HashMap<_, _> = url.query_pairs().collect();

    if let Some(error) = params.get("error") {
        return Err(AppError::Login(error.to_string()));
    }

    let access_token = params
        .get("access_token")
        .map(|t| t.to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Login("Redirect did not include an access token".to_string()))?;

    let refresh_token = params
        .get("refresh_token")
        .map(|t| t.to_string())
        .filter(|t| !t.is_empty());

    Ok(AuthSession {
        access_token,
        refresh_token,
    })
}

/// 콜백 요청 경로 해석. 관심 없는 경로면 None
fn parse_callback_path(path: &str) -> Option<Result<AuthSession, AppError>> {
    let url = Url::parse(&format!("http://localhost{}", path)).ok()?;
    match url.path() {
        "/home" | "/login" => Some(session_from_query(&url)),
        _ => None,
    }
}

/// 브라우저로 SSO를 진행하고 토큰을 받아옴
pub async fn login_with_browser(
    api_base: &str,
    provider: SsoProvider,
    callback_port: u16,
) -> Result<AuthSession, AppError> {
    let login_url = provider.login_url(api_base)?;

    // 브라우저를 열기 전에 리스너를 먼저 띄움
    let listener = TcpListener::bind(("127.0.0.1", callback_port)).await?;
    tracing::info!(
        "[SSO] Callback server listening on port {} for {}",
        callback_port,
        provider.display_name()
    );

    if let Err(e) = open::that(login_url.as_str()) {
        return Err(AppError::Login(format!("Failed to open browser: {}", e)));
    }

    match tokio::time::timeout(SSO_TIMEOUT, wait_for_redirect(listener)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Login("SSO timeout (5 minutes)".to_string())),
    }
}

/// `/home` 또는 `/login` 요청이 올 때까지 연결을 계속 수락
pub async fn wait_for_redirect(listener: TcpListener) -> Result<AuthSession, AppError> {
    loop {
        let (stream, addr) = listener.accept().await?;
        tracing::debug!("[SSO] Accepted connection from {}", addr);

        let (reader_half, mut writer_half) = stream.into_split();
        let mut reader = BufReader::new(reader_half);

        let mut request_line = String::new();
        if let Err(e) = reader.read_line(&mut request_line).await {
            tracing::warn!("[SSO] Failed to read request line: {}", e);
            continue;
        }

        // 헤더는 빈 줄까지 읽고 버림
        loop {
            let mut header_line = String::new();
            match reader.read_line(&mut header_line).await {
                Ok(0) => break,
                Ok(_) if header_line.trim().is_empty() => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }

        let Some(path) = request_line.split_whitespace().nth(1) else {
            let bad_request = "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
            let _ = writer_half.write_all(bad_request.as_bytes()).await;
            let _ = writer_half.shutdown().await;
            continue;
        };

        let Some(result) = parse_callback_path(path) else {
            tracing::debug!("[SSO] Ignoring request: {}", path);
            let not_found = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
            let _ = writer_half.write_all(not_found.as_bytes()).await;
            let _ = writer_half.shutdown().await;
            continue;
        };

        let (status, body) = match &result {
            Ok(_) => (
                "200 OK",
                "<!DOCTYPE html><html><body><h1>Signed in to Chat4BA</h1><p>You can close this window and return to the terminal.</p></body></html>".to_string(),
            ),
            Err(e) => ("400 Bad Request", failure_page(&e.to_string())),
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let _ = writer_half.write_all(response.as_bytes()).await;
        let _ = writer_half.shutdown().await;

        return result;
    }
}

fn failure_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body><h1>Sign-in failed</h1><p>{}</p></body></html>",
        html_escape(message)
    )
}

/// HTML 특수문자 이스케이프 (콜백 URL 값을 페이지에 넣기 전)
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;

    #[test]
    fn test_tokens_from_redirect() {
        let session =
            tokens_from_redirect("http://localhost:7001/home?access_token=a1&refresh_token=r1&google_id=9")
                .unwrap();
        assert_eq!(session.access_token, "a1");
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_error_redirect_is_login_error() {
        let err = tokens_from_redirect("http://localhost:7001/login?error=auth_error").unwrap_err();
        assert!(matches!(err, AppError::Login(msg) if msg == "auth_error"));
    }

    #[test]
    fn test_login_url_joins_base() {
        let url = SsoProvider::Microsoft.login_url("http://api.local:8000/").unwrap();
        assert_eq!(url.as_str(), "http://api.local:8000/auth/microsoft/login");
    }

    async fn send_request(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_callback_server_ignores_other_paths() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(wait_for_redirect(listener));

        let not_found = send_request(port, "/favicon.ico").await;
        assert!(not_found.starts_with("HTTP/1.1 404"));

        let ok = send_request(port, "/home?access_token=tok&refresh_token=ref").await;
        assert!(ok.starts_with("HTTP/1.1 200"));

        let session = server.await.unwrap().unwrap();
        assert_eq!(session.access_token, "tok");
        assert_eq!(session.refresh_token.as_deref(), Some("ref"));
    }

    #[test]
    fn test_failure_page_escapes_callback_error() {
        let page = failure_page("<script>alert(\"x\")</script>&");
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;&amp;"));
    }
}
