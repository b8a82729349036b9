//! Chat4BA REST API 클라이언트
//!
//! 모든 백엔드 호출이 이 클라이언트를 거칩니다.
//! - 저장된 access 토큰을 Bearer 헤더로 첨부
//! - 401 응답 시 refresh 토큰으로 1회 갱신 후 1회 재시도
//! - 에러를 [`ApiError`]로 정규화

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::api::types::*;
use crate::api::Backend;
use crate::auth::{RefreshAction, RefreshEvent, RefreshState, TokenStore};
use crate::error::{ApiError, AppError};
use crate::models::{AuthSession, CurrentUser, ExtractedFileData, RecommendedQuestion, Thread};
use crate::notify::{Navigator, Route};

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            tokens,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer 토큰을 붙여 전송하고 401이면 갱신 상태 머신을 따름
    ///
    /// `build`는 재전송 시 다시 호출되므로 요청 본문을 매번 새로 만들어야 합니다.
    async fn send_authorized<F>(&self, build: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut state = RefreshState::Normal;

        loop {
            let mut request = build(&self.http);
            match self.tokens.access_token() {
                Ok(Some(token)) => request = request.bearer_auth(token),
                Ok(None) => {}
                Err(e) => tracing::warn!("[API] Failed to read access token: {}", e),
            }

            let response = request
                .send()
                .await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            let has_refresh_token = matches!(self.tokens.refresh_token(), Ok(Some(_)));
            let (next, action) = state.next(RefreshEvent::Unauthorized { has_refresh_token });
            state = next;

            let action = match action {
                RefreshAction::StartRefresh => {
                    tracing::info!("[API] Received 401, attempting token refresh...");
                    let event = match self.refresh_access_token().await {
                        Ok(()) => RefreshEvent::RefreshSucceeded,
                        Err(e) => {
                            tracing::warn!("[API] Token refresh failed: {}", e);
                            RefreshEvent::RefreshFailed
                        }
                    };
                    let (next, action) = state.next(event);
                    state = next;
                    action
                }
                other => other,
            };

            match action {
                RefreshAction::RetryRequest => {
                    tracing::info!("[API] Token refreshed, retrying request once");
                    continue;
                }
                RefreshAction::GiveUp => {
                    self.end_session();
                    return Err(ApiError::AuthenticationExpired);
                }
                RefreshAction::StartRefresh | RefreshAction::Nothing => {
                    return Err(ApiError::AuthenticationExpired);
                }
            }
        }
    }

    /// POST /auth/refresh → 새 access 토큰
    ///
    /// Bearer 첨부/401 처리를 거치지 않는 단독 호출입니다.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let refreshed: RefreshResponse = read_json(response).await?;
        Ok(refreshed.access_token)
    }

    async fn refresh_access_token(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .ok()
            .flatten()
            .ok_or(ApiError::AuthenticationExpired)?;

        let access_token = self.refresh(&refresh_token).await?;
        self.tokens
            .replace_access_token(&access_token)
            .map_err(|e| ApiError::MalformedResponse(format!("Failed to store token: {}", e)))?;
        Ok(())
    }

    /// 토큰 삭제 후 로그인 화면으로 이동
    fn end_session(&self) {
        if let Err(e) = self.tokens.clear() {
            tracing::error!("[API] Failed to clear tokens: {}", e);
        }
        self.navigator.navigate(Route::Login);
    }

    /// POST /data/preview
    pub async fn preview_files(&self, files: &[UploadFile]) -> Result<PreviewResponse, ApiError> {
        tracing::info!("[API] Previewing {} file(s)", files.len());
        let url = self.url("/data/preview");
        let response = self
            .send_authorized(|http| http.post(&url).multipart(multipart_form(files)))
            .await?;
        read_json(response).await
    }

    /// POST /data/process
    pub async fn process_files(&self, files: &[UploadFile]) -> Result<ProcessResponse, ApiError> {
        tracing::info!("[API] Processing {} file(s)", files.len());
        let url = self.url("/data/process");
        let response = self
            .send_authorized(|http| http.post(&url).multipart(multipart_form(files)))
            .await?;
        let raw: RawProcessResponse = read_json(response).await?;
        Ok(ProcessResponse::from_raw(raw, files))
    }

    /// GET /data/extracted (실패 시 빈 목록)
    pub async fn get_extracted_data(&self) -> Vec<ExtractedFileData> {
        let url = self.url("/data/extracted");
        let result: Result<ExtractedResponse, ApiError> = async {
            let response = self.send_authorized(|http| http.get(&url)).await?;
            read_json::<ExtractedResponse>(response).await
        }
        .await;

        match result {
            Ok(response) => response.into_files(),
            Err(e) => {
                tracing::warn!("[API] Failed to load extracted data: {}", e);
                Vec::new()
            }
        }
    }

    /// GET /data/preview/{filename}
    pub async fn preview_stored_file(&self, filename: &str) -> Result<PreviewResponse, ApiError> {
        let url = self.url(&format!("/data/preview/{}", urlencoding::encode(filename)));
        let response = self.send_authorized(|http| http.get(&url)).await?;
        read_json(response).await
    }

    /// DELETE /data/delete?filename=...
    pub async fn delete_file(&self, filename: &str) -> Result<DeleteResponse, ApiError> {
        let url = self.url("/data/delete");
        let response = self
            .send_authorized(|http| http.delete(&url).query(&[("filename", filename)]))
            .await?;
        read_json(response).await
    }

    /// POST /query/ask/all-collections
    pub async fn ask_question(&self, text: &str) -> Result<AskResponse, ApiError> {
        tracing::debug!("[API] Asking question ({} chars)", text.len());
        let url = self.url("/query/ask/all-collections");
        let response = self
            .send_authorized(|http| {
                http.post(&url)
                    .query(&[("query", text)])
                    .json(&AskRequest { query: text })
            })
            .await?;
        read_json(response).await
    }

    /// GET /api/recommended-questions
    pub async fn recommended_questions(
        &self,
        count: usize,
    ) -> Result<Vec<RecommendedQuestion>, ApiError> {
        let url = self.url("/api/recommended-questions");
        let count = count.to_string();
        let response = self
            .send_authorized(|http| http.get(&url).query(&[("count", count.as_str())]))
            .await?;
        let envelope: Envelope<RecommendationsBody> = read_json(response).await?;
        into_body(envelope).map(|body| body.recommendations)
    }

    /// POST /api/suggest-followups
    pub async fn suggest_followups(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<Vec<String>, ApiError> {
        let url = self.url("/api/suggest-followups");
        let response = self
            .send_authorized(|http| {
                http.post(&url).json(&FollowupRequest { question, answer })
            })
            .await?;
        let envelope: Envelope<FollowupBody> = read_json(response).await?;
        into_body(envelope).map(|body| body.suggestions)
    }

    /// GET /api/threads
    pub async fn list_threads(&self) -> Result<Vec<Thread>, ApiError> {
        let url = self.url("/api/threads");
        let response = self.send_authorized(|http| http.get(&url)).await?;
        let envelope: Envelope<ThreadsBody> = read_json(response).await?;
        into_body(envelope).map(|body| body.threads)
    }

    /// GET /api/threads/{id}
    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread, ApiError> {
        let url = self.url(&format!("/api/threads/{}", urlencoding::encode(thread_id)));
        let response = self.send_authorized(|http| http.get(&url)).await?;
        let envelope: Envelope<ThreadBody> = read_json(response).await?;
        let mut thread = into_body(envelope)?
            .thread
            .ok_or_else(|| ApiError::MalformedResponse("Response had no thread".to_string()))?;
        if thread.id.is_empty() {
            thread.id = thread_id.to_string();
        }
        Ok(thread)
    }

    /// POST /api/threads (신규) 또는 PUT /api/threads/{id} (갱신)
    pub async fn save_thread(&self, thread: &Thread, is_new: bool) -> Result<String, ApiError> {
        let response = if is_new {
            let url = self.url("/api/threads");
            self.send_authorized(|http| http.post(&url).json(thread)).await?
        } else {
            let url = self.url(&format!("/api/threads/{}", urlencoding::encode(&thread.id)));
            self.send_authorized(|http| http.put(&url).json(thread)).await?
        };
        let envelope: Envelope<ThreadSavedBody> = read_json(response).await?;
        Ok(into_body(envelope)?
            .thread_id
            .unwrap_or_else(|| thread.id.clone()))
    }

    /// GET /auth/me
    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        let url = self.url("/auth/me");
        let response = self.send_authorized(|http| http.get(&url)).await?;
        read_json(response).await
    }

    /// POST /auth/login (응답에 토큰이 있으면 저장)
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::Login("Invalid email or password".to_string()));
        }

        let login: LoginResponse = read_json(response).await?;
        if let Some(status) = login.status.as_deref() {
            if status != "success" {
                let message = login.message.clone().unwrap_or_else(|| status.to_string());
                return Err(AppError::Login(message));
            }
        }

        if let Some(access_token) = login.access_token.clone() {
            self.tokens.save(&AuthSession {
                access_token,
                refresh_token: login.refresh_token.clone(),
            })?;
        }
        Ok(login)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn preview_files(&self, files: &[UploadFile]) -> Result<PreviewResponse, ApiError> {
        ApiClient::preview_files(self, files).await
    }

    async fn process_files(&self, files: &[UploadFile]) -> Result<ProcessResponse, ApiError> {
        ApiClient::process_files(self, files).await
    }

    async fn get_extracted_data(&self) -> Vec<ExtractedFileData> {
        ApiClient::get_extracted_data(self).await
    }

    async fn ask_question(&self, text: &str) -> Result<AskResponse, ApiError> {
        ApiClient::ask_question(self, text).await
    }

    async fn recommended_questions(
        &self,
        count: usize,
    ) -> Result<Vec<RecommendedQuestion>, ApiError> {
        ApiClient::recommended_questions(self, count).await
    }

    async fn suggest_followups(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<Vec<String>, ApiError> {
        ApiClient::suggest_followups(self, question, answer).await
    }
}

fn file_part(file: &UploadFile) -> Part {
    let part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
    match part.mime_str(file.mime_type()) {
        Ok(part) => part,
        Err(_) => Part::bytes(file.bytes.clone()).file_name(file.name.clone()),
    }
}

fn multipart_form(files: &[UploadFile]) -> Form {
    files
        .iter()
        .fold(Form::new(), |form, file| form.part("files", file_part(file)))
}

/// 성공 응답이면 JSON 파싱, 아니면 상태 코드와 본문으로 에러 생성
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(error_from_status(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

/// `{success: false, error}` 형태를 에러로 변환
fn into_body<T>(envelope: Envelope<T>) -> Result<T, ApiError> {
    if !envelope.success {
        if let Some(error) = envelope.error {
            return Err(ApiError::Server {
                status: 200,
                message: Some(error),
            });
        }
    }
    Ok(envelope.body)
}

/// 에러 본문에서 사용자 메시지 추출 (`detail` → `message` → `error`)
pub(crate) fn extract_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let from_detail = match value.get("detail") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Object(obj)) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(|s| s.to_string()),
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    };

    from_detail
        .or_else(|| value.get("message").and_then(|m| m.as_str()).map(|s| s.to_string()))
        .or_else(|| value.get("error").and_then(|m| m.as_str()).map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
}

pub(crate) fn error_from_status(status: u16, body: &str) -> ApiError {
    let detail = extract_error_detail(body);
    match (status, detail) {
        (400..=499, Some(detail)) => ApiError::Rejected { status, detail },
        (_, message) => ApiError::Server { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string_becomes_rejected() {
        let err = error_from_status(400, r#"{"detail": "No files were provided in the request."}"#);
        assert_eq!(
            err,
            ApiError::Rejected {
                status: 400,
                detail: "No files were provided in the request.".to_string()
            }
        );
    }

    #[test]
    fn test_detail_object_message_is_used() {
        let body = r#"{"detail": {"message": "No valid files could be queued", "errors": []}}"#;
        assert_eq!(
            extract_error_detail(body).as_deref(),
            Some("No valid files could be queued")
        );
    }

    #[test]
    fn test_server_error_without_body_has_no_message() {
        let err = error_from_status(503, "<html>Bad Gateway</html>");
        assert_eq!(err, ApiError::Server { status: 503, message: None });
        assert!(err.user_message().contains("503"));
    }

    #[test]
    fn test_server_error_keeps_error_field() {
        let err = error_from_status(500, r#"{"success": false, "error": "qdrant down"}"#);
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                message: Some("qdrant down".to_string())
            }
        );
    }
}
