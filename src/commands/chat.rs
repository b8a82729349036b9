//! Chat Commands
//!
//! 단발 질문, 추천/후속 질문 조회

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::chat::{load_suggestions, ChatSession, Suggestions};
use crate::error::{AppError, CommandResult};
use crate::models::ChatMessage;

/// 추천 질문 기본 개수
pub const DEFAULT_SUGGESTION_COUNT: usize = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskArgs {
    pub question: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsArgs {
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    pub question: ChatMessage,
    pub answer: ChatMessage,
}

/// 새 세션에서 질문 하나를 보내고 응답 메시지 반환
pub async fn ask(args: AskArgs, state: &AppState) -> CommandResult<AskResult> {
    let mut session = ChatSession::new();
    let answer = session
        .send(state.api.as_ref(), &args.question)
        .await?
        .ok_or_else(|| AppError::InvalidOperation("Conversation was reset".to_string()))?;

    let question = session
        .messages()
        .iter()
        .rev()
        .find(|m| m.sender == crate::models::Sender::User)
        .cloned()
        .ok_or_else(|| AppError::InvalidOperation("Question was not recorded".to_string()))?;

    Ok(AskResult { question, answer })
}

/// 세션에서 질문 하나 보내기 (대화형 모드용)
pub async fn send_in_session(
    session: &mut ChatSession,
    question: &str,
    state: &AppState,
) -> CommandResult<Option<ChatMessage>> {
    Ok(session.send(state.api.as_ref(), question).await?)
}

pub async fn suggestions(
    args: SuggestionsArgs,
    session: Option<&ChatSession>,
    state: &AppState,
) -> CommandResult<Suggestions> {
    let count = args.count.unwrap_or(DEFAULT_SUGGESTION_COUNT);
    let last_exchange = session.and_then(|s| s.last_exchange());
    Ok(load_suggestions(state.api.as_ref(), count, last_exchange).await)
}
