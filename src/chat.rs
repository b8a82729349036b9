//! Chat Session
//!
//! 질문/답변 대화 기록을 관리하는 뷰 모델.
//!
//! 사용자 메시지는 `submit`에서 즉시 추가되고, 응답은 `resolve`에서
//! AI 메시지(실패 시 `is_error`)로 추가됩니다. 기록은 되돌리지 않습니다.
//! `reset` 이후 도착한 이전 질문의 응답은 버립니다.

use serde::Serialize;

use crate::api::{AskResponse, Backend};
use crate::error::{ApiError, AppError};
use crate::models::{ChatMessage, RecommendedQuestion, Sender, Thread, ThreadMessage};

pub const WELCOME_MESSAGE: &str =
    "Hi! I'm Chat4BA. Ask me anything about the files you've uploaded.";

/// 추천 질문을 받지 못했을 때 보여줄 기본 질문
pub const FALLBACK_QUESTIONS: [&str; 3] = [
    "What insights can I gain from my data?",
    "Which columns have missing values?",
    "Summarize the key trends in my uploaded files.",
];

pub const FALLBACK_FOLLOWUPS: [&str; 3] = [
    "Can you elaborate on that?",
    "How does this relate to the rest of my data?",
    "What actions should I take based on this information?",
];

/// 스레드 제목 최대 길이
const TITLE_MAX_CHARS: usize = 50;

/// 응답 대기 중인 질문
#[derive(Debug)]
pub struct PendingQuestion {
    epoch: u64,
    question: String,
}

impl PendingQuestion {
    pub fn question(&self) -> &str {
        &self.question
    }
}

pub struct ChatSession {
    messages: Vec<ChatMessage>,
    epoch: u64,
    last_exchange: Option<(String, String)>,
    thread_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        let mut session = Self {
            messages: Vec::new(),
            epoch: 0,
            last_exchange: None,
            thread_id: None,
            created_at: chrono::Utc::now(),
        };
        session.push(Sender::System, WELCOME_MESSAGE.to_string(), false);
        session
    }

    /// 저장된 스레드로 대화 이어가기
    pub fn from_thread(thread: Thread) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            epoch: 0,
            last_exchange: None,
            thread_id: Some(thread.id.clone()).filter(|id| !id.is_empty()),
            created_at: thread.created_at,
        };

        let mut last_question: Option<String> = None;
        for message in thread.messages {
            let sender = match message.role.as_str() {
                "user" => Sender::User,
                "assistant" | "ai" => Sender::Ai,
                _ => Sender::System,
            };
            match sender {
                Sender::User => last_question = Some(message.content.clone()),
                Sender::Ai => {
                    if let Some(question) = last_question.take() {
                        session.last_exchange = Some((question, message.content.clone()));
                    }
                }
                Sender::System => {}
            }
            session.push(sender, message.content, false);
        }
        session
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn set_thread_id(&mut self, thread_id: String) {
        self.thread_id = Some(thread_id);
    }

    /// 마지막으로 답변을 받은 질문/답변 쌍
    pub fn last_exchange(&self) -> Option<(&str, &str)> {
        self.last_exchange
            .as_ref()
            .map(|(q, a)| (q.as_str(), a.as_str()))
    }

    fn push(&mut self, sender: Sender, content: String, is_error: bool) -> &ChatMessage {
        let now = chrono::Utc::now().timestamp_millis();
        let timestamp = self
            .messages
            .last()
            .map(|m| m.timestamp.max(now))
            .unwrap_or(now);

        self.messages.push(ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            content,
            is_error,
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// 사용자 메시지를 바로 추가하고 응답 대기표 반환
    pub fn submit(&mut self, text: &str) -> Result<PendingQuestion, AppError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(AppError::InvalidOperation("Question is empty".to_string()));
        }

        self.push(Sender::User, question.to_string(), false);
        Ok(PendingQuestion {
            epoch: self.epoch,
            question: question.to_string(),
        })
    }

    /// 응답을 AI 메시지로 추가. 대화가 초기화된 뒤의 응답이면 None
    pub fn resolve(
        &mut self,
        ticket: PendingQuestion,
        result: Result<AskResponse, ApiError>,
    ) -> Option<&ChatMessage> {
        if ticket.epoch != self.epoch {
            tracing::debug!("[Chat] Discarding response for a reset conversation");
            return None;
        }

        match result {
            Ok(response) => {
                let mut content = response.answer.clone();
                if !response.sources.is_empty() {
                    content.push_str("\n\nSources: ");
                    content.push_str(&response.sources.join(", "));
                }
                self.last_exchange = Some((ticket.question, response.answer));
                Some(self.push(Sender::Ai, content, false))
            }
            Err(e) => {
                tracing::warn!("[Chat] Question failed: {}", e);
                let content = format!("Sorry, I couldn't answer that. {}", e.user_message());
                Some(self.push(Sender::Ai, content, true))
            }
        }
    }

    /// submit + 백엔드 질의 + resolve
    pub async fn send(
        &mut self,
        backend: &dyn Backend,
        text: &str,
    ) -> Result<Option<ChatMessage>, AppError> {
        let ticket = self.submit(text)?;
        let result = backend.ask_question(ticket.question()).await;
        Ok(self.resolve(ticket, result).cloned())
    }

    /// 새 대화 시작 (진행 중이던 질문의 응답은 무시됨)
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.messages.clear();
        self.last_exchange = None;
        self.thread_id = None;
        self.created_at = chrono::Utc::now();
        self.push(Sender::System, WELCOME_MESSAGE.to_string(), false);
    }

    /// 저장용 스레드로 변환 (환영 메시지 제외)
    pub fn to_thread(&self, title: Option<&str>, associated_files: &[String]) -> Thread {
        let messages: Vec<ThreadMessage> = self
            .messages
            .iter()
            .filter(|m| m.sender != Sender::System)
            .map(|m| ThreadMessage {
                role: m.sender.role().to_string(),
                content: m.content.clone(),
                timestamp: chrono::DateTime::from_timestamp_millis(m.timestamp),
            })
            .collect();

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.default_title());

        Thread {
            id: self
                .thread_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            title,
            messages,
            created_at: self.created_at,
            updated_at: chrono::Utc::now(),
            associated_files: associated_files.to_vec(),
        }
    }

    fn default_title(&self) -> String {
        let first_question = self
            .messages
            .iter()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.content.as_str());

        match first_question {
            Some(question) if question.chars().count() > TITLE_MAX_CHARS => {
                let truncated: String = question.chars().take(TITLE_MAX_CHARS).collect();
                format!("{}...", truncated.trim_end())
            }
            Some(question) => question.to_string(),
            None => "New conversation".to_string(),
        }
    }
}

/// 추천 질문 + 후속 질문
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestions {
    pub recommended: Vec<RecommendedQuestion>,
    pub followups: Vec<String>,
    /// 기본 목록으로 대체되었는지
    pub fallback: bool,
}

/// 추천/후속 질문을 동시에 조회. 실패하거나 비어 있으면 기본 목록 사용
pub async fn load_suggestions(
    backend: &dyn Backend,
    count: usize,
    last_exchange: Option<(&str, &str)>,
) -> Suggestions {
    let recommended_fut = backend.recommended_questions(count);
    let followups_fut = async {
        match last_exchange {
            Some((question, answer)) => Some(backend.suggest_followups(question, answer).await),
            None => None,
        }
    };

    let (recommended, followups) = futures::join!(recommended_fut, followups_fut);
    let mut fallback = false;

    let recommended = match recommended {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => {
            fallback = true;
            fallback_questions(count)
        }
        Err(e) => {
            tracing::warn!("[Chat] Recommended questions unavailable: {}", e);
            fallback = true;
            fallback_questions(count)
        }
    };

    let followups = match followups {
        None => Vec::new(),
        Some(Ok(list)) if !list.is_empty() => list,
        Some(Ok(_)) => {
            fallback = true;
            FALLBACK_FOLLOWUPS.iter().map(|s| s.to_string()).collect()
        }
        Some(Err(e)) => {
            tracing::warn!("[Chat] Follow-up suggestions unavailable: {}", e);
            fallback = true;
            FALLBACK_FOLLOWUPS.iter().map(|s| s.to_string()).collect()
        }
    };

    Suggestions {
        recommended,
        followups,
        fallback,
    }
}

fn fallback_questions(count: usize) -> Vec<RecommendedQuestion> {
    FALLBACK_QUESTIONS
        .iter()
        .take(count.max(1))
        .map(|q| RecommendedQuestion {
            question: q.to_string(),
            context: String::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PreviewResponse, ProcessResponse, UploadFile};
    use crate::models::ExtractedFileData;
    use async_trait::async_trait;

    struct FakeBackend {
        answer: Result<AskResponse, ApiError>,
        suggestions_fail: bool,
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn preview_files(&self, _files: &[UploadFile]) -> Result<PreviewResponse, ApiError> {
            Ok(PreviewResponse::default())
        }

        async fn process_files(&self, _files: &[UploadFile]) -> Result<ProcessResponse, ApiError> {
            Err(ApiError::Network("unused".into()))
        }

        async fn get_extracted_data(&self) -> Vec<ExtractedFileData> {
            Vec::new()
        }

        async fn ask_question(&self, _text: &str) -> Result<AskResponse, ApiError> {
            self.answer.clone()
        }

        async fn recommended_questions(
            &self,
            _count: usize,
        ) -> Result<Vec<RecommendedQuestion>, ApiError> {
            if self.suggestions_fail {
                Err(ApiError::Server { status: 500, message: None })
            } else {
                Ok(vec![RecommendedQuestion {
                    question: "Top customers?".into(),
                    context: "orders.csv".into(),
                }])
            }
        }

        async fn suggest_followups(&self, _q: &str, _a: &str) -> Result<Vec<String>, ApiError> {
            if self.suggestions_fail {
                Err(ApiError::Network("down".into()))
            } else {
                Ok(vec!["And by region?".into()])
            }
        }
    }

    fn answering(answer: &str) -> FakeBackend {
        FakeBackend {
            answer: Ok(AskResponse {
                answer: answer.to_string(),
                sources: vec!["orders.csv".into()],
            }),
            suggestions_fail: false,
        }
    }

    #[test]
    fn test_submit_appends_user_message_immediately() {
        let mut session = ChatSession::new();
        let ticket = session.submit("  total sales?  ").unwrap();

        let last = session.messages().last().unwrap();
        assert_eq!(last.sender, Sender::User);
        assert_eq!(last.content, "total sales?");
        assert_eq!(ticket.question(), "total sales?");
    }

    #[test]
    fn test_empty_question_is_rejected() {
        let mut session = ChatSession::new();
        assert!(session.submit("   ").is_err());
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_appends_exactly_one_error_entry() {
        let backend = FakeBackend {
            answer: Err(ApiError::Rejected {
                status: 422,
                detail: "Question too long".into(),
            }),
            suggestions_fail: false,
        };
        let mut session = ChatSession::new();
        let before = session.messages().len();

        let reply = session.send(&backend, "why?").await.unwrap().unwrap();

        assert_eq!(session.messages().len(), before + 2);
        assert_eq!(session.messages()[before].sender, Sender::User);
        assert!(reply.is_error);
        assert_eq!(reply.sender, Sender::Ai);
        assert!(reply.content.contains("Question too long"));
        assert_eq!(session.messages().iter().filter(|m| m.is_error).count(), 1);
        assert!(session.last_exchange().is_none());
    }

    #[tokio::test]
    async fn test_success_records_answer_with_sources() {
        let mut session = ChatSession::new();
        let reply = session
            .send(&answering("Revenue was 42."), "revenue?")
            .await
            .unwrap()
            .unwrap();

        assert!(!reply.is_error);
        assert_eq!(reply.content, "Revenue was 42.\n\nSources: orders.csv");
        assert_eq!(session.last_exchange(), Some(("revenue?", "Revenue was 42.")));
        let stamps: Vec<i64> = session.messages().iter().map(|m| m.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_response_after_reset_is_discarded() {
        let mut session = ChatSession::new();
        let ticket = session.submit("old question").unwrap();
        session.reset();

        let result = session.resolve(
            ticket,
            Ok(AskResponse {
                answer: "late".into(),
                sources: Vec::new(),
            }),
        );

        assert!(result.is_none());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].content, WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn test_suggestion_failure_uses_fallback() {
        let backend = FakeBackend {
            answer: Err(ApiError::Network("unused".into())),
            suggestions_fail: true,
        };
        let suggestions = load_suggestions(&backend, 5, Some(("q", "a"))).await;

        assert!(suggestions.fallback);
        assert_eq!(suggestions.recommended.len(), FALLBACK_QUESTIONS.len());
        assert_eq!(suggestions.followups.len(), FALLBACK_FOLLOWUPS.len());
    }

    #[tokio::test]
    async fn test_suggestions_without_exchange_skip_followups() {
        let suggestions = load_suggestions(&answering("x"), 5, None).await;
        assert!(!suggestions.fallback);
        assert_eq!(suggestions.recommended[0].question, "Top customers?");
        assert!(suggestions.followups.is_empty());
    }

    #[tokio::test]
    async fn test_to_thread_maps_roles_and_title() {
        let mut session = ChatSession::new();
        session.send(&answering("Yes."), "Is churn rising?").await.unwrap();

        let thread = session.to_thread(None, &["orders.csv".to_string()]);
        assert_eq!(thread.title, "Is churn rising?");
        let roles: Vec<&str> = thread.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant"]);
        assert_eq!(thread.associated_files, vec!["orders.csv"]);

        let resumed = ChatSession::from_thread(thread);
        assert_eq!(resumed.messages().len(), 2);
        assert_eq!(resumed.last_exchange().map(|(q, _)| q), Some("Is churn rising?"));
    }

    #[test]
    fn test_new_session_thread_gets_fresh_id() {
        let session = ChatSession::new();
        let first = session.to_thread(Some("Churn"), &[]);
        let second = session.to_thread(Some("Churn"), &[]);
        assert!(uuid::Uuid::parse_str(&first.id).is_ok());
        assert_ne!(first.id, second.id);

        let mut saved = ChatSession::new();
        saved.set_thread_id("thread-42".to_string());
        assert_eq!(saved.to_thread(None, &[]).id, "thread-42");
    }
}
