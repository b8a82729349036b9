//! Thread Commands
//!
//! 백엔드에 저장된 대화 스레드 조회/저장

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::chat::ChatSession;
use crate::error::{CommandError, CommandResult};
use crate::models::Thread;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadIdArgs {
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Thread> for ThreadSummary {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id.clone(),
            title: thread.title.clone(),
            message_count: thread.messages.len(),
            updated_at: thread.updated_at,
        }
    }
}

pub async fn list_threads(state: &AppState) -> CommandResult<Vec<ThreadSummary>> {
    let threads = state.api.list_threads().await?;
    Ok(threads.iter().map(ThreadSummary::from).collect())
}

pub async fn show_thread(args: ThreadIdArgs, state: &AppState) -> CommandResult<Thread> {
    Ok(state.api.get_thread(&args.thread_id).await?)
}

/// 현재 세션을 스레드로 저장 (처음이면 생성, 이후 갱신)
pub async fn save_session(
    session: &mut ChatSession,
    title: Option<&str>,
    state: &AppState,
) -> CommandResult<String> {
    let files: Vec<String> = state
        .registry
        .list()
        .map_err(CommandError::from)?
        .into_iter()
        .map(|f| f.name)
        .collect();

    let thread = session.to_thread(title, &files);
    let is_new = session.thread_id().is_none();
    let thread_id = state.api.save_thread(&thread, is_new).await?;
    session.set_thread_id(thread_id.clone());

    tracing::info!("[Threads] Saved thread {} ({} messages)", thread_id, thread.messages.len());
    Ok(thread_id)
}
