//! Terminal front end
//!
//! clap 서브커맨드를 명령 함수로 연결하고 결과를 출력합니다.
//! `--json`이면 결과를 JSON으로, 아니면 사람이 읽는 형식으로 출력합니다.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::ChatSession;
use crate::commands::{self, AppState};
use crate::error::{AppError, CommandError, CommandResult};
use crate::models::{ChatMessage, Sender};
use crate::notify::Route;

#[derive(Debug, Parser)]
#[command(
    name = "chat4ba",
    version,
    about = "Upload business data, model it as a schema grid, and ask questions about it"
)]
pub struct Cli {
    /// 백엔드 주소 (CHAT4BA_API_URL 대신)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// 로컬 저장소 디렉터리 (CHAT4BA_DATA_DIR 대신)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// 로그 상세도 (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 결과를 JSON으로 출력
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in (browser SSO by default)
    Login {
        #[arg(long, requires = "password", conflicts_with_all = ["sso", "redirect_url"])]
        email: Option<String>,
        #[arg(long, requires = "email")]
        password: Option<String>,
        /// SSO provider: google or microsoft
        #[arg(long, conflicts_with = "redirect_url")]
        sso: Option<String>,
        /// Paste the URL the browser was redirected to after SSO
        #[arg(long)]
        redirect_url: Option<String>,
    },
    /// Forget stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Upload and process files
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        skip_preview: bool,
    },
    /// Preview a local CSV/Excel file without uploading it
    Inspect {
        path: PathBuf,
        #[arg(long, default_value_t = commands::files::DEFAULT_PREVIEW_ROWS)]
        rows: usize,
    },
    /// Manage uploaded files
    Files {
        #[command(subcommand)]
        action: FilesCommand,
    },
    /// Show data extracted by the backend
    Extracted,
    /// Show the schema grid of uploaded tables
    Schema {
        /// Only show these files/tables
        #[arg(long)]
        only: Vec<String>,
    },
    /// Ask a single question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Interactive chat (/new, /save [title], /suggest, /quit)
    Chat {
        /// Continue a saved thread
        #[arg(long)]
        thread: Option<String>,
    },
    /// Show recommended questions
    Suggestions {
        #[arg(long)]
        count: Option<usize>,
    },
    /// Saved conversation threads
    Threads {
        #[command(subcommand)]
        action: ThreadsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    List,
    Delete { name: String },
    Preview { name: String },
}

#[derive(Debug, Subcommand)]
pub enum ThreadsCommand {
    List,
    Show { id: String },
}

/// 결과 출력 (JSON 또는 사람이 읽는 형식)
fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> CommandResult<()> {
    if json {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| CommandError::from(AppError::Serialization(e)))?;
        println!("{}", text);
    } else {
        human(value);
    }
    Ok(())
}

pub async fn execute(cli: Cli, state: &AppState) -> CommandResult<()> {
    let json = cli.json;

    match cli.command {
        Command::Login {
            email,
            password,
            sso,
            redirect_url,
        } => {
            let result = match (email, password, redirect_url) {
                (Some(email), Some(password), _) => {
                    commands::auth::login_with_password(
                        commands::auth::PasswordLoginArgs { email, password },
                        state,
                    )
                    .await?
                }
                (_, _, Some(redirect_url)) => commands::auth::login_with_redirect(
                    commands::auth::RedirectLoginArgs { redirect_url },
                    state,
                )?,
                _ => {
                    let provider = sso.unwrap_or_else(|| "google".to_string());
                    commands::auth::login_with_sso(commands::auth::SsoLoginArgs { provider }, state)
                        .await?
                }
            };
            emit(json, &result, |_| {})
        }

        Command::Logout => commands::auth::logout(state),

        Command::Whoami => {
            let user = commands::auth::whoami(state).await?;
            emit(json, &user, |u| {
                println!("{}", u.email);
                if let Some(role) = &u.role {
                    println!("role: {}", role);
                }
            })
        }

        Command::Upload { paths, skip_preview } => {
            let summary = commands::files::upload_files(
                commands::files::UploadFilesArgs { paths, skip_preview },
                state,
            )
            .await?;
            emit(json, &summary, |s| {
                if let Some(preview) = &s.preview {
                    for entry in &preview.files {
                        let first = entry.preview.first().map(|c| c.content.as_str()).unwrap_or("");
                        println!("{} ({:?})", entry.filename, entry.status);
                        if !first.is_empty() {
                            println!("  {}", truncate(first, 200));
                        }
                    }
                }
                for file in &s.recorded {
                    println!(
                        "{} {}  {}",
                        file.kind.icon(),
                        file.name,
                        file.size.as_deref().unwrap_or("")
                    );
                }
            })
        }

        Command::Inspect { path, rows } => inspect(path, rows, json),

        Command::Files { action } => match action {
            FilesCommand::List => {
                let files = commands::files::list_files(state)?;
                emit(json, &files, |files| {
                    if files.is_empty() {
                        println!("No files uploaded yet.");
                    }
                    for f in files {
                        println!(
                            "{} {:<32} {:>10}  {}",
                            f.kind.icon(),
                            f.name,
                            f.size.as_deref().unwrap_or("-"),
                            f.timestamp
                        );
                    }
                })
            }
            FilesCommand::Delete { name } => {
                let removed = commands::files::delete_file(
                    commands::files::FileNameArgs { file_name: name },
                    state,
                )
                .await?;
                emit(json, &removed, |_| {})
            }
            FilesCommand::Preview { name } => {
                let preview = commands::files::preview_stored_file(
                    commands::files::FileNameArgs { file_name: name },
                    state,
                )
                .await?;
                emit(json, &preview, |p| {
                    for entry in &p.files {
                        println!("{} ({:?})", entry.filename, entry.status);
                        if let Some(error) = &entry.error {
                            println!("  error: {}", error);
                        }
                        for chunk in &entry.preview {
                            println!("  {}", truncate(&chunk.content, 200));
                        }
                    }
                })
            }
        },

        Command::Extracted => {
            let data = commands::files::list_extracted(state).await?;
            emit(json, &data, |data| {
                if data.is_empty() {
                    println!("No extracted data available.");
                }
                for file in data {
                    println!(
                        "{}: {} rows x {} columns",
                        file.file_name, file.metadata.row_count, file.metadata.column_count
                    );
                }
            })
        }

        Command::Schema { only } => {
            let view = commands::schema::build_schema_grid(
                commands::schema::SchemaGridArgs { only },
                state,
            )
            .await?;
            if json {
                return emit(true, &view.layout, |_| {});
            }
            if view.blocks.is_empty() {
                println!("No tables to show. Upload CSV or Excel files first.");
            }
            for block in &view.blocks {
                println!("{}\n", block);
            }
            for c in &view.layout.connectors {
                println!("{}.{} -> {}.{}", c.from_schema, c.from_field, c.to_schema, c.to_field);
            }
            Ok(())
        }

        Command::Ask { question } => {
            let result = commands::chat::ask(
                commands::chat::AskArgs {
                    question: question.join(" "),
                },
                state,
            )
            .await?;
            emit(json, &result, |r| print_message(&r.answer))?;
            answer_status(&result.answer)
        }

        Command::Chat { thread } => run_chat(thread, state).await,

        Command::Suggestions { count } => {
            let suggestions = commands::chat::suggestions(
                commands::chat::SuggestionsArgs { count },
                None,
                state,
            )
            .await?;
            emit(json, &suggestions, |s| {
                for (i, q) in s.recommended.iter().enumerate() {
                    println!("{}. {}", i + 1, q.question);
                }
            })
        }

        Command::Threads { action } => match action {
            ThreadsCommand::List => {
                let threads = commands::threads::list_threads(state).await?;
                emit(json, &threads, |threads| {
                    if threads.is_empty() {
                        println!("No saved threads.");
                    }
                    for t in threads {
                        println!(
                            "{:<24} {:<40} {:>3} msgs  {}",
                            t.id,
                            truncate(&t.title, 40),
                            t.message_count,
                            t.updated_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                })
            }
            ThreadsCommand::Show { id } => {
                let thread = commands::threads::show_thread(
                    commands::threads::ThreadIdArgs { thread_id: id },
                    state,
                )
                .await?;
                emit(json, &thread, |t| {
                    println!("# {}", t.title);
                    for m in &t.messages {
                        println!("[{}] {}", m.role, m.content);
                    }
                })
            }
        },
    }
}

/// 로컬 파일 미리보기 (저장소/백엔드 불필요)
pub fn inspect(path: PathBuf, rows: usize, json: bool) -> CommandResult<()> {
    let preview = commands::files::inspect_file(commands::files::InspectFileArgs {
        path,
        max_rows: Some(rows),
    })?;
    emit(json, &preview, |p| {
        match &p.sheet {
            Some(sheet) => println!("{} [{}] ({} rows)", p.file_name, sheet, p.total_rows),
            None => println!("{} ({} rows)", p.file_name, p.total_rows),
        }
        println!("{}", p.headers.join(" | "));
        for row in &p.rows {
            println!("{}", row.join(" | "));
        }
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

fn print_message(message: &ChatMessage) {
    match (message.sender, message.is_error) {
        (_, true) => eprintln!("! {}", message.content),
        (Sender::User, _) => println!("you> {}", message.content),
        (Sender::Ai, _) => println!("{}", message.content),
        (Sender::System, _) => println!("-- {}", message.content),
    }
}

/// 대화형 채팅 루프
/// 오류 응답이면 종료 코드가 실패가 되도록 에러 반환
fn answer_status(answer: &ChatMessage) -> CommandResult<()> {
    if !answer.is_error {
        return Ok(());
    }
    Err(CommandError {
        code: "ANSWER_FAILED".to_string(),
        message: "The question could not be answered".to_string(),
        details: Some(answer.content.clone()),
    })
}

async fn run_chat(thread: Option<String>, state: &AppState) -> CommandResult<()> {
    let mut session = match thread {
        Some(thread_id) => {
            let thread = commands::threads::show_thread(
                commands::threads::ThreadIdArgs { thread_id },
                state,
            )
            .await?;
            ChatSession::from_thread(thread)
        }
        None => ChatSession::new(),
    };
    state.navigator.navigate(Route::Chat);

    for message in session.messages() {
        print_message(message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CommandError::from(AppError::Io(e)))?
        else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').map(|(c, rest)| (c, rest.trim())).unwrap_or((line, "")) {
            ("/quit", _) | ("/exit", _) => break,
            ("/new", _) => {
                session.reset();
                for message in session.messages() {
                    print_message(message);
                }
            }
            ("/save", title) => {
                let title = Some(title).filter(|t| !t.is_empty());
                match commands::threads::save_session(&mut session, title, state).await {
                    Ok(id) => println!("-- Saved as thread {}", id),
                    Err(e) => eprintln!("! {}", e),
                }
            }
            ("/suggest", _) => {
                match commands::chat::suggestions(
                    commands::chat::SuggestionsArgs::default(),
                    Some(&session),
                    state,
                )
                .await
                {
                    Ok(s) => {
                        for q in &s.recommended {
                            println!("  * {}", q.question);
                        }
                        for f in &s.followups {
                            println!("  > {}", f);
                        }
                    }
                    Err(e) => eprintln!("! {}", e),
                }
            }
            _ => match commands::chat::send_in_session(&mut session, line, state).await {
                Ok(Some(reply)) => print_message(&reply),
                Ok(None) => {}
                Err(e) => eprintln!("! {}", e),
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["chat4ba", "ask", "top", "customers", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Ask { question } => assert_eq!(question.join(" "), "top customers"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_login_email_requires_password() {
        assert!(Cli::try_parse_from(["chat4ba", "login", "--email", "a@b.c"]).is_err());
        assert!(Cli::try_parse_from(["chat4ba", "login", "--sso", "microsoft"]).is_ok());
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("안녕하세요", 2), "안녕...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_error_answer_fails_the_command() {
        let mut answer = ChatMessage {
            id: "m1".to_string(),
            sender: Sender::Ai,
            content: "Revenue was 1,200.".to_string(),
            is_error: false,
            timestamp: 0,
        };
        assert!(answer_status(&answer).is_ok());

        answer.is_error = true;
        answer.content = "Sorry, I couldn't answer that. Backend unavailable".to_string();
        let err = answer_status(&answer).unwrap_err();
        assert_eq!(err.code, "ANSWER_FAILED");
        assert_eq!(err.details.as_deref(), Some(answer.content.as_str()));
    }
}
