use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use qachat_types::{ChatTurn, Page, Role, INLINE_TURNS};

use crate::app::setup::{build_controller, AppConfig};
use crate::session::{NoticeKind, SessionContext, SessionController, SessionError};

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Signup,
    Login(Option<String>),
    Logout,
    /// Show the last N turns, or all of them
    History(Option<usize>),
    Retry,
    Help,
    Quit,
    Ask(String),
    Unknown(String),
    Empty,
}

pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    if !line.starts_with('/') {
        return ReplCommand::Ask(line.to_string());
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match command {
        "/signup" => ReplCommand::Signup,
        "/login" => ReplCommand::Login(arg.map(str::to_string)),
        "/logout" => ReplCommand::Logout,
        "/history" => match arg {
            None => ReplCommand::History(None),
            Some(n) => match n.parse() {
                Ok(n) => ReplCommand::History(Some(n)),
                Err(_) => ReplCommand::Unknown(line.to_string()),
            },
        },
        "/retry" => ReplCommand::Retry,
        "/help" | "/?" => ReplCommand::Help,
        "/quit" | "/exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// A turn as printed in the terminal
pub fn format_turn(turn: &ChatTurn) -> String {
    match turn.role {
        Role::User => format!("👤 {}: {}", turn.role.display_name(), turn.text),
        Role::Assistant => format!("🤖 {}: {}", turn.role.display_name(), turn.text),
    }
}

fn print_help() {
    println!("{}", "Commands:".bright_cyan());
    println!("  /signup          - Create a new account");
    println!("  /login [name]    - Log in");
    println!("  /logout          - Log out");
    println!("  /history [n]     - Show your history, newest first");
    println!("  /retry           - Resend the last question that failed");
    println!("  /help            - Show this help");
    println!("  /quit            - Exit");
    println!("{}", "Anything else is sent as a question once you are logged in.".bright_black());
}

fn print_error(err: &SessionError) {
    match err {
        SessionError::EmptyInput => println!("{} {}", "💡".bright_yellow(), err),
        SessionError::Completion(_) => {
            eprintln!("{} {}", "❌".bright_red(), err);
            println!("{} Type /retry to ask again", "💡".bright_yellow());
        }
        _ => eprintln!("{} {}", "❌".bright_red(), err),
    }
}

fn print_notice(ctx: &mut SessionContext) {
    if let Some(notice) = ctx.take_notice() {
        match notice.kind {
            NoticeKind::Success => println!("{} {}", "✓".green(), notice.text),
            NoticeKind::Info => println!("{} {}", "💡".bright_yellow(), notice.text),
            NoticeKind::Error => eprintln!("{} {}", "❌".bright_red(), notice.text),
        }
    }
}

/// Ask for one field; `None` when the user cancels with Ctrl-C or Ctrl-D
fn prompt_field(rl: &mut DefaultEditor, label: &str) -> Result<Option<String>> {
    match rl.readline(&format!("{} ", label.bright_cyan())) {
        Ok(value) => Ok(Some(value)),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn sign_up(
    rl: &mut DefaultEditor,
    controller: &mut SessionController,
    ctx: &mut SessionContext,
) -> Result<()> {
    if let Err(e) = controller.show_signup(ctx) {
        print_error(&e);
        return Ok(());
    }
    println!("{}", "Create a New Account".bright_cyan().bold());

    let Some(username) = prompt_field(rl, "Choose a Username:")? else {
        controller.show_login(ctx).ok();
        return Ok(());
    };
    let Some(email) = prompt_field(rl, "Your Email:")? else {
        controller.show_login(ctx).ok();
        return Ok(());
    };
    let Some(password) = prompt_field(rl, "Create a Password (visible):")? else {
        controller.show_login(ctx).ok();
        return Ok(());
    };

    match controller.sign_up(ctx, &username, &email, &password).await {
        Ok(_) => print_notice(ctx),
        Err(e) => {
            print_error(&e);
            controller.show_login(ctx).ok();
        }
    }
    Ok(())
}

async fn login(
    rl: &mut DefaultEditor,
    controller: &mut SessionController,
    ctx: &mut SessionContext,
    username: Option<String>,
) -> Result<()> {
    if let Err(e) = controller.show_login(ctx) {
        print_error(&e);
        return Ok(());
    }

    let username = match username {
        Some(name) => name,
        None => match prompt_field(rl, "Username:")? {
            Some(name) => name,
            None => return Ok(()),
        },
    };
    let Some(password) = prompt_field(rl, "Password (visible):")? else {
        return Ok(());
    };

    match controller.login(ctx, &username, &password).await {
        Ok(()) => {
            let name = ctx.username().unwrap_or_default();
            println!("{} Welcome, {}!", "✓".green(), name.bright_white().bold());
            let history = ctx.current_history();
            if !history.is_empty() {
                println!(
                    "{}",
                    format!("{} turns in your history; /history shows them", history.len()).bright_black()
                );
                for turn in history.iter().take(INLINE_TURNS) {
                    println!("{}", format_turn(turn));
                }
            }
        }
        Err(e) => print_error(&e),
    }
    Ok(())
}

fn show_history(controller: &SessionController, ctx: &mut SessionContext, limit: Option<usize>) {
    match controller.history(ctx) {
        Ok(turns) if turns.is_empty() => println!("{}", "No history yet.".bright_black()),
        Ok(turns) => {
            let limit = limit.unwrap_or(turns.len());
            for turn in turns.iter().take(limit) {
                println!("{}", format_turn(turn));
            }
        }
        Err(e) => print_error(&e),
    }
}

async fn ask(controller: &mut SessionController, ctx: &mut SessionContext, question: Option<&str>) {
    println!("{}", "Thinking...".bright_black());
    let result = match question {
        Some(question) => controller.submit(ctx, question).await,
        None => controller.retry(ctx).await,
    };
    match result {
        Ok(reply) => println!("{}", format_turn(&ChatTurn::assistant(reply))),
        Err(e) => print_error(&e),
    }
}

/// Run interactive REPL mode
pub async fn run_repl_mode(config: &AppConfig) -> Result<()> {
    println!("{}", "💬 qachat - Q&A with a hosted language model".bright_cyan().bold());
    println!(
        "{}",
        format!(
            "Model: {} ({}) • Data directory: {}",
            config.client_options.model,
            config.backend.display_name(),
            config.paths.data_dir.display()
        )
        .bright_black()
    );
    println!("{}", "Type /help for commands, /quit to exit\n".bright_black());

    let mut controller = build_controller(config).await?;
    let mut ctx = SessionContext::new();
    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = match (ctx.username(), ctx.page()) {
            (Some(name), _) => format!("{} ", format!("{}>", name).bright_green().bold()),
            (None, Some(Page::Signup)) => format!("{} ", "signup>".bright_magenta()),
            (None, _) => format!("{} ", "qachat>".bright_magenta()),
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let command = parse_command(&line);
                if !matches!(command, ReplCommand::Empty) {
                    let _ = rl.add_history_entry(line.trim());
                }

                match command {
                    ReplCommand::Empty => continue,
                    ReplCommand::Quit => {
                        println!("{}", "Goodbye!".bright_cyan());
                        break;
                    }
                    ReplCommand::Help => print_help(),
                    ReplCommand::Signup => sign_up(&mut rl, &mut controller, &mut ctx).await?,
                    ReplCommand::Login(name) => login(&mut rl, &mut controller, &mut ctx, name).await?,
                    ReplCommand::Logout => match controller.logout(&mut ctx).await {
                        Ok(()) => println!("{} Logged out", "✓".green()),
                        Err(e) => print_error(&e),
                    },
                    ReplCommand::History(limit) => show_history(&controller, &mut ctx, limit),
                    ReplCommand::Retry => ask(&mut controller, &mut ctx, None).await,
                    ReplCommand::Ask(question) => {
                        if ctx.is_authenticated() {
                            ask(&mut controller, &mut ctx, Some(&question)).await;
                        } else {
                            println!("{} Log in first: /login, or /signup for a new account", "💡".bright_yellow());
                        }
                    }
                    ReplCommand::Unknown(text) => {
                        eprintln!("{} Unknown command: {} (try /help)", "❌".bright_red(), text);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".bright_black());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {}", "Error:".bright_red().bold(), err);
                break;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
