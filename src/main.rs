mod tui;

use std::io::Read;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mailpilot::ai::GeminiClient;
use mailpilot::analyzer::Analyzer;
use mailpilot::auth;
use mailpilot::calendar::{self, CalendarClient, MeetingRequest};
use mailpilot::config::Config;
use mailpilot::email::{Email, EmailAnalysisResult};
use mailpilot::gmail::{DEFAULT_ARCHIVE_LABEL, GmailClient};
use mailpilot::Error;

use crate::tui::{Action, ReplyAction, SessionStats, Tui};

#[derive(Parser)]
#[command(name = "mailpilot")]
#[command(about = "Gmail triage with AI summaries, labels, replies and meeting scheduling")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Maximum number of emails to triage
    #[arg(short = 'n', long, default_value = "20")]
    max_emails: u32,

    /// Include read emails too
    #[arg(short = 'a', long)]
    all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with Google in the browser
    Login,
    /// Forget stored Google credentials
    Logout,
    /// Print the signed-in Gmail address
    Whoami,
    /// Show configuration and sign-in status
    Status,
    /// Set a configuration value
    Config {
        /// gmail.client_id, gmail.client_secret, ai.api_key, ai.model, ai.timeout_secs or calendar.timezone
        key: String,
        value: String,
    },
    /// List emails as JSON
    Emails {
        #[arg(long, default_value = "INBOX")]
        label: String,
        #[arg(short = 'n', long, default_value = "20")]
        max: u32,
        /// Only unread emails
        #[arg(long)]
        unread: bool,
    },
    /// List Gmail labels
    Labels,
    /// Analyze an email and print the result as JSON
    Analyze {
        /// Gmail message id
        #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
        id: Option<String>,
        /// Read the email text from standard input instead
        #[arg(long)]
        stdin: bool,
    },
    /// Reply to an email in its thread
    Reply { id: String, text: String },
    /// Label an email and remove it from the inbox
    Archive {
        id: String,
        #[arg(long, default_value = DEFAULT_ARCHIVE_LABEL)]
        label: String,
    },
    /// Apply a label, creating it if needed
    Label { id: String, name: String },
    /// Move an email to the trash
    Trash { id: String },
    /// Mark an email as read
    MarkRead { id: String },
    /// Create a calendar event after checking for conflicts
    Meeting {
        #[arg(long)]
        title: String,
        /// YYYY-MM-DDTHH:MM in the configured time zone, or RFC 3339
        #[arg(long)]
        start: String,
        /// Minutes; defaults to calendar.default_duration_minutes
        #[arg(long)]
        duration: Option<u32>,
        #[arg(long = "attendee")]
        attendees: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 2 asks the caller to sign in again, 3 reports a busy calendar slot.
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<Error>() {
        Some(Error::ReauthRequired) => 2,
        Some(Error::MeetingConflict(_)) => 3,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Some(Commands::Login) => {
            auth::login(&config).await?;
            println!("✅ Signed in");
        }
        Some(Commands::Logout) => {
            if auth::logout()? {
                println!("👋 Signed out");
            } else {
                println!("Not signed in");
            }
        }
        Some(Commands::Whoami) => {
            let gmail = gmail_client(&config).await?;
            println!("{}", gmail.profile_email().await?);
        }
        Some(Commands::Status) => show_status(&config)?,
        Some(Commands::Config { key, value }) => configure(&key, &value)?,
        Some(Commands::Emails { label, max, unread }) => {
            let gmail = gmail_client(&config).await?;
            let emails = gmail.fetch_emails(&label, max, unread).await?;
            let listing: Vec<_> = emails.iter().map(email_listing).collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        Some(Commands::Labels) => {
            let gmail = gmail_client(&config).await?;
            for label in gmail.list_labels().await? {
                println!("{}\t{}\t{}", label.id, label.label_type, label.name);
            }
        }
        Some(Commands::Analyze { id, stdin }) => {
            let body = if stdin {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                text
            } else {
                let id = id.context("message id required")?;
                let gmail = gmail_client(&config).await?;
                gmail.fetch_email(&id).await?.body_text()
            };

            if body.trim().is_empty() {
                let empty = serde_json::json!({
                    "error": "EMPTY_EMAIL_BODY",
                    "message": "No se pudo extraer el cuerpo del correo",
                });
                println!("{}", serde_json::to_string_pretty(&empty)?);
                return Ok(());
            }

            let analysis = analyzer(&config)?.analyze(&body, now()).await;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Some(Commands::Reply { id, text }) => {
            let gmail = gmail_client(&config).await?;
            let original = gmail.fetch_email(&id).await?;
            gmail.send_reply(&original, &text).await?;
            println!("📤 Reply sent to {}", original.from);
        }
        Some(Commands::Archive { id, label }) => {
            gmail_client(&config).await?.archive(&id, &label).await?;
            println!("✅ Archived under '{}'", label);
        }
        Some(Commands::Label { id, name }) => {
            gmail_client(&config).await?.add_label(&id, &name).await?;
            println!("🏷️  Labeled '{}'", name);
        }
        Some(Commands::Trash { id }) => {
            gmail_client(&config).await?.trash(&id).await?;
            println!("🗑️  Moved to trash");
        }
        Some(Commands::MarkRead { id }) => {
            gmail_client(&config).await?.mark_read(&id).await?;
            println!("✅ Marked as read");
        }
        Some(Commands::Meeting {
            title,
            start,
            duration,
            attendees,
        }) => {
            let tz = config.timezone()?;
            let request = MeetingRequest {
                title,
                start: calendar::parse_start(&start, tz)?,
                duration_minutes: duration.unwrap_or(config.calendar.default_duration_minutes),
                attendees,
            };
            let token = auth::access_token(&config).await?;
            let link = CalendarClient::new(token, tz).create_meeting(&request).await?;
            println!("📅 {}", link);
        }
        None => run_interactive(&config, cli.max_emails, cli.all).await?,
    }

    Ok(())
}

async fn gmail_client(config: &Config) -> Result<GmailClient> {
    let token = auth::access_token(config).await?;
    Ok(GmailClient::new(token))
}

fn analyzer(config: &Config) -> Result<Analyzer<GeminiClient>> {
    if config.ai.api_key.is_empty() {
        tracing::warn!("ai.api_key is not set; analyses will fail");
    }
    let model = GeminiClient::new(&config.ai)?;
    Ok(Analyzer::new(model, config.analyzer_options()))
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn email_listing(email: &Email) -> serde_json::Value {
    serde_json::json!({
        "id": email.id,
        "thread_id": email.thread_id,
        "from": email.from,
        "subject": email.subject,
        "date": email.date.to_rfc3339(),
        "snippet": email.snippet,
        "is_unread": email.is_unread,
        "labels": email.labels,
    })
}

/// Edits the file as written; environment overrides are not persisted.
fn configure(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_from(&Config::config_path()?)?;
    config.set(key, value)?;
    config.save()?;
    println!("✅ Configuration updated: {} = {}", key, mask_secret(value));
    Ok(())
}

fn mask_secret(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 8 {
        "****".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn show_status(config: &Config) -> Result<()> {
    let config_dir = Config::config_dir()?;
    let set = |v: &str| if v.is_empty() { "❌ Not set" } else { "✅ Set" };

    println!("📁 Config directory: {}", config_dir.display());
    println!();
    println!("Configuration status:");
    println!("  Gmail Client ID: {}", set(&config.gmail.client_id));
    println!("  Gmail Client Secret: {}", set(&config.gmail.client_secret));
    println!("  AI API Key: {}", set(&config.ai.api_key));
    println!("  AI Model: {}", config.ai.model);
    println!("  Time zone: {}", config.calendar.timezone);
    println!(
        "  Google account: {}",
        if auth::is_logged_in() { "✅ Signed in" } else { "❌ Signed out" }
    );
    println!();

    if !config.is_valid() {
        println!("⚠️  Configuration incomplete. Run:");
        println!();
        if config.gmail.client_id.is_empty() {
            println!("  mailpilot config gmail.client_id YOUR_CLIENT_ID");
        }
        if config.gmail.client_secret.is_empty() {
            println!("  mailpilot config gmail.client_secret YOUR_CLIENT_SECRET");
        }
        if config.ai.api_key.is_empty() {
            println!("  mailpilot config ai.api_key YOUR_GEMINI_KEY");
        }
    } else if !auth::is_logged_in() {
        println!("Run 'mailpilot login' to connect your Google account.");
    } else {
        println!("✅ Ready. Run 'mailpilot' to start.");
    }

    Ok(())
}

async fn pause(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

async fn run_interactive(config: &Config, max_emails: u32, include_all: bool) -> Result<()> {
    if !config.is_valid() {
        anyhow::bail!("configuration incomplete; run 'mailpilot status' for details");
    }

    println!("🔐 Connecting to Google...");
    let token = auth::access_token(config).await?;
    let tz = config.timezone()?;
    let gmail = GmailClient::new(token.clone());
    let calendar = CalendarClient::new(token, tz);
    let analyzer = analyzer(config)?;

    println!("📥 Fetching emails...");
    let emails = gmail
        .fetch_emails("INBOX", max_emails, !include_all)
        .await
        .context("failed to fetch emails")?;

    if emails.is_empty() {
        println!("📭 Nothing to triage. Inbox zero! 🎉");
        return Ok(());
    }

    println!("📧 Found {} emails. Starting triage...\n", emails.len());

    let mut tui = Tui::new()?;
    let mut stats = SessionStats::default();

    for (idx, email) in emails.iter().enumerate() {
        let current = idx + 1;
        let total = emails.len();

        tui.draw_email(email, None, current, total)?;
        let analysis = analyzer.analyze(&email.body_text(), now()).await;
        tui.draw_email(email, Some(&analysis), current, total)?;

        loop {
            match tui.wait_for_action()? {
                Action::Reply => {
                    if analysis.suggested_reply.trim().is_empty() {
                        tui.draw_message("No suggested reply for this email", true)?;
                        pause(1000).await;
                        tui.draw_email(email, Some(&analysis), current, total)?;
                        continue;
                    }

                    tui.draw_reply_draft(email, &analysis.suggested_reply)?;
                    match tui.wait_for_reply_action()? {
                        ReplyAction::Send => {
                            tui.draw_message("📤 Sending...", false)?;
                            match gmail.send_reply(email, &analysis.suggested_reply).await {
                                Ok(()) => {
                                    gmail.archive(&email.id, DEFAULT_ARCHIVE_LABEL).await?;
                                    tui.draw_message("✅ Reply sent & archived", false)?;
                                    pause(500).await;
                                    stats.replied += 1;
                                    break;
                                }
                                Err(Error::ReauthRequired) => return Err(Error::ReauthRequired.into()),
                                Err(e) => {
                                    tui.draw_message(&format!("❌ Failed to send: {}", e), true)?;
                                    pause(2000).await;
                                    tui.draw_email(email, Some(&analysis), current, total)?;
                                }
                            }
                        }
                        ReplyAction::Edit => {
                            open_in_browser(email);
                            tui.draw_message("📧 Opened in browser for editing", false)?;
                            pause(500).await;
                            break;
                        }
                        ReplyAction::Cancel => {
                            tui.draw_email(email, Some(&analysis), current, total)?;
                        }
                    }
                }
                Action::Archive => {
                    let label = archive_label(&analysis);
                    gmail.archive(&email.id, &label).await?;
                    tui.draw_message(&format!("✅ Archived under '{}'", label), false)?;
                    pause(300).await;
                    stats.archived += 1;
                    break;
                }
                Action::Label => {
                    let Some(label) = analysis.suggested_label else {
                        tui.draw_message("No suggested label for this email", true)?;
                        pause(1000).await;
                        tui.draw_email(email, Some(&analysis), current, total)?;
                        continue;
                    };
                    gmail.add_label(&email.id, label.as_str()).await?;
                    tui.draw_message(&format!("🏷️  Labeled '{}'", label), false)?;
                    pause(300).await;
                    stats.labeled += 1;
                    break;
                }
                Action::Meeting => {
                    schedule_meeting(&mut tui, &calendar, config, email, &analysis, &mut stats).await?;
                    tui.draw_email(email, Some(&analysis), current, total)?;
                }
                Action::Delete => {
                    gmail.trash(&email.id).await?;
                    tui.draw_message("🗑️ Deleted", false)?;
                    pause(300).await;
                    stats.deleted += 1;
                    break;
                }
                Action::Open => {
                    open_in_browser(email);
                    tui.draw_message("🌐 Opened in browser", false)?;
                    pause(300).await;
                    tui.draw_email(email, Some(&analysis), current, total)?;
                }
                Action::ViewFull => {
                    tui.draw_full_email(email)?;
                    tui.wait_for_key()?;
                    tui.draw_email(email, Some(&analysis), current, total)?;
                }
                Action::Skip => {
                    stats.skipped += 1;
                    break;
                }
                Action::Quit => {
                    tui.draw_summary(&stats)?;
                    tui.wait_for_key()?;
                    return Ok(());
                }
            }
        }
    }

    tui.draw_summary(&stats)?;
    tui.wait_for_key()?;

    Ok(())
}

/// Suggested category if any, otherwise the generic handled label.
fn archive_label(analysis: &EmailAnalysisResult) -> String {
    analysis
        .suggested_label
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_LABEL.to_string())
}

fn open_in_browser(email: &Email) {
    let url = format!("https://mail.google.com/mail/u/0/#inbox/{}", email.id);
    let _ = open::that(&url);
}

/// Conflicts and bad slots are reported on screen, not propagated.
async fn schedule_meeting(
    tui: &mut Tui,
    calendar: &CalendarClient,
    config: &Config,
    email: &Email,
    analysis: &EmailAnalysisResult,
    stats: &mut SessionStats,
) -> Result<()> {
    let Some(start) = analysis.proposed_datetime.filter(|_| analysis.meeting_detected) else {
        tui.draw_message("No meeting proposed in this email", true)?;
        pause(1000).await;
        return Ok(());
    };

    let request = MeetingRequest {
        title: email.subject.clone(),
        start,
        duration_minutes: analysis
            .duration_minutes
            .unwrap_or(config.calendar.default_duration_minutes),
        attendees: vec![email.sender_address()],
    };

    tui.draw_meeting_confirm(&request)?;
    if !tui.wait_for_confirm()? {
        return Ok(());
    }

    match calendar.create_meeting(&request).await {
        Ok(link) => {
            tui.draw_message(&format!("📅 Meeting created\n{}", link), false)?;
            stats.meetings += 1;
            pause(1000).await;
        }
        Err(Error::ReauthRequired) => return Err(Error::ReauthRequired.into()),
        Err(Error::MeetingConflict(title)) => {
            tui.draw_message(&format!("⚠️  Slot busy: overlaps with '{}'", title), true)?;
            pause(2000).await;
        }
        Err(e) => {
            tui.draw_message(&format!("❌ Failed to schedule: {}", e), true)?;
            pause(2000).await;
        }
    }

    Ok(())
}
