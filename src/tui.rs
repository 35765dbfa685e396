use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::{self, stdout};

use mailpilot::calendar::MeetingRequest;
use mailpilot::email::{Email, EmailAnalysisResult, truncate_chars};

pub enum Action {
    Archive,
    Delete,
    Label,
    Meeting,
    Reply,
    Open,
    Skip,
    ViewFull,
    Quit,
}

pub enum ReplyAction {
    Send,
    Edit,
    Cancel,
}

#[derive(Debug, Default)]
pub struct SessionStats {
    pub archived: usize,
    pub labeled: usize,
    pub deleted: usize,
    pub replied: usize,
    pub meetings: usize,
    pub skipped: usize,
}

impl SessionStats {
    /// Emails that left the queue. Meetings are extra to whatever else was done.
    pub fn total(&self) -> usize {
        self.archived + self.labeled + self.deleted + self.replied + self.skipped
    }
}

pub struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Tui {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    pub fn restore(&mut self) -> Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        Ok(())
    }

    pub fn draw_email(
        &mut self,
        email: &Email,
        analysis: Option<&EmailAnalysisResult>,
        current: usize,
        total: usize,
    ) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Length(5), // Email metadata
                    Constraint::Min(12),   // Analysis + body
                    Constraint::Length(3), // Actions
                ])
                .split(area);

            let header = Paragraph::new(format!(
                " 📧 Mailpilot                                        [{}/{}]",
                current, total
            ))
            .style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL));
            frame.render_widget(header, chunks[0]);

            let metadata = format!(
                " From: {}\n Subject: {}\n Date: {}",
                email.sender_name(),
                truncate_chars(&email.subject, 60),
                email.date.format("%Y-%m-%d %H:%M")
            );
            let metadata_widget = Paragraph::new(metadata)
                .style(Style::default().fg(Color::White))
                .block(Block::default().borders(Borders::LEFT | Borders::RIGHT));
            frame.render_widget(metadata_widget, chunks[1]);

            let content_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(8), // Analysis
                    Constraint::Min(4),    // Body preview
                ])
                .split(chunks[2]);

            match analysis {
                Some(analysis) => {
                    let style = if analysis.is_degraded() {
                        Style::default().fg(Color::Red)
                    } else if analysis.meeting_detected {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::Blue)
                    };
                    let widget = Paragraph::new(analysis_text(analysis))
                        .style(style)
                        .wrap(Wrap { trim: false })
                        .block(
                            Block::default()
                                .borders(Borders::LEFT | Borders::RIGHT)
                                .border_style(Style::default().fg(Color::DarkGray)),
                        );
                    frame.render_widget(widget, content_chunks[0]);
                }
                None => {
                    let loading = Paragraph::new(" 🔄 Analizando correo...")
                        .style(Style::default().fg(Color::Yellow))
                        .block(Block::default().borders(Borders::LEFT | Borders::RIGHT));
                    frame.render_widget(loading, content_chunks[0]);
                }
            }

            let body_preview = truncate_chars(&email.body_text(), 500);
            let body_widget = Paragraph::new(format!(" {}", body_preview.replace('\n', "\n ")))
                .style(Style::default().fg(Color::Gray))
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .title(" Preview ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::DarkGray)),
                );
            frame.render_widget(body_widget, content_chunks[1]);

            let actions = " [r]eply [a]rchive [l]abel [m]eeting [d]elete [o]pen [v]iew [s]kip [q]uit ";
            let actions_widget = Paragraph::new(actions)
                .style(Style::default().fg(Color::Green))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(actions_widget, chunks[3]);
        })?;

        Ok(())
    }

    /// Centered box over whatever is on screen.
    fn draw_popup(&mut self, title: &str, text: &str, color: Color, size: (u16, u16)) -> Result<()> {
        self.terminal.draw(|frame| {
            let mut block = Block::default().borders(Borders::ALL);
            if !title.is_empty() {
                block = block.title(format!(" {} ", title));
            }
            let widget = Paragraph::new(text)
                .style(Style::default().fg(color))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(widget, centered_rect(size.0, size.1, frame.area()));
        })?;
        Ok(())
    }

    pub fn draw_message(&mut self, message: &str, is_error: bool) -> Result<()> {
        let color = if is_error { Color::Red } else { Color::Green };
        self.draw_popup("", message, color, (60, 20))
    }

    pub fn draw_meeting_confirm(&mut self, request: &MeetingRequest) -> Result<()> {
        let text = format!(
            "Schedule meeting:\n\n\
             Title: {}\n\
             Start: {}\n\
             Duration: {} min\n\
             Attendees: {}\n\n\
             Press [Enter] to confirm, [Esc] to cancel",
            truncate_chars(&request.title, 50),
            request.start.format("%Y-%m-%d %H:%M"),
            request.duration_minutes,
            request.attendees.join(", ")
        );
        self.draw_popup("New Meeting", &text, Color::Cyan, (70, 40))
    }

    pub fn draw_full_email(&mut self, email: &Email) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();

            let content = format!(
                "From: {}\nTo: {}\nDate: {}\nSubject: {}\n\n{}",
                email.from,
                email.to,
                email.date.format("%Y-%m-%d %H:%M:%S"),
                email.subject,
                email.body_text()
            );

            let widget = Paragraph::new(content)
                .style(Style::default().fg(Color::White))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title(" Full Email - Press any key to go back ")
                        .borders(Borders::ALL),
                );

            frame.render_widget(widget, area);
        })?;
        Ok(())
    }

    pub fn draw_summary(&mut self, stats: &SessionStats) -> Result<()> {
        let rows = [
            ("✅ Archived", stats.archived),
            ("🏷️  Labeled", stats.labeled),
            ("🗑️  Deleted", stats.deleted),
            ("💬 Replied", stats.replied),
            ("📅 Meetings scheduled", stats.meetings),
            ("⏭️  Skipped", stats.skipped),
        ];
        let mut text = format!("📊 Session Summary\n\nTotal emails processed: {}\n", stats.total());
        for (name, count) in rows {
            text.push_str(&format!("{}: {}\n", name, count));
        }
        text.push_str("\nPress any key to exit");

        self.draw_popup("Mailpilot", &text, Color::Cyan, (50, 50))
    }

    pub fn wait_for_action(&self) -> Result<Action> {
        loop {
            let action = match next_key()? {
                KeyCode::Char('a') => Action::Archive,
                KeyCode::Char('d') => Action::Delete,
                KeyCode::Char('l') => Action::Label,
                KeyCode::Char('m') => Action::Meeting,
                KeyCode::Char('r') => Action::Reply,
                KeyCode::Char('o') => Action::Open,
                KeyCode::Char('v') => Action::ViewFull,
                KeyCode::Char('s') => Action::Skip,
                KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
                _ => continue,
            };
            return Ok(action);
        }
    }

    pub fn wait_for_key(&self) -> Result<()> {
        next_key().map(|_| ())
    }

    /// Enter confirms, Esc cancels; other keys are ignored.
    pub fn wait_for_confirm(&self) -> Result<bool> {
        loop {
            match next_key()? {
                KeyCode::Enter => return Ok(true),
                KeyCode::Esc => return Ok(false),
                _ => {}
            }
        }
    }

    pub fn draw_reply_draft(&mut self, email: &Email, draft: &str) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Length(4), // To/Subject
                    Constraint::Min(10),   // Draft content
                    Constraint::Length(3), // Actions
                ])
                .split(area);

            let header = Paragraph::new(" 📝 Suggested Reply")
                .style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(header, chunks[0]);

            let metadata = format!(" To: {}\n Subject: {}", email.from, email.reply_subject());
            let metadata_widget = Paragraph::new(metadata)
                .style(Style::default().fg(Color::White))
                .block(Block::default().borders(Borders::LEFT | Borders::RIGHT));
            frame.render_widget(metadata_widget, chunks[1]);

            let draft_widget = Paragraph::new(format!(" {}", draft.replace('\n', "\n ")))
                .style(Style::default().fg(Color::Green))
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title(" Draft ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::Green)),
                );
            frame.render_widget(draft_widget, chunks[2]);

            let actions = " [s]end  [e]dit in browser  [c]ancel ";
            let actions_widget = Paragraph::new(actions)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(actions_widget, chunks[3]);
        })?;
        Ok(())
    }

    pub fn wait_for_reply_action(&self) -> Result<ReplyAction> {
        loop {
            let action = match next_key()? {
                KeyCode::Char('s') => ReplyAction::Send,
                KeyCode::Char('e') => ReplyAction::Edit,
                KeyCode::Char('c') | KeyCode::Esc => ReplyAction::Cancel,
                _ => continue,
            };
            return Ok(action);
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Block until a key is pressed (releases and repeats are skipped).
fn next_key() -> Result<KeyCode> {
    loop {
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            return Ok(key.code);
        }
    }
}

fn analysis_text(analysis: &EmailAnalysisResult) -> String {
    let mut text = format!(" 🤖 {}\n", analysis.summary);

    if let Some(error) = &analysis.error {
        text.push_str(&format!(" ⚠️  {}\n", truncate_chars(error, 80)));
    }

    let label = analysis
        .suggested_label
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());
    text.push_str(&format!(" 🏷️  {}", label));

    if analysis.meeting_detected {
        let slot = analysis
            .proposed_datetime
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "sin fecha".to_string());
        let duration = analysis
            .duration_minutes
            .map(|m| format!(" ({} min)", m))
            .unwrap_or_default();
        text.push_str(&format!(" | 📅 {}{}", slot, duration));
    }

    if !analysis.suggested_reply.is_empty() {
        text.push_str(&format!(
            "\n ➡️  {}",
            truncate_chars(&analysis.suggested_reply.replace('\n', " "), 120)
        ));
    }

    text
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
