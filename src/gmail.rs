use base64::{
    Engine as _,
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::email::Email;
use crate::error::{Error, Result, check_status};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Label applied by `archive` when the caller names none.
pub const DEFAULT_ARCHIVE_LABEL: &str = "AI-Handled";

/// System labels that the list endpoint only filters by query.
const QUERY_LABELS: &[(&str, &str)] = &[
    ("SENT", "in:sent"),
    ("DRAFT", "in:drafts"),
    ("TRASH", "in:trash"),
    ("ALL_MAIL", "in:all"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub label_type: String,
}

pub struct GmailClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl GmailClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_base_url(GMAIL_API_BASE, access_token)
    }

    pub fn with_base_url(base_url: &str, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Fetch the authenticated user's email address
    pub async fn profile_email(&self) -> Result<String> {
        let url = format!("{}/users/me/profile", self.base_url);
        let response = self.http.get(&url).bearer_auth(&self.access_token).send().await?;
        let profile: UserProfile = check_status(response).await?.json().await?;
        Ok(profile.email_address)
    }

    /// List message ids under a label, newest first.
    pub async fn list_messages(&self, label: &str, max_results: u32, unread_only: bool) -> Result<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base_url);

        let mut query = Vec::new();
        let mut params = vec![("maxResults", max_results.to_string())];
        match QUERY_LABELS.iter().find(|(name, _)| *name == label) {
            Some((_, q)) => query.push(*q),
            None => params.push(("labelIds", label.to_string())),
        }
        if unread_only {
            query.push("is:unread");
        }
        if !query.is_empty() {
            params.push(("q", query.join(" ")));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;
        let list: MessageListResponse = check_status(response).await?.json().await?;

        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    /// Fetch and parse every message under a label. Unreadable messages are skipped.
    pub async fn fetch_emails(&self, label: &str, max_results: u32, unread_only: bool) -> Result<Vec<Email>> {
        let ids = self.list_messages(label, max_results, unread_only).await?;

        let mut emails = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch_email(&id).await {
                Ok(email) => emails.push(email),
                Err(Error::ReauthRequired) => return Err(Error::ReauthRequired),
                Err(e) => warn!(id = %id, error = %e, "skipping unreadable message"),
            }
        }

        Ok(emails)
    }

    pub async fn fetch_email(&self, id: &str) -> Result<Email> {
        let url = format!("{}/users/me/messages/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[("format", "full")])
            .send()
            .await?;
        let message: MessageResponse = check_status(response).await?.json().await?;

        Ok(parse_message(message))
    }

    pub async fn list_labels(&self) -> Result<Vec<LabelInfo>> {
        let url = format!("{}/users/me/labels", self.base_url);
        let response = self.http.get(&url).bearer_auth(&self.access_token).send().await?;
        let list: LabelListResponse = check_status(response).await?.json().await?;
        Ok(list.labels.unwrap_or_default())
    }

    /// Id of the label called `name` (case-insensitive), creating it if missing.
    pub async fn get_or_create_label(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("label name must not be empty".to_string()));
        }

        if let Some(existing) = self
            .list_labels()
            .await?
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
        {
            return Ok(existing.id);
        }

        let url = format!("{}/users/me/labels", self.base_url);
        let body = serde_json::json!({
            "name": name,
            "labelListVisibility": "labelShow",
            "messageListVisibility": "show"
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let created: LabelInfo = check_status(response).await?.json().await?;

        info!(label = %created.name, id = %created.id, "created label");
        Ok(created.id)
    }

    /// Tag the message with `label` and take it out of the inbox.
    pub async fn archive(&self, id: &str, label: &str) -> Result<()> {
        let label_id = self.get_or_create_label(label).await?;
        self.modify(id, &[label_id.as_str()], &["INBOX"]).await
    }

    /// Tag the message with `label`, leaving it in the inbox.
    pub async fn add_label(&self, id: &str, label: &str) -> Result<()> {
        let label_id = self.get_or_create_label(label).await?;
        self.modify(id, &[label_id.as_str()], &[]).await
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        self.modify(id, &[], &["UNREAD"]).await
    }

    async fn modify(&self, id: &str, add: &[&str], remove: &[&str]) -> Result<()> {
        let url = format!("{}/users/me/messages/{}/modify", self.base_url, id);

        let body = serde_json::json!({
            "addLabelIds": add,
            "removeLabelIds": remove
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;

        debug!(id, ?add, ?remove, "modified labels");
        Ok(())
    }

    pub async fn trash(&self, id: &str) -> Result<()> {
        let url = format!("{}/users/me/messages/{}/trash", self.base_url, id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Length", "0")
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    /// Send a reply to an email, in its thread
    pub async fn send_reply(&self, original: &Email, body_text: &str) -> Result<()> {
        if body_text.trim().is_empty() {
            return Err(Error::InvalidInput("reply text must not be empty".to_string()));
        }

        let url = format!("{}/users/me/messages/send", self.base_url);
        let encoded = URL_SAFE_NO_PAD.encode(build_reply(original, body_text).as_bytes());

        let payload = serde_json::json!({
            "raw": encoded,
            "threadId": original.thread_id
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }
}

/// Build the RFC 2822 text of a reply to `original`
fn build_reply(original: &Email, body_text: &str) -> String {
    let mut message = format!(
        "To: {}\r\nSubject: {}\r\n",
        original.from,
        original.reply_subject()
    );
    if let Some(message_id) = &original.message_id {
        message.push_str(&format!(
            "In-Reply-To: {}\r\nReferences: {}\r\n",
            message_id, message_id
        ));
    }
    message.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
    message.push_str(body_text);
    message
}

fn parse_message(msg: MessageResponse) -> Email {
    let headers = msg.payload.headers.clone().unwrap_or_default();

    let get_header = |name: &str| -> String {
        headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    };

    let date = get_header("Date");
    let parsed_date = dateparse::parse(&date).unwrap_or_else(Utc::now);

    let message_id = Some(get_header("Message-ID")).filter(|v| !v.is_empty());

    let (body_plain, body_html) = extract_body(&msg.payload);
    let is_unread = msg
        .label_ids
        .as_ref()
        .is_some_and(|l| l.iter().any(|id| id == "UNREAD"));

    Email {
        id: msg.id,
        thread_id: msg.thread_id,
        message_id,
        subject: get_header("Subject"),
        from: get_header("From"),
        to: get_header("To"),
        date: parsed_date,
        snippet: msg.snippet.unwrap_or_default(),
        body_plain,
        body_html,
        labels: msg.label_ids.unwrap_or_default(),
        is_unread,
    }
}

/// First text/plain and first text/html part, searched depth-first.
fn extract_body(payload: &MessagePart) -> (Option<String>, Option<String>) {
    let mut plain = None;
    let mut html = None;

    fn process_part(part: &MessagePart, plain: &mut Option<String>, html: &mut Option<String>) {
        let mime = part.mime_type.as_deref().unwrap_or("");
        let decoded = || part.body.as_ref().and_then(|b| b.data.as_deref()).and_then(decode_body);

        if mime == "text/plain" && plain.is_none() {
            *plain = decoded();
        } else if mime == "text/html" && html.is_none() {
            *html = decoded();
        }

        if let Some(parts) = &part.parts {
            for p in parts {
                process_part(p, plain, html);
            }
        }
    }

    process_part(payload, &mut plain, &mut html);
    (plain, html)
}

/// Gmail bodies are base64url, with or without padding.
fn decode_body(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserProfile {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    messages: Option<Vec<MessageRef>>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LabelListResponse {
    labels: Option<Vec<LabelInfo>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageResponse {
    id: String,
    thread_id: String,
    label_ids: Option<Vec<String>>,
    snippet: Option<String>,
    payload: MessagePart,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    mime_type: Option<String>,
    headers: Option<Vec<Header>>,
    body: Option<MessageBody>,
    parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessageBody {
    data: Option<String>,
}

mod dateparse {
    use chrono::{DateTime, Utc};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        // Trailing comments like "(UTC)" trip the RFC 2822 parser.
        let s = s.split(" (").next().unwrap_or(s).trim();

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        let formats = ["%a, %d %b %Y %H:%M:%S %z", "%d %b %Y %H:%M:%S %z"];
        formats
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}
