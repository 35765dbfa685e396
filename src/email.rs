use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::labels::Label;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    pub id: String,
    pub thread_id: String,
    /// RFC 2822 `Message-ID` header, used to thread replies.
    pub message_id: Option<String>,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: DateTime<Utc>,
    pub snippet: String,
    pub body_plain: Option<String>,
    pub body_html: Option<String>,
    pub labels: Vec<String>,
    pub is_unread: bool,
}

/// Structured reading of one email, as produced by the analyzer.
///
/// `error` and `raw_output` are only present on degraded records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAnalysisResult {
    pub summary: String,
    pub meeting_detected: bool,
    #[serde(default, with = "minute_precision")]
    pub proposed_datetime: Option<NaiveDateTime>,
    pub duration_minutes: Option<u32>,
    pub suggested_reply: String,
    pub suggested_label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// `YYYY-MM-DDTHH:MM` on the wire.
mod minute_precision {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M";

    pub fn serialize<S: Serializer>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl Email {
    /// Get the body as plain text
    pub fn body_text(&self) -> String {
        if let Some(plain) = &self.body_plain
            && !plain.trim().is_empty()
        {
            return plain.clone();
        }

        if let Some(html) = &self.body_html
            && !html.is_empty()
            && let Ok(text) = html2text::from_read(html.as_bytes(), 80)
        {
            return text;
        }

        self.snippet.clone()
    }

    /// Get a short sender name
    pub fn sender_name(&self) -> String {
        // Extract name from "Name <email@domain.com>" format
        if let Some(idx) = self.from.find('<') {
            let name = self.from[..idx].trim();
            if !name.is_empty() {
                return name.trim_matches('"').to_string();
            }
        }
        self.from.clone()
    }

    /// Bare address of the sender, without display name.
    pub fn sender_address(&self) -> String {
        match (self.from.find('<'), self.from.rfind('>')) {
            (Some(start), Some(end)) if start < end => self.from[start + 1..end].trim().to_string(),
            _ => self.from.trim().to_string(),
        }
    }

    /// Subject for a reply, prefixed with `Re:` exactly once.
    pub fn reply_subject(&self) -> String {
        let subject = self.subject.trim();
        if subject.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
            subject.to_string()
        } else {
            format!("Re: {}", subject)
        }
    }
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(from: &str, subject: &str) -> Email {
        Email {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            message_id: None,
            subject: subject.to_string(),
            from: from.to_string(),
            to: "me@example.com".to_string(),
            date: Utc::now(),
            snippet: "snippet text".to_string(),
            body_plain: None,
            body_html: None,
            labels: vec!["INBOX".to_string()],
            is_unread: true,
        }
    }

    #[test]
    fn sender_name_prefers_display_name() {
        assert_eq!(email("\"Ana Pérez\" <ana@example.com>", "x").sender_name(), "Ana Pérez");
        assert_eq!(email("ana@example.com", "x").sender_name(), "ana@example.com");
    }

    #[test]
    fn sender_address_strips_display_name() {
        assert_eq!(email("Ana <ana@example.com>", "x").sender_address(), "ana@example.com");
        assert_eq!(email(" ana@example.com ", "x").sender_address(), "ana@example.com");
    }

    #[test]
    fn reply_subject_is_prefixed_once() {
        assert_eq!(email("a", "Factura").reply_subject(), "Re: Factura");
        assert_eq!(email("a", "RE: Factura").reply_subject(), "RE: Factura");
        assert_eq!(email("a", "re: Factura").reply_subject(), "re: Factura");
    }

    #[test]
    fn body_text_falls_back_to_html_then_snippet() {
        let mut e = email("a", "x");
        assert_eq!(e.body_text(), "snippet text");

        e.body_html = Some("<p>Hola <b>mundo</b></p>".to_string());
        assert!(e.body_text().contains("Hola"));

        e.body_plain = Some("plano".to_string());
        assert_eq!(e.body_text(), "plano");
    }

    #[test]
    fn truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("mañana", 3), "mañ...");
        assert_eq!(truncate_chars("hoy", 3), "hoy");
    }

    #[test]
    fn analysis_result_round_trips_minute_precision() {
        let json = r#"{"summary":"s","meeting_detected":true,"proposed_datetime":"2025-07-05T15:00","duration_minutes":60,"suggested_reply":"ok","suggested_label":"trabajo"}"#;
        let parsed: EmailAnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.suggested_label, Some(Label::Trabajo));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }
}
