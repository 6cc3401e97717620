//! Send mail through the Mailgun messages API.
//!
//! Configuration comes from the environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `MAILGUN_SUBJECT` | Subject line |
//! | `MAILGUN_BODY` | Plain-text body |
//! | `MAILGUN_API_KEY` | API key |
//! | `MAILGUN_DOMAIN` | Sending domain |
//! | `MAILGUN_FROM` | Sender address |
//! | `MAILGUN_SEND_TO` | Comma separated recipients |
//! | `MAILGUN_API_BASE` | Optional, defaults to [`DEFAULT_MAILGUN_API`] |

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::sync::{Arc, Mutex};

/// Variables that must be set before anything is sent.
pub const REQUIRED_VARS: [&str; 6] = [
    "MAILGUN_SUBJECT",
    "MAILGUN_BODY",
    "MAILGUN_API_KEY",
    "MAILGUN_DOMAIN",
    "MAILGUN_FROM",
    "MAILGUN_SEND_TO",
];

/// Optional API base override.
pub const API_BASE_VAR: &str = "MAILGUN_API_BASE";

/// Mailgun's US region endpoint.
pub const DEFAULT_MAILGUN_API: &str = "https://api.mailgun.net/v3";

/// Body sent when the configured one is blank.
pub const NO_CHANGES_BODY: &str = "No changes in this update";

/// Mailer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailgunConfig {
    pub subject: String,
    pub body: String,
    pub api_key: String,
    pub domain: String,
    pub from: String,
    pub send_to: String,
    pub api_base: String,
}

impl MailgunConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`.
    ///
    /// Every missing variable is reported in one error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| lookup(name).is_none())
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingConfig(missing));
        }

        let var = |name: &str| lookup(name).unwrap_or_default();
        Ok(Self {
            subject: var("MAILGUN_SUBJECT"),
            body: var("MAILGUN_BODY"),
            api_key: var("MAILGUN_API_KEY"),
            domain: var("MAILGUN_DOMAIN"),
            from: var("MAILGUN_FROM"),
            send_to: var("MAILGUN_SEND_TO"),
            api_base: lookup(API_BASE_VAR)
                .filter(|base| !base.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MAILGUN_API.to_string()),
        })
    }

    /// Messages endpoint for the configured domain.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.api_base.trim_end_matches('/'),
            self.domain
        )
    }

    /// Build the message to send, attaching `html` when given.
    pub fn message(&self, html: Option<String>) -> Message {
        let text = if self.body.trim().is_empty() {
            NO_CHANGES_BODY.to_string()
        } else {
            self.body.clone()
        };
        Message {
            from: self.from.clone(),
            to: self.send_to.clone(),
            subject: self.subject.clone(),
            text,
            html,
        }
    }
}

/// An outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

impl Message {
    /// Form fields in the order the messages API expects.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("from", self.from.as_str()),
            ("to", self.to.as_str()),
            ("subject", self.subject.as_str()),
            ("text", self.text.as_str()),
        ];
        if let Some(html) = &self.html {
            fields.push(("html", html.as_str()));
        }
        fields
    }
}

/// Delivers messages.
pub trait MailTransport: Send + Sync {
    /// Send `message`. A non-success response is an error.
    fn send(&self, config: &MailgunConfig, message: &Message) -> Result<()>;
}

/// Transport that posts to the Mailgun HTTP API.
pub struct MailgunTransport {
    agent: ureq::Agent,
}

impl MailgunTransport {
    /// Create a transport.
    #[must_use]
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for MailgunTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MailTransport for MailgunTransport {
    fn send(&self, config: &MailgunConfig, message: &Message) -> Result<()> {
        let url = config.messages_url();
        log::debug!("Posting message to {url}");

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &basic_auth("api", &config.api_key))
            .send_form(message.form_fields())?;

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        if status != 200 {
            return Err(Error::Status {
                context: "Can't send email".to_string(),
                status,
                body,
            });
        }
        log::debug!("Mailgun accepted message: {body}");
        Ok(())
    }
}

fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

/// Transport that records messages instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<Message>>>,
    reject_with: Option<u16>,
}

impl RecordingTransport {
    /// Create a transport that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that answers every send with `status`.
    #[must_use]
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::default()
        }
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().expect("transport state poisoned").clone()
    }
}

impl MailTransport for RecordingTransport {
    fn send(&self, _config: &MailgunConfig, message: &Message) -> Result<()> {
        if let Some(status) = self.reject_with {
            return Err(Error::Status {
                context: "Can't send email".to_string(),
                status,
                body: "rejected".to_string(),
            });
        }
        self.sent
            .lock()
            .expect("transport state poisoned")
            .push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MAILGUN_SUBJECT", "SLATE GitOps Change Summary"),
            ("MAILGUN_BODY", "mwt2 updated"),
            ("MAILGUN_API_KEY", "key-123"),
            ("MAILGUN_DOMAIN", "slateci.io"),
            ("MAILGUN_FROM", "GitOps Notification <noreply@slateci.io>"),
            ("MAILGUN_SEND_TO", "ops@example.org,oncall@example.org"),
        ]
    }

    #[test]
    fn test_from_lookup() {
        let config = MailgunConfig::from_lookup(env(&full_env())).unwrap();
        assert_eq!(config.domain, "slateci.io");
        assert_eq!(config.api_base, DEFAULT_MAILGUN_API);
        assert_eq!(
            config.messages_url(),
            "https://api.mailgun.net/v3/slateci.io/messages"
        );
    }

    #[test]
    fn test_missing_vars_reported_together() {
        let err = MailgunConfig::from_lookup(env(&[
            ("MAILGUN_SUBJECT", "s"),
            ("MAILGUN_BODY", "b"),
            ("MAILGUN_API_KEY", "k"),
        ]))
        .unwrap_err();
        match err {
            Error::MissingConfig(missing) => assert_eq!(
                missing,
                vec!["MAILGUN_DOMAIN", "MAILGUN_FROM", "MAILGUN_SEND_TO"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_body_counts_as_set() {
        let mut vars = full_env();
        vars[1] = ("MAILGUN_BODY", "  \n");
        let config = MailgunConfig::from_lookup(env(&vars)).unwrap();
        let message = config.message(None);
        assert_eq!(message.text, NO_CHANGES_BODY);
    }

    #[test]
    fn test_api_base_override() {
        let mut vars = full_env();
        vars.push((API_BASE_VAR, "https://api.eu.mailgun.net/v3/"));
        let config = MailgunConfig::from_lookup(env(&vars)).unwrap();
        assert_eq!(
            config.messages_url(),
            "https://api.eu.mailgun.net/v3/slateci.io/messages"
        );
    }

    #[test]
    fn test_form_fields() {
        let config = MailgunConfig::from_lookup(env(&full_env())).unwrap();
        let plain = config.message(None);
        assert_eq!(plain.form_fields().len(), 4);
        assert_eq!(plain.form_fields()[3], ("text", "mwt2 updated"));

        let rich = config.message(Some("<p>mwt2 updated</p>".to_string()));
        assert_eq!(rich.form_fields()[4], ("html", "<p>mwt2 updated</p>"));
    }

    #[test]
    fn test_basic_auth() {
        assert_eq!(basic_auth("api", "key-123"), "Basic YXBpOmtleS0xMjM=");
    }

    #[test]
    fn test_recording_transport() {
        let config = MailgunConfig::from_lookup(env(&full_env())).unwrap();
        let transport = RecordingTransport::new();
        transport.send(&config, &config.message(None)).unwrap();
        assert_eq!(transport.sent().len(), 1);

        let rejecting = RecordingTransport::rejecting(401);
        let err = rejecting.send(&config, &config.message(None)).unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
