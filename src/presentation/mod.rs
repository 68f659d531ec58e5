//! Status message rendering
//!
//! The monitor hands a registration and its latest classification to a
//! [`Presenter`] and gets back a [`StatusPayload`]; it never looks inside the
//! display customization itself.
//!
//! [`TemplatePresenter`] understands these display keys:
//!
//! | Key                    | Meaning                                   |
//! |------------------------|-------------------------------------------|
//! | `title`                | Message title                             |
//! | `board`                | Board / game mode label                   |
//! | `version`              | Supported version label                   |
//! | `description_template` | Handlebars template for the description   |
//!
//! A custom template that fails to render falls back to the built-in one.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Classification, Registration, ServerState};
use crate::utils::truncate_text;

const DEFAULT_TITLE: &str = "🎮 Official Minecraft Server 🎮";
const DEFAULT_BOARD: &str = "Vanilla Survival";
const UNSET_VERSION: &str = "Unspecified";
const JOIN_LABEL: &str = "⚡ Join Now!";
const MOTD_MAX_CHARS: usize = 200;

const STATUS_TEMPLATE: &str = "status";
const TRANSITION_TEMPLATE: &str = "transition";

const STATUS_DESCRIPTION: &str = "{{#if online}}**{{players}}/{{max_players}}** players online\
{{#if sample}}\n{{sample}}{{/if}}{{else}}{{state_label}}{{/if}}";

const TRANSITION_DESCRIPTION: &str = "**{{address}}** changed from {{from_label}} to {{to_label}}";

/// One name/value row of a status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Connect details offered alongside a status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinAction {
    pub label: String,
    pub board: String,
    pub host: String,
    pub port: u16,
}

impl JoinAction {
    /// Board, IP and port as a short block of text
    pub fn details(&self) -> String {
        format!(
            "📌 Board: {}\n🌐 IP: {}\n🔌 Port: {}",
            self.board, self.host, self.port
        )
    }
}

/// Platform-neutral message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<PayloadField>,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Platforms with buttons show this as one; others as a trailing field
    #[serde(default)]
    pub join: Option<JoinAction>,
}

impl StatusPayload {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            color,
            fields: Vec::new(),
            footer: None,
            timestamp: None,
            join: None,
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(PayloadField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn with_join(mut self, join: JoinAction) -> Self {
        self.join = Some(join);
        self
    }

    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// Embed object in the shape chat webhooks accept
    pub fn to_embed(&self) -> serde_json::Value {
        let mut fields: Vec<_> = self
            .fields
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "value": f.value,
                    "inline": f.inline,
                })
            })
            .collect();
        if let Some(join) = &self.join {
            fields.push(serde_json::json!({
                "name": join.label,
                "value": join.details(),
                "inline": false,
            }));
        }

        let mut embed = serde_json::json!({
            "title": self.title,
            "description": self.description,
            "color": self.color,
            "fields": fields,
        });

        if let Some(footer) = &self.footer {
            embed["footer"] = serde_json::json!({ "text": footer });
        }
        if let Some(ts) = &self.timestamp {
            embed["timestamp"] = serde_json::json!(ts.to_rfc3339());
        }
        embed
    }
}

/// Turns monitor state into message content
pub trait Presenter: Send + Sync {
    /// Content of the long-lived status message
    fn render_status(&self, registration: &Registration, result: &Classification) -> StatusPayload;

    /// Content of a one-off transition alert
    fn render_transition(
        &self,
        registration: &Registration,
        from: ServerState,
        to: ServerState,
    ) -> StatusPayload;
}

/// Handlebars-backed presenter
pub struct TemplatePresenter {
    registry: Handlebars<'static>,
}

impl TemplatePresenter {
    /// Create a presenter with the built-in templates
    ///
    /// # Errors
    ///
    /// Returns `Error::Template` if a built-in template fails to compile
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        // Chat markdown, not HTML.
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string(STATUS_TEMPLATE, STATUS_DESCRIPTION)?;
        registry.register_template_string(TRANSITION_TEMPLATE, TRANSITION_DESCRIPTION)?;

        Ok(Self { registry })
    }

    fn status_context(registration: &Registration, result: &Classification) -> serde_json::Value {
        serde_json::json!({
            "address": registration.address.to_string(),
            "host": registration.address.host,
            "port": registration.address.port,
            "protocol": registration.protocol.as_str(),
            "board": registration.display_str("board").unwrap_or(DEFAULT_BOARD),
            "online": result.state == ServerState::Online,
            "state": result.state.as_str(),
            "state_label": result.state.label(),
            "players": result.player_count,
            "max_players": result.max_players,
            "latency_ms": result.latency_ms,
            "motd": result.motd,
            "version": result.version,
            "sample": result.player_sample.join(", "),
        })
    }

    fn render_description(&self, registration: &Registration, context: &serde_json::Value) -> String {
        if let Some(custom) = registration.display_str("description_template") {
            match self.registry.render_template(custom, context) {
                Ok(text) => return text,
                Err(e) => tracing::warn!(
                    owner = %registration.owner_id,
                    error = %e,
                    "Custom description template failed, using default"
                ),
            }
        }

        self.registry
            .render(STATUS_TEMPLATE, context)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Status template failed to render");
                String::new()
            })
    }
}

impl Presenter for TemplatePresenter {
    fn render_status(&self, registration: &Registration, result: &Classification) -> StatusPayload {
        let context = Self::status_context(registration, result);
        let title = registration.display_str("title").unwrap_or(DEFAULT_TITLE);

        let mut payload = StatusPayload::new(title, result.state.color())
            .with_field(
                "📌 Board",
                registration.display_str("board").unwrap_or(DEFAULT_BOARD),
                false,
            )
            .with_field("🌐 IP", registration.address.host.clone(), true)
            .with_field("🔌 Port", registration.address.port.to_string(), true)
            .with_field("💡 Status", result.state.label(), false)
            .with_field(
                "🖥️ Supported Version",
                registration
                    .display_str("version")
                    .unwrap_or(UNSET_VERSION),
                false,
            );

        if result.state == ServerState::Online {
            payload = payload.with_field(
                "👥 Players",
                format!("{}/{}", result.player_count, result.max_players),
                true,
            );
            if let Some(latency) = result.latency_ms {
                payload = payload.with_field("📶 Latency", format!("{latency} ms"), true);
            }
        }

        if !result.motd.trim().is_empty() {
            payload = payload.with_field(
                "📝 MOTD",
                truncate_text(result.motd.trim(), MOTD_MAX_CHARS),
                false,
            );
        }

        payload.description = self.render_description(registration, &context);
        payload.footer = Some(format!("{} edition", registration.protocol));
        payload.timestamp = Some(result.captured_at);
        payload.with_join(JoinAction {
            label: JOIN_LABEL.to_string(),
            board: registration
                .display_str("board")
                .unwrap_or(DEFAULT_BOARD)
                .to_string(),
            host: registration.address.host.clone(),
            port: registration.address.port,
        })
    }

    fn render_transition(
        &self,
        registration: &Registration,
        from: ServerState,
        to: ServerState,
    ) -> StatusPayload {
        let context = serde_json::json!({
            "address": registration.address.to_string(),
            "from": from.as_str(),
            "to": to.as_str(),
            "from_label": from.label(),
            "to_label": to.label(),
        });

        let mut payload = StatusPayload::new("Server status changed", to.color())
            .with_field("Before", from.label(), true)
            .with_field("Now", to.label(), true);

        payload.description = self
            .registry
            .render(TRANSITION_TEMPLATE, &context)
            .unwrap_or_else(|_| format!("{} is now {}", registration.address, to.as_str()));
        payload.timestamp = Some(Utc::now());
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EndpointAddress;

    fn registration() -> Registration {
        Registration::new("42", EndpointAddress::new("play.test.com", 25565), None)
            .with_display(serde_json::json!({"board": "Skyblock", "version": "1.20.x"}))
    }

    fn online() -> Classification {
        let mut c = Classification::bare(ServerState::Online);
        c.player_count = 5;
        c.max_players = 20;
        c.latency_ms = Some(37);
        c.player_sample = vec!["Alex".to_string(), "Steve".to_string()];
        c.motd = "Welcome <home>".to_string();
        c
    }

    #[test]
    fn test_render_online_status() {
        let presenter = TemplatePresenter::new().unwrap();
        let payload = presenter.render_status(&registration(), &online());

        assert_eq!(payload.title, DEFAULT_TITLE);
        assert_eq!(payload.color, ServerState::Online.color());
        assert_eq!(payload.field("📌 Board"), Some("Skyblock"));
        assert_eq!(payload.field("🌐 IP"), Some("play.test.com"));
        assert_eq!(payload.field("🔌 Port"), Some("25565"));
        assert_eq!(payload.field("🖥️ Supported Version"), Some("1.20.x"));
        assert_eq!(payload.field("👥 Players"), Some("5/20"));
        assert_eq!(payload.field("📶 Latency"), Some("37 ms"));
        assert_eq!(payload.field("📝 MOTD"), Some("Welcome <home>"));
        assert!(payload.description.contains("**5/20** players online"));
        assert!(payload.description.contains("Alex, Steve"));
    }

    #[test]
    fn test_join_action_in_embed() {
        let presenter = TemplatePresenter::new().unwrap();
        let payload = presenter.render_status(&registration(), &online());

        let join = payload.join.as_ref().unwrap();
        assert_eq!(join.label, "⚡ Join Now!");
        assert_eq!(
            join.details(),
            "📌 Board: Skyblock\n🌐 IP: play.test.com\n🔌 Port: 25565"
        );

        let embed = payload.to_embed();
        let fields = embed["fields"].as_array().unwrap();
        let last = fields.last().unwrap();
        assert_eq!(last["name"], "⚡ Join Now!");
        assert_eq!(last["value"], join.details());
    }

    #[test]
    fn test_render_offline_status() {
        let presenter = TemplatePresenter::new().unwrap();
        let reg = Registration::new("1", EndpointAddress::new("a.test", 25565), None);
        let payload = presenter.render_status(&reg, &Classification::bare(ServerState::Offline));

        assert_eq!(payload.description, "🔴 Offline");
        assert_eq!(payload.field("📌 Board"), Some(DEFAULT_BOARD));
        assert_eq!(payload.field("🖥️ Supported Version"), Some(UNSET_VERSION));
        assert!(payload.field("👥 Players").is_none());
        assert!(payload.field("📝 MOTD").is_none());
    }

    #[test]
    fn test_custom_template() {
        let presenter = TemplatePresenter::new().unwrap();
        let reg = registration().with_display(serde_json::json!({
            "description_template": "{{host}} has {{players}} players"
        }));
        let payload = presenter.render_status(&reg, &online());
        assert_eq!(payload.description, "play.test.com has 5 players");
    }

    #[test]
    fn test_broken_custom_template_falls_back() {
        let presenter = TemplatePresenter::new().unwrap();
        let reg = registration().with_display(serde_json::json!({
            "description_template": "{{#if}}"
        }));
        let payload = presenter.render_status(&reg, &online());
        assert!(payload.description.contains("players online"));
    }

    #[test]
    fn test_render_transition() {
        let presenter = TemplatePresenter::new().unwrap();
        let payload =
            presenter.render_transition(&registration(), ServerState::Offline, ServerState::Online);

        assert_eq!(payload.color, ServerState::Online.color());
        assert!(payload.description.contains("play.test.com:25565"));
        assert!(payload.description.contains("🔴 Offline"));
        assert!(payload.description.contains("🟢 Online"));
    }

    #[test]
    fn test_to_embed() {
        let payload = StatusPayload::new("Title", 0xff0000).with_field("A", "b", true);
        let embed = payload.to_embed();
        assert_eq!(embed["title"], "Title");
        assert_eq!(embed["color"], 0xff0000);
        assert_eq!(embed["fields"][0]["name"], "A");
        assert!(embed.get("footer").is_none());
    }
}
