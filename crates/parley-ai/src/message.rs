//! Conversation message model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use parley_common::MessageId;
use serde::{Deserialize, Serialize};

/// Provenance label carried by summary messages that replace trimmed history.
pub const SUMMARY_PROVENANCE: &str = "context-summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Lifecycle of a tool message: `Running` moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Running,
    Completed,
    Failed,
}

impl ToolStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ToolStatus::Running)
    }
}

/// Tool call details carried by every `tool`-role message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub call_id: String,
    /// Arguments exactly as the provider sent them.
    pub arguments: String,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_result: Option<String>,
    /// Failure reason when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Binary image attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolMetadata>,
    /// Proactive data sources that contributed to this message.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub provenance: BTreeSet<String>,
    #[serde(default)]
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            image: None,
            tool: None,
            provenance: BTreeSet::new(),
            pinned: false,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// A `tool` message for a call that has just started.
    pub fn tool_call(
        name: impl Into<String>,
        call_id: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let mut msg = Self::with_role(Role::Tool, format!("Using {name}"));
        msg.tool = Some(ToolMetadata {
            name,
            call_id: call_id.into(),
            arguments: arguments.into(),
            status: ToolStatus::Running,
            raw_result: None,
            error: None,
        });
        msg
    }

    /// A system message holding a condensed summary of dropped history.
    pub fn summary(content: impl Into<String>) -> Self {
        Self::system(content).with_provenance(SUMMARY_PROVENANCE)
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_provenance(mut self, source: impl Into<String>) -> Self {
        self.provenance.insert(source.into());
        self
    }

    pub fn is_summary(&self) -> bool {
        self.role == Role::System && self.provenance.contains(SUMMARY_PROVENANCE)
    }

    /// `tool`-role messages carry tool metadata and no other role does.
    pub fn is_well_formed(&self) -> bool {
        (self.role == Role::Tool) == self.tool.is_some()
    }

    pub fn tool_status(&self) -> Option<ToolStatus> {
        self.tool.as_ref().map(|t| t.status)
    }

    pub fn is_running_tool(&self) -> bool {
        self.tool_status() == Some(ToolStatus::Running)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_respect_tool_invariant() {
        assert!(Message::user("hi").is_well_formed());
        assert!(Message::assistant("hello").is_well_formed());
        assert!(Message::system("be brief").is_well_formed());

        let tool = Message::tool_call("weather", "call-1", "{}");
        assert!(tool.is_well_formed());
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_status(), Some(ToolStatus::Running));
        assert!(tool.is_running_tool());
    }

    #[test]
    fn metadata_on_wrong_role_is_malformed() {
        let mut msg = Message::user("hi");
        msg.tool = Message::tool_call("timer", "c", "{}").tool;
        assert!(!msg.is_well_formed());

        let mut tool = Message::tool_call("timer", "c", "{}");
        tool.tool = None;
        assert!(!tool.is_well_formed());
    }

    #[test]
    fn summary_is_tagged_system_message() {
        let msg = Message::summary("Earlier we discussed the weather.");
        assert_eq!(msg.role, Role::System);
        assert!(msg.is_summary());
        assert!(!Message::system("plain").is_summary());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!ToolStatus::Running.is_terminal());
        assert!(ToolStatus::Completed.is_terminal());
        assert!(ToolStatus::Failed.is_terminal());
    }

    #[test]
    fn image_bytes_serialize_as_base64() {
        let msg = Message::user("look").with_image(ImageAttachment {
            mime_type: "image/png".into(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["image"]["bytes"], "iVBORw==");

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("image").is_none());
        assert!(json.get("tool").is_none());
        assert!(json.get("provenance").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["pinned"], false);
    }

    #[test]
    fn provenance_labels_are_deduplicated() {
        let msg = Message::assistant("It will rain")
            .with_provenance("weather")
            .with_provenance("weather")
            .with_provenance("calendar");
        assert_eq!(msg.provenance.len(), 2);
    }
}
