use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Worker,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub battery_level: Option<f64>,
    #[serde(default)]
    pub last_seen_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Ok,
    NeedsRepair,
    NeedsReplacement,
    Replaced,
    #[serde(other)]
    Unknown,
}

impl ComponentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ComponentStatus::Ok => "Working",
            ComponentStatus::NeedsRepair => "Needs repair",
            ComponentStatus::NeedsReplacement => "Needs replacement",
            ComponentStatus::Replaced => "Replaced",
            ComponentStatus::Unknown => "Unknown",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            ComponentStatus::Ok => "ok",
            ComponentStatus::NeedsRepair => "needs_repair",
            ComponentStatus::NeedsReplacement => "needs_replacement",
            ComponentStatus::Replaced => "replaced",
            ComponentStatus::Unknown => "unknown",
        }
    }
}

/// A maintenance component installed on a device, as served by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentRecord {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub component_name: String,
    #[serde(default)]
    pub category_name: String,
    pub status: ComponentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// Epoch-millisecond values are normalised to RFC 3339; other non-string
    /// values read as absent so one bad record cannot fail the whole list.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub replaced_at: Option<String>,
}

/// Accepts numeric and string identifiers alike.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339()),
        _ => None,
    })
}
