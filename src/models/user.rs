//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Recorded gender of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "male" | "ذكر" => Some(Gender::Male),
            "female" | "أنثى" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Gender::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown gender '{}'", raw)))
    }
}

/// Lenient reader for stored profiles: unreadable values become `None`.
fn lenient_gender<'de, D>(deserializer: D) -> Result<Option<Gender>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Gender::parse))
}

/// Driver approval state, set by an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Driver sub-record embedded in a user profile.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
pub struct DriverProfile {
    #[serde(default)]
    pub car_type: String,
    #[serde(default)]
    pub seat_count: u32,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct User {
    /// Identity-provider subject (also used as document ID)
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_gender")]
    pub gender: Option<Gender>,
    /// Expo push token of the user's current device
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default)]
    pub driver: Option<DriverProfile>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl User {
    /// Placeholder used when a profile document is missing.
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Unknown user".to_string(),
            email: None,
            phone: None,
            gender: None,
            push_token: None,
            driver: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_gender_reads_as_none() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "gender": "unspecified"
        }))
        .unwrap();
        assert_eq!(user.gender, None);
        assert!(user.driver.is_none());
    }

    #[test]
    fn test_arabic_gender_label() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u2",
            "gender": "ذكر",
            "driver": { "car_type": "Sedan" }
        }))
        .unwrap();
        assert_eq!(user.gender, Some(Gender::Male));
        let driver = user.driver.unwrap();
        assert_eq!(driver.car_type, "Sedan");
        assert_eq!(driver.approval_status, ApprovalStatus::Pending);
    }
}
