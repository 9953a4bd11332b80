//! Sales profile records as held by the remote store

use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::geo::GeoPosition;
use crate::status::{AttendanceStatus, normalize_approved};

/// Identifier of a sales profile.
///
/// The backend addresses records either by numeric `id` or by string
/// `documentId`; both are carried as their string form.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[display("{_0}")]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for ProfileId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for ProfileId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(ProfileId(s)),
            Value::Number(n) => Ok(ProfileId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "profile id must be a string or number, got {other}"
            ))),
        }
    }
}

/// An uploaded media file, referenced by its server path or URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub url: String,
}

/// Accepts a flat `{"url": ..}` relation or the nested
/// `{"data": {"attributes": {"url": ..}}}` one; an empty relation is `None`
fn media_relation<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<MediaRef>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let url = value
        .pointer("/url")
        .or_else(|| value.pointer("/data/attributes/url"))
        .or_else(|| value.pointer("/data/url"))
        .and_then(Value::as_str);
    Ok(url.map(|url| MediaRef {
        url: url.to_string(),
    }))
}

/// A sales profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(rename = "documentId", default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default)]
    pub sales_uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub online_stat: Value,
    #[serde(default)]
    pub blocked: Value,
    #[serde(default)]
    pub approved: Value,
    #[serde(default)]
    pub location: Option<GeoPosition>,
    #[serde(default, deserialize_with = "media_relation", skip_serializing_if = "Option::is_none")]
    pub photo_profile: Option<MediaRef>,
}

impl Profile {
    /// Create a profile with everything but the id left empty
    pub fn new(id: impl Into<ProfileId>) -> Self {
        Self {
            id: id.into(),
            document_id: None,
            sales_uid: None,
            email: None,
            online_stat: Value::Null,
            blocked: Value::Null,
            approved: Value::Null,
            location: None,
            photo_profile: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = Value::Bool(blocked);
        self
    }

    pub fn with_approved(mut self, approved: Value) -> Self {
        self.approved = approved;
        self
    }

    pub fn with_online_stat(mut self, online_stat: Value) -> Self {
        self.online_stat = online_stat;
        self
    }

    /// Identifier to use for writes: the document id when the backend
    /// exposes one, the numeric id otherwise
    pub fn write_id(&self) -> ProfileId {
        match &self.document_id {
            Some(doc) => ProfileId::new(doc.clone()),
            None => self.id.clone(),
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        AttendanceStatus::normalize(&self.online_stat)
    }

    /// Blocked flag with loose truthiness (any non-empty, non-zero value)
    pub fn is_blocked(&self) -> bool {
        match &self.blocked {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn is_approved(&self) -> bool {
        normalize_approved(&self.approved)
    }

    /// Server path or URL of the profile photo, if one was uploaded
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_profile
            .as_ref()
            .map(|media| media.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// A partial update written to a profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileUpdate {
    OnlineStat(bool),
    Location(GeoPosition),
}

impl ProfileUpdate {
    /// Request body in the backend's `{"data": {...}}` envelope
    pub fn to_body(&self) -> Value {
        match self {
            ProfileUpdate::OnlineStat(online) => json!({ "data": { "online_stat": online } }),
            ProfileUpdate::Location(pos) => json!({
                "data": {
                    "location": { "latitude": pos.latitude, "longitude": pos.longitude }
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_id_from_number_or_string() {
        let a: ProfileId = serde_json::from_str("42").unwrap();
        let b: ProfileId = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(a, ProfileId::from(42u64));
        assert_eq!(b.as_str(), "abc123");
        assert!(serde_json::from_str::<ProfileId>("true").is_err());
    }

    #[test]
    fn test_profile_deserialize_sparse() {
        let profile: Profile = serde_json::from_value(json!({
            "id": 7,
            "email": "agent@example.com",
            "online_stat": "ONLINE",
            "blocked": null
        }))
        .unwrap();
        assert_eq!(profile.status(), AttendanceStatus::Online);
        assert!(!profile.is_blocked());
        assert!(!profile.is_approved());
        assert!(profile.location.is_none());
        assert_eq!(profile.write_id(), ProfileId::from(7u64));
    }

    #[test]
    fn test_write_id_prefers_document_id() {
        let profile: Profile = serde_json::from_value(json!({
            "id": 7,
            "documentId": "k3j2h1",
        }))
        .unwrap();
        assert_eq!(profile.write_id().as_str(), "k3j2h1");
    }

    #[test]
    fn test_photo_relation_shapes() {
        let flat: Profile = serde_json::from_value(json!({
            "id": 1,
            "photo_profile": { "url": "/uploads/me.jpg" }
        }))
        .unwrap();
        assert_eq!(flat.photo_url(), Some("/uploads/me.jpg"));

        let nested: Profile = serde_json::from_value(json!({
            "id": 1,
            "photo_profile": { "data": { "id": 3, "attributes": { "url": "/uploads/n.png" } } }
        }))
        .unwrap();
        assert_eq!(nested.photo_url(), Some("/uploads/n.png"));

        let empty: Profile =
            serde_json::from_value(json!({ "id": 1, "photo_profile": { "data": null } })).unwrap();
        assert_eq!(empty.photo_url(), None);
        assert_eq!(Profile::new(1u64).photo_url(), None);
    }

    #[test]
    fn test_blocked_truthiness() {
        assert!(Profile::new(1u64).with_blocked(true).is_blocked());
        assert!(!Profile::new(1u64).with_blocked(false).is_blocked());
        let mut p = Profile::new(1u64);
        p.blocked = json!(0);
        assert!(!p.is_blocked());
        p.blocked = json!("yes");
        assert!(p.is_blocked());
    }

    #[test]
    fn test_update_bodies() {
        assert_eq!(
            ProfileUpdate::OnlineStat(true).to_body(),
            json!({"data": {"online_stat": true}})
        );
        let body = ProfileUpdate::Location(GeoPosition::new(-6.1, 106.8)).to_body();
        assert_eq!(body["data"]["location"]["latitude"], json!(-6.1));
        assert_eq!(body["data"]["location"]["longitude"], json!(106.8));
    }
}
