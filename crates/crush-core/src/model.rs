//! Wire types shared by the backend API and the swipe deck.
//!
//! JSON field names follow the backend's camelCase convention.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gesture::InteractionType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrimonyDetails {
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub profession: String,
    #[serde(default)]
    pub family_details: String,
}

/// Partial matrimony details. Absent sub-fields are left unchanged server-side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrimonyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_details: Option<String>,
}

impl MatrimonyUpdate {
    pub fn is_empty(&self) -> bool {
        self.education.is_none() && self.profession.is_none() && self.family_details.is_none()
    }
}

/// A profile presented for swiping. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub bio: String,
    /// Ordered image references; the first one is the card photo.
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrimony_details: Option<MatrimonyDetails>,
}

impl Profile {
    pub fn headline(&self) -> String {
        format!("{}, {}", self.name, self.age)
    }

    pub fn cover_photo(&self) -> Option<&str> {
        self.photos.first().map(String::as_str)
    }
}

/// Partial profile for `PUT /users/{id}`. Absent fields are left unchanged server-side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrimony_details: Option<MatrimonyUpdate>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.bio.is_none()
            && self.matrimony_details.as_ref().is_none_or(MatrimonyUpdate::is_empty)
    }
}

/// The account returned by login and registration. Unknown fields are kept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// User fields for `POST /auth/register`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// One swipe decision, sent once and never retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub target_user_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
}

impl InteractionRecord {
    pub fn new(target_user_id: impl Into<String>, kind: InteractionType) -> Self {
        Self {
            target_user_id: target_user_id.into(),
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A message exchanged inside a match conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMessage {
    pub id: String,
    #[serde(alias = "text")]
    pub content: String,
    #[serde(default, alias = "sender", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}
