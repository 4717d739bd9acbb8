/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A comment (`is_liked == false`) or a like (`is_liked == true`) inside an album.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: String,
    pub user_id: String,
    pub asset_id: Option<String>,
    pub album_id: String,
    pub is_liked: bool,
    pub comment: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Public projection of the authoring user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ActivityUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_color: Option<String>,
    pub profile_image_path: String,
    pub profile_changed_at_ms: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ActivityWithUser {
    #[serde(flatten)]
    pub activity: Activity,
    pub user: ActivityUser,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub user_id: String,
    pub album_id: String,
    #[serde(default)]
    pub asset_id: Option<String>,
    pub is_liked: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewActivity {
    pub fn comment(user_id: &str, album_id: &str, asset_id: Option<&str>, text: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            album_id: album_id.to_string(),
            asset_id: asset_id.map(str::to_string),
            is_liked: false,
            comment: Some(text.to_string()),
        }
    }

    pub fn like(user_id: &str, album_id: &str, asset_id: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            album_id: album_id.to_string(),
            asset_id: asset_id.map(str::to_string),
            is_liked: true,
            comment: None,
        }
    }
}

/// Asset filter for [`ActivitySearch`].
///
/// `Null` selects album-level activity only, which is not the same thing as
/// leaving the filter out.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "asset_id", rename_all = "snake_case")]
pub enum AssetFilter {
    #[default]
    Unspecified,
    Null,
    Is(String),
}

impl AssetFilter {
    pub fn is(asset_id: impl Into<String>) -> Self {
        AssetFilter::Is(asset_id.into())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ActivitySearch {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub asset_id: AssetFilter,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub is_liked: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StatisticsQuery {
    pub album_id: String,
    #[serde(default)]
    pub asset_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivityStatistics {
    pub comments: u64,
    pub likes: u64,
}

impl ActivityStatistics {
    pub fn total(&self) -> u64 {
        self.comments + self.likes
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetVisibility {
    Archive,
    Timeline,
    Hidden,
    Locked,
}

impl AssetVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetVisibility::Archive => "archive",
            AssetVisibility::Timeline => "timeline",
            AssetVisibility::Hidden => "hidden",
            AssetVisibility::Locked => "locked",
        }
    }
}

impl fmt::Display for AssetVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVisibility(pub String);

impl fmt::Display for UnknownVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown asset visibility: {}", self.0)
    }
}

impl std::error::Error for UnknownVisibility {}

impl FromStr for AssetVisibility {
    type Err = UnknownVisibility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "archive" => Ok(AssetVisibility::Archive),
            "timeline" => Ok(AssetVisibility::Timeline),
            "hidden" => Ok(AssetVisibility::Hidden),
            "locked" => Ok(AssetVisibility::Locked),
            other => Err(UnknownVisibility(other.to_string())),
        }
    }
}
