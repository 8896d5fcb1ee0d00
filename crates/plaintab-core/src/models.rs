//! Data models for plainTab
//!
//! Defines the host-supplied bookmark tree (`BookmarkNode`), the flat display
//! item derived from it (`BookmarkItem`), and the user preference record
//! (`Settings`).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mapping from bookmark URL to an override icon URL
pub type FaviconOverrides = BTreeMap<String, String>;

/// A node of the host bookmark tree
///
/// A node is a bookmark iff `url` is set. Folders carry `children`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BookmarkNode {
    /// Opaque, host-assigned identifier
    pub id: String,
    /// Title as stored by the host (may be empty)
    #[serde(default)]
    pub title: String,
    /// The bookmarked URL (absent for folders)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Ordered child nodes (absent for bookmarks)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    /// Create a bookmark (leaf) node
    pub fn bookmark(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: Some(url.into()),
            children: None,
        }
    }

    /// Create a folder node
    pub fn folder(
        id: impl Into<String>,
        title: impl Into<String>,
        children: Vec<BookmarkNode>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: None,
            children: Some(children),
        }
    }

    /// Whether this node is a bookmark rather than a folder
    pub fn is_bookmark(&self) -> bool {
        self.url.is_some()
    }
}

/// A bookmark as shown on the new tab grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookmarkItem {
    /// Identifier inherited from the host node
    pub id: String,
    /// Display title, never empty (falls back to the url)
    pub title: String,
    /// The bookmarked URL
    pub url: String,
    /// Icon to display, filled in by favicon resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

impl BookmarkItem {
    /// Build a display item, falling back to the url for an empty title
    pub fn new(id: impl Into<String>, title: &str, url: impl Into<String>) -> Self {
        let url = url.into();
        let title = if title.is_empty() {
            url.clone()
        } else {
            title.to_string()
        };
        Self {
            id: id.into(),
            title,
            url,
            favicon: None,
        }
    }
}

/// Fields to change on a host bookmark
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
}

impl BookmarkChanges {
    /// Change both title and url
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: Some(url.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none()
    }
}

/// User preferences for the new tab page
///
/// Sizes are in rem. Persisted with camelCase field names; every field has a
/// default so a partial persisted record can always be completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    // Grid
    pub columns: u32,
    pub show_favicons: bool,
    pub grid_gap: f64,

    // Tile
    pub tile_padding: f64,
    pub tile_border_radius: f64,
    pub tile_min_height: f64,

    // Page
    pub page_padding: f64,
    pub background_color: String,
    pub card_background_color: String,
    pub card_hover_shadow: String,

    // Typography
    pub title_font_size: f64,
    pub title_color: String,
    pub title_max_lines: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: 6,
            show_favicons: true,
            grid_gap: 0.75,
            tile_padding: 1.0,
            tile_border_radius: 0.75,
            tile_min_height: 5.0,
            page_padding: 1.5,
            background_color: "#f5f5f7".to_string(),
            card_background_color: "#ffffff".to_string(),
            card_hover_shadow: "0 4px 12px rgba(0, 0, 0, 0.1)".to_string(),
            title_font_size: 0.8125,
            title_color: "#333333".to_string(),
            title_max_lines: 2,
        }
    }
}

impl Settings {
    /// Persisted names of every settings field, in declaration order
    pub fn field_names() -> impl Iterator<Item = &'static str> {
        SettingKey::ALL.iter().map(|key| key.as_str())
    }
}

/// Name of a single settings field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Columns,
    ShowFavicons,
    GridGap,
    TilePadding,
    TileBorderRadius,
    TileMinHeight,
    PagePadding,
    BackgroundColor,
    CardBackgroundColor,
    CardHoverShadow,
    TitleFontSize,
    TitleColor,
    TitleMaxLines,
}

impl SettingKey {
    pub const ALL: [SettingKey; 13] = [
        SettingKey::Columns,
        SettingKey::ShowFavicons,
        SettingKey::GridGap,
        SettingKey::TilePadding,
        SettingKey::TileBorderRadius,
        SettingKey::TileMinHeight,
        SettingKey::PagePadding,
        SettingKey::BackgroundColor,
        SettingKey::CardBackgroundColor,
        SettingKey::CardHoverShadow,
        SettingKey::TitleFontSize,
        SettingKey::TitleColor,
        SettingKey::TitleMaxLines,
    ];

    /// The persisted (camelCase) field name
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Columns => "columns",
            SettingKey::ShowFavicons => "showFavicons",
            SettingKey::GridGap => "gridGap",
            SettingKey::TilePadding => "tilePadding",
            SettingKey::TileBorderRadius => "tileBorderRadius",
            SettingKey::TileMinHeight => "tileMinHeight",
            SettingKey::PagePadding => "pagePadding",
            SettingKey::BackgroundColor => "backgroundColor",
            SettingKey::CardBackgroundColor => "cardBackgroundColor",
            SettingKey::CardHoverShadow => "cardHoverShadow",
            SettingKey::TitleFontSize => "titleFontSize",
            SettingKey::TitleColor => "titleColor",
            SettingKey::TitleMaxLines => "titleMaxLines",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown setting name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown setting '{0}'")]
pub struct UnknownSettingKey(pub String);

impl FromStr for SettingKey {
    type Err = UnknownSettingKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownSettingKey(s.to_string()))
    }
}
