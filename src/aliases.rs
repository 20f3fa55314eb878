//! Aliases
//!
//! Persisted alias rows and the resolved aliases handed to callers

use core::fmt;

use md5::Digest;
use md5::Md5;
use serde::Serialize;

use crate::languages::LanguageMask;

/// Alias row ID, shared by all language variants of a location entry
pub type AliasId = i64;

/// Location ID, opaque for the alias engine
pub type LocationId = i64;

/// Prefix of actions pointing to a location
const LOCATION_PREFIX: &str = "eznode:";

/// Prefix of actions pointing to a resource
const RESOURCE_PREFIX: &str = "module:";

/// Action of a row without a target
const NOP: &str = "nop:";

/// Target of an alias row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "target")]
pub enum Action {
    /// Points to a location
    Location(LocationId),

    /// Points to a resource, like `module:content/search`
    Resource(String),

    /// No target, the row only holds hierarchy or blocks its key
    Nop,
}

impl Action {
    /// Parse a persisted action
    ///
    /// ```ignore
    /// assert_eq!(Action::parse("eznode:42"), Some(Action::Location(42)));
    /// ```
    pub fn parse(action: &str) -> Option<Self> {
        if action == NOP {
            return Some(Self::Nop);
        }

        if let Some(location_id) = action.strip_prefix(LOCATION_PREFIX) {
            return location_id.parse().ok().map(Self::Location);
        }

        if action.len() > RESOURCE_PREFIX.len() && action.starts_with(RESOURCE_PREFIX) {
            return Some(Self::Resource(action.to_string()));
        }

        None
    }

    /// Location ID, if the action points to a location
    pub fn location_id(&self) -> Option<LocationId> {
        match self {
            Self::Location(location_id) => Some(*location_id),
            _ => None,
        }
    }

    /// Is this a NOP action?
    pub fn is_nop(&self) -> bool {
        matches!(self, Self::Nop)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Location(location_id) => write!(f, "{LOCATION_PREFIX}{location_id}"),
            Self::Resource(resource) => f.write_str(resource),
            Self::Nop => f.write_str(NOP),
        }
    }
}

/// A single persisted path segment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasRow {
    /// ID, the parent ID of the rows below this one
    pub id: AliasId,

    /// ID of the parent segment, 0 for top level segments
    pub parent_id: AliasId,

    /// Hash of the lowercased text
    pub text_md5: String,

    /// Segment text as entered
    pub text: String,

    /// Target of the row
    pub action: Action,

    /// Languages the row is valid for
    pub language_mask: LanguageMask,

    /// User chosen instead of autogenerated
    pub is_custom: bool,

    /// Superseded row, redirects via `link`
    pub is_history: bool,

    /// Redirect to the canonical location path instead of serving in place
    pub forward: bool,

    /// Row this one redirects to, equals `id` for live rows
    pub link: AliasId,
}

impl AliasRow {
    /// Is the row the special root entry?
    pub fn is_root_entry(&self) -> bool {
        self.parent_id == 0 && self.text.is_empty()
    }

    /// Is the row a NOP row?
    pub fn is_nop(&self) -> bool {
        self.action.is_nop()
    }

    /// External identifier of the row
    pub fn key(&self) -> AliasKey {
        AliasKey {
            parent_id: self.parent_id,
            text_md5: self.text_md5.clone(),
        }
    }
}

/// Composite key of a row
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AliasKey {
    /// Parent ID
    pub parent_id: AliasId,

    /// Hash of the lowercased text
    pub text_md5: String,
}

impl AliasKey {
    /// Parse an alias ID like `12-0cc175b9c0f1b6a831c399e269772661`
    pub fn parse(id: &str) -> Option<Self> {
        let (parent_id, text_md5) = id.split_once('-')?;

        let is_md5 = text_md5.len() == 32
            && text_md5
                .chars()
                .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch));

        if !is_md5 {
            return None;
        }

        Some(Self {
            parent_id: parent_id.parse().ok()?,
            text_md5: text_md5.to_string(),
        })
    }
}

impl fmt::Display for AliasKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.parent_id, self.text_md5)
    }
}

/// Hash of a path segment, case insensitive
pub fn hash_text(text: &str) -> String {
    format!("{:x}", Md5::digest(text.to_lowercase().as_bytes()))
}

/// Split an url into its path segments
///
/// Leading, trailing and duplicated slashes are ignored
pub fn path_segments(url: &str) -> Vec<&str> {
    url.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// A resolved alias
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAlias {
    /// External identifier, see [`AliasKey`](AliasKey)
    pub id: String,

    /// Target of the alias
    pub destination: Action,

    /// Full path, without leading slash
    pub path: String,

    /// Languages the alias is valid for
    pub language_codes: Vec<String>,

    /// Valid for any language
    pub always_available: bool,

    /// Superseded alias
    pub is_history: bool,

    /// User chosen alias
    pub is_custom: bool,

    /// Should be redirected to the canonical path
    pub forward: bool,
}

impl UrlAlias {
    /// Composite key of the leaf row
    pub fn key(&self) -> Option<AliasKey> {
        AliasKey::parse(&self.id)
    }

    /// Should the router redirect instead of serving the alias?
    pub fn needs_redirect(&self) -> bool {
        self.is_history || self.forward
    }
}
