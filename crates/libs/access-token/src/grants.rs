//! Capability grants carried by an access token
//!
//! Grants are modelled as a set of flags on the Rust side and serialized
//! into the LiveKit-style `video` claim object on the wire.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// A single capability a token can authorize
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grant {
    RoomJoin,
    CanPublish,
    CanSubscribe,
    CanPublishData,
    RoomCreate,
    RoomList,
    RoomRecord,
    RoomAdmin,
}

impl Grant {
    pub const ALL: [Grant; 8] = [
        Grant::RoomJoin,
        Grant::CanPublish,
        Grant::CanSubscribe,
        Grant::CanPublishData,
        Grant::RoomCreate,
        Grant::RoomList,
        Grant::RoomRecord,
        Grant::RoomAdmin,
    ];

    /// Claim name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Grant::RoomJoin => "roomJoin",
            Grant::CanPublish => "canPublish",
            Grant::CanSubscribe => "canSubscribe",
            Grant::CanPublishData => "canPublishData",
            Grant::RoomCreate => "roomCreate",
            Grant::RoomList => "roomList",
            Grant::RoomRecord => "roomRecord",
            Grant::RoomAdmin => "roomAdmin",
        }
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grant {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grant::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| TokenError::InvalidGrant(format!("unknown grant '{}'", s)))
    }
}

/// An ordered set of grants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantSet(BTreeSet<Grant>);

impl GrantSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants for a publishing principal (join, publish media and data, subscribe)
    pub fn publisher() -> Self {
        Self::from_iter([
            Grant::RoomJoin,
            Grant::CanPublish,
            Grant::CanPublishData,
            Grant::CanSubscribe,
        ])
    }

    /// Grants for a view-only principal
    pub fn viewer() -> Self {
        Self::from_iter([Grant::RoomJoin, Grant::CanSubscribe])
    }

    /// Add a grant, builder style
    pub fn with(mut self, grant: Grant) -> Self {
        self.0.insert(grant);
        self
    }

    pub fn insert(&mut self, grant: Grant) -> bool {
        self.0.insert(grant)
    }

    pub fn contains(&self, grant: Grant) -> bool {
        self.0.contains(&grant)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Grant> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Grant> for GrantSet {
    fn from_iter<I: IntoIterator<Item = Grant>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// The `video` claim object (LiveKit layout)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    /// Room the grants apply to
    pub room: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub room_join: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub can_publish: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub can_subscribe: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub can_publish_data: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub room_create: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub room_list: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub room_record: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub room_admin: bool,
}

impl VideoGrant {
    /// Build the claim object for `room` from a grant set
    pub fn new(room: impl Into<String>, grants: &GrantSet) -> Self {
        Self {
            room: room.into(),
            room_join: grants.contains(Grant::RoomJoin),
            can_publish: grants.contains(Grant::CanPublish),
            can_subscribe: grants.contains(Grant::CanSubscribe),
            can_publish_data: grants.contains(Grant::CanPublishData),
            room_create: grants.contains(Grant::RoomCreate),
            room_list: grants.contains(Grant::RoomList),
            room_record: grants.contains(Grant::RoomRecord),
            room_admin: grants.contains(Grant::RoomAdmin),
        }
    }

    /// Flags set in this claim object
    pub fn grants(&self) -> GrantSet {
        let flags = [
            (Grant::RoomJoin, self.room_join),
            (Grant::CanPublish, self.can_publish),
            (Grant::CanSubscribe, self.can_subscribe),
            (Grant::CanPublishData, self.can_publish_data),
            (Grant::RoomCreate, self.room_create),
            (Grant::RoomList, self.room_list),
            (Grant::RoomRecord, self.room_record),
            (Grant::RoomAdmin, self.room_admin),
        ];
        flags
            .into_iter()
            .filter_map(|(grant, set)| set.then_some(grant))
            .collect()
    }
}
