use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::color::Color;


// Generated by the relay on connect. Clients never choose their own ID.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new_random() -> Self { ParticipantId(Uuid::new_v4().to_string()) }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { f.write_str(&self.0) }
}

// What other participants get to know about a seated participant.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub display_name: String,
    pub color: Color,
}
