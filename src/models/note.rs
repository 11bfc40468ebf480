use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::fields;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendNote {
    #[serde(rename = "Id_note", default, deserialize_with = "fields::string")]
    pub id: String,
    #[serde(rename = "Date_Created_Timestamp", default, deserialize_with = "fields::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "NoteContent", default, deserialize_with = "fields::string")]
    pub content: String,
}

impl BackendNote {
    pub fn to_domain(&self) -> Note {
        Note {
            id: self.id.clone(),
            created_at: self.created_at,
            content: self.content.clone(),
        }
    }
}
