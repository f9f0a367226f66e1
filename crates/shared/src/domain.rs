use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotesError;

/// Hex account address, always stored lowercase with a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress(String);

impl AccountAddress {
    const MAX_HEX_LEN: usize = 64;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountAddress {
    type Err = NotesError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if hex.is_empty()
            || hex.len() > Self::MAX_HEX_LEN
            || !hex.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(NotesError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = NotesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountAddress> for String {
    fn from(value: AccountAddress) -> Self {
        value.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single note card. `created_on` doubles as its identity within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub created_on: DateTime<Utc>,
    pub edit: bool,
}

impl Note {
    pub fn editable_at(created_on: DateTime<Utc>) -> Self {
        Self {
            created_on,
            edit: true,
        }
    }

    pub fn new_editable() -> Self {
        Self::editable_at(Utc::now())
    }
}

/// Ordered notes, newest last. Mutators return a fresh collection and leave
/// the receiver untouched so earlier snapshots stay valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteCollection(Vec<Note>);

impl NoteCollection {
    pub fn new(notes: Vec<Note>) -> Self {
        Self(notes)
    }

    /// Collection used when nothing usable is persisted yet.
    pub fn with_default_note() -> Self {
        Self(vec![Note::new_editable()])
    }

    pub fn append(&self, note: Note) -> Self {
        let mut notes = Vec::with_capacity(self.0.len() + 1);
        notes.extend_from_slice(&self.0);
        notes.push(note);
        Self(notes)
    }

    pub fn remove_at(&self, index: usize) -> Result<Self, NotesError> {
        if index >= self.0.len() {
            return Err(NotesError::InvalidIndex {
                index,
                len: self.0.len(),
            });
        }
        let notes = self
            .0
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, note)| note.clone())
            .collect();
        Ok(Self(notes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a NoteCollection {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AccountAddress>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            address: None,
        }
    }

    pub fn connecting() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            address: None,
        }
    }

    pub fn connected(address: AccountAddress) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            address: Some(address),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected && self.address.is_some()
    }

    /// Address for display; empty when there is no connected signer.
    pub fn display_address(&self) -> &str {
        self.address.as_ref().map(AccountAddress::as_str).unwrap_or("")
    }
}

impl Default for WalletSession {
    fn default() -> Self {
        Self::disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_at(seconds: i64) -> Note {
        Note::editable_at(DateTime::from_timestamp(seconds, 0).expect("timestamp"))
    }

    #[test]
    fn parses_and_normalizes_addresses() {
        let address: AccountAddress = "0xB63D41".parse().expect("address");
        assert_eq!(address.as_str(), "0xb63d41");
        assert!("0x".parse::<AccountAddress>().is_err());
        assert!("0xnothex".parse::<AccountAddress>().is_err());
    }

    #[test]
    fn append_leaves_previous_snapshot_intact() {
        let original = NoteCollection::new(vec![note_at(1)]);
        let appended = original.append(note_at(2));
        assert_eq!(original.len(), 1);
        assert_eq!(appended.len(), 2);
        assert_eq!(appended.get(1), Some(&note_at(2)));
    }

    #[test]
    fn remove_at_preserves_order_of_remaining_notes() {
        let notes = NoteCollection::new(vec![note_at(1), note_at(2), note_at(3)]);
        let removed = notes.remove_at(1).expect("remove");
        assert_eq!(removed.as_slice(), &[note_at(1), note_at(3)]);
        assert_eq!(notes.len(), 3);
    }

    #[test]
    fn remove_at_rejects_out_of_bounds_index() {
        let notes = NoteCollection::new(vec![note_at(1)]);
        let err = notes.remove_at(1).expect_err("out of bounds");
        assert_eq!(err, NotesError::InvalidIndex { index: 1, len: 1 });
    }

    #[test]
    fn append_and_remove_sequences_track_length_and_order() {
        let mut notes = NoteCollection::default();
        let mut expected: Vec<Note> = Vec::new();
        for step in 0..20i64 {
            if step % 3 == 2 {
                let index = (step as usize) % expected.len();
                notes = notes.remove_at(index).expect("remove");
                expected.remove(index);
            } else {
                notes = notes.append(note_at(step));
                expected.push(note_at(step));
            }
        }
        assert_eq!(notes.as_slice(), expected.as_slice());
    }

    #[test]
    fn note_json_uses_created_on_key() {
        let json = serde_json::to_value(note_at(0)).expect("json");
        assert_eq!(json["edit"], true);
        assert!(json.get("createdOn").is_some());

        let parsed: NoteCollection =
            serde_json::from_str(r#"[{"createdOn":"2024-03-01T10:20:30.456Z","edit":false}]"#)
                .expect("collection");
        assert_eq!(parsed.len(), 1);
        assert!(!parsed.as_slice()[0].edit);
    }

    #[test]
    fn wallet_session_display_address_is_empty_when_disconnected() {
        assert_eq!(WalletSession::disconnected().display_address(), "");
        assert!(!WalletSession::connecting().is_connected());
        let address: AccountAddress = "0x1".parse().expect("address");
        assert!(WalletSession::connected(address).is_connected());
    }
}
