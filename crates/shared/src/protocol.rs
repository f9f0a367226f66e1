use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{domain::AccountAddress, error::NotesError};

pub const NOTES_MODULE_NAME: &str = "NotesManager";
pub const ADD_NOTE_FUNCTION: &str = "add_note";
pub const INITIALIZE_COLLECTION_FUNCTION: &str = "initialize_collection";
pub const DEFAULT_MODULE_ADDRESS: &str =
    "0xb63d417b49fea817f35580ef0b2c75203c77ea228cbfc4c505a417a52f866c1a";

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype!(TypeTag);
string_newtype!(TransactionHash);

/// Fully qualified entry function: `<address>::<module>::<function>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryFunctionId {
    pub module_address: AccountAddress,
    pub module_name: String,
    pub function_name: String,
}

impl EntryFunctionId {
    pub fn new(
        module_address: AccountAddress,
        module_name: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            module_address,
            module_name: module_name.into(),
            function_name: function_name.into(),
        }
    }

    pub fn add_note(module_address: AccountAddress) -> Self {
        Self::new(module_address, NOTES_MODULE_NAME, ADD_NOTE_FUNCTION)
    }

    pub fn initialize_collection(module_address: AccountAddress) -> Self {
        Self::new(
            module_address,
            NOTES_MODULE_NAME,
            INITIALIZE_COLLECTION_FUNCTION,
        )
    }
}

impl FromStr for EntryFunctionId {
    type Err = NotesError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || NotesError::InvalidFunctionId(raw.to_string());
        let mut parts = raw.split("::");
        let (Some(address), Some(module), Some(function), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if module.is_empty() || function.is_empty() {
            return Err(invalid());
        }
        let module_address = address.parse().map_err(|_| invalid())?;
        Ok(Self::new(module_address, module, function))
    }
}

impl TryFrom<String> for EntryFunctionId {
    type Error = NotesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntryFunctionId> for String {
    fn from(value: EntryFunctionId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for EntryFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}",
            self.module_address, self.module_name, self.function_name
        )
    }
}

/// Entry function call payload in the node's JSON shape
/// (`{"type": "entry_function_payload", "function": ..., ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "entry_function_payload")]
pub struct TransactionPayload {
    pub function: EntryFunctionId,
    #[serde(default)]
    pub arguments: Vec<serde_json::Value>,
    #[serde(default)]
    pub type_arguments: Vec<TypeTag>,
}

impl TransactionPayload {
    pub fn entry_function(
        function: EntryFunctionId,
        arguments: Option<Vec<serde_json::Value>>,
        type_arguments: Option<Vec<TypeTag>>,
    ) -> Self {
        Self {
            function,
            arguments: arguments.unwrap_or_default(),
            type_arguments: type_arguments.unwrap_or_default(),
        }
    }
}

/// Wallet-signed transaction ready for submission. The encoding is owned by
/// the signer; the client only forwards the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfirmation {
    pub hash: TransactionHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub vm_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Submitted(TransactionHash),
    Confirmed(TransactionHash),
    Failed(NotesError),
}

impl TransactionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    pub fn hash(&self) -> Option<&TransactionHash> {
        match self {
            Self::Submitted(hash) | Self::Confirmed(hash) => Some(hash),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&NotesError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_already_initialized(&self) -> bool {
        self.error()
            .is_some_and(NotesError::is_already_initialized)
    }
}
