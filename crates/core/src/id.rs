// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lightweight opaque-string identifier newtypes.
//!
//! Unlike an internally-generated ID (see `WorkerId::generate`), most IDs in
//! this crate (`TaskToken`, `MessageId`, `ThreadId`, `ProjectId`, `UserId`)
//! are opaque values handed to us by the orchestrator or the queue provider.
//! `define_opaque_id!` gives each of them a distinct type so they can't be
//! swapped for one another at a call site, without forcing a particular
//! generation scheme.

/// Define a newtype ID wrapper around `SmolStr`.
///
/// Generates `from_string()`, `as_str()`, `Display`, `From<String>`,
/// `From<&str>`, `Borrow<str>`, and equality against `&str`.
#[macro_export]
macro_rules! define_opaque_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(smol_str::SmolStr);

        impl $name {
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self(smol_str::SmolStr::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }
    };
}

define_opaque_id! {
    /// Project identifier, half of a tenant key.
    pub struct ProjectId;
}

define_opaque_id! {
    /// User identifier, half of a tenant key.
    pub struct UserId;
}

define_opaque_id! {
    /// Chat-thread identifier; maps 1:1 to a git branch.
    pub struct ThreadId;
}

define_opaque_id! {
    /// Opaque handle required to emit orchestrator callbacks (§4.3).
    pub struct TaskToken;
}

define_opaque_id! {
    /// Logical identity of a work-queue message.
    pub struct MessageId;
}

/// Opaque, unique-per-process-lifetime worker identifier (§3.1).
///
/// Installed into ownership and active-job records so that conditional
/// writes can be scoped to "only the worker that wrote this record".
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    /// Generate a new random worker identifier for this process lifetime.
    pub fn generate() -> Self {
        Self(format!("wrk-{}", nanoid::nanoid!(21)))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
