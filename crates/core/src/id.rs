// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and task identifiers.
//!
//! A task id and the id of the child workspace it runs in are the same
//! string: spawning a task creates exactly one workspace. The two newtypes
//! keep the façade signatures honest about which role an id plays.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of a workspace (root or agent-task child).
    pub struct WorkspaceId;
}

string_id! {
    /// Identifier of an agent task. Equal to the id of its child workspace.
    pub struct TaskId;
}

impl TaskId {
    /// The id of the workspace this task runs in.
    pub fn workspace(&self) -> WorkspaceId {
        WorkspaceId(self.0.clone())
    }
}

impl WorkspaceId {
    /// Reinterpret this workspace id as a task id.
    pub fn as_task(&self) -> TaskId {
        TaskId(self.0.clone())
    }
}

impl From<WorkspaceId> for TaskId {
    fn from(id: WorkspaceId) -> Self {
        TaskId(id.0)
    }
}

impl From<TaskId> for WorkspaceId {
    fn from(id: TaskId) -> Self {
        WorkspaceId(id.0)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
