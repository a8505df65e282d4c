// src/scope.rs

//! Role scope: the set of roles a request is authorized under
//!
//! Every resolver takes a `&RoleScope`. A scope can only be built from a
//! non-empty role set, so a request without roles is rejected before any
//! connection is opened or any statement is prepared.

use crate::error::{Error, Result};
use rusqlite::types::Value;
use std::collections::BTreeSet;

/// Non-empty set of role (user group) ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleScope {
    roles: BTreeSet<i64>,
}

impl RoleScope {
    /// Build a scope, rejecting an empty role set with `Error::Forbidden`
    pub fn new(roles: impl IntoIterator<Item = i64>) -> Result<Self> {
        let roles: BTreeSet<i64> = roles.into_iter().collect();
        if roles.is_empty() {
            return Err(Error::Forbidden);
        }
        Ok(Self { roles })
    }

    pub fn roles(&self) -> impl Iterator<Item = i64> + '_ {
        self.roles.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// `?, ?, ?` with one placeholder per role, for `IN (...)` clauses
    pub(crate) fn placeholders(&self) -> String {
        vec!["?"; self.roles.len()].join(", ")
    }

    /// Role ids as bound statement parameters
    pub(crate) fn params(&self) -> Vec<Value> {
        self.roles.iter().map(|r| Value::Integer(*r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scope_is_forbidden() {
        assert!(matches!(RoleScope::new(Vec::new()), Err(Error::Forbidden)));
    }

    #[test]
    fn test_scope_dedups_roles() {
        let scope = RoleScope::new([3, 1, 3]).unwrap();
        assert_eq!(scope.len(), 2);
        assert_eq!(scope.roles().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(scope.placeholders(), "?, ?");
        assert_eq!(scope.params(), vec![Value::Integer(1), Value::Integer(3)]);
    }
}
