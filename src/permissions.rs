//! Role to permission table

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Parent,
    /// Modeled but never produced by role resolution
    Teacher,
    /// Modeled but never produced by role resolution
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(Error::bad_request(format!("Unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadOwnApplications,
    WriteOwnApplications,
    ReadChildApplications,
    WriteChildNotes,
    ReadUniversities,
    ManageRequirements,
    ViewFinancialInfo,
    AdminAccess,
}

const STUDENT: &[Permission] = &[
    Permission::ReadOwnApplications,
    Permission::WriteOwnApplications,
    Permission::ReadUniversities,
    Permission::ManageRequirements,
];

const PARENT: &[Permission] = &[
    Permission::ReadChildApplications,
    Permission::WriteChildNotes,
    Permission::ReadUniversities,
    Permission::ViewFinancialInfo,
];

const TEACHER: &[Permission] = &[
    Permission::ReadChildApplications,
    Permission::WriteChildNotes,
    Permission::ReadUniversities,
];

const ADMIN: &[Permission] = &[
    Permission::ReadOwnApplications,
    Permission::WriteOwnApplications,
    Permission::ReadChildApplications,
    Permission::WriteChildNotes,
    Permission::ReadUniversities,
    Permission::ManageRequirements,
    Permission::ViewFinancialInfo,
    Permission::AdminAccess,
];

pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Student => STUDENT,
        Role::Parent => PARENT,
        Role::Teacher => TEACHER,
        Role::Admin => ADMIN,
    }
}

/// A missing role has no permissions
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    role.map_or(false, |r| permissions_for(r).contains(&permission))
}

pub fn has_all_permissions(role: Option<Role>, permissions: &[Permission]) -> bool {
    match role {
        Some(r) => permissions
            .iter()
            .all(|p| permissions_for(r).contains(p)),
        None => false,
    }
}

pub fn has_any_permission(role: Option<Role>, permissions: &[Permission]) -> bool {
    match role {
        Some(r) => permissions
            .iter()
            .any(|p| permissions_for(r).contains(p)),
        None => false,
    }
}
