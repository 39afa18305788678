//! Explicit per-region context passed to every provider call.
//!
//! A workflow holds one immutable [`RegionContext`] per region it touches and
//! hands the relevant one to each collaborator call, so primary and secondary
//! operations never share a mutable "current region".

use std::fmt;

use serde::Serialize;

/// Role a region plays in a disaster-recovery pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionRole {
    /// Region hosting the live workload.
    Primary,
    /// Failover target region.
    Secondary,
}

/// Immutable handle naming the region a call is addressed to.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct RegionContext {
    name: String,
    role: RegionRole,
}

impl RegionContext {
    /// Context for the primary region.
    #[must_use]
    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            role: RegionRole::Primary,
        }
    }

    /// Context for the secondary (DR) region.
    #[must_use]
    pub fn secondary(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_owned(),
            role: RegionRole::Secondary,
        }
    }

    /// Region identifier, for example `eu-frankfurt-1`.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Role of the region in the pair.
    #[must_use]
    pub const fn role(&self) -> RegionRole {
        self.role
    }
}

impl fmt::Display for RegionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            RegionRole::Primary => "primary",
            RegionRole::Secondary => "secondary",
        };
        write!(f, "{} ({role})", self.name)
    }
}

/// The primary/secondary pair a workflow operates on.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RegionPair {
    /// Region hosting the source resources.
    pub primary: RegionContext,
    /// Region receiving backups, replicas, and rebuilt instances.
    pub secondary: RegionContext,
}

impl RegionPair {
    /// Builds a pair from two region names.
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: RegionContext::primary(primary),
            secondary: RegionContext::secondary(secondary),
        }
    }
}
