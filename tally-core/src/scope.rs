//! Roles, message categories and the scope key that partitions cached data.
//!
//! A [`ScopeKey`] can only be built from a [`Role`] and a [`Category`], so the
//! data-access boundary (which location a caller may see) travels with every
//! cache lookup by construction.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLE CAPABILITIES
// ============================================================================

bitflags! {
    /// Aggregate families a role is allowed to see.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RoleCapabilities: u8 {
        /// Revenue, orders, average order value, location count
        const SUMMARY = 0b0000_0001;
        /// Best and worst state by revenue
        const STATE_RANKING = 0b0000_0010;
        /// Best and worst store by revenue
        const STORE_RANKING = 0b0000_0100;
        /// Period-over-period revenue change
        const TREND = 0b0000_1000;
        /// Best selling product
        const PRODUCT_MIX = 0b0001_0000;
    }
}

impl Default for RoleCapabilities {
    fn default() -> Self {
        Self::SUMMARY
    }
}

// ============================================================================
// ROLE
// ============================================================================

/// Who is asking, and which slice of the business they may see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Role {
    /// Headquarters: every state.
    Hq,
    /// A single state, identified by its code.
    State(String),
    /// A single store, identified by its number.
    Store(String),
}

impl Role {
    /// Location identifier for scoped roles, `None` for HQ.
    pub fn scope_id(&self) -> Option<&str> {
        match self {
            Self::Hq => None,
            Self::State(id) | Self::Store(id) => Some(id.as_str()),
        }
    }

    /// Aggregate families this role may request.
    pub fn capabilities(&self) -> RoleCapabilities {
        match self {
            Self::Hq => {
                RoleCapabilities::SUMMARY | RoleCapabilities::STATE_RANKING | RoleCapabilities::TREND
            }
            Self::State(_) => {
                RoleCapabilities::SUMMARY | RoleCapabilities::STORE_RANKING | RoleCapabilities::TREND
            }
            Self::Store(_) => {
                RoleCapabilities::SUMMARY | RoleCapabilities::TREND | RoleCapabilities::PRODUCT_MIX
            }
        }
    }

    /// Human readable scope, e.g. `State CA` or `Store 1042`.
    pub fn scope_label(&self) -> String {
        match self {
            Self::Hq => "All states (HQ)".to_string(),
            Self::State(id) => format!("State {}", id),
            Self::Store(id) => format!("Store {}", id),
        }
    }

    /// Who the assistant is talking to.
    pub fn audience(&self) -> &'static str {
        match self {
            Self::Hq => "headquarters leadership",
            Self::State(_) => "a state manager",
            Self::Store(_) => "a store manager",
        }
    }

    /// Plural noun for the locations one level below this role.
    pub fn child_locations(&self) -> Option<&'static str> {
        match self {
            Self::Hq => Some("states"),
            Self::State(_) => Some("stores"),
            Self::Store(_) => None,
        }
    }

    /// Short tag used in logs and cache key rendering.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Hq => "hq",
            Self::State(_) => "state",
            Self::Store(_) => "store",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope_id() {
            Some(id) => write!(f, "{}:{}", self.as_tag(), id),
            None => write!(f, "{}", self.as_tag()),
        }
    }
}

/// Error parsing a [`Role`] from its `hq` / `state:ID` / `store:ID` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleParseError(pub String);

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role: {} (expected hq, state:<code> or store:<number>)", self.0)
    }
}

impl std::error::Error for RoleParseError {}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (tag, id) = match trimmed.split_once(':') {
            Some((tag, id)) => (tag, Some(id.trim())),
            None => (trimmed, None),
        };
        match (tag.to_ascii_lowercase().as_str(), id) {
            ("hq", None) => Ok(Self::Hq),
            ("state", Some(id)) if !id.is_empty() => Ok(Self::State(id.to_string())),
            ("store", Some(id)) if !id.is_empty() => Ok(Self::Store(id.to_string())),
            _ => Err(RoleParseError(s.to_string())),
        }
    }
}

// ============================================================================
// CATEGORY AND TTL CLASS
// ============================================================================

/// Freshness policy applied to a cached context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Volatile data, short TTL.
    Critical,
    /// Everything else, longer TTL.
    Standard,
}

/// Message category picked by the categorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    General,
    Analytics,
    Support,
    Greeting,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::General,
        Category::Analytics,
        Category::Support,
        Category::Greeting,
    ];

    /// Freshness policy for contexts built under this category.
    pub fn ttl_class(self) -> TtlClass {
        match self {
            Self::Analytics => TtlClass::Critical,
            Self::General | Self::Support | Self::Greeting => TtlClass::Standard,
        }
    }

    /// Whether the context should carry trend and ranking data.
    pub fn is_analytics(self) -> bool {
        matches!(self, Self::Analytics)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Analytics => "analytics",
            Self::Support => "support",
            Self::Greeting => "greeting",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`Category`] from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryParseError(pub String);

impl fmt::Display for CategoryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid category: {}", self.0)
    }
}

impl std::error::Error for CategoryParseError {}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "analytics" => Ok(Self::Analytics),
            "support" => Ok(Self::Support),
            "greeting" => Ok(Self::Greeting),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

// ============================================================================
// SCOPE KEY
// ============================================================================

/// Identity of a cached business context and of its data-access boundary.
///
/// Fields are private: a key is immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    role: Role,
    category: Category,
}

impl ScopeKey {
    pub fn new(role: Role, category: Category) -> Self {
        Self { role, category }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// State code or store number, `None` for HQ.
    pub fn scope_id(&self) -> Option<&str> {
        self.role.scope_id()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn ttl_class(&self) -> TtlClass {
        self.category.ttl_class()
    }

    /// Same role, different category.
    pub fn with_category(&self, category: Category) -> Self {
        Self {
            role: self.role.clone(),
            category,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.role.as_tag(),
            self.scope_id().unwrap_or("-"),
            self.category
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_role_scope_ids() {
        assert_eq!(Role::Hq.scope_id(), None);
        assert_eq!(Role::State("CA".to_string()).scope_id(), Some("CA"));
        assert_eq!(Role::Store("1042".to_string()).scope_id(), Some("1042"));
    }

    #[test]
    fn test_role_capabilities_are_disjoint_where_expected() {
        let hq = Role::Hq.capabilities();
        assert!(hq.contains(RoleCapabilities::STATE_RANKING));
        assert!(!hq.contains(RoleCapabilities::STORE_RANKING));

        let state = Role::State("TX".to_string()).capabilities();
        assert!(state.contains(RoleCapabilities::STORE_RANKING));
        assert!(!state.contains(RoleCapabilities::PRODUCT_MIX));

        let store = Role::Store("7".to_string()).capabilities();
        assert!(store.contains(RoleCapabilities::PRODUCT_MIX));
        assert!(!store.contains(RoleCapabilities::STATE_RANKING));

        for caps in [hq, state, store] {
            assert!(caps.contains(RoleCapabilities::SUMMARY));
        }
    }

    #[test]
    fn test_category_ttl_classes() {
        assert_eq!(Category::Analytics.ttl_class(), TtlClass::Critical);
        assert_eq!(Category::General.ttl_class(), TtlClass::Standard);
        assert_eq!(Category::Support.ttl_class(), TtlClass::Standard);
        assert_eq!(Category::Greeting.ttl_class(), TtlClass::Standard);
    }

    #[test]
    fn test_category_parse_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("weather".parse::<Category>().is_err());
        assert_eq!(" Analytics ".parse::<Category>(), Ok(Category::Analytics));
    }

    #[test]
    fn test_scope_key_identity() {
        let a = ScopeKey::new(Role::State("CA".to_string()), Category::Analytics);
        let b = ScopeKey::new(Role::State("CA".to_string()), Category::Analytics);
        let c = a.with_category(Category::General);
        let d = ScopeKey::new(Role::State("NV".to_string()), Category::Analytics);

        let keys: HashSet<ScopeKey> = [a.clone(), b, c.clone(), d].into_iter().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(a.to_string(), "state/CA/analytics");
        assert_eq!(c.ttl_class(), TtlClass::Standard);
    }

    #[test]
    fn test_role_parse_matches_display() {
        for role in [Role::Hq, Role::State("CA".to_string()), Role::Store("1042".to_string())] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert_eq!(" HQ ".parse::<Role>(), Ok(Role::Hq));
        assert!("store:".parse::<Role>().is_err());
        assert!("region:west".parse::<Role>().is_err());
        assert!("hq:1".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serde_shape() {
        let json = serde_json::to_value(Role::Store("1042".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "store", "id": "1042"}));
        let back: Role = serde_json::from_value(serde_json::json!({"kind": "hq"})).unwrap();
        assert_eq!(back, Role::Hq);
    }
}
