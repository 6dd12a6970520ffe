use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Region value that matches every lookup region.
pub const UNIVERSAL_REGION: &str = "ALL";

/// Separator used by combined-region groups such as `HK / PRC`.
pub const REGION_GROUP_SEPARATOR: char = '/';

/// Identifier assigned to a factor by the catalog that stores it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactorId(pub String);

impl fmt::Display for FactorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// GHG Protocol classification of an emission source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GhgScope {
    Scope1,
    Scope2,
    Scope3,
}

impl GhgScope {
    pub const fn ordered() -> [Self; 3] {
        [Self::Scope1, Self::Scope2, Self::Scope3]
    }

    pub const fn number(self) -> u8 {
        match self {
            Self::Scope1 => 1,
            Self::Scope2 => 2,
            Self::Scope3 => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Scope1 => "Scope 1",
            Self::Scope2 => "Scope 2",
            Self::Scope3 => "Scope 3",
        }
    }
}

impl TryFrom<u8> for GhgScope {
    type Error = InvalidScope;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Scope1),
            2 => Ok(Self::Scope2),
            3 => Ok(Self::Scope3),
            other => Err(InvalidScope(other)),
        }
    }
}

impl From<GhgScope> for u8 {
    fn from(value: GhgScope) -> Self {
        value.number()
    }
}

impl fmt::Display for GhgScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scope must be 1, 2 or 3 (got {0})")]
pub struct InvalidScope(pub u8);

/// Versioned coefficient converting one unit of activity into CO2-equivalent mass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub id: FactorId,
    pub name: String,
    pub year: i32,
    pub category: String,
    pub sub_category: String,
    pub activity_unit: String,
    pub factor_unit: String,
    pub region: String,
    pub scope: Option<GhgScope>,
    pub value: Decimal,
    pub source: String,
    pub source_url: Option<String>,
}

impl EmissionFactor {
    pub fn key(&self) -> FactorKey {
        FactorKey {
            year: self.year,
            category: self.category.clone(),
            sub_category: self.sub_category.clone(),
            activity_unit: self.activity_unit.clone(),
            factor_unit: self.factor_unit.clone(),
            region: self.region.clone(),
            scope: self.scope,
        }
    }

    pub fn region_kind(&self) -> RegionKind<'_> {
        RegionKind::parse(&self.region)
    }
}

/// Uniqueness key of the factor catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactorKey {
    pub year: i32,
    pub category: String,
    pub sub_category: String,
    pub activity_unit: String,
    pub factor_unit: String,
    pub region: String,
    pub scope: Option<GhgScope>,
}

impl fmt::Display for FactorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{} {} -> {} @ {}",
            self.year,
            self.category,
            self.sub_category,
            self.activity_unit,
            self.factor_unit,
            self.region
        )?;
        match self.scope {
            Some(scope) => write!(f, " ({scope})"),
            None => Ok(()),
        }
    }
}

/// Shape of a factor's `region` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionKind<'a> {
    Universal,
    Single(&'a str),
    Combined(Vec<&'a str>),
}

impl<'a> RegionKind<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(UNIVERSAL_REGION) {
            return Self::Universal;
        }

        if trimmed.contains(REGION_GROUP_SEPARATOR) {
            let members = trimmed
                .split(REGION_GROUP_SEPARATOR)
                .map(str::trim)
                .filter(|member| !member.is_empty())
                .collect();
            return Self::Combined(members);
        }

        Self::Single(trimmed)
    }

    /// True when `region` names exactly this region (single or the literal group text).
    pub fn is_exactly(&self, raw: &str, region: &str) -> bool {
        match self {
            Self::Single(value) => value.eq_ignore_ascii_case(region.trim()),
            Self::Universal => region.trim().eq_ignore_ascii_case(UNIVERSAL_REGION),
            Self::Combined(_) => raw.trim().eq_ignore_ascii_case(region.trim()),
        }
    }

    pub fn group_contains(&self, region: &str) -> bool {
        match self {
            Self::Combined(members) => members
                .iter()
                .any(|member| member.eq_ignore_ascii_case(region.trim())),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_kind_parses_groups_and_universal() {
        assert_eq!(RegionKind::parse(" all "), RegionKind::Universal);
        assert_eq!(RegionKind::parse("HK"), RegionKind::Single("HK"));
        assert_eq!(
            RegionKind::parse("HK / PRC"),
            RegionKind::Combined(vec!["HK", "PRC"])
        );
    }

    #[test]
    fn combined_group_membership_ignores_case_and_padding() {
        let kind = RegionKind::parse("HK / PRC");
        assert!(kind.group_contains("prc"));
        assert!(kind.group_contains(" HK"));
        assert!(!kind.group_contains("MO"));
        assert!(!RegionKind::parse("HK").group_contains("HK"));
    }

    #[test]
    fn scope_round_trips_through_integer_form() {
        assert_eq!(GhgScope::try_from(2), Ok(GhgScope::Scope2));
        assert_eq!(GhgScope::try_from(4), Err(InvalidScope(4)));
        let json = serde_json::to_string(&GhgScope::Scope3).expect("serialize scope");
        assert_eq!(json, "3");
    }
}
