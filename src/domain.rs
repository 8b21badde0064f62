use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::{REGIONS, Region, region_by_code};
use crate::error::CrashError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int8,
    Int16,
    Float64,
    Text { width: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionCode(usize);

impl RegionCode {
    pub fn all() -> impl Iterator<Item = RegionCode> {
        (0..REGIONS.len()).map(RegionCode)
    }

    pub fn as_str(&self) -> &'static str {
        self.region().code
    }

    pub fn csv_id(&self) -> &'static str {
        self.region().csv_id
    }

    pub fn csv_member(&self) -> String {
        format!("{}.csv", self.csv_id())
    }

    fn region(&self) -> &'static Region {
        &REGIONS[self.0]
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RegionCode {
    type Err = CrashError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        region_by_code(value.trim())
            .map(RegionCode)
            .ok_or_else(|| CrashError::UnknownRegion(value.to_string()))
    }
}

impl Serialize for RegionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RegionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_region_code_valid() {
        let code: RegionCode = " jhm".parse().unwrap();
        assert_eq!(code.as_str(), "JHM");
        assert_eq!(code.csv_id(), "06");
        assert_eq!(code.csv_member(), "06.csv");
    }

    #[test]
    fn parse_region_code_invalid() {
        let err = "JM".parse::<RegionCode>().unwrap_err();
        assert_matches!(err, CrashError::UnknownRegion(_));
    }

    #[test]
    fn ordering_is_catalog_order() {
        let vys: RegionCode = "VYS".parse().unwrap();
        let jhm: RegionCode = "JHM".parse().unwrap();
        assert!(jhm < vys);
        assert_eq!(RegionCode::all().count(), 14);
        assert_eq!(RegionCode::all().next().unwrap().as_str(), "PHA");
    }
}
