//! Geographic drill-down.
//!
//! A single selector string picks how far down the world → country →
//! region/state → city ladder the search goes:
//!
//! | Selector | Filters | Buckets by |
//! |---|---|---|
//! | `world` | none | country |
//! | `US` | country = US | region |
//! | `US-CA` | country = US, region = CA | city |
//! | anything else | country = selector | city |
//!
//! Parsing is total: a string that is not `world` or a US form is taken as a
//! country code without checking it names a real country.

use crate::request::FilterClause;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const COUNTRY_FIELD: &str = "request_ip_country";
pub const REGION_FIELD: &str = "request_ip_region";
pub const CITY_FIELD: &str = "request_ip_city";

const WORLD: &str = "world";
const US: &str = "US";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegionSelector {
    World,
    UsCountry,
    /// Two-letter US state code, e.g. `CA` from `US-CA`.
    UsState(String),
    Country(String),
}

impl RegionSelector {
    pub fn parse(raw: &str) -> Self {
        match raw {
            WORLD => RegionSelector::World,
            US => RegionSelector::UsCountry,
            _ => match raw.strip_prefix("US-") {
                Some(state) if is_state_code(state) => RegionSelector::UsState(state.to_string()),
                _ => RegionSelector::Country(raw.to_string()),
            },
        }
    }

    /// Filters and bucketing field for this selector.
    pub fn plan(&self) -> RegionPlan {
        match self {
            RegionSelector::World => RegionPlan {
                filters: Vec::new(),
                field: COUNTRY_FIELD,
                country: None,
                state: None,
            },
            RegionSelector::UsCountry => RegionPlan {
                filters: vec![FilterClause::term(COUNTRY_FIELD, US)],
                field: REGION_FIELD,
                country: Some(US.to_string()),
                state: None,
            },
            RegionSelector::UsState(state) => RegionPlan {
                filters: vec![
                    FilterClause::term(COUNTRY_FIELD, US),
                    FilterClause::term(REGION_FIELD, state.as_str()),
                ],
                field: CITY_FIELD,
                country: Some(US.to_string()),
                state: Some(state.clone()),
            },
            RegionSelector::Country(country) => RegionPlan {
                filters: vec![FilterClause::term(COUNTRY_FIELD, country.as_str())],
                field: CITY_FIELD,
                country: Some(country.clone()),
                state: None,
            },
        }
    }
}

fn is_state_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

impl FromStr for RegionSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RegionSelector::parse(s))
    }
}

impl fmt::Display for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelector::World => write!(f, "{WORLD}"),
            RegionSelector::UsCountry => write!(f, "{US}"),
            RegionSelector::UsState(state) => write!(f, "{US}-{state}"),
            RegionSelector::Country(country) => write!(f, "{country}"),
        }
    }
}

/// What a selector does to the request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPlan {
    /// Appended to the filter conjunction in this order.
    pub filters: Vec<FilterClause>,
    /// Field the `regions` terms and `missing_regions` aggregations read.
    pub field: &'static str,
    pub country: Option<String>,
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("world", RegionSelector::World)]
    #[case("US", RegionSelector::UsCountry)]
    #[case("US-CA", RegionSelector::UsState("CA".to_string()))]
    #[case("US-ca", RegionSelector::Country("US-ca".to_string()))]
    #[case("US-CAL", RegionSelector::Country("US-CAL".to_string()))]
    #[case("DE", RegionSelector::Country("DE".to_string()))]
    #[case("World", RegionSelector::Country("World".to_string()))]
    #[case("", RegionSelector::Country(String::new()))]
    fn parse_selector(#[case] raw: &str, #[case] expected: RegionSelector) {
        assert_eq!(RegionSelector::parse(raw), expected);
    }

    #[rstest]
    #[case("world")]
    #[case("US")]
    #[case("US-TX")]
    #[case("FR")]
    fn display_round_trips(#[case] raw: &str) {
        assert_eq!(RegionSelector::parse(raw).to_string(), raw);
    }

    #[test]
    fn state_plan_filters_country_then_region() {
        let plan = RegionSelector::parse("US-CA").plan();
        assert_eq!(
            plan.filters,
            vec![
                FilterClause::term(COUNTRY_FIELD, "US"),
                FilterClause::term(REGION_FIELD, "CA"),
            ]
        );
        assert_eq!(plan.field, CITY_FIELD);
        assert_eq!(plan.country.as_deref(), Some("US"));
        assert_eq!(plan.state.as_deref(), Some("CA"));
    }

    #[test]
    fn world_plan_has_no_filters() {
        let plan = RegionSelector::World.plan();
        assert!(plan.filters.is_empty());
        assert_eq!(plan.field, COUNTRY_FIELD);
        assert_eq!(plan.country, None);
    }
}
