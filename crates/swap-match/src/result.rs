use std::fmt;

use serde::{Deserialize, Serialize};
use swap_types::SwapRequest;

/// Contact shown for the querying party when the caller did not give one.
pub const SELF_CONTACT_PLACEHOLDER: &str = "Your number";

/// The querying party inside a three-way group.
///
/// This is synthesized from the query and never stored, so it has no id or
/// creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub current_section: String,
    pub desired_section: String,
    pub contact: String,
}

/// A closed three-party exchange.
///
/// `person1` (the querier) gives its section to `person2`, `person2` gives
/// to `person3`, and `person3` gives to `person1`:
///
/// ```text
/// person1: has C, wants D
/// person2: has X, wants C     (first link)
/// person3: has D, wants X     (second link)
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapGroup {
    pub person1: Party,
    pub person2: SwapRequest,
    pub person3: SwapRequest,
}

impl SwapGroup {
    /// The record that wants what the querier holds.
    pub fn first_link(&self) -> &SwapRequest {
        &self.person2
    }

    /// The record that holds what the querier wants.
    pub fn second_link(&self) -> &SwapRequest {
        &self.person3
    }

    /// Returns `true` if every party ends up with the section it wants.
    pub fn is_closed_cycle(&self) -> bool {
        let (first, second) = (self.first_link(), self.second_link());
        first.desired_section == self.person1.current_section
            && second.desired_section == first.current_section
            && self.person1.desired_section == second.current_section
    }
}

/// Classification of a match result, as sent on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Direct,
    ThreeWay,
    #[serde(rename = "none")]
    NoMatch,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ThreeWay => "three-way",
            Self::NoMatch => "none",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a match search.
///
/// Serializes as `{"matchType": "direct" | "three-way" | "none", "matches": [...]}`;
/// a `NoMatch` result carries an empty `matches` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireResult", from = "WireResult")]
pub enum MatchResult {
    /// Records that mirror the query exactly.
    Direct(Vec<SwapRequest>),
    /// One group per first link that could be closed into a cycle.
    ThreeWay(Vec<SwapGroup>),
    NoMatch,
}

impl MatchResult {
    pub fn match_type(&self) -> MatchType {
        match self {
            Self::Direct(_) => MatchType::Direct,
            Self::ThreeWay(_) => MatchType::ThreeWay,
            Self::NoMatch => MatchType::NoMatch,
        }
    }

    /// Number of direct matches or three-way groups.
    pub fn len(&self) -> usize {
        match self {
            Self::Direct(records) => records.len(),
            Self::ThreeWay(groups) => groups.len(),
            Self::NoMatch => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "matchType", content = "matches", rename_all = "kebab-case")]
enum WireResult {
    Direct(Vec<SwapRequest>),
    ThreeWay(Vec<SwapGroup>),
    None(Vec<SwapRequest>),
}

impl From<MatchResult> for WireResult {
    fn from(result: MatchResult) -> Self {
        match result {
            MatchResult::Direct(records) => Self::Direct(records),
            MatchResult::ThreeWay(groups) => Self::ThreeWay(groups),
            MatchResult::NoMatch => Self::None(Vec::new()),
        }
    }
}

impl From<WireResult> for MatchResult {
    fn from(wire: WireResult) -> Self {
        match wire {
            WireResult::Direct(records) if !records.is_empty() => Self::Direct(records),
            WireResult::ThreeWay(groups) if !groups.is_empty() => Self::ThreeWay(groups),
            _ => Self::NoMatch,
        }
    }
}
