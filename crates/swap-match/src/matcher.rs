use std::sync::Arc;

use swap_store::RequestStore;
use swap_types::{fields, require, SwapRequest, ValidationError};
use tracing::debug;

use crate::error::MatchError;
use crate::result::{MatchResult, Party, SwapGroup, SELF_CONTACT_PLACEHOLDER};

/// A querying party: "I hold `current` and want `desired`".
///
/// `contact` only labels the querier inside three-way groups. It is never
/// stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchQuery {
    pub current: String,
    pub desired: String,
    pub contact: Option<String>,
}

impl MatchQuery {
    pub fn new(current: impl Into<String>, desired: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            desired: desired.into(),
            contact: None,
        }
    }

    /// Attach the querier's contact. A blank contact is treated as absent.
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        let contact = contact.into();
        self.contact = (!contact.trim().is_empty()).then_some(contact);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require(fields::CURRENT_SECTION, &self.current)?;
        require(fields::DESIRED_SECTION, &self.desired)?;
        Ok(())
    }

    /// The querier as it appears in a three-way group.
    pub fn party(&self) -> Party {
        Party {
            current_section: self.current.clone(),
            desired_section: self.desired.clone(),
            contact: self
                .contact
                .clone()
                .unwrap_or_else(|| SELF_CONTACT_PLACEHOLDER.to_string()),
        }
    }
}

/// Classify the best swap opportunity for `query` in `store`.
///
/// Direct matches are returned whenever any exist; the three-way search only
/// runs when there are none.
pub fn find_matches(
    store: &dyn RequestStore,
    query: &MatchQuery,
) -> Result<MatchResult, MatchError> {
    query.validate()?;

    let direct = direct_matches(store, query)?;
    let result = if !direct.is_empty() {
        MatchResult::Direct(direct)
    } else {
        let groups = three_way_matches(store, query)?;
        if groups.is_empty() {
            MatchResult::NoMatch
        } else {
            MatchResult::ThreeWay(groups)
        }
    };

    debug!(
        current = %query.current,
        desired = %query.desired,
        match_type = %result.match_type(),
        count = result.len(),
        "match search complete"
    );
    Ok(result)
}

/// Records holding what the querier wants and wanting what it holds.
fn direct_matches(
    store: &dyn RequestStore,
    query: &MatchQuery,
) -> Result<Vec<SwapRequest>, MatchError> {
    Ok(store.find_by(&query.desired, &query.current)?)
}

/// One group per first link that some second link can close.
fn three_way_matches(
    store: &dyn RequestStore,
    query: &MatchQuery,
) -> Result<Vec<SwapGroup>, MatchError> {
    let first_links = store.find_by_desired(&query.current)?;
    let mut groups = Vec::new();

    for first in first_links {
        // The second link must hold what we want and want what `first` holds.
        if let Some(second) = store.find_one_by(&query.desired, &first.current_section)? {
            groups.push(SwapGroup {
                person1: query.party(),
                person2: first,
                person3: second,
            });
        }
    }
    Ok(groups)
}

/// Match searches against a shared store handle.
pub struct Matcher {
    store: Arc<dyn RequestStore>,
}

impl Matcher {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// See [`find_matches`].
    pub fn find_matches(&self, query: &MatchQuery) -> Result<MatchResult, MatchError> {
        find_matches(self.store.as_ref(), query)
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_store::{InMemoryRequestStore, StoreError};
    use swap_types::NewSwapRequest;

    fn store() -> Arc<InMemoryRequestStore> {
        Arc::new(InMemoryRequestStore::new())
    }

    fn submit(store: &InMemoryRequestStore, current: &str, desired: &str, contact: &str) -> SwapRequest {
        store
            .insert(NewSwapRequest::new(current, desired, contact))
            .unwrap()
    }

    fn matcher(store: &Arc<InMemoryRequestStore>) -> Matcher {
        Matcher::new(store.clone())
    }

    // -----------------------------------------------------------------------
    // Direct
    // -----------------------------------------------------------------------

    #[test]
    fn direct_scenario() {
        let s = store();
        submit(&s, "CS101-A", "CS101-B", "+1-111");
        let b = submit(&s, "CS101-B", "CS101-A", "+1-222");

        let result = matcher(&s)
            .find_matches(&MatchQuery::new("CS101-A", "CS101-B"))
            .unwrap();
        assert_eq!(result, MatchResult::Direct(vec![b]));
    }

    #[test]
    fn direct_returns_every_mirror() {
        let s = store();
        let b1 = submit(&s, "B", "A", "1");
        let b2 = submit(&s, "B", "A", "2");
        submit(&s, "B", "C", "3");

        let result = matcher(&s).find_matches(&MatchQuery::new("A", "B")).unwrap();
        assert_eq!(result, MatchResult::Direct(vec![b1, b2]));
    }

    #[test]
    fn direct_beats_three_way() {
        let s = store();
        // Completable 3-cycle for (A, B).
        submit(&s, "X", "A", "L");
        submit(&s, "B", "X", "S");
        // And a direct mirror.
        let d = submit(&s, "B", "A", "D");

        let result = matcher(&s).find_matches(&MatchQuery::new("A", "B")).unwrap();
        assert_eq!(result, MatchResult::Direct(vec![d]));
    }

    // -----------------------------------------------------------------------
    // Three-way
    // -----------------------------------------------------------------------

    #[test]
    fn three_way_scenario() {
        let s = store();
        let l = submit(&s, "MA201-X", "CS101-A", "+1-333");
        let sl = submit(&s, "CS101-B", "MA201-X", "+1-444");

        let query = MatchQuery::new("CS101-A", "CS101-B").with_contact("+1-999");
        let result = matcher(&s).find_matches(&query).unwrap();

        let expected = SwapGroup {
            person1: Party {
                current_section: "CS101-A".into(),
                desired_section: "CS101-B".into(),
                contact: "+1-999".into(),
            },
            person2: l,
            person3: sl,
        };
        assert_eq!(result, MatchResult::ThreeWay(vec![expected.clone()]));
        assert!(expected.is_closed_cycle());
    }

    #[test]
    fn missing_contact_uses_placeholder() {
        let s = store();
        submit(&s, "X", "A", "L");
        submit(&s, "B", "X", "S");

        for query in [
            MatchQuery::new("A", "B"),
            MatchQuery::new("A", "B").with_contact("   "),
        ] {
            let result = matcher(&s).find_matches(&query).unwrap();
            let MatchResult::ThreeWay(groups) = result else {
                panic!("expected three-way result");
            };
            assert_eq!(groups[0].person1.contact, SELF_CONTACT_PLACEHOLDER);
        }
    }

    #[test]
    fn each_first_link_yields_one_group() {
        let s = store();
        let l1 = submit(&s, "X", "A", "L1");
        let l2 = submit(&s, "Y", "A", "L2");
        submit(&s, "Z", "A", "L3"); // nobody holds B wanting Z
        let s1 = submit(&s, "B", "X", "S1");
        submit(&s, "B", "X", "S1-later");
        let s2 = submit(&s, "B", "Y", "S2");

        let result = matcher(&s).find_matches(&MatchQuery::new("A", "B")).unwrap();
        let MatchResult::ThreeWay(groups) = result else {
            panic!("expected three-way result");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].person2, l1);
        assert_eq!(groups[0].person3, s1);
        assert_eq!(groups[1].person2, l2);
        assert_eq!(groups[1].person3, s2);
        assert!(groups.iter().all(SwapGroup::is_closed_cycle));
    }

    #[test]
    fn broken_chain_is_no_match() {
        let s = store();
        submit(&s, "X", "A", "L");
        submit(&s, "B", "Y", "S"); // wants Y, not X

        let result = matcher(&s).find_matches(&MatchQuery::new("A", "B")).unwrap();
        assert_eq!(result, MatchResult::NoMatch);
    }

    // -----------------------------------------------------------------------
    // Edge cases
    // -----------------------------------------------------------------------

    #[test]
    fn empty_store_is_no_match() {
        let s = store();
        let result = matcher(&s).find_matches(&MatchQuery::new("A", "B")).unwrap();
        assert_eq!(result, MatchResult::NoMatch);
        assert!(result.is_empty());
    }

    #[test]
    fn matching_is_case_sensitive() {
        let s = store();
        submit(&s, "math101", "cs101", "x");
        let result = matcher(&s)
            .find_matches(&MatchQuery::new("CS101", "Math101"))
            .unwrap();
        assert_eq!(result, MatchResult::NoMatch);
    }

    #[test]
    fn self_swap_is_permitted() {
        let s = store();
        let own = submit(&s, "A", "A", "me");
        let result = matcher(&s).find_matches(&MatchQuery::new("A", "A")).unwrap();
        assert_eq!(result, MatchResult::Direct(vec![own]));
    }

    #[test]
    fn blank_sections_are_rejected() {
        let s = store();
        let err = matcher(&s).find_matches(&MatchQuery::new("", "B")).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Validation(ValidationError::MissingField(f)) if f == fields::CURRENT_SECTION
        ));
        let err = matcher(&s).find_matches(&MatchQuery::new("A", " ")).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Validation(ValidationError::MissingField(f)) if f == fields::DESIRED_SECTION
        ));
    }

    #[test]
    fn closed_store_propagates_unavailable() {
        let s = store();
        s.close().unwrap();
        let err = matcher(&s).find_matches(&MatchQuery::new("A", "B")).unwrap_err();
        assert!(matches!(err, MatchError::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn free_function_matches_matcher() {
        let s = store();
        submit(&s, "B", "A", "x");
        let query = MatchQuery::new("A", "B");
        assert_eq!(
            find_matches(s.as_ref(), &query).unwrap(),
            matcher(&s).find_matches(&query).unwrap()
        );
    }
}
