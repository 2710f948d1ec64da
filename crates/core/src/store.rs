//! In-memory entity store with sequenced snapshot application.
//!
//! Every reload takes a [`RequestToken`] before it is issued. A response is
//! applied only if its token is still the latest one handed out, and
//! application always replaces the whole snapshot. A slow, stale response
//! can therefore never clobber data from a newer request, not even
//! partially.
//!
//! Confirmed company mutations are sequenced against the same tokens. A
//! reload issued before a mutation was confirmed may have read the company
//! before the change, so the confirmed company is laid over that reload's
//! snapshot when it is applied.

use serde::{Deserialize, Serialize};

use crate::entities::{Company, DirectorySnapshot};
use crate::hierarchy::HierarchyIndex;
use crate::types::{DbId, Timestamp};

/// Monotonic sequence number attached to a reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Result of offering a snapshot to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot replaced the store contents; carries the new revision.
    Applied { revision: u64 },
    /// A newer request was issued after this one; the snapshot was dropped.
    Stale { latest: RequestToken },
}

/// Result of offering a confirmed company mutation to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyUpdate {
    /// The loaded company was replaced; carries the new revision.
    Applied { revision: u64 },
    /// The company is not part of the loaded scope; nothing changed.
    OutOfScope,
}

/// A confirmed company, tagged with the latest token issued at the time.
#[derive(Debug, Clone)]
struct ConfirmedCompany {
    issued_before: u64,
    company: Company,
}

/// Holds the currently loaded directory collections for the active scope.
#[derive(Debug, Default)]
pub struct EntityStore {
    snapshot: DirectorySnapshot,
    index: HierarchyIndex,
    /// Bumped on every change visible to readers.
    revision: u64,
    last_issued: u64,
    last_applied: Option<RequestToken>,
    applied_at: Option<Timestamp>,
    /// Mutations confirmed since the last applied snapshot.
    confirmed: Vec<ConfirmedCompany>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next request token. Any snapshot carrying an older
    /// token becomes stale from this point on.
    pub fn issue_token(&mut self) -> RequestToken {
        self.last_issued += 1;
        RequestToken(self.last_issued)
    }

    /// The most recently issued token, if any.
    pub fn latest_token(&self) -> Option<RequestToken> {
        (self.last_issued > 0).then_some(RequestToken(self.last_issued))
    }

    /// Replace the store contents with `snapshot` if `token` is current.
    pub fn apply_snapshot(
        &mut self,
        token: RequestToken,
        mut snapshot: DirectorySnapshot,
        now: Timestamp,
    ) -> ApplyOutcome {
        if token.0 != self.last_issued {
            return ApplyOutcome::Stale {
                latest: RequestToken(self.last_issued),
            };
        }

        for confirmed in self.confirmed.drain(..) {
            // Only reloads issued before the confirmation can hold the old company.
            if confirmed.issued_before >= token.0 {
                snapshot.replace_company(confirmed.company);
            }
        }

        self.index = HierarchyIndex::build(&snapshot);
        self.snapshot = snapshot;
        self.revision += 1;
        self.last_applied = Some(token);
        self.applied_at = Some(now);

        ApplyOutcome::Applied {
            revision: self.revision,
        }
    }

    /// Refresh a single company from a confirmed mutation response.
    ///
    /// Only a company that is already loaded is replaced; a response for a
    /// company outside the loaded scope is dropped. Either way the company
    /// is remembered until the next snapshot is applied, so a reload that
    /// was in flight during the mutation cannot revert it. The hierarchy
    /// index does not cover companies, so it stays valid.
    pub fn confirm_company(&mut self, company: Company) -> CompanyUpdate {
        self.confirmed.push(ConfirmedCompany {
            issued_before: self.last_issued,
            company: company.clone(),
        });
        if !self.snapshot.replace_company(company) {
            return CompanyUpdate::OutOfScope;
        }
        self.revision += 1;
        CompanyUpdate::Applied {
            revision: self.revision,
        }
    }

    pub fn snapshot(&self) -> &DirectorySnapshot {
        &self.snapshot
    }

    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn last_applied(&self) -> Option<RequestToken> {
        self.last_applied
    }

    pub fn applied_at(&self) -> Option<Timestamp> {
        self.applied_at
    }

    pub fn company(&self, id: DbId) -> Option<&Company> {
        self.snapshot.company(id)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;

    use super::*;
    use crate::entities::CompanyAttachment;
    use crate::fixtures::{company, food_and_drink, place};

    fn place_only(id: DbId, name: &str) -> DirectorySnapshot {
        DirectorySnapshot {
            places: vec![place(id, name)],
            ..Default::default()
        }
    }

    #[test]
    fn tokens_are_monotonic() {
        let mut store = EntityStore::new();
        assert_eq!(store.latest_token(), None);
        let a = store.issue_token();
        let b = store.issue_token();
        assert!(b > a);
        assert_eq!(store.latest_token(), Some(b));
    }

    #[test]
    fn latest_token_is_applied() {
        let mut store = EntityStore::new();
        let token = store.issue_token();
        let outcome = store.apply_snapshot(token, food_and_drink(), Utc::now());
        assert_eq!(outcome, ApplyOutcome::Applied { revision: 1 });
        assert_eq!(store.snapshot().segments.len(), 2);
        assert_eq!(store.last_applied(), Some(token));
        assert!(store.applied_at().is_some());
    }

    #[test]
    fn out_of_order_response_is_discarded() {
        let mut store = EntityStore::new();
        let token_a = store.issue_token();
        let token_b = store.issue_token();

        let applied = store.apply_snapshot(token_b, place_only(2, "B"), Utc::now());
        assert_matches!(applied, ApplyOutcome::Applied { .. });

        let stale = store.apply_snapshot(token_a, place_only(1, "A"), Utc::now());
        assert_eq!(stale, ApplyOutcome::Stale { latest: token_b });

        assert_eq!(store.snapshot().places.len(), 1);
        assert_eq!(store.snapshot().places[0].name, "B");
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn response_superseded_before_arrival_is_discarded() {
        let mut store = EntityStore::new();
        let token_a = store.issue_token();
        let _token_b = store.issue_token();

        let outcome = store.apply_snapshot(token_a, place_only(1, "A"), Utc::now());
        assert_matches!(outcome, ApplyOutcome::Stale { .. });
        assert!(store.snapshot().places.is_empty());
    }

    #[test]
    fn snapshot_replaces_collections_wholesale() {
        let mut store = EntityStore::new();
        let first = store.issue_token();
        store.apply_snapshot(first, food_and_drink(), Utc::now());

        let second = store.issue_token();
        store.apply_snapshot(second, place_only(2, "Uptown"), Utc::now());

        assert!(store.snapshot().segments.is_empty());
        assert!(store.snapshot().companies.is_empty());
        assert!(store
            .index()
            .segments_for_place(store.snapshot(), Some(1))
            .is_empty());
    }

    #[test]
    fn confirmed_company_bumps_revision() {
        let mut store = EntityStore::new();
        let token = store.issue_token();
        store.apply_snapshot(token, food_and_drink(), Utc::now());

        let updated = company(1003, 1, "Mystery Shop", CompanyAttachment::Segment(2));
        let outcome = store.confirm_company(updated);

        assert_eq!(outcome, CompanyUpdate::Applied { revision: 2 });
        assert_eq!(
            store.company(1003).map(|c| c.attachment),
            Some(CompanyAttachment::Segment(2))
        );
    }

    #[test]
    fn confirmed_company_outside_loaded_scope_is_dropped() {
        let mut store = EntityStore::new();
        let token = store.issue_token();
        store.apply_snapshot(token, place_only(2, "Uptown"), Utc::now());

        let stray = company(1003, 1, "Mystery Shop", CompanyAttachment::Segment(2));
        assert_eq!(store.confirm_company(stray), CompanyUpdate::OutOfScope);
        assert!(store.snapshot().companies.is_empty());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn reload_in_flight_keeps_confirmed_company() {
        let mut store = EntityStore::new();
        let first = store.issue_token();
        store.apply_snapshot(first, food_and_drink(), Utc::now());

        // Reload issued, then a mutation confirms before its response lands.
        let reload = store.issue_token();
        let confirmed = company(1003, 1, "Mystery Shop", CompanyAttachment::Category(10));
        store.confirm_company(confirmed);

        let outcome = store.apply_snapshot(reload, food_and_drink(), Utc::now());
        assert_matches!(outcome, ApplyOutcome::Applied { .. });
        assert_eq!(
            store.company(1003).map(|c| c.attachment),
            Some(CompanyAttachment::Category(10))
        );
    }

    #[test]
    fn reload_issued_after_confirmation_wins() {
        let mut store = EntityStore::new();
        let first = store.issue_token();
        store.apply_snapshot(first, food_and_drink(), Utc::now());

        store.confirm_company(company(1003, 1, "Mystery Shop", CompanyAttachment::Segment(1)));

        // Issued after the confirmation, so its data is authoritative.
        let reload = store.issue_token();
        store.apply_snapshot(reload, food_and_drink(), Utc::now());
        assert_eq!(
            store.company(1003).map(|c| c.attachment),
            Some(CompanyAttachment::Unattached)
        );
    }

    #[test]
    fn confirmed_company_is_laid_over_only_once() {
        let mut store = EntityStore::new();
        let reload = store.issue_token();
        store.confirm_company(company(1003, 1, "Mystery Shop", CompanyAttachment::Segment(1)));
        store.apply_snapshot(reload, food_and_drink(), Utc::now());
        assert_eq!(
            store.company(1003).map(|c| c.attachment),
            Some(CompanyAttachment::Segment(1))
        );

        let next = store.issue_token();
        store.apply_snapshot(next, food_and_drink(), Utc::now());
        assert_eq!(
            store.company(1003).map(|c| c.attachment),
            Some(CompanyAttachment::Unattached)
        );
    }
}
