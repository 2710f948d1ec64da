//! Operator session: sequenced reloads, selection dispatch, and company
//! segmentation actions on top of a [`DirectoryGateway`].
//!
//! The session owns the [`EntityStore`]. Gateway calls are the only
//! suspension points; every read model and every selection cascade runs
//! against the store as it is at the moment of the call.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use placedir_core::entities::{
    AttachmentLevel, Category, Company, CompanyAttachment, DirectorySnapshot, Segment, Subcategory,
};
use placedir_core::error::CoreError;
use placedir_core::roles::AccessScope;
use placedir_core::segmentation::{
    self, companies_without_segmentation, coverage, dangling_attachments, resolve_hierarchy,
    segment_overview, CoverageStats, SegmentOverview, SegmentTieBreak,
};
use placedir_core::selection::{Selection, SelectionController, SelectionEvent};
use placedir_core::store::{ApplyOutcome, CompanyUpdate, EntityStore, RequestToken};
use placedir_core::types::DbId;

use crate::error::{ConsoleResult, GatewayError};
use crate::gateway::DirectoryGateway;
use crate::records::{self, PlaceRecords};

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Result of a reload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The response replaced the store contents.
    Applied { revision: u64, place_ids: Vec<DbId> },
    /// A newer reload was issued while this one was in flight.
    Discarded { token: RequestToken },
}

/// Valid options for each level of a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionOptions {
    pub segments: Vec<Segment>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
}

/// Owned form of a company's resolved hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanySegmentation {
    pub company_id: DbId,
    pub segment_id: Option<DbId>,
    pub category_id: Option<DbId>,
    pub subcategory_id: Option<DbId>,
    pub candidate_segment_ids: Vec<DbId>,
    pub has_full_hierarchy: bool,
}

/// Aggregate view for overview screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub coverage: CoverageStats,
    pub uncategorized_company_ids: Vec<DbId>,
    pub dangling_company_ids: Vec<DbId>,
    pub segments: Vec<SegmentOverview>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct ConsoleSession {
    gateway: Arc<dyn DirectoryGateway>,
    store: RwLock<EntityStore>,
    scope: AccessScope,
    policy: SegmentTieBreak,
}

impl ConsoleSession {
    pub fn new(
        gateway: Arc<dyn DirectoryGateway>,
        scope: AccessScope,
        policy: SegmentTieBreak,
    ) -> Self {
        Self {
            gateway,
            store: RwLock::new(EntityStore::new()),
            scope,
            policy,
        }
    }

    pub fn scope(&self) -> AccessScope {
        self.scope
    }

    pub fn policy(&self) -> SegmentTieBreak {
        self.policy
    }

    /// Run `f` against the current snapshot.
    pub async fn with_snapshot<R>(&self, f: impl FnOnce(&DirectorySnapshot) -> R) -> R {
        f(self.store.read().await.snapshot())
    }

    pub async fn revision(&self) -> u64 {
        self.store.read().await.revision()
    }

    // -- Reloads --

    /// Reload one place, or every visible place when `place_id` is `None`.
    ///
    /// The response is applied only if no other reload was issued in the
    /// meantime. On a transport failure the store is left untouched.
    pub async fn reload(&self, place_id: Option<DbId>) -> ConsoleResult<ReloadOutcome> {
        if let Some(id) = place_id {
            if !self.scope.can_see(id) {
                let message = format!("Place {id} is outside this session");
                return Err(CoreError::Forbidden(message).into());
            }
        }

        let token = self.store.write().await.issue_token();
        tracing::debug!(token = token.value(), ?place_id, "Reload issued");

        let (snapshot, place_ids) = match self.fetch(place_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(token = token.value(), ?place_id, error = %e, "Reload failed");
                return Err(e.into());
            }
        };

        let mut store = self.store.write().await;
        match store.apply_snapshot(token, snapshot, Utc::now()) {
            ApplyOutcome::Applied { revision } => {
                tracing::info!(
                    token = token.value(),
                    revision,
                    places = place_ids.len(),
                    segments = store.snapshot().segments.len(),
                    companies = store.snapshot().companies.len(),
                    "Snapshot applied",
                );
                Ok(ReloadOutcome::Applied {
                    revision,
                    place_ids,
                })
            }
            ApplyOutcome::Stale { latest } => {
                tracing::info!(
                    token = token.value(),
                    latest = latest.value(),
                    "Discarded stale reload response",
                );
                Ok(ReloadOutcome::Discarded { token })
            }
        }
    }

    async fn fetch(
        &self,
        place_id: Option<DbId>,
    ) -> Result<(DirectorySnapshot, Vec<DbId>), GatewayError> {
        let places: Vec<_> = self
            .gateway
            .list_places()
            .await?
            .into_iter()
            .filter(|p| self.scope.can_see(p.id))
            .collect();

        let targets: Vec<DbId> = match place_id {
            Some(id) => vec![id],
            None => places.iter().map(|p| p.id).collect(),
        };

        let mut per_place = Vec::with_capacity(targets.len());
        for id in &targets {
            per_place.push(PlaceRecords {
                segments: self.gateway.list_segments(*id).await?,
                categories: self.gateway.list_categories(*id).await?,
                subcategories: self.gateway.list_subcategories(*id).await?,
                companies: self.gateway.list_companies(*id).await?,
            });
        }

        Ok((records::normalize(places, per_place), targets))
    }

    // -- Selection --

    /// Valid choices at every level for `selection`.
    pub async fn options(&self, selection: &Selection) -> SelectionOptions {
        let store = self.store.read().await;
        let (snapshot, index) = (store.snapshot(), store.index());
        SelectionOptions {
            segments: index
                .segments_for_place(snapshot, selection.place_id)
                .into_iter()
                .cloned()
                .collect(),
            categories: index
                .categories_for_place(snapshot, selection.place_id, selection.segment_id)
                .into_iter()
                .cloned()
                .collect(),
            subcategories: index
                .subcategories_for_category(snapshot, selection.category_id)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Apply an operator change against the store as it is right now.
    pub async fn dispatch(
        &self,
        controller: &mut SelectionController,
        event: SelectionEvent,
    ) -> Selection {
        let store = self.store.read().await;
        *controller.dispatch(event, &store)
    }

    /// Re-validate a selection after reloads. Returns `true` if anything
    /// was cleared.
    pub async fn sync_selection(&self, controller: &mut SelectionController) -> bool {
        let store = self.store.read().await;
        controller.sync(&store)
    }

    // -- Company segmentation --

    pub async fn resolve_company(&self, company_id: DbId) -> ConsoleResult<CompanySegmentation> {
        let store = self.store.read().await;
        let snapshot = store.snapshot();
        let company = snapshot.company(company_id).ok_or(CoreError::NotFound {
            entity: "company",
            id: company_id,
        })?;
        let resolved = resolve_hierarchy(company, snapshot, self.policy);
        Ok(CompanySegmentation {
            company_id,
            segment_id: resolved.segment.map(|s| s.id),
            category_id: resolved.category.map(|c| c.id),
            subcategory_id: resolved.subcategory.map(|s| s.id),
            candidate_segment_ids: resolved.candidate_segment_ids,
            has_full_hierarchy: resolved.has_full_hierarchy,
        })
    }

    pub async fn assign_to_segment(
        &self,
        company_id: DbId,
        segment_id: DbId,
    ) -> ConsoleResult<Company> {
        self.assign_company(company_id, CompanyAttachment::Segment(segment_id))
            .await
    }

    pub async fn assign_to_category(
        &self,
        company_id: DbId,
        category_id: DbId,
    ) -> ConsoleResult<Company> {
        self.assign_company(company_id, CompanyAttachment::Category(category_id))
            .await
    }

    pub async fn assign_to_subcategory(
        &self,
        company_id: DbId,
        subcategory_id: DbId,
    ) -> ConsoleResult<Company> {
        self.assign_company(company_id, CompanyAttachment::Subcategory(subcategory_id))
            .await
    }

    pub async fn remove_segmentation(&self, company_id: DbId) -> ConsoleResult<Company> {
        self.assign_company(company_id, CompanyAttachment::Unattached)
            .await
    }

    /// Re-point a company to `attachment`.
    ///
    /// The request is checked against the current snapshot before anything
    /// is sent; the store only changes once the backend confirmed the new
    /// attachment.
    pub async fn assign_company(
        &self,
        company_id: DbId,
        attachment: CompanyAttachment,
    ) -> ConsoleResult<Company> {
        let request = {
            let store = self.store.read().await;
            let request =
                segmentation::request_attachment(store.snapshot(), company_id, attachment)?;
            if let Some(company) = store.company(company_id) {
                if !self.scope.can_see(company.place_id) {
                    return Err(CoreError::Forbidden(format!(
                        "Company {company_id} is outside this session"
                    ))
                    .into());
                }
            }
            request
        };

        let response = match request.attachment {
            CompanyAttachment::Unattached => {
                self.gateway.remove_company_segmentation(company_id).await
            }
            CompanyAttachment::Segment(id) => {
                self.gateway
                    .assign_company(company_id, AttachmentLevel::Segment, id)
                    .await
            }
            CompanyAttachment::Category(id) => {
                self.gateway
                    .assign_company(company_id, AttachmentLevel::Category, id)
                    .await
            }
            CompanyAttachment::Subcategory(id) => {
                self.gateway
                    .assign_company(company_id, AttachmentLevel::Subcategory, id)
                    .await
            }
        };

        let record = match response {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(company_id, error = %e, "Company segmentation update failed");
                return Err(e.into());
            }
        };

        let company = Company::from(record);
        if company.id != company_id || company.attachment != request.attachment {
            return Err(GatewayError::Malformed {
                entity: "company",
                id: company_id,
                reason: format!(
                    "expected attachment {:?}, backend returned {:?}",
                    request.attachment, company.attachment
                ),
            }
            .into());
        }

        match self.store.write().await.confirm_company(company.clone()) {
            CompanyUpdate::Applied { revision } => tracing::info!(
                company_id,
                revision,
                level = company.attachment.level().map(|l| l.as_str()),
                target_id = company.attachment.target_id(),
                "Company segmentation updated",
            ),
            CompanyUpdate::OutOfScope => tracing::info!(
                company_id,
                "Company segmentation updated outside the loaded scope",
            ),
        }
        Ok(company)
    }

    // -- Reporting --

    /// Coverage and per-segment counts for one place, or for the whole
    /// loaded scope when `place_id` is `None`.
    pub async fn coverage_report(&self, place_id: Option<DbId>) -> CoverageReport {
        let store = self.store.read().await;
        let snapshot = store.snapshot();

        let companies: Vec<Company> = snapshot
            .companies
            .iter()
            .filter(|c| place_id.map_or(true, |p| c.place_id == p))
            .cloned()
            .collect();

        let place_ids: Vec<DbId> = match place_id {
            Some(id) => vec![id],
            None => snapshot.places.iter().map(|p| p.id).collect(),
        };

        CoverageReport {
            coverage: coverage(&companies),
            uncategorized_company_ids: companies_without_segmentation(&companies)
                .iter()
                .map(|c| c.id)
                .collect(),
            dangling_company_ids: dangling_attachments(&companies, snapshot)
                .iter()
                .map(|c| c.id)
                .collect(),
            segments: place_ids
                .into_iter()
                .flat_map(|id| segment_overview(snapshot, id))
                .collect(),
        }
    }
}
