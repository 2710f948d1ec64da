//! In-memory [`DirectoryGateway`] backed by a normalized snapshot.
//!
//! Serves fixture data to the `placedir-console` binary and to tests. It
//! denormalizes on the way out exactly like the real backend, and can
//! inject per-place latency and transport failures.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use placedir_core::entities::{
    AttachmentLevel, Category, Company, CompanyAttachment, DirectorySnapshot, Place, Segment,
    Subcategory,
};
use placedir_core::types::DbId;

use crate::error::GatewayError;
use crate::gateway::DirectoryGateway;
use crate::records::{CategoryRecord, CompanyRecord, SubcategoryRecord};

pub struct InMemoryGateway {
    data: RwLock<DirectorySnapshot>,
    /// Delay applied to every listing call for a place.
    latency: HashMap<DbId, Duration>,
    offline: AtomicBool,
}

impl InMemoryGateway {
    pub fn new(data: DirectorySnapshot) -> Self {
        Self {
            data: RwLock::new(data),
            latency: HashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// Load a snapshot serialized as JSON.
    pub fn from_json(json: &str) -> Result<Self, GatewayError> {
        let data: DirectorySnapshot = serde_json::from_str(json).map_err(|e| {
            GatewayError::Malformed {
                entity: "fixture",
                id: 0,
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(data))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, GatewayError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Slow down every listing call for `place_id`.
    pub fn with_latency(mut self, place_id: DbId, delay: Duration) -> Self {
        self.latency.insert(place_id, delay);
        self
    }

    /// While offline every call fails with [`GatewayError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replace the backing data, as if another operator edited the directory.
    pub async fn replace_data(&self, data: DirectorySnapshot) {
        *self.data.write().await = data;
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("gateway is offline".to_string()));
        }
        Ok(())
    }

    async fn listing_delay(&self, place_id: DbId) -> Result<(), GatewayError> {
        self.ensure_online()?;
        if let Some(delay) = self.latency.get(&place_id) {
            tokio::time::sleep(*delay).await;
        }
        Ok(())
    }

    async fn update_attachment(
        &self,
        company_id: DbId,
        attachment: CompanyAttachment,
    ) -> Result<CompanyRecord, GatewayError> {
        self.ensure_online()?;
        let mut data = self.data.write().await;
        let company = data
            .companies
            .iter_mut()
            .find(|c| c.id == company_id)
            .ok_or_else(|| GatewayError::Rejected(format!("company {company_id} not found")))?;
        company.attachment = attachment;
        let company = company.clone();
        Ok(company_record(&company, &data))
    }
}

/* --------------------------------------------------------------------------
Denormalization
-------------------------------------------------------------------------- */

fn category_record(category: &Category, data: &DirectorySnapshot) -> CategoryRecord {
    CategoryRecord {
        id: category.id,
        place_id: category.place_id,
        name: category.name.clone(),
        slug: category.slug.clone(),
        order: category.order,
        is_active: category.is_active,
        segments: category
            .segment_ids
            .iter()
            .filter_map(|id| data.segment(*id).cloned())
            .collect(),
    }
}

/// `None` when the owning category is missing from the backing data.
fn subcategory_record(
    subcategory: &Subcategory,
    data: &DirectorySnapshot,
) -> Option<SubcategoryRecord> {
    let category = data.category(subcategory.category_id)?;
    Some(SubcategoryRecord {
        id: subcategory.id,
        place_id: subcategory.place_id,
        name: subcategory.name.clone(),
        slug: subcategory.slug.clone(),
        order: subcategory.order,
        is_active: subcategory.is_active,
        category: category_record(category, data),
    })
}

fn company_record(company: &Company, data: &DirectorySnapshot) -> CompanyRecord {
    let subcategory = match company.attachment {
        CompanyAttachment::Subcategory(id) => data.subcategory(id),
        _ => None,
    };
    let category = match company.attachment {
        CompanyAttachment::Category(id) => data.category(id),
        CompanyAttachment::Subcategory(_) => subcategory.and_then(|s| data.category(s.category_id)),
        _ => None,
    };
    let segment = match company.attachment {
        CompanyAttachment::Segment(id) => data.segment(id),
        _ => category
            .and_then(|c| c.segment_ids.first())
            .and_then(|id| data.segment(*id)),
    };

    // The direct attachment id is reported even when its entity is gone.
    let direct = company.attachment.fields();

    CompanyRecord {
        id: company.id,
        place_id: company.place_id,
        name: company.name.clone(),
        slug: company.slug.clone(),
        is_active: company.is_active,
        segment_id: segment.map(|s| s.id).or(direct.segment_id),
        category_id: category.map(|c| c.id).or(direct.category_id),
        subcategory_id: subcategory.map(|s| s.id).or(direct.subcategory_id),
        segment: segment.cloned(),
        category: category.map(|c| category_record(c, data)),
        subcategory: subcategory.and_then(|s| subcategory_record(s, data)),
    }
}

#[async_trait]
impl DirectoryGateway for InMemoryGateway {
    async fn list_places(&self) -> Result<Vec<Place>, GatewayError> {
        self.ensure_online()?;
        Ok(self.data.read().await.places.clone())
    }

    async fn list_segments(&self, place_id: DbId) -> Result<Vec<Segment>, GatewayError> {
        self.listing_delay(place_id).await?;
        let data = self.data.read().await;
        Ok(data
            .segments
            .iter()
            .filter(|s| s.place_id == place_id)
            .cloned()
            .collect())
    }

    async fn list_categories(&self, place_id: DbId) -> Result<Vec<CategoryRecord>, GatewayError> {
        self.listing_delay(place_id).await?;
        let data = self.data.read().await;
        Ok(data
            .categories
            .iter()
            .filter(|c| c.place_id == place_id)
            .map(|c| category_record(c, &data))
            .collect())
    }

    async fn list_subcategories(
        &self,
        place_id: DbId,
    ) -> Result<Vec<SubcategoryRecord>, GatewayError> {
        self.listing_delay(place_id).await?;
        let data = self.data.read().await;
        Ok(data
            .subcategories
            .iter()
            .filter(|s| s.place_id == place_id)
            .filter_map(|s| subcategory_record(s, &data))
            .collect())
    }

    async fn list_companies(&self, place_id: DbId) -> Result<Vec<CompanyRecord>, GatewayError> {
        self.listing_delay(place_id).await?;
        let data = self.data.read().await;
        Ok(data
            .companies
            .iter()
            .filter(|c| c.place_id == place_id)
            .map(|c| company_record(c, &data))
            .collect())
    }

    async fn assign_company(
        &self,
        company_id: DbId,
        level: AttachmentLevel,
        target_id: DbId,
    ) -> Result<CompanyRecord, GatewayError> {
        self.update_attachment(company_id, CompanyAttachment::at(level, target_id))
            .await
    }

    async fn remove_company_segmentation(
        &self,
        company_id: DbId,
    ) -> Result<CompanyRecord, GatewayError> {
        self.update_attachment(company_id, CompanyAttachment::Unattached)
            .await
    }
}
