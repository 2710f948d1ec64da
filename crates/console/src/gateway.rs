//! The data-access collaborator the console talks to.

use async_trait::async_trait;

use placedir_core::entities::{AttachmentLevel, Place, Segment};
use placedir_core::types::DbId;

use crate::error::GatewayError;
use crate::records::{CategoryRecord, CompanyRecord, SubcategoryRecord};

/// Listing and mutation calls offered by the directory backend.
///
/// Listings return full, denormalized collections for one place. Mutations
/// return the updated company so the console can refresh it without a
/// full reload.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    async fn list_places(&self) -> Result<Vec<Place>, GatewayError>;

    async fn list_segments(&self, place_id: DbId) -> Result<Vec<Segment>, GatewayError>;

    async fn list_categories(&self, place_id: DbId) -> Result<Vec<CategoryRecord>, GatewayError>;

    async fn list_subcategories(
        &self,
        place_id: DbId,
    ) -> Result<Vec<SubcategoryRecord>, GatewayError>;

    async fn list_companies(&self, place_id: DbId) -> Result<Vec<CompanyRecord>, GatewayError>;

    async fn assign_company(
        &self,
        company_id: DbId,
        level: AttachmentLevel,
        target_id: DbId,
    ) -> Result<CompanyRecord, GatewayError>;

    async fn remove_company_segmentation(
        &self,
        company_id: DbId,
    ) -> Result<CompanyRecord, GatewayError>;
}
