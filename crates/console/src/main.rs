//! `placedir-console` -- offline directory console.
//!
//! Serves a JSON directory fixture through the in-memory gateway, loads the
//! operator's visible scope, and logs a segmentation overview per place.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default        | Description                          |
//! |---------------------|----------|----------------|--------------------------------------|
//! | `DIRECTORY_FIXTURE` | yes      | --             | Path to a JSON directory snapshot    |
//! | `ACTOR_ROLE`        | no       | `SUPER_ADMIN`  | Role of the acting operator          |
//! | `ACTOR_PLACE_ID`    | no       | --             | Place restriction for `PLACE_ADMIN`  |
//! | `SEGMENT_TIE_BREAK` | no       | `first_listed` | `first_listed` or `lowest_id`        |

use std::sync::Arc;

use placedir_console::config::ConsoleConfig;
use placedir_console::memory::InMemoryGateway;
use placedir_console::session::{ConsoleSession, ReloadOutcome};
use placedir_core::roles::AccessScope;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "placedir_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ConsoleConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let Some(fixture_path) = config.fixture_path.clone() else {
        tracing::error!("DIRECTORY_FIXTURE environment variable is required");
        std::process::exit(1);
    };

    let gateway = InMemoryGateway::from_json_file(&fixture_path).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = %fixture_path.display(), "Failed to load fixture");
        std::process::exit(1);
    });

    let scope =
        AccessScope::for_actor(config.actor_role, config.actor_place_id).unwrap_or_else(|e| {
            tracing::error!(error = %e, role = config.actor_role.as_str(), "Access denied");
            std::process::exit(1);
        });

    tracing::info!(
        role = config.actor_role.as_str(),
        ?scope,
        tie_break = config.segment_tie_break.as_str(),
        "Starting placedir-console",
    );

    let session = ConsoleSession::new(Arc::new(gateway), scope, config.segment_tie_break);

    let place_ids = match session.reload(None).await {
        Ok(ReloadOutcome::Applied { place_ids, .. }) => place_ids,
        Ok(ReloadOutcome::Discarded { .. }) => {
            tracing::warn!("Initial reload was superseded");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Initial reload failed");
            std::process::exit(1);
        }
    };

    for place_id in place_ids {
        let report = session.coverage_report(Some(place_id)).await;
        tracing::info!(
            place_id,
            total = report.coverage.total,
            categorized = report.coverage.categorized,
            percentage = report.coverage.percentage,
            dangling = report.dangling_company_ids.len(),
            "Segmentation coverage",
        );
        for segment in &report.segments {
            tracing::info!(
                place_id,
                segment = %segment.name,
                categories = segment.category_count,
                subcategories = segment.subcategory_count,
                companies = segment.company_count,
                "Segment overview",
            );
        }
    }
}
