use std::path::PathBuf;

use placedir_core::roles::Role;
use placedir_core::segmentation::SegmentTieBreak;
use placedir_core::types::DbId;

use crate::error::ConsoleError;

/// Console configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// How "the" segment of a multi-segment category is chosen.
    pub segment_tie_break: SegmentTieBreak,
    /// Role fact for the acting operator.
    pub actor_role: Role,
    /// Place restriction for place admins.
    pub actor_place_id: Option<DbId>,
    /// JSON snapshot served by the in-memory gateway.
    pub fixture_path: Option<PathBuf>,
}

impl ConsoleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var             | Default        |
    /// |---------------------|----------------|
    /// | `SEGMENT_TIE_BREAK` | `first_listed` |
    /// | `ACTOR_ROLE`        | `SUPER_ADMIN`  |
    /// | `ACTOR_PLACE_ID`    | unset          |
    /// | `DIRECTORY_FIXTURE` | unset          |
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConsoleError> {
        let segment_tie_break = match lookup("SEGMENT_TIE_BREAK") {
            Some(value) => SegmentTieBreak::from_str_db(value.trim())?,
            None => SegmentTieBreak::default(),
        };

        let actor_role = match lookup("ACTOR_ROLE") {
            Some(value) => Role::from_str_db(value.trim())?,
            None => Role::SuperAdmin,
        };

        let actor_place_id = lookup("ACTOR_PLACE_ID")
            .map(|value| {
                value.trim().parse::<DbId>().map_err(|_| {
                    ConsoleError::Config(format!(
                        "ACTOR_PLACE_ID must be an integer, got '{value}'"
                    ))
                })
            })
            .transpose()?;

        let fixture_path = lookup("DIRECTORY_FIXTURE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            segment_tie_break,
            actor_role,
            actor_place_id,
            fixture_path,
        })
    }
}
