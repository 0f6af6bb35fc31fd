use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};

use crate::validation::{query_map, Fields, NumberRule, ValidationError};

/// Page size bounds shared by every list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: usize,
    pub max_size: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 25,
            max_size: 1000,
        }
    }
}

/// Cursor page request: entries created strictly before `before`, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub before: Option<DateTime<Utc>>,
    pub size: usize,
}

impl Page {
    pub fn read(fields: &Fields<'_>, limits: PageLimits) -> Result<Self, ValidationError> {
        let before = fields.date("before")?;
        let size = fields.integer(
            "pageSize",
            NumberRule::any().positive().max(limits.max_size as f64),
        )?;
        Ok(Self {
            before,
            size: size.map_or(limits.default_size, |size| size as usize),
        })
    }

    /// Reads a query string that carries nothing but the cursor.
    pub fn from_query(
        params: &HashMap<String, String>,
        limits: PageLimits,
    ) -> Result<Self, ValidationError> {
        let map = query_map(params);
        Fields::read_map(&map, &["before", "pageSize"], |fields| {
            Self::read(fields, limits)
        })
    }
}

/// Creation stamp for stored records. Cursors are sent as millisecond
/// timestamps, so anything finer would hide same-millisecond neighbours
/// from the next page.
pub fn creation_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
