use serde::Deserialize;

use crate::error::AppError;

/// Page selection for list endpoints (`?page=N`, 1-based).
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    /// Page number, starting at 1.
    pub page: Option<u64>,
}

/// Resolved page window with links to the neighbouring pages.
#[derive(Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl PageWindow {
    /// Validate `page` against `total` items and build absolute links from
    /// `collection_url` (which must not carry a query string).
    ///
    /// Page 1 always exists, even for an empty collection.
    pub fn resolve(
        page: Option<u64>,
        per_page: u64,
        total: u64,
        collection_url: &str,
    ) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let per_page = per_page.max(1);
        let last_page = Ord::max(total.div_ceil(per_page), 1);
        if page < 1 || page > last_page {
            return Err(AppError::NotFound("Invalid page.".into()));
        }

        let next = (page < last_page).then(|| format!("{collection_url}?page={}", page + 1));
        let previous = match page {
            1 => None,
            2 => Some(collection_url.to_string()),
            p => Some(format!("{collection_url}?page={}", p - 1)),
        };

        Ok(Self {
            page,
            next,
            previous,
        })
    }
}

/// Human-readable size with 1024-based units, e.g. `200.0 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

    if bytes < 1024 {
        return if bytes == 1 {
            "1 byte".to_string()
        } else {
            format!("{bytes} bytes")
        };
    }

    let mut value = bytes as f64 / KB;
    let mut unit = 0;
    while value >= KB && unit < UNITS.len() - 1 {
        value /= KB;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Validation message for an oversized content upload.
pub fn file_size_message(actual: u64, limit: u64) -> String {
    format!(
        "Invalid file size. The file may not be larger than {}. Actual file size was {}",
        format_file_size(limit),
        format_file_size(actual)
    )
}
