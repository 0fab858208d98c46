//! Industry catalogue understood by the analysis backend.
//!
//! Clients may submit either a backend id (`"ai-tech"`) or a display name;
//! [`resolve`] turns whatever they sent into a catalogue entry, falling back
//! to a default so a missing or unknown industry never fails a submission.

use serde::Serialize;

/// A backend industry id paired with its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Industry {
    pub id: &'static str,
    pub name: &'static str,
}

/// Id used when nothing else is configured.
pub const DEFAULT_INDUSTRY_ID: &str = "new-energy-vehicle";

/// Every industry the backend accepts, in the backend's own order.
pub const INDUSTRIES: &[Industry] = &[
    Industry { id: "new-energy-vehicle", name: "新能源汽车" },
    Industry { id: "ai-tech", name: "人工智能" },
    Industry { id: "healthcare", name: "医疗健康" },
    Industry { id: "manufacturing", name: "智能制造" },
    Industry { id: "aerospace", name: "航空航天" },
    Industry { id: "ecommerce", name: "电子商务" },
    Industry { id: "realestate", name: "房地产" },
    Industry { id: "finance", name: "金融服务" },
    Industry { id: "logistics", name: "物流运输" },
];

/// Look up an industry by its backend id.
pub fn find_by_id(id: &str) -> Option<&'static Industry> {
    INDUSTRIES.iter().find(|i| i.id.eq_ignore_ascii_case(id))
}

/// Resolve a submitted industry value.
///
/// Matches, in order: backend id, exact display name, a display name
/// contained in the input. Missing, blank, or unmatched input resolves to
/// `default_id`, and an unknown `default_id` resolves to
/// [`DEFAULT_INDUSTRY_ID`].
pub fn resolve(input: Option<&str>, default_id: &str) -> &'static Industry {
    let matched = input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| {
            find_by_id(s)
                .or_else(|| INDUSTRIES.iter().find(|i| i.name == s))
                .or_else(|| INDUSTRIES.iter().find(|i| s.contains(i.name)))
        });

    matched
        .or_else(|| find_by_id(default_id))
        .unwrap_or(&INDUSTRIES[0])
}
