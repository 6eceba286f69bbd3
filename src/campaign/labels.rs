//! Display tables for campaign categories and statuses. Lookups take the raw
//! key so that values coming from older caches or other clients still render;
//! an unknown key falls back to a fixed default instead of failing.

const DEFAULT_STATUS_COLOR: &str = "#6B6B6B";
const DEFAULT_CATEGORY_COLOR: &str = "#2D5A3D";
const DEFAULT_CATEGORY_ICON: &str = "heart";

/// Label for a campaign or engagement status, or the key itself if unknown.
pub fn status_label(key: &str) -> &str {
    match key {
        "active" => "En cours",
        "completed" => "Terminée",
        "upcoming" => "À venir",
        "pending" => "En attente",
        "confirmed" => "Confirmé",
        _ => key,
    }
}

pub fn status_color(key: &str) -> &'static str {
    match key {
        "active" => "#4CAF50",
        "completed" => "#6B6B6B",
        "upcoming" => "#FF9800",
        "pending" => "#FF9800",
        "confirmed" => "#4CAF50",
        _ => DEFAULT_STATUS_COLOR,
    }
}

/// Label for a category, or the key itself if unknown.
pub fn category_label(key: &str) -> &str {
    match key {
        "ramadan" => "Ramadan",
        "eid" => "Aïd",
        "winter" => "Hiver",
        "neighborhood" => "Quartier",
        "other" => "Autre",
        _ => key,
    }
}

pub fn category_icon(key: &str) -> &'static str {
    match key {
        "ramadan" => "moon",
        "eid" => "gift",
        "winter" => "snow",
        "neighborhood" => "home",
        "other" => "heart",
        _ => DEFAULT_CATEGORY_ICON,
    }
}

pub fn category_color(key: &str) -> &'static str {
    match key {
        "ramadan" => "#1E5631",
        "eid" => "#C9A227",
        "winter" => "#5B7C99",
        "neighborhood" => "#8B6914",
        "other" => "#2D5A3D",
        _ => DEFAULT_CATEGORY_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignStatus, Category};

    #[test]
    fn known_keys_have_labels() {
        assert_eq!(status_label("active"), "En cours");
        assert_eq!(category_label("eid"), "Aïd");
        assert_eq!(Category::Winter.label(), "Hiver");
        assert_eq!(CampaignStatus::Upcoming.color(), "#FF9800");
    }

    #[test]
    fn unknown_keys_fail_soft() {
        assert_eq!(status_label("paused"), "paused");
        assert_eq!(status_color("paused"), DEFAULT_STATUS_COLOR);
        assert_eq!(category_label("summer"), "summer");
        assert_eq!(category_icon("summer"), DEFAULT_CATEGORY_ICON);
        assert_eq!(category_color("summer"), DEFAULT_CATEGORY_COLOR);
    }
}
