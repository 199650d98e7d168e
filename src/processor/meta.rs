use chrono::{SecondsFormat, Utc};

use crate::models::{Metadata, RawPage};

const SOURCE: &str = "confluence";

/// Project page identity into the canonical metadata record.
///
/// Pure field copies plus the fixed `source` tag and a `processed_at` stamp
/// taken at call time. Absent inputs are already typed defaults upstream,
/// so this cannot fail.
pub fn extract(page: &RawPage) -> Metadata {
    Metadata {
        id: page.id.clone(),
        title: page.title.clone(),
        url: page.url.clone(),
        version: page.version,
        last_modified: page.last_modified.clone(),
        source: SOURCE.to_string(),
        processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_projected_and_source_is_fixed() {
        let page = RawPage {
            id: "123".into(),
            title: "Test".into(),
            url: "http://test".into(),
            version: 7,
            last_modified: "2024-01-01T00:00:00".into(),
            ..RawPage::default()
        };
        let meta = extract(&page);
        assert_eq!(meta.id, "123");
        assert_eq!(meta.title, "Test");
        assert_eq!(meta.url, "http://test");
        assert_eq!(meta.version, 7);
        assert_eq!(meta.last_modified, "2024-01-01T00:00:00");
        assert_eq!(meta.source, "confluence");
        assert!(!meta.processed_at.is_empty());
    }

    #[test]
    fn processed_at_is_iso_comparable() {
        let before = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let meta = extract(&RawPage::default());
        assert!(meta.processed_at >= before);
    }

    #[test]
    fn empty_page_stays_defaulted_but_stamped() {
        let meta = extract(&RawPage::default());
        assert_eq!(meta.id, "");
        assert_eq!(meta.version, 0);
        assert_eq!(meta.source, "confluence");
        assert!(!meta.is_populated());
    }
}
