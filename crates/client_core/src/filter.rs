//! In-memory filtering of a panel's items.

use std::{fmt, str::FromStr};

use shared::domain::FeedItem;

/// CVSS bucket filter. Buckets are half-open so scores such as 8.95 land in
/// exactly one of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeverityFilter {
    #[default]
    All,
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityFilter {
    pub const ALL: [SeverityFilter; 5] = [
        SeverityFilter::All,
        SeverityFilter::Critical,
        SeverityFilter::High,
        SeverityFilter::Medium,
        SeverityFilter::Low,
    ];

    /// `[min, max)` score range of the bucket.
    pub fn range(self) -> Option<(f64, f64)> {
        match self {
            Self::All => None,
            Self::Critical => Some((9.0, f64::INFINITY)),
            Self::High => Some((7.0, 9.0)),
            Self::Medium => Some((4.0, 7.0)),
            Self::Low => Some((0.0, 4.0)),
        }
    }

    /// Unscored items only pass the `All` filter.
    pub fn matches(self, score: Option<f64>) -> bool {
        let Some((min, max)) = self.range() else {
            return true;
        };
        match score {
            Some(score) if score.is_finite() => score >= min && score < max,
            _ => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "Tümü",
            Self::Critical => "Kritik",
            Self::High => "Yüksek",
            Self::Medium => "Orta",
            Self::Low => "Düşük",
        }
    }
}

impl fmt::Display for SeverityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(name)
    }
}

impl FromStr for SeverityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!(
                "unknown severity '{other}' (expected all, critical, high, medium or low)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilter {
    pub severity: SeverityFilter,
    pub source: Option<String>,
    pub kind: Option<String>,
}

impl ItemFilter {
    pub fn is_active(&self) -> bool {
        self.severity != SeverityFilter::All || self.source.is_some() || self.kind.is_some()
    }

    pub fn matches<T: FeedItem>(&self, item: &T) -> bool {
        if !self.severity.matches(item.cvss_score()) {
            return false;
        }
        if let Some(source) = &self.source {
            if item.source() != source {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            if item.kind() != Some(kind.as_str()) {
                return false;
            }
        }
        true
    }

    /// Keeps the original index of each match so selections stay stable
    /// across filter changes.
    pub fn apply<'a, T: FeedItem>(&self, items: &'a [T]) -> Vec<(usize, &'a T)> {
        items
            .iter()
            .enumerate()
            .filter(|(_, item)| self.matches(*item))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::domain::{CveEntry, KubernetesEntry};

    fn cve(id: &str, score: Option<f64>, source: &str) -> CveEntry {
        CveEntry {
            id: None,
            cve_id: id.to_string(),
            source: source.to_string(),
            original_title: format!("{id} title"),
            turkish_title: String::new(),
            original_description: String::new(),
            turkish_description: String::new(),
            severity: String::new(),
            cvss_score: score,
            published_date: NaiveDate::from_ymd_opt(2025, 1, 2).expect("date"),
            modified_date: None,
            link: format!("https://nvd.example/{id}"),
            cwe_ids: Vec::new(),
            references: Vec::new(),
            affected_products: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn severity_buckets_have_no_gaps() {
        assert!(SeverityFilter::Critical.matches(Some(9.0)));
        assert!(SeverityFilter::Critical.matches(Some(10.0)));
        assert!(SeverityFilter::High.matches(Some(8.95)));
        assert!(!SeverityFilter::High.matches(Some(9.0)));
        assert!(SeverityFilter::Medium.matches(Some(4.0)));
        assert!(SeverityFilter::Low.matches(Some(3.9)));
        assert!(SeverityFilter::Low.matches(Some(0.0)));
    }

    #[test]
    fn unscored_items_only_pass_all() {
        assert!(SeverityFilter::All.matches(None));
        for filter in &SeverityFilter::ALL[1..] {
            assert!(!filter.matches(None), "{filter} should drop unscored items");
            assert!(!filter.matches(Some(f64::NAN)));
        }
    }

    #[test]
    fn combines_severity_and_source() {
        let items = vec![
            cve("CVE-1", Some(9.8), "NVD"),
            cve("CVE-2", Some(9.1), "CIRCL"),
            cve("CVE-3", Some(5.0), "NVD"),
            cve("CVE-4", None, "NVD"),
        ];
        let filter = ItemFilter {
            severity: SeverityFilter::Critical,
            source: Some("NVD".into()),
            kind: None,
        };
        let matched: Vec<_> = filter
            .apply(&items)
            .into_iter()
            .map(|(index, item)| (index, item.cve_id.as_str()))
            .collect();
        assert_eq!(matched, vec![(0, "CVE-1")]);
        assert!(filter.is_active());
        assert_eq!(ItemFilter::default().apply(&items).len(), 4);
    }

    #[test]
    fn kind_filter_matches_kubernetes_category() {
        let entry = KubernetesEntry {
            id: None,
            source: "GitHub Releases".into(),
            original_title: "v1.33.0".into(),
            turkish_title: String::new(),
            original_description: String::new(),
            turkish_description: String::new(),
            link: "https://github.com/kubernetes/kubernetes/releases/v1.33.0".into(),
            published_date: NaiveDate::from_ymd_opt(2025, 4, 23).expect("date"),
            category: "release".into(),
            version: "v1.33.0".into(),
            created_at: None,
        };
        let releases = ItemFilter {
            kind: Some("release".into()),
            ..ItemFilter::default()
        };
        let security = ItemFilter {
            kind: Some("security".into()),
            ..ItemFilter::default()
        };
        assert!(releases.matches(&entry));
        assert!(!security.matches(&entry));
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("HIGH".parse::<SeverityFilter>(), Ok(SeverityFilter::High));
        assert!("severe".parse::<SeverityFilter>().is_err());
        assert_eq!(SeverityFilter::Low.to_string(), "low");
    }
}
