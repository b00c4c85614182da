//! Plain-text rendering of panels for the terminal.

use std::fmt::Write as _;

use client_core::{
    changelog::{detail_body, DetailBody, Span, EMPTY_BODY_TEXT},
    panel::FilteredView,
    ItemFilter, SeverityFilter,
};
use shared::{
    domain::{devtools_entry_type_label, kubernetes_category_label, Category, FeedItem},
    protocol::{sorted_counts, StatsResponse},
};

const DATE_FORMAT: &str = "%d.%m.%Y";

fn kind_label(category: Category, kind: &str) -> &str {
    match category {
        Category::Kubernetes => kubernetes_category_label(kind),
        Category::DevTools => devtools_entry_type_label(kind),
        _ => kind,
    }
}

pub fn sources(category: Category) -> String {
    let mut out = format!("{} sources:\n", category.label());
    for source in category.sources() {
        let _ = writeln!(out, "  {:<12} {:<20} {}", source.id, source.name, source.color);
    }
    out
}

pub fn list_row<T: FeedItem>(index: usize, item: &T) -> String {
    let category = T::CATEGORY;
    let mut row = format!(
        "{index:>3}  {}  [{}]",
        item.published().format(DATE_FORMAT),
        item.source()
    );
    if category == Category::Cve {
        let _ = write!(row, " {}", item.key());
        if let Some(score) = item.cvss_score() {
            let _ = write!(row, " CVSS {score:.1}");
        }
        if let Some(severity) = item.severity() {
            let _ = write!(row, " {}", severity.label());
        }
    }
    if let Some(kind) = item.kind() {
        let _ = write!(row, " ({})", kind_label(category, kind));
    }
    if let Some(version) = item.version() {
        let _ = write!(row, " {version}");
    }
    let _ = write!(row, "  {}", item.display_title());
    row
}

/// One-line description of an active filter, `None` when nothing is filtered.
pub fn filter_summary(category: Category, filter: &ItemFilter) -> Option<String> {
    if !filter.is_active() {
        return None;
    }
    let mut parts = Vec::new();
    if filter.severity != SeverityFilter::All {
        parts.push(format!("severity {}", filter.severity.label()));
    }
    if let Some(source) = &filter.source {
        parts.push(format!("source {source}"));
    }
    if let Some(kind) = &filter.kind {
        parts.push(format!("type {}", kind_label(category, kind)));
    }
    Some(format!("Filter: {}", parts.join(", ")))
}

pub fn list<T: FeedItem>(view: &FilteredView<T>, limit: Option<usize>) -> String {
    let mut out = String::new();
    if view.total == 0 {
        out.push_str("No entries cached. Run `newsdesk fetch` first.\n");
        return out;
    }
    let take = limit.unwrap_or(usize::MAX);
    for (index, item) in view.items.iter().take(take) {
        out.push_str(&list_row(*index, item));
        out.push('\n');
    }
    let _ = writeln!(out, "{} / {} shown", view.shown().min(take), view.total);
    out
}

fn spans_text(spans: &[Span<'_>]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Text(text) => (*text).to_string(),
            Span::Code(code) => format!("`{code}`"),
        })
        .collect()
}

pub fn detail<T: FeedItem>(index: usize, item: &T) -> String {
    let category = T::CATEGORY;
    let mut out = String::new();
    let _ = writeln!(out, "#{index} {}", item.display_title());
    if !item.turkish_title().is_empty() && item.turkish_title() != item.original_title() {
        let _ = writeln!(out, "   {}", item.original_title());
    }
    let _ = writeln!(
        out,
        "Source: {}  Date: {}",
        item.source(),
        item.published().format(DATE_FORMAT)
    );
    if category == Category::Cve {
        let _ = write!(out, "CVE: {}", item.key());
        if let Some(severity) = item.severity() {
            let _ = write!(out, "  Severity: {}", severity.label());
        }
        if let Some(score) = item.cvss_score() {
            let _ = write!(out, "  CVSS: {score:.1}");
        }
        out.push('\n');
    }
    if let Some(kind) = item.kind() {
        let _ = writeln!(out, "Type: {}", kind_label(category, kind));
    }
    if let Some(version) = item.version() {
        let _ = writeln!(out, "Version: {version}");
    }
    out.push('\n');

    match detail_body(item) {
        DetailBody::Changelog(changelog) => {
            for section in &changelog.sections {
                let _ = writeln!(out, "== {} ==", section.title);
                for entry in &section.items {
                    let _ = write!(out, "  - {}", spans_text(&entry.spans()));
                    if let Some(pr) = &entry.pull_request {
                        let _ = write!(out, " (#{} @{}", pr.number, pr.author);
                        if !pr.sigs.is_empty() {
                            let _ = write!(out, " {}", pr.sigs.join(", "));
                        }
                        let _ = write!(out, ") {}", pr.url());
                    }
                    out.push('\n');
                }
                out.push('\n');
            }
        }
        DetailBody::Paragraphs(paragraphs) => {
            for paragraph in paragraphs {
                let _ = writeln!(out, "{paragraph}\n");
            }
        }
        DetailBody::Empty => {
            let _ = writeln!(out, "{EMPTY_BODY_TEXT}\n");
        }
    }

    if !item.link().is_empty() {
        let _ = writeln!(out, "Link: {}", item.link());
    }
    out
}

pub fn stats(category: Category, stats: &StatsResponse) -> String {
    let mut out = format!("{}: {} entries", category.label(), stats.total);
    if stats.cached {
        out.push_str(" (cached)");
    }
    out.push('\n');
    if let Some(last_update) = stats.last_update {
        let _ = writeln!(out, "Last update: {}", last_update.format("%d.%m.%Y %H:%M UTC"));
    }
    if !stats.by_source.is_empty() {
        out.push_str("By source:\n");
        for (name, count) in sorted_counts(&stats.by_source) {
            let _ = writeln!(out, "  {name:<24} {count}");
        }
    }
    if let Some((name, breakdown)) = stats.breakdown() {
        let _ = writeln!(out, "By {name}:");
        for (label, count) in sorted_counts(breakdown) {
            let _ = writeln!(out, "  {:<24} {count}", kind_label(category, label));
        }
    }
    out
}

pub fn overview_row(category: Category, stats: Option<&StatsResponse>) -> String {
    match stats {
        Some(stats) => {
            let last = stats
                .last_update
                .map(|ts| ts.format("%d.%m.%Y %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("{:<22} {:>6}  {last}", category.label(), stats.total)
        }
        None => format!("{:<22} {:>6}  unavailable", category.label(), "?"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use shared::domain::{CveEntry, KubernetesEntry};

    use super::*;

    fn cve() -> CveEntry {
        CveEntry {
            id: None,
            cve_id: "CVE-2025-1234".into(),
            source: "NVD".into(),
            original_title: "Heap overflow".into(),
            turkish_title: "Yığın taşması".into(),
            original_description: "Overflow.".into(),
            turkish_description: "Taşma.\n\nİkinci paragraf.".into(),
            severity: "Yüksek".into(),
            cvss_score: Some(7.5),
            published_date: NaiveDate::from_ymd_opt(2025, 3, 9).expect("date"),
            modified_date: None,
            link: "https://nvd.nist.gov/vuln/detail/CVE-2025-1234".into(),
            cwe_ids: Vec::new(),
            references: Vec::new(),
            affected_products: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn cve_row_shows_score_and_severity() {
        assert_eq!(
            list_row(4, &cve()),
            "  4  09.03.2025  [NVD] CVE-2025-1234 CVSS 7.5 Yüksek  Yığın taşması"
        );
    }

    #[test]
    fn list_respects_limit_and_reports_counts() {
        let view = FilteredView {
            items: vec![(0, cve()), (2, cve())],
            total: 3,
        };
        let out = list(&view, Some(1));
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with("1 / 3 shown\n"));

        let empty: FilteredView<CveEntry> = FilteredView {
            items: Vec::new(),
            total: 0,
        };
        assert!(list(&empty, None).starts_with("No entries cached"));
    }

    #[test]
    fn filter_summary_names_active_criteria() {
        assert_eq!(filter_summary(Category::Cve, &ItemFilter::default()), None);
        let filter = ItemFilter {
            severity: SeverityFilter::Critical,
            source: Some("NVD".into()),
            kind: None,
        };
        assert_eq!(
            filter_summary(Category::Cve, &filter).as_deref(),
            Some("Filter: severity Kritik, source NVD")
        );
        let filter = ItemFilter {
            kind: Some("release".into()),
            ..ItemFilter::default()
        };
        assert_eq!(
            filter_summary(Category::Kubernetes, &filter).as_deref(),
            Some("Filter: type Sürüm")
        );
    }

    #[test]
    fn detail_renders_changelog_sections() {
        let entry = KubernetesEntry {
            id: None,
            source: "GitHub Releases".into(),
            original_title: "v1.33.1".into(),
            turkish_title: String::new(),
            original_description: "===SECTION: Özellik===\nAdds `kubectl events`.\n<<<PR#7|@dev|sig-cli>>>\n".into(),
            turkish_description: String::new(),
            link: String::new(),
            published_date: NaiveDate::from_ymd_opt(2025, 5, 15).expect("date"),
            category: "release".into(),
            version: "v1.33.1".into(),
            created_at: None,
        };
        let out = detail(0, &entry);
        assert!(out.contains("Type: Sürüm"));
        assert!(out.contains("== Özellik =="));
        assert!(out.contains(
            "  - Adds `kubectl events`. (#7 @dev sig-cli) https://github.com/kubernetes/kubernetes/pull/7"
        ));
    }

    #[test]
    fn detail_splits_paragraphs() {
        let out = detail(1, &cve());
        assert!(out.contains("   Heap overflow"));
        assert!(out.contains("CVE: CVE-2025-1234  Severity: Yüksek  CVSS: 7.5"));
        assert!(out.contains("Taşma.\n\nİkinci paragraf.\n"));
    }

    #[test]
    fn stats_lists_breakdown_by_count() {
        let response = StatsResponse {
            success: true,
            total: 5,
            by_source: BTreeMap::from([("K8s Blog".to_string(), 1), ("GitHub Releases".to_string(), 4)]),
            by_category: Some(BTreeMap::from([("release".to_string(), 4), ("blog".to_string(), 1)])),
            ..StatsResponse::default()
        };
        let out = stats(Category::Kubernetes, &response);
        let releases = out.find("GitHub Releases").expect("source");
        let blog = out.find("K8s Blog").expect("source");
        assert!(releases < blog);
        assert!(out.contains("By category:"));
        assert!(out.contains("Sürüm"));
    }
}
