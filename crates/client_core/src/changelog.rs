//! Parser for the section/item markup the backend writes into translated
//! Kubernetes release notes.
//!
//! ```text
//! ===SECTION: Özellik===
//! Adds `kubectl events` to the stable set.
//! <<<PR#12345|@someone|sig-cli,sig-node>>>
//! ---ITEM---
//! ```

use std::sync::LazyLock;

use regex::Regex;
use shared::domain::FeedItem;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^===SECTION:\s*(.+?)\s*===$").expect("section regex"));
static PR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<<<PR#(\d+)\|@([\w-]+)\|(.+)>>>$").expect("pull request regex")
});
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code regex"));

const ITEM_SEPARATOR: &str = "---ITEM---";
const SECTION_MARKER: &str = "===SECTION:";
const STRUCTURED_SOURCE: &str = "GitHub Releases";
const PULL_REQUEST_BASE: &str = "https://github.com/kubernetes/kubernetes/pull/";
const DEFAULT_ACCENT: &str = "#6c757d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changelog {
    pub sections: Vec<ChangelogSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogSection {
    pub title: String,
    pub items: Vec<ChangelogItem>,
}

impl ChangelogSection {
    pub fn accent(&self) -> &'static str {
        section_accent(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogItem {
    pub description: String,
    pub pull_request: Option<PullRequestRef>,
}

impl ChangelogItem {
    pub fn spans(&self) -> Vec<Span<'_>> {
        spans(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub author: String,
    pub sigs: Vec<String>,
}

impl PullRequestRef {
    pub fn url(&self) -> String {
        format!("{PULL_REQUEST_BASE}{}", self.number)
    }
}

/// A run of description text; `Code` came from a backtick pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    Text(&'a str),
    Code(&'a str),
}

pub fn section_accent(title: &str) -> &'static str {
    match title.trim() {
        "Hata veya Gerileme" => "#dc3545",
        "Özellik" => "#28a745",
        "Bağımlılıklar" => "#6f42c1",
        "Acil Yükseltme Notları" => "#fd7e14",
        _ => DEFAULT_ACCENT,
    }
}

pub fn spans(text: &str) -> Vec<Span<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in CODE_RE.captures_iter(text) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Span::Text(&text[last..whole.start()]));
        }
        out.push(Span::Code(code.as_str()));
        last = whole.end();
    }
    if last < text.len() {
        out.push(Span::Text(&text[last..]));
    }
    out
}

#[derive(Default)]
struct ItemBuilder {
    description: Vec<String>,
    pull_request: Option<PullRequestRef>,
}

impl ItemBuilder {
    /// Takes the pending item, dropping it when it has no description.
    ///
    /// The builder is reset either way, so a PR line seen before any
    /// description is discarded with its item and never attaches to the
    /// next one.
    fn take(&mut self) -> Option<ChangelogItem> {
        let builder = std::mem::take(self);
        if builder.description.is_empty() {
            return None;
        }
        Some(ChangelogItem {
            description: builder.description.join(" "),
            pull_request: builder.pull_request,
        })
    }
}

/// Returns `None` when the text contains no non-empty section.
pub fn parse(text: &str) -> Option<Changelog> {
    let mut sections: Vec<ChangelogSection> = Vec::new();
    let mut current: Option<ChangelogSection> = None;
    let mut item = ItemBuilder::default();

    fn flush(item: &mut ItemBuilder, current: &mut Option<ChangelogSection>) {
        let finished = item.take();
        if let (Some(finished), Some(section)) = (finished, current.as_mut()) {
            section.items.push(finished);
        }
    }

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(caps) = SECTION_RE.captures(line) {
            flush(&mut item, &mut current);
            if let Some(done) = current.take().filter(|s| !s.items.is_empty()) {
                sections.push(done);
            }
            current = Some(ChangelogSection {
                title: caps[1].to_string(),
                items: Vec::new(),
            });
        } else if line == ITEM_SEPARATOR {
            flush(&mut item, &mut current);
        } else if let Some(caps) = PR_RE.captures(line) {
            let Ok(number) = caps[1].parse() else {
                item.description.push(line.to_string());
                continue;
            };
            item.pull_request = Some(PullRequestRef {
                number,
                author: caps[2].to_string(),
                sigs: caps[3]
                    .split(',')
                    .map(str::trim)
                    .filter(|sig| !sig.is_empty())
                    .map(str::to_string)
                    .collect(),
            });
        } else {
            item.description.push(line.to_string());
        }
    }

    flush(&mut item, &mut current);
    if let Some(done) = current.filter(|s| !s.items.is_empty()) {
        sections.push(done);
    }

    (!sections.is_empty()).then_some(Changelog { sections })
}

/// How an entry's body is presented in the detail view and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailBody {
    Changelog(Changelog),
    Paragraphs(Vec<String>),
    Empty,
}

pub const EMPTY_BODY_TEXT: &str = "İçerik bulunmuyor.";

pub fn detail_body<T: FeedItem>(item: &T) -> DetailBody {
    let body = item.display_body();
    if item.source() == STRUCTURED_SOURCE && body.contains(SECTION_MARKER) {
        if let Some(changelog) = parse(body) {
            return DetailBody::Changelog(changelog);
        }
    }

    let paragraphs: Vec<String> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if paragraphs.is_empty() {
        DetailBody::Empty
    } else {
        DetailBody::Paragraphs(paragraphs)
    }
}
