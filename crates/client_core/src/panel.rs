//! Per-category view state and the operations a dashboard panel performs.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::NaiveDate;
use shared::{
    domain::{Category, ExportFormat, FeedItem, SourceDescriptor},
    protocol::{FetchRequest, StatsResponse},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    error::{ClientError, Result},
    filter::ItemFilter,
    poll::{self, PollPolicy},
    report,
    transport::FeedApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    ItemsReplaced(usize),
    StatsUpdated,
    Toast { level: ToastLevel, message: String },
}

/// Whether a fetch waits for a background task when the backend answers
/// without data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchMode {
    #[default]
    Direct,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSelection {
    pub source: &'static SourceDescriptor,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct PanelState<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
    pub loading: bool,
    pub fetching: bool,
    pub error: Option<String>,
    pub stats: Option<StatsResponse>,
    pub days: u32,
    pub sources: Vec<SourceSelection>,
    pub filter: ItemFilter,
}

impl<T: FeedItem> PanelState<T> {
    pub fn new() -> Self {
        let category = T::CATEGORY;
        Self {
            items: Vec::new(),
            selected: None,
            loading: false,
            fetching: false,
            error: None,
            stats: None,
            days: category.default_days(),
            sources: category
                .sources()
                .iter()
                .map(|source| SourceSelection {
                    source,
                    selected: true,
                })
                .collect(),
            filter: ItemFilter::default(),
        }
    }

    /// Selected source values in catalogue order.
    pub fn active_sources(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter(|entry| entry.selected)
            .map(|entry| entry.source.value.to_string())
            .collect()
    }

    fn replace_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = None;
    }
}

impl<T: FeedItem> Default for PanelState<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Items passing the active filter, with their index in the full list.
#[derive(Debug, Clone)]
pub struct FilteredView<T> {
    pub items: Vec<(usize, T)>,
    pub total: usize,
}

impl<T> FilteredView<T> {
    pub fn shown(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub count: usize,
    pub message: String,
    pub polled: bool,
}

pub struct Panel<T: FeedItem> {
    api: Arc<dyn FeedApi<T>>,
    poll: PollPolicy,
    state: Mutex<PanelState<T>>,
    events: broadcast::Sender<PanelEvent>,
}

impl<T: FeedItem> Panel<T> {
    pub fn new(api: Arc<dyn FeedApi<T>>, poll: PollPolicy) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            poll,
            state: Mutex::new(PanelState::new()),
            events,
        }
    }

    pub fn category(&self) -> Category {
        T::CATEGORY
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> PanelState<T> {
        self.state.lock().await.clone()
    }

    fn emit(&self, event: PanelEvent) {
        let _ = self.events.send(event);
    }

    fn toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.emit(PanelEvent::Toast {
            level,
            message: message.into(),
        });
    }

    /// Replaces the items with the backend's cached list.
    pub async fn load(&self) -> Result<usize> {
        self.state.lock().await.loading = true;
        let result = self.api.list().await;

        let mut state = self.state.lock().await;
        state.loading = false;
        match result {
            Ok(list) => {
                let count = list.data.len();
                state.replace_items(list.data);
                state.error = None;
                drop(state);
                info!(category = %T::CATEGORY, count, cached = list.cached, "items loaded");
                self.emit(PanelEvent::ItemsReplaced(count));
                Ok(count)
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                self.toast(ToastLevel::Error, format!("failed to load items: {err}"));
                Err(err)
            }
        }
    }

    /// Stats failures are not surfaced to the user.
    pub async fn load_stats(&self) -> Option<StatsResponse> {
        match self.api.stats().await {
            Ok(stats) => {
                self.state.lock().await.stats = Some(stats.clone());
                self.emit(PanelEvent::StatsUpdated);
                Some(stats)
            }
            Err(err) => {
                warn!(category = %T::CATEGORY, error = %err, "failed to load stats");
                None
            }
        }
    }

    /// Clears the backend cache, triggers a fetch for the selected sources
    /// and replaces the items with the result.
    pub async fn fetch_cycle(&self, mode: FetchMode) -> Result<FetchOutcome> {
        let request = {
            let mut state = self.state.lock().await;
            if state.fetching {
                return Err(ClientError::FetchInProgress);
            }
            let sources = state.active_sources();
            if sources.is_empty() {
                drop(state);
                let err = ClientError::NoSourcesSelected;
                self.toast(ToastLevel::Warning, err.to_string());
                return Err(err);
            }
            if let Err(err) = validate_days(T::CATEGORY, state.days) {
                drop(state);
                self.toast(ToastLevel::Warning, err.to_string());
                return Err(err);
            }
            state.fetching = true;
            state.error = None;
            FetchRequest {
                days: state.days,
                sources,
            }
        };

        info!(
            category = %T::CATEGORY,
            days = request.days,
            sources = request.sources.len(),
            "starting fetch"
        );
        let result = self.run_fetch(&request, mode).await;

        let mut state = self.state.lock().await;
        state.fetching = false;
        match result {
            Ok((items, message, polled)) => {
                let count = items.len();
                state.replace_items(items);
                drop(state);
                self.emit(PanelEvent::ItemsReplaced(count));
                self.toast(ToastLevel::Info, message.clone());
                self.load_stats().await;
                Ok(FetchOutcome {
                    count,
                    message,
                    polled,
                })
            }
            Err(err) => {
                state.error = Some(err.to_string());
                drop(state);
                let level = match &err {
                    ClientError::PollTimeout { .. } => ToastLevel::Warning,
                    _ => ToastLevel::Error,
                };
                self.toast(level, format!("fetch failed: {err}"));
                Err(err)
            }
        }
    }

    async fn run_fetch(
        &self,
        request: &FetchRequest,
        mode: FetchMode,
    ) -> Result<(Vec<T>, String, bool)> {
        self.api.clear().await?;
        let response = self.api.fetch(request).await?;

        let wait = response.task_id.is_some()
            || (mode == FetchMode::Poll && response.data.is_empty());
        if !wait {
            let message = if response.message.is_empty() {
                format!("{} entries fetched", response.data.len())
            } else {
                response.message
            };
            return Ok((response.data, message, false));
        }

        info!(
            category = %T::CATEGORY,
            task_id = response.task_id.as_deref().unwrap_or("-"),
            attempts = self.poll.max_attempts,
            "waiting for background fetch"
        );
        let list =
            poll::wait_for_completion(self.api.as_ref(), response.task_id.as_deref(), self.poll)
                .await?;
        let message = format!("{} entries fetched", list.data.len());
        Ok((list.data, message, true))
    }

    /// Empties the backend cache and the local list.
    pub async fn clear_cache(&self) -> Result<()> {
        match self.api.clear().await {
            Ok(ack) => {
                self.state.lock().await.replace_items(Vec::new());
                self.emit(PanelEvent::ItemsReplaced(0));
                let message = if ack.message.is_empty() {
                    "cache cleared".to_string()
                } else {
                    ack.message
                };
                self.toast(ToastLevel::Info, message);
                self.load_stats().await;
                Ok(())
            }
            Err(err) => {
                self.toast(ToastLevel::Error, format!("failed to clear cache: {err}"));
                Err(err)
            }
        }
    }

    /// Downloads the export payload, renders it and writes the report into `dir`.
    pub async fn export(&self, format: ExportFormat, dir: &Path, today: NaiveDate) -> Result<PathBuf> {
        let result = async {
            let export = self.api.export().await?;
            let report = report::render(&export.data, format, today)?;
            report.write_to(dir).await
        }
        .await;

        match result {
            Ok(path) => {
                self.toast(ToastLevel::Info, format!("report saved to {}", path.display()));
                Ok(path)
            }
            Err(err) => {
                self.toast(ToastLevel::Error, format!("export failed: {err}"));
                Err(err)
            }
        }
    }

    /// Flips one source in the selection; returns the new state.
    pub async fn toggle_source(&self, value: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let entry = state
            .sources
            .iter_mut()
            .find(|entry| entry.source.value == value || entry.source.id == value)
            .ok_or_else(|| ClientError::UnknownSource {
                category: T::CATEGORY,
                source_name: value.to_string(),
            })?;
        entry.selected = !entry.selected;
        Ok(entry.selected)
    }

    /// Restricts the selection to exactly `values`.
    pub async fn select_sources<S: AsRef<str>>(&self, values: &[S]) -> Result<()> {
        for value in values {
            if T::CATEGORY.find_source(value.as_ref()).is_none() {
                return Err(ClientError::UnknownSource {
                    category: T::CATEGORY,
                    source_name: value.as_ref().to_string(),
                });
            }
        }
        let mut state = self.state.lock().await;
        for entry in &mut state.sources {
            entry.selected = values.iter().any(|v| v.as_ref() == entry.source.value);
        }
        Ok(())
    }

    pub async fn set_days(&self, days: u32) -> Result<()> {
        validate_days(T::CATEGORY, days)?;
        self.state.lock().await.days = days;
        Ok(())
    }

    pub async fn set_filter(&self, filter: ItemFilter) {
        self.state.lock().await.filter = filter;
    }

    pub async fn select(&self, index: usize) -> Result<T> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get(index)
            .cloned()
            .ok_or(ClientError::NoSuchItem {
                index,
                len: state.items.len(),
            })?;
        state.selected = Some(index);
        Ok(item)
    }

    /// Looks an item up by its key (CVE id or link) and selects it.
    pub async fn select_by_key(&self, key: &str) -> Option<(usize, T)> {
        let mut state = self.state.lock().await;
        let index = state.items.iter().position(|item| item.key() == key)?;
        state.selected = Some(index);
        Some((index, state.items[index].clone()))
    }

    pub async fn filtered(&self) -> FilteredView<T> {
        let state = self.state.lock().await;
        FilteredView {
            items: state
                .filter
                .apply(&state.items)
                .into_iter()
                .map(|(index, item)| (index, item.clone()))
                .collect(),
            total: state.items.len(),
        }
    }
}

fn validate_days(category: Category, days: u32) -> Result<()> {
    let range = category.day_range();
    if range.contains(&days) {
        Ok(())
    } else {
        Err(ClientError::DaysOutOfRange {
            category,
            days,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

#[cfg(test)]
#[path = "tests/panel_tests.rs"]
mod tests;
