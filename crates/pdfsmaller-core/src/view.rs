//! State to view-model mapping
//!
//! [`ViewModel::from_app`] is pure: it reads the app and a timestamp and
//! produces everything the renderer needs, already formatted. Nothing in
//! here touches the DOM.

use crate::app::App;
use crate::format::{format_file_size, format_percent, format_seconds};
use crate::notify::ToastPhase;
use crate::plan::Plan;
use crate::state::Tab;
use crate::storage::KeyValueStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderView {
    pub signed_in: bool,
    pub user_name: String,
    pub initials: String,
    pub plan_label: String,
    pub is_pro: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView {
    pub key: &'static str,
    pub active: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleView {
    pub enabled: bool,
    pub checked: bool,
    /// "PRO" badge next to the label
    pub badge_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRow {
    pub index: usize,
    pub name: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
    pub visible: bool,
    pub enabled: bool,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub original_size: String,
    pub compressed_size: String,
    pub reduction: String,
    pub processing_time: String,
    pub original_bar: f64,
    pub compressed_bar: f64,
    pub download_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastView {
    pub id: u64,
    pub class_name: String,
    pub icon: &'static str,
    pub message: String,
    pub phase: ToastPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub header: HeaderView,
    pub tabs: Vec<TabView>,
    pub bulk_toggle: ToggleView,
    pub server_toggle: ToggleView,
    pub upload_visible: bool,
    /// Picker accepts several files
    pub upload_multiple: bool,
    pub file_info: Option<FileRow>,
    pub bulk_summary: Option<String>,
    pub bulk_rows: Vec<FileRow>,
    pub compression_level: &'static str,
    pub image_quality: u8,
    pub action: ActionView,
    pub progress: Option<u8>,
    pub result: Option<ResultView>,
    pub show_placeholder: bool,
    pub toasts: Vec<ToastView>,
}

impl ViewModel {
    pub fn from_app<S: KeyValueStore>(app: &App<S>, now_ms: f64) -> Self {
        let state = app.state();
        let pro = app.is_pro();
        let tab = state.current_tab;

        let header = match app.user() {
            Some(user) => HeaderView {
                signed_in: true,
                user_name: user.name.clone(),
                initials: user.initials(),
                plan_label: user.plan.label().to_string(),
                is_pro: pro,
            },
            None => HeaderView {
                signed_in: false,
                user_name: String::new(),
                initials: String::new(),
                plan_label: Plan::Free.label().to_string(),
                is_pro: false,
            },
        };

        let tabs = Tab::ALL
            .into_iter()
            .map(|t| TabView {
                key: t.key(),
                active: t == tab,
                locked: t.requires_pro() && !pro,
            })
            .collect();

        let toggle = |checked: bool| ToggleView {
            enabled: pro && !state.is_processing,
            checked: checked && pro,
            badge_visible: !pro,
        };

        let works_on_files = tab != Tab::Pricing;
        let has_files = state.has_files();
        let result = state.result(tab);

        let file_info = match (&state.selected_file, state.bulk_mode) {
            (Some(file), false) => Some(FileRow {
                index: 0,
                name: file.meta.name.clone(),
                size: format_file_size(file.meta.size),
            }),
            _ => None,
        };

        let (bulk_summary, bulk_rows) = if state.bulk_mode && !state.bulk_files.is_empty() {
            let total: u64 = state.bulk_files.iter().map(|f| f.size()).sum();
            let summary = format!(
                "{} files selected ({})",
                state.bulk_files.len(),
                format_file_size(total)
            );
            let rows = state
                .bulk_files
                .iter()
                .enumerate()
                .map(|(index, f)| FileRow {
                    index,
                    name: f.meta.name.clone(),
                    size: format_file_size(f.meta.size),
                })
                .collect();
            (Some(summary), rows)
        } else {
            (None, Vec::new())
        };

        let label = match (tab, state.is_processing) {
            (Tab::Compress, false) => "Compress PDF",
            (Tab::Compress, true) => "Compressing...",
            (_, false) => "Process PDF",
            (_, true) => "Processing...",
        };
        let action = ActionView {
            visible: works_on_files && has_files && result.is_none(),
            enabled: has_files && !state.is_processing,
            label,
        };

        let result_view = result.map(|r| {
            let (original_bar, compressed_bar) = r.bar_widths();
            ResultView {
                original_size: format_file_size(r.original_size),
                compressed_size: format_file_size(r.compressed_size),
                reduction: format_percent(r.reduction_percent()),
                processing_time: format_seconds(r.processing_time_ms),
                original_bar,
                compressed_bar,
                download_name: r.download_name.clone(),
            }
        });

        let timing = app.notifications().timing();
        let toasts = app
            .notifications()
            .visible(now_ms)
            .map(|n| ToastView {
                id: n.id,
                class_name: n.level.class_name().to_string(),
                icon: n.level.icon(),
                message: n.message.clone(),
                phase: n.phase(now_ms, timing),
            })
            .collect();

        Self {
            header,
            tabs,
            bulk_toggle: toggle(state.bulk_mode),
            server_toggle: toggle(state.server_processing),
            upload_visible: works_on_files && !has_files && result_view.is_none(),
            upload_multiple: pro && state.bulk_mode,
            file_info,
            bulk_summary,
            bulk_rows,
            compression_level: state.settings.level.label(),
            image_quality: state.settings.image_quality,
            action,
            progress: state.progress,
            show_placeholder: works_on_files && result_view.is_none() && !state.is_processing,
            result: result_view,
            toasts,
        }
    }

    pub fn active_tab(&self) -> Option<&'static str> {
        self.tabs.iter().find(|t| t.active).map(|t| t.key)
    }
}
