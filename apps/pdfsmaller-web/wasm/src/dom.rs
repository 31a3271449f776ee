//! Applies a [`ViewModel`] to the page
//!
//! Every lookup is guarded: an element missing from the current page is
//! skipped, so the same renderer serves pages that only carry part of the
//! layout.

use pdfsmaller_core::notify::ToastPhase;
use pdfsmaller_core::view::{FileRow, ToastView, ToggleView};
use pdfsmaller_core::ViewModel;
use std::cell::RefCell;
use std::collections::HashMap;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

const HIDDEN: &str = "hidden";

pub struct Renderer {
    document: Document,
    /// Toast elements currently attached, by notification id
    toasts: RefCell<HashMap<u64, Element>>,
}

impl Renderer {
    pub fn new() -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("No document")?;
        Ok(Self {
            document,
            toasts: RefCell::new(HashMap::new()),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_visible(&self, id: &str, visible: bool) -> Result<(), JsValue> {
        if let Some(el) = self.by_id(id) {
            el.class_list().toggle_with_force(HIDDEN, !visible)?;
        }
        Ok(())
    }

    fn set_width(&self, id: &str, percent: f64) -> Result<(), JsValue> {
        if let Some(el) = self.by_id(id).and_then(|e| e.dyn_into::<HtmlElement>().ok()) {
            el.style().set_property("width", &css_percent(percent))?;
        }
        Ok(())
    }

    fn input(&self, id: &str) -> Option<HtmlInputElement> {
        self.by_id(id).and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
    }

    pub fn render(&self, view: &ViewModel) -> Result<(), JsValue> {
        self.render_header(view)?;
        self.render_tabs(view)?;
        self.render_toggle("bulkMode", &view.bulk_toggle)?;
        self.render_toggle("serverProcessing", &view.server_toggle)?;
        self.render_files(view)?;
        self.render_settings(view);
        self.render_action(view)?;
        self.render_progress(view)?;
        self.render_result(view)?;
        self.render_toasts(&view.toasts)
    }

    fn render_header(&self, view: &ViewModel) -> Result<(), JsValue> {
        let header = &view.header;
        self.set_visible("guestActions", !header.signed_in)?;
        self.set_visible("userActions", header.signed_in)?;
        self.set_text("userName", &header.user_name);
        self.set_text("userInitials", &header.initials);
        self.set_text("userPlan", &header.plan_label);
        if let Some(el) = self.by_id("userPlan") {
            el.class_list().toggle_with_force("pro", header.is_pro)?;
        }
        Ok(())
    }

    fn render_tabs(&self, view: &ViewModel) -> Result<(), JsValue> {
        for tab in &view.tabs {
            let selector = format!(".tab-button[data-tab=\"{}\"]", tab.key);
            if let Some(button) = self.document.query_selector(&selector)? {
                let classes = button.class_list();
                classes.toggle_with_force("active", tab.active)?;
                classes.toggle_with_force("locked", tab.locked)?;
            }
            if let Some(panel) = self.by_id(&format!("{}Tab", tab.key)) {
                panel.class_list().toggle_with_force("active", tab.active)?;
            }
        }
        Ok(())
    }

    fn render_toggle(&self, id: &str, toggle: &ToggleView) -> Result<(), JsValue> {
        if let Some(input) = self.input(id) {
            input.set_checked(toggle.checked);
            input.set_disabled(!toggle.enabled);
        }
        self.set_visible(&format!("{}Badge", id), toggle.badge_visible)
    }

    fn render_files(&self, view: &ViewModel) -> Result<(), JsValue> {
        self.set_visible("uploadArea", view.upload_visible)?;
        if let Some(input) = self.input("fileInput") {
            input.set_multiple(view.upload_multiple);
        }

        self.set_visible("fileInfo", view.file_info.is_some())?;
        if let Some(file) = &view.file_info {
            self.set_text("fileName", &file.name);
            self.set_text("fileSize", &file.size);
        }

        self.set_visible("bulkFiles", view.bulk_summary.is_some())?;
        self.set_text("bulkSummary", view.bulk_summary.as_deref().unwrap_or_default());
        if let Some(list) = self.by_id("bulkFileList") {
            list.set_inner_html("");
            for row in &view.bulk_rows {
                list.append_child(&self.bulk_row(row)?.into())?;
            }
        }
        Ok(())
    }

    fn bulk_row(&self, row: &FileRow) -> Result<Element, JsValue> {
        let item = self.document.create_element("div")?;
        item.set_class_name("bulk-file-item");

        let name = self.document.create_element("span")?;
        name.set_class_name("bulk-file-name");
        name.set_text_content(Some(&row.name));

        let size = self.document.create_element("span")?;
        size.set_class_name("bulk-file-size");
        size.set_text_content(Some(&row.size));

        let remove = self.document.create_element("button")?;
        remove.set_class_name("bulk-file-remove");
        remove.set_attribute("data-index", &row.index.to_string())?;
        remove.set_attribute("aria-label", &format!("Remove {}", row.name))?;
        remove.set_text_content(Some("×"));

        item.append_child(&name)?;
        item.append_child(&size)?;
        item.append_child(&remove)?;
        Ok(item)
    }

    fn render_settings(&self, view: &ViewModel) {
        if let Some(select) = self
            .by_id("compressionLevel")
            .and_then(|e| e.dyn_into::<HtmlSelectElement>().ok())
        {
            select.set_value(view.compression_level);
        }
        if let Some(input) = self.input("imageQuality") {
            input.set_value(&view.image_quality.to_string());
        }
        self.set_text("qualityValue", &format!("{}%", view.image_quality));
    }

    fn render_action(&self, view: &ViewModel) -> Result<(), JsValue> {
        self.set_visible("compressBtn", view.action.visible)?;
        if let Some(button) = self.by_id("compressBtn") {
            button.set_text_content(Some(view.action.label));
            if view.action.enabled {
                button.remove_attribute("disabled")?;
            } else {
                button.set_attribute("disabled", "")?;
            }
        }
        Ok(())
    }

    fn render_progress(&self, view: &ViewModel) -> Result<(), JsValue> {
        self.set_visible("progressContainer", view.progress.is_some())?;
        let percent = view.progress.unwrap_or(0);
        self.set_width("progressBar", f64::from(percent))?;
        self.set_text("progressPercentage", &format!("{}%", percent));
        Ok(())
    }

    fn render_result(&self, view: &ViewModel) -> Result<(), JsValue> {
        self.set_visible("results", view.result.is_some())?;
        self.set_visible("resultPlaceholder", view.show_placeholder)?;
        self.set_visible("newFileBtn", view.result.is_some())?;

        let Some(result) = &view.result else {
            return Ok(());
        };
        self.set_text("originalSize", &result.original_size);
        self.set_text("compressedSize", &result.compressed_size);
        self.set_text("reductionPercent", &result.reduction);
        self.set_text("processingTime", &result.processing_time);
        self.set_width("originalBar", result.original_bar)?;
        self.set_width("compressedBar", result.compressed_bar)?;
        if let Some(button) = self.by_id("downloadBtn") {
            button.set_attribute("data-filename", &result.download_name)?;
        }
        Ok(())
    }

    fn render_toasts(&self, toasts: &[ToastView]) -> Result<(), JsValue> {
        let mut attached = self.toasts.borrow_mut();

        attached.retain(|id, el| {
            let live = toasts.iter().any(|t| t.id == *id);
            if !live {
                el.remove();
            }
            live
        });

        for toast in toasts {
            let existing = attached.get(&toast.id).cloned();
            let el = match existing {
                Some(el) => el,
                None => {
                    let el = self.toast_element(toast)?;
                    if let Some(body) = self.document.body() {
                        body.append_child(&el)?;
                    }
                    attached.insert(toast.id, el.clone());
                    el
                }
            };
            el.set_class_name(&toast_classes(toast));
        }
        Ok(())
    }

    fn toast_element(&self, toast: &ToastView) -> Result<Element, JsValue> {
        let el = self.document.create_element("div")?;
        el.set_attribute("role", "status")?;

        let icon = self.document.create_element("span")?;
        icon.set_class_name("notification-icon");
        icon.set_text_content(Some(toast.icon));

        let message = self.document.create_element("span")?;
        message.set_class_name("notification-message");
        message.set_text_content(Some(&toast.message));

        el.append_child(&icon)?;
        el.append_child(&message)?;
        Ok(el)
    }
}

fn css_percent(value: f64) -> String {
    format!("{}%", value.clamp(0.0, 100.0))
}

/// `show` is present only while the toast is fully on screen
fn toast_classes(toast: &ToastView) -> String {
    match toast.phase {
        ToastPhase::Shown => format!("notification {} show", toast.class_name),
        _ => format!("notification {}", toast.class_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn toast(phase: ToastPhase) -> ToastView {
        ToastView {
            id: 1,
            class_name: "notification-error".into(),
            icon: "✗",
            message: "Invalid credentials.".into(),
            phase,
        }
    }

    #[test]
    fn test_toast_classes_follow_phase() {
        assert_eq!(
            toast_classes(&toast(ToastPhase::Entering)),
            "notification notification-error"
        );
        assert_eq!(
            toast_classes(&toast(ToastPhase::Shown)),
            "notification notification-error show"
        );
        assert_eq!(
            toast_classes(&toast(ToastPhase::Leaving)),
            "notification notification-error"
        );
    }

    #[test]
    fn test_css_percent_clamps() {
        assert_eq!(css_percent(25.0), "25%");
        assert_eq!(css_percent(37.5), "37.5%");
        assert_eq!(css_percent(140.0), "100%");
    }
}
