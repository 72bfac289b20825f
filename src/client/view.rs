//! The page elements the sync layer reads and writes.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use super::lock;

/// Element ids the host page must provide. Any of them may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    SessionFilter,
    HistorySlotFilter,
    SessionInfoBadge,
    CurrentSessionTitle,
    TableWrapper,
    TotalRevenue,
    TotalConfirmedRevenue,
    GapRevenue,
    CurrentProductCount,
    Toast,
    ToastMessage,
    CopyModal,
    CopyModalInput,
    Sidebar,
    MainContent,
}

impl ElementId {
    pub const ALL: [ElementId; 15] = [
        ElementId::SessionFilter,
        ElementId::HistorySlotFilter,
        ElementId::SessionInfoBadge,
        ElementId::CurrentSessionTitle,
        ElementId::TableWrapper,
        ElementId::TotalRevenue,
        ElementId::TotalConfirmedRevenue,
        ElementId::GapRevenue,
        ElementId::CurrentProductCount,
        ElementId::Toast,
        ElementId::ToastMessage,
        ElementId::CopyModal,
        ElementId::CopyModalInput,
        ElementId::Sidebar,
        ElementId::MainContent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ElementId::SessionFilter => "sessionFilter",
            ElementId::HistorySlotFilter => "historySlotFilter",
            ElementId::SessionInfoBadge => "sessionInfoBadge",
            ElementId::CurrentSessionTitle => "currentSessionTitle",
            ElementId::TableWrapper => "tableWrapper",
            ElementId::TotalRevenue => "totalRevenue",
            ElementId::TotalConfirmedRevenue => "totalConfirmedRevenue",
            ElementId::GapRevenue => "gapRevenue",
            ElementId::CurrentProductCount => "currentProductCount",
            ElementId::Toast => "toast",
            ElementId::ToastMessage => "toastMessage",
            ElementId::CopyModal => "copyModal",
            ElementId::CopyModalInput => "copyModalInput",
            ElementId::Sidebar => "sidebar",
            ElementId::MainContent => "mainContent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Page surface. Every call on an element the page lacks must be a silent no-op.
pub trait DashboardView: Send + Sync {
    fn set_text(&self, id: ElementId, text: &str);
    fn set_html(&self, id: ElementId, html: &str);
    /// Replaces every option of a `<select>`.
    fn set_options(&self, id: ElementId, options: Vec<SelectOption>);
    /// Current options; empty when the element is missing.
    fn options(&self, id: ElementId) -> Vec<SelectOption>;
    fn set_disabled(&self, id: ElementId, disabled: bool);
    fn set_value(&self, id: ElementId, value: &str);
    fn set_class(&self, id: ElementId, class: &str, on: bool);
    fn has_class(&self, id: ElementId, class: &str) -> bool;
    fn focus_and_select(&self, id: ElementId);
}

/// Collapses or expands the sidebar, widening the main column to match.
pub fn toggle_sidebar(view: &dyn DashboardView) {
    let collapse = !view.has_class(ElementId::Sidebar, "collapsed");
    view.set_class(ElementId::Sidebar, "collapsed", collapse);
    view.set_class(ElementId::MainContent, "expanded", collapse);
}

#[derive(Debug, Clone, Default)]
pub struct ElementState {
    pub text: String,
    pub html: String,
    pub options: Vec<SelectOption>,
    pub disabled: bool,
    pub value: String,
    pub classes: BTreeSet<String>,
    pub focused: bool,
}

/// Headless [`DashboardView`] holding element state in memory.
#[derive(Debug, Default)]
pub struct MemoryView {
    elements: Mutex<HashMap<ElementId, ElementState>>,
}

impl MemoryView {
    /// A page with every contract element present.
    pub fn new() -> Self {
        Self::with_elements(&ElementId::ALL)
    }

    pub fn with_elements(ids: &[ElementId]) -> Self {
        let elements = ids
            .iter()
            .map(|id| (*id, ElementState::default()))
            .collect();
        Self {
            elements: Mutex::new(elements),
        }
    }

    /// Snapshot of one element, `None` when the page lacks it.
    pub fn element(&self, id: ElementId) -> Option<ElementState> {
        lock(&self.elements).get(&id).cloned()
    }

    pub fn text(&self, id: ElementId) -> Option<String> {
        self.element(id).map(|el| el.text)
    }

    pub fn html(&self, id: ElementId) -> Option<String> {
        self.element(id).map(|el| el.html)
    }

    pub fn is_disabled(&self, id: ElementId) -> bool {
        self.element(id).is_some_and(|el| el.disabled)
    }

    fn update(&self, id: ElementId, apply: impl FnOnce(&mut ElementState)) {
        if let Some(element) = lock(&self.elements).get_mut(&id) {
            apply(element);
        }
    }
}

impl DashboardView for MemoryView {
    fn set_text(&self, id: ElementId, text: &str) {
        self.update(id, |el| el.text = text.to_string());
    }

    fn set_html(&self, id: ElementId, html: &str) {
        self.update(id, |el| el.html = html.to_string());
    }

    fn set_options(&self, id: ElementId, options: Vec<SelectOption>) {
        self.update(id, |el| {
            el.value = options
                .iter()
                .find(|opt| !opt.disabled)
                .map(|opt| opt.value.clone())
                .unwrap_or_default();
            el.options = options;
        });
    }

    fn options(&self, id: ElementId) -> Vec<SelectOption> {
        self.element(id).map(|el| el.options).unwrap_or_default()
    }

    fn set_disabled(&self, id: ElementId, disabled: bool) {
        self.update(id, |el| el.disabled = disabled);
    }

    fn set_value(&self, id: ElementId, value: &str) {
        self.update(id, |el| el.value = value.to_string());
    }

    fn set_class(&self, id: ElementId, class: &str, on: bool) {
        self.update(id, |el| {
            if on {
                el.classes.insert(class.to_string());
            } else {
                el.classes.remove(class);
            }
        });
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.classes.contains(class))
    }

    fn focus_and_select(&self, id: ElementId) {
        self.update(id, |el| el.focused = true);
    }
}
