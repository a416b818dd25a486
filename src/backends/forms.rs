//! Persisting live form state into markup.

use super::dom;
use crate::{Document, FormStatePersister};
use log::debug;

/// Writes a document's live form values into the markup
///
/// Text-like inputs get a `value` attribute, checkboxes and radio buttons a
/// `checked` attribute (for the values `true`, `on` and `checked`), and
/// textareas their content.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputValuePersister;

impl InputValuePersister {
    pub fn new() -> Self {
        InputValuePersister
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "on" | "checked")
}

impl FormStatePersister for InputValuePersister {
    fn persist(&self, document: &mut Document) {
        let state = document.take_form_state();
        if state.is_empty() {
            return;
        }
        debug!("persisting {} form value(s)", state.len());

        let tree = dom::parse(document.markup());

        if let Ok(inputs) = tree.select("input[name]") {
            for input in inputs {
                let mut attrs = input.attributes.borrow_mut();
                let Some(value) = attrs.get("name").and_then(|n| state.get(n)) else {
                    continue;
                };
                let kind = attrs.get("type").unwrap_or_default().to_ascii_lowercase();
                if kind == "checkbox" || kind == "radio" {
                    if is_checked(value) {
                        attrs.insert("checked", "checked".to_string());
                    } else {
                        attrs.remove("checked");
                    }
                } else {
                    attrs.insert("value", value.clone());
                }
            }
        }

        let textareas: Vec<_> = match tree.select("textarea[name]") {
            Ok(found) => found.collect(),
            Err(()) => Vec::new(),
        };
        for area in textareas {
            let name = area.attributes.borrow().get("name").map(str::to_string);
            if let Some(value) = name.and_then(|n| state.get(&n)) {
                dom::set_text(area.as_node(), value);
            }
        }

        document.set_markup(dom::to_html(&tree));
    }
}
