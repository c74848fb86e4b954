//! Page snapshot parsing
//!
//! Parses the result of [`Script::InspectPage`](crate::script::Script::InspectPage):
//! the visible text fields and buttons, used to diagnose selectors that
//! stopped matching.

use serde::{Deserialize, Serialize};

use crate::core::Result;
use crate::script::builder::Script;
use crate::script::runner::{decode, Evaluator};

/// Visible inputs and buttons on the page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    #[serde(default)]
    pub buttons: Vec<ButtonInfo>,
}

/// A visible text field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInfo {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub aria_label: String,
}

/// A visible button
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonInfo {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub aria_label: String,
    #[serde(default)]
    pub button_type: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub has_icon: bool,
}

/// Buttons shown in a formatted snapshot
const MAX_LISTED_BUTTONS: usize = 10;

impl PageSnapshot {
    /// Capture a snapshot of the current page
    pub async fn capture(eval: &dyn Evaluator) -> Result<Self> {
        let script = Script::InspectPage;
        let value = eval.run(&script).await?;
        decode(&script, value)
    }

    /// Buttons that look like submit affordances
    pub fn submit_candidates(&self) -> Vec<&ButtonInfo> {
        self.buttons
            .iter()
            .filter(|b| {
                b.button_type == "submit"
                    || b.aria_label.to_lowercase().contains("submit")
                    || (b.has_icon && b.text.len() <= 30)
            })
            .collect()
    }

    /// Format snapshot for display
    pub fn format_for_display(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Page: {} ({})\n", self.title, self.url));

        output.push_str(&format!("Text fields ({}):\n", self.fields.len()));
        for (i, field) in self.fields.iter().enumerate() {
            output.push_str(&format!(
                "  {}. <{}> placeholder=\"{}\" id=\"{}\" class=\"{}\"",
                i + 1,
                field.tag,
                field.placeholder,
                field.id,
                field.class_name
            ));
            if !field.aria_label.is_empty() {
                output.push_str(&format!(" aria-label=\"{}\"", field.aria_label));
            }
            output.push('\n');
        }

        output.push_str(&format!("Buttons ({}):\n", self.buttons.len()));
        for (i, button) in self.buttons.iter().take(MAX_LISTED_BUTTONS).enumerate() {
            output.push_str(&format!(
                "  {}. \"{}\" aria-label=\"{}\" type={}",
                i + 1,
                button.text,
                button.aria_label,
                button.button_type
            ));
            if button.disabled {
                output.push_str(" [disabled]");
            }
            if button.has_icon {
                output.push_str(" [icon]");
            }
            output.push('\n');
        }

        output
    }
}
