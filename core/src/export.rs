//! HTML export of the aggregated shopping list, used as the body of the
//! dispatched email. The fragment mirrors the on-screen grouping: a category
//! heading only at the start of each category run, list items with a
//! quantity parenthetical when buying more than one, and optional notes.

use crate::aggregate::header_flags;
use crate::models::AggregatedItem;

/// Escape text for inclusion in the HTML fragment.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the category-sorted list as one combined HTML fragment.
///
/// Notes are included only when `notes_enabled` is set and the item carries
/// non-empty notes.
#[must_use]
pub fn render_html(items: &[AggregatedItem], notes_enabled: bool) -> String {
    let flags = header_flags(items);
    let mut message = String::new();

    for (item, header) in items.iter().zip(flags) {
        if header {
            message.push_str("<h3>");
            message.push_str(&escape_html(&item.category));
            message.push_str("</h3>");
        }
        message.push_str("<li>");
        if item.quantity > 1 {
            message.push_str(&format!("({}) ", item.quantity));
        }
        message.push_str(&escape_html(&item.name));
        if notes_enabled {
            if let Some(notes) = item.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                message.push_str(" <i>Notes: ");
                message.push_str(&escape_html(notes));
                message.push_str("</i>");
            }
        }
        message.push_str("</li>");
    }

    message
}
