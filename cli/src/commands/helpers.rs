use anyhow::{Context, Result, bail};
use serde::Serialize;

/// Parse an ingredient spec like `"Milk"` or `"Milk x2"` into
/// `(name, quantity)`. The quantity suffix is a trailing ` xN`; everything
/// before it is the catalog name.
pub(crate) fn parse_usage_spec(spec: &str) -> Result<(String, i64)> {
    let spec = spec.trim();
    if spec.is_empty() {
        bail!("Ingredient spec must not be empty");
    }

    if let Some(idx) = spec.rfind(" x") {
        let qty_part = &spec[idx + 2..];
        if !qty_part.is_empty() && qty_part.chars().all(|c| c.is_ascii_digit()) {
            let quantity: i64 = qty_part
                .parse()
                .with_context(|| format!("Invalid quantity in '{spec}'"))?;
            if quantity < 1 {
                bail!("Quantity in '{spec}' must be at least 1");
            }
            let name = spec[..idx].trim();
            if name.is_empty() {
                bail!("Missing ingredient name in '{spec}'");
            }
            return Ok((name.to_string(), quantity));
        }
    }

    Ok((spec.to_string(), 1))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// Render optional notes for a table cell.
pub(crate) fn notes_cell(notes: Option<&str>) -> String {
    notes.map(|n| truncate(n, 30)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usage_spec_plain_name() {
        assert_eq!(parse_usage_spec("Milk").unwrap(), ("Milk".to_string(), 1));
        assert_eq!(
            parse_usage_spec("  Olive Oil  ").unwrap(),
            ("Olive Oil".to_string(), 1)
        );
    }

    #[test]
    fn test_parse_usage_spec_with_quantity() {
        assert_eq!(parse_usage_spec("Milk x2").unwrap(), ("Milk".to_string(), 2));
        assert_eq!(
            parse_usage_spec("Chicken Thighs x12").unwrap(),
            ("Chicken Thighs".to_string(), 12)
        );
    }

    #[test]
    fn test_parse_usage_spec_name_containing_x() {
        // Only a trailing " x<digits>" is a quantity
        assert_eq!(
            parse_usage_spec("Brand x Cereal").unwrap(),
            ("Brand x Cereal".to_string(), 1)
        );
        assert_eq!(
            parse_usage_spec("Brand x Cereal x3").unwrap(),
            ("Brand x Cereal".to_string(), 3)
        );
    }

    #[test]
    fn test_parse_usage_spec_invalid() {
        assert!(parse_usage_spec("").is_err());
        assert!(parse_usage_spec("   ").is_err());
        assert!(parse_usage_spec(" x2").is_err());
    }

    #[test]
    fn test_parse_usage_spec_zero_quantity() {
        assert!(parse_usage_spec("Milk x0").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        // Should not panic on multi-byte characters
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_notes_cell() {
        assert_eq!(notes_cell(None), "");
        assert_eq!(notes_cell(Some("2% fat")), "2% fat");
    }
}
