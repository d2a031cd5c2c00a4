//! English pluralization for aggregation keys (`user_email` → `user_emails`).
//!
//! Only the last `_`-separated segment is inflected. The rules cover the
//! field names log documents actually use; irregular nouns are not handled.

const UNCOUNTABLE: &[&str] = &["data", "info", "metadata", "series"];

pub fn pluralize(word: &str) -> String {
    let (head, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };
    format!("{head}{}", pluralize_segment(last))
}

fn pluralize_segment(segment: &str) -> String {
    if segment.is_empty() || UNCOUNTABLE.contains(&segment.to_ascii_lowercase().as_str()) {
        return segment.to_string();
    }

    let lower = segment.to_ascii_lowercase();
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| lower.ends_with(suffix)) {
        return format!("{segment}es");
    }

    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &segment[..segment.len() - 1]);
        }
    }

    format!("{segment}s")
}
