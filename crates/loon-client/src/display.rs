// crates/loon-client/src/display.rs

//! Plain-text rendering of server frames.

use serde_json::{Map, Value};

pub fn select(options: &[String], additional: &[String], reason: Option<&str>) -> String {
    let mut out = String::new();

    match reason {
        Some(reason) => out.push_str(&format!("Choose ({reason}):\n")),
        None => out.push_str("Choose:\n"),
    }
    for (i, label) in options.iter().enumerate() {
        out.push_str(&format!("  {:>2}. {}\n", i + 1, label));
    }
    if !additional.is_empty() {
        out.push_str(&format!("  or -{}\n", additional.join(" / -")));
    }
    out.push_str("> ");
    out
}

pub fn event(event_type: &str, first: bool, values: &Map<String, Value>) -> String {
    let marker = if first { "*" } else { " " };
    let mut fields: Vec<String> = values
        .iter()
        .map(|(k, v)| format!("{k}={}", compact(v)))
        .collect();
    fields.sort();
    format!("{marker} {event_type} {}", fields.join(" "))
}

/// Artifacts print as their name when they have one.
fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("name") {
            Some(Value::String(name)) => name.clone(),
            _ => value.to_string(),
        },
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(compact).collect();
            format!("[{}]", inner.join(", "))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_lists_options_and_extras() {
        let text = select(
            &["Copper".into(), "Silver".into()],
            &["pass".into()],
            Some("draft a card"),
        );

        assert!(text.starts_with("Choose (draft a card):\n"));
        assert!(text.contains("   1. Copper\n"));
        assert!(text.contains("   2. Silver\n"));
        assert!(text.contains("or -pass"));
    }

    #[test]
    fn event_collapses_artifacts_to_names() {
        let values = json!({"player": 0, "card": {"id": 1, "name": "Silver", "cost": 3}});

        assert_eq!(
            event("CardDrafted", true, values.as_object().unwrap()),
            "* CardDrafted card=Silver player=0"
        );
    }

    #[test]
    fn nested_lists_render_inline() {
        let values = json!({"hands": [["Gold"], []]});

        assert_eq!(
            event("GameOver", false, values.as_object().unwrap()),
            "  GameOver hands=[[Gold], []]"
        );
    }
}
