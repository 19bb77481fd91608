//! Options a player can be asked to choose from.
//!
//! Every option has a *label*: the text a player's free-form answer is
//! matched against. Labels follow the engine's display names:
//! - an artifact (card, entity) is labelled with its name,
//! - a condition is labelled with the name of its source artifact,
//! - plain text is its own label.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::engine::Seat;

/// Anything the selection engine can offer to a player.
pub trait Selectable {
    fn label(&self) -> String;
}

impl Selectable for String {
    fn label(&self) -> String {
        self.clone()
    }
}

impl Selectable for &str {
    fn label(&self) -> String {
        (*self).to_string()
    }
}

/// A game object owned by the rules engine.
pub trait Artifact: fmt::Debug + Send + Sync {
    /// Display name, used as the option label.
    fn name(&self) -> &str;

    /// Attributes of this object as visible to `observer`.
    fn serialize(&self, observer: Seat) -> Map<String, Value>;
}

#[derive(Debug, Clone)]
pub enum GameOption {
    Artifact(Arc<dyn Artifact>),
    /// A triggered or derived choice that stems from `source`.
    Condition {
        source: Arc<dyn Artifact>,
        description: String,
    },
    Text(String),
}

impl GameOption {
    pub fn artifact(artifact: impl Artifact + 'static) -> Self {
        GameOption::Artifact(Arc::new(artifact))
    }

    pub fn text(text: impl Into<String>) -> Self {
        GameOption::Text(text.into())
    }

    /// Attribute form of this option for one observer.
    pub fn to_json(&self, observer: Seat) -> Value {
        match self {
            GameOption::Artifact(artifact) => Value::Object(artifact.serialize(observer)),
            GameOption::Condition { source, .. } => {
                let mut map = Map::new();
                map.insert("type".into(), Value::from("condition"));
                map.insert("source".into(), Value::Object(source.serialize(observer)));
                Value::Object(map)
            }
            GameOption::Text(text) => Value::from(text.as_str()),
        }
    }
}

impl Selectable for GameOption {
    fn label(&self) -> String {
        match self {
            GameOption::Artifact(artifact) => artifact.name().to_string(),
            GameOption::Condition { source, .. } => source.name().to_string(),
            GameOption::Text(text) => text.clone(),
        }
    }
}

/// Artifacts compare by identity, text by value.
impl PartialEq for GameOption {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (GameOption::Artifact(a), GameOption::Artifact(b)) => Arc::ptr_eq(a, b),
            (
                GameOption::Condition { source: a, description: da },
                GameOption::Condition { source: b, description: db },
            ) => Arc::ptr_eq(a, b) && da == db,
            (GameOption::Text(a), GameOption::Text(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Token(&'static str);

    impl Artifact for Token {
        fn name(&self) -> &str {
            self.0
        }

        fn serialize(&self, observer: Seat) -> Map<String, Value> {
            let mut map = Map::new();
            map.insert("name".into(), Value::from(self.0));
            map.insert("seen_by".into(), Value::from(observer.0));
            map
        }
    }

    #[test]
    fn labels_follow_display_names() {
        let token: Arc<dyn Artifact> = Arc::new(Token("Moat"));

        assert_eq!(GameOption::Artifact(token.clone()).label(), "Moat");
        assert_eq!(
            GameOption::Condition {
                source: token,
                description: "reveal to block".into(),
            }
            .label(),
            "Moat"
        );
        assert_eq!(GameOption::text("pass").label(), "pass");
    }

    #[test]
    fn condition_json_wraps_its_source() {
        let option = GameOption::Condition {
            source: Arc::new(Token("Moat")),
            description: String::new(),
        };

        let json = option.to_json(Seat(2));
        assert_eq!(json["type"], "condition");
        assert_eq!(json["source"]["name"], "Moat");
        assert_eq!(json["source"]["seen_by"], 2);
    }

    #[test]
    fn artifacts_compare_by_identity() {
        let a = GameOption::artifact(Token("Gold"));
        let b = GameOption::artifact(Token("Gold"));

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(GameOption::text("x"), GameOption::text("x"));
    }
}
