//! Result of intent inference over one spoken command

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Outcome of one finalized command utterance
///
/// Delivered by value to the inference callback; the orchestrator keeps no copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inference {
    /// Whether the command matched the context grammar
    pub is_understood: bool,

    /// Inferred intent, `None` when not understood
    pub intent: Option<String>,

    /// Slot name to slot value, empty when not understood
    pub slots: HashMap<String, String>,
}

impl Inference {
    /// An understood command with its intent and slots
    pub fn understood<I, K, V>(intent: impl Into<String>, slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            is_understood: true,
            intent: Some(intent.into()),
            slots: slots
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// A command outside the context grammar
    #[must_use]
    pub fn not_understood() -> Self {
        Self::default()
    }

    /// Look up a slot value
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }
}

impl fmt::Display for Inference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(intent) = self.intent.as_deref().filter(|_| self.is_understood) else {
            return write!(f, "not understood");
        };

        // Sorted so the rendering is stable
        let mut slots: Vec<_> = self.slots.iter().collect();
        slots.sort();

        write!(f, "{intent}")?;
        if !slots.is_empty() {
            let rendered: Vec<String> = slots.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            write!(f, " {{{}}}", rendered.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn understood_collects_slots() {
        let inference =
            Inference::understood("orderBeverage", [("size", "large"), ("beverage", "coffee")]);

        assert!(inference.is_understood);
        assert_eq!(inference.intent.as_deref(), Some("orderBeverage"));
        assert_eq!(inference.slot("size"), Some("large"));
        assert_eq!(inference.slot("sugar"), None);
        assert_eq!(
            inference.to_string(),
            "orderBeverage {beverage: coffee, size: large}"
        );
    }

    #[test]
    fn not_understood_is_empty() {
        let inference = Inference::not_understood();

        assert!(!inference.is_understood);
        assert!(inference.intent.is_none());
        assert!(inference.slots.is_empty());
        assert_eq!(inference.to_string(), "not understood");
    }

    #[test]
    fn serializes_to_json() {
        let inference = Inference::understood("turnOff", std::iter::empty::<(&str, &str)>());
        let json = serde_json::to_value(&inference).unwrap();

        assert_eq!(json["is_understood"], true);
        assert_eq!(json["intent"], "turnOff");
        assert!(json["slots"].as_object().unwrap().is_empty());
    }
}
