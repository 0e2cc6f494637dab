//! Values paired with the warnings collected while producing them

use std::fmt;

use serde::Serialize;

/// Severity of a conversion message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Warning,
    Error,
}

/// A non-fatal problem found during conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message: String,
}

impl Message {
    /// Create a warning
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Warning,
            message: message.into(),
        }
    }

    /// Create an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A value plus the messages produced along the way
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult<T> {
    pub value: T,
    pub messages: Vec<Message>,
}

impl<T> ConversionResult<T> {
    /// A value without messages
    pub fn success(value: T) -> Self {
        Self {
            value,
            messages: Vec::new(),
        }
    }

    /// A value with messages
    pub fn new(value: T, messages: Vec<Message>) -> Self {
        Self { value, messages }
    }

    /// Transform the value, keeping the messages
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ConversionResult<U> {
        ConversionResult {
            value: f(self.value),
            messages: self.messages,
        }
    }

    /// Chain a computation, appending its messages after ours
    pub fn flat_map<U>(self, f: impl FnOnce(T) -> ConversionResult<U>) -> ConversionResult<U> {
        let mut next = f(self.value);
        let mut messages = self.messages;
        messages.append(&mut next.messages);
        ConversionResult {
            value: next.value,
            messages,
        }
    }

    /// Collect many results into one, concatenating messages in order
    pub fn combine(results: impl IntoIterator<Item = ConversionResult<T>>) -> ConversionResult<Vec<T>> {
        let mut values = Vec::new();
        let mut messages = Vec::new();
        for mut result in results {
            values.push(result.value);
            messages.append(&mut result.messages);
        }
        ConversionResult { value: values, messages }
    }

    /// Only the warnings
    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|m| m.message_type == MessageType::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_map_orders_messages() {
        let first = ConversionResult::new(1, vec![Message::warning("a")]);
        let chained = first.flat_map(|v| ConversionResult::new(v + 1, vec![Message::error("b")]));
        assert_eq!(chained.value, 2);
        assert_eq!(
            chained.messages,
            vec![Message::warning("a"), Message::error("b")]
        );
        assert_eq!(chained.warnings().count(), 1);
    }

    #[test]
    fn test_combine() {
        let combined = ConversionResult::combine(vec![
            ConversionResult::new("x", vec![Message::warning("1")]),
            ConversionResult::success("y"),
            ConversionResult::new("z", vec![Message::warning("2")]),
        ]);
        assert_eq!(combined.value, vec!["x", "y", "z"]);
        assert_eq!(combined.messages.len(), 2);
    }
}
