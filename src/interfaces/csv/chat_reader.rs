use crate::application::conversation::Inbound;
use crate::error::{PayrollError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Contact,
    Text,
    Callback,
}

/// One row of a chat transcript: `actor,kind,payload`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ChatEvent {
    pub actor: String,
    pub kind: EventKind,
    pub payload: Option<String>,
}

impl ChatEvent {
    /// Converts the row into a transport event. Every kind but `start` needs a payload.
    pub fn into_inbound(self) -> Result<Inbound> {
        let payload = || {
            self.payload.clone().ok_or_else(|| {
                PayrollError::validation(format!(
                    "{:?} event from {} has no payload",
                    self.kind, self.actor
                ))
            })
        };
        Ok(match self.kind {
            EventKind::Start => Inbound::Start,
            EventKind::Contact => Inbound::Contact(payload()?),
            EventKind::Text => Inbound::Text(payload()?),
            EventKind::Callback => Inbound::Callback(payload()?),
        })
    }
}

/// Reads chat events from a CSV source.
///
/// Whitespace around fields is trimmed and rows may omit the payload column.
pub struct ChatReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ChatReader<R> {
    /// Creates a new reader over `source`, which must start with a header row.
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes events, one per row.
    pub fn events(self) -> impl Iterator<Item = Result<ChatEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PayrollError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "actor, kind, payload\n\
                    tg-1, start,\n\
                    tg-1, contact, +996700000001\n\
                    tg-1, text, Monthly salary";
        let events: Vec<ChatEvent> = ChatReader::new(data.as_bytes())
            .events()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Start);
        assert_eq!(events[0].payload, None);
        assert_eq!(
            events[1].clone().into_inbound().unwrap(),
            Inbound::Contact("+996700000001".into())
        );
        assert_eq!(
            events[2].clone().into_inbound().unwrap(),
            Inbound::Text("Monthly salary".into())
        );
    }

    #[test]
    fn test_reader_unknown_kind() {
        let data = "actor, kind, payload\ntg-1, sticker, cat";
        let results: Vec<Result<ChatEvent>> = ChatReader::new(data.as_bytes()).events().collect();
        assert!(results[0].is_err());
    }

    #[test]
    fn test_missing_payload() {
        let event = ChatEvent {
            actor: "tg-1".into(),
            kind: EventKind::Text,
            payload: None,
        };
        assert!(matches!(
            event.into_inbound(),
            Err(PayrollError::ValidationError(_))
        ));
    }
}
