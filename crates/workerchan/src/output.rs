use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use workerchan_channel::{IncomingMessage, MessageError};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    internal: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    payload_size: usize,
}

impl<'a> MessageOutput<'a> {
    fn new(payload: &[u8], classified: &'a Result<IncomingMessage, MessageError>) -> Self {
        let base = Self {
            kind: "invalid",
            name: None,
            id: None,
            data: None,
            internal: None,
            error: None,
            payload_size: payload.len(),
        };
        match classified {
            Ok(IncomingMessage::Request {
                id,
                method,
                data,
                internal,
            }) => Self {
                kind: "request",
                name: Some(method.as_str()),
                id: Some(id.as_str()),
                data: data.as_ref(),
                internal: internal.as_ref(),
                ..base
            },
            Ok(IncomingMessage::Notification {
                event,
                data,
                internal,
            }) => Self {
                kind: "notification",
                name: Some(event.as_str()),
                data: data.as_ref(),
                internal: internal.as_ref(),
                ..base
            },
            Err(err) => Self {
                error: Some(err.to_string()),
                ..base
            },
        }
    }
}

pub fn print_message(
    payload: &[u8],
    classified: &Result<IncomingMessage, MessageError>,
    format: OutputFormat,
) {
    let out = MessageOutput::new(payload, classified);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "NAME", "ID", "SIZE", "DATA"])
                .add_row(vec![
                    out.kind.to_string(),
                    out.name.unwrap_or("-").to_string(),
                    out.id.unwrap_or("-").to_string(),
                    out.payload_size.to_string(),
                    detail(&out),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} name={} id={} size={} {}",
                out.kind,
                out.name.unwrap_or("-"),
                out.id.unwrap_or("-"),
                out.payload_size,
                detail(&out)
            );
        }
        OutputFormat::Raw => {
            print_raw(payload);
            print_raw(b"\n");
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn detail(out: &MessageOutput<'_>) -> String {
    if let Some(error) = &out.error {
        return format!("error: {error}");
    }
    out.data
        .map(Value::to_string)
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workerchan_channel::classify;

    #[test]
    fn request_output_fields() {
        let payload = br#"{"method":"m","id":"1","data":{"a":1}}"#;
        let classified = classify(payload);
        let out = MessageOutput::new(payload, &classified);
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["kind"], "request");
        assert_eq!(value["name"], "m");
        assert_eq!(value["id"], "1");
        assert_eq!(value["data"]["a"], 1);
        assert_eq!(value["payload_size"], payload.len());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn invalid_output_carries_error() {
        let payload = br#"{"foo":"bar"}"#;
        let classified = classify(payload);
        let out = MessageOutput::new(payload, &classified);
        assert_eq!(out.kind, "invalid");
        assert_eq!(
            detail(&out),
            "error: invalid message, missing 'method' and 'event' fields"
        );
    }
}
