//
//  bkt-cli
//  cli/api.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Direct API access command
//!
//! Sends an authenticated request through the same transport the other
//! commands use, so retries, caching and rate-limit tracking all apply.
//! The path is resolved against the context host's base URL.
//!
//! ## Examples
//!
//! ```bash
//! # Cloud: base URL is https://api.bitbucket.org/2.0
//! bkt api /repositories/acme/widgets
//!
//! # Data Center: base URL is the server root
//! bkt api /rest/api/1.0/projects --paginate
//!
//! # POST with fields (dots nest objects)
//! bkt api -X POST /repositories/acme/widgets/issues -F title="Bug" -F content.raw="Steps"
//! ```

use std::io::Write;

use anyhow::{bail, Result};
use clap::Args;
use reqwest::Method;
use serde_json::{Map, Value};

use super::Factory;
use crate::api::common::{CloudCursor, ServerOffset};
use crate::api::{Dialect, RequestBody};

/// Make an authenticated API request
#[derive(Args, Debug)]
pub struct ApiCommand {
    /// Path relative to the host's API base URL
    pub endpoint: String,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Body field as key=value; values are typed as JSON where possible
    #[arg(long, short = 'F', action = clap::ArgAction::Append)]
    pub field: Vec<String>,

    /// Body field as key=value, always sent as a string
    #[arg(long, short = 'f', action = clap::ArgAction::Append)]
    pub raw_field: Vec<String>,

    /// Read the JSON body from a file (- for stdin)
    #[arg(long, conflicts_with_all = ["field", "raw_field"])]
    pub input: Option<String>,

    /// Follow pagination and print every record as one array
    #[arg(long)]
    pub paginate: bool,
}

impl ApiCommand {
    pub async fn run(&self, factory: &mut Factory) -> Result<()> {
        let method = parse_method(&self.method)?;
        let body = self.build_body()?;
        let session = factory.session()?;
        let transport = session.transport;
        let ctx = factory.call_context();

        if self.paginate {
            if method != Method::GET {
                bail!("--paginate only works with GET");
            }
            let limit = factory.limit(0);
            let records: Vec<Value> = match transport.dialect() {
                Dialect::Cloud => {
                    transport
                        .walk_pages(&ctx, &self.endpoint, &CloudCursor::for_limit(limit, 50), limit)
                        .await?
                }
                Dialect::DataCenter => {
                    transport
                        .walk_pages(&ctx, &self.endpoint, &ServerOffset::for_limit(limit, 100), limit)
                        .await?
                }
            };
            return factory.out().write_value(&records);
        }

        let body = body.map(|b| RequestBody::json(&b)).transpose()?;
        let request = transport.build_request(method, &self.endpoint, body)?;
        let bytes = transport.execute_bytes(&ctx, request).await?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(json) => factory.out().write_value(&json),
            Err(_) => {
                let out = factory.out().raw();
                out.write_all(&bytes)?;
                if !bytes.is_empty() && !bytes.ends_with(b"\n") {
                    writeln!(out)?;
                }
                Ok(())
            }
        }
    }

    fn build_body(&self) -> Result<Option<Value>> {
        if let Some(input) = &self.input {
            let content = if input == "-" {
                std::io::read_to_string(std::io::stdin())?
            } else {
                std::fs::read_to_string(input)?
            };
            return Ok(Some(serde_json::from_str(&content)?));
        }

        if self.field.is_empty() && self.raw_field.is_empty() {
            return Ok(None);
        }

        let mut body = Map::new();
        for field in &self.field {
            let (key, value) = split_field(field)?;
            set_nested(&mut body, key, typed_value(value));
        }
        for field in &self.raw_field {
            let (key, value) = split_field(field)?;
            set_nested(&mut body, key, Value::String(value.to_string()));
        }
        Ok(Some(Value::Object(body)))
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        _ => bail!("Unsupported HTTP method: {raw}"),
    }
}

fn split_field(field: &str) -> Result<(&str, &str)> {
    match field.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("Invalid field format: {field}. Expected key=value"),
    }
}

/// Integers stay integers; big values keep every digit.
fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ if raw.starts_with(['[', '{']) || raw.parse::<u64>().is_ok() || raw.parse::<i64>().is_ok() => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        }
        _ => Value::String(raw.to_string()),
    }
}

fn set_nested(obj: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            obj.insert(key.to_string(), value);
        }
        Some((first, rest)) => {
            let entry = obj
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                set_nested(nested, rest, value);
            }
        }
    }
}
