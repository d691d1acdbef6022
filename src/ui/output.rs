use crate::client::ExchangeObserver;
use crate::error::{McpSnagError, Result};
use colored::*;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Renders results and verbose traces. Results are pretty-printed unless
/// `compact` is set; trace lines only appear with `verbose`.
pub struct Printer<W = io::Stdout> {
    out: Mutex<W>,
    compact: bool,
    verbose: bool,
}

impl Printer<io::Stdout> {
    pub fn stdout(compact: bool, verbose: bool) -> Self {
        Self::new(io::stdout(), compact, verbose)
    }
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, compact: bool, verbose: bool) -> Self {
        Self {
            out: Mutex::new(out),
            compact,
            verbose,
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn out(&self) -> MutexGuard<'_, W> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let text = if self.compact {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        }
        .map_err(McpSnagError::Serialization)?;
        writeln!(self.out(), "{}", text)?;
        Ok(())
    }

    /// Prints a raw JSON document. Text that is not valid JSON is printed
    /// as-is.
    pub fn print_raw_json(&self, raw: &RawValue) -> Result<()> {
        let text = raw.get();
        if self.compact {
            writeln!(self.out(), "{}", text)?;
            return Ok(());
        }

        let pretty = serde_json::from_str::<Value>(text)
            .and_then(|v| serde_json::to_string_pretty(&v))
            .unwrap_or_else(|_| text.to_string());
        writeln!(self.out(), "{}", pretty)?;
        Ok(())
    }

    pub fn print_request(&self, method: &str, url: &str, headers: &HeaderMap, body: &[u8]) {
        if !self.verbose {
            return;
        }
        let mut out = self.out();
        let _ = writeln!(out, "> {} {}", method, url);
        for (name, value) in headers {
            let _ = writeln!(out, "> {}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        let _ = writeln!(out, ">");

        if !body.is_empty() {
            let text = serde_json::from_slice::<Value>(body)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
            for line in text.lines() {
                let _ = writeln!(out, "> {}", line);
            }
        }
        let _ = writeln!(out);
    }

    pub fn print_response(&self, status: StatusCode, headers: &HeaderMap) {
        if !self.verbose {
            return;
        }
        let mut out = self.out();
        let _ = writeln!(out, "< {}", status);
        for name in headers.keys() {
            let values: Vec<&str> = headers
                .get_all(name)
                .iter()
                .map(|v| v.to_str().unwrap_or("<binary>"))
                .collect();
            let _ = writeln!(out, "< {}: {}", name, values.join(", "));
        }
        let _ = writeln!(out, "<");
        let _ = writeln!(out);
    }

    pub fn print_verbose(&self, line: &str) {
        if self.verbose {
            let _ = writeln!(self.out(), "{}", line);
        }
    }

    pub fn print_session_info(&self, session_id: &str) -> Result<()> {
        self.print_json(&serde_json::json!({ "sessionId": session_id }))
    }

    pub fn print_error(&self, err: &dyn std::fmt::Display) {
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

impl<W: Write + Send> ExchangeObserver for Printer<W> {
    fn on_request(&self, method: &str, url: &str, headers: &HeaderMap, body: &[u8]) {
        self.print_request(method, url, headers, body);
    }

    fn on_response(&self, status: StatusCode, headers: &HeaderMap) {
        self.print_response(status, headers);
    }
}
