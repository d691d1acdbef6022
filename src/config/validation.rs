use crate::error::{McpSnagError, Result};
use regex::Regex;
use std::time::Duration;

/// Parses `500ms`, `30s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let (number, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => value.split_at(pos),
        None => (value, "s"),
    };

    let amount: u64 = number
        .parse()
        .map_err(|_| McpSnagError::Config(format!("invalid duration {:?}", value)))?;
    let secs = |factor: u64| {
        amount
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| McpSnagError::Config(format!("duration {:?} is too large", value)))
    };
    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => secs(60)?,
        "h" => secs(3600)?,
        _ => {
            return Err(McpSnagError::Config(format!(
                "invalid duration unit in {:?} (use ms, s, m or h)",
                value
            )))
        }
    };

    if duration.is_zero() {
        return Err(McpSnagError::Config("timeout must be greater than zero".to_string()));
    }
    Ok(duration)
}

pub fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Splits a `Key: Value` header flag at the first colon.
pub fn parse_header(value: &str) -> Option<(String, String)> {
    let (name, value) = value.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Expands `${VAR_NAME}` references; unknown variables are left untouched.
pub fn expand_env_var_in_string(
    value: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| McpSnagError::Config(e.to_string()))?;
    let expanded = re.replace_all(value, |caps: &regex::Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    Ok(expanded.into_owned())
}
