// MIT License
//
// Copyright (c) 2025 Takatoshi Kondo
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Topic and topic filter validation, and filter/topic matching.

use crate::client::error::ClientError;

/// Validates a publication topic: 1..=65535 bytes, no NUL, no wildcards, no
/// writes to a `$SYS` tree member initiated by this client.
pub fn validate_topic_name(topic: &str) -> Result<(), ClientError> {
    if topic.is_empty() || topic.len() > 65535 {
        return Err(ClientError::ArgumentInvalid {
            field: "topic",
            reason: "length must be in 1..=65535 bytes".into(),
        });
    }
    if topic.contains('\0') {
        return Err(ClientError::ArgumentInvalid {
            field: "topic",
            reason: "must not contain a null byte".into(),
        });
    }
    if topic.contains('+') || topic.contains('#') {
        return Err(ClientError::ArgumentInvalid {
            field: "topic",
            reason: "publication topics must not contain wildcards".into(),
        });
    }
    if topic.starts_with("$SYS") {
        return Err(ClientError::ArgumentInvalid {
            field: "topic",
            reason: "clients must not publish to $SYS".into(),
        });
    }
    Ok(())
}

/// Validates a subscription topic filter, including the `#` terminal-only
/// rule and the `$share/{group}/{filter}` shared-subscription prefix.
pub fn validate_topic_filter(filter: &str) -> Result<(), ClientError> {
    if filter.is_empty() || filter.len() > 65535 {
        return Err(ClientError::ArgumentInvalid {
            field: "topic_filter",
            reason: "length must be in 1..=65535 bytes".into(),
        });
    }
    if filter.contains('\0') {
        return Err(ClientError::ArgumentInvalid {
            field: "topic_filter",
            reason: "must not contain a null byte".into(),
        });
    }

    let rest = if let Some(stripped) = filter.strip_prefix("$share/") {
        let mut parts = stripped.splitn(2, '/');
        let group = parts.next().unwrap_or("");
        let real_filter = parts.next();
        if group.is_empty() || group.contains(['+', '#']) || real_filter.is_none() {
            return Err(ClientError::ArgumentInvalid {
                field: "topic_filter",
                reason: "malformed $share/{group}/{filter} prefix".into(),
            });
        }
        real_filter.unwrap()
    } else {
        filter
    };

    let levels: Vec<&str> = rest.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != "#" || i != levels.len() - 1) {
            return Err(ClientError::ArgumentInvalid {
                field: "topic_filter",
                reason: "'#' is only valid as the final, standalone level".into(),
            });
        }
        if level.contains('+') && *level != "+" {
            return Err(ClientError::ArgumentInvalid {
                field: "topic_filter",
                reason: "'+' must occupy an entire level".into(),
            });
        }
    }
    Ok(())
}

/// Strips a `$share/{group}/` prefix, returning `(Some(group), filter)` or
/// `(None, filter)` if this is not a shared subscription.
pub fn split_shared_group(filter: &str) -> (Option<&str>, &str) {
    if let Some(stripped) = filter.strip_prefix("$share/") {
        if let Some(idx) = stripped.find('/') {
            return (Some(&stripped[..idx]), &stripped[idx + 1..]);
        }
    }
    (None, filter)
}

/// Matches a concrete topic against a subscription filter per the MQTT 5
/// wildcard rules. `$`-prefixed topics (e.g. `$SYS/...`) only match filters
/// that explicitly start with `$`, never a leading `+` or `#`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let (_, filter) = split_shared_group(filter);

    if topic.starts_with('$') && !filter.starts_with('$') {
        return false;
    }

    let mut f_levels = filter.split('/');
    let mut t_levels = topic.split('/');

    loop {
        match (f_levels.next(), t_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) => {
                if f != t {
                    return false;
                }
            }
            (Some(_), None) => return false,
            (None, Some(_)) => return false,
            (None, None) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(topic_matches("a/b/c", "a/b/c"));
        assert!(!topic_matches("a/b/c", "a/b/d"));
    }

    #[test]
    fn single_level_wildcard() {
        assert!(topic_matches("sensors/+/temp", "sensors/a/temp"));
        assert!(!topic_matches("sensors/+/temp", "sensors/a/b/temp"));
    }

    #[test]
    fn multi_level_wildcard_terminal_only() {
        assert!(topic_matches("sensors/#", "sensors/a/b"));
        assert!(topic_matches("sensors/#", "sensors"));
        assert!(validate_topic_filter("sensors/#/x").is_err());
    }

    #[test]
    fn dollar_topics_excluded_from_wildcards() {
        assert!(!topic_matches("+/monitor", "$SYS/monitor"));
        assert!(!topic_matches("#", "$SYS/monitor"));
        assert!(topic_matches("$SYS/#", "$SYS/monitor"));
    }

    #[test]
    fn shared_subscription_prefix_stripped() {
        assert!(topic_matches("$share/group1/a/b", "a/b"));
    }

    #[test]
    fn rejects_invalid_filters() {
        assert!(validate_topic_filter("").is_err());
        assert!(validate_topic_filter("a/b+").is_err());
        assert!(validate_topic_filter("$share//x").is_err());
    }

    #[test]
    fn rejects_invalid_publish_topics() {
        assert!(validate_topic_name("a/+").is_err());
        assert!(validate_topic_name("$SYS/foo").is_err());
        assert!(validate_topic_name("").is_err());
    }
}
