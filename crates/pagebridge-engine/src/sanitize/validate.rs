//! Per-attribute allow-lists. Each function returns the normalized value or
//! `None` when the value may not reach generated markup.

use std::sync::OnceLock;

use regex::Regex;

const MAX_URL_LEN: usize = 2048;

const NAMED_COLORS: &[&str] = &[
    "transparent", "black", "white", "red", "green", "blue", "yellow", "orange", "purple",
    "pink", "gray", "grey", "silver", "navy", "teal", "maroon", "olive", "lime", "aqua", "cyan",
    "magenta", "fuchsia", "brown", "gold", "beige", "ivory", "indigo", "violet", "coral",
    "salmon", "crimson", "khaki", "lavender", "tomato", "skyblue", "whitesmoke",
];

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
            .expect("Invalid hex color regex")
    })
}

fn functional_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?i:rgba?|hsla?)\(\s*-?\d{1,3}(?:\.\d+)?(?:deg|%)?(?:\s*[,/]?\s*-?\d{1,3}(?:\.\d+)?%?){2,3}\s*\)$",
        )
        .expect("Invalid functional color regex")
    })
}

fn length_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:0|auto|\d+(?:\.\d+)?(?:px|em|rem|%|vh|vw)?)$")
            .expect("Invalid length regex")
    })
}

fn height_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d+(?:\.\d+)?(?:px|em|rem|vh)?$").expect("Invalid height regex")
    })
}

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?i:url)\(\s*['"]?([^'")]*)['"]?\s*\)$"#).expect("Invalid css url regex")
    })
}

pub fn color(value: &str) -> Option<String> {
    let value = value.trim();
    let named = NAMED_COLORS.contains(&value.to_ascii_lowercase().as_str());
    if named || hex_color_regex().is_match(value) || functional_color_regex().is_match(value) {
        Some(value.to_string())
    } else {
        None
    }
}

/// One to four space-separated length tokens (CSS box shorthand).
pub fn lengths(value: &str, allow_negative: bool) -> Option<String> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() > 4 {
        return None;
    }
    let valid = tokens.iter().all(|token| {
        let unsigned = match token.strip_prefix('-') {
            Some(rest) if allow_negative => rest,
            Some(_) => return false,
            None => *token,
        };
        length_regex().is_match(unsigned)
    });
    valid.then(|| tokens.join(" "))
}

pub fn height(value: &str) -> Option<String> {
    let value = value.trim();
    height_regex().is_match(value).then(|| value.to_string())
}

pub fn keyword(value: &str, allowed: &[&str]) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    allowed.contains(&value.as_str()).then_some(value)
}

/// Links and media sources: web, mail and phone links, site-relative paths
/// and in-page anchors. Anything able to break out of an attribute or
/// execute script is refused.
pub fn url(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.len() > MAX_URL_LEN {
        return None;
    }
    let breaks_out = value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "\"'<>[]()\\`".contains(c));
    if breaks_out {
        return None;
    }

    let lower = value.to_ascii_lowercase();
    let has_scheme = match (lower.find(':'), lower.find(&['/', '?', '#'][..])) {
        (Some(colon), Some(first_delim)) => colon < first_delim,
        (Some(_), None) => true,
        (None, _) => false,
    };
    if !has_scheme {
        return Some(value.to_string());
    }
    let allowed_scheme = ["http://", "https://", "mailto:", "tel:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme));
    allowed_scheme.then(|| value.to_string())
}

/// `url(...)` wrappers are unwrapped, then the URL itself must pass [`url`].
pub fn background_image(value: &str) -> Option<String> {
    let value = value.trim();
    let inner = css_url_regex()
        .captures(value)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| value.to_string());
    url(&inner)
}

pub fn heading_level(value: &str) -> Option<String> {
    let value = value.trim().to_ascii_lowercase();
    let digits = value.strip_prefix('h').unwrap_or(&value);
    match digits.parse::<f64>() {
        Ok(level) if level.fract() == 0.0 && (1.0..=6.0).contains(&level) => {
            Some(format!("{}", level as u8))
        }
        _ => None,
    }
}
