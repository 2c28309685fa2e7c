use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Selector fragments that plausibly denote a layout section. Rules whose
/// selector mentions none of these are component styling and are skipped.
pub const SECTION_MARKERS: &[&str] = &[
    "section", "hero", "banner", "band", "strip", "row", "container", "wrapper",
];

/// Background declarations recovered for one selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
    pub selector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

impl StyleRule {
    /// `background`, then `background-color`, then `background-image`.
    pub fn effective_background(&self) -> Option<&str> {
        [&self.background, &self.background_color, &self.background_image]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    fn has_background(&self) -> bool {
        self.effective_background().is_some()
    }
}

fn comment_regex() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("Invalid CSS comment regex"))
}

fn declaration_regex(property: &str) -> Regex {
    // Anchored on a declaration boundary so `background` does not match inside
    // `background-color`.
    Regex::new(&format!(
        r"(?i)(?:^|[;{{\s]){}\s*:\s*([^;}}]+)",
        regex::escape(property)
    ))
    .expect("Invalid CSS declaration regex")
}

fn background_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| declaration_regex("background"))
}

fn background_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| declaration_regex("background-color"))
}

fn background_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| declaration_regex("background-image"))
}

/// Read one declaration's value out of a declaration block.
pub(crate) fn declaration(re: &Regex, body: &str) -> Option<String> {
    re.captures(body).map(|caps| {
        caps[1]
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_string()
    })
}

/// Read the three background declarations from an inline `style` attribute
/// or a rule body.
pub(crate) fn backgrounds_in(body: &str) -> (Option<String>, Option<String>, Option<String>) {
    (
        declaration(background_regex(), body),
        declaration(background_color_regex(), body),
        declaration(background_image_regex(), body),
    )
}

/// Split CSS into `(selector, body)` pairs by walking braces.
///
/// Not a CSS grammar: `@media`/`@supports` bodies are recursed into, other
/// at-rules are skipped. Returns `None` when braces do not balance.
fn blocks(css: &str) -> Option<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut selector_start = 0usize;
    let mut body_start = 0usize;
    let mut selector = String::new();

    for (i, ch) in css.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    selector = css[selector_start..i].trim().to_string();
                    body_start = i + 1;
                }
                depth += 1;
            }
            '}' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    let body = &css[body_start..i];
                    if selector.starts_with("@media") || selector.starts_with("@supports") {
                        out.extend(blocks(body)?);
                    } else if !selector.starts_with('@') {
                        out.push((std::mem::take(&mut selector), body.to_string()));
                    }
                    selector_start = i + 1;
                }
            }
            ';' if depth == 0 => {
                // Statement at-rules such as `@import url(...);`
                selector_start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    Some(out)
}

/// Extract background rules for section-like selectors, in source order.
///
/// Malformed CSS (unbalanced braces) yields an empty list: background
/// recovery is an enrichment, never a reason to fail a transcode.
pub fn extract_rules(css: &str) -> Vec<StyleRule> {
    let css = comment_regex().replace_all(css, "");
    let Some(blocks) = blocks(&css) else {
        log::debug!("CSS braces do not balance; no background rules extracted");
        return Vec::new();
    };

    blocks
        .into_iter()
        .filter(|(selector, _)| {
            let lower = selector.to_ascii_lowercase();
            SECTION_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .map(|(selector, body)| {
            let (background, background_color, background_image) = backgrounds_in(&body);
            StyleRule {
                selector,
                background,
                background_color,
                background_image,
            }
        })
        .filter(StyleRule::has_background)
        .collect()
}

/// Background for an element, matched by id first and class second.
///
/// Within each tier rules are scanned in extraction order and the first rule
/// whose selector contains `#id` (or `.class`) wins.
pub fn resolve_background(
    element_id: Option<&str>,
    element_classes: Option<&str>,
    rules: &[StyleRule],
) -> Option<String> {
    if let Some(id) = element_id.map(str::trim).filter(|id| !id.is_empty()) {
        let needle = format!("#{id}");
        if let Some(found) = first_match(rules, |selector| selector.contains(&needle)) {
            return Some(found);
        }
    }

    let classes: Vec<String> = element_classes
        .unwrap_or_default()
        .split_whitespace()
        .map(|class| format!(".{class}"))
        .collect();
    if classes.is_empty() {
        return None;
    }
    first_match(rules, |selector| {
        classes.iter().any(|class| selector.contains(class.as_str()))
    })
}

fn first_match(rules: &[StyleRule], matches: impl Fn(&str) -> bool) -> Option<String> {
    rules
        .iter()
        .filter(|rule| matches(&rule.selector))
        .find_map(|rule| rule.effective_background().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_class_rule_background_color() {
        let rules = extract_rules(".section-bg { background-color: #222; }");
        assert_eq!(
            resolve_background(None, Some("section-bg"), &rules),
            Some("#222".to_string())
        );
    }

    #[test]
    fn test_id_rule_beats_earlier_class_rule() {
        let css = r#"
            .section-dark { background: #000; }
            #pricing.section { background-color: #0af; }
        "#;
        let rules = extract_rules(css);

        assert_eq!(
            resolve_background(Some("pricing"), Some("section-dark"), &rules),
            Some("#0af".to_string())
        );
    }

    #[test]
    fn test_first_rule_in_source_order_wins_within_tier() {
        let css = ".hero { background: red; } .hero.alt { background: blue; }";
        let rules = extract_rules(css);

        assert_eq!(
            resolve_background(None, Some("hero"), &rules),
            Some("red".to_string())
        );
    }

    #[test]
    fn test_rule_can_carry_several_background_properties() {
        let css = ".banner { background-color: #fff; background-image: url(a.png) }";
        let rules = extract_rules(css);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].background, None);
        assert_eq!(rules[0].background_color.as_deref(), Some("#fff"));
        assert_eq!(rules[0].background_image.as_deref(), Some("url(a.png)"));
    }

    #[test]
    fn test_non_structural_selectors_are_ignored() {
        let css = ".btn { background: red; } .card-title { background-color: blue; }";
        assert!(extract_rules(css).is_empty());
    }

    #[test]
    fn test_rules_without_background_are_dropped() {
        let css = ".section { padding: 20px; color: #333; }";
        assert!(extract_rules(css).is_empty());
    }

    #[test]
    fn test_media_queries_are_descended() {
        let css = "@media (min-width: 600px) { .section-a { background: #123 !important; } }";
        let rules = extract_rules(css);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ".section-a");
        assert_eq!(rules[0].background.as_deref(), Some("#123"));
    }

    #[test]
    fn test_comments_are_stripped() {
        let css = "/* .section-x { background: red; } */ .section-y { background: green; }";
        let rules = extract_rules(css);

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector, ".section-y");
    }

    #[test]
    fn test_unbalanced_braces_yield_no_rules() {
        assert!(extract_rules(".section { background: red;").is_empty());
        assert!(extract_rules("} .section { background: red; }").is_empty());
    }

    #[test]
    fn test_missing_rule_resolves_to_none() {
        let rules = extract_rules(".section-bg { background-color: #222; }");
        assert_eq!(resolve_background(Some("other"), Some("plain"), &rules), None);
        assert_eq!(resolve_background(None, None, &rules), None);
    }
}
