//! Just enough XML-RPC for `wp.getPost`.

use std::sync::OnceLock;

use regex::Regex;

use crate::source::TransportError;

fn post_content_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)<name>\s*post_content\s*</name>\s*<value>\s*(?:<string>(.*?)</string>|([^<]*))\s*</value>",
        )
        .expect("Invalid post_content regex")
    })
}

fn fault_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<name>\s*faultString\s*</name>\s*<value>\s*(?:<string>)?(.*?)(?:</string>)?\s*</value>")
            .expect("Invalid fault regex")
    })
}

fn string_param(value: &str) -> String {
    format!(
        "<param><value><string>{}</string></value></param>",
        html_escape::encode_text(value)
    )
}

/// Request body asking for a single post's unrendered content.
pub(super) fn get_post_call(username: &str, password: &str, post_id: u64) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n<methodCall><methodName>wp.getPost</methodName><params>\
         <param><value><int>1</int></value></param>\
         {}{}\
         <param><value><int>{post_id}</int></value></param>\
         <param><value><array><data><value><string>post_content</string></value></data></array></value></param>\
         </params></methodCall>",
        string_param(username),
        string_param(password),
    )
}

/// Pull `post_content` out of a `wp.getPost` response.
pub(super) fn post_content(body: &str) -> Result<String, TransportError> {
    if body.contains("<fault>") {
        let reason = fault_regex()
            .captures(body)
            .map(|caps| html_escape::decode_html_entities(&caps[1]).into_owned())
            .unwrap_or_else(|| "unknown fault".to_string());
        return Err(TransportError::Malformed(format!("XML-RPC fault: {reason}")));
    }
    let caps = post_content_regex()
        .captures(body)
        .ok_or_else(|| TransportError::Malformed("XML-RPC response has no post_content".to_string()))?;
    let raw = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default();
    Ok(html_escape::decode_html_entities(raw).into_owned())
}
