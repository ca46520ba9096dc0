//! Prompt templates, one per [`CommandKind`](crate::CommandKind).
//!
//! Every template ends with the client-context clauses. Each clause appears
//! only when its field is present; an absent field contributes nothing.
//! Clauses start with a space and end with a period so they concatenate
//! without separators.

use nexus_core::{ClientContext, DecodedCommand, Location};

// ── Templates ─────────────────────────────────────────────────────────────

pub fn contextual_search(cmd: &DecodedCommand) -> String {
    let intent = cmd.param("intent").unwrap_or_else(|| "general query".into());
    let mut prompt = format!("Perform a smart search for: \"{intent}\".");
    if let Some(context) = cmd.param("context") {
        prompt.push_str(&format!(" Context: {context}."));
    }
    push_context(&mut prompt, &cmd.client_context);
    prompt.push_str(" Provide a concise, relevant answer or a list of search suggestions.");
    prompt
}

/// The location assistant always says something about location, including
/// that it is unknown. The sentence continues through the context clauses,
/// hence the lowercase `suggest`.
pub fn location_assistant(cmd: &DecodedCommand) -> String {
    let intent = cmd.param("intent").unwrap_or_else(|| "find places".into());
    let ctx = &cmd.client_context;
    let mut prompt = format!(
        "Act as a helpful location assistant. Based on the intent \"{intent}\" and"
    );
    match &ctx.location {
        Some(Location::Coordinates {
            latitude,
            longitude,
        }) => {
            prompt.push_str(&format!(" User is at Latitude: {latitude}, Longitude: {longitude}."));
        }
        Some(Location::Unavailable { error }) => {
            prompt.push_str(&format!(" User location not available: {error}."));
        }
        None => prompt.push_str(" User location unknown."),
    }
    push_device_time_locale(&mut prompt, ctx);
    prompt.push_str(" suggest relevant places, directions, or information.");
    prompt
}

/// A missing `productId` renders as `undefined`; the dispatcher decides
/// whether that is allowed. Present values render as-is, `0` included.
pub fn product_info(cmd: &DecodedCommand) -> String {
    let product_id = cmd.param_text("productId").unwrap_or_else(|| "undefined".into());
    let category = cmd.param("category").unwrap_or_else(|| "unknown".into());
    let mut prompt = format!(
        "Provide detailed information for product ID \"{product_id}\" from the \"{category}\" category."
    );
    push_context(&mut prompt, &cmd.client_context);
    prompt.push_str(" Focus on key features, specifications, and benefits.");
    prompt
}

pub fn customer_support(cmd: &DecodedCommand) -> String {
    let topic = cmd.param("topic").unwrap_or_else(|| "general inquiry".into());
    let user_name = cmd.param("userName").unwrap_or_else(|| "Customer".into());
    let mut prompt =
        format!("As a customer support AI, respond to {user_name}'s inquiry about \"{topic}\".");
    push_context(&mut prompt, &cmd.client_context);
    prompt.push_str(" Provide clear, helpful guidance or direct them to relevant resources.");
    prompt
}

// ── Context clauses ───────────────────────────────────────────────────────

/// Append every present context clause: location, device, time, locale.
pub fn push_context(prompt: &mut String, ctx: &ClientContext) {
    match &ctx.location {
        Some(Location::Coordinates {
            latitude,
            longitude,
        }) => {
            prompt.push_str(&format!(
                " User's approximate location: Latitude {latitude}, Longitude {longitude}."
            ));
        }
        Some(Location::Unavailable { error }) => {
            prompt.push_str(&format!(" User location not available: {error}."));
        }
        None => {}
    }
    push_device_time_locale(prompt, ctx);
}

fn push_device_time_locale(prompt: &mut String, ctx: &ClientContext) {
    if let Some(device) = &ctx.device {
        prompt.push_str(&format!(" Device: {device}."));
    }
    if let Some(timestamp) = &ctx.timestamp {
        prompt.push_str(&format!(" Current time: {timestamp}."));
    }
    if let Some(locale) = &ctx.locale {
        prompt.push_str(&format!(" User's locale: {locale}."));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn suffix(ctx: ClientContext) -> String {
        let mut out = String::new();
        push_context(&mut out, &ctx);
        out
    }

    #[test]
    fn empty_context_adds_nothing() {
        assert_eq!(suffix(ClientContext::default()), "");
    }

    #[test]
    fn each_field_adds_only_its_clause() {
        assert_eq!(
            suffix(ClientContext {
                timestamp: Some("09:30".into()),
                ..ClientContext::default()
            }),
            " Current time: 09:30."
        );
        assert_eq!(
            suffix(ClientContext {
                locale: Some("ja-JP".into()),
                ..ClientContext::default()
            }),
            " User's locale: ja-JP."
        );
        assert_eq!(
            suffix(ClientContext {
                device: Some(json!({"ua": "Safari"})),
                ..ClientContext::default()
            }),
            r#" Device: {"ua":"Safari"}."#
        );
    }

    #[test]
    fn location_error_is_reported_in_common_suffix() {
        assert_eq!(
            suffix(ClientContext {
                location: Some(Location::Unavailable {
                    error: "timeout".into()
                }),
                ..ClientContext::default()
            }),
            " User location not available: timeout."
        );
    }

    #[test]
    fn non_object_device_renders_as_json() {
        assert_eq!(
            suffix(ClientContext {
                device: Some(json!("kiosk-7")),
                ..ClientContext::default()
            }),
            r#" Device: "kiosk-7"."#
        );
    }
}
