//! Pipeline queue parameters
//!
//! Serializes the `name=value` template parameters passed to
//! `az pipelines run --parameters`.
//!
//! A value is emitted bare only when it is non-empty and every character is
//! in the allow-list `[A-Za-z0-9._/:-]`. Any other value is wrapped in double
//! quotes, with `\`, `"`, `$` and `` ` `` escaped by a backslash.
//!
//! `az` is spawned without a shell, so nothing strips the quotes or the
//! escapes: they are part of the value the pipeline template receives, and
//! templates reading such a value must unquote it themselves.

use migr8_core::domain::manifest::{AppKind, ApplicationSpec};

/// Whether a character may appear in an unquoted value
fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | ':' | '-')
}

/// Quotes a value unless it consists only of allow-listed characters
pub fn quote_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_plain) {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Formats one `name=value` parameter
pub fn parameter(name: &str, value: &str) -> String {
    format!("{}={}", name, quote_value(value))
}

/// Builds the queue parameters of an application
///
/// # Arguments
/// * `app` - The application whose pipeline is queued
/// * `agent_pool` - Agent pool the deployment agent registered into
/// * `subscription_id` - Azure subscription selected at login
pub fn pipeline_parameters(
    app: &ApplicationSpec,
    agent_pool: &str,
    subscription_id: &str,
) -> Vec<String> {
    let mut parameters = vec![
        parameter("azureSubscription", subscription_id),
        parameter("appName", &app.name),
        parameter("agentPool", agent_pool),
        parameter("agent", &app.agent_container_name()),
    ];

    match app.kind {
        AppKind::Function => {
            parameters.push(parameter("resourceGroup", &app.resource_group));
        }
        AppKind::WebApp => {
            parameters.extend(
                app.settings
                    .iter()
                    .map(|setting| parameter(&setting.name, &setting.value)),
            );
        }
    }

    parameters
}
