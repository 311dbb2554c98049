use crate::error::RenamerError;
use serde::Deserialize;
use serde_json::Value;

/// The part of a stash plugin hook invocation the renamer cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub scene_id: String,
    pub hook_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HookInput {
    #[serde(default)]
    args: Option<HookArgs>,
}

#[derive(Debug, Deserialize)]
struct HookArgs {
    #[serde(rename = "hookContext", default)]
    hook_context: Option<RawHookContext>,
}

#[derive(Debug, Deserialize)]
struct RawHookContext {
    #[serde(default)]
    id: Option<Value>,
    #[serde(rename = "type", default)]
    hook_type: Option<String>,
}

/// Reads `args.hookContext.id` from the JSON stash writes to the plugin's stdin.
pub fn parse_hook_payload(raw: &str) -> Result<HookContext, RenamerError> {
    if raw.trim().is_empty() {
        return Err(RenamerError::PayloadInvalid("payload is empty".to_string()));
    }

    let input: HookInput = serde_json::from_str(raw)
        .map_err(|err| RenamerError::PayloadInvalid(format!("not valid JSON: {err}")))?;
    let context = input
        .args
        .and_then(|args| args.hook_context)
        .ok_or_else(|| RenamerError::PayloadInvalid("no hook context provided".to_string()))?;

    let scene_id = match context.id {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(RenamerError::PayloadInvalid(
                "no scene id in hook context".to_string(),
            ))
        }
    };

    Ok(HookContext {
        scene_id,
        hook_type: context.hook_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_numeric_and_string_ids() {
        let numeric = parse_hook_payload(
            r#"{"args": {"hookContext": {"id": 17, "type": "Scene.Update.Post"}}}"#,
        )
        .expect("payload must parse");
        assert_eq!(numeric.scene_id, "17");
        assert_eq!(numeric.hook_type.as_deref(), Some("Scene.Update.Post"));

        let string = parse_hook_payload(r#"{"args": {"hookContext": {"id": "18"}}}"#)
            .expect("payload must parse");
        assert_eq!(string.scene_id, "18");
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for raw in [
            "",
            "not json",
            r#"{"args": {}}"#,
            r#"{"args": {"hookContext": {}}}"#,
            r#"{"args": {"hookContext": {"id": ""}}}"#,
            r#"{"args": {"hookContext": {"id": null}}}"#,
        ] {
            let err = parse_hook_payload(raw).expect_err("must fail");
            assert!(matches!(err, RenamerError::PayloadInvalid(_)), "{raw}");
            assert!(err.is_fatal());
        }
    }
}
