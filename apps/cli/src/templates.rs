//! Note-model templates provisioned in the remote store.

use serde_json::{json, Value};

use markdeck_core::card::{CODE_MODEL_SUFFIX, MODEL_PREFIX, SOURCE_MODEL_SUFFIX};

pub const HIGHLIGHT_INIT_NAME: &str = "_markdeck-highlight-init.js";
pub const HIGHLIGHT_CSS_NAME: &str = "_markdeck-highlight.css";

const STYLE: &str = "\
.card {
  font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
  font-size: 18px;
  text-align: left;
  color: #1f2328;
  background-color: #ffffff;
  padding: 16px;
}
.card img { max-width: 100%; }
code, pre {
  font-family: 'JetBrains Mono', Menlo, monospace;
  font-size: 15px;
  background-color: #f6f8fa;
  border-radius: 4px;
  padding: 2px 4px;
}
pre { padding: 10px; overflow-x: auto; }
.question { font-weight: 600; margin-bottom: 8px; }
.source { margin-top: 12px; font-size: 13px; opacity: 0.7; }
.nightMode .card { color: #d4d4d4; background-color: #2f2f31; }
.nightMode code, .nightMode pre { background-color: #3a3a3c; }
";

const SOURCE_FIELD: &str = "<div class=\"source\">{{Source}}</div>";

const CODE_SCRIPT: &str = concat!(
    "<script src=\"_markdeck-highlight.js\"></script>\n",
    "<link rel=\"stylesheet\" href=\"_markdeck-highlight.css\">\n",
    "<script src=\"_markdeck-highlight-init.js\"></script>",
);

/// Minimal init shim stored as media alongside a highlight.js bundle the
/// user may swap for their own.
const HIGHLIGHT_INIT: &str = "\
if (typeof hljs !== 'undefined') {
  document.querySelectorAll('pre code').forEach(function (block) {
    hljs.highlightElement(block);
  });
}
";

const HIGHLIGHT_CSS: &str = "\
pre code.hljs { display: block; padding: 10px; }
.hljs-keyword { color: #cf222e; }
.hljs-string { color: #0a3069; }
.hljs-comment { color: #6e7781; font-style: italic; }
.hljs-number { color: #0550ae; }
";

struct ModelSpec {
    base: &'static str,
    fields: &'static [&'static str],
    is_cloze: bool,
    templates: &'static [(&'static str, &'static str, &'static str)],
}

const MODELS: [ModelSpec; 4] = [
    ModelSpec {
        base: "basic",
        fields: &["Front", "Back"],
        is_cloze: false,
        templates: &[(
            "Front / Back",
            "<div class=\"question\">{{Front}}</div>",
            "{{FrontSide}}\n<hr id=\"answer\">\n{{Back}}",
        )],
    },
    ModelSpec {
        base: "basic-reversed",
        fields: &["Front", "Back"],
        is_cloze: false,
        templates: &[
            (
                "Front / Back",
                "<div class=\"question\">{{Front}}</div>",
                "{{FrontSide}}\n<hr id=\"answer\">\n{{Back}}",
            ),
            (
                "Back / Front",
                "<div class=\"question\">{{Back}}</div>",
                "{{FrontSide}}\n<hr id=\"answer\">\n{{Front}}",
            ),
        ],
    },
    ModelSpec {
        base: "spaced",
        fields: &["Prompt"],
        is_cloze: false,
        templates: &[(
            "Spaced",
            "<div class=\"question\">{{Prompt}}</div>",
            "{{FrontSide}}",
        )],
    },
    ModelSpec {
        base: "cloze",
        fields: &["Text", "Extra"],
        is_cloze: true,
        templates: &[("Cloze", "{{cloze:Text}}", "{{cloze:Text}}\n<br>\n{{Extra}}")],
    },
];

/// `createModel` actions for the four card shapes, suffixed for the source
/// and code variants.
pub fn model_actions(source_support: bool, code_highlight: bool) -> Vec<Value> {
    let source_suffix = if source_support { SOURCE_MODEL_SUFFIX } else { "" };
    let code_suffix = if code_highlight { CODE_MODEL_SUFFIX } else { "" };
    let code_script = if code_highlight { CODE_SCRIPT } else { "" };

    MODELS
        .iter()
        .map(|spec| {
            let mut fields: Vec<&str> = spec.fields.to_vec();
            if source_support {
                fields.push("Source");
            }
            let templates: Vec<Value> = spec
                .templates
                .iter()
                .map(|(name, front, back)| {
                    let mut back = back.to_string();
                    if source_support {
                        back.push('\n');
                        back.push_str(SOURCE_FIELD);
                    }
                    let front = if code_script.is_empty() {
                        (*front).to_string()
                    } else {
                        format!("{front}\n{code_script}")
                    };
                    json!({ "Name": name, "Front": front, "Back": back })
                })
                .collect();

            json!({
                "action": "createModel",
                "params": {
                    "modelName": format!("{MODEL_PREFIX}-{}{source_suffix}{code_suffix}", spec.base),
                    "inOrderFields": fields,
                    "css": STYLE,
                    "isCloze": spec.is_cloze,
                    "cardTemplates": templates,
                },
            })
        })
        .collect()
}

/// The code-highlight support media, as (filename, base64 payload) pairs.
/// The highlight.js bundle itself is referenced by name only; the init shim
/// no-ops until the user drops a bundle in as `_markdeck-highlight.js`.
pub fn highlight_assets() -> Vec<(String, String)> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    [
        (HIGHLIGHT_INIT_NAME, HIGHLIGHT_INIT),
        (HIGHLIGHT_CSS_NAME, HIGHLIGHT_CSS),
    ]
    .into_iter()
    .map(|(name, body)| (name.to_string(), STANDARD.encode(body)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_plain_models() {
        let actions = model_actions(false, false);
        assert_eq!(actions.len(), 4);
        let names: Vec<&str> = actions
            .iter()
            .map(|a| a["params"]["modelName"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "Markdeck-basic",
                "Markdeck-basic-reversed",
                "Markdeck-spaced",
                "Markdeck-cloze"
            ]
        );
    }

    #[test]
    fn source_variant_adds_field_and_suffix() {
        let actions = model_actions(true, false);
        assert_eq!(
            actions[0]["params"]["modelName"].as_str().unwrap(),
            "Markdeck-basic-source"
        );
        let fields = actions[0]["params"]["inOrderFields"].as_array().unwrap();
        assert_eq!(fields.last().unwrap(), "Source");
    }

    #[test]
    fn code_variant_injects_script() {
        let actions = model_actions(false, true);
        assert_eq!(
            actions[3]["params"]["modelName"].as_str().unwrap(),
            "Markdeck-cloze-code"
        );
        let front = actions[0]["params"]["cardTemplates"][0]["Front"]
            .as_str()
            .unwrap();
        assert!(front.contains(HIGHLIGHT_INIT_NAME));
    }

    #[test]
    fn reversed_model_has_two_templates() {
        let actions = model_actions(false, false);
        let templates = actions[1]["params"]["cardTemplates"].as_array().unwrap();
        assert_eq!(templates.len(), 2);
    }

    #[test]
    fn cloze_model_is_cloze() {
        let actions = model_actions(false, false);
        assert_eq!(actions[3]["params"]["isCloze"], true);
    }
}
