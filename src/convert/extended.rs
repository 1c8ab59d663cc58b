//! Extended dialect: an `infrastructure` block (starting URL, base URL,
//! variables) and a flat list of explicitly typed steps:
//!
//! ```yaml
//! - type: interact
//!   command: write
//!   target: "#email"
//!   value: ann@example.com
//!   meta: {timeout: 5000}
//! ```

use super::unified::{control_placeholder, mapping, text, UnifiedStep, UnifiedTest, Verb, VERBS};
use crate::ast::Section;
use crate::value::{Map, Value};

const MARKER: &str = "section";

/// Keys a typed step may carry.
const STEP_KEYS: [&str; 5] = ["type", "command", "target", "value", "meta"];

pub fn read(root: &Map, warnings: &mut Vec<String>) -> UnifiedTest {
    let infrastructure = mapping(root, "infrastructure");
    let mut test = UnifiedTest {
        name: text(root, "name"),
        description: text(root, "description"),
        starting_url: text(&infrastructure, "starting_url").or_else(|| text(root, "starting_url")),
        base_url: text(&infrastructure, "base_url"),
        variables: mapping(&infrastructure, "variables"),
        config: mapping(root, "config"),
        ..UnifiedTest::default()
    };
    let items = root.get("steps").and_then(Value::as_seq).unwrap_or(&[]);
    let mut section = Section::Main;
    for (i, item) in items.iter().enumerate() {
        let path = format!("steps[{}]", i);
        let Some(map) = item.as_map() else {
            warnings.push(format!("{}: step is not a mapping; kept as a comment", path));
            test.section_mut(section).push(UnifiedStep::comment(item.to_text()));
            continue;
        };
        let kind = text(map, "type").unwrap_or_default();
        if kind == MARKER {
            match text(map, "target").as_deref().and_then(Section::from_label) {
                Some(next) => section = next,
                None => warnings.push(format!("{}: section marker without a known target", path)),
            }
            continue;
        }
        let command = text(map, "command");
        match lookup(&kind, command.as_deref()) {
            Some(verb) => {
                let dropped: Vec<&str> = map
                    .keys()
                    .map(String::as_str)
                    .filter(|k| !STEP_KEYS.contains(k))
                    .collect();
                if !dropped.is_empty() {
                    warnings.push(format!(
                        "{}: unsupported key(s) {} dropped",
                        path,
                        dropped.join(", ")
                    ));
                }
                if map.get("meta").is_some_and(|m| m.as_map().is_none() && !m.is_null()) {
                    warnings.push(format!("{}: 'meta' is not a mapping; dropped", path));
                }
                let mut step = UnifiedStep::new(verb);
                step.target = text(map, "target");
                step.value = map.get("value").cloned();
                step.options = mapping(map, "meta");
                test.section_mut(section).push(step);
            }
            None => {
                warnings.push(format!(
                    "{}: unknown step type '{}'{}; kept as a comment",
                    path,
                    kind,
                    command.map(|c| format!(" with command '{}'", c)).unwrap_or_default()
                ));
                test.section_mut(section).push(UnifiedStep::comment(item.to_text()));
            }
        }
    }
    test
}

/// Resolves `type` + `command`. Waits match on type alone, and a bare
/// `type: navigate` means navigation.
fn lookup(kind: &str, command: Option<&str>) -> Option<&'static Verb> {
    if kind == "wait" {
        return Verb::by_word("wait");
    }
    match command {
        Some(command) => VERBS
            .iter()
            .find(|v| !v.is_control() && v.category == kind && v.command == command),
        None => Verb::by_word(kind).filter(|v| !v.is_control()),
    }
}

pub fn write(test: &UnifiedTest, warnings: &mut Vec<String>) -> Value {
    let mut root = Map::new();
    if let Some(name) = &test.name {
        root.insert("name".into(), name.as_str().into());
    }
    if let Some(desc) = &test.description {
        root.insert("description".into(), desc.as_str().into());
    }

    let mut infrastructure = Map::new();
    if let Some(url) = &test.starting_url {
        infrastructure.insert("starting_url".into(), url.as_str().into());
    }
    if let Some(base) = &test.base_url {
        infrastructure.insert("base_url".into(), base.as_str().into());
    }
    if !test.variables.is_empty() {
        infrastructure.insert("variables".into(), test.variables.clone().into());
    }
    root.insert("infrastructure".into(), infrastructure.into());
    if !test.config.is_empty() {
        root.insert("config".into(), test.config.clone().into());
    }

    let markers = test.needs_markers();
    let mut items = Vec::new();
    for (section, steps) in test.sections() {
        if markers && !steps.is_empty() {
            let mut marker = Map::new();
            marker.insert("type".into(), MARKER.into());
            marker.insert("target".into(), section.label().into());
            items.push(Value::Map(marker));
        }
        for (i, step) in steps.iter().enumerate() {
            items.push(write_step(step, &format!("{}[{}]", section.key(), i), warnings));
        }
    }
    root.insert("steps".into(), items.into());
    Value::Map(root)
}

fn write_step(step: &UnifiedStep, path: &str, warnings: &mut Vec<String>) -> Value {
    let verb = step.verb;
    if verb.is_control() {
        warnings.push(format!(
            "{}: '{}' has no extended form; replaced with a comment",
            path, verb.terse
        ));
        return write_step(&UnifiedStep::comment(control_placeholder(step)), path, warnings);
    }
    let command = match verb.word {
        "wait" if step.target.is_some() => "element",
        "wait" => "time",
        _ => verb.command,
    };
    let mut map = Map::new();
    map.insert("type".into(), verb.category.into());
    map.insert("command".into(), command.into());
    if let Some(target) = &step.target {
        map.insert("target".into(), target.as_str().into());
    }
    if let Some(value) = &step.value {
        map.insert("value".into(), value.clone());
    }
    if !step.options.is_empty() {
        map.insert("meta".into(), step.options.clone().into());
    }
    Value::Map(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn root(yaml: &str) -> Map {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        Normalizer::preserving_null()
            .normalize(&raw)
            .as_map()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_infrastructure_and_steps() {
        let doc = root(
            "name: Checkout\ninfrastructure:\n  starting_url: /cart\n  variables: {qty: 2}\nsteps:\n  - type: interact\n    command: click\n    target: Pay\n    meta: {pos: center}\n  - type: wait\n    command: time\n    value: 500\n  - type: assert\n    command: greater-than\n    target: .total\n    value: 10\n",
        );
        let mut warnings = Vec::new();
        let test = read(&doc, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(test.starting_url.as_deref(), Some("/cart"));
        assert_eq!(test.steps[0].kind(), "click");
        assert_eq!(test.steps[1].value, Some(Value::from(500u64)));
        assert_eq!(test.steps[2].kind(), "assert_greater_than");

        let mut warnings = Vec::new();
        assert_eq!(write(&test, &mut warnings), Value::Map(doc));
    }

    #[test]
    fn test_unsupported_step_keys_warn() {
        let doc = root(
            "name: T\nsteps:\n  - type: interact\n    command: click\n    target: Go\n    retries: 3\n    label: main\n  - type: assert\n    command: exists\n    target: Done\n    meta: fast\n",
        );
        let mut warnings = Vec::new();
        let test = read(&doc, &mut warnings);
        assert_eq!(
            warnings,
            vec![
                "steps[0]: unsupported key(s) retries, label dropped".to_string(),
                "steps[1]: 'meta' is not a mapping; dropped".to_string(),
            ]
        );
        assert_eq!(test.steps[0].target.as_deref(), Some("Go"));
        assert!(test.steps[1].options.is_empty());
    }

    #[test]
    fn test_unknown_types_warn() {
        let doc = root("name: T\nsteps: [{type: teleport, target: mars}]");
        let mut warnings = Vec::new();
        let test = read(&doc, &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("teleport"));
        assert_eq!(test.steps[0].kind(), "comment");
    }
}
