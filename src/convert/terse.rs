//! Terse dialect: `test`, `nav`, `data`, `setup`/`do`/`teardown` with
//! single-key symbol actions.

use super::unified::{text, mapping, UnifiedStep, UnifiedTest, Verb, CLICK_OPTIONS};
use crate::ast::Section;
use crate::value::{single, Map, Value};

pub fn read(root: &Map, warnings: &mut Vec<String>) -> UnifiedTest {
    let mut test = UnifiedTest {
        name: text(root, "test"),
        description: text(root, "desc"),
        starting_url: text(root, "nav"),
        base_url: text(root, "base"),
        variables: mapping(root, "data"),
        config: mapping(root, "config"),
        ..UnifiedTest::default()
    };
    for section in Section::ALL {
        let items = root.get(section.key()).and_then(Value::as_seq).unwrap_or(&[]);
        let steps = items
            .iter()
            .enumerate()
            .map(|(i, item)| read_step(item, &format!("{}[{}]", section.key(), i), warnings))
            .collect();
        *test.section_mut(section) = steps;
    }
    test
}

fn read_step(item: &Value, path: &str, warnings: &mut Vec<String>) -> UnifiedStep {
    let map = match item {
        Value::Map(m) => m,
        other => {
            warnings.push(format!(
                "{}: action is a {}, not a mapping; kept as a comment",
                path,
                other.type_name()
            ));
            return UnifiedStep::comment(other.to_text());
        }
    };
    let ops: Vec<&'static Verb> = map.keys().filter_map(|k| Verb::by_terse(k)).collect();
    let verb = match ops.as_slice() {
        [verb] => *verb,
        _ => {
            warnings.push(format!(
                "{}: expected one operation, found {}; kept as a comment",
                path,
                ops.len()
            ));
            return UnifiedStep::comment(item.to_text());
        }
    };
    let payload = map.get(verb.terse).unwrap_or(&Value::Null);
    let mut step = UnifiedStep::from_payload(verb, payload);
    for (key, value) in map {
        if key != verb.terse {
            step.options.insert(key.clone(), value.clone());
        }
    }
    step
}

pub fn write(test: &UnifiedTest) -> Value {
    let mut root = Map::new();
    if let Some(name) = &test.name {
        root.insert("test".into(), name.as_str().into());
    }
    if let Some(desc) = &test.description {
        root.insert("desc".into(), desc.as_str().into());
    }
    if let Some(nav) = &test.starting_url {
        root.insert("nav".into(), nav.as_str().into());
    }
    if let Some(base) = &test.base_url {
        root.insert("base".into(), base.as_str().into());
    }
    if !test.config.is_empty() {
        root.insert("config".into(), test.config.clone().into());
    }
    if !test.variables.is_empty() {
        root.insert("data".into(), test.variables.clone().into());
    }
    for (section, steps) in test.sections() {
        if steps.is_empty() && section != Section::Main {
            continue;
        }
        let items: Vec<Value> = steps.iter().map(write_step).collect();
        root.insert(section.key().into(), items.into());
    }
    Value::Map(root)
}

fn write_step(step: &UnifiedStep) -> Value {
    let verb = step.verb;
    let mut companions = step.options.clone();
    let payload = match &step.target {
        Some(target) if verb.is_click() => {
            let mut inner = Map::new();
            for key in CLICK_OPTIONS {
                if let Some(v) = companions.shift_remove(key) {
                    inner.insert(key.into(), v);
                }
            }
            if inner.is_empty() {
                target.as_str().into()
            } else {
                single(target.clone(), inner)
            }
        }
        Some(target) if verb.field.is_some() => {
            single(target.clone(), step.value.clone().unwrap_or_default())
        }
        Some(target) => target.as_str().into(),
        None => step.value.clone().unwrap_or_default(),
    };
    let mut map = Map::new();
    map.insert(verb.terse.into(), payload);
    map.extend(companions);
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
    fn test_read_then_write_is_stable() {
        let doc = root(
            "test: Login\nnav: /login\ndata: {user: ann}\nsetup: [{js: 'localStorage.clear()'}]\ndo:\n  - t: {'#email': '{{user}}'}\n  - c: {'#go': {pos: top-left}}\n  - wait: 500\n  - gt: {.count: 3}\n",
        );
        let mut warnings = Vec::new();
        let test = read(&doc, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(test.setup.len(), 1);
        assert_eq!(test.steps[1].options.get("pos"), Some(&Value::from("top-left")));
        assert_eq!(write(&test), Value::Map(doc));
    }

    #[test]
    fn test_malformed_actions_become_comments() {
        let doc = root("test: T\ndo: [{c: A, h: B}, plain]");
        let mut warnings = Vec::new();
        let test = read(&doc, &mut warnings);
        assert_eq!(warnings.len(), 2);
        assert!(test.steps.iter().all(|s| s.kind() == "comment"));
    }
}
