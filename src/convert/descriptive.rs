//! Descriptive dialect: `name`, `starting_url`, `variables` and a flat
//! `steps` list with full-word keys. Setup and teardown are delimited by
//! `- section: <label>` markers.

use super::unified::{control_placeholder, mapping, text, UnifiedStep, UnifiedTest, Verb, CLICK_OPTIONS};
use crate::ast::Section;
use crate::value::{single, Map, Value};

pub const MARKER: &str = "section";
const SELECTOR: &str = "selector";

pub fn read(root: &Map, warnings: &mut Vec<String>) -> UnifiedTest {
    let mut test = UnifiedTest {
        name: text(root, "name"),
        description: text(root, "description"),
        starting_url: text(root, "starting_url"),
        base_url: text(root, "base_url"),
        variables: mapping(root, "variables"),
        config: mapping(root, "config"),
        ..UnifiedTest::default()
    };
    let items = root.get("steps").and_then(Value::as_seq).unwrap_or(&[]);
    let mut section = Section::Main;
    for (i, item) in items.iter().enumerate() {
        let path = format!("steps[{}]", i);
        if let Some(label) = item.get(MARKER) {
            match label.as_str().and_then(Section::from_label) {
                Some(next) => section = next,
                None => warnings.push(format!("{}: unknown section '{}'", path, label)),
            }
            continue;
        }
        let step = read_step(item, &path, warnings);
        test.section_mut(section).push(step);
    }
    test
}

fn read_step(item: &Value, path: &str, warnings: &mut Vec<String>) -> UnifiedStep {
    let Some(map) = item.as_map() else {
        warnings.push(format!("{}: step is not a mapping; kept as a comment", path));
        return UnifiedStep::comment(item.to_text());
    };
    let verbs: Vec<&'static Verb> = map
        .keys()
        .filter_map(|k| Verb::by_word(k))
        .filter(|v| !v.is_control())
        .collect();
    let verb = match verbs.as_slice() {
        [verb] => *verb,
        _ => {
            warnings.push(format!(
                "{}: expected one step kind, found {}; kept as a comment",
                path,
                verbs.len()
            ));
            return UnifiedStep::comment(item.to_text());
        }
    };
    let payload = map.get(verb.word).unwrap_or(&Value::Null);
    let mut step = match payload.as_map().filter(|m| m.contains_key(SELECTOR)) {
        Some(fields) => structured(verb, fields),
        None => UnifiedStep::from_payload(verb, payload),
    };
    for (key, value) in map {
        if key != verb.word {
            step.options.insert(key.clone(), value.clone());
        }
    }
    step
}

fn structured(verb: &'static Verb, fields: &Map) -> UnifiedStep {
    let mut step = UnifiedStep::new(verb);
    step.target = fields.get(SELECTOR).and_then(Value::scalar_text);
    for (key, value) in fields {
        match key.as_str() {
            SELECTOR => {}
            k if Some(k) == verb.field => step.value = Some(value.clone()),
            _ => {
                step.options.insert(key.clone(), value.clone());
            }
        }
    }
    step
}

pub fn write(test: &UnifiedTest, warnings: &mut Vec<String>) -> Value {
    let mut root = Map::new();
    if let Some(name) = &test.name {
        root.insert("name".into(), name.as_str().into());
    }
    if let Some(desc) = &test.description {
        root.insert("description".into(), desc.as_str().into());
    }
    if let Some(url) = &test.starting_url {
        root.insert("starting_url".into(), url.as_str().into());
    }
    if let Some(base) = &test.base_url {
        root.insert("base_url".into(), base.as_str().into());
    }
    if !test.config.is_empty() {
        root.insert("config".into(), test.config.clone().into());
    }
    if !test.variables.is_empty() {
        root.insert("variables".into(), test.variables.clone().into());
    }

    let markers = test.needs_markers();
    let mut items = Vec::new();
    for (section, steps) in test.sections() {
        if markers && !steps.is_empty() {
            items.push(single(MARKER, section.label()));
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
            "{}: '{}' has no descriptive form; replaced with a comment",
            path, verb.terse
        ));
        return write_step(&UnifiedStep::comment(control_placeholder(step)), path, warnings);
    }

    let mut companions = step.options.clone();
    let payload = match &step.target {
        Some(target) if verb.field.is_some() || verb.is_click() => {
            let mut fields = Map::new();
            fields.insert(SELECTOR.into(), target.as_str().into());
            if let (Some(field), Some(value)) = (verb.field, &step.value) {
                fields.insert(field.into(), value.clone());
            }
            if verb.is_click() {
                for key in CLICK_OPTIONS {
                    if let Some(v) = companions.shift_remove(key) {
                        fields.insert(key.into(), v);
                    }
                }
            }
            if fields.len() == 1 && verb.is_click() {
                target.as_str().into()
            } else {
                Value::Map(fields)
            }
        }
        Some(target) => target.as_str().into(),
        None => step.value.clone().unwrap_or_default(),
    };
    let mut map = Map::new();
    map.insert(verb.word.into(), payload);
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
    fn test_markers_split_sections() {
        let doc = root(
            "name: T\nsteps:\n  - section: setup\n  - navigate: /reset\n  - section: main\n  - click: Go\n  - write: {selector: '#q', text: shoes}\n  - section: teardown\n  - comment: done\n",
        );
        let mut warnings = Vec::new();
        let test = read(&doc, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(test.setup.len(), 1);
        assert_eq!(test.steps.len(), 2);
        assert_eq!(test.teardown.len(), 1);
        assert_eq!(test.steps[1].target.as_deref(), Some("#q"));
        assert_eq!(test.steps[1].value, Some(Value::from("shoes")));

        let mut warnings = Vec::new();
        assert_eq!(write(&test, &mut warnings), Value::Map(doc));
    }

    #[test]
    fn test_control_flow_becomes_comment() {
        let mut step = UnifiedStep::new(Verb::by_terse("if").unwrap());
        let mut block = Map::new();
        block.insert("cond".into(), Value::from("#banner"));
        step.value = Some(Value::Map(block));
        let test = UnifiedTest {
            steps: vec![step],
            ..UnifiedTest::default()
        };
        let mut warnings = Vec::new();
        let out = write(&test, &mut warnings);
        assert_eq!(warnings.len(), 1);
        let steps = out.get("steps").and_then(Value::as_seq).unwrap();
        assert_eq!(steps[0].get("comment"), Some(&Value::from("IF: #banner")));
    }
}
