//! Story data as it crosses the service boundary.
//!
//! Entities and scenes keep every caller-supplied field in a flattened map so
//! annotation only ever adds keys; nothing the caller sent is dropped or renamed.

use std::fmt;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Whether the annotated entities are characters or themes.
///
/// Only changes prompt wording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryType {
    #[default]
    Character,
    Theme,
}

impl StoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Character => "character",
            StoryType::Theme => "theme",
        }
    }
}

impl fmt::Display for StoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A character or theme from the story-level entity list.
///
/// The name is read from `character`, falling back to `name`. When both are
/// present, `name` stays in `fields` untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryEntity {
    #[serde(rename = "character")]
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl<'de> Deserialize<'de> for StoryEntity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let raw = match fields.remove("character") {
            Some(value) => value,
            None => fields
                .remove("name")
                .ok_or_else(|| D::Error::missing_field("character"))?,
        };
        match raw {
            Value::String(name) => Ok(Self { name, fields }),
            other => Err(D::Error::custom(format!("entity name must be a string, got {other}"))),
        }
    }
}

impl StoryEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }
}

/// An entity's appearance inside one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity {
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SceneEntity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Numeric value stored under `axis`, if any.
    pub fn axis_value(&self, axis: &str) -> Option<f64> {
        self.fields.get(axis).and_then(Value::as_f64)
    }

    pub fn set_axis_value(&mut self, axis: &str, value: impl Into<Value>) {
        self.fields.insert(axis.to_string(), value.into());
    }
}

/// One narrative unit and the entities present in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub characters: Vec<SceneEntity>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Scene {
    pub fn new(characters: Vec<SceneEntity>) -> Self {
        Self {
            characters,
            fields: Map::new(),
        }
    }

    /// Chapter label, when the scene carries one.
    pub fn chapter(&self) -> Option<&str> {
        self.fields.get("chapter").and_then(Value::as_str)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut SceneEntity> {
        self.characters.iter_mut().find(|c| c.name == name)
    }
}

/// Value assigned to one entity for one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    #[serde(rename = "character")]
    pub name: String,
    #[serde(rename = "val")]
    pub value: String,
    #[serde(rename = "exp")]
    pub explanation: String,
}

/// Color token chosen for one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    #[serde(rename = "val")]
    pub value: String,
    pub color: String,
}

/// Accepts either inline JSON or a string holding JSON.
///
/// The front-end posts `data` both ways; this decodes it once at the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexibleJson<T>(pub T);

impl<T> FlexibleJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for FlexibleJson<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match Value::deserialize(deserializer)? {
            Value::String(raw) => serde_json::from_str(&raw),
            other => serde_json::from_value(other),
        };
        parsed.map(FlexibleJson).map_err(D::Error::custom)
    }
}

impl<T: Serialize> Serialize for FlexibleJson<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn story_entity_keeps_unknown_fields_and_accepts_name_alias() {
        let entity: StoryEntity = serde_json::from_value(json!({
            "character": "Nick Carraway",
            "aliases": ["Nick"],
            "quote": "I was within and without"
        }))
        .unwrap();
        assert_eq!(entity.name, "Nick Carraway");
        assert_eq!(entity.fields["aliases"], json!(["Nick"]));

        let themed: StoryEntity = serde_json::from_value(json!({"name": "wealth"})).unwrap();
        assert_eq!(themed.name, "wealth");

        let round = serde_json::to_value(&entity).unwrap();
        assert_eq!(round["character"], "Nick Carraway");
        assert_eq!(round["quote"], "I was within and without");
    }

    #[test]
    fn story_entity_with_character_and_name_keeps_both() {
        let entity: StoryEntity = serde_json::from_value(json!({
            "character": "Nick",
            "name": "Nick Carraway"
        }))
        .unwrap();
        assert_eq!(entity.name, "Nick");
        assert_eq!(entity.fields["name"], "Nick Carraway");

        let round = serde_json::to_value(&entity).unwrap();
        assert_eq!(round, json!({"character": "Nick", "name": "Nick Carraway"}));
    }

    #[test]
    fn story_entity_requires_a_string_name() {
        assert!(serde_json::from_value::<StoryEntity>(json!({"aliases": []})).is_err());
        assert!(serde_json::from_value::<StoryEntity>(json!({"character": 3})).is_err());
    }

    #[test]
    fn scene_exposes_chapter_and_axis_values() {
        let mut scene: Scene = serde_json::from_value(json!({
            "number": 1,
            "chapter": "Chapter 1",
            "characters": [{"name": "Nick", "importance_rank": 1}]
        }))
        .unwrap();
        assert_eq!(scene.chapter(), Some("Chapter 1"));

        let nick = scene.entity_mut("Nick").unwrap();
        assert!(nick.axis_value("happiness").is_none());
        nick.set_axis_value("happiness", 0.4);
        assert_eq!(nick.axis_value("happiness"), Some(0.4));
        assert!(scene.entity_mut("nick").is_none());
    }

    #[test]
    fn flexible_json_accepts_inline_and_encoded_forms() {
        let inline: FlexibleJson<Vec<StoryEntity>> =
            serde_json::from_value(json!([{"character": "Daisy"}])).unwrap();
        let encoded: FlexibleJson<Vec<StoryEntity>> =
            serde_json::from_value(json!("[{\"character\": \"Daisy\"}]")).unwrap();
        assert_eq!(inline, encoded);
        assert_eq!(inline.into_inner()[0].name, "Daisy");

        let bad = serde_json::from_value::<FlexibleJson<Vec<StoryEntity>>>(json!("not json"));
        assert!(bad.is_err());
    }

    #[test]
    fn records_use_wire_names() {
        let record = AttributeRecord {
            name: "Tom".into(),
            value: "male".into(),
            explanation: "Described as a man".into(),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"character": "Tom", "val": "male", "exp": "Described as a man"})
        );
        let color = ColorAssignment {
            value: "male".into(),
            color: "rgb(1, 2, 3)".into(),
        };
        assert_eq!(
            serde_json::to_value(&color).unwrap(),
            json!({"val": "male", "color": "rgb(1, 2, 3)"})
        );
    }

    #[test]
    fn story_type_parses_lowercase() {
        let t: StoryType = serde_json::from_value(json!("theme")).unwrap();
        assert_eq!(t, StoryType::Theme);
        assert_eq!(StoryType::default().to_string(), "character");
    }
}
