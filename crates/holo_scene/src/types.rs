//! Scene graph types: compositions, objects, properties and trait usages.

use holo_common::{hash_config, hash_content, ConfigMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed composition: the root of one scene graph snapshot.
///
/// Templates, top-level objects and spatial groups are kept separately because
/// the parser produces them separately; traversal order is templates, then
/// objects, then the members of spatial groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    /// Composition name, the first element of every change path.
    pub name: String,
    /// Reusable object definitions that other objects may extend.
    #[serde(default)]
    pub templates: Vec<ObjectDecl>,
    /// Top-level scene objects.
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
    /// Spatial grouping containers. Groups are not objects themselves.
    #[serde(default)]
    pub spatial_groups: Vec<SpatialGroup>,
    /// Composition-level logic block, compared opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Value>,
}

/// A named container that groups objects spatially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialGroup {
    /// Group name.
    pub name: String,
    /// Group-level properties (layout hints etc.).
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Member objects.
    #[serde(default)]
    pub objects: Vec<ObjectDecl>,
    /// Nested groups.
    #[serde(default)]
    pub groups: Vec<SpatialGroup>,
}

/// A named declarative scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDecl {
    /// Object name, unique within its composition.
    pub name: String,
    /// Declared object kind (`orb`, `object`, `template`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Ordered property list.
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Trait usages, either bare names or name-plus-config records.
    #[serde(default)]
    pub traits: Vec<TraitSpec>,
    /// Name of the template this object extends, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Nested child objects.
    #[serde(default)]
    pub children: Vec<ObjectDecl>,
    /// Embedded logic block, compared opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Value>,
}

/// A single `key: value` property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property key.
    pub key: String,
    /// Property value.
    pub value: Value,
}

/// A trait as written in the source: `@grabbable` or `@physics(mass: 2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraitSpec {
    /// A trait used without configuration.
    Bare(String),
    /// A trait used with a configuration record.
    Configured {
        /// Trait name.
        name: String,
        /// Trait configuration.
        #[serde(default)]
        config: ConfigMap,
    },
}

/// A normalized trait usage with its stable configuration hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitUsage {
    /// Trait name.
    pub name: String,
    /// Trait configuration (empty for bare usages).
    #[serde(default)]
    pub config: ConfigMap,
    /// Hash of `config`, see [`holo_common::hash_config`].
    #[serde(default)]
    pub config_hash: String,
}

impl TraitUsage {
    /// Creates a usage and computes its configuration hash.
    pub fn new(name: impl Into<String>, config: ConfigMap) -> Self {
        let config_hash = hash_config(&config);
        Self {
            name: name.into(),
            config,
            config_hash,
        }
    }

    /// Fills in `config_hash` if it was not supplied.
    pub fn with_computed_hash(mut self) -> Self {
        if self.config_hash.is_empty() {
            self.config_hash = hash_config(&self.config);
        }
        self
    }
}

impl TraitSpec {
    /// Returns the trait name regardless of declaration form.
    pub fn name(&self) -> &str {
        match self {
            TraitSpec::Bare(name) => name,
            TraitSpec::Configured { name, .. } => name,
        }
    }

    /// Normalizes this declaration to `{name, config, configHash}`.
    pub fn to_usage(&self) -> TraitUsage {
        match self {
            TraitSpec::Bare(name) => TraitUsage::new(name.clone(), ConfigMap::new()),
            TraitSpec::Configured { name, config } => TraitUsage::new(name.clone(), config.clone()),
        }
    }
}

impl Property {
    /// Creates a property.
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl ObjectDecl {
    /// Creates an object with no properties, traits or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            properties: Vec::new(),
            traits: Vec::new(),
            template: None,
            children: Vec::new(),
            logic: None,
        }
    }

    /// Sets the declared kind.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Appends a property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.push(Property::new(key, value));
        self
    }

    /// Appends a bare trait usage.
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.push(TraitSpec::Bare(name.into()));
        self
    }

    /// Appends a configured trait usage.
    pub fn with_configured_trait(mut self, name: impl Into<String>, config: ConfigMap) -> Self {
        self.traits.push(TraitSpec::Configured {
            name: name.into(),
            config,
        });
        self
    }

    /// Sets the template this object extends.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Appends a child object.
    pub fn with_child(mut self, child: ObjectDecl) -> Self {
        self.children.push(child);
        self
    }

    /// Sets the logic block.
    pub fn with_logic(mut self, logic: Value) -> Self {
        self.logic = Some(logic);
        self
    }

    /// Returns all trait usages in normalized form.
    pub fn trait_usages(&self) -> Vec<TraitUsage> {
        self.traits.iter().map(TraitSpec::to_usage).collect()
    }

    /// Looks up a property value by key.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.iter().find(|p| p.key == key).map(|p| &p.value)
    }

    /// Stable content hash of this object and its whole subtree.
    ///
    /// Covers name, kind, template, properties (in order), normalized traits,
    /// children and logic.
    pub fn content_hash(&self) -> String {
        hash_content(&self.canonical_value().to_string())
    }

    fn canonical_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        if let Some(kind) = &self.kind {
            map.insert("kind".into(), Value::String(kind.clone()));
        }
        if let Some(template) = &self.template {
            map.insert("template".into(), Value::String(template.clone()));
        }
        let properties = self
            .properties
            .iter()
            .map(|p| Value::Array(vec![Value::String(p.key.clone()), p.value.clone()]))
            .collect();
        map.insert("properties".into(), Value::Array(properties));
        let traits = self
            .trait_usages()
            .into_iter()
            .map(|usage| {
                Value::Array(vec![
                    Value::String(usage.name),
                    Value::String(usage.config_hash),
                ])
            })
            .collect();
        map.insert("traits".into(), Value::Array(traits));
        let children = self.children.iter().map(ObjectDecl::canonical_value).collect();
        map.insert("children".into(), Value::Array(children));
        map.insert("logic".into(), self.logic.clone().unwrap_or(Value::Null));
        Value::Object(map)
    }
}

impl SpatialGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            objects: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Appends a member object.
    pub fn with_object(mut self, object: ObjectDecl) -> Self {
        self.objects.push(object);
        self
    }

    /// Appends a nested group.
    pub fn with_group(mut self, group: SpatialGroup) -> Self {
        self.groups.push(group);
        self
    }
}

impl Composition {
    /// Creates an empty composition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: Vec::new(),
            objects: Vec::new(),
            spatial_groups: Vec::new(),
            logic: None,
        }
    }

    /// Appends a template.
    pub fn with_template(mut self, template: ObjectDecl) -> Self {
        self.templates.push(template);
        self
    }

    /// Appends a top-level object.
    pub fn with_object(mut self, object: ObjectDecl) -> Self {
        self.objects.push(object);
        self
    }

    /// Appends a spatial group.
    pub fn with_group(mut self, group: SpatialGroup) -> Self {
        self.spatial_groups.push(group);
        self
    }

    /// Sets the composition-level logic block.
    pub fn with_logic(mut self, logic: Value) -> Self {
        self.logic = Some(logic);
        self
    }
}
