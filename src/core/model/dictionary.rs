//! Type and aspect definitions.
//!
//! A deliberately small dictionary: each class has at most one parent and
//! declares typed properties. It answers the questions the search layer
//! asks: subtype checks, classification sub-aspects and which properties
//! hold category references.

use super::content::*;
use super::qname::QName;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// A declared property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDefinition {
    pub name: QName,
    pub data_type: QName,
    pub multi_valued: bool,
}

impl PropertyDefinition {
    pub fn text(name: QName) -> Self {
        Self {
            name,
            data_type: DATATYPE_TEXT.clone(),
            multi_valued: false,
        }
    }

    pub fn category(name: QName) -> Self {
        Self {
            name,
            data_type: DATATYPE_CATEGORY.clone(),
            multi_valued: true,
        }
    }
}

/// A type or aspect definition
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub name: QName,
    pub parent: Option<QName>,
    pub is_aspect: bool,
    pub properties: Vec<PropertyDefinition>,
}

/// Registry of class definitions
#[derive(Debug)]
pub struct Dictionary {
    classes: RwLock<BTreeMap<QName, ClassDefinition>>,
}

impl Dictionary {
    pub fn empty() -> Self {
        Self {
            classes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Dictionary preloaded with the built-in content model
    pub fn with_content_model() -> Self {
        let dictionary = Self::empty();
        dictionary.register_type(TYPE_BASE.clone(), None, vec![]);
        dictionary.register_type(TYPE_STORE_ROOT.clone(), Some(TYPE_BASE.clone()), vec![]);
        dictionary.register_type(TYPE_CONTAINER.clone(), Some(TYPE_BASE.clone()), vec![]);
        dictionary.register_type(
            TYPE_CMOBJECT.clone(),
            Some(TYPE_BASE.clone()),
            vec![
                PropertyDefinition::text(PROP_NAME.clone()),
                PropertyDefinition {
                    name: PROP_CREATED.clone(),
                    data_type: DATATYPE_DATETIME.clone(),
                    multi_valued: false,
                },
                PropertyDefinition {
                    name: PROP_MODIFIED.clone(),
                    data_type: DATATYPE_DATETIME.clone(),
                    multi_valued: false,
                },
            ],
        );
        dictionary.register_type(TYPE_FOLDER.clone(), Some(TYPE_CMOBJECT.clone()), vec![]);
        dictionary.register_type(TYPE_CONTENT.clone(), Some(TYPE_CMOBJECT.clone()), vec![]);
        dictionary.register_type(TYPE_CATEGORY_ROOT.clone(), Some(TYPE_BASE.clone()), vec![]);
        dictionary.register_type(
            TYPE_CATEGORY.clone(),
            Some(TYPE_BASE.clone()),
            vec![PropertyDefinition::text(PROP_NAME.clone())],
        );

        dictionary.register_aspect(
            ASPECT_TITLED.clone(),
            None,
            vec![
                PropertyDefinition::text(PROP_TITLE.clone()),
                PropertyDefinition::text(PROP_DESCRIPTION.clone()),
            ],
        );
        dictionary.register_aspect(ASPECT_CLASSIFIABLE.clone(), None, vec![]);
        dictionary.register_aspect(
            ASPECT_GEN_CLASSIFIABLE.clone(),
            Some(ASPECT_CLASSIFIABLE.clone()),
            vec![PropertyDefinition::category(PROP_CATEGORIES.clone())],
        );
        dictionary
    }

    pub fn register_type(
        &self,
        name: QName,
        parent: Option<QName>,
        properties: Vec<PropertyDefinition>,
    ) {
        self.register(ClassDefinition {
            name,
            parent,
            is_aspect: false,
            properties,
        });
    }

    pub fn register_aspect(
        &self,
        name: QName,
        parent: Option<QName>,
        properties: Vec<PropertyDefinition>,
    ) {
        self.register(ClassDefinition {
            name,
            parent,
            is_aspect: true,
            properties,
        });
    }

    fn register(&self, class: ClassDefinition) {
        if let Ok(mut classes) = self.classes.write() {
            classes.insert(class.name.clone(), class);
        }
    }

    pub fn class(&self, name: &QName) -> Option<ClassDefinition> {
        self.classes.read().ok()?.get(name).cloned()
    }

    pub fn is_aspect(&self, name: &QName) -> bool {
        self.class(name).map(|c| c.is_aspect).unwrap_or(false)
    }

    /// The class itself followed by its ancestors
    pub fn super_classes(&self, name: &QName) -> Vec<QName> {
        let Ok(classes) = self.classes.read() else {
            return vec![name.clone()];
        };
        let mut chain = vec![name.clone()];
        let mut current = classes.get(name).and_then(|c| c.parent.clone());
        while let Some(parent) = current {
            if chain.contains(&parent) {
                break;
            }
            current = classes.get(&parent).and_then(|c| c.parent.clone());
            chain.push(parent);
        }
        chain
    }

    /// Whether `class` is `of` or one of its descendants
    pub fn is_sub_class(&self, class: &QName, of: &QName) -> bool {
        self.super_classes(class).iter().any(|c| c == of)
    }

    /// Aspects derived from `aspect`; immediate children only unless `follow`
    pub fn sub_aspects(&self, aspect: &QName, follow: bool) -> Vec<QName> {
        let Ok(classes) = self.classes.read() else {
            return Vec::new();
        };
        classes
            .values()
            .filter(|c| c.is_aspect && &c.name != aspect)
            .filter(|c| {
                if follow {
                    drop_first(self.super_classes_in(&classes, &c.name)).contains(aspect)
                } else {
                    c.parent.as_ref() == Some(aspect)
                }
            })
            .map(|c| c.name.clone())
            .collect()
    }

    fn super_classes_in(
        &self,
        classes: &BTreeMap<QName, ClassDefinition>,
        name: &QName,
    ) -> Vec<QName> {
        let mut chain = vec![name.clone()];
        let mut current = classes.get(name).and_then(|c| c.parent.clone());
        while let Some(parent) = current {
            if chain.contains(&parent) {
                break;
            }
            current = classes.get(&parent).and_then(|c| c.parent.clone());
            chain.push(parent);
        }
        chain
    }

    /// Look a property up across all classes
    pub fn property(&self, name: &QName) -> Option<PropertyDefinition> {
        let classes = self.classes.read().ok()?;
        classes
            .values()
            .flat_map(|c| c.properties.iter())
            .find(|p| &p.name == name)
            .cloned()
    }

    /// Whether values of this property reference categories
    pub fn is_category_property(&self, name: &QName) -> bool {
        self.property(name)
            .map(|p| p.data_type == *DATATYPE_CATEGORY)
            .unwrap_or(false)
    }

    /// The category-typed property declared by an aspect or its ancestors
    pub fn category_property(&self, aspect: &QName) -> Option<QName> {
        let classes = self.classes.read().ok()?;
        self.super_classes_in(&classes, aspect)
            .iter()
            .filter_map(|name| classes.get(name))
            .flat_map(|c| c.properties.iter())
            .find(|p| p.data_type == *DATATYPE_CATEGORY)
            .map(|p| p.name.clone())
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::with_content_model()
    }
}

fn drop_first(mut chain: Vec<QName>) -> Vec<QName> {
    if !chain.is_empty() {
        chain.remove(0);
    }
    chain
}
