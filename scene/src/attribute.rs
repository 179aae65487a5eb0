//! Detached attribute objects.
//!
//! An [`AttributeObject`] is a fully described attribute that is not yet part
//! of any node. Scenes copy it into their own storage in
//! [`SceneGraph::add_attribute`](crate::SceneGraph::add_attribute).

use bitflags::bitflags;

use crate::error::{SceneError, SceneResult};
use crate::types::{AttrCategory, DataType, FnSet};
use crate::value::PlugValue;

bitflags! {
    /// Per-attribute behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttributeFlags: u32 {
        const KEYABLE = 1 << 0;
        const READABLE = 1 << 1;
        const WRITABLE = 1 << 2;
        const STORABLE = 1 << 3;
        /// Array (multi) attribute.
        const ARRAY = 1 << 4;
        const INDEX_MATTERS = 1 << 5;
        const USED_AS_FILENAME = 1 << 6;
        /// Shown in the channel box when not keyable.
        const CHANNEL_BOX = 1 << 7;
    }
}

impl Default for AttributeFlags {
    fn default() -> Self {
        Self::READABLE | Self::WRITABLE | Self::STORABLE
    }
}

/// A detached attribute description with optional children.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeObject {
    long_name: String,
    short_name: String,
    category: AttrCategory,
    data_type: Option<DataType>,
    default: Option<PlugValue>,
    min: Option<PlugValue>,
    max: Option<PlugValue>,
    soft_min: Option<PlugValue>,
    soft_max: Option<PlugValue>,
    enum_fields: Vec<(String, i32)>,
    flags: AttributeFlags,
    children: Vec<AttributeObject>,
}

impl AttributeObject {
    /// Creates an attribute of the given category.
    ///
    /// Compound attributes start with no children; at least one must be added
    /// before the attribute can be attached to a node.
    pub fn create(
        long_name: impl Into<String>,
        short_name: impl Into<String>,
        category: AttrCategory,
        data_type: Option<DataType>,
    ) -> Self {
        Self {
            long_name: long_name.into(),
            short_name: short_name.into(),
            category,
            data_type,
            default: None,
            min: None,
            max: None,
            soft_min: None,
            soft_max: None,
            enum_fields: Vec::new(),
            flags: AttributeFlags::default(),
            children: Vec::new(),
        }
    }

    /// Creates a compound attribute with no children.
    pub fn create_compound(long_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self::create(long_name, short_name, AttrCategory::Compound, None)
    }

    /// Creates a colour attribute with `R`, `G` and `B` float children.
    pub fn create_color(long_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self::triple(long_name.into(), short_name.into(), DataType::Color, ["R", "G", "B"])
    }

    /// Creates a point attribute with `X`, `Y` and `Z` float children.
    pub fn create_point(long_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self::triple(long_name.into(), short_name.into(), DataType::Point, ["X", "Y", "Z"])
    }

    fn triple(long_name: String, short_name: String, data_type: DataType, axes: [&str; 3]) -> Self {
        let mut attr = Self::create(&long_name, &short_name, AttrCategory::Numeric, Some(data_type));
        attr.default = Some(PlugValue::Double3([0.0; 3]));
        attr.children = axes
            .iter()
            .map(|axis| {
                let mut child = Self::create(
                    format!("{long_name}{axis}"),
                    format!("{short_name}{}", axis.to_lowercase()),
                    AttrCategory::Numeric,
                    Some(DataType::Float),
                );
                child.default = Some(PlugValue::Float(0.0));
                child
            })
            .collect();
        attr
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn category(&self) -> AttrCategory {
        self.category
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn default_value(&self) -> Option<&PlugValue> {
        self.default.as_ref()
    }

    pub fn min(&self) -> Option<&PlugValue> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&PlugValue> {
        self.max.as_ref()
    }

    pub fn soft_min(&self) -> Option<&PlugValue> {
        self.soft_min.as_ref()
    }

    pub fn soft_max(&self) -> Option<&PlugValue> {
        self.soft_max.as_ref()
    }

    pub fn enum_fields(&self) -> &[(String, i32)] {
        &self.enum_fields
    }

    pub fn flags(&self) -> AttributeFlags {
        self.flags
    }

    pub fn children(&self) -> &[AttributeObject] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [AttributeObject] {
        &mut self.children
    }

    /// Whether the attribute holds structural children.
    pub fn is_compound(&self) -> bool {
        self.category == AttrCategory::Compound || !self.children.is_empty()
    }

    /// Function sets this attribute supports.
    pub fn functions(&self) -> FnSet {
        let mut set = self.category.fn_set();
        if !self.children.is_empty() {
            set |= FnSet::COMPOUND;
        }
        set
    }

    /// Both names, long first.
    pub fn names(&self) -> [&str; 2] {
        [&self.long_name, &self.short_name]
    }

    /// Every long and short name of this attribute and its descendants.
    pub fn all_names(&self) -> Vec<&str> {
        let mut names = self.names().to_vec();
        for child in &self.children {
            names.extend(child.all_names());
        }
        names
    }

    /// Adds an enum field.
    pub fn add_field(&mut self, name: impl Into<String>, value: i32) -> SceneResult {
        let name = name.into();
        self.expect_category(AttrCategory::Enum, "add_field")?;
        if self.enum_fields.iter().any(|(n, _)| *n == name) {
            return Err(SceneError::DuplicateName {
                node: self.long_name.clone(),
                name,
            });
        }
        self.enum_fields.push((name, value));
        Ok(())
    }

    /// Sets the default to the value of the named enum field.
    pub fn set_default_by_name(&mut self, field: &str) -> SceneResult {
        self.expect_category(AttrCategory::Enum, "set_default_by_name")?;
        let value = self
            .enum_fields
            .iter()
            .find(|(n, _)| n == field)
            .map(|(_, v)| *v)
            .ok_or_else(|| SceneError::NotFound(format!("{}: enum field '{field}'", self.long_name)))?;
        self.default = Some(PlugValue::Int(value));
        Ok(())
    }

    pub fn set_default(&mut self, value: PlugValue) -> SceneResult {
        self.check_value(&value)?;
        self.default = Some(value);
        Ok(())
    }

    pub fn set_min(&mut self, value: PlugValue) -> SceneResult {
        self.check_bound(&value)?;
        self.min = Some(value);
        Ok(())
    }

    pub fn set_max(&mut self, value: PlugValue) -> SceneResult {
        self.check_bound(&value)?;
        self.max = Some(value);
        Ok(())
    }

    pub fn set_soft_min(&mut self, value: PlugValue) -> SceneResult {
        self.check_bound(&value)?;
        self.soft_min = Some(value);
        Ok(())
    }

    pub fn set_soft_max(&mut self, value: PlugValue) -> SceneResult {
        self.check_bound(&value)?;
        self.soft_max = Some(value);
        Ok(())
    }

    pub fn set_used_as_filename(&mut self, value: bool) -> SceneResult {
        self.expect_category(AttrCategory::String, "set_used_as_filename")?;
        self.flags.set(AttributeFlags::USED_AS_FILENAME, value);
        Ok(())
    }

    pub fn set_keyable(&mut self, value: bool) {
        self.flags.set(AttributeFlags::KEYABLE, value);
    }

    pub fn set_readable(&mut self, value: bool) {
        self.flags.set(AttributeFlags::READABLE, value);
    }

    pub fn set_array(&mut self, value: bool) {
        self.flags.set(AttributeFlags::ARRAY, value);
    }

    pub fn set_index_matters(&mut self, value: bool) {
        self.flags.set(AttributeFlags::INDEX_MATTERS, value);
    }

    pub fn set_channel_box(&mut self, value: bool) {
        self.flags.set(AttributeFlags::CHANNEL_BOX, value);
    }

    /// Adds a structural child to a compound attribute.
    pub fn add_child(&mut self, child: AttributeObject) -> SceneResult {
        self.expect_category(AttrCategory::Compound, "add_child")?;
        if let Some(name) = child
            .all_names()
            .into_iter()
            .find(|name| self.all_names().contains(name))
        {
            return Err(SceneError::DuplicateName {
                node: self.long_name.clone(),
                name: name.to_owned(),
            });
        }
        self.children.push(child);
        Ok(())
    }

    fn expect_category(&self, category: AttrCategory, what: &str) -> SceneResult {
        if self.category == category {
            Ok(())
        } else {
            Err(SceneError::TypeMismatch(format!(
                "{what} on {:?} attribute '{}'",
                self.category, self.long_name
            )))
        }
    }

    fn check_value(&self, value: &PlugValue) -> SceneResult {
        match self.data_type {
            Some(data_type) if value.fits(data_type) => Ok(()),
            Some(data_type) => Err(SceneError::TypeMismatch(format!(
                "'{}' expects {data_type:?}, got {}",
                self.long_name,
                value.type_name()
            ))),
            None => Err(SceneError::TypeMismatch(format!(
                "'{}' holds no value",
                self.long_name
            ))),
        }
    }

    fn check_bound(&self, value: &PlugValue) -> SceneResult {
        if !self.category.supports_bounds() {
            return Err(SceneError::TypeMismatch(format!(
                "bounds on {:?} attribute '{}'",
                self.category, self.long_name
            )));
        }
        self.check_value(value)
    }
}

/// Classification of an attribute already attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub long_name: String,
    pub short_name: String,
    pub category: AttrCategory,
    pub data_type: Option<DataType>,
    pub is_array: bool,
    pub children_count: usize,
    /// Field table of enum attributes, empty otherwise.
    pub enum_fields: Vec<(String, i32)>,
    pub functions: FnSet,
}
