//! Validated attribute descriptions.
//!
//! A [`DescriptorBuilder`] is a draft; [`DescriptorBuilder::build`] checks it
//! and fills in everything that can be derived (short name, category,
//! defaults, enum table). The resulting [`AttributeDescriptor`] is immutable
//! and guaranteed to be buildable.

use plugwork_scene::{AttrCategory, DataType, PlugValue, SceneError, StringData};

/// Enum field table in declaration order.
pub type EnumFields = Vec<(String, i32)>;

/// Error type for descriptor validation and building.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    #[error("invalid attribute name '{0}'")]
    InvalidName(String),
    #[error("cannot infer a category for '{0}'")]
    InvalidCategory(String),
    #[error("'{name}': {category:?} attributes do not hold {data_type:?} values")]
    CategoryMismatch {
        name: String,
        category: AttrCategory,
        data_type: DataType,
    },
    #[error("'{0}': {1:?} attributes need a value type")]
    MissingDataType(String, AttrCategory),
    #[error("enum '{0}' needs at least one field")]
    MissingEnumFields(String),
    #[error("bad enum field '{entry}': {reason}")]
    InvalidEnumField { entry: String, reason: String },
    #[error("compound '{0}' needs a children count of at least 1")]
    MissingChildrenCount(String),
    #[error("'{0}' is not a compound; a children count does not apply")]
    UnexpectedChildrenCount(String),
    #[error("'{name}': {data_type:?} needs an explicit default of {arity} components")]
    MissingDefault {
        name: String,
        data_type: DataType,
        arity: usize,
    },
    #[error("'{name}': default {value} does not fit")]
    DefaultMismatch { name: String, value: String },
    #[error("'{name}': no enum field '{field}'")]
    UnknownEnumDefault { name: String, field: String },
    #[error("'{0}': bounds only apply to numeric and unit attributes")]
    BoundsNotSupported(String),
    #[error("'{name}': {bound} {value} does not fit")]
    BoundMismatch {
        name: String,
        bound: &'static str,
        value: String,
    },
    #[error("'{name}': {low} is greater than {high}")]
    InvalidBounds {
        name: String,
        low: &'static str,
        high: &'static str,
    },
    #[error("'{0}': only string attributes can hold filenames")]
    FilenameNotSupported(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type DescriptorResult<T = ()> = Result<T, DescriptorError>;

/// Parses `"yellow=0:red=10:blue"`; an entry without `=` takes its position.
pub fn parse_enum_fields(text: &str) -> DescriptorResult<EnumFields> {
    text.split(':')
        .enumerate()
        .map(|(position, entry)| {
            let (name, value) = match entry.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim().parse::<i32>().map_err(|e| {
                        DescriptorError::InvalidEnumField {
                            entry: entry.to_owned(),
                            reason: e.to_string(),
                        }
                    })?;
                    (name.trim(), value)
                }
                None => (entry.trim(), position as i32),
            };
            if name.is_empty() {
                return Err(DescriptorError::InvalidEnumField {
                    entry: entry.to_owned(),
                    reason: "empty name".into(),
                });
            }
            Ok((name.to_owned(), value))
        })
        .collect()
}

/// A default given to the builder before it knows the value type.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(PlugValue),
    /// String content, or an enum field name.
    Text(String),
}

impl From<PlugValue> for DefaultValue {
    fn from(value: PlugValue) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for DefaultValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

macro_rules! default_from_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for DefaultValue {
            fn from(value: $ty) -> Self {
                Self::Value(PlugValue::from(value))
            }
        })*
    };
}

default_from_value!(bool, i32, f64, [f64; 2], [f64; 3], [f64; 4], [i32; 2], [i32; 3]);

/// How the builder sets an enum default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumDefault {
    Name(String),
    Index(i32),
}

/// Hard and soft limits of a numeric or unit attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<PlugValue>,
    pub max: Option<PlugValue>,
    pub soft_min: Option<PlugValue>,
    pub soft_max: Option<PlugValue>,
}

impl Bounds {
    fn named(&self) -> [(&'static str, Option<&PlugValue>); 4] {
        [
            ("min", self.min.as_ref()),
            ("max", self.max.as_ref()),
            ("soft min", self.soft_min.as_ref()),
            ("soft max", self.soft_max.as_ref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.named().iter().all(|(_, bound)| bound.is_none())
    }
}

/// Draft of an [`AttributeDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    long_name: String,
    short_name: Option<String>,
    category: Option<AttrCategory>,
    data_type: Option<DataType>,
    default: Option<DefaultValue>,
    bounds: Bounds,
    keyable: bool,
    readable: bool,
    multi: bool,
    index_matters: bool,
    enum_names: Option<String>,
    enum_fields: Option<EnumFields>,
    as_filename: bool,
    children_count: Option<usize>,
    parent: Option<String>,
}

impl DescriptorBuilder {
    pub fn new(long_name: impl Into<String>) -> Self {
        Self {
            long_name: long_name.into(),
            short_name: None,
            category: None,
            data_type: None,
            default: None,
            bounds: Bounds::default(),
            keyable: false,
            readable: true,
            multi: false,
            index_matters: true,
            enum_names: None,
            enum_fields: None,
            as_filename: false,
            children_count: None,
            parent: None,
        }
    }

    #[must_use]
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: AttrCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<DefaultValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_min(mut self, value: impl Into<PlugValue>) -> Self {
        self.bounds.min = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_max(mut self, value: impl Into<PlugValue>) -> Self {
        self.bounds.max = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_soft_min(mut self, value: impl Into<PlugValue>) -> Self {
        self.bounds.soft_min = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_soft_max(mut self, value: impl Into<PlugValue>) -> Self {
        self.bounds.soft_max = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_keyable(mut self, keyable: bool) -> Self {
        self.keyable = keyable;
        self
    }

    #[must_use]
    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    /// Makes the attribute an array.
    #[must_use]
    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    #[must_use]
    pub fn with_index_matters(mut self, index_matters: bool) -> Self {
        self.index_matters = index_matters;
        self
    }

    /// Enum fields in `"name=value:name=value"` form.
    #[must_use]
    pub fn with_enum_names(mut self, names: impl Into<String>) -> Self {
        self.enum_names = Some(names.into());
        self
    }

    #[must_use]
    pub fn with_enum_fields<N: Into<String>>(
        mut self,
        fields: impl IntoIterator<Item = (N, i32)>,
    ) -> Self {
        self.enum_fields = Some(fields.into_iter().map(|(n, v)| (n.into(), v)).collect());
        self
    }

    #[must_use]
    pub fn with_filename(mut self, as_filename: bool) -> Self {
        self.as_filename = as_filename;
        self
    }

    #[must_use]
    pub fn with_children_count(mut self, count: usize) -> Self {
        self.children_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Uses another descriptor as parent; only its long name is kept.
    #[must_use]
    pub fn with_parent_descriptor(self, parent: &AttributeDescriptor) -> Self {
        self.with_parent(parent.long_name())
    }

    pub fn build(self) -> DescriptorResult<AttributeDescriptor> {
        let name = self.long_name.clone();
        for candidate in std::iter::once(&self.long_name).chain(&self.short_name) {
            if !valid_name(candidate) {
                return Err(DescriptorError::InvalidName(candidate.clone()));
            }
        }
        let short_name = self.short_name.clone().unwrap_or_else(|| name.clone());
        let (category, data_type) = self.resolve_types()?;

        match (category, self.children_count) {
            (AttrCategory::Compound, None | Some(0)) => {
                return Err(DescriptorError::MissingChildrenCount(name));
            }
            (AttrCategory::Compound, Some(_)) | (_, None) => {}
            (_, Some(_)) => return Err(DescriptorError::UnexpectedChildrenCount(name)),
        }
        if self.as_filename && category != AttrCategory::String {
            return Err(DescriptorError::FilenameNotSupported(name));
        }

        let enum_fields = if category == AttrCategory::Enum {
            self.resolve_enum_fields()?
        } else {
            Vec::new()
        };
        let (default, enum_default) = match (category, data_type) {
            (AttrCategory::Enum, _) => {
                let (value, enum_default) = self.resolve_enum_default(&enum_fields)?;
                (Some(value), Some(enum_default))
            }
            (_, Some(data_type)) => (self.resolve_default(category, data_type)?, None),
            (_, None) => match &self.default {
                Some(default) => return Err(self.default_mismatch(default)),
                None => (None, None),
            },
        };
        let bounds = self.resolve_bounds(category, data_type)?;

        Ok(AttributeDescriptor {
            long_name: self.long_name,
            short_name,
            category,
            data_type,
            default,
            enum_default,
            bounds,
            keyable: self.keyable,
            readable: self.readable,
            multi: self.multi,
            index_matters: self.index_matters,
            enum_fields,
            as_filename: self.as_filename,
            children_count: self.children_count,
            parent: self.parent,
        })
    }

    fn resolve_types(&self) -> DescriptorResult<(AttrCategory, Option<DataType>)> {
        let name = &self.long_name;
        match (self.category, self.data_type) {
            (None, None) => match &self.default {
                Some(DefaultValue::Text(_)) => Ok((AttrCategory::String, Some(DataType::String))),
                Some(DefaultValue::Value(value)) => infer_type(value)
                    .map(|t| (t.category(), Some(t)))
                    .ok_or_else(|| DescriptorError::InvalidCategory(name.clone())),
                None if self.enum_names.is_some() || self.enum_fields.is_some() => {
                    Ok((AttrCategory::Enum, Some(DataType::Enum)))
                }
                None if self.children_count.is_some() => Ok((AttrCategory::Compound, None)),
                None => Err(DescriptorError::InvalidCategory(name.clone())),
            },
            (None, Some(data_type)) => Ok((data_type.category(), Some(data_type))),
            (Some(AttrCategory::Compound), None) => Ok((AttrCategory::Compound, None)),
            (Some(category), None) => match category {
                AttrCategory::String => Ok((category, Some(DataType::String))),
                AttrCategory::Enum => Ok((category, Some(DataType::Enum))),
                AttrCategory::Matrix => Ok((category, Some(DataType::Matrix))),
                AttrCategory::Message => Ok((category, Some(DataType::Message))),
                _ => match &self.default {
                    Some(DefaultValue::Value(value)) => infer_type(value)
                        .filter(|t| t.category() == category)
                        .map(|t| (category, Some(t)))
                        .ok_or_else(|| DescriptorError::MissingDataType(name.clone(), category)),
                    _ => Err(DescriptorError::MissingDataType(name.clone(), category)),
                },
            },
            (Some(category), Some(data_type)) => {
                if data_type.category() == category {
                    Ok((category, Some(data_type)))
                } else {
                    Err(DescriptorError::CategoryMismatch {
                        name: name.clone(),
                        category,
                        data_type,
                    })
                }
            }
        }
    }

    fn resolve_enum_fields(&self) -> DescriptorResult<EnumFields> {
        let fields = match (&self.enum_fields, &self.enum_names) {
            (Some(fields), _) => fields.clone(),
            (None, Some(names)) if !names.trim().is_empty() => parse_enum_fields(names)?,
            _ => Vec::new(),
        };
        if fields.is_empty() {
            return Err(DescriptorError::MissingEnumFields(self.long_name.clone()));
        }
        let mut seen = Vec::with_capacity(fields.len());
        for (name, _) in &fields {
            if seen.contains(&name) {
                return Err(DescriptorError::InvalidEnumField {
                    entry: name.clone(),
                    reason: "duplicate name".into(),
                });
            }
            seen.push(name);
        }
        Ok(fields)
    }

    fn resolve_enum_default(
        &self,
        fields: &EnumFields,
    ) -> DescriptorResult<(PlugValue, EnumDefault)> {
        let unknown = |field: String| DescriptorError::UnknownEnumDefault {
            name: self.long_name.clone(),
            field,
        };
        match &self.default {
            None => fields
                .iter()
                .min_by_key(|(_, value)| *value)
                .map(|(name, value)| (PlugValue::Int(*value), EnumDefault::Name(name.clone())))
                .ok_or_else(|| DescriptorError::MissingEnumFields(self.long_name.clone())),
            Some(DefaultValue::Text(field)) => fields
                .iter()
                .find(|(name, _)| name == field)
                .map(|(name, value)| (PlugValue::Int(*value), EnumDefault::Name(name.clone())))
                .ok_or_else(|| unknown(field.clone())),
            Some(DefaultValue::Value(PlugValue::Int(index))) => {
                if fields.iter().any(|(_, value)| value == index) {
                    Ok((PlugValue::Int(*index), EnumDefault::Index(*index)))
                } else {
                    Err(unknown(index.to_string()))
                }
            }
            Some(other) => Err(self.default_mismatch(other)),
        }
    }

    fn resolve_default(
        &self,
        category: AttrCategory,
        data_type: DataType,
    ) -> DescriptorResult<Option<PlugValue>> {
        match (&self.default, category) {
            (None, AttrCategory::Numeric | AttrCategory::Unit) => {
                if data_type.arity() > 1 {
                    Err(DescriptorError::MissingDefault {
                        name: self.long_name.clone(),
                        data_type,
                        arity: data_type.arity(),
                    })
                } else {
                    Ok(PlugValue::zero_for(data_type))
                }
            }
            (None, _) => Ok(None),
            (Some(DefaultValue::Text(text)), AttrCategory::String) => {
                Ok(Some(PlugValue::String(StringData::new(text))))
            }
            (Some(DefaultValue::Value(value)), AttrCategory::Message) => {
                Err(self.default_mismatch(&DefaultValue::Value(value.clone())))
            }
            (Some(DefaultValue::Value(value)), _) => coerce(value, data_type)
                .map(Some)
                .ok_or_else(|| self.default_mismatch(&DefaultValue::Value(value.clone()))),
            (Some(text), _) => Err(self.default_mismatch(text)),
        }
    }

    fn resolve_bounds(
        &self,
        category: AttrCategory,
        data_type: Option<DataType>,
    ) -> DescriptorResult<Bounds> {
        if self.bounds.is_empty() {
            return Ok(Bounds::default());
        }
        let Some(data_type) = data_type.filter(|_| category.supports_bounds()) else {
            return Err(DescriptorError::BoundsNotSupported(self.long_name.clone()));
        };
        let fit = |bound: &'static str, value: &Option<PlugValue>| {
            value
                .as_ref()
                .map(|v| {
                    coerce(v, data_type).ok_or_else(|| DescriptorError::BoundMismatch {
                        name: self.long_name.clone(),
                        bound,
                        value: format!("{v:?}"),
                    })
                })
                .transpose()
        };
        let bounds = Bounds {
            min: fit("min", &self.bounds.min)?,
            max: fit("max", &self.bounds.max)?,
            soft_min: fit("soft min", &self.bounds.soft_min)?,
            soft_max: fit("soft max", &self.bounds.soft_max)?,
        };
        for (low, high, lo, hi) in [
            ("min", "max", &bounds.min, &bounds.max),
            ("soft min", "soft max", &bounds.soft_min, &bounds.soft_max),
        ] {
            let scalar = |v: &Option<PlugValue>| {
                v.as_ref()
                    .and_then(PlugValue::components)
                    .filter(|c| c.len() == 1)
                    .map(|c| c[0])
            };
            if let (Some(lo), Some(hi)) = (scalar(lo), scalar(hi))
                && lo > hi
            {
                return Err(DescriptorError::InvalidBounds {
                    name: self.long_name.clone(),
                    low,
                    high,
                });
            }
        }
        Ok(bounds)
    }

    fn default_mismatch(&self, value: &DefaultValue) -> DescriptorError {
        DescriptorError::DefaultMismatch {
            name: self.long_name.clone(),
            value: match value {
                DefaultValue::Value(v) => format!("{v:?}"),
                DefaultValue::Text(t) => format!("{t:?}"),
            },
        }
    }
}

fn valid_name(name: &str) -> bool {
    name.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Value type a bare default implies.
fn infer_type(value: &PlugValue) -> Option<DataType> {
    match value {
        PlugValue::Bool(_) => Some(DataType::Bool),
        PlugValue::Int(_) => Some(DataType::Int),
        PlugValue::Float(_) => Some(DataType::Float),
        PlugValue::Double2(_) => Some(DataType::Float2),
        PlugValue::Double3(_) => Some(DataType::Float3),
        PlugValue::Double4(_) => Some(DataType::Float4),
        PlugValue::Int2(_) => Some(DataType::Int2),
        PlugValue::Int3(_) => Some(DataType::Int3),
        PlugValue::String(_) => Some(DataType::String),
        PlugValue::Matrix(_) => Some(DataType::Matrix),
        PlugValue::Compound(_) => None,
    }
}

/// `value` in the shape `data_type` stores; integers widen to floats.
fn coerce(value: &PlugValue, data_type: DataType) -> Option<PlugValue> {
    if value.fits(data_type) {
        return Some(value.clone());
    }
    let widened = match value {
        PlugValue::Int(v) => PlugValue::Float(f64::from(*v)),
        PlugValue::Int2(v) => PlugValue::Double2(v.map(f64::from)),
        PlugValue::Int3(v) => PlugValue::Double3(v.map(f64::from)),
        _ => return None,
    };
    widened.fits(data_type).then_some(widened)
}

/// A validated, immutable attribute description.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    long_name: String,
    short_name: String,
    category: AttrCategory,
    data_type: Option<DataType>,
    default: Option<PlugValue>,
    enum_default: Option<EnumDefault>,
    bounds: Bounds,
    keyable: bool,
    readable: bool,
    multi: bool,
    index_matters: bool,
    enum_fields: EnumFields,
    as_filename: bool,
    children_count: Option<usize>,
    parent: Option<String>,
}

impl AttributeDescriptor {
    pub fn builder(long_name: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(long_name)
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn names(&self) -> [&str; 2] {
        [&self.long_name, &self.short_name]
    }

    pub fn category(&self) -> AttrCategory {
        self.category
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Default in storage form. Enum defaults are the field value.
    pub fn default_value(&self) -> Option<&PlugValue> {
        self.default.as_ref()
    }

    pub fn enum_default(&self) -> Option<&EnumDefault> {
        self.enum_default.as_ref()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn is_keyable(&self) -> bool {
        self.keyable
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn index_matters(&self) -> bool {
        self.index_matters
    }

    pub fn enum_fields(&self) -> &[(String, i32)] {
        &self.enum_fields
    }

    pub fn as_filename(&self) -> bool {
        self.as_filename
    }

    pub fn children_count(&self) -> Option<usize> {
        self.children_count
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_compound(&self) -> bool {
        self.category == AttrCategory::Compound
    }
}
