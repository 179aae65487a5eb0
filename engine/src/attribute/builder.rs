//! Turns validated descriptors into detached attribute objects.

use plugwork_scene::{AttrCategory, AttributeObject, DataType};

use super::descriptor::{AttributeDescriptor, DescriptorResult, EnumDefault};

/// Which constructor produces the attribute object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionRoutine {
    Standard,
    /// Float triple with `R`, `G`, `B` children.
    Color,
    /// Float triple with `X`, `Y`, `Z` children.
    Point,
}

impl ConstructionRoutine {
    pub fn for_descriptor(desc: &AttributeDescriptor) -> Self {
        match (desc.category(), desc.data_type()) {
            (AttrCategory::Numeric, Some(DataType::Color)) => Self::Color,
            (AttrCategory::Numeric, Some(DataType::Point | DataType::Float3)) => Self::Point,
            _ => Self::Standard,
        }
    }
}

/// Builds [`AttributeObject`]s from [`AttributeDescriptor`]s.
pub struct AttributeBuilder;

impl AttributeBuilder {
    pub fn build(desc: &AttributeDescriptor) -> DescriptorResult<AttributeObject> {
        let (long, short) = (desc.long_name(), desc.short_name());
        let routine = ConstructionRoutine::for_descriptor(desc);
        let mut attr = match routine {
            ConstructionRoutine::Color => AttributeObject::create_color(long, short),
            ConstructionRoutine::Point => AttributeObject::create_point(long, short),
            ConstructionRoutine::Standard if desc.is_compound() => {
                AttributeObject::create_compound(long, short)
            }
            ConstructionRoutine::Standard => {
                AttributeObject::create(long, short, desc.category(), desc.data_type())
            }
        };

        match desc.category() {
            AttrCategory::Enum => {
                for (name, value) in desc.enum_fields() {
                    attr.add_field(name.clone(), *value)?;
                }
                match desc.enum_default() {
                    Some(EnumDefault::Name(name)) => attr.set_default_by_name(name)?,
                    Some(EnumDefault::Index(index)) => attr.set_default((*index).into())?,
                    None => {}
                }
            }
            AttrCategory::Numeric | AttrCategory::Unit => {
                if let Some(default) = desc.default_value() {
                    attr.set_default(default.clone())?;
                }
                let bounds = desc.bounds();
                if let Some(min) = &bounds.min {
                    attr.set_min(min.clone())?;
                }
                if let Some(max) = &bounds.max {
                    attr.set_max(max.clone())?;
                }
                if let Some(soft_min) = &bounds.soft_min {
                    attr.set_soft_min(soft_min.clone())?;
                }
                if let Some(soft_max) = &bounds.soft_max {
                    attr.set_soft_max(soft_max.clone())?;
                }
            }
            AttrCategory::String => {
                if let Some(default) = desc.default_value() {
                    attr.set_default(default.clone())?;
                }
                attr.set_used_as_filename(desc.as_filename())?;
            }
            AttrCategory::Matrix => {
                if let Some(default) = desc.default_value() {
                    attr.set_default(default.clone())?;
                }
            }
            AttrCategory::Message | AttrCategory::Compound => {}
        }

        attr.set_keyable(desc.is_keyable());
        attr.set_readable(desc.is_readable());
        attr.set_array(desc.is_multi());
        attr.set_index_matters(desc.index_matters());
        log::debug!("Built {routine:?} attribute '{long}'");
        Ok(attr)
    }
}

#[cfg(test)]
mod tests {
    use plugwork_scene::{AttributeFlags, PlugValue};

    use super::*;

    #[test]
    fn every_bound_uses_its_own_setter() {
        let desc = AttributeDescriptor::builder("gain")
            .with_data_type(DataType::Float)
            .with_min(-1.0)
            .with_max(8.0)
            .with_soft_min(0.0)
            .with_soft_max(4.0)
            .build()
            .unwrap();
        let attr = AttributeBuilder::build(&desc).unwrap();
        assert_eq!(attr.min(), Some(&PlugValue::Float(-1.0)));
        assert_eq!(attr.max(), Some(&PlugValue::Float(8.0)));
        assert_eq!(attr.soft_min(), Some(&PlugValue::Float(0.0)));
        assert_eq!(attr.soft_max(), Some(&PlugValue::Float(4.0)));
    }

    #[test]
    fn color_routine_builds_children() {
        let desc = AttributeDescriptor::builder("tint")
            .with_short_name("tn")
            .with_data_type(DataType::Color)
            .with_default([1.0, 0.5, 0.0])
            .with_keyable(true)
            .build()
            .unwrap();
        assert_eq!(ConstructionRoutine::for_descriptor(&desc), ConstructionRoutine::Color);
        let attr = AttributeBuilder::build(&desc).unwrap();
        let names: Vec<_> = attr.children().iter().map(|c| c.long_name()).collect();
        assert_eq!(names, ["tintR", "tintG", "tintB"]);
        assert_eq!(attr.default_value(), Some(&PlugValue::Double3([1.0, 0.5, 0.0])));
        assert!(attr.flags().contains(AttributeFlags::KEYABLE));
    }

    #[test]
    fn float3_uses_point_routine() {
        let desc = AttributeDescriptor::builder("offset")
            .with_data_type(DataType::Float3)
            .with_default([0.0; 3])
            .build()
            .unwrap();
        assert_eq!(ConstructionRoutine::for_descriptor(&desc), ConstructionRoutine::Point);
        let attr = AttributeBuilder::build(&desc).unwrap();
        assert_eq!(attr.children().len(), 3);
    }

    #[test]
    fn enum_fields_and_default() {
        let desc = AttributeDescriptor::builder("light")
            .with_enum_names("yellow=0:red=10:blue=100")
            .with_default("red")
            .build()
            .unwrap();
        let attr = AttributeBuilder::build(&desc).unwrap();
        assert_eq!(attr.enum_fields().len(), 3);
        assert_eq!(attr.default_value(), Some(&PlugValue::Int(10)));
    }

    #[test]
    fn string_flags_and_default() {
        let desc = AttributeDescriptor::builder("cachePath")
            .with_default("/tmp/cache")
            .with_filename(true)
            .with_multi(true)
            .build()
            .unwrap();
        let attr = AttributeBuilder::build(&desc).unwrap();
        assert!(attr.flags().contains(AttributeFlags::USED_AS_FILENAME | AttributeFlags::ARRAY));
        assert_eq!(attr.default_value().and_then(PlugValue::as_str), Some("/tmp/cache"));
    }

    #[test]
    fn compound_starts_empty() {
        let desc = AttributeDescriptor::builder("settings")
            .with_children_count(2)
            .build()
            .unwrap();
        let attr = AttributeBuilder::build(&desc).unwrap();
        assert!(attr.children().is_empty());
        assert_eq!(attr.category(), AttrCategory::Compound);
    }
}
