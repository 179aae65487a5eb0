//! Type classification of scene objects and attributes.

use bitflags::bitflags;

bitflags! {
    /// Function sets an object is compatible with.
    ///
    /// An object reports every set it supports, so a joint is also a
    /// transform, a dag node and a dependency node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FnSet: u32 {
        const DEPENDENCY_NODE = 1 << 0;
        const DAG_NODE = 1 << 1;
        const TRANSFORM = 1 << 2;
        const JOINT = 1 << 3;
        const SHAPE = 1 << 4;
        const SET = 1 << 5;
        const ATTRIBUTE = 1 << 8;
        const NUMERIC = 1 << 9;
        const UNIT = 1 << 10;
        const COMPOUND = 1 << 11;
        const ENUM = 1 << 12;
        const TYPED = 1 << 13;
        const MATRIX = 1 << 14;
        const MESSAGE = 1 << 15;
        const COMPONENT = 1 << 20;
    }
}

/// Broad category of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrCategory {
    Numeric,
    Unit,
    String,
    Enum,
    Matrix,
    Message,
    Compound,
}

impl AttrCategory {
    /// Function set flag for attributes of this category.
    pub fn fn_set(self) -> FnSet {
        FnSet::ATTRIBUTE
            | match self {
                Self::Numeric => FnSet::NUMERIC,
                Self::Unit => FnSet::UNIT,
                Self::String => FnSet::TYPED,
                Self::Enum => FnSet::ENUM,
                Self::Matrix => FnSet::MATRIX,
                Self::Message => FnSet::MESSAGE,
                Self::Compound => FnSet::COMPOUND,
            }
    }

    /// Whether min/max bounds make sense for this category.
    pub fn supports_bounds(self) -> bool {
        matches!(self, Self::Numeric | Self::Unit)
    }
}

/// Value type carried by an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Distance,
    Angle,
    Time,
    Bool,
    Float,
    Int,
    Float2,
    Float3,
    Float4,
    Int2,
    Int3,
    Point,
    Color,
    String,
    Matrix,
    Enum,
    Message,
}

impl DataType {
    /// Category an attribute of this type belongs to.
    pub fn category(self) -> AttrCategory {
        match self {
            Self::Distance | Self::Angle | Self::Time => AttrCategory::Unit,
            Self::Bool
            | Self::Float
            | Self::Int
            | Self::Float2
            | Self::Float3
            | Self::Float4
            | Self::Int2
            | Self::Int3
            | Self::Point
            | Self::Color => AttrCategory::Numeric,
            Self::String => AttrCategory::String,
            Self::Matrix => AttrCategory::Matrix,
            Self::Enum => AttrCategory::Enum,
            Self::Message => AttrCategory::Message,
        }
    }

    /// Number of scalar components in a value of this type.
    pub fn arity(self) -> usize {
        match self {
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 | Self::Point | Self::Color => 3,
            Self::Float4 => 4,
            Self::Matrix => 16,
            _ => 1,
        }
    }

    /// Numeric types with more than one component.
    pub fn is_vector(self) -> bool {
        self.category() == AttrCategory::Numeric && self.arity() > 1
    }

    /// Types built through a dedicated colour or point routine.
    pub fn is_triple(self) -> bool {
        matches!(self, Self::Color | Self::Point | Self::Float3)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DataType::Distance, AttrCategory::Unit)]
    #[case(DataType::Time, AttrCategory::Unit)]
    #[case(DataType::Bool, AttrCategory::Numeric)]
    #[case(DataType::Color, AttrCategory::Numeric)]
    #[case(DataType::String, AttrCategory::String)]
    #[case(DataType::Enum, AttrCategory::Enum)]
    #[case(DataType::Message, AttrCategory::Message)]
    fn category_inference(#[case] data_type: DataType, #[case] expected: AttrCategory) {
        assert_eq!(data_type.category(), expected);
    }

    #[test]
    fn vector_types() {
        assert!(DataType::Float3.is_vector());
        assert!(DataType::Int2.is_vector());
        assert!(!DataType::Float.is_vector());
        assert!(!DataType::Matrix.is_vector());
        assert_eq!(DataType::Float4.arity(), 4);
    }

    #[test]
    fn attribute_fn_sets() {
        assert!(AttrCategory::Enum.fn_set().contains(FnSet::ATTRIBUTE | FnSet::ENUM));
        assert!(!AttrCategory::Unit.fn_set().contains(FnSet::NUMERIC));
    }
}
