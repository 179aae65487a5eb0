//! Two-stage classification of scene objects by their function sets.

use std::fmt;

use plugwork_scene::FnSet;

/// Most specific wrapper type of a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    DependencyNode,
    DagNode,
    Transform,
    Joint,
    ObjectSet,
    Attribute,
    NumericAttribute,
    UnitAttribute,
    CompoundAttribute,
    EnumAttribute,
    TypedAttribute,
    MatrixAttribute,
    MessageAttribute,
    Component,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 14] = [
        Self::DependencyNode,
        Self::DagNode,
        Self::Transform,
        Self::Joint,
        Self::ObjectSet,
        Self::Attribute,
        Self::NumericAttribute,
        Self::UnitAttribute,
        Self::CompoundAttribute,
        Self::EnumAttribute,
        Self::TypedAttribute,
        Self::MatrixAttribute,
        Self::MessageAttribute,
        Self::Component,
    ];

    pub fn coarse(self) -> Coarse {
        match self {
            Self::DependencyNode
            | Self::DagNode
            | Self::Transform
            | Self::Joint
            | Self::ObjectSet => Coarse::DependencyNode,
            Self::Component => Coarse::Component,
            _ => Coarse::Attribute,
        }
    }

    pub fn is_dag(self) -> bool {
        matches!(self, Self::DagNode | Self::Transform | Self::Joint)
    }

    pub fn is_transform(self) -> bool {
        matches!(self, Self::Transform | Self::Joint)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DependencyNode => "dependency node",
            Self::DagNode => "dag node",
            Self::Transform => "transform",
            Self::Joint => "joint",
            Self::ObjectSet => "object set",
            Self::Attribute => "attribute",
            Self::NumericAttribute => "numeric attribute",
            Self::UnitAttribute => "unit attribute",
            Self::CompoundAttribute => "compound attribute",
            Self::EnumAttribute => "enum attribute",
            Self::TypedAttribute => "typed attribute",
            Self::MatrixAttribute => "matrix attribute",
            Self::MessageAttribute => "message attribute",
            Self::Component => "component",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// First classification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coarse {
    DependencyNode,
    Attribute,
    Component,
}

const COARSE_PROBES: &[(FnSet, Coarse)] = &[
    (FnSet::COMPONENT, Coarse::Component),
    (FnSet::ATTRIBUTE, Coarse::Attribute),
    (FnSet::DEPENDENCY_NODE, Coarse::DependencyNode),
];

// Most specific first.
const NODE_PROBES: &[(FnSet, ObjectKind)] = &[
    (FnSet::JOINT, ObjectKind::Joint),
    (FnSet::TRANSFORM, ObjectKind::Transform),
    (FnSet::DAG_NODE, ObjectKind::DagNode),
    (FnSet::SET, ObjectKind::ObjectSet),
    (FnSet::DEPENDENCY_NODE, ObjectKind::DependencyNode),
];

// Numeric before compound: colour and point attributes carry both.
const ATTRIBUTE_PROBES: &[(FnSet, ObjectKind)] = &[
    (FnSet::NUMERIC, ObjectKind::NumericAttribute),
    (FnSet::UNIT, ObjectKind::UnitAttribute),
    (FnSet::ENUM, ObjectKind::EnumAttribute),
    (FnSet::TYPED, ObjectKind::TypedAttribute),
    (FnSet::MATRIX, ObjectKind::MatrixAttribute),
    (FnSet::MESSAGE, ObjectKind::MessageAttribute),
    (FnSet::COMPOUND, ObjectKind::CompoundAttribute),
    (FnSet::ATTRIBUTE, ObjectKind::Attribute),
];

pub fn coarse(functions: FnSet) -> Option<Coarse> {
    probe(COARSE_PROBES, functions)
}

/// Most specific kind within a coarse category.
pub fn fine(coarse: Coarse, functions: FnSet) -> Option<ObjectKind> {
    match coarse {
        Coarse::DependencyNode => probe(NODE_PROBES, functions),
        Coarse::Attribute => probe(ATTRIBUTE_PROBES, functions),
        Coarse::Component => Some(ObjectKind::Component),
    }
}

pub fn classify(functions: FnSet) -> Option<ObjectKind> {
    coarse(functions).and_then(|c| fine(c, functions))
}

fn probe<K: Copy>(table: &[(FnSet, K)], functions: FnSet) -> Option<K> {
    table
        .iter()
        .find(|(set, _)| functions.contains(*set))
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(FnSet::DEPENDENCY_NODE, ObjectKind::DependencyNode)]
    #[case(FnSet::DEPENDENCY_NODE | FnSet::DAG_NODE | FnSet::SHAPE, ObjectKind::DagNode)]
    #[case(FnSet::DEPENDENCY_NODE | FnSet::SET, ObjectKind::ObjectSet)]
    #[case(FnSet::DEPENDENCY_NODE | FnSet::DAG_NODE | FnSet::TRANSFORM, ObjectKind::Transform)]
    #[case(
        FnSet::DEPENDENCY_NODE | FnSet::DAG_NODE | FnSet::TRANSFORM | FnSet::JOINT,
        ObjectKind::Joint
    )]
    #[case(FnSet::ATTRIBUTE | FnSet::NUMERIC | FnSet::COMPOUND, ObjectKind::NumericAttribute)]
    #[case(FnSet::ATTRIBUTE | FnSet::COMPOUND, ObjectKind::CompoundAttribute)]
    #[case(FnSet::ATTRIBUTE | FnSet::TYPED, ObjectKind::TypedAttribute)]
    #[case(FnSet::ATTRIBUTE, ObjectKind::Attribute)]
    #[case(FnSet::COMPONENT, ObjectKind::Component)]
    fn most_specific_kind_wins(#[case] functions: FnSet, #[case] expected: ObjectKind) {
        assert_eq!(classify(functions), Some(expected));
    }

    #[test]
    fn unknown_function_set() {
        assert_eq!(classify(FnSet::SHAPE), None);
        assert_eq!(classify(FnSet::empty()), None);
    }

    #[test]
    fn coarse_of_every_kind_round_trips() {
        for kind in ObjectKind::ALL {
            let coarse = kind.coarse();
            assert!(
                fine(coarse, FnSet::all()).is_some_and(|k| k.coarse() == coarse),
                "{kind}"
            );
        }
    }
}
