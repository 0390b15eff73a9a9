use std::sync::Arc;

use crate::registry::{TypeRegistry, TypeTraitEncode};
use crate::value::{Null, TypeRef, Value};

// -----------------------------------------------------------------------------
// ValuePredicate

/// A shared predicate deciding whether a value should be suppressed.
///
/// Returns `true` when the value should be omitted from the output.
pub type ValuePredicate = Arc<dyn Fn(&dyn Value) -> bool + Send + Sync>;

// -----------------------------------------------------------------------------
// Inclusion

/// An annotation-level content-inclusion override.
///
/// This is the vocabulary a usage site (or a type registration, or the
/// global configuration) speaks; contextualization maps it to the effective
/// [`SuppressRule`] exactly once, so traversal never re-derives policy.
#[derive(Clone)]
pub enum Inclusion {
    /// Write every element.
    Always,
    /// Omit null elements.
    NonNull,
    /// Omit absent elements. Absence collapses to null at this layer, so
    /// this behaves as [`NonNull`](Inclusion::NonNull).
    NonAbsent,
    /// Omit null and empty elements.
    NonEmpty,
    /// Omit elements equal to the declared element type's default value.
    NonDefault,
    /// Omit elements the predicate returns `true` for.
    Custom(ValuePredicate),
}

impl core::fmt::Debug for Inclusion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::NonNull => f.write_str("NonNull"),
            Self::NonAbsent => f.write_str("NonAbsent"),
            Self::NonEmpty => f.write_str("NonEmpty"),
            Self::NonDefault => f.write_str("NonDefault"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// -----------------------------------------------------------------------------
// SuppressRule

/// The effective element suppression rule of a specialized codec.
///
/// Derived from an [`Inclusion`] during contextualization. `IfEqualsDefault`
/// carries the declared element type's default, resolved once, never per
/// element.
#[derive(Clone)]
pub enum SuppressRule {
    /// Write every element.
    Never,
    /// Omit null elements.
    IfNull,
    /// Omit null elements and elements the resolved codec reports empty.
    IfEmpty,
    /// Omit elements equal to the carried default value.
    IfEqualsDefault(Arc<dyn Value>),
    /// Omit elements the predicate returns `true` for.
    IfPredicate(ValuePredicate),
    /// Omit every element.
    Always,
}

impl SuppressRule {
    /// Whether the rule suppresses the null value.
    pub(crate) fn suppresses_null(&self) -> bool {
        match self {
            Self::Never => false,
            Self::IfNull | Self::IfEmpty | Self::Always => true,
            Self::IfEqualsDefault(default) => default.is_null(),
            Self::IfPredicate(predicate) => predicate(&Null),
        }
    }

    /// Whether the rule suppresses a non-null value.
    ///
    /// Only the content-sensitive rules inspect the value; `IfNull` never
    /// suppresses a non-null element.
    pub(crate) fn suppresses_value(&self, value: &dyn Value, codec: &TypeTraitEncode) -> bool {
        match self {
            Self::Never | Self::IfNull => false,
            Self::IfEmpty => codec.is_empty(value),
            Self::IfEqualsDefault(default) => value.partial_eq(&**default) == Some(true),
            Self::IfPredicate(predicate) => predicate(value),
            Self::Always => true,
        }
    }
}

impl PartialEq for SuppressRule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Never, Self::Never)
            | (Self::IfNull, Self::IfNull)
            | (Self::IfEmpty, Self::IfEmpty)
            | (Self::Always, Self::Always) => true,
            (Self::IfEqualsDefault(a), Self::IfEqualsDefault(b)) => {
                a.partial_eq(&**b) == Some(true)
            }
            (Self::IfPredicate(a), Self::IfPredicate(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl core::fmt::Debug for SuppressRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Never => f.write_str("Never"),
            Self::IfNull => f.write_str("IfNull"),
            Self::IfEmpty => f.write_str("IfEmpty"),
            Self::IfEqualsDefault(default) => {
                write!(f, "IfEqualsDefault(`{}`)", default.type_path())
            }
            Self::IfPredicate(_) => f.write_str("IfPredicate(..)"),
            Self::Always => f.write_str("Always"),
        }
    }
}

// -----------------------------------------------------------------------------
// Inclusion resolution

/// Maps an inclusion override to the effective suppression rule for the
/// declared element type.
///
/// `NonDefault` resolves the declared type's default value here, once. A
/// declared type without a registered default (containers, reference-shaped
/// values) degenerates to the `IfEmpty` rule: no meaningful scalar default
/// exists for it.
pub(crate) fn rule_for(
    inclusion: &Inclusion,
    elem_type: Option<TypeRef>,
    registry: &TypeRegistry,
) -> SuppressRule {
    match inclusion {
        Inclusion::Always => SuppressRule::Never,
        Inclusion::NonNull | Inclusion::NonAbsent => SuppressRule::IfNull,
        Inclusion::NonEmpty => SuppressRule::IfEmpty,
        Inclusion::NonDefault => {
            let default = elem_type.and_then(|ty| registry.default_value(ty.id()));
            match default {
                Some(default) => SuppressRule::IfEqualsDefault(Arc::from(default)),
                None => SuppressRule::IfEmpty,
            }
        }
        Inclusion::Custom(predicate) => SuppressRule::IfPredicate(predicate.clone()),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Inclusion, SuppressRule, rule_for};
    use crate::registry::{TypeRegistry, TypeTraitEncode};
    use crate::value::{Null, TypeRef, Value};

    #[test]
    fn mapping_table() {
        let registry = TypeRegistry::new();
        let elem = Some(TypeRef::of::<i32>());

        assert_eq!(
            rule_for(&Inclusion::Always, elem, &registry),
            SuppressRule::Never,
        );
        assert_eq!(
            rule_for(&Inclusion::NonNull, elem, &registry),
            SuppressRule::IfNull,
        );
        assert_eq!(
            rule_for(&Inclusion::NonAbsent, elem, &registry),
            SuppressRule::IfNull,
        );
        assert_eq!(
            rule_for(&Inclusion::NonEmpty, elem, &registry),
            SuppressRule::IfEmpty,
        );
    }

    #[test]
    fn non_default_resolves_the_default_once() {
        let registry = TypeRegistry::new();
        let rule = rule_for(&Inclusion::NonDefault, Some(TypeRef::of::<i32>()), &registry);

        let codec = TypeTraitEncode::of::<i32>();
        assert!(rule.suppresses_value(&0_i32, &codec));
        assert!(!rule.suppresses_value(&5_i32, &codec));
    }

    #[test]
    fn non_default_without_a_default_degenerates_to_if_empty() {
        let registry = TypeRegistry::new();
        // `char` has no registered default.
        let rule = rule_for(
            &Inclusion::NonDefault,
            Some(TypeRef::of::<char>()),
            &registry,
        );
        assert_eq!(rule, SuppressRule::IfEmpty);
    }

    #[test]
    fn null_handling_per_rule() {
        assert!(!SuppressRule::Never.suppresses_null());
        assert!(SuppressRule::IfNull.suppresses_null());
        assert!(SuppressRule::IfEmpty.suppresses_null());
        assert!(SuppressRule::Always.suppresses_null());

        let default_null = SuppressRule::IfEqualsDefault(Arc::new(Null));
        assert!(default_null.suppresses_null());
        let default_zero = SuppressRule::IfEqualsDefault(Arc::new(0_i32));
        assert!(!default_zero.suppresses_null());
    }

    #[test]
    fn predicate_identity_equality() {
        let predicate: super::ValuePredicate = Arc::new(|value: &dyn Value| value.is_null());
        let a = SuppressRule::IfPredicate(predicate.clone());
        let b = SuppressRule::IfPredicate(predicate);
        let c = SuppressRule::IfPredicate(Arc::new(|value: &dyn Value| value.is_null()));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
