//! # View Descriptors
//!
//! The resolved argument list of one query: which component types it
//! touches, how, and in what role. Built explicitly through
//! [`ViewDescriptorBuilder`] or derived from a fetch tuple with
//! [`ViewDescriptor::of`]; the dispatcher never looks at the callback.

use std::any::{type_name, TypeId};

use super::fetch::Query;
use crate::error::{StrataError, StrataResult};

/// How an argument touches its data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Access {
    /// Shared access.
    Read,
    /// Exclusive access.
    Write,
}

/// Role of an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// Per-id component value; contributes its presence set.
    Element,
    /// Presence set only, no value.
    Filter,
    /// Shared value injected into every call.
    Constant,
    /// The identifier itself.
    Index,
}

/// One resolved argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgSpec {
    /// Component or resource type.
    pub type_id: TypeId,
    /// Name of the type, for diagnostics.
    pub type_name: &'static str,
    /// Requested access.
    pub access: Access,
    /// Argument role.
    pub kind: ArgKind,
    /// False when the backing storage keeps no values.
    pub stores_values: bool,
}

impl ArgSpec {
    /// Per-id component argument.
    #[must_use]
    pub fn element<T: 'static>(access: Access, stores_values: bool) -> Self {
        Self::new::<T>(access, ArgKind::Element, stores_values)
    }

    /// Presence-only argument.
    #[must_use]
    pub fn filter<T: 'static>() -> Self {
        Self::new::<T>(Access::Read, ArgKind::Filter, true)
    }

    /// Injected shared value.
    #[must_use]
    pub fn constant<T: 'static>(access: Access) -> Self {
        Self::new::<T>(access, ArgKind::Constant, true)
    }

    /// The identifier.
    #[must_use]
    pub fn index() -> Self {
        Self::new::<u32>(Access::Read, ArgKind::Index, true)
    }

    fn new<T: 'static>(access: Access, kind: ArgKind, stores_values: bool) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            access,
            kind,
            stores_values,
        }
    }

    /// Component presence, resources and the identifier are separate slots
    /// even when they share a type.
    fn same_slot(&self, other: &Self) -> bool {
        let presence = |kind| matches!(kind, ArgKind::Element | ArgKind::Filter);
        self.type_id == other.type_id
            && (self.kind == other.kind || (presence(self.kind) && presence(other.kind)))
    }

    fn touches_data(&self) -> bool {
        matches!(self.kind, ArgKind::Element | ArgKind::Constant)
    }
}

/// A validated argument list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewDescriptor {
    args: Vec<ArgSpec>,
}

/// Builder for [`ViewDescriptor`].
///
/// # Example
///
/// ```rust
/// use strata_core::query::ViewDescriptor;
///
/// struct Position;
/// struct Velocity;
///
/// let view = ViewDescriptor::builder()
///     .write::<Position>()
///     .read::<Velocity>()
///     .read::<Position>()
///     .index()
///     .build()
///     .unwrap();
/// assert_eq!(view.args().len(), 3);
/// assert_eq!(view.filter_count(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ViewDescriptorBuilder {
    args: Vec<ArgSpec>,
}

impl ViewDescriptorBuilder {
    /// Adds a resolved argument.
    #[must_use]
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Adds a read of component `T`.
    #[must_use]
    pub fn read<T: 'static>(self) -> Self {
        self.arg(ArgSpec::element::<T>(Access::Read, true))
    }

    /// Adds a write of component `T`.
    #[must_use]
    pub fn write<T: 'static>(self) -> Self {
        self.arg(ArgSpec::element::<T>(Access::Write, true))
    }

    /// Requires component `T` without reading it.
    #[must_use]
    pub fn with<T: 'static>(self) -> Self {
        self.arg(ArgSpec::filter::<T>())
    }

    /// Injects resource `T`.
    #[must_use]
    pub fn constant<T: 'static>(self) -> Self {
        self.arg(ArgSpec::constant::<T>(Access::Read))
    }

    /// Passes the identifier.
    #[must_use]
    pub fn index(self) -> Self {
        self.arg(ArgSpec::index())
    }

    /// Merges duplicates and validates.
    ///
    /// Repeated component types collapse into one argument whose access is
    /// the strongest requested and whose kind is `Element` if any mention
    /// was. A resource never merges with a component of the same type.
    ///
    /// # Errors
    ///
    /// - [`StrataError::Placeholder`] when a value is requested from a
    ///   storage that keeps none
    /// - [`StrataError::UnfilteredIndex`] when the identifier is requested
    ///   without any presence set to drive it
    pub fn build(self) -> StrataResult<ViewDescriptor> {
        let mut merged: Vec<ArgSpec> = Vec::with_capacity(self.args.len());
        for arg in self.args {
            if arg.kind == ArgKind::Element && !arg.stores_values {
                return Err(StrataError::Placeholder {
                    component: arg.type_name,
                });
            }
            match merged.iter_mut().find(|known| known.same_slot(&arg)) {
                Some(known) => {
                    known.access = known.access.max(arg.access);
                    if arg.kind == ArgKind::Element {
                        known.kind = ArgKind::Element;
                    }
                }
                None => merged.push(arg),
            }
        }

        let view = ViewDescriptor { args: merged };
        if view.has_index() && view.filter_count() == 0 {
            return Err(StrataError::UnfilteredIndex);
        }
        Ok(view)
    }
}

impl ViewDescriptor {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> ViewDescriptorBuilder {
        ViewDescriptorBuilder::default()
    }

    /// Descriptor of fetch tuple `Q`.
    ///
    /// # Errors
    ///
    /// See [`ViewDescriptorBuilder::build`].
    pub fn of<Q: Query>() -> StrataResult<Self> {
        let mut args = Vec::new();
        Q::describe(&mut args);
        args.into_iter()
            .fold(Self::builder(), ViewDescriptorBuilder::arg)
            .build()
    }

    /// Merged arguments in first-mention order.
    #[must_use]
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Arguments contributing a presence set.
    #[must_use]
    pub fn filter_count(&self) -> usize {
        self.args
            .iter()
            .filter(|arg| matches!(arg.kind, ArgKind::Element | ArgKind::Filter))
            .count()
    }

    /// True when the identifier is requested.
    #[must_use]
    pub fn has_index(&self) -> bool {
        self.args.iter().any(|arg| arg.kind == ArgKind::Index)
    }

    /// True when the two views cannot run at the same time: both touch one
    /// type's data and at least one writes it.
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.args.iter().filter(|a| a.touches_data()).any(|a| {
            other
                .args
                .iter()
                .filter(|b| b.touches_data())
                .any(|b| a.same_slot(b) && (a.access == Access::Write || b.access == Access::Write))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    struct Velocity;
    struct Gravity;

    #[test]
    fn test_duplicates_merge_write_wins() {
        let view = ViewDescriptor::builder()
            .read::<Position>()
            .with::<Position>()
            .write::<Position>()
            .build()
            .unwrap();
        assert_eq!(view.args().len(), 1);
        assert_eq!(view.args()[0].access, Access::Write);
        assert_eq!(view.args()[0].kind, ArgKind::Element);
    }

    #[test]
    fn test_resource_and_component_of_one_type_stay_apart() {
        let view = ViewDescriptor::builder()
            .constant::<Gravity>()
            .with::<Gravity>()
            .index()
            .build()
            .unwrap();
        assert_eq!(view.args().len(), 3);
        assert_eq!(view.filter_count(), 1);
        assert_eq!(view.args()[0].kind, ArgKind::Constant);

        let reads_resource = ViewDescriptor::builder().constant::<Gravity>().build().unwrap();
        let writes_component = ViewDescriptor::builder().write::<Gravity>().build().unwrap();
        assert!(!reads_resource.conflicts_with(&writes_component));
    }

    #[test]
    fn test_index_needs_filter() {
        assert_eq!(
            ViewDescriptor::builder().index().build(),
            Err(StrataError::UnfilteredIndex)
        );
        assert_eq!(
            ViewDescriptor::builder().constant::<Gravity>().index().build(),
            Err(StrataError::UnfilteredIndex)
        );
        assert!(ViewDescriptor::builder()
            .with::<Velocity>()
            .index()
            .build()
            .is_ok());
    }

    #[test]
    fn test_placeholder_read_rejected() {
        let err = ViewDescriptor::builder()
            .arg(ArgSpec::element::<Position>(Access::Read, false))
            .build()
            .unwrap_err();
        assert!(matches!(err, StrataError::Placeholder { .. }));
    }

    #[test]
    fn test_conflicts() {
        let mover = ViewDescriptor::builder()
            .write::<Position>()
            .read::<Velocity>()
            .build()
            .unwrap();
        let reader = ViewDescriptor::builder().read::<Position>().build().unwrap();
        let filter = ViewDescriptor::builder().with::<Position>().build().unwrap();
        let other = ViewDescriptor::builder().read::<Velocity>().build().unwrap();

        assert!(mover.conflicts_with(&reader));
        assert!(reader.conflicts_with(&mover));
        assert!(!mover.conflicts_with(&filter));
        assert!(!mover.conflicts_with(&other));
    }
}
