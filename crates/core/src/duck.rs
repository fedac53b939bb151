//! Duck typing contracts.
//!
//! A duck type is a partial schema that unrelated resource kinds embed to
//! share semantics. These traits mirror the knative `duck` and `apis`
//! interfaces that vendored contracts implement.

/// A duck type fragment that knows its full resource shape.
pub trait Implementable {
    type Full: Populatable;

    /// Empty instance of the resource shape that embeds this fragment.
    fn full_type(&self) -> Self::Full;
}

/// A resource shape that can fill every field with sample data, used to
/// check that a duck type round-trips through an implementer's schema.
pub trait Populatable {
    fn populate(&mut self);
}

/// A resource shape with a list counterpart.
pub trait Listable {
    type List;

    fn list_type(&self) -> Self::List;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The source already is the newest version; there is nothing to convert to.
    #[error("v1 is the highest known version, got: {got}")]
    HighestKnownVersion { got: &'static str },
}

/// Conversion between API versions of the same type.
///
/// Implementations must leave both sides untouched when they fail.
pub trait Convertible {
    fn convert_to(&self, to: &mut dyn Convertible) -> Result<(), ConversionError>;

    fn convert_from(&mut self, from: &dyn Convertible) -> Result<(), ConversionError>;

    /// Fully qualified type name, used in conversion errors.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
