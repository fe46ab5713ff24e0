//! The closed type tag table shared by every object header.

/// Tag identifying the kind of value an object holds. Mirrors the closed
/// type table from the data model: atoms, typed vectors, compound objects,
/// and the lazy map/parted markers used by the query driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementKind {
    Null = 0,
    I64,
    I32,
    F64,
    Symbol,
    Timestamp,
    Date,
    Time,
    U8,
    B8,
    C8,
    Guid,
    List,
    Dict,
    Table,
    PartedI64,
    Parted,
    MapCommon,
    MapFilter,
    MapGroup,
    Error,
    Closure,
}

impl ElementKind {
    /// Size in bytes of a single element of this kind, for fixed-width
    /// atomic/vector kinds. Compound kinds have no fixed element size.
    pub fn element_size(self) -> Option<usize> {
        use ElementKind::*;
        match self {
            I64 | Timestamp | Symbol => Some(8),
            I32 | Date => Some(4),
            Time => Some(4),
            F64 => Some(8),
            U8 | B8 | C8 => Some(1),
            Guid => Some(16),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ElementKind::I64
                | ElementKind::I32
                | ElementKind::F64
                | ElementKind::Timestamp
                | ElementKind::Date
                | ElementKind::Time
                | ElementKind::U8
        )
    }
}
