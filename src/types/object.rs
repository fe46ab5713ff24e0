//! The tagged object model: a closed `ObjData` sum type wrapped in a
//! manually reference-counted handle, `ObjRef`.
//!
//! `ObjRef` does not use `std::rc::Rc`/`std::sync::Arc` because the
//! refcounting discipline is a VM-level policy knob (`rc_sync`), not a
//! per-type choice: a single VM running without worker-pool fan-out can use
//! plain relaxed increments/decrements, while one sharing objects across a
//! pool batch needs fenced atomics. The refcount itself is always an
//! `AtomicU32` (a single object layout for both regimes, since duplicating
//! the type per regime isn't expressible without unsafe specialization);
//! `rc_sync` only picks the memory ordering used to touch it. See
//! `DESIGN.md` for the record of this Open-Question resolution.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::common::error::{RayError, RayResult};
use crate::types::element::ElementKind;
use crate::types::symbol::SymbolId;

pub type Guid = [u8; 16];

/// Attribute bits carried in the object header: sortedness and uniqueness
/// hints used by sort/group-by/join fast paths, plus the partitioned-table
/// marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttrBits(pub u8);

impl AttrBits {
    pub const NONE: AttrBits = AttrBits(0);
    pub const ASC: AttrBits = AttrBits(1 << 0);
    pub const DESC: AttrBits = AttrBits(1 << 1);
    pub const DISTINCT: AttrBits = AttrBits(1 << 2);
    pub const PARTED: AttrBits = AttrBits(1 << 3);

    pub fn has(self, bit: AttrBits) -> bool {
        self.0 & bit.0 != 0
    }

    pub fn with(self, bit: AttrBits) -> AttrBits {
        AttrBits(self.0 | bit.0)
    }

    pub fn without(self, bit: AttrBits) -> AttrBits {
        AttrBits(self.0 & !bit.0)
    }
}

/// The closed payload union. Scalars are represented as length-1 vectors of
/// the matching kind, so there's a single vector path per primitive type
/// rather than a separate scalar variant.
pub enum ObjData {
    I64(Vec<i64>),
    I32(Vec<i32>),
    F64(Vec<f64>),
    U8(Vec<u8>),
    B8(Vec<u8>),
    C8(Vec<u8>),
    Symbol(Vec<SymbolId>),
    Timestamp(Vec<i64>),
    Date(Vec<i32>),
    Time(Vec<i32>),
    Guid(Vec<Guid>),
    List(Vec<ObjRef>),
    Dict { keys: ObjRef, values: ObjRef },
    Table { columns: Vec<(String, ObjRef)> },
    /// Partitioned table: one `Table` `ObjRef` per partition plus the
    /// partition key column values (parallel arrays).
    Parted {
        partition_keys: Vec<i64>,
        partitions: Vec<ObjRef>,
    },
    /// Lazy `MAP-COMMON` virtual column: a partition value repeated
    /// `counts[i]` times, expanded only on `filter_collect`.
    MapCommon { values: ObjRef, counts: Vec<u32> },
    /// Lazy `MAP-FILTER`: an unevaluated `where` over a base table.
    MapFilter { base: ObjRef, predicate_col: String },
    /// Lazy `MAP-GROUP`: an unevaluated `by`-group over a base table.
    MapGroup { base: ObjRef, by_cols: Vec<String> },
    Error(RayError),
    /// Closure stub: the evaluator is out of scope, so a closure just
    /// records its captured environment dict for the `Evaluator` trait to
    /// interpret.
    Closure { captures: ObjRef, body_symbol: SymbolId },
}

impl ObjData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ObjData::I64(_) => ElementKind::I64,
            ObjData::I32(_) => ElementKind::I32,
            ObjData::F64(_) => ElementKind::F64,
            ObjData::U8(_) => ElementKind::U8,
            ObjData::B8(_) => ElementKind::B8,
            ObjData::C8(_) => ElementKind::C8,
            ObjData::Symbol(_) => ElementKind::Symbol,
            ObjData::Timestamp(_) => ElementKind::Timestamp,
            ObjData::Date(_) => ElementKind::Date,
            ObjData::Time(_) => ElementKind::Time,
            ObjData::Guid(_) => ElementKind::Guid,
            ObjData::List(_) => ElementKind::List,
            ObjData::Dict { .. } => ElementKind::Dict,
            ObjData::Table { .. } => ElementKind::Table,
            ObjData::Parted { .. } => ElementKind::Parted,
            ObjData::MapCommon { .. } => ElementKind::MapCommon,
            ObjData::MapFilter { .. } => ElementKind::MapFilter,
            ObjData::MapGroup { .. } => ElementKind::MapGroup,
            ObjData::Error(_) => ElementKind::Error,
            ObjData::Closure { .. } => ElementKind::Closure,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ObjData::I64(v) => v.len(),
            ObjData::I32(v) => v.len(),
            ObjData::F64(v) => v.len(),
            ObjData::U8(v) => v.len(),
            ObjData::B8(v) => v.len(),
            ObjData::C8(v) => v.len(),
            ObjData::Symbol(v) => v.len(),
            ObjData::Timestamp(v) => v.len(),
            ObjData::Date(v) => v.len(),
            ObjData::Time(v) => v.len(),
            ObjData::Guid(v) => v.len(),
            ObjData::List(v) => v.len(),
            ObjData::Dict { keys, .. } => keys.len(),
            ObjData::Table { columns } => columns.first().map(|(_, c)| c.len()).unwrap_or(0),
            ObjData::Parted { partitions, .. } => partitions.len(),
            ObjData::MapCommon { counts, .. } => counts.iter().map(|&c| c as usize).sum(),
            ObjData::MapFilter { .. } | ObjData::MapGroup { .. } => 0,
            ObjData::Error(_) => 0,
            ObjData::Closure { .. } => 1,
        }
    }
}

struct RcBox {
    rc: AtomicU32,
    data: ObjData,
    attrs: AttrBits,
}

/// A reference-counted handle to one heap-resident object.
pub struct ObjRef {
    ptr: NonNull<RcBox>,
}

unsafe impl Send for ObjRef {}
unsafe impl Sync for ObjRef {}

impl ObjRef {
    pub fn new(data: ObjData, attrs: AttrBits) -> Self {
        let boxed = Box::new(RcBox {
            rc: AtomicU32::new(1),
            data,
            attrs,
        });
        ObjRef {
            ptr: NonNull::from(Box::leak(boxed)),
        }
    }

    fn inner(&self) -> &RcBox {
        unsafe { self.ptr.as_ref() }
    }

    pub fn kind(&self) -> ElementKind {
        self.inner().data.kind()
    }

    pub fn attrs(&self) -> AttrBits {
        self.inner().attrs
    }

    pub fn len(&self) -> usize {
        self.inner().data.len()
    }

    pub fn data(&self) -> &ObjData {
        &self.inner().data
    }

    pub fn rc(&self) -> u32 {
        self.inner().rc.load(Ordering::Relaxed)
    }

    /// `rc == 1`: this handle is the sole owner and may be mutated in place
    /// without a copy-on-write clone.
    pub fn is_unique(&self) -> bool {
        self.inner().rc.load(Ordering::Acquire) == 1
    }

    /// Bump the refcount. `rc_sync` selects `Relaxed` (single-threaded VM)
    /// vs. `AcqRel` (object may be handed across a pool batch) ordering.
    pub fn clone_ref(&self, rc_sync: bool) -> ObjRef {
        let ordering = if rc_sync { Ordering::AcqRel } else { Ordering::Relaxed };
        let prev = self.inner().rc.fetch_add(1, ordering);
        if prev == u32::MAX {
            std::process::abort();
        }
        ObjRef { ptr: self.ptr }
    }

    /// Decrement the refcount, deallocating when it reaches zero. Like
    /// `clone_ref`, `rc_sync` selects the memory ordering.
    pub fn drop_ref(self, rc_sync: bool) {
        let ordering = if rc_sync { Ordering::Release } else { Ordering::Relaxed };
        let prev = self.inner().rc.fetch_sub(1, ordering);
        if prev == 1 {
            if rc_sync {
                std::sync::atomic::fence(Ordering::Acquire);
            }
            unsafe {
                drop(Box::from_raw(self.ptr.as_ptr()));
            }
        }
        std::mem::forget(self);
    }

    /// Copy-on-write: if this handle is uniquely owned, return it unchanged;
    /// otherwise deep-clone the payload into a fresh, uniquely-owned object
    /// and drop this handle's reference.
    pub fn cow(self, rc_sync: bool) -> RayResult<ObjRef> {
        if self.is_unique() {
            return Ok(self);
        }
        let cloned_data = clone_data(&self.inner().data, rc_sync);
        let attrs = self.attrs();
        self.drop_ref(rc_sync);
        Ok(ObjRef::new(cloned_data, attrs))
    }
}

impl Drop for ObjRef {
    fn drop(&mut self) {
        let prev = self.inner().rc.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            unsafe {
                drop(Box::from_raw(self.ptr.as_ptr()));
            }
        }
    }
}

fn clone_data(data: &ObjData, rc_sync: bool) -> ObjData {
    match data {
        ObjData::I64(v) => ObjData::I64(v.clone()),
        ObjData::I32(v) => ObjData::I32(v.clone()),
        ObjData::F64(v) => ObjData::F64(v.clone()),
        ObjData::U8(v) => ObjData::U8(v.clone()),
        ObjData::B8(v) => ObjData::B8(v.clone()),
        ObjData::C8(v) => ObjData::C8(v.clone()),
        ObjData::Symbol(v) => ObjData::Symbol(v.clone()),
        ObjData::Timestamp(v) => ObjData::Timestamp(v.clone()),
        ObjData::Date(v) => ObjData::Date(v.clone()),
        ObjData::Time(v) => ObjData::Time(v.clone()),
        ObjData::Guid(v) => ObjData::Guid(v.clone()),
        ObjData::List(v) => ObjData::List(v.iter().map(|o| o.clone_ref(rc_sync)).collect()),
        ObjData::Dict { keys, values } => ObjData::Dict {
            keys: keys.clone_ref(rc_sync),
            values: values.clone_ref(rc_sync),
        },
        ObjData::Table { columns } => ObjData::Table {
            columns: columns
                .iter()
                .map(|(n, c)| (n.clone(), c.clone_ref(rc_sync)))
                .collect(),
        },
        ObjData::Parted {
            partition_keys,
            partitions,
        } => ObjData::Parted {
            partition_keys: partition_keys.clone(),
            partitions: partitions.iter().map(|p| p.clone_ref(rc_sync)).collect(),
        },
        ObjData::MapCommon { values, counts } => ObjData::MapCommon {
            values: values.clone_ref(rc_sync),
            counts: counts.clone(),
        },
        ObjData::MapFilter { base, predicate_col } => ObjData::MapFilter {
            base: base.clone_ref(rc_sync),
            predicate_col: predicate_col.clone(),
        },
        ObjData::MapGroup { base, by_cols } => ObjData::MapGroup {
            base: base.clone_ref(rc_sync),
            by_cols: by_cols.clone(),
        },
        ObjData::Error(e) => ObjData::Error(e.clone()),
        ObjData::Closure { captures, body_symbol } => ObjData::Closure {
            captures: captures.clone_ref(rc_sync),
            body_symbol: *body_symbol,
        },
    }
}
