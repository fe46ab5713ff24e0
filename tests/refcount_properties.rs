//! Object reference counting round-trip: `clone_ref` increments, `drop_ref`
//! decrements, `cow` only deep-clones when shared, and a uniquely-owned
//! object never copies.

use rayforce::types::object::{AttrBits, ObjData};
use rayforce::ObjRef;

#[test]
fn clone_then_drop_returns_to_unique() {
    let obj = ObjRef::new(ObjData::I64(vec![1, 2, 3]), AttrBits::NONE);
    assert!(obj.is_unique());
    let clone = obj.clone_ref(true);
    assert_eq!(obj.rc(), 2);
    assert!(!obj.is_unique());
    clone.drop_ref(true);
    assert_eq!(obj.rc(), 1);
    assert!(obj.is_unique());
}

#[test]
fn cow_is_a_no_op_when_unique() {
    let obj = ObjRef::new(ObjData::I64(vec![1, 2, 3]), AttrBits::NONE);
    let original_ptr = obj.data() as *const ObjData;
    let cowed = obj.cow(true).unwrap();
    assert_eq!(original_ptr, cowed.data() as *const ObjData);
}

#[test]
fn cow_deep_clones_when_shared() {
    let obj = ObjRef::new(ObjData::I64(vec![1, 2, 3]), AttrBits::NONE);
    let shared = obj.clone_ref(true);
    assert_eq!(obj.rc(), 2);
    let cowed = shared.cow(true).unwrap();
    assert_eq!(cowed.rc(), 1);
    assert_eq!(obj.rc(), 1);
    let ObjData::I64(v) = cowed.data() else { unreachable!() };
    assert_eq!(v, &vec![1, 2, 3]);
}
