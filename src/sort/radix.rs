//! LSD radix sort over 8-bit digits. Keys are mapped to an order-preserving
//! unsigned bit pattern first: signed integers get their sign bit flipped,
//! `f64` gets the IEEE-754 "flip all bits if negative, flip just the sign
//! bit if positive" transform so NaN (our float NULL) sorts first in key
//! order — matching spec.md's NaN-sorts-first rule.

use crate::types::null::{f64_is_null, i64_is_null};

fn i64_sort_key(v: i64) -> u64 {
    (v as u64) ^ 0x8000_0000_0000_0000
}

fn f64_sort_key(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000_0000_0000
    }
}

fn radix_pass(keys: &[(u64, u32)], shift: u32) -> Vec<(u64, u32)> {
    let mut counts = [0u32; 257];
    for (k, _) in keys {
        let digit = ((k >> shift) & 0xff) as usize;
        counts[digit + 1] += 1;
    }
    for i in 1..257 {
        counts[i] += counts[i - 1];
    }
    let mut out = vec![(0u64, 0u32); keys.len()];
    let mut cursor = counts;
    for &(k, idx) in keys {
        let digit = ((k >> shift) & 0xff) as usize;
        out[cursor[digit] as usize] = (k, idx);
        cursor[digit] += 1;
    }
    out
}

fn radix_sort_keys(mut keys: Vec<(u64, u32)>) -> Vec<(u64, u32)> {
    for pass in 0..8 {
        keys = radix_pass(&keys, pass * 8);
    }
    keys
}

pub fn radix_sort_i64(values: &[i64], ascending: bool) -> Vec<u32> {
    let mut nulls = Vec::new();
    let mut keys: Vec<(u64, u32)> = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        if i64_is_null(v) {
            nulls.push(i as u32);
        } else {
            keys.push((i64_sort_key(v), i as u32));
        }
    }
    let sorted = radix_sort_keys(keys);
    let mut out: Vec<u32> = sorted.into_iter().map(|(_, idx)| idx).collect();
    if !ascending {
        out.reverse();
    }
    if ascending {
        let mut result = nulls;
        result.extend(out);
        result
    } else {
        out.extend(nulls);
        out
    }
}

pub fn radix_sort_f64(values: &[f64], ascending: bool) -> Vec<u32> {
    let mut nulls = Vec::new();
    let mut keys: Vec<(u64, u32)> = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        if f64_is_null(v) {
            nulls.push(i as u32);
        } else {
            keys.push((f64_sort_key(v), i as u32));
        }
    }
    let sorted = radix_sort_keys(keys);
    let mut out: Vec<u32> = sorted.into_iter().map(|(_, idx)| idx).collect();
    if !ascending {
        out.reverse();
    }
    if ascending {
        let mut result = nulls;
        result.extend(out);
        result
    } else {
        out.extend(nulls);
        out
    }
}
