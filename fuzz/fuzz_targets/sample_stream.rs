#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate summary_quantiles;
extern crate byteorder;

use std::io::Cursor;
use std::sync::Arc;
use byteorder::{BigEndian, ReadBytesExt};
use summary_quantiles::ckms::SampleStream;
use summary_quantiles::invariant::Invariant;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);

    // unbounded, the invariant takes whatever epsilon it is given
    let error: f64 = if let Ok(res) = cursor.read_f64::<BigEndian>() {
        res
    } else {
        return;
    };
    let selector: u8 = if let Ok(res) = cursor.read_u8() {
        res
    } else {
        return;
    };
    let invariant = match selector % 3 {
        0 => Invariant::LowBiased(error),
        1 => Invariant::HighBiased(error),
        _ => Invariant::Targeted(vec![]),
    };

    let mut stream = SampleStream::new(Arc::new(invariant));
    let mut batch = Vec::new();
    while let Ok(v) = cursor.read_f64::<BigEndian>() {
        if v.is_nan() {
            continue;
        }
        batch.push(v);
        if batch.len() == 64 {
            batch.sort_by(|a, b| a.partial_cmp(b).unwrap());
            stream.insert_sorted(&batch);
            batch.clear();
        }
    }
    batch.sort_by(|a, b| a.partial_cmp(b).unwrap());
    stream.insert_sorted(&batch);

    let g_sum: u64 = stream.iter().map(|e| e.g).sum();
    assert_eq!(g_sum, stream.count());
    for q in &[0.0, 0.5, 0.99, 1.0] {
        let _ = stream.query(*q);
    }
});
