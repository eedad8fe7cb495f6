#![no_main]

use channel::BoundedChannel;
use libfuzzer_sys::fuzz_target;
use pipeline::{collect, IndexedVector, PipelineError, Vec3};

fuzz_target!(|data: &[u8]| {
    let Some((&len, indices)) = data.split_first() else {
        return;
    };
    let len = usize::from(len % 64);
    let indices = &indices[..indices.len().min(256)];
    let channel = BoundedChannel::with_capacity(indices.len().max(1)).unwrap();
    for &index in indices {
        let vector = Vec3::new(f32::from(index), 0.0, 0.0);
        channel
            .push(IndexedVector {
                index: usize::from(index),
                vector,
            })
            .unwrap();
    }
    channel.close();

    let outcome = collect(&channel, vec![Vec3::ZERO; len]);
    assert_eq!(outcome.stats.received, indices.len());
    assert!(outcome.stats.written <= len);
    assert_eq!(outcome.buffer.len(), len);
    if outcome.fault.is_none() {
        assert_eq!(outcome.stats.written, len);
    }
    if let Some(PipelineError::Incomplete { missing }) = outcome.fault {
        assert_eq!(missing + outcome.stats.written, len);
    }
});
