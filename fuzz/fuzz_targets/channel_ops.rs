#![no_main]

use std::collections::VecDeque;

use channel::BoundedChannel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&first, ops)) = data.split_first() else {
        return;
    };
    let capacity = usize::from(first % 16) + 1;
    let channel = BoundedChannel::with_capacity(capacity).unwrap();
    let mut model = VecDeque::new();
    let mut closed = false;

    // Use input bytes to drive a bounded sequence of operations.
    for (idx, &byte) in ops.iter().take(2048).enumerate() {
        match byte % 4 {
            0 | 1 => {
                let result = channel.try_push(idx);
                if closed {
                    assert!(result.unwrap_err().is_closed());
                } else if model.len() == capacity {
                    assert!(result.unwrap_err().is_full());
                } else {
                    result.unwrap();
                    model.push_back(idx);
                }
            }
            2 => assert_eq!(channel.try_pop(), model.pop_front()),
            _ => {
                assert_eq!(channel.close(), !closed);
                closed = true;
            }
        }
        assert_eq!(channel.len(), model.len());
        assert!(channel.stats().high_water <= capacity);
    }

    channel.close();
    let drained: Vec<_> = channel.drain().collect();
    assert_eq!(drained, Vec::from(model));
});
