use proptest::prelude::*;
use tasker_resume::Offset;

/// Strategy for generating sequences of log offsets in arbitrary order
pub fn sequence_offsets_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..10_000, 1..64)
}

/// Strategy for generating partition keys
pub fn partition_strategy() -> impl Strategy<Value = (String, i32)> {
    ("[a-z][a-z0-9_]{0,15}", 0i32..32)
}

/// Strategy for generating offsets of any kind
pub fn offset_strategy() -> impl Strategy<Value = Offset> {
    prop_oneof![
        (0u64..1_000).prop_map(Offset::sequence),
        "[a-f0-9]{8}".prop_map(Offset::opaque),
    ]
}
