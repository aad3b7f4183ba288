//! End-to-end lifecycle scenarios across registries and the context.

use std::sync::Arc;

use rivet_hal::prelude::*;

#[derive(Debug, Default)]
struct Encoder {
    distance_per_pulse: f64,
}

/// Test the capacity-four encoder scenario: exhaust, free, reuse.
#[test]
fn encoder_slot_reuse_bumps_version() {
    let hal = HalContext::new();
    let encoders = hal
        .register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder))
        .unwrap();

    let handles: Vec<_> = (0..4).map(|_| encoders.allocate()).collect();
    assert!(handles.iter().all(|handle| handle.is_valid()));
    assert_eq!(encoders.allocate(), INVALID_HANDLE);

    let h1 = handles[1];
    encoders.free(h1);

    let reused = encoders.allocate();
    let decoded = reused.decode().unwrap();
    assert_eq!(decoded.index, 1);
    assert_eq!(decoded.version, h1.decode().unwrap().version.wrapping_add(1));

    assert!(encoders.get(h1).is_none());
    assert!(encoders.get(reused).is_some());
}

/// Test that capacity is never permanently consumed by frees.
#[test]
fn capacity_recovers_after_free() {
    let encoders = LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder);
    for _ in 0..10 {
        let handles: Vec<_> = (0..4).map(|_| encoders.allocate()).collect();
        assert_eq!(encoders.allocate(), INVALID_HANDLE);
        for handle in handles {
            encoders.free(handle);
        }
    }
    assert_eq!(encoders.allocated_count(), 0);
}

/// Test that a simulation restart makes every pre-reset handle stale even after reuse.
#[test]
fn context_reset_invalidates_across_registries() {
    let hal = HalContext::new();
    let encoders = hal
        .register(LimitedHandleResource::<Encoder, 2>::new(HandleType::Encoder))
        .unwrap();
    let vendor = hal
        .register(UnlimitedHandleResource::<String>::new(HandleType::Vendor))
        .unwrap();

    let encoder = encoders.allocate_with(|| Encoder {
        distance_per_pulse: 0.05,
    });
    let device = vendor.allocate(Arc::new("navx".to_owned()));
    assert_eq!(encoders.get(encoder).unwrap().distance_per_pulse, 0.05);

    hal.reset_all();

    // Same slots come straight back, under new versions.
    let encoder_again = encoders.allocate();
    let device_again = vendor.allocate(Arc::new("pigeon".to_owned()));
    assert_eq!(encoder_again.decode().unwrap().index, encoder.decode().unwrap().index);
    assert_eq!(device_again.decode().unwrap().index, device.decode().unwrap().index);

    assert!(encoders.get(encoder).is_none());
    assert!(vendor.get(device).is_none());
    assert_eq!(vendor.get(device_again).unwrap().as_str(), "pigeon");
}

/// Test that handles never cross registries of different types.
#[test]
fn handles_are_scoped_to_their_registry() {
    let hal = HalContext::new();
    let encoders = hal
        .register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Encoder))
        .unwrap();
    let counters = hal
        .register(LimitedHandleResource::<Encoder, 4>::new(HandleType::Counter))
        .unwrap();

    let encoder = encoders.allocate();
    let counter = counters.allocate();

    assert!(counters.get(encoder).is_none());
    assert!(encoders.get(counter).is_none());

    // Freeing through the wrong registry is a no-op.
    counters.free(encoder);
    assert!(encoders.get(encoder).is_some());
}
