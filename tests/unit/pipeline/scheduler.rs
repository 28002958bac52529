use super::*;

#[test]
fn zero_threads_is_rejected() {
    assert!(build_thread_pool(Some(0)).is_err());
    let pool = build_thread_pool(Some(2)).unwrap();
    assert_eq!(pool.current_num_threads(), 2);
}

#[test]
fn workers_are_named() {
    let pool = build_thread_pool(Some(1)).unwrap();
    let name = pool.install(|| std::thread::current().name().map(str::to_owned));
    assert_eq!(name.as_deref(), Some("enhance-worker-0"));
}

#[test]
fn sequential_and_parallel_results_agree() {
    let parallel = Scheduler::new(&ThreadingConfig {
        parallel: true,
        threads: Some(4),
    })
    .unwrap();
    let sequential = Scheduler::new(&ThreadingConfig {
        parallel: false,
        threads: None,
    })
    .unwrap();
    assert!(sequential.pool().is_none());
    assert_eq!(sequential.threads(), 1);
    assert_eq!(parallel.threads(), 4);

    let work = |scratch: &mut Vec<u64>, unit: u64| -> EnhanceResult<u64> {
        scratch.clear();
        scratch.extend((0..unit).map(|v| v * v));
        Ok(scratch.iter().sum())
    };
    let a = parallel.run("squares", (0..200).collect(), Vec::new, work).unwrap();
    let b = sequential.run("squares", (0..200).collect(), Vec::new, work).unwrap();
    assert_eq!(a, b);
    assert_eq!(a[3], 5);
}

#[test]
fn failures_are_aggregated_after_every_unit_runs() {
    let scheduler = Scheduler::new(&ThreadingConfig {
        parallel: true,
        threads: Some(3),
    })
    .unwrap();
    let ran = std::sync::atomic::AtomicUsize::new(0);
    let err = scheduler
        .run(
            "odd",
            (0..10).collect::<Vec<u32>>(),
            || (),
            |_, unit| {
                ran.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                if unit % 2 == 1 {
                    Err(EnhanceError::validation(format!("unit {unit}")))
                } else {
                    Ok(unit)
                }
            },
        )
        .unwrap_err();
    assert_eq!(ran.load(std::sync::atomic::Ordering::Relaxed), 10);
    let msg = err.to_string();
    assert!(matches!(err, EnhanceError::Decode(_)));
    assert!(msg.contains("odd: 5 of 10 units failed"), "{msg}");
}
