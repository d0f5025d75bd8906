//! Handle protocol suite: ordering sequences, static pools, and a seeded
//! randomized drive.

mod common;

use std::time::Duration;
use sutlab::script::ScriptedHandleSut;
use sutlab::{
    CheckError, EntryState, HandleProtocolChecker, PoolMode, ResultCode, SutHandle, WaitOutcome,
};

const WAIT: Duration = Duration::from_millis(50);

fn dynamic_pool(size: usize) -> HandleProtocolChecker<ScriptedHandleSut> {
    HandleProtocolChecker::new(ScriptedHandleSut::new(size), size, PoolMode::Dynamic)
        .expect("checker")
}

#[test]
fn acquire_acquire_wait_release_acquire_succeeds() {
    common::init_test_logging();
    let mut pool = dynamic_pool(2);
    let h1 = pool.acquire().expect("acquire 1");
    let _h2 = pool.acquire().expect("acquire 2");
    assert_eq!(pool.wait(h1, WAIT).expect("wait"), WaitOutcome::Ready);
    pool.release(h1).expect("release");
    pool.acquire().expect("acquire 3");
    assert_eq!(pool.in_flight(), 2);
}

#[test]
fn wait_on_fresh_handle_fails_call_order() {
    common::init_test_logging();
    let mut pool = dynamic_pool(2);
    let err = pool
        .wait(SutHandle::from_raw(1), WAIT)
        .expect_err("must fail");
    assert_eq!(err.classification(), Some(ResultCode::CallOrderInvalid));
}

#[test]
fn third_acquire_on_full_pool_fails_call_order() {
    common::init_test_logging();
    let mut pool = dynamic_pool(2);
    pool.acquire().expect("acquire 1");
    pool.acquire().expect("acquire 2");
    let err = pool.acquire().expect_err("must fail");
    assert_eq!(err.classification(), Some(ResultCode::CallOrderInvalid));
    // The rejection happened in the checker, before the SUT was called.
    assert_eq!(pool.sut_mut().acquire_calls(), 2);
}

#[test]
fn skipping_wait_is_rejected() {
    common::init_test_logging();
    let mut pool = dynamic_pool(1);
    let h = pool.acquire().expect("acquire");
    let err = pool.release(h).expect_err("release without wait");
    assert_eq!(err.classification(), Some(ResultCode::CallOrderInvalid));
    // Protocol state is unchanged; the legal continuation still works.
    assert_eq!(pool.wait(h, WAIT).expect("wait"), WaitOutcome::Ready);
    pool.release(h).expect("release");
}

#[test]
fn static_pool_allows_exactly_one_cycle_per_slot() {
    common::init_test_logging();
    let mut pool =
        HandleProtocolChecker::new(ScriptedHandleSut::new(2), 2, PoolMode::Static).expect("checker");
    for _ in 0..2 {
        let h = pool.acquire().expect("acquire");
        pool.wait(h, WAIT).expect("wait");
        pool.release(h).expect("release");
    }
    // Both slots retired; nothing acquirable ever again.
    let err = pool.acquire().expect_err("must fail");
    assert_eq!(err.classification(), Some(ResultCode::CallOrderInvalid));
    assert!(pool.snapshot().iter().all(|e| e.state == EntryState::Retired));
}

#[test]
fn dynamic_pool_cycles_indefinitely() {
    common::init_test_logging();
    let mut pool = dynamic_pool(2);
    for _ in 0..100 {
        let h = pool.acquire().expect("acquire");
        pool.wait(h, WAIT).expect("wait");
        pool.release(h).expect("release");
    }
    assert_eq!(pool.in_flight(), 0);
}

#[test]
fn timeout_then_retry_then_release() {
    common::init_test_logging();
    let mut pool = dynamic_pool(1);
    pool.sut_mut().time_out_next_waits(1);
    let h = pool.acquire().expect("acquire");
    assert_eq!(pool.wait(h, WAIT).expect("wait"), WaitOutcome::TimedOut);
    // Entry is still acquired: release remains illegal, retry legal.
    assert!(matches!(
        pool.release(h).expect_err("release after timeout"),
        CheckError::CallOrder { .. }
    ));
    assert_eq!(pool.wait(h, WAIT).expect("retry"), WaitOutcome::Ready);
    pool.release(h).expect("release");
}

#[test]
fn null_handle_from_successful_acquire_is_a_violation() {
    common::init_test_logging();
    let mut pool = dynamic_pool(1);
    pool.sut_mut().return_null_on_acquire();
    let err = pool.acquire().expect_err("must fail");
    assert!(matches!(err, CheckError::Protocol { .. }), "got: {err}");
}

#[test]
fn failed_release_surfaces_protocol_violation() {
    common::init_test_logging();
    let mut pool = dynamic_pool(1);
    let h = pool.acquire().expect("acquire");
    pool.wait(h, WAIT).expect("wait");
    pool.sut_mut()
        .fail_next_release_with(ResultCode::CallOrderInvalid);
    let err = pool.release(h).expect_err("must fail");
    assert!(matches!(err, CheckError::Protocol { .. }), "got: {err}");
}

#[test]
fn randomized_legal_drive_never_trips_the_checker() {
    common::init_test_logging();
    // Seeded: the same drive replays identically.
    let mut rng = fastrand::Rng::with_seed(0x5eed_cafe);
    let pool_size = 4;
    let mut pool = dynamic_pool(pool_size);
    let mut acquired: Vec<SutHandle> = Vec::new();
    let mut waited: Vec<SutHandle> = Vec::new();

    for _ in 0..2000 {
        match rng.u8(0..3) {
            0 => {
                if pool.in_flight() < pool_size {
                    let h = pool.acquire().expect("legal acquire");
                    acquired.push(h);
                }
            }
            1 => {
                if !acquired.is_empty() {
                    let h = acquired.swap_remove(rng.usize(0..acquired.len()));
                    assert_eq!(pool.wait(h, WAIT).expect("legal wait"), WaitOutcome::Ready);
                    waited.push(h);
                }
            }
            _ => {
                if !waited.is_empty() {
                    let h = waited.swap_remove(rng.usize(0..waited.len()));
                    pool.release(h).expect("legal release");
                }
            }
        }
        assert!(pool.in_flight() <= pool_size);
    }
}

#[test]
fn snapshot_reflects_entry_states() {
    common::init_test_logging();
    let mut pool = dynamic_pool(3);
    let h1 = pool.acquire().expect("acquire 1");
    let h2 = pool.acquire().expect("acquire 2");
    pool.wait(h2, WAIT).expect("wait 2");

    let snap = pool.snapshot();
    assert_eq!(snap[0].state, EntryState::Acquired);
    assert_eq!(snap[0].handle, Some(h1));
    assert_eq!(snap[1].state, EntryState::Waited);
    assert_eq!(snap[1].handle, Some(h2));
    assert_eq!(snap[2].state, EntryState::Free);
    assert_eq!(snap[2].handle, None);

    let json = serde_json::to_string(&snap).expect("serialize");
    assert!(json.contains("Waited"), "json was: {json}");
}
