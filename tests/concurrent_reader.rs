//! Cross-thread buffer slot consistency
//!
//! A reader thread polls a node's output slot while the pipeline ticks on
//! the main thread. Every observation must be internally consistent: the
//! slot lock hands out either no buffer or a fully written one, never a
//! torn intermediate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use frameflow_core::node::{Node, NodeDriver};
use frameflow_core::params::ParamValue;
use frameflow_core::pipeline::{Pipeline, TickPolicy};
use frameflow_motion_history::MotionHistoryNode;
use frameflow_video_source::{SyntheticDecoder, VideoSourceNode};

const MIN_TICKS: u64 = 200;
// hard ceiling so a reader that never gets scheduled fails instead of hanging
const MAX_TICKS: u64 = 2_000_000;

#[test]
fn reader_thread_sees_consistent_buffers() {
    let mut source = VideoSourceNode::new("src", Box::new(SyntheticDecoder::new(16, 16, 8, 25.0)));
    source
        .params_mut()
        .set("loop", ParamValue::Bool(true))
        .unwrap();

    let mut history = MotionHistoryNode::new("mh");
    history
        .input_mut("mask")
        .unwrap()
        .connect(source.output("frame").unwrap());
    let slot = history.output("history").unwrap().slot();

    let mut pipeline = Pipeline::new(TickPolicy::Halt);
    pipeline.push(NodeDriver::new(Box::new(source)));
    pipeline.push(NodeDriver::new(Box::new(history)));
    pipeline.initialize().unwrap();
    pipeline.start().unwrap();

    let done = AtomicBool::new(false);
    let observations = AtomicUsize::new(0);
    thread::scope(|s| {
        let reader_slot = slot.clone();
        let done = &done;
        let observations = &observations;
        let reader = s.spawn(move || {
            while !done.load(Ordering::Acquire) {
                let guard = reader_slot.read();
                if let Some(buf) = guard.as_ref() {
                    let ts = buf.floats().unwrap();
                    assert_eq!(ts.len(), 16 * 16);
                    // stamps are whole frame counts within the tick range
                    for &t in ts {
                        assert_eq!(t.fract(), 0.0);
                        assert!(t <= (MAX_TICKS + 1) as f32);
                    }
                    observations.fetch_add(1, Ordering::AcqRel);
                }
                drop(guard);
                thread::yield_now();
            }
        });

        // keep ticking past the floor until the reader has observed at
        // least one produced buffer
        let mut ticks = 0u64;
        while ticks < MIN_TICKS || observations.load(Ordering::Acquire) == 0 {
            assert!(ticks < MAX_TICKS, "reader thread never observed a buffer");
            pipeline.tick().unwrap();
            ticks += 1;
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();
    });
    assert!(observations.load(Ordering::Acquire) > 0);

    pipeline.stop().unwrap();
}
