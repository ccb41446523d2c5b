//! End-to-end motion history scenario
//!
//! Three 4x4 mask frames in frame-count mode with a window of 2: a pixel
//! active only at tick 2 must keep timestamp 2, while a pixel active on all
//! three ticks carries the final tick value.

use frameflow_common::{Channels, ColorModel, FrameBuffer, PixelDepth};
use frameflow_core::node::Node;
use frameflow_core::params::ParamValue;
use frameflow_core::port::OutputPort;
use frameflow_motion_history::MotionHistoryNode;

const ALWAYS_ACTIVE: (u32, u32) = (0, 0);
const ACTIVE_AT_TWO: (u32, u32) = (2, 2);

fn mask(active: &[(u32, u32)]) -> FrameBuffer {
    let mut buf = FrameBuffer::zeroed(4, 4, Channels::One, PixelDepth::U8, ColorModel::Gray);
    let px = buf.bytes_mut().unwrap();
    for &(x, y) in active {
        px[(y * 4 + x) as usize] = 255;
    }
    buf
}

#[test]
fn timestamps_record_last_activity_tick() {
    let upstream = OutputPort::new("ext");
    let mut node = MotionHistoryNode::new("mh");
    node.params_mut()
        .set("duration", ParamValue::Float(2.0))
        .unwrap();
    node.params_mut()
        .set("unit", ParamValue::Text("frames".to_string()))
        .unwrap();
    node.refresh_params().unwrap();
    node.input_mut("mask").unwrap().connect(&upstream);
    node.setup().unwrap();

    let frames = [
        mask(&[ALWAYS_ACTIVE]),
        mask(&[ALWAYS_ACTIVE, ACTIVE_AT_TWO]),
        mask(&[ALWAYS_ACTIVE]),
    ];
    for (tick, frame) in (1..).zip(frames) {
        *upstream.lock() = Some(frame);
        node.process(tick).unwrap();
    }

    let slot = node.output("history").unwrap().slot();
    let guard = slot.read();
    let ts = guard.as_ref().unwrap().floats().unwrap();

    let (ax, ay) = ALWAYS_ACTIVE;
    let (bx, by) = ACTIVE_AT_TWO;
    assert_eq!(ts[(ay * 4 + ax) as usize], 3.0);
    assert_eq!(ts[(by * 4 + bx) as usize], 2.0);
    assert!(ts[(by * 4 + bx) as usize] < ts[(ay * 4 + ax) as usize]);

    // untouched pixels never got a stamp
    assert_eq!(ts[1], 0.0);
}
