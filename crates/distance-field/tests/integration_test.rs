//! Integration tests for the distance-field node

use frameflow_common::{Channels, ColorModel, FrameBuffer, PixelDepth};
use frameflow_core::node::NodeDriver;
use frameflow_core::params::ParamValue;
use frameflow_core::port::{InputPort, OutputPort};
use frameflow_distance_field::DistanceFieldNode;

/// Mask that is non-zero everywhere except the listed pixels
fn mask_with_zeros(width: u32, height: u32, zeros: &[(u32, u32)]) -> FrameBuffer {
    let mut buf = FrameBuffer::zeroed(width, height, Channels::One, PixelDepth::U8, ColorModel::Gray);
    let px = buf.bytes_mut().unwrap();
    px.fill(255);
    for &(x, y) in zeros {
        px[(y * width + x) as usize] = 0;
    }
    buf
}

#[test]
fn field_and_view_are_produced_under_lock() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let upstream = OutputPort::new("ext");
    *upstream.lock() = Some(mask_with_zeros(5, 5, &[(2, 2)]));

    let mut driver = NodeDriver::new(DistanceFieldNode::create("df"));
    driver
        .node_mut()
        .input_mut("mask")
        .unwrap()
        .connect(&upstream);

    let mut viewer = InputPort::new("viewer");
    viewer.connect(driver.node().output("gray").unwrap());

    driver.initialize().unwrap();
    driver.start().unwrap();
    driver.process(1).unwrap();

    let field = driver.node().output("distance").unwrap().slot();
    let guard = field.read();
    let d = guard.as_ref().unwrap().floats().unwrap();
    assert_eq!(d[5 * 2 + 2], 0.0);
    assert!(d[0] > 0.0);

    let view = viewer.read("viewer").unwrap();
    assert_eq!(view.bytes().unwrap()[5 * 2 + 2], 0);
}

#[test]
fn metric_switch_takes_effect_next_tick() {
    let upstream = OutputPort::new("ext");
    *upstream.lock() = Some(mask_with_zeros(5, 1, &[(0, 0)]));

    let mut driver = NodeDriver::new(DistanceFieldNode::create("df"));
    driver
        .node_mut()
        .input_mut("mask")
        .unwrap()
        .connect(&upstream);
    driver.initialize().unwrap();
    driver.start().unwrap();

    driver
        .node_mut()
        .params_mut()
        .set("metric", ParamValue::Text("l1".to_string()))
        .unwrap();
    driver.process(1).unwrap();

    let field = driver.node().output("distance").unwrap().slot();
    let guard = field.read();
    // exact integers only under L1
    assert_eq!(guard.as_ref().unwrap().floats().unwrap()[4], 4.0);
}

#[test]
fn shape_change_recreates_the_field() {
    let upstream = OutputPort::new("ext");
    *upstream.lock() = Some(mask_with_zeros(4, 4, &[(0, 0)]));

    let mut driver = NodeDriver::new(DistanceFieldNode::create("df"));
    driver
        .node_mut()
        .input_mut("mask")
        .unwrap()
        .connect(&upstream);
    driver.initialize().unwrap();
    driver.start().unwrap();

    *upstream.lock() = Some(mask_with_zeros(2, 6, &[(0, 0)]));
    driver.process(1).unwrap();

    let field = driver.node().output("distance").unwrap().slot();
    let guard = field.read();
    let buf = guard.as_ref().unwrap();
    assert_eq!((buf.width(), buf.height()), (2, 6));
}
