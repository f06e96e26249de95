use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert!(Fps::new(30, 1).is_ok());
}

#[test]
fn fps_frame_interval() {
    let fps = Fps::new(30, 1).unwrap();
    assert!((fps.frame_interval_ms() - 33.333).abs() < 0.001);
    let ntsc = Fps::new(30000, 1001).unwrap();
    assert!((ntsc.as_f64() - 29.97).abs() < 0.001);
}

#[test]
fn frame_validates_data_length() {
    assert!(FrameRGBA::new(2, 2, vec![0u8; 16]).is_ok());
    assert!(FrameRGBA::new(2, 2, vec![0u8; 15]).is_err());
    let blank = FrameRGBA::blank(4, 3);
    assert_eq!(blank.data.len(), 4 * 3 * 4);
}

#[test]
fn timestamp_delta() {
    let a = TimestampMs(100.0);
    let b = TimestampMs(133.5);
    assert!((b.since(a) - 33.5).abs() < f64::EPSILON);
    assert!(a.since(b) < 0.0);
}
