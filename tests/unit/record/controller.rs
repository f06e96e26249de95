use super::*;
use crate::record::backend::FixedCaptureRuntime;

fn controller(runtime: FixedCaptureRuntime) -> RecordingController {
    RecordingController::new(Box::new(runtime))
}

fn frame() -> FrameRGBA {
    FrameRGBA::blank(4, 4)
}

/// Tick timestamps at exactly the configured 30 fps.
fn ts(i: u64) -> TimestampMs {
    TimestampMs(i as f64 * (1000.0 / 30.0))
}

#[test]
fn start_is_exclusive_while_active() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    assert_eq!(rec.state(), RecordingState::Starting);

    let err = rec.start(RecordingOptions::default(), 4, 4).unwrap_err();
    assert!(matches!(err, MiravaError::RecordingAlreadyActive));
    assert_eq!(rec.state(), RecordingState::Starting);

    rec.on_frame(&frame(), ts(0));
    assert_eq!(rec.state(), RecordingState::Recording);
    let err = rec.start(RecordingOptions::default(), 4, 4).unwrap_err();
    assert!(matches!(err, MiravaError::RecordingAlreadyActive));
    assert_eq!(rec.state(), RecordingState::Recording);
}

#[test]
fn finish_without_recording_fails() {
    let mut rec = controller(FixedCaptureRuntime::default());
    assert!(matches!(rec.finish(), Err(MiravaError::NotRecording)));
    assert_eq!(rec.state(), RecordingState::Idle);
}

#[test]
fn round_trip_captures_one_frame_per_tick_at_target_rate() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    for i in 0..30 {
        rec.on_frame(&frame(), ts(i));
    }
    let blob = rec.finish().unwrap();
    assert_eq!(blob.frame_count, 30);
    assert_eq!(rec.state(), RecordingState::Idle);
    assert!((blob.duration_ms - 1000.0).abs() < 1.0);
}

#[test]
fn pacing_skips_ticks_faster_than_the_target_rate() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    // 60 Hz ticks against a 30 fps recording: every other tick is captured.
    for i in 0..20u64 {
        rec.on_frame(&frame(), TimestampMs(i as f64 * (1000.0 / 60.0)));
    }
    let blob = rec.finish().unwrap();
    assert_eq!(blob.frame_count, 10);
}

#[test]
fn slow_ticks_capture_every_offered_frame() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    // 10 Hz ticks against a 30 fps recording.
    for i in 0..5u64 {
        rec.on_frame(&frame(), TimestampMs(i as f64 * 100.0));
    }
    let blob = rec.finish().unwrap();
    assert_eq!(blob.frame_count, 5);
}

#[test]
fn microphone_denial_fails_start_and_restores_idle() {
    let mut rec = controller(FixedCaptureRuntime {
        microphone_allowed: false,
        ..FixedCaptureRuntime::default()
    });
    let options = RecordingOptions {
        record_audio: true,
        ..RecordingOptions::default()
    };
    let err = rec.start(options, 4, 4).unwrap_err();
    assert!(matches!(err, MiravaError::AudioPermissionDenied));
    assert_eq!(rec.state(), RecordingState::Idle);

    // Recoverable: a retry without audio succeeds.
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    assert_eq!(rec.state(), RecordingState::Starting);
}

#[test]
fn backend_selected_by_capability_probe() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    assert_eq!(rec.backend_kind(), Some(CaptureKind::CodecPull));
    let blob = rec.finish().unwrap();
    assert_eq!(blob.mime_type, "video/mp4");

    let mut rec = controller(FixedCaptureRuntime {
        encoded_frame_capture: false,
        ..FixedCaptureRuntime::default()
    });
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    assert_eq!(rec.backend_kind(), Some(CaptureKind::MediaRecorder));
    let blob = rec.finish().unwrap();
    assert_eq!(blob.mime_type, "video/webm");
}

#[test]
fn finish_from_starting_yields_an_empty_recording() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    let blob = rec.finish().unwrap();
    assert_eq!(blob.frame_count, 0);
    assert_eq!(rec.state(), RecordingState::Idle);
}

#[test]
fn supplied_track_is_stopped_on_every_finish_path() {
    // Clean finish.
    let track = AudioTrack::new("external", 48_000);
    let mut rec = controller(FixedCaptureRuntime::default());
    let options = RecordingOptions {
        audio_track: Some(track.clone()),
        ..RecordingOptions::default()
    };
    rec.start(options, 4, 4).unwrap();
    rec.on_frame(&frame(), ts(0));
    let blob = rec.finish().unwrap();
    assert!(track.is_stopped());
    let audio = blob.manifest().unwrap().audio.expect("audio recorded");
    assert_eq!(audio.sample_rate, 48_000);
    assert_eq!(audio.bit_rate, DEFAULT_AUDIO_BIT_RATE);

    // Error finish: a mis-sized frame poisons the capture.
    let track = AudioTrack::new("external", 48_000);
    let mut rec = controller(FixedCaptureRuntime::default());
    let options = RecordingOptions {
        audio_track: Some(track.clone()),
        ..RecordingOptions::default()
    };
    rec.start(options, 4, 4).unwrap();
    rec.on_frame(&FrameRGBA::blank(2, 2), ts(0));
    assert_eq!(rec.state(), RecordingState::Error);
    assert!(matches!(rec.finish(), Err(MiravaError::Capture(_))));
    assert!(track.is_stopped());
    assert_eq!(rec.state(), RecordingState::Idle);
}

#[test]
fn capture_failure_latches_until_finish() {
    let mut rec = controller(FixedCaptureRuntime::default());
    rec.start(RecordingOptions::default(), 4, 4).unwrap();
    rec.on_frame(&frame(), ts(0));
    rec.on_frame(&FrameRGBA::blank(2, 2), ts(1));
    assert_eq!(rec.state(), RecordingState::Error);

    // Further frames are not captured in the error state.
    rec.on_frame(&frame(), ts(2));
    assert_eq!(rec.state(), RecordingState::Error);

    assert!(rec.finish().is_err());
    assert_eq!(rec.state(), RecordingState::Idle);
}

#[test]
fn explicit_track_wins_over_record_audio() {
    let track = AudioTrack::new("external", 22_050);
    let mut rec = controller(FixedCaptureRuntime {
        // Would fail if the microphone were consulted.
        microphone_allowed: false,
        ..FixedCaptureRuntime::default()
    });
    let options = RecordingOptions {
        record_audio: true,
        audio_track: Some(track),
        ..RecordingOptions::default()
    };
    rec.start(options, 4, 4).unwrap();
    let blob = rec.finish().unwrap();
    let audio = blob.manifest().unwrap().audio.expect("audio recorded");
    assert_eq!(audio.sample_rate, 22_050);
}

#[test]
fn zero_frame_rate_is_rejected() {
    let mut rec = controller(FixedCaptureRuntime::default());
    let options = RecordingOptions {
        video_frame_rate: 0,
        ..RecordingOptions::default()
    };
    assert!(matches!(
        rec.start(options, 4, 4),
        Err(MiravaError::Validation(_))
    ));
    assert_eq!(rec.state(), RecordingState::Idle);
}
