// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end graph composition from URIs.

use streamview::{
    parse_input, parse_output, BuildOutcome, EncodingConfig, ExternalMode, GraphBuilder,
    GraphDescription, PlatformKind, Resolution, StreamError, VideoCodec,
};

fn compose(
    input: &str,
    output: &str,
    encoding: &EncodingConfig,
    platform: PlatformKind,
) -> GraphDescription {
    let builder = GraphBuilder::new(encoding, platform);
    match builder
        .build(&parse_input(input).unwrap(), &parse_output(output).unwrap())
        .unwrap()
    {
        BuildOutcome::Graph(graph) => graph,
        other => panic!("expected a graph, got {:?}", other),
    }
}

#[test]
fn test_camera_to_file_on_generic_host() {
    let graph = compose(
        "/dev/video0",
        "save://out.mp4",
        &EncodingConfig::default(),
        PlatformKind::Generic,
    );
    assert_eq!(
        graph.factories(),
        [
            "v4l2src",
            "capsfilter",
            "videoconvert",
            "x264enc",
            "h264parse",
            "mp4mux",
            "filesink"
        ]
    );
    assert_eq!(
        graph.to_launch_string(),
        "v4l2src device=/dev/video0 ! capsfilter caps=video/x-raw ! videoconvert \
         ! x264enc tune=zerolatency byte-stream=true key-int-max=30 ! h264parse ! mp4mux \
         ! filesink location=out.mp4"
    );

    let mjpeg = compose(
        "/dev/video0",
        "save://out.mp4",
        &EncodingConfig::default().with_output_codec(VideoCodec::Mjpeg),
        PlatformKind::Generic,
    );
    let factories = mjpeg.factories();
    assert_eq!(&factories[factories.len() - 3..], ["jpegenc", "mp4mux", "filesink"]);
}

#[test]
fn test_multicast_to_display_decodes_without_encoding() {
    let graph = compose(
        "mc://239.0.0.1:5000",
        "local",
        &EncodingConfig::default(),
        PlatformKind::Generic,
    );
    assert_eq!(
        graph.factories(),
        ["udpsrc", "rtph264depay", "h264parse", "avdec_h264", "videoconvert", "autovideosink"]
    );
    let source = &graph.stages()[0];
    assert_eq!(source.property_value("multicast-group"), Some("239.0.0.1"));
    assert_eq!(source.property_value("port"), Some("5000"));
    assert!(!graph.contains("x264enc"));
    assert!(graph.pending_link().is_none());

    let mjpeg = compose(
        "mc://239.0.0.1:5000",
        "local",
        &EncodingConfig::default().with_input_codec(VideoCodec::Mjpeg),
        PlatformKind::Generic,
    );
    assert_eq!(mjpeg.position("rtpjpegdepay"), Some(1));
    assert!(mjpeg.stages()[0]
        .property_value("caps")
        .unwrap()
        .contains("encoding-name=JPEG"));
}

#[test]
fn test_hardware_encoder_follows_platform() {
    let encoding = EncodingConfig::default().with_hardware_encoder(true);

    let jetson = compose("csi://0", "rtp://10.0.0.5:5000", &encoding, PlatformKind::Jetson);
    assert!(jetson.contains("nvh264enc"));
    let pi = compose("csi://0", "rtp://10.0.0.5:5000", &encoding, PlatformKind::RaspberryPi);
    assert!(pi.contains("v4l2h264enc"));
    let generic = compose("csi://0", "rtp://10.0.0.5:5000", &encoding, PlatformKind::Generic);
    assert!(generic.contains("x264enc"));

    let software = compose(
        "csi://0",
        "rtp://10.0.0.5:5000",
        &EncodingConfig::default(),
        PlatformKind::Jetson,
    );
    assert!(software.contains("x264enc"));
    assert!(!software.contains("nvh264enc"));
}

#[test]
fn test_mjpeg_stream_out() {
    let encoding = EncodingConfig::default()
        .with_output_codec(VideoCodec::Mjpeg)
        .with_hardware_encoder(true);
    let graph = compose("/dev/video1", "mc://239.1.2.3:6000", &encoding, PlatformKind::Jetson);
    let factories = graph.factories();
    assert_eq!(&factories[factories.len() - 3..], ["jpegenc", "rtpjpegpay", "udpsink"]);
    let sink = graph.stages().last().unwrap();
    assert_eq!(sink.property_value("host"), Some("239.1.2.3"));
    assert_eq!(sink.property_value("auto-multicast"), Some("true"));
}

#[test]
fn test_rtsp_source_defers_first_link() {
    let graph = compose(
        "rtsp://10.0.0.8:8554/cam",
        "save://cam.mp4",
        &EncodingConfig::default(),
        PlatformKind::Generic,
    );
    let link = graph.pending_link().unwrap();
    assert_eq!(link.source, "src");
    assert_eq!(link.target, "rtsp-entry");
    assert!(graph
        .to_launch_string()
        .contains("protocols=udp queue name=rtsp-entry ! rtph264depay ! h264parse"));
}

#[test]
fn test_resolution_and_rate_reach_caps() {
    let encoding = EncodingConfig::default()
        .with_resolution(Some(Resolution::HD_1080))
        .with_frame_rate(Some(60));
    let graph = compose("/dev/video0", "local", &encoding, PlatformKind::Generic);
    assert_eq!(
        graph.stages()[1].property_value("caps"),
        Some("video/x-raw,width=1920,height=1080,framerate=60/1")
    );
}

#[test]
fn test_in_process_outputs_need_their_own_topology() {
    let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
    let input = parse_input("/dev/video0").unwrap();

    assert_eq!(
        builder.build(&input, &parse_output("http").unwrap()).unwrap(),
        BuildOutcome::NeedsExternalSession(ExternalMode::Http)
    );
    assert_eq!(
        builder.build(&input, &parse_output("appsink").unwrap()).unwrap(),
        BuildOutcome::NeedsExternalSession(ExternalMode::AppSink)
    );

    let relay = builder.build_http_relay(&input).unwrap();
    assert_eq!(
        relay.stages()[1].property_value("caps"),
        Some("video/x-raw,width=640,height=480,framerate=30/1")
    );
    assert_eq!(relay.factories().last(), Some(&"appsink"));
}

#[test]
fn test_saving_over_the_input_is_refused() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().display().to_string();
    let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);

    let err = builder
        .build(
            &parse_input(&path).unwrap(),
            &parse_output(&format!("save://{}", path)).unwrap(),
        )
        .unwrap_err();
    assert!(matches!(err, StreamError::Configuration(_)));
}
