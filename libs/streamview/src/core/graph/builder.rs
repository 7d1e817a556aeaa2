// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Graph composition.
//!
//! A graph is always source stages followed by sink stages. Sources are
//! chosen by [`InputSpec`], sinks by [`OutputSpec`], and the encoder (when
//! the destination needs one) by the platform-aware selector. Outputs whose
//! consumer lives in-process (`http`, `appsink`) are not composed here: they
//! get fixed topologies from [`GraphBuilder::build_appsink`] and
//! [`GraphBuilder::build_http_relay`].

use super::{GraphDescription, PendingLink, Stage};
use crate::core::capture::CaptureFormat;
use crate::core::codec::{payloader_stage, EncodingConfig, VideoCodec};
use crate::core::{InputSpec, OutputSpec, PlatformKind, Resolution, Result, StreamError};

/// Instance name of the pull sink in fixed-topology graphs.
pub const APPSINK_NAME: &str = "appsink";

/// Instance name of the RTSP source element.
pub const RTSP_SOURCE_NAME: &str = "src";

/// Instance name of the first stage after the RTSP source.
pub const RTSP_ENTRY_NAME: &str = "rtsp-entry";

const CAPTURE_DEFAULT_RESOLUTION: Resolution = Resolution::HD_720;
const RELAY_DEFAULT_RESOLUTION: Resolution = Resolution::VGA;
const DEFAULT_FRAME_RATE: u32 = 30;

/// Output modes served by an in-process consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalMode {
    /// MJPEG multipart relay over HTTP.
    Http,
    /// Raw frames pulled by the capture bridge.
    AppSink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Graph(GraphDescription),
    /// The output needs a fixed topology and an external consumer.
    NeedsExternalSession(ExternalMode),
}

/// Composes graph descriptions for one encoding config on one platform.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    encoding: EncodingConfig,
    platform: PlatformKind,
}

impl GraphBuilder {
    pub fn new(encoding: &EncodingConfig, platform: PlatformKind) -> Self {
        Self {
            encoding: *encoding,
            platform,
        }
    }

    pub fn platform(&self) -> PlatformKind {
        self.platform
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Compose the general source → sink chain.
    pub fn build(&self, input: &InputSpec, output: &OutputSpec) -> Result<BuildOutcome> {
        if let Some(mode) = external_mode(output) {
            return Ok(BuildOutcome::NeedsExternalSession(mode));
        }
        if let (InputSpec::File { path: source }, OutputSpec::Save { path }) = (input, output) {
            if source == path {
                return Err(StreamError::Configuration(format!(
                    "Refusing to overwrite input file {}",
                    path.display()
                )));
            }
        }
        let sink = self.sink_stages(output).unwrap_or_default();

        let (source, pending_link) = self.source_stages(input);
        let mut graph = GraphDescription::from_stages(source).with_pending_link(pending_link);
        graph.extend(sink);

        tracing::debug!("Composed graph: {}", graph);
        Ok(BuildOutcome::Graph(graph))
    }

    /// Stages producing raw video from `input`.
    pub fn source_stages(&self, input: &InputSpec) -> (Vec<Stage>, Option<PendingLink>) {
        match input {
            InputSpec::Device { .. } | InputSpec::CsiIndex { .. } => {
                let device = input.device_path().unwrap_or_default();
                let stages = vec![
                    Stage::new("v4l2src").property("device", device.display()),
                    Stage::caps(raw_caps(
                        "video/x-raw",
                        self.encoding.resolution,
                        self.encoding.frame_rate,
                    )),
                    Stage::new("videoconvert"),
                ];
                (stages, None)
            }
            InputSpec::File { path } => {
                let stages = vec![
                    Stage::new("filesrc").property("location", path.display()),
                    Stage::new("decodebin"),
                    Stage::new("videoconvert"),
                ];
                (stages, None)
            }
            InputSpec::Udp { .. } | InputSpec::Rtp { .. } | InputSpec::Multicast { .. } => {
                let codec = self.encoding.input_codec;
                let mut stages = vec![udp_source(input, codec)];
                stages.extend(depayload_stages(codec));
                stages.push(Stage::new("videoconvert"));
                (stages, None)
            }
            InputSpec::Rtsp { uri } => {
                let mut stages = vec![
                    Stage::new("rtspsrc")
                        .named(RTSP_SOURCE_NAME)
                        .property("location", uri)
                        .property("latency", 0)
                        .property("protocols", "udp"),
                    Stage::new("queue").named(RTSP_ENTRY_NAME),
                ];
                stages.extend(depayload_stages(self.encoding.input_codec));
                stages.push(Stage::new("videoconvert"));
                (
                    stages,
                    Some(PendingLink::new(RTSP_SOURCE_NAME, RTSP_ENTRY_NAME)),
                )
            }
        }
    }

    /// Stages consuming raw video. `None` for in-process outputs.
    pub fn sink_stages(&self, output: &OutputSpec) -> Option<Vec<Stage>> {
        if output.is_external() {
            return None;
        }
        let codec = self.encoding.output_codec;
        let mut stages = Vec::new();
        if output.requires_encoding() {
            stages.push(self.encoding.output_encoder(self.platform).stage());
        }
        match output {
            OutputSpec::Local => stages.push(Stage::new("autovideosink").property("sync", false)),
            OutputSpec::Save { path } => {
                // Encoders emit byte-stream H.264; mp4mux only takes avc.
                if codec == VideoCodec::H264 {
                    stages.push(Stage::new("h264parse"));
                }
                stages.push(Stage::new("mp4mux"));
                stages.push(Stage::new("filesink").property("location", path.display()));
            }
            OutputSpec::Rtp { host, port } => {
                stages.push(payloader_stage(codec));
                stages.push(Stage::new("udpsink").property("host", host).property("port", port));
            }
            OutputSpec::Multicast { host, port } => {
                stages.push(payloader_stage(codec));
                stages.push(
                    Stage::new("udpsink")
                        .property("host", host)
                        .property("port", port)
                        .property("auto-multicast", true)
                        .property("ttl", 1),
                );
            }
            OutputSpec::Http | OutputSpec::AppSink => return None,
        }
        Some(stages)
    }

    /// Frame geometry and layout the appsink topology delivers.
    pub fn capture_format(&self) -> CaptureFormat {
        CaptureFormat::for_platform(
            self.platform,
            self.encoding.resolution.unwrap_or(CAPTURE_DEFAULT_RESOLUTION),
            self.encoding.frame_rate.unwrap_or(DEFAULT_FRAME_RATE),
        )
    }

    /// Camera → raw frames in the platform's native layout → pull sink.
    ///
    /// Only local cameras are supported.
    pub fn build_appsink(&self, input: &InputSpec) -> Result<GraphDescription> {
        let device = input.device_path().ok_or_else(|| {
            StreamError::NotSupported(format!(
                "appsink output needs a /dev/video or csi:// input, got {}",
                input
            ))
        })?;
        let format = self.capture_format();
        let size = Some(format.resolution);
        let fps = Some(format.frame_rate);

        let mut graph = GraphDescription::new();
        graph.push(Stage::new("v4l2src").property("device", device.display()));
        match self.platform {
            PlatformKind::Jetson => {
                graph.push(Stage::caps(raw_caps("video/x-raw(memory:NVMM)", size, fps)));
                graph.push(Stage::new("nvvidconv"));
            }
            PlatformKind::RaspberryPi | PlatformKind::Generic => {
                graph.push(Stage::caps(raw_caps("video/x-raw", size, fps)));
                graph.push(Stage::new("videoconvert"));
            }
        }
        graph.push(Stage::caps(format!(
            "video/x-raw,format={}",
            format.layout.caps_format()
        )));
        graph.push(appsink_stage());

        tracing::debug!("Composed capture graph: {}", graph);
        Ok(graph)
    }

    /// Any source → JPEG → pull sink, for the HTTP relay.
    pub fn build_http_relay(&self, input: &InputSpec) -> Result<GraphDescription> {
        let (source, pending_link) = match input {
            InputSpec::Device { .. } | InputSpec::CsiIndex { .. } => {
                let device = input.device_path().unwrap_or_default();
                let resolution = self.encoding.resolution.unwrap_or(RELAY_DEFAULT_RESOLUTION);
                let fps = self.encoding.frame_rate.unwrap_or(DEFAULT_FRAME_RATE);
                let stages = vec![
                    Stage::new("v4l2src").property("device", device.display()),
                    Stage::caps(raw_caps("video/x-raw", Some(resolution), Some(fps))),
                    Stage::new("videoconvert"),
                ];
                (stages, None)
            }
            _ => self.source_stages(input),
        };

        let mut graph = GraphDescription::from_stages(source).with_pending_link(pending_link);
        graph.push(Stage::new("jpegenc").property("idct-method", 1));
        graph.push(appsink_stage());

        tracing::debug!("Composed relay graph: {}", graph);
        Ok(graph)
    }
}

fn external_mode(output: &OutputSpec) -> Option<ExternalMode> {
    match output {
        OutputSpec::Http => Some(ExternalMode::Http),
        OutputSpec::AppSink => Some(ExternalMode::AppSink),
        OutputSpec::Local
        | OutputSpec::Rtp { .. }
        | OutputSpec::Multicast { .. }
        | OutputSpec::Save { .. } => None,
    }
}

fn appsink_stage() -> Stage {
    Stage::new("appsink")
        .named(APPSINK_NAME)
        .property("max-buffers", 1)
        .property("drop", true)
        .property("sync", false)
}

fn raw_caps(media: &str, resolution: Option<Resolution>, frame_rate: Option<u32>) -> String {
    let mut caps = media.to_string();
    if let Some(r) = resolution {
        caps.push_str(&format!(",width={},height={}", r.width, r.height));
    }
    if let Some(fps) = frame_rate {
        caps.push_str(&format!(",framerate={}/1", fps));
    }
    caps
}

fn udp_source(input: &InputSpec, codec: VideoCodec) -> Stage {
    let mut stage = Stage::new("udpsrc");
    stage = match input {
        InputSpec::Multicast { host, port } => stage
            .property("multicast-group", host)
            .property("auto-multicast", true)
            .property("port", port),
        InputSpec::Udp {
            host: Some(host),
            port,
        } => stage.property("address", host).property("port", port),
        InputSpec::Udp { host: None, port } | InputSpec::Rtp { port } => {
            stage.property("port", port)
        }
        InputSpec::Device { .. }
        | InputSpec::CsiIndex { .. }
        | InputSpec::File { .. }
        | InputSpec::Rtsp { .. } => stage,
    };
    stage.property("caps", codec.rtp_caps())
}

fn depayload_stages(codec: VideoCodec) -> Vec<Stage> {
    match codec {
        VideoCodec::H264 => vec![
            Stage::new("rtph264depay"),
            Stage::new("h264parse"),
            Stage::new("avdec_h264"),
        ],
        VideoCodec::Mjpeg => vec![Stage::new("rtpjpegdepay"), Stage::new("jpegdec")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PixelLayout;
    use crate::core::{parse_input, parse_output};

    fn graph(outcome: BuildOutcome) -> GraphDescription {
        match outcome {
            BuildOutcome::Graph(graph) => graph,
            other => panic!("expected graph, got {:?}", other),
        }
    }

    #[test]
    fn test_device_to_local_has_no_encoder() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let g = graph(
            builder
                .build(&parse_input("/dev/video0").unwrap(), &OutputSpec::Local)
                .unwrap(),
        );
        assert_eq!(
            g.to_launch_string(),
            "v4l2src device=/dev/video0 ! capsfilter caps=video/x-raw ! videoconvert \
             ! autovideosink sync=false"
        );
    }

    #[test]
    fn test_device_caps_carry_resolution_and_rate() {
        let encoding = EncodingConfig::default()
            .with_resolution(Some(Resolution::VGA))
            .with_frame_rate(Some(15));
        let builder = GraphBuilder::new(&encoding, PlatformKind::Generic);
        let (stages, pending) = builder.source_stages(&InputSpec::CsiIndex { index: 1 });
        assert!(pending.is_none());
        assert_eq!(stages[0].property_value("device"), Some("/dev/video1"));
        assert_eq!(
            stages[1].property_value("caps"),
            Some("video/x-raw,width=640,height=480,framerate=15/1")
        );
    }

    #[test]
    fn test_udp_with_host_binds_address() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let (stages, _) = builder.source_stages(&parse_input("udp://10.0.0.5:5000").unwrap());
        assert_eq!(
            stages[0].to_launch_fragment(),
            "udpsrc address=10.0.0.5 port=5000 \
             caps=\"application/x-rtp,media=video,encoding-name=H264,payload=96\""
        );
    }

    #[test]
    fn test_mjpeg_input_depayloader() {
        let encoding = EncodingConfig::default().with_input_codec(VideoCodec::Mjpeg);
        let builder = GraphBuilder::new(&encoding, PlatformKind::Generic);
        let (stages, _) = builder.source_stages(&parse_input("rtp://@:5004").unwrap());
        let factories: Vec<_> = stages.iter().map(Stage::factory).collect();
        assert_eq!(factories, ["udpsrc", "rtpjpegdepay", "jpegdec", "videoconvert"]);
    }

    #[test]
    fn test_rtp_output_payloads_output_codec() {
        let encoding = EncodingConfig::default().with_output_codec(VideoCodec::Mjpeg);
        let builder = GraphBuilder::new(&encoding, PlatformKind::RaspberryPi);
        let g = graph(
            builder
                .build(
                    &parse_input("/dev/video0").unwrap(),
                    &parse_output("rtp://192.168.1.2:5000").unwrap(),
                )
                .unwrap(),
        );
        assert_eq!(
            &g.factories()[3..],
            ["jpegenc", "rtpjpegpay", "udpsink"]
        );
    }

    #[test]
    fn test_in_process_outputs_need_external_session() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let input = parse_input("/dev/video0").unwrap();
        assert_eq!(
            builder.build(&input, &OutputSpec::Http).unwrap(),
            BuildOutcome::NeedsExternalSession(ExternalMode::Http)
        );
        assert_eq!(
            builder.build(&input, &OutputSpec::AppSink).unwrap(),
            BuildOutcome::NeedsExternalSession(ExternalMode::AppSink)
        );
    }

    #[test]
    fn test_save_over_input_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let err = builder
            .build(
                &parse_input(path).unwrap(),
                &parse_output(&format!("save://{}", path)).unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, StreamError::Configuration(_)));
    }

    #[test]
    fn test_appsink_generic_is_bgr() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let g = builder.build_appsink(&parse_input("/dev/video0").unwrap()).unwrap();
        assert_eq!(
            g.to_launch_string(),
            "v4l2src device=/dev/video0 ! \
             capsfilter caps=\"video/x-raw,width=1280,height=720,framerate=30/1\" ! \
             videoconvert ! capsfilter caps=\"video/x-raw,format=BGR\" ! \
             appsink name=appsink max-buffers=1 drop=true sync=false"
        );
        assert_eq!(builder.capture_format().layout, PixelLayout::Bgr);
    }

    #[test]
    fn test_appsink_jetson_is_rgba_nvmm() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Jetson);
        let g = builder.build_appsink(&InputSpec::CsiIndex { index: 0 }).unwrap();
        assert_eq!(
            g.factories(),
            ["v4l2src", "capsfilter", "nvvidconv", "capsfilter", "appsink"]
        );
        assert!(g.stages()[1]
            .property_value("caps")
            .unwrap()
            .starts_with("video/x-raw(memory:NVMM)"));
        assert_eq!(g.stages()[3].property_value("caps"), Some("video/x-raw,format=RGBA"));
        assert_eq!(builder.capture_format().layout, PixelLayout::Rgba);
    }

    #[test]
    fn test_appsink_rejects_network_input() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let err = builder
            .build_appsink(&parse_input("udp://:5000").unwrap())
            .unwrap_err();
        assert!(matches!(err, StreamError::NotSupported(_)));
    }

    #[test]
    fn test_http_relay_device_defaults_to_vga() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let g = builder
            .build_http_relay(&parse_input("/dev/video0").unwrap())
            .unwrap();
        assert_eq!(
            g.stages()[1].property_value("caps"),
            Some("video/x-raw,width=640,height=480,framerate=30/1")
        );
        assert_eq!(
            &g.factories()[3..],
            ["jpegenc", "appsink"]
        );
        assert_eq!(g.stages()[3].property_value("idct-method"), Some("1"));
    }

    #[test]
    fn test_http_relay_rtsp_keeps_pending_link() {
        let builder = GraphBuilder::new(&EncodingConfig::default(), PlatformKind::Generic);
        let g = builder
            .build_http_relay(&parse_input("rtsp://10.0.0.9/cam").unwrap())
            .unwrap();
        assert_eq!(
            g.pending_link(),
            Some(&PendingLink::new(RTSP_SOURCE_NAME, RTSP_ENTRY_NAME))
        );
        assert!(g.find_named(APPSINK_NAME).is_some());
    }
}
