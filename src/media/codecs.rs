//! Router Codec Capabilities
//!
//! The codec set registered into the media engine, exposed to clients as
//! the router's RTP capabilities during transport negotiation.

use serde::{Deserialize, Serialize};
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::rtp_transceiver::RTCPFeedback;

use super::producer::MediaKind;

/// RTCP feedback mechanism advertised for a codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtcpFeedback {
    /// Feedback type (e.g., "nack", "goog-remb").
    #[serde(rename = "type")]
    pub feedback_type: String,
    /// Feedback parameter (e.g., "pli" for "nack").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parameter: String,
}

impl RtcpFeedback {
    fn new(feedback_type: &str, parameter: &str) -> Self {
        Self {
            feedback_type: feedback_type.to_owned(),
            parameter: parameter.to_owned(),
        }
    }
}

/// A codec the router can receive and forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecCapability {
    /// Kind of media the codec carries.
    pub kind: MediaKind,
    /// MIME type (e.g., "audio/opus").
    pub mime_type: String,
    /// Payload type advertised in negotiation.
    pub preferred_payload_type: u8,
    /// Clock rate in Hz.
    pub clock_rate: u32,
    /// Channel count (audio only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    /// SDP fmtp line.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdp_fmtp_line: String,
    /// Supported RTCP feedback mechanisms.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rtcp_feedback: Vec<RtcpFeedback>,
}

impl RtpCodecCapability {
    /// Engine-side codec parameters for registration.
    #[must_use]
    pub fn engine_parameters(&self) -> RTCRtpCodecParameters {
        RTCRtpCodecParameters {
            capability: RTCRtpCodecCapability {
                mime_type: self.mime_type.clone(),
                clock_rate: self.clock_rate,
                channels: self.channels.unwrap_or(0),
                sdp_fmtp_line: self.sdp_fmtp_line.clone(),
                rtcp_feedback: self
                    .rtcp_feedback
                    .iter()
                    .map(|fb| RTCPFeedback {
                        typ: fb.feedback_type.clone(),
                        parameter: fb.parameter.clone(),
                    })
                    .collect(),
            },
            payload_type: self.preferred_payload_type,
            ..Default::default()
        }
    }

    /// Engine-side codec type.
    #[must_use]
    pub const fn engine_kind(&self) -> RTPCodecType {
        match self.kind {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        }
    }
}

/// Capabilities negotiated by every room router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterRtpCapabilities {
    /// Codecs the router can receive and forward.
    pub codecs: Vec<RtpCodecCapability>,
}

/// Feedback set shared by all video codecs.
fn video_rtcp_feedback() -> Vec<RtcpFeedback> {
    vec![
        RtcpFeedback::new("goog-remb", ""),
        RtcpFeedback::new("ccm", "fir"),
        RtcpFeedback::new("nack", ""),
        RtcpFeedback::new("nack", "pli"),
    ]
}

/// The codec set registered into the media engine.
#[must_use]
pub fn supported_codecs() -> Vec<RtpCodecCapability> {
    vec![
        RtpCodecCapability {
            kind: MediaKind::Audio,
            mime_type: "audio/opus".to_owned(),
            preferred_payload_type: 111,
            clock_rate: 48000,
            channels: Some(2),
            sdp_fmtp_line: "minptime=10;useinbandfec=1".to_owned(),
            rtcp_feedback: vec![],
        },
        RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: "video/VP9".to_owned(),
            preferred_payload_type: 98,
            clock_rate: 90000,
            channels: None,
            sdp_fmtp_line: "profile-id=0".to_owned(),
            rtcp_feedback: video_rtcp_feedback(),
        },
        RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: "video/VP8".to_owned(),
            preferred_payload_type: 96,
            clock_rate: 90000,
            channels: None,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: video_rtcp_feedback(),
        },
        RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: "video/H264".to_owned(),
            preferred_payload_type: 102,
            clock_rate: 90000,
            channels: None,
            sdp_fmtp_line:
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f".to_owned(),
            rtcp_feedback: video_rtcp_feedback(),
        },
    ]
}

/// Capabilities handed to clients when a transport is created.
#[must_use]
pub fn router_capabilities() -> RouterRtpCapabilities {
    RouterRtpCapabilities {
        codecs: supported_codecs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_kinds_supported() {
        let codecs = supported_codecs();
        assert!(codecs.iter().any(|c| c.kind == MediaKind::Audio));
        assert!(codecs.iter().any(|c| c.kind == MediaKind::Video));
    }

    #[test]
    fn test_payload_types_unique() {
        let codecs = supported_codecs();
        let mut payload_types: Vec<u8> =
            codecs.iter().map(|c| c.preferred_payload_type).collect();
        payload_types.sort_unstable();
        payload_types.dedup();
        assert_eq!(payload_types.len(), codecs.len());
    }

    #[test]
    fn test_opus_capability() {
        let codecs = supported_codecs();
        let opus = codecs
            .iter()
            .find(|c| c.mime_type == "audio/opus")
            .expect("opus must be supported");
        assert_eq!(opus.clock_rate, 48000);
        assert_eq!(opus.channels, Some(2));
        assert_eq!(opus.preferred_payload_type, 111);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let json = serde_json::to_value(router_capabilities()).unwrap();
        let opus = &json["codecs"][0];
        assert_eq!(opus["mimeType"], "audio/opus");
        assert_eq!(opus["clockRate"], 48000);
        assert_eq!(opus["preferredPayloadType"], 111);
        assert_eq!(opus["kind"], "audio");
    }

    #[test]
    fn test_video_feedback_includes_pli() {
        let codecs = supported_codecs();
        let vp8 = codecs.iter().find(|c| c.mime_type == "video/VP8").unwrap();
        assert!(vp8
            .rtcp_feedback
            .iter()
            .any(|fb| fb.feedback_type == "nack" && fb.parameter == "pli"));
    }

    #[test]
    fn test_engine_parameters_conversion() {
        let codecs = supported_codecs();
        let opus = codecs.iter().find(|c| c.mime_type == "audio/opus").unwrap();
        let params = opus.engine_parameters();
        assert_eq!(params.payload_type, 111);
        assert_eq!(params.capability.channels, 2);
        assert_eq!(params.capability.clock_rate, 48000);
    }
}
