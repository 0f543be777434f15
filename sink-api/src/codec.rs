/// A2DP codecs the sink can advertise
///
/// Each codec maps to a fixed capabilities blob (what the endpoint claims to
/// support) and a fixed configuration blob (what it hands back when asked to
/// pick one). No negotiation against the peer's capabilities takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Codec {
    /// SBC - mandatory for A2DP, always registered
    Sbc,
    /// MPEG-1,2 Audio
    Mp3,
    /// MPEG-2,4 AAC
    Aac,
    /// aptX (vendor codec)
    Aptx,
    /// aptX HD (vendor codec)
    AptxHd,
    /// LDAC (vendor codec)
    Ldac,
}

/// Fixed codec data sent to and returned from the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecInfo {
    /// A2DP codec identifier byte
    pub codec_id: u8,

    /// Capabilities blob sent with `RegisterEndpoint`
    pub capabilities: &'static [u8],

    /// Configuration blob returned from `SelectConfiguration`
    pub configuration: &'static [u8],
}

const SBC_CODEC: u8 = 0x00;
const MPEG12_CODEC: u8 = 0x01;
const MPEG24_CODEC: u8 = 0x02;
const VENDOR_CODEC: u8 = 0xFF;

// SBC: all frequencies/modes, all block lengths/subbands, bitpool 2..64
const SBC_CAPABILITIES: &[u8] = &[0xFF, 0xFF, 0x02, 0x40];
// 44.1 kHz joint stereo, 16 blocks, 8 subbands, loudness, bitpool 2..32
const SBC_CONFIGURATION: &[u8] = &[0x21, 0x15, 0x02, 0x20];

const MP3_CAPABILITIES: &[u8] = &[0x3F, 0x07, 0xFF, 0xFE];
const MP3_CONFIGURATION: &[u8] = &[0x21, 0x02, 0x00, 0x80];

const AAC_CAPABILITIES: &[u8] = &[0xC0, 0xFF, 0xFC, 0x80, 0xFF, 0xFF];
// MPEG-2 AAC LC, 44.1 kHz, stereo, VBR, 256 kbit/s
const AAC_CONFIGURATION: &[u8] = &[0x80, 0x01, 0x04, 0x83, 0xE8, 0x00];

// Vendor codecs: 4-byte vendor id and 2-byte codec id, little endian
const APTX_CAPABILITIES: &[u8] = &[0x4F, 0x00, 0x00, 0x00, 0x01, 0x00, 0xF2];
const APTX_CONFIGURATION: &[u8] = &[0x4F, 0x00, 0x00, 0x00, 0x01, 0x00, 0x22];

const APTX_HD_CAPABILITIES: &[u8] = &[0xD7, 0x00, 0x00, 0x00, 0x24, 0x00, 0xF2, 0x00, 0x00, 0x00, 0x00];
const APTX_HD_CONFIGURATION: &[u8] = &[0xD7, 0x00, 0x00, 0x00, 0x24, 0x00, 0x22, 0x00, 0x00, 0x00, 0x00];

const LDAC_CAPABILITIES: &[u8] = &[0x2D, 0x01, 0x00, 0x00, 0xAA, 0x00, 0x3F, 0x01];
const LDAC_CONFIGURATION: &[u8] = &[0x2D, 0x01, 0x00, 0x00, 0xAA, 0x00, 0x20, 0x01];

impl Codec {
    /// Every codec, in registration order
    pub const ALL: [Codec; 6] = [
        Codec::Sbc,
        Codec::Mp3,
        Codec::Aac,
        Codec::Aptx,
        Codec::AptxHd,
        Codec::Ldac,
    ];

    /// Short name used on the command line and in object paths
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Sbc => "sbc",
            Codec::Mp3 => "mp3",
            Codec::Aac => "aac",
            Codec::Aptx => "aptx",
            Codec::AptxHd => "aptxhd",
            Codec::Ldac => "ldac",
        }
    }

    /// Look a codec up by its short name (case-insensitive, whitespace trimmed)
    pub fn from_name(name: &str) -> Option<Codec> {
        let name = name.trim();
        Codec::ALL
            .into_iter()
            .find(|codec| codec.name().eq_ignore_ascii_case(name))
    }

    /// Get the fixed identifier and blobs for this codec
    pub fn info(&self) -> CodecInfo {
        match self {
            Codec::Sbc => CodecInfo {
                codec_id: SBC_CODEC,
                capabilities: SBC_CAPABILITIES,
                configuration: SBC_CONFIGURATION,
            },
            Codec::Mp3 => CodecInfo {
                codec_id: MPEG12_CODEC,
                capabilities: MP3_CAPABILITIES,
                configuration: MP3_CONFIGURATION,
            },
            Codec::Aac => CodecInfo {
                codec_id: MPEG24_CODEC,
                capabilities: AAC_CAPABILITIES,
                configuration: AAC_CONFIGURATION,
            },
            Codec::Aptx => CodecInfo {
                codec_id: VENDOR_CODEC,
                capabilities: APTX_CAPABILITIES,
                configuration: APTX_CONFIGURATION,
            },
            Codec::AptxHd => CodecInfo {
                codec_id: VENDOR_CODEC,
                capabilities: APTX_HD_CAPABILITIES,
                configuration: APTX_HD_CONFIGURATION,
            },
            Codec::Ldac => CodecInfo {
                codec_id: VENDOR_CODEC,
                capabilities: LDAC_CAPABILITIES,
                configuration: LDAC_CONFIGURATION,
            },
        }
    }

    /// Vendor codecs carry their vendor and codec ids inside the blobs
    pub fn is_vendor(&self) -> bool {
        self.info().codec_id == VENDOR_CODEC
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Codec {
    type Err = crate::ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Codec::from_name(s).ok_or_else(|| crate::ApiError::UnknownCodec(s.trim().to_string()))
    }
}

/// Codecs to register on an adapter
///
/// SBC is always first; the optional codecs follow in [`Codec::ALL`] order,
/// each at most once, whatever order they were requested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSelection {
    codecs: Vec<Codec>,
    ignored: Vec<String>,
}

impl CodecSelection {
    /// Build a selection from a comma separated list such as `"mp3,aac"`
    ///
    /// `none` and empty entries select nothing; `sbc` is implied either way.
    /// Names outside the supported set are kept aside in [`ignored`](Self::ignored).
    pub fn from_list(list: &str) -> Self {
        let mut requested = Vec::new();
        let mut ignored = Vec::new();

        for entry in list.split(',').map(str::trim) {
            if entry.is_empty() || entry.eq_ignore_ascii_case("none") {
                continue;
            }
            match Codec::from_name(entry) {
                Some(codec) => requested.push(codec),
                None => ignored.push(entry.to_string()),
            }
        }

        Self::from_codecs(requested, ignored)
    }

    fn from_codecs(requested: Vec<Codec>, ignored: Vec<String>) -> Self {
        let codecs = Codec::ALL
            .into_iter()
            .filter(|codec| *codec == Codec::Sbc || requested.contains(codec))
            .collect();
        Self { codecs, ignored }
    }

    /// Only SBC
    pub fn sbc_only() -> Self {
        Self::from_codecs(Vec::new(), Vec::new())
    }

    /// Codecs to register, SBC first
    pub fn codecs(&self) -> &[Codec] {
        &self.codecs
    }

    /// Requested names that are not supported codecs
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }
}

impl Default for CodecSelection {
    /// Every supported codec
    fn default() -> Self {
        Self::from_codecs(Codec::ALL.to_vec(), Vec::new())
    }
}
