//! Device control-channel payloads.
//!
//! The camera speaks the vendor's IPCAM ioctl dialect: an 8-byte
//! `SMsgAVIoctrlAVStream` payload (channel id as 4-byte little-endian,
//! 4 reserved bytes) sent with the ioctl codes below. Only the video
//! start/stop pair is exercised by the bridge; the audio and speaker codes
//! are part of the same device dialect and kept for completeness.

pub const IOTYPE_USER_IPCAM_START: u32 = 0x1FF;
pub const IOTYPE_USER_IPCAM_STOP: u32 = 0x2FF;
pub const IOTYPE_USER_IPCAM_AUDIOSTART: u32 = 0x300;
pub const IOTYPE_USER_IPCAM_AUDIOSTOP: u32 = 0x301;
pub const IOTYPE_USER_IPCAM_SPEAKERSTART: u32 = 0x350;
pub const IOTYPE_USER_IPCAM_SPEAKERSTOP: u32 = 0x351;

/// `SMsgAVIoctrlAVStream` for the given channel.
pub fn stream_payload(channel: u32) -> [u8; 8] {
    let mut payload = [0u8; 8];
    payload[..4].copy_from_slice(&channel.to_le_bytes());
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_channel_le_plus_reserved() {
        assert_eq!(stream_payload(0), [0; 8]);
        assert_eq!(stream_payload(1), [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            stream_payload(0x0102_0304),
            [0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0]
        );
    }
}
