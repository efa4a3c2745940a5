//! Frame streaming: slices a packed bitmap into draw packets.
//!
//! A band is `band_rows` packed rows sent as one draw command. After each
//! band, `gap_rows` source rows are skipped; on the reference wall these
//! are the blind rows between LED modules, so the 240-row framebuffer
//! yields twenty 8-row bands. Receiver offsets advance by the payload
//! length, so consecutive bands land back to back.
//!
//! Sends are paced with a fixed delay. There is no acknowledgement: a
//! failed send is logged and the next packet goes out anyway.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::LedwandError;
use crate::frame::DitherBitmap;
use crate::network::Transport;
use crate::packet::PacketFramer;

/// Outcome of streaming one buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamReport {
    /// Datagrams accepted by the transport.
    pub sent: usize,
    /// Datagrams the transport rejected.
    pub failed: usize,
    /// Payload bytes accepted.
    pub bytes: usize,
}

impl StreamReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}

/// Streamer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Packed rows per draw packet.
    pub band_rows: usize,
    /// Source rows skipped after every band.
    pub gap_rows: usize,
    /// Delay between band packets.
    pub packet_delay: Duration,
    /// Number of parts for whole-buffer draws.
    pub parts: usize,
    /// Delay between whole-buffer parts.
    pub part_delay: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            band_rows: 8,
            gap_rows: 4,
            packet_delay: Duration::from_micros(400),
            parts: 4,
            part_delay: Duration::from_micros(500),
        }
    }
}

/// Turns bitmaps and raw buffers into paced draw packets.
#[derive(Debug, Clone)]
pub struct FrameStreamer {
    config: StreamConfig,
}

impl FrameStreamer {
    pub fn new(config: StreamConfig) -> Result<Self, LedwandError> {
        if config.band_rows == 0 {
            return Err(LedwandError::Config("band_rows must be > 0".into()));
        }
        if config.parts == 0 {
            return Err(LedwandError::Config("parts must be > 0".into()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Check that a full band of `row_bytes`-wide rows fits one packet.
    pub fn check_fits(&self, framer: &PacketFramer, row_bytes: usize) -> Result<(), LedwandError> {
        let payload = self.config.band_rows * row_bytes;
        if payload > framer.max_payload() {
            return Err(LedwandError::PacketTooLarge {
                size: payload + (framer.max_packet_size() - framer.max_payload()),
                max: framer.max_packet_size(),
            });
        }
        Ok(())
    }

    /// Number of draw packets [`stream`](Self::stream) emits for `height` rows.
    pub fn band_count(&self, height: usize) -> usize {
        height.div_ceil(self.config.band_rows + self.config.gap_rows)
    }

    /// Send `bitmap` band by band.
    ///
    /// Send failures are counted and skipped. Framing errors abort the
    /// frame since they mean the constants are inconsistent.
    pub fn stream<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        framer: &PacketFramer,
        bitmap: &DitherBitmap,
    ) -> Result<StreamReport, LedwandError> {
        let dims = bitmap.dimensions();
        let row_bytes = dims.row_bytes();
        let data = bitmap.as_bytes();
        let step = self.config.band_rows + self.config.gap_rows;

        let mut report = StreamReport::default();
        let mut offset = 0;
        let mut row = 0;
        while row < dims.height() {
            if row > 0 {
                thread::sleep(self.config.packet_delay);
            }
            let rows = self.config.band_rows.min(dims.height() - row);
            let start = row * row_bytes;
            let band = &data[start..start + rows * row_bytes];

            let packet = framer.draw(offset, band)?;
            Self::send(transport, &packet, band.len(), &mut report);

            offset += band.len();
            row += step;
        }

        debug!(
            sent = report.sent,
            failed = report.failed,
            bytes = report.bytes,
            "streamed bitmap"
        );
        Ok(report)
    }

    /// Number of draws [`draw_buffer`](Self::draw_buffer) uses for `len` bytes.
    ///
    /// At least `parts`, raised until every part fits one packet.
    pub fn part_count(&self, framer: &PacketFramer, len: usize) -> usize {
        self.config.parts.max(len.div_ceil(framer.max_payload()))
    }

    /// Send an arbitrary buffer split into roughly equal draws.
    ///
    /// Used for pre-packed bitmaps that bypass dithering. The buffer is
    /// split into [`part_count`](Self::part_count) parts; the last part
    /// takes whatever remains when the length does not divide evenly.
    pub fn draw_buffer<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        framer: &PacketFramer,
        buffer: &[u8],
    ) -> Result<StreamReport, LedwandError> {
        let mut report = StreamReport::default();
        if buffer.is_empty() {
            return Ok(report);
        }

        let part_len = buffer.len().div_ceil(self.part_count(framer, buffer.len()));
        for (idx, part) in buffer.chunks(part_len).enumerate() {
            if idx > 0 {
                thread::sleep(self.config.part_delay);
            }
            let packet = framer.draw(idx * part_len, part)?;
            Self::send(transport, &packet, part.len(), &mut report);
        }

        debug!(
            sent = report.sent,
            failed = report.failed,
            "streamed raw buffer"
        );
        Ok(report)
    }

    fn send<T: Transport + ?Sized>(
        transport: &mut T,
        packet: &[u8],
        payload_len: usize,
        report: &mut StreamReport,
    ) {
        match transport.send(packet) {
            Ok(()) => {
                report.sent += 1;
                report.bytes += payload_len;
            }
            Err(e) => {
                warn!("draw packet dropped: {e}");
                report.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::frame::Dimensions;
    use crate::header::{CommandHeader, HEADER_SIZE};
    use crate::network::RecordingTransport;
    use crate::packet::MAX_PACKET_SIZE;

    fn no_delay(band_rows: usize, gap_rows: usize) -> FrameStreamer {
        FrameStreamer::new(StreamConfig {
            band_rows,
            gap_rows,
            packet_delay: Duration::ZERO,
            parts: 4,
            part_delay: Duration::ZERO,
        })
        .unwrap()
    }

    fn numbered_bitmap(dims: Dimensions) -> DitherBitmap {
        let data = (0..dims.bitmap_len()).map(|i| (i % 251) as u8).collect();
        DitherBitmap::from_packed(dims, data).unwrap()
    }

    fn headers(t: &RecordingTransport, framer: &PacketFramer) -> Vec<CommandHeader> {
        t.datagrams()
            .iter()
            .map(|d| framer.parse(d).unwrap().0)
            .collect()
    }

    #[test]
    fn contiguous_bands_cover_bitmap() {
        let framer = PacketFramer::default();
        let streamer = no_delay(4, 0);
        let bitmap = numbered_bitmap(Dimensions::REFERENCE);
        let mut t = RecordingTransport::new();

        let report = streamer.stream(&mut t, &framer, &bitmap).unwrap();
        assert_eq!(report.sent, 240usize.div_ceil(4));
        assert_eq!(report.failed, 0);
        assert_eq!(report.bytes, bitmap.as_bytes().len());

        let mut expected_offset = 0u16;
        let mut reassembled = Vec::new();
        for d in t.datagrams() {
            let (hdr, payload) = framer.parse(d).unwrap();
            assert_eq!(hdr.command, Command::Draw);
            assert_eq!(hdr.xpos, expected_offset);
            assert_eq!(hdr.ypos as usize, payload.len());
            assert_eq!(payload.len(), 4 * 56);
            expected_offset += hdr.ypos;
            reassembled.extend_from_slice(payload);
        }
        assert_eq!(reassembled, bitmap.as_bytes());
    }

    #[test]
    fn last_band_may_be_short() {
        let framer = PacketFramer::default();
        let dims = Dimensions::new(16, 7).unwrap();
        let bitmap = numbered_bitmap(dims);
        let mut t = RecordingTransport::new();

        no_delay(3, 0).stream(&mut t, &framer, &bitmap).unwrap();
        let lens: Vec<u16> = headers(&t, &framer).iter().map(|h| h.ypos).collect();
        assert_eq!(lens, vec![6, 6, 2]);
    }

    #[test]
    fn module_gaps_are_skipped() {
        let framer = PacketFramer::default();
        let streamer = no_delay(8, 4);
        let bitmap = numbered_bitmap(Dimensions::REFERENCE);
        let mut t = RecordingTransport::new();

        let report = streamer.stream(&mut t, &framer, &bitmap).unwrap();
        assert_eq!(report.sent, 20);
        assert_eq!(streamer.band_count(240), 20);

        for (n, d) in t.datagrams().iter().enumerate() {
            let (hdr, payload) = framer.parse(d).unwrap();
            assert_eq!(hdr.xpos as usize, n * 448);
            assert_eq!(hdr.ypos, 448);
            let src = n * 12 * 56;
            assert_eq!(payload, &bitmap.as_bytes()[src..src + 448]);
        }
    }

    #[test]
    fn failed_sends_do_not_stop_the_frame() {
        let framer = PacketFramer::default();
        let bitmap = numbered_bitmap(Dimensions::REFERENCE);
        let mut t = RecordingTransport::new().fail_on([0, 5]);

        let report = no_delay(8, 4).stream(&mut t, &framer, &bitmap).unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.sent, 18);
        assert_eq!(report.attempted(), 20);
        assert_eq!(t.attempts(), 20);
    }

    #[test]
    fn oversized_band_is_fatal() {
        let framer = PacketFramer::default().with_max_packet_size(100).unwrap();
        let bitmap = numbered_bitmap(Dimensions::REFERENCE);
        let mut t = RecordingTransport::new();

        let streamer = no_delay(8, 0);
        assert!(streamer.check_fits(&framer, 56).is_err());
        let err = streamer.stream(&mut t, &framer, &bitmap).unwrap_err();
        assert!(matches!(err, LedwandError::PacketTooLarge { .. }));
        assert_eq!(t.attempts(), 0);
    }

    #[test]
    fn check_fits_accepts_reference_bands() {
        let framer = PacketFramer::default();
        assert!(no_delay(8, 4).check_fits(&framer, 56).is_ok());
        assert!(no_delay(18, 0).check_fits(&framer, 56).is_ok());
        assert!(no_delay(19, 0).check_fits(&framer, 56).is_err());
    }

    #[test]
    fn draw_buffer_splits_into_parts() {
        let framer = PacketFramer::default();
        let buffer: Vec<u8> = (0..1000u32).map(|i| i as u8).collect();
        let mut t = RecordingTransport::new();

        let report = no_delay(8, 0).draw_buffer(&mut t, &framer, &buffer).unwrap();
        assert_eq!(report.sent, 4);
        assert_eq!(report.bytes, 1000);

        let hdrs = headers(&t, &framer);
        let offsets: Vec<u16> = hdrs.iter().map(|h| h.xpos).collect();
        assert_eq!(offsets, vec![0, 250, 500, 750]);
        assert!(t
            .datagrams()
            .iter()
            .all(|d| d.len() == HEADER_SIZE + 250));
    }

    #[test]
    fn draw_buffer_uneven_tail() {
        let framer = PacketFramer::default();
        let mut t = RecordingTransport::new();
        no_delay(8, 0).draw_buffer(&mut t, &framer, &[7u8; 10]).unwrap();

        let lens: Vec<u16> = headers(&t, &framer).iter().map(|h| h.ypos).collect();
        assert_eq!(lens, vec![3, 3, 3, 1]);
    }

    #[test]
    fn full_bitmap_is_split_to_fit_packets() {
        let framer = PacketFramer::default();
        let streamer = FrameStreamer::new(StreamConfig {
            packet_delay: Duration::ZERO,
            part_delay: Duration::ZERO,
            ..StreamConfig::default()
        })
        .unwrap();
        let bitmap = numbered_bitmap(Dimensions::REFERENCE);
        let mut t = RecordingTransport::new();

        // 13440 bytes need 14 parts of at most 1014 bytes.
        assert_eq!(streamer.part_count(&framer, bitmap.as_bytes().len()), 14);
        let report = streamer
            .draw_buffer(&mut t, &framer, bitmap.as_bytes())
            .unwrap();
        assert_eq!(report.sent, 14);
        assert_eq!(report.failed, 0);
        assert_eq!(report.bytes, 13_440);

        let mut reassembled = Vec::new();
        for (n, d) in t.datagrams().iter().enumerate() {
            assert!(d.len() <= MAX_PACKET_SIZE);
            let (hdr, payload) = framer.parse(d).unwrap();
            assert_eq!(hdr.xpos as usize, n * 960);
            assert_eq!(hdr.ypos, 960);
            reassembled.extend_from_slice(payload);
        }
        assert_eq!(reassembled, bitmap.as_bytes());
    }

    #[test]
    fn part_count_keeps_configured_minimum() {
        let framer = PacketFramer::default();
        let streamer = no_delay(8, 0);
        assert_eq!(streamer.part_count(&framer, 10), 4);
        assert_eq!(streamer.part_count(&framer, 4 * 1014), 4);
        assert_eq!(streamer.part_count(&framer, 4 * 1014 + 1), 5);
    }

    #[test]
    fn empty_buffer_sends_nothing() {
        let framer = PacketFramer::default();
        let mut t = RecordingTransport::new();
        let report = no_delay(8, 0).draw_buffer(&mut t, &framer, &[]).unwrap();
        assert_eq!(report, StreamReport::default());
        assert_eq!(t.attempts(), 0);
    }

    #[test]
    fn zero_sized_settings_are_rejected() {
        let mut cfg = StreamConfig::default();
        cfg.band_rows = 0;
        assert!(FrameStreamer::new(cfg).is_err());

        let mut cfg = StreamConfig::default();
        cfg.parts = 0;
        assert!(FrameStreamer::new(cfg).is_err());
    }
}
