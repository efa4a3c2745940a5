//! Sender service core logic.
//!
//! Owns the display session and drives it at a fixed frame rate until
//! stopped. Each tick hands the session to tokio's blocking pool, where
//! the frame is acquired, dithered and streamed with sub-millisecond
//! pacing, so the runtime stays free for signal handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use ledwand_core::{
    BitmapFile, Connection, DisplaySession, Ditherer, FrameSource, FrameStreamer, GreyFile,
    LedwandError, PacketFramer, StreamReport, TestPattern, Transport, XrgbFile,
};

use crate::config::{SenderConfig, SourceKind};
use crate::dry_run::DryRunTransport;

// ── Pipeline ─────────────────────────────────────────────────────

/// What feeds the session each frame.
enum Pipeline {
    /// Greyscale frames that get dithered.
    Dither(Box<dyn FrameSource + Send>),
    /// Pre-packed bitmaps streamed as whole-buffer draws.
    Bitmap { file: BitmapFile, buffer: Vec<u8> },
}

impl Pipeline {
    fn from_config(config: &SenderConfig) -> Result<Self, LedwandError> {
        let dims = config.dimensions()?;
        let path = || {
            config.source.path.clone().ok_or_else(|| {
                LedwandError::Config(format!(
                    "source kind {:?} needs a path",
                    config.source.kind
                ))
            })
        };

        Ok(match config.source.kind {
            SourceKind::Pattern => Pipeline::Dither(Box::new(TestPattern::new(dims))),
            SourceKind::Grey => Pipeline::Dither(Box::new(GreyFile::new(dims, path()?))),
            SourceKind::Xrgb => Pipeline::Dither(Box::new(XrgbFile::new(
                dims,
                path()?,
                config.source.weights,
            ))),
            SourceKind::Bitmap => Pipeline::Bitmap {
                file: BitmapFile::new(dims, path()?),
                buffer: Vec::with_capacity(dims.bitmap_len()),
            },
        })
    }

    fn render<T: Transport>(
        &mut self,
        session: &mut DisplaySession<T>,
    ) -> Result<StreamReport, LedwandError> {
        match self {
            Pipeline::Dither(source) => session.render(&mut **source),
            Pipeline::Bitmap { file, buffer } => {
                file.read(buffer)?;
                session.draw_buffer(buffer.as_slice())
            }
        }
    }
}

// ── FrameWorker ──────────────────────────────────────────────────

/// Session and pipeline, moved onto the blocking pool for each frame.
struct FrameWorker<T: Transport> {
    session: DisplaySession<T>,
    pipeline: Pipeline,
}

impl<T: Transport + Send + 'static> FrameWorker<T> {
    /// Run `job` on a blocking thread and hand the worker back.
    async fn off_runtime<R, F>(mut self, job: F) -> Result<(Self, R), LedwandError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Self) -> R + Send + 'static,
    {
        task::spawn_blocking(move || {
            let out = job(&mut self);
            (self, out)
        })
        .await
        .map_err(|e| LedwandError::Worker(e.to_string()))
    }
}

// ── SenderService ────────────────────────────────────────────────

/// The top-level sender service.
pub struct SenderService {
    config: SenderConfig,
    dry_run: bool,
    running: Arc<AtomicBool>,
}

impl SenderService {
    /// Create a new sender with the given config.
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            dry_run: false,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Log packets instead of sending them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task or a signal handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Build the transport and run the frame loop.
    ///
    /// Returns the number of frames rendered. Stops after `max_frames`
    /// when given, otherwise when the stop handle is cleared.
    pub async fn run(&self, max_frames: Option<u64>) -> Result<u64, LedwandError> {
        let framer = PacketFramer::new(self.config.network.byte_order)
            .with_max_packet_size(self.config.network.max_packet_size)?;

        let transport: Box<dyn Transport + Send> = if self.dry_run {
            info!("dry run: packets are decoded and logged, not sent");
            Box::new(DryRunTransport::new(framer))
        } else {
            let conn = Connection::open(&self.config.network.address, self.config.network.port)?;
            info!("streaming to {}", conn.remote_addr());
            Box::new(conn)
        };

        self.run_with(transport, framer, max_frames).await
    }

    /// Run the frame loop on an explicit transport.
    pub async fn run_with<T: Transport + Send + 'static>(
        &self,
        transport: T,
        framer: PacketFramer,
        max_frames: Option<u64>,
    ) -> Result<u64, LedwandError> {
        let dims = self.config.dimensions()?;
        let ditherer = Ditherer::new(dims).with_bias(self.config.display.bias);
        let streamer = FrameStreamer::new(self.config.to_stream_config())?;
        let session = DisplaySession::new(transport, framer, ditherer, streamer)?;
        let pipeline = Pipeline::from_config(&self.config)?;

        let clear_on_start = self.config.display.clear_on_start;
        let brightness = self.config.display.brightness;
        let (mut worker, prepared) = FrameWorker { session, pipeline }
            .off_runtime(move |w| {
                if clear_on_start {
                    return w.session.prepare(brightness);
                }
                if let Some(level) = brightness {
                    if let Err(e) = w.session.set_brightness(level) {
                        warn!("brightness command dropped: {e}");
                    }
                }
                Ok(())
            })
            .await?;
        prepared?;

        self.running.store(true, Ordering::SeqCst);
        let mut ticker = time::interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut rendered = 0u64;
        while self.running.load(Ordering::SeqCst) {
            if max_frames.is_some_and(|max| rendered >= max) {
                break;
            }
            ticker.tick().await;
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let (w, result) = match worker
                .off_runtime(|w| w.pipeline.render(&mut w.session))
                .await
            {
                Ok(done) => done,
                Err(e) => {
                    error!("frame {} lost: {e}", rendered + 1);
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            };
            worker = w;

            match result {
                Ok(report) => {
                    rendered += 1;
                    if report.failed > 0 {
                        warn!(
                            frame = rendered,
                            failed = report.failed,
                            "frame sent with dropped packets"
                        );
                    } else {
                        debug!(frame = rendered, sent = report.sent, "frame sent");
                    }
                }
                Err(e) => {
                    error!("frame {} aborted: {e}", rendered + 1);
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("sender stopped after {rendered} frames");
        Ok(rendered)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    use super::*;
    use ledwand_core::{Command, RecordingTransport};

    fn fast_config() -> SenderConfig {
        let mut cfg = SenderConfig::default();
        cfg.timing.fps = 60;
        cfg.stream.packet_delay_us = 0;
        cfg.stream.part_delay_us = 0;
        cfg
    }

    #[test]
    fn service_creates_with_defaults() {
        let svc = SenderService::new(SenderConfig::default());
        assert!(!svc.is_running());
    }

    #[test]
    fn stop_handle_works() {
        let svc = SenderService::new(SenderConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn renders_requested_frames() {
        let svc = SenderService::new(fast_config());
        let framer = PacketFramer::default();
        let frames = svc
            .run_with(RecordingTransport::new(), framer, Some(3))
            .await
            .unwrap();
        assert_eq!(frames, 3);
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn dry_run_needs_no_network() {
        let mut cfg = fast_config();
        cfg.network.address = "not an address".into();
        let svc = SenderService::new(cfg).with_dry_run(true);
        assert_eq!(svc.run(Some(2)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn bad_address_fails_at_start() {
        let mut cfg = fast_config();
        cfg.network.address = "display.local".into();
        let svc = SenderService::new(cfg);
        assert!(matches!(
            svc.run(Some(1)).await,
            Err(LedwandError::Address(_))
        ));
    }

    #[tokio::test]
    async fn file_source_without_path_is_rejected() {
        let mut cfg = fast_config();
        cfg.source.kind = SourceKind::Grey;
        let svc = SenderService::new(cfg);
        let result = svc
            .run_with(RecordingTransport::new(), PacketFramer::default(), Some(1))
            .await;
        assert!(matches!(result, Err(LedwandError::Config(_))));
    }

    #[tokio::test]
    async fn missing_source_file_stops_the_loop() {
        let mut cfg = fast_config();
        cfg.source.kind = SourceKind::Grey;
        cfg.source.path = Some("/nonexistent/ledwand-frame.grey".into());
        let svc = SenderService::new(cfg);
        let result = svc
            .run_with(RecordingTransport::new(), PacketFramer::default(), None)
            .await;
        assert!(matches!(result, Err(LedwandError::Io(_))));
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn stops_when_handle_is_cleared() {
        let svc = Arc::new(SenderService::new(fast_config()));
        let handle = svc.stop_handle();

        let runner = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                svc.run_with(RecordingTransport::new(), PacketFramer::default(), None)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.store(false, Ordering::SeqCst);
        let frames = runner.await.unwrap().unwrap();
        assert!(frames >= 1);
    }

    #[tokio::test]
    async fn streams_full_size_bitmap_file() {
        let path = std::env::temp_dir().join(format!(
            "ledwand-{}-service-bitmap",
            std::process::id()
        ));
        std::fs::write(&path, vec![0x5Au8; 448 / 8 * 240]).unwrap();

        let mut cfg = fast_config();
        cfg.source.kind = SourceKind::Bitmap;
        cfg.source.path = Some(path.clone());
        let svc = SenderService::new(cfg);
        let frames = svc
            .run_with(RecordingTransport::new(), PacketFramer::default(), Some(2))
            .await;
        std::fs::remove_file(&path).ok();
        assert_eq!(frames.unwrap(), 2);
    }

    #[tokio::test]
    async fn runtime_stays_responsive_while_streaming() {
        // 19 band gaps of 20 ms keep each frame busy for ~380 ms.
        let mut cfg = fast_config();
        cfg.stream.packet_delay_us = 20_000;
        let svc = Arc::new(SenderService::new(cfg));
        let handle = svc.stop_handle();

        let runner = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                svc.run_with(RecordingTransport::new(), PacketFramer::default(), None)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(
            started.elapsed() < Duration::from_millis(200),
            "runtime blocked for {:?}",
            started.elapsed()
        );

        handle.store(false, Ordering::SeqCst);
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn sends_clear_brightness_and_bands_over_udp() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let mut cfg = fast_config();
        cfg.network.address = "127.0.0.1".into();
        cfg.network.port = receiver.local_addr().unwrap().port();
        cfg.display.brightness = Some(5);

        let svc = SenderService::new(cfg);
        assert_eq!(svc.run(Some(1)).await.unwrap(), 1);

        let framer = PacketFramer::default();
        let mut buf = [0u8; 2048];
        let mut commands = Vec::new();
        for _ in 0..22 {
            let (len, _) = receiver.recv_from(&mut buf).unwrap();
            commands.push(framer.parse(&buf[..len]).unwrap().0.command);
        }
        assert_eq!(commands[0], Command::Clear);
        assert_eq!(commands[1], Command::SetBrightness);
        assert!(commands[2..].iter().all(|c| *c == Command::Draw));
    }
}
