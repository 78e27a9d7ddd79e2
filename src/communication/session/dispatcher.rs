//! Session Dispatcher
//!
//! Owns the driver, timer and transport and runs the single active command.
//!
//! # Architecture
//!
//! 1. [`Dispatcher::poll`] takes at most one inbound frame from the transport
//! 2. A decoded request replaces the active command and runs its setup once
//! 3. [`Dispatcher::tick`] runs the active command's execute step and sends
//!    the packets it produced
//!
//! Malformed requests are dropped without touching the active command.

use super::command::{failure_packet, Command};
use super::{SessionError, SessionPhase};
use crate::devices::imu::Mpu9250;
use crate::platform::{PacketTransport, RegisterBus, TimerInterface};
use imu_stream_core::ahrs::FilterConfig;
use imu_stream_core::protocol::{CommandCode, CommandRequest, Packet};

/// Dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatcherConfig {
    /// Filter gains and initial orientation for streaming sessions
    pub filter: FilterConfig,
    /// Decimation threshold when the request does not carry one
    pub default_threshold: u32,
    /// Transport send timeout (ms)
    pub send_timeout_ms: u32,
    /// Delay after each streamed packet (ms)
    pub stream_packet_delay_ms: u32,
    /// Delay after the register read and after each dump packet (ms)
    pub dump_packet_delay_ms: u32,
    /// Delay after the magnetometer is switched to continuous mode (ms)
    pub mag_setup_delay_ms: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            default_threshold: 100,
            send_timeout_ms: 100,
            stream_packet_delay_ms: 1,
            dump_packet_delay_ms: 10,
            mag_setup_delay_ms: 100,
        }
    }
}

/// Active command and its lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSession {
    pub command: Command,
    pub phase: SessionPhase,
}

/// Single-session command dispatcher
pub struct Dispatcher<B, T, P> {
    imu: Mpu9250<B>,
    timer: T,
    transport: P,
    config: DispatcherConfig,
    session: Option<ActiveSession>,
}

impl<B: RegisterBus, T: TimerInterface, P: PacketTransport> Dispatcher<B, T, P> {
    pub fn new(imu: Mpu9250<B>, timer: T, transport: P, config: DispatcherConfig) -> Self {
        Self {
            imu,
            timer,
            transport,
            config,
            session: None,
        }
    }

    /// Phase of the active session, `Idle` before the first request
    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Idle, |session| session.phase)
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn imu(&self) -> &Mpu9250<B> {
        &self.imu
    }

    pub fn imu_mut(&mut self) -> &mut Mpu9250<B> {
        &mut self.imu
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Replace the active command with the one requested in `packet`
    ///
    /// The previous command is dropped before the new command's setup runs.
    /// A setup failure sends a failure packet and leaves the session stopped.
    ///
    /// # Errors
    ///
    /// `SessionError::Protocol` for an undecodable frame (the active command
    /// keeps running), or the setup error.
    pub fn dispatch(&mut self, packet: &Packet) -> Result<(), SessionError> {
        let request = match CommandRequest::parse(packet) {
            Ok(request) => request,
            Err(e) => {
                crate::log_warn!("Ignoring request: {}", e.as_str());
                return Err(e.into());
            }
        };

        if let Some(_previous) = self.session.take() {
            crate::log_debug!("{} superseded", _previous.command.code().as_str());
        }

        let command = Command::from_request(&request, &self.config);
        crate::log_info!("Command: {}", command.code().as_str());
        let session = self.session.insert(ActiveSession {
            command,
            phase: SessionPhase::Setup,
        });

        match session
            .command
            .setup(&mut self.imu, &mut self.timer, &self.config)
        {
            Ok(()) => {
                session.phase = SessionPhase::Running;
                Ok(())
            }
            Err(e) => {
                session.phase = SessionPhase::Stopped;
                crate::log_error!("{} setup failed: {}", request.code.as_str(), e.as_str());
                self.send_failure(request.code);
                Err(e)
            }
        }
    }

    /// Run the active command's execute step once
    ///
    /// Does nothing unless a session is running.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.phase != SessionPhase::Running {
            return Ok(());
        }

        let execution = match session
            .command
            .execute(&mut self.imu, &mut self.timer, &self.config)
        {
            Ok(execution) => execution,
            Err(e) => {
                session.phase = SessionPhase::Stopped;
                let code = session.command.code();
                crate::log_error!("{} failed: {}", code.as_str(), e.as_str());
                self.send_failure(code);
                return Err(e);
            }
        };

        if !execution.keep_running {
            session.phase = SessionPhase::Stopped;
        }

        for packet in execution.packets.iter() {
            self.send(packet);
            if execution.packet_delay_ms > 0 {
                self.timer.delay_ms(execution.packet_delay_ms)?;
            }
        }
        Ok(())
    }

    /// One pass of the outer loop: dispatch at most one request, then tick
    pub fn poll(&mut self) -> Result<(), SessionError> {
        if let Some(packet) = self.transport.receive() {
            // Protocol errors are logged in dispatch, setup errors also
            // reach the host as a failure packet
            if let Err(_e) = self.dispatch(&packet) {
                crate::log_debug!("Request not started: {}", _e.as_str());
            }
        }
        self.tick()
    }

    fn send(&mut self, packet: &Packet) {
        if let Err(_e) = self.transport.send(packet, self.config.send_timeout_ms) {
            crate::log_warn!("Packet send failed: {}", _e.as_str());
        }
    }

    fn send_failure(&mut self, code: CommandCode) {
        match failure_packet(code) {
            Ok(packet) => self.send(&packet),
            Err(_e) => crate::log_error!("Failure packet not built: {}", _e.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::imu::mpu9250::{registers, MagCalibrationConfig, Mpu9250Config};
    use crate::platform::mock::{MockRegisterBus, MockTimer, MockTransport};
    use crate::platform::TransportError;
    use imu_stream_core::ahrs::{CalibrationError, MAG_RESOLUTION};
    use imu_stream_core::protocol::PACKET_SIZE;

    const ADDR: u8 = registers::MPU9250_ADDR;
    const MAG: u8 = registers::AK8963_ADDR;

    struct Harness {
        bus: MockRegisterBus,
        timer: MockTimer,
        transport: MockTransport,
        dispatcher: Dispatcher<MockRegisterBus, MockTimer, MockTransport>,
    }

    fn harness_with(imu_config: Mpu9250Config) -> Harness {
        let bus = MockRegisterBus::new();
        let timer = MockTimer::new();
        let transport = MockTransport::new();
        // 480 bytes: 40 zero frames for the bias burst
        bus.set_registers(ADDR, registers::FIFO_COUNTH, &[0x01, 0xE0]);
        let imu = Mpu9250::new(bus.clone(), imu_config).unwrap();
        let dispatcher = Dispatcher::new(
            imu,
            timer.clone(),
            transport.clone(),
            DispatcherConfig::default(),
        );
        Harness {
            bus,
            timer,
            transport,
            dispatcher,
        }
    }

    fn harness() -> Harness {
        harness_with(Mpu9250Config::default())
    }

    fn request(bytes: &[u8]) -> Packet {
        let mut frame = [0u8; PACKET_SIZE];
        frame[..bytes.len()].copy_from_slice(bytes);
        Packet::from_bytes(frame)
    }

    fn payload_f32(packet: &Packet) -> std::vec::Vec<f32> {
        packet
            .payload()
            .unwrap()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    fn setup_count(bus: &MockRegisterBus) -> usize {
        bus.writes_to(ADDR, registers::I2C_MST_CTRL)
            .iter()
            .filter(|&&value| value == registers::I2C_MST_CLK_400KHZ)
            .count()
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let mut h = harness();
        assert_eq!(h.dispatcher.phase(), SessionPhase::Idle);
        h.dispatcher.tick().unwrap();
        assert!(h.transport.sent().is_empty());
    }

    #[test]
    fn test_threshold_one_emits_every_tick() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();
        assert_eq!(h.dispatcher.phase(), SessionPhase::Running);

        for _ in 0..3 {
            h.timer.advance_us(10_000);
            h.dispatcher.tick().unwrap();
        }

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 3);
        for packet in &sent {
            assert_eq!(packet.command_code(), 0);
            assert_eq!(packet.payload_len(), 60);
            assert!(!packet.is_final());
        }
        assert_eq!(h.transport.send_timeouts_ms(), vec![100, 100, 100]);
    }

    #[test]
    fn test_default_threshold_emits_every_hundred_ticks() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 0])).unwrap();

        for _ in 0..99 {
            h.dispatcher.tick().unwrap();
        }
        assert!(h.transport.sent().is_empty());

        h.dispatcher.tick().unwrap();
        assert_eq!(h.transport.sent().len(), 1);

        for _ in 0..100 {
            h.dispatcher.tick().unwrap();
        }
        assert_eq!(h.transport.sent().len(), 2);
    }

    #[test]
    fn test_stream_packet_layout_and_rate() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 2, 1, 1])).unwrap();

        h.timer.advance_us(10_000);
        h.dispatcher.tick().unwrap();
        // The 1 ms post-packet delay counts towards the next tick
        h.timer.advance_us(10_000);
        h.dispatcher.tick().unwrap();

        let sent = h.transport.sent();
        let first = payload_f32(&sent[0]);
        let second = payload_f32(&sent[1]);
        assert_eq!(first.len(), 15);
        assert!((first[14] - 100.0).abs() < 1e-2);
        assert!((second[14] - 1.0 / 0.011).abs() < 1e-2);

        // All-zero samples skip the filter, so the quaternion stays at the
        // configured start
        let q = &first[10..14];
        let norm = libm::sqrtf(q.iter().map(|v| v * v).sum::<f32>());
        assert!((norm - 1.0).abs() < 1e-5);
        assert!((q[0] - 0.39 / libm::sqrtf(0.39 * 0.39 + 0.92 * 0.92)).abs() < 1e-5);
    }

    #[test]
    fn test_zero_dt_reports_zero_rate() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();

        h.dispatcher.tick().unwrap();

        let values = payload_f32(&h.transport.sent()[0]);
        assert_eq!(values[14], 0.0);
    }

    #[test]
    fn test_stop_acknowledges_once() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[1, 0])).unwrap();

        h.dispatcher.tick().unwrap();
        h.dispatcher.tick().unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0].as_bytes()[..4], &[1, 1, 1, 1]);
        assert!(sent[0].as_bytes()[4..].iter().all(|&b| b == 0));
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_new_command_replaces_stream() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();
        h.dispatcher.tick().unwrap();
        assert_eq!(setup_count(&h.bus), 1);

        h.dispatcher.dispatch(&request(&[1, 0])).unwrap();
        h.dispatcher.tick().unwrap();
        h.dispatcher.tick().unwrap();

        let codes: std::vec::Vec<u8> = h
            .transport
            .sent()
            .iter()
            .map(|packet| packet.command_code())
            .collect();
        assert_eq!(codes, vec![0, 1]);
        assert_eq!(setup_count(&h.bus), 1);
    }

    #[test]
    fn test_setup_runs_once_before_first_execute() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();
        assert_eq!(setup_count(&h.bus), 1);
        assert!(h.transport.sent().is_empty());

        for _ in 0..5 {
            h.dispatcher.tick().unwrap();
        }
        assert_eq!(setup_count(&h.bus), 1);

        // Restarting the stream runs setup again
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();
        assert_eq!(setup_count(&h.bus), 2);
    }

    #[test]
    fn test_unknown_command_keeps_session() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();

        let result = h.dispatcher.dispatch(&request(&[9, 0]));

        assert_eq!(
            result,
            Err(SessionError::Protocol(
                imu_stream_core::protocol::ProtocolError::UnknownCommand(9)
            ))
        );
        assert_eq!(h.dispatcher.phase(), SessionPhase::Running);
        h.dispatcher.tick().unwrap();
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[test]
    fn test_poll_absorbs_rejected_request() {
        let mut h = harness();
        h.transport.push_inbound(request(&[0, 1, 1]));
        h.dispatcher.poll().unwrap();

        h.transport.push_inbound(request(&[9, 0]));
        assert!(h.dispatcher.poll().is_ok());

        assert_eq!(h.dispatcher.phase(), SessionPhase::Running);
        assert_eq!(h.transport.sent().len(), 2);
    }

    #[test]
    fn test_setup_failure_sends_failure_packet() {
        let mut h = harness();
        h.bus.set_registers(ADDR, registers::FIFO_COUNTH, &[0x00, 0x00]);

        let result = h.dispatcher.dispatch(&request(&[0, 1, 1]));

        assert_eq!(
            result,
            Err(SessionError::Device(
                crate::devices::imu::ImuError::Calibration(CalibrationError::NoFifoSamples)
            ))
        );
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0].as_bytes()[..4], &[0, 1, 1, 0]);

        h.dispatcher.tick().unwrap();
        assert_eq!(h.transport.sent().len(), 1);
    }

    #[test]
    fn test_register_dump_packets() {
        let mut h = harness();
        let block: std::vec::Vec<u8> = (0..127u8).map(|i| i ^ 0x5A).collect();
        h.bus.set_registers(ADDR, 0x00, &block);

        h.dispatcher.dispatch(&request(&[3, 0])).unwrap();
        h.timer.clear_delays();
        h.dispatcher.tick().unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 3);
        let lengths: std::vec::Vec<u8> = sent.iter().map(|p| p.payload_len()).collect();
        assert_eq!(lengths, vec![61, 61, 8]);
        let finals: std::vec::Vec<bool> = sent.iter().map(|p| p.is_final()).collect();
        assert_eq!(finals, vec![false, false, true]);

        let mut rebuilt = std::vec::Vec::new();
        for (packet, marker) in sent.iter().zip([0u8, 60, 120]) {
            let payload = packet.payload().unwrap();
            assert_eq!(payload[0], marker);
            rebuilt.extend_from_slice(&payload[1..]);
        }
        assert_eq!(rebuilt, block);

        assert_eq!(h.timer.delays_us(), vec![10_000; 4]);
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_register_dump_reinitializes_on_request() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[3, 1, 0])).unwrap();
        assert_eq!(setup_count(&h.bus), 0);

        h.dispatcher.dispatch(&request(&[3, 1, 1])).unwrap();
        assert_eq!(setup_count(&h.bus), 1);
    }

    fn short_mag_window() -> Mpu9250Config {
        Mpu9250Config {
            mag_calibration: MagCalibrationConfig {
                settle_ms: 0,
                sample_count: 4,
                sample_interval_ms: 12,
            },
            ..Mpu9250Config::default()
        }
    }

    fn mag_block(counts: [i16; 3]) -> [u8; registers::AK8963_DATA_LEN] {
        let mut block = [0u8; registers::AK8963_DATA_LEN];
        for axis in 0..3 {
            block[axis * 2..axis * 2 + 2].copy_from_slice(&counts[axis].to_le_bytes());
        }
        block[6] = 0x10;
        block
    }

    #[test]
    fn test_magnetometer_calibration_reply() {
        let mut h = harness_with(short_mag_window());
        h.bus.set_registers(MAG, registers::AK8963_ASAX, &[128, 128, 128]);
        for counts in [[-100, -50, -20], [300, 150, 40], [0, 0, 0], [0, 0, 0]] {
            h.bus.queue_read(MAG, registers::AK8963_HXL, &mag_block(counts));
        }

        h.dispatcher.dispatch(&request(&[2, 0])).unwrap();
        assert_eq!(h.bus.register(ADDR, registers::INT_PIN_CFG), 0x02);
        h.dispatcher.tick().unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_final());
        assert_eq!(sent[0].payload_len(), 24);
        let values = payload_f32(&sent[0]);
        assert!((values[0] - 100.0 * MAG_RESOLUTION).abs() < 1e-4);
        assert!((values[1] - 50.0 * MAG_RESOLUTION).abs() < 1e-4);
        assert!((values[2] - 10.0 * MAG_RESOLUTION).abs() < 1e-4);
        assert!((values[3] - 110.0 / 200.0).abs() < 1e-5);
        assert_eq!(h.dispatcher.imu().profile().mag_scale[0], values[3]);
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_stationary_magnetometer_reports_failure() {
        let mut h = harness_with(short_mag_window());

        h.dispatcher.dispatch(&request(&[2, 0])).unwrap();
        h.dispatcher.tick().unwrap();

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0].as_bytes()[..4], &[2, 1, 1, 0]);
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_poll_dispatches_then_ticks() {
        let mut h = harness();
        h.transport.push_inbound(request(&[1, 0]));

        h.dispatcher.poll().unwrap();

        assert_eq!(h.transport.sent().len(), 1);
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_send_failure_is_not_fatal() {
        let mut h = harness();
        h.transport.set_fault(Some(TransportError::Timeout));
        h.dispatcher.dispatch(&request(&[1, 0])).unwrap();

        assert!(h.dispatcher.tick().is_ok());
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_stream_survives_transient_read_error() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();
        h.dispatcher.tick().unwrap();

        h.bus.set_fault(Some(crate::platform::BusError::Nack));
        h.dispatcher.tick().unwrap();
        h.bus.set_fault(None);
        assert_eq!(h.dispatcher.phase(), SessionPhase::Running);
        assert_eq!(h.transport.sent().len(), 1);

        for _ in 0..5 {
            h.dispatcher.tick().unwrap();
        }

        let sent = h.transport.sent();
        assert_eq!(h.dispatcher.phase(), SessionPhase::Running);
        assert_eq!(sent.len(), 6);
        assert!(sent.iter().all(|p| p.payload_len() == 60 && !p.is_final()));
    }

    #[test]
    fn test_dump_read_error_stops_session() {
        let mut h = harness();
        h.dispatcher.dispatch(&request(&[3, 0])).unwrap();
        h.bus.set_fault(Some(crate::platform::BusError::Nack));

        assert!(h.dispatcher.tick().is_err());
        assert_eq!(h.dispatcher.phase(), SessionPhase::Stopped);
        // Failure packet still goes out; only the bus is broken
        assert_eq!(&h.transport.sent()[0].as_bytes()[..4], &[3, 1, 1, 0]);
    }

    #[test]
    fn test_stream_waits_for_data_ready() {
        let mut h = harness_with(Mpu9250Config {
            interrupts: true,
            ..Mpu9250Config::default()
        });
        h.dispatcher.dispatch(&request(&[0, 1, 1])).unwrap();

        h.dispatcher.tick().unwrap();
        assert!(h.transport.sent().is_empty());

        h.bus.queue_read(ADDR, registers::INT_STATUS, &[0x01]);
        h.dispatcher.tick().unwrap();
        h.dispatcher.tick().unwrap();

        assert_eq!(h.transport.sent().len(), 1);
        assert_eq!(h.dispatcher.phase(), SessionPhase::Running);
    }
}
