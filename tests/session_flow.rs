//! End-to-end session flow over the mock platform

use imu_stream::communication::session::{Dispatcher, DispatcherConfig, SessionPhase};
use imu_stream::devices::imu::mpu9250::registers;
use imu_stream::devices::imu::{Mpu9250, Mpu9250Config};
use imu_stream::platform::mock::{MockRegisterBus, MockTimer, MockTransport};
use imu_stream_core::protocol::{Packet, PACKET_SIZE};

const ADDR: u8 = registers::MPU9250_ADDR;

fn request(bytes: &[u8]) -> Packet {
    let mut frame = [0u8; PACKET_SIZE];
    frame[..bytes.len()].copy_from_slice(bytes);
    Packet::from_bytes(frame)
}

/// Sample block with gravity on Z and a field along the magnetometer X axis
fn level_sample() -> [u8; 21] {
    let mut block = [0u8; 21];
    block[4..6].copy_from_slice(&16384i16.to_be_bytes());
    block[14..16].copy_from_slice(&200i16.to_le_bytes());
    block[18..20].copy_from_slice(&(-300i16).to_le_bytes());
    block[20] = 0x10;
    block
}

#[test]
fn stream_dump_and_stop_through_poll() {
    let bus = MockRegisterBus::new();
    let timer = MockTimer::new();
    let transport = MockTransport::new();
    bus.set_registers(ADDR, registers::FIFO_COUNTH, &[0x00, 0x30]);

    let imu = Mpu9250::new(bus.clone(), Mpu9250Config::default()).unwrap();
    let mut dispatcher = Dispatcher::new(
        imu,
        timer.clone(),
        transport.clone(),
        DispatcherConfig::default(),
    );

    // Stream with Mahony, one packet every 2 samples
    transport.push_inbound(request(&[0, 2, 2, 1]));
    dispatcher.poll().unwrap();
    assert_eq!(dispatcher.phase(), SessionPhase::Running);
    bus.set_registers(ADDR, registers::ACCEL_XOUT_H, &level_sample());

    for _ in 0..10 {
        timer.advance_us(5_000);
        dispatcher.poll().unwrap();
    }

    let streamed = transport.sent();
    assert_eq!(streamed.len(), 5);
    for packet in &streamed {
        let values: Vec<f32> = packet
            .payload()
            .unwrap()
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values.len(), 15);
        let norm: f32 = values[10..14].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
        assert!(values[14] > 0.0);
    }
    transport.clear_sent();

    // Register dump replaces the stream
    transport.push_inbound(request(&[3, 0]));
    dispatcher.poll().unwrap();
    let dump = transport.sent();
    assert_eq!(dump.len(), 3);
    assert!(dump.iter().all(|p| p.command_code() == 3));
    assert_eq!(dispatcher.phase(), SessionPhase::Stopped);
    transport.clear_sent();

    transport.push_inbound(request(&[1, 0]));
    dispatcher.poll().unwrap();
    dispatcher.poll().unwrap();
    let stop = transport.sent();
    assert_eq!(stop.len(), 1);
    assert_eq!(&stop[0].as_bytes()[..4], &[1, 1, 1, 1]);
}
