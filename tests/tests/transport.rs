// Copyright (c) 2022-2023 The MobileCoin Foundation

use secel_core::{
    auth::Auth,
    proto::{zone::config_address, Command, Opcode, Zone},
    Config, Error, Exchange, Transport,
};
use secel_sim::{Fault, SimClock, SimHandle, REVISION};

mod helpers;
use helpers::*;

fn read_config_block(t: &mut TestTransport) -> Result<[u8; 32], Error> {
    let p = t.write(&Command::new(
        Opcode::Read,
        Zone::Config.block_param(),
        config_address(0),
    ))?;

    let mut b = [0u8; 32];
    t.read(p, &mut b)?;
    Ok(b)
}

#[test]
fn retry_exhaustion_after_all_attempts() {
    let s = setup(30);
    let mut t = s.sim.transport(Config::firmware());

    for _ in 0..101 {
        s.sim.inject(Fault::Silent);
    }

    assert_eq!(read_config_block(&mut t), Err(Error::Exhausted));

    let m = t.metrics();
    assert_eq!(m.not_ready, 101);
    assert_eq!(m.retries, 101);
    assert_eq!(m.retries_exhausted, 1);

    // The chip still holds its response, a later read succeeds
    let b = read_config_block(&mut t).unwrap();
    assert_eq!(&b[4..8], &REVISION);
    assert_eq!(t.metrics().retries_exhausted, 1);
}

#[test]
fn fewer_retries_when_configured() {
    let s = setup(31);
    let c = Config {
        retries: 4,
        ..Config::firmware()
    };
    let mut t = s.sim.transport(c);

    for _ in 0..5 {
        s.sim.inject(Fault::Silent);
    }

    assert_eq!(read_config_block(&mut t), Err(Error::Exhausted));
    assert_eq!(t.metrics().retries, 5);
}

#[test]
fn recovers_from_faults() {
    let s = setup(32);
    let mut t = s.sim.transport(Config::firmware());

    for f in [
        Fault::Silent,
        Fault::CorruptCrc,
        Fault::Short,
        Fault::Truncate,
        Fault::CorruptCrc,
    ] {
        s.sim.inject(f);
    }

    let b = read_config_block(&mut t).unwrap();
    assert_eq!(&b[4..8], &REVISION);

    let m = t.metrics();
    assert_eq!(m.retries, 5);
    assert_eq!(m.crc_errors, 3);
    assert_eq!(m.short_reads, 1);
    assert_eq!(m.not_ready, 1);
    assert_eq!(m.retries_exhausted, 0);

    // Command executed once regardless of retries
    assert_eq!(executed(&s.sim, Opcode::Read), 1);
}

#[test]
fn error_status_is_terminal() {
    let s = setup(33);
    let mut t = s.sim.transport(Config::firmware());

    s.sim.inject(Fault::Status(0xEE));

    let e = read_config_block(&mut t).unwrap_err();
    assert_eq!(e, Error::Chip(0xEE));
    assert!(e.is_transport());

    let m = t.metrics();
    assert_eq!(m.watchdog_timeouts, 1);
    assert_eq!(m.error_codes, 1);
    assert_eq!(m.retries, 0);
}

#[test]
fn bootloader_wake_delay() {
    let s = setup(34);
    let mut t = s.sim.transport(Config::bootloader());

    t.wake();
    t.sleep();

    assert_eq!(t.link().clock().delayed_us, 2500);
}

#[test]
fn protocol_without_idle_detect() {
    let s = setup(35);

    let mut uart = s.sim.uart();
    uart.idle_detect = false;

    let t = Transport::new(uart, SimClock::default(), Config::firmware());
    let mut a = Auth::new(t, secel_tests::provision(&s.sim, &s.pairing, &s.write_key));

    a.pair_unlock().unwrap();
    assert_eq!(a.info(), Ok(REVISION));

    assert!(a.exchange().metrics().failsafe > 0);
}

#[test]
fn sim_handles_share_chip() {
    let sim = SimHandle::new(36);
    let other = sim.clone();

    other.inject(Fault::Silent);
    let mut t = sim.transport(Config::firmware());

    read_config_block(&mut t).unwrap();
    assert_eq!(t.metrics().not_ready, 1);
}
