//! gaugelink firmware entry point (nRF52840 + S140).
//!
//! Brings up the SoftDevice in Central role, the OLED, the X25 stepper and
//! the manual controls, spawns the radio workers and then runs the control
//! loop on a fixed ticker.

#![no_std]
#![no_main]

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{InterruptExt, Priority};
use embassy_nrf::saadc::{self, Saadc};
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, interrupt, peripherals};
use embassy_time::{Delay, Duration, Ticker};
use nrf_softdevice::{raw, Softdevice};
use {defmt_rtt as _, panic_probe as _};

use gaugelink::config::{
    GaugeConfig, ATT_MTU, COMMAND_CHAR_UUID, COMMAND_SERVICE_UUID, DIAL_RAW_MAX,
    DISPLAY_I2C_ADDRESS, GAUGE_STEPS, TICK_PERIOD_MS, X25_ZERO_STEP_US,
};
use gaugelink::control::ControlLoop;
use gaugelink::gauge::x25::X25Motor;
use gaugelink::link::softdevice::{notification_task, scan_task, SoftdeviceRadio};
use gaugelink::link::{LinkManager, SharedLink};
use gaugelink::ui::display::Oled;
use gaugelink::ui::inputs::PanelInputs;
use gaugelink::ui::StatusDisplay;

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
    SAADC => saadc::InterruptHandler;
});

static SHARED: SharedLink = SharedLink::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn ble_scan_task(sd: &'static Softdevice) -> ! {
    scan_task(sd, &SHARED).await
}

#[embassy_executor::task]
async fn ble_notify_task() -> ! {
    notification_task(&SHARED).await
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t {
            att_mtu: ATT_MTU,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        ..Default::default()
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("gaugelink starting");

    // P0, P1 and P4 belong to the SoftDevice.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);
    interrupt::SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0.set_priority(Priority::P3);
    interrupt::SAADC.set_priority(Priority::P3);

    let sd: &'static Softdevice = Softdevice::enable(&softdevice_config());
    for spawned in [
        spawner.spawn(softdevice_task(sd)),
        spawner.spawn(ble_scan_task(sd)),
        spawner.spawn(ble_notify_task()),
    ] {
        if spawned.is_err() {
            error!("Failed to spawn BLE task");
            halt();
        }
    }

    // OLED
    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let oled = match Oled::init(i2c, DISPLAY_I2C_ADDRESS) {
        Ok(oled) => oled,
        Err(e) => {
            error!("SSD1306 allocation failed: {}", e);
            halt();
        }
    };

    // X25 stepper
    let coils = [
        Output::new(p.P1_01, Level::Low, OutputDrive::Standard),
        Output::new(p.P1_02, Level::Low, OutputDrive::Standard),
        Output::new(p.P1_03, Level::Low, OutputDrive::Standard),
        Output::new(p.P1_04, Level::Low, OutputDrive::Standard),
    ];
    let motor = X25Motor::new(coils, Delay, GAUGE_STEPS, X25_ZERO_STEP_US);

    // Reset button + dial
    let reset = Input::new(p.P0_11, Pull::Up);
    let channel = saadc::ChannelConfig::single_ended(p.P0_03);
    let mut dial = Saadc::new(p.SAADC, Irqs, saadc::Config::default(), [channel]);
    dial.calibrate().await;
    let inputs = PanelInputs::new(reset, dial, DIAL_RAW_MAX);

    let link = LinkManager::new(&SHARED, SoftdeviceRadio::new(sd), COMMAND_CHAR_UUID, ATT_MTU);
    let mut control = ControlLoop::new(
        GaugeConfig::DEFAULT,
        COMMAND_SERVICE_UUID,
        link,
        motor,
        StatusDisplay::new(oled),
        inputs,
    );

    control.start().await;

    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    loop {
        control.tick().await;
        ticker.next().await;
    }
}
