use std::env;

use inquire::Select;
use srs_sim928::{Sim928, config::DEFAULT_BAUD_RATE, serial::SerialConnector};

// Configuration constants - adjust these for your setup
const OUTPUT_VOLTAGE_V: f64 = 1.5;
const STABILIZATION_DELAY_MS: u64 = 1000;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        // List available serial ports
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        // Interactive selection
        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let sim: Sim928<SerialConnector> = Sim928::serial();
    sim.add_connection_listener(|connected| println!("Connection state changed: {connected}"));
    sim.connect(&port_name, DEFAULT_BAUD_RATE)
        .expect("Failed to open serial port");

    println!("Identity: {}", sim.read_ident().unwrap());

    let state = sim.read_battery_state().unwrap();
    let (main, backup, service) = sim.battery_state_description().as_strs();
    println!(
        "Battery state: {:?} => main {main:?}, backup {backup:?}, service {service:?}",
        state
    );

    println!("\n--- Battery Pack ---");
    for (param, value) in sim.read_battery_info_all().unwrap() {
        println!("{param}: {value}");
    }

    // Set output voltage
    sim.write_volt(OUTPUT_VOLTAGE_V).unwrap();
    println!("Set output voltage to {}V", OUTPUT_VOLTAGE_V);

    // Enable the output
    sim.write_output_on(true).unwrap();
    println!("Output enabled: {}", sim.read_output_on().unwrap());

    // Wait for output to stabilize
    std::thread::sleep(std::time::Duration::from_millis(STABILIZATION_DELAY_MS));

    match sim.read_volt().unwrap() {
        Some(volt) => println!("Voltage setpoint: {volt:.3}V"),
        None => println!("Voltage setpoint could not be read"),
    }

    sim.write_output_on(false).unwrap();
    println!("Output disabled: {}", sim.read_output_on().unwrap() == 0);

    sim.disconnect().unwrap();
}
