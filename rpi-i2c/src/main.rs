mod app;
mod args;
mod core_clock;
mod report;

use std::io::{stdout, Write};
use std::process::exit;
use dotenv::dotenv;
use log::{debug, error};
use sysinfo::System;
use crate::app::{App, AppError};

fn log_system_info() {
    const UNKNOWN_STR: &str = "???";

    debug!(
        "Running on {} {}, kernel {}, architecture {}",
        System::name().as_deref().unwrap_or(UNKNOWN_STR),
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );
}

fn main() {
    // Only used for RUST_LOG
    dotenv().ok();
    pretty_env_logger::init();

    log_system_info();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "rpi-i2c".to_string());
    let args: Vec<String> = args.collect();

    let app = App::from_system(program);
    let result = app.run(&args, &mut stdout().lock());
    _ = stdout().flush();

    let code = match result {
        Ok(()) => 0,
        // Usage was already printed on stdout
        Err(err @ AppError::Usage) => err.exit_code(),
        Err(err) => {
            error!("{:?}", err);
            eprintln!("{}", err);
            err.exit_code()
        }
    };

    exit(code);
}
