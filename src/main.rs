use std::env;
use std::fs;
use std::io::{self, BufRead};
use std::process;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::{error, info};
use rand::Rng;

use tapemeter::{
    ChannelReadout, Meter, MeterCommand, MeterConfig, MeterError, Monitor, MonitorCard,
    ReadoutUpdate, Theme,
};

struct Args {
    max_value: f64,
    initial_value: f64,
    font_path: Option<String>,
    dark: bool,
    wander: bool,
}

fn parse_args() -> Args {
    let mut parsed = Args {
        max_value: 200.0,
        initial_value: 120.0,
        font_path: env::var("TAPEMETER_FONT").ok(),
        dark: false,
        wander: false,
    };
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max" => {
                if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                    parsed.max_value = value;
                }
            }
            "--value" => {
                if let Some(value) = args.next().and_then(|v| v.parse().ok()) {
                    parsed.initial_value = value;
                }
            }
            "--font" => parsed.font_path = args.next(),
            "--dark" => parsed.dark = true,
            "--wander" => parsed.wander = true,
            other => info!("ignoring unknown argument {}", other),
        }
    }
    parsed
}

fn run(args: Args) -> Result<(), MeterError> {
    let font_data = match args.font_path.as_deref() {
        Some(path) => match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!("could not read font {}: {}", path, err);
                None
            }
        },
        None => None,
    };

    let config = MeterConfig::builder()
        .max_value(args.max_value)
        .initial_value(args.initial_value)
        .theme(if args.dark { Theme::dark() } else { Theme::light() })
        .maybe_font_data(font_data)
        .build();

    let monitor = Monitor::new(vec![
        MonitorCard::new("Humidity", "45", "%").faded(),
        MonitorCard::new(&config.label, "0", &config.unit),
    ]);

    let (update_tx, update_rx) = mpsc::channel::<ReadoutUpdate>();
    thread::spawn(move || {
        for update in update_rx {
            info!("{} {}{}", update.label, update.value, update.unit);
        }
    });
    let meter = Meter::with_readout(config, monitor, Box::new(ChannelReadout::new(update_tx)))?;

    let (command_tx, command_rx) = mpsc::channel();

    // Values piped on stdin, one per line
    let stdin_tx = command_tx.clone();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines().map_while(Result::ok) {
            if let Ok(value) = line.trim().parse::<f64>() {
                if stdin_tx.send(MeterCommand::SetValue(value)).is_err() {
                    break;
                }
            }
        }
    });

    if args.wander {
        let max_value = args.max_value;
        thread::spawn(move || {
            let mut rng = rand::rng();
            let mut value = max_value / 2.0;
            loop {
                value = (value + rng.random_range(-3.0..3.0)).clamp(0.0, max_value);
                if command_tx.send(MeterCommand::SetValue(value.round())).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        });
    }

    meter.show_with_commands(command_rx)
}

fn main() {
    env_logger::init();
    if let Err(err) = run(parse_args()) {
        error!("{}", err);
        process::exit(1);
    }
}
