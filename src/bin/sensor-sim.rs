//! Temperature Sensor Simulator
//!
//! Publishes a random-walk temperature to the broker so the assistant can
//! be exercised without the ESP32 on the desk.
//!
//! ## Usage
//!
//! ```bash
//! # Publish to the configured topic every 5 seconds
//! sensor-sim
//!
//! # Faster walk on a custom topic
//! sensor-sim --topic lab/temp --interval-secs 1
//!
//! # Ten readings and exit
//! sensor-sim --count 10
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use rand::Rng;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::time::{sleep, Duration};

#[derive(Parser)]
#[command(
    name = "sensor-sim",
    about = "Publish simulated temperature readings for the assistant to pick up"
)]
struct Args {
    /// MQTT broker as host:port
    #[arg(long, env = "MQTTBROKER", default_value = "localhost:1883")]
    broker: String,

    /// Topic to publish readings on
    #[arg(long, env = "TEMP", default_value = "esp32/temp")]
    topic: String,

    /// Seconds between readings
    #[arg(long, default_value = "5")]
    interval_secs: u64,

    /// Starting temperature in Celsius
    #[arg(long, default_value = "21.0")]
    start: f64,

    /// Largest step between consecutive readings
    #[arg(long, default_value = "0.4")]
    drift: f64,

    /// Number of readings to publish (unlimited if omitted)
    #[arg(long)]
    count: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let (host, port) = parse_broker(&args.broker)?;

    let client_id = format!(
        "sensor-sim-{}",
        SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs()
    );
    let mut mqtt_options = MqttOptions::new(client_id, host, port);
    mqtt_options.set_keep_alive(Duration::from_secs(60));

    let (client, mut event_loop) = AsyncClient::new(mqtt_options, 10);

    // Drive the connection in the background
    tokio::spawn(async move {
        loop {
            if let Err(e) = event_loop.poll().await {
                eprintln!("MQTT event loop error: {e}");
                break;
            }
        }
    });

    println!("Connecting to MQTT broker {}...", args.broker);
    sleep(Duration::from_millis(1000)).await;

    println!(
        "Publishing to '{}' every {}s (Ctrl-C to stop)",
        args.topic, args.interval_secs
    );

    let mut temperature = args.start;
    let mut published = 0u64;

    loop {
        let payload = format!("{temperature:.1}");
        client
            .publish(args.topic.as_str(), QoS::AtLeastOnce, false, payload.clone())
            .await?;
        println!("Published {payload} °C to {}", args.topic);

        published += 1;
        if let Some(count) = args.count {
            if published >= count {
                break;
            }
        }

        sleep(Duration::from_secs(args.interval_secs)).await;
        temperature = step(temperature, args.drift);
    }

    println!("✓ Published {published} readings");
    Ok(())
}

/// One step of the random walk, clamped to a plausible indoor range.
fn step(current: f64, drift: f64) -> f64 {
    let delta = rand::rng().random_range(-drift..=drift);
    (current + delta).clamp(5.0, 35.0)
}

fn parse_broker(broker: &str) -> Result<(String, u16), Box<dyn std::error::Error>> {
    let (host, port) = broker
        .rsplit_once(':')
        .ok_or_else(|| format!("Invalid broker '{broker}': expected host:port"))?;
    let port: u16 = port
        .parse()
        .map_err(|_| format!("Invalid broker '{broker}': port must be a number"))?;
    Ok((host.to_string(), port))
}
