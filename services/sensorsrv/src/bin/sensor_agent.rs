//! Sensor agent
//!
//! Emulates a field node: reads (synthesises) temperature and humidity on a
//! fixed interval and posts them to `/send_data`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use common::logging::{self, LogConfig};
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{error, info, warn};

use sensorsrv::api::models::{LoginRequest, LoginResponse, SendDataRequest, SendDataResponse};
use sensorsrv::ingest::{SIMULATED_HUMIDITY, SIMULATED_TEMPERATURE};

#[derive(Parser)]
#[command(name = "sensor-agent")]
#[command(author, version, about = "Emulated sensor node posting readings to sensorsrv")]
struct Args {
    /// Base URL of the sensor service
    #[arg(long, env = "SENSOR_AGENT_URL", default_value = "http://127.0.0.1:5000")]
    url: String,

    /// Sensor id reported with each reading
    #[arg(long, default_value_t = 1)]
    sensor_id: i64,

    /// Seconds between readings
    #[arg(long, default_value_t = 60)]
    interval: u64,

    #[arg(long, default_value = "admin")]
    username: String,

    #[arg(long, env = "SENSOR_AGENT_PASSWORD", default_value = "password")]
    password: String,

    /// Skip login (service running with --no-auth)
    #[arg(long)]
    no_auth: bool,

    /// Send a single reading and exit
    #[arg(long)]
    once: bool,

    #[arg(long, default_value = "info")]
    log_level: String,
}

struct Agent {
    client: Client,
    args: Args,
    token: Option<String>,
}

impl Agent {
    fn new(args: Args) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            args,
            token: None,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.args.url.trim_end_matches('/'), path)
    }

    async fn login(&mut self) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("login"))
            .json(&LoginRequest {
                username: self.args.username.clone(),
                password: self.args.password.clone(),
            })
            .send()
            .await
            .context("Login request failed")?;

        if !response.status().is_success() {
            bail!("Login rejected with status {}", response.status());
        }

        let body: LoginResponse = response.json().await.context("Invalid login response")?;
        self.token = Some(body.token);
        info!("Logged in as {}", self.args.username);
        Ok(())
    }

    fn read_sensor(&self) -> SendDataRequest {
        let mut rng = rand::thread_rng();
        SendDataRequest {
            sensor_id: Some(self.args.sensor_id),
            temperature: Some(round1(
                rng.gen_range(SIMULATED_TEMPERATURE.0..=SIMULATED_TEMPERATURE.1),
            )),
            humidity: Some(round1(
                rng.gen_range(SIMULATED_HUMIDITY.0..=SIMULATED_HUMIDITY.1),
            )),
        }
    }

    async fn post(&self, reading: &SendDataRequest) -> Result<reqwest::Response> {
        let mut request = self.client.post(self.endpoint("send_data")).json(reading);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.context("send_data request failed")
    }

    /// Post one reading, logging in again once if the token was refused
    async fn send_reading(&mut self) -> Result<()> {
        let reading = self.read_sensor();
        let mut response = self.post(&reading).await?;

        if response.status() == StatusCode::UNAUTHORIZED && !self.args.no_auth {
            warn!("Token refused, re-authenticating");
            self.login().await?;
            response = self.post(&reading).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("send_data failed with status {}: {}", status, body);
        }

        let stored: SendDataResponse = response.json().await.context("Invalid send_data response")?;
        info!(
            id = stored.id,
            temperature = ?reading.temperature,
            humidity = ?reading.humidity,
            "Reading delivered"
        );
        Ok(())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_with_config(&LogConfig {
        service_name: "sensor-agent".to_string(),
        level: args.log_level.clone(),
        enable_json: false,
        log_dir: None,
    })?;

    let interval = Duration::from_secs(args.interval.max(1));
    let once = args.once;
    let mut agent = Agent::new(args)?;

    if !agent.args.no_auth {
        agent.login().await?;
    }

    if once {
        return agent.send_reading().await;
    }

    info!(
        "Posting readings for sensor {} every {:?}",
        agent.args.sensor_id, interval
    );
    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = agent.send_reading().await {
                    error!("{:#}", e);
                }
            }
            _ = &mut shutdown => {
                info!("Stopping sensor agent");
                break;
            }
        }
    }
    Ok(())
}
