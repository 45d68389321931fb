//! Command-line client for a SolsTiS laser controller
//!
//! # Usage
//!
//! ```bash
//! solstis --address 192.168.1.222 status
//! solstis sweep --start 779.0 --stop 781.0 --steps 21
//! solstis terascan --scan medium --start 775.5 --stop 780.5 --rate 100GHz --auto-output --pause
//! solstis monitor --period-ms 500 --samples 120 > power.csv
//! solstis fast-scan --type etalon_continuous --width 10 --time 2
//! ```
//!
//! Settings come from `--config`, then `SOLSTIS_*` environment variables,
//! then the command-line overrides.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use solstis::client::{
    AutoOutputSettings, ClientBuilder, ClientConfig, FastScanType, ScanController, ScanRate,
    ScanSession, ScanType, SolstisClient, WavemeterState,
};
use solstis::transport::TcpTransport;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "solstis")]
#[command(about = "Control a SolsTiS laser over its JSON protocol", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Controller address, overriding the configuration
    #[arg(long, global = true)]
    address: Option<String>,

    /// Controller port, overriding the configuration
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log protocol traffic
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full system status as JSON
    Status,

    /// Step the wavelength meter setpoint across a range
    Sweep {
        #[arg(long)]
        start: f64,
        #[arg(long)]
        stop: f64,
        /// Number of setpoints, both ends included
        #[arg(long, default_value = "11")]
        steps: u32,
        /// Give up on a setpoint after this long
        #[arg(long, default_value = "30000")]
        settle_timeout_ms: u64,
    },

    /// Run a TeraScan
    Terascan {
        /// medium, fine or line
        #[arg(long)]
        scan: ScanType,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        stop: f64,
        /// e.g. 100GHz or 500MHz
        #[arg(long)]
        rate: ScanRate,
        /// Follow automatic-output pushes instead of polling
        #[arg(long)]
        auto_output: bool,
        /// Pause at each segment start until continued
        #[arg(long, requires = "auto_output")]
        pause: bool,
        /// Wavelength an `end` push must reach to finish, defaults to --stop
        #[arg(long)]
        completion_bound: Option<f64>,
        #[arg(long, default_value = "500")]
        poll_ms: u64,
        /// Longest wait for a push
        #[arg(long, default_value = "30000")]
        push_timeout_ms: u64,
    },

    /// Log the output monitor as CSV
    Monitor {
        #[arg(long, default_value = "1000")]
        period_ms: u64,
        #[arg(long, default_value = "60")]
        samples: u32,
    },

    /// Run a fast scan and print the tuner position
    FastScan {
        #[arg(long = "type")]
        scan_type: FastScanType,
        /// Scan width in GHz
        #[arg(long)]
        width: f64,
        /// Scan time in s
        #[arg(long)]
        time: f64,
        #[arg(long, default_value = "100")]
        poll_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let mut config = ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.validate()?;

    log::info!("Connecting to {}", config.endpoint());
    let mut client = ClientBuilder::from_config(&config)
        .connect_and_link()
        .await
        .with_context(|| format!("Failed to connect to {}", config.endpoint()))?;

    let result = run(&mut client, cli.command).await;
    if let Err(e) = client.close().await {
        log::warn!("Error while closing connection: {}", e);
    }
    result
}

async fn run(client: &mut SolstisClient<TcpTransport>, command: Commands) -> Result<()> {
    match command {
        Commands::Status => {
            let status = client.get_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Sweep {
            start,
            stop,
            steps,
            settle_timeout_ms,
        } => sweep(client, start, stop, steps, Duration::from_millis(settle_timeout_ms)).await?,
        Commands::Terascan {
            scan,
            start,
            stop,
            rate,
            auto_output,
            pause,
            completion_bound,
            poll_ms,
            push_timeout_ms,
        } => {
            let mut session = ScanSession::new(scan, start, stop, rate)?;
            if let Some(bound) = completion_bound {
                session = session.with_completion_bound(bound);
            }
            let mut controller = ScanController::new(client, session);
            controller.initialise().await?;
            if auto_output {
                let settings = AutoOutputSettings {
                    pause,
                    ..AutoOutputSettings::default()
                };
                controller.enable_automatic_output(settings).await?;
                controller.start().await?;
                println!("wavelength_nm,status");
                let summary = controller
                    .observe(Some(Duration::from_millis(push_timeout_ms)), |event| {
                        println!("{},{}", event.wavelength, event.status);
                    })
                    .await;
                log::info!(
                    "{} pushes, {} continues sent, completed: {}",
                    summary.events,
                    summary.continues_sent,
                    summary.completed
                );
                if !summary.completed {
                    controller.stop().await?;
                    if let Some(e) = summary.ended_by {
                        bail!("TeraScan did not complete: {}", e);
                    }
                }
            } else {
                controller.start().await?;
                println!("current_nm,coverage,state");
                controller
                    .run_polling(Duration::from_millis(poll_ms), |progress| {
                        if let (Some(nm), Some(coverage)) = (progress.current, progress.coverage) {
                            println!("{},{:.4},{}", nm, coverage, progress.state);
                        }
                    })
                    .await?;
            }
        }
        Commands::Monitor { period_ms, samples } => {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_millis(period_ms));
            println!("elapsed_s,wavelength_nm,output_monitor");
            for _ in 0..samples {
                ticker.tick().await;
                let status = client.get_status().await?;
                println!(
                    "{:.3},{},{}",
                    started.elapsed().as_secs_f64(),
                    status.wavelength,
                    status.output_monitor
                );
            }
        }
        Commands::FastScan {
            scan_type,
            width,
            time,
            poll_ms,
        } => {
            client.fast_scan_start(scan_type, width, time).await?;
            println!("tuner_value");
            loop {
                let poll = client.fast_scan_poll(scan_type).await?;
                if !poll.in_progress {
                    break;
                }
                if let Some(value) = poll.tuner_value {
                    println!("{}", value);
                }
                tokio::time::sleep(Duration::from_millis(poll_ms)).await;
            }
        }
    }
    Ok(())
}

/// Set each wavelength in turn and wait for the meter loop to settle
async fn sweep(
    client: &mut SolstisClient<TcpTransport>,
    start: f64,
    stop: f64,
    steps: u32,
    settle_timeout: Duration,
) -> Result<()> {
    if steps < 2 {
        bail!("A sweep needs at least 2 steps, got {}", steps);
    }
    let increment = (stop - start) / f64::from(steps - 1);
    println!("set_nm,measured_nm");
    for i in 0..steps {
        let target = start + increment * f64::from(i);
        client.set_wave_m(target).await?;
        let deadline = Instant::now() + settle_timeout;
        let measured = loop {
            let poll = client.poll_wave_m().await?;
            if poll.state != WavemeterState::Tuning {
                break poll.current_wavelength;
            }
            if Instant::now() >= deadline {
                bail!("Wavelength {} nm did not settle within {:?}", target, settle_timeout);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        };
        println!("{},{}", target, measured);
    }
    Ok(())
}
