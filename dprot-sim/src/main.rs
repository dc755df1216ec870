//! Runs a master and a slave on two threads over a simulated noisy line.

mod link;
mod queue;
mod summary;

use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::{Parser, ValueEnum};
use dprot::{Checking, Config, ErrorKind, Inbound, Master, Reply, Slave, MAX_MESSAGE_SIZE, MAX_PAYLOAD};
use log::{debug, error, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::link::{pair, SimLink};
use crate::queue::{OverflowPolicy, MAX_CAPACITY};
use crate::summary::{Sent, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CheckingArg {
    Crc8,
    Checksum,
    Xor,
}

impl From<CheckingArg> for Checking {
    fn from(arg: CheckingArg) -> Self {
        match arg {
            CheckingArg::Crc8 => Checking::Crc8,
            CheckingArg::Checksum => Checking::Checksum8,
            CheckingArg::Xor => Checking::Xor8,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "dprot-sim", version, about = "Exercise dProt over a lossy simulated serial line")]
struct Args {
    /// Number of data messages the master sends
    #[arg(short = 'n', long, default_value_t = 1000)]
    messages: u32,

    /// Upper bound of the random payload length
    #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u16).range(0..=MAX_PAYLOAD as i64))]
    max_len: u16,

    /// Probability that a byte from master to slave is replaced
    #[arg(long, default_value_t = 0.001, value_parser = parse_probability)]
    out_ber: f64,

    /// Probability that a byte from slave to master is replaced
    #[arg(long, default_value_t = 0.0, value_parser = parse_probability)]
    in_ber: f64,

    /// Seed for payloads and line noise
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Bytes each direction of the line can hold
    #[arg(long, default_value_t = 128, value_parser = clap::value_parser!(u16).range(1..=MAX_CAPACITY as i64))]
    queue_capacity: u16,

    /// What a full line does with new bytes
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Overwrite)]
    policy: OverflowPolicy,

    /// Integrity check appended to every message
    #[arg(long, value_enum, default_value_t = CheckingArg::Crc8)]
    checking: CheckingArg,

    /// Transmission attempts per message
    #[arg(long, default_value_t = dprot::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u8,

    /// Per-byte receive timeout of the master
    #[arg(long, default_value_t = dprot::DEFAULT_RX_TIMEOUT_MS)]
    rx_timeout_ms: u32,
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{p} is not in 0.0..=1.0"))
    }
}

struct MasterRun {
    sent: Vec<Sent>,
    stats: dprot::MasterStats,
    corrupted: u64,
    overwritten: u64,
}

struct SlaveRun {
    stats: dprot::SlaveStats,
    corrupted: u64,
    overwritten: u64,
}

fn run_master(link: SimLink, config: Config, args: &Args) -> MasterRun {
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(2));
    let mut master = Master::new(link, config);
    let mut sent = Vec::with_capacity(args.messages as usize);
    let mut buf = [0u8; MAX_MESSAGE_SIZE];

    for index in 0..args.messages {
        let len = rng.gen_range(0..=usize::from(args.max_len));
        let payload = &mut buf[..len];
        rng.fill(payload);

        master.advance_parity();
        let outcome = master.send_data(payload);
        match outcome {
            Ok(Reply::Ack) => debug!("Master #{index}: ACK ({len} bytes)"),
            Ok(Reply::Nack) => warn!("Master #{index}: NACK ({len} bytes)"),
            Err(e) => warn!("Master #{index}: {e} ({len} bytes)"),
        }
        sent.push(Sent {
            payload: payload.to_vec(),
            outcome,
        });
    }

    let stats = *master.stats();
    let link = master.into_inner();
    link.close();
    MasterRun {
        sent,
        stats,
        corrupted: link.corrupted(),
        overwritten: link.overwritten(),
    }
}

fn run_slave(link: SimLink, config: Config, deliver: mpsc::Sender<Vec<u8>>) -> SlaveRun {
    let mut slave = Slave::new(link, config);
    let mut buf = [0u8; MAX_MESSAGE_SIZE];

    loop {
        match slave.wait_for_msg(&mut buf) {
            Ok(Inbound::Data(payload)) => {
                if deliver.send(payload.to_vec()).is_err() {
                    break;
                }
            }
            Ok(other) => debug!("Slave: {other:?}"),
            Err(e) if e.kind() == ErrorKind::Framing && slave.link().rx_closed() => break,
            Err(e) => debug!("Slave: {e}"),
        }
    }

    let stats = *slave.stats();
    let link = slave.into_inner();
    link.close();
    SlaveRun {
        stats,
        corrupted: link.corrupted(),
        overwritten: link.overwritten(),
    }
}

/// Runs both roles to completion. Returns `None` if either thread panicked.
fn simulate(args: Args) -> Option<Summary> {
    let config = Config::new()
        .with_checking(args.checking.into())
        .with_max_attempts(args.max_attempts)
        .with_rx_timeout_ms(args.rx_timeout_ms);
    info!(
        "Simulating {} messages: out BER {}, in BER {}, seed {}, queue {} ({:?})",
        args.messages, args.out_ber, args.in_ber, args.seed, args.queue_capacity, args.policy
    );

    let (master_link, slave_link) = pair(
        usize::from(args.queue_capacity),
        args.policy,
        args.out_ber,
        args.in_ber,
        args.seed,
    );
    let (deliver_tx, deliver_rx) = mpsc::channel();

    let slave = thread::spawn(move || run_slave(slave_link, config, deliver_tx));
    let master = thread::spawn(move || run_master(master_link, config, &args));

    let master = match master.join() {
        Ok(run) => run,
        Err(_) => {
            error!("Master thread panicked");
            return None;
        }
    };
    let slave = match slave.join() {
        Ok(run) => run,
        Err(_) => {
            error!("Slave thread panicked");
            return None;
        }
    };
    let delivered: Vec<Vec<u8>> = deliver_rx.iter().collect();

    let mut summary = Summary::new(&master.sent, &delivered, master.stats, slave.stats);
    summary.corrupted = (master.corrupted, slave.corrupted);
    summary.overwritten = (master.overwritten, slave.overwritten);
    Some(summary)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let Some(summary) = simulate(args) else {
        return ExitCode::FAILURE;
    };
    for line in summary.to_string().lines() {
        info!("{line}");
    }

    if summary.delivery.exactly_once() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
