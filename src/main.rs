use ping_probe::{PingError, ProbeConfig, ProbeSession, StopCondition};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(argh::FromArgs)]
/// ping-probe - send ICMP ECHO_REQUEST to a numeric IPv4 or IPv6 address
struct Args {
    #[argh(option, short = 'a')]
    /// destination address, e.g. 127.0.0.1 or ::1
    address: Option<String>,

    #[argh(option, short = 't')]
    /// IP version of the address: 4 or 6
    ip_type: Option<u8>,

    #[argh(option, short = 'c', default = "0")]
    /// stop after <count> sent probes, 0 runs until interrupted
    count: u32,

    #[argh(switch, short = 'f')]
    /// flood mode, no pause between probes
    flood: bool,

    #[argh(switch, short = 'v')]
    /// verbose logging on stderr
    verbose: bool,
}

fn report_error(error: &PingError) -> ExitCode {
    eprintln!("Error: {}", error.message);
    if let Some(hint) = error.hint() {
        eprintln!("{hint}");
    }
    if error.is_fatal() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let max_level = if args.verbose { Level::TRACE } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(max_level).with_writer(std::io::stderr).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    let config = match ProbeConfig::from_args(args.address, args.ip_type, args.count, args.flood) {
        Ok(config) => config,
        Err(e) => return report_error(&e),
    };
    tracing::trace!("{:?}", config);

    let stop_condition = StopCondition::new();
    let handler_stop_condition = stop_condition.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_stop_condition.set_should_stop()) {
        eprintln!("Error: could not install interrupt handler: {e}");
        return ExitCode::FAILURE;
    }

    let mut session = match ProbeSession::open(config, stop_condition, std::io::stdout()) {
        Ok(session) => session,
        Err(e) => return report_error(&e),
    };

    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}
