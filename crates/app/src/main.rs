mod cli;
mod config;
mod html;
mod server;
mod session;
mod telemetry;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = cli::parse();
    telemetry::init_tracing(cli.verbose)?;
    cli::dispatch(cli.command)
}
