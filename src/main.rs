use failure::{bail, Fallible};
use log::{info, warn};
use std::{
    net::{SocketAddr, ToSocketAddrs},
    process::exit,
    time::Duration,
};
use structopt::{clap::AppSettings, StructOpt};
use tokio::runtime::{Builder, Runtime};
use tripplat::{
    dal::{PlaceSearch, DB},
    logic,
    router::{serve_on, State},
    util::log_err,
};

fn main() {
    dotenv::dotenv().ok();

    let options = Options::from_args();
    if let Err(err) = options.start_logger() {
        warn!("Logging couldn't start: {}", err);
    }

    if let Err(err) = run(options) {
        log_err(&err);
        exit(1);
    }
}

fn run(options: Options) -> Fallible<()> {
    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let db = DB::connect(&options.database_url)?;
    match options.command {
        Some(Command::AddUser { ref name }) => add_user(&runtime, &db, name),
        Some(Command::Serve) | None => {
            let serve_addr = options.serve_addr()?;
            let search = match options.kakao_rest_key {
                Some(ref key) => PlaceSearch::kakao(
                    key.clone(),
                    Duration::from_secs(options.search_timeout),
                )?,
                None => {
                    warn!("No Kakao REST API key was given; only saved places can be searched");
                    PlaceSearch::disabled()
                }
            };
            let state = State {
                db,
                search,
                map_key: options.kakao_js_key.clone(),
            };
            runtime.block_on(serve_on(serve_addr, state))
        }
    }
}

fn add_user(runtime: &Runtime, db: &DB, name: &str) -> Fallible<()> {
    let (user, token) = runtime.block_on(logic::auth::register(db, name.to_string()))?;
    info!("Created user {} ({:?})", user.id, user.name);
    println!("{}\t{}", user.name, token);
    Ok(())
}

#[derive(Debug, StructOpt)]
#[structopt(global_settings = &[AppSettings::ColoredHelp])]
pub struct Options {
    /// Turns off message output. Passing once prevents logging to syslog. Passing twice or more
    /// disables all logging.
    #[structopt(short = "q", long = "quiet", parse(from_occurrences))]
    quiet: usize,

    /// Increases the verbosity. Default verbosity is warnings and higher to syslog, info and
    /// higher to the console.
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// The path to the SQLite database, or `:memory:`.
    #[structopt(long = "db", env = "DATABASE_URL")]
    pub database_url: String,

    /// The host to serve on.
    #[structopt(short = "H", long = "host", env = "HOST", default_value = "::")]
    host: String,

    /// The port to serve on.
    #[structopt(short = "P", long = "port", env = "PORT", default_value = "8080")]
    port: u16,

    /// The Kakao REST API key, for searching for places. Without one, only places that have
    /// already been saved can be found.
    #[structopt(long = "kakao-rest-key", env = "KAKAO_REST_API_KEY")]
    pub kakao_rest_key: Option<String>,

    /// The Kakao JavaScript key, for the map page.
    #[structopt(long = "kakao-js-key", env = "KAKAO_JAVASCRIPT_KEY")]
    pub kakao_js_key: Option<String>,

    /// How long to wait for the place search provider, in seconds.
    #[structopt(long = "search-timeout", default_value = "5")]
    pub search_timeout: u64,

    /// The syslog server to send logs to.
    #[structopt(short = "s", long = "syslog-server", env = "SYSLOG_SERVER")]
    syslog_server: Option<String>,

    #[structopt(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Serves the planner over HTTP. This is the default.
    Serve,

    /// Creates a user, printing their name and a session token to put in the `auth` cookie.
    AddUser {
        /// The user's name.
        name: String,
    },
}

impl Options {
    /// Get the address to serve on.
    pub fn serve_addr(&self) -> Fallible<SocketAddr> {
        let addrs = (&self.host as &str, self.port)
            .to_socket_addrs()?
            .collect::<Vec<_>>();
        if addrs.is_empty() {
            bail!("No matching address exists")
        } else {
            Ok(addrs[0])
        }
    }

    /// Sets up logging as specified by the `-q`, `-s`, and `-v` flags.
    pub fn start_logger(&self) -> Fallible<()> {
        use fern::Dispatch;
        use log::LevelFilter;

        if self.quiet >= 2 {
            return Ok(());
        }

        let (console_ll, syslog_ll) = match self.verbose {
            0 => (LevelFilter::Info, LevelFilter::Warn),
            1 => (LevelFilter::Debug, LevelFilter::Info),
            2 => (LevelFilter::Trace, LevelFilter::Debug),
            _ => (LevelFilter::Trace, LevelFilter::Trace),
        };

        let fern = Dispatch::new().chain(
            Dispatch::new()
                .level(console_ll)
                .level_for("hyper", LevelFilter::Info)
                .format(move |out, message, record| {
                    out.finish(format_args!("[{}] {}", record.level(), message))
                })
                .chain(std::io::stderr()),
        );

        let fern = if self.quiet == 0 {
            let formatter = syslog::Formatter3164 {
                facility: syslog::Facility::LOG_DAEMON,
                hostname: hostname::get()
                    .ok()
                    .and_then(|name| name.into_string().ok()),
                process: "tripplat".to_owned(),
                pid: std::process::id(),
            };

            let syslog = if let Some(ref server) = self.syslog_server {
                syslog::tcp(formatter, server).map_err(failure::SyncFailure::new)?
            } else {
                syslog::unix(formatter.clone())
                    .or_else(|_| syslog::tcp(formatter.clone(), ("127.0.0.1", 601)))
                    .or_else(|_| {
                        syslog::udp(formatter.clone(), ("127.0.0.1", 0), ("127.0.0.1", 514))
                    })
                    .map_err(failure::SyncFailure::new)?
            };

            fern.chain(Dispatch::new().level(syslog_ll).chain(syslog))
        } else {
            fern
        };

        fern.apply()?;
        Ok(())
    }
}
