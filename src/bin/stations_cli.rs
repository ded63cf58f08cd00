use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use ev_stations::app::{CLI_DEFAULT_DIRECTIVES, init_logging};
use ev_stations::client::config::ClientConfig;
use ev_stations::client::gateway::HttpGateway;
use ev_stations::client::models::{Credentials, NearbyParams, Registration, StationDraft};
use ev_stations::client::router::{Navigation, Route, Router, guard};
use ev_stations::client::storage::FileStorage;
use ev_stations::client::store::{AppStore, StoreError};
use ev_stations::domain::models::{ConnectorType, GeoPoint, StationStatus};
use serde::Serialize;

type Store = AppStore<HttpGateway<FileStorage>, FileStorage>;

#[derive(Debug)]
enum Command {
    Login(Credentials),
    Register(Registration),
    Logout,
    List,
    Nearby(NearbyParams),
    Create(StationDraft),
    Update { id: String, draft: StationDraft },
    Delete { id: String },
    Open { path: String },
}

impl Command {
    fn route(&self) -> Option<Route> {
        match self {
            Command::Login(_) => Some(Route::Login),
            Command::Register(_) => Some(Route::Register),
            Command::Logout | Command::Open { .. } => None,
            Command::List
            | Command::Create(_)
            | Command::Update { .. }
            | Command::Delete { .. } => Some(Route::Stations),
            Command::Nearby(_) => Some(Route::Map),
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("stations_cli: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let env_file = dotenvy::dotenv();
    init_logging(CLI_DEFAULT_DIRECTIVES).map_err(|error| error.to_string())?;
    match env_file {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(error = %error, "ignoring unreadable environment file"),
    }

    let mut config = ClientConfig::default();
    let mut storage_path = std::env::var("STATIONS_CLI_STORAGE")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data/client_storage.json"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--api-url" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--api-url requires a value".to_string());
                };
                config = config.with_base_url(value.clone());
                index += 2;
            }
            "--storage" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--storage requires a value".to_string());
                };
                storage_path = PathBuf::from(value);
                index += 2;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => break,
        }
    }

    let Some(command) = parse_command(&args[index..])? else {
        print_help();
        return Ok(());
    };

    let storage = Arc::new(FileStorage::open(&storage_path).map_err(|error| error.to_string())?);
    let gateway = HttpGateway::new(&config.base_url, Arc::clone(&storage))
        .map_err(|error| error.to_string())?;
    let mut store: Store = AppStore::new(gateway, storage);

    if let Some(route) = command.route()
        && let Navigation::Redirect(to) = guard(route, store.is_authenticated())
    {
        return Err(match to {
            Route::Login => "not logged in, run `login` first".to_string(),
            _ => "already logged in, run `logout` first".to_string(),
        });
    }

    actix_web::rt::System::new().block_on(execute(&mut store, command))
}

async fn execute(store: &mut Store, command: Command) -> Result<(), String> {
    let result = match command {
        Command::Login(credentials) => store.login(&credentials).await.map(|user| {
            println!("logged in as {} <{}>", user.name, user.email);
        }),
        Command::Register(registration) => store.register(&registration).await.map(|user| {
            println!("registered {} <{}>", user.name, user.email);
        }),
        Command::Logout => store.logout().map(|()| println!("logged out")),
        Command::List => store
            .fetch_stations()
            .await
            .map(|_| print_json(store.all_stations())),
        Command::Nearby(params) => store.fetch_nearby(params).await.map(|stations| {
            print_json(&stations);
        }),
        Command::Create(draft) => store.create_station(&draft).await.map(|station| {
            print_json(&station);
        }),
        Command::Update { id, draft } => store.update_station(&id, &draft).await.map(|station| {
            print_json(&station);
        }),
        Command::Delete { id } => store.delete_station(&id).await.map(|()| {
            println!("deleted station {id}");
        }),
        Command::Open { path } => {
            let mut router = Router::default();
            match router.navigate(Route::from_path(&path), store.state()) {
                Navigation::Proceed(route) => println!("{path}: {}", route.name()),
                Navigation::Redirect(route) => println!(
                    "{path}: redirected to {} ({})",
                    route.name(),
                    route.path().unwrap_or("*")
                ),
            }
            Ok(())
        }
    };

    result.map_err(|error| {
        let message = store
            .error()
            .map(ToString::to_string)
            .unwrap_or_else(|| error.to_string());
        match &error {
            StoreError::Gateway(gateway_error) if gateway_error.status() == Some(401) => {
                format!("{message} (session expired or revoked, run `logout` then `login`)")
            }
            _ => message,
        }
    })
}

fn parse_command(args: &[String]) -> Result<Option<Command>, String> {
    let Some((name, rest)) = args.split_first() else {
        return Ok(None);
    };

    let command = match name.as_str() {
        "login" => {
            let [email, password] = positional::<2>(name, rest)?;
            Command::Login(Credentials { email, password })
        }
        "register" => {
            let [name, email, password] = positional::<3>(name, rest)?;
            Command::Register(Registration {
                name,
                email,
                password,
            })
        }
        "logout" => Command::Logout,
        "list" => Command::List,
        "nearby" => {
            if rest.len() < 2 || rest.len() > 3 {
                return Err("usage: nearby <longitude> <latitude> [max-distance-m]".to_string());
            }
            Command::Nearby(NearbyParams {
                longitude: parse_number("longitude", &rest[0])?,
                latitude: parse_number("latitude", &rest[1])?,
                max_distance: rest
                    .get(2)
                    .map(|raw| parse_number("max-distance-m", raw))
                    .transpose()?,
            })
        }
        "create" => Command::Create(parse_draft(rest)?),
        "update" => {
            let Some((id, flags)) = rest.split_first() else {
                return Err("usage: update <id> [station options]".to_string());
            };
            Command::Update {
                id: id.clone(),
                draft: parse_draft(flags)?,
            }
        }
        "delete" => {
            let [id] = positional::<1>(name, rest)?;
            Command::Delete { id }
        }
        "open" => {
            let [path] = positional::<1>(name, rest)?;
            Command::Open { path }
        }
        other => return Err(format!("unknown command: {other}")),
    };

    Ok(Some(command))
}

fn positional<const N: usize>(command: &str, rest: &[String]) -> Result<[String; N], String> {
    <[String; N]>::try_from(rest.to_vec())
        .map_err(|_| format!("{command} expects {N} argument(s), got {}", rest.len()))
}

fn parse_number<T: FromStr>(label: &str, raw: &str) -> Result<T, String> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| format!("{label} must be a number"))
}

fn parse_draft(flags: &[String]) -> Result<StationDraft, String> {
    let mut draft = StationDraft::default();
    let mut longitude: Option<f64> = None;
    let mut latitude: Option<f64> = None;

    let mut index = 0;
    while index < flags.len() {
        let flag = flags[index].as_str();
        let Some(value) = flags.get(index + 1) else {
            return Err(format!("{flag} requires a value"));
        };
        match flag {
            "--name" => draft.name = Some(value.clone()),
            "--lon" => longitude = Some(parse_number("--lon", value)?),
            "--lat" => latitude = Some(parse_number("--lat", value)?),
            "--power" => draft.power_output = Some(parse_number("--power", value)?),
            "--connector" => {
                draft.connector_type =
                    Some(ConnectorType::from_str(value).map_err(|error| error.to_string())?);
            }
            "--status" => {
                draft.status =
                    Some(StationStatus::from_str(value).map_err(|error| error.to_string())?);
            }
            other => return Err(format!("unknown station option: {other}")),
        }
        index += 2;
    }

    draft.location = match (longitude, latitude) {
        (Some(longitude), Some(latitude)) => Some(GeoPoint::new(longitude, latitude)),
        (None, None) => None,
        _ => return Err("--lon and --lat must be given together".to_string()),
    };

    Ok(draft)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(error) => eprintln!("failed to render response: {error}"),
    }
}

fn print_help() {
    println!("stations_cli");
    println!();
    println!("Usage:");
    println!("  cargo run --bin stations_cli -- [--api-url <url>] [--storage <file>] <command>");
    println!();
    println!("Commands:");
    println!("  login <email> <password>");
    println!("  register <name> <email> <password>");
    println!("  logout");
    println!("  list");
    println!("  nearby <longitude> <latitude> [max-distance-m]");
    println!("  create --name <n> --lon <x> --lat <y> --power <kw> --connector <type> [--status <s>]");
    println!("  update <id> [--name <n>] [--lon <x> --lat <y>] [--power <kw>] [--connector <type>] [--status <s>]");
    println!("  delete <id>");
    println!("  open <path>         show which view a path resolves to for this session");
    println!();
    println!("Environment:");
    println!("  STATIONS_CLI_STORAGE  token storage file (default: ./data/client_storage.json)");
}
