fn main() {
    if let Err(err) = ev_stations::app::run() {
        eprintln!("application startup failed: {err}");
        std::process::exit(1);
    }
}
