fn main() {
    if let Err(error) = segscale::logging::init_tracing() {
        eprintln!("{error}");
    }

    if let Err(error) = segscale::run_cli() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
